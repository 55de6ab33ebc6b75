//! External transcoder process (ffmpeg by default)
//!
//! Browser audio arrives in whatever container the client's recorder produces. The
//! transcoder turns it into canonical PCM: signed 16-bit little-endian, mono, 16kHz.
//! Input is written asynchronously from the connection task; output is read with blocking
//! calls from the recognition worker thread.

use anyhow::{Context, Result};
use std::io::{self, Read};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::runtime::Handle;
use tokio_util::io::SyncIoBridge;
use tracing::{debug, info, warn};

use crate::config::TranscoderConfig;

/// Blocking PCM reader over the transcoder's stdout
pub type TranscoderOutput = PcmReader<SyncIoBridge<ChildStdout>>;

/// A running transcoder process, owned by one session
pub struct Transcoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    terminate_timeout: Duration,
    terminated: bool,
}

impl Transcoder {
    /// Launch the transcoder with piped stdin/stdout and a discarded stderr
    pub fn start(config: &TranscoderConfig) -> Result<Self> {
        let mut child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start transcoder '{}'", config.program))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();

        info!(
            "Transcoder started: {} (pid={:?})",
            config.program,
            child.id()
        );

        Ok(Self {
            child,
            stdin,
            stdout,
            terminate_timeout: config.terminate_timeout(),
            terminated: false,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Hand the PCM output to a blocking consumer.
    ///
    /// Must be called from within the tokio runtime; the returned reader must only be
    /// used outside of it (on a dedicated thread). Returns `None` once taken.
    pub fn take_output(&mut self) -> Option<Result<TranscoderOutput>> {
        let stdout = self.stdout.take()?;
        Some(
            Handle::try_current()
                .context("Transcoder output requires a tokio runtime")
                .map(|handle| PcmReader::new(SyncIoBridge::new_with_handle(stdout, handle))),
        )
    }

    /// Forward raw client audio to the transcoder, flushing immediately.
    ///
    /// Fails once the process has exited or its input was closed; the session must end.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .context("Transcoder input is closed")?;

        stdin
            .write_all(bytes)
            .await
            .context("Failed to write to transcoder")?;
        stdin.flush().await.context("Failed to flush transcoder input")?;

        Ok(())
    }

    /// Best-effort shutdown: close input, kill, and wait up to the configured timeout.
    ///
    /// Never fails and is a no-op after the first call.
    pub async fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        drop(self.stdin.take());

        if let Err(e) = self.child.start_kill() {
            // Already exited and reaped
            debug!("Transcoder kill skipped: {}", e);
        }

        match tokio::time::timeout(self.terminate_timeout, self.child.wait()).await {
            Ok(Ok(status)) => info!("Transcoder exited: {}", status),
            Ok(Err(e)) => warn!("Failed to wait for transcoder: {}", e),
            Err(_) => warn!(
                "Transcoder did not exit within {:?}",
                self.terminate_timeout
            ),
        }
    }
}

/// Reads fixed-size PCM chunks from a byte source
pub struct PcmReader<R> {
    inner: R,
}

impl<R: Read> PcmReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Fill `buf` from the source.
    ///
    /// Returns fewer bytes than requested only at end of stream, and `Ok(0)` once the
    /// stream is exhausted. End of stream is normal termination, not an error.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;

        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most `step` bytes per read, like a pipe under load
    struct Trickle {
        data: Cursor<Vec<u8>>,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.step);
            self.data.read(&mut buf[..n])
        }
    }

    #[test]
    fn read_chunk_fills_across_short_reads() {
        let mut reader = PcmReader::new(Trickle {
            data: Cursor::new((0..100u8).collect()),
            step: 7,
        });

        let mut buf = [0u8; 64];
        assert_eq!(reader.read_chunk(&mut buf).unwrap(), 64);
        assert_eq!(buf[63], 63);

        assert_eq!(reader.read_chunk(&mut buf).unwrap(), 36);
        assert_eq!(reader.read_chunk(&mut buf).unwrap(), 0);
    }
}
