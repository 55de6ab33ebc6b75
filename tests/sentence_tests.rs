use anyhow::{anyhow, Result};
use live_interpreter::recognition::{classify, sentence_end};
use live_interpreter::{OutboundMessage, RecognitionResult, Sentence, SentenceEvent};

/// Result whose engine exposes its own end-of-sentence predicate
#[derive(Debug)]
struct PredicateResult {
    sentence: Option<Sentence>,
    verdict: fn() -> Result<bool>,
}

impl RecognitionResult for PredicateResult {
    fn sentence(&self) -> Option<&Sentence> {
        self.sentence.as_ref()
    }

    fn is_sentence_end(&self, _sentence: &Sentence) -> Option<Result<bool>> {
        Some((self.verdict)())
    }
}

#[test]
fn test_missing_sentence_is_dropped() {
    assert_eq!(classify(&SentenceEvent::empty()), None);
}

#[test]
fn test_empty_payload_is_dropped() {
    assert_eq!(classify(&SentenceEvent::new(Sentence::default())), None);
}

#[test]
fn test_empty_text_is_dropped() {
    let event = SentenceEvent::new(Sentence::with_text("").set("is_sentence_end", true));
    assert_eq!(classify(&event), None);

    let no_text = SentenceEvent::new(Sentence::default().set("begin_time", 120));
    assert_eq!(classify(&no_text), None);
}

#[test]
fn test_payload_flag_marks_final() {
    let event = SentenceEvent::new(Sentence::with_text("hello world").set("is_sentence_end", true));
    let classified = classify(&event).unwrap();

    assert_eq!(classified.text, "hello world");
    assert!(classified.is_final);
    assert_eq!(
        classified.to_message(),
        OutboundMessage::transcription("hello world", true)
    );
}

#[test]
fn test_no_marker_defaults_to_interim() {
    let event = SentenceEvent::new(Sentence::with_text("hello"));
    let classified = classify(&event).unwrap();

    assert!(!classified.is_final);
    assert!(!classified.wants_translation());
}

#[test]
fn test_non_boolean_payload_flag_is_interim() {
    let event = SentenceEvent::new(Sentence::with_text("hello").set("is_sentence_end", "true"));
    assert!(!classify(&event).unwrap().is_final);
}

#[test]
fn test_engine_predicate_takes_priority_over_payload() {
    let result = PredicateResult {
        sentence: Some(Sentence::with_text("你好世界").set("is_sentence_end", false)),
        verdict: || Ok(true),
    };
    assert!(classify(&result).unwrap().is_final);

    let result = PredicateResult {
        sentence: Some(Sentence::with_text("你好").set("is_sentence_end", true)),
        verdict: || Ok(false),
    };
    assert!(!classify(&result).unwrap().is_final);
}

#[test]
fn test_failing_predicate_degrades_to_interim() {
    let sentence = Sentence::with_text("hello").set("is_sentence_end", true);
    let result = PredicateResult {
        sentence: Some(sentence.clone()),
        verdict: || Err(anyhow!("predicate blew up")),
    };

    assert!(!sentence_end(&result, &sentence));
    assert!(!classify(&result).unwrap().is_final);
}

#[test]
fn test_final_sentence_wants_translation() {
    let event = SentenceEvent::new(Sentence::with_text(" hello. ").set("is_sentence_end", true));
    let classified = classify(&event).unwrap();

    // Text is passed through untrimmed
    assert_eq!(classified.text, " hello. ");
    assert!(classified.wants_translation());
}
