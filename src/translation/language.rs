use serde::{Deserialize, Serialize};
use std::fmt;

/// CJK Unified Ideographs range used to detect Chinese text
const CJK_RANGE: std::ops::RangeInclusive<char> = '\u{4e00}'..='\u{9fa5}';

const ZH_TO_EN_INSTRUCTION: &str = "You are a professional simultaneous interpreter. \
Translate the following Chinese text into English directly. Do not explain. \
Do not output the original text. Output ONLY the translation.";

const EN_TO_ZH_INSTRUCTION: &str = "You are a professional simultaneous interpreter. \
Translate the following English text into Chinese directly. Do not explain. \
Do not output the original text. Output ONLY the translation.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Chinese,
    English,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Chinese => f.write_str("Chinese"),
            Language::English => f.write_str("English"),
        }
    }
}

pub fn contains_chinese(text: &str) -> bool {
    text.chars().any(|c| CJK_RANGE.contains(&c))
}

/// A finalized sentence ready for the translation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub source: Language,
    pub target: Language,
    pub system_instruction: &'static str,
}

impl TranslationRequest {
    /// Any CJK ideograph makes the sentence Chinese (translated to English);
    /// everything else is treated as English (translated to Chinese).
    pub fn for_text(text: impl Into<String>) -> Self {
        let text = text.into();

        if contains_chinese(&text) {
            Self {
                text,
                source: Language::Chinese,
                target: Language::English,
                system_instruction: ZH_TO_EN_INSTRUCTION,
            }
        } else {
            Self {
                text,
                source: Language::English,
                target: Language::Chinese,
                system_instruction: EN_TO_ZH_INSTRUCTION,
            }
        }
    }
}
