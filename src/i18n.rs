//! Localized text shown to the user as assistant turns or canned prompts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Vi,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Vi => "vi",
        }
    }

    /// The other language. Language is independent of every other piece of state.
    pub fn toggled(self) -> Self {
        match self {
            Language::En => Language::Vi,
            Language::Vi => Language::En,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language: {0}")]
pub struct UnknownLanguage(String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "vi" => Ok(Language::Vi),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

pub fn no_selection_notice(language: Language) -> &'static str {
    match language {
        Language::En => "Please select at least one document to chat.",
        Language::Vi => "Vui lòng chọn ít nhất một tài liệu để chat.",
    }
}

pub fn generic_failure(language: Language) -> &'static str {
    match language {
        Language::En => "Sorry, I encountered an error. Please try again.",
        Language::Vi => "Xin lỗi, tôi gặp lỗi. Vui lòng thử lại.",
    }
}

const SUGGESTED_EN: &[&str] = &[
    "What is this document about?",
    "What are the main topics covered?",
    "Can you explain the key concepts?",
    "What are the important points I should remember?",
];

const SUGGESTED_VI: &[&str] = &[
    "Tài liệu này nói về gì?",
    "Những chủ đề chính được đề cập là gì?",
    "Bạn có thể giải thích các khái niệm chính không?",
    "Những điểm quan trọng tôi nên nhớ là gì?",
];

/// Starter questions offered on an empty conversation.
pub fn suggested_questions(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => SUGGESTED_EN,
        Language::Vi => SUGGESTED_VI,
    }
}

/// A labelled shortcut that submits `query` when picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuickAction {
    pub label: &'static str,
    pub query: &'static str,
}

const QUICK_EN: &[QuickAction] = &[
    QuickAction {
        label: "Summarize this document",
        query: "Can you provide a summary of this document?",
    },
    QuickAction {
        label: "Explain key concepts",
        query: "What are the key concepts explained in this document?",
    },
    QuickAction {
        label: "Find specific information",
        query: "Help me find information about...",
    },
    QuickAction {
        label: "Main points",
        query: "What are the main points covered in this document?",
    },
];

const QUICK_VI: &[QuickAction] = &[
    QuickAction {
        label: "Tóm tắt tài liệu này",
        query: "Bạn có thể tóm tắt tài liệu này không?",
    },
    QuickAction {
        label: "Giải thích khái niệm chính",
        query: "Những khái niệm chính được giải thích trong tài liệu này là gì?",
    },
    QuickAction {
        label: "Tìm thông tin cụ thể",
        query: "Giúp tôi tìm thông tin về...",
    },
    QuickAction {
        label: "Các điểm chính",
        query: "Những điểm chính được đề cập trong tài liệu này là gì?",
    },
];

pub fn quick_actions(language: Language) -> &'static [QuickAction] {
    match language {
        Language::En => QUICK_EN,
        Language::Vi => QUICK_VI,
    }
}
