use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    MultipleChoice,
    TrueFalse,
    FillBlank,
}

impl ItemKind {
    /// Generation order within a segment.
    pub const ALL: [ItemKind; 3] = [ItemKind::MultipleChoice, ItemKind::TrueFalse, ItemKind::FillBlank];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::MultipleChoice => "multiple_choice",
            ItemKind::TrueFalse => "true_false",
            ItemKind::FillBlank => "fill_blank",
        }
    }

    /// Instruction sent to the model for this kind, with the segment text appended.
    /// Exactly one item is requested per call.
    pub fn prompt(self, segment_text: &str) -> String {
        let instruction = match self {
            ItemKind::MultipleChoice => "Hasilkan 1 pertanyaan pilihan ganda dari teks berikut:",
            ItemKind::TrueFalse => "Hasilkan 1 pertanyaan benar atau salah dari teks berikut:",
            ItemKind::FillBlank => "Hasilkan 1 pertanyaan isian dari pertanyaan berikut:",
        };
        format!("{}\n{}", instruction, segment_text)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" | "mc" => Ok(ItemKind::MultipleChoice),
            "true_false" | "tf" => Ok(ItemKind::TrueFalse),
            "fill_blank" | "fb" => Ok(ItemKind::FillBlank),
            other => Err(format!("unknown item kind: {}", other)),
        }
    }
}

/// One generated quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub kind: ItemKind,
    pub content: String,
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_segment_text() {
        let p = ItemKind::TrueFalse.prompt("Photosynthesis converts light to energy.");
        assert!(p.starts_with("Hasilkan 1 pertanyaan benar atau salah"));
        assert!(p.ends_with("\nPhotosynthesis converts light to energy."));
    }

    #[test]
    fn every_kind_has_a_distinct_prompt() {
        let prompts: Vec<String> = ItemKind::ALL.iter().map(|k| k.prompt("x")).collect();
        assert_ne!(prompts[0], prompts[1]);
        assert_ne!(prompts[1], prompts[2]);
        assert_ne!(prompts[0], prompts[2]);
    }

    #[test]
    fn kind_names_roundtrip_through_from_str() {
        for kind in ItemKind::ALL {
            assert_eq!(kind.as_str().parse::<ItemKind>(), Ok(kind));
        }
        assert!("essay".parse::<ItemKind>().is_err());
    }
}
