use crate::item::{ItemKind, QuizItem};

/// Answer stored for true/false items; the real verdict is not extracted.
pub const TRUE_FALSE_ANSWER: &str = "True/False";
/// Answer stored for fill-in-the-blank items; the expected word is not extracted.
pub const FILL_BLANK_ANSWER: &str = "expected_answer";

/// Turn raw model output into quiz items, one per `\n`-separated line.
///
/// Lines are kept verbatim, blank ones included, so a response with `k` lines
/// always yields `k` items. Any text is accepted.
pub fn parse(kind: ItemKind, raw: &str) -> Vec<QuizItem> {
    raw.split('\n')
        .map(|line| QuizItem {
            kind,
            content: line.to_string(),
            answer: answer_for(kind, line),
        })
        .collect()
}

fn answer_for(kind: ItemKind, line: &str) -> String {
    match kind {
        // Heuristic: first token of the line, which is not necessarily the answer letter.
        ItemKind::MultipleChoice => line.split_whitespace().next().unwrap_or_default().to_string(),
        ItemKind::TrueFalse => TRUE_FALSE_ANSWER.to_string(),
        ItemKind::FillBlank => FILL_BLANK_ANSWER.to_string(),
    }
}
