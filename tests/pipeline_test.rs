use std::collections::HashMap;
use std::sync::Mutex;

use pdf_quizgen::db::{self, SqliteSink};
use pdf_quizgen::segment;
use pdf_quizgen::{
    GenerationClient, GenerationError, ItemKind, PageRange, PersistenceError, PersistenceSink,
    Pipeline, PipelineError, QuizItem,
};

/// Answers per kind; a missing kind is rejected like an auth failure.
struct ByKind {
    answers: HashMap<ItemKind, String>,
    calls: Mutex<Vec<ItemKind>>,
}

impl ByKind {
    fn new(answers: &[(ItemKind, &str)]) -> Self {
        Self {
            answers: answers.iter().map(|(k, a)| (*k, a.to_string())).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl GenerationClient for ByKind {
    async fn generate(&self, kind: ItemKind, _segment_text: &str) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(kind);
        self.answers.get(&kind).cloned().ok_or(GenerationError::Request {
            status: 401,
            message: "invalid api key".to_string(),
        })
    }
}

#[derive(Default)]
struct MemorySink {
    calls: usize,
    items: Vec<QuizItem>,
}

impl PersistenceSink for MemorySink {
    fn store(&mut self, items: &[QuizItem]) -> Result<(), PersistenceError> {
        self.calls += 1;
        self.items.extend_from_slice(items);
        Ok(())
    }
}

fn photosynthesis() -> Vec<String> {
    vec!["Photosynthesis converts light to energy.".to_string()]
}

#[tokio::test]
async fn scenario_a_three_items_in_kind_order() {
    let client = ByKind::new(&[
        (ItemKind::MultipleChoice, "A) Chlorophyll captures light"),
        (ItemKind::TrueFalse, "Photosynthesis needs light."),
        (ItemKind::FillBlank, "Plants convert ____ to energy."),
    ]);
    let mut sink = MemorySink::default();

    let report = Pipeline::new(&client)
        .run(&photosynthesis(), PageRange::default(), &mut sink)
        .await
        .unwrap();

    let kinds: Vec<ItemKind> = report.items.iter().map(|i| i.kind).collect();
    assert_eq!(kinds, ItemKind::ALL.to_vec());
    assert_eq!(report.items[0].answer, "A)");
    assert_eq!(report.items[1].answer, "True/False");
    assert_eq!(report.items[2].answer, "expected_answer");
    assert_eq!(sink.calls, 1);
    assert_eq!(sink.items, report.items);
}

#[tokio::test]
async fn scenario_b_true_false_failure_is_fatal_and_nothing_is_stored() {
    let client = ByKind::new(&[
        (ItemKind::MultipleChoice, "A) Chlorophyll captures light"),
        (ItemKind::FillBlank, "Plants convert ____ to energy."),
    ]);
    let pipeline = Pipeline::new(&client);

    let segments = segment::build(&photosynthesis(), Default::default());
    let batch = pipeline.generate(&segments).await;
    assert_eq!(batch.items.len(), 1);
    assert_eq!(batch.items[0].kind, ItemKind::MultipleChoice);

    let mut sink = MemorySink::default();
    let err = pipeline
        .run(&photosynthesis(), PageRange::default(), &mut sink)
        .await
        .unwrap_err();

    match err {
        PipelineError::Generation { kind, source, .. } => {
            assert_eq!(kind, ItemKind::TrueFalse);
            assert!(source.to_string().contains("invalid api key"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(sink.calls, 0);
    assert!(!client.calls.lock().unwrap().contains(&ItemKind::FillBlank));
}

#[test]
fn scenario_c_range_past_end_is_empty() {
    let pages: Vec<String> = (0..10).map(|i| format!("page {}", i)).collect();
    assert!(segment::select(&pages, PageRange::new(17, Some(45))).is_empty());
}

#[tokio::test]
async fn run_persists_into_sqlite() {
    let client = ByKind::new(&[
        (ItemKind::MultipleChoice, "A) one\nB) two"),
        (ItemKind::TrueFalse, "tf"),
        (ItemKind::FillBlank, "fb"),
    ]);
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let mut sink = SqliteSink::new(&conn, "bio.pdf", "medium");

    Pipeline::new(&client)
        .run(&photosynthesis(), PageRange::default(), &mut sink)
        .await
        .unwrap();

    let rows = db::fetch_questions(&conn, None, 100).unwrap();
    let kinds: Vec<&str> = rows.iter().map(|r| r.kind.as_str()).collect();
    assert_eq!(kinds, vec!["multiple_choice", "multiple_choice", "true_false", "fill_blank"]);
    assert_eq!(rows[1].answer, "B)");
}
