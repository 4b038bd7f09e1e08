//! Segment × kind generation loop.
//!
//! Pairs are processed strictly one at a time: outer loop over segments,
//! inner loop over [`ItemKind::ALL`]. The sink is called at most once per
//! run, and only after every pair has been processed.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::client::GenerationClient;
use crate::error::{GenerationError, PersistenceError, PipelineError};
use crate::item::{ItemKind, QuizItem};
use crate::parser;
use crate::segment::{self, PageRange, PageText, Segment, SegmentPolicy};

/// Accepts the final item batch of a run and stores it as a unit.
pub trait PersistenceSink {
    fn store(&mut self, items: &[QuizItem]) -> Result<(), PersistenceError>;
}

/// What to do when one generation request fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the batch on the first failure; nothing is stored.
    #[default]
    FailFast,
    /// Record the failure, keep going, store whatever was produced.
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairId {
    pub segment: usize,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    Pending,
    InFlight,
    /// Parsed with this many items.
    Parsed(usize),
    Failed,
}

#[derive(Debug)]
pub struct PairFailure {
    pub pair: PairId,
    pub error: GenerationError,
}

#[derive(Debug)]
pub enum BatchStatus {
    /// Every pair parsed.
    Complete,
    /// Fail-fast stop at `failure.pair`; later pairs were never attempted.
    Failed(PairFailure),
    /// Best-effort run with at least one failed pair.
    Partial(Vec<PairFailure>),
}

/// Outcome of the generation loop, before anything is persisted.
#[derive(Debug)]
pub struct BatchResult {
    pub items: Vec<QuizItem>,
    pub pairs: Vec<(PairId, PairState)>,
    pub status: BatchStatus,
}

impl BatchResult {
    pub fn is_complete(&self) -> bool {
        matches!(self.status, BatchStatus::Complete)
    }
}

/// Summary of a run whose items reached the sink.
#[derive(Debug)]
pub struct RunReport {
    pub pages: usize,
    pub segments: usize,
    pub items: Vec<QuizItem>,
    pub failures: Vec<PairFailure>,
}

pub struct Pipeline<G> {
    client: G,
    segment_policy: SegmentPolicy,
    failure_policy: FailurePolicy,
}

impl<G: GenerationClient> Pipeline<G> {
    pub fn new(client: G) -> Self {
        Self {
            client,
            segment_policy: SegmentPolicy::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_segment_policy(mut self, policy: SegmentPolicy) -> Self {
        self.segment_policy = policy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Window the pages, segment them, generate, and hand the aggregate to `sink`.
    ///
    /// The sink is only called when the batch did not fail fast.
    pub async fn run<S: PersistenceSink>(
        &self,
        pages: &[PageText],
        range: PageRange,
        sink: &mut S,
    ) -> Result<RunReport, PipelineError> {
        let window = segment::select(pages, range);
        let segments = segment::build(window, self.segment_policy);
        info!(
            "Generating from {} of {} pages in {} segment(s)",
            window.len(),
            pages.len(),
            segments.len()
        );

        let batch = self.generate(&segments).await;
        let failures = match batch.status {
            BatchStatus::Complete => Vec::new(),
            BatchStatus::Partial(failures) => failures,
            BatchStatus::Failed(PairFailure { pair, error }) => {
                warn!(
                    "Discarding {} generated items after failure on segment {} ({})",
                    batch.items.len(),
                    pair.segment,
                    pair.kind
                );
                return Err(PipelineError::Generation {
                    segment: pair.segment,
                    kind: pair.kind,
                    source: error,
                });
            }
        };

        sink.store(&batch.items)?;
        info!("Stored {} items ({} failed requests)", batch.items.len(), failures.len());

        Ok(RunReport {
            pages: window.len(),
            segments: segments.len(),
            items: batch.items,
            failures,
        })
    }

    /// Run every (segment, kind) pair in order and collect the parsed items.
    pub async fn generate(&self, segments: &[Segment]) -> BatchResult {
        let mut pairs: Vec<(PairId, PairState)> = segments
            .iter()
            .enumerate()
            .flat_map(|(segment, _)| {
                ItemKind::ALL
                    .into_iter()
                    .map(move |kind| (PairId { segment, kind }, PairState::Pending))
            })
            .collect();
        let mut items = Vec::new();
        let mut failures = Vec::new();

        for idx in 0..pairs.len() {
            let pair = pairs[idx].0;
            let text = &segments[pair.segment].text;
            pairs[idx].1 = PairState::InFlight;
            debug!(segment = pair.segment, kind = %pair.kind, chars = text.len(), "Requesting");

            match self.client.generate(pair.kind, text).await {
                Ok(raw) => {
                    let parsed = parser::parse(pair.kind, &raw);
                    for item in &parsed {
                        debug!(kind = %item.kind, content = %item.content, answer = %item.answer, "Generated item");
                    }
                    pairs[idx].1 = PairState::Parsed(parsed.len());
                    items.extend(parsed);
                }
                Err(error) => {
                    warn!("Generation failed on segment {} ({}): {}", pair.segment, pair.kind, error);
                    pairs[idx].1 = PairState::Failed;
                    let failure = PairFailure { pair, error };
                    match self.failure_policy {
                        FailurePolicy::FailFast => {
                            return BatchResult {
                                items,
                                pairs,
                                status: BatchStatus::Failed(failure),
                            };
                        }
                        FailurePolicy::BestEffort => failures.push(failure),
                    }
                }
            }
        }

        let status = if failures.is_empty() {
            BatchStatus::Complete
        } else {
            BatchStatus::Partial(failures)
        };
        BatchResult { items, pairs, status }
    }
}
