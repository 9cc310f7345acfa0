//! Pushes locally committed documents to the edge tier.

use std::sync::LazyLock;

use rayon::prelude::*;
use tracing::{debug, warn};
use wharf_config::EdgeNode;
use wharf_events::{EdgePushStage, EventSinkHandle, WharfEvent};

use crate::{
    error::{EdgeError, Result},
    payload::gzip,
    signature::sign,
};

static SHARED_AGENT: LazyLock<ureq::Agent> = LazyLock::new(ureq::Agent::new_with_defaults);

/// One locally committed file queued for edge publication.
#[derive(Debug, Clone)]
pub struct PushFile {
    /// Path relative to the metadata root, e.g. `p2/acme/widget.json`.
    pub relative_path: String,
    /// Uncompressed document bytes as committed locally.
    pub contents: Vec<u8>,
    /// Local file modification time, epoch seconds.
    pub mtime: i64,
    /// Owning package name; `None` for catalog-level documents like the
    /// root index, which are always pushed.
    pub package: Option<String>,
}

/// Per-file, per-node push result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushResult {
    Accepted,
    Skipped,
    Failed(String),
}

/// Outcome of one (file, node) push attempt.
#[derive(Debug, Clone)]
pub struct PushOutcome {
    pub path: String,
    pub node: String,
    pub result: PushResult,
}

impl PushOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.result, PushResult::Failed(_))
    }
}

/// Fans pushed files out to every configured edge node.
///
/// Pushes are best-effort acceleration: a failure is logged and surfaced
/// as an event but never fails the batch, and local documents stay
/// authoritative either way.
pub struct EdgePublisher {
    nodes: Vec<EdgeNode>,
    concurrency: usize,
    events: EventSinkHandle,
}

impl EdgePublisher {
    pub fn new(nodes: Vec<EdgeNode>, concurrency: usize, events: EventSinkHandle) -> Self {
        Self {
            nodes,
            concurrency: concurrency.max(1),
            events,
        }
    }

    /// Whether an edge tier is configured at all.
    pub fn is_active(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Pushes a batch of files with bounded concurrency.
    ///
    /// `is_live` is consulted per file immediately before the upload; a
    /// package that vanished from the live catalog since the file was
    /// queued is skipped so deleted content cannot resurrect on the edge.
    /// Every (file, node) pair gets its own outcome.
    ///
    /// # Errors
    ///
    /// Only thread-pool construction can fail; individual push failures
    /// are reported in the outcomes.
    pub fn push_batch<F>(&self, files: &[PushFile], is_live: F) -> Result<Vec<PushOutcome>>
    where
        F: Fn(&str) -> bool + Sync,
    {
        if self.nodes.is_empty() || files.is_empty() {
            return Ok(Vec::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .build()
            .map_err(|e| EdgeError::PoolBuild(e.to_string()))?;

        let outcomes = pool.install(|| {
            files
                .par_iter()
                .flat_map_iter(|file| {
                    let outcomes: Vec<PushOutcome> = match &file.package {
                        Some(package) if !is_live(package) => {
                            self.events.emit(WharfEvent::EdgePush {
                                path: file.relative_path.clone(),
                                stage: EdgePushStage::Skipped,
                            });
                            self.nodes
                                .iter()
                                .map(|node| PushOutcome {
                                    path: file.relative_path.clone(),
                                    node: node.url.clone(),
                                    result: PushResult::Skipped,
                                })
                                .collect()
                        }
                        _ => self
                            .nodes
                            .iter()
                            .map(|node| self.push_one(file, node))
                            .collect(),
                    };
                    outcomes
                })
                .collect::<Vec<_>>()
        });

        let failures = outcomes.iter().filter(|o| o.is_failure()).count();
        if failures > 0 {
            warn!(
                "{} of {} edge pushes failed; edge content is stale until retried",
                failures,
                outcomes.len()
            );
        }

        Ok(outcomes)
    }

    fn push_one(&self, file: &PushFile, node: &EdgeNode) -> PushOutcome {
        let outcome = |result| PushOutcome {
            path: file.relative_path.clone(),
            node: node.url.clone(),
            result,
        };

        self.events.emit(WharfEvent::EdgePush {
            path: file.relative_path.clone(),
            stage: EdgePushStage::Pushing {
                node: node.url.clone(),
            },
        });

        let payload = match gzip(&file.contents) {
            Ok(payload) => payload,
            Err(err) => return self.fail(file, node, outcome, err.to_string()),
        };
        let signature = sign(
            &file.relative_path,
            &payload,
            file.mtime,
            node.secret.as_bytes(),
        );

        let mtime = file.mtime.to_string();
        let response = SHARED_AGENT
            .post(node.url.as_str())
            .header("Signature", signature.as_str())
            .header("X-Wharf-Path", file.relative_path.as_str())
            .header("X-Wharf-Mtime", mtime.as_str())
            .header("Content-Type", "application/octet-stream")
            .send(&payload[..]);

        match response {
            Ok(resp) if resp.status().as_u16() == 202 => {
                debug!("Edge node {} accepted {}", node.url, file.relative_path);
                self.events.emit(WharfEvent::EdgePush {
                    path: file.relative_path.clone(),
                    stage: EdgePushStage::Accepted {
                        node: node.url.clone(),
                    },
                });
                outcome(PushResult::Accepted)
            }
            Ok(resp) => self.fail(
                file,
                node,
                outcome,
                format!("unexpected status {}", resp.status()),
            ),
            Err(err) => self.fail(file, node, outcome, err.to_string()),
        }
    }

    fn fail(
        &self,
        file: &PushFile,
        node: &EdgeNode,
        outcome: impl FnOnce(PushResult) -> PushOutcome,
        error: String,
    ) -> PushOutcome {
        warn!(
            "Edge push of {} to {} failed: {}",
            file.relative_path, node.url, error
        );
        self.events.emit(WharfEvent::EdgePush {
            path: file.relative_path.clone(),
            stage: EdgePushStage::Failed {
                node: node.url.clone(),
                error: error.clone(),
            },
        });
        outcome(PushResult::Failed(error))
    }
}
