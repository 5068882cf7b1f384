use std::collections::VecDeque;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, info_span, instrument};

use crate::domain::{Order, OrderStatus};
use crate::error::WorkError;

/// One order plus the items to perform on it.
///
/// Several work items may point at the same `Arc<Order>`; the order's own
/// guard serialises them.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub order: Arc<Order>,
    pub items: Vec<String>,
}

impl WorkItem {
    pub fn new<I, S>(order: Arc<Order>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order,
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of one work item. `index` is its position in the submitted batch;
/// `order_id` and `status` are read after the worker finished.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkOutcome {
    pub index: usize,
    pub order_id: u64,
    pub status: OrderStatus,
    pub result: Result<(), WorkError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// A work item running on the blocking pool.
struct Running {
    index: usize,
    order: Arc<Order>,
    handle: JoinHandle<Result<(), WorkError>>,
}

/// Runs batches of orders through `perform_order` with bounded parallelism.
///
/// Order operations block on the order's mutex, so each item runs on
/// tokio's blocking pool. At most `concurrency` items are in flight; once the
/// window is full the oldest one is awaited before the next is started.
#[derive(Debug, Clone)]
pub struct OrderSystem {
    concurrency: usize,
}

impl OrderSystem {
    /// `concurrency` is clamped to at least 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Runs every item and returns one outcome per item, in submission order.
    ///
    /// A failed item is reported in its outcome and never stops the others.
    #[instrument(name = "order_system", skip_all, fields(items = work.len(), concurrency = self.concurrency))]
    pub async fn run(&self, work: Vec<WorkItem>) -> Vec<WorkOutcome> {
        info!("Dispatching work");

        let mut in_flight: VecDeque<Running> = VecDeque::with_capacity(self.concurrency);
        let mut outcomes = Vec::with_capacity(work.len());

        for (index, item) in work.into_iter().enumerate() {
            if in_flight.len() == self.concurrency {
                if let Some(oldest) = in_flight.pop_front() {
                    outcomes.push(Self::finish(oldest).await);
                }
            }
            in_flight.push_back(Self::start(index, item));
        }
        while let Some(running) = in_flight.pop_front() {
            outcomes.push(Self::finish(running).await);
        }

        let summary = Self::summarize(&outcomes);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Work complete"
        );
        outcomes
    }

    fn start(index: usize, item: WorkItem) -> Running {
        let order = Arc::clone(&item.order);
        let span = info_span!("worker", index);
        let handle = tokio::task::spawn_blocking(move || {
            span.in_scope(|| {
                item.order
                    .perform_order(item.items.as_slice())
                    .map_err(WorkError::from)
            })
        });
        Running {
            index,
            order,
            handle,
        }
    }

    async fn finish(running: Running) -> WorkOutcome {
        let Running {
            index,
            order,
            handle,
        } = running;
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(index, error = %e, "Worker task failed");
                Err(WorkError::Aborted(e.to_string()))
            }
        };
        WorkOutcome {
            index,
            order_id: order.id(),
            status: order.status(),
            result,
        }
    }

    pub fn summarize(outcomes: &[WorkOutcome]) -> RunSummary {
        outcomes
            .iter()
            .fold(RunSummary::default(), |mut summary, outcome| {
                if outcome.result.is_ok() {
                    summary.succeeded += 1;
                } else {
                    summary.failed += 1;
                }
                summary
            })
    }
}
