use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{SimulateOptions, SimulationReport, Simulator};
use crate::error::NodeError;
use crate::group::TransactionGroup;

/// Simulator that replays pre-programmed responses in order, for tests and
/// offline packing of captured reports.
pub struct MockSimulator {
    responses: Mutex<VecDeque<Result<SimulationReport, NodeError>>>,
    call_count: AtomicUsize,
}

impl MockSimulator {
    pub fn new(responses: Vec<Result<SimulationReport, NodeError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn with_report(report: SimulationReport) -> Self {
        Self::new(vec![Ok(report)])
    }

    pub fn failing(error: NodeError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Simulator for MockSimulator {
    async fn simulate(
        &self,
        _group: &TransactionGroup,
        _options: &SimulateOptions,
    ) -> Result<SimulationReport, NodeError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        let next = self
            .responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        next.unwrap_or_else(|| {
            Err(NodeError::Transport(format!(
                "MockSimulator: no response configured for call {idx}"
            )))
        })
    }
}
