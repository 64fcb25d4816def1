use tracing::{debug, info, instrument, warn};

use crate::classify::classify;
use crate::config::PackerConfig;
use crate::error::PackError;
use crate::group::TransactionGroup;
use crate::placement::place;
use crate::rewrite::rewrite;
use crate::simulate::{SimulationReport, Simulator};

/// Simulates a group once and rewrites its reference tables so that a real
/// submission names every resource it touches.
pub struct ResourcePacker<S> {
    simulator: S,
    config: PackerConfig,
}

impl<S: Simulator> ResourcePacker<S> {
    pub fn new(simulator: S) -> Self {
        Self::with_config(simulator, PackerConfig::default())
    }

    pub fn with_config(simulator: S, config: PackerConfig) -> Self {
        Self { simulator, config }
    }

    pub fn config(&self) -> &PackerConfig {
        &self.config
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    /// Run one simulate call and return the corrected, unlinked group.
    /// `group` is never modified; on error nothing is applied.
    pub async fn pack(&self, group: &TransactionGroup) -> Result<TransactionGroup, PackError> {
        simulate_and_pack(&self.simulator, group, &self.config).await
    }
}

/// [`ResourcePacker::pack`] with the default configuration.
pub async fn pack<S: Simulator + ?Sized>(
    simulator: &S,
    group: &TransactionGroup,
) -> Result<TransactionGroup, PackError> {
    simulate_and_pack(simulator, group, &PackerConfig::default()).await
}

#[instrument(skip_all, fields(transactions = group.len()))]
async fn simulate_and_pack<S: Simulator + ?Sized>(
    simulator: &S,
    group: &TransactionGroup,
    config: &PackerConfig,
) -> Result<TransactionGroup, PackError> {
    group.validate()?;
    let report = simulator
        .simulate(group, &config.simulate)
        .await
        .inspect_err(|err| warn!(error = %err, "simulate call failed"))?;
    pack_validated(group, &report, config)
}

/// Pack against a report obtained elsewhere, without calling a node.
pub fn pack_with_report(
    group: &TransactionGroup,
    report: &SimulationReport,
    config: &PackerConfig,
) -> Result<TransactionGroup, PackError> {
    group.validate()?;
    pack_validated(group, report, config)
}

fn pack_validated(
    group: &TransactionGroup,
    report: &SimulationReport,
    config: &PackerConfig,
) -> Result<TransactionGroup, PackError> {
    if let Some(failure) = &report.failure {
        warn!(index = failure.at_index, message = %failure.message, "simulation reported a failure");
        return Err(PackError::SimulationFailure {
            index: failure.at_index,
            message: failure.message.clone(),
        });
    }

    let accesses = classify(report, group.len(), config.transaction_scope)?;
    if accesses.is_empty() {
        debug!("no unnamed resources reported");
    }

    let plan = place(group, &accesses).inspect_err(|err| {
        warn!(kind = err.error_kind(), error = %err, "placement failed");
    })?;
    let packed = rewrite(group, &plan)?;
    info!(
        shared = accesses.group.len(),
        bound = accesses.per_transaction.len(),
        "packed unnamed resources"
    );
    Ok(packed)
}
