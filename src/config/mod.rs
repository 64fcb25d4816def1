use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::simulate::SimulateOptions;

/// How accesses that the node is not expected to report per transaction are
/// handled when they show up there anyway.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionScopePolicy {
    /// Boxes, extra box refs, contract locals and asset holdings at
    /// transaction scope fail the pass.
    #[default]
    Strict,
    /// Place them on the bound transaction like any other bound access.
    Relaxed,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackerConfig {
    pub simulate: SimulateOptions,
    pub transaction_scope: TransactionScopePolicy,
}

impl PackerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn with_transaction_scope(mut self, policy: TransactionScopePolicy) -> Self {
        self.transaction_scope = policy;
        self
    }
}
