//! Simulation report wire types and the node-client seam.
//!
//! The node runs the group speculatively with unnamed resources allowed and
//! reports every access the reference tables did not name, once for the whole
//! group and once per transaction.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NodeError;
use crate::group::{Address, AssetId, BoxReference, ContractId, TransactionGroup};

pub mod mock;

pub use mock::MockSimulator;

/// Flags sent with the simulate request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulateOptions {
    pub allow_unnamed_resources: bool,
    pub allow_empty_signatures: bool,
    pub extra_opcode_budget: u64,
}

impl Default for SimulateOptions {
    fn default() -> Self {
        Self {
            allow_unnamed_resources: true,
            allow_empty_signatures: true,
            extra_opcode_budget: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationFailure {
    pub at_index: usize,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractLocalRef {
    pub contract: ContractId,
    pub account: Address,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetHoldingRef {
    pub asset: AssetId,
    pub account: Address,
}

/// Accesses the reference tables did not name, at one scope.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UnnamedResources {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<Address>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contracts: Vec<ContractId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<AssetId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub boxes: Vec<BoxReference>,
    #[serde(skip_serializing_if = "is_zero")]
    pub extra_box_refs: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contract_locals: Vec<ContractLocalRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub asset_holdings: Vec<AssetHoldingRef>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl UnnamedResources {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.contracts.is_empty()
            && self.assets.is_empty()
            && self.boxes.is_empty()
            && self.extra_box_refs == 0
            && self.contract_locals.is_empty()
            && self.asset_holdings.is_empty()
    }
}

/// What one simulate call reported for a group.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<SimulationFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<UnnamedResources>,
    #[serde(default)]
    pub per_transaction: Vec<Option<UnnamedResources>>,
}

impl SimulationReport {
    pub fn from_json(raw: &str) -> Result<Self, NodeError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// A report with nothing to place and no failure.
    pub fn is_clean(&self) -> bool {
        self.failure.is_none()
            && self.group.as_ref().map_or(true, UnnamedResources::is_empty)
            && self
                .per_transaction
                .iter()
                .flatten()
                .all(UnnamedResources::is_empty)
    }
}

/// Node client able to simulate a transaction group.
#[async_trait]
pub trait Simulator: Send + Sync {
    async fn simulate(
        &self,
        group: &TransactionGroup,
        options: &SimulateOptions,
    ) -> Result<SimulationReport, NodeError>;
}

#[async_trait]
impl<S: Simulator + ?Sized> Simulator for Arc<S> {
    async fn simulate(
        &self,
        group: &TransactionGroup,
        options: &SimulateOptions,
    ) -> Result<SimulationReport, NodeError> {
        (**self).simulate(group, options).await
    }
}

/// Byte strings travel base64-encoded in node JSON.
pub(crate) mod serde_base64 {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&general_purpose::STANDARD.encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_node_report() {
        let report = SimulationReport::from_json(
            r#"{
                "group": {
                    "boxes": [{"ownerContract": 1002, "name": "c21hbGw="}],
                    "extraBoxRefs": 2,
                    "assetHoldings": [{"asset": 77, "account": "ALICE"}]
                },
                "perTransaction": [null, {"accounts": ["BOB"]}]
            }"#,
        )
        .unwrap();

        let group = report.group.as_ref().unwrap();
        assert_eq!(group.boxes, vec![BoxReference::new(1002, b"small".to_vec())]);
        assert_eq!(group.extra_box_refs, 2);
        assert_eq!(group.asset_holdings[0].asset, 77);
        assert!(report.per_transaction[0].is_none());
        assert_eq!(
            report.per_transaction[1].as_ref().unwrap().accounts,
            vec!["BOB".to_string()]
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn failure_is_read_from_the_report() {
        let report =
            SimulationReport::from_json(r#"{"failure": {"atIndex": 0, "message": "boom"}}"#)
                .unwrap();
        assert_eq!(
            report.failure,
            Some(SimulationFailure {
                at_index: 0,
                message: "boom".into(),
            })
        );
        assert!(report.per_transaction.is_empty());
        assert!(!report.is_clean());
    }

    #[test]
    fn malformed_box_names_are_decode_errors() {
        let err = SimulationReport::from_json(
            r#"{"group": {"boxes": [{"ownerContract": 1, "name": "!!"}]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, NodeError::Decode(_)));
    }

    #[test]
    fn empty_scopes_count_as_clean() {
        let report = SimulationReport {
            failure: None,
            group: Some(UnnamedResources::default()),
            per_transaction: vec![None, Some(UnnamedResources::default())],
        };
        assert!(report.is_clean());
    }

    #[test]
    fn default_options_allow_unnamed_resources() {
        let options: SimulateOptions = serde_json::from_str(r#"{"extraOpcodeBudget": 700}"#).unwrap();
        assert!(options.allow_unnamed_resources);
        assert!(options.allow_empty_signatures);
        assert_eq!(options.extra_opcode_budget, 700);
    }
}
