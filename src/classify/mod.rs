use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::capacity::{AccessKind, MAX_TOTAL_REFERENCES};
use crate::config::TransactionScopePolicy;
use crate::error::PackError;
use crate::group::{Address, AssetId, BoxReference, ContractId};
use crate::simulate::{SimulationReport, UnnamedResources};

/// The entity behind one unnamed access.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnnamedResource {
    ContractLocal { contract: ContractId, account: Address },
    AssetHolding { asset: AssetId, account: Address },
    Box { reference: BoxReference },
    Asset { asset: AssetId },
    Account { account: Address },
    Contract { contract: ContractId },
    ExtraBoxRef,
}

impl UnnamedResource {
    pub fn kind(&self) -> AccessKind {
        match self {
            UnnamedResource::ContractLocal { .. } => AccessKind::ContractLocal,
            UnnamedResource::AssetHolding { .. } => AccessKind::AssetHolding,
            UnnamedResource::Box { .. } => AccessKind::Box,
            UnnamedResource::Asset { .. } => AccessKind::Asset,
            UnnamedResource::Account { .. } => AccessKind::Account,
            UnnamedResource::Contract { .. } => AccessKind::Contract,
            UnnamedResource::ExtraBoxRef => AccessKind::ExtraBoxRef,
        }
    }
}

impl fmt::Display for UnnamedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnnamedResource::ContractLocal { contract, account } => {
                write!(f, "local state of {account} in contract {contract}")
            }
            UnnamedResource::AssetHolding { asset, account } => {
                write!(f, "holding of asset {asset} by {account}")
            }
            UnnamedResource::Box { reference } => write!(f, "box {reference}"),
            UnnamedResource::Asset { asset } => write!(f, "asset {asset}"),
            UnnamedResource::Account { account } => write!(f, "account {account}"),
            UnnamedResource::Contract { contract } => write!(f, "contract {contract}"),
            UnnamedResource::ExtraBoxRef => f.write_str("extra box reference"),
        }
    }
}

/// Where an access may be placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessScope {
    /// Any transaction in the group.
    Group,
    /// Only the transaction at this index.
    Transaction(usize),
}

impl fmt::Display for AccessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessScope::Group => f.write_str("group"),
            AccessScope::Transaction(index) => write!(f, "transaction {index}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnnamedAccess {
    pub resource: UnnamedResource,
    pub scope: AccessScope,
}

impl UnnamedAccess {
    pub fn kind(&self) -> AccessKind {
        self.resource.kind()
    }
}

/// Report entries in placement order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassifiedAccesses {
    pub group: Vec<UnnamedAccess>,
    pub per_transaction: Vec<UnnamedAccess>,
}

impl ClassifiedAccesses {
    pub fn is_empty(&self) -> bool {
        self.group.is_empty() && self.per_transaction.is_empty()
    }

    pub fn len(&self) -> usize {
        self.group.len() + self.per_transaction.len()
    }
}

pub fn classify(
    report: &SimulationReport,
    group_len: usize,
    policy: TransactionScopePolicy,
) -> Result<ClassifiedAccesses, PackError> {
    if report.per_transaction.len() > group_len {
        return Err(PackError::ProtocolViolation(format!(
            "report covers {} transactions but the group has {group_len}",
            report.per_transaction.len()
        )));
    }

    let mut classified = ClassifiedAccesses::default();
    if let Some(shared) = &report.group {
        check_demand(shared, AccessScope::Group, group_len)?;
        expand(shared, AccessScope::Group, &mut classified.group);
    }

    for (index, entry) in report.per_transaction.iter().enumerate() {
        let Some(resources) = entry else {
            continue;
        };
        let scope = AccessScope::Transaction(index);
        if let Some(kind) = unexpected_at_transaction_scope(resources) {
            match policy {
                TransactionScopePolicy::Strict => {
                    return Err(PackError::UnsupportedAccess { kind, scope });
                }
                TransactionScopePolicy::Relaxed => {
                    warn!(%kind, %scope, "placing access the node does not normally report per transaction");
                }
            }
        }
        check_demand(resources, scope, 1)?;
        expand(resources, scope, &mut classified.per_transaction);
    }

    Ok(classified)
}

/// First kind in `resources` that the node should only report group-wide.
pub(crate) fn unexpected_at_transaction_scope(resources: &UnnamedResources) -> Option<AccessKind> {
    if !resources.boxes.is_empty() {
        Some(AccessKind::Box)
    } else if resources.extra_box_refs > 0 {
        Some(AccessKind::ExtraBoxRef)
    } else if !resources.contract_locals.is_empty() {
        Some(AccessKind::ContractLocal)
    } else if !resources.asset_holdings.is_empty() {
        Some(AccessKind::AssetHolding)
    } else {
        None
    }
}

/// Fails before expansion when `resources` need more slots than `transactions`
/// contract calls could ever hold. Reports the kind that crosses the bound.
fn check_demand(
    resources: &UnnamedResources,
    scope: AccessScope,
    transactions: usize,
) -> Result<(), PackError> {
    let capacity = (transactions as u64).saturating_mul(MAX_TOTAL_REFERENCES as u64);
    let mut demand: u64 = 0;
    for kind in AccessKind::PLACEMENT_ORDER {
        let count = match kind {
            AccessKind::ContractLocal => resources.contract_locals.len() as u64,
            AccessKind::AssetHolding => resources.asset_holdings.len() as u64,
            AccessKind::Box => resources.boxes.len() as u64,
            AccessKind::Asset => resources.assets.len() as u64,
            AccessKind::Account => resources.accounts.len() as u64,
            AccessKind::Contract => resources.contracts.len() as u64,
            AccessKind::ExtraBoxRef => resources.extra_box_refs,
        };
        demand = demand.saturating_add(count.saturating_mul(kind.slots() as u64));
        if demand > capacity {
            return Err(PackError::CapacityExhausted { kind, scope });
        }
    }
    Ok(())
}

fn expand(resources: &UnnamedResources, scope: AccessScope, out: &mut Vec<UnnamedAccess>) {
    let mut push = |resource: UnnamedResource| out.push(UnnamedAccess { resource, scope });
    for kind in AccessKind::PLACEMENT_ORDER {
        match kind {
            AccessKind::ContractLocal => {
                for local in &resources.contract_locals {
                    push(UnnamedResource::ContractLocal {
                        contract: local.contract,
                        account: local.account.clone(),
                    });
                }
            }
            AccessKind::AssetHolding => {
                for holding in &resources.asset_holdings {
                    push(UnnamedResource::AssetHolding {
                        asset: holding.asset,
                        account: holding.account.clone(),
                    });
                }
            }
            AccessKind::Box => {
                for reference in &resources.boxes {
                    push(UnnamedResource::Box {
                        reference: reference.clone(),
                    });
                }
            }
            AccessKind::Asset => {
                for asset in &resources.assets {
                    push(UnnamedResource::Asset { asset: *asset });
                }
            }
            AccessKind::Account => {
                for account in &resources.accounts {
                    push(UnnamedResource::Account {
                        account: account.clone(),
                    });
                }
            }
            AccessKind::Contract => {
                for contract in &resources.contracts {
                    push(UnnamedResource::Contract {
                        contract: *contract,
                    });
                }
            }
            AccessKind::ExtraBoxRef => {
                for _ in 0..resources.extra_box_refs {
                    push(UnnamedResource::ExtraBoxRef);
                }
            }
        }
    }
}
