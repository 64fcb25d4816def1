//! First-fit placement of unnamed accesses onto reference-table slots.
//!
//! Group-shared accesses scan the group left to right and land on the first
//! contract call with headroom for their kind. Transaction-scoped accesses go
//! to their bound transaction or nowhere. Counters update as each access is
//! placed, so later accesses see the reduced headroom. The caller's group is
//! only read; the result is a [`PlacementPlan`] for the rewriter.

use tracing::{debug, trace};

use crate::capacity::Occupancy;
use crate::classify::{AccessScope, ClassifiedAccesses, UnnamedAccess};
use crate::error::PackError;
use crate::group::TransactionGroup;

/// One access assigned to one transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub transaction: usize,
    pub access: UnnamedAccess,
}

/// Placements in the order they were decided.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlacementPlan {
    placements: Vec<Placement>,
}

impl PlacementPlan {
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Placement> {
        self.placements.iter()
    }

    pub fn placements_for(&self, transaction: usize) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(move |placement| placement.transaction == transaction)
    }
}

/// Slot counters for every transaction in a group, indexed by position.
/// `None` marks a transaction without reference tables.
pub struct PlacementEngine {
    slots: Vec<Option<Occupancy>>,
    plan: PlacementPlan,
}

impl PlacementEngine {
    pub fn new(group: &TransactionGroup) -> Self {
        Self {
            slots: group
                .iter()
                .map(|txn| txn.references().map(Occupancy::of))
                .collect(),
            plan: PlacementPlan::default(),
        }
    }

    pub fn occupancy(&self, transaction: usize) -> Option<Occupancy> {
        self.slots.get(transaction).copied().flatten()
    }

    /// Place on the first transaction, in group order, with headroom.
    pub fn place_shared(&mut self, access: &UnnamedAccess) -> Result<usize, PackError> {
        let kind = access.kind();
        let index = self
            .slots
            .iter()
            .position(|slot| slot.is_some_and(|occupancy| occupancy.has_room_for(kind)))
            .ok_or(PackError::CapacityExhausted {
                kind,
                scope: AccessScope::Group,
            })?;
        self.commit(index, access);
        Ok(index)
    }

    /// Place on the transaction the access is bound to.
    pub fn place_bound(&mut self, index: usize, access: &UnnamedAccess) -> Result<(), PackError> {
        let kind = access.kind();
        let slot = self.slots.get(index).ok_or_else(|| {
            PackError::ProtocolViolation(format!(
                "{kind} access bound to transaction {index} outside a group of {}",
                self.slots.len()
            ))
        })?;
        let occupancy = slot.ok_or_else(|| {
            PackError::ProtocolViolation(format!(
                "{kind} access bound to transaction {index}, which carries no reference tables"
            ))
        })?;
        if !occupancy.has_room_for(kind) {
            return Err(PackError::CapacityExhausted {
                kind,
                scope: AccessScope::Transaction(index),
            });
        }
        self.commit(index, access);
        Ok(())
    }

    pub fn finish(self) -> PlacementPlan {
        self.plan
    }

    fn commit(&mut self, index: usize, access: &UnnamedAccess) {
        if let Some(occupancy) = self.slots[index].as_mut() {
            occupancy.reserve(access.kind());
        }
        trace!(transaction = index, resource = %access.resource, "placed unnamed access");
        self.plan.placements.push(Placement {
            transaction: index,
            access: access.clone(),
        });
    }
}

/// Decide a slot for every classified access, group-shared ones first.
pub fn place(
    group: &TransactionGroup,
    accesses: &ClassifiedAccesses,
) -> Result<PlacementPlan, PackError> {
    let mut engine = PlacementEngine::new(group);

    for access in &accesses.group {
        match access.scope {
            AccessScope::Group => {
                engine.place_shared(access)?;
            }
            AccessScope::Transaction(index) => {
                return Err(PackError::ProtocolViolation(format!(
                    "{} access bound to transaction {index} listed as group-shared",
                    access.kind()
                )));
            }
        }
    }

    for access in &accesses.per_transaction {
        match access.scope {
            AccessScope::Transaction(index) => engine.place_bound(index, access)?,
            AccessScope::Group => {
                return Err(PackError::ProtocolViolation(format!(
                    "group-shared {} access listed per transaction",
                    access.kind()
                )));
            }
        }
    }

    let plan = engine.finish();
    debug!(placements = plan.len(), "placement finished");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::AccessKind;
    use crate::classify::UnnamedResource;
    use crate::group::{ReferenceTables, Transaction};

    fn call(accounts: usize, contracts: usize) -> Transaction {
        Transaction::contract_call("SENDER", 1).with_references(ReferenceTables {
            accounts: (0..accounts).map(|i| format!("A{i}")).collect(),
            contracts: (0..contracts as u64).map(|i| 100 + i).collect(),
            ..ReferenceTables::default()
        })
    }

    fn shared(resource: UnnamedResource) -> UnnamedAccess {
        UnnamedAccess {
            resource,
            scope: AccessScope::Group,
        }
    }

    fn bound(index: usize, resource: UnnamedResource) -> UnnamedAccess {
        UnnamedAccess {
            resource,
            scope: AccessScope::Transaction(index),
        }
    }

    fn account(name: &str) -> UnnamedResource {
        UnnamedResource::Account {
            account: name.into(),
        }
    }

    #[test]
    fn shared_accesses_fill_the_first_slot_before_moving_on() {
        let group = TransactionGroup::new(vec![call(0, 6), call(0, 0)]);
        let accesses = ClassifiedAccesses {
            group: (0..4).map(|i| shared(UnnamedResource::Asset { asset: i })).collect(),
            ..ClassifiedAccesses::default()
        };
        let plan = place(&group, &accesses).unwrap();
        let targets: Vec<_> = plan.iter().map(|p| p.transaction).collect();
        assert_eq!(targets, vec![0, 0, 1, 1]);
    }

    #[test]
    fn cross_reference_skips_a_slot_without_two_free_places() {
        let group = TransactionGroup::new(vec![call(1, 6), call(0, 0)]);
        let accesses = ClassifiedAccesses {
            group: vec![
                shared(UnnamedResource::ContractLocal {
                    contract: 9,
                    account: "L".into(),
                }),
                shared(account("X")),
            ],
            ..ClassifiedAccesses::default()
        };
        let plan = place(&group, &accesses).unwrap();
        let targets: Vec<_> = plan.iter().map(|p| p.transaction).collect();
        assert_eq!(targets, vec![1, 0]);
    }

    #[test]
    fn payments_are_never_chosen() {
        let group = TransactionGroup::new(vec![
            Transaction::payment("alice", "bob", 10),
            call(0, 0),
        ]);
        let accesses = ClassifiedAccesses {
            group: vec![shared(account("X"))],
            ..ClassifiedAccesses::default()
        };
        let plan = place(&group, &accesses).unwrap();
        assert_eq!(plan.placements_for(1).count(), 1);
        assert_eq!(plan.placements_for(0).count(), 0);
    }

    #[test]
    fn exhausted_group_fails_without_a_plan() {
        let group = TransactionGroup::new(vec![call(4, 0)]);
        let accesses = ClassifiedAccesses {
            group: vec![shared(account("X"))],
            ..ClassifiedAccesses::default()
        };
        match place(&group, &accesses) {
            Err(PackError::CapacityExhausted { kind, scope }) => {
                assert_eq!(kind, AccessKind::Account);
                assert_eq!(scope, AccessScope::Group);
            }
            other => panic!("expected capacity exhausted, got {other:?}"),
        }
    }

    #[test]
    fn bound_accesses_stay_on_their_transaction() {
        let group = TransactionGroup::new(vec![call(0, 0), call(0, 0)]);
        let accesses = ClassifiedAccesses {
            per_transaction: vec![
                bound(1, account("X")),
                bound(1, UnnamedResource::Contract { contract: 3 }),
            ],
            ..ClassifiedAccesses::default()
        };
        let plan = place(&group, &accesses).unwrap();
        assert!(plan.iter().all(|p| p.transaction == 1));
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn full_bound_transaction_is_not_rebalanced() {
        let group = TransactionGroup::new(vec![call(0, 0), call(4, 0)]);
        let accesses = ClassifiedAccesses {
            per_transaction: vec![bound(1, account("X"))],
            ..ClassifiedAccesses::default()
        };
        assert!(matches!(
            place(&group, &accesses),
            Err(PackError::CapacityExhausted {
                scope: AccessScope::Transaction(1),
                ..
            })
        ));
    }

    #[test]
    fn bound_to_a_transaction_without_tables_is_a_protocol_violation() {
        let group = TransactionGroup::new(vec![Transaction::payment("alice", "bob", 1)]);
        let accesses = ClassifiedAccesses {
            per_transaction: vec![bound(0, account("X"))],
            ..ClassifiedAccesses::default()
        };
        assert!(matches!(
            place(&group, &accesses),
            Err(PackError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn engine_counters_reflect_earlier_placements() {
        let group = TransactionGroup::new(vec![call(0, 0)]);
        let mut engine = PlacementEngine::new(&group);
        engine
            .place_shared(&shared(UnnamedResource::AssetHolding {
                asset: 5,
                account: "H".into(),
            }))
            .unwrap();
        let occupancy = engine.occupancy(0).unwrap();
        assert_eq!((occupancy.accounts, occupancy.assets, occupancy.total()), (1, 1, 2));
        assert_eq!(engine.finish().len(), 1);
    }
}
