use std::fmt;

use serde::{Deserialize, Serialize};

use crate::group::ReferenceTables;

/// Account references a single contract call may carry.
pub const MAX_ACCOUNT_REFERENCES: usize = 4;
/// Combined accounts, contracts, assets and boxes per contract call.
pub const MAX_TOTAL_REFERENCES: usize = 8;
/// Transactions in one atomic group.
pub const MAX_GROUP_SIZE: usize = 16;

/// Every kind of unnamed access the execution engine reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    ContractLocal,
    AssetHolding,
    Box,
    Asset,
    Account,
    Contract,
    ExtraBoxRef,
}

impl AccessKind {
    /// Placement order for group-shared accesses. Two-slot kinds go first
    /// while the group still has the most headroom.
    pub const PLACEMENT_ORDER: [AccessKind; 7] = [
        AccessKind::ContractLocal,
        AccessKind::AssetHolding,
        AccessKind::Box,
        AccessKind::Asset,
        AccessKind::Account,
        AccessKind::Contract,
        AccessKind::ExtraBoxRef,
    ];

    pub fn slots(self) -> usize {
        if self.is_cross_reference() {
            2
        } else {
            1
        }
    }

    /// Kinds that need an account plus a contract or asset on the same call.
    pub fn is_cross_reference(self) -> bool {
        matches!(self, AccessKind::ContractLocal | AccessKind::AssetHolding)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessKind::ContractLocal => "contract local",
            AccessKind::AssetHolding => "asset holding",
            AccessKind::Box => "box",
            AccessKind::Asset => "asset",
            AccessKind::Account => "account",
            AccessKind::Contract => "contract",
            AccessKind::ExtraBoxRef => "extra box",
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot counters for one contract call's reference tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Occupancy {
    pub accounts: usize,
    pub contracts: usize,
    pub assets: usize,
    pub boxes: usize,
}

impl Occupancy {
    pub fn of(tables: &ReferenceTables) -> Self {
        Self {
            accounts: tables.accounts.len(),
            contracts: tables.contracts.len(),
            assets: tables.assets.len(),
            boxes: tables.boxes.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.accounts + self.contracts + self.assets + self.boxes
    }

    pub fn within_limits(&self) -> bool {
        self.accounts <= MAX_ACCOUNT_REFERENCES && self.total() <= MAX_TOTAL_REFERENCES
    }

    pub fn has_room_for(&self, kind: AccessKind) -> bool {
        match kind {
            AccessKind::ContractLocal | AccessKind::AssetHolding => {
                self.accounts < MAX_ACCOUNT_REFERENCES
                    && self.total() <= MAX_TOTAL_REFERENCES - kind.slots()
            }
            AccessKind::Account => {
                self.accounts < MAX_ACCOUNT_REFERENCES && self.total() < MAX_TOTAL_REFERENCES
            }
            AccessKind::Box | AccessKind::Asset | AccessKind::Contract | AccessKind::ExtraBoxRef => {
                self.total() < MAX_TOTAL_REFERENCES
            }
        }
    }

    /// Count the slots an access of `kind` consumes. Callers check
    /// [`Occupancy::has_room_for`] first.
    pub fn reserve(&mut self, kind: AccessKind) {
        match kind {
            AccessKind::ContractLocal => {
                self.accounts += 1;
                self.contracts += 1;
            }
            AccessKind::AssetHolding => {
                self.accounts += 1;
                self.assets += 1;
            }
            AccessKind::Account => self.accounts += 1,
            AccessKind::Contract => self.contracts += 1,
            AccessKind::Asset => self.assets += 1,
            AccessKind::Box | AccessKind::ExtraBoxRef => self.boxes += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupancy(accounts: usize, others: usize) -> Occupancy {
        Occupancy {
            accounts,
            contracts: others,
            ..Occupancy::default()
        }
    }

    #[test]
    fn account_needs_both_the_account_cap_and_the_total_cap() {
        assert!(occupancy(3, 0).has_room_for(AccessKind::Account));
        assert!(!occupancy(4, 0).has_room_for(AccessKind::Account));
        assert!(!occupancy(3, 5).has_room_for(AccessKind::Account));
        assert!(occupancy(0, 7).has_room_for(AccessKind::Asset));
        assert!(!occupancy(0, 8).has_room_for(AccessKind::Box));
        assert!(occupancy(4, 3).has_room_for(AccessKind::Contract));
    }

    #[test]
    fn cross_references_keep_two_slots_in_reserve() {
        assert!(occupancy(0, 6).has_room_for(AccessKind::AssetHolding));
        assert!(!occupancy(0, 7).has_room_for(AccessKind::AssetHolding));
        assert!(occupancy(3, 3).has_room_for(AccessKind::ContractLocal));
        assert!(!occupancy(4, 0).has_room_for(AccessKind::ContractLocal));
    }

    #[test]
    fn reserve_touches_the_documented_counters() {
        let mut slot = Occupancy::default();
        slot.reserve(AccessKind::ContractLocal);
        slot.reserve(AccessKind::AssetHolding);
        slot.reserve(AccessKind::ExtraBoxRef);
        assert_eq!(
            slot,
            Occupancy {
                accounts: 2,
                contracts: 1,
                assets: 1,
                boxes: 1,
            }
        );
        assert_eq!(slot.total(), 5);
    }

    #[test]
    fn filling_a_slot_never_exceeds_limits() {
        for kind in AccessKind::PLACEMENT_ORDER {
            let mut slot = Occupancy::default();
            while slot.has_room_for(kind) {
                slot.reserve(kind);
            }
            assert!(slot.within_limits(), "{kind} overflowed: {slot:?}");
            assert!(slot.total() >= MAX_TOTAL_REFERENCES - 1 || slot.accounts == MAX_ACCOUNT_REFERENCES);
        }
    }

    #[test]
    fn only_cross_references_cost_two_slots() {
        let two_slot: Vec<_> = AccessKind::PLACEMENT_ORDER
            .into_iter()
            .filter(|kind| kind.slots() == 2)
            .collect();
        assert_eq!(two_slot, vec![AccessKind::ContractLocal, AccessKind::AssetHolding]);
    }
}
