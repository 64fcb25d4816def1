use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::capacity::{Occupancy, MAX_GROUP_SIZE};
use crate::error::PackError;

pub type Address = String;
pub type ContractId = u64;
pub type AssetId = u64;
pub type GroupId = [u8; 32];

/// A named unit of persistent storage owned by a contract.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BoxReference {
    #[serde(rename = "ownerContract")]
    pub contract: ContractId,
    #[serde(with = "crate::simulate::serde_base64")]
    pub name: Vec<u8>,
}

impl BoxReference {
    pub fn new(contract: ContractId, name: impl Into<Vec<u8>>) -> Self {
        Self {
            contract,
            name: name.into(),
        }
    }

    /// Empty reference that only buys additional box I/O quota.
    pub fn placeholder() -> Self {
        Self {
            contract: 0,
            name: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.contract == 0 && self.name.is_empty()
    }
}

impl fmt::Display for BoxReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contract, hex::encode(&self.name))
    }
}

/// The bounded reference tables of one contract call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ReferenceTables {
    #[serde(default)]
    pub accounts: Vec<Address>,
    #[serde(default)]
    pub contracts: Vec<ContractId>,
    #[serde(default)]
    pub assets: Vec<AssetId>,
    #[serde(default)]
    pub boxes: Vec<BoxReference>,
}

impl ReferenceTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.accounts.len() + self.contracts.len() + self.assets.len() + self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    Payment {
        receiver: Address,
        amount: u64,
    },
    AssetTransfer {
        asset: AssetId,
        receiver: Address,
        amount: u64,
    },
    ContractCall {
        contract: ContractId,
        #[serde(default)]
        references: ReferenceTables,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub sender: Address,
    pub fee: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
}

impl Transaction {
    pub fn new(sender: impl Into<Address>, kind: TransactionKind) -> Self {
        Self {
            sender: sender.into(),
            fee: 1_000,
            note: None,
            kind,
            group: None,
        }
    }

    pub fn contract_call(sender: impl Into<Address>, contract: ContractId) -> Self {
        Self::new(
            sender,
            TransactionKind::ContractCall {
                contract,
                references: ReferenceTables::new(),
            },
        )
    }

    pub fn payment(sender: impl Into<Address>, receiver: impl Into<Address>, amount: u64) -> Self {
        Self::new(
            sender,
            TransactionKind::Payment {
                receiver: receiver.into(),
                amount,
            },
        )
    }

    /// Replace the reference tables of a contract call. No-op for other kinds.
    pub fn with_references(mut self, tables: ReferenceTables) -> Self {
        if let Some(references) = self.references_mut() {
            *references = tables;
        }
        self
    }

    pub fn with_fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn references(&self) -> Option<&ReferenceTables> {
        match &self.kind {
            TransactionKind::ContractCall { references, .. } => Some(references),
            _ => None,
        }
    }

    pub fn references_mut(&mut self) -> Option<&mut ReferenceTables> {
        match &mut self.kind {
            TransactionKind::ContractCall { references, .. } => Some(references),
            _ => None,
        }
    }

    /// Content digest of the transaction, independent of its group tag.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"txn");
        hasher.update(self.sender.as_bytes());
        hasher.update(self.fee.to_le_bytes());
        if let Some(note) = &self.note {
            hasher.update(b"note");
            hasher.update(note.as_bytes());
        }
        match &self.kind {
            TransactionKind::Payment { receiver, amount } => {
                hasher.update(b"pay");
                hasher.update(receiver.as_bytes());
                hasher.update(amount.to_le_bytes());
            }
            TransactionKind::AssetTransfer {
                asset,
                receiver,
                amount,
            } => {
                hasher.update(b"axfer");
                hasher.update(asset.to_le_bytes());
                hasher.update(receiver.as_bytes());
                hasher.update(amount.to_le_bytes());
            }
            TransactionKind::ContractCall {
                contract,
                references,
            } => {
                hasher.update(b"call");
                hasher.update(contract.to_le_bytes());
                for account in &references.accounts {
                    hasher.update(b"acct");
                    hasher.update(account.as_bytes());
                }
                for contract in &references.contracts {
                    hasher.update(b"app");
                    hasher.update(contract.to_le_bytes());
                }
                for asset in &references.assets {
                    hasher.update(b"asa");
                    hasher.update(asset.to_le_bytes());
                }
                for reference in &references.boxes {
                    hasher.update(b"box");
                    hasher.update(reference.contract.to_le_bytes());
                    hasher.update((reference.name.len() as u64).to_le_bytes());
                    hasher.update(&reference.name);
                }
            }
        }
        hasher.finalize().into()
    }
}

/// Ordered transactions submitted as one atomic unit. Position is identity.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct TransactionGroup {
    transactions: Vec<Transaction>,
}

impl TransactionGroup {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Transaction> {
        self.transactions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.transactions.iter()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    /// Checks the group size and that no contract call is already over its
    /// reference limits.
    pub fn validate(&self) -> Result<(), PackError> {
        if self.is_empty() {
            return Err(PackError::InvalidGroup("group has no transactions".into()));
        }
        if self.len() > MAX_GROUP_SIZE {
            return Err(PackError::InvalidGroup(format!(
                "group has {} transactions, limit is {MAX_GROUP_SIZE}",
                self.len()
            )));
        }
        for (index, txn) in self.iter().enumerate() {
            if let Some(tables) = txn.references() {
                if !Occupancy::of(tables).within_limits() {
                    return Err(PackError::InvalidGroup(format!(
                        "transaction {index} already exceeds its reference limits"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Group id over the transaction digests, ignoring any current tags.
    pub fn compute_group_id(&self) -> GroupId {
        let mut hasher = Sha256::new();
        hasher.update(b"TG");
        for txn in &self.transactions {
            hasher.update(txn.digest());
        }
        hasher.finalize().into()
    }

    /// Stamp every transaction with the group id so the group can be signed.
    pub fn link(&mut self) -> GroupId {
        let id = self.compute_group_id();
        for txn in &mut self.transactions {
            txn.group = Some(id);
        }
        id
    }

    pub fn unlink(&mut self) {
        for txn in &mut self.transactions {
            txn.group = None;
        }
    }

    /// The shared group id, if every transaction carries the same one.
    pub fn group_id(&self) -> Option<GroupId> {
        let first = self.transactions.first()?.group?;
        self.transactions
            .iter()
            .all(|txn| txn.group == Some(first))
            .then_some(first)
    }
}

impl From<Vec<Transaction>> for TransactionGroup {
    fn from(transactions: Vec<Transaction>) -> Self {
        Self::new(transactions)
    }
}

impl<'a> IntoIterator for &'a TransactionGroup {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.iter()
    }
}
