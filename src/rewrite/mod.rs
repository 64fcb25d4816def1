use crate::classify::UnnamedResource;
use crate::error::PackError;
use crate::group::{BoxReference, ReferenceTables, Transaction, TransactionGroup};
use crate::placement::PlacementPlan;

/// Apply a placement plan to a copy of `group`.
///
/// The returned group is unlinked: every group tag is cleared so the caller
/// can link and sign it as one fresh unit. `group` itself is left untouched.
pub fn rewrite(group: &TransactionGroup, plan: &PlacementPlan) -> Result<TransactionGroup, PackError> {
    let mut transactions: Vec<Transaction> = group.iter().cloned().collect();

    for placement in plan.iter() {
        let index = placement.transaction;
        let tables = transactions
            .get_mut(index)
            .and_then(Transaction::references_mut)
            .ok_or_else(|| {
                PackError::ProtocolViolation(format!(
                    "placement targets transaction {index}, which has no reference tables"
                ))
            })?;
        insert(tables, &placement.access.resource);
    }

    let mut rewritten = TransactionGroup::new(transactions);
    rewritten.unlink();
    Ok(rewritten)
}

fn insert(tables: &mut ReferenceTables, resource: &UnnamedResource) {
    match resource {
        UnnamedResource::ContractLocal { contract, account } => {
            tables.contracts.push(*contract);
            tables.accounts.push(account.clone());
        }
        UnnamedResource::AssetHolding { asset, account } => {
            tables.assets.push(*asset);
            tables.accounts.push(account.clone());
        }
        UnnamedResource::Box { reference } => tables.boxes.push(reference.clone()),
        UnnamedResource::Asset { asset } => tables.assets.push(*asset),
        UnnamedResource::Account { account } => tables.accounts.push(account.clone()),
        UnnamedResource::Contract { contract } => tables.contracts.push(*contract),
        UnnamedResource::ExtraBoxRef => tables.boxes.push(BoxReference::placeholder()),
    }
}
