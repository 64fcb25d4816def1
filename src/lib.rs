//! Resource-reference packing for atomic transaction groups.
//!
//! Every contract call must name, in small bounded tables, each account,
//! contract, asset and box it touches. A simulate pass against the node
//! reports what was touched but not named; this crate takes that report and
//! rewrites the group's reference tables so a real submission succeeds:
//!
//! * [`capacity`] — per-call slot limits and what each access kind costs.
//! * [`classify`] — turns a report into ordered, typed accesses.
//! * [`placement`] — deterministic first-fit assignment of accesses to calls.
//! * [`rewrite`] — applies a placement plan to a fresh, unlinked group.
//! * [`packer`] — one simulate call, then classify, place and rewrite.
//!
//! The packer never grows the group. When no call has room it fails with
//! [`PackError::CapacityExhausted`] and the caller adds a call and retries.

pub mod capacity;
pub mod classify;
pub mod config;
pub mod group;
pub mod packer;
pub mod placement;
pub mod rewrite;
pub mod simulate;

mod error;

pub use config::{PackerConfig, TransactionScopePolicy};
pub use error::{ConfigError, NodeError, PackError};
pub use group::{BoxReference, ReferenceTables, Transaction, TransactionGroup, TransactionKind};
pub use packer::{pack, pack_with_report, ResourcePacker};
pub use simulate::{SimulateOptions, SimulationReport, Simulator};
