pub mod holdings;
pub mod proposals;
pub mod snapshots;

pub use holdings::{HoldingsStore, InMemoryHoldingsStore};
pub use proposals::ProposalStore;
pub use snapshots::SnapshotStore;
