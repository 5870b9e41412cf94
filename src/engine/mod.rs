pub mod join;
pub mod query;
pub mod report;

pub use join::{with_live_lots, LiveCarpark, LotIndex, SnapshotState};
pub use report::write_report;
