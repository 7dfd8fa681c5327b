pub mod index;
pub mod lock;
pub mod paths;
pub mod store;

pub use index::{FileOperation, Snapshot, SnapshotFile, SnapshotIndex};
pub use lock::WorkspaceLock;
pub use paths::MendPaths;
pub use store::{
    RestoreError, RollbackOptions, RollbackReport, SnapshotStats, SnapshotStore,
    DEFAULT_SNAPSHOT_KEEP_DAYS,
};
