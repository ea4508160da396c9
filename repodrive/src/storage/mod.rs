mod snapshot;

pub use snapshot::{SNAPSHOT_VERSION, SnapshotError, SnapshotStore};
