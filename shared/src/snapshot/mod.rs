mod reconciler;

pub use reconciler::{SnapshotPoll, SnapshotReconciler};
