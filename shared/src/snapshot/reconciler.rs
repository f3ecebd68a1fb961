use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::{messages::snapshot::SnapshotRequest, types::PeerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotPoll {
    Idle,
    Waiting,
    /// Broadcast the request again
    Retry { attempt: u32, request: SnapshotRequest },
    GaveUp { attempts: u32 },
}

struct PendingSnapshot {
    attempts: u32,
    deadline: Instant,
}

/// Requester side of the late-join snapshot pull.
///
/// The lowest id other than the requester answers a request. Each attempt
/// waits `timeout`; after `max_attempts` unanswered requests the pull gives up.
pub struct SnapshotReconciler {
    local: PeerId,
    timeout: Duration,
    max_attempts: u32,
    pending: Option<PendingSnapshot>,
}

impl SnapshotReconciler {
    pub fn new(local: PeerId, timeout: Duration, max_attempts: u32) -> Self {
        Self {
            local,
            timeout,
            max_attempts: max_attempts.max(1),
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts a pull. Returns `None` while one is already in flight.
    pub fn request(&mut self, now: Instant) -> Option<SnapshotRequest> {
        if self.pending.is_some() {
            debug!("{} already waiting for a snapshot", self.local);
            return None;
        }
        self.pending = Some(PendingSnapshot {
            attempts: 1,
            deadline: now + self.timeout,
        });
        info!("{} requesting world snapshot", self.local);
        Some(SnapshotRequest {
            requester: self.local,
        })
    }

    /// Records that a response arrived. Every response is applied; the last
    /// one processed wins. Returns whether a request was outstanding.
    pub fn on_response(&mut self, sender: PeerId, source: Option<PeerId>) -> bool {
        if source != Some(sender) {
            warn!(
                "Snapshot from {} while {:?} is expected to serve it",
                sender, source
            );
        }
        self.pending.take().is_some()
    }

    pub fn poll(&mut self, now: Instant) -> SnapshotPoll {
        let Some(pending) = self.pending.as_mut() else {
            return SnapshotPoll::Idle;
        };
        if now < pending.deadline {
            return SnapshotPoll::Waiting;
        }
        if pending.attempts >= self.max_attempts {
            let attempts = pending.attempts;
            self.pending = None;
            warn!("No snapshot response after {} attempts; giving up", attempts);
            return SnapshotPoll::GaveUp { attempts };
        }
        pending.attempts += 1;
        pending.deadline = now + self.timeout;
        SnapshotPoll::Retry {
            attempt: pending.attempts,
            request: SnapshotRequest {
                requester: self.local,
            },
        }
    }
}
