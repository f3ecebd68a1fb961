use log::{debug, warn};

use crate::{
    messages::transition::{RoleAssignment, TransitionAck},
    types::{PeerId, Place, Role},
};

/// A transition the local peer was told to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionRequest {
    pub epoch: u8,
    pub role: Role,
    pub place: Place,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// Start the local transition, then call `complete`
    Transition(TransitionRequest),
    /// Already at the target: ack again right away
    Reack(TransitionAck),
    Ignored,
}

/// Receiving side of a barrier transition.
///
/// Exactly one ack is produced per completed transition. Seeing the same
/// assignment again after completion acks again.
pub struct BarrierParticipant {
    local: PeerId,
    pending: Option<TransitionRequest>,
    completed: Option<TransitionRequest>,
}

impl BarrierParticipant {
    pub fn new(local: PeerId) -> Self {
        Self {
            local,
            pending: None,
            completed: None,
        }
    }

    pub fn pending(&self) -> Option<TransitionRequest> {
        self.pending
    }

    pub fn on_assignment(
        &mut self,
        sender: PeerId,
        host: Option<PeerId>,
        assignment: &RoleAssignment,
    ) -> AssignmentOutcome {
        if host != Some(sender) {
            warn!(
                "Role assignment from {} ignored: session host is {:?}",
                sender, host
            );
            return AssignmentOutcome::Ignored;
        }
        if assignment.peer != self.local {
            debug!("Role assignment for {} delivered to {}", assignment.peer, self.local);
            return AssignmentOutcome::Ignored;
        }

        let request = TransitionRequest {
            epoch: assignment.epoch,
            role: assignment.role,
            place: assignment.role.target_place(),
        };
        if self.completed == Some(request) {
            return AssignmentOutcome::Reack(self.ack_for(request));
        }
        if self.pending == Some(request) {
            return AssignmentOutcome::Ignored;
        }
        self.pending = Some(request);
        AssignmentOutcome::Transition(request)
    }

    /// Called when the local peer finished moving to `place`. Returns the ack
    /// if this completes the pending transition.
    pub fn complete(&mut self, place: Place) -> Option<TransitionAck> {
        let request = self.pending?;
        if request.place != place {
            return None;
        }
        self.pending = None;
        self.completed = Some(request);
        Some(self.ack_for(request))
    }

    fn ack_for(&self, request: TransitionRequest) -> TransitionAck {
        TransitionAck {
            peer: self.local,
            place: request.place,
            epoch: request.epoch,
        }
    }
}
