mod coordinator;
mod deadline_timer;
mod error;
mod participant;

pub use coordinator::{BarrierCoordinator, BarrierProgress, BarrierStart, BarrierTimeout};
pub use deadline_timer::DeadlineTimer;
pub use error::BarrierError;
pub use participant::{AssignmentOutcome, BarrierParticipant, TransitionRequest};
