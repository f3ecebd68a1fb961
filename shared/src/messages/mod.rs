pub mod channels;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod message_kinds;
pub mod outbox;
pub mod presence;
pub mod replication;
pub mod snapshot;
pub mod transition;
pub mod world_state;
