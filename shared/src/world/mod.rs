pub mod error;
pub mod network_object;
pub mod object_registry;
pub mod presence;
pub mod world_state;
