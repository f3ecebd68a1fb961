use std::{default::Default, time::Duration};

use peerlink_shared::Place;

/// Contains Config properties which will be used by a Session
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// How often an owner broadcasts the transform of each object it owns
    pub transform_send_interval: Duration,
    /// How often the holder of a contested object broadcasts its physics state
    pub physics_send_interval: Duration,
    /// Minimum time between two publishes of the shared world by its authority
    pub world_publish_interval: Duration,
    /// How long the host waits for transition acknowledgements before
    /// abandoning a barrier
    pub barrier_timeout: Duration,
    /// How long a snapshot request waits for a response before it is sent again
    pub snapshot_timeout: Duration,
    /// Number of snapshot requests sent before giving up
    pub snapshot_max_attempts: u32,
    /// Minimum time after a contested handoff before the local peer asks
    /// for authority over the same object
    pub authority_cooldown: Duration,
    /// Fraction of the gap to the extrapolated pose closed on each render
    pub extrapolation_blend: f32,
    /// Extrapolation never runs further than this past the last sample
    pub max_extrapolation: Duration,
    /// When set, the shared world is only published to peers in this place
    pub world_recipient_place: Option<Place>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transform_send_interval: Duration::from_millis(50),
            physics_send_interval: Duration::from_millis(50),
            world_publish_interval: Duration::from_millis(100),
            barrier_timeout: Duration::from_secs(10),
            snapshot_timeout: Duration::from_secs(2),
            snapshot_max_attempts: 3,
            authority_cooldown: Duration::from_millis(500),
            extrapolation_blend: 0.25,
            max_extrapolation: Duration::from_millis(500),
            world_recipient_place: None,
        }
    }
}
