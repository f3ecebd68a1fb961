use std::time::{Duration, Instant};

use peerlink_serde::{Quat, Vec3};

/// The latest motion received from the authoritative peer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSample {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub received_at: Instant,
}

impl MotionSample {
    /// Dead-reckons the sample `elapsed` into the future
    pub fn predict(&self, elapsed: Duration) -> (Vec3, Quat) {
        let seconds = elapsed.as_secs_f32();
        let position = self.position + self.velocity * seconds;
        let spin = Quat::from_scaled_axis(self.angular_velocity * seconds);
        let rotation = (spin * self.rotation).normalize();
        (position, rotation)
    }
}

/// Renders a remote object between samples.
///
/// Nothing is rendered until the first sample arrives. The rendered pose
/// is blended toward the extrapolated one each update, and extrapolation
/// never runs further than `max_extrapolation` past the last sample.
#[derive(Clone, Debug)]
pub struct Extrapolator {
    latest: Option<MotionSample>,
    rendered_position: Vec3,
    rendered_rotation: Quat,
    blend: f32,
    max_extrapolation: Duration,
}

impl Extrapolator {
    pub fn new(blend: f32, max_extrapolation: Duration) -> Self {
        Self {
            latest: None,
            rendered_position: Vec3::ZERO,
            rendered_rotation: Quat::IDENTITY,
            blend: blend.clamp(0.0, 1.0),
            max_extrapolation,
        }
    }

    pub fn has_sample(&self) -> bool {
        self.latest.is_some()
    }

    pub fn latest(&self) -> Option<&MotionSample> {
        self.latest.as_ref()
    }

    pub fn push(&mut self, sample: MotionSample) {
        if self.latest.is_none() {
            // first sample snaps
            self.rendered_position = sample.position;
            self.rendered_rotation = sample.rotation;
        }
        self.latest = Some(sample);
    }

    pub fn clear(&mut self) {
        self.latest = None;
    }

    /// Where the object should be at `now`, without blending
    pub fn predict(&self, now: Instant) -> Option<(Vec3, Quat)> {
        let sample = self.latest.as_ref()?;
        let elapsed = now
            .saturating_duration_since(sample.received_at)
            .min(self.max_extrapolation);
        Some(sample.predict(elapsed))
    }

    /// Advances the rendered pose toward the prediction for `now`
    pub fn update(&mut self, now: Instant) -> Option<(Vec3, Quat)> {
        let (position, rotation) = self.predict(now)?;
        self.rendered_position = self.rendered_position.lerp(position, self.blend);
        self.rendered_rotation = self.rendered_rotation.slerp(rotation, self.blend).normalize();
        Some((self.rendered_position, self.rendered_rotation))
    }
}
