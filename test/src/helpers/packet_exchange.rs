use std::time::{Duration, Instant};

use crate::helpers::TestPeer;

/// Test time source, advanced by hand
pub struct TestClock {
    now: Instant,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            now: Instant::now(),
        }
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn advance(&mut self, duration: Duration) -> Instant {
        self.now += duration;
        self.now
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Ticks every peer once at `now`, in order
pub fn tick_all(peers: &mut [&mut TestPeer], now: Instant) {
    for peer in peers.iter_mut() {
        peer.tick(now);
    }
}

/// Advances the clock by `step` and ticks every peer, `rounds` times
pub fn run_rounds(peers: &mut [&mut TestPeer], clock: &mut TestClock, step: Duration, rounds: usize) {
    for _ in 0..rounds {
        let now = clock.advance(step);
        tick_all(peers, now);
    }
}

/// Enough rounds for a request and its reply to cross the hub
pub fn exchange(peers: &mut [&mut TestPeer], clock: &mut TestClock) {
    run_rounds(peers, clock, Duration::from_millis(10), 3);
}
