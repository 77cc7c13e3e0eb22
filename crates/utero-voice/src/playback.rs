//! Gapless playback scheduling
//!
//! Chunks are queued back to back on the output clock. The cursor only moves
//! forward within a session; a chunk that arrives after the queue has drained
//! starts at the current output time instead of in the past.

use crate::audio::SourceId;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledChunk {
    pub id: SourceId,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    next_start: f64,
    in_flight: Vec<ScheduledChunk>,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot of `duration` seconds. Returns the start time.
    pub fn schedule(&mut self, now: f64, duration: f64) -> f64 {
        let start = self.next_start.max(now);
        self.next_start = start + duration.max(0.0);
        start
    }

    pub fn track(&mut self, id: SourceId, start: f64, duration: f64) {
        self.in_flight.push(ScheduledChunk {
            id,
            start,
            end: start + duration,
        });
    }

    /// Forget chunks that have finished playing by `now`.
    pub fn prune(&mut self, now: f64) {
        self.in_flight.retain(|c| c.end > now);
    }

    /// Take every in-flight chunk id, leaving the set empty.
    pub fn drain(&mut self) -> Vec<SourceId> {
        self.in_flight.drain(..).map(|c| c.id).collect()
    }

    pub fn cursor(&self) -> f64 {
        self.next_start
    }

    pub fn in_flight(&self) -> &[ScheduledChunk] {
        &self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_to_back_scheduling() {
        let mut s = PlaybackScheduler::new();
        let first = s.schedule(0.0, 1.0);
        let second = s.schedule(0.2, 0.5);
        assert_eq!(first, 0.0);
        assert_eq!(second, 1.0);
        assert_eq!(s.cursor(), 1.5);
    }

    #[test]
    fn test_late_chunk_starts_now() {
        let mut s = PlaybackScheduler::new();
        s.schedule(0.0, 1.0);
        assert_eq!(s.schedule(3.0, 0.5), 3.0);
        assert_eq!(s.cursor(), 3.5);
    }

    #[test]
    fn test_prune_and_drain() {
        let mut s = PlaybackScheduler::new();
        s.track(1, 0.0, 1.0);
        s.track(2, 1.0, 1.0);
        s.prune(1.0);
        assert_eq!(s.in_flight().len(), 1);
        assert_eq!(s.drain(), vec![2]);
        assert!(s.in_flight().is_empty());
    }
}
