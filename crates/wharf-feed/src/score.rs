//! Feed scores: sub-millisecond total ordering over wall-clock time.

use std::sync::atomic::{AtomicI64, Ordering};

use wharf_utils::time::epoch_millis;

/// Score units per millisecond. The spare resolution gives same-millisecond
/// bursts room for tie-breaking and future finer-grained sources.
pub const SCORE_RESOLUTION: i64 = 10_000;

/// Lowest score the read protocol accepts as a cursor. Anything below this
/// predates the feed itself and cannot be a value we handed out.
pub const PROTOCOL_EPOCH: i64 = 1_585_061_224_000 * SCORE_RESOLUTION;

/// Current head score derived from wall-clock time.
pub fn head_score() -> i64 {
    epoch_millis() * SCORE_RESOLUTION
}

/// Monotonic score generator.
///
/// Scores track wall-clock time, bumped by one unit per call within the
/// same millisecond so that entries recorded in a burst stay totally
/// ordered.
#[derive(Default)]
pub struct ScoreClock {
    last: AtomicI64,
}

impl ScoreClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next score, strictly greater than every score this clock handed out.
    pub fn next(&self) -> i64 {
        let now = head_score();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(observed) => last = observed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_are_strictly_increasing() {
        let clock = ScoreClock::new();
        let mut previous = 0;
        for _ in 0..1000 {
            let score = clock.next();
            assert!(score > previous);
            previous = score;
        }
    }

    #[test]
    fn test_scores_track_wall_clock() {
        let clock = ScoreClock::new();
        let score = clock.next();
        assert!(score >= PROTOCOL_EPOCH);
        assert!(score / SCORE_RESOLUTION <= epoch_millis() + 1000);
    }

    #[test]
    fn test_concurrent_scores_are_unique() {
        use std::sync::Arc;

        let clock = Arc::new(ScoreClock::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let clock = Arc::clone(&clock);
            handles.push(std::thread::spawn(move || {
                (0..250).map(|_| clock.next()).collect::<Vec<_>>()
            }));
        }

        let mut all: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 1000);
    }
}
