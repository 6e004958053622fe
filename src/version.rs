//! Monotonic document versions.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::engine::Version;

/// Issues strictly increasing versions based on wall-clock microseconds.
///
/// If the clock stalls or steps back, versions keep increasing by one from
/// the last issued value.
#[derive(Debug, Default)]
pub struct VersionClock {
    last: AtomicU64,
}

impl VersionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock whose next version is greater than `version`.
    pub fn starting_after(version: Version) -> Self {
        VersionClock {
            last: AtomicU64::new(version),
        }
    }

    pub fn next(&self) -> Version {
        let now = Utc::now().timestamp_micros().max(0) as u64;
        let mut last = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }

    /// The most recently issued version.
    pub fn last(&self) -> Version {
        self.last.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_strictly_increasing() {
        let clock = VersionClock::new();
        let mut previous = clock.next();
        for _ in 0..1_000 {
            let next = clock.next();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_clock_ahead_of_wall_time() {
        let clock = VersionClock::starting_after(u64::MAX / 2);
        assert_eq!(clock.next(), u64::MAX / 2 + 1);
        assert_eq!(clock.next(), u64::MAX / 2 + 2);
    }

    #[test]
    fn test_unique_across_threads() {
        let clock = Arc::new(VersionClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = clock.clone();
                std::thread::spawn(move || (0..500).map(|_| clock.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<Version> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}
