// src/cert/serial.rs
use std::sync::{Mutex, PoisonError};

/// Hands out certificate serial numbers, starting at 1.
///
/// The increment happens under a lock so that concurrent callers never
/// observe the same value, even though a single bundle run issues
/// certificates one after another.
#[derive(Debug, Default)]
pub struct SerialAllocator {
    last: Mutex<u64>,
}

impl SerialAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        *last += 1;
        *last
    }

    /// The most recently allocated serial, or 0 if none has been handed out.
    pub fn current(&self) -> u64 {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_at_one_and_increases() {
        let serial = SerialAllocator::new();
        assert_eq!(serial.current(), 0);
        assert_eq!(serial.next(), 1);
        assert_eq!(serial.next(), 2);
        assert_eq!(serial.next(), 3);
        assert_eq!(serial.current(), 3);
    }

    #[test]
    fn concurrent_allocations_are_unique_and_dense() {
        let serial = Arc::new(SerialAllocator::new());
        let threads = 8;
        let per_thread = 250;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let serial = Arc::clone(&serial);
                thread::spawn(move || (0..per_thread).map(|_| serial.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = BTreeSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "serial {} handed out twice", value);
            }
        }

        let total = (threads * per_thread) as u64;
        assert_eq!(seen.len() as u64, total);
        // Sorted allocations form 1..=total with no gaps.
        assert_eq!(seen.iter().copied().collect::<Vec<_>>(), (1..=total).collect::<Vec<_>>());
    }
}
