//! Definitions for the core identity types used in stemma trees.
//!
//! These types are re-exported in the root of the crate.

use std::sync::atomic::{AtomicU64, Ordering};

use derive_more::{From, Into};

/// Process-wide counter backing [`SerialNumber::fresh`].
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(0);

/// The identity of a [`Node`](crate::Node).
///
/// Serial numbers are opaque, totally ordered tokens allocated at node
/// construction. Within a single valid tree every serial number appears at
/// most once; copies that do not rewrite a node's children preserve it, which
/// is how identity survives edits (see [`Node::copy`](crate::Node::copy)).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct SerialNumber(u64);

impl SerialNumber {
    /// Allocate a fresh serial number.
    ///
    /// The allocator is monotone and thread-safe; a serial number handed out
    /// here is never reissued within the process.
    pub fn fresh() -> Self {
        SerialNumber(NEXT_SERIAL.fetch_add(1, Ordering::Relaxed))
    }

    /// Record an externally supplied serial number so the allocator never
    /// reissues it.
    pub(crate) fn observe(self) {
        NEXT_SERIAL.fetch_max(self.0 + 1, Ordering::Relaxed);
    }
}

// Print out serial numbers as `#n`.
impl std::fmt::Debug for SerialNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl std::fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fresh_serials_are_strictly_increasing() {
        let a = SerialNumber::fresh();
        let b = SerialNumber::fresh();
        let c = SerialNumber::fresh();
        assert!(a < b && b < c);
    }

    #[test]
    fn observed_serials_are_not_reissued() {
        let high = SerialNumber::from(u64::from(SerialNumber::fresh()) + 1000);
        high.observe();
        assert!(SerialNumber::fresh() > high);
    }

    #[test]
    fn fresh_serials_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..256).map(|_| SerialNumber::fresh()).collect::<Vec<_>>()))
            .collect();
        let mut all: Vec<SerialNumber> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let len = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), len);
    }
}
