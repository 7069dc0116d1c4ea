//! Timestamp identifiers (TIDs) and their monotonic generator
//!
//! A TID packs a 53-bit microsecond Unix timestamp and a 10-bit clock id into
//! a `u64`, rendered as 13 characters of the sortable base32 alphabet
//! `234567abcdefghijklmnopqrstuvwxyz`. Because the alphabet is in ASCII order
//! and the width is fixed, string order equals numeric order equals time
//! order.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rand::Rng;

use crate::error::{IdentifierKind, InvalidIdentifier, Result};

const ALPHABET: &[u8; 32] = b"234567abcdefghijklmnopqrstuvwxyz";
const TID_LEN: usize = 13;
const CLOCK_ID_BITS: u32 = 10;
const CLOCK_ID_MASK: u64 = (1 << CLOCK_ID_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << 53) - 1;

/// A timestamp identifier, the usual record key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(u64);

impl Tid {
    /// Build a TID from a microsecond timestamp and a clock id.
    ///
    /// The timestamp is truncated to 53 bits and the clock id to 10 bits.
    pub fn from_parts(timestamp_micros: u64, clock_id: u16) -> Self {
        let timestamp = (timestamp_micros & TIMESTAMP_MASK) << CLOCK_ID_BITS;
        Self(timestamp | (clock_id as u64 & CLOCK_ID_MASK))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let fail = |reason: &str| InvalidIdentifier::new(IdentifierKind::Tid, raw, reason);

        if raw.len() != TID_LEN {
            return Err(fail("must be exactly 13 characters"));
        }
        let mut value: u64 = 0;
        for (i, byte) in raw.bytes().enumerate() {
            let digit = ALPHABET
                .iter()
                .position(|&c| c == byte)
                .ok_or_else(|| fail("character outside the base32-sortable alphabet"))?;
            if i == 0 && digit >= 16 {
                return Err(fail("first character must be one of 234567abcdefghij"));
            }
            value = (value << 5) | digit as u64;
        }
        Ok(Self(value))
    }

    pub fn timestamp_micros(&self) -> u64 {
        self.0 >> CLOCK_ID_BITS
    }

    pub fn clock_id(&self) -> u16 {
        (self.0 & CLOCK_ID_MASK) as u16
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [0u8; TID_LEN];
        for (i, slot) in out.iter_mut().enumerate() {
            let shift = 5 * (TID_LEN - 1 - i);
            *slot = ALPHABET[((self.0 >> shift) & 31) as usize];
        }
        // The alphabet is ASCII, so this cannot fail.
        f.write_str(std::str::from_utf8(&out).map_err(|_| fmt::Error)?)
    }
}

string_identifier!(Tid);

/// Source of microsecond timestamps for [`TidGenerator`].
pub trait Clock: Send + Sync {
    fn now_micros(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_micros(&self) -> u64 {
        (**self).now_micros()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_micros(&self) -> u64 {
        chrono::Utc::now().timestamp_micros().max(0) as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(micros: u64) -> Self {
        Self(AtomicU64::new(micros))
    }

    pub fn set(&self, micros: u64) {
        self.0.store(micros, Ordering::SeqCst);
    }

    pub fn advance(&self, micros: u64) {
        self.0.fetch_add(micros, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Mints strictly increasing TIDs.
///
/// All state lives behind one mutex, so concurrent callers never observe the
/// same value and ordering holds across callers. When the clock stalls or
/// jumps backwards the previous timestamp plus one is used instead.
///
/// Timestamps saturate at the 53-bit ceiling (around the year 2255) instead
/// of wrapping to zero; past it TIDs stop increasing but never sort before
/// earlier ones.
///
/// ```
/// use atproto_ids::TidGenerator;
///
/// let generator = TidGenerator::new();
/// let a = generator.next_tid();
/// let b = generator.next_tid();
/// assert!(a.to_string() < b.to_string());
/// ```
pub struct TidGenerator {
    clock: Box<dyn Clock>,
    clock_id: u16,
    last_micros: Mutex<u64>,
}

impl TidGenerator {
    /// Generator on the system clock with a random clock id.
    pub fn new() -> Self {
        let clock_id = rand::thread_rng().gen_range(0..=CLOCK_ID_MASK as u16);
        Self::with_clock(SystemClock, clock_id)
    }

    pub fn with_clock(clock: impl Clock + 'static, clock_id: u16) -> Self {
        Self {
            clock: Box::new(clock),
            clock_id: clock_id & CLOCK_ID_MASK as u16,
            last_micros: Mutex::new(0),
        }
    }

    pub fn clock_id(&self) -> u16 {
        self.clock_id
    }

    pub fn next_tid(&self) -> Tid {
        let mut last = self.last_micros.lock().unwrap_or_else(PoisonError::into_inner);
        self.advance(&mut last)
    }

    /// Mint `n` consecutive TIDs under a single lock.
    ///
    /// Does not wait for the clock to move: ties are broken by incrementing
    /// the timestamp, so this is usable for fixtures.
    pub fn sequence(&self, n: usize) -> Vec<Tid> {
        let mut last = self.last_micros.lock().unwrap_or_else(PoisonError::into_inner);
        (0..n).map(|_| self.advance(&mut last)).collect()
    }

    fn advance(&self, last: &mut u64) -> Tid {
        let now = self.clock.now_micros() & TIMESTAMP_MASK;
        let micros = if now > *last {
            now
        } else {
            last.saturating_add(1).min(TIMESTAMP_MASK)
        };
        *last = micros;
        Tid::from_parts(micros, self.clock_id)
    }
}

impl Default for TidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TidGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TidGenerator")
            .field("clock_id", &self.clock_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_encoding() {
        assert_eq!(Tid::from_parts(0, 0).to_string(), "2222222222222");
        let tid = Tid::parse("3jzfcijpj2z2a").unwrap();
        assert_eq!(tid.to_string(), "3jzfcijpj2z2a");
        assert_eq!(Tid::from_parts(tid.timestamp_micros(), tid.clock_id()), tid);
    }

    #[test]
    fn test_parts_round_trip() {
        let tid = Tid::from_parts(1_700_000_000_123_456, 1023);
        assert_eq!(tid.timestamp_micros(), 1_700_000_000_123_456);
        assert_eq!(tid.clock_id(), 1023);
        assert_eq!(Tid::parse(&tid.to_string()).unwrap(), tid);
    }

    #[test]
    fn test_rejects_malformed() {
        for raw in [
            "",
            "3jzfcijpj2z2",
            "3jzfcijpj2z2aa",
            "3jzfcijpj2z21",
            "3JZFCIJPJ2Z2A",
            "zjzfcijpj2z2a",
            "kjzfcijpj2z2a",
        ] {
            assert_eq!(Tid::parse(raw).unwrap_err().kind(), IdentifierKind::Tid, "{raw}");
        }
    }

    #[test]
    fn test_string_order_matches_time_order() {
        let earlier = Tid::from_parts(1_000, 1000);
        let later = Tid::from_parts(1_001, 0);
        assert!(earlier < later);
        assert!(earlier.to_string() < later.to_string());
    }

    #[test]
    fn test_same_tick_still_distinct() {
        let clock = Arc::new(ManualClock::new(5_000));
        let generator = TidGenerator::with_clock(clock.clone(), 3);
        let a = generator.next_tid();
        let b = generator.next_tid();
        assert!(a < b);
        assert_eq!(a.timestamp_micros(), 5_000);
        assert_eq!(b.timestamp_micros(), 5_001);
    }

    #[test]
    fn test_backward_clock_jump() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let generator = TidGenerator::with_clock(clock.clone(), 9);
        let before = generator.next_tid();

        clock.set(10);
        let after = generator.next_tid();
        assert!(after > before);
        assert_eq!(after.timestamp_micros(), before.timestamp_micros() + 1);

        clock.set(2_000_000);
        let recovered = generator.next_tid();
        assert_eq!(recovered.timestamp_micros(), 2_000_000);
    }

    #[test]
    fn test_sequence_without_time_passing() {
        let generator = TidGenerator::with_clock(ManualClock::new(42), 0);
        let tids = generator.sequence(100);
        assert_eq!(tids.len(), 100);
        for pair in tids.windows(2) {
            assert!(pair[0].to_string() < pair[1].to_string());
        }
    }

    #[test]
    fn test_clock_id_truncated() {
        let generator = TidGenerator::with_clock(ManualClock::new(1), 0xFFFF);
        assert_eq!(generator.clock_id(), 1023);
    }

    #[test]
    fn test_ceiling_saturates_instead_of_wrapping() {
        let generator = TidGenerator::with_clock(ManualClock::new(TIMESTAMP_MASK - 1), 5);
        let tids = generator.sequence(4);

        assert_eq!(tids[0].timestamp_micros(), TIMESTAMP_MASK - 1);
        assert_eq!(tids[1].timestamp_micros(), TIMESTAMP_MASK);
        for pair in tids.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert_eq!(tids[3].timestamp_micros(), TIMESTAMP_MASK);
    }
}
