use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// Largest sequence number; the counter wraps to 0 after it.
pub const SEQ_MAX: u32 = 0x7FFF_FFFF;

/// First transmit sequence number of every session.
///
/// Non-zero so a freshly reset counter is distinguishable from a wrapped one.
pub const INITIAL_TX_SEQ: Seq = Seq(100);

/// A 31-bit wrapping sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Seq(u32);

impl Seq {
    /// Build a sequence number, rejecting values above [`SEQ_MAX`].
    pub fn new(value: u32) -> Option<Self> {
        (value <= SEQ_MAX).then_some(Self(value))
    }

    /// The raw value.
    pub fn get(self) -> u32 {
        self.0
    }

    /// The sequence number that follows this one.
    pub fn next(self) -> Self {
        if self.0 == SEQ_MAX {
            Self(0)
        } else {
            Self(self.0 + 1)
        }
    }

    /// Return the current value and advance in place.
    pub fn advance(&mut self) -> Self {
        let current = *self;
        *self = current.next();
        current
    }
}

impl TryFrom<i64> for Seq {
    type Error = WireError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .ok()
            .and_then(Seq::new)
            .ok_or(WireError::SeqOutOfRange(value))
    }
}

impl From<Seq> for u32 {
    fn from(seq: Seq) -> Self {
        seq.0
    }
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_wraps_at_max() {
        assert_eq!(Seq::new(SEQ_MAX).unwrap().next(), Seq::new(0).unwrap());
    }

    #[test]
    fn next_increments_below_max() {
        for value in [0, 1, 99, 100, 0x1234_5678, SEQ_MAX - 1] {
            let seq = Seq::new(value).unwrap();
            assert_eq!(seq.next().get(), value + 1);
        }
    }

    #[test]
    fn advance_returns_current_value() {
        let mut seq = Seq::new(SEQ_MAX).unwrap();
        assert_eq!(seq.advance().get(), SEQ_MAX);
        assert_eq!(seq.get(), 0);
        assert_eq!(seq.advance().get(), 0);
        assert_eq!(seq.get(), 1);
    }

    #[test]
    fn rejects_values_outside_31_bits() {
        assert!(Seq::new(SEQ_MAX + 1).is_none());
        assert!(matches!(
            Seq::try_from(-1),
            Err(WireError::SeqOutOfRange(-1))
        ));
        assert!(Seq::try_from(i64::from(SEQ_MAX) + 1).is_err());
        assert_eq!(Seq::try_from(7).unwrap().get(), 7);
    }

    #[test]
    fn initial_tx_seq_is_one_hundred() {
        assert_eq!(INITIAL_TX_SEQ.get(), 100);
    }
}
