use std::fmt;

use crate::error::{Result, SpinGlassError};

const WORD_BITS: usize = 64;

/// Immutable snapshot of a spin configuration, one bit per spin
/// (set = activated).
///
/// Bits are packed least-significant first into `u64` words. Bits past `len`
/// in the last word are always zero, so derived equality and hashing compare
/// configurations exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    words: Vec<u64>,
    len: usize,
}

impl State {
    /// All spins off.
    pub fn zeros(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    pub fn from_bools(bits: &[bool]) -> Self {
        let mut state = Self::zeros(bits.len());
        for (i, &on) in bits.iter().enumerate() {
            if on {
                state.words[i / WORD_BITS] |= 1u64 << (i % WORD_BITS);
            }
        }
        state
    }

    /// Build from +1/-1 activations; any positive value counts as activated.
    pub fn from_activations(spins: &[i8]) -> Self {
        let mut state = Self::zeros(spins.len());
        for (i, &s) in spins.iter().enumerate() {
            if s > 0 {
                state.words[i / WORD_BITS] |= 1u64 << (i % WORD_BITS);
            }
        }
        state
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True iff spin `i` is activated.
    #[inline]
    pub fn spin(&self, i: usize) -> bool {
        debug_assert!(i < self.len, "spin index {i} out of range for state of {}", self.len);
        (self.words[i / WORD_BITS] >> (i % WORD_BITS)) & 1 == 1
    }

    /// +1 if spin `i` is activated, otherwise -1.
    #[inline]
    pub fn activation(&self, i: usize) -> i8 {
        if self.spin(i) {
            1
        } else {
            -1
        }
    }

    pub fn activations(&self) -> Vec<i8> {
        (0..self.len).map(|i| self.activation(i)).collect()
    }

    pub fn count_active(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Copy of this state with bit `i` flipped.
    pub fn flipped(&self, i: usize) -> Self {
        debug_assert!(i < self.len, "spin index {i} out of range for state of {}", self.len);
        let mut next = self.clone();
        next.words[i / WORD_BITS] ^= 1u64 << (i % WORD_BITS);
        next
    }

    /// Lazily yields the `len()` single-bit-flip neighbors, neighbor `i`
    /// differing from `self` in position `i` only.
    pub fn bit_flips(&self) -> BitFlips<'_> {
        BitFlips {
            origin: self,
            next: 0,
        }
    }

    /// Eager form of [`State::bit_flips`].
    pub fn generate_bit_flips(&self) -> Vec<State> {
        self.bit_flips().collect()
    }

    /// True iff `other` differs from `self` in exactly one position.
    pub fn is_bit_flipped(&self, other: &State) -> Result<bool> {
        if other.len != self.len {
            return Err(SpinGlassError::DimensionMismatch {
                expected: self.len,
                found: other.len,
            });
        }
        let differing: u32 = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        Ok(differing == 1)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len {
            f.write_str(if self.spin(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Iterator returned by [`State::bit_flips`].
pub struct BitFlips<'a> {
    origin: &'a State,
    next: usize,
}

impl Iterator for BitFlips<'_> {
    type Item = State;

    fn next(&mut self) -> Option<State> {
        if self.next >= self.origin.len {
            return None;
        }
        let flipped = self.origin.flipped(self.next);
        self.next += 1;
        Some(flipped)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.origin.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BitFlips<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_activations_round_trip_across_word_boundary() {
        let spins: Vec<i8> = (0..130).map(|i| if i % 3 == 0 { 1 } else { -1 }).collect();
        let state = State::from_activations(&spins);
        assert_eq!(state.len(), 130);
        assert_eq!(state.activations(), spins);
        assert_eq!(state.count_active(), 44);
    }

    #[test]
    fn test_display() {
        let state = State::from_bools(&[true, false, false, true]);
        assert_eq!(state.to_string(), "1001");
    }

    #[test]
    fn test_equal_configurations_hash_equal() {
        let a = State::from_bools(&[true, false, true]);
        let b = State::from_activations(&[1, -1, 1]);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&b.flipped(1)));
    }

    #[test]
    fn test_is_bit_flipped() {
        let a = State::from_bools(&[true, false, true, false]);
        assert!(a.is_bit_flipped(&a.flipped(2)).unwrap());
        assert!(!a.is_bit_flipped(&a).unwrap());
        assert!(!a.is_bit_flipped(&a.flipped(0).flipped(3)).unwrap());
    }

    #[test]
    fn test_is_bit_flipped_dimension_mismatch() {
        let a = State::zeros(4);
        let b = State::zeros(5);
        assert!(matches!(
            a.is_bit_flipped(&b),
            Err(SpinGlassError::DimensionMismatch {
                expected: 4,
                found: 5
            })
        ));
    }

    #[test]
    fn test_empty_state_has_no_flips() {
        let s = State::zeros(0);
        assert!(s.is_empty());
        assert_eq!(s.bit_flips().len(), 0);
    }

    proptest! {
        #[test]
        fn prop_bit_flips_differ_in_exactly_one_position(
            bits in proptest::collection::vec(any::<bool>(), 1..150)
        ) {
            let state = State::from_bools(&bits);
            let flips = state.generate_bit_flips();
            prop_assert_eq!(flips.len(), bits.len());
            for (i, flip) in flips.iter().enumerate() {
                prop_assert_eq!(flip.len(), state.len());
                for j in 0..bits.len() {
                    prop_assert_eq!(flip.spin(j) != state.spin(j), i == j);
                }
                prop_assert!(state.is_bit_flipped(flip).unwrap());
                prop_assert_eq!(&flip.flipped(i), &state);
            }
        }
    }
}
