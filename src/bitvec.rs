//! Fixed-size bit vector, LSB-first, built on the `bitvec` crate's packed
//! storage rather than hand-rolled word/mask arithmetic.

use bitvec::order::Lsb0;
use bitvec::vec::BitVec as RawBits;

use crate::error::Error;

type Store = RawBits<u64, Lsb0>;

/// A bit vector of fixed length `n`.
///
/// Length is fixed at construction and is part of the value's identity: a
/// `BitVec` of length 4 and one of length 8 are never equal, even if their
/// low bits agree. Backed by `bitvec::vec::BitVec<u64, Lsb0>`, which owns the
/// packing and keeps bits past the logical length inaccessible.
#[derive(Clone)]
pub struct BitVec {
    bits: Store,
}

impl BitVec {
    /// An all-zero bit vector of length `n`.
    pub fn zeros(n: usize) -> Self {
        BitVec { bits: Store::repeat(false, n) }
    }

    /// Construct from a list of set-bit indices, all required to be `< n`.
    pub fn from_bits(n: usize, set: &[usize]) -> Self {
        let mut v = Self::zeros(n);
        for &i in set {
            v.set(i);
        }
        v
    }

    /// Construct from packed 64-bit words, LSB-first; the result is
    /// truncated or zero-extended to exactly `n` bits.
    pub fn from_words(n: usize, words: Vec<u64>) -> Self {
        let mut bits = Store::from_vec(words);
        bits.resize(n, false);
        BitVec { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len(), "bit index {} out of range for len {}", i, self.len());
        self.bits[i]
    }

    #[inline]
    pub fn set(&mut self, i: usize) {
        debug_assert!(i < self.len(), "bit index {} out of range for len {}", i, self.len());
        self.bits.set(i, true);
    }

    #[inline]
    pub fn clear(&mut self, i: usize) {
        debug_assert!(i < self.len(), "bit index {} out of range for len {}", i, self.len());
        self.bits.set(i, false);
    }

    fn check_len(&self, other: &BitVec, what: &'static str) -> Result<(), Error> {
        if self.len() != other.len() {
            Err(Error::LengthMismatch {
                what,
                left: self.len(),
                right: other.len(),
            })
        } else {
            Ok(())
        }
    }

    /// In-place XOR. Both vectors must have equal length.
    pub fn xor_assign(&mut self, other: &BitVec) -> Result<(), Error> {
        self.check_len(other, "BitVec::xor")?;
        for i in other.iter_set_bits() {
            let cur = self.bits[i];
            self.bits.set(i, !cur);
        }
        Ok(())
    }

    pub fn xor(&self, other: &BitVec) -> Result<BitVec, Error> {
        let mut out = self.clone();
        out.xor_assign(other)?;
        Ok(out)
    }

    /// In-place AND. Both vectors must have equal length.
    pub fn and_assign(&mut self, other: &BitVec) -> Result<(), Error> {
        self.check_len(other, "BitVec::and")?;
        let to_clear: Vec<usize> = self.iter_set_bits().filter(|&i| !other.get(i)).collect();
        for i in to_clear {
            self.bits.set(i, false);
        }
        Ok(())
    }

    pub fn and(&self, other: &BitVec) -> Result<BitVec, Error> {
        let mut out = self.clone();
        out.and_assign(other)?;
        Ok(out)
    }

    /// Bitwise OR, used by `Monomial::product`. Both vectors must have
    /// equal length.
    pub fn or(&self, other: &BitVec) -> Result<BitVec, Error> {
        self.check_len(other, "BitVec::or")?;
        let mut out = self.clone();
        for i in other.iter_set_bits() {
            out.set(i);
        }
        Ok(out)
    }

    /// Popcount.
    pub fn cardinality(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn is_zero(&self) -> bool {
        self.bits.count_ones() == 0
    }

    /// `self & !other == 0`, i.e. every bit set in `self` is also set in
    /// `other`. Used by `Monomial::has_factor`.
    pub fn is_subset_of(&self, other: &BitVec) -> Result<bool, Error> {
        self.check_len(other, "BitVec::is_subset_of")?;
        Ok(self.iter_set_bits().all(|i| other.get(i)))
    }

    /// `self & !other`, assuming `other.is_subset_of(self)`.
    pub fn difference(&self, other: &BitVec) -> Result<BitVec, Error> {
        self.check_len(other, "BitVec::difference")?;
        let mut out = BitVec::zeros(self.len());
        for i in self.iter_set_bits() {
            if !other.get(i) {
                out.set(i);
            }
        }
        Ok(out)
    }

    /// Evaluate this vector as a monomial mask against an assignment `v`:
    /// true iff every bit set here is also set in `v`. Equivalent to
    /// `self.is_subset_of(v)` but named for its role in `Monomial::eval`.
    pub fn eval_monomial(&self, v: &BitVec) -> Result<bool, Error> {
        self.is_subset_of(v)
    }

    /// Indices of set bits, ascending.
    pub fn iter_set_bits(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }

    /// Zero-extend to a new, larger length. `new_len` must be >= `self.len`.
    pub fn extended(&self, new_len: usize) -> Self {
        debug_assert!(new_len >= self.len());
        let mut bits = self.bits.clone();
        bits.resize(new_len, false);
        BitVec { bits }
    }

    /// Zero-extend and shift every set bit up by `shift` positions, used to
    /// place a low-half function's monomials into the high half of a
    /// concatenated input.
    pub fn shifted(&self, shift: usize, new_len: usize) -> Self {
        let mut out = BitVec::zeros(new_len);
        for i in self.iter_set_bits() {
            out.set(i + shift);
        }
        out
    }
}

impl PartialEq for BitVec {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter_set_bits().eq(other.iter_set_bits())
    }
}

impl Eq for BitVec {}

impl std::hash::Hash for BitVec {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for i in self.iter_set_bits() {
            i.hash(state);
        }
    }
}

impl std::fmt::Debug for BitVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BitVec(len={}, set={{", self.len())?;
        for (i, bit) in self.iter_set_bits().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", bit)?;
        }
        write!(f, "}})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_clear_roundtrip() {
        let mut v = BitVec::zeros(70);
        assert!(!v.get(65));
        v.set(65);
        assert!(v.get(65));
        v.clear(65);
        assert!(!v.get(65));
    }

    #[test]
    fn tail_bits_stay_zero() {
        let v = BitVec::from_words(4, vec![0xff]);
        assert_eq!(v.cardinality(), 4);
        assert!(v.get(0) && v.get(1) && v.get(2) && v.get(3));
    }

    #[test]
    fn xor_and_cardinality() {
        let a = BitVec::from_bits(8, &[0, 1, 2]);
        let b = BitVec::from_bits(8, &[1, 2, 3]);
        let x = a.xor(&b).unwrap();
        assert_eq!(x.cardinality(), 2);
        assert!(x.get(0) && x.get(3));

        let y = a.and(&b).unwrap();
        assert_eq!(y.cardinality(), 2);
        assert!(y.get(1) && y.get(2));
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let a = BitVec::zeros(4);
        let b = BitVec::zeros(8);
        assert!(a.xor(&b).is_err());
        assert!(a.and(&b).is_err());
    }

    #[test]
    fn is_subset_and_difference() {
        let a = BitVec::from_bits(8, &[0, 1, 2]);
        let b = BitVec::from_bits(8, &[1]);
        assert!(b.is_subset_of(&a).unwrap());
        assert!(!a.is_subset_of(&b).unwrap());
        let d = a.difference(&b).unwrap();
        assert_eq!(d, BitVec::from_bits(8, &[0, 2]));
    }

    #[test]
    fn extend_doubles_width_and_preserves_low_half() {
        let a = BitVec::from_bits(4, &[1]);
        let e = a.extended(8);
        assert_eq!(e.len(), 8);
        assert!(e.get(1));
        assert!(!e.get(5));
    }

    #[test]
    fn equality_respects_length() {
        let a = BitVec::zeros(4);
        let b = BitVec::zeros(8);
        assert_ne!(a, b);
    }
}
