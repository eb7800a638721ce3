//! A `Monomial(n)` is a `BitVec(n)` interpreted as the support of a product
//! of input variables: bit `i` set means `x_i` divides the monomial.

use crate::bitvec::BitVec;
use crate::error::Error;

/// A product of distinct input variables over GF(2), `x_i^2 = x_i` so the
/// product is idempotent and a monomial is fully identified by its support.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Monomial(BitVec);

impl Monomial {
    /// The monomial `x_i` over `n` variables.
    pub fn linear(n: usize, i: usize) -> Self {
        Monomial(BitVec::from_bits(n, &[i]))
    }

    /// The constant monomial `1` (empty support) over `n` variables.
    pub fn constant(n: usize) -> Self {
        Monomial(BitVec::zeros(n))
    }

    pub fn from_bitvec(bits: BitVec) -> Self {
        Monomial(bits)
    }

    pub fn from_indices(n: usize, indices: &[usize]) -> Self {
        Monomial(BitVec::from_bits(n, indices))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bits(&self) -> &BitVec {
        &self.0
    }

    /// The order (degree) of the monomial: number of distinct variables.
    pub fn cardinality(&self) -> usize {
        self.0.cardinality()
    }

    pub fn is_constant(&self) -> bool {
        self.0.is_zero()
    }

    /// Indices of the variables appearing in this monomial, ascending.
    pub fn support(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter_set_bits()
    }

    /// `product(a, b)`: support(a) ∪ support(b), i.e. word-wise OR. This is
    /// multiplication in GF(2)[x]/(x_i^2 - x_i): idempotent, not XOR.
    pub fn product(a: &Monomial, b: &Monomial) -> Result<Monomial, Error> {
        Ok(Monomial(a.0.or(&b.0)?))
    }

    /// `a.has_factor(b)` iff `support(b) ⊆ support(a)`, i.e. `b` divides `a`.
    pub fn has_factor(&self, b: &Monomial) -> Result<bool, Error> {
        b.0.is_subset_of(&self.0)
    }

    /// `a.divide(b)`: present iff `b` divides `a`; the quotient is
    /// `support(a) \ support(b)`.
    pub fn divide(&self, b: &Monomial) -> Result<Option<Monomial>, Error> {
        if self.has_factor(b)? {
            Ok(Some(Monomial(self.0.difference(&b.0)?)))
        } else {
            Ok(None)
        }
    }

    /// Symmetric difference of supports. Used only by the greedy
    /// remainder-reduction helper (`xor` on monomials); has no
    /// multiplicative meaning, it is bookkeeping for set manipulation.
    pub fn xor(&self, b: &Monomial) -> Result<Monomial, Error> {
        Ok(Monomial(self.0.xor(&b.0)?))
    }

    /// `true` iff this monomial's mask is satisfied by assignment `v`:
    /// every variable in the support must be set in `v`.
    pub fn eval(&self, v: &BitVec) -> Result<bool, Error> {
        self.0.eval_monomial(v)
    }

    /// Zero-extend to a wider input space.
    pub fn extended(&self, new_len: usize) -> Self {
        Monomial(self.0.extended(new_len))
    }

    /// Zero-extend and shift every variable index up by `shift` (used when
    /// placing a monomial into the high half of a concatenated input
    /// space).
    pub fn shifted(&self, shift: usize, new_len: usize) -> Self {
        Monomial(self.0.shifted(shift, new_len))
    }
}

impl std::fmt::Debug for Monomial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Monomial{:?}", self.0)
    }
}

impl std::fmt::Display for Monomial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for i in self.support() {
            if !first {
                write!(f, "*")?;
            }
            write!(f, "x{}", i)?;
            first = false;
        }
        if first {
            write!(f, "1")?;
        }
        Ok(())
    }
}
