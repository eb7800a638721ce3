//! `Function`: a sparse multivariate Boolean polynomial with vector-valued
//! output — the engine's core representation.

use std::convert::Infallible;

use log::trace;

use crate::bitvec::BitVec;
use crate::compose::{compose_functions, Composer, ComposeConfig};
use crate::error::Error;
use crate::monomial::Monomial;
use crate::monomial_map::MonomialMap;
use crate::pool::WorkerPool;

/// Reserved tag for a future parameterized variant of `Function` (source
/// pattern: `Function` vs `ParameterizedFunction`). The
/// parameterized form composes a pipeline of plain functions and lives
/// outside this engine's core; the variant is reserved here so collaborators
/// can plug in without reshaping the type, but `ParameterizedPipelines` is
/// uninhabited — only `Plain` can be constructed today.
#[derive(Clone, Debug)]
pub enum Repr {
    Plain {
        monomials: Vec<Monomial>,
        contributions: Vec<BitVec>,
    },
    Parameterized(ParameterizedPipelines),
}

#[derive(Clone, Debug)]
pub struct ParameterizedPipelines(Infallible);

/// A sparse vector-valued Boolean polynomial function over GF(2).
///
/// Canonical-form invariants, guaranteed to hold after every
/// public operation: monomials are pairwise distinct, no contribution is
/// all-zero, and `monomials`/`contributions` are co-indexed and of equal
/// length. Monomial ordering is unspecified — do not rely on it.
#[derive(Clone, Debug)]
pub struct Function {
    input_len: usize,
    output_len: usize,
    repr: Repr,
}

impl Function {
    fn plain(&self) -> (&[Monomial], &[BitVec]) {
        match &self.repr {
            Repr::Plain {
                monomials,
                contributions,
            } => (monomials, contributions),
            Repr::Parameterized(never) => match never.0 {},
        }
    }

    /// Construct a `Function` directly from parallel arrays. Inputs are
    /// validated for co-indexing and width but **not** canonicalized —
    /// callers that cannot guarantee distinct monomials and non-zero
    /// contributions should go through `Builder` instead.
    pub fn new(
        input_len: usize,
        output_len: usize,
        monomials: Vec<Monomial>,
        contributions: Vec<BitVec>,
    ) -> Result<Function, Error> {
        if monomials.len() != contributions.len() {
            return Err(Error::LengthMismatch {
                what: "Function::new monomials/contributions",
                left: monomials.len(),
                right: contributions.len(),
            });
        }
        for m in &monomials {
            if m.len() != input_len {
                return Err(Error::LengthMismatch {
                    what: "Function::new monomial width",
                    left: m.len(),
                    right: input_len,
                });
            }
        }
        for c in &contributions {
            if c.len() != output_len {
                return Err(Error::LengthMismatch {
                    what: "Function::new contribution width",
                    left: c.len(),
                    right: output_len,
                });
            }
        }
        Ok(Function {
            input_len,
            output_len,
            repr: Repr::Plain {
                monomials,
                contributions,
            },
        })
    }

    /// Build a canonical `Function` from a `MonomialMap`, dropping
    /// all-zero contributions.
    pub fn from_monomial_contribution_map(
        input_len: usize,
        output_len: usize,
        map: MonomialMap,
    ) -> Function {
        let (monomials, contributions) = map.into_canonical_arrays();
        Function {
            input_len,
            output_len,
            repr: Repr::Plain {
                monomials,
                contributions,
            },
        }
    }

    pub fn input_length(&self) -> usize {
        self.input_len
    }

    pub fn output_length(&self) -> usize {
        self.output_len
    }

    pub fn monomials(&self) -> &[Monomial] {
        self.plain().0
    }

    pub fn contributions(&self) -> &[BitVec] {
        self.plain().1
    }

    /// Sum of contribution cardinalities across all monomials.
    pub fn total_monomial_count(&self) -> usize {
        self.plain().1.iter().map(|c| c.cardinality()).sum()
    }

    /// The highest order (degree) among this function's monomials, or 0 for
    /// the zero function.
    pub fn maximum_monomial_order(&self) -> usize {
        self.plain()
            .0
            .iter()
            .map(|m| m.cardinality())
            .max()
            .unwrap_or(0)
    }

    /// Evaluate this function on input `v`.
    pub fn apply(&self, v: &BitVec) -> Result<BitVec, Error> {
        if v.len() != self.input_len {
            return Err(Error::LengthMismatch {
                what: "Function::apply input",
                left: v.len(),
                right: self.input_len,
            });
        }
        let (monomials, contributions) = self.plain();
        let mut out = BitVec::zeros(self.output_len);
        for (m, c) in monomials.iter().zip(contributions.iter()) {
            if m.eval(v)? {
                out.xor_assign(c)?;
            }
        }
        Ok(out)
    }

    /// Evaluate on the concatenation `a || b`.
    pub fn apply_two(&self, a: &BitVec, b: &BitVec) -> Result<BitVec, Error> {
        let mut v = a.extended(a.len() + b.len());
        for i in b.iter_set_bits() {
            v.set(a.len() + i);
        }
        self.apply(&v)
    }

    fn check_binop_shapes(&self, rhs: &Function, op: &'static str) -> Result<(), Error> {
        if self.input_len != rhs.input_len {
            return Err(Error::LengthMismatch {
                what: op,
                left: self.input_len,
                right: rhs.input_len,
            });
        }
        if self.output_len != rhs.output_len {
            return Err(Error::LengthMismatch {
                what: op,
                left: self.output_len,
                right: rhs.output_len,
            });
        }
        Ok(())
    }

    /// `self XOR rhs`: pointwise sum over GF(2). Requires matching input
    /// and output lengths. Result size is at most `|self| + |rhs|`.
    pub fn xor(&self, rhs: &Function) -> Result<Function, Error> {
        self.check_binop_shapes(rhs, "Function::xor")?;
        let mut map = MonomialMap::new();
        let (lm, lc) = self.plain();
        for (m, c) in lm.iter().zip(lc.iter()) {
            map.xor_into(m.clone(), c, self.output_len)?;
        }
        let (rm, rc) = rhs.plain();
        for (m, c) in rm.iter().zip(rc.iter()) {
            map.xor_into(m.clone(), c, self.output_len)?;
        }
        trace!(
            "xor: {} + {} monomials -> {} before canonicalization",
            lm.len(),
            rm.len(),
            map.len()
        );
        Ok(Function::from_monomial_contribution_map(
            self.input_len,
            self.output_len,
            map,
        ))
    }

    /// `self AND rhs`: pointwise product over GF(2), i.e. the convolution
    /// of the two sparse polynomials in the monomial basis. Requires
    /// matching input and output lengths. O(|self|*|rhs|*W) in word count W.
    pub fn and(&self, rhs: &Function) -> Result<Function, Error> {
        self.check_binop_shapes(rhs, "Function::and")?;
        let mut map = MonomialMap::new();
        let (lm, lc) = self.plain();
        let (rm, rc) = rhs.plain();
        for (mi, ci) in lm.iter().zip(lc.iter()) {
            for (mj, cj) in rm.iter().zip(rc.iter()) {
                let p = Monomial::product(mi, mj)?;
                let c = ci.and(cj)?;
                map.xor_into(p, &c, self.output_len)?;
            }
        }
        trace!(
            "and: {}x{} monomial pairs -> {} before canonicalization",
            lm.len(),
            rm.len(),
            map.len()
        );
        Ok(Function::from_monomial_contribution_map(
            self.input_len,
            self.output_len,
            map,
        ))
    }

    /// Zero-extend this function's monomial width to `new_len`
    /// (`new_len >= input_length()`). Contributions are unchanged; the
    /// function still reads only its original (now low) input bits.
    pub fn extend(&self, new_len: usize) -> Function {
        let (monomials, contributions) = self.plain();
        let monomials = monomials.iter().map(|m| m.extended(new_len)).collect();
        Function {
            input_len: new_len,
            output_len: self.output_len,
            repr: Repr::Plain {
                monomials,
                contributions: contributions.to_vec(),
            },
        }
    }

    /// Prepare this function to read the *low* half of a `new_len`-wide
    /// concatenated input: equivalent to
    /// `extend(new_len)`.
    pub fn prepare_for_lhs(&self, new_len: usize) -> Function {
        self.extend(new_len)
    }

    /// Prepare this function to read the *high* half of a `new_len`-wide
    /// concatenated input: every monomial's
    /// variables are shifted up by this function's original input length.
    pub fn prepare_for_rhs(&self, new_len: usize) -> Function {
        let (monomials, contributions) = self.plain();
        let shift = new_len - self.input_len;
        let monomials = monomials
            .iter()
            .map(|m| m.shifted(shift, new_len))
            .collect();
        Function {
            input_len: new_len,
            output_len: self.output_len,
            repr: Repr::Plain {
                monomials,
                contributions: contributions.to_vec(),
            },
        }
    }

    /// Concatenate `lhs` and `rhs` into a single function over
    /// `lhs.input_length() + rhs.input_length()` inputs, `lhs` reading the
    /// low half and `rhs` the high half, with combined output
    /// `lhs.output_length() + rhs.output_length()`.
    pub fn concatenate(lhs: &Function, rhs: &Function) -> Result<Function, Error> {
        let new_len = lhs.input_len + rhs.input_len;
        let lhs_wide = lhs.prepare_for_lhs(new_len);
        let rhs_wide = rhs.prepare_for_rhs(new_len);
        let output_len = lhs.output_len + rhs.output_len;

        let mut monomials = Vec::with_capacity(lhs_wide.monomials().len() + rhs_wide.monomials().len());
        let mut contributions = Vec::with_capacity(monomials.capacity());

        for (m, c) in lhs_wide.monomials().iter().zip(lhs_wide.contributions().iter()) {
            monomials.push(m.clone());
            contributions.push(c.extended(output_len));
        }
        for (m, c) in rhs_wide.monomials().iter().zip(rhs_wide.contributions().iter()) {
            monomials.push(m.clone());
            contributions.push(c.shifted(lhs.output_len, output_len));
        }
        Function::new(new_len, output_len, monomials, contributions)
    }

    /// Symbolic composition `self ∘ inner`: a new function over
    /// `inner.input_length()` inputs such that
    /// `self.compose(inner)?.apply(v) == self.apply(inner.apply(v)?)?`
    /// for all `v`. Requires `self.input_length() == inner.output_length()`.
    ///
    /// Uses a transient default-sized `WorkerPool`; callers that want to
    /// share a pool or tune scheduling should use `compose_with`.
    pub fn compose(&self, inner: &Function) -> Result<Function, Error> {
        let pool = WorkerPool::with_default_size();
        let composer = Composer::new(&pool, ComposeConfig::default());
        let result = self.compose_with(inner, &composer);
        pool.shutdown();
        result
    }

    /// Symbolic composition using a caller-supplied `Composer` (and thus a
    /// caller-owned `WorkerPool` and `ComposeConfig`).
    pub fn compose_with(&self, inner: &Function, composer: &Composer) -> Result<Function, Error> {
        if self.input_len != inner.output_len {
            return Err(Error::InputOutputMismatch {
                compose_input: self.input_len,
                inner_output: inner.output_len,
            });
        }
        compose_functions(composer, self, inner)
    }

    /// `self.compose_two(lhs, rhs)` ≡ `self.compose(concatenate(lhs, rhs))`.
    pub fn compose_two(&self, lhs: &Function, rhs: &Function) -> Result<Function, Error> {
        let inner = Function::concatenate(lhs, rhs)?;
        self.compose(&inner)
    }

    /// `truncated_identity(start, stop, n)`: an `(n -> stop-start+1)`
    /// function whose output bit `j` equals input bit `start+j`.
    pub fn truncated_identity(start: usize, stop: usize, n: usize) -> Result<Function, Error> {
        if stop < start || stop >= n {
            return Err(Error::LengthMismatch {
                what: "Function::truncated_identity range",
                left: stop,
                right: n,
            });
        }
        let output_len = stop - start + 1;
        let mut monomials = Vec::with_capacity(output_len);
        let mut contributions = Vec::with_capacity(output_len);
        for j in 0..output_len {
            monomials.push(Monomial::linear(n, start + j));
            contributions.push(BitVec::from_bits(output_len, &[j]));
        }
        Function::new(n, output_len, monomials, contributions)
    }
}

impl PartialEq for Function {
    /// Structural equality up to canonical-form permutation: compares the
    /// `(monomial, contribution)` pairs as sets, not array order.
    fn eq(&self, other: &Self) -> bool {
        if self.input_len != other.input_len || self.output_len != other.output_len {
            return false;
        }
        let (lm, lc) = self.plain();
        let (rm, rc) = other.plain();
        if lm.len() != rm.len() {
            return false;
        }
        let left: MonomialMap = lm.iter().cloned().zip(lc.iter().cloned()).collect();
        rm.iter().zip(rc.iter()).all(|(m, c)| left.get(m) == Some(c))
    }
}

/// Builder for assembling a canonical `Function` incrementally, matching
/// duplicate monomials by XOR as they are added.
pub struct Builder {
    input_len: usize,
    output_len: usize,
    map: MonomialMap,
}

impl Builder {
    pub fn new(input_len: usize, output_len: usize) -> Self {
        Builder {
            input_len,
            output_len,
            map: MonomialMap::new(),
        }
    }

    /// Add a `(monomial, contribution)` pair, XOR-ing into any existing
    /// entry for the same monomial.
    pub fn add(mut self, monomial: Monomial, contribution: BitVec) -> Result<Self, Error> {
        if monomial.len() != self.input_len {
            return Err(Error::LengthMismatch {
                what: "Builder::add monomial width",
                left: monomial.len(),
                right: self.input_len,
            });
        }
        if contribution.len() != self.output_len {
            return Err(Error::LengthMismatch {
                what: "Builder::add contribution width",
                left: contribution.len(),
                right: self.output_len,
            });
        }
        self.map.xor_into(monomial, &contribution, self.output_len)?;
        Ok(self)
    }

    pub fn build(self) -> Function {
        Function::from_monomial_contribution_map(self.input_len, self.output_len, self.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bv(n: usize, bits: &[usize]) -> BitVec {
        BitVec::from_bits(n, bits)
    }

    #[test]
    fn xor_of_equal_constants_is_zero_function() {
        let f = Builder::new(4, 4)
            .add(Monomial::constant(4), bv(4, &[0, 1, 2, 3]))
            .unwrap()
            .build();
        let g = f.clone();
        let z = f.xor(&g).unwrap();
        assert!(z.monomials().is_empty());
        assert_eq!(z.apply(&bv(4, &[0])).unwrap(), BitVec::zeros(4));
    }

    #[test]
    fn and_of_single_linear_monomials() {
        // f = x0 -> 0001, g = x1 -> 0001
        let f = Builder::new(4, 4)
            .add(Monomial::linear(4, 0), bv(4, &[0]))
            .unwrap()
            .build();
        let g = Builder::new(4, 4)
            .add(Monomial::linear(4, 1), bv(4, &[0]))
            .unwrap()
            .build();
        let h = f.and(&g).unwrap();
        assert_eq!(h.monomials().len(), 1);
        assert_eq!(h.monomials()[0], Monomial::from_indices(4, &[0, 1]));
        assert_eq!(h.apply(&bv(4, &[0, 1])).unwrap(), bv(4, &[0]));
        assert_eq!(h.apply(&bv(4, &[1])).unwrap(), BitVec::zeros(4));
    }

    #[test]
    fn truncated_identity_extracts_a_range() {
        let f = Function::truncated_identity(0, 3, 4).unwrap();
        assert_eq!(f.apply(&bv(4, &[0, 2, 3])).unwrap(), bv(4, &[0, 2, 3]));
    }

    #[test]
    fn extend_preserves_apply_on_zero_high_half() {
        let f = Builder::new(4, 4)
            .add(Monomial::linear(4, 1), bv(4, &[0]))
            .unwrap()
            .build();
        let wide = f.extend(8);
        assert_eq!(
            wide.apply(&bv(8, &[1])).unwrap(),
            bv(4, &[0])
        );
        assert_eq!(wide.apply(&bv(8, &[5])).unwrap(), BitVec::zeros(4));
    }

    #[test]
    fn counting_matches_definition() {
        let f = Builder::new(4, 4)
            .add(Monomial::linear(4, 0), bv(4, &[0, 1]))
            .unwrap()
            .add(Monomial::from_indices(4, &[0, 1]), bv(4, &[2]))
            .unwrap()
            .build();
        assert_eq!(f.total_monomial_count(), 3);
        assert_eq!(f.maximum_monomial_order(), 2);
    }

    #[test]
    fn shape_mismatch_on_xor_is_rejected() {
        let f = Builder::new(4, 4).build();
        let g = Builder::new(8, 4).build();
        assert!(matches!(f.xor(&g), Err(Error::LengthMismatch { .. })));
    }
}
