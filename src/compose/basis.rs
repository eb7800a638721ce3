//! An alternative recombination strategy: a growing, shared monomial basis
//! `L` with `BitVec`-indexed expansions instead of `HashSet<Monomial>` ones.
//! Callers may pick either this or the set-based scheduler; both agree on
//! the observable composed function.

use std::sync::Mutex;

use crate::bitvec::BitVec;
use crate::error::Error;
use crate::monomial::Monomial;

use std::collections::HashMap;

/// A growing, shared list of inner monomials together with the inverse
/// index `monomial -> position`. Appends are serialized by a mutex so the
/// bijection `basis[index_of[p]] == p` always holds, even if two workers
/// discover the same new product concurrently: ownership of `L` and `indices` is shared-mutable, appends
/// are serialized by a mutex.
pub struct GrowingBasis {
    inner: Mutex<GrowingBasisInner>,
}

struct GrowingBasisInner {
    list: Vec<Monomial>,
    index_of: HashMap<Monomial, usize>,
}

impl GrowingBasis {
    pub fn new() -> Self {
        GrowingBasis {
            inner: Mutex::new(GrowingBasisInner {
                list: Vec::new(),
                index_of: HashMap::new(),
            }),
        }
    }

    pub fn seeded(monomials: impl IntoIterator<Item = Monomial>) -> Self {
        let basis = Self::new();
        for m in monomials {
            basis.index_of_or_insert(&m);
        }
        basis
    }

    /// Return `p`'s index in the basis, appending it if it is not already
    /// present. Atomic with respect to other callers.
    pub fn index_of_or_insert(&self, p: &Monomial) -> usize {
        let mut guard = self.inner.lock().expect("growing basis mutex poisoned");
        if let Some(&i) = guard.index_of.get(p) {
            return i;
        }
        let i = guard.list.len();
        guard.list.push(p.clone());
        guard.index_of.insert(p.clone(), i);
        i
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("growing basis mutex poisoned").list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the basis list as it stands right now.
    pub fn snapshot(&self) -> Vec<Monomial> {
        self.inner.lock().expect("growing basis mutex poisoned").list.clone()
    }

    pub fn get(&self, index: usize) -> Monomial {
        self.inner.lock().expect("growing basis mutex poisoned").list[index].clone()
    }
}

impl Default for GrowingBasis {
    fn default() -> Self {
        Self::new()
    }
}

/// A sparse BitVec-valued expansion against a `GrowingBasis`: bit `k` set
/// means basis element `k` is present in this monomial's expansion. Unlike
/// `Function`'s fixed-width `BitVec`, this grows as the basis does, so it
/// is kept as a sparse index set until the basis stabilizes.
#[derive(Clone, Debug, Default)]
pub struct BasisVector(Vec<usize>);

impl BasisVector {
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut v: Vec<usize> = indices.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        BasisVector(v)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Symmetric difference: toggle bit `k` in the accumulator.
    fn toggle(set: &mut std::collections::BTreeSet<usize>, k: usize) {
        if !set.remove(&k) {
            set.insert(k);
        }
    }

    /// Convert to a fixed-width `BitVec` once the basis size is known
    /// (i.e. once no more appends are expected against it).
    pub fn into_bitvec(self, width: usize) -> BitVec {
        BitVec::from_bits(width, &self.0)
    }
}

/// `product(u, v)` at the BitVec level: for every pair of set
/// bits `(i, j)`, multiply `basis[i] * basis[j]`, look the product up in
/// (or append it to) `basis`, and toggle that bit in the result.
pub fn product_over_basis(
    u: &BasisVector,
    v: &BasisVector,
    basis: &GrowingBasis,
) -> Result<BasisVector, Error> {
    let mut acc = std::collections::BTreeSet::new();
    for &i in u.indices() {
        let mi = basis.get(i);
        for &j in v.indices() {
            let mj = basis.get(j);
            let p = Monomial::product(&mi, &mj)?;
            let k = basis.index_of_or_insert(&p);
            BasisVector::toggle(&mut acc, k);
        }
    }
    Ok(BasisVector::from_indices(acc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookup_does_not_duplicate_entries() {
        let basis = GrowingBasis::new();
        let m = Monomial::linear(4, 0);
        let i1 = basis.index_of_or_insert(&m);
        let i2 = basis.index_of_or_insert(&m);
        assert_eq!(i1, i2);
        assert_eq!(basis.len(), 1);
    }

    #[test]
    fn product_over_basis_grows_and_toggles() {
        let basis = GrowingBasis::seeded(vec![Monomial::linear(4, 0), Monomial::linear(4, 1)]);
        let u = BasisVector::from_indices(vec![0]);
        let v = BasisVector::from_indices(vec![1]);
        let r = product_over_basis(&u, &v, &basis).unwrap();
        assert_eq!(basis.len(), 3);
        let expected_index = basis.index_of_or_insert(&Monomial::from_indices(4, &[0, 1]));
        assert_eq!(r.indices(), &[expected_index]);
    }

    #[test]
    fn cross_terms_with_equal_product_cancel() {
        // u = v = {x0, x1}: the ordered pairs (x0,x1) and (x1,x0) both
        // produce x0*x1 and so toggle its basis index twice, cancelling.
        let basis = GrowingBasis::seeded(vec![Monomial::linear(4, 0), Monomial::linear(4, 1)]);
        let u = BasisVector::from_indices(vec![0, 1]);
        let r = product_over_basis(&u, &u, &basis).unwrap();
        let x0_index = basis.index_of_or_insert(&Monomial::linear(4, 0));
        let x1_index = basis.index_of_or_insert(&Monomial::linear(4, 1));
        // x0*x0 = x0 and x1*x1 = x1 each toggle once; x0*x1 toggles twice.
        let mut expected = vec![x0_index, x1_index];
        expected.sort_unstable();
        let mut got = r.indices().to_vec();
        got.sort_unstable();
        assert_eq!(got, expected);
    }
}
