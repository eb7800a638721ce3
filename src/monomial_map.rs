//! `MonomialMap`: the mutable scratchpad used while building a `Function`.
//!
//! A map from `Monomial` (by support equality/hash) to a `BitVec` of
//! contributions. Used by XOR, AND and composition to accumulate
//! contributions before the result is frozen into the parallel-array
//! canonical form a `Function` stores.

use std::collections::HashMap;

use crate::bitvec::BitVec;
use crate::error::Error;
use crate::monomial::Monomial;

/// Mutable accumulator mapping monomials to output-bit contributions.
#[derive(Clone, Debug, Default)]
pub struct MonomialMap {
    entries: HashMap<Monomial, BitVec>,
}

impl MonomialMap {
    pub fn new() -> Self {
        MonomialMap {
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// XOR `contribution` into the entry for `monomial`, inserting a fresh
    /// zero vector of the given `output_len` if absent first.
    pub fn xor_into(
        &mut self,
        monomial: Monomial,
        contribution: &BitVec,
        output_len: usize,
    ) -> Result<(), Error> {
        let entry = self
            .entries
            .entry(monomial)
            .or_insert_with(|| BitVec::zeros(output_len));
        entry.xor_assign(contribution)
    }

    /// Set bit `row` of the entry for `monomial`, inserting a fresh zero
    /// vector first if absent. Used by the composer's recombination step
    /// which sets bits directly rather than XOR-ing.
    pub fn set_bit(&mut self, monomial: Monomial, row: usize, output_len: usize) {
        let entry = self
            .entries
            .entry(monomial)
            .or_insert_with(|| BitVec::zeros(output_len));
        entry.set(row);
    }

    pub fn get(&self, monomial: &Monomial) -> Option<&BitVec> {
        self.entries.get(monomial)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Monomial, &BitVec)> {
        self.entries.iter()
    }

    pub fn insert(&mut self, monomial: Monomial, contribution: BitVec) {
        self.entries.insert(monomial, contribution);
    }

    /// Drop entries whose contribution is all-zero and split the rest into
    /// the parallel arrays a canonical `Function` stores.
    pub fn into_canonical_arrays(self) -> (Vec<Monomial>, Vec<BitVec>) {
        let filtered = remove_nil_contributions(self.entries);
        filtered.into_iter().unzip()
    }
}

impl std::iter::FromIterator<(Monomial, BitVec)> for MonomialMap {
    fn from_iter<I: IntoIterator<Item = (Monomial, BitVec)>>(iter: I) -> Self {
        MonomialMap {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Filter a `(monomial, contribution)` map down to entries with a
/// non-zero contribution, without consuming the map.
pub fn filter_nil_contributions(
    entries: &HashMap<Monomial, BitVec>,
) -> Vec<(Monomial, BitVec)> {
    entries
        .iter()
        .filter(|(_, c)| !c.is_zero())
        .map(|(m, c)| (m.clone(), c.clone()))
        .collect()
}

/// Consuming version of `filter_nil_contributions`: drops all-zero
/// contributions and returns the rest, owned.
pub fn remove_nil_contributions(
    entries: HashMap<Monomial, BitVec>,
) -> Vec<(Monomial, BitVec)> {
    entries.into_iter().filter(|(_, c)| !c.is_zero()).collect()
}

/// For a given output `row`, the monomials whose contribution has bit
/// `row` set — i.e. the set of outer monomials that appear in the
/// polynomial for that output bit. Used by the composer's recombination
/// step to build `acc` for each row.
pub fn contributions_to_monomials<'a>(
    row: usize,
    monomials: &'a [Monomial],
    contributions: &'a [BitVec],
) -> impl Iterator<Item = &'a Monomial> + 'a {
    monomials
        .iter()
        .zip(contributions.iter())
        .filter(move |(_, c)| c.get(row))
        .map(|(m, _)| m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_into_collapses_duplicates_to_zero() {
        let mut map = MonomialMap::new();
        let m = Monomial::linear(4, 0);
        let c = BitVec::from_bits(4, &[0]);
        map.xor_into(m.clone(), &c, 4).unwrap();
        map.xor_into(m, &c, 4).unwrap();
        let (monomials, _) = map.into_canonical_arrays();
        assert!(monomials.is_empty());
    }

    #[test]
    fn set_bit_builds_contribution_incrementally() {
        let mut map = MonomialMap::new();
        let m = Monomial::linear(4, 1);
        map.set_bit(m.clone(), 0, 4);
        map.set_bit(m.clone(), 2, 4);
        let c = map.get(&m).unwrap();
        assert!(c.get(0) && c.get(2) && !c.get(1));
    }

    #[test]
    fn contributions_to_monomials_filters_by_row() {
        let monomials = vec![Monomial::linear(4, 0), Monomial::linear(4, 1)];
        let contributions = vec![
            BitVec::from_bits(4, &[0]),
            BitVec::from_bits(4, &[0, 1]),
        ];
        let row1: Vec<_> = contributions_to_monomials(1, &monomials, &contributions).collect();
        assert_eq!(row1, vec![&monomials[1]]);
    }
}
