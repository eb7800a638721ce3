//! Symbolic composition `outer ∘ inner`. Two strategies are implemented,
//! selectable via `ComposeConfig`, both producing the same observable
//! `Function`:
//!
//! - `SetBased`: expansions are `HashSet<Monomial>`, combined by symmetric
//!   difference of pairwise products.
//! - `GrowingBasis`: expansions are `BitVec`-like index sets into a shared,
//!   mutex-guarded, growing monomial basis.
//!
//! Both replay the *same* greedy schedule (`scheduler::schedule`'s `Plan`)
//! so the expensive "which products to compute, in which order" decision
//! is made once; only the algebra used to realize each step differs.

pub mod basis;
pub mod scheduler;

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use log::info;

use crate::error::Error;
use crate::function::Function;
use crate::monomial::Monomial;
use crate::monomial_map::{contributions_to_monomials, MonomialMap};
use crate::pool::WorkerPool;

use self::basis::{product_over_basis, BasisVector, GrowingBasis};
use self::scheduler::Plan;

/// Which recombination strategy a `Composer` uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecombinationStrategy {
    SetBased,
    GrowingBasis,
}

impl Default for RecombinationStrategy {
    fn default() -> Self {
        RecombinationStrategy::SetBased
    }
}

/// Tunables for a `Composer`: the scheduler's order ceiling and the
/// recombination strategy.
#[derive(Clone, Debug, Default)]
pub struct ComposeConfig {
    pub max_outer_order: Option<usize>,
    pub strategy: RecombinationStrategy,
}

/// Orchestrates one or more `compose` calls against a shared `WorkerPool`.
pub struct Composer<'a> {
    pool: &'a WorkerPool,
    config: ComposeConfig,
}

impl<'a> Composer<'a> {
    pub fn new(pool: &'a WorkerPool, config: ComposeConfig) -> Self {
        Composer { pool, config }
    }

    pub fn pool(&self) -> &WorkerPool {
        self.pool
    }

    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }
}

pub fn compose_functions(
    composer: &Composer,
    outer: &Function,
    inner: &Function,
) -> Result<Function, Error> {
    let start = Instant::now();
    let result = match composer.config.strategy {
        RecombinationStrategy::SetBased => compose_set_based(composer, outer, inner),
        RecombinationStrategy::GrowingBasis => compose_growing_basis(composer, outer, inner),
    };
    if let Ok(ref f) = result {
        info!(
            "compose: {} inputs -> {} outputs in {:?}, {} monomials ({:?} strategy)",
            inner.input_length(),
            f.output_length(),
            start.elapsed(),
            f.monomials().len(),
            composer.config.strategy,
        );
    }
    result
}

/// The primary, set-based recombination.
fn compose_set_based(composer: &Composer, outer: &Function, inner: &Function) -> Result<Function, Error> {
    let n_i = inner.input_length();
    let output_len = outer.output_length();
    let scheduler::SchedulerOutput { expansions, .. } =
        scheduler::schedule(outer, inner, composer.config.max_outer_order)?;

    let row_tasks: Vec<_> = (0..output_len)
        .map(|row| {
            let outer = outer;
            let expansions = &expansions;
            move || -> Result<scheduler::Expansion, Error> {
                let mut acc = scheduler::Expansion::new();
                for (m, c) in outer.monomials().iter().zip(outer.contributions().iter()) {
                    if c.get(row) {
                        let exp = expansions.get(m).ok_or_else(|| {
                            Error::ScheduleInvariant(format!(
                                "no expansion computed for required monomial {:?}",
                                m
                            ))
                        })?;
                        for x in exp {
                            if !acc.remove(x) {
                                acc.insert(x.clone());
                            }
                        }
                    }
                }
                Ok(acc)
            }
        })
        .collect();

    let rows = composer.pool.run_stage(row_tasks)?;

    let mut map = MonomialMap::new();
    for (row, result) in rows.into_iter().enumerate() {
        for m in result? {
            map.set_bit(m, row, output_len);
        }
    }
    Ok(Function::from_monomial_contribution_map(n_i, output_len, map))
}

/// The alternative, growing-basis recombination. Replays
/// the same `Plan` the set-based scheduler computed, but realizes each
/// step as a `BitVec`-indexed product against a shared `GrowingBasis`
/// instead of a `HashSet<Monomial>` symmetric difference.
fn compose_growing_basis(composer: &Composer, outer: &Function, inner: &Function) -> Result<Function, Error> {
    let n_o = outer.input_length();
    let n_i = inner.input_length();
    let output_len = outer.output_length();

    let scheduler::SchedulerOutput { plan, .. } =
        scheduler::schedule(outer, inner, composer.config.max_outer_order)?;

    let basis = GrowingBasis::seeded(inner.monomials().iter().cloned());
    let expansions = realize_plan_over_basis(n_o, inner, &plan, &basis)?;

    let row_tasks: Vec<_> = (0..output_len)
        .map(|row| {
            let outer = outer;
            let expansions = &expansions;
            move || -> Result<BasisVector, Error> {
                let mut acc: BTreeSet<usize> = BTreeSet::new();
                for (m, c) in outer.monomials().iter().zip(outer.contributions().iter()) {
                    if c.get(row) {
                        let exp = expansions.get(m).ok_or_else(|| {
                            Error::ScheduleInvariant(format!(
                                "no basis expansion computed for required monomial {:?}",
                                m
                            ))
                        })?;
                        for &idx in exp.indices() {
                            if !acc.remove(&idx) {
                                acc.insert(idx);
                            }
                        }
                    }
                }
                Ok(BasisVector::from_indices(acc))
            }
        })
        .collect();

    let rows = composer.pool.run_stage(row_tasks)?;

    let mut map = MonomialMap::new();
    for (row, result) in rows.into_iter().enumerate() {
        let vector = result?;
        for &idx in vector.indices() {
            map.set_bit(basis.get(idx), row, output_len);
        }
    }
    Ok(Function::from_monomial_contribution_map(n_i, output_len, map))
}

fn realize_plan_over_basis(
    n_o: usize,
    inner: &Function,
    plan: &Plan,
    basis: &GrowingBasis,
) -> Result<HashMap<Monomial, BasisVector>, Error> {
    let mut map: HashMap<Monomial, BasisVector> = HashMap::new();

    for i in 0..n_o {
        let indices: Vec<usize> = contributions_to_monomials(i, inner.monomials(), inner.contributions())
            .map(|m| basis.index_of_or_insert(m))
            .collect();
        map.insert(Monomial::linear(n_o, i), BasisVector::from_indices(indices));
    }
    let constant_index = basis.index_of_or_insert(&Monomial::constant(inner.input_length()));
    map.insert(
        Monomial::constant(n_o),
        BasisVector::from_indices(vec![constant_index]),
    );

    for (target, a, b) in &plan.steps {
        let va = map
            .get(a)
            .ok_or_else(|| Error::ScheduleInvariant(format!("plan replay missing operand {:?}", a)))?
            .clone();
        let vb = map
            .get(b)
            .ok_or_else(|| Error::ScheduleInvariant(format!("plan replay missing operand {:?}", b)))?
            .clone();
        let combined = product_over_basis(&va, &vb, basis)?;
        map.insert(target.clone(), combined);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitvec::BitVec;
    use crate::function::Builder;

    fn small_outer_inner() -> (Function, Function) {
        let outer = Builder::new(2, 4)
            .add(Monomial::from_indices(2, &[0, 1]), BitVec::from_bits(4, &[0]))
            .unwrap()
            .build();
        let inner = Builder::new(3, 2)
            .add(Monomial::linear(3, 0), BitVec::from_bits(2, &[0]))
            .unwrap()
            .add(Monomial::linear(3, 2), BitVec::from_bits(2, &[0]))
            .unwrap()
            .add(Monomial::linear(3, 1), BitVec::from_bits(2, &[1]))
            .unwrap()
            .build();
        (outer, inner)
    }

    #[test]
    fn both_strategies_agree_on_the_spec_scenario() {
        let (outer, inner) = small_outer_inner();
        let pool = WorkerPool::with_default_size();

        let set_based = Composer::new(&pool, ComposeConfig::default());
        let h1 = compose_functions(&set_based, &outer, &inner).unwrap();

        let growing = Composer::new(
            &pool,
            ComposeConfig {
                max_outer_order: None,
                strategy: RecombinationStrategy::GrowingBasis,
            },
        );
        let h2 = compose_functions(&growing, &outer, &inner).unwrap();

        assert_eq!(h1, h2);
        for bits in [
            BitVec::from_bits(3, &[0, 1, 2]),
            BitVec::from_bits(3, &[0, 1]),
            BitVec::from_bits(3, &[1, 2]),
            BitVec::zeros(3),
        ] {
            assert_eq!(h1.apply(&bits).unwrap(), h2.apply(&bits).unwrap());
        }
        pool.shutdown();
    }

    #[test]
    fn compose_matches_direct_evaluation() {
        let (outer, inner) = small_outer_inner();
        let pool = WorkerPool::with_default_size();
        let composer = Composer::new(&pool, ComposeConfig::default());
        let composed = compose_functions(&composer, &outer, &inner).unwrap();

        for bits in [
            BitVec::from_bits(3, &[0, 1, 2]),
            BitVec::from_bits(3, &[0, 1]),
            BitVec::from_bits(3, &[1, 2]),
            BitVec::zeros(3),
        ] {
            let inner_out = inner.apply(&bits).unwrap();
            let expected = outer.apply(&inner_out).unwrap();
            assert_eq!(composed.apply(&bits).unwrap(), expected);
        }
        pool.shutdown();
    }
}
