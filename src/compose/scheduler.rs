//! The greedy factor-sharing scheduler: builds, for every outer monomial
//! that appears in `outer`, its expansion as a set of inner monomials,
//! reusing partial products wherever possible.

use std::collections::{HashMap, HashSet};

use itertools::iproduct;
use log::{debug, trace, warn};

use crate::error::Error;
use crate::function::Function;
use crate::monomial::Monomial;
use crate::monomial_map::contributions_to_monomials;

/// A monomial's expansion in the inner basis: the set of inner monomials
/// whose GF(2) sum equals that polynomial. Representing it as a set (not a
/// signed multiset) is correct because expansion is a symmetric-difference
/// combiner throughout — duplicates always cancel.
pub type Expansion = HashSet<Monomial>;

/// `expansions[M]` for every outer monomial `M` required by `outer`,
/// computed against `inner`.
pub struct Expansions {
    map: HashMap<Monomial, Expansion>,
}

impl Expansions {
    pub fn get(&self, m: &Monomial) -> Option<&Expansion> {
        self.map.get(m)
    }
}

/// The sequence of products the scheduler chose to compute, in order,
/// recording `target = a * b` for each. Because the generators (seeds for
/// the `n_o` outer linear monomials and the constant) are reconstructible
/// directly from `inner` regardless of which algebra represents an
/// expansion, replaying this plan against a different `Expansion`-like
/// representation (`BasisVector`, see `compose::basis`) reproduces the
/// identical schedule of work without re-running candidate selection.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    pub steps: Vec<(Monomial, Monomial, Monomial)>,
}

pub struct SchedulerOutput {
    pub expansions: Expansions,
    pub plan: Plan,
}

/// Symmetric-difference product of two expansions: the expansion of
/// `(Σ a)(Σ b)` in GF(2)[x]/(x_i² - x_i).
fn product_expansions(a: &Expansion, b: &Expansion) -> Result<Expansion, Error> {
    let mut out: Expansion = HashSet::new();
    for x in a {
        for y in b {
            let p = Monomial::product(x, y)?;
            if !out.remove(&p) {
                out.insert(p);
            }
        }
    }
    Ok(out)
}

/// A monomial's total order, used as an explicit, reproducible tie-break
/// when two candidates score equally (first-seen-wins would depend on
/// hash iteration order). Lexicographic over the ascending support indices.
fn order_key(m: &Monomial) -> Vec<usize> {
    m.support().collect()
}

/// Run the scheduler: returns `Expansions` covering every monomial in
/// `outer.monomials()` (the constant monomial, if present, is handled
/// separately by the caller — its expansion is always `{constant(n_i)}`).
pub fn schedule(
    outer: &Function,
    inner: &Function,
    max_outer_order: Option<usize>,
) -> Result<SchedulerOutput, Error> {
    let n_o = outer.input_length();
    let n_i = inner.input_length();

    let mut map: HashMap<Monomial, Expansion> = HashMap::new();
    let mut plan = Plan::default();

    // Seed expansions for each outer linear monomial x_i with the
    // inner polynomial producing output bit i.
    for i in 0..n_o {
        let exp: Expansion = contributions_to_monomials(i, inner.monomials(), inner.contributions())
            .cloned()
            .collect();
        map.insert(Monomial::linear(n_o, i), exp);
    }

    let constant = Monomial::constant(n_o);
    map.insert(constant.clone(), {
        let mut s = HashSet::new();
        s.insert(Monomial::constant(n_i));
        s
    });

    let required: HashSet<Monomial> = outer
        .monomials()
        .iter()
        .filter(|m| **m != constant)
        .cloned()
        .collect();

    debug!(
        "composer: {} required outer monomials, {} inner-basis generators",
        required.len(),
        n_o
    );

    let mut rounds = 0usize;
    loop {
        if required.iter().all(|r| map.contains_key(r)) {
            break;
        }

        // Enumerate candidate products of already-expanded
        // outer monomials, keeping one witness pair per candidate.
        let expanded_keys: Vec<Monomial> = map.keys().cloned().collect();
        let mut candidates: HashMap<Monomial, (Monomial, Monomial)> = HashMap::new();
        for (a, b) in iproduct!(&expanded_keys, &expanded_keys) {
            let p = Monomial::product(a, b)?;
            if map.contains_key(&p) {
                continue;
            }
            if let Some(max) = max_outer_order {
                if p.cardinality() > max {
                    continue;
                }
            }
            let divides_required = required.iter().any(|r| r.has_factor(&p).unwrap_or(false));
            if !divides_required {
                continue;
            }
            candidates.entry(p).or_insert((a.clone(), b.clone()));
        }

        if candidates.is_empty() {
            trace!("composer: no further candidates this round, falling back to recovery");
            break;
        }

        // Score each candidate by how many required monomials it is a
        // factor of; select the argmax, breaking ties by an explicit
        // lexicographic order over the candidate's own support.
        let mut best: Option<(Monomial, (Monomial, Monomial), usize)> = None;
        for (p, witness) in &candidates {
            let score = required.iter().filter(|r| r.has_factor(p).unwrap_or(false)).count();
            debug_assert!(score > 0, "candidate {:?} enumerated without dividing any required monomial", p);
            let better = match &best {
                None => true,
                Some((bm, _, bscore)) => {
                    score > *bscore || (score == *bscore && order_key(p) < order_key(bm))
                }
            };
            if better {
                best = Some((p.clone(), witness.clone(), score));
            }
        }

        let (pivot, (a, b), score) = best.expect("candidates is non-empty");
        if score == 0 {
            return Err(Error::ScheduleInvariant(format!(
                "selected candidate {:?} has score 0",
                pivot
            )));
        }

        // Expand and memoize.
        let exp_a = map.get(&a).expect("witness a was already expanded").clone();
        let exp_b = map.get(&b).expect("witness b was already expanded").clone();
        let expanded = product_expansions(&exp_a, &exp_b)?;
        trace!(
            "composer: round {} chose pivot {:?} = {:?} * {:?} (score {})",
            rounds,
            pivot,
            a,
            b,
            score
        );
        plan.steps.push((pivot.clone(), a, b));
        map.insert(pivot, expanded);
        rounds += 1;
    }

    // Single-step recovery for anything the greedy rounds
    // above didn't reach (typically because `max_outer_order` pruned the
    // direct path).
    let mut remaining: Vec<Monomial> = required
        .iter()
        .filter(|r| !map.contains_key(*r))
        .cloned()
        .collect();
    remaining.sort_by_key(|m| order_key(m));

    for r in remaining {
        if map.contains_key(&r) {
            continue;
        }
        let mut recovered = false;
        let mut qs: Vec<Monomial> = required
            .iter()
            .filter(|q| map.contains_key(*q) && **q != r)
            .cloned()
            .collect();
        qs.sort_by_key(|m| order_key(m));
        for q in qs {
            if let Some(quotient) = r.divide(&q)? {
                if let Some(exp_quotient) = map.get(&quotient).cloned() {
                    let exp_q = map.get(&q).expect("q was checked above").clone();
                    let expanded = product_expansions(&exp_quotient, &exp_q)?;
                    warn!(
                        "composer: recovered expansion for {:?} via {:?} / {:?}",
                        r, r, q
                    );
                    plan.steps.push((r.clone(), quotient, q));
                    map.insert(r.clone(), expanded);
                    recovered = true;
                    break;
                }
            }
        }
        if !recovered {
            return Err(Error::ScheduleInvariant(format!(
                "required monomial {:?} has no derivable expansion",
                r
            )));
        }
    }

    debug_assert!(required.iter().all(|r| map.contains_key(r)));
    Ok(SchedulerOutput {
        expansions: Expansions { map },
        plan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitvec::BitVec;
    use crate::function::Builder;

    #[test]
    fn quadratic_composition_shares_factors_across_required_monomials() {
        // outer: h(y0,y1) = y0*y1 -> 0001
        let outer = Builder::new(2, 4)
            .add(Monomial::from_indices(2, &[0, 1]), BitVec::from_bits(4, &[0]))
            .unwrap()
            .build();
        // inner: g(x0,x1,x2) = (x0 xor x2, x1)
        let inner = Builder::new(3, 2)
            .add(Monomial::linear(3, 0), BitVec::from_bits(2, &[0]))
            .unwrap()
            .add(Monomial::linear(3, 2), BitVec::from_bits(2, &[0]))
            .unwrap()
            .add(Monomial::linear(3, 1), BitVec::from_bits(2, &[1]))
            .unwrap()
            .build();

        let output = schedule(&outer, &inner, None).unwrap();
        let pivot = Monomial::from_indices(2, &[0, 1]);
        let exp = output.expansions.get(&pivot).unwrap();
        let expected: HashSet<Monomial> = [
            Monomial::from_indices(3, &[0, 1]),
            Monomial::from_indices(3, &[1, 2]),
        ]
        .into_iter()
        .collect();
        assert_eq!(exp, &expected);
    }

    fn identity_inner(n: usize) -> Function {
        let mut b = Builder::new(n, n);
        for i in 0..n {
            b = b.add(Monomial::linear(n, i), BitVec::from_bits(n, &[i])).unwrap();
        }
        b.build()
    }

    #[test]
    fn a_low_order_ceiling_forces_single_step_recovery() {
        // outer requires y0*y1 (order 2, directly reachable) and y0*y1*y2
        // (order 3, pruned at max_outer_order 2); the latter can only be
        // recovered by dividing it by the former and multiplying by y2.
        let outer = Builder::new(3, 2)
            .add(Monomial::from_indices(3, &[0, 1]), BitVec::from_bits(2, &[0]))
            .unwrap()
            .add(Monomial::from_indices(3, &[0, 1, 2]), BitVec::from_bits(2, &[1]))
            .unwrap()
            .build();
        let inner = identity_inner(3);

        let output = schedule(&outer, &inner, Some(2)).unwrap();
        let required = Monomial::from_indices(3, &[0, 1, 2]);
        assert!(output.expansions.get(&required).is_some());

        // The recovery step must appear in the recorded plan as the target.
        assert!(output.plan.steps.iter().any(|(target, _, _)| *target == required));
    }

    #[test]
    fn an_unreachable_monomial_under_a_tight_ceiling_is_a_schedule_invariant_error() {
        // The only required monomial is order 3, max_outer_order is 1, and
        // there is no other required monomial to divide by during recovery.
        let outer = Builder::new(3, 1)
            .add(Monomial::from_indices(3, &[0, 1, 2]), BitVec::from_bits(1, &[0]))
            .unwrap()
            .build();
        let inner = identity_inner(3);

        let result = schedule(&outer, &inner, Some(1));
        assert!(matches!(result, Err(Error::ScheduleInvariant(_))));
    }
}
