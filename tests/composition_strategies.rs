//! The set-based and growing-basis recombination strategies must be
//! observationally indistinguishable, and a `WorkerPool` must reject work
//! once shut down even when shared across composers.

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use gf2_poly_engine::compose::{ComposeConfig, Composer, RecombinationStrategy};
use gf2_poly_engine::{BitVec, Builder, Error, Monomial, PoolConfig, WorkerPool};

const SEED: [u8; 16] = [3; 16];

fn random_bitvec(rng: &mut impl Rng, n: usize) -> BitVec {
    let bits: Vec<usize> = (0..n).filter(|_| rng.gen_bool(0.5)).collect();
    BitVec::from_bits(n, &bits)
}

fn random_monomial(rng: &mut impl Rng, n: usize, max_order: usize) -> Monomial {
    let order = rng.gen_range(0..=max_order.min(n));
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..order {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    Monomial::from_indices(n, &indices[..order])
}

fn random_function(
    rng: &mut impl Rng,
    input_len: usize,
    output_len: usize,
    terms: usize,
) -> gf2_poly_engine::Function {
    let mut builder = Builder::new(input_len, output_len);
    for _ in 0..terms {
        let m = random_monomial(rng, input_len, 3);
        let c = random_bitvec(rng, output_len);
        builder = builder.add(m, c).unwrap();
    }
    builder.build()
}

#[test]
fn set_based_and_growing_basis_agree_on_random_functions() {
    let mut rng = XorShiftRng::from_seed(SEED);
    let pool = WorkerPool::with_default_size();

    for _ in 0..8 {
        let inner = random_function(&mut rng, 5, 4, 6);
        let outer = random_function(&mut rng, 4, 3, 6);

        let set_based = Composer::new(&pool, ComposeConfig::default());
        let growing = Composer::new(
            &pool,
            ComposeConfig {
                max_outer_order: None,
                strategy: RecombinationStrategy::GrowingBasis,
            },
        );

        let h1 = outer.compose_with(&inner, &set_based).unwrap();
        let h2 = outer.compose_with(&inner, &growing).unwrap();
        assert_eq!(h1, h2);

        for _ in 0..6 {
            let v = random_bitvec(&mut rng, 5);
            assert_eq!(h1.apply(&v).unwrap(), h2.apply(&v).unwrap());
        }
    }
    pool.shutdown();
}

#[test]
fn a_shared_pool_rejects_work_from_either_composer_after_shutdown() {
    let pool = WorkerPool::new(PoolConfig { num_threads: 2 });
    let inner = Builder::new(3, 2)
        .add(Monomial::linear(3, 0), BitVec::from_bits(2, &[0]))
        .unwrap()
        .build();
    let outer = Builder::new(2, 2)
        .add(Monomial::linear(2, 0), BitVec::from_bits(2, &[0]))
        .unwrap()
        .build();

    let composer = Composer::new(&pool, ComposeConfig::default());
    assert!(outer.compose_with(&inner, &composer).is_ok());

    pool.shutdown();
    assert!(matches!(
        outer.compose_with(&inner, &composer),
        Err(Error::PoolShutdown)
    ));
}
