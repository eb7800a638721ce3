use thiserror::Error;

/// Errors surfaced by the public operations of this crate.
///
/// Validation errors (`LengthMismatch`, `InputOutputMismatch`) are reported
/// at call entry, before any allocation. `ScheduleInvariant` and
/// `WorkerPanic` are fatal internal errors raised during composition; the
/// caller should not retry composition with the same inputs.
#[derive(Debug, Error)]
pub enum Error {
    /// Two operands of a binary operation (`xor`, `and`) did not agree on
    /// input or output length.
    #[error("length mismatch on {what}: left has {left}, right has {right}")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    /// `compose(outer, inner)` was attempted but `outer.input_length()` did
    /// not match `inner.output_length()`.
    #[error(
        "cannot compose: outer function expects {compose_input} inputs but \
         inner function produces {inner_output} outputs"
    )]
    InputOutputMismatch {
        compose_input: usize,
        inner_output: usize,
    },

    /// The greedy scheduler could not find a positive-score
    /// candidate while a required monomial remained unexpanded, and the
    /// single-step recovery pass also failed to cover it.
    /// This is a fatal internal invariant violation.
    #[error("composition scheduler invariant violated: {0}")]
    ScheduleInvariant(String),

    /// A worker pool task panicked while computing part of a composition.
    #[error("worker task panicked: {0}")]
    WorkerPanic(String),

    /// An operation was attempted on a `WorkerPool` after `shutdown()`.
    #[error("operation attempted on a worker pool that has been shut down")]
    PoolShutdown,
}

pub type Result<T> = std::result::Result<T, Error>;
