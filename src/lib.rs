//! stacksafe - Stack-Safe Deferred Computations
//!
//! This library provides a trampoline: a value describing a chain of
//! computations, and a driver that evaluates the chain in constant native
//! stack space however deeply, and in whichever direction, it was nested.
//! Recursive algorithms can keep their direct, self-referential shape while
//! "the next step" is reified as data instead of a pending stack frame.
//!
//! # Architecture
//!
//! 1. **Trampoline core** (`trampoline` module)
//!    - [`Trampoline::pure`] and [`Trampoline::defer`] build computations
//!    - [`Trampoline::bind`] and [`Trampoline::map`] compose them in O(1)
//!    - [`Trampoline::run`] drives the chain to its value, re-associating
//!      left-nested binds as it unwinds
//!
//! 2. **Driver configuration** (`config` module)
//!    - [`Driver`] adds an optional step budget and per-run [`RunStats`]
//!    - [`DriverConfig`] is read from code, `STACKSAFE_*` variables or TOML
//!
//! 3. **Consumers** (`structures` and `optimizer` modules)
//!    - [`List`] and [`Tree`] folds, [`Optimizer`] fixed-point loops
//!
//! # Example
//!
//! ```rust
//! use stacksafe::Trampoline;
//!
//! // Right-nested: every level binds on the result of the level below
//! fn sum_to(n: u64) -> Trampoline<u64> {
//!     if n == 0 {
//!         Trampoline::pure(0)
//!     } else {
//!         Trampoline::defer(move || sum_to(n - 1).bind(move |acc| Trampoline::pure(acc + n)))
//!     }
//! }
//!
//! assert_eq!(sum_to(100_000).run(), 100_000 * 100_001 / 2);
//! ```
//!
//! # Evaluation Strategy
//!
//! - **Lazy**: nothing runs until `run`; thunks run exactly once
//! - **Transparent errors**: panics from continuations propagate unchanged;
//!   `Trampoline<Result<_, _>>` chains short-circuit with `bind_ok`
//! - **Stack-safe teardown**: dropping an unevaluated or abandoned chain
//!   does not recurse

pub mod config;
pub mod error;
pub mod optimizer;
pub mod structures;
pub mod trampoline;

pub use config::{DriverConfig, RunStats};
pub use error::{ConfigError, TrampolineError};
pub use optimizer::Optimizer;
pub use structures::{List, Tree, TreeView};
pub use trampoline::{Driver, Trampoline};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_scenarios() {
        assert_eq!(Trampoline::pure(5).run(), 5);
        assert_eq!(Trampoline::pure(3).bind(|x| Trampoline::pure(x + 1)).run(), 4);
        assert_eq!(Trampoline::pure(10).map(|x| x * 2).run(), 20);
        assert_eq!(
            Trampoline::defer(|| Trampoline::pure(7))
                .bind(|x| Trampoline::pure(x - 2))
                .run(),
            5
        );
    }

    #[test]
    fn test_consumers_share_the_driver() {
        let list: List<u64> = (1..=10).collect();
        let tree = Tree::binary(Tree::leaf(1u64), Tree::unary(Tree::leaf(2)));

        let t = list
            .fold_left_trampoline(|acc: u64, x: &u64| acc + x, 0)
            .bind(move |sum| tree.fold_left_trampoline(|acc: u64, x: &u64| acc + x, sum));

        let mut driver = Driver::default();
        assert_eq!(driver.run(t), Ok(58));
        assert!(driver.stats().steps > 0);
    }
}
