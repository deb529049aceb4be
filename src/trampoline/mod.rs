//! Trampoline-based Stack-Safe Evaluation
//!
//! This module provides the deferred-computation type [`Trampoline`] and the
//! engine that evaluates it with an explicit rewrite loop instead of
//! recursive calls. Chains of any depth, nested to the left or to the right,
//! run in constant native stack space.

mod engine;
mod fallible;
mod types;

pub use engine::Driver;
pub use types::Trampoline;
