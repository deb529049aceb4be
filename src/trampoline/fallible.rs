//! Short-circuiting chains over `Trampoline<Result<A, E>>`.
//!
//! The engine traps nothing; errors are ordinary values that skip the
//! remaining `Ok` continuations and come out of `run` as they went in.

use super::types::Trampoline;

impl<A: 'static, E: 'static> Trampoline<Result<A, E>> {
    /// A finished successful computation
    pub fn ok(value: A) -> Self {
        Trampoline::pure(Ok(value))
    }

    /// A finished failed computation
    pub fn err(error: E) -> Self {
        Trampoline::pure(Err(error))
    }

    /// Continue with `continuation` on `Ok`; pass `Err` through untouched.
    pub fn bind_ok<B, F>(self, continuation: F) -> Trampoline<Result<B, E>>
    where
        B: 'static,
        F: FnOnce(A) -> Trampoline<Result<B, E>> + 'static,
    {
        self.bind(|result| match result {
            Ok(value) => continuation(value),
            Err(e) => Trampoline::pure(Err(e)),
        })
    }

    /// Transform the `Ok` value; pass `Err` through untouched.
    pub fn map_ok<B, F>(self, transform: F) -> Trampoline<Result<B, E>>
    where
        B: 'static,
        F: FnOnce(A) -> B + 'static,
    {
        self.map(|result| result.map(transform))
    }
}
