//! Trampoline Types
//!
//! A [`Trampoline`] is either a finished value (`Done`) or a pending sequencing
//! step (`Bound`): "evaluate this source, then feed its result to this
//! continuation". Intermediate result types are erased to `Box<dyn Any>` so the
//! engine can re-associate nodes whose sources carry arbitrary hidden types.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::mem;

use crate::error::TrampolineError;

use super::engine;

/// Type-erased intermediate result
pub(crate) type Value = Box<dyn Any>;

/// Type-erased client continuation
pub(crate) type Apply = Box<dyn FnOnce(Value) -> Node>;

/// Erased computation node
pub(crate) enum Node {
    /// Completed computation holding its result
    Done(Value),
    /// Evaluate the source, then continue with the continuation
    Bound(Box<Node>, Continuation),
}

/// What to do with the result of a `Bound` node's source
pub(crate) enum Continuation {
    /// A client-supplied continuation
    Apply(Apply),
    /// `Then(first, rest)` applied to `x` is `Bound(first(x), rest)`.
    /// Built by re-association; never by clients.
    Then(Box<Continuation>, Box<Continuation>),
}

impl Node {
    /// A `Done(())` node. Boxing a unit does not allocate.
    pub(crate) fn unit() -> Self {
        Node::Done(Box::new(()))
    }
}

/// Unwrap an erased value whose type is fixed by construction
pub(crate) fn unerase<A: 'static>(value: Value) -> A {
    match value.downcast::<A>() {
        Ok(a) => *a,
        Err(_) => unreachable!(
            "trampoline value is not a {}",
            std::any::type_name::<A>()
        ),
    }
}

/// A computation producing an `A` that runs in constant native stack space.
///
/// Nothing is evaluated until [`run`](Trampoline::run) (or
/// [`Driver::run`](crate::Driver::run)) is called. All building operations are
/// O(1).
///
/// Result types and continuations must be `'static` because intermediate
/// results are type-erased.
pub struct Trampoline<A> {
    node: Node,
    _result: PhantomData<fn() -> A>,
}

impl<A: 'static> Trampoline<A> {
    pub(crate) fn from_node(node: Node) -> Self {
        Trampoline {
            node,
            _result: PhantomData,
        }
    }

    pub(crate) fn into_node(mut self) -> Node {
        mem::replace(&mut self.node, Node::unit())
    }

    /// A computation that is already finished with `value`
    pub fn pure(value: A) -> Self {
        Self::from_node(Node::Done(Box::new(value)))
    }

    /// A computation that calls `thunk` once, when the driver reaches it,
    /// and continues with the computation it returns.
    pub fn defer<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Trampoline<A> + 'static,
    {
        Self::from_node(Node::Bound(
            Box::new(Node::unit()),
            Continuation::Apply(Box::new(move |_: Value| thunk().into_node())),
        ))
    }

    /// Like [`defer`](Trampoline::defer), but for a thunk that may be absent.
    pub fn try_defer<F>(thunk: Option<F>) -> Result<Self, TrampolineError>
    where
        F: FnOnce() -> Trampoline<A> + 'static,
    {
        thunk
            .map(Self::defer)
            .ok_or(TrampolineError::MissingContinuation { operation: "defer" })
    }

    /// Run this computation, then the computation `continuation` builds from its result.
    pub fn bind<B, F>(self, continuation: F) -> Trampoline<B>
    where
        B: 'static,
        F: FnOnce(A) -> Trampoline<B> + 'static,
    {
        Trampoline::from_node(Node::Bound(
            Box::new(self.into_node()),
            Continuation::Apply(Box::new(move |value: Value| {
                continuation(unerase(value)).into_node()
            })),
        ))
    }

    /// Alias of [`bind`](Trampoline::bind)
    pub fn flat_map<B, F>(self, continuation: F) -> Trampoline<B>
    where
        B: 'static,
        F: FnOnce(A) -> Trampoline<B> + 'static,
    {
        self.bind(continuation)
    }

    /// Like [`bind`](Trampoline::bind), but for a continuation that may be absent.
    pub fn try_bind<B, F>(self, continuation: Option<F>) -> Result<Trampoline<B>, TrampolineError>
    where
        B: 'static,
        F: FnOnce(A) -> Trampoline<B> + 'static,
    {
        match continuation {
            Some(f) => Ok(self.bind(f)),
            None => Err(TrampolineError::MissingContinuation { operation: "bind" }),
        }
    }

    /// Run this computation and transform its result.
    ///
    /// `transform` is called directly, so it must not recurse deeply itself;
    /// use [`bind`](Trampoline::bind) for that.
    pub fn map<B, F>(self, transform: F) -> Trampoline<B>
    where
        B: 'static,
        F: FnOnce(A) -> B + 'static,
    {
        self.bind(move |a| Trampoline::pure(transform(a)))
    }

    /// Like [`map`](Trampoline::map), but for a transform that may be absent.
    pub fn try_map<B, F>(self, transform: Option<F>) -> Result<Trampoline<B>, TrampolineError>
    where
        B: 'static,
        F: FnOnce(A) -> B + 'static,
    {
        match transform {
            Some(f) => Ok(self.map(f)),
            None => Err(TrampolineError::MissingContinuation { operation: "map" }),
        }
    }

    /// Whether this computation is already finished
    pub fn is_done(&self) -> bool {
        matches!(self.node, Node::Done(_))
    }

    /// Evaluate to completion in constant native stack space.
    ///
    /// Panics raised by continuations propagate unchanged.
    pub fn run(self) -> A {
        engine::run_unbounded(self.into_node())
    }
}

impl<A: 'static> Trampoline<Trampoline<A>> {
    /// Collapse a computation of a computation
    pub fn flatten(self) -> Trampoline<A> {
        self.bind(|inner| inner)
    }
}

impl<A> Drop for Trampoline<A> {
    fn drop(&mut self) {
        if let Node::Bound(..) = self.node {
            engine::release(mem::replace(&mut self.node, Node::unit()));
        }
    }
}

impl<A> fmt::Debug for Trampoline<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self.node {
            Node::Done(_) => "Done",
            Node::Bound(..) => "Bound",
        };
        f.debug_tuple("Trampoline").field(&format_args!("{}", shape)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_pure_is_done() {
        let t = Trampoline::pure(5);
        assert!(t.is_done());
        assert_eq!(t.run(), 5);
    }

    #[test]
    fn test_defer_does_not_call_thunk_at_construction() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let t = Trampoline::defer(move || {
            counter.set(counter.get() + 1);
            Trampoline::pure("ready")
        });
        assert!(!t.is_done());
        assert_eq!(calls.get(), 0);

        assert_eq!(t.run(), "ready");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_bind_does_not_evaluate_continuation_at_construction() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let t = Trampoline::pure(3).bind(move |x| {
            counter.set(counter.get() + 1);
            Trampoline::pure(x + 1)
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(t.run(), 4);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_map_changes_type() {
        let t = Trampoline::pure(10).map(|x| format!("{}!", x * 2));
        assert_eq!(t.run(), "20!");
    }

    #[test]
    fn test_flat_map_alias() {
        let t = Trampoline::pure(2).flat_map(|x| Trampoline::pure(x * 21));
        assert_eq!(t.run(), 42);
    }

    #[test]
    fn test_flatten() {
        let nested = Trampoline::pure(Trampoline::pure(232));
        assert_eq!(nested.flatten().run(), 232);
    }

    #[test]
    fn test_try_constructors_reject_none() {
        let missing_thunk: Option<fn() -> Trampoline<i32>> = None;
        assert_eq!(
            Trampoline::try_defer(missing_thunk).unwrap_err(),
            TrampolineError::MissingContinuation { operation: "defer" }
        );

        let missing_k: Option<fn(i32) -> Trampoline<i32>> = None;
        assert_eq!(
            Trampoline::pure(0).try_bind(missing_k).unwrap_err(),
            TrampolineError::MissingContinuation { operation: "bind" }
        );

        let missing_f: Option<fn(i32) -> i32> = None;
        assert_eq!(
            Trampoline::pure(0).try_map(missing_f).unwrap_err(),
            TrampolineError::MissingContinuation { operation: "map" }
        );
    }

    #[test]
    fn test_try_constructors_accept_some() {
        let t = Trampoline::try_defer(Some(|| Trampoline::pure(1)))
            .and_then(|t| t.try_bind(Some(|x: i32| Trampoline::pure(x + 1))))
            .and_then(|t| t.try_map(Some(|x: i32| x * 10)))
            .unwrap();
        assert_eq!(t.run(), 20);
    }

    #[test]
    fn test_debug_shows_shape_only() {
        assert_eq!(format!("{:?}", Trampoline::pure(1)), "Trampoline(Done)");
        assert_eq!(
            format!("{:?}", Trampoline::pure(1).map(|x| x + 1)),
            "Trampoline(Bound)"
        );
    }

    #[test]
    fn test_unused_bound_drops_captures() {
        let witness = Rc::new(());
        let held = witness.clone();
        let t = Trampoline::pure(1).bind(move |x| {
            let _keep = &held;
            Trampoline::pure(x)
        });
        assert_eq!(Rc::strong_count(&witness), 2);
        drop(t);
        assert_eq!(Rc::strong_count(&witness), 1);
    }
}
