//! Trampoline Engine - Iterative Evaluation
//!
//! The driver loop repeatedly rewrites the current node until it is `Done`:
//!
//! - `Bound(Done(x), k)` becomes `k(x)`
//! - `Bound(Bound(m, f), g)` becomes `Bound(m, Then(f, g))`
//!
//! The second rule is re-association: `(m >>= f) >>= g` is rewritten to
//! `m >>= (x -> f(x) >>= g)`. The composed continuation is kept as data
//! (`Then`) instead of a closure, so applying it is one more loop iteration
//! and dropping it never recurses.

use std::cell::{Cell, RefCell};
use std::mem;
use std::num::NonZeroU64;

use tracing::{debug, trace, warn};

use crate::config::{DriverConfig, RunStats};
use crate::error::{ConfigError, TrampolineError};

use super::types::{unerase, Continuation, Node, Trampoline, Value};

/// Evaluate with no step budget.
pub(crate) fn run_unbounded<A: 'static>(node: Node) -> A {
    let mut machine = Machine::new(node);
    match machine.evaluate(&DriverConfig::unbounded()) {
        Ok(value) => unerase(value),
        Err(e) => unreachable!("unbounded evaluation stopped early: {}", e),
    }
}

thread_local! {
    /// Set while a `release_all` is running on this thread
    static RELEASING: Cell<bool> = const { Cell::new(false) };
    /// Nodes handed to `release` by drops that happened inside a release
    static QUEUED: RefCell<Vec<Node>> = const { RefCell::new(Vec::new()) };
}

/// Release a node and everything it owns without recursing.
///
/// Dropping a continuation drops whatever its closure captured, which may
/// include other trampolines. Those arrive here while a release is already
/// running and are queued for the outermost release instead of recursing.
pub(crate) fn release(node: Node) {
    release_all(vec![node], Vec::new());
}

fn release_all(mut nodes: Vec<Node>, mut continuations: Vec<Continuation>) {
    if RELEASING.with(Cell::get) {
        let handed_over = QUEUED.try_with(|queued| {
            let mut queued = queued.borrow_mut();
            queued.extend(nodes.drain(..));
            queued.extend(
                continuations
                    .drain(..)
                    .map(|continuation| Node::Bound(Box::new(Node::unit()), continuation)),
            );
        });
        if handed_over.is_ok() {
            return;
        }
    }

    let _releasing = ReleaseGuard::enter();
    loop {
        if let Some(node) = nodes.pop() {
            if let Node::Bound(source, continuation) = node {
                nodes.push(*source);
                continuations.push(continuation);
            }
            continue;
        }
        match continuations.pop() {
            Some(Continuation::Then(first, rest)) => {
                continuations.push(*first);
                continuations.push(*rest);
            }
            // Dropping the closure may queue more nodes
            Some(Continuation::Apply(_)) => {}
            None => {
                let queued = QUEUED
                    .try_with(|queued| mem::take(&mut *queued.borrow_mut()))
                    .unwrap_or_default();
                if queued.is_empty() {
                    break;
                }
                nodes = queued;
            }
        }
    }
}

/// Restores `RELEASING` when a release ends, unwinding included.
///
/// Anything still queued after a panicking drop is picked up by the next
/// release on this thread.
struct ReleaseGuard {
    previous: bool,
}

impl ReleaseGuard {
    fn enter() -> Self {
        ReleaseGuard {
            previous: RELEASING.with(|releasing| releasing.replace(true)),
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        RELEASING.with(|releasing| releasing.set(self.previous));
    }
}

/// State of one evaluation.
///
/// Everything still pending lives in here rather than in locals, so a panic
/// raised by a continuation unwinds through `Drop for Machine` and the rest
/// of the chain is released iteratively.
struct Machine {
    current: Option<Node>,
    /// Remainder of a `Then` while its first continuation runs
    parked: Option<Continuation>,
    stats: RunStats,
}

impl Machine {
    fn new(node: Node) -> Self {
        Machine {
            current: Some(node),
            parked: None,
            stats: RunStats::default(),
        }
    }

    fn evaluate(&mut self, config: &DriverConfig) -> Result<Value, TrampolineError> {
        let limit = config.step_limit.map(NonZeroU64::get);
        let interval = config.progress_interval.map(NonZeroU64::get);

        loop {
            let node = match self.current.take() {
                Some(node) => node,
                None => unreachable!("driver has no current node"),
            };

            let (source, continuation) = match node {
                Node::Done(value) => {
                    debug!(
                        target: "stacksafe::trampoline::engine",
                        steps = self.stats.steps,
                        continuations = self.stats.continuations,
                        reassociations = self.stats.reassociations,
                        "evaluation complete"
                    );
                    return Ok(value);
                }
                Node::Bound(source, continuation) => (source, continuation),
            };

            if let Some(limit) = limit {
                if self.stats.steps >= limit {
                    warn!(target: "stacksafe::trampoline::engine", limit, "step limit exceeded");
                    self.current = Some(Node::Bound(source, continuation));
                    return Err(TrampolineError::StepLimitExceeded { limit });
                }
            }

            self.stats.steps += 1;
            if let Some(every) = interval {
                if self.stats.steps % every == 0 {
                    debug!(
                        target: "stacksafe::trampoline::engine",
                        steps = self.stats.steps,
                        reassociations = self.stats.reassociations,
                        "evaluation progress"
                    );
                }
            }

            match *source {
                Node::Done(value) => {
                    trace!(target: "stacksafe::trampoline::engine", step = self.stats.steps, "apply continuation");
                    let next = self.apply(continuation, value);
                    self.current = Some(next);
                }
                Node::Bound(inner, inner_continuation) => {
                    trace!(target: "stacksafe::trampoline::engine", step = self.stats.steps, "reassociate");
                    self.stats.reassociations += 1;
                    self.current = Some(Node::Bound(
                        inner,
                        Continuation::Then(Box::new(inner_continuation), Box::new(continuation)),
                    ));
                }
            }
        }
    }

    /// Apply a continuation to a finished value, producing the next node.
    fn apply(&mut self, mut continuation: Continuation, value: Value) -> Node {
        loop {
            match continuation {
                Continuation::Apply(f) => {
                    self.stats.continuations += 1;
                    return f(value);
                }
                Continuation::Then(first, rest) => match *first {
                    Continuation::Apply(f) => {
                        self.stats.continuations += 1;
                        self.parked = Some(*rest);
                        let next = f(value);
                        let rest = match self.parked.take() {
                            Some(rest) => rest,
                            None => unreachable!("parked continuation vanished"),
                        };
                        return Node::Bound(Box::new(next), rest);
                    }
                    // Then(Then(a, b), rest) == Then(a, Then(b, rest))
                    Continuation::Then(a, b) => {
                        self.stats.reassociations += 1;
                        continuation = Continuation::Then(a, Box::new(Continuation::Then(b, rest)));
                    }
                },
            }
        }
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        let nodes: Vec<Node> = self.current.take().into_iter().collect();
        let continuations: Vec<Continuation> = self.parked.take().into_iter().collect();
        if !nodes.is_empty() || !continuations.is_empty() {
            release_all(nodes, continuations);
        }
    }
}

/// Configurable driver with a step budget and per-run statistics.
///
/// ```rust
/// use std::num::NonZeroU64;
/// use stacksafe::{Driver, DriverConfig, Trampoline, TrampolineError};
///
/// fn countdown(n: u64) -> Trampoline<u64> {
///     if n == 0 {
///         Trampoline::pure(0)
///     } else {
///         Trampoline::defer(move || countdown(n - 1))
///     }
/// }
///
/// let config = DriverConfig::default().with_step_limit(NonZeroU64::new(100).unwrap());
/// let mut driver = Driver::new(config);
///
/// assert_eq!(driver.run(countdown(10)), Ok(0));
/// assert_eq!(driver.stats().steps, 10);
/// assert_eq!(
///     driver.run(countdown(1_000)),
///     Err(TrampolineError::StepLimitExceeded { limit: 100 })
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct Driver {
    config: DriverConfig,
    stats: RunStats,
}

impl Driver {
    /// Create a driver with the given configuration
    pub fn new(config: DriverConfig) -> Self {
        Driver {
            config,
            stats: RunStats::default(),
        }
    }

    /// Create a driver configured from `STACKSAFE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(DriverConfig::from_env()?))
    }

    /// The driver's configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Counters from the most recent run
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Evaluate `computation`, giving up once the step budget is spent.
    ///
    /// An abandoned computation is released without recursing.
    pub fn run<A: 'static>(&mut self, computation: Trampoline<A>) -> Result<A, TrampolineError> {
        let mut machine = Machine::new(computation.into_node());
        let outcome = machine.evaluate(&self.config);
        self.stats = machine.stats;
        outcome.map(unerase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn limit(n: u64) -> DriverConfig {
        DriverConfig::default().with_step_limit(NonZeroU64::new(n).unwrap())
    }

    #[test]
    fn test_pure_takes_no_steps() {
        let mut driver = Driver::default();
        assert_eq!(driver.run(Trampoline::pure(5)), Ok(5));
        assert_eq!(driver.stats(), RunStats::default());
    }

    #[test]
    fn test_left_nested_chain_counts() {
        // ((pure(0) >>= f) >>= f) >>= f
        let t = Trampoline::pure(0)
            .bind(|x| Trampoline::pure(x + 1))
            .bind(|x| Trampoline::pure(x + 1))
            .bind(|x| Trampoline::pure(x + 1));
        let mut driver = Driver::default();
        assert_eq!(driver.run(t), Ok(3));

        let stats = driver.stats();
        assert_eq!(stats.continuations, 3);
        assert_eq!(stats.reassociations, 2);
        assert_eq!(stats.steps, 5);
    }

    #[test]
    fn test_step_limit_is_inclusive() {
        let t = || Trampoline::defer(|| Trampoline::defer(|| Trampoline::pure(1)));

        let mut exact = Driver::new(limit(2));
        assert_eq!(exact.run(t()), Ok(1));
        assert_eq!(exact.stats().steps, 2);

        let mut short = Driver::new(limit(1));
        assert_eq!(
            short.run(t()),
            Err(TrampolineError::StepLimitExceeded { limit: 1 })
        );
        assert_eq!(short.stats().steps, 1);
    }

    #[test]
    fn test_stats_reset_between_runs() {
        let mut driver = Driver::default();
        driver
            .run(Trampoline::defer(|| Trampoline::defer(|| Trampoline::pure(()))))
            .unwrap();
        assert_eq!(driver.stats().steps, 2);

        driver.run(Trampoline::pure(())).unwrap();
        assert_eq!(driver.stats().steps, 0);
    }

    #[test]
    fn test_release_handles_nested_then() {
        let apply = || Continuation::Apply(Box::new(|v: Value| Node::Done(v)));
        let mut k = apply();
        for _ in 0..100_000 {
            k = Continuation::Then(Box::new(k), Box::new(apply()));
        }
        let node = Node::Bound(Box::new(Node::Bound(Box::new(Node::unit()), apply())), k);
        release(node);
    }

    #[test]
    fn test_release_queues_captured_trampolines() {
        // Each closure owns the previous trampoline, so dropping one closure
        // releases another chain from inside the running release.
        let witness = Rc::new(());
        let mut t = Trampoline::pure(0u32);
        for _ in 0..100_000 {
            let prev = t;
            let held = witness.clone();
            t = Trampoline::defer(move || {
                let _held = &held;
                prev
            });
        }
        assert_eq!(Rc::strong_count(&witness), 100_001);

        release(t.into_node());
        assert_eq!(Rc::strong_count(&witness), 1);
        assert!(!RELEASING.with(Cell::get));
        assert!(QUEUED.with(|queued| queued.borrow().is_empty()));
    }

    #[test]
    fn test_apply_reassociates_left_nested_then() {
        // Then(Then(+1, *2), -3) applied to 5 == ((5 + 1) * 2) - 3
        let add = Continuation::Apply(Box::new(|v: Value| {
            Node::Done(Box::new(unerase::<i64>(v) + 1))
        }));
        let double = Continuation::Apply(Box::new(|v: Value| {
            Node::Done(Box::new(unerase::<i64>(v) * 2))
        }));
        let sub = Continuation::Apply(Box::new(|v: Value| {
            Node::Done(Box::new(unerase::<i64>(v) - 3))
        }));
        let k = Continuation::Then(
            Box::new(Continuation::Then(Box::new(add), Box::new(double))),
            Box::new(sub),
        );

        let node = Node::Bound(Box::new(Node::Done(Box::new(5i64))), k);
        let mut machine = Machine::new(node);
        let value = machine.evaluate(&DriverConfig::unbounded()).unwrap();
        assert_eq!(unerase::<i64>(value), 9);
        assert_eq!(machine.stats.continuations, 3);
        assert!(machine.stats.reassociations >= 1);
    }
}
