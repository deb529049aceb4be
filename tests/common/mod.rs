//! Shared helpers for the integration tests
//!
//! - `init_tracing` installs a test-writer subscriber filtered by `RUST_LOG`
//! - `EventCounter` is a layer that counts engine events by message
//! - a few computation builders shared by several test files

#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use stacksafe::Trampoline;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::EnvFilter;

pub const ENGINE_TARGET: &str = "stacksafe::trampoline::engine";

/// Route driver logs to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Counts events emitted under the engine target, keyed by message
#[derive(Clone, Default)]
pub struct EventCounter {
    counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl EventCounter {
    pub fn count(&self, message: &str) -> usize {
        self.counts
            .lock()
            .map(|counts| counts.get(message).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for EventCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != ENGINE_TARGET {
            return;
        }
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(visitor.0).or_insert(0) += 1;
        }
    }
}

/// `n` deferred steps counting down to zero
pub fn countdown(n: u64) -> Trampoline<u64> {
    if n == 0 {
        Trampoline::pure(0)
    } else {
        Trampoline::defer(move || countdown(n - 1))
    }
}

/// `0 + 1 + ... + n`, with each level binding on the level below
pub fn sum_to(n: u64) -> Trampoline<u64> {
    if n == 0 {
        Trampoline::pure(0)
    } else {
        Trampoline::defer(move || sum_to(n - 1).bind(move |acc| Trampoline::pure(acc + n)))
    }
}

/// `pure(0)` followed by `depth` left-nested increments
pub fn left_nested_increments(depth: u64) -> Trampoline<u64> {
    let mut t = Trampoline::pure(0u64);
    for _ in 0..depth {
        t = t.bind(|x| Trampoline::pure(x + 1));
    }
    t
}
