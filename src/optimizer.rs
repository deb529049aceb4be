//! Fixed-Point Optimizer Loops
//!
//! An [`Optimizer`] improves a candidate solution until it is solved:
//!
//! - without preparation: `solve(x) = solved(x) ? x : solve(next(x))`
//! - with preparation, each round first repeats `prepare` until the candidate
//!   is prepared, then applies `next`
//!
//! Both loops are expressed as self-referential trampolines, so the number
//! of rounds is not limited by the native stack. The `*_recursive` variants
//! are the same loops written with plain recursion.
//!
//! ```rust
//! use stacksafe::Optimizer;
//!
//! // Round up to the next multiple of 7 that is at least 50_000
//! let optimizer = Optimizer::new(|x: &u64| *x >= 50_000 && *x % 7 == 0, |x| x + 1);
//! assert_eq!(optimizer.solve(0), 50_001);
//! ```

use std::rc::Rc;

use crate::trampoline::Trampoline;

type Predicate<A> = Rc<dyn Fn(&A) -> bool>;
type Step<A> = Rc<dyn Fn(A) -> A>;

struct Preparation<A> {
    is_prepared: Predicate<A>,
    prepare: Step<A>,
}

impl<A> Clone for Preparation<A> {
    fn clone(&self) -> Self {
        Preparation {
            is_prepared: self.is_prepared.clone(),
            prepare: self.prepare.clone(),
        }
    }
}

/// Fixed-point search over candidate solutions of type `A`
pub struct Optimizer<A> {
    is_solved: Predicate<A>,
    next_solution: Step<A>,
    preparation: Option<Preparation<A>>,
}

impl<A> Clone for Optimizer<A> {
    fn clone(&self) -> Self {
        Optimizer {
            is_solved: self.is_solved.clone(),
            next_solution: self.next_solution.clone(),
            preparation: self.preparation.clone(),
        }
    }
}

impl<A: 'static> Optimizer<A> {
    /// Create an optimizer that applies `next_solution` until `is_solved` holds
    pub fn new<S, N>(is_solved: S, next_solution: N) -> Self
    where
        S: Fn(&A) -> bool + 'static,
        N: Fn(A) -> A + 'static,
    {
        Optimizer {
            is_solved: Rc::new(is_solved),
            next_solution: Rc::new(next_solution),
            preparation: None,
        }
    }

    /// Add a preparation phase run before every `next_solution` step
    pub fn with_preparation<P, Q>(mut self, is_prepared: P, prepare: Q) -> Self
    where
        P: Fn(&A) -> bool + 'static,
        Q: Fn(A) -> A + 'static,
    {
        self.preparation = Some(Preparation {
            is_prepared: Rc::new(is_prepared),
            prepare: Rc::new(prepare),
        });
        self
    }

    /// Run the search to completion
    pub fn solve(&self, solution: A) -> A {
        self.optimize_trampoline(solution).run()
    }

    /// The search as an unevaluated computation
    pub fn optimize_trampoline(&self, solution: A) -> Trampoline<A> {
        if (self.is_solved)(&solution) {
            return Trampoline::pure(solution);
        }
        let this = self.clone();
        match self.preparation {
            None => Trampoline::defer(move || {
                let next = (this.next_solution)(solution);
                this.optimize_trampoline(next)
            }),
            Some(_) => self.prepare_trampoline(solution).bind(move |prepared| {
                let next = (this.next_solution)(prepared);
                this.optimize_trampoline(next)
            }),
        }
    }

    /// Repeat the preparation step until the candidate is prepared.
    ///
    /// Without a preparation phase every candidate is already prepared.
    pub fn prepare_trampoline(&self, solution: A) -> Trampoline<A> {
        match &self.preparation {
            Some(preparation) if !(preparation.is_prepared)(&solution) => {
                let this = self.clone();
                let prepare = preparation.prepare.clone();
                Trampoline::defer(move || this.prepare_trampoline(prepare(solution)))
            }
            _ => Trampoline::pure(solution),
        }
    }

    /// The search by direct recursion; deep searches overflow the stack.
    pub fn optimize_recursive(&self, solution: A) -> A {
        if (self.is_solved)(&solution) {
            return solution;
        }
        let prepared = self.prepare_recursive(solution);
        self.optimize_recursive((self.next_solution)(prepared))
    }

    /// The preparation loop by direct recursion
    pub fn prepare_recursive(&self, solution: A) -> A {
        match &self.preparation {
            Some(preparation) if !(preparation.is_prepared)(&solution) => {
                self.prepare_recursive((preparation.prepare)(solution))
            }
            _ => solution,
        }
    }
}
