//! Persistent singly linked list with trampolined folds.
//!
//! Tails are shared through `Rc`, so `cons` and `tail` are O(1) and a fold
//! can hold on to the cell it is working on without borrowing the list.

use std::fmt;
use std::rc::Rc;

use crate::trampoline::Trampoline;

struct Cons<A> {
    value: A,
    tail: List<A>,
}

/// An immutable singly linked list
pub struct List<A> {
    head: Option<Rc<Cons<A>>>,
}

type LeftReducer<A, B> = Rc<dyn Fn(B, &A) -> B>;
type RightReducer<A, B> = Rc<dyn Fn(&A, B) -> B>;

impl<A> List<A> {
    /// The empty list
    pub fn nil() -> Self {
        List { head: None }
    }

    /// A list with `head` in front of `tail`
    pub fn cons(head: A, tail: List<A>) -> Self {
        List {
            head: Some(Rc::new(Cons { value: head, tail })),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// First element, if any
    pub fn head(&self) -> Option<&A> {
        self.head.as_deref().map(|cell| &cell.value)
    }

    /// Everything after the first element, if any
    pub fn tail(&self) -> Option<List<A>> {
        self.head.as_deref().map(|cell| cell.tail.clone())
    }

    pub fn iter(&self) -> Iter<'_, A> {
        Iter {
            next: self.head.as_deref(),
        }
    }
}

impl<A: 'static> List<A> {
    /// Number of elements, counted with a left fold
    pub fn len(&self) -> usize {
        self.fold_left(|count: usize, _: &A| count + 1, 0)
    }

    /// Reduce from the first element to the last
    pub fn fold_left<B, F>(&self, reduce: F, init: B) -> B
    where
        B: 'static,
        F: Fn(B, &A) -> B + 'static,
    {
        self.fold_left_trampoline(reduce, init).run()
    }

    /// Left fold as an unevaluated computation.
    ///
    /// Each cell defers: reduce the head, then continue into the tail.
    pub fn fold_left_trampoline<B, F>(&self, reduce: F, init: B) -> Trampoline<B>
    where
        B: 'static,
        F: Fn(B, &A) -> B + 'static,
    {
        fold_left_from(self.clone(), Rc::new(reduce), init)
    }

    /// Reduce from the last element to the first
    pub fn fold_right<B, F>(&self, reduce: F, init: B) -> B
    where
        B: 'static,
        F: Fn(&A, B) -> B + 'static,
    {
        self.fold_right_trampoline(reduce, init).run()
    }

    /// Right fold as an unevaluated computation.
    ///
    /// Each cell defers folding its tail and maps the head over the result,
    /// which nests every step one level deeper to the left.
    pub fn fold_right_trampoline<B, F>(&self, reduce: F, init: B) -> Trampoline<B>
    where
        B: 'static,
        F: Fn(&A, B) -> B + 'static,
    {
        fold_right_from(self.clone(), Rc::new(reduce), init)
    }
}

fn fold_left_from<A: 'static, B: 'static>(
    list: List<A>,
    reduce: LeftReducer<A, B>,
    acc: B,
) -> Trampoline<B> {
    match list.head.clone() {
        None => Trampoline::pure(acc),
        Some(cell) => Trampoline::defer(move || {
            let folded = reduce(acc, &cell.value);
            fold_left_from(cell.tail.clone(), reduce, folded)
        }),
    }
}

fn fold_right_from<A: 'static, B: 'static>(
    list: List<A>,
    reduce: RightReducer<A, B>,
    init: B,
) -> Trampoline<B> {
    match list.head.clone() {
        None => Trampoline::pure(init),
        Some(cell) => Trampoline::defer(move || {
            let rest = fold_right_from(cell.tail.clone(), reduce.clone(), init);
            rest.map(move |folded| reduce(&cell.value, folded))
        }),
    }
}

impl<A> Clone for List<A> {
    fn clone(&self) -> Self {
        List {
            head: self.head.clone(),
        }
    }
}

impl<A> Default for List<A> {
    fn default() -> Self {
        List::nil()
    }
}

// Unlink uniquely owned cells one at a time; the default drop would recurse
// once per cell.
impl<A> Drop for List<A> {
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(cell) = next {
            match Rc::try_unwrap(cell) {
                Ok(mut cell) => next = cell.tail.head.take(),
                Err(_) => break,
            }
        }
    }
}

impl<A> FromIterator<A> for List<A> {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        let items: Vec<A> = iter.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(List::nil(), |tail, head| List::cons(head, tail))
    }
}

impl<A: fmt::Debug> fmt::Debug for List<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<A: PartialEq> PartialEq for List<A> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

/// Borrowing iterator over a [`List`]
pub struct Iter<'a, A> {
    next: Option<&'a Cons<A>>,
}

impl<'a, A> Iterator for Iter<'a, A> {
    type Item = &'a A;

    fn next(&mut self) -> Option<&'a A> {
        self.next.map(|cell| {
            self.next = cell.tail.head.as_deref();
            &cell.value
        })
    }
}

impl<'a, A> IntoIterator for &'a List<A> {
    type Item = &'a A;
    type IntoIter = Iter<'a, A>;

    fn into_iter(self) -> Iter<'a, A> {
        self.iter()
    }
}
