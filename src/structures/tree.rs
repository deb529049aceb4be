//! Trees with leaves, unary branches and binary branches.
//!
//! Subtrees are shared through `Rc`, so folds can carry them into deferred
//! steps. [`Tree::fold_left_recursive`] is the plain recursive fold and uses
//! native stack proportional to the depth; [`Tree::fold_left`] does the same
//! work on the trampoline.

use std::mem;
use std::rc::Rc;

use crate::trampoline::Trampoline;

/// An immutable tree
pub struct Tree<A> {
    node: Rc<TreeNode<A>>,
}

enum TreeNode<A> {
    Leaf(A),
    Unary(Tree<A>),
    Binary(Tree<A>, Tree<A>),
    /// Left behind by `Drop for Tree` once the children have been moved out
    Released,
}

/// Borrowed view of a tree's root
#[derive(Debug)]
pub enum TreeView<'a, A> {
    Leaf(&'a A),
    Unary(&'a Tree<A>),
    Binary(&'a Tree<A>, &'a Tree<A>),
}

type Reducer<A, B> = Rc<dyn Fn(B, &A) -> B>;

impl<A> Tree<A> {
    pub fn leaf(value: A) -> Self {
        Self::from_node(TreeNode::Leaf(value))
    }

    pub fn unary(child: Tree<A>) -> Self {
        Self::from_node(TreeNode::Unary(child))
    }

    pub fn binary(left: Tree<A>, right: Tree<A>) -> Self {
        Self::from_node(TreeNode::Binary(left, right))
    }

    fn from_node(node: TreeNode<A>) -> Self {
        Tree {
            node: Rc::new(node),
        }
    }

    /// The root's shape
    pub fn view(&self) -> TreeView<'_, A> {
        match &*self.node {
            TreeNode::Leaf(value) => TreeView::Leaf(value),
            TreeNode::Unary(child) => TreeView::Unary(child),
            TreeNode::Binary(left, right) => TreeView::Binary(left, right),
            TreeNode::Released => unreachable!("released tree node is still reachable"),
        }
    }

    /// Left-to-right fold over the leaves by direct recursion.
    pub fn fold_left_recursive<B, F>(&self, reduce: F, init: B) -> B
    where
        F: Fn(B, &A) -> B,
    {
        fn go<A, B>(tree: &Tree<A>, reduce: &dyn Fn(B, &A) -> B, init: B) -> B {
            match tree.view() {
                TreeView::Leaf(value) => reduce(init, value),
                TreeView::Unary(child) => go(child, reduce, init),
                TreeView::Binary(left, right) => {
                    let left_acc = go(left, reduce, init);
                    go(right, reduce, left_acc)
                }
            }
        }
        go(self, &reduce, init)
    }
}

impl<A: 'static> Tree<A> {
    /// Left-to-right fold over the leaves in constant native stack space.
    pub fn fold_left<B, F>(&self, reduce: F, init: B) -> B
    where
        B: 'static,
        F: Fn(B, &A) -> B + 'static,
    {
        self.fold_left_trampoline(reduce, init).run()
    }

    /// Left fold as an unevaluated computation.
    pub fn fold_left_trampoline<B, F>(&self, reduce: F, init: B) -> Trampoline<B>
    where
        B: 'static,
        F: Fn(B, &A) -> B + 'static,
    {
        fold_left_from(self.clone(), Rc::new(reduce), init)
    }
}

fn fold_left_from<A: 'static, B: 'static>(
    tree: Tree<A>,
    reduce: Reducer<A, B>,
    init: B,
) -> Trampoline<B> {
    match tree.view() {
        TreeView::Leaf(value) => Trampoline::pure(reduce(init, value)),
        TreeView::Unary(child) => {
            let child = child.clone();
            Trampoline::defer(move || fold_left_from(child, reduce, init))
        }
        TreeView::Binary(left, right) => {
            let (left, right) = (left.clone(), right.clone());
            let reduce_right = reduce.clone();
            Trampoline::defer(move || fold_left_from(left, reduce, init))
                .bind(move |left_acc| fold_left_from(right, reduce_right, left_acc))
        }
    }
}

impl<A> Clone for Tree<A> {
    fn clone(&self) -> Self {
        Tree {
            node: self.node.clone(),
        }
    }
}

// Move the children of uniquely owned nodes onto a work stack so dropping a
// deep tree never recurses.
impl<A> Drop for Tree<A> {
    fn drop(&mut self) {
        let mut pending: Vec<Tree<A>> = Vec::new();
        detach_children(&mut self.node, &mut pending);
        while let Some(mut tree) = pending.pop() {
            detach_children(&mut tree.node, &mut pending);
        }
    }
}

fn detach_children<A>(node: &mut Rc<TreeNode<A>>, pending: &mut Vec<Tree<A>>) {
    if let Some(node) = Rc::get_mut(node) {
        match mem::replace(node, TreeNode::Released) {
            TreeNode::Unary(child) => pending.push(child),
            TreeNode::Binary(left, right) => {
                pending.push(left);
                pending.push(right);
            }
            TreeNode::Leaf(_) | TreeNode::Released => {}
        }
    }
}

enum Pending<'a, A> {
    Subtree(&'a Tree<A>),
    Text(&'static str),
}

// Written against an explicit stack of subtrees and closing text so deep
// trees format without recursing.
impl<A: std::fmt::Debug> std::fmt::Debug for Tree<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut pending = vec![Pending::Subtree(self)];
        while let Some(item) = pending.pop() {
            let tree = match item {
                Pending::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Pending::Subtree(tree) => tree,
            };
            match tree.view() {
                TreeView::Leaf(value) => write!(f, "Leaf({:?})", value)?,
                TreeView::Unary(child) => {
                    f.write_str("Unary(")?;
                    pending.push(Pending::Text(")"));
                    pending.push(Pending::Subtree(child));
                }
                TreeView::Binary(left, right) => {
                    f.write_str("Binary(")?;
                    pending.push(Pending::Text(")"));
                    pending.push(Pending::Subtree(right));
                    pending.push(Pending::Text(", "));
                    pending.push(Pending::Subtree(left));
                }
            }
        }
        Ok(())
    }
}
