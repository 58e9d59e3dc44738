//! Reductions over the flattened preorder data sequence of a tree.
//!
//! Every operation here is read-only: it walks the preorder sequence of
//! the tree's values, takes each value's [data](Node::data) (atoms stand
//! for themselves), and never mutates. [`Node::position_if`] returns the
//! canonical path of the first hit instead of its data.

use std::sync::Arc;

use crate::node::{Node, Value};
use crate::path::Path;
use crate::rewrite::data_of;

impl Node {
    /// The preorder sequence of data values.
    pub fn preorder_data(self: &Arc<Self>) -> impl Iterator<Item = Value> {
        self.preorder().map(|v| data_of(&v))
    }

    /// The first data value equal to `item`.
    pub fn find(self: &Arc<Self>, item: &Value) -> Option<Value> {
        self.preorder_data().find(|data| data == item)
    }

    /// The first data value satisfying `pred`.
    pub fn find_if(self: &Arc<Self>, mut pred: impl FnMut(&Value) -> bool) -> Option<Value> {
        self.preorder_data().find(|data| pred(data))
    }

    /// The first data value not satisfying `pred`.
    pub fn find_if_not(self: &Arc<Self>, mut pred: impl FnMut(&Value) -> bool) -> Option<Value> {
        self.find_if(move |data| !pred(data))
    }

    /// Number of data values equal to `item`.
    pub fn count(self: &Arc<Self>, item: &Value) -> usize {
        self.preorder_data().filter(|data| data == item).count()
    }

    /// Number of data values satisfying `pred`.
    pub fn count_if(self: &Arc<Self>, mut pred: impl FnMut(&Value) -> bool) -> usize {
        self.preorder_data().filter(|data| pred(data)).count()
    }

    /// Number of data values not satisfying `pred`.
    pub fn count_if_not(self: &Arc<Self>, mut pred: impl FnMut(&Value) -> bool) -> usize {
        self.count_if(move |data| !pred(data))
    }

    /// Fold over the preorder data sequence.
    pub fn reduce<T>(self: &Arc<Self>, init: T, f: impl FnMut(T, Value) -> T) -> T {
        self.preorder_data().fold(init, f)
    }

    /// The canonical path of the first value whose data equals `item`.
    pub fn position(self: &Arc<Self>, item: &Value) -> Option<Path> {
        self.position_if(|data| data == item)
    }

    /// The canonical path of the first value whose data satisfies `pred`.
    pub fn position_if(self: &Arc<Self>, mut pred: impl FnMut(&Value) -> bool) -> Option<Path> {
        self.preorder_with_paths()
            .find_map(|(value, path)| pred(&data_of(&value)).then_some(path))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::Atom;
    use crate::path;
    use crate::tests::sample_tree;

    #[test]
    fn find_and_count_over_preorder_data() {
        let (root, _) = sample_tree();
        assert_eq!(root.find(&Value::symbol("d")), Some(Value::symbol("d")));
        assert_eq!(root.find(&Value::symbol("zzz")), None);
        assert_eq!(root.count(&Value::symbol("e")), 1);
        assert_eq!(root.count_if(|_| true), 5);
        assert_eq!(root.count_if_not(|data| data == &Value::symbol("a")), 4);
    }

    #[test]
    fn reduce_concatenates_in_preorder() {
        let (root, _) = sample_tree();
        let labels = root.reduce(String::new(), |mut acc, data| {
            if let Some(Atom::Symbol(s)) = data.as_atom() {
                acc.push_str(s);
            }
            acc
        });
        assert_eq!(labels, "abcde");
    }

    #[test]
    fn position_returns_canonical_paths() {
        let (root, _) = sample_tree();
        assert_eq!(root.position(&Value::symbol("a")), Some(path![]));
        assert_eq!(root.position(&Value::symbol("e")), Some(path![1, 1]));
        assert_eq!(root.position(&Value::symbol("zzz")), None);
        assert_eq!(
            root.position_if(|data| data == &Value::symbol("c")),
            Some(path![1])
        );
    }
}
