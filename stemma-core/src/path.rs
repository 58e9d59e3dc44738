//! Paths: directed locators from a root node to one of its descendants.
//!
//! A [`Path`] is an ordered sequence of [`PathElem`]s. Each element selects
//! one child of the node reached so far:
//!
//! - [`PathElem::Index`] — a bare index, only meaningful at nodes whose
//!   layout is a single child list;
//! - [`PathElem::Slot`] — the name of a scalar child slot;
//! - [`PathElem::SlotIndex`] — a slot name plus an index into that slot's
//!   child list.
//!
//! Paths are totally ordered: elements compare with slot-named elements
//! before bare indices, slot names by string order and indices naturally,
//! and a path that is a proper prefix of another sorts before it. This is
//! the order used when deriving transforms (see
//! [`path_transform_of`](crate::transform::path_transform_of)).

use std::cmp::Ordering;

use smol_str::SmolStr;
use thiserror::Error;

/// A single step of a [`Path`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PathElem {
    /// Index into the child list of a node with a single, list-valued child
    /// slot.
    Index(usize),
    /// A scalar child slot, selected by name.
    Slot(SmolStr),
    /// An index into a named, list-valued child slot.
    SlotIndex(SmolStr, usize),
}

impl PathElem {
    /// A bare index element.
    pub fn index(index: usize) -> Self {
        PathElem::Index(index)
    }

    /// A scalar slot element.
    pub fn slot(name: impl Into<SmolStr>) -> Self {
        PathElem::Slot(name.into())
    }

    /// A slot-and-index element.
    pub fn slot_index(name: impl Into<SmolStr>, index: usize) -> Self {
        PathElem::SlotIndex(name.into(), index)
    }

    /// The index carried by this element, if any.
    pub fn child_index(&self) -> Option<usize> {
        match self {
            PathElem::Index(i) | PathElem::SlotIndex(_, i) => Some(*i),
            PathElem::Slot(_) => None,
        }
    }

    /// This element with its index shifted by `offset`.
    ///
    /// Scalar slot elements are returned unchanged.
    pub(crate) fn offset_index(&self, offset: usize) -> PathElem {
        match self {
            PathElem::Index(i) => PathElem::Index(i + offset),
            PathElem::SlotIndex(s, i) => PathElem::SlotIndex(s.clone(), i + offset),
            PathElem::Slot(s) => PathElem::Slot(s.clone()),
        }
    }
}

impl Ord for PathElem {
    fn cmp(&self, other: &Self) -> Ordering {
        use PathElem::*;
        match (self, other) {
            (Slot(a), Slot(b)) => a.cmp(b),
            // A scalar slot sorts before the indexed entries of a slot with
            // the same name.
            (Slot(a), SlotIndex(b, _)) => a.cmp(b).then(Ordering::Less),
            (SlotIndex(a, _), Slot(b)) => a.cmp(b).then(Ordering::Greater),
            (SlotIndex(a, i), SlotIndex(b, j)) => a.cmp(b).then(i.cmp(j)),
            (Index(i), Index(j)) => i.cmp(j),
            // Slot-named elements precede bare indices.
            (Index(_), _) => Ordering::Greater,
            (_, Index(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for PathElem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Debug for PathElem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathElem::Index(i) => write!(f, "{i}"),
            PathElem::Slot(s) => write!(f, "{s}"),
            PathElem::SlotIndex(s, i) => write!(f, "{s}[{i}]"),
        }
    }
}

impl std::fmt::Display for PathElem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<usize> for PathElem {
    fn from(index: usize) -> Self {
        PathElem::Index(index)
    }
}

/// A locator from a root to one of its descendants.
///
/// The empty path denotes the root itself.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<PathElem>);

impl Path {
    /// The empty path.
    pub fn new() -> Self {
        Path(Vec::new())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the empty path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The elements of the path, in root-to-descendant order.
    pub fn elems(&self) -> &[PathElem] {
        &self.0
    }

    /// Iterate over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, PathElem> {
        self.0.iter()
    }

    /// Append an element.
    pub fn push(&mut self, elem: PathElem) {
        self.0.push(elem);
    }

    /// This path extended by one element.
    #[must_use]
    pub fn child(&self, elem: PathElem) -> Path {
        let mut elems = self.0.clone();
        elems.push(elem);
        Path(elems)
    }

    /// This path extended by a suffix.
    #[must_use]
    pub fn join(&self, suffix: impl IntoIterator<Item = PathElem>) -> Path {
        let mut elems = self.0.clone();
        elems.extend(suffix);
        Path(elems)
    }

    /// Split into the path of the parent and the final element.
    ///
    /// Returns `None` on the empty path.
    pub fn split_last(&self) -> Option<(Path, &PathElem)> {
        let (last, parent) = self.0.split_last()?;
        Some((Path(parent.to_vec()), last))
    }

    /// Whether `self` is a (non-strict) prefix of `other`.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// The remainder of `other` after removing the prefix `self`, if `self`
    /// is a prefix of it.
    pub fn strip_prefix<'a>(&self, other: &'a Path) -> Option<&'a [PathElem]> {
        self.is_prefix_of(other).then(|| &other.0[self.0.len()..])
    }
}

impl From<Vec<PathElem>> for Path {
    fn from(elems: Vec<PathElem>) -> Self {
        Path(elems)
    }
}

impl From<&[PathElem]> for Path {
    fn from(elems: &[PathElem]) -> Self {
        Path(elems.to_vec())
    }
}

impl FromIterator<PathElem> for Path {
    fn from_iter<T: IntoIterator<Item = PathElem>>(iter: T) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl IntoIterator for Path {
    type Item = PathElem;
    type IntoIter = std::vec::IntoIter<PathElem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElem;
    type IntoIter = std::slice::Iter<'a, PathElem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// Print out paths as `[1, 0]` / `[body[2], cond]`.
impl std::fmt::Debug for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.0).finish()
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Errors arising while resolving a [`Path`] or a single [`PathElem`]
/// against a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InvalidPath {
    /// An index overshot the child list it selects into.
    #[error("index {index} out of bounds for child list of length {len}")]
    OutOfBounds {
        /// The list slot indexed into, if it was named.
        slot: Option<SmolStr>,
        /// The offending index.
        index: usize,
        /// The length of the child list.
        len: usize,
    },

    /// A bare index was applied to a node whose layout is not a single
    /// child list.
    #[error("bare index used at `{variant}` node, which does not have a single list slot")]
    BareIndex {
        /// The variant of the node the index was applied to.
        variant: &'static str,
    },

    /// A slot name that the node's variant does not declare.
    #[error("`{variant}` node has no child slot named `{slot}`")]
    UnknownSlot {
        /// The variant of the node.
        variant: &'static str,
        /// The unknown slot name.
        slot: SmolStr,
    },

    /// An index was applied to a scalar child slot.
    #[error("child slot `{slot}` is scalar and cannot be indexed")]
    ScalarSlot {
        /// The scalar slot.
        slot: SmolStr,
    },

    /// A list-valued child slot was named without an index.
    #[error("child slot `{slot}` holds a list and requires an index")]
    ListSlot {
        /// The list slot.
        slot: SmolStr,
    },

    /// The path descended into a value that is not a node.
    #[error("cannot descend into a non-node value")]
    NotANode,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path;

    #[test]
    fn lexicographic_order() {
        // Prefixes sort first.
        assert!(path![] < path![0]);
        assert!(path![1] < path![1, 0]);
        // Indices naturally.
        assert!(path![1, 0] < path![1, 1]);
        assert!(path![1, 1] < path![2]);
        // Slot-named elements precede bare indices; names by string order.
        assert!(path![cond] < path![0]);
        assert!(path![cond] < path![(then, 0)]);
        assert!(path![(body, 1)] < path![(body, 2)]);
        assert!(path![(body, 2)] < path![(cond, 0)]);
    }

    #[test]
    fn prefix_queries() {
        let p = path![1, 0];
        assert!(path![].is_prefix_of(&p));
        assert!(path![1].is_prefix_of(&p));
        assert!(p.is_prefix_of(&p));
        assert!(!path![0].is_prefix_of(&p));
        assert_eq!(
            path![1].strip_prefix(&p),
            Some(&[PathElem::Index(0)][..])
        );
        assert_eq!(path![2].strip_prefix(&p), None);
    }

    #[test]
    fn display() {
        assert_eq!(path![1, 0].to_string(), "[1, 0]");
        assert_eq!(path![cond].to_string(), "[cond]");
        assert_eq!(path![(body, 2), 1].to_string(), "[body[2], 1]");
    }

    #[test]
    fn split_last() {
        let p = path![1, 0];
        let (parent, last) = p.split_last().unwrap();
        assert_eq!(parent, path![1]);
        assert_eq!(last, &PathElem::Index(0));
        assert!(path![].split_last().is_none());
    }
}
