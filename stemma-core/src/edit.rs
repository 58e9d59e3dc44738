//! Functional edits: every operation returns a new root sharing untouched
//! subtrees with the old one.
//!
//! Walking down to the edit site, each visited ancestor is rebuilt through
//! a serial-preserving [`copy`](crate::Node::copy); no slot of any
//! previously published node is mutated. The new root carries a transform
//! back-reference to the old root, constructed eagerly by the edit itself:
//! the edit knows exactly which subtree it dropped and which siblings it
//! shifted, so it can emit the [`Dead`](EntryStatus::Dead) entries and
//! range shifts that a lazy diff could not recover.
//!
//! Each operation accepts either a path or a node as its location (see
//! [`TreeLoc`]); node locations are resolved by identity search with
//! [`path_of_node`].

use std::sync::Arc;

use itertools::Itertools;
use thiserror::Error;

use crate::core::SerialNumber;
use crate::lookup::value_at;
use crate::node::{Node, SlotLoc, SlotValue, Value};
use crate::path::{InvalidPath, Path, PathElem};
use crate::transform::{EntryStatus, PathTransform, PatternElem, Rewrite};

/// A location within a tree: a path, or a node to be found by identity.
#[derive(Clone)]
pub enum TreeLoc {
    /// An explicit path from the root.
    Path(Path),
    /// A node located by its serial number.
    Node(Arc<Node>),
}

impl TreeLoc {
    /// Resolve to a canonical path under `tree`.
    fn resolve(&self, tree: &Arc<Node>, insertion: bool) -> Result<Path, EditError> {
        match self {
            TreeLoc::Path(path) => Ok(path.canonical_at_site(tree, insertion)?),
            TreeLoc::Node(node) => path_of_node(tree, node),
        }
    }
}

impl From<Path> for TreeLoc {
    fn from(path: Path) -> Self {
        TreeLoc::Path(path)
    }
}

impl From<&Path> for TreeLoc {
    fn from(path: &Path) -> Self {
        TreeLoc::Path(path.clone())
    }
}

impl From<Arc<Node>> for TreeLoc {
    fn from(node: Arc<Node>) -> Self {
        TreeLoc::Node(node)
    }
}

impl From<&Arc<Node>> for TreeLoc {
    fn from(node: &Arc<Node>) -> Self {
        TreeLoc::Node(node.clone())
    }
}

/// Errors raised by the edit operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum EditError {
    /// The edit location does not resolve against the tree.
    #[error(transparent)]
    InvalidPath(#[from] InvalidPath),

    /// A node-addressed location does not occur under the edited root.
    #[error("node {0} does not occur under the edited root")]
    NodeNotFound(SerialNumber),

    /// Deleting the root of a tree.
    #[error("cannot delete the root of a tree")]
    RemoveRoot,

    /// Inserting at the empty path.
    #[error("cannot insert at the root path")]
    InsertRoot,

    /// Removing or splicing at a scalar child slot.
    #[error("child slot `{slot}` is scalar; only list slots can grow or shrink")]
    ScalarChild {
        /// The scalar slot.
        slot: smol_str::SmolStr,
    },

    /// Swapping two locations where one contains the other.
    #[error("cannot swap nested locations {0} and {1}")]
    NestedSwap(Path, Path),
}

/// The path at which `node` occurs under `tree`, located by identity.
pub fn path_of_node(tree: &Arc<Node>, node: &Node) -> Result<Path, EditError> {
    let serial = node.serial();
    tree.preorder_with_paths()
        .find_map(|(value, path)| {
            value
                .as_node()
                .filter(|n| n.serial() == serial)
                .map(|_| path)
        })
        .ok_or(EditError::NodeNotFound(serial))
}

/// The operation applied at the edit site.
enum SiteOp {
    Replace(Value),
    Remove,
    Splice(Vec<Value>),
}

/// Rebuild the spine from `node` down `path`, applying `op` at the end.
fn rebuild(node: &Arc<Node>, path: &[PathElem], op: SiteOp) -> Result<Arc<Node>, EditError> {
    let (elem, rest) = path
        .split_first()
        .expect("rebuild requires a non-empty path");
    if !rest.is_empty() {
        let child = node.child_by_elem(elem)?;
        let child = child.as_node().ok_or(InvalidPath::NotANode)?;
        let new_child = rebuild(child, rest, op)?;
        let loc = node.locate(elem, false)?;
        return Ok(replace_at(node, loc, Value::Node(new_child)));
    }
    match op {
        SiteOp::Replace(value) => {
            let loc = node.locate(elem, false)?;
            Ok(replace_at(node, loc, value))
        }
        SiteOp::Remove => {
            let loc = node.locate(elem, false)?;
            let index = loc.index.ok_or_else(|| scalar_child(node, loc))?;
            let SlotValue::List(values) = node.slot_value(loc.slot) else {
                unreachable!("locate returns an index exactly for list slots")
            };
            let mut values = values.clone();
            values.remove(index);
            Ok(node.copy_with_slot(loc.slot, SlotValue::List(values)))
        }
        SiteOp::Splice(spliced) => {
            let loc = node.locate(elem, true)?;
            let index = loc.index.ok_or_else(|| scalar_child(node, loc))?;
            let SlotValue::List(values) = node.slot_value(loc.slot) else {
                unreachable!("locate returns an index exactly for list slots")
            };
            let mut values = values.clone();
            values.splice(index..index, spliced);
            Ok(node.copy_with_slot(loc.slot, SlotValue::List(values)))
        }
    }
}

fn scalar_child(node: &Node, loc: SlotLoc) -> EditError {
    EditError::ScalarChild {
        slot: node.child_slots()[loc.slot].name.into(),
    }
}

fn replace_at(node: &Arc<Node>, loc: SlotLoc, value: Value) -> Arc<Node> {
    let slot = match (node.slot_value(loc.slot), loc.index) {
        (SlotValue::Scalar(_), None) => SlotValue::Scalar(value),
        (SlotValue::List(values), Some(i)) => {
            let mut values = values.clone();
            values[i] = value;
            SlotValue::List(values)
        }
        _ => unreachable!("locate returns an index exactly for list slots"),
    };
    node.copy_with_slot(loc.slot, slot)
}

/// Attach an eagerly constructed transform to an edit result.
fn attach(root: Arc<Node>, transform: PathTransform) -> Arc<Node> {
    root.copy()
        .transform(transform)
        .finish()
        .expect("copy of a well-formed root cannot fail")
}

/// Slot qualifier for a range pattern shifting the siblings of `elem`.
fn range_qualifier(elem: &PathElem) -> Option<smol_str::SmolStr> {
    match elem {
        PathElem::SlotIndex(name, _) => Some(name.clone()),
        _ => None,
    }
}

/// Length of the child list that `elem` indexes into at `parent`.
fn sibling_count(parent: &Node, elem: &PathElem) -> Result<(usize, usize), EditError> {
    let loc = parent.locate(elem, true)?;
    let index = loc.index.ok_or_else(|| scalar_child(parent, loc))?;
    let SlotValue::List(values) = parent.slot_value(loc.slot) else {
        unreachable!("locate returns an index exactly for list slots")
    };
    Ok((index, values.len()))
}

impl Node {
    /// Replace the value at `loc` with `value`, returning the new root.
    ///
    /// Replacing at the empty path returns `value` itself (which must be a
    /// node), carrying the edit's back-reference.
    pub fn with(
        self: &Arc<Self>,
        loc: impl Into<TreeLoc>,
        value: impl Into<Value>,
    ) -> Result<Arc<Node>, EditError> {
        let path = loc.into().resolve(self, false)?;
        let value = value.into();
        let transform = PathTransform::new(
            self.clone(),
            [Rewrite::exact(path.clone(), path.clone(), EntryStatus::Dead)],
        );
        let new_root = if path.is_empty() {
            value.as_node().ok_or(InvalidPath::NotANode)?.clone()
        } else {
            rebuild(self, path.elems(), SiteOp::Replace(value))?
        };
        Ok(attach(new_root, transform))
    }

    /// Delete the value at `loc`; the enclosing child list shrinks by one.
    ///
    /// Deleting the empty path is a caller error ([`EditError::RemoveRoot`]).
    pub fn less(self: &Arc<Self>, loc: impl Into<TreeLoc>) -> Result<Arc<Node>, EditError> {
        let path = loc.into().resolve(self, false)?;
        let (parent, last) = path.split_last().ok_or(EditError::RemoveRoot)?;
        let parent_node = value_at(self, &parent)?;
        let parent_node = parent_node.as_node().ok_or(InvalidPath::NotANode)?;
        let (index, len) = sibling_count(parent_node, last)?;

        let new_root = rebuild(self, path.elems(), SiteOp::Remove)?;

        let mut entries = vec![Rewrite::exact(path.clone(), parent.clone(), EntryStatus::Dead)];
        if index + 1 < len {
            // Later siblings shift down by one.
            entries.push(Rewrite::new(
                parent
                    .iter()
                    .cloned()
                    .map(PatternElem::Exact)
                    .chain([PatternElem::range(range_qualifier(last), index + 1, len - 1)]),
                parent.child(last.clone()),
                EntryStatus::Live,
            ));
        }
        Ok(attach(new_root, PathTransform::new(self.clone(), entries)))
    }

    /// Insert `value` so that it ends up at `loc`.
    pub fn insert(
        self: &Arc<Self>,
        loc: impl Into<TreeLoc>,
        value: impl Into<Value>,
    ) -> Result<Arc<Node>, EditError> {
        self.splice(loc, [value.into()])
    }

    /// Insert a list of values starting at `loc`; later siblings shift up
    /// by the length of the list.
    ///
    /// An empty list is an in-place no-op: the same root is returned.
    pub fn splice(
        self: &Arc<Self>,
        loc: impl Into<TreeLoc>,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<Arc<Node>, EditError> {
        let values = values.into_iter().collect_vec();
        if values.is_empty() {
            return Ok(self.clone());
        }
        let shift = values.len();
        let path = loc.into().resolve(self, true)?;
        let (parent, last) = path.split_last().ok_or(EditError::InsertRoot)?;
        let parent_node = value_at(self, &parent)?;
        let parent_node = parent_node.as_node().ok_or(InvalidPath::NotANode)?;
        let (index, len) = sibling_count(parent_node, last)?;

        let new_root = rebuild(self, path.elems(), SiteOp::Splice(values))?;

        let mut entries = Vec::new();
        if index < len {
            // Old elements at the insertion point and after shift up.
            entries.push(Rewrite::new(
                parent
                    .iter()
                    .cloned()
                    .map(PatternElem::Exact)
                    .chain([PatternElem::range(range_qualifier(last), index, len - 1)]),
                parent.child(last.offset_index(shift)),
                EntryStatus::Live,
            ));
        }
        Ok(attach(new_root, PathTransform::new(self.clone(), entries)))
    }

    /// Exchange the subtrees at two locations.
    ///
    /// Commutative in its arguments and self-inverse: swapping the same
    /// two locations twice restores the original tree structurally.
    pub fn swap(
        self: &Arc<Self>,
        a: impl Into<TreeLoc>,
        b: impl Into<TreeLoc>,
    ) -> Result<Arc<Node>, EditError> {
        let p1 = a.into().resolve(self, false)?;
        let p2 = b.into().resolve(self, false)?;
        if p1 == p2 {
            return Ok(self.clone());
        }
        if p1.is_prefix_of(&p2) || p2.is_prefix_of(&p1) {
            return Err(EditError::NestedSwap(p1, p2));
        }
        let v1 = value_at(self, &p1)?;
        let v2 = value_at(self, &p2)?;
        let new_root = rebuild(self, p1.elems(), SiteOp::Replace(v2))?;
        let new_root = rebuild(&new_root, p2.elems(), SiteOp::Replace(v1))?;
        let transform = PathTransform::new(
            self.clone(),
            [
                Rewrite::exact(p1.clone(), p2.clone(), EntryStatus::Live),
                Rewrite::exact(p2, p1, EntryStatus::Live),
            ],
        );
        Ok(attach(new_root, transform))
    }
}
