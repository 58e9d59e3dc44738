//! Polymorphic lookup and list projections.
//!
//! [`Node::lookup`] dispatches on the variant of its [`TreeKey`]: the
//! root itself, a flat child index, a single path element, a full path, or
//! a [`Finger`] (which may be anchored at a different root and is
//! translated through the back-reference chain first). [`Repr`] is the
//! bookkeeping-free nested list / association list projection of a tree.

use std::sync::Arc;

use smol_str::SmolStr;
use thiserror::Error;

use crate::finger::Finger;
use crate::node::{Atom, Node, SlotValue, Value};
use crate::path::{InvalidPath, Path, PathElem};
use crate::transform::TransformError;

/// The value a path points at under `root`.
///
/// The empty path yields the root itself.
pub(crate) fn value_at(root: &Arc<Node>, path: &Path) -> Result<Value, InvalidPath> {
    let mut value = Value::Node(root.clone());
    for elem in path {
        let node = value.as_node().ok_or(InvalidPath::NotANode)?;
        value = node.child_by_elem(elem)?.clone();
    }
    Ok(value)
}

impl Path {
    /// This path re-encoded canonically against `root`: bare indices at
    /// single-list-slot nodes, slot-qualified elements elsewhere.
    ///
    /// Fails if the path is not valid at `root`.
    pub fn canonical_at(&self, root: &Arc<Node>) -> Result<Path, InvalidPath> {
        self.canonical_at_site(root, false)
    }

    /// Like [`Self::canonical_at`], but when `insertion` is set the final
    /// element may point one past the end of its child list.
    pub(crate) fn canonical_at_site(
        &self,
        root: &Arc<Node>,
        insertion: bool,
    ) -> Result<Path, InvalidPath> {
        let mut out = Vec::with_capacity(self.len());
        let mut value = Value::Node(root.clone());
        let mut elems = self.iter().peekable();
        while let Some(elem) = elems.next() {
            let node = value.as_node().ok_or(InvalidPath::NotANode)?;
            let last = elems.peek().is_none();
            out.push(node.canonical_elem(elem, insertion && last)?);
            if !last {
                value = node.child_by_elem(elem)?.clone();
            }
        }
        Ok(Path::from(out))
    }

    /// Whether this path is valid at `root`.
    pub fn is_valid_at(&self, root: &Arc<Node>) -> bool {
        value_at(root, self).is_ok()
    }
}

/// A lookup key; see [`Node::lookup`].
#[derive(Clone)]
pub enum TreeKey {
    /// The root itself (the empty path).
    Root,
    /// An index into the flat concatenation of all children.
    Index(usize),
    /// A single path element.
    Elem(PathElem),
    /// A path, descended recursively.
    Path(Path),
    /// A finger, resolved (and translated first when anchored elsewhere).
    Finger(Finger),
}

impl From<usize> for TreeKey {
    fn from(index: usize) -> Self {
        TreeKey::Index(index)
    }
}

impl From<PathElem> for TreeKey {
    fn from(elem: PathElem) -> Self {
        TreeKey::Elem(elem)
    }
}

impl From<Path> for TreeKey {
    fn from(path: Path) -> Self {
        TreeKey::Path(path)
    }
}

impl From<&Path> for TreeKey {
    fn from(path: &Path) -> Self {
        TreeKey::Path(path.clone())
    }
}

impl From<Finger> for TreeKey {
    fn from(finger: Finger) -> Self {
        TreeKey::Finger(finger)
    }
}

impl From<&Finger> for TreeKey {
    fn from(finger: &Finger) -> Self {
        TreeKey::Finger(finger.clone())
    }
}

/// A resolved lookup: the value found, plus the residue when the key was a
/// finger translated through a lossy edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The value the key resolved to.
    pub value: Value,
    /// Untranslated remainder; empty except for finger keys.
    pub residue: Path,
}

impl Resolved {
    fn clean(value: Value) -> Self {
        Resolved {
            value,
            residue: Path::new(),
        }
    }
}

/// Errors raised by [`Node::lookup`].
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum LookupError {
    /// The key does not resolve against the tree.
    #[error(transparent)]
    InvalidPath(#[from] InvalidPath),

    /// A finger key could not be translated to this root.
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl Node {
    /// Look up a value by a polymorphic [`TreeKey`].
    pub fn lookup(self: &Arc<Self>, key: impl Into<TreeKey>) -> Result<Resolved, LookupError> {
        match key.into() {
            TreeKey::Root => Ok(Resolved::clean(Value::Node(self.clone()))),
            TreeKey::Index(i) => {
                let value = self
                    .children()
                    .nth(i)
                    .ok_or(InvalidPath::OutOfBounds {
                        slot: None,
                        index: i,
                        len: self.child_count(),
                    })?
                    .clone();
                Ok(Resolved::clean(value))
            }
            TreeKey::Elem(elem) => Ok(Resolved::clean(self.child_by_elem(&elem)?.clone())),
            TreeKey::Path(path) => Ok(Resolved::clean(value_at(self, &path)?)),
            TreeKey::Finger(finger) => {
                let finger = if finger.root().serial() == self.serial() {
                    finger
                } else {
                    finger.translate(self)?
                };
                let value = finger.resolve()?.clone();
                Ok(Resolved {
                    value,
                    residue: finger.residue().clone(),
                })
            }
        }
    }

    /// The value at `path`, a shorthand for path lookups.
    pub fn at(self: &Arc<Self>, path: &Path) -> Result<Value, InvalidPath> {
        value_at(self, path)
    }
}

/// A bookkeeping-free projection of a tree: nested lists headed by each
/// node's data, or association lists of slot contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repr {
    /// An atomic value.
    Atom(Atom),
    /// `(data, child1, child2, …)` for a node.
    List(Vec<Repr>),
    /// `(slot_name, contents)` pairs for a node.
    Pairs(Vec<(SmolStr, Repr)>),
}

/// The nested list representation of a tree: each node becomes
/// `(data, child1, child2, …)`, recursively.
///
/// The head is the node's data when the variant declares a data slot, and
/// the variant name otherwise.
pub fn to_list(node: &Arc<Node>) -> Repr {
    to_list_with(node, &mut default_head)
}

/// Like [`to_list`], with an override for the per-node head value.
pub fn to_list_with(node: &Arc<Node>, value_fn: &mut dyn FnMut(&Arc<Node>) -> Repr) -> Repr {
    let mut items = vec![value_fn(node)];
    for child in node.children() {
        items.push(match child {
            Value::Node(n) => to_list_with(n, &mut *value_fn),
            Value::Atom(a) => Repr::Atom(a.clone()),
        });
    }
    Repr::List(items)
}

impl Finger {
    /// The list representation of the resolved target, or the plain value
    /// when the finger points at an atom.
    pub fn to_list(&self) -> Result<Repr, InvalidPath> {
        Ok(match self.resolve()? {
            Value::Node(n) => to_list(n),
            Value::Atom(a) => Repr::Atom(a.clone()),
        })
    }
}

fn default_head(node: &Arc<Node>) -> Repr {
    match node.payload() {
        Some(Value::Atom(a)) => Repr::Atom(a.clone()),
        Some(Value::Node(n)) => to_list(n),
        None => Repr::Atom(Atom::symbol(node.variant().name)),
    }
}

/// The association list representation of a tree: each node becomes the
/// list of its `(slot_name, contents)` pairs — the data slot first, then
/// every child slot — with child nodes rendered recursively. Internal
/// bookkeeping (serial numbers, back-references, fingers) is not included.
pub fn to_alist(node: &Arc<Node>) -> Repr {
    let mut pairs = Vec::new();
    if let (Some(slot), Some(payload)) = (node.variant().data_slot, node.payload()) {
        pairs.push((SmolStr::new_static(slot), alist_value(payload)));
    }
    for (decl, slot) in node.child_slots().iter().zip(node.slots_iter()) {
        let contents = match slot {
            SlotValue::Scalar(v) => alist_value(v),
            SlotValue::List(vs) => Repr::List(vs.iter().map(alist_value).collect()),
        };
        pairs.push((SmolStr::new_static(decl.name), contents));
    }
    Repr::Pairs(pairs)
}

fn alist_value(value: &Value) -> Repr {
    match value {
        Value::Node(n) => to_alist(n),
        Value::Atom(a) => Repr::Atom(a.clone()),
    }
}

#[cfg(test)]
mod test {
    use cool_asserts::assert_matches;

    use super::*;
    use crate::path;
    use crate::tests::sample_tree;

    #[test]
    fn lookup_dispatches_on_key_variant() {
        let (root, serials) = sample_tree();
        // Empty key: the root.
        let r = root.lookup(TreeKey::Root).unwrap();
        assert_eq!(r.value.as_node().unwrap().serial(), serials[0]);
        // Flat child index.
        let r = root.lookup(1).unwrap();
        assert_eq!(r.value.as_node().unwrap().serial(), serials[2]);
        // Path.
        let r = root.lookup(&path![1, 0]).unwrap();
        assert_eq!(r.value.as_node().unwrap().serial(), serials[3]);
        // Element.
        let r = root.lookup(PathElem::index(0)).unwrap();
        assert_eq!(r.value.as_node().unwrap().serial(), serials[1]);
    }

    #[test]
    fn lookup_failures() {
        let (root, _) = sample_tree();
        assert_matches!(
            root.lookup(7),
            Err(LookupError::InvalidPath(InvalidPath::OutOfBounds { .. }))
        );
        assert_matches!(
            root.lookup(&path![0, 0]),
            Err(LookupError::InvalidPath(InvalidPath::OutOfBounds { .. }))
        );
    }

    #[test]
    fn list_projection() {
        let (root, _) = sample_tree();
        let repr = to_list(&root);
        let Repr::List(items) = &repr else {
            panic!("expected a list, got {repr:?}")
        };
        assert_eq!(items[0], Repr::Atom(Atom::symbol("a")));
        assert_eq!(
            items[1],
            Repr::List(vec![Repr::Atom(Atom::symbol("b"))])
        );
        assert_matches!(&items[2], Repr::List(sub) if sub.len() == 3);
    }

    #[test]
    fn alist_projection_covers_all_slots() {
        let (root, _) = sample_tree();
        let Repr::Pairs(pairs) = to_alist(&root) else {
            panic!("expected pairs")
        };
        let names: Vec<&str> = pairs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["label", "kids"]);
    }

    #[test]
    fn finger_keys_translate_and_carry_residue() {
        let (r1, _) = sample_tree();
        let f = Finger::new(r1.clone(), path![1, 0]);
        let r2 = r1.with(path![1], crate::tests::leaf("g")).unwrap();
        let resolved = r2.lookup(&f).unwrap();
        assert_eq!(resolved.residue, path![0]);
        assert_eq!(crate::tests::label(&resolved.value), "g");
    }

    #[test]
    fn finger_list_projection() {
        let (root, _) = sample_tree();
        let f = Finger::new(root, path![0]);
        assert_eq!(
            f.to_list().unwrap(),
            Repr::List(vec![Repr::Atom(Atom::symbol("b"))])
        );
    }
}
