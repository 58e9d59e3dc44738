//! The polymorphic node model.
//!
//! A [`Node`] is a heterogeneous record: an identity ([`SerialNumber`]), a
//! reference to its [`Variant`] (the class-level declaration of its child
//! layout), the per-slot child values, an optional data payload, and two
//! pieces of lazy bookkeeping — the transform back-reference that links an
//! edit result to its predecessor tree, and a write-once [`Finger`] slot
//! populated by [`populate_fingers`](crate::finger::populate_fingers).
//!
//! Nodes are always handled through [`Arc`]; previously published nodes are
//! never mutated. Construction goes through [`NodeBuilder`] (fresh nodes)
//! or [`CopyBuilder`] (copy-with-overrides via [`Node::copy`], preserving
//! the serial number unless one is explicitly supplied). Structural sharing
//! of identity across edits rests entirely on that preservation.

use std::sync::{Arc, OnceLock};

use itertools::{Either, Itertools};
use smol_str::SmolStr;
use thiserror::Error;

use crate::core::SerialNumber;
use crate::finger::Finger;
use crate::path::{InvalidPath, PathElem};
use crate::transform::{Backref, TransformSource};

/// Whether a child slot holds a single child or a list of children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// A single-child slot.
    Scalar,
    /// A list-of-children slot.
    List,
}

/// The class-level declaration of one child slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDecl {
    /// The slot name.
    pub name: &'static str,
    /// Scalar or list.
    pub kind: SlotKind,
}

impl SlotDecl {
    /// Declare a scalar child slot.
    pub const fn scalar(name: &'static str) -> Self {
        SlotDecl {
            name,
            kind: SlotKind::Scalar,
        }
    }

    /// Declare a list child slot.
    pub const fn list(name: &'static str) -> Self {
        SlotDecl {
            name,
            kind: SlotKind::List,
        }
    }
}

/// A node variant: the domain-specific kind of a node.
///
/// The core does not enumerate variants; domain code declares each kind as
/// a `static` descriptor and passes `&'static Variant` to the builders. The
/// descriptor fixes the ordered set of child-bearing slots and, optionally,
/// the name of the data slot whose value is returned by [`Node::data`].
#[derive(Debug, PartialEq, Eq)]
pub struct Variant {
    /// Variant name, used in diagnostics and default list projections.
    pub name: &'static str,
    /// Ordered child slot declarations.
    pub child_slots: &'static [SlotDecl],
    /// Name of the data slot, if the variant declares one.
    pub data_slot: Option<&'static str>,
}

impl Variant {
    /// Position of the child slot called `name`.
    pub fn slot_position(&self, name: &str) -> Option<usize> {
        self.child_slots.iter().position(|d| d.name == name)
    }

    /// If the layout is exactly one list-valued child slot, its position.
    ///
    /// Bare [`PathElem::Index`] elements are only valid at nodes of such
    /// variants.
    pub fn single_list_slot(&self) -> Option<usize> {
        match self.child_slots {
            [decl] if decl.kind == SlotKind::List => Some(0),
            _ => None,
        }
    }
}

/// An atomic (non-node) value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Atom {
    /// A symbolic label.
    Symbol(SmolStr),
    /// An integer.
    Int(i64),
    /// A text literal.
    Text(SmolStr),
}

impl Atom {
    /// A symbol atom.
    pub fn symbol(name: impl Into<SmolStr>) -> Self {
        Atom::Symbol(name.into())
    }
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Atom::Symbol(s) => write!(f, "{s}"),
            Atom::Int(i) => write!(f, "{i}"),
            Atom::Text(t) => write!(f, "{t:?}"),
        }
    }
}

impl From<i64> for Atom {
    fn from(i: i64) -> Self {
        Atom::Int(i)
    }
}

impl From<&str> for Atom {
    fn from(s: &str) -> Self {
        Atom::Symbol(s.into())
    }
}

/// A tree value: either a node or an atom.
///
/// Children lists may freely mix the two; traversals pass atoms through
/// without recursing.
#[derive(Clone)]
pub enum Value {
    /// A subtree.
    Node(Arc<Node>),
    /// A scalar leaf.
    Atom(Atom),
}

impl Value {
    /// A symbol leaf.
    pub fn symbol(name: impl Into<SmolStr>) -> Self {
        Value::Atom(Atom::symbol(name))
    }

    /// The node, if this value is one.
    pub fn as_node(&self) -> Option<&Arc<Node>> {
        match self {
            Value::Node(n) => Some(n),
            Value::Atom(_) => None,
        }
    }

    /// The atom, if this value is one.
    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Value::Node(_) => None,
            Value::Atom(a) => Some(a),
        }
    }

    /// Whether this value is a node.
    pub fn is_node(&self) -> bool {
        matches!(self, Value::Node(_))
    }

    /// Number of values in this subtree: 1 for an atom, `1 + Σ size(child)`
    /// for a node.
    pub fn size(&self) -> usize {
        match self {
            Value::Node(n) => n.size(),
            Value::Atom(_) => 1,
        }
    }

    /// Whether two values are the same object: pointer equality for nodes,
    /// value equality for atoms.
    pub(crate) fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Node(a), Value::Node(b)) => Arc::ptr_eq(a, b),
            (Value::Atom(a), Value::Atom(b)) => a == b,
            _ => false,
        }
    }
}

/// Values compare by identity for nodes (serial numbers) and by value for
/// atoms.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Node(a), Value::Node(b)) => a.serial() == b.serial(),
            (Value::Atom(a), Value::Atom(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Node(n) => write!(f, "{n:?}"),
            Value::Atom(a) => write!(f, "{a}"),
        }
    }
}

impl From<Arc<Node>> for Value {
    fn from(node: Arc<Node>) -> Self {
        Value::Node(node)
    }
}

impl From<&Arc<Node>> for Value {
    fn from(node: &Arc<Node>) -> Self {
        Value::Node(node.clone())
    }
}

impl From<Atom> for Value {
    fn from(atom: Atom) -> Self {
        Value::Atom(atom)
    }
}

/// The contents of one child slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    /// Contents of a scalar slot.
    Scalar(Value),
    /// Contents of a list slot.
    List(Vec<Value>),
}

/// Location of a child within a node: slot position plus, for list slots,
/// the index within the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotLoc {
    pub slot: usize,
    pub index: Option<usize>,
}

/// A node of a persistent labeled tree.
///
/// See the [module documentation](self) for the construction and sharing
/// contract.
pub struct Node {
    serial: SerialNumber,
    variant: &'static Variant,
    slots: Vec<SlotValue>,
    data: Option<Value>,
    pub(crate) backref: Backref,
    pub(crate) finger: OnceLock<Finger>,
}

// Print out nodes as `variant#serial`.
impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.variant.name, self.serial)
    }
}

impl Node {
    /// Start building a fresh node of the given variant.
    pub fn build(variant: &'static Variant) -> NodeBuilder {
        NodeBuilder {
            variant,
            assigns: Vec::new(),
            data: None,
            serial: None,
            source: None,
        }
    }

    /// Start a copy-with-overrides of this node.
    ///
    /// With no overrides the copy preserves the serial number, every slot
    /// value and the transform back-reference of the source; this is how
    /// identity-based sharing survives edits. Overriding the transform
    /// replaces the inherited back-reference.
    pub fn copy(&self) -> CopyBuilder {
        CopyBuilder {
            inner: NodeBuilder {
                variant: self.variant,
                assigns: self
                    .variant
                    .child_slots
                    .iter()
                    .zip(&self.slots)
                    .map(|(decl, v)| (SmolStr::new_static(decl.name), v.clone()))
                    .collect(),
                data: self.data.clone(),
                serial: Some(self.serial),
                source: self.backref.source(),
            },
        }
    }

    /// The node's identity.
    pub fn serial(&self) -> SerialNumber {
        self.serial
    }

    /// The node's variant descriptor.
    pub fn variant(&self) -> &'static Variant {
        self.variant
    }

    /// The declared child slots.
    pub fn child_slots(&self) -> &'static [SlotDecl] {
        self.variant.child_slots
    }

    /// The contents of the child slot called `name`.
    pub fn slot(&self, name: &str) -> Option<&SlotValue> {
        Some(&self.slots[self.variant.slot_position(name)?])
    }

    /// The contents of the child slot at a declaration position.
    pub(crate) fn slot_value(&self, slot: usize) -> &SlotValue {
        &self.slots[slot]
    }

    /// The slot contents in declaration order.
    pub(crate) fn slots_iter(&self) -> impl Iterator<Item = &SlotValue> + '_ {
        self.slots.iter()
    }

    /// The data payload, if the variant declares a data slot.
    pub fn payload(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// The node's data: the declared data slot's value, or the node itself
    /// when the variant declares none.
    pub fn data(self: &Arc<Self>) -> Value {
        match &self.data {
            Some(v) => v.clone(),
            None => Value::Node(self.clone()),
        }
    }

    /// The ordered concatenation of all child slot contents.
    pub fn children(&self) -> impl Iterator<Item = &Value> + '_ {
        self.slots.iter().flat_map(|s| match s {
            SlotValue::Scalar(v) => std::slice::from_ref(v).iter(),
            SlotValue::List(vs) => vs.iter(),
        })
    }

    /// Number of children across all slots.
    pub fn child_count(&self) -> usize {
        self.slots
            .iter()
            .map(|s| match s {
                SlotValue::Scalar(_) => 1,
                SlotValue::List(vs) => vs.len(),
            })
            .sum()
    }

    /// The children together with their canonical path elements.
    pub fn child_elems(&self) -> impl Iterator<Item = (PathElem, &Value)> + '_ {
        let single_list = self.variant.single_list_slot().is_some();
        self.variant
            .child_slots
            .iter()
            .zip(&self.slots)
            .flat_map(move |(decl, slot)| match slot {
                SlotValue::Scalar(v) => {
                    Either::Left(std::iter::once((PathElem::slot(decl.name), v)))
                }
                SlotValue::List(vs) => Either::Right(vs.iter().enumerate().map(move |(i, v)| {
                    let elem = if single_list {
                        PathElem::Index(i)
                    } else {
                        PathElem::slot_index(decl.name, i)
                    };
                    (elem, v)
                })),
            })
    }

    /// Number of values in this subtree: `1 + Σ size(child)`.
    pub fn size(&self) -> usize {
        1 + self.children().map(Value::size).sum::<usize>()
    }

    /// Length of the longest root-to-leaf walk.
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .filter_map(Value::as_node)
            .map(|n| n.depth())
            .max()
            .unwrap_or(0)
    }

    /// The finger populated for this node, if
    /// [`populate_fingers`](crate::finger::populate_fingers) has run over a
    /// root containing it.
    pub fn finger(&self) -> Option<&Finger> {
        self.finger.get()
    }

    /// Resolve a path element to the location of a child.
    ///
    /// With `allow_end` set, an index one past the end of a list slot is
    /// accepted (the insertion point used by splicing edits).
    pub(crate) fn locate(&self, elem: &PathElem, allow_end: bool) -> Result<SlotLoc, InvalidPath> {
        let (slot, index) = match elem {
            PathElem::Index(i) => {
                let slot = self
                    .variant
                    .single_list_slot()
                    .ok_or(InvalidPath::BareIndex {
                        variant: self.variant.name,
                    })?;
                (slot, Some(*i))
            }
            PathElem::Slot(name) => {
                let slot =
                    self.variant
                        .slot_position(name)
                        .ok_or_else(|| InvalidPath::UnknownSlot {
                            variant: self.variant.name,
                            slot: name.clone(),
                        })?;
                if self.variant.child_slots[slot].kind == SlotKind::List {
                    return Err(InvalidPath::ListSlot { slot: name.clone() });
                }
                (slot, None)
            }
            PathElem::SlotIndex(name, i) => {
                let slot =
                    self.variant
                        .slot_position(name)
                        .ok_or_else(|| InvalidPath::UnknownSlot {
                            variant: self.variant.name,
                            slot: name.clone(),
                        })?;
                if self.variant.child_slots[slot].kind == SlotKind::Scalar {
                    return Err(InvalidPath::ScalarSlot { slot: name.clone() });
                }
                (slot, Some(*i))
            }
        };
        if let Some(i) = index {
            let SlotValue::List(vs) = &self.slots[slot] else {
                unreachable!("slot kind checked against declaration")
            };
            let limit = if allow_end { vs.len() + 1 } else { vs.len() };
            if i >= limit {
                return Err(InvalidPath::OutOfBounds {
                    slot: match elem {
                        PathElem::SlotIndex(name, _) => Some(name.clone()),
                        _ => None,
                    },
                    index: i,
                    len: vs.len(),
                });
            }
        }
        Ok(SlotLoc { slot, index })
    }

    /// The child selected by a path element.
    pub fn child_by_elem(&self, elem: &PathElem) -> Result<&Value, InvalidPath> {
        let loc = self.locate(elem, false)?;
        Ok(match (&self.slots[loc.slot], loc.index) {
            (SlotValue::Scalar(v), None) => v,
            (SlotValue::List(vs), Some(i)) => &vs[i],
            _ => unreachable!("locate returns an index exactly for list slots"),
        })
    }

    /// The canonical encoding of a path element at this node: bare indices
    /// at single-list-slot nodes, slot-qualified elements elsewhere.
    pub(crate) fn canonical_elem(
        &self,
        elem: &PathElem,
        allow_end: bool,
    ) -> Result<PathElem, InvalidPath> {
        let loc = self.locate(elem, allow_end)?;
        let decl = &self.variant.child_slots[loc.slot];
        Ok(match loc.index {
            None => PathElem::slot(decl.name),
            Some(i) if self.variant.single_list_slot().is_some() => PathElem::Index(i),
            Some(i) => PathElem::slot_index(decl.name, i),
        })
    }

    /// Internal copy with one slot replaced, preserving serial and variant.
    pub(crate) fn copy_with_slot(&self, slot: usize, value: SlotValue) -> Arc<Node> {
        let mut slots = self.slots.clone();
        slots[slot] = value;
        self.copy_with_slots(slots)
    }

    /// Internal copy with all slots replaced, preserving serial and variant.
    pub(crate) fn copy_with_slots(&self, slots: Vec<SlotValue>) -> Arc<Node> {
        debug_assert_eq!(slots.len(), self.slots.len());
        Arc::new(Node {
            serial: self.serial,
            variant: self.variant,
            slots,
            data: self.data.clone(),
            backref: self.backref.snapshot(),
            finger: OnceLock::new(),
        })
    }

    /// Structural equality: same serial numbers, variants, payloads and
    /// children, recursively. Distinct allocations of the same tree compare
    /// equal; this is the equality used by the edit laws (e.g. a swap
    /// applied twice).
    pub fn structural_eq(&self, other: &Node) -> bool {
        self.serial == other.serial
            && std::ptr::eq(self.variant, other.variant)
            && self.data == other.data
            && self.slots.len() == other.slots.len()
            && self
                .children()
                .zip_longest(other.children())
                .all(|pair| match pair {
                    itertools::EitherOrBoth::Both(a, b) => match (a, b) {
                        (Value::Node(a), Value::Node(b)) => a.structural_eq(b),
                        (a, b) => a == b,
                    },
                    _ => false,
                })
    }
}

/// Errors while constructing a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// A slot name the variant does not declare.
    #[error("variant `{variant}` has no child slot named `{slot}`")]
    UnknownSlot {
        /// The variant being built.
        variant: &'static str,
        /// The unknown slot name.
        slot: SmolStr,
    },

    /// A scalar value assigned to a list slot or vice versa.
    #[error("child slot `{slot}` was assigned the wrong kind of contents")]
    KindMismatch {
        /// The slot with mismatching contents.
        slot: SmolStr,
    },

    /// A scalar slot left without contents.
    #[error("scalar child slot `{slot}` was not assigned")]
    MissingSlot {
        /// The unassigned slot.
        slot: SmolStr,
    },

    /// A payload given to a variant with no data slot.
    #[error("variant `{variant}` declares no data slot")]
    NoDataSlot {
        /// The variant being built.
        variant: &'static str,
    },

    /// No payload given though the variant declares a data slot.
    #[error("variant `{variant}` declares data slot `{slot}` but no payload was assigned")]
    MissingData {
        /// The variant being built.
        variant: &'static str,
        /// The declared data slot.
        slot: &'static str,
    },
}

/// Builder for fresh [`Node`]s; see [`Node::build`].
///
/// Copies go through [`CopyBuilder`] instead, which prefills the source
/// node's values.
#[derive(Clone)]
pub struct NodeBuilder {
    variant: &'static Variant,
    assigns: Vec<(SmolStr, SlotValue)>,
    data: Option<Value>,
    serial: Option<SerialNumber>,
    source: Option<TransformSource>,
}

impl NodeBuilder {
    /// Assign a scalar child slot.
    #[must_use]
    pub fn slot(mut self, name: impl Into<SmolStr>, value: impl Into<Value>) -> Self {
        self.set(name.into(), SlotValue::Scalar(value.into()));
        self
    }

    /// Assign a list child slot.
    #[must_use]
    pub fn list(
        mut self,
        name: impl Into<SmolStr>,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.set(name.into(), SlotValue::List(values.into_iter().collect()));
        self
    }

    fn set(&mut self, name: SmolStr, value: SlotValue) {
        // Later assignments override earlier ones (copies prefill the
        // inherited values, so overrides simply win).
        self.assigns.push((name, value));
    }

    /// Assign the data payload.
    #[must_use]
    pub fn data(mut self, value: impl Into<Value>) -> Self {
        self.data = Some(value.into());
        self
    }

    /// Use an explicitly supplied serial number instead of a fresh one.
    #[must_use]
    pub fn serial(mut self, serial: impl Into<SerialNumber>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Set the transform back-reference: either a predecessor root (to be
    /// diffed lazily) or an already materialized
    /// [`PathTransform`](crate::transform::PathTransform).
    #[must_use]
    pub fn transform(mut self, source: impl Into<TransformSource>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Finish the node.
    pub fn finish(self) -> Result<Arc<Node>, BuildError> {
        let variant = self.variant;
        let mut slots: Vec<Option<SlotValue>> = vec![None; variant.child_slots.len()];
        for (name, value) in self.assigns {
            let slot = variant
                .slot_position(&name)
                .ok_or_else(|| BuildError::UnknownSlot {
                    variant: variant.name,
                    slot: name.clone(),
                })?;
            let declared = variant.child_slots[slot].kind;
            let assigned = match &value {
                SlotValue::Scalar(_) => SlotKind::Scalar,
                SlotValue::List(_) => SlotKind::List,
            };
            if declared != assigned {
                return Err(BuildError::KindMismatch { slot: name });
            }
            slots[slot] = Some(value);
        }
        let slots = variant
            .child_slots
            .iter()
            .zip(slots)
            .map(|(decl, v)| match (decl.kind, v) {
                (_, Some(v)) => Ok(v),
                (SlotKind::List, None) => Ok(SlotValue::List(Vec::new())),
                (SlotKind::Scalar, None) => Err(BuildError::MissingSlot {
                    slot: decl.name.into(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        match (variant.data_slot, &self.data) {
            (None, Some(_)) => {
                return Err(BuildError::NoDataSlot {
                    variant: variant.name,
                });
            }
            (Some(slot), None) => {
                return Err(BuildError::MissingData {
                    variant: variant.name,
                    slot,
                });
            }
            _ => {}
        }
        let serial = match self.serial {
            Some(serial) => {
                serial.observe();
                serial
            }
            None => SerialNumber::fresh(),
        };
        Ok(Arc::new(Node {
            serial,
            variant,
            slots,
            data: self.data,
            backref: self.source.map_or_else(Backref::empty, Backref::from_source),
            finger: OnceLock::new(),
        }))
    }
}

/// Builder for copy-with-overrides; see [`Node::copy`].
///
/// Prefilled from the source node: the serial number, every slot value,
/// the payload and the transform back-reference. Overrides replace the
/// inherited values; with no overrides, [`finish`](Self::finish)
/// reproduces the source.
#[derive(Clone)]
pub struct CopyBuilder {
    inner: NodeBuilder,
}

impl CopyBuilder {
    /// Override a scalar child slot.
    #[must_use]
    pub fn slot(mut self, name: impl Into<SmolStr>, value: impl Into<Value>) -> Self {
        self.inner = self.inner.slot(name, value);
        self
    }

    /// Override a list child slot.
    #[must_use]
    pub fn list(
        mut self,
        name: impl Into<SmolStr>,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.inner = self.inner.list(name, values);
        self
    }

    /// Override the data payload.
    #[must_use]
    pub fn data(mut self, value: impl Into<Value>) -> Self {
        self.inner = self.inner.data(value);
        self
    }

    /// Override the preserved serial number with an explicitly supplied
    /// one.
    #[must_use]
    pub fn serial(mut self, serial: impl Into<SerialNumber>) -> Self {
        self.inner = self.inner.serial(serial);
        self
    }

    /// Give the copy a fresh identity instead of the source's preserved
    /// serial number.
    #[must_use]
    pub fn fresh_serial(mut self) -> Self {
        self.inner.serial = None;
        self
    }

    /// Override the inherited transform back-reference: either a
    /// predecessor root (to be diffed lazily) or an already materialized
    /// [`PathTransform`](crate::transform::PathTransform).
    #[must_use]
    pub fn transform(mut self, source: impl Into<TransformSource>) -> Self {
        self.inner = self.inner.transform(source);
        self
    }

    /// Finish the copy.
    pub fn finish(self) -> Result<Arc<Node>, BuildError> {
        self.inner.finish()
    }
}

#[cfg(test)]
mod test {
    use cool_asserts::assert_matches;

    use super::*;
    use crate::tests::{COND, TREE, leaf, sample_tree, tree};

    #[test]
    fn fresh_nodes_get_fresh_serials() {
        let a = leaf("a");
        let b = leaf("b");
        assert_ne!(a.serial(), b.serial());
    }

    #[test]
    fn copy_without_overrides_preserves_everything() {
        let (root, _) = sample_tree();
        let copy = root.copy().finish().unwrap();
        assert_eq!(copy.serial(), root.serial());
        assert_eq!(copy.payload(), root.payload());
        assert_eq!(copy.child_count(), root.child_count());
        // Children are shared, not rebuilt.
        assert!(
            copy.children()
                .zip(root.children())
                .all(|(a, b)| a.same(b))
        );
    }

    #[test]
    fn copy_overrides_replace_inherited_values() {
        let (root, _) = sample_tree();
        let relabeled = root.copy().data(Value::symbol("z")).finish().unwrap();
        assert_eq!(relabeled.serial(), root.serial());
        assert_eq!(relabeled.payload(), Some(&Value::symbol("z")));
        let refreshed = root.copy().fresh_serial().finish().unwrap();
        assert_ne!(refreshed.serial(), root.serial());
    }

    #[test]
    fn data_falls_back_to_the_node_itself() {
        let node = Node::build(&COND)
            .slot("test", Value::symbol("t"))
            .finish()
            .unwrap();
        assert_matches!(node.data(), Value::Node(n) if n.serial() == node.serial());
    }

    #[test]
    fn builder_rejects_bad_layouts() {
        assert_matches!(
            Node::build(&TREE)
                .data(Value::symbol("a"))
                .slot("nope", Value::symbol("x"))
                .finish(),
            Err(BuildError::UnknownSlot { .. })
        );
        assert_matches!(
            Node::build(&TREE)
                .data(Value::symbol("a"))
                .slot("kids", Value::symbol("x"))
                .finish(),
            Err(BuildError::KindMismatch { .. })
        );
        assert_matches!(
            Node::build(&TREE).finish(),
            Err(BuildError::MissingData { .. })
        );
        assert_matches!(
            Node::build(&COND)
                .slot("test", Value::symbol("t"))
                .data(Value::symbol("x"))
                .finish(),
            Err(BuildError::NoDataSlot { .. })
        );
        assert_matches!(
            Node::build(&COND).finish(),
            Err(BuildError::MissingSlot { .. })
        );
    }

    #[test]
    fn children_concatenate_slots_in_declaration_order() {
        let node = Node::build(&COND)
            .slot("test", Value::symbol("t"))
            .list("then", [Value::Node(leaf("x"))])
            .list("else", [Value::symbol("y")])
            .finish()
            .unwrap();
        let kinds: Vec<bool> = node.children().map(Value::is_node).collect();
        assert_eq!(kinds, [false, true, false]);
        assert_eq!(node.child_count(), 3);
        let elems: Vec<PathElem> = node.child_elems().map(|(e, _)| e).collect();
        assert_eq!(
            elems,
            [
                PathElem::slot("test"),
                PathElem::slot_index("then", 0),
                PathElem::slot_index("else", 0),
            ]
        );
    }

    #[test]
    fn mixed_child_lists_hold_atoms() {
        let node = tree("a", [Value::symbol("x"), Value::Node(leaf("b"))]);
        assert_eq!(node.size(), 3);
        assert_eq!(node.child_by_elem(&PathElem::Index(0)), Ok(&Value::symbol("x")));
    }
}
