//! Persistent labeled trees with stable node identity and path-rewrite
//! transforms.
//!
//! This crate is the core data structure of a program-transformation
//! system: programs represent source code as trees of [`Node`]s, edits
//! produce new trees that share most of their structure with the old, and
//! external references into an old tree — [`Finger`]s — are mechanically
//! remapped into equivalent references into the new tree.
//!
//! ## Summary of data types
//!
//! - [`Node`] An immutable tree node with a process-unique
//!   [`SerialNumber`] identity and a class-declared child layout (its
//!   [`Variant`]). Edits rebuild the spine above the edit site through
//!   serial-preserving copies, so identity survives; everything untouched
//!   is shared by pointer.
//! - [`Path`] A locator from a root to a descendant: indices, slot names,
//!   or slot-and-index pairs.
//! - [`Finger`] A `(root, path)` reference with lazy cached resolution and
//!   an optional *residue* — the untranslated tail left behind when the
//!   finger was carried across an edit that dropped its target.
//! - [`PathTransform`] A compact rewrite table from old-root paths to
//!   new-root paths. Every edit result points back at its predecessor;
//!   the transform is either constructed eagerly by the edit or derived
//!   lazily by diffing the shared identities
//!   ([`path_transform_of`](transform::path_transform_of)).
//!
//! ## Usage
//!
//! Declare a variant, build a tree, edit it, and carry a finger across:
//!
//! ```
//! use stemma_core::{path, Finger, Node, SlotDecl, Value, Variant};
//!
//! static EXPR: Variant = Variant {
//!     name: "expr",
//!     child_slots: &[SlotDecl::list("operands")],
//!     data_slot: Some("op"),
//! };
//!
//! let leaf = |op: &str| {
//!     Node::build(&EXPR).data(Value::symbol(op)).finish().unwrap()
//! };
//! let root = Node::build(&EXPR)
//!     .data(Value::symbol("+"))
//!     .list("operands", [leaf("x").into(), leaf("y").into()])
//!     .finish()
//!     .unwrap();
//!
//! // Insert a new first operand; `y` moves from [1] to [2].
//! let edited = root.insert(path![0], leaf("z")).unwrap();
//! let finger = Finger::new(root.clone(), path![1]);
//! let moved = finger.translate(&edited).unwrap();
//! assert_eq!(moved.path(), &path![2]);
//! ```

pub mod core;
pub mod edit;
pub mod finger;
pub mod lookup;
pub mod macros;
pub mod node;
pub mod path;
pub mod rewrite;
pub mod search;
pub mod transform;
pub mod traverse;
pub mod validate;

pub use crate::core::SerialNumber;
pub use edit::{EditError, TreeLoc, path_of_node};
pub use finger::{Finger, populate_fingers};
pub use lookup::{LookupError, Repr, Resolved, TreeKey, to_alist, to_list, to_list_with};
pub use node::{
    Atom, BuildError, CopyBuilder, Node, NodeBuilder, SlotDecl, SlotKind, SlotValue, Value,
    Variant,
};
pub use path::{InvalidPath, Path, PathElem};
pub use rewrite::{Subst, subst, subst_if, subst_if_not, subst_in_list};
pub use transform::{
    Applied, EntryStatus, PathTransform, PatternElem, Rewrite, TransformError, TransformSource,
    path_transform_of, transform_finger,
};
pub use traverse::{Descend, traverse, traverse_with_paths};
pub use validate::{ValidationError, node_can_implant, node_valid, nodes_disjoint, validate_node};
