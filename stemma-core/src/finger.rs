//! Fingers: bound references into a tree.
//!
//! A [`Finger`] names a location as a `(root, path)` pair, plus the
//! *residue* accumulated when the finger was translated through a lossy
//! edit: the untranslated remainder of a path whose target subtree no
//! longer exists. Resolution is lazy and cached; fingers are immutable
//! once published (the cache is pure memoization).
//!
//! To carry a finger across edits, see
//! [`transform_finger`](crate::transform::transform_finger) or
//! [`Finger::translate`].

use std::sync::{Arc, OnceLock};

use crate::node::{Node, Value};
use crate::path::{InvalidPath, Path};
use crate::transform::{TransformError, transform_finger};
use crate::traverse::{Descend, traverse_with_paths};

/// A reference to a location in the tree under `root`, with optional
/// residue and a lazy resolution cache.
#[derive(Clone)]
pub struct Finger {
    root: Arc<Node>,
    path: Path,
    residue: Path,
    target: OnceLock<Value>,
}

impl Finger {
    /// A finger at `path` under `root`, with empty residue.
    pub fn new(root: Arc<Node>, path: Path) -> Self {
        Finger::with_residue(root, path, Path::new())
    }

    /// A finger carrying residue from an earlier lossy translation.
    pub fn with_residue(root: Arc<Node>, path: Path, residue: Path) -> Self {
        Finger {
            root,
            path,
            residue,
            target: OnceLock::new(),
        }
    }

    /// The root this finger is relative to.
    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    /// The path from the root to the target.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The untranslated remainder of the original path, if a translation
    /// was lossy.
    pub fn residue(&self) -> &Path {
        &self.residue
    }

    /// Resolve the finger to the value its path points at, caching the
    /// result.
    ///
    /// The empty path resolves to the root itself.
    pub fn resolve(&self) -> Result<&Value, InvalidPath> {
        if let Some(value) = self.target.get() {
            return Ok(value);
        }
        let mut value = Value::Node(self.root.clone());
        for elem in &self.path {
            let node = value.as_node().ok_or(InvalidPath::NotANode)?;
            value = node.child_by_elem(elem)?.clone();
        }
        // Idempotent: a racing resolution computed the same value.
        let _ = self.target.set(value);
        Ok(self
            .target
            .get()
            .expect("finger cache was just populated"))
    }

    /// Resolve, requiring the target to be a node.
    pub fn node(&self) -> Result<&Arc<Node>, InvalidPath> {
        self.resolve()?.as_node().ok_or(InvalidPath::NotANode)
    }

    /// Translate this finger into an equivalent one relative to `target`.
    ///
    /// See [`transform_finger`].
    pub fn translate(&self, target: &Arc<Node>) -> Result<Finger, TransformError> {
        transform_finger(self, target)
    }
}

/// Fingers compare by root identity, path and residue; the resolution
/// cache does not participate.
impl PartialEq for Finger {
    fn eq(&self, other: &Self) -> bool {
        self.root.serial() == other.root.serial()
            && self.path == other.path
            && self.residue == other.residue
    }
}

impl Eq for Finger {}

impl std::fmt::Debug for Finger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Finger");
        s.field("root", &self.root.serial()).field("path", &self.path);
        if !self.residue.is_empty() {
            s.field("residue", &self.residue);
        }
        s.finish()
    }
}

/// Set each node's finger slot to a finger anchored at `root`, in one
/// pass.
///
/// Nodes that already carry a finger keep it: the slot is write-once, so
/// running the pass twice (or over a root sharing subtrees with an
/// already-populated tree) is idempotent.
pub fn populate_fingers(root: &Arc<Node>) {
    traverse_with_paths(root, |value, path| {
        if let Some(node) = value.as_node() {
            let _ = node
                .finger
                .set(Finger::new(root.clone(), path.clone()));
        }
        Descend::Into
    });
}

#[cfg(test)]
mod test {
    use cool_asserts::assert_matches;

    use super::*;
    use crate::path;
    use crate::tests::sample_tree;

    #[test]
    fn resolution_walks_the_path() {
        let (root, serials) = sample_tree();
        let f = Finger::new(root.clone(), path![1, 0]);
        assert_eq!(f.node().unwrap().serial(), serials[3]);
        // Cached resolution returns the same value.
        assert_eq!(f.node().unwrap().serial(), serials[3]);
    }

    #[test]
    fn empty_path_resolves_to_the_root() {
        let (root, _) = sample_tree();
        let f = Finger::new(root.clone(), path![]);
        assert!(Arc::ptr_eq(f.node().unwrap(), &root));
    }

    #[test]
    fn out_of_range_fails() {
        let (root, _) = sample_tree();
        let f = Finger::new(root, path![1, 7]);
        assert_matches!(f.resolve(), Err(InvalidPath::OutOfBounds { index: 7, .. }));
    }

    #[test]
    fn populate_fingers_is_idempotent() {
        let (root, serials) = sample_tree();
        populate_fingers(&root);
        let d = Finger::new(root.clone(), path![1, 0]);
        let d = d.node().unwrap();
        assert_eq!(d.finger(), Some(&Finger::new(root.clone(), path![1, 0])));
        populate_fingers(&root);
        assert_eq!(d.finger(), Some(&Finger::new(root.clone(), path![1, 0])));
        assert_eq!(d.serial(), serials[3]);
    }
}
