//! Advisory validation predicates.
//!
//! The edit API assumes well-formed inputs; these predicates exist for
//! callers to precheck non-trivial combinations (an implant of a foreign
//! subtree, a merge of trees built elsewhere) before committing an edit.

use std::sync::Arc;

use fxhash::FxHashSet;
use thiserror::Error;

use crate::core::SerialNumber;
use crate::node::Node;
use crate::path::Path;
use crate::traverse::{Descend, traverse};

/// Violations of the tree invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// Two distinct reachable nodes carry the same serial number.
    #[error("serial number {0} occurs more than once in the tree")]
    IdentityCollision(SerialNumber),
}

/// Check that every serial number under `root` is unique.
///
/// A node occurring twice on one root-to-leaf walk trips the same check,
/// so this also rules out cyclic sharing within the tree.
pub fn validate_node(root: &Arc<Node>) -> Result<(), ValidationError> {
    let mut seen = FxHashSet::default();
    let mut collision = None;
    traverse(root, |value| {
        let Some(node) = value.as_node() else {
            return Descend::Into;
        };
        if collision.is_some() {
            return Descend::Skip;
        }
        if !seen.insert(node.serial()) {
            collision = Some(node.serial());
            return Descend::Skip;
        }
        Descend::Into
    });
    match collision {
        Some(serial) => Err(ValidationError::IdentityCollision(serial)),
        None => Ok(()),
    }
}

/// Whether `root` satisfies the identity-uniqueness invariant.
pub fn node_valid(root: &Arc<Node>) -> bool {
    validate_node(root).is_ok()
}

/// Whether the trees under `a` and `b` share no serial numbers.
pub fn nodes_disjoint(a: &Arc<Node>, b: &Arc<Node>) -> bool {
    let serials_a = reachable_serials(a);
    let mut disjoint = true;
    traverse(b, |value| {
        if let Some(node) = value.as_node() {
            if serials_a.contains(&node.serial()) {
                disjoint = false;
                return Descend::Skip;
            }
        }
        Descend::Into
    });
    disjoint
}

/// Whether replacing the subtree of `tree` at `at` with `implant` keeps
/// serial numbers unique.
///
/// Returns `false` when `at` is not a valid path of `tree`.
pub fn node_can_implant(tree: &Arc<Node>, at: &Path, implant: &Arc<Node>) -> bool {
    let Ok(replaced) = tree.at(at) else {
        return false;
    };
    let excluded: FxHashSet<SerialNumber> = match replaced.as_node() {
        Some(node) => reachable_serials(node),
        None => FxHashSet::default(),
    };
    let mut remaining = reachable_serials(tree);
    for serial in &excluded {
        remaining.remove(serial);
    }
    let mut ok = true;
    traverse(implant, |value| {
        if let Some(node) = value.as_node() {
            if remaining.contains(&node.serial()) {
                ok = false;
                return Descend::Skip;
            }
        }
        Descend::Into
    });
    ok
}

fn reachable_serials(root: &Arc<Node>) -> FxHashSet<SerialNumber> {
    let mut serials = FxHashSet::default();
    traverse(root, |value| {
        if let Some(node) = value.as_node() {
            serials.insert(node.serial());
        }
        Descend::Into
    });
    serials
}

#[cfg(test)]
mod test {
    use cool_asserts::assert_matches;

    use super::*;
    use crate::node::Value;
    use crate::path;
    use crate::tests::{leaf, sample_tree, tree};

    #[test]
    fn valid_tree_passes() {
        let (root, _) = sample_tree();
        assert!(node_valid(&root));
    }

    #[test]
    fn duplicated_identity_is_detected() {
        let b = leaf("b");
        // The same node object twice in one child list.
        let root = tree("a", [Value::Node(b.clone()), Value::Node(b.clone())]);
        assert_matches!(
            validate_node(&root),
            Err(ValidationError::IdentityCollision(serial)) if serial == b.serial()
        );
    }

    #[test]
    fn disjointness() {
        let (r1, _) = sample_tree();
        let (r2, _) = sample_tree();
        assert!(nodes_disjoint(&r1, &r2));
        // An edited tree shares identities with its predecessor.
        let r3 = r1.with(path![0], leaf("x")).unwrap();
        assert!(!nodes_disjoint(&r1, &r3));
    }

    #[test]
    fn implant_check() {
        let (root, _) = sample_tree();
        // A fresh subtree can go anywhere.
        assert!(node_can_implant(&root, &path![1, 0], &leaf("x")));
        // Re-implanting the subtree being replaced is fine.
        let c = root.at(&path![1]).unwrap();
        assert!(node_can_implant(&root, &path![1], c.as_node().unwrap()));
        // Implanting a shared sibling elsewhere collides.
        let b = root.at(&path![0]).unwrap();
        assert!(!node_can_implant(&root, &path![1], b.as_node().unwrap()));
        // Invalid paths never validate.
        assert!(!node_can_implant(&root, &path![9], &leaf("x")));
    }
}
