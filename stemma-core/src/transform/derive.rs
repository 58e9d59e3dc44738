//! Deriving a transform by diffing two trees that share identities.

use std::sync::Arc;

use fxhash::FxHashMap;

use crate::core::SerialNumber;
use crate::node::Node;
use crate::path::Path;
use crate::transform::{EntryStatus, PathTransform, Rewrite};
use crate::traverse::{Descend, traverse_with_paths};

struct DiffEntry {
    from_node: Arc<Node>,
    from_path: Path,
    to_path: Option<Path>,
}

/// Derive the transform mapping paths of `from` to paths of `to`, based on
/// the identities the two trees share.
///
/// The result is correct for every path of `from` that lands on a node
/// whose serial number is preserved in `to`: applying it yields the path
/// at which that identity lives in `to`, with empty residue. Paths into
/// dropped subtrees fall through to coarser entries (or the identity
/// fallback) and carry no guarantee — derivation from two arbitrary trees
/// is inherently ambiguous, and this function is only required to be
/// correct, not optimal.
///
/// All derived entries are [`Live`](EntryStatus::Live); `Dead` entries
/// come from the structural edits, which know exactly which subtree they
/// dropped.
pub fn path_transform_of(from: &Arc<Node>, to: &Arc<Node>) -> Arc<PathTransform> {
    let mut table: FxHashMap<SerialNumber, DiffEntry> = FxHashMap::default();
    let mut order: Vec<SerialNumber> = Vec::new();
    traverse_with_paths(from, |value, path| {
        if let Some(node) = value.as_node() {
            let old = table.insert(
                node.serial(),
                DiffEntry {
                    from_node: node.clone(),
                    from_path: path.clone(),
                    to_path: None,
                },
            );
            debug_assert!(old.is_none(), "duplicate serial {} in tree", node.serial());
            order.push(node.serial());
        }
        Descend::Into
    });
    traverse_with_paths(to, |value, path| {
        let Some(node) = value.as_node() else {
            return Descend::Into;
        };
        let Some(entry) = table.get_mut(&node.serial()) else {
            return Descend::Into;
        };
        if entry.to_path.is_none() {
            entry.to_path = Some(path.clone());
        }
        if Arc::ptr_eq(&entry.from_node, node) {
            // The whole subtree is shared; nothing below needs remapping.
            Descend::Skip
        } else {
            Descend::Into
        }
    });

    let mut pairs: Vec<(Path, Path)> = order
        .into_iter()
        .filter_map(|serial| {
            let entry = table.remove(&serial)?;
            Some((entry.from_path, entry.to_path?))
        })
        .collect();
    pairs.sort();

    // Compress by prefix subsumption: an entry derivable from the one
    // below it by suffix extension adds nothing.
    let mut kept: Vec<(Path, Path)> = Vec::new();
    for (old, new) in pairs {
        let subsumed = kept.last().is_some_and(|(old_top, new_top)| {
            old_top
                .strip_prefix(&old)
                .is_some_and(|suffix| new_top.strip_prefix(&new) == Some(suffix))
        });
        if !subsumed {
            kept.push((old, new));
        }
    }

    Arc::new(PathTransform::new(
        from.clone(),
        kept.into_iter()
            .map(|(old, new)| Rewrite::exact(old, new, EntryStatus::Live)),
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path;
    use crate::tests::{leaf, sample_tree};

    #[test]
    fn transform_of_tree_with_itself_is_identity() {
        let (root, _) = sample_tree();
        let t = path_transform_of(&root, &root);
        // A single root entry subsumes every shared subtree.
        assert_eq!(t.entries().len(), 1);
        for p in [path![], path![0], path![1], path![1, 0], path![1, 1]] {
            let applied = t.apply(&p);
            assert_eq!(applied.path, p);
            assert!(applied.residue.is_empty());
        }
    }

    #[test]
    fn derived_transform_tracks_shifted_subtrees() {
        let (r1, serials) = sample_tree();
        // Rebuild the root with an extra leading child; everything else is
        // shared by pointer.
        let children: Vec<_> = std::iter::once(crate::node::Value::Node(leaf("f")))
            .chain(r1.children().cloned())
            .collect();
        let r2 = r1.copy_with_slot(0, crate::node::SlotValue::List(children));

        let t = path_transform_of(&r1, &r2);
        assert_eq!(t.apply(&path![1, 0]).path, path![2, 0]);
        assert_eq!(t.apply(&path![0]).path, path![1]);
        assert_eq!(t.apply(&path![]).path, path![]);
        let _ = serials;
    }

    #[test]
    fn dropped_identities_get_no_entry() {
        let (r1, _) = sample_tree();
        // Replace the whole child list with a single fresh leaf.
        let r2 = r1.copy_with_slot(
            0,
            crate::node::SlotValue::List(vec![crate::node::Value::Node(leaf("g"))]),
        );
        let t = path_transform_of(&r1, &r2);
        // Only the root identity is shared.
        assert_eq!(t.entries().len(), 1);
        assert_eq!(t.apply(&path![]).path, path![]);
    }
}
