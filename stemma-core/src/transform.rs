//! Path transforms: compact rewrites from old-tree paths to new-tree paths.
//!
//! Every edit produces a new root that remembers its predecessor through a
//! back-reference (see [`TransformSource`]). The relation between paths in
//! the two trees is captured by a [`PathTransform`]: an ordered table of
//! [`Rewrite`] entries, each matching a path prefix (possibly through
//! inclusive index [ranges](PatternElem::Range)) and replacing it with an
//! output prefix.
//!
//! An entry's [`EntryStatus`] decides what happens to the unmatched tail of
//! a path: [`Live`](EntryStatus::Live) entries carry it through into the
//! new tree, [`Dead`](EntryStatus::Dead) entries cut it off and return it
//! as *residue* — the part of the path whose target no longer exists.
//! Entries are kept sorted in non-increasing order of matched prefix
//! length and the first match wins, so a more specific rule beats a more
//! general one. A path matching no entry is passed through unchanged.
//!
//! Transforms are materialized lazily: a back-reference starts out as a
//! plain pointer to the predecessor root and is promoted to a
//! [`PathTransform`] (by [`path_transform_of`]) the first time it is
//! observed. Translating a [`Finger`] across a chain of edits applies each
//! step's transform in order ([`transform_finger`]); this stepwise
//! application realizes transform composition.

use std::sync::{Arc, Mutex, OnceLock};

use smol_str::SmolStr;
use thiserror::Error;

use crate::core::SerialNumber;
use crate::finger::Finger;
use crate::node::Node;
use crate::path::{Path, PathElem};

mod derive;

pub use derive::path_transform_of;

/// Whether a transform entry carries the unmatched tail of a path through
/// ([`Live`](Self::Live)) or cuts it into residue ([`Dead`](Self::Dead)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// The matched subtree survives; unmatched tails remain valid below the
    /// output prefix.
    Live,
    /// The matched subtree was dropped; unmatched tails become residue.
    Dead,
}

/// One element of a rewrite entry's input pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternElem {
    /// Matches exactly this path element.
    Exact(PathElem),
    /// Matches an indexed element with `lo <= index <= hi` (inclusive).
    ///
    /// `slot` is `None` for bare indices and the slot name for
    /// slot-qualified indices.
    Range {
        /// Slot qualifier of the indices matched, if any.
        slot: Option<SmolStr>,
        /// Lowest matched index.
        lo: usize,
        /// Highest matched index (inclusive).
        hi: usize,
    },
}

impl PatternElem {
    /// A range over bare indices or a slot's indices.
    pub fn range(slot: Option<SmolStr>, lo: usize, hi: usize) -> Self {
        debug_assert!(lo <= hi);
        PatternElem::Range { slot, lo, hi }
    }

    fn matches(&self, elem: &PathElem) -> bool {
        match (self, elem) {
            (PatternElem::Exact(p), e) => p == e,
            (PatternElem::Range { slot: None, lo, hi }, PathElem::Index(i)) => {
                lo <= i && i <= hi
            }
            (PatternElem::Range { slot: Some(s), lo, hi }, PathElem::SlotIndex(name, i)) => {
                s == name && lo <= i && i <= hi
            }
            (PatternElem::Range { .. }, _) => false,
        }
    }

    /// The range's low bound, if this is a range element.
    fn range_lo(&self) -> Option<usize> {
        match self {
            PatternElem::Range { lo, .. } => Some(*lo),
            PatternElem::Exact(_) => None,
        }
    }
}

impl From<PathElem> for PatternElem {
    fn from(elem: PathElem) -> Self {
        PatternElem::Exact(elem)
    }
}

/// One entry of a [`PathTransform`]: an input pattern, an output prefix and
/// a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pattern: Vec<PatternElem>,
    output: Path,
    status: EntryStatus,
}

impl Rewrite {
    /// An entry with an arbitrary pattern.
    pub fn new(
        pattern: impl IntoIterator<Item = PatternElem>,
        output: Path,
        status: EntryStatus,
    ) -> Self {
        Rewrite {
            pattern: pattern.into_iter().collect(),
            output,
            status,
        }
    }

    /// An entry matching exactly the path `from`.
    pub fn exact(from: Path, to: Path, status: EntryStatus) -> Self {
        Rewrite {
            pattern: from.into_iter().map(PatternElem::Exact).collect(),
            output: to,
            status,
        }
    }

    /// The input pattern.
    pub fn pattern(&self) -> &[PatternElem] {
        &self.pattern
    }

    /// The output prefix.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// The entry status.
    pub fn status(&self) -> EntryStatus {
        self.status
    }

    /// Apply this entry to `path` if it matches.
    fn apply(&self, path: &Path) -> Option<Applied> {
        let elems = path.elems();
        if self.pattern.len() > elems.len() {
            return None;
        }
        let (matched, tail) = elems.split_at(self.pattern.len());
        if !self.pattern.iter().zip(matched).all(|(p, e)| p.matches(e)) {
            return None;
        }
        // Shift output elements positionally aligned with a range pattern
        // element by the matched index's offset into the range; output
        // overflow past the pattern length is spliced in before the tail.
        let mut out: Vec<PathElem> = Vec::with_capacity(self.output.len() + tail.len());
        for (k, elem) in self.output.iter().enumerate() {
            let shifted = self
                .pattern
                .get(k)
                .and_then(PatternElem::range_lo)
                .and_then(|lo| matched[k].child_index().map(|i| elem.offset_index(i - lo)));
            out.push(shifted.unwrap_or_else(|| elem.clone()));
        }
        Some(match self.status {
            EntryStatus::Live => {
                out.extend(tail.iter().cloned());
                Applied {
                    path: Path::from(out),
                    residue: Path::new(),
                }
            }
            EntryStatus::Dead => Applied {
                path: Path::from(out),
                residue: Path::from(tail),
            },
        })
    }
}

/// The result of applying a transform to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// The rewritten path, valid at the transform's destination tree for
    /// every input landing on a preserved identity.
    pub path: Path,
    /// The untranslated remainder of the input, non-empty exactly when a
    /// [`Dead`](EntryStatus::Dead) entry matched a proper prefix.
    pub residue: Path,
}

/// A rewrite table from paths of one root (`from_root`) to paths of a
/// successor tree.
#[derive(Clone)]
pub struct PathTransform {
    from_root: Arc<Node>,
    entries: Vec<Rewrite>,
}

impl PathTransform {
    /// A transform from `from_root` with the given entries.
    ///
    /// Entries are sorted into non-increasing matched-prefix length;
    /// among equal lengths, earlier entries keep priority.
    pub fn new(from_root: Arc<Node>, entries: impl IntoIterator<Item = Rewrite>) -> Self {
        let mut entries: Vec<Rewrite> = entries.into_iter().collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.pattern.len()));
        PathTransform { from_root, entries }
    }

    /// The identity transform: every path maps to itself.
    pub fn identity(from_root: Arc<Node>) -> Self {
        PathTransform::new(
            from_root,
            [Rewrite::exact(Path::new(), Path::new(), EntryStatus::Live)],
        )
    }

    /// The root this transform translates paths from.
    pub fn from_root(&self) -> &Arc<Node> {
        &self.from_root
    }

    /// The serial number of [`Self::from_root`].
    pub fn source(&self) -> SerialNumber {
        self.from_root.serial()
    }

    /// The rewrite entries, in match order.
    pub fn entries(&self) -> &[Rewrite] {
        &self.entries
    }

    /// Apply the transform to a path. The first matching entry wins; a
    /// path matching no entry is returned unchanged with empty residue.
    pub fn apply(&self, path: &Path) -> Applied {
        self.entries
            .iter()
            .find_map(|e| e.apply(path))
            .unwrap_or_else(|| Applied {
                path: path.clone(),
                residue: Path::new(),
            })
    }
}

// Two materializations of the same edit are structurally equal; this is
// the equality racing caches may rely on.
impl PartialEq for PathTransform {
    fn eq(&self, other: &Self) -> bool {
        self.source() == other.source() && self.entries == other.entries
    }
}

impl Eq for PathTransform {}

impl std::fmt::Debug for PathTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathTransform")
            .field("from", &self.source())
            .field("entries", &self.entries)
            .finish()
    }
}

/// The transform back-reference supplied at node construction: either a
/// predecessor root to be diffed lazily, or an explicit transform.
#[derive(Clone)]
pub enum TransformSource {
    /// A predecessor root; the transform is derived on first observation.
    Predecessor(Arc<Node>),
    /// An already materialized transform.
    Transform(Arc<PathTransform>),
}

impl From<Arc<Node>> for TransformSource {
    fn from(node: Arc<Node>) -> Self {
        TransformSource::Predecessor(node)
    }
}

impl From<&Arc<Node>> for TransformSource {
    fn from(node: &Arc<Node>) -> Self {
        TransformSource::Predecessor(node.clone())
    }
}

impl From<PathTransform> for TransformSource {
    fn from(transform: PathTransform) -> Self {
        TransformSource::Transform(Arc::new(transform))
    }
}

impl From<Arc<PathTransform>> for TransformSource {
    fn from(transform: Arc<PathTransform>) -> Self {
        TransformSource::Transform(transform)
    }
}

/// A node's transform back-reference.
///
/// Starts out either empty, holding a predecessor node, or holding an
/// explicit transform. The first observation of a node-valued
/// back-reference derives the transform and caches it, dropping the
/// pending node reference; this promotion is the only post-construction
/// mutation of a node and is idempotent.
pub(crate) struct Backref {
    pending: Mutex<Option<Arc<Node>>>,
    materialized: OnceLock<Arc<PathTransform>>,
}

impl Backref {
    /// No predecessor.
    pub(crate) fn empty() -> Self {
        Backref {
            pending: Mutex::new(None),
            materialized: OnceLock::new(),
        }
    }

    pub(crate) fn from_source(source: TransformSource) -> Self {
        match source {
            TransformSource::Predecessor(node) => Backref {
                pending: Mutex::new(Some(node)),
                materialized: OnceLock::new(),
            },
            TransformSource::Transform(transform) => Backref {
                pending: Mutex::new(None),
                materialized: OnceLock::from(transform),
            },
        }
    }

    /// The construction-time view of this back-reference, used by copies.
    pub(crate) fn source(&self) -> Option<TransformSource> {
        if let Some(t) = self.materialized.get() {
            return Some(TransformSource::Transform(t.clone()));
        }
        let pending = self.pending.lock().expect("backref lock poisoned");
        pending.clone().map(TransformSource::Predecessor)
    }

    /// Snapshot for internal copies; shares the cached transform.
    pub(crate) fn snapshot(&self) -> Backref {
        match self.source() {
            Some(source) => Backref::from_source(source),
            None => Backref::empty(),
        }
    }

    /// The transform, deriving and caching it on first observation.
    pub(crate) fn get(&self, successor: &Arc<Node>) -> Option<Arc<PathTransform>> {
        if let Some(t) = self.materialized.get() {
            return Some(t.clone());
        }
        let mut pending = self.pending.lock().expect("backref lock poisoned");
        if let Some(t) = self.materialized.get() {
            return Some(t.clone());
        }
        let predecessor = pending.as_ref()?;
        let transform = path_transform_of(predecessor, successor);
        let transform = match self.materialized.set(transform.clone()) {
            Ok(()) => transform,
            Err(_) => self
                .materialized
                .get()
                .expect("materialized cache was just set")
                .clone(),
        };
        // Promotion drops the node reference; the chain stays reachable
        // through the transform's `from_root`.
        *pending = None;
        Some(transform)
    }
}

impl Node {
    /// The transform back to this node's predecessor, if it has one.
    ///
    /// A back-reference still holding a predecessor node is materialized
    /// into a [`PathTransform`] (and cached) on the way.
    pub fn transform(self: &Arc<Self>) -> Option<Arc<PathTransform>> {
        self.backref.get(self)
    }
}

/// Errors translating fingers between roots.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum TransformError {
    /// The target root is not reachable from the finger's root through the
    /// back-reference chain.
    #[error("no derivation path from {from} to {to}")]
    NoDerivationPath {
        /// Serial of the finger's root.
        from: SerialNumber,
        /// Serial of the requested target root.
        to: SerialNumber,
    },

    /// The finger's path is not valid at its own root.
    #[error(transparent)]
    InvalidPath(#[from] crate::path::InvalidPath),
}

/// Translate `finger` into an equivalent finger relative to `target`.
///
/// `target` must be reachable from the finger's root through the chain of
/// transform back-references; each step's transform is applied in order,
/// materializing lazily along the way. A translation step matching a
/// [`Dead`](EntryStatus::Dead) entry contributes to the result's residue.
///
/// Translating a finger to its own root returns it unchanged.
pub fn transform_finger(finger: &Finger, target: &Arc<Node>) -> Result<Finger, TransformError> {
    if finger.root().serial() == target.serial() {
        return Ok(finger.clone());
    }
    // Collect the chain from `target` back to the finger's root.
    let mut chain: Vec<Arc<PathTransform>> = Vec::new();
    let mut cursor = target.clone();
    while cursor.serial() != finger.root().serial() {
        let Some(step) = cursor.transform() else {
            return Err(TransformError::NoDerivationPath {
                from: finger.root().serial(),
                to: target.serial(),
            });
        };
        cursor = step.from_root().clone();
        chain.push(step);
    }
    let mut path = finger.path().canonical_at(finger.root())?;
    let mut residue = finger.residue().clone();
    for step in chain.iter().rev() {
        let applied = step.apply(&path);
        path = applied.path;
        if !applied.residue.is_empty() {
            // Newly cut tail precedes any residue from earlier, deeper
            // losses.
            residue = applied.residue.join(residue);
        }
    }
    Ok(Finger::with_residue(target.clone(), path, residue))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path;

    use crate::tests::sample_tree;

    fn entry_live(from: Path, to: Path) -> Rewrite {
        Rewrite::exact(from, to, EntryStatus::Live)
    }

    #[test]
    fn unmatched_paths_are_identity() {
        let (root, _) = sample_tree();
        let t = PathTransform::new(root, [entry_live(path![5], path![7])]);
        let applied = t.apply(&path![1, 0]);
        assert_eq!(applied.path, path![1, 0]);
        assert!(applied.residue.is_empty());
    }

    #[test]
    fn first_match_wins_and_longest_sorts_first() {
        let (root, _) = sample_tree();
        let t = PathTransform::new(
            root,
            [
                entry_live(path![], path![]),
                entry_live(path![1, 0], path![0]),
                entry_live(path![1], path![2]),
            ],
        );
        // The length-2 entry beats the length-1 and length-0 ones.
        assert_eq!(t.apply(&path![1, 0, 3]).path, path![0, 3]);
        assert_eq!(t.apply(&path![1, 1]).path, path![2, 1]);
        assert_eq!(t.apply(&path![0]).path, path![0]);
    }

    #[test]
    fn range_entries_shift_indices() {
        let (root, _) = sample_tree();
        let t = PathTransform::new(
            root,
            [Rewrite::new(
                [PatternElem::range(None, 1, 4)],
                path![3],
                EntryStatus::Live,
            )],
        );
        assert_eq!(t.apply(&path![1]).path, path![3]);
        assert_eq!(t.apply(&path![4, 7]).path, path![6, 7]);
        assert_eq!(t.apply(&path![5]).path, path![5]);
        assert_eq!(t.apply(&path![0]).path, path![0]);
    }

    #[test]
    fn dead_entries_cut_residue() {
        let (root, _) = sample_tree();
        let t = PathTransform::new(
            root,
            [Rewrite::exact(path![1], path![1], EntryStatus::Dead)],
        );
        let applied = t.apply(&path![1, 0, 2]);
        assert_eq!(applied.path, path![1]);
        assert_eq!(applied.residue, path![0, 2]);
        // No tail, no residue.
        let applied = t.apply(&path![1]);
        assert_eq!(applied.path, path![1]);
        assert!(applied.residue.is_empty());
    }

    #[test]
    fn output_overflow_is_spliced_before_the_tail() {
        let (root, _) = sample_tree();
        let t = PathTransform::new(
            root,
            [Rewrite::exact(path![1], path![1, 5], EntryStatus::Live)],
        );
        assert_eq!(t.apply(&path![1, 0]).path, path![1, 5, 0]);
    }

    #[test]
    fn identity_transform() {
        let (root, _) = sample_tree();
        let t = PathTransform::identity(root);
        assert_eq!(t.apply(&path![1, 0]).path, path![1, 0]);
        assert_eq!(t.apply(&path![]).path, path![]);
    }
}
