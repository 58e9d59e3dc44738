//! Bulk rewrites: substitution, removal and preorder mapping over whole
//! trees.
//!
//! Unlike the structural edits in [`edit`](crate::edit), these operations
//! may touch arbitrarily many nodes, so their results carry a plain
//! predecessor back-reference and the path transform is derived lazily by
//! diffing (see [`path_transform_of`](crate::transform::path_transform_of)).
//! Untouched subtrees are shared by pointer and keep their identities;
//! only synthesized replacements get new serial numbers.

use std::sync::Arc;

use itertools::Itertools;

use crate::edit::EditError;
use crate::node::{Node, SlotValue, Value};
use crate::traverse::Descend;

/// The decision of a [`substitute_with`](Node::substitute_with) callback
/// for one visited value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subst {
    /// Leave the value alone and continue into its children.
    Keep,
    /// Replace the value; the replacement is not descended into.
    Replace(Value),
    /// Drop the value from its enclosing child list.
    Remove,
}

/// Rebuild `value` bottom-up according to `decide`, sharing unchanged
/// subtrees.
///
/// Returns `None` when the value itself was removed.
fn rewrite_value(
    value: &Value,
    decide: &mut dyn FnMut(&Value) -> Subst,
) -> Result<Option<Value>, EditError> {
    match decide(value) {
        Subst::Replace(replacement) => Ok(Some(replacement)),
        Subst::Remove => Ok(None),
        Subst::Keep => {
            let Value::Node(node) = value else {
                return Ok(Some(value.clone()));
            };
            let mut changed = false;
            let slots = node
                .child_slots()
                .iter()
                .zip(node.slots_iter())
                .map(|(decl, slot)| {
                    Ok(match slot {
                        SlotValue::Scalar(v) => match rewrite_value(v, decide)? {
                            Some(v2) => {
                                changed |= !v2.same(v);
                                SlotValue::Scalar(v2)
                            }
                            None => {
                                return Err(EditError::ScalarChild {
                                    slot: decl.name.into(),
                                });
                            }
                        },
                        SlotValue::List(vs) => {
                            let vs2 = vs
                                .iter()
                                .map(|v| rewrite_value(v, decide))
                                .filter_map_ok(|v| v)
                                .collect::<Result<Vec<_>, _>>()?;
                            changed |= vs2.len() != vs.len()
                                || vs2.iter().zip(vs).any(|(a, b)| !a.same(b));
                            SlotValue::List(vs2)
                        }
                    })
                })
                .collect::<Result<Vec<_>, EditError>>()?;
            if changed {
                Ok(Some(Value::Node(node.copy_with_slots(slots))))
            } else {
                Ok(Some(value.clone()))
            }
        }
    }
}

/// Attach a predecessor back-reference to a bulk rewrite result, unless
/// the rewrite changed nothing.
fn with_predecessor(result: Value, root: &Arc<Node>) -> Value {
    match result {
        Value::Node(n) if !Arc::ptr_eq(&n, root) => Value::Node(
            n.copy()
                .transform(root)
                .finish()
                .expect("copy of a well-formed root cannot fail"),
        ),
        other => other,
    }
}

impl Node {
    /// Preorder rewrite: `f` is applied to each value before recursion.
    ///
    /// When `f` returns [`Descend::Skip`], the returned replacement is
    /// taken as-is; otherwise a node replacement is rebuilt as a
    /// serial-preserving copy with each child rewritten recursively.
    /// Subtrees in which nothing changed are shared with the input.
    pub fn map_tree(
        self: &Arc<Self>,
        f: &mut dyn FnMut(&Value) -> (Value, Descend),
    ) -> Value {
        fn map_value(value: &Value, f: &mut dyn FnMut(&Value) -> (Value, Descend)) -> Value {
            let (mapped, descend) = f(value);
            if descend == Descend::Skip {
                return mapped;
            }
            let Value::Node(node) = &mapped else {
                return mapped;
            };
            let mut changed = false;
            let slots = node
                .child_slots()
                .iter()
                .zip(node.slots_iter())
                .map(|(_, slot)| match slot {
                    SlotValue::Scalar(v) => {
                        let v2 = map_value(v, f);
                        changed |= !v2.same(v);
                        SlotValue::Scalar(v2)
                    }
                    SlotValue::List(vs) => {
                        let vs2 = vs.iter().map(|v| map_value(v, f)).collect_vec();
                        changed |= vs2.iter().zip(vs).any(|(a, b)| !a.same(b));
                        SlotValue::List(vs2)
                    }
                })
                .collect_vec();
            if changed {
                Value::Node(node.copy_with_slots(slots))
            } else {
                mapped
            }
        }
        let result = map_value(&Value::Node(self.clone()), f);
        with_predecessor(result, self)
    }

    /// Replace every value whose [data](Node::data) equals `old` with
    /// `new`.
    pub fn substitute(
        self: &Arc<Self>,
        new: impl Into<Value>,
        old: &Value,
    ) -> Result<Value, EditError> {
        let old = old.clone();
        self.substitute_if(new, move |data| *data == old)
    }

    /// Replace every value whose data satisfies `pred` with `new`.
    ///
    /// Replacements are wholesale: the rewrite does not descend into a
    /// replaced subtree (nor into the replacement).
    pub fn substitute_if(
        self: &Arc<Self>,
        new: impl Into<Value>,
        mut pred: impl FnMut(&Value) -> bool,
    ) -> Result<Value, EditError> {
        let new = new.into();
        self.substitute_with(&mut |value| {
            if pred(&data_of(value)) {
                Subst::Replace(new.clone())
            } else {
                Subst::Keep
            }
        })
    }

    /// Replace every value whose data does not satisfy `pred` with `new`.
    pub fn substitute_if_not(
        self: &Arc<Self>,
        new: impl Into<Value>,
        mut pred: impl FnMut(&Value) -> bool,
    ) -> Result<Value, EditError> {
        self.substitute_if(new, move |data| !pred(data))
    }

    /// General substitution: `decide` chooses per value whether to keep,
    /// replace or remove it.
    ///
    /// The result carries a predecessor back-reference to `self` (the
    /// transform is derived lazily). Fails with
    /// [`EditError::ScalarChild`] when a removal targets the child of a
    /// scalar slot, and with [`EditError::RemoveRoot`] when the root
    /// itself is removed — use [`Node::remove_if`] for a removal surface
    /// that represents the empty result.
    pub fn substitute_with(
        self: &Arc<Self>,
        decide: &mut dyn FnMut(&Value) -> Subst,
    ) -> Result<Value, EditError> {
        let result = rewrite_value(&Value::Node(self.clone()), decide)?
            .ok_or(EditError::RemoveRoot)?;
        Ok(with_predecessor(result, self))
    }

    /// Drop every value whose data equals `item`, rebuilding ancestors.
    ///
    /// Returns `None` when the root itself is removed.
    pub fn remove(self: &Arc<Self>, item: &Value) -> Result<Option<Arc<Node>>, EditError> {
        let item = item.clone();
        self.remove_if(move |data| *data == item)
    }

    /// Drop every value whose data satisfies `pred`.
    pub fn remove_if(
        self: &Arc<Self>,
        mut pred: impl FnMut(&Value) -> bool,
    ) -> Result<Option<Arc<Node>>, EditError> {
        let result = rewrite_value(&Value::Node(self.clone()), &mut |value| {
            if pred(&data_of(value)) {
                Subst::Remove
            } else {
                Subst::Keep
            }
        })?;
        match result.map(|v| with_predecessor(v, self)) {
            None => Ok(None),
            Some(Value::Node(n)) => Ok(Some(n)),
            Some(Value::Atom(_)) => unreachable!("removal never synthesizes atoms"),
        }
    }

    /// Drop every value whose data does not satisfy `pred`.
    pub fn remove_if_not(
        self: &Arc<Self>,
        mut pred: impl FnMut(&Value) -> bool,
    ) -> Result<Option<Arc<Node>>, EditError> {
        self.remove_if(move |data| !pred(data))
    }
}

/// The data of a value: a node's data, or the atom itself.
pub(crate) fn data_of(value: &Value) -> Value {
    match value {
        Value::Node(n) => n.data(),
        Value::Atom(_) => value.clone(),
    }
}

/// Substitute `new` for every subtree of `value` equal to `old`.
///
/// Unlike [`Node::substitute`], which matches on node *data*, `subst`
/// compares whole values (nodes by identity, atoms by value) and also
/// accepts bare atoms as input.
pub fn subst(new: &Value, old: &Value, value: &Value) -> Value {
    subst_if(new, value, |v| v == old)
}

/// Substitute `new` for every subtree of `value` satisfying `pred`.
pub fn subst_if(new: &Value, value: &Value, mut pred: impl FnMut(&Value) -> bool) -> Value {
    fn walk(new: &Value, value: &Value, pred: &mut dyn FnMut(&Value) -> bool) -> Value {
        if pred(value) {
            return new.clone();
        }
        let Value::Node(node) = value else {
            return value.clone();
        };
        let mut changed = false;
        let slots = node
            .slots_iter()
            .map(|slot| match slot {
                SlotValue::Scalar(v) => {
                    let v2 = walk(new, v, pred);
                    changed |= !v2.same(v);
                    SlotValue::Scalar(v2)
                }
                SlotValue::List(vs) => {
                    let vs2: Vec<_> = vs.iter().map(|v| walk(new, v, pred)).collect();
                    changed |= vs2.iter().zip(vs).any(|(a, b)| !a.same(b));
                    SlotValue::List(vs2)
                }
            })
            .collect();
        if changed {
            Value::Node(node.copy_with_slots(slots))
        } else {
            value.clone()
        }
    }
    walk(new, value, &mut pred)
}

/// Substitute `new` for every subtree of `value` not satisfying `pred`.
pub fn subst_if_not(new: &Value, value: &Value, mut pred: impl FnMut(&Value) -> bool) -> Value {
    subst_if(new, value, move |v| !pred(v))
}

/// Apply [`subst`] elementwise to a plain list of values.
pub fn subst_in_list(new: &Value, old: &Value, values: &[Value]) -> Vec<Value> {
    values.iter().map(|v| subst(new, old, v)).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::Atom;
    use crate::path;
    use crate::tests::{label, leaf, sample_tree};

    #[test]
    fn substitute_replaces_by_data() {
        let (root, serials) = sample_tree();
        let replacement = leaf("x");
        let result = root
            .substitute(replacement.clone(), &Value::symbol("d"))
            .unwrap();
        let result = result.as_node().unwrap();
        assert_eq!(
            label(&result.at(&path![1, 0]).unwrap()),
            "x"
        );
        // Untouched subtrees are shared by pointer.
        assert!(Arc::ptr_eq(
            result.at(&path![0]).unwrap().as_node().unwrap(),
            root.at(&path![0]).unwrap().as_node().unwrap(),
        ));
        // The result remembers its predecessor.
        let t = result.transform().unwrap();
        assert_eq!(t.source(), serials[0]);
    }

    #[test]
    fn substitute_nothing_returns_the_same_root() {
        let (root, _) = sample_tree();
        let result = root
            .substitute(leaf("x"), &Value::symbol("zzz"))
            .unwrap();
        assert!(Arc::ptr_eq(result.as_node().unwrap(), &root));
    }

    #[test]
    fn remove_if_drops_matching_subtrees() {
        let (root, _) = sample_tree();
        let result = root
            .remove_if(|data| data.as_atom() == Some(&Atom::symbol("c")))
            .unwrap()
            .unwrap();
        assert_eq!(result.child_count(), 1);
        assert_eq!(label(&result.at(&path![0]).unwrap()), "b");
    }

    #[test]
    fn removing_the_root_is_absent() {
        let (root, _) = sample_tree();
        let result = root
            .remove_if(|data| data.as_atom() == Some(&Atom::symbol("a")))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn map_tree_relabels_and_shares() {
        let (root, _) = sample_tree();
        let result = root.map_tree(&mut |v| {
            let Some(n) = v.as_node() else {
                return (v.clone(), Descend::Into);
            };
            if label(v) == "d" {
                let renamed = n
                    .copy()
                    .data(Value::symbol("dd"))
                    .finish()
                    .expect("copy of a well-formed node cannot fail");
                (Value::Node(renamed), Descend::Skip)
            } else {
                (v.clone(), Descend::Into)
            }
        });
        let result = result.as_node().unwrap();
        assert_eq!(label(&result.at(&path![1, 0]).unwrap()), "dd");
        // Serial numbers are preserved along the rebuilt spine.
        assert_eq!(result.serial(), root.serial());
        // The sibling subtree is untouched and shared.
        assert!(Arc::ptr_eq(
            result.at(&path![0]).unwrap().as_node().unwrap(),
            root.at(&path![0]).unwrap().as_node().unwrap(),
        ));
    }

    #[test]
    fn subst_compares_whole_values() {
        let atom = Value::Atom(Atom::Int(1));
        let replacement = Value::Atom(Atom::Int(2));
        assert_eq!(subst(&replacement, &atom, &atom), replacement);
        let kept = Value::symbol("other");
        assert_eq!(subst(&replacement, &atom, &kept), kept);
    }
}
