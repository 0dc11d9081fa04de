//! Positional merge planning.
//!
//! Contract:
//! - `merge` never mutates the old tree; it returns an ordered patch list that
//!   `Document::apply` replays.
//! - Nodes are paired by index, not by content: no move or reorder detection.
//! - A pair that is not structurally equal (see `compare`) is replaced whole:
//!   `Delete(old)` then an insert of a clone of the new node at the old index.
//!   The old subtree is not descended into.
//! - An equal pair keeps its node; attributes, then children, are reconciled
//!   over the common prefix, excess old entries are deleted from the end
//!   backward, extra new entries are inserted at `[common, new_len)`.
//! - Inserted nodes carry unassigned ids; the document assigns them on apply.
//! - The document prolog (XML declaration, doctype, leading whitespace) is not merged.
//!
//! Complexity: O(n) per level plus one path lookup (O(n)) per replacement.

use crate::compare::nodes_equal;
use crate::config::{InsertMode, MergeConfig};
use crate::dom_patch::TreePatch;
use crate::path::find_path;
use crate::types::{Attribute, Document, Node, NodeRef};

/// Plan the patches that turn `old` into `new`, positionally.
pub fn merge(old: &Document, new: &Document, config: &MergeConfig) -> Vec<TreePatch> {
    let mut planner = MergePlanner {
        old,
        config,
        patches: Vec::new(),
    };
    planner.reconcile(old.as_node_ref(), new.as_node_ref());
    log::debug!(
        target: "xdm.merge",
        "planned {} patches ({:?} inserts)",
        planner.patches.len(),
        config.insert_mode
    );
    planner.patches
}

struct MergePlanner<'a> {
    old: &'a Document,
    config: &'a MergeConfig,
    patches: Vec<TreePatch>,
}

impl<'a> MergePlanner<'a> {
    fn reconcile(&mut self, old: NodeRef<'a>, new: NodeRef<'_>) {
        if !nodes_equal(old, new) {
            self.replace(old, new);
            return;
        }
        log::trace!(target: "xdm.merge", "keep {old}");
        self.reconcile_attributes(old, new.attributes());
        self.reconcile_children(old, new.children());
    }

    fn reconcile_attributes(&mut self, old: NodeRef<'a>, new_attributes: &[Attribute]) {
        let old_attributes = old.attributes();
        let common = old_attributes.len().min(new_attributes.len());
        for (old_attr, new_attr) in old_attributes.iter().zip(new_attributes) {
            self.reconcile(NodeRef::Attribute(old_attr), NodeRef::Attribute(new_attr));
        }
        for old_attr in old_attributes[common..].iter().rev() {
            self.patches.push(TreePatch::Delete { node: old_attr.id() });
        }
        for (index, new_attr) in new_attributes.iter().enumerate().skip(common) {
            self.patches.push(TreePatch::InsertAttribute {
                element: old.id(),
                index,
                attribute: new_attr.detached_clone(),
            });
        }
    }

    fn reconcile_children(&mut self, old: NodeRef<'a>, new_children: &[Node]) {
        let old_children = old.children();
        let common = old_children.len().min(new_children.len());
        for (old_child, new_child) in old_children.iter().zip(new_children) {
            self.reconcile(old_child.to_ref(), new_child.to_ref());
        }
        // Back to front so earlier indices stay valid while deleting.
        for old_child in old_children[common..].iter().rev() {
            self.patches.push(TreePatch::Delete {
                node: old_child.id(),
            });
        }
        for (index, new_child) in new_children.iter().enumerate().skip(common) {
            self.patches.push(TreePatch::InsertChild {
                parent: old.id(),
                index,
                node: self.insertion_clone(new_child),
            });
        }
    }

    fn replace(&mut self, old: NodeRef<'a>, new: NodeRef<'_>) {
        let path = find_path(self.old, old.id());
        let Some(&parent) = path.get(1) else {
            log::warn!(target: "xdm.merge", "no parent found for {old}; replacement skipped");
            return;
        };
        let insert = match (old, new) {
            (NodeRef::Attribute(_), NodeRef::Attribute(new_attr)) => parent
                .attributes()
                .iter()
                .position(|attr| attr.id() == old.id())
                .map(|index| TreePatch::InsertAttribute {
                    element: parent.id(),
                    index,
                    attribute: new_attr.detached_clone(),
                }),
            (_, NodeRef::Element(_) | NodeRef::Text(_)) => {
                let index = parent
                    .children()
                    .iter()
                    .position(|child| child.id() == old.id());
                let node = self.insertion_clone_ref(new);
                index.zip(node).map(|(index, node)| TreePatch::InsertChild {
                    parent: parent.id(),
                    index,
                    node,
                })
            }
            _ => None,
        };
        let Some(insert) = insert else {
            log::warn!(target: "xdm.merge", "cannot replace {old} with {new}; skipped");
            return;
        };
        log::trace!(target: "xdm.merge", "replace {old} with {new}");
        self.patches.push(TreePatch::Delete { node: old.id() });
        self.patches.push(insert);
    }

    fn insertion_clone(&self, node: &Node) -> Node {
        match self.config.insert_mode {
            InsertMode::Shell => node.shallow_clone(),
            InsertMode::Deep => node.deep_clone(),
        }
    }

    fn insertion_clone_ref(&self, node: NodeRef<'_>) -> Option<Node> {
        match (node, self.config.insert_mode) {
            (NodeRef::Element(element), InsertMode::Shell) => {
                Some(Node::Element(element.shallow_clone()))
            }
            (NodeRef::Element(element), InsertMode::Deep) => {
                Some(Node::Element(element.deep_clone()))
            }
            (NodeRef::Text(text), _) => Some(Node::Text(text.detached_clone())),
            (NodeRef::Document(_) | NodeRef::Attribute(_), _) => None,
        }
    }
}
