//! Tree patch protocol and its application to a document.
//!
//! Invariants:
//! - Patches are applied in order; each index refers to the child (or
//!   attribute) list as left by the previous patch.
//! - References must point to nodes present at the time they are used.
//! - Inserted nodes may carry `Id::UNASSIGNED` anywhere in their subtree; the
//!   document fills those ids on insertion. Already assigned ids are kept, which
//!   is what lets an undo log restore the original identities.
//! - After a batch the document holds exactly one root element, and no
//!   element that received attributes carries a duplicate attribute name.
//! - Application is atomic: a failing batch leaves the document as it was.

use crate::config::MergeConfig;
use crate::error::PatchError;
use crate::merge::merge;
use crate::path::find_path;
use crate::traverse::{find_element_mut, find_node};
use crate::types::{Attribute, Document, Id, Node, NodeRef, TextKind};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreePatch {
    /// Detach a child node or an attribute from its parent.
    Delete { node: Id },
    /// Insert `node` at `index` in the child list of `parent` (element or document).
    InsertChild { parent: Id, index: usize, node: Node },
    /// Insert `attribute` at `index` in the attribute list of `element`.
    InsertAttribute {
        element: Id,
        index: usize,
        attribute: Attribute,
    },
}

impl TreePatch {
    /// Human-readable form, resolving ids against `document`.
    pub fn describe(&self, document: &Document) -> String {
        let name = |id: Id| match find_node(document, id) {
            Some(node) => node.to_string(),
            None => format!("{id} (not in document)"),
        };
        match self {
            TreePatch::Delete { node } => format!("delete {}", name(*node)),
            TreePatch::InsertChild {
                parent,
                index,
                node,
            } => format!("insert {} into {} at {index}", node.to_ref(), name(*parent)),
            TreePatch::InsertAttribute {
                element,
                index,
                attribute,
            } => format!(
                "insert {} into {} at {index}",
                NodeRef::Attribute(attribute),
                name(*element)
            ),
        }
    }
}

impl fmt::Display for TreePatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreePatch::Delete { node } => write!(f, "delete {node}"),
            TreePatch::InsertChild {
                parent,
                index,
                node,
            } => write!(f, "insert {} into {parent} at {index}", node.to_ref()),
            TreePatch::InsertAttribute {
                element,
                index,
                attribute,
            } => write!(
                f,
                "insert {} into {element} at {index}",
                NodeRef::Attribute(attribute)
            ),
        }
    }
}

enum Slot {
    Child(usize),
    Attribute(usize),
}

impl Document {
    /// Apply `patches` in order and return the inverse patches, ready to be
    /// applied as-is to undo the batch.
    pub fn apply(&mut self, patches: Vec<TreePatch>) -> Result<Vec<TreePatch>, PatchError> {
        let total = patches.len();
        let mut undo: Vec<TreePatch> = Vec::with_capacity(total);
        let mut touched: Vec<Id> = Vec::new();

        for patch in patches {
            if let TreePatch::InsertAttribute { element, .. } = &patch {
                touched.push(*element);
            }
            match self.apply_one(patch) {
                Ok(inverse) => undo.push(inverse),
                Err(err) => {
                    self.rollback(undo);
                    return Err(err);
                }
            }
        }

        if let Err(err) = self.validate_batch(&touched) {
            self.rollback(undo);
            return Err(err);
        }

        undo.reverse();
        log::debug!(target: "xdm.patch", "applied {total} patches");
        Ok(undo)
    }

    /// Plan a merge towards `new` and apply it. Returns the applied plan.
    pub fn merge_from(
        &mut self,
        new: &Document,
        config: &MergeConfig,
    ) -> Result<Vec<TreePatch>, PatchError> {
        let plan = merge(self, new, config);
        self.apply(plan.clone())?;
        Ok(plan)
    }

    fn rollback(&mut self, mut undo: Vec<TreePatch>) {
        log::debug!(target: "xdm.patch", "rolling back {} patches", undo.len());
        while let Some(inverse) = undo.pop() {
            if let Err(err) = self.apply_one(inverse) {
                log::error!(target: "xdm.patch", "rollback failed: {err}");
            }
        }
    }

    fn validate_batch(&self, touched: &[Id]) -> Result<(), PatchError> {
        let roots = self.root_element_count();
        if roots != 1 {
            return Err(PatchError::RootElementCount(roots));
        }
        for &id in touched {
            let Some(NodeRef::Element(element)) = find_node(self, id) else {
                continue;
            };
            let attributes = element.attributes();
            for (i, attribute) in attributes.iter().enumerate() {
                if attributes[..i].iter().any(|a| a.name() == attribute.name()) {
                    return Err(PatchError::DuplicateAttribute {
                        element: id,
                        name: attribute.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn apply_one(&mut self, patch: TreePatch) -> Result<TreePatch, PatchError> {
        log::trace!(target: "xdm.patch", "apply {patch}");
        match patch {
            TreePatch::Delete { node } => self.delete(node),
            TreePatch::InsertChild {
                parent,
                index,
                node,
            } => self.insert_child(parent, index, node),
            TreePatch::InsertAttribute {
                element,
                index,
                attribute,
            } => self.insert_attribute(element, index, attribute),
        }
    }

    fn delete(&mut self, node: Id) -> Result<TreePatch, PatchError> {
        if node == self.id {
            return Err(PatchError::DeleteDocument);
        }
        let (parent, slot) = {
            let path = find_path(self, node);
            let (Some(target), Some(parent)) = (path.first(), path.get(1)) else {
                return Err(PatchError::UnknownNode(node));
            };
            let slot = match target {
                NodeRef::Attribute(_) => parent
                    .attributes()
                    .iter()
                    .position(|a| a.id() == node)
                    .map(Slot::Attribute),
                _ => parent
                    .children()
                    .iter()
                    .position(|c| c.id() == node)
                    .map(Slot::Child),
            };
            (parent.id(), slot.ok_or(PatchError::UnknownNode(node))?)
        };

        match slot {
            Slot::Child(index) => {
                let children = if parent == self.id {
                    &mut self.children
                } else {
                    let element = find_element_mut(&mut self.children, parent)
                        .ok_or(PatchError::UnknownNode(parent))?;
                    &mut element.children
                };
                let removed = children.remove(index);
                Ok(TreePatch::InsertChild {
                    parent,
                    index,
                    node: removed,
                })
            }
            Slot::Attribute(index) => {
                let element = find_element_mut(&mut self.children, parent)
                    .ok_or(PatchError::UnknownNode(parent))?;
                let removed = element.attributes.remove(index);
                Ok(TreePatch::InsertAttribute {
                    element: parent,
                    index,
                    attribute: removed,
                })
            }
        }
    }

    fn insert_child(
        &mut self,
        parent: Id,
        index: usize,
        mut node: Node,
    ) -> Result<TreePatch, PatchError> {
        if parent == self.id {
            if let Node::Text(text) = &node {
                if matches!(text.kind(), TextKind::Plain | TextKind::CData) {
                    return Err(PatchError::InvalidDocumentChild);
                }
            }
            check_index(parent, index, self.children.len())?;
            self.ids.assign_node(&mut node)?;
            let id = node.id();
            self.children.insert(index, node);
            return Ok(TreePatch::Delete { node: id });
        }

        match find_node(self, parent) {
            None => return Err(PatchError::UnknownNode(parent)),
            // A child of `<a/>` would flush after the `/>`.
            Some(NodeRef::Element(element)) if !element.is_self_closing() => {
                check_index(parent, index, element.children.len())?;
            }
            Some(_) => return Err(PatchError::NotAContainer(parent)),
        }
        let Document { children, ids, .. } = self;
        let element = find_element_mut(children, parent).ok_or(PatchError::UnknownNode(parent))?;
        ids.assign_node(&mut node)?;
        let id = node.id();
        element.children.insert(index, node);
        Ok(TreePatch::Delete { node: id })
    }

    fn insert_attribute(
        &mut self,
        element_id: Id,
        index: usize,
        mut attribute: Attribute,
    ) -> Result<TreePatch, PatchError> {
        match find_node(self, element_id) {
            None => return Err(PatchError::UnknownNode(element_id)),
            Some(NodeRef::Element(element)) => {
                check_index(element_id, index, element.attributes.len())?;
            }
            Some(_) => return Err(PatchError::NotAnElement(element_id)),
        }
        let Document { children, ids, .. } = self;
        let element =
            find_element_mut(children, element_id).ok_or(PatchError::UnknownNode(element_id))?;
        ids.assign_attribute(&mut attribute)?;
        let id = attribute.id;
        element.attributes.insert(index, attribute);
        Ok(TreePatch::Delete { node: id })
    }
}

fn check_index(parent: Id, index: usize, len: usize) -> Result<(), PatchError> {
    if index > len {
        return Err(PatchError::IndexOutOfBounds { parent, index, len });
    }
    Ok(())
}
