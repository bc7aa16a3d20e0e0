use super::{BerTag, Class, Node};
use crate::error::Result;
use crate::path::PathDescriptor;
use std::fmt;
use std::sync::Arc;

/// Read-only view of an immutable tree
///
/// Only accessors are exposed; [`FrozenNode::thaw`] returns a mutable copy.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FrozenNode(Arc<Node>);

impl Node {
    /// Make the tree immutable and wrap it
    pub fn freeze(self) -> FrozenNode {
        self.set_immutable();
        FrozenNode(Arc::new(self))
    }
}

impl FrozenNode {
    pub(crate) fn from_shared(node: Arc<Node>) -> FrozenNode {
        node.set_immutable();
        FrozenNode(node)
    }

    pub fn encoded(&self) -> Vec<u8> {
        self.0.encoded()
    }

    pub fn tag_descriptor(&self) -> Vec<u8> {
        self.0.tag_descriptor()
    }

    pub fn tag_number(&self) -> BerTag {
        self.0.tag_number()
    }

    pub fn class(&self) -> Class {
        self.0.class()
    }

    pub fn value(&self) -> Vec<u8> {
        self.0.value()
    }

    pub fn children(&self) -> Result<Vec<FrozenNode>> {
        Ok(self.0.children()?.into_iter().map(FrozenNode).collect())
    }

    pub fn filter_children_by_tag<T: Into<BerTag>>(&self, tag: T) -> Result<Vec<FrozenNode>> {
        Ok(self
            .0
            .filter_children_by_tag(tag)?
            .into_iter()
            .map(FrozenNode)
            .collect())
    }

    pub fn resolve(&self, path: &PathDescriptor) -> Result<Option<FrozenNode>> {
        Ok(self.0.resolve(path)?.map(FrozenNode::from_shared))
    }

    /// Mutable copy of the underlying node
    pub fn thaw(&self) -> Node {
        Node::copy_of(&self.0)
    }
}

impl AsRef<Node> for FrozenNode {
    fn as_ref(&self) -> &Node {
        &self.0
    }
}

impl fmt::Debug for FrozenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FrozenNode").field(&self.0).finish()
    }
}
