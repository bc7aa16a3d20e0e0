use super::{BerTag, Node};
use crate::error::Result;
use std::sync::Arc;

/// Nodes of `nodes` whose bare tag number is `tag`, in order
pub fn filter_by_tag_number<T: Into<BerTag>>(nodes: &[Arc<Node>], tag: T) -> Vec<Arc<Node>> {
    let tag = tag.into();
    nodes
        .iter()
        .filter(|n| n.tag_number() == tag)
        .cloned()
        .collect()
}

/// Nodes of `nodes` with exactly the tag descriptor `descriptor`, in order
///
/// Leading zero bytes of `descriptor` are ignored.
pub fn filter_by_tag_descriptor(nodes: &[Arc<Node>], descriptor: &[u8]) -> Vec<Arc<Node>> {
    let descriptor = trim_descriptor(descriptor);
    nodes
        .iter()
        .filter(|n| n.tag_descriptor() == descriptor)
        .cloned()
        .collect()
}

fn trim_descriptor(d: &[u8]) -> &[u8] {
    let zeros = d.iter().take_while(|b| **b == 0).count();
    &d[zeros.min(d.len().saturating_sub(1))..]
}

impl Node {
    /// Children with bare tag number `tag`
    pub fn filter_children_by_tag<T: Into<BerTag>>(&self, tag: T) -> Result<Vec<Arc<Node>>> {
        Ok(filter_by_tag_number(&self.children()?, tag))
    }

    /// Children with tag descriptor `descriptor`
    ///
    /// Tells apart children whose tag numbers are equal but whose classes differ.
    pub fn filter_children_by_descriptor(&self, descriptor: &[u8]) -> Result<Vec<Arc<Node>>> {
        Ok(filter_by_tag_descriptor(&self.children()?, descriptor))
    }
}
