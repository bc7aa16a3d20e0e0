//! INTEGER leaf codec
//!
//! Values are two's-complement, big-endian. A value that cannot be parsed, or does not fit
//! the requested width, is reported as absent.

use crate::ber::{check_leaf_tag, BerTag, LeafCodec, Node, NodeKind};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// INTEGER leaf codec
///
/// Nodes built or decoded through this type keep their parsed value cached; the cache is
/// refreshed whenever the value bytes change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerNode;

impl LeafCodec for IntegerNode {
    const KIND: NodeKind = NodeKind::Integer;
    const TAG: BerTag = BerTag::Integer;
}

pub(crate) fn parse_integer(bytes: &[u8]) -> Option<BigInt> {
    if bytes.is_empty() {
        None
    } else {
        Some(BigInt::from_signed_bytes_be(bytes))
    }
}

impl IntegerNode {
    /// INTEGER node holding `v` in its minimal encoding
    pub fn from_i64(v: i64) -> Node {
        IntegerNode::from_bigint(&BigInt::from(v))
    }

    pub fn from_bigint(v: &BigInt) -> Node {
        Node::with_kind(NodeKind::Integer, 0x02, v.to_signed_bytes_be())
    }

    /// Value of an INTEGER node
    ///
    /// `None` for other tags and for an empty encoding.
    pub fn as_bigint(node: &Node) -> Option<BigInt> {
        if node.kind() == NodeKind::Integer {
            return node.cached_integer();
        }
        check_leaf_tag(node, BerTag::Integer).ok()?;
        parse_integer(&node.value())
    }

    /// Value as `i32`, if it fits
    pub fn as_integer(node: &Node) -> Option<i32> {
        IntegerNode::as_bigint(node)?.to_i32()
    }

    pub fn as_i64(node: &Node) -> Option<i64> {
        IntegerNode::as_bigint(node)?.to_i64()
    }

    pub fn as_u64(node: &Node) -> Option<u64> {
        IntegerNode::as_bigint(node)?.to_u64()
    }
}
