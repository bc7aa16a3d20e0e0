use super::parser::{decode, parse_children, EOC, MAX_RECURSION};
use super::*;
use crate::error::{BerError, Result};
use crate::integer::parse_integer;
use crate::oid::{decode_oid, oid_to_string};
use log::{debug, trace};
use num_bigint::BigInt;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Specialization of a node
///
/// Specialized nodes keep a decoded scalar in sync with their value bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Generic,
    /// OBJECT IDENTIFIER, see [`ObjectIdentifier`](crate::oid::ObjectIdentifier)
    ObjectIdentifier,
    /// INTEGER, see [`IntegerNode`](crate::integer::IntegerNode)
    Integer,
}

impl NodeKind {
    /// Tag number a node of this kind must carry
    pub fn expected_tag(self) -> Option<BerTag> {
        match self {
            NodeKind::Generic => None,
            NodeKind::ObjectIdentifier => Some(BerTag::Oid),
            NodeKind::Integer => Some(BerTag::Integer),
        }
    }
}

/// Decoding of a generic node into a specialized one
pub trait LeafCodec {
    const KIND: NodeKind;
    const TAG: BerTag;

    /// Specialized copy of `node`
    ///
    /// Fails with `TagMismatch` unless `node` is primitive and carries `TAG`.
    fn decode(node: &Node) -> Result<Node> {
        check_leaf_tag(node, Self::TAG)?;
        Ok(node.copy_as(Self::KIND))
    }
}

/// Access state of a node
///
/// The only way out of `Immutable` is a copy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Access {
    Mutable,
    MutationDisabled,
    Immutable,
}

impl Default for Access {
    fn default() -> Self {
        Access::Mutable
    }
}

struct NodeState {
    tag: Vec<u8>,
    length: Vec<u8>,
    value: Vec<u8>,
    children: Option<Vec<Arc<Node>>>,
    /// Number of decomposition steps from the node a tree was decoded from
    depth: usize,
    access: Access,
    dirty: bool,
    oid: Option<String>,
    integer: Option<BigInt>,
}

impl NodeState {
    fn check_mutable(&self) -> Result<()> {
        match self.access {
            Access::Mutable => Ok(()),
            Access::MutationDisabled => Err(BerError::MutationDisabled),
            Access::Immutable => Err(BerError::ImmutableViolation),
        }
    }

    fn is_indefinite(&self) -> bool {
        self.length == [INDEFINITE_LENGTH_BYTE]
    }

    fn holds_children(&self) -> bool {
        holds_children(&self.tag)
    }

    fn is_dirty(&self) -> bool {
        self.dirty
            || self
                .children
                .iter()
                .flatten()
                .any(|child| child.is_dirty())
    }

    /// Recompute value and length bytes if the node or a cached descendant changed
    fn sync(&mut self) {
        if !self.is_dirty() {
            return;
        }
        if let Some(children) = &self.children {
            let mut value = Vec::with_capacity(self.value.len());
            for child in children {
                value.extend_from_slice(&child.encoded());
            }
            self.value = value;
        }
        if !self.is_indefinite() {
            self.length = encode_length(self.value.len());
        }
        self.dirty = false;
    }

    fn encoded(&mut self) -> Vec<u8> {
        self.sync();
        let eoc = if self.is_indefinite() { EOC.len() } else { 0 };
        let mut out =
            Vec::with_capacity(self.tag.len() + self.length.len() + self.value.len() + eoc);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.length);
        out.extend_from_slice(&self.value);
        if eoc > 0 {
            out.extend_from_slice(&EOC);
        }
        out
    }

    fn ensure_children(&mut self) -> Result<&mut Vec<Arc<Node>>> {
        if self.children.is_none() {
            let access = self.access;
            let depth = self.depth + 1;
            let children = if self.holds_children() {
                if depth > MAX_RECURSION {
                    return Err(BerError::BerMaxDepth);
                }
                parse_children(&self.value)?
            } else {
                Vec::new()
            };
            trace!(
                "decomposed node {} into {} children",
                hex::encode(&self.tag),
                children.len()
            );
            self.children = Some(
                children
                    .into_iter()
                    .map(|child| {
                        {
                            let mut st = child.lock();
                            st.access = access;
                            st.depth = depth;
                        }
                        Arc::new(child)
                    })
                    .collect(),
            );
        }
        Ok(self.children.get_or_insert_with(Vec::new))
    }

    fn refresh_leaf(&mut self, kind: NodeKind) {
        self.oid = None;
        self.integer = match kind {
            NodeKind::Integer => parse_integer(&self.value),
            _ => None,
        };
    }
}

/// True if a node with this descriptor holds child elements
///
/// That is the case for universal SEQUENCE and SET, and for any constructed descriptor.
fn holds_children(tag: &[u8]) -> bool {
    let first = tag[0];
    let universal = Class::of_tag_byte(first) == Class::Universal;
    let number = extract_tag_number(tag);
    first & CONSTRUCTED_BIT != 0
        || (universal && (number == BerTag::Sequence || number == BerTag::Set))
}

/// One BER element: tag descriptor, length and value bytes
///
/// The children of a constructed node are decoded from its value on first access and
/// cached. Every operation locks the node for its duration; operations spanning several
/// nodes of a tree are not atomic.
///
/// Equality and hashing use the encoded bytes.
pub struct Node {
    kind: NodeKind,
    state: Mutex<NodeState>,
}

impl Node {
    fn build(kind: NodeKind, tag: Vec<u8>, length: Vec<u8>, value: Vec<u8>) -> Node {
        let mut state = NodeState {
            tag,
            length,
            value,
            children: None,
            depth: 0,
            access: Access::Mutable,
            dirty: false,
            oid: None,
            integer: None,
        };
        state.refresh_leaf(kind);
        Node {
            kind,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NodeState> {
        // state is consistent between statements, a poisoned lock can be reused
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn from_header(header: Header, value: Vec<u8>) -> Node {
        let (tag, length) = header.into();
        Node::build(NodeKind::Generic, tag, length, value)
    }

    /// Build a node from a tag descriptor and a value, with the minimal length encoding
    ///
    /// A leading zero byte of a multi-byte descriptor is dropped. The descriptor must follow
    /// the continuation-bit rules.
    pub fn new(tag: &[u8], value: &[u8]) -> Result<Node> {
        let tag = check_tag_bytes(strip_tag_padding(tag))?;
        Ok(Node::build(
            NodeKind::Generic,
            tag.to_vec(),
            encode_length(value.len()),
            value.to_vec(),
        ))
    }

    /// Build a node with a single-byte tag descriptor
    pub fn with_tag(tag: u8, value: &[u8]) -> Result<Node> {
        Node::new(&[tag], value)
    }

    /// Build a node from explicit descriptor, length and value bytes
    ///
    /// A definite length must match the value. If `immutable` is set the node is frozen
    /// before being returned.
    pub fn from_parts(tag: &[u8], length: &[u8], value: &[u8], immutable: bool) -> Result<Node> {
        let tag = check_tag_bytes(strip_tag_padding(tag))?;
        if let Length::Definite(n) = decode_length(length)? {
            if n != value.len() {
                return Err(BerError::invalid(format!(
                    "length {} does not match value of {} bytes",
                    n,
                    value.len()
                )));
            }
        }
        let node = Node::build(
            NodeKind::Generic,
            tag.to_vec(),
            length.to_vec(),
            value.to_vec(),
        );
        if immutable {
            node.set_immutable();
        }
        Ok(node)
    }

    /// Decode the first element of `bytes`, see [`decode`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Node> {
        decode(bytes)
    }

    /// Copy of `other`'s current encoding, mutable and with no cached children
    pub fn copy_of(other: &Node) -> Node {
        other.copy_as(other.kind)
    }

    pub(crate) fn copy_as(&self, kind: NodeKind) -> Node {
        let mut st = self.lock();
        st.sync();
        Node::build(kind, st.tag.clone(), st.length.clone(), st.value.clone())
    }

    /// Replace the content of this node with the element decoded from `bytes`
    ///
    /// Specialized nodes only accept an element with their own tag.
    pub fn redecode(&self, bytes: &[u8]) -> Result<()> {
        let source = decode(bytes)?;
        self.check_kind_tag(&source)?;
        let (tag, length, value) = {
            let mut src = source.lock();
            src.sync();
            (
                std::mem::take(&mut src.tag),
                std::mem::take(&mut src.length),
                std::mem::take(&mut src.value),
            )
        };
        let mut st = self.lock();
        st.check_mutable()?;
        st.tag = tag;
        st.length = length;
        st.value = value;
        st.children = None;
        st.dirty = false;
        st.refresh_leaf(self.kind);
        Ok(())
    }

    pub(crate) fn check_kind_tag(&self, candidate: &Node) -> Result<()> {
        match self.kind.expected_tag() {
            Some(expected) => check_leaf_tag(candidate, expected),
            None => Ok(()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Raw tag descriptor
    pub fn tag_descriptor(&self) -> Vec<u8> {
        self.lock().tag.clone()
    }

    /// Bare tag number
    pub fn tag_number(&self) -> BerTag {
        extract_tag_number(&self.lock().tag)
    }

    pub fn class(&self) -> Class {
        Class::of_tag_byte(self.lock().tag[0])
    }

    pub fn is_universal(&self) -> bool {
        self.class() == Class::Universal
    }

    pub fn is_application(&self) -> bool {
        self.class() == Class::Application
    }

    pub fn is_context_specific(&self) -> bool {
        self.class() == Class::ContextSpecific
    }

    pub fn is_private(&self) -> bool {
        self.class() == Class::Private
    }

    pub fn is_constructed(&self) -> bool {
        self.lock().tag[0] & CONSTRUCTED_BIT != 0
    }

    pub fn is_primitive(&self) -> bool {
        !self.is_constructed()
    }

    /// Universal class, tag number 16
    pub fn is_sequence(&self) -> bool {
        self.is_universal() && self.tag_number() == BerTag::Sequence
    }

    /// Universal class, tag number 17
    pub fn is_set(&self) -> bool {
        self.is_universal() && self.tag_number() == BerTag::Set
    }

    /// Length bytes, recomputed first if the node changed
    pub fn length_bytes(&self) -> Vec<u8> {
        let mut st = self.lock();
        st.sync();
        st.length.clone()
    }

    pub fn length(&self) -> Result<Length> {
        decode_length(&self.length_bytes())
    }

    /// Value bytes, recomputed from the children first if they changed
    pub fn value(&self) -> Vec<u8> {
        let mut st = self.lock();
        st.sync();
        st.value.clone()
    }

    /// Canonical encoding of the node
    ///
    /// If the node or one of its cached descendants changed, value and length bytes are
    /// recomputed first. Indefinite-length nodes keep their form and end with `00 00`.
    pub fn encoded(&self) -> Vec<u8> {
        self.lock().encoded()
    }

    pub fn encoded_len(&self) -> usize {
        self.encoded().len()
    }

    /// True if the node or one of its cached descendants changed since last encoded
    pub fn is_dirty(&self) -> bool {
        self.lock().is_dirty()
    }

    /// Child nodes, decoded from the value bytes on first call
    ///
    /// Nodes that are neither sequence, set nor constructed have no children. Decoded
    /// children inherit this node's access state.
    pub fn children(&self) -> Result<Vec<Arc<Node>>> {
        let mut st = self.lock();
        Ok(st.ensure_children()?.clone())
    }

    pub fn child_count(&self) -> Result<usize> {
        let mut st = self.lock();
        Ok(st.ensure_children()?.len())
    }

    pub fn child(&self, index: usize) -> Result<Option<Arc<Node>>> {
        let mut st = self.lock();
        Ok(st.ensure_children()?.get(index).cloned())
    }

    fn lock_children_for_mutation(&self) -> Result<MutexGuard<'_, NodeState>> {
        let mut st = self.lock();
        st.check_mutable()?;
        if !st.holds_children() {
            return Err(BerError::UnsupportedStructure);
        }
        st.ensure_children()?;
        Ok(st)
    }

    /// Append a child
    ///
    /// `root` is marked changed and re-encoded afterwards; pass the top of the tree so
    /// that its cached bytes include the new child.
    pub fn add_child(&self, child: Node, root: Option<&Node>) -> Result<()> {
        self.add_children(std::iter::once(child), root)
    }

    /// Append several children, see [`Node::add_child`]
    pub fn add_children<I>(&self, children: I, root: Option<&Node>) -> Result<()>
    where
        I: IntoIterator<Item = Node>,
    {
        let children: Vec<Node> = children.into_iter().collect();
        {
            let mut st = self.lock_children_for_mutation()?;
            let depth = st.depth + 1;
            st.ensure_children()?.extend(children.into_iter().map(|child| {
                child.lock().depth = depth;
                Arc::new(child)
            }));
            st.dirty = true;
        }
        mark_root(root);
        Ok(())
    }

    /// Replace the first child encoded like `old` by `new`
    ///
    /// Returns `false`, leaving the node untouched, if no child matches.
    pub fn replace_child(&self, old: &Node, new: Node, root: Option<&Node>) -> Result<bool> {
        let target = old.encoded();
        {
            let mut st = self.lock_children_for_mutation()?;
            let depth = st.depth + 1;
            let list = st.ensure_children()?;
            match list.iter().position(|c| c.encoded() == target) {
                Some(pos) => {
                    new.lock().depth = depth;
                    list[pos] = Arc::new(new);
                }
                None => return Ok(false),
            }
            st.dirty = true;
        }
        mark_root(root);
        Ok(true)
    }

    /// Remove the first child encoded like `child`
    ///
    /// Returns `false` if no child matches.
    pub fn remove_child(&self, child: &Node, root: Option<&Node>) -> Result<bool> {
        let target = child.encoded();
        {
            let mut st = self.lock_children_for_mutation()?;
            let list = st.ensure_children()?;
            match list.iter().position(|c| c.encoded() == target) {
                Some(pos) => {
                    list.remove(pos);
                }
                None => return Ok(false),
            }
            st.dirty = true;
        }
        mark_root(root);
        Ok(true)
    }

    /// Assign new value bytes
    ///
    /// Cached children are dropped, the length is recomputed on next encoding.
    pub fn set_value_bytes(&self, value: &[u8], root: Option<&Node>) -> Result<()> {
        {
            let mut st = self.lock();
            st.check_mutable()?;
            st.sync();
            if st.value == value {
                return Ok(());
            }
            st.value = value.to_vec();
            st.children = None;
            st.dirty = true;
            st.refresh_leaf(self.kind);
        }
        mark_root(root);
        Ok(())
    }

    fn mark_dirty(&self) {
        self.lock().dirty = true;
    }

    /// Freeze the node and every descendant
    ///
    /// The encoding is recomputed first. Children decoded later inherit the state.
    pub fn set_immutable(&self) {
        let mut st = self.lock();
        if st.access == Access::Immutable {
            return;
        }
        st.sync();
        st.access = Access::Immutable;
        if let Some(children) = &st.children {
            debug!("freezing {} cached children", children.len());
            for child in children {
                child.set_immutable();
            }
        }
    }

    pub fn is_immutable(&self) -> bool {
        self.access() == Access::Immutable
    }

    /// Enable or disable mutation on the node and its cached descendants
    ///
    /// Fails on an immutable node. Immutable descendants are left as they are.
    pub fn set_mutation_enabled(&self, enabled: bool) -> Result<()> {
        let mut st = self.lock();
        if st.access == Access::Immutable {
            return Err(BerError::ImmutableViolation);
        }
        st.access = if enabled {
            Access::Mutable
        } else {
            Access::MutationDisabled
        };
        if let Some(children) = &st.children {
            for child in children {
                if !child.is_immutable() {
                    child.set_mutation_enabled(enabled)?;
                }
            }
        }
        Ok(())
    }

    pub fn is_mutation_enabled(&self) -> bool {
        self.access() == Access::Mutable
    }

    pub fn access(&self) -> Access {
        self.lock().access
    }

    /// Dotted form of the OBJECT IDENTIFIER held by the node
    ///
    /// Specialized nodes fill their cache here, under the same lock as the value bytes.
    pub(crate) fn oid_string(&self) -> Result<String> {
        let mut st = self.lock();
        st.sync();
        if let Some(s) = &st.oid {
            return Ok(s.clone());
        }
        let found = extract_tag_number(&st.tag);
        if found != BerTag::Oid || st.tag[0] & CONSTRUCTED_BIT != 0 {
            return Err(BerError::TagMismatch {
                expected: BerTag::Oid,
                found,
            });
        }
        let s = oid_to_string(&decode_oid(&st.value)?);
        if self.kind == NodeKind::ObjectIdentifier {
            st.oid = Some(s.clone());
        }
        Ok(s)
    }

    pub(crate) fn set_cached_oid(&self, s: String) {
        self.lock().oid = Some(s);
    }

    pub(crate) fn cached_integer(&self) -> Option<BigInt> {
        self.lock().integer.clone()
    }

    pub(crate) fn with_kind(kind: NodeKind, tag: u8, value: Vec<u8>) -> Node {
        let length = encode_length(value.len());
        Node::build(kind, vec![tag], length, value)
    }
}

/// Check that `node` is a primitive element with tag number `expected`
pub(crate) fn check_leaf_tag(node: &Node, expected: BerTag) -> Result<()> {
    let found = node.tag_number();
    if found != expected || node.is_constructed() {
        return Err(BerError::TagMismatch { expected, found });
    }
    Ok(())
}

fn mark_root(root: Option<&Node>) {
    if let Some(root) = root {
        root.mark_dirty();
        let _ = root.encoded();
    }
}

impl Clone for Node {
    /// Same as [`Node::copy_of`]: the clone is mutable and shares no state
    fn clone(&self) -> Self {
        Node::copy_of(self)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.encoded() == other.encoded()
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.encoded().hash(state)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.lock();
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("tag", &hex::encode(&st.tag))
            .field("length", &hex::encode(&st.length))
            .field("value", &hex::encode(&st.value))
            .field("access", &st.access)
            .field("dirty", &st.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_computes_length() {
        let node = Node::with_tag(0x04, &[0xaa; 200]).expect("node");
        assert_eq!(node.length_bytes(), vec![0x81, 0xc8]);
        assert_eq!(node.length(), Ok(Length::Definite(200)));
        assert_eq!(node.encoded_len(), 203);
    }

    #[test]
    fn new_rejects_bad_descriptor() {
        assert!(Node::new(&[0x1f], &[]).is_err());
        assert!(Node::new(&hex!("7f 81"), &[]).is_err());
        let node = Node::new(&hex!("00 7f 21"), &[]).expect("padded descriptor");
        assert_eq!(node.tag_descriptor(), vec![0x7f, 0x21]);
    }

    #[test]
    fn from_parts_checks_length() {
        assert!(Node::from_parts(&[0x04], &[0x02], &[0x01], false).is_err());
        let node = Node::from_parts(&[0x04], &[0x81, 0x01], &[0x01], true).expect("node");
        assert!(node.is_immutable());
        assert_eq!(node.encoded(), hex!("04 81 01 01").to_vec());
    }

    #[test]
    fn holds_children_rules() {
        assert!(holds_children(&[0x30]));
        assert!(holds_children(&[0x31]));
        assert!(holds_children(&[0x10]));
        assert!(holds_children(&[0xa0]));
        assert!(holds_children(&hex!("7f 21")));
        assert!(!holds_children(&[0x04]));
        assert!(!holds_children(&[0x50]));
    }

    #[test]
    fn set_value_drops_children() {
        let node = Node::from_bytes(&hex!("30 03 02 01 05")).expect("decode");
        assert_eq!(node.child_count(), Ok(1));
        node.set_value_bytes(&hex!("02 01 06 02 01 07"), None)
            .expect("set value");
        assert!(node.is_dirty());
        assert_eq!(node.child_count(), Ok(2));
        assert_eq!(node.encoded(), hex!("30 06 02 01 06 02 01 07").to_vec());
        assert!(!node.is_dirty());
    }

    #[test]
    fn set_same_value_is_noop() {
        let node = Node::with_tag(0x04, &[1, 2]).expect("node");
        node.set_value_bytes(&[1, 2], None).expect("set value");
        assert!(!node.is_dirty());
    }

    #[test]
    fn mutation_disabled() {
        let node = Node::from_bytes(&hex!("30 03 02 01 05")).expect("decode");
        node.set_mutation_enabled(false).expect("disable");
        let child = Node::with_tag(0x05, &[]).expect("null");
        assert_eq!(
            node.add_child(child.clone(), None),
            Err(BerError::MutationDisabled)
        );
        assert_eq!(
            node.set_value_bytes(&[], None),
            Err(BerError::MutationDisabled)
        );
        // children decoded later inherit the state
        let first = node.child(0).expect("children").expect("first child");
        assert!(!first.is_mutation_enabled());
        node.set_mutation_enabled(true).expect("enable");
        assert!(first.is_mutation_enabled());
        node.add_child(child, None).expect("add");
        assert_eq!(node.encoded(), hex!("30 05 02 01 05 05 00").to_vec());
    }

    #[test]
    fn access_checked_before_structure() {
        let node = Node::with_tag(0x04, &[]).expect("node");
        node.set_immutable();
        let child = Node::with_tag(0x05, &[]).expect("null");
        assert_eq!(
            node.add_child(child, None),
            Err(BerError::ImmutableViolation)
        );
        assert_eq!(
            node.set_mutation_enabled(true),
            Err(BerError::ImmutableViolation)
        );
    }

    #[test]
    fn copy_resets_access() {
        let node = Node::from_bytes(&hex!("30 03 02 01 05")).expect("decode");
        node.set_immutable();
        let copy = node.clone();
        assert!(copy.is_mutation_enabled());
        assert_eq!(copy, node);
        copy.set_value_bytes(&[], None).expect("mutable copy");
        assert_ne!(copy, node);
    }

    #[test]
    fn redecode_in_place() {
        let node = Node::from_bytes(&hex!("04 01 aa")).expect("decode");
        node.redecode(&hex!("30 03 02 01 05")).expect("redecode");
        assert!(node.is_sequence());
        assert_eq!(node.child_count(), Ok(1));
        node.set_mutation_enabled(false).expect("disable");
        assert_eq!(
            node.redecode(&hex!("04 00")),
            Err(BerError::MutationDisabled)
        );
    }

    #[test]
    fn equality_on_encoding() {
        let a = Node::from_bytes(&hex!("30 03 02 01 05")).expect("decode");
        let b = Node::with_tag(0x30, &[]).expect("node");
        b.add_child(Node::with_tag(0x02, &[0x05]).expect("int"), None)
            .expect("add");
        assert_eq!(a, b);
    }
}
