//! Path descriptors: declarative navigation to a value inside a node tree
//!
//! A path is a chain of segments linked to their parent. The root segment names the tag
//! of the node a path is resolved against; every other segment selects one child of the
//! node matched by its parent, either by position among the children with the segment's
//! tag, or by the first of them accepted by a predicate.
//!
//! ```
//! use eid_asn1::ber::Node;
//! use eid_asn1::path::PathDescriptor;
//!
//! let root = PathDescriptor::builder("Body", &[0x30]).build().unwrap();
//! let second = PathDescriptor::builder("Second", &[0x02])
//!     .parent(&root)
//!     .index(1)
//!     .build()
//!     .unwrap();
//! let node = Node::from_bytes(&[0x30, 0x06, 0x02, 0x01, 0x05, 0x02, 0x01, 0x07]).unwrap();
//! assert_eq!(node.integer_at(&second).unwrap(), Some(7));
//! ```

use crate::ber::{
    check_tag_bytes, filter_by_tag_descriptor, strip_tag_padding, BerTag, LeafCodec, Node,
};
use crate::error::{BerError, Result};
use crate::integer::{parse_integer, IntegerNode};
use crate::oid::ObjectIdentifier;
use log::trace;
use num_traits::ToPrimitive;
use std::fmt;
use std::sync::Arc;

/// Schema requirement of a path segment
///
/// Carried for validating consumers, ignored when resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    Required,
    NotPresent,
    Recommended,
    Optional,
    Conditional,
    NoInformation,
}

impl Default for Requirement {
    fn default() -> Self {
        Requirement::NoInformation
    }
}

/// Specialized node a resolved segment is materialized as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderType {
    ObjectIdentifier,
    Integer,
}

impl DecoderType {
    pub fn decode(self, node: &Node) -> Result<Node> {
        match self {
            DecoderType::ObjectIdentifier => ObjectIdentifier::decode(node),
            DecoderType::Integer => IntegerNode::decode(node),
        }
    }
}

/// Structural test over a candidate child
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Node) -> bool + Send + Sync>);

impl Predicate {
    pub fn new<F>(f: F) -> Predicate
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        Predicate(Arc::new(f))
    }

    /// Accepts nodes owning an OBJECT IDENTIFIER child equal to `oid`
    pub fn has_oid_child(oid: &str) -> Predicate {
        let oid = oid.to_string();
        Predicate::new(move |node| match node.filter_children_by_tag(BerTag::Oid) {
            Ok(children) => children
                .iter()
                .any(|c| ObjectIdentifier::as_string(c).map_or(false, |s| s == oid)),
            Err(_) => false,
        })
    }

    pub fn matches(&self, node: &Node) -> bool {
        (self.0)(node)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate")
    }
}

/// Rule selecting one child among those carrying the segment's tag
#[derive(Debug, Clone)]
pub enum Selector {
    ByIndex(usize),
    ByPredicate(Predicate),
}

impl Selector {
    fn select(&self, candidates: Vec<Arc<Node>>) -> Option<Arc<Node>> {
        match self {
            Selector::ByIndex(idx) => candidates.into_iter().nth(*idx),
            Selector::ByPredicate(p) => candidates.into_iter().find(|c| p.matches(c)),
        }
    }
}

/// One segment of a path
#[derive(Debug)]
pub struct PathDescriptor {
    name: String,
    tag: Vec<u8>,
    parent: Option<Arc<PathDescriptor>>,
    selector: Selector,
    decoder: Option<DecoderType>,
    requirement: Requirement,
}

impl PathDescriptor {
    pub fn builder(name: &str, tag: &[u8]) -> PathDescriptorBuilder {
        PathDescriptorBuilder {
            name: name.to_string(),
            tag: tag.to_vec(),
            parent: None,
            index: None,
            predicate: None,
            decoder: None,
            requirement: Requirement::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag descriptor of the node this segment matches
    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    pub fn parent(&self) -> Option<&Arc<PathDescriptor>> {
        self.parent.as_ref()
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn decoder(&self) -> Option<DecoderType> {
        self.decoder
    }

    pub fn requirement(&self) -> Requirement {
        self.requirement
    }

    /// Segments from the root down to this one
    pub fn chain(&self) -> Vec<&PathDescriptor> {
        let mut chain = vec![self];
        let mut cur = self;
        while let Some(parent) = &cur.parent {
            chain.push(parent.as_ref());
            cur = parent.as_ref();
        }
        chain.reverse();
        chain
    }
}

impl fmt::Display for PathDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(Tag: 0x{}", self.name, hex::encode(&self.tag))?;
        match &self.selector {
            Selector::ByIndex(idx) => write!(f, ", Index: {}", idx)?,
            Selector::ByPredicate(_) => f.write_str(", Predicate")?,
        }
        if let Some(parent) = &self.parent {
            write!(f, ", Parent: {}", parent.name)?;
        }
        f.write_str(")")
    }
}

/// Builder for [`PathDescriptor`]
#[derive(Debug)]
pub struct PathDescriptorBuilder {
    name: String,
    tag: Vec<u8>,
    parent: Option<Arc<PathDescriptor>>,
    index: Option<usize>,
    predicate: Option<Predicate>,
    decoder: Option<DecoderType>,
    requirement: Requirement,
}

impl PathDescriptorBuilder {
    pub fn parent(mut self, parent: &Arc<PathDescriptor>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    /// Select the child at `index` among those with the segment's tag
    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Select the first child with the segment's tag accepted by `predicate`
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn decoder(mut self, decoder: DecoderType) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    /// Validate and build the segment
    ///
    /// The tag must be a valid descriptor; index and predicate exclude each other. Without
    /// either, the first child with the tag is selected.
    pub fn build(self) -> Result<Arc<PathDescriptor>> {
        let tag = check_tag_bytes(strip_tag_padding(&self.tag))?.to_vec();
        let selector = match (self.index, self.predicate) {
            (Some(_), Some(_)) => {
                return Err(BerError::InvalidDescriptor(
                    "index and predicate are mutually exclusive",
                ))
            }
            (Some(idx), None) => Selector::ByIndex(idx),
            (None, Some(p)) => Selector::ByPredicate(p),
            (None, None) => Selector::ByIndex(0),
        };
        Ok(Arc::new(PathDescriptor {
            name: self.name,
            tag,
            parent: self.parent,
            selector,
            decoder: self.decoder,
            requirement: self.requirement,
        }))
    }
}

/// Follow `path` from `node`
///
/// `node` must carry the tag of the root segment, otherwise nothing is found. A segment
/// that matches no child also yields `None`. When the last segment names a decoder, the
/// match is returned as a specialized copy; a path made of its root only returns a copy of
/// `node`.
pub fn resolve(node: &Node, path: &PathDescriptor) -> Result<Option<Arc<Node>>> {
    let chain = path.chain();
    let (root, segments) = match chain.split_first() {
        Some(x) => x,
        None => return Ok(None),
    };
    if strip_tag_padding(&node.tag_descriptor()) != root.tag.as_slice() {
        trace!("root {} does not match {}", root, hex::encode(node.tag_descriptor()));
        return Ok(None);
    }
    let mut current = match segments.first() {
        Some(_) => None,
        None => Some(Arc::new(Node::copy_of(node))),
    };
    for segment in segments {
        let candidates = match &current {
            None => filter_by_tag_descriptor(&node.children()?, &segment.tag),
            Some(parent) => filter_by_tag_descriptor(&parent.children()?, &segment.tag),
        };
        match segment.selector.select(candidates) {
            Some(found) => current = Some(found),
            None => {
                trace!("no match for segment {}", segment);
                return Ok(None);
            }
        }
    }
    match (current, path.decoder) {
        (Some(found), Some(decoder)) => Ok(Some(Arc::new(decoder.decode(&found)?))),
        (found, _) => Ok(found),
    }
}

impl Node {
    /// See [`resolve`]
    pub fn resolve(&self, path: &PathDescriptor) -> Result<Option<Arc<Node>>> {
        resolve(self, path)
    }

    /// Value bytes at the end of `path` read as a two's-complement integer
    ///
    /// The resolved node may carry any tag, as implicitly tagged integers are common in
    /// certificates. `None` if absent, empty or not representable as `i32`.
    pub fn integer_at(&self, path: &PathDescriptor) -> Result<Option<i32>> {
        Ok(self
            .resolve(path)?
            .and_then(|n| parse_integer(&n.value()))
            .and_then(|i| i.to_i32()))
    }

    /// Value bytes at the end of `path`, as UTF-8
    pub fn string_at(&self, path: &PathDescriptor) -> Result<Option<String>> {
        match self.resolve(path)? {
            Some(n) => String::from_utf8(n.value())
                .map(Some)
                .map_err(|e| BerError::invalid(format!("value is not UTF-8: {}", e))),
            None => Ok(None),
        }
    }
}
