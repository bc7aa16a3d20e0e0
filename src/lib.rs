//! # eID ASN.1 node codec
//!
//! A codec for Basic Encoding Rules (BER [[X.690]]) data as found on German eID cards and in
//! card-verifiable certificates, implemented with the [nom](https://github.com/Geal/nom)
//! parser combinator framework.
//!
//! Data is held in a tree of [`Node`](ber/struct.Node.html)s. Each node keeps the raw tag
//! descriptor, length and value bytes of one element; the children of a constructed node
//! are decoded on first access and cached.
//!
//! ```rust
//! use eid_asn1::ber::Node;
//! use eid_asn1::integer::IntegerNode;
//!
//! let node = Node::from_bytes(&[0x30, 0x03, 0x02, 0x01, 0x05]).unwrap();
//! let children = node.children().unwrap();
//! assert_eq!(IntegerNode::as_integer(&children[0]), Some(5));
//! ```
//!
//! # Mutation
//!
//! Nodes are mutable: children can be added, replaced and removed, and value bytes can be
//! reassigned. A changed node recomputes its length and value bytes when it is encoded
//! again. Passing the top of the tree as `root` to a mutation re-encodes the whole tree.
//!
//! ```rust
//! use eid_asn1::ber::Node;
//!
//! let root = Node::from_bytes(&[0x30, 0x05, 0x30, 0x03, 0x02, 0x01, 0x05]).unwrap();
//! let inner = root.child(0).unwrap().unwrap();
//! inner.add_child(Node::with_tag(0x05, &[]).unwrap(), Some(&root)).unwrap();
//! assert_eq!(
//!     root.encoded(),
//!     vec![0x30, 0x07, 0x30, 0x05, 0x02, 0x01, 0x05, 0x05, 0x00]
//! );
//! ```
//!
//! A node can be made immutable with [`Node::set_immutable`](ber/struct.Node.html#method.set_immutable).
//! This is irreversible and applies to every descendant. Mutation can also be disabled
//! temporarily.
//!
//! # Leaf values and paths
//!
//! OBJECT IDENTIFIER and INTEGER nodes are read with [`oid::ObjectIdentifier`] and
//! [`integer::IntegerNode`]. A [`path::PathDescriptor`] describes how to reach a value inside a
//! tree, selecting children by position or by a predicate.
//!
//! # Concurrency
//!
//! Every node operation holds the node's lock for its duration. A sequence of operations
//! on several nodes of a tree (mutate a child, then encode the root) is not atomic: callers
//! sharing a tree between writers and readers must serialize those sequences themselves.
//!
//! [X.690]: https://www.itu.int/rec/T-REC-X.690/en "Recommendation X.690"

#![deny(/*missing_docs,*/unsafe_code,
        unstable_features,
        unused_import_braces, unused_qualifications)]

pub mod ber;
pub mod error;
pub mod integer;
pub mod oid;
pub mod path;

pub use ber::{decode, decode_reader, Node};
pub use error::{BerError, BerResult};
