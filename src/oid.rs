//! Object identifiers
//!
//! The first two arcs `X.Y` are encoded as the single subidentifier `X*40+Y`; every
//! subidentifier is written in base 128, most significant group first, with the high bit
//! set on all bytes but the last of each group.

use crate::ber::{check_leaf_tag, BerTag, LeafCodec, Node, NodeKind};
use crate::error::{BerError, Result};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use std::fmt::Write;

/// OBJECT IDENTIFIER leaf codec
///
/// Nodes built or decoded through this type keep their dotted-decimal form cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectIdentifier;

impl ObjectIdentifier {
    /// Build an OBJECT IDENTIFIER node from its dotted-decimal form
    pub fn from_string(s: &str) -> Result<Node> {
        let arcs = parse_oid_string(s)?;
        let node = Node::with_kind(NodeKind::ObjectIdentifier, 0x06, encode_oid(&arcs)?);
        node.set_cached_oid(oid_to_string(&arcs));
        Ok(node)
    }

    /// Dotted-decimal form of an OBJECT IDENTIFIER node
    pub fn as_string(node: &Node) -> Result<String> {
        node.oid_string()
    }

    /// Arcs of an OBJECT IDENTIFIER node
    pub fn arcs(node: &Node) -> Result<Vec<BigUint>> {
        check_leaf_tag(node, BerTag::Oid)?;
        decode_oid(&node.value())
    }
}

impl LeafCodec for ObjectIdentifier {
    const KIND: NodeKind = NodeKind::ObjectIdentifier;
    const TAG: BerTag = BerTag::Oid;
}

/// Split a dotted-decimal string into arcs
///
/// Components are plain decimal numbers; a leading zero is only allowed in `0` itself.
pub fn parse_oid_string(s: &str) -> Result<Vec<BigUint>> {
    let arcs = s
        .split('.')
        .map(|c| {
            if c.is_empty() || !c.bytes().all(|b| b.is_ascii_digit()) {
                return Err(BerError::invalid(format!("invalid OID component {:?}", c)));
            }
            if c.len() > 1 && c.starts_with('0') {
                return Err(BerError::invalid(format!(
                    "OID component {:?} has a leading zero",
                    c
                )));
            }
            BigUint::parse_bytes(c.as_bytes(), 10)
                .ok_or_else(|| BerError::invalid(format!("invalid OID component {:?}", c)))
        })
        .collect::<Result<Vec<_>>>()?;
    if arcs.len() < 2 {
        return Err(BerError::invalid("OID needs at least two arcs"));
    }
    Ok(arcs)
}

fn push_base128(out: &mut Vec<u8>, v: &BigUint) {
    let mut digits = v.to_radix_le(128);
    digits.reverse();
    let last = digits.len() - 1;
    for (idx, d) in digits.into_iter().enumerate() {
        out.push(if idx < last { d | 0x80 } else { d });
    }
}

/// Content bytes of an object identifier
pub fn encode_oid(arcs: &[BigUint]) -> Result<Vec<u8>> {
    let (first, second) = match arcs {
        [a, b, ..] => (a, b),
        _ => return Err(BerError::invalid("OID needs at least two arcs")),
    };
    let first = first
        .to_u8()
        .filter(|x| *x <= 2)
        .ok_or_else(|| BerError::invalid("first OID arc must be 0, 1 or 2"))?;
    if first < 2 && *second >= BigUint::from(40u32) {
        return Err(BerError::invalid("second OID arc must be below 40"));
    }
    let mut out = Vec::new();
    push_base128(&mut out, &(BigUint::from(first) * 40u32 + second));
    for arc in &arcs[2..] {
        push_base128(&mut out, arc);
    }
    Ok(out)
}

/// Arcs of object identifier content bytes
pub fn decode_oid(bytes: &[u8]) -> Result<Vec<BigUint>> {
    if bytes.is_empty() {
        return Err(BerError::invalid("empty OID"));
    }
    if bytes[bytes.len() - 1] & 0x80 != 0 {
        return Err(BerError::invalid("OID ends inside a subidentifier"));
    }
    let mut subids = Vec::new();
    let mut acc = BigUint::zero();
    for b in bytes {
        acc = (acc << 7usize) + BigUint::from(b & 0x7f);
        if b & 0x80 == 0 {
            subids.push(std::mem::replace(&mut acc, BigUint::zero()));
        }
    }
    let mut arcs = Vec::with_capacity(subids.len() + 1);
    let mut subids = subids.into_iter();
    if let Some(first) = subids.next() {
        let eighty = BigUint::from(80u32);
        if first < eighty {
            let first = first.to_u32().unwrap_or_default();
            arcs.push(BigUint::from(first / 40));
            arcs.push(BigUint::from(first % 40));
        } else {
            arcs.push(BigUint::from(2u32));
            arcs.push(first - eighty);
        }
    }
    arcs.extend(subids);
    Ok(arcs)
}

/// Dotted-decimal form of arcs
pub fn oid_to_string(arcs: &[BigUint]) -> String {
    let mut s = String::new();
    for (idx, arc) in arcs.iter().enumerate() {
        if idx > 0 {
            s.push('.');
        }
        let _ = write!(s, "{}", arc);
    }
    s
}
