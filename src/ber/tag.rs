use crate::error::{BerError, BerResult, Result};
use nom::{Err, Needed};
use rusticata_macros::newtype_enum;

/// Bit marking a constructed encoding in the first descriptor byte
pub const CONSTRUCTED_BIT: u8 = 0b0010_0000;
/// Low bits of the first descriptor byte announcing a multi-byte tag number
pub const MULTI_BYTE_MARKER: u8 = 0b0001_1111;
/// Continuation bit of the subsequent descriptor bytes
pub const CONTINUATION_BIT: u8 = 0b1000_0000;

/// Bare tag number, without class and constructed bits
///
/// X.690 does not bound the tag number; descriptors carrying more than 32 bits
/// are rejected.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BerTag(pub u32);

newtype_enum! {
impl debug BerTag {
    EndOfContent = 0x0,
    Boolean = 0x1,
    Integer = 0x2,
    BitString = 0x3,
    OctetString = 0x4,
    Null = 0x05,
    Oid = 0x06,
    Enumerated = 0xa,
    Utf8String = 0xc,

    Sequence = 0x10,
    Set = 0x11,
    NumericString = 0x12,
    PrintableString = 0x13,

    Ia5String = 0x16,
    UtcTime = 0x17,
    GeneralizedTime = 0x18,
}
}

impl From<u32> for BerTag {
    fn from(v: u32) -> Self {
        BerTag(v)
    }
}

impl From<BerTag> for u32 {
    fn from(t: BerTag) -> Self {
        t.0
    }
}

/// Read one tag descriptor
///
/// The first byte is always part of the descriptor. If its low five bits are all set,
/// continuation bytes follow until one has its high bit clear.
pub fn parse_tag_descriptor(i: &[u8]) -> BerResult<&[u8]> {
    let first = match i.first() {
        Some(b) => *b,
        None => return Err(Err::Incomplete(Needed::new(1))),
    };
    if first & MULTI_BYTE_MARKER != MULTI_BYTE_MARKER {
        return Ok((&i[1..], &i[..1]));
    }
    match i[1..].iter().position(|b| b & CONTINUATION_BIT == 0) {
        Some(pos) => {
            let n = pos + 2;
            Ok((&i[n..], &i[..n]))
        }
        None => Err(Err::Incomplete(Needed::new(1))),
    }
}

/// Validate the continuation-bit pattern of a tag descriptor
///
/// A single byte must not announce a multi-byte tag. In a multi-byte descriptor every byte
/// but the last carries the continuation bit, the number is not zero-padded and fits 32 bits.
pub fn check_tag_bytes(bytes: &[u8]) -> Result<&[u8]> {
    let (first, rest) = match bytes.split_first() {
        Some(x) => x,
        None => return Err(BerError::invalid("empty tag descriptor")),
    };
    if first & MULTI_BYTE_MARKER != MULTI_BYTE_MARKER {
        if !rest.is_empty() {
            return Err(BerError::invalid(format!(
                "single-byte tag {:02x} followed by extra bytes",
                first
            )));
        }
        return Ok(bytes);
    }
    if rest.is_empty() {
        return Err(BerError::invalid("multi-byte tag without subsequent bytes"));
    }
    let last = rest.len() - 1;
    for (idx, b) in rest.iter().enumerate() {
        let more = b & CONTINUATION_BIT != 0;
        if idx == last && more {
            return Err(BerError::invalid(format!(
                "continuation bit set on last tag byte {:02x}",
                b
            )));
        }
        if idx != last && !more {
            return Err(BerError::invalid(format!(
                "continuation bit missing on tag byte {} ({:02x})",
                idx + 1,
                b
            )));
        }
    }
    if rest[0] == CONTINUATION_BIT {
        return Err(BerError::invalid("tag number padded with leading zero bits"));
    }
    // 5 groups of 7 bits, the first of which may only hold 4
    if rest.len() > 5 || (rest.len() == 5 && rest[0] & 0x7f > 0x0f) {
        return Err(BerError::invalid("tag number exceeds 32 bits"));
    }
    Ok(bytes)
}

/// Strip one leading zero byte from a descriptor longer than one byte
#[inline]
pub(crate) fn strip_tag_padding(bytes: &[u8]) -> &[u8] {
    match bytes {
        [0, rest @ ..] if !rest.is_empty() => rest,
        _ => bytes,
    }
}

/// Bare tag number of a descriptor
///
/// A single leading zero byte is ignored. The descriptor is expected to have passed
/// [`check_tag_bytes`]; extra high bits are discarded otherwise.
pub fn extract_tag_number(descriptor: &[u8]) -> BerTag {
    let d = strip_tag_padding(descriptor);
    match d.split_first() {
        None => BerTag(0),
        Some((first, rest)) => {
            if first & MULTI_BYTE_MARKER != MULTI_BYTE_MARKER {
                BerTag(u32::from(first & MULTI_BYTE_MARKER))
            } else {
                let n = rest
                    .iter()
                    .fold(0u32, |acc, b| (acc << 7) | u32::from(b & 0x7f));
                BerTag(n)
            }
        }
    }
}

/// Minimal descriptor for a class, constructed flag and tag number
pub fn encode_tag_descriptor(class: super::Class, constructed: bool, tag: BerTag) -> Vec<u8> {
    let mut first = class.tag_bits();
    if constructed {
        first |= CONSTRUCTED_BIT;
    }
    if tag.0 < u32::from(MULTI_BYTE_MARKER) {
        return vec![first | tag.0 as u8];
    }
    let mut groups = Vec::with_capacity(5);
    let mut n = tag.0;
    loop {
        groups.push((n & 0x7f) as u8);
        n >>= 7;
        if n == 0 {
            break;
        }
    }
    let mut out = Vec::with_capacity(groups.len() + 1);
    out.push(first | MULTI_BYTE_MARKER);
    let count = groups.len();
    for (idx, g) in groups.into_iter().rev().enumerate() {
        if idx + 1 < count {
            out.push(g | CONTINUATION_BIT);
        } else {
            out.push(g);
        }
    }
    out
}
