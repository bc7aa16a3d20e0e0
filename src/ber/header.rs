use super::{
    check_tag_bytes, decode_length, extract_tag_number, parse_length_bytes, parse_tag_descriptor,
    BerTag, Class, Length, CONSTRUCTED_BIT,
};
use crate::error::{BerError, BerResult, Result};
use nom::Err;

/// Identifier and length bytes of one element, as read from the input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// Raw tag descriptor
    pub tag: Vec<u8>,
    /// Raw length bytes
    pub length: Vec<u8>,
}

impl Header {
    pub fn class(&self) -> Class {
        Class::of_tag_byte(self.tag[0])
    }

    pub fn is_constructed(&self) -> bool {
        self.tag[0] & CONSTRUCTED_BIT != 0
    }

    pub fn tag_number(&self) -> BerTag {
        extract_tag_number(&self.tag)
    }

    pub fn len(&self) -> Result<Length> {
        decode_length(&self.length)
    }

    #[inline]
    pub fn is_indefinite(&self) -> bool {
        self.length == [super::INDEFINITE_LENGTH_BYTE]
    }

    /// True for the end-of-contents marker `00 00`
    #[inline]
    pub fn is_eoc(&self) -> bool {
        self.tag == [0x00] && self.length == [0x00]
    }
}

/// Read an element header
///
/// The tag descriptor is validated, the length bytes are only split off.
pub fn parse_header(i: &[u8]) -> BerResult<Header> {
    let (rem, tag) = parse_tag_descriptor(i)?;
    check_tag_bytes(tag).map_err(Err::Error)?;
    let (rem, length) = parse_length_bytes(rem)?;
    Ok((
        rem,
        Header {
            tag: tag.to_vec(),
            length,
        },
    ))
}

impl From<Header> for (Vec<u8>, Vec<u8>) {
    fn from(h: Header) -> Self {
        (h.tag, h.length)
    }
}

pub(crate) fn header_error(msg: &str, h: &Header) -> BerError {
    BerError::invalid(format!(
        "{} (tag {}, length {})",
        msg,
        hex::encode(&h.tag),
        hex::encode(&h.length)
    ))
}
