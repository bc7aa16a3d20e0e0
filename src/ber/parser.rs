use super::header::header_error;
use super::*;
use crate::error::*;
use log::{debug, trace};
use nom::bytes::streaming::{tag, take};
use nom::multi::many_till;
use nom::{Err, Needed};
use rusticata_macros::custom_check;

/// Maximum nesting depth
///
/// Bounds indefinite-length values while locating their end, and the number of levels a
/// decoded tree is decomposed into children.
pub const MAX_RECURSION: usize = 50;

/// End-of-contents marker closing an indefinite-length value
pub const EOC: [u8; 2] = [0x00, 0x00];

fn parse_eoc(i: &[u8]) -> BerResult<&[u8]> {
    tag(&EOC[..])(i)
}

/// Read one element, returning its header and its value bytes
///
/// For an indefinite length the value stops before the end-of-contents marker, which is
/// consumed.
pub(crate) fn parse_element(i: &[u8], max_depth: usize) -> BerResult<(Header, &[u8])> {
    let (rem, header) = parse_header(i)?;
    match header.len().map_err(Err::Error)? {
        Length::Definite(n) => {
            let (rem, value) = take::<_, _, BerError>(n)(rem)?;
            Ok((rem, (header, value)))
        }
        Length::Indefinite if header.is_constructed() => {
            custom_check!(rem, max_depth == 0, BerError::BerMaxDepth)?;
            let (after, _) = many_till(|i| parse_element(i, max_depth - 1), parse_eoc)(rem)?;
            let value_len = rem.len() - after.len() - EOC.len();
            trace!("indefinite value of {} bytes", value_len);
            Ok((after, (header, &rem[..value_len])))
        }
        Length::Indefinite => match rem.windows(2).position(|w| w == &EOC[..]) {
            Some(pos) => Ok((&rem[pos + EOC.len()..], (header, &rem[..pos]))),
            None => Err(Err::Incomplete(Needed::Unknown)),
        },
    }
}

/// Parse one node, without decomposing its value
pub fn parse_ber_node(i: &[u8]) -> BerResult<Node> {
    let (rem, (header, value)) = parse_element(i, MAX_RECURSION)?;
    Ok((rem, Node::from_header(header, value.to_vec())))
}

/// Error reported when the input ends before an element is complete
///
/// Input ending inside a tag descriptor, or before the end-of-contents marker of an
/// indefinite-length element, is an encoding error. Other shortfalls are truncations.
pub(crate) fn incomplete_error(i: &[u8]) -> BerError {
    if i.is_empty() {
        return BerError::TruncatedInput;
    }
    if let Err(Err::Incomplete(_)) = parse_tag_descriptor(i) {
        return BerError::invalid("input ended inside tag descriptor");
    }
    match parse_header(i) {
        Ok((_, h)) if h.is_indefinite() => header_error("end-of-contents not found", &h),
        _ => BerError::TruncatedInput,
    }
}

/// Decode the first element of `bytes`
///
/// Bytes following the element are ignored.
pub fn decode(bytes: &[u8]) -> Result<Node> {
    match parse_ber_node(bytes) {
        Ok((rem, node)) => {
            if !rem.is_empty() {
                debug!("ignoring {} bytes after decoded element", rem.len());
            }
            Ok(node)
        }
        Err(Err::Incomplete(_)) => Err(incomplete_error(bytes)),
        Err(e) => Err(from_nom(e)),
    }
}

/// Split the value of a constructed node into child nodes
///
/// A single leading zero byte is skipped when the value is longer than one byte. Parsing
/// stops when the bytes are exhausted or at an end-of-contents marker.
pub(crate) fn parse_children(value: &[u8]) -> Result<Vec<Node>> {
    let mut i = match value {
        [0x00, rest @ ..] if !rest.is_empty() => rest,
        _ => value,
    };
    let mut children = Vec::new();
    while !i.is_empty() {
        let (rem, (header, v)) = match parse_element(i, MAX_RECURSION) {
            Ok(r) => r,
            Err(Err::Incomplete(_)) => {
                return Err(match incomplete_error(i) {
                    BerError::TruncatedInput => BerError::invalid("child element truncated"),
                    e => e,
                });
            }
            Err(e) => {
                return Err(match from_nom(e) {
                    e @ BerError::InvalidEncoding(_) => e,
                    e => BerError::invalid(e.to_string()),
                });
            }
        };
        if header.is_eoc() {
            break;
        }
        children.push(Node::from_header(header, v.to_vec()));
        i = rem;
    }
    Ok(children)
}
