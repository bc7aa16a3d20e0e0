//! Blocking decoding from a byte stream
//!
//! Bytes are pulled from the reader only as far as the element requires, so the stream is
//! positioned right after the element on success. Passing the reader by value drops (and
//! closes) it once decoding finishes; pass `&mut reader` to keep it open.
//!
//! Elements are read header by header: a definite value is copied in one go, the children
//! of an indefinite constructed value are read one after the other until the end-of-contents
//! marker, and a primitive indefinite value is scanned byte by byte.

use super::parser::{incomplete_error, EOC, MAX_RECURSION};
use super::{check_tag_bytes, parse_length_bytes, parse_tag_descriptor, Header, Length, Node};
use crate::error::{from_nom, BerError, BerResult, Result};
use log::trace;
use nom::{Err, Needed};
use std::io::Read;
use std::ops::Range;

/// Upper bound of a single read, so that an announced length is not allocated up front
const MAX_READ_CHUNK: usize = 64 * 1024;

/// Run a streaming parser over a header field pulled from `reader` on demand
///
/// Only used for tag descriptors and length bytes, which are a few bytes long.
fn read_with<R, O, F>(reader: &mut R, parser: F, on_eof: fn(&[u8]) -> BerError) -> Result<O>
where
    R: Read,
    F: for<'a> Fn(&'a [u8]) -> BerResult<'a, O>,
{
    let mut buf = Vec::new();
    loop {
        let needed = match parser(&buf) {
            Ok((_, o)) => return Ok(o),
            Err(Err::Incomplete(Needed::Size(n))) => n.get(),
            Err(Err::Incomplete(Needed::Unknown)) => 1,
            Err(e) => return Err(from_nom(e)),
        };
        let start = buf.len();
        buf.resize(start + needed, 0);
        if let Err(e) = reader.read_exact(&mut buf[start..]) {
            buf.truncate(start);
            return Err(match BerError::from(e) {
                BerError::TruncatedInput => on_eof(&buf),
                e => e,
            });
        }
    }
}

fn tag_eof(partial: &[u8]) -> BerError {
    if partial.is_empty() {
        BerError::TruncatedInput
    } else {
        BerError::invalid("input ended inside tag descriptor")
    }
}

fn length_eof(_: &[u8]) -> BerError {
    BerError::TruncatedInput
}

/// Read one tag descriptor from a stream
///
/// The stream ending inside the descriptor is an encoding error.
pub fn read_tag_descriptor<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    read_with(
        &mut reader,
        |i| parse_tag_descriptor(i).map(|(rem, t)| (rem, t.to_vec())),
        tag_eof,
    )
}

/// Read the length bytes of an element from a stream, see [`parse_length_bytes`]
pub fn read_length<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    read_with(&mut reader, parse_length_bytes, length_eof)
}

/// Element bytes read so far from a stream
struct ElementReader<'r, R> {
    reader: &'r mut R,
    buf: Vec<u8>,
}

impl<'r, R: Read> ElementReader<'r, R> {
    /// Append exactly `n` bytes from the stream
    fn fill(&mut self, mut n: usize) -> Result<()> {
        while n > 0 {
            let chunk = n.min(MAX_READ_CHUNK);
            let start = self.buf.len();
            self.buf.resize(start + chunk, 0);
            if let Err(e) = self.reader.read_exact(&mut self.buf[start..]) {
                self.buf.truncate(start);
                return Err(e.into());
            }
            n -= chunk;
        }
        Ok(())
    }

    fn read_header(&mut self) -> Result<Header> {
        let tag = read_tag_descriptor(&mut *self.reader)?;
        check_tag_bytes(&tag)?;
        self.buf.extend_from_slice(&tag);
        let length = read_length(&mut *self.reader)?;
        self.buf.extend_from_slice(&length);
        Ok(Header { tag, length })
    }

    /// Read one element, returning its header and the range of its value in `buf`
    fn read_element(&mut self, max_depth: usize) -> Result<(Header, Range<usize>)> {
        let header = self.read_header()?;
        let start = self.buf.len();
        match header.len()? {
            Length::Definite(n) => {
                self.fill(n)?;
                Ok((header, start..start + n))
            }
            Length::Indefinite if header.is_constructed() => {
                if max_depth == 0 {
                    return Err(BerError::BerMaxDepth);
                }
                loop {
                    let (child, _) = self.read_element(max_depth - 1)?;
                    if child.is_eoc() {
                        break;
                    }
                }
                Ok((header, start..self.buf.len() - EOC.len()))
            }
            Length::Indefinite => {
                while !self.buf[start..].ends_with(&EOC) {
                    self.fill(1)?;
                }
                Ok((header, start..self.buf.len() - EOC.len()))
            }
        }
    }
}

/// Decode one element from a stream
///
/// Blocks until the element is complete. Nothing is decomposed before children are
/// requested.
pub fn decode_reader<R: Read>(mut reader: R) -> Result<Node> {
    let mut element = ElementReader {
        reader: &mut reader,
        buf: Vec::new(),
    };
    let (header, range) = match element.read_element(MAX_RECURSION) {
        Ok(r) => r,
        // a stream ending inside an indefinite value never reached its end-of-contents
        Err(BerError::TruncatedInput) => return Err(incomplete_error(&element.buf)),
        Err(e) => return Err(e),
    };
    trace!("read element of {} bytes from stream", element.buf.len());
    Ok(Node::from_header(header, element.buf[range].to_vec()))
}

impl Node {
    /// Decode one element from a stream, see [`decode_reader`]
    pub fn from_reader<R: Read>(reader: R) -> Result<Node> {
        decode_reader(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BerError;
    use hex_literal::hex;
    use std::io::Cursor;

    #[test]
    fn stream_stops_after_element() {
        let mut cursor = Cursor::new(hex!("30 03 02 01 05 04 00").to_vec());
        let node = decode_reader(&mut cursor).expect("first");
        assert_eq!(node.encoded(), hex!("30 03 02 01 05").to_vec());
        assert_eq!(cursor.position(), 5);
        let node = Node::from_reader(&mut cursor).expect("second");
        assert_eq!(node.encoded(), vec![0x04, 0x00]);
        assert_eq!(decode_reader(&mut cursor), Err(BerError::TruncatedInput));
    }

    #[test]
    fn stream_indefinite() {
        let data = hex!("30 80 02 01 01 30 80 00 00 00 00");
        let node = decode_reader(&data[..]).expect("decode");
        assert_eq!(node.value(), hex!("02 01 01 30 80 00 00").to_vec());
        assert_eq!(node.encoded(), data.to_vec());
        assert!(matches!(
            decode_reader(&data[..9]),
            Err(BerError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn stream_primitives() {
        assert_eq!(read_tag_descriptor(&hex!("7f 21 00")[..]), Ok(vec![0x7f, 0x21]));
        assert!(matches!(
            read_tag_descriptor(&hex!("7f 81")[..]),
            Err(BerError::InvalidEncoding(_))
        ));
        assert_eq!(read_length(&hex!("81 00 90")[..]), Ok(vec![0x81, 0x90]));
        assert_eq!(read_length(&hex!("82 01")[..]), Err(BerError::TruncatedInput));
    }

    #[test]
    fn stream_nested_errors_match_slice() {
        // 51 nested indefinite sequences
        let mut data = Vec::new();
        for _ in 0..=MAX_RECURSION {
            data.extend_from_slice(&[0x30, 0x80]);
        }
        for _ in 0..=MAX_RECURSION {
            data.extend_from_slice(&EOC);
        }
        assert_eq!(decode_reader(&data[..]), Err(BerError::BerMaxDepth));
        let inner = &data[2..data.len() - 2];
        assert_eq!(decode_reader(inner), crate::ber::decode(inner));
        // truncated child inside an indefinite value
        assert!(matches!(
            decode_reader(&hex!("30 80 02 05 01")[..]),
            Err(BerError::InvalidEncoding(_))
        ));
        assert!(matches!(
            decode_reader(&hex!("30 80 7f")[..]),
            Err(BerError::InvalidEncoding(_))
        ));
        assert!(matches!(
            decode_reader(&hex!("1f 80 01 00")[..]),
            Err(BerError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn announced_length_is_not_trusted() {
        let data = hex!("04 84 ff ff ff ff 01 02 03");
        assert_eq!(decode_reader(&data[..]), Err(BerError::TruncatedInput));
    }
}
