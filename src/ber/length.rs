use crate::error::{BerError, BerResult, Result};
use nom::bytes::streaming::take;
use nom::number::streaming::be_u8;
use nom::Err;
use std::convert::TryFrom;
use std::fmt;

/// Length byte of the indefinite form
pub const INDEFINITE_LENGTH_BYTE: u8 = 0x80;

/// Decoded length of an element
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Length {
    /// Definite form (X.690 8.1.3.3)
    Definite(usize),
    /// Indefinite form (X.690 8.1.3.6), closed by an end-of-contents marker
    Indefinite,
}

impl Length {
    /// Return true if length is definite and equal to 0
    pub fn is_null(&self) -> bool {
        *self == Length::Definite(0)
    }

    /// Return the definite length, if any
    #[inline]
    pub fn definite(&self) -> Option<usize> {
        match self {
            Length::Definite(sz) => Some(*sz),
            Length::Indefinite => None,
        }
    }
}

impl From<usize> for Length {
    fn from(v: usize) -> Self {
        Length::Definite(v)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Definite(sz) => write!(f, "{}", sz),
            Length::Indefinite => f.write_str("indefinite"),
        }
    }
}

/// Read the length bytes of an element
///
/// A long form announcing a single magnitude byte (`0x81`) skips one zero byte found in
/// place of the magnitude; the returned bytes are then `0x81` and the following byte.
pub fn parse_length_bytes(i: &[u8]) -> BerResult<Vec<u8>> {
    let (rem, first) = be_u8::<_, BerError>(i)?;
    match first {
        0x00..=0x80 => Ok((rem, vec![first])),
        // reserved (X.690 8.1.3.5)
        0xff => Err(Err::Error(BerError::invalid("reserved length byte 0xff"))),
        0x81 => {
            let (rem, b) = be_u8::<_, BerError>(rem)?;
            let (rem, m) = if b == 0 { be_u8::<_, BerError>(rem)? } else { (rem, b) };
            Ok((rem, vec![first, m]))
        }
        _ => {
            let n = usize::from(first & 0x7f);
            let (rem, magnitude) = take::<_, _, BerError>(n)(rem)?;
            let mut bytes = Vec::with_capacity(n + 1);
            bytes.push(first);
            bytes.extend_from_slice(magnitude);
            Ok((rem, bytes))
        }
    }
}

/// Decode length bytes
pub fn decode_length(bytes: &[u8]) -> Result<Length> {
    let (first, magnitude) = match bytes.split_first() {
        Some(x) => x,
        None => return Err(BerError::invalid("empty length")),
    };
    if *first == INDEFINITE_LENGTH_BYTE {
        if !magnitude.is_empty() {
            return Err(BerError::invalid("indefinite length followed by extra bytes"));
        }
        return Ok(Length::Indefinite);
    }
    if first & 0x80 == 0 {
        if !magnitude.is_empty() {
            return Err(BerError::invalid("short length followed by extra bytes"));
        }
        return Ok(Length::Definite(usize::from(*first)));
    }
    if usize::from(first & 0x7f) != magnitude.len() {
        return Err(BerError::invalid(format!(
            "length announces {} bytes, found {}",
            first & 0x7f,
            magnitude.len()
        )));
    }
    let mut value: u64 = 0;
    for b in magnitude {
        if value & 0xff00_0000_0000_0000 != 0 {
            return Err(BerError::invalid("excessive length"));
        }
        value = (value << 8) | u64::from(*b);
    }
    usize::try_from(value)
        .map(Length::Definite)
        .map_err(|_| BerError::invalid("excessive length"))
}

/// Minimal length bytes for a value of `len` octets
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let be = len.to_be_bytes();
    let skip = be.iter().take_while(|b| **b == 0).count();
    let magnitude = &be[skip..];
    let mut out = Vec::with_capacity(magnitude.len() + 1);
    out.push(0x80 | magnitude.len() as u8);
    out.extend_from_slice(magnitude);
    out
}
