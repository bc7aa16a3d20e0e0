use std::convert::TryFrom;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClassFromIntError(pub(crate) ());

/// Class of a tag descriptor, carried in the two high bits of its first byte
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Class {
    Universal = 0b00,
    Application = 0b01,
    ContextSpecific = 0b10,
    Private = 0b11,
}

impl Class {
    /// Class of the descriptor whose first byte is `b`
    ///
    /// Every byte maps to exactly one class.
    #[inline]
    pub const fn of_tag_byte(b: u8) -> Class {
        match b >> 6 {
            0b00 => Class::Universal,
            0b01 => Class::Application,
            0b10 => Class::ContextSpecific,
            _ => Class::Private,
        }
    }

    /// The class bits, positioned as in a tag byte
    #[inline]
    pub const fn tag_bits(self) -> u8 {
        (self as u8) << 6
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Class::Universal => "UNIVERSAL",
            Class::Application => "APPLICATION",
            Class::ContextSpecific => "CONTEXT-SPECIFIC",
            Class::Private => "PRIVATE",
        };
        f.write_str(s)
    }
}

impl TryFrom<u8> for Class {
    type Error = ClassFromIntError;

    #[inline]
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b00..=0b11 => Ok(Class::of_tag_byte(value << 6)),
            _ => Err(ClassFromIntError(())),
        }
    }
}
