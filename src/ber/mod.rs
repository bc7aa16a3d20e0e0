//! Basic Encoding Rules (BER) primitives and the node tree

mod class;
mod filter;
mod frozen;
mod header;
mod length;
mod node;
mod parser;
mod print;
mod reader;
mod tag;

pub use crate::ber::class::*;
pub use crate::ber::filter::*;
pub use crate::ber::frozen::*;
pub use crate::ber::header::*;
pub use crate::ber::length::*;
pub use crate::ber::node::*;
pub use crate::ber::parser::*;
pub use crate::ber::print::*;
pub use crate::ber::reader::*;
pub use crate::ber::tag::*;
