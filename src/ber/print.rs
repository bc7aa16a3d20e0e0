use super::{BerTag, Node};
use crate::integer::IntegerNode;
use crate::oid::ObjectIdentifier;
use std::fmt;
use std::str;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PrettyPrinterFlag {
    /// Print class, constructed flag and tag number before each element
    ShowHeader,
    /// Print raw value bytes of constructed elements too
    ShowValue,
}

/// Indented dump of a node tree
pub struct PrettyNode<'a> {
    node: &'a Node,
    indent: usize,
    inc: usize,

    flags: Vec<PrettyPrinterFlag>,
}

impl Node {
    pub fn as_pretty(&self, indent: usize, increment: usize) -> PrettyNode<'_> {
        PrettyNode {
            node: self,
            indent,
            inc: increment,

            flags: Vec::new(),
        }
    }
}

impl<'a> PrettyNode<'a> {
    pub fn set_flag(&mut self, flag: PrettyPrinterFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    pub fn next_indent<'b>(&self, node: &'b Node) -> PrettyNode<'b> {
        PrettyNode {
            node,
            indent: self.indent + self.inc,
            inc: self.inc,
            flags: self.flags.to_vec(),
        }
    }
}

fn write_text(f: &mut fmt::Formatter<'_>, ty: &str, s: &[u8]) -> fmt::Result {
    match str::from_utf8(s) {
        Ok(b) => writeln!(f, "{}(\"{}\")", ty, b),
        Err(e) => writeln!(f, "{}({}) <error decoding utf8 string: {}>", ty, hex::encode(s), e),
    }
}

impl<'a> fmt::Debug for PrettyNode<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node;
        if self.indent > 0 {
            write!(f, "{:1$}", " ", self.indent)?;
        };
        if self.flags.contains(&PrettyPrinterFlag::ShowHeader) {
            write!(
                f,
                "[c:{}, s:{}, t:{}] ",
                node.class(),
                node.is_constructed() as u8,
                node.tag_number().0
            )?;
        };
        let children = match node.children() {
            Ok(children) => children,
            Err(e) => return writeln!(f, "Invalid({}) <{}>", hex::encode(node.value()), e),
        };
        if node.is_constructed() || !children.is_empty() {
            let ty = if node.is_sequence() {
                "Sequence"
            } else if node.is_set() {
                "Set"
            } else {
                "Constructed"
            };
            write!(f, "{} [{}]", ty, hex::encode(node.tag_descriptor()))?;
            if self.flags.contains(&PrettyPrinterFlag::ShowValue) {
                write!(f, " {}", hex::encode(node.value()))?;
            }
            writeln!(f, " {{")?;
            for child in &children {
                write!(f, "{:?}", self.next_indent(child))?;
            }
            if self.indent > 0 {
                write!(f, "{:1$}", " ", self.indent)?;
            };
            return writeln!(f, "}}");
        }
        let value = node.value();
        if !node.is_universal() {
            return writeln!(
                f,
                "{} [{}] ({})",
                node.class(),
                node.tag_number().0,
                hex::encode(&value)
            );
        }
        match node.tag_number() {
            BerTag::Boolean => writeln!(f, "Boolean({})", value.iter().any(|b| *b != 0)),
            BerTag::Integer => match IntegerNode::as_bigint(node) {
                Some(i) => writeln!(f, "Integer({})", i),
                None => writeln!(f, "Integer(<invalid> {})", hex::encode(&value)),
            },
            BerTag::Null => writeln!(f, "Null"),
            BerTag::Oid => match ObjectIdentifier::as_string(node) {
                Ok(s) => writeln!(f, "OID({})", s),
                Err(e) => writeln!(f, "OID(<{}> {})", e, hex::encode(&value)),
            },
            BerTag::OctetString => writeln!(f, "OctetString({})", hex::encode(&value)),
            BerTag::BitString => writeln!(f, "BitString({})", hex::encode(&value)),
            BerTag::Utf8String => write_text(f, "UTF8String", &value),
            BerTag::PrintableString => write_text(f, "PrintableString", &value),
            BerTag::NumericString => write_text(f, "NumericString", &value),
            BerTag::Ia5String => write_text(f, "IA5String", &value),
            BerTag::UtcTime => write_text(f, "UTCTime", &value),
            BerTag::GeneralizedTime => write_text(f, "GeneralizedTime", &value),
            tag => writeln!(f, "Unknown({:?}, {})", tag, hex::encode(&value)),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node(tag 0x{}, number {}, length {}, encoded length {}",
            hex::encode(self.tag_descriptor()),
            self.tag_number().0,
            self.length()
                .map(|l| l.to_string())
                .unwrap_or_else(|_| "invalid".to_string()),
            self.encoded_len()
        )?;
        match self.child_count() {
            Ok(n) => write!(f, ", children {})", n),
            Err(_) => write!(f, ", children invalid)"),
        }
    }
}
