#[macro_use]
extern crate pretty_assertions;

#[macro_use]
extern crate hex_literal;

use eid_asn1::ber::*;
use eid_asn1::error::BerError;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reader recording whether it was dropped
struct TrackedReader {
    inner: Cursor<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl Read for TrackedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn tracked(data: &[u8]) -> (TrackedReader, Arc<AtomicBool>) {
    let closed = Arc::new(AtomicBool::new(false));
    let reader = TrackedReader {
        inner: Cursor::new(data.to_vec()),
        closed: Arc::clone(&closed),
    };
    (reader, closed)
}

#[test]
fn test_stream_closed_when_owned() {
    let (reader, closed) = tracked(&hex!("30 03 02 01 05"));
    let node = decode_reader(reader).expect("decode");
    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(node.child_count(), Ok(1));
}

#[test]
fn test_stream_closed_on_failure() {
    let (reader, closed) = tracked(&hex!("30 05 02 01"));
    assert_eq!(decode_reader(reader), Err(BerError::TruncatedInput));
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn test_stream_kept_open_when_borrowed() {
    let (mut reader, closed) = tracked(&hex!("02 01 05 02 01 06"));
    let first = Node::from_reader(&mut reader).expect("first");
    let second = Node::from_reader(&mut reader).expect("second");
    assert!(!closed.load(Ordering::SeqCst));
    assert_eq!(first.value(), vec![0x05]);
    assert_eq!(second.value(), vec![0x06]);
}

#[test]
fn test_stream_matches_slice_decoding() {
    let data = hex!("7f 21 80 7f 4e 03 5f 29 00 5f 37 02 aa bb 00 00");
    let from_stream = decode_reader(&data[..]).expect("stream");
    let from_slice = decode(&data).expect("slice");
    assert_eq!(from_stream, from_slice);
    assert_eq!(from_stream.encoded(), data.to_vec());
    assert_eq!(from_stream.child_count(), Ok(2));
}

#[test]
fn test_stream_read_error() {
    struct Failing;
    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }
    assert_eq!(
        decode_reader(Failing),
        Err(BerError::Io(io::ErrorKind::ConnectionReset))
    );
}

#[test]
fn test_stream_large_indefinite_values() {
    const CHILDREN: usize = 20_000;
    let mut data = vec![0x30, 0x80];
    for i in 0..CHILDREN {
        data.extend_from_slice(&[0x02, 0x01, (i % 100) as u8]);
    }
    // primitive indefinite value of 64 KiB
    data.extend_from_slice(&[0x04, 0x80]);
    data.extend(std::iter::repeat(0xab).take(64 * 1024));
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    let from_stream = decode_reader(io::BufReader::new(&data[..])).expect("stream");
    assert_eq!(from_stream.encoded(), data);
    let children = from_stream.children().expect("children");
    assert_eq!(children.len(), CHILDREN + 1);
    assert_eq!(children[CHILDREN].value().len(), 64 * 1024);
    assert_eq!(from_stream, decode(&data).expect("slice"));
}
