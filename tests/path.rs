#[macro_use]
extern crate pretty_assertions;

#[macro_use]
extern crate hex_literal;

use eid_asn1::ber::*;
use eid_asn1::integer::IntegerNode;
use eid_asn1::oid::ObjectIdentifier;
use eid_asn1::path::*;
use std::sync::Arc;

const DESCRIPTION_OID: &str = "0.4.0.127.0.7.3.1.3.1";
const SECTOR_OID: &str = "0.4.0.127.0.7.3.1.3.2";
const AT_ROLE_OID: &str = "0.4.0.127.0.7.3.1.2.2";

fn primitive(tag: &[u8], value: &[u8]) -> Node {
    Node::new(tag, value).expect("node")
}

fn constructed(tag: &[u8], children: Vec<Node>) -> Node {
    let node = Node::new(tag, &[]).expect("node");
    node.add_children(children, None).expect("add");
    node
}

fn oid(s: &str) -> Node {
    ObjectIdentifier::from_string(s).expect("oid")
}

/// Card-verifiable certificate shaped test data
fn certificate() -> Vec<u8> {
    let body = constructed(
        &hex!("7f 4e"),
        vec![
            primitive(&hex!("5f 29"), &[0x00]),
            primitive(&[0x42], b"DETESTeID00001"),
            constructed(
                &hex!("7f 49"),
                vec![oid("0.4.0.127.0.7.2.2.2.2.3"), primitive(&[0x86], &[0x04; 5])],
            ),
            primitive(&hex!("5f 20"), b"DEDEMOPAA00001"),
            constructed(
                &hex!("7f 4c"),
                vec![oid(AT_ROLE_OID), primitive(&[0x53], &hex!("00 00 00 01 10"))],
            ),
            primitive(&hex!("5f 25"), &hex!("01 09 00 03 02 01")),
            primitive(&hex!("5f 24"), &hex!("01 09 00 04 00 01")),
            constructed(
                &[0x65],
                vec![
                    constructed(
                        &[0x73],
                        vec![oid(DESCRIPTION_OID), primitive(&[0x80], &[0x11; 4])],
                    ),
                    constructed(
                        &[0x73],
                        vec![
                            oid(SECTOR_OID),
                            primitive(&[0x80], &[0x22; 4]),
                            primitive(&[0x81], &[0x33; 4]),
                        ],
                    ),
                ],
            ),
        ],
    );
    constructed(
        &hex!("7f 21"),
        vec![body, primitive(&hex!("5f 37"), &[0x55; 8])],
    )
    .encoded()
}

struct Paths {
    body: Arc<PathDescriptor>,
    cpi: Arc<PathDescriptor>,
    car: Arc<PathDescriptor>,
    chat_oid: Arc<PathDescriptor>,
    sector_hash: Arc<PathDescriptor>,
    second_sector_hash: Arc<PathDescriptor>,
    unknown_extension: Arc<PathDescriptor>,
}

fn paths() -> Paths {
    let root = PathDescriptor::builder("CV_CERTIFICATE", &hex!("7f 21"))
        .build()
        .expect("path");
    let body = PathDescriptor::builder("CERTIFICATE_BODY", &hex!("7f 4e"))
        .parent(&root)
        .requirement(Requirement::Required)
        .build()
        .expect("path");
    let cpi = PathDescriptor::builder("CPI", &hex!("5f 29"))
        .parent(&body)
        .build()
        .expect("path");
    let car = PathDescriptor::builder("CAR", &[0x42])
        .parent(&body)
        .build()
        .expect("path");
    let chat = PathDescriptor::builder("CHAT", &hex!("7f 4c"))
        .parent(&body)
        .build()
        .expect("path");
    let chat_oid = PathDescriptor::builder("CHAT_OID", &[0x06])
        .parent(&chat)
        .decoder(DecoderType::ObjectIdentifier)
        .build()
        .expect("path");
    let extensions = PathDescriptor::builder("EXTENSIONS", &[0x65])
        .parent(&body)
        .requirement(Requirement::Optional)
        .build()
        .expect("path");
    let sector = PathDescriptor::builder("SECTOR_EXTENSION", &[0x73])
        .parent(&extensions)
        .predicate(Predicate::has_oid_child(SECTOR_OID))
        .build()
        .expect("path");
    let sector_hash = PathDescriptor::builder("FIRST_SECTOR_HASH", &[0x80])
        .parent(&sector)
        .build()
        .expect("path");
    let second_sector_hash = PathDescriptor::builder("SECOND_SECTOR_HASH", &[0x81])
        .parent(&sector)
        .build()
        .expect("path");
    let unknown = PathDescriptor::builder("UNKNOWN_EXTENSION", &[0x73])
        .parent(&extensions)
        .predicate(Predicate::has_oid_child("1.2.3"))
        .build()
        .expect("path");
    let unknown_extension = PathDescriptor::builder("UNKNOWN_HASH", &[0x80])
        .parent(&unknown)
        .build()
        .expect("path");
    Paths {
        body,
        cpi,
        car,
        chat_oid,
        sector_hash,
        second_sector_hash,
        unknown_extension,
    }
}

#[test]
fn test_resolve_certificate_fields() {
    let cert = decode(&certificate()).expect("decode");
    let p = paths();

    assert_eq!(cert.integer_at(&p.cpi), Ok(Some(0)));
    assert_eq!(
        cert.string_at(&p.car),
        Ok(Some("DETESTeID00001".to_string()))
    );
    let chat_oid = cert.resolve(&p.chat_oid).expect("resolve").expect("found");
    assert_eq!(chat_oid.kind(), NodeKind::ObjectIdentifier);
    assert_eq!(
        ObjectIdentifier::as_string(&chat_oid),
        Ok(AT_ROLE_OID.to_string())
    );
}

#[test]
fn test_resolve_by_predicate() {
    let cert = decode(&certificate()).expect("decode");
    let p = paths();

    let hash = cert.resolve(&p.sector_hash).expect("resolve").expect("found");
    assert_eq!(hash.value(), vec![0x22; 4]);
    let hash = cert
        .resolve(&p.second_sector_hash)
        .expect("resolve")
        .expect("found");
    assert_eq!(hash.value(), vec![0x33; 4]);
    assert_eq!(cert.resolve(&p.unknown_extension), Ok(None));
}

#[test]
fn test_resolve_from_wrong_root() {
    let cert = decode(&certificate()).expect("decode");
    let p = paths();
    let body = cert.resolve(&p.body).expect("resolve").expect("found");
    assert!(body.is_application());
    // paths start at the certificate, not at its body
    assert_eq!(body.resolve(&p.car), Ok(None));
}

#[test]
fn test_resolved_nodes_are_live() {
    let cert = decode(&certificate()).expect("decode");
    let p = paths();
    let car = cert.resolve(&p.car).expect("resolve").expect("found");
    car.set_value_bytes(b"DETESTeID00002", Some(&cert))
        .expect("set value");
    let reparsed = decode(&cert.encoded()).expect("decode");
    assert_eq!(
        reparsed.string_at(&p.car),
        Ok(Some("DETESTeID00002".to_string()))
    );
    assert_eq!(reparsed.integer_at(&p.cpi), Ok(Some(0)));
}

#[test]
fn test_resolve_on_frozen_tree() {
    let frozen = decode(&certificate()).expect("decode").freeze();
    let p = paths();
    let cpi = frozen.resolve(&p.cpi).expect("resolve").expect("found");
    assert_eq!(cpi.value(), vec![0x00]);
    assert!(cpi.as_ref().is_immutable());
    // implicitly tagged, so not an INTEGER node
    assert_eq!(IntegerNode::as_integer(cpi.as_ref()), None);
    assert_eq!(frozen.as_ref().integer_at(&p.cpi), Ok(Some(0)));
}
