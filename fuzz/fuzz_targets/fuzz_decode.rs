#![no_main]
use libfuzzer_sys::fuzz_target;

fn walk(node: &eid_asn1::Node) {
    if let Ok(children) = node.children() {
        for child in children {
            walk(&child);
        }
    }
}

fuzz_target!(|data: &[u8]| {
    if let Ok(node) = eid_asn1::decode(data) {
        let encoded = node.encoded();
        walk(&node);
        assert_eq!(node.encoded(), encoded);
    }
});
