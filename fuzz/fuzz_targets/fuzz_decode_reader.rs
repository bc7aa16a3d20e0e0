#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let from_stream = eid_asn1::decode_reader(data);
    let from_slice = eid_asn1::decode(data);
    assert_eq!(from_stream.is_ok(), from_slice.is_ok());
});
