use eid_asn1::ber::*;
use std::env;
use std::fs::File;
use std::io;

pub fn main() -> io::Result<()> {
    let mut show_header = false;
    for file_name in env::args().skip(1) {
        if file_name == "--header" {
            show_header = true;
            continue;
        }
        let file = File::open(&file_name)?;
        let node = match decode_reader(io::BufReader::new(file)) {
            Ok(node) => node,
            Err(e) => {
                eprintln!("{}: could not decode BER data: {}", file_name, e);
                continue;
            }
        };
        println!("{}: {}", file_name, node);
        let mut pretty = node.as_pretty(0, 2);
        if show_header {
            pretty.set_flag(PrettyPrinterFlag::ShowHeader);
        }
        println!("{:?}", pretty);
    }
    Ok(())
}
