//! Unmarshal fuzz target: feed arbitrary bytes to every reader.
//! Decoding must not panic; it returns a value or a `CoreError`.
//! Build with: cargo fuzz run unmarshal_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
bondcore::bond_record! {
    #[derive(Debug)]
    struct Leaf("fuzz.Leaf") {
        1 => Required n: i32,
        2 => Optional s: bondcore::WString,
    }
}

#[cfg(fuzzing)]
bondcore::bond_record! {
    #[derive(Debug)]
    struct Node("fuzz.Node"): Leaf {
        1 => Optional name: String,
        2 => Optional leaves: Vec<Leaf>,
        3 => Optional index: std::collections::BTreeMap<u64, Option<Leaf>>,
        4 => Optional bits: std::collections::BTreeSet<u8>,
    }
}

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use bondcore::Record;

    let _ = bondcore::unmarshal::<Node>(data);
    let _ = bondcore::unmarshal_value(data, Node::schema());
    let mut reader = bondcore::CompactReader::new(data);
    let _ = bondcore::deserialize::<Node, _>(&mut reader);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run unmarshal_fuzz");
}
