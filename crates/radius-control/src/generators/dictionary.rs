//! Local dictionary declaring the integer reply attributes we emit

use crate::dictionary::LOCAL_ATTRIBUTES;
use crate::render::GENERATED_HEADER;
use std::fmt::Write;

pub fn render() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", GENERATED_HEADER);
    for (name, number) in LOCAL_ATTRIBUTES {
        let _ = writeln!(out, "ATTRIBUTE\t{}\t{}\tinteger", name, number);
    }
    out
}
