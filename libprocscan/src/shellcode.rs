//! Shellcode heuristic (§4.4).
//!
//! The return value is advisory per the design notes (§9): the logged line is
//! the record of record, and callers must not gate behavior on the return.
//! Unlike the source this is ported from, the return type is the precise
//! `ShellcodeHit` rather than a bare `bool` (§9, "decision: return the
//! precise enum").

use crate::os::TargetProcess;
use crate::page::PageDescriptor;
use crate::protect::MappingType;
use crate::remote_read::read_remote;
use owo_colors::OwoColorize;

const PROLOG_32: [u8; 3] = [0x55, 0x8B, 0xEC];
const PROLOG_64: [u8; 6] = [0x40, 0x53, 0x48, 0x83, 0xEC, 0x20];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellcodeHit {
    None,
    Prolog32,
    Prolog64,
}

/// Scans `page` for a known function-prolog byte pattern. Only private pages
/// are considered (§4.4 gate) — anything else short-circuits to `None`.
pub fn is_shellcode<P: TargetProcess + ?Sized>(page: &PageDescriptor, proc: &P) -> ShellcodeHit {
    if page.mapping_type != MappingType::Private {
        return ShellcodeHit::None;
    }

    let mut buf = vec![0u8; crate::header::MAX_HEADER_SIZE];
    if !read_remote(proc, page.start_va, &mut buf) {
        return ShellcodeHit::None;
    }

    for i in 0..buf.len() {
        if buf[i..].starts_with(&PROLOG_32) {
            println!(
                "{} detected 32-bit shellcode at: {:016x}",
                "[!]".bright_red(),
                page.region_start
            );
            return ShellcodeHit::Prolog32;
        }
        if buf[i..].starts_with(&PROLOG_64) {
            println!(
                "{} detected 64-bit shellcode at: {:016x}",
                "[!]".bright_red(),
                page.region_start
            );
            return ShellcodeHit::Prolog64;
        }
    }
    ShellcodeHit::None
}
