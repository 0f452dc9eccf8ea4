//! Code-section hook scanner (§4.6.2): diffs a module's on-disk `.text`
//! against what's actually executing, looking for inline-hook style jumps.
//!
//! Grounded on `ProcessScanner::scanForHooks` (original_source/scanners/scanner.cpp)
//! and the detour-detection idiom in `other_examples/iat_unhook_sample`.

use crate::diff::diff_bytes;
use crate::module::ModuleDescriptor;
use crate::os::TargetProcess;
use crate::remote_read::read_remote;
use crate::report::{Finding, Modification, ScanStatus};

/// x86/x64 opcodes that redirect control flow when planted at the start of
/// a function — the textbook inline-hook signature.
const JMP_REL32: u8 = 0xE9;
const CALL_REL32: u8 = 0xE8;
const JMP_FAR_INDIRECT_MODRM: u8 = 0xFF; // jmp/call [mem], e.g. FF 25 (rip-relative jmp)

fn looks_like_hook_opcode(byte: u8) -> bool {
    matches!(byte, JMP_REL32 | CALL_REL32 | JMP_FAR_INDIRECT_MODRM)
}

/// Compares `code_len` bytes of the module's on-disk code section (at
/// `code_offset` into the original image) against the same region read live
/// from `module.base_address + code_offset`. Any modification is recorded;
/// the finding is `Suspicious` only when at least one modified byte is a
/// hook-opcode byte, matching the spec's "planted jump," not "any drift."
pub fn scan_for_hooks<P>(module: &ModuleDescriptor, proc: &P, code_offset: usize, code_len: usize) -> Finding
where
    P: TargetProcess + ?Sized,
{
    let original = match module.loaded_original.as_deref() {
        Some(o) if o.len() >= code_offset + code_len => &o[code_offset..code_offset + code_len],
        _ => {
            return Finding::CodeScan {
                module: module.handle,
                status: ScanStatus::Error,
                modifications: Vec::new(),
            };
        }
    };

    let mut remote_buf = vec![0u8; code_len];
    if !read_remote(proc, module.base_address + code_offset, &mut remote_buf) {
        return Finding::CodeScan {
            module: module.handle,
            status: ScanStatus::Error,
            modifications: Vec::new(),
        };
    }

    let changes = diff_bytes(original, &remote_buf);
    let modifications: Vec<Modification> = changes
        .iter()
        .map(|c| Modification {
            offset: code_offset + c.offset,
            original_byte: c.old,
            patched_byte: c.new,
        })
        .collect();

    let status = if changes.iter().any(|c| looks_like_hook_opcode(c.new)) {
        ScanStatus::Suspicious
    } else if !modifications.is_empty() {
        // Bytes differ but don't match a known hook shape: still worth
        // recording, but not escalated to suspicious.
        ScanStatus::NotSuspicious
    } else {
        ScanStatus::NotSuspicious
    };

    Finding::CodeScan {
        module: module.handle,
        status,
        modifications,
    }
}
