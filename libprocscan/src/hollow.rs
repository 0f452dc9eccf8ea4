//! Hollowing scanner (§4.6.1): compares a module's on-disk header against
//! what's actually mapped at its remote base address.
//!
//! Grounded on `ProcessScanner::scanForHollows` (original_source/scanners/scanner.cpp),
//! reworked around the `ExecutableFormat`/`TargetProcess` collaborators.

use crate::header::MAX_HEADER_SIZE;
use crate::header::ExecutableFormat;
use crate::module::ModuleDescriptor;
use crate::os::TargetProcess;
use crate::remote_read::read_remote;
use crate::report::{Finding, ScanStatus};

/// Compares the on-disk original's DOS+NT header region against what is
/// mapped at `module.base_address`. Any byte mismatch over the shared header
/// length is suspicious; `arch_mismatch` is set only when the two machine
/// fields genuinely disagree, never on a bare byte difference.
pub fn scan_for_hollows<P, F>(module: &ModuleDescriptor, proc: &P, format: &F) -> Finding
where
    P: TargetProcess + ?Sized,
    F: ExecutableFormat + ?Sized,
{
    let original = match module.loaded_original.as_deref() {
        Some(o) if !o.is_empty() => o,
        _ => {
            return Finding::HeadersScan {
                module: module.handle,
                status: ScanStatus::Error,
                arch_mismatch: false,
            };
        }
    };

    let header_len = MAX_HEADER_SIZE.min(original.len());
    let mut remote_buf = vec![0u8; header_len];
    if !read_remote(proc, module.base_address, &mut remote_buf) {
        return Finding::HeadersScan {
            module: module.handle,
            status: ScanStatus::Error,
            arch_mismatch: false,
        };
    }

    let orig_machine = format.machine(original);
    let remote_machine = format.machine(&remote_buf);
    let arch_mismatch = matches!((orig_machine, remote_machine), (Some(a), Some(b)) if a != b);

    let bytes_differ = original[..header_len] != remote_buf[..];
    let status = if arch_mismatch || orig_machine.is_none() || remote_machine.is_none() || bytes_differ {
        ScanStatus::Suspicious
    } else {
        ScanStatus::NotSuspicious
    };

    Finding::HeadersScan {
        module: module.handle,
        status,
        arch_mismatch,
    }
}
