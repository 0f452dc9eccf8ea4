//! Memory-page scanner (§4.5, component E): classifies one anonymous or
//! mapped page as ignore / shellcode / planted executable-format module.
//!
//! Grounded on `MemPageScanner::scanRemote` (original_source/scanners/mempage_scanner.cpp).

use crate::header::{find_pe_header, ExecutableFormat};
use crate::page::PageDescriptor;
use crate::protect::MappingType;
use crate::remote_module::RemoteModuleDescriptor;
use crate::report::{Finding, ScanStatus};
use crate::shellcode::is_shellcode;
use crate::os::TargetProcess;

/// Classifies `page`, mutating it in place to fill OS-queried fields if
/// necessary. Returns `Some(Finding::MemPageScan)` for a manually-loaded
/// module header or `None` for anything uninteresting (image-mapped pages,
/// already-accounted-for listed-module ranges, plain data, shellcode —
/// shellcode only logs, per §4.4's advisory return).
pub fn scan<P, F>(page: &mut PageDescriptor, proc: &P, format: &F, deep_scan: bool) -> Option<Finding>
where
    P: TargetProcess + ?Sized,
    F: ExecutableFormat + ?Sized,
{
    if !page.fill_info(proc) {
        return None;
    }

    if page.mapping_type == MappingType::Image {
        return None;
    }

    let is_any_exec = page.is_any_executable();
    if !is_any_exec && page.is_listed_module {
        return None;
    }

    if let Some(header_addr) = find_pe_header(page, proc, format, deep_scan) {
        let remote = RemoteModuleDescriptor::new(header_addr);
        let has_exec_section = remote.has_executable_section(proc, format);
        let status = if has_exec_section {
            ScanStatus::Suspicious
        } else {
            ScanStatus::NotSuspicious
        };
        return Some(Finding::MemPageScan {
            base: page.start_va,
            status,
            is_executable: is_any_exec,
            is_manually_loaded: !page.is_listed_module,
            protection: page.current_protect,
        });
    }

    if is_any_exec {
        let _ = is_shellcode(page, proc);
    }
    None
}
