//! Working-set scanner (§4.7, component I): walks every resident page,
//! suppressing pages already covered by listed modules.
//!
//! Grounded on `ProcessScanner::scanWorkingSet` (original_source/scanners/scanner.cpp).

use crate::header::ExecutableFormat;
use crate::mempage_scanner;
use crate::os::TargetProcess;
use crate::page::PageDescriptor;
use crate::report::{Finding, ProcessReport, ScanStatus};

/// §4.7: scanning one's own working set perturbs what is being scanned, so
/// the scan is skipped outright for a self-targeted process.
///
/// A `QueryWorkingSet` failure is a phase failure (§4.7 steps 2/4, §7): it
/// increments the error counter for bookkeeping, then panics so the
/// orchestrator's `catch_unwind` around this call observes it and can fold
/// it into `ScanError::Fatal` alongside a failed module-scan phase (§4.8).
pub fn scan_working_set<P, F>(proc: &P, format: &F, deep_scan: bool, report: &mut ProcessReport)
where
    P: TargetProcess + ?Sized,
    F: ExecutableFormat + ?Sized,
{
    if proc.is_current_process() {
        return;
    }

    let page_size = proc.page_size();

    let entries = match proc.query_working_set() {
        Ok(entries) => entries,
        Err(e) => {
            report.summary.errors += 1;
            panic!("working set query failed: {e}");
        }
    };

    for entry in entries {
        let page_addr = entry.virtual_page * page_size;
        let is_listed_module = report.has_module_at(page_addr);

        let mut page = PageDescriptor::new(page_addr, page_size, entry.protection);
        page.is_listed_module = is_listed_module;

        if let Some(finding) = mempage_scanner::scan(&mut page, proc, format, deep_scan) {
            if let Finding::MemPageScan { status, is_manually_loaded, .. } = &finding {
                if *status == ScanStatus::Suspicious && *is_manually_loaded {
                    report.summary.implanted += 1;
                }
            }
            report.append(finding);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModulesFilter;
    use crate::header::MAX_HEADER_SIZE;
    use crate::os::{ModuleHandle, ModuleInfo, OsError, PageInfo, WsEntry};
    use crate::protect::{MappingType, Protection};

    struct FixedTarget {
        pid: u32,
        ws: Vec<WsEntry>,
        page_query: Option<PageInfo>,
        data: Vec<u8>,
    }

    impl TargetProcess for FixedTarget {
        fn virtual_query(&self, _addr: usize) -> Result<Option<PageInfo>, OsError> {
            Ok(self.page_query.clone())
        }
        fn read_remote_raw(&self, _addr: usize, buf: &mut [u8]) -> usize {
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            buf.len()
        }
        fn enum_modules(&self, _filter: ModulesFilter) -> Result<Vec<ModuleHandle>, OsError> {
            Ok(vec![])
        }
        fn module_info(&self, _handle: ModuleHandle) -> Result<ModuleInfo, OsError> {
            Err(OsError::Unsupported("module_info"))
        }
        fn query_working_set(&self) -> Result<Vec<WsEntry>, OsError> {
            Ok(self.ws.clone())
        }
        fn page_size(&self) -> usize {
            4096
        }
        fn pid(&self) -> u32 {
            self.pid
        }
    }

    struct MarkerFormat;
    impl ExecutableFormat for MarkerFormat {
        fn locate_nt_header(&self, buf: &[u8]) -> Option<usize> {
            if buf.first() == Some(&0x99) { Some(0) } else { None }
        }
        fn has_executable_section(&self, image: &[u8]) -> bool {
            image.get(1) == Some(&0x01)
        }
        fn machine(&self, _buf: &[u8]) -> Option<u16> {
            None
        }
    }

    #[test]
    fn self_scan_is_skipped_entirely() {
        let proc = FixedTarget {
            pid: std::process::id(),
            ws: vec![WsEntry { virtual_page: 1, protection: Protection::NONE }],
            page_query: None,
            data: vec![],
        };
        let mut report = ProcessReport::new(proc.pid);
        scan_working_set(&proc, &MarkerFormat, false, &mut report);
        assert!(report.findings().is_empty());
        assert_eq!(report.summary.errors, 0);
    }

    #[test]
    fn implanted_module_increments_counter() {
        let mut exec_protect = Protection::NONE;
        exec_protect.execute = true;
        let mut data = vec![0u8; 2 * MAX_HEADER_SIZE];
        data[0] = 0x99;
        data[1] = 0x01;

        let proc = FixedTarget {
            pid: 999,
            ws: vec![WsEntry { virtual_page: 0x2000, protection: exec_protect }],
            page_query: Some(PageInfo {
                initial_protect: exec_protect,
                current_protect: exec_protect,
                mapping_type: MappingType::Private,
                region_start: 0x2000000,
                region_end: 0x2001000,
            }),
            data,
        };
        let mut report = ProcessReport::new(999);
        scan_working_set(&proc, &MarkerFormat, false, &mut report);
        assert_eq!(report.summary.implanted, 1);
        assert_eq!(report.findings().len(), 1);
    }

    struct Failing;
    impl TargetProcess for Failing {
        fn virtual_query(&self, _addr: usize) -> Result<Option<PageInfo>, OsError> {
            Ok(None)
        }
        fn read_remote_raw(&self, _addr: usize, _buf: &mut [u8]) -> usize {
            0
        }
        fn enum_modules(&self, _filter: ModulesFilter) -> Result<Vec<ModuleHandle>, OsError> {
            Ok(vec![])
        }
        fn module_info(&self, _handle: ModuleHandle) -> Result<ModuleInfo, OsError> {
            Err(OsError::Unsupported("module_info"))
        }
        fn query_working_set(&self) -> Result<Vec<WsEntry>, OsError> {
            Err(OsError::Os("denied".into()))
        }
        fn page_size(&self) -> usize {
            4096
        }
        fn pid(&self) -> u32 {
            12345
        }
    }

    /// A `QueryWorkingSet` failure must escape as a phase failure (§4.7,
    /// §7), not silently resolve into an empty, successful scan.
    #[test]
    #[should_panic(expected = "working set query failed")]
    fn query_failure_panics_as_a_phase_failure() {
        let mut report = ProcessReport::new(12345);
        scan_working_set(&Failing, &MarkerFormat, false, &mut report);
    }

    #[test]
    fn query_failure_still_increments_errors_before_panicking() {
        let mut report = ProcessReport::new(12345);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scan_working_set(&Failing, &MarkerFormat, false, &mut report);
        }));
        assert!(result.is_err());
        assert_eq!(report.summary.errors, 1);
        assert!(report.findings().is_empty());
    }
}
