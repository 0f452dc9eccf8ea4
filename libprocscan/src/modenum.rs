//! Module enumerator and per-module scan (§4.6, component H).
//!
//! Grounded on `ProcessScanner::enumModules`/`scanModules`
//! (original_source/scanners/scanner.cpp).

use crate::config::{ModulesFilter, ScanArgs};
use crate::exports;
use crate::header::ExecutableFormat;
use crate::hollow::scan_for_hollows;
use crate::hook::scan_for_hooks;
use crate::module::ModuleDescriptor;
use crate::os::TargetProcess;
use crate::report::{Finding, ProcessReport, ScanStatus};
use owo_colors::OwoColorize;

/// Fixed capacity matching the original's enumeration buffer; exceeding it
/// is treated as an enumeration error rather than silently truncating.
const MAX_MODULES: usize = 1024;

fn enum_modules<P: TargetProcess + ?Sized>(proc: &P, filter: ModulesFilter, report: &mut ProcessReport) -> Vec<crate::os::ModuleHandle> {
    match proc.enum_modules(filter) {
        Ok(handles) if handles.len() <= MAX_MODULES => handles,
        Ok(_) => {
            report.summary.errors += 1;
            Vec::new()
        }
        Err(e) => {
            println!("{} module enumeration failed: {}", "[warn]".yellow(), e);
            report.summary.errors += 1;
            Vec::new()
        }
    }
}

/// Drives §4.6 steps 1-8 for every handle returned by `enum_modules`.
pub fn scan_modules<P, F>(proc: &P, format: &F, args: &ScanArgs, report: &mut ProcessReport)
where
    P: TargetProcess + ?Sized,
    F: ExecutableFormat + ?Sized,
{
    let handles = enum_modules(proc, args.modules_filter, report);

    for handle in handles {
        report.summary.scanned += 1;

        let info = match proc.module_info(handle) {
            Ok(info) => info,
            Err(_) => {
                report.append(Finding::UnreachableModule { handle });
                report.summary.detached += 1;
                continue;
            }
        };

        if !args.quiet {
            println!("{} scanning: {}", "[*]".cyan(), info.path);
        }

        let mut module = ModuleDescriptor::new(handle, info.base_address, info.path.clone());
        if !module.load_original() {
            report.append(Finding::UnreachableModule { handle });
            report.summary.detached += 1;
            continue;
        }

        if module.is_dotnet {
            report.summary.skipped += 1;
            continue;
        }

        let mut finding = scan_for_hollows(&module, proc, format);
        if let Finding::HeadersScan { arch_mismatch: true, .. } = finding {
            if module.reload_alternate_arch() {
                finding = scan_for_hollows(&module, proc, format);
            }
        }

        let hollowed = finding.status() == ScanStatus::Suspicious;
        if hollowed {
            report.summary.replaced += 1;
        }
        let scan_errored = finding.status() == ScanStatus::Error;
        report.append(finding);

        if scan_errored {
            report.summary.errors += 1;
            continue;
        }

        if args.imp_rec {
            if let Some(map) = report.exports_map.as_mut() {
                register_exports(map, &module, proc, format);
            }
        }

        if args.no_hooks || hollowed {
            continue;
        }

        let code_scan = scan_for_hooks(&module, proc, 0, crate::header::MAX_HEADER_SIZE);
        if code_scan.status() == ScanStatus::Suspicious {
            report.summary.hooked += 1;
        }
        report.append(code_scan);
    }
}

/// Registers every export the on-disk original exposes under the remote
/// base address, via the §3.1 `ExportsMap` collaborator.
fn register_exports<P, F>(map: &mut std::collections::HashMap<String, usize>, module: &ModuleDescriptor, _proc: &P, _format: &F)
where
    P: TargetProcess + ?Sized,
    F: ExecutableFormat + ?Sized,
{
    let Some(bytes) = module.loaded_original.as_deref() else {
        return;
    };
    let Ok(pe) = goblin::pe::PE::parse(bytes) else {
        return;
    };
    for export in &pe.exports {
        let Some(name) = export.name else { continue };
        exports::add(map, module.file_name(), name, module.base_address, export.rva as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::{ModuleInfo, OsError, PageInfo, WsEntry};

    struct EmptyTarget {
        modules: Vec<(crate::os::ModuleHandle, String)>,
    }
    impl TargetProcess for EmptyTarget {
        fn virtual_query(&self, _addr: usize) -> Result<Option<PageInfo>, OsError> {
            Ok(None)
        }
        fn read_remote_raw(&self, _addr: usize, _buf: &mut [u8]) -> usize {
            0
        }
        fn enum_modules(&self, _filter: ModulesFilter) -> Result<Vec<crate::os::ModuleHandle>, OsError> {
            Ok(self.modules.iter().map(|(h, _)| *h).collect())
        }
        fn module_info(&self, handle: crate::os::ModuleHandle) -> Result<ModuleInfo, OsError> {
            self.modules
                .iter()
                .find(|(h, _)| *h == handle)
                .map(|(h, path)| ModuleInfo {
                    base_address: *h,
                    size: 0x1000,
                    path: path.clone(),
                })
                .ok_or(OsError::Unsupported("module_info"))
        }
        fn query_working_set(&self) -> Result<Vec<WsEntry>, OsError> {
            Ok(vec![])
        }
        fn page_size(&self) -> usize {
            4096
        }
        fn pid(&self) -> u32 {
            1
        }
    }

    struct NullFormat;
    impl ExecutableFormat for NullFormat {
        fn locate_nt_header(&self, _buf: &[u8]) -> Option<usize> {
            None
        }
        fn has_executable_section(&self, _image: &[u8]) -> bool {
            false
        }
        fn machine(&self, _buf: &[u8]) -> Option<u16> {
            None
        }
    }

    #[test]
    fn unreachable_module_file_is_recorded_as_detached() {
        let proc = EmptyTarget {
            modules: vec![(0x1000, "/nonexistent/path/mod.dll".to_string())],
        };
        let args = ScanArgs::new(1);
        let mut report = ProcessReport::new(1);
        scan_modules(&proc, &NullFormat, &args, &mut report);
        assert_eq!(report.summary.scanned, 1);
        assert_eq!(report.summary.detached, 1);
        assert!(report.has_module_at(0x1000));
    }

    #[test]
    fn enumeration_failure_increments_errors_and_scans_nothing() {
        struct Failing;
        impl TargetProcess for Failing {
            fn virtual_query(&self, _addr: usize) -> Result<Option<PageInfo>, OsError> {
                Ok(None)
            }
            fn read_remote_raw(&self, _addr: usize, _buf: &mut [u8]) -> usize {
                0
            }
            fn enum_modules(&self, _filter: ModulesFilter) -> Result<Vec<crate::os::ModuleHandle>, OsError> {
                Err(OsError::Os("denied".into()))
            }
            fn module_info(&self, _handle: crate::os::ModuleHandle) -> Result<ModuleInfo, OsError> {
                Err(OsError::Unsupported("module_info"))
            }
            fn query_working_set(&self) -> Result<Vec<WsEntry>, OsError> {
                Ok(vec![])
            }
            fn page_size(&self) -> usize {
                4096
            }
            fn pid(&self) -> u32 {
                1
            }
        }
        let args = ScanArgs::new(1);
        let mut report = ProcessReport::new(1);
        scan_modules(&Failing, &NullFormat, &args, &mut report);
        assert_eq!(report.summary.scanned, 0);
        assert_eq!(report.summary.errors, 1);
    }

    /// A module whose on-disk original loads fine but whose remote header is
    /// unreadable must not fall through to exports/hook scanning (§4.6 step 4,
    /// `original_source/scanners/scanner.cpp:210-213`).
    #[test]
    fn hollow_scan_error_is_counted_and_skips_exports_and_hooks() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().expect("create temp module file");
        file.write_all(&[0xAB; 64]).expect("write temp module bytes");
        let path = file.path().to_str().expect("utf8 temp path").to_string();

        let proc = EmptyTarget { modules: vec![(0x400000, path)] };
        let mut args = ScanArgs::new(1);
        args.imp_rec = true;
        let mut report = ProcessReport::new(1);
        report.exports_map = Some(std::collections::HashMap::new());

        scan_modules(&proc, &NullFormat, &args, &mut report);

        assert_eq!(report.summary.scanned, 1);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.replaced, 0);
        assert_eq!(report.summary.hooked, 0);
        assert!(report.exports_map.as_ref().unwrap().is_empty());
        assert_eq!(report.findings().len(), 1); // the HeadersScan(Error) only, no CodeScan
        assert!(!report.findings().iter().any(|f| matches!(f, Finding::CodeScan { .. })));
    }
}
