//! Process-scan orchestrator (§4.8, component J): runs the module and
//! working-set scans under independent failure domains and merges them into
//! one process report.
//!
//! Grounded on `ProcessScanner::scanRemote` (original_source/scanners/scanner.cpp).
//! The source's `!modulesScanned && !modulesScanned` double-check is a bug;
//! this implementation checks both phases, per SPEC_FULL.md §9's recorded
//! decision.

use crate::config::ScanArgs;
use crate::header::ExecutableFormat;
use crate::modenum::scan_modules;
use crate::os::TargetProcess;
use crate::report::ProcessReport;
use crate::workingset::scan_working_set;
use std::collections::HashMap;
use std::fmt;

/// The sole error variant that can escape `scan_remote` (§7 "Fatal").
#[derive(Debug, Clone)]
pub enum ScanError {
    Fatal(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Fatal(msg) => write!(f, "scan failed: {msg}"),
        }
    }
}

impl std::error::Error for ScanError {}

/// Runs module enumeration then the working-set walk under independent
/// failure domains (§4.8). `scan_working_set` panics on a `QueryWorkingSet`
/// failure (§4.7), which `catch_unwind` turns into a phase failure here;
/// `Fatal` is returned only when both phases fail.
pub fn scan_remote<P, F>(proc: &P, format: &F, args: &ScanArgs) -> Result<ProcessReport, ScanError>
where
    P: TargetProcess + ?Sized,
    F: ExecutableFormat + ?Sized,
{
    let mut report = ProcessReport::new(args.pid);
    if args.imp_rec {
        report.exports_map = Some(HashMap::new());
    }

    let modules_scanned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        scan_modules(proc, format, args, &mut report);
    }))
    .is_ok();

    let working_set_scanned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        scan_working_set(proc, format, args.deep_scan, &mut report);
    }))
    .is_ok();

    if !modules_scanned && !working_set_scanned {
        return Err(ScanError::Fatal(
            "both module scan and working-set scan failed".to_string(),
        ));
    }

    Ok(report)
}
