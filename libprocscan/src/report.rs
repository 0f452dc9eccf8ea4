//! Finding reports and the process report they accumulate into (§3).

use crate::os::ModuleHandle;
use crate::protect::Protection;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    NotSuspicious,
    Suspicious,
    Error,
}

/// One inline code modification detected by the hook scanner (§4.6.2).
#[derive(Debug, Clone)]
pub struct Modification {
    pub offset: usize,
    pub original_byte: u8,
    pub patched_byte: u8,
}

/// A tagged variant, one per detected region/module (§3).
#[derive(Debug, Clone)]
pub enum Finding {
    HeadersScan {
        module: ModuleHandle,
        status: ScanStatus,
        arch_mismatch: bool,
    },
    CodeScan {
        module: ModuleHandle,
        status: ScanStatus,
        modifications: Vec<Modification>,
    },
    MemPageScan {
        base: usize,
        status: ScanStatus,
        is_executable: bool,
        is_manually_loaded: bool,
        protection: Protection,
    },
    UnreachableModule {
        handle: ModuleHandle,
    },
}

impl Finding {
    pub fn status(&self) -> ScanStatus {
        match self {
            Finding::HeadersScan { status, .. } => *status,
            Finding::CodeScan { status, .. } => *status,
            Finding::MemPageScan { status, .. } => *status,
            Finding::UnreachableModule { .. } => ScanStatus::Suspicious,
        }
    }

    pub fn module_handle(&self) -> Option<ModuleHandle> {
        match self {
            Finding::HeadersScan { module, .. } => Some(*module),
            Finding::CodeScan { module, .. } => Some(*module),
            Finding::UnreachableModule { handle } => Some(*handle),
            Finding::MemPageScan { .. } => None,
        }
    }
}

/// Summary tally; the single source of truth for per-category counts (§3).
#[derive(Debug, Clone, Copy, Default)]
pub struct Summary {
    pub scanned: u32,
    pub errors: u32,
    pub skipped: u32,
    pub detached: u32,
    pub replaced: u32,
    pub hooked: u32,
    pub implanted: u32,
}

/// Owns the findings list and the summary tally for one `scan_remote`
/// invocation. The findings list is append-only.
#[derive(Debug, Default)]
pub struct ProcessReport {
    pub pid: u32,
    findings: Vec<Finding>,
    pub summary: Summary,
    pub exports_map: Option<HashMap<String, usize>>,
}

impl ProcessReport {
    pub fn new(pid: u32) -> Self {
        ProcessReport {
            pid,
            findings: Vec::new(),
            summary: Summary::default(),
            exports_map: None,
        }
    }

    pub fn append(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// True if a listed module was recorded at exactly `base_address` —
    /// used by the working-set scanner to suppress double-reporting (§3
    /// invariant, §4.7 step 5).
    pub fn has_module_at(&self, base_address: usize) -> bool {
        self.findings.iter().any(|f| match f {
            Finding::HeadersScan { module, .. } => *module == base_address,
            Finding::UnreachableModule { handle } => *handle == base_address,
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_module_at_matches_headers_scan_and_unreachable() {
        let mut report = ProcessReport::new(1);
        report.append(Finding::HeadersScan {
            module: 0x400000,
            status: ScanStatus::NotSuspicious,
            arch_mismatch: false,
        });
        report.append(Finding::UnreachableModule { handle: 0x500000 });
        assert!(report.has_module_at(0x400000));
        assert!(report.has_module_at(0x500000));
        assert!(!report.has_module_at(0x600000));
    }

    #[test]
    fn mem_page_scan_never_matches_has_module_at() {
        let mut report = ProcessReport::new(1);
        report.append(Finding::MemPageScan {
            base: 0x400000,
            status: ScanStatus::Suspicious,
            is_executable: true,
            is_manually_loaded: true,
            protection: Protection::NONE,
        });
        assert!(!report.has_module_at(0x400000));
    }
}
