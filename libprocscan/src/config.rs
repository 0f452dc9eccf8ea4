//! Scan configuration.

/// Which modules `enum_modules` should return, mirroring the
/// `LIST_MODULES_32BIT` / `LIST_MODULES_64BIT` / `LIST_MODULES_ALL` filters
/// `EnumProcessModulesEx` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModulesFilter {
    #[default]
    All,
    X86Only,
    X64Only,
}

/// Configuration for one `scan_remote` invocation.
#[derive(Debug, Clone)]
pub struct ScanArgs {
    pub pid: u32,
    pub modules_filter: ModulesFilter,
    /// Suppress per-module progress printing (counters/findings are never suppressed).
    pub quiet: bool,
    /// Skip the hook scan (§4.6 step 7).
    pub no_hooks: bool,
    /// Build the exports map while scanning modules.
    pub imp_rec: bool,
    /// Byte-wise header search instead of offset-0-only (§4.3).
    pub deep_scan: bool,
}

impl ScanArgs {
    pub fn new(pid: u32) -> Self {
        ScanArgs {
            pid,
            modules_filter: ModulesFilter::All,
            quiet: false,
            no_hooks: false,
            imp_rec: false,
            deep_scan: false,
        }
    }
}
