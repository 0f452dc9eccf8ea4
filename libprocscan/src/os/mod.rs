//! OS collaborator contract.
//!
//! The engine (mempage scanner, module enumerator, working-set scanner,
//! orchestrator) is generic over this trait instead of calling Windows APIs
//! directly, so it can be driven against a real target or a test double.

#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
pub mod linux;

use crate::config::ModulesFilter;
use crate::protect::{MappingType, Protection};
use std::fmt;

/// A module handle as reported by module enumeration. On Windows this is the
/// `HMODULE`, which for a remote process is numerically its load base address.
pub type ModuleHandle = usize;

#[derive(Debug, Clone)]
pub enum OsError {
    /// The underlying OS call failed; message is the OS-provided description.
    Os(String),
    /// This operation has no meaningful implementation on the current platform.
    Unsupported(&'static str),
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsError::Os(msg) => write!(f, "{msg}"),
            OsError::Unsupported(what) => write!(f, "unsupported on this platform: {what}"),
        }
    }
}

impl std::error::Error for OsError {}

/// Result of `VirtualQueryEx` for one address, already translated into the
/// cross-platform protection/type model.
#[derive(Debug, Clone)]
pub struct PageInfo {
    pub initial_protect: Protection,
    pub current_protect: Protection,
    pub mapping_type: MappingType,
    pub region_start: usize,
    pub region_end: usize,
}

/// One entry from `QueryWorkingSet`.
#[derive(Debug, Clone, Copy)]
pub struct WsEntry {
    pub virtual_page: usize,
    pub protection: Protection,
}

/// Static information about one loaded module.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub base_address: usize,
    pub size: usize,
    pub path: String,
}

/// The abstraction the engine is generic over. Implementations wrap a handle
/// to one already-open target process.
pub trait TargetProcess {
    /// `VirtualQueryEx` equivalent. `Ok(None)` means the address fell outside
    /// the target's address space (`ERROR_INVALID_PARAMETER`) — an expected,
    /// silent outcome when probing near the edges of the address space.
    fn virtual_query(&self, addr: usize) -> Result<Option<PageInfo>, OsError>;

    /// Single-attempt raw read; returns the number of bytes actually copied
    /// into `buf` (0 on failure). Never reads more than `buf.len()`.
    fn read_remote_raw(&self, addr: usize, buf: &mut [u8]) -> usize;

    /// `EnumProcessModulesEx` equivalent, already filtered by architecture.
    fn enum_modules(&self, filter: ModulesFilter) -> Result<Vec<ModuleHandle>, OsError>;

    /// `GetModuleFileNameExA` + `GetModuleInformation` equivalent.
    fn module_info(&self, handle: ModuleHandle) -> Result<ModuleInfo, OsError>;

    /// `QueryWorkingSet` equivalent.
    fn query_working_set(&self) -> Result<Vec<WsEntry>, OsError>;

    fn page_size(&self) -> usize;

    /// PID of the target process.
    fn pid(&self) -> u32;

    /// True when the target is this very process — the working-set scanner
    /// refuses to run in that case (§4.7).
    fn is_current_process(&self) -> bool {
        self.pid() == std::process::id()
    }
}
