//! Page descriptor — one virtual-memory region in the target process (§3, §4.2).

use crate::os::TargetProcess;
use crate::protect::{MappingType, Protection};
use owo_colors::OwoColorize;

/// One virtual-memory region in the target process. Created with only
/// `start_va` known; `fill_info` populates the OS-queried fields exactly
/// once.
#[derive(Debug, Clone)]
pub struct PageDescriptor {
    pub start_va: usize,
    pub requested_size: usize,
    /// Caller-supplied hint (e.g. from a working-set entry); may carry an
    /// executable bit the OS query itself would not expose.
    pub basic_protection: Protection,
    pub is_listed_module: bool,

    pub initial_protect: Protection,
    pub current_protect: Protection,
    pub mapping_type: MappingType,
    pub region_start: usize,
    pub region_end: usize,
    is_info_filled: bool,
}

impl PageDescriptor {
    pub fn new(start_va: usize, requested_size: usize, basic_protection: Protection) -> Self {
        PageDescriptor {
            start_va,
            requested_size,
            basic_protection,
            is_listed_module: false,
            initial_protect: Protection::NONE,
            current_protect: Protection::NONE,
            mapping_type: MappingType::Unknown,
            region_start: 0,
            region_end: 0,
            is_info_filled: false,
        }
    }

    pub fn is_info_filled(&self) -> bool {
        self.is_info_filled
    }

    /// Populates the OS-queried fields. Idempotent: a filled descriptor
    /// short-circuits subsequent calls (§8 property 8).
    pub fn fill_info<P: TargetProcess>(&mut self, proc: &P) -> bool {
        if self.is_info_filled {
            return true;
        }
        match proc.virtual_query(self.start_va) {
            Ok(Some(info)) => {
                self.initial_protect = info.initial_protect;
                self.current_protect = info.current_protect;
                self.mapping_type = info.mapping_type;
                self.region_start = info.region_start;
                self.region_end = info.region_end;
                self.is_info_filled = true;
                true
            }
            Ok(None) => false, // ERROR_INVALID_PARAMETER: outside the target's address space
            Err(e) => {
                println!(
                    "{} could not query page at {:016x}: {}",
                    "[warn]".yellow(),
                    self.start_va,
                    e
                );
                false
            }
        }
    }

    /// True if any of `initial_protect`, `current_protect`, or the
    /// caller-supplied `basic_protection` carries the executable bit (§4.5
    /// step 3 — deliberately symmetric, unlike the source it's ported from).
    pub fn is_any_executable(&self) -> bool {
        self.initial_protect.is_executable()
            || self.current_protect.is_executable()
            || self.basic_protection.is_executable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::{ModuleHandle, ModuleInfo, OsError, PageInfo, WsEntry};

    struct FixedPage(Option<PageInfo>);

    impl TargetProcess for FixedPage {
        fn virtual_query(&self, _addr: usize) -> Result<Option<PageInfo>, OsError> {
            Ok(self.0.clone())
        }
        fn read_remote_raw(&self, _addr: usize, _buf: &mut [u8]) -> usize {
            0
        }
        fn enum_modules(&self, _filter: crate::config::ModulesFilter) -> Result<Vec<ModuleHandle>, OsError> {
            Ok(vec![])
        }
        fn module_info(&self, _handle: ModuleHandle) -> Result<ModuleInfo, OsError> {
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

    #[test]
    fn fill_info_is_idempotent() {
        let proc = FixedPage(Some(PageInfo {
            initial_protect: Protection::NONE,
            current_protect: Protection::NONE,
            mapping_type: MappingType::Private,
            region_start: 0x1000,
            region_end: 0x2000,
        }));
        let mut page = PageDescriptor::new(0x1500, 0x1000, Protection::NONE);
        assert!(page.fill_info(&proc));
        assert_eq!(page.region_start, 0x1000);

        // Second call is a no-op even though the underlying query would now
        // return different data; the already-filled fields don't move.
        let proc2 = FixedPage(Some(PageInfo {
            initial_protect: Protection::NONE,
            current_protect: Protection::NONE,
            mapping_type: MappingType::Image,
            region_start: 0xdead,
            region_end: 0xbeef,
        }));
        assert!(page.fill_info(&proc2));
        assert_eq!(page.region_start, 0x1000);
        assert_eq!(page.mapping_type, MappingType::Private);
    }

    #[test]
    fn fill_info_returns_false_on_invalid_parameter() {
        let proc = FixedPage(None);
        let mut page = PageDescriptor::new(0x1500, 0x1000, Protection::NONE);
        assert!(!page.fill_info(&proc));
        assert!(!page.is_info_filled());
    }

    #[test]
    fn is_any_executable_checks_all_three_sources() {
        let mut page = PageDescriptor::new(0, 0, Protection::NONE);
        assert!(!page.is_any_executable());

        page.initial_protect.execute = true;
        assert!(page.is_any_executable());

        page.initial_protect.execute = false;
        page.current_protect.execute = true;
        assert!(page.is_any_executable());

        page.current_protect.execute = false;
        page.basic_protection.execute = true;
        assert!(page.is_any_executable());
    }
}
