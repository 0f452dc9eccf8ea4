//! Executable-header locator (§4.3) and the executable-format collaborator
//! contract it depends on (§6).
//!
//! The byte-level format knowledge (NT header layout, section table) is
//! intentionally out of scope for this crate's core — `GoblinFormat` defers
//! all of it to the `goblin` PE parser, which is the real collaborator a
//! production build would link against.

use crate::os::TargetProcess;
use crate::page::PageDescriptor;
use crate::remote_read::read_remote;

/// Matches the original's `peconv::MAX_HEADER_SIZE`: one page is enough to
/// hold the DOS header, NT headers, and section table for the overwhelming
/// majority of real images.
pub const MAX_HEADER_SIZE: usize = 4096;

/// The executable-format collaborator contract (§6).
pub trait ExecutableFormat {
    /// Returns the offset of a valid NT header within `buf`, if any.
    fn locate_nt_header(&self, buf: &[u8]) -> Option<usize>;

    /// True if the parsed image has at least one section marked executable.
    fn has_executable_section(&self, image: &[u8]) -> bool;

    /// The COFF machine field (`IMAGE_FILE_HEADER::Machine`), if `buf`
    /// parses as a PE image.
    fn machine(&self, buf: &[u8]) -> Option<u16>;
}

/// Default `ExecutableFormat` backed by the `goblin` PE parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoblinFormat;

const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;

impl ExecutableFormat for GoblinFormat {
    fn locate_nt_header(&self, buf: &[u8]) -> Option<usize> {
        let pe = goblin::pe::PE::parse(buf).ok()?;
        Some(pe.header.dos_header.pe_pointer as usize)
    }

    fn has_executable_section(&self, image: &[u8]) -> bool {
        match goblin::pe::PE::parse(image) {
            Ok(pe) => pe
                .sections
                .iter()
                .any(|s| s.characteristics & IMAGE_SCN_MEM_EXECUTE != 0),
            Err(_) => false,
        }
    }

    fn machine(&self, buf: &[u8]) -> Option<u16> {
        goblin::pe::PE::parse(buf).ok().map(|pe| pe.header.coff_header.machine)
    }
}

/// Reads up to `2 * MAX_HEADER_SIZE` bytes from `page.start_va` and looks for
/// a valid NT header. Page-aligned modules are found at offset 0; when
/// `deep_scan` is set, every byte offset in `[0, MAX_HEADER_SIZE)` is tried,
/// returning the first hit (a superset of the non-deep result, §8 property 9).
pub fn find_pe_header<P, F>(page: &PageDescriptor, proc: &P, format: &F, deep_scan: bool) -> Option<usize>
where
    P: TargetProcess + ?Sized,
    F: ExecutableFormat + ?Sized,
{
    let mut buf = vec![0u8; 2 * MAX_HEADER_SIZE];
    if !read_remote(proc, page.start_va, &mut buf) {
        return None;
    }

    let limit = if deep_scan { MAX_HEADER_SIZE } else { 1 };
    for i in 0..limit.min(buf.len()) {
        if format.locate_nt_header(&buf[i..]).is_some() {
            return Some(page.start_va + i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModulesFilter;
    use crate::os::{ModuleHandle, ModuleInfo, OsError, PageInfo, WsEntry};
    use crate::protect::Protection;

    /// Returns a fixed byte buffer regardless of address, so tests can plant
    /// a "header" at an arbitrary offset.
    struct FixedBuffer(Vec<u8>);

    impl TargetProcess for FixedBuffer {
        fn virtual_query(&self, _addr: usize) -> Result<Option<PageInfo>, OsError> {
            Ok(None)
        }
        fn read_remote_raw(&self, _addr: usize, buf: &mut [u8]) -> usize {
            let n = buf.len().min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            buf.len()
        }
        fn enum_modules(&self, _filter: ModulesFilter) -> Result<Vec<ModuleHandle>, OsError> {
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

    /// Test double: reports a hit only when the marker byte `0x99` sits at
    /// offset 0 of the slice it is given.
    struct MarkerFormat;
    impl ExecutableFormat for MarkerFormat {
        fn locate_nt_header(&self, buf: &[u8]) -> Option<usize> {
            if buf.first() == Some(&0x99) { Some(0) } else { None }
        }
        fn has_executable_section(&self, _image: &[u8]) -> bool {
            true
        }
        fn machine(&self, _buf: &[u8]) -> Option<u16> {
            None
        }
    }

    #[test]
    fn finds_header_at_offset_zero_without_deep_scan() {
        let mut data = vec![0u8; 2 * MAX_HEADER_SIZE];
        data[0] = 0x99;
        let proc = FixedBuffer(data);
        let page = PageDescriptor::new(0x5000, 0x1000, Protection::NONE);
        assert_eq!(find_pe_header(&page, &proc, &MarkerFormat, false), Some(0x5000));
    }

    #[test]
    fn non_deep_scan_misses_shifted_header() {
        let mut data = vec![0u8; 2 * MAX_HEADER_SIZE];
        data[37] = 0x99;
        let proc = FixedBuffer(data);
        let page = PageDescriptor::new(0x5000, 0x1000, Protection::NONE);
        assert_eq!(find_pe_header(&page, &proc, &MarkerFormat, false), None);
    }

    #[test]
    fn deep_scan_finds_shifted_header_and_is_superset_of_non_deep() {
        let mut data = vec![0u8; 2 * MAX_HEADER_SIZE];
        data[37] = 0x99;
        let proc = FixedBuffer(data);
        let page = PageDescriptor::new(0x5000, 0x1000, Protection::NONE);
        assert_eq!(find_pe_header(&page, &proc, &MarkerFormat, true), Some(0x5037));

        // Plant a header at offset 0 too: deep and non-deep must agree.
        let mut data2 = vec![0u8; 2 * MAX_HEADER_SIZE];
        data2[0] = 0x99;
        let proc2 = FixedBuffer(data2);
        let non_deep = find_pe_header(&page, &proc2, &MarkerFormat, false);
        let deep = find_pe_header(&page, &proc2, &MarkerFormat, true);
        assert_eq!(non_deep, deep);
    }

    #[test]
    fn returns_none_when_read_fails() {
        struct Unreadable;
        impl TargetProcess for Unreadable {
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
                Ok(vec![])
            }
            fn page_size(&self) -> usize {
                4096
            }
            fn pid(&self) -> u32 {
                1
            }
        }
        let page = PageDescriptor::new(0x5000, 0x1000, Protection::NONE);
        assert_eq!(find_pe_header(&page, &Unreadable, &MarkerFormat, true), None);
    }
}
