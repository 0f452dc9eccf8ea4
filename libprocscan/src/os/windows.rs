//! Windows `TargetProcess` implementation.
//!
//! Grounded on the teacher's `libmemscan/src/windows/process.rs` FFI
//! wrappers, re-targeted at the `TargetProcess` contract instead of the
//! teacher's `MemoryRegion` iterator model.

use crate::config::ModulesFilter;
use crate::os::{ModuleHandle, ModuleInfo, OsError, PageInfo, WsEntry};
use crate::protect::{MappingType, Protection};
use std::mem::{size_of, MaybeUninit};
use winapi::shared::basetsd::SIZE_T;
use winapi::shared::minwindef::{DWORD, FALSE, HMODULE, LPCVOID, LPVOID, MAX_PATH};
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::memoryapi::{ReadProcessMemory, VirtualQueryEx};
use winapi::um::processthreadsapi::OpenProcess;
use winapi::um::psapi::{
    EnumProcessModulesEx, GetModuleFileNameExA, GetModuleInformation, MODULEINFO,
    LIST_MODULES_32BIT, LIST_MODULES_64BIT, LIST_MODULES_ALL,
};
use winapi::um::sysinfoapi::{GetNativeSystemInfo, SYSTEM_INFO};
use winapi::um::tlhelp32::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
    TH32CS_SNAPPROCESS,
};
use winapi::um::winnt::{
    HANDLE, MEMORY_BASIC_INFORMATION, MEM_IMAGE, MEM_MAPPED, MEM_PRIVATE, PAGE_EXECUTE,
    PAGE_EXECUTE_READ, PAGE_EXECUTE_READWRITE, PAGE_EXECUTE_WRITECOPY, PAGE_GUARD, PAGE_NOACCESS,
    PROCESS_QUERY_INFORMATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
};

fn protection_from_win32(protect: u32) -> Protection {
    Protection {
        read: protect
            & (winapi::um::winnt::PAGE_READONLY
                | winapi::um::winnt::PAGE_READWRITE
                | winapi::um::winnt::PAGE_WRITECOPY
                | PAGE_EXECUTE_READ
                | PAGE_EXECUTE_READWRITE
                | PAGE_EXECUTE_WRITECOPY)
            != 0,
        write: protect
            & (winapi::um::winnt::PAGE_READWRITE
                | winapi::um::winnt::PAGE_WRITECOPY
                | PAGE_EXECUTE_READWRITE
                | PAGE_EXECUTE_WRITECOPY)
            != 0,
        execute: protect
            & (PAGE_EXECUTE | PAGE_EXECUTE_READ | PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY)
            != 0,
        guarded: protect & PAGE_GUARD != 0,
        no_access: protect & PAGE_NOACCESS != 0,
    }
}

fn mapping_type_from_win32(type_: u32) -> MappingType {
    match type_ {
        MEM_IMAGE => MappingType::Image,
        MEM_MAPPED => MappingType::Mapped,
        MEM_PRIVATE => MappingType::Private,
        _ => MappingType::Unknown,
    }
}

fn filter_to_win32(filter: ModulesFilter) -> DWORD {
    match filter {
        ModulesFilter::All => LIST_MODULES_ALL,
        ModulesFilter::X86Only => LIST_MODULES_32BIT,
        ModulesFilter::X64Only => LIST_MODULES_64BIT,
    }
}

/// An open handle to the target process, closed on drop.
pub struct WindowsProcess {
    handle: HANDLE,
    pid: u32,
}

unsafe impl Send for WindowsProcess {}
unsafe impl Sync for WindowsProcess {}

impl Drop for WindowsProcess {
    fn drop(&mut self) {
        unsafe {
            if !self.handle.is_null() {
                CloseHandle(self.handle);
            }
        }
    }
}

impl WindowsProcess {
    pub fn open(pid: u32) -> anyhow::Result<Self> {
        let handle = unsafe {
            OpenProcess(
                PROCESS_QUERY_INFORMATION | PROCESS_VM_READ | PROCESS_VM_WRITE,
                FALSE,
                pid,
            )
        };
        if handle.is_null() {
            anyhow::bail!("OpenProcess failed for pid {}", pid);
        }
        Ok(WindowsProcess { handle, pid })
    }
}

/// Resolves a process name (case-insensitive prefix match on the exe name)
/// to a pid via a toolhelp snapshot, mirroring the teacher's
/// `find_process_by_name`.
pub fn find_process_by_name(name: &str) -> anyhow::Result<Option<u32>> {
    let needle = name.to_ascii_lowercase();

    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0);
        if snapshot == INVALID_HANDLE_VALUE {
            anyhow::bail!("CreateToolhelp32Snapshot failed");
        }

        let mut entry: PROCESSENTRY32W = std::mem::zeroed();
        entry.dwSize = size_of::<PROCESSENTRY32W>() as u32;

        if Process32FirstW(snapshot, &mut entry) == FALSE {
            CloseHandle(snapshot);
            return Ok(None);
        }

        let mut found = None;
        loop {
            let len = entry
                .szExeFile
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(entry.szExeFile.len());
            let exe_name = String::from_utf16_lossy(&entry.szExeFile[..len]).to_ascii_lowercase();
            if exe_name.starts_with(&needle) {
                found = Some(entry.th32ProcessID);
                break;
            }
            if Process32NextW(snapshot, &mut entry) == FALSE {
                break;
            }
        }

        CloseHandle(snapshot);
        Ok(found)
    }
}

impl crate::os::TargetProcess for WindowsProcess {
    fn virtual_query(&self, addr: usize) -> Result<Option<PageInfo>, OsError> {
        let mut mbi = MaybeUninit::<MEMORY_BASIC_INFORMATION>::uninit();
        let res = unsafe {
            VirtualQueryEx(
                self.handle,
                addr as LPCVOID,
                mbi.as_mut_ptr(),
                size_of::<MEMORY_BASIC_INFORMATION>() as SIZE_T,
            )
        };
        if res == 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(87) {
                // ERROR_INVALID_PARAMETER: address outside the target's space.
                return Ok(None);
            }
            return Err(OsError::Os(err.to_string()));
        }
        let mbi = unsafe { mbi.assume_init() };
        Ok(Some(PageInfo {
            initial_protect: protection_from_win32(mbi.AllocationProtect),
            current_protect: protection_from_win32(mbi.Protect),
            mapping_type: mapping_type_from_win32(mbi.Type),
            region_start: mbi.BaseAddress as usize,
            region_end: (mbi.BaseAddress as usize).saturating_add(mbi.RegionSize as usize),
        }))
    }

    fn read_remote_raw(&self, addr: usize, buf: &mut [u8]) -> usize {
        unsafe {
            let mut bytes_read: SIZE_T = 0;
            let res = ReadProcessMemory(
                self.handle,
                addr as LPCVOID,
                buf.as_mut_ptr() as LPVOID,
                buf.len() as SIZE_T,
                &mut bytes_read as *mut SIZE_T,
            );
            if res == 0 { 0 } else { bytes_read as usize }
        }
    }

    fn enum_modules(&self, filter: ModulesFilter) -> Result<Vec<ModuleHandle>, OsError> {
        let mut h_mods: [HMODULE; 1024] = [std::ptr::null_mut(); 1024];
        let mut cb_needed: DWORD = 0;
        let res = unsafe {
            EnumProcessModulesEx(
                self.handle,
                h_mods.as_mut_ptr(),
                (size_of::<HMODULE>() * h_mods.len()) as DWORD,
                &mut cb_needed,
                filter_to_win32(filter),
            )
        };
        if res == FALSE {
            return Err(OsError::Os(std::io::Error::last_os_error().to_string()));
        }
        let count = (cb_needed as usize / size_of::<HMODULE>()).min(h_mods.len());
        Ok(h_mods[..count].iter().map(|&h| h as usize).collect())
    }

    fn module_info(&self, handle: ModuleHandle) -> Result<ModuleInfo, OsError> {
        let h_mod = handle as HMODULE;

        let mut path_buf = [0i8; MAX_PATH];
        let len = unsafe {
            GetModuleFileNameExA(self.handle, h_mod, path_buf.as_mut_ptr(), MAX_PATH as DWORD)
        };
        if len == 0 {
            return Err(OsError::Os(std::io::Error::last_os_error().to_string()));
        }
        let path_bytes: Vec<u8> = path_buf[..len as usize].iter().map(|&c| c as u8).collect();
        let path = String::from_utf8_lossy(&path_bytes).to_string();

        let mut info = MaybeUninit::<MODULEINFO>::uninit();
        let res = unsafe {
            GetModuleInformation(
                self.handle,
                h_mod,
                info.as_mut_ptr(),
                size_of::<MODULEINFO>() as DWORD,
            )
        };
        if res == FALSE {
            return Err(OsError::Os(std::io::Error::last_os_error().to_string()));
        }
        let info = unsafe { info.assume_init() };

        Ok(ModuleInfo {
            base_address: info.lpBaseOfDll as usize,
            size: info.SizeOfImage as usize,
            path,
        })
    }

    fn query_working_set(&self) -> Result<Vec<WsEntry>, OsError> {
        use winapi::shared::basetsd::ULONG_PTR;
        use winapi::shared::winerror::ERROR_BAD_LENGTH;
        use winapi::um::psapi::QueryWorkingSet;

        // Probe with a one-entry buffer to learn the real entry count; any
        // result other than ERROR_BAD_LENGTH here is a genuine failure
        // (§4.7 step 2).
        let header_size = size_of::<ULONG_PTR>();
        let mut probe = vec![0u8; header_size + size_of::<ULONG_PTR>()];
        let probe_res =
            unsafe { QueryWorkingSet(self.handle, probe.as_mut_ptr() as LPVOID, probe.len() as DWORD) };
        if probe_res == FALSE {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(ERROR_BAD_LENGTH as i32) {
                return Err(OsError::Os(err.to_string()));
            }
        }
        let entry_count = unsafe { *(probe.as_ptr() as *const ULONG_PTR) } as usize;

        // Allocate 2x the probed count to tolerate growth between the probe
        // and the real query (§4.7 step 3, §8 property 11).
        let capacity = (entry_count.max(1)) * 2;
        let buf_size = header_size + capacity * size_of::<ULONG_PTR>();
        let mut buf = vec![0u8; buf_size];
        let res = unsafe { QueryWorkingSet(self.handle, buf.as_mut_ptr() as LPVOID, buf_size as DWORD) };
        if res == FALSE {
            return Err(OsError::Os(std::io::Error::last_os_error().to_string()));
        }

        let actual_count = (unsafe { *(buf.as_ptr() as *const ULONG_PTR) } as usize).min(capacity);
        let blocks = unsafe {
            std::slice::from_raw_parts(buf.as_ptr().add(header_size) as *const ULONG_PTR, actual_count)
        };

        Ok(blocks
            .iter()
            .map(|&raw| {
                let raw = raw as usize;
                // PSAPI_WORKING_SET_BLOCK bitfield: bit 0 valid, bits 1-4
                // protection (PAGE_* shifted), bit 5 shared, rest = frame.
                let mut protection = Protection::NONE;
                if raw & 0x1 != 0 {
                    let prot_bits = ((raw >> 1) & 0x1F) as u32;
                    protection = protection_from_win32(prot_bits);
                }
                WsEntry {
                    virtual_page: raw >> 12,
                    protection,
                }
            })
            .collect())
    }

    fn page_size(&self) -> usize {
        let mut info = MaybeUninit::<SYSTEM_INFO>::uninit();
        unsafe {
            GetNativeSystemInfo(info.as_mut_ptr());
            info.assume_init().dwPageSize as usize
        }
    }

    fn pid(&self) -> u32 {
        self.pid
    }
}
