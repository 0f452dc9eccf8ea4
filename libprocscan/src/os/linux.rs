//! Reduced-fidelity Unix `TargetProcess` implementation, for portability and
//! local testing off real Windows hardware.
//!
//! Grounded on the teacher's `libmemscan/src/linux/process.rs`. Windows-only
//! concepts have no exact Linux equivalent and are approximated rather than
//! emulated precisely (§2.1): module enumeration groups `/proc/<pid>/maps`
//! entries by backing file, and the working set is approximated as one
//! entry per distinct mapped region rather than per resident page.

use crate::config::ModulesFilter;
use crate::os::{ModuleHandle, ModuleInfo, OsError, PageInfo, WsEntry};
use crate::protect::{MappingType, Protection};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::os::unix::fs::FileExt;

struct MapEntry {
    start: usize,
    end: usize,
    protection: Protection,
    mapping_type: MappingType,
    path: Option<String>,
}

fn parse_maps(pid: u32) -> Result<Vec<MapEntry>, OsError> {
    let path = format!("/proc/{pid}/maps");
    let file = File::open(&path).map_err(|e| OsError::Os(format!("open {path}: {e}")))?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| OsError::Os(e.to_string()))?;
        let mut parts = line.splitn(6, ' ').filter(|s| !s.is_empty());
        let addr = parts.next().unwrap_or("");
        let perms = parts.next().unwrap_or("");
        let _offset = parts.next();
        let _dev = parts.next();
        let _inode = parts.next();
        let pathname = parts.next().map(str::trim).filter(|p| !p.is_empty());

        let mut addr_it = addr.split('-');
        let start = usize::from_str_radix(addr_it.next().unwrap_or("0"), 16).unwrap_or(0);
        let end = usize::from_str_radix(addr_it.next().unwrap_or("0"), 16).unwrap_or(0);

        let bytes = perms.as_bytes();
        let protection = Protection {
            read: bytes.first() == Some(&b'r'),
            write: bytes.get(1) == Some(&b'w'),
            execute: bytes.get(2) == Some(&b'x'),
            guarded: false,
            no_access: false,
        };

        let is_file_backed = pathname.map(|p| !p.starts_with('[')).unwrap_or(false);
        let mapping_type = if is_file_backed {
            MappingType::Image
        } else if bytes.get(3) == Some(&b's') {
            MappingType::Mapped
        } else {
            MappingType::Private
        };

        let path = pathname.filter(|_| is_file_backed).map(str::to_string);

        entries.push(MapEntry { start, end, protection, mapping_type, path });
    }

    entries.sort_by_key(|e| e.start);
    Ok(entries)
}

pub struct UnixProcess {
    pid: u32,
    mem: File,
}

impl UnixProcess {
    pub fn open(pid: u32) -> anyhow::Result<Self> {
        let mem = File::open(format!("/proc/{pid}/mem"))?;
        Ok(UnixProcess { pid, mem })
    }
}

/// Case-insensitive match against `/proc/<pid>/comm`, falling back to the
/// base name of `/proc/<pid>/exe`.
pub fn find_process_by_name(name: &str) -> anyhow::Result<Option<u32>> {
    let target = name.to_ascii_lowercase();
    let target = target.trim_end_matches(".exe");

    for entry in std::fs::read_dir("/proc")? {
        let entry = entry?;
        let fname = entry.file_name();
        let fname = fname.to_string_lossy();
        let Ok(pid) = fname.parse::<u32>() else { continue };

        if let Ok(comm) = std::fs::read_to_string(entry.path().join("comm")) {
            if comm.trim().eq_ignore_ascii_case(target) {
                return Ok(Some(pid));
            }
        }
        if let Ok(link) = std::fs::read_link(entry.path().join("exe")) {
            if let Some(base) = link.file_name().and_then(|s| s.to_str()) {
                if base.trim_end_matches(".exe").eq_ignore_ascii_case(target) {
                    return Ok(Some(pid));
                }
            }
        }
    }
    Ok(None)
}

impl crate::os::TargetProcess for UnixProcess {
    fn virtual_query(&self, addr: usize) -> Result<Option<PageInfo>, OsError> {
        let maps = parse_maps(self.pid)?;
        let hit = maps.iter().find(|m| addr >= m.start && addr < m.end);
        Ok(hit.map(|m| PageInfo {
            initial_protect: m.protection,
            current_protect: m.protection,
            mapping_type: m.mapping_type,
            region_start: m.start,
            region_end: m.end,
        }))
    }

    fn read_remote_raw(&self, addr: usize, buf: &mut [u8]) -> usize {
        self.mem.read_at(buf, addr as u64).unwrap_or(0)
    }

    fn enum_modules(&self, _filter: ModulesFilter) -> Result<Vec<ModuleHandle>, OsError> {
        let maps = parse_maps(self.pid)?;
        let mut by_path: HashMap<String, usize> = HashMap::new();
        for m in &maps {
            let Some(path) = &m.path else { continue };
            by_path.entry(path.clone()).or_insert(m.start);
        }
        Ok(by_path.into_values().collect())
    }

    fn module_info(&self, handle: ModuleHandle) -> Result<ModuleInfo, OsError> {
        let maps = parse_maps(self.pid)?;
        let mut by_path: HashMap<&str, (usize, usize)> = HashMap::new();
        for m in &maps {
            let Some(path) = m.path.as_deref() else { continue };
            let entry = by_path.entry(path).or_insert((m.start, m.end));
            entry.0 = entry.0.min(m.start);
            entry.1 = entry.1.max(m.end);
        }
        by_path
            .into_iter()
            .find(|(_, (start, _))| *start == handle)
            .map(|(path, (start, end))| ModuleInfo {
                base_address: start,
                size: end.saturating_sub(start),
                path: path.to_string(),
            })
            .ok_or(OsError::Unsupported("module_info: no module at that base address"))
    }

    /// Approximated: one entry per distinct mapped region rather than per
    /// resident 4K page, since `/proc/<pid>/maps` doesn't expose residency
    /// directly (that's `/proc/<pid>/smaps`' `Rss` field, left out here).
    fn query_working_set(&self) -> Result<Vec<WsEntry>, OsError> {
        let maps = parse_maps(self.pid)?;
        let page_size = self.page_size();
        Ok(maps
            .iter()
            .map(|m| WsEntry {
                virtual_page: m.start / page_size,
                protection: m.protection,
            })
            .collect())
    }

    fn page_size(&self) -> usize {
        unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
    }

    fn pid(&self) -> u32 {
        self.pid
    }
}
