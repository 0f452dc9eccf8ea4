//! Cross-platform memory protection/type model.
//!
//! Agnostic representation of:
//! - Windows `PAGE_*` / `MEM_*` constants, see
//!   https://learn.microsoft.com/en-us/windows/win32/Memory/memory-protection-constants
//! - Linux `PROT_*` / `mmap` flags, see https://man7.org/linux/man-pages/man2/mprotect.2.html

use std::fmt::{self, Display, Formatter};

/// Named protection bits, independent of the OS-specific encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Protection {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
    pub guarded: bool,
    pub no_access: bool,
}

impl Protection {
    pub const NONE: Protection = Protection {
        read: false,
        write: false,
        execute: false,
        guarded: false,
        no_access: false,
    };

    pub fn is_executable(&self) -> bool {
        self.execute
    }
}

impl Display for Protection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.no_access {
            flags.push("NOACCESS");
        }
        if self.read {
            flags.push("READ");
        }
        if self.write {
            flags.push("WRITE");
        }
        if self.execute {
            flags.push("EXECUTE");
        }
        if self.guarded {
            flags.push("GUARDED");
        }
        if flags.is_empty() {
            flags.push("NONE");
        }
        write!(f, "{}", flags.join("_"))
    }
}

/// The kind of allocation backing a region, per `MEMORY_BASIC_INFORMATION::Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingType {
    /// Backed by a loaded module/image (`MEM_IMAGE`).
    Image,
    /// Backed by a file mapping that is not a loaded module (`MEM_MAPPED`).
    Mapped,
    /// Anonymous, not file-backed (`MEM_PRIVATE`).
    Private,
    Unknown,
}

impl Display for MappingType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            MappingType::Image => "IMAGE",
            MappingType::Mapped => "MAPPED",
            MappingType::Private => "PRIVATE",
            MappingType::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_flags_present() {
        let p = Protection {
            read: true,
            execute: true,
            ..Protection::NONE
        };
        assert_eq!(p.to_string(), "READ_EXECUTE");
    }

    #[test]
    fn display_none_when_no_flags() {
        assert_eq!(Protection::NONE.to_string(), "NONE");
    }

    #[test]
    fn is_executable_reflects_execute_bit() {
        let mut p = Protection::NONE;
        assert!(!p.is_executable());
        p.execute = true;
        assert!(p.is_executable());
    }
}
