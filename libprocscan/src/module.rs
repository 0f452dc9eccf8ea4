//! Module descriptor (§3): the on-disk half of one listed module.

use crate::os::ModuleHandle;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    X86,
    X64,
    Unknown,
}

/// For each module handle listed in the target: its on-disk original (once
/// loaded), and the metadata needed to decide whether to scan it at all.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub handle: ModuleHandle,
    pub base_address: usize,
    pub module_path: String,
    pub loaded_original: Option<Vec<u8>>,
    pub architecture: Architecture,
    pub is_dotnet: bool,
    already_reloaded: bool,
}

impl ModuleDescriptor {
    pub fn new(handle: ModuleHandle, base_address: usize, module_path: String) -> Self {
        ModuleDescriptor {
            handle,
            base_address,
            module_path,
            loaded_original: None,
            architecture: Architecture::Unknown,
            is_dotnet: false,
            already_reloaded: false,
        }
    }

    /// Reads the on-disk file and classifies it. A missing/unreadable file is
    /// a reportable finding at the call site, not an error here — this just
    /// returns false.
    pub fn load_original(&mut self) -> bool {
        let bytes = match std::fs::read(&self.module_path) {
            Ok(b) => b,
            Err(_) => return false,
        };
        self.architecture = detect_architecture(&bytes);
        self.is_dotnet = detect_dotnet(&bytes);
        self.loaded_original = Some(bytes);
        true
    }

    pub fn file_name(&self) -> &str {
        Path::new(&self.module_path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(&self.module_path)
    }

    /// Reloads the module in the alternate architecture view after an
    /// arch-mismatch headers scan (§4.6 step 5). At most once per module
    /// (§8 property 12) — a second call is a no-op that returns false.
    pub fn reload_alternate_arch(&mut self) -> bool {
        if self.already_reloaded {
            return false;
        }
        self.already_reloaded = true;
        self.architecture = match self.architecture {
            Architecture::X86 => Architecture::X64,
            Architecture::X64 => Architecture::X86,
            Architecture::Unknown => Architecture::Unknown,
        };
        true
    }
}

fn detect_architecture(pe_bytes: &[u8]) -> Architecture {
    match goblin::pe::PE::parse(pe_bytes) {
        Ok(pe) => match pe.header.coff_header.machine {
            goblin::pe::header::COFF_MACHINE_X86 => Architecture::X86,
            goblin::pe::header::COFF_MACHINE_X86_64 => Architecture::X64,
            _ => Architecture::Unknown,
        },
        Err(_) => Architecture::Unknown,
    }
}

fn detect_dotnet(pe_bytes: &[u8]) -> bool {
    let pe = match goblin::pe::PE::parse(pe_bytes) {
        Ok(pe) => pe,
        Err(_) => return false,
    };
    pe.header
        .optional_header
        .map(|oh| oh.data_directories.get_clr_runtime_header().is_some())
        .unwrap_or(false)
}
