//! Remote module descriptor (§3): the in-memory counterpart of a
//! `ModuleDescriptor`, read on demand rather than cached up front.

use crate::header::{ExecutableFormat, MAX_HEADER_SIZE};
use crate::os::TargetProcess;
use crate::remote_read::read_remote;

#[derive(Debug, Clone, Copy)]
pub struct RemoteModuleDescriptor {
    pub base_address: usize,
}

impl RemoteModuleDescriptor {
    pub fn new(base_address: usize) -> Self {
        RemoteModuleDescriptor { base_address }
    }

    /// Reads the header + section table region at `base_address` and asks
    /// the format collaborator whether any section is executable.
    pub fn has_executable_section<P, F>(&self, proc: &P, format: &F) -> bool
    where
        P: TargetProcess + ?Sized,
        F: ExecutableFormat + ?Sized,
    {
        let mut buf = vec![0u8; 2 * MAX_HEADER_SIZE];
        if !read_remote(proc, self.base_address, &mut buf) {
            return false;
        }
        format.has_executable_section(&buf)
    }
}
