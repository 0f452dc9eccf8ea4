//! Remote-memory reader (§4.1): tolerant reads from a foreign address space.

use crate::os::TargetProcess;

/// Shrink step used when a read fails; matches the original's `0x100`.
pub const READ_STEP: usize = 256;

/// Zero-fills `out_buf`, then attempts a full read of its length; on failure
/// shrinks the attempted size by `READ_STEP` and retries until the attempted
/// size drops below `READ_STEP`. Returns true on the first successful read.
///
/// If `out_buf.len() < READ_STEP` to begin with, no read is attempted at all
/// (§8 property 10) — the caller gets a zeroed buffer and `false`.
pub fn read_remote<P: TargetProcess + ?Sized>(proc: &P, addr: usize, out_buf: &mut [u8]) -> bool {
    out_buf.fill(0);

    let mut to_read = out_buf.len();
    while to_read >= READ_STEP {
        let read = proc.read_remote_raw(addr, &mut out_buf[..to_read]);
        if read == to_read {
            return true;
        }
        to_read -= READ_STEP;
    }
    false
}
