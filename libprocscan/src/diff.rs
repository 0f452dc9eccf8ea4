//! Byte-level diffing, used by the hook scanner to find patched
//! instructions (§4.6.2). Adapted from the teacher's snapshot differ, cut
//! down to the single `old vs new` comparison the hook scanner needs.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteChange {
    pub offset: usize,
    pub old: u8,
    pub new: u8,
}

/// Compares `old` and `new` byte-for-byte over their shared length and
/// returns every differing offset. Bytes past the shorter slice's end are
/// not compared — callers that care about a length mismatch should check it
/// separately.
pub fn diff_bytes(old: &[u8], new: &[u8]) -> Vec<ByteChange> {
    old.iter()
        .zip(new.iter())
        .enumerate()
        .filter_map(|(offset, (&o, &n))| {
            if o != n {
                Some(ByteChange { offset, old: o, new: n })
            } else {
                None
            }
        })
        .collect()
}
