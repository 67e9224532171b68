//! Bounds-checked access to an instance's linear memory.
//!
//! Both gateways into guest memory (the idle worker loop and the suspended
//! trampoline loop) funnel through these helpers so the bounds policy is
//! identical everywhere: the whole range must lie inside the current memory
//! size, and a failed write mutates nothing.

use crate::error::RuntimeError;

pub(crate) fn read_bytes(data: &[u8], offset: u32, length: u32) -> Result<Vec<u8>, RuntimeError> {
    let offset = offset as usize;
    let end = offset
        .checked_add(length as usize)
        .ok_or(RuntimeError::OutOfBounds)?;
    if end > data.len() {
        return Err(RuntimeError::OutOfBounds);
    }
    Ok(data[offset..end].to_vec())
}

pub(crate) fn write_bytes(data: &mut [u8], offset: u32, bytes: &[u8]) -> Result<(), RuntimeError> {
    let offset = offset as usize;
    let end = offset
        .checked_add(bytes.len())
        .ok_or(RuntimeError::OutOfBounds)?;
    if end > data.len() {
        return Err(RuntimeError::OutOfBounds);
    }
    data[offset..end].copy_from_slice(bytes);
    Ok(())
}
