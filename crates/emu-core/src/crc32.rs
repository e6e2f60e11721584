//! CRC-32 (IEEE 802.3), via `crc32fast`.
//!
//! Used to identify cartridge images against the known-cartridge table,
//! to check RIP records and BIOS dumps, and to seal save-state blobs.

/// CRC-32 of a complete buffer.
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
