//! The color mode data section: opaque outside of indexed/duotone documents (spec.md §3 C4).
//!
//! Grounded in the teacher's `ColorModeDataSection`, which already treats this section as an
//! opaque blob (`from_bytes` ignores its contents entirely) — we keep that and just round-trip
//! the bytes so indexed-color palettes survive a parse/materialize cycle untouched.

use crate::error::Result;
use crate::io::{PsdBuffer, PsdCursor};

/// The raw bytes of the color mode data section, excluding its own length marker.
///
/// Only populated (and meaningful) for `Indexed` and `Duotone` color modes; empty otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorModeData {
    pub(crate) bytes: Vec<u8>,
}

impl ColorModeData {
    /// Parse from the section's bytes, including its length marker.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<ColorModeData> {
        let mut cursor = PsdCursor::new(bytes);
        let len = cursor.read_u32()?;
        let data = cursor.read(len)?;
        Ok(ColorModeData {
            bytes: data.to_vec(),
        })
    }

    pub(crate) fn write(&self, buffer: &mut PsdBuffer) {
        buffer.write_u32(self.bytes.len() as u32);
        buffer.write_bytes(&self.bytes);
    }
}
