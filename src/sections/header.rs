//! The fixed 26-byte file header section (spec.md §3 C4 / §6.1).

use crate::enums::{BitDepth, ColorMode, Version};
use crate::error::{PsdError, Result, SectionKind};
use crate::io::{PsdBuffer, PsdCursor};

const SIGNATURE: [u8; 4] = *b"8BPS";
const RESERVED: [u8; 6] = [0; 6];

/// The first 26 bytes of a PSD/PSB document.
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    pub(crate) version: Version,
    pub(crate) channel_count: u16,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) depth: BitDepth,
    pub(crate) color_mode: ColorMode,
}

impl FileHeader {
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<FileHeader> {
        if bytes.len() != 26 {
            return Err(PsdError::UnexpectedEof {
                offset: 0,
                wanted: 26,
                remaining: bytes.len() as u64,
            });
        }

        let mut cursor = PsdCursor::new(bytes);

        let signature = cursor.read_4()?;
        if signature != SIGNATURE {
            let mut found = [0u8; 4];
            found.copy_from_slice(signature);
            return Err(PsdError::BadSignature {
                section: SectionKind::FileHeader,
                expected: SIGNATURE,
                found,
            });
        }

        let version = Version::from_u16(cursor.read_u16()?)?;

        let reserved = cursor.read_6()?;
        if reserved != RESERVED {
            return Err(PsdError::BadEnumValue {
                what: "file header reserved bytes",
                value: 0,
            });
        }

        let channel_count = cursor.read_u16()?;
        if !(1..=56).contains(&channel_count) {
            return Err(PsdError::SizeLimitExceeded {
                what: "channel count",
                value: channel_count as u64,
                limit: 56,
            });
        }

        let height = cursor.read_u32()?;
        let width = cursor.read_u32()?;
        let max_dimension = version.max_dimension();
        if height == 0 || height > max_dimension {
            return Err(PsdError::SizeLimitExceeded {
                what: "height",
                value: height as u64,
                limit: max_dimension as u64,
            });
        }
        if width == 0 || width > max_dimension {
            return Err(PsdError::SizeLimitExceeded {
                what: "width",
                value: width as u64,
                limit: max_dimension as u64,
            });
        }

        let depth = BitDepth::from_u16(cursor.read_u16()?)?;
        let color_mode = ColorMode::from_u16(cursor.read_u16()?)?;

        Ok(FileHeader {
            version,
            channel_count,
            width,
            height,
            depth,
            color_mode,
        })
    }

    pub(crate) fn write(&self, buffer: &mut PsdBuffer) {
        buffer.write_bytes(&SIGNATURE);
        buffer.write_u16(self.version.as_u16());
        buffer.write_bytes(&RESERVED);
        buffer.write_u16(self.channel_count);
        buffer.write_u32(self.height);
        buffer.write_u32(self.width);
        buffer.write_u16(self.depth.as_u16());
        buffer.write_u16(self.color_mode.as_u16());
    }
}
