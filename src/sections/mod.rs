//! The five major sections of a PSD/PSB file, and the splitter that locates them.

pub(crate) mod color_mode_data;
pub(crate) mod header;
pub(crate) mod image_data;
pub(crate) mod image_resources;
pub(crate) mod layer_mask_info;

use crate::enums::Version;
use crate::error::{PsdError, SectionKind};
use crate::io::PsdCursor;

const FILE_HEADER_SECTION_LEN: usize = 26;

/// Byte ranges of the four variable-length major sections that follow the fixed file header
/// (spec.md §3 "file model"):
///
/// ```text
/// ┌──────────────────┐
/// │   File Header    │  fixed, 26 bytes
/// ├──────────────────┤
/// │ Color Mode Data  │
/// ├──────────────────┤
/// │ Image Resources  │
/// ├──────────────────┤
/// │  Layer and Mask  │
/// ├──────────────────┤
/// │    Image Data    │  no length marker, runs to EOF
/// └──────────────────┘
/// ```
pub(crate) struct MajorSections<'a> {
    pub(crate) file_header: &'a [u8],
    pub(crate) color_mode_data: &'a [u8],
    pub(crate) image_resources: &'a [u8],
    pub(crate) layer_and_mask: &'a [u8],
    pub(crate) image_data: &'a [u8],
}

impl<'a> MajorSections<'a> {
    /// Split the bytes of a whole PSD/PSB document into its five major sections.
    ///
    /// The length-prefixed sections (everything but the file header and the terminal image
    /// data) use a width that depends on `version` (32-bit for PSD, 64-bit for PSB), per
    /// spec.md §6.1.
    pub(crate) fn from_bytes(bytes: &'a [u8], version: Version) -> Result<Self, PsdError> {
        if bytes.len() < FILE_HEADER_SECTION_LEN {
            return Err(PsdError::UnexpectedEof {
                offset: 0,
                wanted: FILE_HEADER_SECTION_LEN as u64,
                remaining: bytes.len() as u64,
            });
        }
        let file_header = &bytes[..FILE_HEADER_SECTION_LEN];

        let mut cursor = PsdCursor::new(bytes);
        cursor.set_position(FILE_HEADER_SECTION_LEN as u64)?;

        // Only the layer-and-mask section's length marker widens to 64 bits in PSB (spec.md
        // §6.1's layout diagram: "COLOR_MODE_DATA len(4)", "IMAGE_RESOURCES len(4)",
        // "LAYER_AND_MASK len(4/8)"); color-mode-data and image-resources always use a 4-byte
        // length, even in PSB documents.
        let color_mode_data = read_major_section(&mut cursor, Version::Psd)?;
        let image_resources = read_major_section(&mut cursor, Version::Psd)?;
        let layer_and_mask = read_major_section(&mut cursor, version)?;

        let image_data = &bytes[cursor.position() as usize..];

        Ok(MajorSections {
            file_header,
            color_mode_data,
            image_resources,
            layer_and_mask,
            image_data,
        })
    }
}

/// Read a length-prefixed major section, returning the slice including its own length marker
/// (section codecs expect to see and re-read the marker themselves, matching the teacher's
/// convention of passing `bytes` "including the length marker" to every `from_bytes`).
fn read_major_section<'a>(
    cursor: &mut PsdCursor<'a>,
    version: Version,
) -> Result<&'a [u8], PsdError> {
    let marker_start = cursor.position();
    let data_len = cursor.read_sized(version)?;
    let marker_len = version.field_width() as u64;

    cursor.set_position(marker_start + marker_len + data_len)?;
    let end = cursor.position() as usize;
    let start = marker_start as usize;

    // Reborrow the whole buffer through a throwaway cursor at position 0 isn't available here,
    // so we reconstruct the slice from the cursor's own backing buffer via read_len from the
    // marker's start.
    cursor.set_position(marker_start)?;
    let whole = cursor.read_len(end as u64 - start as u64)?;
    Ok(whole)
}

pub(crate) fn expect_signature(
    section: SectionKind,
    found: &[u8],
    expected: [u8; 4],
) -> Result<(), PsdError> {
    if found != expected {
        let mut found_arr = [0u8; 4];
        found_arr.copy_from_slice(&found[..4.min(found.len())]);
        return Err(PsdError::BadSignature {
            section,
            expected,
            found: found_arr,
        });
    }
    Ok(())
}
