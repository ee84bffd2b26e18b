//! The tagged-block codec: a polymorphic decoder over four-character keys (spec.md §3 C5 / §4.5).
//!
//! Key set and the PSB-only "wide length" list are grounded in
//! `PhotoshopAPI/src/Util/Enum.h`'s `TaggedBlockKey` enum and its `lrSectionDivider`/`Lr16`/`Lr32`
//! entries; which keys widen to a 64-bit length field in PSB is enumerated directly in spec.md
//! §6.1 rather than re-derived, since the source gates it per-block via a `std::set` lookup this
//! crate didn't need to retrieve to reproduce.

use crate::blend_mode::BlendMode;
use crate::enums::{SectionDividerKind, Version};
use crate::error::{PsdError, Result, SectionKind};
use crate::io::{PsdBuffer, PsdCursor};
use crate::sections::layer_mask_info::LayerInfo;

const SIG_8BIM: [u8; 4] = *b"8BIM";
const SIG_8B64: [u8; 4] = *b"8B64";

const KEY_LR16: [u8; 4] = *b"Lr16";
const KEY_LR32: [u8; 4] = *b"Lr32";
const KEY_SECTION_DIVIDER: [u8; 4] = *b"lsct";

/// Tagged-block keys whose length field widens to 64 bits, but only in a PSB document
/// (spec.md §6.1 "Wide-length tagged-block key set").
const WIDE_LENGTH_KEYS: [[u8; 4]; 14] = [
    *b"LMsk", *b"Lr16", *b"Lr32", *b"Layr", *b"Mtrn", *b"Mt16", *b"Mt32", *b"Alph", *b"FMsk",
    *b"FEid", *b"FXid", *b"lnk2", *b"PxSD", *b"cinf",
];

fn length_field_width(key: [u8; 4], version: Version) -> usize {
    if version == Version::Psb && WIDE_LENGTH_KEYS.contains(&key) {
        8
    } else {
        4
    }
}

/// A single tagged block: a dispatched-on four-char key plus its payload.
///
/// Unknown keys are preserved verbatim (signature, key, and raw bytes) so that a round-trip
/// doesn't lose data written by third-party tools (spec.md §9 note 4).
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TaggedBlock {
    /// `Lr16`: a nested layer-info substructure carrying a PSB document's 16-bit layer data.
    LayerInfo16(LayerInfo),
    /// `Lr32`: same, for 32-bit-per-channel layer data.
    LayerInfo32(LayerInfo),
    /// `lsct`: marks a layer record as a group boundary (open/closed folder, or section end)
    /// and optionally relocates a `PassThrough` blend mode off of the layer record (I4).
    SectionDivider {
        kind: SectionDividerKind,
        blend_mode: Option<BlendMode>,
    },
    /// Any other key, kept as opaque bytes.
    Unknown {
        signature: [u8; 4],
        key: [u8; 4],
        bytes: Vec<u8>,
    },
}

impl TaggedBlock {
    /// Read one tagged block, then skip padding bytes so the cursor ends up `align`-aligned
    /// relative to where the block started.
    pub(crate) fn read(cursor: &mut PsdCursor, version: Version, align: usize) -> Result<TaggedBlock> {
        let block_start = cursor.position();

        let signature = read_signature(cursor)?;
        let key = cursor.read_4()?;
        let mut key_arr = [0u8; 4];
        key_arr.copy_from_slice(key);

        let width = length_field_width(key_arr, version);
        let len = if width == 8 {
            cursor.read_u64()?
        } else {
            cursor.read_u32()? as u64
        };
        let payload = cursor.read_len(len)?;

        let block = match &key_arr {
            &KEY_LR16 => TaggedBlock::LayerInfo16(LayerInfo::from_body_bytes(payload, version)?),
            &KEY_LR32 => TaggedBlock::LayerInfo32(LayerInfo::from_body_bytes(payload, version)?),
            &KEY_SECTION_DIVIDER => parse_section_divider(payload)?,
            _ => TaggedBlock::Unknown {
                signature,
                key: key_arr,
                bytes: payload.to_vec(),
            },
        };

        let consumed = cursor.position() - block_start;
        let padded = align_up(consumed, align as u64);
        if padded > consumed {
            cursor.read_len(padded - consumed)?;
        }

        Ok(block)
    }

    pub(crate) fn write(&self, buffer: &mut PsdBuffer, version: Version, align: usize) {
        let block_start = buffer.position();

        match self {
            TaggedBlock::LayerInfo16(info) => {
                buffer.write_bytes(&SIG_8BIM);
                buffer.write_bytes(&KEY_LR16);
                write_length(buffer, version, KEY_LR16, |buffer| info.write_body(buffer, version));
            }
            TaggedBlock::LayerInfo32(info) => {
                buffer.write_bytes(&SIG_8BIM);
                buffer.write_bytes(&KEY_LR32);
                write_length(buffer, version, KEY_LR32, |buffer| info.write_body(buffer, version));
            }
            TaggedBlock::SectionDivider { kind, blend_mode } => {
                buffer.write_bytes(&SIG_8BIM);
                buffer.write_bytes(&KEY_SECTION_DIVIDER);
                write_length(buffer, version, KEY_SECTION_DIVIDER, |buffer| {
                    buffer.write_u32(kind.as_u32());
                    if let Some(mode) = blend_mode {
                        buffer.write_bytes(&SIG_8BIM);
                        buffer.write_bytes(&mode.to_key());
                    }
                });
            }
            TaggedBlock::Unknown {
                signature,
                key,
                bytes,
            } => {
                buffer.write_bytes(signature);
                buffer.write_bytes(key);
                write_length(buffer, version, *key, |buffer| buffer.write_bytes(bytes));
            }
        }

        let consumed = buffer.position() - block_start;
        let padded = align_up(consumed, align as u64);
        if padded > consumed {
            buffer.write_bytes(&vec![0u8; (padded - consumed) as usize]);
        }
    }
}

fn write_length(
    buffer: &mut PsdBuffer,
    version: Version,
    key: [u8; 4],
    f: impl FnOnce(&mut PsdBuffer),
) {
    let width = length_field_width(key, version);
    if width == 8 {
        buffer.write_length_prefixed_sized(Version::Psb, f);
    } else {
        buffer.write_length_prefixed_u32(f);
    }
}

fn read_signature(cursor: &mut PsdCursor) -> Result<[u8; 4]> {
    let bytes = cursor.read_4()?;
    if bytes != SIG_8BIM && bytes != SIG_8B64 {
        let mut found = [0u8; 4];
        found.copy_from_slice(bytes);
        return Err(PsdError::BadSignature {
            section: SectionKind::TaggedBlock,
            expected: SIG_8BIM,
            found,
        });
    }
    let mut sig = [0u8; 4];
    sig.copy_from_slice(bytes);
    Ok(sig)
}

fn parse_section_divider(payload: &[u8]) -> Result<TaggedBlock> {
    let mut cursor = PsdCursor::new(payload);
    let kind = SectionDividerKind::from_u32(cursor.read_u32()?)?;
    let blend_mode = if cursor.remaining() >= 8 {
        let sig = cursor.read_4()?;
        if sig != SIG_8BIM {
            let mut found = [0u8; 4];
            found.copy_from_slice(sig);
            return Err(PsdError::BadSignature {
                section: SectionKind::TaggedBlock,
                expected: SIG_8BIM,
                found,
            });
        }
        let key = cursor.read_4()?;
        let mut key_arr = [0u8; 4];
        key_arr.copy_from_slice(key);
        Some(BlendMode::from_key(&key_arr)?)
    } else {
        None
    };
    Ok(TaggedBlock::SectionDivider { kind, blend_mode })
}

fn align_up(value: u64, align: u64) -> u64 {
    if align <= 1 {
        return value;
    }
    let remainder = value % align;
    if remainder == 0 {
        value
    } else {
        value + (align - remainder)
    }
}

/// Read tagged blocks until the cursor runs out of the `total_len` bytes that were reserved for
/// this additional-layer-info region (document-level regions use `align = 2`, per-layer regions
/// use `align = 4`, per spec.md §4.5).
pub(crate) fn read_all(
    cursor: &mut PsdCursor,
    total_len: u64,
    version: Version,
    align: usize,
) -> Result<Vec<TaggedBlock>> {
    let end = cursor.position() + total_len;
    let mut blocks = Vec::new();
    // A lone `8BIM`/`8B64` signature with no room for a key + length field is padding, not a
    // block; bail out once fewer than 12 bytes remain (4 sig + 4 key + 4 min length).
    while cursor.position() + 12 <= end {
        blocks.push(TaggedBlock::read(cursor, version, align)?);
    }
    if cursor.position() < end {
        cursor.read_len(end - cursor.position())?;
    }
    Ok(blocks)
}

pub(crate) fn write_all(
    buffer: &mut PsdBuffer,
    blocks: &[TaggedBlock],
    version: Version,
    align: usize,
) {
    for block in blocks {
        block.write(buffer, version, align);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_block_round_trips_with_its_original_signature() {
        let block = TaggedBlock::Unknown {
            signature: SIG_8B64,
            key: *b"zzzz",
            bytes: vec![1, 2, 3],
        };
        let mut buffer = PsdBuffer::new();
        block.write(&mut buffer, Version::Psd, 1);
        let bytes = buffer.into_bytes();
        let mut cursor = PsdCursor::new(&bytes);
        let parsed = TaggedBlock::read(&mut cursor, Version::Psd, 1).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn section_divider_round_trips_without_blend_mode() {
        let block = TaggedBlock::SectionDivider {
            kind: SectionDividerKind::OpenFolder,
            blend_mode: None,
        };
        let mut buffer = PsdBuffer::new();
        block.write(&mut buffer, Version::Psd, 4);
        let bytes = buffer.into_bytes();
        let mut cursor = PsdCursor::new(&bytes);
        let parsed = TaggedBlock::read(&mut cursor, Version::Psd, 4).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn section_divider_round_trips_with_passthrough_blend_mode() {
        let block = TaggedBlock::SectionDivider {
            kind: SectionDividerKind::ClosedFolder,
            blend_mode: Some(BlendMode::PassThrough),
        };
        let mut buffer = PsdBuffer::new();
        block.write(&mut buffer, Version::Psd, 4);
        let bytes = buffer.into_bytes();
        let mut cursor = PsdCursor::new(&bytes);
        let parsed = TaggedBlock::read(&mut cursor, Version::Psd, 4).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn wide_length_key_uses_64_bit_length_only_in_psb() {
        let block = TaggedBlock::Unknown {
            signature: SIG_8BIM,
            key: *b"Alph",
            bytes: vec![9; 5],
        };

        let mut psd_buffer = PsdBuffer::new();
        block.write(&mut psd_buffer, Version::Psd, 1);
        let psd_bytes = psd_buffer.into_bytes();
        // sig(4) + key(4) + len(4) + payload(5) = 17
        assert_eq!(psd_bytes.len(), 17);

        let mut psb_buffer = PsdBuffer::new();
        block.write(&mut psb_buffer, Version::Psb, 1);
        let psb_bytes = psb_buffer.into_bytes();
        // sig(4) + key(4) + len(8) + payload(5) = 21
        assert_eq!(psb_bytes.len(), 21);
    }

    #[test]
    fn read_all_stops_at_declared_length() {
        let a = TaggedBlock::Unknown {
            signature: SIG_8BIM,
            key: *b"abcd",
            bytes: vec![1, 2],
        };
        let b = TaggedBlock::Unknown {
            signature: SIG_8BIM,
            key: *b"efgh",
            bytes: vec![3, 4, 5],
        };
        let mut buffer = PsdBuffer::new();
        a.write(&mut buffer, Version::Psd, 2);
        b.write(&mut buffer, Version::Psd, 2);
        let bytes = buffer.into_bytes();
        let total_len = bytes.len() as u64;

        let mut cursor = PsdCursor::new(&bytes);
        let blocks = read_all(&mut cursor, total_len, Version::Psd, 2).unwrap();
        assert_eq!(blocks, vec![a, b]);
    }
}
