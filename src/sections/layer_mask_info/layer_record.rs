//! Per-layer records: the flat, file-order description of a single layer or group boundary
//! (spec.md §3 C6 / §4.6 / §6.1 `LayerRecord`).
//!
//! Grounded in `PhotoshopAPI/src/PhotoshopFile/LayerAndMaskInformation.h`'s `LayerRecord` and the
//! teacher's (`chinedufn-psd`) simpler, skip-everything `read_layer_record`; this version keeps
//! every field the teacher skipped (mask data, blending ranges, additional layer info) instead
//! of discarding it.

use crate::blend_mode::BlendMode;
use crate::enums::{Compression, Version};
use crate::error::{PsdError, Result, SectionKind};
use crate::io::{PsdBuffer, PsdCursor};
use crate::sections::layer_mask_info::mask::{BlendingRanges, MaskData};
use crate::sections::layer_mask_info::tagged_block::{self, TaggedBlock};

const LAYER_SIGNATURE: [u8; 4] = *b"8BIM";
const TRANSPARENCY_PROTECTED: u8 = 1 << 0;
const HIDDEN: u8 = 1 << 1;
const BIT4_MEANINGFUL: u8 = 1 << 3;
const PIXEL_DATA_IRRELEVANT: u8 = 1 << 4;

/// One channel's compressed image data, paired with the channel id it belongs to.
///
/// `data` excludes the leading `u16` compression marker (that's `compression`); this mirrors the
/// split [`crate::compression::decode_channel_body`] expects.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LayerChannel {
    pub(crate) id: i16,
    pub(crate) compression: Compression,
    pub(crate) data: Vec<u8>,
}

/// A single flat layer record (spec.md §6.1 `LayerRecord`).
///
/// This can describe an ordinary image layer, or — when `additional_layer_info` carries a
/// `lrSectionDivider` tagged block — a group's open/closed-folder marker or its section-end
/// marker. Reconstructing which is which, and rebuilding the tree, is [`crate::bridge`]'s job.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LayerRecord {
    pub(crate) top: i32,
    pub(crate) left: i32,
    pub(crate) bottom: i32,
    pub(crate) right: i32,
    pub(crate) channels: Vec<LayerChannel>,
    pub(crate) blend_mode: BlendMode,
    pub(crate) opacity: u8,
    pub(crate) clipping: bool,
    pub(crate) transparency_protected: bool,
    pub(crate) visible: bool,
    pub(crate) pixel_data_irrelevant: bool,
    pub(crate) mask_data: MaskData,
    pub(crate) blending_ranges: BlendingRanges,
    pub(crate) name: Vec<u8>,
    pub(crate) additional_layer_info: Vec<TaggedBlock>,
}

impl LayerRecord {
    /// Find the `lrSectionDivider` tagged block on this record, if any (spec.md §4.8).
    pub(crate) fn section_divider(&self) -> Option<(&crate::enums::SectionDividerKind, &Option<BlendMode>)> {
        self.additional_layer_info.iter().find_map(|block| match block {
            TaggedBlock::SectionDivider { kind, blend_mode } => Some((kind, blend_mode)),
            _ => None,
        })
    }

    fn flags(&self) -> u8 {
        let mut flags = BIT4_MEANINGFUL;
        if self.transparency_protected {
            flags |= TRANSPARENCY_PROTECTED;
        }
        if !self.visible {
            flags |= HIDDEN;
        }
        if self.pixel_data_irrelevant {
            flags |= PIXEL_DATA_IRRELEVANT;
        }
        flags
    }
}

/// Read the header of one layer record — everything up to and including its additional-layer-
/// info — but not yet its channel image data, since that's stored in a separate section further
/// down the file for every layer in sequence (spec.md §3.1 "Layer info").
///
/// Returns the record (with an empty `channels` list) plus the `(channel_id, declared_size)`
/// pairs needed to read the matching channel-image-data block later.
pub(crate) fn read_header(
    cursor: &mut PsdCursor,
    version: Version,
) -> Result<(LayerRecord, Vec<(i16, u64)>)> {
    let top = cursor.read_i32()?;
    let left = cursor.read_i32()?;
    let bottom = cursor.read_i32()?;
    let right = cursor.read_i32()?;

    let channel_count = cursor.read_u16()?;
    if channel_count > 56 {
        return Err(PsdError::SizeLimitExceeded {
            what: "layer channel count",
            value: channel_count as u64,
            limit: 56,
        });
    }

    let mut channel_sizes = Vec::with_capacity(channel_count as usize);
    for _ in 0..channel_count {
        let id = cursor.read_i16()?;
        let size = cursor.read_sized(version)?;
        channel_sizes.push((id, size));
    }

    let signature = cursor.read_4()?;
    if signature != LAYER_SIGNATURE {
        let mut found = [0u8; 4];
        found.copy_from_slice(signature);
        return Err(PsdError::BadSignature {
            section: SectionKind::LayerRecord,
            expected: LAYER_SIGNATURE,
            found,
        });
    }

    let blend_key = cursor.read_4()?;
    let mut blend_key_arr = [0u8; 4];
    blend_key_arr.copy_from_slice(blend_key);
    let blend_mode = BlendMode::from_key(&blend_key_arr).unwrap_or_else(|_| {
        tracing::warn!(key = ?blend_key_arr, "unrecognized blend mode key, falling back to Normal");
        BlendMode::Normal
    });

    let opacity = cursor.read_u8()?;
    let clipping = cursor.read_u8()? != 0;
    let flags = cursor.read_u8()?;
    let _filler = cursor.read_u8()?;

    let extra_len = cursor.read_u32()? as u64;
    let extra_start = cursor.position();

    let mask_data = MaskData::from_bytes(cursor)?;
    let blending_ranges = BlendingRanges::from_bytes(cursor)?;

    let name = cursor.read_pascal_string()?.to_vec();
    // Name padding: the Pascal string's length byte plus its bytes together pad to a multiple
    // of 4 (spec.md §4.6 "Padding of the name to multiples of 4 is mandatory").
    let name_field_len = 1 + name.len();
    let padding = (4 - name_field_len % 4) % 4;
    if padding > 0 {
        cursor.read_len(padding as u64)?;
    }

    let extra_consumed = cursor.position() - extra_start;
    let additional_layer_info = if extra_consumed < extra_len {
        tagged_block::read_all(cursor, extra_len - extra_consumed, version, 4)?
    } else {
        Vec::new()
    };

    let record = LayerRecord {
        top,
        left,
        bottom,
        right,
        channels: Vec::new(),
        blend_mode,
        opacity,
        clipping,
        transparency_protected: flags & TRANSPARENCY_PROTECTED != 0,
        visible: flags & HIDDEN == 0,
        pixel_data_irrelevant: flags & PIXEL_DATA_IRRELEVANT != 0,
        mask_data,
        blending_ranges,
        name,
        additional_layer_info,
    };

    Ok((record, channel_sizes))
}

/// Read the channel image data following all layer-record headers, for one layer, given the
/// `(channel_id, declared_size)` pairs collected by [`read_header`] (spec.md §4.7).
pub(crate) fn read_channel_data(
    cursor: &mut PsdCursor,
    channel_sizes: &[(i16, u64)],
) -> Result<Vec<LayerChannel>> {
    let mut channels = Vec::with_capacity(channel_sizes.len());
    for &(id, size) in channel_sizes {
        let compression = Compression::from_u16(cursor.read_u16()?)?;
        let data_len = size.saturating_sub(2);
        let data = cursor.read_len(data_len)?.to_vec();
        channels.push(LayerChannel {
            id,
            compression,
            data,
        });
    }
    Ok(channels)
}

/// Write one layer record's header (everything but channel image data), returning the
/// `(channel_id, size)` pairs written into the channel-info list, which must be replayed
/// verbatim when [`write_channel_data`] is called for this record.
pub(crate) fn write_header(buffer: &mut PsdBuffer, record: &LayerRecord, version: Version) {
    buffer.write_i32(record.top);
    buffer.write_i32(record.left);
    buffer.write_i32(record.bottom);
    buffer.write_i32(record.right);

    buffer.write_u16(record.channels.len() as u16);
    for channel in &record.channels {
        buffer.write_i16(channel.id);
        buffer.write_sized(version, channel.data.len() as u64 + 2);
    }

    buffer.write_bytes(&LAYER_SIGNATURE);
    buffer.write_bytes(&record.blend_mode.to_key());
    buffer.write_u8(record.opacity);
    buffer.write_u8(record.clipping as u8);
    buffer.write_u8(record.flags());
    buffer.write_u8(0); // filler

    buffer.write_length_prefixed_u32(|buffer| {
        record.mask_data.write(buffer);
        record.blending_ranges.write(buffer);

        buffer.write_pascal_string(&record.name);
        let name_field_len = 1 + record.name.len();
        let padding = (4 - name_field_len % 4) % 4;
        for _ in 0..padding {
            buffer.write_u8(0);
        }

        tagged_block::write_all(buffer, &record.additional_layer_info, version, 4);
    });
}

/// Write one layer's channel image data, in the same order as its channel-info list (I2).
pub(crate) fn write_channel_data(buffer: &mut PsdBuffer, record: &LayerRecord) {
    for channel in &record.channels {
        buffer.write_u16(channel.compression.as_u16());
        buffer.write_bytes(&channel.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::layer_mask_info::mask::LayerMask;

    fn sample_record() -> LayerRecord {
        LayerRecord {
            top: 0,
            left: 0,
            bottom: 64,
            right: 64,
            channels: vec![
                LayerChannel {
                    id: 0,
                    compression: Compression::Raw,
                    data: vec![255; 64 * 64],
                },
                LayerChannel {
                    id: -1,
                    compression: Compression::Raw,
                    data: vec![0; 64 * 64],
                },
            ],
            blend_mode: BlendMode::Normal,
            opacity: 255,
            clipping: false,
            transparency_protected: false,
            visible: true,
            pixel_data_irrelevant: false,
            mask_data: MaskData::default(),
            blending_ranges: BlendingRanges::default(),
            name: b"layer one".to_vec(),
            additional_layer_info: Vec::new(),
        }
    }

    #[test]
    fn header_and_channel_data_round_trip() {
        let record = sample_record();

        let mut buffer = PsdBuffer::new();
        write_header(&mut buffer, &record, Version::Psd);
        write_channel_data(&mut buffer, &record);
        let bytes = buffer.into_bytes();

        let mut cursor = PsdCursor::new(&bytes);
        let (mut parsed, channel_sizes) = read_header(&mut cursor, Version::Psd).unwrap();
        parsed.channels = read_channel_data(&mut cursor, &channel_sizes).unwrap();

        assert_eq!(parsed, record);
    }

    #[test]
    fn unrecognized_blend_mode_falls_back_to_normal() {
        let mut record = sample_record();
        record.blend_mode = BlendMode::Multiply;

        let mut buffer = PsdBuffer::new();
        write_header(&mut buffer, &record, Version::Psd);
        let mut bytes = buffer.into_bytes();
        // Corrupt the blend-mode key bytes (right after extents, channel count, and one
        // channel-info entry).
        let blend_key_offset = 16 + 2 + (2 + 4) * record.channels.len() + 4;
        bytes[blend_key_offset..blend_key_offset + 4].copy_from_slice(b"xxxx");

        let mut cursor = PsdCursor::new(&bytes);
        let (parsed, _) = read_header(&mut cursor, Version::Psd).unwrap();
        assert_eq!(parsed.blend_mode, BlendMode::Normal);
    }

    #[test]
    fn visibility_and_flags_round_trip() {
        let mut record = sample_record();
        record.visible = false;
        record.transparency_protected = true;
        record.pixel_data_irrelevant = true;

        let mut buffer = PsdBuffer::new();
        write_header(&mut buffer, &record, Version::Psd);
        let bytes = buffer.into_bytes();
        let mut cursor = PsdCursor::new(&bytes);
        let (parsed, _) = read_header(&mut cursor, Version::Psd).unwrap();

        assert!(!parsed.visible);
        assert!(parsed.transparency_protected);
        assert!(parsed.pixel_data_irrelevant);
    }

    #[test]
    fn preserves_mask_and_additional_info() {
        let mut record = sample_record();
        record.mask_data = MaskData {
            pixel_mask: Some(LayerMask {
                top: 0,
                left: 0,
                bottom: 64,
                right: 64,
                default_color: 0,
                position_relative_to_layer: false,
                disabled: false,
                is_vector: false,
                user_mask_density: None,
                user_mask_feather: None,
                vector_mask_density: None,
                vector_mask_feather: None,
            }),
            vector_mask: None,
        };
        record.additional_layer_info = vec![TaggedBlock::Unknown {
            signature: *b"8BIM",
            key: *b"lyid",
            bytes: vec![0, 0, 0, 7],
        }];

        let mut buffer = PsdBuffer::new();
        write_header(&mut buffer, &record, Version::Psd);
        let bytes = buffer.into_bytes();
        let mut cursor = PsdCursor::new(&bytes);
        let (parsed, _) = read_header(&mut cursor, Version::Psd).unwrap();

        assert_eq!(parsed.mask_data, record.mask_data);
        assert_eq!(parsed.additional_layer_info, record.additional_layer_info);
    }
}
