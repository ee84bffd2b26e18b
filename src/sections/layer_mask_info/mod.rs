//! The layer-and-mask-information major section (spec.md §3 C6 / §4.5-§4.7 / §6.1).
//!
//! Supersedes the teacher's `layer_and_mask_information_section` module, which only ever read
//! layer bounding boxes and channel lengths and threw the rest away. This version keeps layer
//! records, mask data, blending ranges and every tagged block (known or not) so the bridge in
//! `crate::bridge` has enough to rebuild a real layer tree.

pub(crate) mod layer_record;
pub(crate) mod mask;
pub(crate) mod tagged_block;

use crate::enums::Version;
use crate::error::Result;
use crate::io::{PsdBuffer, PsdCursor};
use layer_record::LayerRecord;
use tagged_block::TaggedBlock;

/// The flat "Layer info" sub-block: a signed count (negative means the first alpha channel of
/// the merged image is really layer 0's mask, spec.md §4.5) followed by that many layer records,
/// headers first and then every record's channel image data in the same order (spec.md §4.7 /
/// invariant I2).
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LayerInfo {
    pub(crate) merged_alpha: bool,
    pub(crate) records: Vec<LayerRecord>,
}

impl LayerInfo {
    /// Parse a "Layer info" block that carries its own version-sized length marker — the
    /// top-level field inside [`LayerAndMaskInformation`] (spec.md §6.1).
    pub(crate) fn from_bytes(cursor: &mut PsdCursor, version: Version) -> Result<LayerInfo> {
        let len = cursor.read_sized(version)?;
        if len == 0 {
            return Ok(LayerInfo::default());
        }
        let end = cursor.position() + len;
        let info = Self::read_body(cursor, version)?;
        if cursor.position() < end {
            cursor.read_len(end - cursor.position())?;
        }
        Ok(info)
    }

    /// Parse a "Layer info" body with no length marker of its own — the `Lr16`/`Lr32` nested
    /// case, where the tagged block's own length field already bounds the payload.
    pub(crate) fn from_body_bytes(bytes: &[u8], version: Version) -> Result<LayerInfo> {
        let mut cursor = PsdCursor::new(bytes);
        Self::read_body(&mut cursor, version)
    }

    fn read_body(cursor: &mut PsdCursor, version: Version) -> Result<LayerInfo> {
        if cursor.remaining() == 0 {
            return Ok(LayerInfo::default());
        }

        let raw_count = cursor.read_i16()?;
        let merged_alpha = raw_count < 0;
        let count = raw_count.unsigned_abs() as usize;

        let mut headers = Vec::with_capacity(count);
        for _ in 0..count {
            headers.push(layer_record::read_header(cursor, version)?);
        }

        let mut records = Vec::with_capacity(headers.len());
        for (mut record, channel_sizes) in headers {
            record.channels = layer_record::read_channel_data(cursor, &channel_sizes)?;
            records.push(record);
        }

        Ok(LayerInfo {
            merged_alpha,
            records,
        })
    }

    /// Write the top-level "Layer info" field, including its own version-sized length marker.
    pub(crate) fn write(&self, buffer: &mut PsdBuffer, version: Version) {
        buffer.write_length_prefixed_sized(version, |buffer| self.write_body(buffer, version));
    }

    /// Write a "Layer info" body with no length marker — the `Lr16`/`Lr32` nested case, where
    /// the enclosing tagged block supplies the length field.
    pub(crate) fn write_body(&self, buffer: &mut PsdBuffer, version: Version) {
        if self.records.is_empty() && !self.merged_alpha {
            return;
        }

        let raw_count: i16 = if self.merged_alpha {
            -(self.records.len() as i16)
        } else {
            self.records.len() as i16
        };
        buffer.write_i16(raw_count);

        for record in &self.records {
            layer_record::write_header(buffer, record, version);
        }
        for record in &self.records {
            layer_record::write_channel_data(buffer, record);
        }
    }
}

/// The global layer mask info sub-block: opaque, since the spec only models its presence and
/// round-trip, not its contents (spec.md §4.5 "Non-goals").
///
/// Unlike the layer-info and tagged-block length fields, this one stays a plain `u32` in both
/// PSD and PSB — it isn't in the wide-length key set and Adobe's own spec never widens it.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct GlobalLayerMaskInfo {
    pub(crate) bytes: Vec<u8>,
}

impl GlobalLayerMaskInfo {
    pub(crate) fn from_bytes(cursor: &mut PsdCursor) -> Result<GlobalLayerMaskInfo> {
        let len = cursor.read_u32()? as u64;
        let bytes = cursor.read_len(len)?.to_vec();
        Ok(GlobalLayerMaskInfo { bytes })
    }

    pub(crate) fn write(&self, buffer: &mut PsdBuffer) {
        buffer.write_u32(self.bytes.len() as u32);
        buffer.write_bytes(&self.bytes);
    }
}

/// The whole layer-and-mask-information major section (spec.md §4.5).
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LayerAndMaskInformation {
    pub(crate) layer_info: LayerInfo,
    pub(crate) global_layer_mask_info: GlobalLayerMaskInfo,
    pub(crate) additional_layer_info: Vec<TaggedBlock>,
}

impl LayerAndMaskInformation {
    /// Parse the section from bytes including its own version-sized length marker (the slice
    /// `MajorSections::from_bytes` hands back for this section).
    pub(crate) fn from_bytes(bytes: &[u8], version: Version) -> Result<LayerAndMaskInformation> {
        let mut cursor = PsdCursor::new(bytes);
        let section_len = cursor.read_sized(version)?;
        let end = cursor.position() + section_len;

        let layer_info = LayerInfo::from_bytes(&mut cursor, version)?;
        let global_layer_mask_info = GlobalLayerMaskInfo::from_bytes(&mut cursor)?;

        let additional_layer_info = if cursor.position() < end {
            tagged_block::read_all(&mut cursor, end - cursor.position(), version, 2)?
        } else {
            Vec::new()
        };

        Ok(LayerAndMaskInformation {
            layer_info,
            global_layer_mask_info,
            additional_layer_info,
        })
    }

    pub(crate) fn write(&self, buffer: &mut PsdBuffer, version: Version) {
        buffer.write_length_prefixed_sized(version, |buffer| {
            self.layer_info.write(buffer, version);
            self.global_layer_mask_info.write(buffer);
            tagged_block::write_all(buffer, &self.additional_layer_info, version, 2);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend_mode::BlendMode;
    use layer_record::LayerChannel;

    fn flat_layer(name: &str) -> LayerRecord {
        LayerRecord {
            top: 0,
            left: 0,
            bottom: 4,
            right: 4,
            channels: vec![LayerChannel {
                id: 0,
                compression: crate::enums::Compression::Raw,
                data: vec![0; 16],
            }],
            blend_mode: BlendMode::Normal,
            opacity: 255,
            clipping: false,
            transparency_protected: false,
            visible: true,
            pixel_data_irrelevant: false,
            mask_data: mask::MaskData::default(),
            blending_ranges: mask::BlendingRanges::default(),
            name: name.as_bytes().to_vec(),
            additional_layer_info: Vec::new(),
        }
    }

    #[test]
    fn empty_layer_info_round_trips() {
        let info = LayerInfo::default();
        let mut buffer = PsdBuffer::new();
        info.write(&mut buffer, Version::Psd);
        let bytes = buffer.into_bytes();
        let mut cursor = PsdCursor::new(&bytes);
        let parsed = LayerInfo::from_bytes(&mut cursor, Version::Psd).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn layer_info_with_records_round_trips() {
        let info = LayerInfo {
            merged_alpha: true,
            records: vec![flat_layer("a"), flat_layer("b")],
        };
        let mut buffer = PsdBuffer::new();
        info.write(&mut buffer, Version::Psd);
        let bytes = buffer.into_bytes();
        let mut cursor = PsdCursor::new(&bytes);
        let parsed = LayerInfo::from_bytes(&mut cursor, Version::Psd).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn nested_body_round_trips_without_its_own_length_marker() {
        let info = LayerInfo {
            merged_alpha: false,
            records: vec![flat_layer("nested")],
        };
        let mut buffer = PsdBuffer::new();
        info.write_body(&mut buffer, Version::Psb);
        let bytes = buffer.into_bytes();
        let parsed = LayerInfo::from_body_bytes(&bytes, Version::Psb).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn global_layer_mask_info_round_trips() {
        let info = GlobalLayerMaskInfo {
            bytes: vec![1, 2, 3, 4],
        };
        let mut buffer = PsdBuffer::new();
        info.write(&mut buffer);
        let bytes = buffer.into_bytes();
        let mut cursor = PsdCursor::new(&bytes);
        let parsed = GlobalLayerMaskInfo::from_bytes(&mut cursor).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn whole_section_round_trips_with_additional_tagged_blocks() {
        let section = LayerAndMaskInformation {
            layer_info: LayerInfo {
                merged_alpha: false,
                records: vec![flat_layer("only")],
            },
            global_layer_mask_info: GlobalLayerMaskInfo::default(),
            additional_layer_info: vec![TaggedBlock::Unknown {
                signature: *b"8BIM",
                key: *b"Patt",
                bytes: vec![9, 9],
            }],
        };
        let mut buffer = PsdBuffer::new();
        section.write(&mut buffer, Version::Psd);
        let bytes = buffer.into_bytes();
        let parsed = LayerAndMaskInformation::from_bytes(&bytes, Version::Psd).unwrap();
        assert_eq!(parsed, section);
    }

    #[test]
    fn psb_widens_the_section_length_field_to_64_bits() {
        let section = LayerAndMaskInformation::default();
        let mut buffer = PsdBuffer::new();
        section.write(&mut buffer, Version::Psb);
        let bytes = buffer.into_bytes();
        // outer section length (8) + empty layer-info length (8) + empty global-mask length (4)
        assert_eq!(bytes.len(), 20);
        let parsed = LayerAndMaskInformation::from_bytes(&bytes, Version::Psb).unwrap();
        assert_eq!(parsed, section);
    }
}
