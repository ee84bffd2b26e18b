//! Per-layer mask data and blending ranges (spec.md §3.1 "Mask data" / §4.6).
//!
//! The dual-mask layout — vector mask first, pixel mask second with its fields in reverse order —
//! is grounded in `PhotoshopAPI/src/PhotoshopFile/LayerAndMaskInformation.cpp`'s
//! `LayerMaskData::LayerMaskData` constructor, which is the only place this crate found the
//! "read flags/default-color/extents instead of extents/default-color/flags for the second mask"
//! rule spelled out unambiguously.

use crate::error::Result;
use crate::io::{PsdBuffer, PsdCursor};

const POSITION_RELATIVE: u8 = 1 << 0;
const DISABLED: u8 = 1 << 1;
const IS_VECTOR: u8 = 1 << 3;
const HAS_MASK_PARAMS: u8 = 1 << 4;

const HAS_USER_DENSITY: u8 = 1 << 0;
const HAS_USER_FEATHER: u8 = 1 << 1;
const HAS_VECTOR_DENSITY: u8 = 1 << 2;
const HAS_VECTOR_FEATHER: u8 = 1 << 3;

/// One mask record: either the vector mask or the pixel (raster) mask of a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerMask {
    pub(crate) top: i32,
    pub(crate) left: i32,
    pub(crate) bottom: i32,
    pub(crate) right: i32,
    pub(crate) default_color: u8,
    pub(crate) position_relative_to_layer: bool,
    pub(crate) disabled: bool,
    pub(crate) is_vector: bool,
    pub(crate) user_mask_density: Option<u8>,
    pub(crate) user_mask_feather: Option<f64>,
    pub(crate) vector_mask_density: Option<u8>,
    pub(crate) vector_mask_feather: Option<f64>,
}

impl LayerMask {
    fn has_mask_params(&self) -> bool {
        self.user_mask_density.is_some()
            || self.user_mask_feather.is_some()
            || self.vector_mask_density.is_some()
            || self.vector_mask_feather.is_some()
    }

    fn flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.position_relative_to_layer {
            flags |= POSITION_RELATIVE;
        }
        if self.disabled {
            flags |= DISABLED;
        }
        if self.is_vector {
            flags |= IS_VECTOR;
        }
        if self.has_mask_params() {
            flags |= HAS_MASK_PARAMS;
        }
        flags
    }

    fn mask_params_byte(&self) -> u8 {
        let mut bits = 0u8;
        if self.user_mask_density.is_some() {
            bits |= HAS_USER_DENSITY;
        }
        if self.user_mask_feather.is_some() {
            bits |= HAS_USER_FEATHER;
        }
        if self.vector_mask_density.is_some() {
            bits |= HAS_VECTOR_DENSITY;
        }
        if self.vector_mask_feather.is_some() {
            bits |= HAS_VECTOR_FEATHER;
        }
        bits
    }

    fn read_mask_params(cursor: &mut PsdCursor, bits: u8) -> Result<MaskParams> {
        Ok(MaskParams {
            user_mask_density: if bits & HAS_USER_DENSITY != 0 {
                Some(cursor.read_u8()?)
            } else {
                None
            },
            user_mask_feather: if bits & HAS_USER_FEATHER != 0 {
                Some(cursor.read_f64()?)
            } else {
                None
            },
            vector_mask_density: if bits & HAS_VECTOR_DENSITY != 0 {
                Some(cursor.read_u8()?)
            } else {
                None
            },
            vector_mask_feather: if bits & HAS_VECTOR_FEATHER != 0 {
                Some(cursor.read_f64()?)
            } else {
                None
            },
        })
    }

    fn write_mask_params(&self, buffer: &mut PsdBuffer) {
        if !self.has_mask_params() {
            return;
        }
        buffer.write_u8(self.mask_params_byte());
        if let Some(density) = self.user_mask_density {
            buffer.write_u8(density);
        }
        if let Some(feather) = self.user_mask_feather {
            buffer.write_f64(feather);
        }
        if let Some(density) = self.vector_mask_density {
            buffer.write_u8(density);
        }
        if let Some(feather) = self.vector_mask_feather {
            buffer.write_f64(feather);
        }
    }
}

struct MaskParams {
    user_mask_density: Option<u8>,
    user_mask_feather: Option<f64>,
    vector_mask_density: Option<u8>,
    vector_mask_feather: Option<f64>,
}

impl MaskParams {
    fn apply(self, mask: &mut LayerMask) {
        mask.user_mask_density = self.user_mask_density;
        mask.user_mask_feather = self.user_mask_feather;
        mask.vector_mask_density = self.vector_mask_density;
        mask.vector_mask_feather = self.vector_mask_feather;
    }
}

/// The mask-data sub-region of a layer record's extra data: zero, one, or two mask records
/// (spec.md §4.6, scenario 6 "Dual mask").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskData {
    /// Present when the layer has a raster ("pixel") user mask.
    pub(crate) pixel_mask: Option<LayerMask>,
    /// Present when the layer has a vector mask.
    pub(crate) vector_mask: Option<LayerMask>,
}

impl MaskData {
    pub(crate) fn from_bytes(cursor: &mut PsdCursor) -> Result<MaskData> {
        let len = cursor.read_u32()? as i64;
        if len == 0 {
            return Ok(MaskData::default());
        }

        let start = cursor.position();
        let mut to_read = len;

        let top = cursor.read_i32()?;
        let left = cursor.read_i32()?;
        let bottom = cursor.read_i32()?;
        let right = cursor.read_i32()?;
        to_read -= 16;
        let default_color = cursor.read_u8()?;
        to_read -= 1;
        let flags = cursor.read_u8()?;
        to_read -= 1;

        let mut first = LayerMask {
            top,
            left,
            bottom,
            right,
            default_color,
            position_relative_to_layer: flags & POSITION_RELATIVE != 0,
            disabled: flags & DISABLED != 0,
            is_vector: flags & IS_VECTOR != 0,
            user_mask_density: None,
            user_mask_feather: None,
            vector_mask_density: None,
            vector_mask_feather: None,
        };

        let first_has_mask_params = flags & HAS_MASK_PARAMS != 0;
        if first_has_mask_params && len <= 28 {
            let params_bits = cursor.read_u8()?;
            to_read -= 1;
            let before = cursor.position();
            LayerMask::read_mask_params(cursor, params_bits)?.apply(&mut first);
            to_read -= (cursor.position() - before) as i64;
        }

        let mut pixel_mask = None;
        let mut vector_mask = None;
        if first.is_vector {
            vector_mask = Some(first);
        } else {
            pixel_mask = Some(first);
        }

        if to_read >= 18 {
            let flags = cursor.read_u8()?;
            to_read -= 1;
            let default_color = cursor.read_u8()?;
            to_read -= 1;
            let top = cursor.read_i32()?;
            let left = cursor.read_i32()?;
            let bottom = cursor.read_i32()?;
            let right = cursor.read_i32()?;
            to_read -= 16;

            let mut second = LayerMask {
                top,
                left,
                bottom,
                right,
                default_color,
                position_relative_to_layer: flags & POSITION_RELATIVE != 0,
                disabled: flags & DISABLED != 0,
                is_vector: flags & IS_VECTOR != 0,
                user_mask_density: None,
                user_mask_feather: None,
                vector_mask_density: None,
                vector_mask_feather: None,
            };

            let second_has_mask_params = flags & HAS_MASK_PARAMS != 0;
            if first_has_mask_params || second_has_mask_params {
                let params_bits = cursor.read_u8()?;
                to_read -= 1;
                let before = cursor.position();
                LayerMask::read_mask_params(cursor, params_bits)?.apply(&mut second);
                to_read -= (cursor.position() - before) as i64;
            }

            // The second mask record is always the pixel mask (spec.md §4.6).
            pixel_mask = Some(second);
        }

        let consumed = cursor.position() - start;
        let remaining = len as u64 - consumed;
        if remaining > 0 {
            cursor.read_len(remaining)?;
        }

        Ok(MaskData {
            pixel_mask,
            vector_mask,
        })
    }

    pub(crate) fn write(&self, buffer: &mut PsdBuffer) {
        if self.pixel_mask.is_none() && self.vector_mask.is_none() {
            buffer.write_u32(0);
            return;
        }

        buffer.write_length_prefixed_u32(|buffer| {
            // Vector mask, if present, is always written first (spec.md §4.6).
            if let Some(vector) = &self.vector_mask {
                Self::write_mask_forward(buffer, vector);
            } else if let Some(pixel) = &self.pixel_mask {
                Self::write_mask_forward(buffer, pixel);
            }

            if self.vector_mask.is_some() {
                if let Some(pixel) = &self.pixel_mask {
                    Self::write_mask_reversed(buffer, pixel);
                }
            }
        });
    }

    fn write_mask_forward(buffer: &mut PsdBuffer, mask: &LayerMask) {
        buffer.write_i32(mask.top);
        buffer.write_i32(mask.left);
        buffer.write_i32(mask.bottom);
        buffer.write_i32(mask.right);
        buffer.write_u8(mask.default_color);
        buffer.write_u8(mask.flags());
        mask.write_mask_params(buffer);
    }

    fn write_mask_reversed(buffer: &mut PsdBuffer, mask: &LayerMask) {
        buffer.write_u8(mask.flags());
        buffer.write_u8(mask.default_color);
        buffer.write_i32(mask.top);
        buffer.write_i32(mask.left);
        buffer.write_i32(mask.bottom);
        buffer.write_i32(mask.right);
        mask.write_mask_params(buffer);
    }
}

/// Per-channel blending range tuples (spec.md §3.1 "Blending ranges").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendingRanges {
    pub(crate) source: Vec<(u8, u8, u8, u8)>,
    pub(crate) destination: Vec<(u8, u8, u8, u8)>,
}

impl BlendingRanges {
    pub(crate) fn from_bytes(cursor: &mut PsdCursor) -> Result<BlendingRanges> {
        let len = cursor.read_u32()? as i64;
        let mut to_read = len;
        let mut source = Vec::new();
        let mut destination = Vec::new();
        while to_read >= 8 {
            let s = cursor.read_4()?;
            source.push((s[0], s[1], s[2], s[3]));
            let d = cursor.read_4()?;
            destination.push((d[0], d[1], d[2], d[3]));
            to_read -= 8;
        }
        if to_read > 0 {
            cursor.read_len(to_read as u64)?;
        }
        Ok(BlendingRanges {
            source,
            destination,
        })
    }

    pub(crate) fn write(&self, buffer: &mut PsdBuffer) {
        buffer.write_length_prefixed_u32(|buffer| {
            for (s, d) in self.source.iter().zip(self.destination.iter()) {
                buffer.write_u8(s.0);
                buffer.write_u8(s.1);
                buffer.write_u8(s.2);
                buffer.write_u8(s.3);
                buffer.write_u8(d.0);
                buffer.write_u8(d.1);
                buffer.write_u8(d.2);
                buffer.write_u8(d.3);
            }
        });
    }
}
