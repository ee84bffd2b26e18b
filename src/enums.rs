//! The closed enumerations that back the PSD/PSB file format (spec §3 C3).
//!
//! Grounded directly in `PhotoshopAPI/src/Util/Enum.h`'s `versionMap`, `bitDepthMap`,
//! `colorModeMap`, `compressionMap` and the three `*IntToChannelID` functions.

use crate::error::PsdError;
use serde::{Deserialize, Serialize};

/// Whether a document is a regular PSD or the large-document PSB variant.
///
/// This is the single switch that the rest of the codec dispatches on for every
/// width-variadic field (spec §6.1: "all marked u32/u64 depending on version").
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Version {
    /// Regular PSD. Width-dispatched fields are 32 bits; dimensions are capped at 30,000.
    Psd,
    /// Large document format. Width-dispatched fields are 64 bits; dimensions are capped at
    /// 300,000.
    Psb,
}

impl Version {
    pub(crate) fn from_u16(value: u16) -> Result<Self, PsdError> {
        match value {
            1 => Ok(Version::Psd),
            2 => Ok(Version::Psb),
            _ => Err(PsdError::BadEnumValue {
                what: "psd version",
                value: value as i64,
            }),
        }
    }

    pub(crate) fn as_u16(self) -> u16 {
        match self {
            Version::Psd => 1,
            Version::Psb => 2,
        }
    }

    /// Width in bytes of every version-dispatched length/offset field.
    pub(crate) fn field_width(self) -> usize {
        match self {
            Version::Psd => 4,
            Version::Psb => 8,
        }
    }

    /// Maximum width/height, in pixels, permitted for this version.
    pub(crate) fn max_dimension(self) -> u32 {
        match self {
            Version::Psd => 30_000,
            Version::Psb => 300_000,
        }
    }
}

/// Bits per channel sample.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum BitDepth {
    One = 1,
    Eight = 8,
    Sixteen = 16,
    ThirtyTwo = 32,
}

impl BitDepth {
    pub(crate) fn from_u16(value: u16) -> Result<Self, PsdError> {
        match value {
            1 => Ok(BitDepth::One),
            8 => Ok(BitDepth::Eight),
            16 => Ok(BitDepth::Sixteen),
            32 => Ok(BitDepth::ThirtyTwo),
            _ => Err(PsdError::BadEnumValue {
                what: "bit depth",
                value: value as i64,
            }),
        }
    }

    pub(crate) fn as_u16(self) -> u16 {
        self as u16
    }

    /// Size, in bytes, of a single sample at this depth (rounded up for the 1-bit case, which
    /// is still stored a byte at a time per scanline).
    pub(crate) fn sample_size(self) -> usize {
        match self {
            BitDepth::One => 1,
            BitDepth::Eight => 1,
            BitDepth::Sixteen => 2,
            BitDepth::ThirtyTwo => 4,
        }
    }
}

/// The color mode a document is stored in.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ColorMode {
    Bitmap = 0,
    Grayscale = 1,
    Indexed = 2,
    Rgb = 3,
    Cmyk = 4,
    Multichannel = 7,
    Duotone = 8,
    Lab = 9,
}

impl ColorMode {
    pub(crate) fn from_u16(value: u16) -> Result<Self, PsdError> {
        match value {
            0 => Ok(ColorMode::Bitmap),
            1 => Ok(ColorMode::Grayscale),
            2 => Ok(ColorMode::Indexed),
            3 => Ok(ColorMode::Rgb),
            4 => Ok(ColorMode::Cmyk),
            7 => Ok(ColorMode::Multichannel),
            8 => Ok(ColorMode::Duotone),
            9 => Ok(ColorMode::Lab),
            _ => Err(PsdError::BadEnumValue {
                what: "color mode",
                value: value as i64,
            }),
        }
    }

    pub(crate) fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Per-channel compression used for channel image data (spec §3.1 "Channel image data").
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Compression {
    Raw = 0,
    Rle = 1,
    Zip = 2,
    ZipWithPrediction = 3,
}

impl Compression {
    pub(crate) fn from_u16(value: u16) -> Result<Self, PsdError> {
        match value {
            0 => Ok(Compression::Raw),
            1 => Ok(Compression::Rle),
            2 => Ok(Compression::Zip),
            3 => Ok(Compression::ZipWithPrediction),
            _ => Err(PsdError::BadEnumValue {
                what: "channel compression",
                value: value as i64,
            }),
        }
    }

    pub(crate) fn as_u16(self) -> u16 {
        self as u16
    }
}

/// The kind of payload carried by a `lrSectionDivider` (`lsct`) tagged block (spec §4.5/§6.1).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum SectionDividerKind {
    /// A plain layer, or a layer that isn't part of a group boundary.
    AnyOther,
    /// The start of an expanded group, read in reverse display order.
    OpenFolder,
    /// The start of a collapsed group.
    ClosedFolder,
    /// The end of a group (bottommost record of the group in file order).
    SectionEnd,
}

impl SectionDividerKind {
    pub(crate) fn from_u32(value: u32) -> Result<Self, PsdError> {
        match value {
            0 => Ok(SectionDividerKind::AnyOther),
            1 => Ok(SectionDividerKind::OpenFolder),
            2 => Ok(SectionDividerKind::ClosedFolder),
            3 => Ok(SectionDividerKind::SectionEnd),
            _ => Err(PsdError::BadEnumValue {
                what: "section divider kind",
                value: value as i64,
            }),
        }
    }

    pub(crate) fn as_u32(self) -> u32 {
        match self {
            SectionDividerKind::AnyOther => 0,
            SectionDividerKind::OpenFolder => 1,
            SectionDividerKind::ClosedFolder => 2,
            SectionDividerKind::SectionEnd => 3,
        }
    }
}

/// Identifies a single channel within a layer or the merged image.
///
/// `0`/`1`/`2` are color-mode-dependent (spec §4.3): Red/Green/Blue in RGB, Cyan/Magenta/Yellow
/// in CMYK, Gray (channel 0 only) in Grayscale. `-1`/`-2`/`-3` are mode-independent.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ChannelID {
    Red,
    Green,
    Blue,
    Cyan,
    Magenta,
    Yellow,
    Black,
    Gray,
    /// Any channel index not otherwise assigned meaning by the color mode (e.g. spot channels).
    Custom(i16),
    TransparencyMask,
    UserSuppliedLayerMask,
    RealUserSuppliedLayerMask,
}

impl ChannelID {
    /// Color-mode-aware conversion from the raw `i16` channel id stored in a layer record or
    /// the merged image section (spec §4.3).
    pub fn from_index(index: i16, color_mode: ColorMode) -> ChannelID {
        match index {
            -1 => ChannelID::TransparencyMask,
            -2 => ChannelID::UserSuppliedLayerMask,
            -3 => ChannelID::RealUserSuppliedLayerMask,
            n => match (color_mode, n) {
                (ColorMode::Rgb, 0) => ChannelID::Red,
                (ColorMode::Rgb, 1) => ChannelID::Green,
                (ColorMode::Rgb, 2) => ChannelID::Blue,
                (ColorMode::Cmyk, 0) => ChannelID::Cyan,
                (ColorMode::Cmyk, 1) => ChannelID::Magenta,
                (ColorMode::Cmyk, 2) => ChannelID::Yellow,
                (ColorMode::Cmyk, 3) => ChannelID::Black,
                (ColorMode::Grayscale, 0) | (ColorMode::Bitmap, 0) => ChannelID::Gray,
                _ => ChannelID::Custom(n),
            },
        }
    }

    /// Inverse of [`ChannelID::from_index`], used when materializing channel-info entries.
    /// `color_mode` is unused: every variant already carries enough information to recover its
    /// raw index, since `from_index` only used the color mode to disambiguate 0..=3 on the way in.
    pub fn to_index(self, _color_mode: ColorMode) -> i16 {
        match self {
            ChannelID::TransparencyMask => -1,
            ChannelID::UserSuppliedLayerMask => -2,
            ChannelID::RealUserSuppliedLayerMask => -3,
            ChannelID::Custom(n) => n,
            ChannelID::Red | ChannelID::Cyan | ChannelID::Gray => 0,
            ChannelID::Green | ChannelID::Magenta => 1,
            ChannelID::Blue | ChannelID::Yellow => 2,
            ChannelID::Black => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_round_trips_per_color_mode() {
        let cases = [
            (ColorMode::Rgb, 0i16, ChannelID::Red),
            (ColorMode::Rgb, 1, ChannelID::Green),
            (ColorMode::Rgb, 2, ChannelID::Blue),
            (ColorMode::Cmyk, 3, ChannelID::Black),
            (ColorMode::Grayscale, 0, ChannelID::Gray),
            (ColorMode::Rgb, -2, ChannelID::UserSuppliedLayerMask),
            (ColorMode::Rgb, 7, ChannelID::Custom(7)),
        ];
        for (mode, index, expected) in cases {
            assert_eq!(ChannelID::from_index(index, mode), expected);
            assert_eq!(expected.to_index(mode), index);
        }
    }

    #[test]
    fn rejects_bad_version() {
        assert!(Version::from_u16(3).is_err());
    }
}
