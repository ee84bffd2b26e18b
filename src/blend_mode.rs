//! The closed set of blend modes a layer or group can declare.
//!
//! Variant names and four-character keys are grounded in `PhotoshopAPI/src/Util/Enum.h`'s
//! `blendModeMap`; the `PassThrough` relocation rule (I4/I5) lives in
//! `crate::bridge::{parse, materialize}`, not here — this module is a closed, mode-less key map,
//! no compositing math, since rendering a document is out of scope.

use crate::error::PsdError;
use serde::{Deserialize, Serialize};

/// A layer or group's blend mode, as declared in its layer record (or relocated from a
/// `lrSectionDivider` tagged block for `PassThrough` groups, see spec invariants I4/I5).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum BlendMode {
    PassThrough,
    Normal,
    Dissolve,
    Darken,
    Multiply,
    ColorBurn,
    LinearBurn,
    DarkerColor,
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,
    LighterColor,
    Overlay,
    SoftLight,
    HardLight,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// Parse the four-byte signature key stored in a layer record's blend-mode field.
    pub(crate) fn from_key(key: &[u8; 4]) -> Result<BlendMode, PsdError> {
        let mode = match key {
            b"pass" => BlendMode::PassThrough,
            b"norm" => BlendMode::Normal,
            b"diss" => BlendMode::Dissolve,
            b"dark" => BlendMode::Darken,
            b"mul " => BlendMode::Multiply,
            b"idiv" => BlendMode::ColorBurn,
            b"lbrn" => BlendMode::LinearBurn,
            b"dkCl" => BlendMode::DarkerColor,
            b"lite" => BlendMode::Lighten,
            b"scrn" => BlendMode::Screen,
            b"div " => BlendMode::ColorDodge,
            b"lddg" => BlendMode::LinearDodge,
            b"lgCl" => BlendMode::LighterColor,
            b"over" => BlendMode::Overlay,
            b"sLit" => BlendMode::SoftLight,
            b"hLit" => BlendMode::HardLight,
            b"vLit" => BlendMode::VividLight,
            b"lLit" => BlendMode::LinearLight,
            b"pLit" => BlendMode::PinLight,
            b"hMix" => BlendMode::HardMix,
            b"diff" => BlendMode::Difference,
            b"smud" => BlendMode::Exclusion,
            b"fsub" => BlendMode::Subtract,
            b"fdiv" => BlendMode::Divide,
            b"hue " => BlendMode::Hue,
            b"sat " => BlendMode::Saturation,
            b"colr" => BlendMode::Color,
            b"lum " => BlendMode::Luminosity,
            _ => {
                return Err(PsdError::BadEnumValue {
                    what: "blend mode key",
                    value: u32::from_be_bytes(*key) as i64,
                })
            }
        };
        Ok(mode)
    }

    /// The inverse of [`BlendMode::from_key`], used when materializing a layer record.
    pub(crate) fn to_key(self) -> [u8; 4] {
        match self {
            BlendMode::PassThrough => *b"pass",
            BlendMode::Normal => *b"norm",
            BlendMode::Dissolve => *b"diss",
            BlendMode::Darken => *b"dark",
            BlendMode::Multiply => *b"mul ",
            BlendMode::ColorBurn => *b"idiv",
            BlendMode::LinearBurn => *b"lbrn",
            BlendMode::DarkerColor => *b"dkCl",
            BlendMode::Lighten => *b"lite",
            BlendMode::Screen => *b"scrn",
            BlendMode::ColorDodge => *b"div ",
            BlendMode::LinearDodge => *b"lddg",
            BlendMode::LighterColor => *b"lgCl",
            BlendMode::Overlay => *b"over",
            BlendMode::SoftLight => *b"sLit",
            BlendMode::HardLight => *b"hLit",
            BlendMode::VividLight => *b"vLit",
            BlendMode::LinearLight => *b"lLit",
            BlendMode::PinLight => *b"pLit",
            BlendMode::HardMix => *b"hMix",
            BlendMode::Difference => *b"diff",
            BlendMode::Exclusion => *b"smud",
            BlendMode::Subtract => *b"fsub",
            BlendMode::Divide => *b"fdiv",
            BlendMode::Hue => *b"hue ",
            BlendMode::Saturation => *b"sat ",
            BlendMode::Color => *b"colr",
            BlendMode::Luminosity => *b"lum ",
        }
    }
}
