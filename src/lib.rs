//! Data structures and methods for reading, modeling, and writing Adobe Photoshop PSD/PSB
//! documents.
//!
//! Two models sit on top of each other here: a byte-faithful file model
//! ([`sections`]/[`file`], one struct per on-disk section) and a hierarchical document model
//! ([`document::LayeredFile`], a tree of named layers). [`bridge::parse`]/[`bridge::materialize`]
//! convert between them; [`read`]/[`write`] are the entry points most callers want.
//!
//! psd spec: https://www.adobe.com/devnet-apps/photoshop/fileformatashtml/

#![deny(missing_docs)]

mod blend_mode;
mod bridge;
mod compression;
mod document;
mod enums;
mod error;
mod file;
mod io;
mod sample;
mod sections;

pub use crate::blend_mode::BlendMode;
pub use crate::document::{
    ChannelIDInfo, GroupLayer, ImageChannel, ImageLayer, Layer, LayerCommon, LayerId, LayerMask,
    LayeredFile,
};
pub use crate::enums::{BitDepth, ChannelID, ColorMode, Compression, SectionDividerKind, Version};
pub use crate::error::{PsdError, Result, SectionKind};
pub use crate::sample::Sample;

use crate::file::PsdFile;

/// A parsed PSD/PSB document, polymorphic over the sample type its header declares.
///
/// The document model is generic over `T: Sample` for codec-level code (spec.md §9
/// "Polymorphism over sample type"), but callers reading an arbitrary file don't know its bit
/// depth in advance; this tagged variant is the sum type spec.md's design note recommends at the
/// outermost API boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyLayeredFile {
    /// An 8-bit-per-channel document.
    Eight(LayeredFile<u8>),
    /// A 16-bit-per-channel document.
    Sixteen(LayeredFile<u16>),
    /// A 32-bit-per-channel (floating point) document.
    ThirtyTwo(LayeredFile<f32>),
}

impl AnyLayeredFile {
    /// The bit depth of the wrapped document.
    pub fn bit_depth(&self) -> BitDepth {
        match self {
            AnyLayeredFile::Eight(doc) => doc.bit_depth(),
            AnyLayeredFile::Sixteen(doc) => doc.bit_depth(),
            AnyLayeredFile::ThirtyTwo(doc) => doc.bit_depth(),
        }
    }
}

/// Parse a whole PSD or PSB document from bytes.
///
/// Dispatches on the bit depth the file header declares, returning the matching
/// [`AnyLayeredFile`] variant. 1-bit bitmap documents have no document-model equivalent and fail
/// with [`PsdError::UnsupportedBitDepth`]. Fails with a single composite [`PsdError`] carrying an
/// offset-bearing message on any other error; the document is not partially populated on failure.
///
/// # Example
///
/// ```ignore
/// let psd_bytes = include_bytes!("./my-psd-file.psd");
/// let doc = psdoc::read(psd_bytes)?;
/// ```
pub fn read(bytes: &[u8]) -> Result<AnyLayeredFile> {
    let file = PsdFile::from_bytes(bytes)?;
    match file.header.depth {
        BitDepth::Eight => Ok(AnyLayeredFile::Eight(bridge::parse::<u8>(&file)?)),
        BitDepth::Sixteen => Ok(AnyLayeredFile::Sixteen(bridge::parse::<u16>(&file)?)),
        BitDepth::ThirtyTwo => Ok(AnyLayeredFile::ThirtyTwo(bridge::parse::<f32>(&file)?)),
        BitDepth::One => Err(PsdError::UnsupportedBitDepth(BitDepth::One)),
    }
}

/// Flatten and emit a document back into PSD/PSB bytes.
///
/// Consumes `doc`: the flattened tree is considered moved, matching the document model's
/// lifecycle (spec.md §3.2 "on emission the tree is flattened and consumed").
pub fn write(doc: AnyLayeredFile) -> Result<Vec<u8>> {
    let file = match doc {
        AnyLayeredFile::Eight(doc) => bridge::materialize(doc)?,
        AnyLayeredFile::Sixteen(doc) => bridge::materialize(doc)?,
        AnyLayeredFile::ThirtyTwo(doc) => bridge::materialize(doc)?,
    };
    Ok(file.write_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LayeredFile;

    #[test]
    fn empty_rgb_document_round_trips_through_read_and_write() {
        let doc = LayeredFile::<u8>::new(ColorMode::Rgb, 64, 64);
        let bytes = write(AnyLayeredFile::Eight(doc)).unwrap();

        let parsed = read(&bytes).unwrap();
        assert_eq!(parsed.bit_depth(), BitDepth::Eight);
        match parsed {
            AnyLayeredFile::Eight(doc) => {
                assert_eq!(doc.width, 64);
                assert_eq!(doc.height, 64);
                assert_eq!(doc.color_mode, ColorMode::Rgb);
                assert!(doc.root.is_empty());
            }
            _ => panic!("expected an 8-bit document"),
        }
    }

    #[test]
    fn one_bit_bitmap_depth_is_rejected() {
        // A minimal 26-byte header declaring 1-bit bitmap depth, with no further sections.
        let mut header = vec![];
        header.extend_from_slice(b"8BPS");
        header.extend_from_slice(&1u16.to_be_bytes()); // version
        header.extend_from_slice(&[0u8; 6]); // reserved
        header.extend_from_slice(&1u16.to_be_bytes()); // channel count
        header.extend_from_slice(&4u32.to_be_bytes()); // height
        header.extend_from_slice(&4u32.to_be_bytes()); // width
        header.extend_from_slice(&1u16.to_be_bytes()); // depth = 1
        header.extend_from_slice(&0u16.to_be_bytes()); // color mode = bitmap
        header.extend_from_slice(&0u32.to_be_bytes()); // color mode data length
        header.extend_from_slice(&0u32.to_be_bytes()); // image resources length
        header.extend_from_slice(&0u32.to_be_bytes()); // layer and mask info length
        header.extend_from_slice(&0u16.to_be_bytes()); // image data compression
        header.extend_from_slice(&[0u8; 16]); // raw channel bytes (width * height * sample_size)

        let err = read(&header).unwrap_err();
        assert!(matches!(err, PsdError::UnsupportedBitDepth(BitDepth::One)));
    }
}
