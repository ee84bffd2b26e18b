//! The terminal "image data" section: the merged/composite preview of the whole document
//! (spec.md §3 C4 / C7).
//!
//! Generalizes the teacher's `ImageDataSection` (which special-cased up to 4 raw or RLE
//! channels) into a channel-count-agnostic codec that also supports ZIP/ZIP-prediction decode,
//! using [`crate::compression::decode_merged_channels`].

use crate::compression::{decode_merged_channels, encode_merged_channels};
use crate::enums::{BitDepth, Compression, Version};
use crate::error::Result;
use crate::io::{PsdBuffer, PsdCursor};

/// The merged image, one entry of raw sample bytes per channel, in channel order.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub(crate) compression: Compression,
    pub(crate) channels: Vec<Vec<u8>>,
    pub(crate) bit_depth: BitDepth,
}

impl ImageData {
    /// `bytes` is everything remaining after the layer-and-mask-information section (this
    /// section has no length marker of its own — it runs to EOF).
    pub(crate) fn from_bytes(
        bytes: &[u8],
        width: u32,
        height: u32,
        channel_count: usize,
        bit_depth: BitDepth,
        version: Version,
    ) -> Result<ImageData> {
        let mut cursor = PsdCursor::new(bytes);
        let compression = Compression::from_u16(cursor.read_u16()?)?;
        let rest = cursor.read_len(cursor.remaining())?;

        let channels = decode_merged_channels(
            rest,
            compression,
            channel_count,
            width,
            height,
            bit_depth,
            version,
        )?;

        Ok(ImageData {
            compression,
            channels,
            bit_depth,
        })
    }

    pub(crate) fn write(&self, buffer: &mut PsdBuffer, width: u32, height: u32, version: Version) {
        buffer.write_u16(self.compression.as_u16());
        let body = encode_merged_channels(
            &self.channels,
            self.compression,
            width,
            height,
            self.bit_depth,
            version,
        )
        .expect("materialize only selects encodable compressions");
        buffer.write_bytes(&body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_raw_rgb() {
        let width = 2;
        let height = 2;
        let channels = vec![
            vec![10u8, 20, 30, 40],
            vec![50u8, 60, 70, 80],
            vec![90u8, 100, 110, 120],
        ];
        let image = ImageData {
            compression: Compression::Raw,
            channels,
            bit_depth: BitDepth::Eight,
        };
        let mut buffer = PsdBuffer::new();
        image.write(&mut buffer, width, height, Version::Psd);
        let bytes = buffer.into_bytes();

        let parsed =
            ImageData::from_bytes(&bytes, width, height, 3, BitDepth::Eight, Version::Psd)
                .unwrap();
        assert_eq!(parsed.channels, image.channels);
    }

    #[test]
    fn round_trips_rle_single_channel() {
        let width = 4;
        let height = 2;
        let channels = vec![vec![1u8, 1, 1, 1, 2, 2, 3, 4]];
        let image = ImageData {
            compression: Compression::Rle,
            channels,
            bit_depth: BitDepth::Eight,
        };
        let mut buffer = PsdBuffer::new();
        image.write(&mut buffer, width, height, Version::Psb);
        let bytes = buffer.into_bytes();

        let parsed =
            ImageData::from_bytes(&bytes, width, height, 1, BitDepth::Eight, Version::Psb)
                .unwrap();
        assert_eq!(parsed.channels, image.channels);
    }

    #[test]
    fn round_trips_rle_sixteen_bit_channel() {
        let width = 2;
        let height = 2;
        let channels = vec![vec![0u8, 1, 0, 2, 0, 3, 0, 4]];
        let image = ImageData {
            compression: Compression::Rle,
            channels,
            bit_depth: BitDepth::Sixteen,
        };
        let mut buffer = PsdBuffer::new();
        image.write(&mut buffer, width, height, Version::Psd);
        let bytes = buffer.into_bytes();

        let parsed =
            ImageData::from_bytes(&bytes, width, height, 1, BitDepth::Sixteen, Version::Psd)
                .unwrap();
        assert_eq!(parsed.channels, image.channels);
    }
}
