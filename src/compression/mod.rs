//! Per-channel compression: the four codecs a channel's image data can be stored under
//! (spec.md §3 C2 / §4.2).

mod packbits;
mod zip;

use crate::enums::{BitDepth, Compression, Version};
use crate::error::{PsdError, Result};
use crate::io::{PsdBuffer, PsdCursor};

/// Decode a single channel's compressed bytes into raw, native-endian-independent big-endian
/// sample bytes (`width * height * sample_size`).
///
/// `compressed` is the channel's payload *including* its leading `u16` compression tag, matching
/// how channel bytes are framed in both the merged image-data section and per-layer channel
/// records (spec.md §4.2/§4.3).
pub(crate) fn decode_channel(
    compressed: &[u8],
    width: u32,
    height: u32,
    bit_depth: BitDepth,
    version: Version,
) -> Result<Vec<u8>> {
    let mut cursor = PsdCursor::new(compressed);
    let compression = Compression::from_u16(cursor.read_u16()?)?;
    let rest = cursor.read_len(cursor.remaining())?;
    decode_channel_body(rest, compression, width, height, bit_depth, version)
}

/// Same as [`decode_channel`] but for a payload that has already had its compression tag read
/// off separately (the layout the merged image-data section uses: one shared `u16` compression
/// tag per scan, not one per channel).
pub(crate) fn decode_channel_body(
    body: &[u8],
    compression: Compression,
    width: u32,
    height: u32,
    bit_depth: BitDepth,
    version: Version,
) -> Result<Vec<u8>> {
    let width = width as usize;
    let height = height as usize;
    let sample_size = bit_depth.sample_size();

    match compression {
        Compression::Raw => {
            let expected = width * height * sample_size;
            if body.len() != expected {
                return Err(PsdError::Compression(format!(
                    "raw channel data is {} bytes, expected {expected}",
                    body.len()
                )));
            }
            Ok(body.to_vec())
        }
        Compression::Rle => decode_rle(body, width, height, sample_size, version),
        Compression::Zip => zip::inflate(body),
        Compression::ZipWithPrediction => {
            zip::inflate_with_prediction(body, width, height, sample_size)
        }
    }
}

/// Encode a channel with the given compression. ZIP/ZIP-prediction encode is not implemented
/// (spec.md §9 note 2 allows the write path to fall back to Raw or RLE instead); requesting it
/// here is a programming error in the materialize bridge, not a data error, so it also returns
/// `Compression` to keep the call site uniform.
pub(crate) fn encode_channel(
    samples: &[u8],
    compression: Compression,
    width: u32,
    height: u32,
    bit_depth: BitDepth,
    version: Version,
) -> Result<Vec<u8>> {
    match compression {
        Compression::Raw => Ok(samples.to_vec()),
        Compression::Rle => Ok(encode_rle(
            samples,
            width as usize,
            height as usize,
            bit_depth.sample_size(),
            version,
        )),
        Compression::Zip | Compression::ZipWithPrediction => Err(PsdError::Compression(
            "zip encode is not supported; materialize with Raw or Rle instead".into(),
        )),
    }
}

/// Decode RLE-compressed channel data: a per-scanline table of compressed byte counts (`u16` for
/// PSD, `u32` for PSB), followed by that many PackBits-compressed bytes per row. A scanline is
/// `width * sample_size` bytes wide (`PhotoshopAPI/src/Util/Compression/RLE.h:253`'s
/// `data(..., width * sizeof(T))`), not `width` bytes — that only coincides for 8-bit channels.
fn decode_rle(
    body: &[u8],
    width: usize,
    height: usize,
    sample_size: usize,
    version: Version,
) -> Result<Vec<u8>> {
    let row_bytes = width * sample_size;
    let mut cursor = PsdCursor::new(body);
    let mut scanline_lens = Vec::with_capacity(height);
    for _ in 0..height {
        let len = match version {
            Version::Psd => cursor.read_u16()? as usize,
            Version::Psb => cursor.read_u32()? as usize,
        };
        scanline_lens.push(len);
    }

    let mut out = Vec::with_capacity(row_bytes * height);
    for len in scanline_lens {
        let scanline = cursor.read(len as u32)?;
        let decoded = packbits::decode(scanline)?;
        if decoded.len() != row_bytes {
            return Err(PsdError::Compression(format!(
                "packbits scanline decoded to {} bytes, expected {row_bytes}",
                decoded.len()
            )));
        }
        out.extend(decoded);
    }
    Ok(out)
}

/// Inverse of [`decode_rle`]: PackBits-encode each scanline and prefix with the per-row length
/// table.
fn encode_rle(samples: &[u8], width: usize, height: usize, sample_size: usize, version: Version) -> Vec<u8> {
    let row_bytes = width * sample_size;
    let mut encoded_rows = Vec::with_capacity(height);
    for row in samples.chunks_exact(row_bytes) {
        encoded_rows.push(packbits::encode(row));
    }

    let mut buffer = PsdBuffer::new();
    for row in &encoded_rows {
        match version {
            Version::Psd => buffer.write_u16(row.len() as u16),
            Version::Psb => buffer.write_u32(row.len() as u32),
        }
    }
    for row in &encoded_rows {
        buffer.write_bytes(row);
    }
    buffer.into_bytes()
}

/// Decode the terminal image-data section's merged-channel layout (spec.md §3 "Image data"):
/// one shared compression tag, then (for RLE) every channel's scanline-length table in
/// sequence, then every channel's packed scanline bytes in the same order.
pub(crate) fn decode_merged_channels(
    body: &[u8],
    compression: Compression,
    channel_count: usize,
    width: u32,
    height: u32,
    bit_depth: BitDepth,
    version: Version,
) -> Result<Vec<Vec<u8>>> {
    match compression {
        Compression::Raw => {
            let sample_size = bit_depth.sample_size();
            let per_channel = width as usize * height as usize * sample_size;
            if body.len() != per_channel * channel_count {
                return Err(PsdError::Compression(format!(
                    "raw merged image data is {} bytes, expected {}",
                    body.len(),
                    per_channel * channel_count
                )));
            }
            Ok(body.chunks_exact(per_channel).map(|c| c.to_vec()).collect())
        }
        Compression::Rle => {
            let row_bytes = width as usize * bit_depth.sample_size();
            let mut cursor = PsdCursor::new(body);
            let mut lens = vec![Vec::with_capacity(height as usize); channel_count];
            for channel_lens in lens.iter_mut() {
                for _ in 0..height {
                    let len = match version {
                        Version::Psd => cursor.read_u16()? as usize,
                        Version::Psb => cursor.read_u32()? as usize,
                    };
                    channel_lens.push(len);
                }
            }

            let mut channels = Vec::with_capacity(channel_count);
            for channel_lens in lens {
                let mut channel_bytes = Vec::with_capacity(row_bytes * height as usize);
                for len in channel_lens {
                    let scanline = cursor.read(len as u32)?;
                    let decoded = packbits::decode(scanline)?;
                    if decoded.len() != row_bytes {
                        return Err(PsdError::Compression(format!(
                            "packbits scanline decoded to {} bytes, expected {row_bytes}",
                            decoded.len()
                        )));
                    }
                    channel_bytes.extend(decoded);
                }
                channels.push(channel_bytes);
            }
            Ok(channels)
        }
        Compression::Zip | Compression::ZipWithPrediction => Err(PsdError::Compression(
            "zip compression is not supported for the merged image data section".into(),
        )),
    }
}

/// Inverse of [`decode_merged_channels`] for the Raw and RLE cases.
pub(crate) fn encode_merged_channels(
    channels: &[Vec<u8>],
    compression: Compression,
    width: u32,
    height: u32,
    bit_depth: BitDepth,
    version: Version,
) -> Result<Vec<u8>> {
    match compression {
        Compression::Raw => Ok(channels.concat()),
        Compression::Rle => {
            let row_bytes = width as usize * bit_depth.sample_size();
            let per_channel_rows: Vec<Vec<Vec<u8>>> = channels
                .iter()
                .map(|c| c.chunks_exact(row_bytes).map(packbits::encode).collect())
                .collect();

            let mut buffer = PsdBuffer::new();
            for rows in &per_channel_rows {
                for row in rows {
                    match version {
                        Version::Psd => buffer.write_u16(row.len() as u16),
                        Version::Psb => buffer.write_u32(row.len() as u32),
                    }
                }
            }
            for rows in &per_channel_rows {
                for row in rows {
                    buffer.write_bytes(row);
                }
            }
            let _ = height;
            Ok(buffer.into_bytes())
        }
        Compression::Zip | Compression::ZipWithPrediction => Err(PsdError::Compression(
            "zip encode is not supported; materialize with Raw or Rle instead".into(),
        )),
    }
}
