//! ZIP (deflate) and ZIP-with-prediction decode.
//!
//! The inner codec is deflate, consumed here as an opaque byte codec via `flate2` exactly the
//! way spec.md's Non-goals ask ("third-party compressors... consumed as an opaque byte codec").
//! The horizontal predictor is grounded in `PhotoshopAPI/src/Util/Compression/RLE.h`'s
//! `DecompressRLE` width-dispatched scanline handling, generalized per spec.md §9 note 3: 8-bit
//! predicts byte-by-byte, 16-bit predicts sample-by-sample (as `u16`), and 32-bit float is
//! byte-deinterleaved into four planes per row before each plane is predicted independently.
//!
//! Only decode is implemented: spec.md §9 note 2 permits the write path to fall back to Raw or
//! RLE instead of re-implementing a ZIP encoder.

use crate::error::{PsdError, Result};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Inflate a deflate/zlib stream.
pub(crate) fn inflate(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PsdError::Compression(format!("deflate decode failed: {e}")))?;
    Ok(out)
}

/// Inflate and undo the horizontal predictor, one scanline at a time.
///
/// `row_bytes` is the number of bytes per scanline in the final (unpredicted) output, i.e.
/// `width * sample_size`.
pub(crate) fn inflate_with_prediction(
    compressed: &[u8],
    width: usize,
    height: usize,
    sample_size: usize,
) -> Result<Vec<u8>> {
    let raw = inflate(compressed)?;
    let row_bytes = width * sample_size;
    if raw.len() != row_bytes * height {
        return Err(PsdError::Compression(format!(
            "zip-prediction row boundary mismatch: expected {} bytes, got {}",
            row_bytes * height,
            raw.len()
        )));
    }

    let mut out = Vec::with_capacity(raw.len());
    for row in raw.chunks_exact(row_bytes) {
        match sample_size {
            1 => out.extend(undo_byte_predictor(row)),
            2 => out.extend(undo_word_predictor(row)),
            4 => out.extend(undo_float_predictor(row, width)),
            other => {
                return Err(PsdError::Compression(format!(
                    "unsupported zip-prediction sample size: {other}"
                )))
            }
        }
    }
    Ok(out)
}

/// TIFF-style horizontal differencing over individual bytes: `out[i] = out[i-1] + in[i]`.
fn undo_byte_predictor(row: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(row.len());
    let mut prev = 0u8;
    for &byte in row {
        prev = prev.wrapping_add(byte);
        out.push(prev);
    }
    out
}

/// Same differencing, but accumulated over big-endian `u16` samples rather than raw bytes.
fn undo_word_predictor(row: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(row.len());
    let mut prev = 0u16;
    for sample in row.chunks_exact(2) {
        let delta = u16::from_be_bytes([sample[0], sample[1]]);
        prev = prev.wrapping_add(delta);
        out.extend_from_slice(&prev.to_be_bytes());
    }
    out
}

/// Undo the four-plane byte deinterleaving Photoshop applies to 32-bit float scanlines before
/// predicting: plane 0 holds every sample's most-significant byte, plane 3 the least.
fn undo_float_predictor(row: &[u8], width: usize) -> Vec<u8> {
    let mut planes = [
        undo_byte_predictor(&row[0..width]),
        undo_byte_predictor(&row[width..2 * width]),
        undo_byte_predictor(&row[2 * width..3 * width]),
        undo_byte_predictor(&row[3 * width..4 * width]),
    ];
    let mut out = Vec::with_capacity(row.len());
    for sample_index in 0..width {
        for plane in planes.iter_mut() {
            out.push(plane[sample_index]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn deflate(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn inflate_round_trips_raw_deflate() {
        let original = b"some arbitrary channel bytes".to_vec();
        let compressed = deflate(&original);
        assert_eq!(inflate(&compressed).unwrap(), original);
    }

    #[test]
    fn byte_predictor_recovers_constant_row() {
        let predicted = [5u8, 0, 0, 0];
        assert_eq!(undo_byte_predictor(&predicted), vec![5, 5, 5, 5]);
    }

    #[test]
    fn word_predictor_recovers_ramp() {
        let samples = [0u16, 10, 10, 10];
        let mut predicted = Vec::new();
        let mut prev = 0u16;
        for &s in &samples {
            predicted.extend_from_slice(&s.wrapping_sub(prev).to_be_bytes());
            prev = s;
        }
        assert_eq!(undo_word_predictor(&predicted), vec![0, 0, 0, 10, 0, 20, 0, 30]);
    }

    #[test]
    fn float_prediction_round_trips_through_deflate() {
        let width = 2usize;
        let samples: [f32; 2] = [1.5, -2.25];
        let be_bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_be_bytes()).collect();

        let mut planes = vec![Vec::new(); 4];
        for sample in be_bytes.chunks_exact(4) {
            for (plane, &byte) in planes.iter_mut().zip(sample.iter()) {
                plane.push(byte);
            }
        }
        let mut predicted_row = Vec::new();
        for plane in &planes {
            let mut prev = 0u8;
            for &byte in plane {
                predicted_row.push(byte.wrapping_sub(prev));
                prev = byte;
            }
        }
        let compressed = deflate(&predicted_row);

        let recovered = inflate_with_prediction(&compressed, width, 1, 4).unwrap();
        assert_eq!(recovered, be_bytes);
    }
}
