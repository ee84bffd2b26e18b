//! PackBits (RLE) encode/decode, one scanline at a time.
//!
//! Decode keeps the teacher's `RLECompressed` iterator shape (`compression.rs`): walk a header
//! byte, then either copy a literal run or repeat a single byte. Encode is new — grounded in
//! `PhotoshopAPI/src/Util/Compression/RLE.h`'s `CompressPackBits`, but deliberately NOT a literal
//! port: that function's two non-run flush loops increment the *outer* scanline cursor (`++i`)
//! inside a loop meant to walk the *inner* literal run (`j`), which both skips input bytes and
//! desyncs `i` from the byte the outer `for` loop is also advancing. We use `j` there instead.

use crate::error::{PsdError, Result};

/// Decode a single PackBits-compressed scanline.
pub(crate) fn decode(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(compressed.len() * 2);
    let mut i = 0usize;
    while i < compressed.len() {
        let header = compressed[i] as i8;
        i += 1;
        if header == -128 {
            continue;
        } else if header >= 0 {
            let len = header as usize + 1;
            let end = i + len;
            if end > compressed.len() {
                return Err(PsdError::Compression(format!(
                    "packbits literal run of {len} bytes overruns input at offset {i}"
                )));
            }
            out.extend_from_slice(&compressed[i..end]);
            i = end;
        } else {
            let len = (1 - header as i16) as usize;
            if i >= compressed.len() {
                return Err(PsdError::Compression(format!(
                    "packbits repeat run missing its byte at offset {i}"
                )));
            }
            let byte = compressed[i];
            i += 1;
            out.extend(std::iter::repeat(byte).take(len));
        }
    }
    Ok(out)
}

/// Encode a single scanline with PackBits, run-length-encoding repeats of 2 or more identical
/// bytes and packing everything else into literal runs of up to 128 bytes.
pub(crate) fn encode(scanline: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(scanline.len() / 2 + 2);
    let mut i = 0usize;
    while i < scanline.len() {
        let run_len = run_length_at(scanline, i);
        if run_len >= 2 {
            let run_len = run_len.min(128);
            out.push((257 - run_len) as u8);
            out.push(scanline[i]);
            i += run_len;
            continue;
        }

        let literal_len = literal_length_at(scanline, i).min(128);
        out.push((literal_len - 1) as u8);
        out.extend_from_slice(&scanline[i..i + literal_len]);
        i += literal_len;
    }
    if out.len() % 2 != 0 {
        out.push(128);
    }
    out
}

fn run_length_at(scanline: &[u8], start: usize) -> usize {
    let mut len = 1;
    while start + len < scanline.len() && scanline[start + len] == scanline[start] {
        len += 1;
    }
    len
}

/// Length of the literal run starting at `start`: bytes up to (but not including) the next run
/// of 2+ repeats, capped so a single trailing byte doesn't get absorbed into the run it
/// precedes.
fn literal_length_at(scanline: &[u8], start: usize) -> usize {
    let mut len = 1;
    while start + len < scanline.len() {
        if run_length_at(scanline, start + len) >= 2 {
            break;
        }
        len += 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_literal_run() {
        let compressed = [3, 1, 2, 3, 4];
        assert_eq!(decode(&compressed).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn decodes_repeat_run() {
        let compressed = [253u8, 1];
        assert_eq!(decode(&compressed).unwrap(), vec![1, 1, 1, 1]);
    }

    #[test]
    fn decodes_noop_byte() {
        let compressed = [128u8, 0, 5];
        assert_eq!(decode(&compressed).unwrap(), vec![5]);
    }

    #[test]
    fn encode_decode_round_trips() {
        let cases: &[&[u8]] = &[
            &[],
            &[1, 2, 3, 4],
            &[7, 7, 7, 7, 7, 7],
            &[1, 1, 2, 3, 3, 3, 3, 9],
            &[0; 300],
            &(0..=255u8).collect::<Vec<u8>>(),
        ];
        for scanline in cases {
            let encoded = encode(scanline);
            let decoded = decode(&encoded).unwrap();
            assert_eq!(&decoded, scanline);
        }
    }

    #[test]
    fn encode_pads_to_even_length() {
        let encoded = encode(&[1, 2, 3]);
        assert_eq!(encoded.len() % 2, 0);
    }
}
