//! The sample-type capability that parameterizes the document model (spec.md §3.2, §9 "Polymorphism
//! over sample type").
//!
//! `PhotoshopAPI`'s `LayeredFile<T>` is a C++ template over `uint8_t`/`uint16_t`/`float32_t`; the
//! teacher crate never generalized past 8-bit. We model the same parameterization as a sealed
//! trait bound rather than a template, matching design note §9's recommendation to prefer a
//! generic parameter at codec level.

use crate::enums::BitDepth;

mod private {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for f32 {}
}

/// A pixel sample type a document's channels can be stored in: `u8`, `u16`, or `f32`.
///
/// Closed to exactly those three implementations (spec.md §3.2), matching the
/// `BitDepth` values a real PSD/PSB header can declare.
pub trait Sample: private::Sealed + Copy + Send + Sync + PartialEq + std::fmt::Debug + 'static {
    /// The `BitDepth` a document using this sample type declares in its header.
    const BIT_DEPTH: BitDepth;

    /// Size in bytes of one sample, matching [`BitDepth::sample_size`].
    const SAMPLE_SIZE: usize;

    /// Decode one big-endian-encoded sample from the front of `bytes`.
    fn from_be_bytes(bytes: &[u8]) -> Self;

    /// Encode `self` as big-endian bytes, appending to `out`.
    fn write_be_bytes(self, out: &mut Vec<u8>);
}

impl Sample for u8 {
    const BIT_DEPTH: BitDepth = BitDepth::Eight;
    const SAMPLE_SIZE: usize = 1;

    fn from_be_bytes(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn write_be_bytes(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl Sample for u16 {
    const BIT_DEPTH: BitDepth = BitDepth::Sixteen;
    const SAMPLE_SIZE: usize = 2;

    fn from_be_bytes(bytes: &[u8]) -> Self {
        u16::from_be_bytes([bytes[0], bytes[1]])
    }

    fn write_be_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl Sample for f32 {
    const BIT_DEPTH: BitDepth = BitDepth::ThirtyTwo;
    const SAMPLE_SIZE: usize = 4;

    fn from_be_bytes(bytes: &[u8]) -> Self {
        f32::from_bits(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn write_be_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_bits().to_be_bytes());
    }
}

/// Decode a big-endian byte buffer into native samples (invariant I7: `bytes.len() ==
/// samples.len() * T::SAMPLE_SIZE`).
pub(crate) fn decode_samples<T: Sample>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(T::SAMPLE_SIZE)
        .map(T::from_be_bytes)
        .collect()
}

/// Inverse of [`decode_samples`].
pub(crate) fn encode_samples<T: Sample>(samples: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * T::SAMPLE_SIZE);
    for &sample in samples {
        sample.write_be_bytes(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u8_round_trips() {
        let samples = [1u8, 2, 3, 255];
        let bytes = encode_samples(&samples);
        assert_eq!(decode_samples::<u8>(&bytes), samples);
    }

    #[test]
    fn u16_round_trips() {
        let samples = [1u16, 0x0203, 0xffff];
        let bytes = encode_samples(&samples);
        assert_eq!(bytes.len(), samples.len() * 2);
        assert_eq!(decode_samples::<u16>(&bytes), samples);
    }

    #[test]
    fn f32_round_trips() {
        let samples = [0.0f32, 1.5, -2.25, f32::MAX];
        let bytes = encode_samples(&samples);
        assert_eq!(decode_samples::<f32>(&bytes), samples);
    }
}
