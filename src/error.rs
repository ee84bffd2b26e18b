//! Error types shared by every codec in this crate.
//!
//! Mirrors the shape of [`crate::sections::file_header_section::FileHeaderSectionError`]-style
//! per-section errors that `chinedufn-psd` used to build on top of `failure`, finished as a
//! single `thiserror`-based hierarchy.

use thiserror::Error;

/// Which major or fixed section an error occurred in, used to annotate signature and
/// size-limit errors with enough context to find the offending bytes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum SectionKind {
    FileHeader,
    ColorModeData,
    ImageResources,
    LayerAndMaskInformation,
    ImageData,
    TaggedBlock,
    LayerRecord,
}

/// Every way that reading or writing a PSD/PSB document can fail.
///
/// This is the composite error from spec §7: codec-level errors bubble up through this type,
/// and [`PsdError::context`] lets the bridge (parse/materialize) annotate the offending layer
/// name or byte offset on the way out.
#[derive(Debug, Error)]
pub enum PsdError {
    /// The underlying reader/writer failed.
    #[error("i/o error at offset {offset}: {source}")]
    Io {
        /// Byte offset the operation was attempted at.
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// A declared length ran past the end of the available bytes.
    #[error("unexpected end of data: wanted {wanted} bytes at offset {offset}, only {remaining} remained")]
    UnexpectedEof {
        /// Offset the read started from.
        offset: u64,
        /// Number of bytes requested.
        wanted: u64,
        /// Number of bytes actually available.
        remaining: u64,
    },

    /// A seek targeted an offset past the end of the buffer.
    #[error("cannot seek to offset {offset}, buffer is only {len} bytes long")]
    BadOffset {
        /// Target offset.
        offset: u64,
        /// Length of the buffer being seeked in.
        len: u64,
    },

    /// A four-byte signature (`8BPS`, `8BIM`, `8B64`, ...) didn't match what was expected.
    #[error("{section:?} signature mismatch: expected {expected:?}, found {found:?}")]
    BadSignature {
        /// Section the signature was read from.
        section: SectionKind,
        /// The signature bytes that were expected.
        expected: [u8; 4],
        /// The signature bytes that were actually present.
        found: [u8; 4],
    },

    /// An integer or four-character code did not belong to its closed enumeration.
    #[error("invalid {what}: {value}")]
    BadEnumValue {
        /// Name of the field that held the bad value.
        what: &'static str,
        /// The offending value.
        value: i64,
    },

    /// A size or count exceeded a hard PSD/PSB limit (channel count, dimensions, scanline size).
    #[error("{what} exceeds its limit: {value} > {limit}")]
    SizeLimitExceeded {
        /// Name of the quantity that overflowed.
        what: &'static str,
        /// The offending value.
        value: u64,
        /// The limit it was checked against.
        limit: u64,
    },

    /// Group open/close markers were unbalanced while reconstructing the layer tree.
    #[error("layer tree is malformed: {reason}")]
    MalformedTree {
        /// Human-readable description of the imbalance.
        reason: String,
    },

    /// [`crate::document::LayeredFile::add_layer`] was called with a layer already in the tree.
    #[error("layer is already present in the document")]
    DuplicateLayer,

    /// A `/`-separated layer path did not resolve to a layer.
    #[error("no layer found at path {0:?}")]
    PathNotFound(String),

    /// A `move_layer` call would have created a cycle in the tree.
    #[error("cannot move a layer underneath itself or one of its own descendants")]
    Cycle,

    /// PackBits, deflate, or ZIP-prediction codec failure.
    #[error("compression error: {0}")]
    Compression(String),

    /// The header declared a bit depth the document model has no sample type for.
    ///
    /// Only `u8`/`u16`/`f32` document models exist (spec.md §9 "Polymorphism over sample type");
    /// 1-bit bitmap data has no equivalent and can't be bridged into a [`crate::document::LayeredFile`].
    #[error("unsupported bit depth for the document model: {0:?}")]
    UnsupportedBitDepth(crate::enums::BitDepth),

    /// Wraps another error with extra context (an offending layer name or byte offset),
    /// added as the error propagates up through the parse/materialize bridge.
    #[error("{context}: {source}")]
    WithContext {
        /// The extra context describing where/why the inner error happened.
        context: String,
        #[source]
        source: Box<PsdError>,
    },
}

impl PsdError {
    /// Wrap `self` with additional context, e.g. the layer name the bridge was working on.
    pub fn context(self, context: impl Into<String>) -> Self {
        PsdError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PsdError>;
