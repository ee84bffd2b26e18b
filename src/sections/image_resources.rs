//! The image resources section: an ordered sequence of opaque resource blocks (spec.md §3 C4).
//!
//! The teacher's `ImageResourcesSection` parses one resource type in depth (slices, resource id
//! 1050) via a hand-decoded descriptor structure, and otherwise discards everything. Rendering
//! and descriptor semantics are out of this crate's scope, so every resource block — including
//! slices — is kept as an opaque, round-trippable `(id, name, payload)` triple instead.

use crate::error::{PsdError, Result, SectionKind};
use crate::io::{PsdBuffer, PsdCursor};

const SIGNATURE: [u8; 4] = *b"8BIM";

/// A single resource block: a 16-bit id, a padded Pascal-string name, and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResourceBlock {
    pub(crate) id: i16,
    pub(crate) name: Vec<u8>,
    pub(crate) data: Vec<u8>,
}

/// The full, ordered list of image resource blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageResources {
    pub(crate) blocks: Vec<ImageResourceBlock>,
}

impl ImageResources {
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<ImageResources> {
        let mut cursor = PsdCursor::new(bytes);
        let total_len = cursor.read_u32()? as u64;
        let end = cursor.position() + total_len;

        let mut blocks = Vec::new();
        while cursor.position() < end {
            let signature = cursor.read_4()?;
            if signature != SIGNATURE {
                let mut found = [0u8; 4];
                found.copy_from_slice(signature);
                return Err(PsdError::BadSignature {
                    section: SectionKind::ImageResources,
                    expected: SIGNATURE,
                    found,
                });
            }
            let id = cursor.read_i16()?;
            let name = cursor.read_pascal_string()?.to_vec();
            // Pascal string + its length byte is padded to an even total length.
            if (name.len() + 1) % 2 != 0 {
                cursor.read_1()?;
            }

            let data_len = cursor.read_u32()?;
            let data = cursor.read(data_len)?.to_vec();
            if data_len % 2 != 0 {
                cursor.read_1()?;
            }

            blocks.push(ImageResourceBlock { id, name, data });
        }

        Ok(ImageResources { blocks })
    }

    pub(crate) fn write(&self, buffer: &mut PsdBuffer) {
        buffer.write_length_prefixed_u32(|buffer| {
            for block in &self.blocks {
                buffer.write_bytes(&SIGNATURE);
                buffer.write_i16(block.id);
                buffer.write_pascal_string(&block.name);
                if (block.name.len() + 1) % 2 != 0 {
                    buffer.write_u8(0);
                }
                buffer.write_u32(block.data.len() as u32);
                buffer.write_bytes(&block.data);
                if block.data.len() % 2 != 0 {
                    buffer.write_u8(0);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_empty() {
        let resources = ImageResources::default();
        let mut buffer = PsdBuffer::new();
        resources.write(&mut buffer);
        let parsed = ImageResources::from_bytes(&buffer.into_bytes()).unwrap();
        assert!(parsed.blocks.is_empty());
    }

    #[test]
    fn round_trips_one_block_with_odd_length_payload() {
        let resources = ImageResources {
            blocks: vec![ImageResourceBlock {
                id: 1050,
                name: b"abc".to_vec(),
                data: vec![1, 2, 3],
            }],
        };
        let mut buffer = PsdBuffer::new();
        resources.write(&mut buffer);
        let parsed = ImageResources::from_bytes(&buffer.into_bytes()).unwrap();
        assert_eq!(parsed, resources);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut bytes = vec![];
        bytes.extend_from_slice(&8u32.to_be_bytes());
        bytes.extend_from_slice(b"XXXX");
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert!(ImageResources::from_bytes(&bytes).is_err());
    }
}
