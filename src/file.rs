//! The whole-document file model (spec.md §3.1): the five major sections glued together,
//! independent of the document-model tree that [`crate::bridge`] builds on top of it.

use crate::error::{PsdError, Result};
use crate::io::PsdBuffer;
use crate::sections::color_mode_data::ColorModeData;
use crate::sections::header::FileHeader;
use crate::sections::image_data::ImageData;
use crate::sections::image_resources::ImageResources;
use crate::sections::layer_mask_info::LayerAndMaskInformation;
use crate::sections::MajorSections;

const FILE_HEADER_LEN: usize = 26;

/// The byte-faithful view of a whole PSD/PSB document (spec.md §3 "file model").
pub(crate) struct PsdFile {
    pub(crate) header: FileHeader,
    pub(crate) color_mode_data: ColorModeData,
    pub(crate) image_resources: ImageResources,
    pub(crate) layer_and_mask: LayerAndMaskInformation,
    pub(crate) image_data: ImageData,
}

impl PsdFile {
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<PsdFile> {
        let header_bytes = bytes.get(..FILE_HEADER_LEN).ok_or(PsdError::UnexpectedEof {
            offset: 0,
            wanted: FILE_HEADER_LEN as u64,
            remaining: bytes.len() as u64,
        })?;
        let header = FileHeader::from_bytes(header_bytes)?;

        let major = MajorSections::from_bytes(bytes, header.version)?;

        let color_mode_data = ColorModeData::from_bytes(major.color_mode_data)?;
        let image_resources = ImageResources::from_bytes(major.image_resources)?;
        let layer_and_mask =
            LayerAndMaskInformation::from_bytes(major.layer_and_mask, header.version)?;
        let image_data = ImageData::from_bytes(
            major.image_data,
            header.width,
            header.height,
            header.channel_count as usize,
            header.depth,
            header.version,
        )?;

        Ok(PsdFile {
            header,
            color_mode_data,
            image_resources,
            layer_and_mask,
            image_data,
        })
    }

    pub(crate) fn write_bytes(&self) -> Vec<u8> {
        let mut buffer = PsdBuffer::new();
        self.header.write(&mut buffer);
        self.color_mode_data.write(&mut buffer);
        self.image_resources.write(&mut buffer);
        self.layer_and_mask.write(&mut buffer, self.header.version);
        self.image_data
            .write(&mut buffer, self.header.width, self.header.height, self.header.version);
        buffer.into_bytes()
    }
}
