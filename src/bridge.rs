//! Bridges the byte-faithful file model (`crate::file`, `crate::sections`) and the hierarchical
//! document model (`crate::document`) — spec.md §4.8 C8+C9, "the single most subtle contract in
//! the design" being the split of a group's metadata across its section-end and folder records.
//!
//! Grounded in `PhotoshopAPI/src/LayeredFile/LayeredFile.cpp`'s `buildLayerHierarchy`/
//! `layersToLayerInfo`, reworked here as a stack machine over the reversed record stream rather
//! than the source's recursive pointer-walk, since the file model stores children by value.

use std::rc::Rc;

use crate::blend_mode::BlendMode;
use crate::document::{
    ChannelIDInfo, GroupLayer, ImageChannel, ImageLayer, Layer, LayerCommon, LayerMask,
    LayeredFile,
};
use crate::enums::{BitDepth, ChannelID, ColorMode, Compression as CompressionKind, SectionDividerKind, Version};
use crate::error::{PsdError, Result};
use crate::file::PsdFile;
use crate::sample::Sample;
use crate::sections::color_mode_data::ColorModeData;
use crate::sections::header::FileHeader;
use crate::sections::image_data::ImageData;
use crate::sections::image_resources::{ImageResourceBlock, ImageResources};
use crate::sections::layer_mask_info::layer_record::{LayerChannel, LayerRecord};
use crate::sections::layer_mask_info::mask::{LayerMask as FileLayerMask, MaskData};
use crate::sections::layer_mask_info::tagged_block::TaggedBlock;
use crate::sections::layer_mask_info::{GlobalLayerMaskInfo, LayerAndMaskInformation, LayerInfo};

const ICC_PROFILE_RESOURCE_ID: i16 = 1039;
const RESOLUTION_INFO_RESOURCE_ID: i16 = 1005;
const PSB_DIMENSION_THRESHOLD: u32 = 30_000;

/// Reconstruct a [`LayeredFile`] from a parsed [`PsdFile`] (spec.md §4.8 "Tree parse").
pub(crate) fn parse<T: Sample>(file: &PsdFile) -> Result<LayeredFile<T>> {
    let color_mode = file.header.color_mode;

    let records = resolve_layer_records(file, T::BIT_DEPTH)?;
    let root = reconstruct_tree::<T>(&records, color_mode)?;

    let icc_profile = extract_icc_profile(&file.image_resources);
    let dpi = extract_dpi(&file.image_resources).unwrap_or(72.0);

    Ok(LayeredFile {
        color_mode,
        dpi,
        width: file.header.width,
        height: file.header.height,
        icc_profile,
        compression: file.image_data.compression,
        root,
    })
}

/// Flatten a [`LayeredFile`] back into a [`PsdFile`] (spec.md §4.8 "Tree materialize").
pub(crate) fn materialize<T: Sample>(doc: LayeredFile<T>) -> Result<PsdFile> {
    let version = if doc.width > PSB_DIMENSION_THRESHOLD || doc.height > PSB_DIMENSION_THRESHOLD {
        Version::Psb
    } else {
        Version::Psd
    };

    let mut records = Vec::new();
    flatten_layers(&doc.root, doc.color_mode, &mut records);

    let layer_info = LayerInfo {
        merged_alpha: false,
        records,
    };

    // 16- and 32-bit-per-channel documents carry their layer data nested inside an `Lr16`/`Lr32`
    // tagged block instead of the top-level layer-info field (spec.md §4.5, scenario 5).
    let (top_level_layer_info, additional_layer_info) = match T::BIT_DEPTH {
        BitDepth::Sixteen => (LayerInfo::default(), vec![TaggedBlock::LayerInfo16(layer_info)]),
        BitDepth::ThirtyTwo => (LayerInfo::default(), vec![TaggedBlock::LayerInfo32(layer_info)]),
        _ => (layer_info, Vec::new()),
    };

    let layer_and_mask = LayerAndMaskInformation {
        layer_info: top_level_layer_info,
        global_layer_mask_info: GlobalLayerMaskInfo::default(),
        additional_layer_info,
    };

    let channel_count = base_channel_count(doc.color_mode);
    let header = FileHeader {
        version,
        channel_count: channel_count as u16,
        width: doc.width,
        height: doc.height,
        depth: T::BIT_DEPTH,
        color_mode: doc.color_mode,
    };

    // No rendering/compositing (non-goal): the merged image is emitted blank rather than
    // flattened from the layer tree.
    let blank_len = doc.width as usize * doc.height as usize * T::BIT_DEPTH.sample_size();
    let image_data = ImageData {
        compression: CompressionKind::Raw,
        channels: vec![vec![0u8; blank_len]; channel_count],
        bit_depth: T::BIT_DEPTH,
    };

    let mut resource_blocks = Vec::new();
    if let Some(profile) = &doc.icc_profile {
        resource_blocks.push(ImageResourceBlock {
            id: ICC_PROFILE_RESOURCE_ID,
            name: Vec::new(),
            data: profile.as_ref().clone(),
        });
    }
    resource_blocks.push(build_resolution_info_block(doc.dpi));

    Ok(PsdFile {
        header,
        color_mode_data: ColorModeData::default(),
        image_resources: ImageResources {
            blocks: resource_blocks,
        },
        layer_and_mask,
        image_data,
    })
}

/// Return the top-level layer record list, descending into `Lr16`/`Lr32` when the top level is
/// empty (spec.md §4.5 "a parser must detect an empty top-level layer-info and descend").
fn resolve_layer_records(file: &PsdFile, bit_depth: BitDepth) -> Result<Vec<LayerRecord>> {
    if !file.layer_and_mask.layer_info.records.is_empty() {
        return Ok(file.layer_and_mask.layer_info.records.clone());
    }

    let nested = file
        .layer_and_mask
        .additional_layer_info
        .iter()
        .find_map(|block| match (bit_depth, block) {
            (BitDepth::Sixteen, TaggedBlock::LayerInfo16(info)) => Some(info),
            (BitDepth::ThirtyTwo, TaggedBlock::LayerInfo32(info)) => Some(info),
            _ => None,
        });

    Ok(nested.map(|info| info.records.clone()).unwrap_or_default())
}

struct GroupFrame<T: Sample> {
    blend_mode: BlendMode,
    is_collapsed: bool,
    children: Vec<Layer<T>>,
}

/// Rebuild the layer tree from the flat record stream, walking it back-to-front (spec.md §4.8
/// "Tree parse"): file order is the reverse of display order, so iterating in reverse recovers
/// display order directly, with open/closed-folder markers opening a group and the section-end
/// marker closing it.
fn reconstruct_tree<T: Sample>(records: &[LayerRecord], color_mode: ColorMode) -> Result<Vec<Layer<T>>> {
    let mut stack: Vec<GroupFrame<T>> = Vec::new();
    let mut root: Vec<Layer<T>> = Vec::new();

    for record in records.iter().rev() {
        match record.section_divider() {
            Some((kind @ (SectionDividerKind::OpenFolder | SectionDividerKind::ClosedFolder), tag_blend_mode)) => {
                let is_collapsed = matches!(kind, SectionDividerKind::ClosedFolder);
                stack.push(GroupFrame {
                    blend_mode: tag_blend_mode.unwrap_or(record.blend_mode),
                    is_collapsed,
                    children: Vec::new(),
                });
            }
            Some((SectionDividerKind::SectionEnd, _)) => {
                let frame = stack.pop().ok_or_else(|| PsdError::MalformedTree {
                    reason: "section-end marker with no open group".to_string(),
                })?;
                let group = build_group_layer(record, frame, color_mode)
                    .map_err(|e| e.context(layer_context(record)))?;
                push_layer(&mut stack, &mut root, Layer::Group(group));
            }
            _ => {
                let layer = build_image_layer(record, color_mode)
                    .map_err(|e| e.context(layer_context(record)))?;
                push_layer(&mut stack, &mut root, Layer::Image(layer));
            }
        }
    }

    if !stack.is_empty() {
        return Err(PsdError::MalformedTree {
            reason: "unterminated group at end of layer stream".to_string(),
        });
    }

    Ok(root)
}

fn push_layer<T: Sample>(stack: &mut [GroupFrame<T>], root: &mut Vec<Layer<T>>, layer: Layer<T>) {
    match stack.last_mut() {
        Some(frame) => frame.children.push(layer),
        None => root.push(layer),
    }
}

/// Describes which layer record an error occurred on, for [`PsdError::context`] (spec.md §7
/// "offending layer name").
fn layer_context(record: &LayerRecord) -> String {
    format!("layer {:?}", String::from_utf8_lossy(&record.name))
}

/// A group's public metadata (name, opacity, visibility, mask) lives on its section-end record;
/// its structural metadata (open/closed, logical blend mode) lives on the frame collected from
/// the matching folder marker (spec.md §9 "Section-divider coupling").
fn build_group_layer<T: Sample>(
    section_end: &LayerRecord,
    frame: GroupFrame<T>,
    color_mode: ColorMode,
) -> Result<GroupLayer<T>> {
    let mut common = build_common(section_end, color_mode)?;
    common.blend_mode = frame.blend_mode;
    Ok(GroupLayer {
        common,
        children: frame.children,
        is_collapsed: frame.is_collapsed,
    })
}

fn build_image_layer<T: Sample>(record: &LayerRecord, color_mode: ColorMode) -> Result<ImageLayer<T>> {
    let mut common = build_common(record, color_mode)?;
    let width = common.width;
    let height = common.height;

    let mask_channel_id = ChannelID::UserSuppliedLayerMask.to_index(color_mode);
    let mut channels = Vec::with_capacity(record.channels.len());
    for channel in &record.channels {
        if channel.id == mask_channel_id {
            continue;
        }
        let image_channel =
            ImageChannel::<T>::from_compressed(width, height, channel.compression, channel.data.clone());
        channels.push((
            ChannelIDInfo {
                id: ChannelID::from_index(channel.id, color_mode),
                index: channel.id,
            },
            image_channel,
        ));
    }

    common.mask = build_document_mask::<T>(record, color_mode)?;
    Ok(ImageLayer { common, channels })
}

fn build_common<T: Sample>(record: &LayerRecord, color_mode: ColorMode) -> Result<LayerCommon<T>> {
    let name = String::from_utf8_lossy(&record.name).into_owned();
    let (center_x, center_y, width, height) = center_from_extents(record);

    let mut common = LayerCommon::new(name, width, height);
    common.blend_mode = record.blend_mode;
    common.opacity = record.opacity;
    common.is_visible = record.visible;
    common.is_locked = record.transparency_protected;
    common.clipping = record.clipping;
    common.center_x = center_x;
    common.center_y = center_y;
    common.mask = build_document_mask::<T>(record, color_mode)?;
    Ok(common)
}

/// Detach channel id −2 as a layer's pixel mask, if present (spec.md §4.8, scenario 2).
fn build_document_mask<T: Sample>(record: &LayerRecord, color_mode: ColorMode) -> Result<Option<LayerMask<T>>> {
    let pixel_mask = match &record.mask_data.pixel_mask {
        Some(mask) => mask,
        None => return Ok(None),
    };

    let mask_channel_id = ChannelID::UserSuppliedLayerMask.to_index(color_mode);
    let mask_channel = record.channels.iter().find(|channel| channel.id == mask_channel_id);

    let (width, height) = mask_extents(pixel_mask);
    let channel = match mask_channel {
        Some(channel) => {
            ImageChannel::<T>::from_compressed(width, height, channel.compression, channel.data.clone())
        }
        None => {
            let blank = vec![0u8; width as usize * height as usize * T::SAMPLE_SIZE];
            ImageChannel::<T>::from_compressed(width, height, CompressionKind::Raw, blank)
        }
    };

    Ok(Some(LayerMask {
        channel,
        default_color: pixel_mask.default_color,
        disabled: pixel_mask.disabled,
        relative_to_layer: pixel_mask.position_relative_to_layer,
        feather: pixel_mask.user_mask_feather.unwrap_or(0.0),
        density: pixel_mask.user_mask_density,
    }))
}

fn mask_extents(mask: &FileLayerMask) -> (u32, u32) {
    let width = (mask.right - mask.left).max(0) as u32;
    let height = (mask.bottom - mask.top).max(0) as u32;
    (width, height)
}

fn center_from_extents(record: &LayerRecord) -> (f64, f64, u32, u32) {
    let width = (record.right - record.left).max(0) as u32;
    let height = (record.bottom - record.top).max(0) as u32;
    let center_x = record.left as f64 + width as f64 / 2.0;
    let center_y = record.top as f64 + height as f64 / 2.0;
    (center_x, center_y, width, height)
}

fn extents(common: &LayerCommon<impl Sample>) -> (i32, i32, i32, i32) {
    let left = (common.center_x - common.width as f64 / 2.0).round() as i32;
    let top = (common.center_y - common.height as f64 / 2.0).round() as i32;
    (top, left, top + common.height as i32, left + common.width as i32)
}

/// Flatten a sequence of sibling layers into their flat record representation, in reverse
/// display order (spec.md §4.8 "Tree materialize"): a group becomes a section-end record, then
/// its children (also reversed), then an open/closed-folder record.
fn flatten_layers(layers: &[Layer<impl Sample>], color_mode: ColorMode, out: &mut Vec<LayerRecord>) {
    for layer in layers.iter().rev() {
        match layer {
            Layer::Image(image) => out.push(build_image_record(image, color_mode)),
            Layer::Group(group) => {
                out.push(build_section_end_record(group));
                flatten_layers(&group.children, color_mode, out);
                out.push(build_folder_record(group));
            }
        }
    }
}

fn build_image_record(layer: &ImageLayer<impl Sample>, color_mode: ColorMode) -> LayerRecord {
    let (top, left, bottom, right) = extents(&layer.common);

    let mut channels = Vec::with_capacity(layer.channels.len() + 1);
    for (info, channel) in &layer.channels {
        channels.push(LayerChannel {
            id: info.index,
            compression: channel.compression(),
            data: channel.compressed_bytes().to_vec(),
        });
    }

    let mask_data = if let Some(mask) = &layer.common.mask {
        channels.push(LayerChannel {
            id: ChannelID::UserSuppliedLayerMask.to_index(color_mode),
            compression: mask.channel.compression(),
            data: mask.channel.compressed_bytes().to_vec(),
        });
        mask_to_file_model(mask, top, left)
    } else {
        MaskData::default()
    };

    LayerRecord {
        top,
        left,
        bottom,
        right,
        channels,
        blend_mode: layer.common.blend_mode,
        opacity: layer.common.opacity,
        clipping: layer.common.clipping,
        transparency_protected: layer.common.is_locked,
        visible: layer.common.is_visible,
        pixel_data_irrelevant: false,
        mask_data,
        blending_ranges: Default::default(),
        name: layer.common.name.clone().into_bytes(),
        additional_layer_info: Vec::new(),
    }
}

/// The section-end record: a group's display name/opacity/visibility/mask (spec.md §4.8 "Tree
/// materialize" step (a)).
fn build_section_end_record(group: &GroupLayer<impl Sample>) -> LayerRecord {
    let (top, left, bottom, right) = extents(&group.common);

    let mask_data = match &group.common.mask {
        Some(mask) => mask_to_file_model(mask, top, left),
        None => MaskData::default(),
    };

    LayerRecord {
        top,
        left,
        bottom,
        right,
        channels: Vec::new(),
        blend_mode: BlendMode::Normal,
        opacity: group.common.opacity,
        clipping: group.common.clipping,
        transparency_protected: group.common.is_locked,
        visible: group.common.is_visible,
        pixel_data_irrelevant: false,
        mask_data,
        blending_ranges: Default::default(),
        name: group.common.name.clone().into_bytes(),
        additional_layer_info: vec![TaggedBlock::SectionDivider {
            kind: SectionDividerKind::SectionEnd,
            blend_mode: None,
        }],
    }
}

/// The open/closed-folder record: a group's structural metadata, with `PassThrough` relocated
/// into the section-divider tagged block (spec.md §4.8 "Tree materialize" step (c), invariant
/// I4).
fn build_folder_record(group: &GroupLayer<impl Sample>) -> LayerRecord {
    let (top, left, bottom, right) = extents(&group.common);

    let kind = if group.is_collapsed {
        SectionDividerKind::ClosedFolder
    } else {
        SectionDividerKind::OpenFolder
    };

    let (record_blend_mode, tag_blend_mode) = if group.common.blend_mode == BlendMode::PassThrough {
        (BlendMode::Normal, Some(BlendMode::PassThrough))
    } else {
        (group.common.blend_mode, None)
    };

    LayerRecord {
        top,
        left,
        bottom,
        right,
        channels: Vec::new(),
        blend_mode: record_blend_mode,
        opacity: 255,
        clipping: false,
        transparency_protected: false,
        visible: true,
        pixel_data_irrelevant: false,
        mask_data: MaskData::default(),
        blending_ranges: Default::default(),
        name: group.common.name.clone().into_bytes(),
        additional_layer_info: vec![TaggedBlock::SectionDivider {
            kind,
            blend_mode: tag_blend_mode,
        }],
    }
}

/// The document model doesn't track a mask's own offset, so the mask shares its owning layer's
/// top-left corner; only its width/height (the channel's own dimensions) can differ.
fn mask_to_file_model(mask: &LayerMask<impl Sample>, layer_top: i32, layer_left: i32) -> MaskData {
    let width = mask.channel.width() as i32;
    let height = mask.channel.height() as i32;
    MaskData {
        pixel_mask: Some(FileLayerMask {
            top: layer_top,
            left: layer_left,
            bottom: layer_top + height,
            right: layer_left + width,
            default_color: mask.default_color,
            position_relative_to_layer: mask.relative_to_layer,
            disabled: mask.disabled,
            is_vector: false,
            user_mask_density: mask.density,
            user_mask_feather: if mask.feather != 0.0 { Some(mask.feather) } else { None },
            vector_mask_density: None,
            vector_mask_feather: None,
        }),
        vector_mask: None,
    }
}

fn base_channel_count(color_mode: ColorMode) -> usize {
    match color_mode {
        ColorMode::Rgb | ColorMode::Lab => 3,
        ColorMode::Cmyk => 4,
        ColorMode::Grayscale | ColorMode::Bitmap | ColorMode::Duotone | ColorMode::Indexed => 1,
        ColorMode::Multichannel => 1,
    }
}

fn extract_icc_profile(resources: &ImageResources) -> Option<Rc<Vec<u8>>> {
    resources
        .blocks
        .iter()
        .find(|block| block.id == ICC_PROFILE_RESOURCE_ID)
        .map(|block| Rc::new(block.data.clone()))
}

fn extract_dpi(resources: &ImageResources) -> Option<f64> {
    let block = resources.blocks.iter().find(|block| block.id == RESOLUTION_INFO_RESOURCE_ID)?;
    if block.data.len() < 4 {
        return None;
    }
    let fixed = u32::from_be_bytes([block.data[0], block.data[1], block.data[2], block.data[3]]);
    Some(fixed as f64 / 65536.0)
}

/// Build a `ResolutionInfo` (id 1005) image resource block carrying `dpi` as a 16.16 fixed-point
/// horizontal and vertical resolution, both in pixels-per-inch.
fn build_resolution_info_block(dpi: f64) -> ImageResourceBlock {
    let fixed = (dpi * 65536.0).round() as u32;
    let mut data = Vec::with_capacity(16);
    data.extend_from_slice(&fixed.to_be_bytes());
    data.extend_from_slice(&1u16.to_be_bytes()); // hResUnit: pixels per inch
    data.extend_from_slice(&1u16.to_be_bytes()); // widthUnit: inches
    data.extend_from_slice(&fixed.to_be_bytes());
    data.extend_from_slice(&1u16.to_be_bytes()); // vResUnit: pixels per inch
    data.extend_from_slice(&1u16.to_be_bytes()); // heightUnit: inches
    ImageResourceBlock {
        id: RESOLUTION_INFO_RESOURCE_ID,
        name: Vec::new(),
        data,
    }
}
