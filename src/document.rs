//! The hierarchical document model (spec.md §3.2 C8): a tree of named layers, each typed by
//! pixel sample `T`, sitting above the byte-faithful file model in `crate::sections`.
//!
//! Grounded in `PhotoshopAPI/src/LayeredFile/LayerTypes/{ImageLayer,GroupLayer}.h/.cpp` for the
//! shape of a layer's common metadata and a group's children, and in the teacher's ordered
//! `Layers`/`Groups` container idiom (`layer_and_mask_information_section/{layers,groups,container}.rs`)
//! for keeping channels and children in a stable, file-order-preserving sequence rather than a
//! name-keyed map (required by invariant I2).

use crate::blend_mode::BlendMode;
use crate::compression;
use crate::enums::{ChannelID, ColorMode, Compression as CompressionKind, Version};
use crate::error::{PsdError, Result};
use crate::sample::{decode_samples, encode_samples, Sample};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque per-layer identity, used for duplicate-insertion and cycle checks (spec.md §4.8,
/// design note "Layer tree ownership" — the source's pointer-equality check becomes a handle
/// comparison here, since the tree owns its layers by value rather than by shared pointer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(u64);

impl LayerId {
    fn fresh() -> LayerId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        LayerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which channel an [`ImageChannel`] holds, paired with its raw on-disk index (spec.md §3.2
/// "ChannelIDInfo{id, index}").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelIDInfo {
    pub id: ChannelID,
    pub index: i16,
}

/// One channel's pixel data, kept compressed at rest (spec.md §3.2 "holding compressed bytes and
/// geometry") and decoded only on demand, mirroring the lazy access pattern
/// `PhotoshopAPI`'s `ChannelImageData<T>` offers through `getImageData`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageChannel<T: Sample> {
    width: u32,
    height: u32,
    compression: CompressionKind,
    compressed: Vec<u8>,
    _sample: PhantomData<T>,
}

impl<T: Sample> ImageChannel<T> {
    /// Compress `samples` (exactly `width * height` of them, invariant I7) under `compression`.
    pub fn from_samples(
        width: u32,
        height: u32,
        compression: CompressionKind,
        samples: &[T],
        version: Version,
    ) -> Result<ImageChannel<T>> {
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(PsdError::SizeLimitExceeded {
                what: "channel sample count",
                value: samples.len() as u64,
                limit: expected as u64,
            });
        }
        let bytes = encode_samples(samples);
        let compressed =
            compression::encode_channel(&bytes, compression, width, height, T::BIT_DEPTH, version)?;
        Ok(ImageChannel {
            width,
            height,
            compression,
            compressed,
            _sample: PhantomData,
        })
    }

    /// Build directly from an already-compressed payload, as read off a layer record's channel
    /// data (used by [`crate::bridge::parse`]).
    pub(crate) fn from_compressed(
        width: u32,
        height: u32,
        compression: CompressionKind,
        compressed: Vec<u8>,
    ) -> ImageChannel<T> {
        ImageChannel {
            width,
            height,
            compression,
            compressed,
            _sample: PhantomData,
        }
    }

    pub(crate) fn compressed_bytes(&self) -> &[u8] {
        &self.compressed
    }

    /// Decode this channel's samples, width-major, row-major (I7).
    pub fn decode(&self, version: Version) -> Result<Vec<T>> {
        let bytes = compression::decode_channel_body(
            &self.compressed,
            self.compression,
            self.width,
            self.height,
            T::BIT_DEPTH,
            version,
        )?;
        Ok(decode_samples(&bytes))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn compression(&self) -> CompressionKind {
        self.compression
    }
}

/// A layer's raster mask (spec.md §3.2 "optional layer_mask"). Always the pixel/user mask;
/// vector masks are a file-model-only concept that the document model doesn't surface, per
/// spec.md's non-goals around vector/adjustment-layer semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMask<T: Sample> {
    pub channel: ImageChannel<T>,
    pub default_color: u8,
    pub disabled: bool,
    pub relative_to_layer: bool,
    pub feather: f64,
    pub density: Option<u8>,
}

/// Fields shared by every layer kind (spec.md §3.2 "Layer (abstract, typed by pixel sample T)").
#[derive(Debug, Clone, PartialEq)]
pub struct LayerCommon<T: Sample> {
    id: LayerId,
    pub name: String,
    pub blend_mode: BlendMode,
    pub opacity: u8,
    pub is_visible: bool,
    pub is_locked: bool,
    pub clipping: bool,
    pub center_x: f64,
    pub center_y: f64,
    pub width: u32,
    pub height: u32,
    pub mask: Option<LayerMask<T>>,
}

impl<T: Sample> LayerCommon<T> {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> LayerCommon<T> {
        LayerCommon {
            id: LayerId::fresh(),
            name: name.into(),
            blend_mode: BlendMode::Normal,
            opacity: 255,
            is_visible: true,
            is_locked: false,
            clipping: false,
            center_x: 0.0,
            center_y: 0.0,
            width,
            height,
            mask: None,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }
}

/// A layer holding per-channel pixel data (spec.md §3.2 "ImageLayer<T>").
///
/// Channels are kept in an ordered list rather than a map: invariant I2 requires the
/// channel-info order to match the channel-image-data order on emission, and a map would not
/// preserve that without an auxiliary order vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer<T: Sample> {
    pub common: LayerCommon<T>,
    pub channels: Vec<(ChannelIDInfo, ImageChannel<T>)>,
}

/// A layer holding a nested sequence of layers (spec.md §3.2 "GroupLayer<T>").
#[derive(Debug, Clone, PartialEq)]
pub struct GroupLayer<T: Sample> {
    pub common: LayerCommon<T>,
    pub children: Vec<Layer<T>>,
    pub is_collapsed: bool,
}

/// Either kind of persisted layer.
///
/// `SectionDividerLayer` from spec.md §3.2 has no arm here: it is "a transient marker used only
/// during flattening/reconstruction; never persisted in the document tree" — it exists only as
/// the file-model `LayerRecord`/`TaggedBlock` pair that [`crate::bridge`] consumes and produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer<T: Sample> {
    Image(ImageLayer<T>),
    Group(GroupLayer<T>),
}

impl<T: Sample> Layer<T> {
    pub fn common(&self) -> &LayerCommon<T> {
        match self {
            Layer::Image(layer) => &layer.common,
            Layer::Group(layer) => &layer.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut LayerCommon<T> {
        match self {
            Layer::Image(layer) => &mut layer.common,
            Layer::Group(layer) => &mut layer.common,
        }
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }

    pub fn id(&self) -> LayerId {
        self.common().id
    }

    pub fn children(&self) -> &[Layer<T>] {
        match self {
            Layer::Group(group) => &group.children,
            Layer::Image(_) => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Layer<T>>> {
        match self {
            Layer::Group(group) => Some(&mut group.children),
            Layer::Image(_) => None,
        }
    }

    fn contains_id(&self, id: LayerId) -> bool {
        self.id() == id || self.children().iter().any(|child| child.contains_id(id))
    }
}

/// The root of a PSD/PSB document's hierarchical view (spec.md §3.2 "LayeredFile<T>").
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredFile<T: Sample> {
    pub color_mode: ColorMode,
    pub dpi: f64,
    pub width: u32,
    pub height: u32,
    /// Shared, read-only (spec.md §3.2 "ICC-profile bytes are reference-valued and cheaply
    /// shared"); cloning a `LayeredFile` never copies the profile bytes themselves.
    pub icc_profile: Option<Rc<Vec<u8>>>,
    pub compression: CompressionKind,
    pub root: Vec<Layer<T>>,
}

impl<T: Sample> LayeredFile<T> {
    pub fn new(color_mode: ColorMode, width: u32, height: u32) -> LayeredFile<T> {
        LayeredFile {
            color_mode,
            dpi: 72.0,
            width,
            height,
            icc_profile: None,
            compression: CompressionKind::Rle,
            root: Vec::new(),
        }
    }

    /// The bit depth every contained channel uses, fixed by the sample type (invariant I6).
    pub fn bit_depth(&self) -> crate::enums::BitDepth {
        T::BIT_DEPTH
    }

    /// Insert `layer` as a child of the group at `parent_path` (or at the document root when
    /// `None`). Fails with `DuplicateLayer` if `layer`'s identity is already present anywhere in
    /// the tree, and with `PathNotFound` if `parent_path` doesn't resolve to a group (spec.md
    /// §4.8 "duplicate detection").
    pub fn add_layer(&mut self, parent_path: Option<&str>, layer: Layer<T>) -> Result<()> {
        if self.root.iter().any(|l| l.contains_id(layer.id())) {
            return Err(PsdError::DuplicateLayer);
        }

        let siblings = match parent_path {
            None => &mut self.root,
            Some(path) => {
                let parent = find_mut(&mut self.root, path)?;
                parent
                    .children_mut()
                    .ok_or_else(|| PsdError::PathNotFound(path.to_string()))?
            }
        };
        siblings.push(layer);
        Ok(())
    }

    /// Remove and return the subtree rooted at `path` (spec.md §4.8 "remove").
    pub fn remove_layer(&mut self, path: &str) -> Result<Layer<T>> {
        remove_at(&mut self.root, path)
    }

    /// Detach the layer at `from_path` and append it under the group at `to_parent_path` (`None`
    /// for the document root). Rejects moving a layer underneath itself or one of its own
    /// descendants (spec.md §4.8 "move").
    pub fn move_layer(&mut self, from_path: &str, to_parent_path: Option<&str>) -> Result<()> {
        if let Some(to_path) = to_parent_path {
            if to_path == from_path || to_path.starts_with(&format!("{from_path}/")) {
                return Err(PsdError::Cycle);
            }
        }

        let layer = remove_at(&mut self.root, from_path)?;
        let moved_id = layer.id();
        let result = (|| {
            let siblings = match to_parent_path {
                None => &mut self.root,
                Some(path) => {
                    let parent = find_mut(&mut self.root, path)?;
                    if parent.contains_id(moved_id) {
                        return Err(PsdError::Cycle);
                    }
                    parent
                        .children_mut()
                        .ok_or_else(|| PsdError::PathNotFound(path.to_string()))?
                }
            };
            siblings.push(layer);
            Ok(())
        })();
        result
    }

    /// Look up a layer by its `/`-separated path of layer names (spec.md §4.8 "Layer lookup").
    pub fn layer_at(&self, path: &str) -> Result<&Layer<T>> {
        find(&self.root, path)
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() {
        return Err(PsdError::PathNotFound(path.to_string()));
    }
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(PsdError::PathNotFound(path.to_string()));
    }
    Ok(segments)
}

fn find<'a, T: Sample>(layers: &'a [Layer<T>], path: &str) -> Result<&'a Layer<T>> {
    let segments = split_path(path)?;
    let mut current = layers;
    let mut found: Option<&Layer<T>> = None;
    for segment in segments {
        found = current
            .iter()
            .find(|layer| layer.name() == segment);
        match found {
            Some(layer) => current = layer.children(),
            None => return Err(PsdError::PathNotFound(path.to_string())),
        }
    }
    found.ok_or_else(|| PsdError::PathNotFound(path.to_string()))
}

fn find_mut<'a, T: Sample>(layers: &'a mut [Layer<T>], path: &str) -> Result<&'a mut Layer<T>> {
    let segments = split_path(path)?;
    let mut current = layers;
    for (index, segment) in segments.iter().enumerate() {
        let position = current
            .iter()
            .position(|layer| layer.name() == *segment)
            .ok_or_else(|| PsdError::PathNotFound(path.to_string()))?;
        if index == segments.len() - 1 {
            return Ok(&mut current[position]);
        }
        current = current[position]
            .children_mut()
            .ok_or_else(|| PsdError::PathNotFound(path.to_string()))?;
    }
    unreachable!("split_path never returns an empty segment list")
}

fn remove_at<T: Sample>(layers: &mut Vec<Layer<T>>, path: &str) -> Result<Layer<T>> {
    let segments = split_path(path)?;
    remove_at_segments(layers, &segments)
}

fn remove_at_segments<T: Sample>(layers: &mut Vec<Layer<T>>, segments: &[&str]) -> Result<Layer<T>> {
    let position = layers
        .iter()
        .position(|layer| layer.name() == segments[0])
        .ok_or_else(|| PsdError::PathNotFound(segments.join("/")))?;

    if segments.len() == 1 {
        return Ok(layers.remove(position));
    }

    let children = layers[position]
        .children_mut()
        .ok_or_else(|| PsdError::PathNotFound(segments.join("/")))?;
    remove_at_segments(children, &segments[1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_layer(name: &str) -> Layer<u8> {
        Layer::Image(ImageLayer {
            common: LayerCommon::new(name, 4, 4),
            channels: Vec::new(),
        })
    }

    fn group_layer(name: &str, children: Vec<Layer<u8>>) -> Layer<u8> {
        Layer::Group(GroupLayer {
            common: LayerCommon::new(name, 4, 4),
            children,
            is_collapsed: false,
        })
    }

    #[test]
    fn add_layer_rejects_duplicate_identity() {
        let mut file = LayeredFile::<u8>::new(ColorMode::Rgb, 4, 4);
        let layer = image_layer("a");
        let id = layer.id();
        file.add_layer(None, layer).unwrap();

        // Re-insert a layer that shares identity with one already in the tree by cloning.
        let duplicate = file.root[0].clone();
        assert_eq!(duplicate.id(), id);
        let err = file.add_layer(None, duplicate).unwrap_err();
        assert!(matches!(err, PsdError::DuplicateLayer));
    }

    #[test]
    fn layer_lookup_by_path() {
        let mut file = LayeredFile::<u8>::new(ColorMode::Rgb, 4, 4);
        file.add_layer(None, group_layer("G", vec![image_layer("A")]))
            .unwrap();

        assert_eq!(file.layer_at("G/A").unwrap().name(), "A");
        assert!(file.layer_at("G/missing").is_err());
        assert!(file.layer_at("").is_err());
    }

    #[test]
    fn move_layer_rejects_moving_under_self() {
        let mut file = LayeredFile::<u8>::new(ColorMode::Rgb, 4, 4);
        file.add_layer(None, group_layer("G", vec![image_layer("A")]))
            .unwrap();

        let err = file.move_layer("G", Some("G")).unwrap_err();
        assert!(matches!(err, PsdError::Cycle));

        let err = file.move_layer("G", Some("G/A")).unwrap_err();
        assert!(matches!(err, PsdError::Cycle));
    }

    #[test]
    fn move_layer_relocates_between_groups() {
        let mut file = LayeredFile::<u8>::new(ColorMode::Rgb, 4, 4);
        file.add_layer(None, group_layer("G1", vec![image_layer("A")]))
            .unwrap();
        file.add_layer(None, group_layer("G2", Vec::new())).unwrap();

        file.move_layer("G1/A", Some("G2")).unwrap();

        assert!(file.layer_at("G1/A").is_err());
        assert_eq!(file.layer_at("G2/A").unwrap().name(), "A");
    }

    #[test]
    fn remove_layer_returns_the_removed_subtree() {
        let mut file = LayeredFile::<u8>::new(ColorMode::Rgb, 4, 4);
        file.add_layer(None, image_layer("A")).unwrap();

        let removed = file.remove_layer("A").unwrap();
        assert_eq!(removed.name(), "A");
        assert!(file.layer_at("A").is_err());
    }
}
