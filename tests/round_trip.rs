//! Whole-document byte round-trips through the public `read`/`write` entry points, seeded from
//! spec.md §8's concrete scenarios.

use psdoc::{
    AnyLayeredFile, BlendMode, ChannelID, ChannelIDInfo, ColorMode, Compression, GroupLayer,
    ImageChannel, ImageLayer, Layer, LayerCommon, LayeredFile, Version,
};

fn solid_channel(value: u8, width: u32, height: u32) -> ImageChannel<u8> {
    let samples = vec![value; width as usize * height as usize];
    ImageChannel::from_samples(width, height, Compression::Rle, &samples, Version::Psd).unwrap()
}

fn centered_common(name: &str, width: u32, height: u32) -> LayerCommon<u8> {
    let mut common = LayerCommon::new(name, width, height);
    common.center_x = width as f64 / 2.0;
    common.center_y = height as f64 / 2.0;
    common
}

fn decode(doc: &AnyLayeredFile) -> &LayeredFile<u8> {
    match doc {
        AnyLayeredFile::Eight(doc) => doc,
        _ => panic!("expected an 8-bit document"),
    }
}

/// Scenario 1: an empty 8-bit RGB 64x64 document round-trips to a header reporting
/// (version=1, depth=8, channels=3, w=64, h=64) and zero layers.
#[test]
fn empty_rgb_document_reports_header_fields() {
    let doc = LayeredFile::<u8>::new(ColorMode::Rgb, 64, 64);
    let bytes = psdoc::write(AnyLayeredFile::Eight(doc)).unwrap();

    let parsed = psdoc::read(&bytes).unwrap();
    let doc = decode(&parsed);
    assert_eq!(doc.width, 64);
    assert_eq!(doc.height, 64);
    assert_eq!(doc.color_mode, ColorMode::Rgb);
    assert_eq!(doc.bit_depth(), psdoc::BitDepth::Eight);
    assert!(doc.root.is_empty());
}

/// Scenario 2: a single image layer with a solid red fill and a mid-grey mask round-trips every
/// channel byte-for-byte, and the mask surfaces with channel id -2.
#[test]
fn single_layer_with_mask_round_trips_all_channels() {
    let mut common = centered_common("Layer 1", 64, 64);
    common.mask = Some(psdoc::LayerMask {
        channel: solid_channel(128, 64, 64),
        default_color: 255,
        disabled: false,
        relative_to_layer: false,
        feather: 0.0,
        density: None,
    });

    let layer = Layer::Image(ImageLayer {
        common,
        channels: vec![
            (
                ChannelIDInfo {
                    id: ChannelID::Red,
                    index: 0,
                },
                solid_channel(255, 64, 64),
            ),
            (
                ChannelIDInfo {
                    id: ChannelID::Green,
                    index: 1,
                },
                solid_channel(0, 64, 64),
            ),
            (
                ChannelIDInfo {
                    id: ChannelID::Blue,
                    index: 2,
                },
                solid_channel(0, 64, 64),
            ),
        ],
    });

    let mut doc = LayeredFile::<u8>::new(ColorMode::Rgb, 64, 64);
    doc.add_layer(None, layer).unwrap();

    let bytes = psdoc::write(AnyLayeredFile::Eight(doc)).unwrap();
    let parsed = psdoc::read(&bytes).unwrap();
    let doc = decode(&parsed);

    assert_eq!(doc.root.len(), 1);
    let layer = match &doc.root[0] {
        Layer::Image(layer) => layer,
        Layer::Group(_) => panic!("expected an image layer"),
    };
    assert_eq!(layer.common.name, "Layer 1");

    for (info, channel) in &layer.channels {
        let decoded = channel.decode(Version::Psd).unwrap();
        match info.id {
            ChannelID::Red => assert!(decoded.iter().all(|&s| s == 255)),
            ChannelID::Green | ChannelID::Blue => assert!(decoded.iter().all(|&s| s == 0)),
            other => panic!("unexpected channel {other:?}"),
        }
    }

    let mask = layer.common.mask.as_ref().expect("mask survived round-trip");
    let mask_samples = mask.channel.decode(Version::Psd).unwrap();
    assert!(mask_samples.iter().all(|&s| s == 128));
}

/// Scenario 3: a group "G" in logical `multiply` mode containing "A" then "B" round-trips to an
/// identical tree with display order preserved.
#[test]
fn group_with_two_image_layers_round_trips_display_order() {
    let mut group_common = centered_common("G", 8, 8);
    group_common.blend_mode = BlendMode::Multiply;

    let group = Layer::Group(GroupLayer {
        common: group_common,
        children: vec![
            Layer::Image(ImageLayer {
                common: centered_common("A", 8, 8),
                channels: vec![(
                    ChannelIDInfo {
                        id: ChannelID::Red,
                        index: 0,
                    },
                    solid_channel(10, 8, 8),
                )],
            }),
            Layer::Image(ImageLayer {
                common: centered_common("B", 8, 8),
                channels: vec![(
                    ChannelIDInfo {
                        id: ChannelID::Red,
                        index: 0,
                    },
                    solid_channel(20, 8, 8),
                )],
            }),
        ],
        is_collapsed: false,
    });

    let mut doc = LayeredFile::<u8>::new(ColorMode::Rgb, 8, 8);
    doc.add_layer(None, group).unwrap();

    let bytes = psdoc::write(AnyLayeredFile::Eight(doc)).unwrap();
    let parsed = psdoc::read(&bytes).unwrap();
    let doc = decode(&parsed);

    assert_eq!(doc.root.len(), 1);
    let group = match &doc.root[0] {
        Layer::Group(group) => group,
        Layer::Image(_) => panic!("expected a group"),
    };
    assert_eq!(group.common.blend_mode, BlendMode::Multiply);
    assert_eq!(group.children.len(), 2);
    assert_eq!(group.children[0].name(), "A");
    assert_eq!(group.children[1].name(), "B");
}

/// Scenario 4: a pass-through group relocates its logical blend mode into the section-divider
/// tagged block and recovers it on parse.
#[test]
fn passthrough_group_recovers_its_logical_blend_mode() {
    let mut group_common = centered_common("G", 8, 8);
    group_common.blend_mode = BlendMode::PassThrough;

    let group = Layer::Group(GroupLayer {
        common: group_common,
        children: vec![Layer::Image(ImageLayer {
            common: centered_common("A", 8, 8),
            channels: vec![(
                ChannelIDInfo {
                    id: ChannelID::Red,
                    index: 0,
                },
                solid_channel(5, 8, 8),
            )],
        })],
        is_collapsed: false,
    });

    let mut doc = LayeredFile::<u8>::new(ColorMode::Rgb, 8, 8);
    doc.add_layer(None, group).unwrap();

    let bytes = psdoc::write(AnyLayeredFile::Eight(doc)).unwrap();
    let parsed = psdoc::read(&bytes).unwrap();
    let doc = decode(&parsed);

    let group = match &doc.root[0] {
        Layer::Group(group) => group,
        Layer::Image(_) => panic!("expected a group"),
    };
    assert_eq!(group.common.blend_mode, BlendMode::PassThrough);
}

/// A nested, collapsed group inside another group preserves both its collapsed flag and its
/// position in display order alongside a sibling image layer.
#[test]
fn nested_collapsed_group_round_trips() {
    let inner_group = Layer::Group(GroupLayer {
        common: centered_common("Inner", 8, 8),
        children: vec![Layer::Image(ImageLayer {
            common: centered_common("Leaf", 8, 8),
            channels: vec![(
                ChannelIDInfo {
                    id: ChannelID::Red,
                    index: 0,
                },
                solid_channel(7, 8, 8),
            )],
        })],
        is_collapsed: true,
    });

    let outer_group = Layer::Group(GroupLayer {
        common: centered_common("Outer", 8, 8),
        children: vec![
            inner_group,
            Layer::Image(ImageLayer {
                common: centered_common("Sibling", 8, 8),
                channels: vec![(
                    ChannelIDInfo {
                        id: ChannelID::Red,
                        index: 0,
                    },
                    solid_channel(9, 8, 8),
                )],
            }),
        ],
        is_collapsed: false,
    });

    let mut doc = LayeredFile::<u8>::new(ColorMode::Rgb, 8, 8);
    doc.add_layer(None, outer_group).unwrap();

    let bytes = psdoc::write(AnyLayeredFile::Eight(doc)).unwrap();
    let parsed = psdoc::read(&bytes).unwrap();
    let doc = decode(&parsed);

    let outer = match &doc.root[0] {
        Layer::Group(group) => group,
        Layer::Image(_) => panic!("expected a group"),
    };
    assert!(!outer.is_collapsed);
    assert_eq!(outer.children.len(), 2);

    let inner = match &outer.children[0] {
        Layer::Group(group) => group,
        Layer::Image(_) => panic!("expected the inner group first"),
    };
    assert!(inner.is_collapsed);
    assert_eq!(inner.children[0].name(), "Leaf");
    assert_eq!(outer.children[1].name(), "Sibling");
}
