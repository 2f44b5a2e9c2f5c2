//! Integration tests modelling a mixer that skips unchanged streams.

use mixframe_core::{
    Buffer, FrameGeometry, FrameVisitor, ImmutableFrame, MutableFrame, PixelFormatDesc, StreamTag,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::thread;
use tracing::info;

/// Last frame rendered per stream, shared between mixer threads.
#[derive(Default)]
struct LastFrameCache {
    frames: Mutex<HashMap<StreamTag, ImmutableFrame>>,
}

impl LastFrameCache {
    /// Record `frame`; returns false if it is the frame already rendered.
    fn update(&self, frame: &ImmutableFrame) -> bool {
        let Some(tag) = frame.stream_tag() else {
            return false;
        };
        let mut frames = self.frames.lock();
        if frames.get(&tag) == Some(frame) {
            return false;
        }
        frames.insert(tag, frame.clone());
        true
    }
}

struct ByteCounter {
    bytes: usize,
}

impl FrameVisitor for ByteCounter {
    fn visit(&mut self, frame: &ImmutableFrame) {
        self.bytes += frame.image_data(0).map(|p| p.len()).unwrap_or(0);
    }
}

fn produce(tag: StreamTag, desc: &PixelFormatDesc) -> ImmutableFrame {
    let planes: Vec<Buffer<u8>> = desc.planes.iter().map(|p| Buffer::zeroed(p.size)).collect();
    MutableFrame::new(tag, planes, Buffer::zeroed(8), desc.clone())
        .unwrap()
        .finalize()
}

#[test]
fn mixer_skips_repeated_frames() {
    crate::init_tracing();

    let desc = PixelFormatDesc::ycbcr(16, 8, 8, 4, false);
    let live = StreamTag::new();
    let still = StreamTag::new();
    let cache = LastFrameCache::default();

    // A still producer keeps handing out the same frame.
    let still_frame = produce(still, &desc);
    let mut rendered = 0;
    for tick in 0..5 {
        for frame in [produce(live, &desc), still_frame.clone()] {
            if cache.update(&frame) {
                rendered += 1;
            }
        }
        info!(tick, rendered, "Mixed tick");
    }

    assert_eq!(rendered, 5 + 1);
}

#[test]
fn streams_start_as_empty_placeholders() {
    let desc = PixelFormatDesc::ycbcr(4, 4, 2, 2, true);
    let tag = StreamTag::new();
    let cache = LastFrameCache::default();

    let placeholder = ImmutableFrame::empty(Some(tag));
    assert!(placeholder.is_valid());
    assert!(cache.update(&placeholder));

    let mut counter = ByteCounter { bytes: 0 };
    placeholder.accept(&mut counter);
    assert_eq!(counter.bytes, 0);

    let first = produce(tag, &desc);
    assert!(cache.update(&first));
    first.accept(&mut counter);
    assert_eq!(counter.bytes, 16);

    // Untagged placeholders are never cached.
    assert!(!cache.update(&ImmutableFrame::default()));
}

#[test]
fn cache_is_shared_between_mixer_threads() {
    let cache = Arc::new(LastFrameCache::default());
    let desc = PixelFormatDesc::ycbcr(4, 2, 2, 1, false);
    let frame = produce(StreamTag::new(), &desc);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let frame = frame.clone();
            thread::spawn(move || cache.update(&frame))
        })
        .collect();

    let updates = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|&updated| updated)
        .count();
    assert_eq!(updates, 1);
}

#[test]
fn frames_key_ordered_maps() {
    let desc = PixelFormatDesc::ycbcr(2, 2, 1, 1, false);
    let frames: Vec<ImmutableFrame> = (0..6).map(|_| produce(StreamTag::new(), &desc)).collect();

    let mut renders: BTreeMap<ImmutableFrame, usize> = BTreeMap::new();
    for frame in frames.iter().chain(frames.iter()) {
        *renders.entry(frame.clone()).or_default() += 1;
    }

    assert_eq!(renders.len(), 6);
    assert!(renders.values().all(|&n| n == 2));
}

#[test]
fn producer_config_drives_frame_layout() {
    let config = r#"{
        "format": {
            "format": "bgra",
            "planes": [{ "width": 4, "height": 2, "stride": 4, "linesize": 16, "size": 32 }]
        },
        "geometry": {
            "kind": "quad",
            "coords": [
                { "vertex_x": 0.0, "vertex_y": 0.0, "texture_x": 0.0, "texture_y": 0.0, "texture_r": 0.0, "texture_q": 1.0 },
                { "vertex_x": 0.5, "vertex_y": 0.0, "texture_x": 1.0, "texture_y": 0.0, "texture_r": 0.0, "texture_q": 1.0 },
                { "vertex_x": 0.5, "vertex_y": 0.5, "texture_x": 1.0, "texture_y": 1.0, "texture_r": 0.0, "texture_q": 1.0 },
                { "vertex_x": 0.0, "vertex_y": 0.5, "texture_x": 0.0, "texture_y": 1.0, "texture_r": 0.0, "texture_q": 1.0 }
            ]
        }
    }"#;
    let value: serde_json::Value = serde_json::from_str(config).unwrap();
    let desc: PixelFormatDesc = serde_json::from_value(value["format"].clone()).unwrap();
    let geometry: FrameGeometry = serde_json::from_value(value["geometry"].clone()).unwrap();

    let mut frame = MutableFrame::new(
        StreamTag::new(),
        vec![Buffer::zeroed(desc.total_size())],
        Buffer::new(),
        desc,
    )
    .unwrap();
    frame.set_geometry(geometry.clone());
    let frame = frame.finalize();

    assert_eq!(frame.width(), 4);
    assert_eq!(frame.size(), 32);
    assert_eq!(frame.geometry(), &geometry);
    assert_ne!(frame.geometry(), FrameGeometry::get_default());
}
