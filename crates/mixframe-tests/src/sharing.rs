//! Integration tests for sharing finalized frames across threads.

use crossbeam_channel::unbounded;
use mixframe_core::{
    Buffer, ConstBuffer, ExternalStorage, ImmutableFrame, MutableFrame, PixelFormat,
    PixelFormatDesc, StreamTag,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Plane memory that counts how often it has been released.
struct TrackedPlane {
    data: Vec<u8>,
    released: Arc<AtomicUsize>,
}

impl ExternalStorage<u8> for TrackedPlane {
    fn as_slice(&self) -> &[u8] {
        &self.data
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for TrackedPlane {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn bgra_frame(tag: StreamTag, width: usize, height: usize, fill: u8) -> MutableFrame {
    let desc = PixelFormatDesc::packed(PixelFormat::Bgra, width, height).unwrap();
    let plane = Buffer::from_vec(vec![fill; desc.planes[0].size]);
    MutableFrame::new(tag, vec![plane], Buffer::zeroed(64), desc).unwrap()
}

#[test]
fn finalized_frame_fans_out_to_consumers() {
    crate::init_tracing();

    let frame = bgra_frame(StreamTag::new(), 64, 36, 0x7f).finalize();
    let expected = frame.storage_ptr() as usize;

    let mut handles = Vec::new();
    let mut senders = Vec::new();
    for _ in 0..4 {
        let (tx, rx) = unbounded::<ImmutableFrame>();
        senders.push(tx);
        handles.push(thread::spawn(move || {
            let received = rx.recv().unwrap();
            let plane = received.image_data(0).unwrap();
            assert!(plane.iter().all(|&b| b == 0x7f));
            assert_eq!(received.width(), 64);
            received.storage_ptr() as usize
        }));
    }

    for tx in &senders {
        tx.send(frame.clone()).unwrap();
    }

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn last_holder_releases_buffers() {
    let released = Arc::new(AtomicUsize::new(0));
    let desc = PixelFormatDesc::packed(PixelFormat::Gray, 4, 4).unwrap();
    let plane = Buffer::from_external(TrackedPlane {
        data: vec![0; 16],
        released: Arc::clone(&released),
    });
    let frame = MutableFrame::new(StreamTag::new(), vec![plane], Buffer::new(), desc)
        .unwrap()
        .finalize();

    let (tx, rx) = unbounded();
    let consumer = thread::spawn(move || {
        let held: ImmutableFrame = rx.recv().unwrap();
        held.image_data(0).unwrap().len()
    });

    tx.send(frame.clone()).unwrap();
    assert_eq!(consumer.join().unwrap(), 16);
    assert_eq!(released.load(Ordering::SeqCst), 0);

    drop(frame);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_clone_and_drop() {
    let released = Arc::new(AtomicUsize::new(0));
    let desc = PixelFormatDesc::packed(PixelFormat::Luma, 8, 8).unwrap();
    let frame = ImmutableFrame::freeze(
        StreamTag::new(),
        vec![Buffer::from_external(TrackedPlane {
            data: vec![1; 64],
            released: Arc::clone(&released),
        })],
        ConstBuffer::empty(),
        desc,
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let local = frame.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    let copy = local.clone();
                    assert_eq!(copy, local);
                    drop(copy);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(released.load(Ordering::SeqCst), 0);
    drop(frame);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn producer_thread_hands_off_ownership() {
    let (tx, rx) = unbounded::<MutableFrame>();
    let tag = StreamTag::new();

    let producer = thread::spawn(move || {
        for i in 0..3u8 {
            let mut frame = bgra_frame(tag, 2, 2, 0);
            frame.image_data_mut(0).unwrap()[0] = i;
            tx.send(frame).unwrap();
        }
    });

    let finalized: Vec<ImmutableFrame> = rx.iter().map(ImmutableFrame::from).collect();
    producer.join().unwrap();

    assert_eq!(finalized.len(), 3);
    for (i, frame) in finalized.iter().enumerate() {
        assert_eq!(frame.stream_tag(), Some(tag));
        assert_eq!(frame.image_data(0).unwrap()[0], i as u8);
    }
    assert_ne!(finalized[0], finalized[1]);
}
