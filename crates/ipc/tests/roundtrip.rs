use std::sync::Arc;

use patchbay_common::error::PatchbayError;
use patchbay_frame::{Frame, PullResult, Puller, SharedSource, VideoTarget};
use patchbay_ipc::{IpcSource, IpcTarget};

fn unique_name(tag: &str) -> String {
    format!("patchbay-test-{}-{tag}", std::process::id())
}

fn patterned_frame(width: u32, height: u32, has_alpha: bool, timestamp: u64) -> Frame {
    let channels = if has_alpha { 4 } else { 3 };
    let pixels: Vec<u8> = (0..width as usize * height as usize * channels)
        .map(|i| (i % 251) as u8)
        .collect();
    Frame::new(width, height, has_alpha, false, timestamp, pixels).unwrap()
}

#[test]
fn round_trip_is_bit_identical() {
    let name = unique_name("roundtrip");
    let writer = IpcTarget::create(&name, 64, 48, false).unwrap();
    let reader = Arc::new(IpcSource::open(&name).unwrap());

    let sent = patterned_frame(64, 48, false, 777);
    writer.push(&sent).unwrap();

    let mut puller = Puller::new(reader as SharedSource);
    let received = puller.pull().frame().expect("a frame was published");

    assert_eq!(received.width(), sent.width());
    assert_eq!(received.height(), sent.height());
    assert_eq!(received.has_alpha(), sent.has_alpha());
    assert_eq!(received.is_flipped(), sent.is_flipped());
    assert_eq!(received.timestamp(), 777);
    assert_eq!(received.pixels(), sent.pixels());

    // Nothing new was written: the second poll must not re-deliver.
    assert!(matches!(puller.pull(), PullResult::NoNewFrame));
}

#[test]
fn reader_without_writer_fails_distinctly() {
    let result = IpcSource::open(&unique_name("no-writer"));
    assert!(matches!(
        result,
        Err(PatchbayError::ChannelNotFound { .. })
    ));
}

#[test]
fn writer_collision_is_an_error() {
    let name = unique_name("collision");
    let _writer = IpcTarget::create(&name, 8, 8, false).unwrap();

    let second = IpcTarget::create(&name, 8, 8, false);
    assert!(matches!(second, Err(PatchbayError::ChannelExists { .. })));
}

#[test]
fn create_or_replace_reclaims_the_name() {
    let name = unique_name("replace");
    let _writer = IpcTarget::create(&name, 8, 8, false).unwrap();

    let replacement = IpcTarget::create_or_replace(&name, 16, 8, true).unwrap();
    assert_eq!(replacement.width(), 16);
    assert!(replacement.has_alpha());
}

#[test]
fn unpublished_channel_polls_as_no_new_frame() {
    let name = unique_name("unpublished");
    let _writer = IpcTarget::create(&name, 8, 8, false).unwrap();

    let reader = Arc::new(IpcSource::open(&name).unwrap());
    let mut puller = Puller::new(reader as SharedSource);
    assert!(matches!(puller.pull(), PullResult::NoNewFrame));
}

#[test]
fn mismatched_push_is_rejected() {
    let name = unique_name("mismatch");
    let writer = IpcTarget::create(&name, 8, 8, false).unwrap();

    let wrong_size = patterned_frame(9, 8, false, 1);
    assert!(matches!(
        writer.push(&wrong_size),
        Err(PatchbayError::Contract { .. })
    ));

    let wrong_alpha = patterned_frame(8, 8, true, 1);
    assert!(matches!(
        writer.push(&wrong_alpha),
        Err(PatchbayError::Contract { .. })
    ));

    // The channel still works after the rejected pushes.
    writer.push(&patterned_frame(8, 8, false, 2)).unwrap();
}

#[test]
fn slow_reader_skips_to_latest_frame() {
    let name = unique_name("skip");
    let writer = IpcTarget::create(&name, 8, 8, false).unwrap();
    let reader = Arc::new(IpcSource::open(&name).unwrap());

    for timestamp in 1..=5u64 {
        writer.push(&patterned_frame(8, 8, false, timestamp)).unwrap();
    }

    let mut puller = Puller::new(reader as SharedSource);
    let frame = puller.pull().frame().unwrap();
    assert_eq!(frame.timestamp(), 5);
    assert!(matches!(puller.pull(), PullResult::NoNewFrame));
}

#[test]
fn independent_readers_each_see_the_stream() {
    let name = unique_name("two-readers");
    let writer = IpcTarget::create(&name, 8, 8, false).unwrap();

    let reader_a = Arc::new(IpcSource::open(&name).unwrap());
    let reader_b = Arc::new(IpcSource::open(&name).unwrap());
    writer.push(&patterned_frame(8, 8, false, 10)).unwrap();

    let mut puller_a = Puller::new(reader_a as SharedSource);
    let mut puller_b = Puller::new(reader_b as SharedSource);
    assert_eq!(puller_a.pull().frame().unwrap().timestamp(), 10);
    assert_eq!(puller_b.pull().frame().unwrap().timestamp(), 10);
}

#[test]
fn flipped_flag_survives_the_wire() {
    let name = unique_name("flipped");
    let writer = IpcTarget::create(&name, 4, 4, false).unwrap();
    let reader = Arc::new(IpcSource::open(&name).unwrap());

    let frame = Frame::new(4, 4, false, true, 3, vec![1u8; 48]).unwrap();
    writer.push(&frame).unwrap();

    let mut puller = Puller::new(reader as SharedSource);
    assert!(puller.pull().frame().unwrap().is_flipped());
}

#[test]
fn dropping_the_writer_unlinks_the_name() {
    let name = unique_name("unlink");
    let writer = IpcTarget::create(&name, 8, 8, false).unwrap();
    drop(writer);

    assert!(matches!(
        IpcSource::open(&name),
        Err(PatchbayError::ChannelNotFound { .. })
    ));
}

#[test]
fn alpha_channel_round_trips() {
    let name = unique_name("alpha");
    let writer = IpcTarget::create(&name, 8, 8, true).unwrap();
    let reader = Arc::new(IpcSource::open(&name).unwrap());
    assert!(reader.has_alpha());

    let sent = patterned_frame(8, 8, true, 42);
    writer.push(&sent).unwrap();

    let mut puller = Puller::new(reader.clone() as SharedSource);
    let received = puller.pull().frame().unwrap();
    assert!(received.has_alpha());
    assert_eq!(received.pixels(), sent.pixels());
}
