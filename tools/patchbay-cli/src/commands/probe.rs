//! `patchbay probe` — attach to a channel and report what it carries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;

use patchbay_frame::{PullResult, Puller, SharedSource};
use patchbay_ipc::IpcSource;

pub fn run(channel: String, seconds: f64) -> anyhow::Result<()> {
    let reader = Arc::new(
        IpcSource::open(&channel).with_context(|| format!("attaching to channel {channel:?}"))?,
    );

    println!("channel:  {channel}");
    println!("geometry: {}x{}", reader.width(), reader.height());
    println!("alpha:    {}", reader.has_alpha());

    let mut puller = Puller::new(reader as SharedSource);
    let started = Instant::now();
    let window = Duration::from_secs_f64(seconds.max(0.1));
    let mut received: u64 = 0;
    let mut first_timestamp = None;
    let mut last_timestamp = 0u64;
    let mut ended = false;

    while started.elapsed() < window {
        match puller.pull() {
            PullResult::Frame(frame) => {
                received += 1;
                first_timestamp.get_or_insert(frame.timestamp());
                last_timestamp = frame.timestamp();
            }
            PullResult::NoNewFrame => {}
            PullResult::EndOfStream => {
                ended = true;
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    let elapsed = started.elapsed().as_secs_f64();
    println!("frames:   {received} in {elapsed:.2}s ({:.2} fps)", received as f64 / elapsed);
    if let Some(first) = first_timestamp {
        println!("stream:   timestamps {first}..{last_timestamp}");
    } else if ended {
        println!("stream:   ended before any frame arrived");
    } else {
        println!("stream:   no frames observed (writer idle?)");
    }
    Ok(())
}
