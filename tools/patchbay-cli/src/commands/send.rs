//! `patchbay send` — publish a synthetic pattern to a channel.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use patchbay_common::clock::{MediaClock, RateController};
use patchbay_frame::{PullResult, Puller, SharedSource, SharedTarget};
use patchbay_ipc::IpcTarget;
use patchbay_media::{PatternKind, TestPattern};

fn parse_pattern(name: &str) -> anyhow::Result<PatternKind> {
    match name {
        "bars" => Ok(PatternKind::ColorBars),
        "gradient" => Ok(PatternKind::Gradient),
        "solid" => Ok(PatternKind::Solid([32, 96, 160])),
        other => anyhow::bail!("unknown pattern {other:?} (expected bars, gradient, or solid)"),
    }
}

pub fn run(
    channel: String,
    width: u32,
    height: u32,
    fps: u32,
    pattern: String,
    frames: Option<u64>,
    replace: bool,
) -> anyhow::Result<()> {
    let kind = parse_pattern(&pattern)?;

    let writer = if replace {
        IpcTarget::create_or_replace(&channel, width, height, false)
    } else {
        IpcTarget::create(&channel, width, height, false)
    }
    .with_context(|| format!("creating channel {channel:?}"))?;
    let writer: SharedTarget = Arc::new(writer);

    let source = Arc::new(TestPattern::new(width, height, kind)?);
    let mut puller = Puller::new(source as SharedSource);

    tracing::info!(channel, width, height, fps, pattern, "Publishing");

    let clock = MediaClock::start();
    let mut rate = RateController::new(fps);
    let limit = frames.unwrap_or(u64::MAX);
    let mut published: u64 = 0;

    while published < limit {
        if rate.should_tick(clock.timestamp_micros()) {
            if let PullResult::Frame(frame) = puller.pull() {
                writer.push(&frame)?;
                published += 1;
                if published % (fps.max(1) as u64 * 10) == 0 {
                    tracing::info!(published, "Still publishing");
                }
            }
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    tracing::info!(published, "Done");
    Ok(())
}
