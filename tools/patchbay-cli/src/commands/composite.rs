//! `patchbay composite` — tile input channels into one output channel.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use patchbay_common::clock::{MediaClock, RateController};
use patchbay_compositor::Compositor;
use patchbay_frame::{SharedSource, SharedTarget};
use patchbay_ipc::{IpcSource, IpcTarget};

/// Grid geometry for `count` tiles on a `width`x`height` canvas.
fn tile(count: usize, index: usize, width: u32, height: u32) -> (i32, i32, i32, i32) {
    let columns = (count as f64).sqrt().ceil() as usize;
    let rows = count.div_ceil(columns);
    let tile_w = width as i32 / columns as i32;
    let tile_h = height as i32 / rows as i32;
    let x = (index % columns) as i32 * tile_w;
    let y = (index / columns) as i32 * tile_h;
    (x, y, x + tile_w, y + tile_h)
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    inputs: Vec<String>,
    output: String,
    width: u32,
    height: u32,
    fps: u32,
    margin: u32,
    frames: Option<u64>,
    replace: bool,
) -> anyhow::Result<()> {
    let mut compositor = Compositor::new(width, height)?;
    compositor.set_margin(margin);

    let count = inputs.len();
    for (index, name) in inputs.iter().enumerate() {
        let source = Arc::new(
            IpcSource::open(name).with_context(|| format!("attaching to channel {name:?}"))?,
        );
        if count == 1 {
            compositor.set_source(index, source as SharedSource);
        } else {
            let (x, y, x2, y2) = tile(count, index, width, height);
            compositor.set_source_rect(index, source as SharedSource, x, y, x2, y2);
        }
        tracing::info!(channel = %name, slot = index, "Slot bound");
    }

    let writer = if replace {
        IpcTarget::create_or_replace(&output, width, height, false)
    } else {
        IpcTarget::create(&output, width, height, false)
    }
    .with_context(|| format!("creating output channel {output:?}"))?;
    let writer: SharedTarget = Arc::new(writer);
    compositor.add_target(&writer);

    tracing::info!(
        inputs = count,
        output,
        width,
        height,
        fps,
        "Compositing"
    );

    let clock = MediaClock::start();
    let mut rate = RateController::new(fps);
    let limit = frames.unwrap_or(u64::MAX);
    let mut ticks: u64 = 0;

    while ticks < limit {
        if rate.should_tick(clock.timestamp_micros()) {
            if !compositor.draw() {
                tracing::info!(ticks, "Draw loop terminated");
                break;
            }
            ticks += 1;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    tracing::info!(ticks, "Done");
    Ok(())
}
