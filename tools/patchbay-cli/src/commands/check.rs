//! `patchbay check` — shared-memory self-test and config dump.

use std::sync::Arc;

use patchbay_common::config::AppConfig;
use patchbay_frame::{Frame, Puller, SharedSource, VideoTarget};
use patchbay_ipc::{IpcSource, IpcTarget};

pub fn run() -> anyhow::Result<()> {
    let config = AppConfig::load();
    println!("configuration:");
    println!("{}", serde_json::to_string_pretty(&config)?);

    let name = format!(
        "{}-selfcheck-{}",
        config.ipc.channel_prefix,
        std::process::id()
    );

    print!("shared memory: ");
    let writer = IpcTarget::create_or_replace(&name, 64, 48, false)?;
    let reader = Arc::new(IpcSource::open(&name)?);

    let pixels: Vec<u8> = (0..64usize * 48 * 3).map(|i| (i % 253) as u8).collect();
    let sent = Frame::new(64, 48, false, false, 1, pixels)?;
    writer.push(&sent)?;

    let mut puller = Puller::new(reader as SharedSource);
    let received = puller
        .pull()
        .frame()
        .ok_or_else(|| anyhow::anyhow!("self-test channel returned no frame"))?;
    anyhow::ensure!(
        received.pixels() == sent.pixels(),
        "self-test round trip corrupted pixel data"
    );
    println!("ok ({name})");

    Ok(())
}
