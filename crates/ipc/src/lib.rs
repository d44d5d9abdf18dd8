//! Patchbay IPC Transport
//!
//! A named shared-memory channel carrying one video stream between
//! processes with the same pull/push contract used in-process. One
//! writer ([`IpcTarget`]) owns the region; any number of readers
//! ([`IpcSource`]) attach to it by name.
//!
//! The region holds a fixed-geometry triple buffer. The writer copies
//! pixel data into the next slot and only then release-publishes the
//! slot index; readers acquire-load the index before touching the slot,
//! so the write-data-then-publish ordering is visible across processes.
//! Delivery is last-writer-wins: a reader polling slower than the writer
//! silently skips intermediate frames, and no frame is delivered twice.

pub mod reader;
pub mod region;
pub mod writer;

pub use reader::IpcSource;
pub use writer::IpcTarget;
