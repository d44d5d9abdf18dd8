//! Patchbay Frame Core
//!
//! The frame-exchange contract every Patchbay component speaks:
//! - **Frame**: one decoded image buffer plus geometry/orientation/timestamp
//! - **VideoSource / VideoTarget**: pull and push capabilities
//! - **Puller / Pusher**: per-consumer staleness tracking and push staging
//! - **Router**: ordered fan-out from one producer to many targets
//! - **VideoPort**: an in-process source+target pair used as a
//!   decoupling buffer between producer and consumer lifetimes
//!
//! Pulling is a non-blocking poll: a source always answers immediately
//! with its most recent frame, "nothing new", or end of stream. Pushing
//! is synchronous: the target has fully consumed the borrowed buffer by
//! the time `push` returns.

pub mod contract;
pub mod frame;
pub mod port;
pub mod router;

pub use contract::{lock_unpoisoned, Latest, PreviewSurface, PullResult, Puller, Pusher};
pub use contract::{SharedSource, SharedTarget, VideoSource, VideoTarget};
pub use frame::Frame;
pub use port::VideoPort;
pub use router::Router;
