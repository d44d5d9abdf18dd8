//! Fan-out routing from one producer to many targets.

use std::sync::{Mutex, Weak};

use crate::contract::{lock_unpoisoned, SharedTarget, VideoTarget};
use crate::frame::Frame;

/// The fan-out primitive embedded in every multi-target producer.
///
/// Registration is append-only and non-owning: the router keeps weak
/// references and validates liveness at dispatch time, so registering a
/// target never extends its lifetime and a dropped target silently
/// disappears from fan-out.
///
/// Delivery walks a snapshot of the list in registration order; a target
/// that fails is logged and skipped, never allowed to suppress delivery
/// to the targets after it.
#[derive(Default)]
pub struct Router {
    targets: Mutex<Vec<Weak<dyn VideoTarget>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a target to the fan-out list.
    ///
    /// There is no removal API; a target leaves the list by being dropped
    /// by its owner.
    pub fn add_target(&self, target: &SharedTarget) {
        lock_unpoisoned(&self.targets).push(std::sync::Arc::downgrade(target));
    }

    /// Number of currently live registered targets.
    pub fn target_count(&self) -> usize {
        lock_unpoisoned(&self.targets)
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Deliver one frame to every live target, in registration order.
    pub fn broadcast(&self, frame: &Frame) {
        // Snapshot under the lock so concurrent add_target calls never
        // expose a half-constructed entry to this delivery pass.
        let snapshot: Vec<Weak<dyn VideoTarget>> = lock_unpoisoned(&self.targets).clone();

        let mut saw_dead = false;
        for (index, weak) in snapshot.iter().enumerate() {
            match weak.upgrade() {
                Some(target) => {
                    if let Err(error) = target.push(frame) {
                        tracing::warn!(index, %error, "Target failed to consume frame");
                    }
                }
                None => saw_dead = true,
            }
        }

        if saw_dead {
            lock_unpoisoned(&self.targets).retain(|weak| weak.strong_count() > 0);
        }
    }
}
