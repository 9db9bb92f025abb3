//! Latest-frame slot shared between the video source and its readers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::Frame;

/// Anything detection can pull the most recent frame from.
pub trait FrameSource: Send + Sync {
    /// The most recently published frame, or `None` if nothing is available.
    fn latest(&self) -> Option<Arc<Frame>>;

    /// Short description of the source for diagnostics in the log.
    fn describe(&self) -> String {
        match self.latest() {
            Some(frame) => format!("{}x{} frame", frame.width(), frame.height()),
            None => "no frame available".to_string(),
        }
    }
}

/// Holds only the most recent frame. No history is kept.
///
/// Clones share the same slot. One writer (the capture source) is expected;
/// any number of readers may call [`FrameBuffer::latest`] concurrently.
#[derive(Clone, Default)]
pub struct FrameBuffer {
    inner: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    slot: RwLock<Option<Arc<Frame>>>,
    published: AtomicU64,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored frame.
    pub fn publish(&self, frame: Frame) {
        let frame = Arc::new(frame);
        *self
            .inner
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(frame);
        self.inner.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Drops the stored frame, e.g. when the source disconnects.
    pub fn clear(&self) {
        *self
            .inner
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns the latest frame without waiting for a new one.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.inner
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total number of frames published since creation.
    pub fn frames_published(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    /// Short description of the slot for diagnostics in the log.
    pub fn describe(&self) -> String {
        match self.latest() {
            Some(frame) => format!(
                "{}x{} frame ({} published)",
                frame.width(),
                frame.height(),
                self.frames_published()
            ),
            None => format!("no frame available ({} published)", self.frames_published()),
        }
    }
}

impl FrameSource for FrameBuffer {
    fn latest(&self) -> Option<Arc<Frame>> {
        FrameBuffer::latest(self)
    }

    fn describe(&self) -> String {
        FrameBuffer::describe(self)
    }
}
