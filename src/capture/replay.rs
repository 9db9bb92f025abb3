//! Still-image replay source.
//!
//! Stands in for the webcam feed when no capture device is attached: loads
//! one image, or every image in a directory, and republishes them into a
//! [`FrameBuffer`] at a fixed cadence until stopped.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{Frame, FrameBuffer};
use crate::logging::LogSink;
use crate::runtime::CancelToken;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Handle to a running replay thread. Stops the thread on drop.
pub struct ReplaySource {
    stop: CancelToken,
    handle: Option<JoinHandle<()>>,
}

/// Lists the image files making up a replay, sorted by name.
pub fn collect_frame_paths(source: &Path) -> Result<Vec<PathBuf>> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(source)
        .with_context(|| format!("Failed to read frame directory {}", source.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(anyhow!("No images found in {}", source.display()));
    }
    Ok(paths)
}

/// Decodes an image file into an RGB frame.
pub fn load_frame(path: &Path) -> Result<Frame> {
    let img = image::open(path).with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(img.to_rgb8())
}

impl ReplaySource {
    /// Loads the frames under `source` and starts publishing them into `buffer`.
    pub fn start(
        source: &Path,
        buffer: FrameBuffer,
        interval: Duration,
        log: Arc<dyn LogSink>,
    ) -> Result<Self> {
        let frames = collect_frame_paths(source)?
            .iter()
            .map(|path| load_frame(path))
            .collect::<Result<Vec<_>>>()?;

        log.append(&format!(
            "Replaying {} frame(s) from {} every {}ms",
            frames.len(),
            source.display(),
            interval.as_millis()
        ));

        let stop = CancelToken::new();
        let thread_stop = stop.clone();
        let handle = thread::spawn(move || {
            for frame in frames.iter().cycle() {
                buffer.publish(frame.clone());
                if !thread_stop.wait(interval) {
                    break;
                }
            }
            buffer.clear();
        });

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops publishing and waits for the thread to exit.
    pub fn stop(&mut self) {
        self.stop.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.stop();
    }
}
