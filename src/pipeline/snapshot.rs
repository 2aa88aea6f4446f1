use std::{
    fs,
    path::{Path, PathBuf},
    thread,
};

use anyhow::{Context, Result};
use crossbeam_channel::{Sender, TrySendError, bounded};
use image::RgbImage;

use super::overlay::OverlayImage;

/// Saves every n-th overlay as a PNG on a background thread. Frames arriving
/// while the previous one is still being encoded are dropped.
pub struct SnapshotWriter {
    tx: Option<Sender<OverlayImage>>,
    handle: Option<thread::JoinHandle<()>>,
    every: u64,
}

impl SnapshotWriter {
    pub fn start(dir: &Path, every: u64) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create snapshot dir {}", dir.display()))?;

        let (tx, rx) = bounded::<OverlayImage>(1);
        let dir = dir.to_path_buf();
        let handle = thread::Builder::new()
            .name("overlay-snapshots".into())
            .spawn(move || {
                for overlay in rx.iter() {
                    if let Err(err) = save(&dir, &overlay) {
                        log::warn!("snapshot of frame {} failed: {err:#}", overlay.frame_index);
                    }
                }
            })
            .context("failed to spawn snapshot thread")?;

        log::info!("saving overlay snapshots every {every} frames");
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            every: every.max(1),
        })
    }

    pub fn wants(&self, frame_index: u64) -> bool {
        frame_index % self.every == 0
    }

    pub fn submit(&self, overlay: OverlayImage) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(overlay) {
            Ok(()) => {}
            Err(TrySendError::Full(overlay)) => {
                log::debug!("snapshot writer busy, dropping frame {}", overlay.frame_index);
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("snapshot writer has stopped");
            }
        }
    }

    /// Flushes the pending snapshot and joins the writer thread.
    pub fn stop(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("snapshot writer thread panicked");
            }
        }
    }
}

impl Drop for SnapshotWriter {
    fn drop(&mut self) {
        self.finish();
    }
}

fn snapshot_path(dir: &Path, frame_index: u64) -> PathBuf {
    dir.join(format!("overlay_{frame_index:06}.png"))
}

fn save(dir: &Path, overlay: &OverlayImage) -> Result<()> {
    let image = RgbImage::from_raw(overlay.width, overlay.height, overlay.rgb.clone())
        .context("overlay buffer does not match its dimensions")?;
    let path = snapshot_path(dir, overlay.frame_index);
    image
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    for text in &overlay.texts {
        log::debug!(
            "frame {} text at ({:.0}, {:.0}): {}",
            overlay.frame_index,
            text.position.0,
            text.position.1,
            text.text
        );
    }
    Ok(())
}
