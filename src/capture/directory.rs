use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use image::RgbImage;

use crate::error::{MonitorError, Result};

use super::device::{CaptureDevice, CaptureSource};

const ENABLE_LOGS: bool = false;

use crate::{log_info, log_warn};

const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Camera backed by a directory of stills, served in name order and looped.
///
/// Only one device may be open at a time; the next `acquire` succeeds once the
/// previous device is stopped.
pub struct DirectoryCamera {
    dir: PathBuf,
    opened: Arc<AtomicBool>,
}

impl DirectoryCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            opened: Arc::new(AtomicBool::new(false)),
        }
    }

    fn list_frames(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|err| match err.kind() {
            ErrorKind::PermissionDenied => {
                MonitorError::Device(format!("permission denied for {}", self.dir.display()))
            }
            _ => MonitorError::Device(format!(
                "no capture device at {}: {err}",
                self.dir.display()
            )),
        })?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_frame_file(path))
            .collect();
        frames.sort();
        Ok(frames)
    }
}

impl CaptureSource for DirectoryCamera {
    fn acquire(&self) -> Result<Arc<dyn CaptureDevice>> {
        let frames = self.list_frames()?;
        if frames.is_empty() {
            return Err(MonitorError::Device(format!(
                "no frames available in {}",
                self.dir.display()
            )));
        }
        if self.opened.swap(true, Ordering::SeqCst) {
            return Err(MonitorError::Device(format!(
                "capture device at {} is already in use",
                self.dir.display()
            )));
        }

        log_info!(
            "directory camera opened at {} ({} frames)",
            self.dir.display(),
            frames.len()
        );
        let device: Arc<dyn CaptureDevice> = Arc::new(DirectoryDevice {
            frames,
            cursor: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
            opened: Arc::clone(&self.opened),
        });
        Ok(device)
    }
}

struct DirectoryDevice {
    frames: Vec<PathBuf>,
    cursor: AtomicUsize,
    stopped: AtomicBool,
    opened: Arc<AtomicBool>,
}

impl DirectoryDevice {
    fn close(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.opened.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for DirectoryDevice {
    fn drop(&mut self) {
        self.close();
    }
}

impl CaptureDevice for DirectoryDevice {
    fn read_frame(&self) -> Option<RgbImage> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.frames.len();
        let path = &self.frames[index];
        match image::open(path) {
            Ok(image) => Some(image.to_rgb8()),
            Err(err) => {
                log_warn!("unreadable frame {}: {err}", path.display());
                None
            }
        }
    }

    fn stop(&self) {
        self.close();
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                FRAME_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("classwatch-frames-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn serves_frames_in_name_order_and_loops() {
        let dir = scratch_dir();
        RgbImage::from_pixel(3, 2, Rgb([255, 0, 0]))
            .save(dir.join("a.png"))
            .unwrap();
        RgbImage::from_pixel(5, 4, Rgb([0, 0, 255]))
            .save(dir.join("b.png"))
            .unwrap();
        fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let device = DirectoryCamera::new(&dir).acquire().unwrap();
        let sizes: Vec<(u32, u32)> = (0..3)
            .map(|_| device.read_frame().unwrap().dimensions())
            .collect();
        assert_eq!(sizes, vec![(3, 2), (5, 4), (3, 2)]);

        device.stop();
        assert!(device.read_frame().is_none());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn one_open_device_at_a_time() {
        let dir = scratch_dir();
        RgbImage::from_pixel(2, 2, Rgb([0, 255, 0]))
            .save(dir.join("a.jpg"))
            .unwrap();
        let camera = DirectoryCamera::new(&dir);

        let first = camera.acquire().unwrap();
        let busy = camera.acquire();
        assert!(matches!(busy, Err(MonitorError::Device(ref m)) if m.contains("already in use")));

        first.stop();
        let second = camera.acquire().unwrap();
        assert!(second.read_frame().is_some());

        // Stopping twice must not free a device someone else now holds.
        first.stop();
        assert!(camera.acquire().is_err());
        second.stop();
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_directory_is_a_device_error() {
        let dir = std::env::temp_dir().join(format!("classwatch-missing-{}", Uuid::new_v4()));
        let result = DirectoryCamera::new(dir).acquire();
        assert!(matches!(result, Err(MonitorError::Device(_))));
    }

    #[test]
    fn empty_directory_is_a_device_error() {
        let dir = scratch_dir();
        let result = DirectoryCamera::new(&dir).acquire();
        assert!(matches!(result, Err(MonitorError::Device(_))));
        fs::remove_dir_all(dir).unwrap();
    }
}
