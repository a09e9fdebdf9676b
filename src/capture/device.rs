use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;

use crate::error::{MonitorError, Result};

use super::frame::{encode_jpeg, Frame};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Something that can open a camera.
pub trait CaptureSource: Send + Sync {
    /// Fails with `MonitorError::Device` when permission is denied or no device exists.
    fn acquire(&self) -> Result<Arc<dyn CaptureDevice>>;
}

/// An opened camera.
pub trait CaptureDevice: Send + Sync {
    /// Blocking read of the current still. `None` when the device has no frame.
    fn read_frame(&self) -> Option<RgbImage>;

    /// Stops every underlying track.
    fn stop(&self);
}

struct HandleInner {
    device: Arc<dyn CaptureDevice>,
    released: AtomicBool,
}

impl HandleInner {
    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.device.stop();
        true
    }
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        if self.release() {
            log_warn!("capture handle dropped without release; device stopped");
        }
    }
}

/// Exclusive handle on an acquired device.
///
/// Clones share the device; `release` stops it exactly once no matter how many
/// clones call it, and the last clone to drop releases it if nobody did.
#[derive(Clone)]
pub struct CaptureHandle {
    inner: Arc<HandleInner>,
    jpeg_quality: u8,
    timeout: Duration,
}

impl CaptureHandle {
    pub fn acquire(
        source: &dyn CaptureSource,
        jpeg_quality: u8,
        timeout: Duration,
    ) -> Result<Self> {
        let device = source.acquire()?;
        log_info!("capture device acquired");
        Ok(Self {
            inner: Arc::new(HandleInner {
                device,
                released: AtomicBool::new(false),
            }),
            jpeg_quality,
            timeout,
        })
    }

    /// Grabs and encodes one still, bounded by the capture timeout.
    pub async fn capture_frame(&self) -> Result<Frame> {
        if self.is_released() {
            return Err(MonitorError::Capture("capture device already released".into()));
        }

        let inner = Arc::clone(&self.inner);
        let quality = self.jpeg_quality;
        let job = tokio::task::spawn_blocking(move || {
            let image = inner
                .device
                .read_frame()
                .ok_or_else(|| MonitorError::Capture("device produced no frame".into()))?;
            encode_jpeg(&image, quality)
        });

        match tokio::time::timeout(self.timeout, job).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(MonitorError::Capture(format!(
                "capture worker failed: {join_err}"
            ))),
            Err(_) => Err(MonitorError::Capture(format!(
                "no frame within {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    /// Stops the device. Returns false when it was already released.
    pub fn release(&self) -> bool {
        let released = self.inner.release();
        if released {
            log_info!("capture device released");
        }
        released
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }
}
