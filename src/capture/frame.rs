use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::error::{MonitorError, Result};

/// A JPEG-encoded still ready to submit for classification.
#[derive(Debug, Clone)]
pub struct Frame {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

/// Blocking; call from a blocking worker.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Frame> {
    if image.width() == 0 || image.height() == 0 {
        return Err(MonitorError::Capture("device produced an empty frame".into()));
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(|err| MonitorError::Capture(format!("jpeg encoding failed: {err}")))?;

    Ok(Frame {
        jpeg,
        width: image.width(),
        height: image.height(),
        captured_at: Utc::now(),
    })
}
