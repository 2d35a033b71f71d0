//! Image decode and encode.
//!
//! Decoding runs on a helper thread bounded by a timeout so one pathological
//! file cannot stall a run.

use std::io::Cursor;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::error::BoxforgeError;
use crate::ir::{ImageId, ImageSize, LabeledImage};

/// JPEG quality of derived images.
pub const JPEG_QUALITY: u8 = 90;

/// Loads and decodes `image` into RGB pixels, giving up after `timeout`.
///
/// A timed-out decode is abandoned; its helper thread finishes on its own
/// and its result is discarded.
pub fn decode_rgb(image: &LabeledImage, timeout: Duration) -> Result<RgbImage, BoxforgeError> {
    let id = image.id.clone();
    let pixels = image.pixels.clone();
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name(format!("decode-{id}"))
        .spawn(move || {
            let result = pixels
                .load()
                .map_err(|err| err.to_string())
                .and_then(|bytes| {
                    image::load_from_memory(&bytes)
                        .map(|decoded| decoded.to_rgb8())
                        .map_err(|err| err.to_string())
                });
            // The receiver is gone after a timeout.
            let _ = tx.send(result);
        })?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(rgb)) => Ok(rgb),
        Ok(Err(message)) => Err(BoxforgeError::Decode { image: id, message }),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(BoxforgeError::DecodeTimeout { image: id, timeout }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(BoxforgeError::Decode {
            image: id,
            message: "decoder thread exited without a result".to_string(),
        }),
    }
}

/// Encodes `rgb` as a JPEG at [`JPEG_QUALITY`].
pub fn encode_jpeg(id: &ImageId, rgb: &RgbImage) -> Result<Vec<u8>, BoxforgeError> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode_image(rgb)
        .map_err(|err| BoxforgeError::Encode {
            image: id.clone(),
            message: err.to_string(),
        })?;
    Ok(buf.into_inner())
}

/// Reads the pixel size from the encoded header without decoding.
pub fn probe_size(bytes: &[u8]) -> Option<ImageSize> {
    let size = imagesize::blob_size(bytes).ok()?;
    let width = u32::try_from(size.width).ok()?;
    let height = u32::try_from(size.height).ok()?;
    Some(ImageSize::new(width, height))
}

/// Returns the known size or probes it from the image bytes.
pub fn resolve_size(image: &LabeledImage) -> Option<ImageSize> {
    if image.size.is_some() {
        return image.size;
    }
    let bytes = image.pixels.load().ok()?;
    probe_size(&bytes)
}
