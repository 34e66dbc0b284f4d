use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageOutputFormat, RgbImage};

use super::IngestError;

// ── Orientation ───────────────────────────────────────────

/// Puts a decoded photo upright.
///
/// Phone cameras store the sensor image as-is and record the rotation in
/// EXIF tag 0x0112. Browsers honour it when displaying, so dimensions and
/// pixels must be taken after correction.
pub trait OrientationCorrector: Send + Sync {
    /// `raw_bytes` are the original file bytes (EXIF lives there).
    fn correct(&self, raw_bytes: &[u8], image: DynamicImage) -> DynamicImage;
}

/// EXIF-based correction via `kamadak-exif`.
///
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
pub struct ExifOrientationCorrector;

impl OrientationCorrector for ExifOrientationCorrector {
    fn correct(&self, raw_bytes: &[u8], image: DynamicImage) -> DynamicImage {
        let orientation = read_exif_orientation(raw_bytes);
        if orientation != 1 {
            tracing::debug!(orientation, "Applying EXIF orientation");
        }
        apply_orientation(image, orientation)
    }
}

/// Leaves the image as decoded.
pub struct NoOpOrientationCorrector;

impl OrientationCorrector for NoOpOrientationCorrector {
    fn correct(&self, _raw_bytes: &[u8], image: DynamicImage) -> DynamicImage {
        image
    }
}

/// EXIF orientation tag, or 1 when absent or unreadable.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

// ── Scaling ───────────────────────────────────────────────

/// Target dimensions for a long-edge bound.
///
/// `scale = min(1, max_edge / max(w, h))`; each side is rounded and kept
/// at least 1px. Images already within bounds come back unchanged.
pub fn compute_fit_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let long = width.max(height);
    if long == 0 || long <= max_edge {
        return (width, height);
    }
    let scale = max_edge as f64 / long as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

pub fn needs_downscale(width: u32, height: u32, max_edge: u32) -> bool {
    width.max(height) > max_edge
}

/// Downscale so the long edge is at most `max_edge`. Pure.
pub fn resize_to_max_edge(image: &RgbImage, max_edge: u32) -> RgbImage {
    let (w, h) = compute_fit_dimensions(image.width(), image.height(), max_edge);
    if (w, h) == (image.width(), image.height()) {
        return image.clone();
    }
    image::imageops::resize(image, w, h, FilterType::Triangle)
}

/// Encode as baseline JPEG. JPEG has no alpha, so input is already RGB.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, IngestError> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut cursor, ImageOutputFormat::Jpeg(quality))
        .map_err(|e| IngestError::Encode(e.to_string()))?;
    Ok(cursor.into_inner())
}
