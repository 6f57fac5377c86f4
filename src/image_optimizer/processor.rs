//! Image processing implementation
//!
//! Handles the actual transformation of an upload:
//! validate → decode → orient → resize → watermark → encode

use bytes::Bytes;
use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;
use std::num::NonZeroU32;
use std::time::Instant;

use super::encoder::{EncoderQuality, JpegEncoder, OutputFormat};
use super::error::ImageError;
use super::metrics::ImageProcessingMetrics;
use super::policy::select_optimization;
use super::security::{validate_dimensions, validate_file_size, validate_mime_type, SecurityConfig};
use crate::watermark::{render_watermark, LogoHandle, RenderReport, WatermarkOptions};

/// An uploaded image as received from the form layer
#[derive(Debug, Clone)]
pub struct RawImage {
    pub bytes: Bytes,
    /// MIME type declared by the uploader
    pub mime_type: String,
}

impl RawImage {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Result of image processing
#[derive(Debug, Clone)]
pub struct ProcessedImageResult {
    /// The encoded output
    pub bytes: Vec<u8>,
    pub byte_size: usize,
    pub width: u32,
    pub height: u32,
    pub had_watermark: bool,
    pub format: OutputFormat,
    /// Content-Type of `bytes`
    pub content_type: &'static str,
    pub metrics: ImageProcessingMetrics,
}

/// Optimize an upload and optionally stamp a logo on it.
///
/// `max_width`/`max_height` replace the bounding box picked by the
/// compression policy but never its quality. Uses the default upload limits.
pub fn process_image(
    raw: &RawImage,
    logo: Option<&LogoHandle>,
    max_width: Option<u32>,
    max_height: Option<u32>,
    options: &WatermarkOptions,
) -> Result<ProcessedImageResult, ImageError> {
    process_image_with_limits(
        raw,
        logo,
        max_width,
        max_height,
        options,
        &SecurityConfig::default(),
    )
}

/// [`process_image`] with explicit upload limits
pub fn process_image_with_limits(
    raw: &RawImage,
    logo: Option<&LogoHandle>,
    max_width: Option<u32>,
    max_height: Option<u32>,
    options: &WatermarkOptions,
    limits: &SecurityConfig,
) -> Result<ProcessedImageResult, ImageError> {
    let started = Instant::now();

    // 1. Validate and decode
    validate_mime_type(&raw.mime_type)?;
    validate_file_size(raw.len(), limits)?;
    let (header_width, header_height) = read_dimensions(&raw.bytes)?;
    validate_dimensions(header_width, header_height, limits)?;
    let img = decode_image(&raw.bytes)?;
    let img = apply_exif_orientation(img, &raw.bytes);
    let (src_width, src_height) = (img.width(), img.height());

    // 2. Pick the compression tier
    let settings =
        select_optimization(src_width, src_height).with_max_dimensions(max_width, max_height);

    // 3. Calculate target dimensions
    let (target_width, target_height) = calculate_dimensions(
        src_width,
        src_height,
        settings.max_width,
        settings.max_height,
    );

    tracing::debug!(
        mime_type = %raw.mime_type,
        src_width = src_width,
        src_height = src_height,
        target_width = target_width,
        target_height = target_height,
        tier = settings.tier.as_label(),
        "Selected optimization settings"
    );

    // 4. Resize onto the working surface
    let mut surface = if target_width != src_width || target_height != src_height {
        resize_image(&img, target_width, target_height)?
    } else {
        img.to_rgba8()
    };
    drop(img);

    // 5. Watermark
    let report = match logo {
        Some(logo) => match options.validate() {
            Ok(()) => Some(render_watermark(&mut surface, logo, options)),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid watermark options, skipping watermark");
                None
            }
        },
        None => None,
    };

    // 6. Encode
    let quality = EncoderQuality::with_quality(settings.jpeg_quality());
    let encoded = match settings.format {
        OutputFormat::Jpeg => {
            JpegEncoder.encode(surface.as_raw(), target_width, target_height, quality)?
        }
    };

    let RenderReport { drawn, skipped, .. } = report.unwrap_or_default();
    let metrics = ImageProcessingMetrics::builder()
        .original_size(raw.len())
        .processed_size(encoded.data.len())
        .original_dimensions(src_width, src_height)
        .processed_dimensions(target_width, target_height)
        .quality(settings.quality, settings.tier)
        .processing_time(started.elapsed())
        .watermark_tiles(drawn, skipped)
        .build();

    tracing::info!(
        original_bytes = metrics.original_size,
        output_bytes = metrics.processed_size,
        compression_ratio = metrics.compression_ratio(),
        width = target_width,
        height = target_height,
        format = encoded.format.as_str(),
        quality = settings.quality,
        tier = settings.tier.as_label(),
        watermark_tiles = drawn,
        processing_ms = metrics.processing_time.as_millis() as u64,
        "Processed image"
    );

    Ok(ProcessedImageResult {
        byte_size: encoded.data.len(),
        bytes: encoded.data,
        width: target_width,
        height: target_height,
        had_watermark: report.is_some(),
        format: encoded.format,
        content_type: encoded.content_type,
        metrics,
    })
}

/// Read dimensions from the image header without decoding pixels
fn read_dimensions(data: &[u8]) -> Result<(u32, u32), ImageError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

/// Decode image data into a DynamicImage
fn decode_image(data: &[u8]) -> Result<DynamicImage, ImageError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

/// Read the EXIF orientation tag (1-8), if present
fn exif_orientation(data: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(data);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
}

/// Rotate/flip so the pixels match what a browser would display
fn apply_exif_orientation(img: DynamicImage, data: &[u8]) -> DynamicImage {
    match exif_orientation(data) {
        Some(2) => img.fliph(),
        Some(3) => img.rotate180(),
        Some(4) => img.flipv(),
        Some(5) => img.rotate90().fliph(),
        Some(6) => img.rotate90(),
        Some(7) => img.rotate270().fliph(),
        Some(8) => img.rotate270(),
        _ => img,
    }
}

/// Fit `width` x `height` inside `max_width` x `max_height`.
///
/// Both axes are scaled by the same factor; images already inside the box
/// keep their size.
pub fn calculate_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
    let scaled_width = (width as f64 * scale).round() as u32;
    let scaled_height = (height as f64 * scale).round() as u32;
    (scaled_width.max(1), scaled_height.max(1))
}

/// Resize image using fast-image-resize with Lanczos3 filter
fn resize_image(img: &DynamicImage, target_w: u32, target_h: u32) -> Result<RgbaImage, ImageError> {
    let src_width =
        NonZeroU32::new(img.width()).ok_or_else(|| ImageError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| ImageError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| ImageError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| ImageError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| ImageError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| ImageError::resize_failed("Failed to create output image buffer"))
}
