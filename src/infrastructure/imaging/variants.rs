/// Side of the square primary image, in pixels.
pub const PRIMARY_SIZE: u32 = 400;
/// Side of the square thumbnail, in pixels.
pub const THUMBNAIL_SIZE: u32 = 150;
pub const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone)]
pub struct ImageVariants {
    pub primary: Vec<u8>,
    pub thumbnail: Vec<u8>,
    pub mime_type: String,
    /// False when both variants are the untouched original bytes.
    pub processed: bool,
}

impl ImageVariants {
    fn unprocessed(original: Vec<u8>, mime_type: &str) -> Self {
        ImageVariants {
            thumbnail: original.clone(),
            primary: original,
            mime_type: mime_type.to_string(),
            processed: false,
        }
    }
}

/// Builds the primary and thumbnail variants of an uploaded picture.
///
/// Never fails: without the `image-processing` feature, or when the bytes
/// cannot be decoded, both variants are the original upload.
pub async fn generate_variants(original: Vec<u8>, mime_type: &str) -> ImageVariants {
    let input = original.clone();
    let result = tokio::task::spawn_blocking(move || render_variants(&input)).await;

    match result {
        Ok(Ok((primary, thumbnail))) => ImageVariants {
            primary,
            thumbnail,
            mime_type: "image/jpeg".to_string(),
            processed: true,
        },
        Ok(Err(RenderError::Unavailable)) => {
            tracing::debug!("image processing not compiled in, storing original bytes");
            ImageVariants::unprocessed(original, mime_type)
        }
        Ok(Err(RenderError::Failed(e))) => {
            tracing::warn!(error = %e, mime_type = %mime_type, "image processing failed, storing original bytes");
            ImageVariants::unprocessed(original, mime_type)
        }
        Err(e) => {
            tracing::warn!(error = %e, "image processing task panicked, storing original bytes");
            ImageVariants::unprocessed(original, mime_type)
        }
    }
}

#[derive(Debug)]
enum RenderError {
    #[cfg_attr(feature = "image-processing", allow(dead_code))]
    Unavailable,
    #[cfg_attr(not(feature = "image-processing"), allow(dead_code))]
    Failed(String),
}

#[cfg(feature = "image-processing")]
fn render_variants(bytes: &[u8]) -> Result<(Vec<u8>, Vec<u8>), RenderError> {
    let image = image::load_from_memory(bytes).map_err(|e| RenderError::Failed(e.to_string()))?;

    let primary = square_jpeg(&image, PRIMARY_SIZE)?;
    let thumbnail = square_jpeg(&image, THUMBNAIL_SIZE)?;
    Ok((primary, thumbnail))
}

#[cfg(not(feature = "image-processing"))]
fn render_variants(_bytes: &[u8]) -> Result<(Vec<u8>, Vec<u8>), RenderError> {
    Err(RenderError::Unavailable)
}

/// Cover-fit into a `size`×`size` square, cropped around the centre.
#[cfg(feature = "image-processing")]
fn square_jpeg(image: &image::DynamicImage, size: u32) -> Result<Vec<u8>, RenderError> {
    use image::{codecs::jpeg::JpegEncoder, imageops::FilterType};

    let resized = image.resize_to_fill(size, size, FilterType::Lanczos3).to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&resized)
        .map_err(|e| RenderError::Failed(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn undecodable_bytes_fall_back_to_original() {
        let original = b"definitely not an image".to_vec();
        let variants = generate_variants(original.clone(), "image/png").await;

        assert!(!variants.processed);
        assert_eq!(variants.primary, original);
        assert_eq!(variants.thumbnail, original);
        assert_eq!(variants.mime_type, "image/png");
    }

    #[cfg(feature = "image-processing")]
    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[cfg(feature = "image-processing")]
    #[tokio::test]
    async fn produces_square_jpeg_variants() {
        let variants = generate_variants(png(640, 360), "image/png").await;

        assert!(variants.processed);
        assert_eq!(variants.mime_type, "image/jpeg");

        let primary = image::load_from_memory(&variants.primary).unwrap();
        assert_eq!((primary.width(), primary.height()), (PRIMARY_SIZE, PRIMARY_SIZE));

        let thumb = image::load_from_memory(&variants.thumbnail).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));
        assert_eq!(
            image::guess_format(&variants.thumbnail).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[cfg(feature = "image-processing")]
    #[tokio::test]
    async fn small_images_are_upscaled_to_fill() {
        let variants = generate_variants(png(32, 64), "image/png").await;
        let primary = image::load_from_memory(&variants.primary).unwrap();
        assert_eq!(primary.width(), PRIMARY_SIZE);
        assert_eq!(primary.height(), PRIMARY_SIZE);
    }

    #[cfg(not(feature = "image-processing"))]
    #[tokio::test]
    async fn without_image_library_original_is_kept() {
        let original = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        let variants = generate_variants(original.clone(), "image/png").await;
        assert!(!variants.processed);
        assert_eq!(variants.primary, original);
    }
}
