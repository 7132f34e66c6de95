//! Shrinks and recompresses uploaded images.

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, ImageResult};

/// Resize-and-recompress settings applied to every stored image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageTransform {
    max_width: u32,
    quality: u8,
}

impl ImageTransform {
    /// The extension of transformed output.
    pub const EXTENSION: &'static str = "jpg";

    /// A transform producing JPEGs at most `max_width` pixels wide.
    pub fn new(max_width: u32, quality: u8) -> Self {
        Self {
            max_width: max_width.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    /// Decodes `data`, narrows it to the maximum width keeping its aspect
    /// ratio, and encodes it as JPEG. Narrower images keep their size.
    ///
    /// CPU bound, run it on a blocking thread.
    pub fn apply(&self, data: &[u8]) -> ImageResult<Vec<u8>> {
        let mut image = image::load_from_memory(data)?;
        if image.width() > self.max_width {
            image = image.resize(self.max_width, image.height(), FilterType::Triangle);
        }
        let rgb = image.to_rgb8();
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality).encode_image(&rgb)?;
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, ImageFormat, RgbaImage};
    use std::io::Cursor;

    /// A PNG of the given size, for tests.
    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([200, 30, 30, 128]),
        ));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn wide_image_is_narrowed_keeping_aspect_ratio() {
        let out = ImageTransform::new(300, 60).apply(&png(600, 400)).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(ImageFormat::Jpeg, image::guess_format(&out).unwrap());
        assert_eq!((300, 200), decoded.dimensions());
    }

    #[test]
    fn narrow_image_keeps_its_size() {
        let out = ImageTransform::new(300, 60).apply(&png(120, 80)).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((120, 80), decoded.dimensions());
    }

    #[test]
    fn garbage_is_rejected() {
        let result = ImageTransform::new(300, 60).apply(b"definitely not an image");
        assert!(result.is_err());
    }
}
