//! Texture format converter
//!
//! Converts TGA and JPEG textures to the formats shipped in archives.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat as ImgFormat};
use tracing::info;

use crate::error::{ExportError, ExportResult};

/// Image formats handled by the packer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG format (lossless, shipped instead of TGA)
    Png,
    /// TGA format (source only)
    Tga,
    /// JPEG format (lossy, kept as JPEG)
    Jpeg,
}

impl ImageFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Tga => "tga",
            ImageFormat::Jpeg => "jpg",
        }
    }

    /// Format of a path, by extension
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = arenapack_core::types::extension(path)?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ImageFormat::Png),
            "tga" => Some(ImageFormat::Tga),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }

    /// Convert to image crate's format
    fn to_img_format(self) -> ImgFormat {
        match self {
            ImageFormat::Png => ImgFormat::Png,
            ImageFormat::Tga => ImgFormat::Tga,
            ImageFormat::Jpeg => ImgFormat::Jpeg,
        }
    }
}

/// Texture conversion options
#[derive(Debug, Clone)]
pub struct TextureConvertOptions {
    /// Scale non-power-of-two images up
    pub resize_to_power_of_two: bool,

    /// Resampling filter used when resizing
    pub filter: FilterType,

    /// Quality of re-encoded JPEG images (1-100)
    pub jpeg_quality: u8,
}

impl Default for TextureConvertOptions {
    fn default() -> Self {
        Self {
            resize_to_power_of_two: true,
            filter: FilterType::Lanczos3,
            jpeg_quality: 90,
        }
    }
}

/// Result of a conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedImage {
    /// Encoded image
    pub data: Vec<u8>,
    /// Output format
    pub format: ImageFormat,
    /// Width after conversion
    pub width: u32,
    /// Height after conversion
    pub height: u32,
    /// Whether the image was scaled
    pub resized: bool,
}

/// Whether a side length is a power of two
pub fn is_power_of_two(x: u32) -> bool {
    x.is_power_of_two()
}

/// `2^(floor(log2 x) + 1)`: the power of two above a non-power-of-two side
pub fn next_power_of_two(x: u32) -> u32 {
    x.max(1).next_power_of_two()
}

/// Target size for an image: each non-power-of-two side is scaled up
pub fn power_of_two_size(width: u32, height: u32) -> (u32, u32) {
    let fix = |side: u32| if is_power_of_two(side) { side } else { next_power_of_two(side) };
    (fix(width), fix(height))
}

/// Image decoding, scaling and encoding
pub trait ImageCodec: Send + Sync {
    /// Decode an image
    fn decode(&self, data: &[u8], format: ImageFormat) -> ExportResult<DynamicImage>;

    /// Encode an image
    fn encode(&self, image: &DynamicImage, format: ImageFormat) -> ExportResult<Vec<u8>>;

    /// Options in effect
    fn options(&self) -> &TextureConvertOptions;

    /// Scale an image so that both sides are powers of two
    fn resize_to_power_of_two(&self, image: DynamicImage) -> (DynamicImage, bool) {
        let (width, height) = (image.width(), image.height());
        let (target_w, target_h) = power_of_two_size(width, height);

        if (target_w, target_h) == (width, height) {
            return (image, false);
        }

        info!(width, height, target_w, target_h, "Found NPOT texture, resizing");
        (image.resize_exact(target_w, target_h, self.options().filter), true)
    }

    /// Convert an encoded image to `target`.
    ///
    /// When nothing changes (same format, no resize) the input bytes are
    /// returned untouched so that lossy images are not re-compressed.
    fn reencode(&self, data: &[u8], source: ImageFormat, target: ImageFormat) -> ExportResult<ConvertedImage> {
        let image = self.decode(data, source)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(ExportError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
            });
        }

        let (image, resized) = if self.options().resize_to_power_of_two {
            self.resize_to_power_of_two(image)
        } else {
            (image, false)
        };

        let data = if source == target && !resized {
            data.to_vec()
        } else {
            self.encode(&image, target)?
        };

        Ok(ConvertedImage {
            data,
            format: target,
            width: image.width(),
            height: image.height(),
            resized,
        })
    }
}

/// Codec backed by the `image` crate
#[derive(Debug, Clone, Default)]
pub struct ImageCrateCodec {
    options: TextureConvertOptions,
}

impl ImageCrateCodec {
    /// Create new codec with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create codec with custom options
    pub fn with_options(options: TextureConvertOptions) -> Self {
        Self { options }
    }
}

impl ImageCodec for ImageCrateCodec {
    fn decode(&self, data: &[u8], format: ImageFormat) -> ExportResult<DynamicImage> {
        Ok(image::load_from_memory_with_format(data, format.to_img_format())?)
    }

    fn encode(&self, image: &DynamicImage, format: ImageFormat) -> ExportResult<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        match format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut buffer, self.options.jpeg_quality);
                rgb.write_with_encoder(encoder)?;
            }
            ImageFormat::Png | ImageFormat::Tga => {
                image.write_to(&mut buffer, format.to_img_format())?;
            }
        }
        Ok(buffer.into_inner())
    }

    fn options(&self) -> &TextureConvertOptions {
        &self.options
    }
}
