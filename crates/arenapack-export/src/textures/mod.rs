//! Texture conversion utilities
//!
//! Images are normalized for the web client: TGA becomes PNG, and images
//! whose sides are not powers of two are scaled up to the next power of two.

mod converter;

pub use converter::{
    is_power_of_two, next_power_of_two, power_of_two_size, ConvertedImage, ImageCodec,
    ImageCrateCodec, ImageFormat, TextureConvertOptions,
};
