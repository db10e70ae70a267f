//! Image normalization to fixed square icons and placeholder synthesis.

use std::io::Cursor;

use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use zune_core::{colorspace::ColorSpace, options::DecoderOptions};
use zune_jpeg::JpegDecoder;

use crate::glyph_font;
use crate::text_fold::fold_to_ascii;
use crate::title_canonicalizer::split_leading_article;

pub const DEFAULT_TARGET_SIZE: u32 = 256;
pub const MIN_TARGET_SIZE: u32 = 16;
pub const MAX_TARGET_SIZE: u32 = 1024;
const PLACEHOLDER_INK: Rgb<u8> = Rgb([236, 236, 240]);

/// How an arbitrary image is reshaped into the target square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMode {
    /// Fit the whole image inside the square over the background color.
    #[default]
    Letterbox,
    /// Cover the square and cut the overflow. Legacy behavior.
    Crop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSettings {
    pub target_size: u32,
    pub mode: NormalizeMode,
    pub background: [u8; 3],
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            mode: NormalizeMode::Letterbox,
            background: [0, 0, 0],
        }
    }
}

fn looks_like_jpeg(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0xff && bytes[1] == 0xd8
}

fn decode_jpeg_non_strict(bytes: &[u8]) -> Option<DynamicImage> {
    if !looks_like_jpeg(bytes) {
        return None;
    }

    let options = DecoderOptions::new_cmd()
        .set_strict_mode(false)
        .jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(bytes, options);
    let pixels = decoder.decode().ok()?;
    let (width, height) = decoder.dimensions()?;
    let image = RgbaImage::from_raw(width as u32, height as u32, pixels)?;
    Some(DynamicImage::ImageRgba8(image))
}

pub fn decode_image_from_memory_with_fallback(bytes: &[u8]) -> Option<DynamicImage> {
    // Catalog images are mostly PNG; truncated JPEGs get the lenient decoder.
    image::load_from_memory(bytes)
        .ok()
        .or_else(|| decode_jpeg_non_strict(bytes))
}

/// Dimensions of an encoded image file, if it decodes.
#[cfg(test)]
pub(crate) fn image_dimensions(path: &std::path::Path) -> Option<(u32, u32)> {
    image::image_dimensions(path).ok().or_else(|| {
        let bytes = std::fs::read(path).ok()?;
        decode_image_from_memory_with_fallback(&bytes).map(|decoded| decoded.dimensions())
    })
}

fn fit_within_square(width: u32, height: u32, target: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (1, 1);
    }
    let clamped = target.max(1);
    if width >= height {
        let scaled_height =
            ((u64::from(height) * u64::from(clamped)) + (u64::from(width) / 2)) / u64::from(width);
        (clamped, (scaled_height.max(1) as u32).min(clamped))
    } else {
        let scaled_width =
            ((u64::from(width) * u64::from(clamped)) + (u64::from(height) / 2)) / u64::from(height);
        ((scaled_width.max(1) as u32).min(clamped), clamped)
    }
}

/// Largest centered square inside a `width` x `height` image, as `(left, top, side)`.
fn center_square(width: u32, height: u32) -> (u32, u32, u32) {
    let side = width.min(height).max(1);
    (
        width.saturating_sub(side) / 2,
        height.saturating_sub(side) / 2,
        side,
    )
}

fn resize_smooth(decoded: DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    let mut current = decoded;
    let mut current_dims = current.dimensions();
    let target_w = target_width.max(1);
    let target_h = target_height.max(1);

    // Halve large scans first so the final pass does not alias.
    while current_dims.0 > target_w.saturating_mul(2) || current_dims.1 > target_h.saturating_mul(2)
    {
        let next_w = (current_dims.0 / 2).max(target_w);
        let next_h = (current_dims.1 / 2).max(target_h);
        current = current.resize_exact(next_w, next_h, FilterType::Triangle);
        current_dims = current.dimensions();
    }

    if current_dims.0 == target_w && current_dims.1 == target_h {
        return current;
    }
    current.resize_exact(target_w, target_h, FilterType::Lanczos3)
}

fn flatten_onto(image: &DynamicImage, background: [u8; 3]) -> RgbImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let [r, g, b] = background;
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));
    imageops::overlay(&mut canvas, &rgba, 0, 0);
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Scales the whole image into a `target`-sized square, centered on `background`.
pub fn letterbox(decoded: DynamicImage, target: u32, background: [u8; 3]) -> RgbImage {
    let (width, height) = decoded.dimensions();
    let (fit_width, fit_height) = fit_within_square(width, height, target);
    let resized = resize_smooth(decoded, fit_width, fit_height);
    let [r, g, b] = background;
    let mut canvas = RgbaImage::from_pixel(target, target, Rgba([r, g, b, 255]));
    let offset_x = i64::from((target - fit_width) / 2);
    let offset_y = i64::from((target - fit_height) / 2);
    imageops::overlay(&mut canvas, &resized.to_rgba8(), offset_x, offset_y);
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Center-crops the image to a square and scales it to `target`.
///
/// Cropping happens on the source so the working buffer never exceeds the
/// decoded image, whatever its aspect ratio.
pub fn cover_crop(decoded: DynamicImage, target: u32, background: [u8; 3]) -> RgbImage {
    let (width, height) = decoded.dimensions();
    let (left, top, side) = center_square(width, height);
    let cropped = decoded.crop_imm(left, top, side, side);
    let resized = resize_smooth(cropped, target, target);
    flatten_onto(&resized, background)
}

fn encode_png(image: RgbImage) -> Option<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut cursor, ImageFormat::Png)
        .ok()?;
    Some(cursor.into_inner())
}

/// Decodes `bytes` and re-encodes them as an opaque `target_size` square PNG.
///
/// Returns `None` when the bytes are not a decodable image.
pub fn normalize_image_bytes(bytes: &[u8], settings: &ImageSettings) -> Option<Vec<u8>> {
    let decoded = decode_image_from_memory_with_fallback(bytes)?;
    let target = settings
        .target_size
        .clamp(MIN_TARGET_SIZE, MAX_TARGET_SIZE);
    let shaped = match settings.mode {
        NormalizeMode::Letterbox => letterbox(decoded, target, settings.background),
        NormalizeMode::Crop => cover_crop(decoded, target, settings.background),
    };
    encode_png(shaped)
}

/// Background color for a title's placeholder, stable across runs and platforms.
pub fn placeholder_color(title: &str) -> [u8; 3] {
    let digest = md5::compute(title.as_bytes());
    // Keep channels in a mid-dark band so the light initials stay readable.
    [
        40 + digest[0] % 120,
        40 + digest[1] % 120,
        40 + digest[2] % 120,
    ]
}

/// Up to two uppercase initials: first letters of significant words, else leading characters.
pub fn placeholder_initials(title: &str) -> String {
    let folded = fold_to_ascii(title);
    let trimmed = folded.trim();
    let significant = split_leading_article(trimmed)
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);

    let word_initials: Vec<char> = significant
        .split(|ch: char| !ch.is_alphanumeric())
        .filter_map(|word| word.chars().next())
        .take(2)
        .collect();
    let chosen: Vec<char> = if word_initials.len() >= 2 {
        word_initials
    } else {
        folded
            .chars()
            .filter(|ch| ch.is_alphanumeric())
            .take(2)
            .collect()
    };
    if chosen.is_empty() {
        return "?".to_string();
    }
    chosen
        .into_iter()
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}

/// Renders the deterministic placeholder icon for `title` as PNG bytes.
pub fn placeholder_png(title: &str, settings: &ImageSettings) -> Option<Vec<u8>> {
    let target = settings
        .target_size
        .clamp(MIN_TARGET_SIZE, MAX_TARGET_SIZE);
    let mut canvas = RgbImage::from_pixel(target, target, Rgb(placeholder_color(title)));

    let initials = placeholder_initials(title);
    let glyph_count = initials.chars().count().max(1) as u32;
    let unit_width = glyph_count * glyph_font::GLYPH_WIDTH + (glyph_count - 1);
    let scale = ((target * 3 / 5) / unit_width)
        .min((target / 2) / glyph_font::GLYPH_HEIGHT)
        .max(1);
    let text_width = glyph_font::text_width(&initials, scale);
    let text_height = glyph_font::GLYPH_HEIGHT * scale;
    let x = target.saturating_sub(text_width) / 2;
    let y = target.saturating_sub(text_height) / 2;
    glyph_font::draw_text(&mut canvas, &initials, x, y, scale, PLACEHOLDER_INK);

    encode_png(canvas)
}

#[cfg(test)]
mod tests {
    use super::{
        center_square, cover_crop, decode_image_from_memory_with_fallback, fit_within_square,
        letterbox, normalize_image_bytes, placeholder_color, placeholder_initials,
        placeholder_png, ImageSettings, NormalizeMode,
    };
    use image::{
        codecs::jpeg::JpegEncoder, DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgb,
        RgbImage, Rgba,
    };
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        image
            .write_to(&mut cursor, format)
            .expect("encoding should succeed");
        cursor.into_inner()
    }

    #[test]
    fn test_fit_within_square_preserves_aspect_ratio() {
        assert_eq!(fit_within_square(2000, 1000, 256), (256, 128));
        assert_eq!(fit_within_square(1000, 2000, 256), (128, 256));
        assert_eq!(fit_within_square(64, 64, 256), (256, 256));
        assert_eq!(fit_within_square(0, 10, 256), (1, 1));
    }

    #[test]
    fn test_center_square_takes_the_middle_of_the_long_side() {
        assert_eq!(center_square(200, 100), (50, 0, 100));
        assert_eq!(center_square(100, 300), (0, 100, 100));
        assert_eq!(center_square(1, 20_000), (0, 9_999, 1));
        assert_eq!(center_square(64, 64), (0, 0, 64));
    }

    #[test]
    fn test_letterbox_keeps_content_and_pads_with_background() {
        let source = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(
            400,
            100,
            Rgba([255, 0, 0, 255]),
        ));
        let shaped = letterbox(source, 64, [0, 0, 255]);
        assert_eq!(shaped.dimensions(), (64, 64));
        assert_eq!(shaped.get_pixel(32, 32), &Rgb([255, 0, 0]));
        assert_eq!(shaped.get_pixel(32, 0), &Rgb([0, 0, 255]));
        assert_eq!(shaped.get_pixel(32, 63), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_cover_crop_fills_the_square() {
        let source = DynamicImage::ImageRgba8(ImageBuffer::from_fn(300, 100, |x, _| {
            if x < 100 {
                Rgba([0, 255, 0, 255])
            } else {
                Rgba([255, 0, 0, 255])
            }
        }));
        let shaped = cover_crop(source, 50, [0, 0, 0]);
        assert_eq!(shaped.dimensions(), (50, 50));
        assert_eq!(shaped.get_pixel(25, 0), &Rgb([255, 0, 0]));
        assert_eq!(shaped.get_pixel(25, 49), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_transparent_pixels_become_background() {
        let source = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(
            10,
            10,
            Rgba([255, 255, 255, 0]),
        ));
        let shaped = letterbox(source, 20, [10, 20, 30]);
        assert_eq!(shaped.get_pixel(10, 10), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_normalize_image_bytes_outputs_target_square_png() {
        let png = encode(
            DynamicImage::ImageRgba8(ImageBuffer::from_pixel(37, 91, Rgba([8, 16, 24, 128]))),
            ImageFormat::Png,
        );
        for mode in [NormalizeMode::Letterbox, NormalizeMode::Crop] {
            let settings = ImageSettings {
                target_size: 128,
                mode,
                background: [0, 0, 0],
            };
            let normalized =
                normalize_image_bytes(&png, &settings).expect("png should normalize");
            let decoded = image::load_from_memory_with_format(&normalized, ImageFormat::Png)
                .expect("output should be png");
            assert_eq!(decoded.dimensions(), (128, 128));
            assert!(!decoded.color().has_alpha());
        }
    }

    #[test]
    fn test_crop_mode_handles_extreme_aspect_ratio() {
        let png = encode(
            DynamicImage::ImageRgba8(ImageBuffer::from_pixel(1, 20_000, Rgba([40, 80, 120, 255]))),
            ImageFormat::Png,
        );
        let settings = ImageSettings {
            target_size: 256,
            mode: NormalizeMode::Crop,
            background: [0, 0, 0],
        };
        let normalized = normalize_image_bytes(&png, &settings).expect("strip should normalize");
        let decoded = image::load_from_memory_with_format(&normalized, ImageFormat::Png)
            .expect("output should be png");
        assert_eq!(decoded.dimensions(), (256, 256));
        assert_eq!(decoded.to_rgb8().get_pixel(128, 128), &Rgb([40, 80, 120]));
    }

    #[test]
    fn test_normalize_image_bytes_rejects_non_image_bytes() {
        assert!(normalize_image_bytes(b"<html>404</html>", &ImageSettings::default()).is_none());
    }

    #[test]
    fn test_decode_image_from_memory_with_fallback_decodes_jpeg_bytes() {
        let rgb = RgbImage::from_pixel(12, 9, Rgb([90, 140, 210]));
        let mut encoded = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut encoded, 85);
            encoder
                .encode_image(&DynamicImage::ImageRgb8(rgb))
                .expect("jpeg encoding should succeed");
        }
        encoded.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

        let decoded = decode_image_from_memory_with_fallback(&encoded)
            .expect("fallback decoder should decode jpeg bytes");
        assert_eq!(decoded.dimensions(), (12, 9));
    }

    #[test]
    fn test_placeholder_initials() {
        assert_eq!(placeholder_initials("The Legend of Zelda"), "LO");
        assert_eq!(placeholder_initials("Super Mario World"), "SM");
        assert_eq!(placeholder_initials("Tetris"), "TE");
        assert_eq!(placeholder_initials("A"), "A");
        assert_eq!(placeholder_initials("Ōkami"), "OK");
        assert_eq!(placeholder_initials("!!!"), "?");
    }

    #[test]
    fn test_placeholder_color_is_stable() {
        assert_eq!(placeholder_color("Tetris"), placeholder_color("Tetris"));
        assert!(placeholder_color("Tetris")
            .iter()
            .all(|channel| (40..160).contains(channel)));
    }

    #[test]
    fn test_placeholder_png_is_deterministic_square() {
        let settings = ImageSettings::default();
        let first = placeholder_png("Super Mario World", &settings).expect("placeholder renders");
        let second = placeholder_png("Super Mario World", &settings).expect("placeholder renders");
        assert_eq!(first, second);
        let decoded = image::load_from_memory(&first).expect("placeholder decodes");
        assert_eq!(decoded.dimensions(), (256, 256));
    }
}
