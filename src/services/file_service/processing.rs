//! 纯计算部分：上传校验、MIME 推断、图片缩放与缩略图、文本分析
//!
//! 这里的函数不做 IO，图片相关的函数需要在 `spawn_blocking` 中调用。

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};

use crate::config::UploadsConfig;
use crate::errors::{CommentaryError, Result};

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];
pub const TEXT_EXTENSIONS: &[&str] = &["txt"];
pub const PREVIEW_CHARS: usize = 1000;

pub const TYPE_IMAGE: &str = "image";
pub const TYPE_TEXT: &str = "text";
pub const TYPE_DOCUMENT: &str = "document";
pub const TYPE_OTHER: &str = "other";

pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// 按扩展名推断 MIME
pub fn mime_for(name: &str) -> Option<&'static str> {
    let mime = match extension_of(name)?.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "md" => "text/markdown",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

pub fn file_type_for(mime: Option<&str>) -> &'static str {
    match mime {
        Some(m) if m.starts_with("image/") => TYPE_IMAGE,
        Some(m) if m.starts_with("text/") => TYPE_TEXT,
        Some("application/pdf") | Some("application/msword") => TYPE_DOCUMENT,
        _ => TYPE_OTHER,
    }
}

/// `2621440` -> `2.5MB`，`102400` -> `100KB`
fn limit_label(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    let bytes = bytes as f64;
    if bytes >= MB {
        format!("{}MB", (bytes / MB * 10.0).round() / 10.0)
    } else {
        format!("{}KB", (bytes / 1024.0 * 10.0).round() / 10.0)
    }
}

/// 上传前校验：大小、扩展名、文本文件的单独上限
pub fn validate_upload(name: &str, size: u64, limits: &UploadsConfig) -> Result<()> {
    if size > limits.max_file_size {
        return Err(CommentaryError::payload_too_large(format!(
            "File size cannot exceed {}",
            limit_label(limits.max_file_size)
        )));
    }
    let ext = extension_of(name).unwrap_or_default();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Ok(());
    }
    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        if size > limits.max_text_file_size {
            return Err(CommentaryError::payload_too_large(format!(
                "Text file size cannot exceed {}",
                limit_label(limits.max_text_file_size)
            )));
        }
        return Ok(());
    }
    Err(CommentaryError::unsupported_file(
        "File type not supported. Only images and text files are allowed.",
    ))
}

pub fn checksum(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

// ===== 图片 =====

/// 图片处理参数
#[derive(Debug, Clone, Copy)]
pub struct ImageLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub thumbnail_size: u32,
    pub jpeg_quality: u8,
}

impl From<&UploadsConfig> for ImageLimits {
    fn from(c: &UploadsConfig) -> Self {
        Self {
            max_width: c.image_max_width,
            max_height: c.image_max_height,
            thumbnail_size: c.thumbnail_size,
            jpeg_quality: c.jpeg_quality,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub original_width: u32,
    pub original_height: u32,
    pub width: u32,
    pub height: u32,
    /// `JPEG` / `PNG` / `GIF`
    pub format: String,
    pub has_transparency: bool,
    pub color_mode: String,
    /// 缩小后的图片，未缩放时为 None
    pub resized: Option<Vec<u8>>,
    pub thumbnail: Vec<u8>,
    /// `png` 或 `jpg`
    pub thumbnail_ext: &'static str,
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}

fn color_mode(color: ColorType) -> String {
    match color {
        ColorType::L8 | ColorType::L16 => "L".to_string(),
        ColorType::La8 | ColorType::La16 => "LA".to_string(),
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "RGB".to_string(),
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "RGBA".to_string(),
        other => format!("{:?}", other),
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8,
    )?;
    Ok(buf)
}

fn encode_as(img: &DynamicImage, format: ImageOutputFormat) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)?;
    Ok(buf)
}

/// 等比缩放到不超过 max_w x max_h，不放大
fn fit_within(img: &DynamicImage, max_w: u32, max_h: u32) -> Option<DynamicImage> {
    let (w, h) = img.dimensions();
    if w <= max_w && h <= max_h {
        return None;
    }
    Some(img.resize(max_w, max_h, FilterType::Lanczos3))
}

/// 解码、按上限缩放并生成缩略图
pub fn process_image(data: &[u8], limits: ImageLimits) -> Result<ProcessedImage> {
    let format = image::guess_format(data)?;
    let img = image::load_from_memory_with_format(data, format)?;
    let (original_width, original_height) = img.dimensions();
    let has_transparency = img.color().has_alpha();

    let resized_img = fit_within(&img, limits.max_width, limits.max_height);
    let resized = match resized_img {
        Some(ref r) => Some(match format {
            ImageFormat::Png => encode_as(r, ImageOutputFormat::Png)?,
            ImageFormat::Gif => encode_as(r, ImageOutputFormat::Gif)?,
            _ => encode_jpeg(r, limits.jpeg_quality)?,
        }),
        None => None,
    };
    let current = resized_img.as_ref().unwrap_or(&img);
    let (width, height) = current.dimensions();

    let thumb_img = fit_within(current, limits.thumbnail_size, limits.thumbnail_size);
    let thumb_src = thumb_img.as_ref().unwrap_or(current);
    let (thumbnail, thumbnail_ext) = if has_transparency {
        (encode_as(thumb_src, ImageOutputFormat::Png)?, "png")
    } else {
        (encode_jpeg(thumb_src, limits.jpeg_quality)?, "jpg")
    };

    Ok(ProcessedImage {
        original_width,
        original_height,
        width,
        height,
        format: format_name(format),
        has_transparency,
        color_mode: color_mode(img.color()),
        resized,
        thumbnail,
        thumbnail_ext,
    })
}

/// 宽高比（两位小数）
pub fn aspect_ratio(width: i32, height: i32) -> f64 {
    if height == 0 {
        return 0.0;
    }
    (width as f64 / height as f64 * 100.0).round() / 100.0
}

pub fn orientation(width: i32, height: i32) -> &'static str {
    match width.cmp(&height) {
        std::cmp::Ordering::Greater => "landscape",
        std::cmp::Ordering::Less => "portrait",
        std::cmp::Ordering::Equal => "square",
    }
}

// ===== 文本 =====

#[derive(Debug, Clone, PartialEq)]
pub struct TextAnalysis {
    pub encoding: String,
    pub line_count: i64,
    pub word_count: i64,
    pub character_count: i64,
    pub preview: String,
    pub is_valid_utf8: bool,
    pub has_binary_content: bool,
}

pub fn analyze_text(data: &[u8]) -> TextAnalysis {
    let (content, is_valid_utf8) = match std::str::from_utf8(data) {
        Ok(s) => (s.to_string(), true),
        Err(_) => (String::from_utf8_lossy(data).into_owned(), false),
    };
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content).to_string();
    let has_binary_content =
        !is_valid_utf8 || content.chars().any(|c| c == '\0' || (c.is_control() && !c.is_whitespace()));

    let character_count = content.chars().count();
    let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
    if character_count > PREVIEW_CHARS {
        preview.push_str("...");
    }

    TextAnalysis {
        encoding: if is_valid_utf8 { "utf-8" } else { "unknown" }.to_string(),
        line_count: content.split('\n').count() as i64,
        word_count: content.split_whitespace().count() as i64,
        character_count: character_count as i64,
        preview,
        is_valid_utf8,
        has_binary_content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn limits() -> UploadsConfig {
        UploadsConfig::default()
    }

    fn png_bytes(w: u32, h: u32, alpha: bool) -> Vec<u8> {
        let img = if alpha {
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 128])))
        } else {
            DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 20, 30])))
        };
        encode_as(&img, ImageOutputFormat::Png).unwrap()
    }

    #[test]
    fn test_validate_upload_limits() {
        let cfg = limits();
        assert!(validate_upload("photo.JPG", 1000, &cfg).is_ok());
        assert!(validate_upload("notes.txt", 1000, &cfg).is_ok());

        let err = validate_upload("big.png", 3 * 1024 * 1024, &cfg).unwrap_err();
        assert_eq!(err.message(), "File size cannot exceed 2.5MB");

        let err = validate_upload("big.txt", 200 * 1024, &cfg).unwrap_err();
        assert_eq!(err.message(), "Text file size cannot exceed 100KB");

        let err = validate_upload("doc.pdf", 10, &cfg).unwrap_err();
        assert_eq!(
            err.message(),
            "File type not supported. Only images and text files are allowed."
        );
        assert!(validate_upload("noext", 10, &cfg).is_err());
    }

    #[test]
    fn test_mime_and_file_type() {
        assert_eq!(mime_for("a.jpeg"), Some("image/jpeg"));
        assert_eq!(mime_for("a.TXT"), Some("text/plain"));
        assert_eq!(mime_for("a.bin"), None);
        assert_eq!(file_type_for(Some("image/png")), TYPE_IMAGE);
        assert_eq!(file_type_for(Some("text/plain")), TYPE_TEXT);
        assert_eq!(file_type_for(Some("application/pdf")), TYPE_DOCUMENT);
        assert_eq!(file_type_for(None), TYPE_OTHER);
    }

    #[test]
    fn test_checksum_is_md5_hex() {
        assert_eq!(checksum(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_large_image_is_resized_and_thumbnailed() {
        let data = png_bytes(640, 480, false);
        let result = process_image(&data, ImageLimits::from(&limits())).unwrap();
        assert_eq!((result.original_width, result.original_height), (640, 480));
        assert_eq!((result.width, result.height), (320, 240));
        assert_eq!(result.format, "PNG");
        assert!(result.resized.is_some());
        assert!(!result.has_transparency);
        assert_eq!(result.thumbnail_ext, "jpg");

        let thumb = image::load_from_memory(&result.thumbnail).unwrap();
        assert!(thumb.width() <= 120 && thumb.height() <= 120);
    }

    #[test]
    fn test_small_transparent_image_is_kept() {
        let data = png_bytes(50, 40, true);
        let result = process_image(&data, ImageLimits::from(&limits())).unwrap();
        assert!(result.resized.is_none());
        assert_eq!((result.width, result.height), (50, 40));
        assert!(result.has_transparency);
        assert_eq!(result.color_mode, "RGBA");
        assert_eq!(result.thumbnail_ext, "png");
    }

    #[test]
    fn test_invalid_image_errors() {
        assert!(process_image(b"definitely not an image", ImageLimits::from(&limits())).is_err());
    }

    #[test]
    fn test_aspect_ratio_and_orientation() {
        assert_eq!(aspect_ratio(320, 240), 1.33);
        assert_eq!(aspect_ratio(10, 0), 0.0);
        assert_eq!(orientation(320, 240), "landscape");
        assert_eq!(orientation(240, 320), "portrait");
        assert_eq!(orientation(10, 10), "square");
    }

    #[test]
    fn test_analyze_text_counts_and_preview() {
        let analysis = analyze_text(b"hello world\nsecond line");
        assert_eq!(analysis.line_count, 2);
        assert_eq!(analysis.word_count, 4);
        assert_eq!(analysis.character_count, 23);
        assert!(analysis.is_valid_utf8);
        assert!(!analysis.has_binary_content);
        assert_eq!(analysis.encoding, "utf-8");

        let long = "x".repeat(1500);
        let analysis = analyze_text(long.as_bytes());
        assert_eq!(analysis.preview.chars().count(), PREVIEW_CHARS + 3);
        assert!(analysis.preview.ends_with("..."));
    }

    #[test]
    fn test_analyze_text_flags_invalid_utf8() {
        let analysis = analyze_text(&[0x66, 0x6f, 0xff, 0xfe, 0x6f]);
        assert!(!analysis.is_valid_utf8);
        assert!(analysis.has_binary_content);
    }
}
