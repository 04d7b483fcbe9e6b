//! Arithmetic CAPTCHA
//!
//! Tokens live in `captcha_tokens`; each is consumed at most once. The image
//! is drawn with a built-in 5x7 bitmap font so rendering needs no font files.

use std::io::Cursor;
use std::sync::Arc;

use chrono::{Duration, Utc};
use image::{ImageOutputFormat, Rgb, RgbImage};
use rand::RngExt;
use sea_orm::Set;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::get_config;
use crate::errors::{CommentaryError, Result};
use crate::storage::SeaOrmStorage;
use crate::utils::generate_random_code;

use migration::entities::captcha_token;

pub const TOKEN_LENGTH: usize = 32;
const IMAGE_WIDTH: u32 = 120;
const IMAGE_HEIGHT: u32 = 50;
const GLYPH_SCALE: u32 = 2;
const NOISE_LINES: usize = 5;
const NOISE_DOTS: usize = 20;

/// 验证码创建后超过该时长即被清理
pub const CLEANUP_AGE_HOURS: i64 = 1;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CaptchaChallenge {
    pub token: String,
    pub challenge: String,
    pub image_url: String,
}

/// 生成一道算术题，返回 (题面, 答案)
pub fn math_challenge<R: RngExt + ?Sized>(rng: &mut R) -> (String, String) {
    let mut a: i32 = rng.random_range(1..=10);
    let mut b: i32 = rng.random_range(1..=10);
    if rng.random_bool(0.5) {
        (format!("{} + {} = ?", a, b), (a + b).to_string())
    } else {
        if a < b {
            std::mem::swap(&mut a, &mut b);
        }
        (format!("{} - {} = ?", a, b), (a - b).to_string())
    }
}

pub struct CaptchaService {
    storage: Arc<SeaOrmStorage>,
}

impl CaptchaService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn generate(&self, ip: Option<&str>) -> Result<CaptchaChallenge> {
        let config = get_config();
        let (challenge, solution) = math_challenge(&mut rand::rng());
        let token = generate_random_code(TOKEN_LENGTH);
        let now = Utc::now();

        let model = captcha_token::ActiveModel {
            token: Set(token.clone()),
            challenge: Set(challenge.clone()),
            solution: Set(solution),
            ip_address: Set(ip.map(str::to_string)),
            created_at: Set(now),
            expires_at: Set(now + Duration::minutes(config.comments.captcha_ttl_minutes)),
            used_at: Set(None),
            ..Default::default()
        };
        self.storage.insert_captcha(model).await?;
        debug!("CAPTCHA issued for {:?}", ip);

        Ok(CaptchaChallenge {
            image_url: format!(
                "{}/captcha/image/{}/",
                config.server.api_prefix.trim_end_matches('/'),
                token
            ),
            token,
            challenge,
        })
    }

    /// PNG bytes of the challenge; 404 for unknown tokens, 410 once expired.
    pub async fn render_image(&self, token: &str) -> Result<Vec<u8>> {
        let captcha = self
            .storage
            .find_captcha(token)
            .await?
            .ok_or_else(|| CommentaryError::not_found("Invalid CAPTCHA token"))?;
        if captcha.expires_at <= Utc::now() {
            return Err(CommentaryError::gone("CAPTCHA has expired"));
        }

        let challenge = captcha.challenge;
        tokio::task::spawn_blocking(move || render_png(&challenge)).await?
    }

    /// Check the answer and consume the token.
    pub async fn verify_and_consume(&self, token: &str, solution: &str) -> Result<()> {
        let captcha = self
            .storage
            .find_captcha(token)
            .await?
            .ok_or_else(|| CommentaryError::validation("Invalid CAPTCHA token"))?;

        let now = Utc::now();
        if captcha.expires_at <= now {
            return Err(CommentaryError::validation("CAPTCHA has expired"));
        }
        if captcha.used_at.is_some() {
            return Err(CommentaryError::validation("CAPTCHA has already been used"));
        }
        if captcha.solution != solution.trim() {
            return Err(CommentaryError::validation("Incorrect CAPTCHA solution"));
        }
        // 并发提交时只有一个请求能消费成功
        if !self.storage.mark_captcha_used(captcha.id, now).await? {
            return Err(CommentaryError::validation("CAPTCHA has already been used"));
        }
        Ok(())
    }

    pub async fn cleanup_expired(&self) -> Result<u64> {
        let cutoff = Utc::now() - Duration::hours(CLEANUP_AGE_HOURS);
        let deleted = self.storage.delete_captchas_created_before(cutoff).await?;
        if deleted > 0 {
            info!("Removed {} stale CAPTCHA tokens", deleted);
        }
        Ok(deleted)
    }
}

// ===== 渲染 =====

fn glyph(ch: char) -> [u8; 7] {
    match ch {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '+' => [0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '=' => [0x00, 0x00, 0x1F, 0x00, 0x1F, 0x00, 0x00],
        '?' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        _ => [0; 7],
    }
}

fn advance(ch: char) -> u32 {
    if ch == ' ' { 4 } else { 5 * GLYPH_SCALE + 1 }
}

fn put(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_line(img: &mut RgbImage, (x0, y0): (i32, i32), (x1, y1): (i32, i32), color: Rgb<u8>) {
    let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
    let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
    let (mut x, mut y, mut err) = (x0, y0, dx + dy);
    loop {
        put(img, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_glyph(img: &mut RgbImage, ch: char, x: i32, y: i32, color: Rgb<u8>) {
    let scale = GLYPH_SCALE as i32;
    for (row, bits) in glyph(ch).iter().enumerate() {
        for col in 0..5 {
            if bits & (0x10 >> col) == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    put(img, x + col * scale + dx, y + row as i32 * scale + dy, color);
                }
            }
        }
    }
}

/// 120x50 PNG：噪声线、逐字符抖动的文字、噪点
pub fn render_png(text: &str) -> Result<Vec<u8>> {
    let mut rng = rand::rng();
    let mut img = RgbImage::from_pixel(IMAGE_WIDTH, IMAGE_HEIGHT, Rgb([255, 255, 255]));
    let (w, h) = (IMAGE_WIDTH as i32, IMAGE_HEIGHT as i32);

    for _ in 0..NOISE_LINES {
        let from = (rng.random_range(0..w), rng.random_range(0..h));
        let to = (rng.random_range(0..w), rng.random_range(0..h));
        draw_line(&mut img, from, to, Rgb([0xcc, 0xcc, 0xcc]));
    }

    let text_width: u32 = text.chars().map(advance).sum();
    let text_height = (7 * GLYPH_SCALE) as i32;
    let mut x = (w - text_width as i32).max(0) / 2;
    let base_y = (h - text_height) / 2;
    for ch in text.chars() {
        let shade = rng.random_range(0..=30u8);
        let jitter = rng.random_range(-5..=5);
        draw_glyph(&mut img, ch, x, base_y + jitter, Rgb([shade, shade, shade]));
        x += advance(ch) as i32;
    }

    for _ in 0..NOISE_DOTS {
        put(
            &mut img,
            rng.random_range(0..w),
            rng.random_range(0..h),
            Rgb([0x99, 0x99, 0x99]),
        );
    }

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_challenge_solution_matches() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let (challenge, solution) = math_challenge(&mut rng);
            let parts: Vec<&str> = challenge.split_whitespace().collect();
            assert_eq!(parts.len(), 5);
            assert_eq!(parts[3], "=");
            assert_eq!(parts[4], "?");
            let a: i32 = parts[0].parse().unwrap();
            let b: i32 = parts[2].parse().unwrap();
            assert!((1..=10).contains(&a) && (1..=10).contains(&b));
            let expected = match parts[1] {
                "+" => a + b,
                "-" => a - b,
                op => panic!("unexpected operator {}", op),
            };
            assert!(expected >= 0);
            assert_eq!(solution, expected.to_string());
        }
    }

    #[test]
    fn test_render_png_dimensions() {
        let png = render_png("10 + 10 = ?").unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), IMAGE_WIDTH);
        assert_eq!(decoded.height(), IMAGE_HEIGHT);
    }

    #[test]
    fn test_longest_challenge_fits() {
        let width: u32 = "10 - 10 = ?".chars().map(advance).sum();
        assert!(width <= IMAGE_WIDTH);
    }
}
