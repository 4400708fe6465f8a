// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/annotate/draw.rs - 画框与文字
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detect::BoundingBox;

/// 检测框颜色
const BOX_COLOR: Rgb<u8> = Rgb([125, 255, 51]);
/// 标签文字颜色
const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
/// 标签相对框顶的纵向偏移
const LABEL_OFFSET_Y: i32 = 20;

/// 画框工具
pub struct BoxDraw {
  /// 字体
  font: FontArc,
  /// 字体大小
  font_scale: PxScale,
}

impl Default for BoxDraw {
  fn default() -> Self {
    Self::new()
  }
}

impl BoxDraw {
  pub fn new() -> Self {
    // 使用内置的默认字体数据
    let font_data = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data).expect("无法加载字体");

    Self {
      font,
      font_scale: PxScale::from(16.0),
    }
  }

  /// 把检测框裁进图像内，返回整数角点，退化框返回 None。
  fn clamp(bbox: &BoundingBox, image: &RgbImage) -> Option<(i32, i32, i32, i32)> {
    let x = bbox.x.max(0.0) as i32;
    let y = bbox.y.max(0.0) as i32;
    let right = bbox.right.min(image.width() as f32 - 1.0) as i32;
    let bottom = bbox.bottom.min(image.height() as f32 - 1.0) as i32;
    if right <= x || bottom <= y {
      return None;
    }
    Some((x, y, right, bottom))
  }

  /// 两像素宽的空心框，角点含在框内。
  pub fn outline(&self, image: &mut RgbImage, bbox: &BoundingBox) {
    let Some((x, y, right, bottom)) = Self::clamp(bbox, image) else {
      return;
    };
    let width = (right - x + 1) as u32;
    let height = (bottom - y + 1) as u32;

    let rect = Rect::at(x, y).of_size(width, height);
    draw_hollow_rect_mut(image, rect, BOX_COLOR);

    // 内圈加一道提高可见度
    if width > 2 && height > 2 {
      let inner = Rect::at(x + 1, y + 1).of_size(width - 2, height - 2);
      draw_hollow_rect_mut(image, inner, BOX_COLOR);
    }
  }

  /// 在框顶内侧写标签文字。
  pub fn label(&self, image: &mut RgbImage, bbox: &BoundingBox, text: &str) {
    let Some((x, y, _, _)) = Self::clamp(bbox, image) else {
      return;
    };
    draw_text_mut(
      image,
      LABEL_COLOR,
      x,
      y + LABEL_OFFSET_Y,
      self.font_scale,
      &self.font,
      text,
    );
  }
}

/// 按 alpha 通道把一张 RGBA 贴图混合进 RGB 图像，越界部分丢弃。
pub fn paste_alpha(dst: &mut RgbImage, src: &RgbaImage, left: i64, top: i64) {
  let (width, height) = dst.dimensions();
  for (sx, sy, pixel) in src.enumerate_pixels() {
    let dx = left + sx as i64;
    let dy = top + sy as i64;
    if dx < 0 || dy < 0 || dx >= width as i64 || dy >= height as i64 {
      continue;
    }
    let alpha = pixel[3] as u32;
    if alpha == 0 {
      continue;
    }
    let under = dst.get_pixel_mut(dx as u32, dy as u32);
    for c in 0..3 {
      let over = pixel[c] as u32;
      let base = under[c] as u32;
      under[c] = ((over * alpha + base * (255 - alpha)) / 255) as u8;
    }
  }
}
