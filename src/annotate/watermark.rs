// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/annotate/watermark.rs - 角标水印
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{RgbImage, RgbaImage};
use thiserror::Error;
use tracing::{debug, warn};

use super::draw::paste_alpha;

/// 角标缩放的基准分母。
const BASE_RATIO: f32 = 3.0;
/// 角标距左上角的偏移。
const CORNER_OFFSET: i64 = 10;

#[derive(Error, Debug)]
pub enum WatermarkError {
  #[error("角标图加载失败: {0}")]
  LoadError(#[from] image::ImageError),
}

/// 左上角盖印的角标，每张出图盖一次。
pub struct Watermark {
  mask: RgbaImage,
}

impl Watermark {
  pub fn new(mask: RgbaImage) -> Self {
    Watermark { mask }
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WatermarkError> {
    let mask = image::open(path.as_ref())?.to_rgba8();
    Ok(Watermark { mask })
  }

  /// 角标的目标尺寸。
  ///
  /// 先比较图像与角标的高宽比得出缩放比，再按四条独立规则
  /// 调整基准分母（全部对照原始尺寸判断，顺序固定）：
  /// 角标高超过图高的四分之一加密 1.5 倍，宽超过三分之一加密 2 倍，
  /// 反向富余时按同样倍数放宽。
  fn scaled_size(&self, cols: u32, rows: u32) -> (u32, u32) {
    let (mask_w, mask_h) = self.mask.dimensions();
    let image_ratio = rows as f32 / cols as f32;
    let mask_ratio = mask_h as f32 / mask_w as f32;

    let scale_ratio = if image_ratio > mask_ratio {
      image_ratio / mask_ratio
    } else if mask_ratio > image_ratio {
      mask_ratio / image_ratio
    } else {
      1.0
    };

    let mut custom_ratio = BASE_RATIO;
    if mask_h as u64 * 4 > rows as u64 {
      custom_ratio *= 1.5;
    }
    if mask_w as u64 * 3 > cols as u64 {
      custom_ratio *= 2.0;
    }
    if rows as u64 > mask_h as u64 * 4 {
      custom_ratio /= 1.5;
    }
    if cols as u64 > mask_w as u64 * 3 {
      custom_ratio /= 2.0;
    }

    let target_w = (mask_w as f32 * scale_ratio / custom_ratio) as u32;
    let target_h = (mask_h as f32 * scale_ratio / custom_ratio) as u32;
    if target_w == 0 || target_h == 0 {
      warn!(
        "角标缩放到 {}x{}，已钳到 1 像素",
        target_w, target_h
      );
    }
    (target_w.max(1), target_h.max(1))
  }

  pub fn apply(&self, image: &mut RgbImage) {
    let (target_w, target_h) = self.scaled_size(image.width(), image.height());
    let scaled = imageops::resize(&self.mask, target_w, target_h, FilterType::Lanczos3);
    paste_alpha(image, &scaled, CORNER_OFFSET, CORNER_OFFSET);
    debug!("角标已盖印: {}x{}", target_w, target_h);
  }
}
