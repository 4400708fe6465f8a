// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/annotate/mask.rs - 面部遮罩
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage, RgbaImage};
use tracing::debug;

use super::{RegionOverlay, draw::paste_alpha};
use crate::detect::Detection;

/// 裁剪区域内的一张脸，坐标相对裁剪区域左上角。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

/// 面部检测能力，输入为灰度图。
pub trait FaceFinder {
  fn find(&self, gray: &GrayImage) -> Vec<FaceRegion>;
}

/// 永远找不到脸的占位实现。
#[derive(Debug, Default)]
pub struct NoFaceFinder;

impl FaceFinder for NoFaceFinder {
  fn find(&self, _gray: &GrayImage) -> Vec<FaceRegion> {
    Vec::new()
  }
}

/// 把遮罩贴图缩放到每张脸的大小后按 alpha 贴上去。
pub struct FaceMaskOverlay {
  mask: RgbaImage,
  finder: Box<dyn FaceFinder>,
}

impl FaceMaskOverlay {
  pub fn new(mask: RgbaImage, finder: Box<dyn FaceFinder>) -> Self {
    FaceMaskOverlay { mask, finder }
  }
}

impl RegionOverlay for FaceMaskOverlay {
  fn apply(&self, image: &mut RgbImage, detection: &Detection) {
    let (cols, rows) = image.dimensions();
    let x1 = detection.bbox.x.max(0.0) as u32;
    let y1 = detection.bbox.y.max(0.0) as u32;
    let x2 = (detection.bbox.right.max(0.0) as u32).min(cols);
    let y2 = (detection.bbox.bottom.max(0.0) as u32).min(rows);
    if x2 <= x1 || y2 <= y1 {
      return;
    }

    let mut crop = imageops::crop_imm(&*image, x1, y1, x2 - x1, y2 - y1).to_image();
    let gray = imageops::grayscale(&crop);
    let faces = self.finder.find(&gray);
    if faces.is_empty() {
      return;
    }

    for face in &faces {
      if face.width == 0 || face.height == 0 {
        continue;
      }
      let scaled = imageops::resize(&self.mask, face.width, face.height, FilterType::Lanczos3);
      paste_alpha(&mut crop, &scaled, face.x as i64, face.y as i64);
      debug!(
        "面部遮罩: 区域 ({}, {}) {}x{}",
        face.x, face.y, face.width, face.height
      );
    }
    imageops::replace(image, &crop, x1 as i64, y1 as i64);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detect::BoundingBox;
  use image::{Rgb, Rgba};

  /// 固定回放给定区域的测试用检测器。
  struct ScriptedFinder {
    faces: Vec<FaceRegion>,
  }

  impl FaceFinder for ScriptedFinder {
    fn find(&self, _gray: &GrayImage) -> Vec<FaceRegion> {
      self.faces.clone()
    }
  }

  fn person_at(x: f32, y: f32, right: f32, bottom: f32) -> Detection {
    Detection {
      class_id: 1,
      label: "person".to_string(),
      score: 0.9,
      bbox: BoundingBox { x, y, right, bottom },
    }
  }

  #[test]
  fn mask_lands_inside_the_detection_box() {
    let mask = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
    let overlay = FaceMaskOverlay::new(
      mask,
      Box::new(ScriptedFinder {
        faces: vec![FaceRegion {
          x: 5,
          y: 5,
          width: 10,
          height: 10,
        }],
      }),
    );

    let mut image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
    overlay.apply(&mut image, &person_at(10.0, 10.0, 60.0, 60.0));

    // 脸在裁剪区域 (5,5)，落到整图就是 (15,15)
    assert_eq!(image.get_pixel(16, 16), &Rgb([255, 0, 0]));
    assert_eq!(image.get_pixel(24, 24), &Rgb([255, 0, 0]));
    // 遮罩之外保持原样
    assert_eq!(image.get_pixel(30, 30), &Rgb([0, 0, 0]));
    assert_eq!(image.get_pixel(12, 12), &Rgb([0, 0, 0]));
  }

  #[test]
  fn no_faces_leaves_the_image_untouched() {
    let mask = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
    let overlay = FaceMaskOverlay::new(mask, Box::new(NoFaceFinder));

    let mut image = RgbImage::from_pixel(50, 50, Rgb([9, 9, 9]));
    let before = image.clone();
    overlay.apply(&mut image, &person_at(5.0, 5.0, 45.0, 45.0));
    assert_eq!(image, before);
  }

  #[test]
  fn out_of_frame_boxes_are_ignored() {
    let mask = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
    let overlay = FaceMaskOverlay::new(
      mask,
      Box::new(ScriptedFinder {
        faces: vec![FaceRegion {
          x: 0,
          y: 0,
          width: 2,
          height: 2,
        }],
      }),
    );

    let mut image = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
    let before = image.clone();
    overlay.apply(&mut image, &person_at(30.0, 30.0, 40.0, 40.0));
    assert_eq!(image, before);
  }

  #[test]
  fn faces_partly_outside_the_crop_are_clipped() {
    let mask = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]));
    let overlay = FaceMaskOverlay::new(
      mask,
      Box::new(ScriptedFinder {
        faces: vec![FaceRegion {
          x: 16,
          y: 16,
          width: 8,
          height: 8,
        }],
      }),
    );

    let mut image = RgbImage::from_pixel(40, 40, Rgb([0, 0, 0]));
    // 裁剪区域 20x20，脸一半在区域外
    overlay.apply(&mut image, &person_at(0.0, 0.0, 20.0, 20.0));
    assert_eq!(image.get_pixel(17, 17), &Rgb([0, 255, 0]));
    // 裁剪边界外的部分被丢弃
    assert_eq!(image.get_pixel(21, 21), &Rgb([0, 0, 0]));
  }
}
