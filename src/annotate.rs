// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/annotate.rs - 图像标注
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

use image::RgbImage;
use tracing::debug;

use crate::detect::Detection;

#[cfg(feature = "opencv_cascade")]
pub mod cascade;
pub mod draw;
pub mod mask;
pub mod watermark;

pub use draw::BoxDraw;
pub use mask::{FaceFinder, FaceMaskOverlay, FaceRegion, NoFaceFinder};
pub use watermark::Watermark;

/// 针对某一类目标的区域处理，在画框之前执行。
pub trait RegionOverlay {
  fn apply(&self, image: &mut RgbImage, detection: &Detection);
}

/// 标注器：对每条检测记录依次做区域处理、画框、写标签。
pub struct Annotator {
  draw: BoxDraw,
  overlays: Vec<(String, Box<dyn RegionOverlay>)>,
}

impl Default for Annotator {
  fn default() -> Self {
    Self::new()
  }
}

impl Annotator {
  pub fn new() -> Self {
    Annotator {
      draw: BoxDraw::new(),
      overlays: Vec::new(),
    }
  }

  /// 给某个标签挂一个区域处理器。
  pub fn with_overlay(mut self, label: &str, overlay: Box<dyn RegionOverlay>) -> Self {
    self.overlays.push((label.to_string(), overlay));
    self
  }

  fn overlay_for(&self, label: &str) -> Option<&dyn RegionOverlay> {
    self
      .overlays
      .iter()
      .find(|(name, _)| name == label)
      .map(|(_, overlay)| overlay.as_ref())
  }

  pub fn annotate(&self, image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
      if let Some(overlay) = self.overlay_for(&detection.label) {
        overlay.apply(image, detection);
      }
      self.draw.outline(image, &detection.bbox);
      self.draw.label(image, &detection.bbox, &detection.label);
    }
    debug!("标注完成: {} 条记录", detections.len());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detect::BoundingBox;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  struct CountingOverlay {
    hits: Arc<AtomicUsize>,
  }

  impl RegionOverlay for CountingOverlay {
    fn apply(&self, _image: &mut RgbImage, _detection: &Detection) {
      self.hits.fetch_add(1, Ordering::SeqCst);
    }
  }

  fn detection(label: &str) -> Detection {
    Detection {
      class_id: 1,
      label: label.to_string(),
      score: 0.9,
      bbox: BoundingBox {
        x: 10.0,
        y: 10.0,
        right: 50.0,
        bottom: 50.0,
      },
    }
  }

  #[test]
  fn overlay_fires_only_for_its_label() {
    let hits = Arc::new(AtomicUsize::new(0));
    let annotator = Annotator::new().with_overlay(
      "person",
      Box::new(CountingOverlay { hits: hits.clone() }),
    );

    let mut image = RgbImage::new(100, 100);
    annotator.annotate(
      &mut image,
      &[detection("person"), detection("car"), detection("person")],
    );
    assert_eq!(hits.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn outline_is_painted_on_the_image() {
    let annotator = Annotator::new();
    let mut image = RgbImage::new(100, 100);
    annotator.annotate(&mut image, &[detection("car")]);
    assert_eq!(image.get_pixel(10, 10), &image::Rgb([125, 255, 51]));
    assert_eq!(image.get_pixel(50, 50), &image::Rgb([125, 255, 51]));
    // 框外不受影响
    assert_eq!(image.get_pixel(60, 60), &image::Rgb([0, 0, 0]));
  }
}
