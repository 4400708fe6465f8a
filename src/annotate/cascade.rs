// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/annotate/cascade.rs - 级联人脸检测
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::Mutex;

use image::GrayImage;
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use thiserror::Error;
use tracing::{error, info};

use super::mask::{FaceFinder, FaceRegion};

/// 级联检测的逐级放大步长。
const SCALE_FACTOR: f64 = 1.15;
/// 候选框最少的邻居数。
const MIN_NEIGHBORS: i32 = 3;

#[derive(Error, Debug)]
pub enum CascadeError {
  #[error("级联模型为空: {0}")]
  EmptyModel(String),
  #[error("OpenCV error: {0}")]
  OpenCvError(#[from] opencv::Error),
}

/// 基于 Haar 级联模型的人脸检测。
///
/// `detect_multi_scale` 需要可变借用，包一层锁来满足 `&self` 的调用面。
pub struct CascadeFaceFinder {
  classifier: Mutex<CascadeClassifier>,
}

impl CascadeFaceFinder {
  pub fn from_xml(path: &str) -> Result<Self, CascadeError> {
    let classifier = CascadeClassifier::new(path)?;
    if classifier.empty()? {
      return Err(CascadeError::EmptyModel(path.to_string()));
    }
    info!("级联模型已加载: {}", path);
    Ok(CascadeFaceFinder {
      classifier: Mutex::new(classifier),
    })
  }
}

impl FaceFinder for CascadeFaceFinder {
  fn find(&self, gray: &GrayImage) -> Vec<FaceRegion> {
    let (cols, rows) = gray.dimensions();
    if cols == 0 || rows == 0 {
      return Vec::new();
    }

    let mat = match Mat::new_rows_cols_with_data(rows as i32, cols as i32, gray.as_raw()) {
      Ok(mat) => mat,
      Err(err) => {
        error!("灰度图转换失败: {}", err);
        return Vec::new();
      }
    };

    let Ok(mut classifier) = self.classifier.lock() else {
      error!("级联检测器锁失效");
      return Vec::new();
    };

    let mut faces = Vector::<Rect>::new();
    if let Err(err) = classifier.detect_multi_scale(
      &mat,
      &mut faces,
      SCALE_FACTOR,
      MIN_NEIGHBORS,
      0,
      Size::default(),
      Size::default(),
    ) {
      error!("级联检测失败: {}", err);
      return Vec::new();
    }

    faces
      .iter()
      .map(|rect| FaceRegion {
        x: rect.x.max(0) as u32,
        y: rect.y.max(0) as u32,
        width: rect.width.max(0) as u32,
        height: rect.height.max(0) as u32,
      })
      .collect()
  }
}
