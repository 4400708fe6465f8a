// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/detect.rs - 检测结果解析
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::labels::LabelMap;

/// 检测后端吐出的原始数组，坐标为归一化的 `[y1, x1, y2, x2]`。
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RawDetections {
  pub num_detections: usize,
  pub scores: Vec<f32>,
  pub boxes: Vec<[f32; 4]>,
  pub classes: Vec<u32>,
}

/// 像素坐标下的检测框，`right`/`bottom` 为含端点的右下角。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  pub x: f32,
  pub y: f32,
  pub right: f32,
  pub bottom: f32,
}

impl BoundingBox {
  /// 归一化坐标换算到像素坐标。
  ///
  /// 原始数组的前两位是 `[y, x]`、后两位是 `[y2, x2]`，
  /// 换算时行列互换：横坐标乘列数，纵坐标乘行数。
  pub fn from_normalized(raw: &[f32; 4], cols: u32, rows: u32) -> Self {
    BoundingBox {
      x: raw[1] * cols as f32,
      y: raw[0] * rows as f32,
      right: raw[3] * cols as f32,
      bottom: raw[2] * rows as f32,
    }
  }

  pub fn width(&self) -> f32 {
    self.right - self.x
  }

  pub fn height(&self) -> f32 {
    self.bottom - self.y
  }
}

/// 一条解析后的检测记录。
#[derive(Debug, Clone)]
pub struct Detection {
  pub class_id: u32,
  pub label: String,
  pub score: f32,
  pub bbox: BoundingBox,
}

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("检测数组长度不足: 需要 {required} 个槽位，实际 scores={scores} boxes={boxes} classes={classes}")]
  SlotOverrun {
    required: usize,
    scores: usize,
    boxes: usize,
    classes: usize,
  },
}

/// 原始数组到检测记录的解析器。
pub struct Interpreter {
  sensitivity: f32,
}

impl Interpreter {
  pub fn new(sensitivity: f32) -> Self {
    Interpreter { sensitivity }
  }

  pub fn sensitivity(&self) -> f32 {
    self.sensitivity
  }

  /// 逐槽位解析原始数组，每个槽位都产出一条记录，不做阈值过滤。
  ///
  /// 任一数组长度小于 `num_detections` 时整体报错，不做部分解析。
  pub fn interpret(
    &self,
    raw: &RawDetections,
    labels: &LabelMap,
    cols: u32,
    rows: u32,
  ) -> Result<Vec<Detection>, DetectError> {
    let required = raw.num_detections;
    if raw.scores.len() < required || raw.boxes.len() < required || raw.classes.len() < required {
      return Err(DetectError::SlotOverrun {
        required,
        scores: raw.scores.len(),
        boxes: raw.boxes.len(),
        classes: raw.classes.len(),
      });
    }

    let mut records = Vec::with_capacity(required);
    for slot in 0..required {
      let class_id = raw.classes[slot];
      let score = raw.scores[slot];
      let entry = labels.resolve(class_id);
      let bbox = BoundingBox::from_normalized(&raw.boxes[slot], cols, rows);

      if score > self.sensitivity {
        info!(
          "目标类别: {} ({}), 置信度: {:.3}",
          class_id, entry.display_name, score
        );
      } else {
        debug!(
          "低置信度槽位 {}: 类别 {} ({}), 置信度 {:.3}",
          slot, class_id, entry.display_name, score
        );
      }

      records.push(Detection {
        class_id,
        label: entry.display_name,
        score,
        bbox,
      });
    }
    Ok(records)
  }

  /// 过滤出参与标注的记录，置信度必须严格大于阈值。
  pub fn annotatable(&self, records: &[Detection]) -> Vec<Detection> {
    records
      .iter()
      .filter(|det| det.score > self.sensitivity)
      .cloned()
      .collect()
  }
}

/// 检测后端：对一张图像给出原始检测数组。
pub trait DetectionBackend {
  fn detect(&self, image: &RgbImage) -> Result<RawDetections, BackendError>;
}

#[derive(Error, Debug)]
pub enum BackendError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("检测记录解析失败: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("检测后端故障: {0}")]
  Failed(String),
}

const RECORDED_BACKEND_SCHEME: &str = "record";

/// 回放型后端：从 JSON 文件读入录好的检测数组，对每张图原样回放。
#[derive(Debug)]
pub struct RecordedBackend {
  detections: RawDetections,
}

impl RecordedBackend {
  pub fn new(detections: RawDetections) -> Self {
    RecordedBackend { detections }
  }
}

impl crate::FromUrl for RecordedBackend {
  type Error = BackendError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != RECORDED_BACKEND_SCHEME {
      tracing::error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        RECORDED_BACKEND_SCHEME,
        url.scheme()
      );
      return Err(BackendError::SchemaMismatch);
    }

    let text = std::fs::read_to_string(url.path())?;
    let detections: RawDetections = serde_json::from_str(&text)?;
    info!(
      "检测记录已加载: {} 个槽位, 来自 {}",
      detections.num_detections,
      url.path()
    );
    Ok(RecordedBackend { detections })
  }
}

impl crate::FromUrlWithScheme for RecordedBackend {
  const SCHEME: &'static str = RECORDED_BACKEND_SCHEME;
}

impl DetectionBackend for RecordedBackend {
  fn detect(&self, _image: &RgbImage) -> Result<RawDetections, BackendError> {
    Ok(self.detections.clone())
  }
}
