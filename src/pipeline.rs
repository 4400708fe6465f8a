// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/pipeline.rs - 任务流水线
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

use thiserror::Error;
use tracing::{error, info};

use crate::annotate::{Annotator, Watermark};
use crate::caption::build_caption;
use crate::config::PipelineConfig;
use crate::deliver::{Delivery, DeliveryReport};
use crate::detect::{DetectionBackend, Interpreter};
use crate::job::MediaJob;
use crate::labels::LabelMap;
use crate::source::MediaSource;

/// 单条媒体处理中任一阶段的错误。
#[derive(Error, Debug)]
pub enum MediaError {
  #[error("媒体获取失败: {0}")]
  SourceError(#[from] crate::source::SourceError),
  #[error("检测后端故障: {0}")]
  BackendError(#[from] crate::detect::BackendError),
  #[error("检测解析失败: {0}")]
  DetectError(#[from] crate::detect::DetectError),
  #[error("交付失败: {0}")]
  DeliverError(#[from] crate::deliver::DeliverError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("任务在媒体 {media_url} 处中止: {source}")]
  Aborted {
    media_url: String,
    source: MediaError,
  },
}

/// 一条媒体地址的处理结果。
#[derive(Debug)]
pub struct MediaOutcome {
  pub media_url: String,
  pub result: Result<DeliveryReport, MediaError>,
}

/// 整个任务的逐条结果，顺序与任务里的媒体列表一致。
#[derive(Debug, Default)]
pub struct JobReport {
  pub outcomes: Vec<MediaOutcome>,
}

impl JobReport {
  pub fn delivered(&self) -> usize {
    self.outcomes.iter().filter(|o| o.result.is_ok()).count()
  }

  pub fn failed(&self) -> usize {
    self.outcomes.len() - self.delivered()
  }
}

/// 事件媒体流水线：取图、检测、标注、配文、交付。
pub struct Pipeline {
  source: Box<dyn MediaSource>,
  backend: Box<dyn DetectionBackend>,
  labels: LabelMap,
  interpreter: Interpreter,
  annotator: Annotator,
  watermark: Watermark,
  delivery: Delivery,
  fail_fast: bool,
}

impl Pipeline {
  pub fn new(
    config: &PipelineConfig,
    source: Box<dyn MediaSource>,
    backend: Box<dyn DetectionBackend>,
    labels: LabelMap,
    annotator: Annotator,
    watermark: Watermark,
    delivery: Delivery,
  ) -> Self {
    Pipeline {
      source,
      backend,
      labels,
      interpreter: Interpreter::new(config.sensitivity),
      annotator,
      watermark,
      delivery,
      fail_fast: config.fail_fast,
    }
  }

  /// 跑完一个任务。
  ///
  /// 默认单条媒体失败不影响其余条目，逐条结果进报告；
  /// `fail_fast` 打开时第一条失败即中止整个任务。
  pub fn run(&self, mut job: MediaJob) -> Result<JobReport, PipelineError> {
    job.normalize();
    info!(
      "任务开始: 事件 {} ({}), {} 条媒体",
      job.event_id,
      job.event_type,
      job.media.len()
    );

    let mut outcomes = Vec::with_capacity(job.media.len());
    for media_url in &job.media {
      info!("处理媒体: {}", media_url);
      let now = std::time::Instant::now();
      match self.process_media(&job, media_url) {
        Ok(report) => {
          info!("媒体处理完成，耗时: {:.2?}", now.elapsed());
          outcomes.push(MediaOutcome {
            media_url: media_url.clone(),
            result: Ok(report),
          });
        }
        Err(err) => {
          error!("媒体处理失败: {}: {}", media_url, err);
          if self.fail_fast {
            return Err(PipelineError::Aborted {
              media_url: media_url.clone(),
              source: err,
            });
          }
          outcomes.push(MediaOutcome {
            media_url: media_url.clone(),
            result: Err(err),
          });
        }
      }
    }

    info!("任务完成: {} 条媒体", outcomes.len());
    Ok(JobReport { outcomes })
  }

  fn process_media(&self, job: &MediaJob, media_url: &str) -> Result<DeliveryReport, MediaError> {
    let mut image = self.source.fetch(media_url)?;

    let raw = self.backend.detect(&image)?;
    info!("检测完成，共 {} 个槽位", raw.num_detections);

    let records = self
      .interpreter
      .interpret(&raw, &self.labels, image.width(), image.height())?;
    let kept = self.interpreter.annotatable(&records);
    info!(
      "有效检测 {} 条 (阈值 {})",
      kept.len(),
      self.interpreter.sensitivity()
    );

    self.annotator.annotate(&mut image, &kept);
    let caption = build_caption(job, &kept);
    info!("状态文本:\n{}", caption);
    self.watermark.apply(&mut image);

    let report = self.delivery.deliver(&image, &caption, media_url)?;
    Ok(report)
  }
}
