// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/main.rs - 主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use url::Url;

use fengbao::{
  FromUrl,
  annotate::{Annotator, FaceMaskOverlay, Watermark},
  channel::{FolderChannel, FolderMirror, MirrorChannel},
  config::PipelineConfig,
  deliver::Delivery,
  detect::RecordedBackend,
  job::MediaJob,
  labels::LabelMap,
  pipeline::Pipeline,
  source::ImageFileSource,
};

/// Fengbao 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 任务描述文件 (JSON)
  #[arg(long, value_name = "JOB")]
  pub job: PathBuf,
  /// 标签表文件 (JSON)
  #[arg(long, value_name = "LABELS")]
  pub labels: PathBuf,
  /// 检测后端
  #[arg(long, value_name = "BACKEND")]
  pub backend: Url,
  /// 主发布通道
  #[arg(long, value_name = "POST")]
  pub post: Url,
  /// 镜像通道
  #[arg(long, value_name = "MIRROR")]
  pub mirror: Option<Url>,
  /// 面部遮罩贴图 (PNG)
  #[arg(long, value_name = "MASK", default_value = "assets/mask.png")]
  pub mask: PathBuf,
  /// 角标水印贴图 (PNG)
  #[arg(long, value_name = "WATERMARK", default_value = "assets/watermark.png")]
  pub watermark: PathBuf,
  /// 级联人脸模型 (XML)
  #[cfg(feature = "opencv_cascade")]
  #[arg(long, value_name = "CASCADE")]
  pub cascade: Option<PathBuf>,
}

#[cfg(feature = "opencv_cascade")]
fn face_finder(args: &Args) -> Result<Box<dyn fengbao::annotate::FaceFinder>> {
  use fengbao::annotate::cascade::CascadeFaceFinder;
  match &args.cascade {
    Some(path) => {
      let finder = CascadeFaceFinder::from_xml(&path.display().to_string())?;
      Ok(Box::new(finder))
    }
    None => {
      warn!("未指定级联模型，面部遮罩不生效");
      Ok(Box::new(fengbao::annotate::NoFaceFinder))
    }
  }
}

#[cfg(not(feature = "opencv_cascade"))]
fn face_finder(_args: &Args) -> Result<Box<dyn fengbao::annotate::FaceFinder>> {
  warn!("未启用级联检测特性，面部遮罩不生效");
  Ok(Box::new(fengbao::annotate::NoFaceFinder))
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("任务描述文件: {}", args.job.display());
  info!("标签表文件: {}", args.labels.display());
  info!("检测后端: {}", args.backend);
  info!("主发布通道: {}", args.post);

  let config = PipelineConfig::from_env()?;

  let job = MediaJob::from_json(&std::fs::read_to_string(&args.job)?)?;
  let labels = LabelMap::from_json_file(&args.labels)?;

  let mask = image::open(&args.mask)?.to_rgba8();
  let watermark = Watermark::from_file(&args.watermark)?;
  let annotator = Annotator::new().with_overlay(
    "person",
    Box::new(FaceMaskOverlay::new(mask, face_finder(&args)?)),
  );

  let post = FolderChannel::from_url(&args.post)?;
  let mirror: Option<Box<dyn MirrorChannel>> = match (&config.mirror, &args.mirror) {
    (Some(settings), Some(url)) => Some(Box::new(
      FolderMirror::from_url(url)?.with_destination(&settings.channel),
    )),
    (Some(_), None) => {
      warn!("镜像通道已配置但未给地址，跳过转发");
      None
    }
    _ => None,
  };

  let backend = RecordedBackend::from_url(&args.backend)?;
  let delivery = Delivery::new(config.poster_dir.clone(), Box::new(post), mirror);

  let pipeline = Pipeline::new(
    &config,
    Box::new(ImageFileSource::new()),
    Box::new(backend),
    labels,
    annotator,
    watermark,
    delivery,
  );

  let report = pipeline.run(job)?;
  info!(
    "交付完成: 成功 {} 条, 失败 {} 条",
    report.delivered(),
    report.failed()
  );

  Ok(())
}
