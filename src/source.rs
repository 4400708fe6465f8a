// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/source.rs - 媒体来源
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

#[derive(Error, Debug)]
pub enum SourceError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(image::ImageError),
  #[error("媒体地址不可用: {0}")]
  Unavailable(String),
}

impl From<std::io::Error> for SourceError {
  fn from(err: std::io::Error) -> Self {
    SourceError::IoError(err)
  }
}

impl From<image::ImageError> for SourceError {
  fn from(err: image::ImageError) -> Self {
    SourceError::ImageLoadError(err)
  }
}

/// 媒体来源：按任务里的媒体地址取回一帧图像。
pub trait MediaSource {
  fn fetch(&self, media_url: &str) -> Result<RgbImage, SourceError>;
}

const IMAGE_SOURCE_SCHEME: &str = "image";

/// 本地文件来源，支持 `image:` / `file:` 地址和裸路径。
#[derive(Debug, Default)]
pub struct ImageFileSource;

impl ImageFileSource {
  pub fn new() -> Self {
    ImageFileSource
  }
}

impl MediaSource for ImageFileSource {
  fn fetch(&self, media_url: &str) -> Result<RgbImage, SourceError> {
    let path = match Url::parse(media_url) {
      Ok(url) if url.scheme() == IMAGE_SOURCE_SCHEME || url.scheme() == "file" => {
        url.path().to_string()
      }
      Ok(url) => {
        error!(
          "URI scheme mismatch: expected '{}', found '{}'",
          IMAGE_SOURCE_SCHEME,
          url.scheme()
        );
        return Err(SourceError::SchemaMismatch);
      }
      // 解析不了的地址按裸路径处理
      Err(_) => media_url.to_string(),
    };

    let image = ImageReader::open(&path)?.decode()?;
    let image: RgbImage = image.into();
    info!(
      "媒体已加载: {} ({}x{})",
      path,
      image.width(),
      image.height()
    );
    Ok(image)
  }
}
