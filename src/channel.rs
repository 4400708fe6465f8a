// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/channel.rs - 发布通道
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
use std::time::Duration;

use thiserror::Error;

pub mod folder;

pub use folder::{FolderChannel, FolderMirror};

/// 主通道发布成功后的回执。
///
/// `media_urls` 是通道托管媒体后的可访问地址，镜像转发按它逐条进行。
#[derive(Debug, Clone)]
pub struct PostReceipt {
  pub media_id: String,
  pub post_id: String,
  pub media_urls: Vec<String>,
}

#[derive(Error, Debug)]
pub enum ChannelError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("回执序列化失败: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("通道拒绝: {0}")]
  Rejected(String),
}

#[derive(Error, Debug)]
pub enum MirrorError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("镜像通道限流: 建议等待 {retry_after:?}")]
  RateLimited { retry_after: Duration },
  #[error("镜像通道拒绝: {0}")]
  Rejected(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 主发布通道：上传海报并附上状态文本。
pub trait PostChannel {
  fn publish(&self, poster: &Path, caption: &str) -> Result<PostReceipt, ChannelError>;
}

/// 镜像通道：把已发布的媒体地址转发一份。
///
/// 限流时返回 [`MirrorError::RateLimited`]，由调用方决定等多久、重试几次。
pub trait MirrorChannel {
  fn forward(&self, title: &str, image_url: &str, text: &str) -> Result<(), MirrorError>;
}
