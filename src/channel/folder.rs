// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/channel/folder.rs - 目录通道
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{Datelike, Utc};
use tracing::info;

use super::{ChannelError, MirrorChannel, MirrorError, PostChannel, PostReceipt};
use crate::{FromUrl, FromUrlWithScheme};

const FOLDER_SCHEME: &str = "folder";

/// 落盘式主通道：把海报和状态文本写进按日期分层的目录。
///
/// 回执里的媒体地址指向拷贝后的文件，镜像通道照常能转发。
pub struct FolderChannel {
  directory: PathBuf,
  counter: Arc<Mutex<u32>>,
}

impl FromUrlWithScheme for FolderChannel {
  const SCHEME: &'static str = FOLDER_SCHEME;
}

impl FromUrl for FolderChannel {
  type Error = ChannelError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ChannelError::SchemeMismatch);
    }
    Ok(FolderChannel {
      directory: PathBuf::from(url.path()),
      counter: Arc::new(Mutex::new(0)),
    })
  }
}

impl FolderChannel {
  pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
    FolderChannel {
      directory: directory.into(),
      counter: Arc::new(Mutex::new(0)),
    }
  }

  fn next_id(&self) -> u32 {
    let mut counter = self.counter.lock().unwrap();
    *counter += 1;
    *counter
  }

  fn dated_directory(&self) -> Result<PathBuf, std::io::Error> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }
    Ok(directory)
  }
}

impl PostChannel for FolderChannel {
  fn publish(&self, poster: &Path, caption: &str) -> Result<PostReceipt, ChannelError> {
    let directory = self.dated_directory()?;
    let id = self.next_id();
    let post_id = format!("{}-{:04X}", Utc::now().format("%H-%M-%S"), id);

    let file_name = poster
      .file_name()
      .map(|name| name.to_string_lossy().to_string())
      .unwrap_or_else(|| format!("{}.jpeg", post_id));
    let hosted = directory.join(&file_name);
    std::fs::copy(poster, &hosted)?;
    std::fs::write(directory.join(format!("{}.txt", post_id)), caption)?;

    let receipt = PostReceipt {
      media_id: format!("media-{:04X}", id),
      post_id,
      media_urls: vec![format!("file://{}", hosted.display())],
    };
    let record = serde_json::json!({
      "media_id": receipt.media_id,
      "post_id": receipt.post_id,
      "media_urls": receipt.media_urls,
      "posted_at": Utc::now().to_rfc3339(),
    });
    std::fs::write(
      directory.join(format!("{}.json", receipt.post_id)),
      serde_json::to_string_pretty(&record)?,
    )?;

    info!("已发布到目录: {}", hosted.display());
    Ok(receipt)
  }
}

/// 落盘式镜像通道：把每条转发追加成一行 JSON。
pub struct FolderMirror {
  directory: PathBuf,
  destination: Option<String>,
}

impl FromUrlWithScheme for FolderMirror {
  const SCHEME: &'static str = FOLDER_SCHEME;
}

impl FromUrl for FolderMirror {
  type Error = MirrorError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(MirrorError::SchemeMismatch);
    }
    Ok(FolderMirror {
      directory: PathBuf::from(url.path()),
      destination: None,
    })
  }
}

impl FolderMirror {
  pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
    FolderMirror {
      directory: directory.into(),
      destination: None,
    }
  }

  /// 标记目标频道，随转发记录一起落盘。
  pub fn with_destination(mut self, destination: &str) -> Self {
    self.destination = Some(destination.to_string());
    self
  }
}

impl MirrorChannel for FolderMirror {
  fn forward(&self, title: &str, image_url: &str, text: &str) -> Result<(), MirrorError> {
    if !self.directory.exists() {
      std::fs::create_dir_all(&self.directory)?;
    }

    let line = serde_json::json!({
      "at": Utc::now().to_rfc3339(),
      "channel": self.destination,
      "title": title,
      "image_url": image_url,
      "text": text,
    });

    let mut file = std::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(self.directory.join("messages.log"))?;
    writeln!(file, "{}", line)?;

    info!("镜像已转发: {}", image_url);
    Ok(())
  }
}
