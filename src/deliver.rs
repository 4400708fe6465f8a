// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/deliver.rs - 交付
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};

use crate::channel::{ChannelError, MirrorChannel, MirrorError, PostChannel, PostReceipt};

/// 同一媒体地址总是落到同一个海报文件名。
pub fn poster_path(directory: &Path, media_url: &str) -> PathBuf {
  let digest = md5::compute(media_url.as_bytes());
  directory.join(format!("poster_{:x}.jpeg", digest))
}

#[derive(Error, Debug)]
pub enum DeliverError {
  #[error("海报目录不可用: {0}")]
  IoError(#[from] std::io::Error),
  #[error("海报编码失败: {0}")]
  SaveError(#[from] image::ImageError),
  #[error("主通道发布失败: {0}")]
  PublishError(#[from] ChannelError),
  #[error("镜像转发失败: {0}")]
  MirrorError(#[from] MirrorError),
}

/// 一次交付的结果。
#[derive(Debug)]
pub struct DeliveryReport {
  pub poster: PathBuf,
  pub receipt: PostReceipt,
  pub mirrored: usize,
}

/// 镜像转发的推进状态：首发、按通道给的时长等待、补发一次。
enum MirrorAttempt {
  First,
  Wait(Duration),
  Second,
}

/// 出图交付：落盘成海报，发主通道，再逐条镜像转发。
pub struct Delivery {
  poster_dir: PathBuf,
  post: Box<dyn PostChannel>,
  mirror: Option<Box<dyn MirrorChannel>>,
}

impl Delivery {
  pub fn new(
    poster_dir: PathBuf,
    post: Box<dyn PostChannel>,
    mirror: Option<Box<dyn MirrorChannel>>,
  ) -> Self {
    Delivery {
      poster_dir,
      post,
      mirror,
    }
  }

  pub fn deliver(
    &self,
    image: &RgbImage,
    caption: &str,
    media_url: &str,
  ) -> Result<DeliveryReport, DeliverError> {
    if !self.poster_dir.exists() {
      std::fs::create_dir_all(&self.poster_dir)?;
    }
    let poster = poster_path(&self.poster_dir, media_url);
    image.save(&poster)?;
    info!("海报已落盘: {}", poster.display());

    let receipt = self.post.publish(&poster, caption)?;
    info!("主通道发布完成: {}", receipt.post_id);

    let mut mirrored = 0;
    match &self.mirror {
      None => warn!("缺少镜像通道配置，跳过转发"),
      Some(mirror) => {
        let title = poster
          .file_name()
          .map(|name| name.to_string_lossy().to_string())
          .unwrap_or_default();
        for image_url in &receipt.media_urls {
          Self::forward_with_retry(mirror.as_ref(), &title, image_url, caption)?;
          mirrored += 1;
        }
      }
    }

    Ok(DeliveryReport {
      poster,
      receipt,
      mirrored,
    })
  }

  /// 限流时按通道建议的时长等一次、补发一次；第二次无论什么错都上抛。
  /// 非限流错误不重试。
  fn forward_with_retry(
    mirror: &dyn MirrorChannel,
    title: &str,
    image_url: &str,
    text: &str,
  ) -> Result<(), MirrorError> {
    let mut state = MirrorAttempt::First;
    loop {
      state = match state {
        MirrorAttempt::First => match mirror.forward(title, image_url, text) {
          Ok(()) => return Ok(()),
          Err(MirrorError::RateLimited { retry_after }) => MirrorAttempt::Wait(retry_after),
          Err(err) => return Err(err),
        },
        MirrorAttempt::Wait(delay) => {
          warn!("镜像通道限流，{:?} 后补发一次", delay);
          std::thread::sleep(delay);
          MirrorAttempt::Second
        }
        MirrorAttempt::Second => return mirror.forward(title, image_url, text),
      };
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::VecDeque;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};
  use std::time::Instant;

  struct StubChannel {
    captions: Arc<Mutex<Vec<String>>>,
    hosted: Vec<String>,
  }

  impl PostChannel for StubChannel {
    fn publish(&self, _poster: &Path, caption: &str) -> Result<PostReceipt, ChannelError> {
      self.captions.lock().unwrap().push(caption.to_string());
      Ok(PostReceipt {
        media_id: "media-1".to_string(),
        post_id: "post-1".to_string(),
        media_urls: self.hosted.clone(),
      })
    }
  }

  struct ScriptedMirror {
    responses: Mutex<VecDeque<Result<(), MirrorError>>>,
    calls: Arc<AtomicUsize>,
  }

  impl MirrorChannel for ScriptedMirror {
    fn forward(&self, _title: &str, _image_url: &str, _text: &str) -> Result<(), MirrorError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(Ok(()))
    }
  }

  fn rate_limited(ms: u64) -> MirrorError {
    MirrorError::RateLimited {
      retry_after: Duration::from_millis(ms),
    }
  }

  fn delivery_with(
    dir: &Path,
    hosted: Vec<String>,
    mirror: Option<Box<dyn MirrorChannel>>,
  ) -> (Delivery, Arc<Mutex<Vec<String>>>) {
    let captions = Arc::new(Mutex::new(Vec::new()));
    let post = StubChannel {
      captions: captions.clone(),
      hosted,
    };
    (
      Delivery::new(dir.to_path_buf(), Box::new(post), mirror),
      captions,
    )
  }

  #[test]
  fn poster_name_is_derived_from_the_url() {
    let path = poster_path(Path::new("/tmp"), "abc");
    assert_eq!(
      path,
      PathBuf::from("/tmp/poster_900150983cd24fb0d6963f7d28e17f72.jpeg")
    );
    // 同一地址永远同一文件名，不同地址不会撞名
    assert_eq!(path, poster_path(Path::new("/tmp"), "abc"));
    assert_ne!(path, poster_path(Path::new("/tmp"), "abd"));
  }

  #[test]
  fn deliver_saves_posts_and_mirrors_each_hosted_url() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let mirror = ScriptedMirror {
      responses: Mutex::new(VecDeque::new()),
      calls: calls.clone(),
    };
    let (delivery, captions) = delivery_with(
      dir.path(),
      vec!["file:/a.jpeg".to_string(), "file:/b.jpeg".to_string()],
      Some(Box::new(mirror)),
    );

    let image = RgbImage::from_pixel(16, 16, image::Rgb([1, 2, 3]));
    let report = delivery.deliver(&image, "caption-text", "image:/in/a.png").unwrap();

    assert!(report.poster.exists());
    assert_eq!(report.mirrored, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(captions.lock().unwrap().as_slice(), &["caption-text"]);
  }

  #[test]
  fn missing_mirror_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (delivery, _) = delivery_with(dir.path(), vec!["file:/a.jpeg".to_string()], None);
    let image = RgbImage::new(8, 8);
    let report = delivery.deliver(&image, "c", "image:/in/b.png").unwrap();
    assert_eq!(report.mirrored, 0);
  }

  #[test]
  fn rate_limit_waits_then_retries_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mirror = ScriptedMirror {
      responses: Mutex::new(VecDeque::from([Err(rate_limited(60)), Ok(())])),
      calls: calls.clone(),
    };

    let started = Instant::now();
    Delivery::forward_with_retry(&mirror, "t", "file:/a.jpeg", "x").unwrap();
    assert!(started.elapsed() >= Duration::from_millis(60));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn second_rate_limit_surfaces_without_a_third_try() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mirror = ScriptedMirror {
      responses: Mutex::new(VecDeque::from([
        Err(rate_limited(10)),
        Err(rate_limited(10)),
        Ok(()),
      ])),
      calls: calls.clone(),
    };

    let err = Delivery::forward_with_retry(&mirror, "t", "file:/a.jpeg", "x").unwrap_err();
    assert!(matches!(err, MirrorError::RateLimited { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn non_rate_limit_errors_fail_fast() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mirror = ScriptedMirror {
      responses: Mutex::new(VecDeque::from([Err(MirrorError::Rejected(
        "bad token".to_string(),
      ))])),
      calls: calls.clone(),
    };

    let err = Delivery::forward_with_retry(&mirror, "t", "file:/a.jpeg", "x").unwrap_err();
    assert!(matches!(err, MirrorError::Rejected(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn mirror_failure_fails_the_delivery() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let mirror = ScriptedMirror {
      responses: Mutex::new(VecDeque::from([Err(MirrorError::Rejected(
        "down".to_string(),
      ))])),
      calls,
    };
    let (delivery, _) = delivery_with(
      dir.path(),
      vec!["file:/a.jpeg".to_string()],
      Some(Box::new(mirror)),
    );

    let image = RgbImage::new(8, 8);
    let err = delivery.deliver(&image, "c", "image:/in/c.png").unwrap_err();
    assert!(matches!(err, DeliverError::MirrorError(_)));
  }
}
