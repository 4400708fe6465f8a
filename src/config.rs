// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/config.rs - 运行配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

/// 置信度阈值的默认值，低于该值的检测不参与标注。
pub const DEFAULT_SENSITIVITY: f32 = 0.3;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("配置项 {name} 的值无法解析: {value}")]
  InvalidValue { name: &'static str, value: String },
  #[error("配置项 {name} 超出取值范围: {value}")]
  OutOfRange { name: &'static str, value: f32 },
}

/// 主发布通道的凭证，只检查是否提供，不校验内容。
#[derive(Debug, Clone, Default)]
pub struct PrimaryCredentials {
  pub consumer_key: Option<String>,
  pub consumer_secret: Option<String>,
  pub access_token: Option<String>,
  pub access_secret: Option<String>,
}

impl PrimaryCredentials {
  pub fn is_complete(&self) -> bool {
    self.consumer_key.is_some()
      && self.consumer_secret.is_some()
      && self.access_token.is_some()
      && self.access_secret.is_some()
  }
}

/// 镜像通道配置，令牌与频道缺一不可。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
  pub token: String,
  pub channel: String,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
  pub sensitivity: f32,
  pub poster_dir: PathBuf,
  pub fail_fast: bool,
  pub primary: PrimaryCredentials,
  pub mirror: Option<MirrorConfig>,
}

impl PipelineConfig {
  /// 从进程环境变量读取配置。
  ///
  /// - `DETECT_SENSITIVITY`: 置信度阈值，缺省 0.3
  /// - `POSTER_DIR`: 海报输出目录，缺省系统临时目录
  /// - `FAIL_FAST`: 单条媒体失败时是否中止整个任务
  /// - `POST_CONSUMER_KEY` / `POST_CONSUMER_SECRET` /
  ///   `POST_ACCESS_TOKEN` / `POST_ACCESS_SECRET`: 主通道凭证
  /// - `MIRROR_TOKEN` + `MIRROR_CHANNEL`: 镜像通道，两项都给才启用
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::load(|name| std::env::var(name).ok())
  }

  fn load<F>(get: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let sensitivity = match get("DETECT_SENSITIVITY") {
      None => DEFAULT_SENSITIVITY,
      Some(raw) => {
        let value: f32 = raw.parse().map_err(|_| ConfigError::InvalidValue {
          name: "DETECT_SENSITIVITY",
          value: raw.clone(),
        })?;
        if !(0.0..=1.0).contains(&value) {
          return Err(ConfigError::OutOfRange {
            name: "DETECT_SENSITIVITY",
            value,
          });
        }
        value
      }
    };

    let poster_dir = get("POSTER_DIR")
      .map(PathBuf::from)
      .unwrap_or_else(std::env::temp_dir);

    let fail_fast = match get("FAIL_FAST") {
      None => false,
      Some(raw) => match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "" | "0" | "false" | "no" | "off" => false,
        _ => {
          return Err(ConfigError::InvalidValue {
            name: "FAIL_FAST",
            value: raw,
          });
        }
      },
    };

    let primary = PrimaryCredentials {
      consumer_key: get("POST_CONSUMER_KEY"),
      consumer_secret: get("POST_CONSUMER_SECRET"),
      access_token: get("POST_ACCESS_TOKEN"),
      access_secret: get("POST_ACCESS_SECRET"),
    };
    if !primary.is_complete() {
      warn!("主通道凭证不完整，网络发布通道将不可用");
    }

    let mirror = match (get("MIRROR_TOKEN"), get("MIRROR_CHANNEL")) {
      (Some(token), Some(channel)) => Some(MirrorConfig { token, channel }),
      (None, None) => None,
      _ => {
        warn!("镜像通道配置不完整，已忽略");
        None
      }
    };

    Ok(PipelineConfig {
      sensitivity,
      poster_dir,
      fail_fast,
      primary,
      mirror,
    })
  }
}
