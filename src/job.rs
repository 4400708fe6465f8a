// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/job.rs - 事件任务载荷
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

use serde::Deserialize;
use tracing::debug;

fn default_ran_on() -> String {
  "unknown".to_string()
}

/// 一次投递任务：事件元数据加上待处理的媒体地址列表。
#[derive(Deserialize, Debug, Clone)]
pub struct MediaJob {
  #[serde(default)]
  pub media: Vec<String>,
  #[serde(default)]
  pub event_id: String,
  #[serde(default)]
  pub event_type: String,
  #[serde(default = "default_ran_on")]
  pub ran_on: String,
}

impl MediaJob {
  pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(text)
  }

  /// 归一化事件来源。
  ///
  /// `Microsoft` 开头的事件类型统一改写为 `Azure`，
  /// 同时去掉事件编号里的连字符。其余来源原样保留。
  pub fn normalize(&mut self) {
    if self.event_type.starts_with("Microsoft") {
      self.event_type = "Azure".to_string();
      self.event_id = self.event_id.replace('-', "");
      debug!("事件来源归一化: {} -> Azure", self.event_id);
    }
  }
}
