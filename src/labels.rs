// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/labels.rs - 类别标签表
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum LabelMapError {
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签表解析失败: {0}")]
  ParseError(#[from] serde_json::Error),
}

/// 标签表中的一条记录。
///
/// 缺少 `id` 的记录视为损坏记录，查找走到它时立即放弃并回退到占位标签。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
  #[serde(default)]
  pub id: Option<u32>,
  pub display_name: String,
}

impl LabelEntry {
  /// 查不到或表损坏时使用的占位标签。
  pub fn unknown() -> Self {
    LabelEntry {
      id: None,
      display_name: "unknown".to_string(),
    }
  }
}

/// 类别编号到显示名称的映射表，按文件中的顺序保存。
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
  entries: Vec<LabelEntry>,
}

impl LabelMap {
  pub fn new(entries: Vec<LabelEntry>) -> Self {
    LabelMap { entries }
  }

  pub fn from_json(text: &str) -> Result<Self, LabelMapError> {
    let entries: Vec<LabelEntry> = serde_json::from_str(text)?;
    Ok(LabelMap { entries })
  }

  pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, LabelMapError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let map = Self::from_json(&text)?;
    info!("标签表已加载: {} 条记录", map.len());
    Ok(map)
  }

  /// 按顺序查找类别编号对应的标签。
  ///
  /// 命中前遇到损坏记录（无 `id`）即停止查找，返回占位标签；
  /// 整表查完无命中同样返回占位标签。
  pub fn resolve(&self, class_id: u32) -> LabelEntry {
    for entry in &self.entries {
      let Some(id) = entry.id else {
        return LabelEntry::unknown();
      };
      if id == class_id {
        return entry.clone();
      }
    }
    LabelEntry::unknown()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(id: u32, name: &str) -> LabelEntry {
    LabelEntry {
      id: Some(id),
      display_name: name.to_string(),
    }
  }

  #[test]
  fn resolve_returns_matching_entry() {
    let map = LabelMap::new(vec![entry(1, "person"), entry(3, "car")]);
    assert_eq!(map.resolve(3).display_name, "car");
    assert_eq!(map.resolve(3).id, Some(3));
  }

  #[test]
  fn resolve_falls_back_to_unknown_when_missing() {
    let map = LabelMap::new(vec![entry(1, "person")]);
    assert_eq!(map.resolve(9), LabelEntry::unknown());
  }

  #[test]
  fn broken_entry_stops_the_scan() {
    let broken = LabelEntry {
      id: None,
      display_name: "ghost".to_string(),
    };
    let map = LabelMap::new(vec![entry(1, "person"), broken, entry(3, "car")]);
    // 命中点在损坏记录之后，查找在损坏点就结束了
    assert_eq!(map.resolve(3).display_name, "unknown");
    // 命中点在损坏记录之前，不受影响
    assert_eq!(map.resolve(1).display_name, "person");
  }

  #[test]
  fn parses_entries_without_id() {
    let map = LabelMap::from_json(r#"[{"display_name": "stray"}, {"id": 2, "display_name": "bicycle"}]"#)
      .unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.resolve(2), LabelEntry::unknown());
  }

  #[test]
  fn empty_map_resolves_to_unknown() {
    let map = LabelMap::new(Vec::new());
    assert!(map.is_empty());
    assert_eq!(map.resolve(0).display_name, "unknown");
  }
}
