// 该文件是 Fengbao （西风快报） 项目的一部分。
// src/caption.rs - 状态文本
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

use crate::detect::Detection;
use crate::job::MediaJob;

/// 状态文本的长度上限，按字符数截断。
pub const CAPTION_LIMIT: usize = 140;

/// 选出置信度最高的记录，同分取先出现的那条。
pub fn best_detection(records: &[Detection]) -> Option<&Detection> {
  let mut best: Option<&Detection> = None;
  for det in records {
    match best {
      Some(current) if det.score > current.score => best = Some(det),
      None => best = Some(det),
      _ => {}
    }
  }
  best
}

/// 拼装发布用的状态文本。
///
/// 置信度按十进制字符串截到 3 个字符；整段文本截到 140 字符。
/// 没有可用记录时省略置信度行，类别写 `NO DETECTION`。
pub fn build_caption(job: &MediaJob, records: &[Detection]) -> String {
  let caption = match best_detection(records) {
    Some(best) => {
      let score: String = best.score.to_string().chars().take(3).collect();
      format!(
        "Event ID: {}\nSource: {}\nRan On: {}\nClassifier: {}\nScore: {}\n",
        job.event_id,
        job.event_type,
        job.ran_on,
        best.label.to_uppercase(),
        score
      )
    }
    None => format!(
      "Event ID: {}\nSource: {}\nRan On: {}\nClassifier: NO DETECTION\n",
      job.event_id, job.event_type, job.ran_on
    ),
  };

  if caption.chars().count() <= CAPTION_LIMIT {
    caption
  } else {
    caption.chars().take(CAPTION_LIMIT).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detect::BoundingBox;

  fn record(label: &str, score: f32) -> Detection {
    Detection {
      class_id: 0,
      label: label.to_string(),
      score,
      bbox: BoundingBox {
        x: 0.0,
        y: 0.0,
        right: 1.0,
        bottom: 1.0,
      },
    }
  }

  fn job() -> MediaJob {
    MediaJob {
      media: vec![],
      event_id: "e-77".to_string(),
      event_type: "Azure".to_string(),
      ran_on: "edge-09".to_string(),
    }
  }

  #[test]
  fn highest_score_wins() {
    let records = vec![record("cat", 0.4), record("dog", 0.8), record("bird", 0.6)];
    assert_eq!(best_detection(&records).unwrap().label, "dog");
  }

  #[test]
  fn ties_keep_the_first_record() {
    let records = vec![record("cat", 0.8), record("dog", 0.8)];
    assert_eq!(best_detection(&records).unwrap().label, "cat");
  }

  #[test]
  fn caption_has_all_five_lines() {
    let records = vec![record("person", 0.92)];
    let caption = build_caption(&job(), &records);
    assert_eq!(
      caption,
      "Event ID: e-77\nSource: Azure\nRan On: edge-09\nClassifier: PERSON\nScore: 0.9\n"
    );
  }

  #[test]
  fn score_is_cut_to_three_characters() {
    let caption = build_caption(&job(), &[record("cat", 0.4567)]);
    assert!(caption.contains("Score: 0.4\n"));
  }

  #[test]
  fn no_records_gives_the_fallback_body() {
    let caption = build_caption(&job(), &[]);
    assert_eq!(
      caption,
      "Event ID: e-77\nSource: Azure\nRan On: edge-09\nClassifier: NO DETECTION\n"
    );
    assert!(!caption.contains("Score"));
  }

  #[test]
  fn caption_is_capped_at_the_limit() {
    let mut long_job = job();
    long_job.event_id = "x".repeat(200);
    let caption = build_caption(&long_job, &[record("cat", 0.9)]);
    assert_eq!(caption.chars().count(), CAPTION_LIMIT);
    assert!(caption.starts_with("Event ID: xxx"));
  }
}
