// 该文件是 Shaowang （哨望） 项目的一部分。
// src/model/decode.rs - 原始输出解码
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

use crate::{
  error::DecodeSkip,
  model::{Detection, LabelSet, NormalizedBox, OutputLayout, RawOutput},
};

/// 行排布下候选框的置信度取法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowConfidence {
  /// 最大类别分数
  #[default]
  ClassScore,
  /// 仅目标性分数
  Objectness,
  /// 目标性分数乘以最大类别分数
  ObjectnessTimesClass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderConfig {
  /// 元组排布的置信度下限，`<=` 该值的元组直接跳过
  pub score_floor: f32,
  /// 行排布的目标性阈值，低于该值的行直接跳过
  pub objectness_threshold: f32,
  pub row_confidence: RowConfidence,
}

impl Default for DecoderConfig {
  fn default() -> Self {
    Self {
      score_floor: 0.0,
      objectness_threshold: 0.5,
      row_confidence: RowConfidence::ClassScore,
    }
  }
}

/// 一帧的解码结果；被跳过的候选框只计数，不中断整帧
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
  pub detections: Vec<Detection>,
  pub skipped: Vec<DecodeSkip>,
}

/// 按声明的排布把原始输出解释为候选检测框
///
/// 坐标保持画面比例，不做非极大值抑制：每个合格的元组或行都是独立的候选。
#[derive(Debug, Clone)]
pub struct DetectionDecoder {
  labels: LabelSet,
  config: DecoderConfig,
}

impl DetectionDecoder {
  pub fn new(labels: LabelSet, config: DecoderConfig) -> Self {
    Self { labels, config }
  }

  pub fn labels(&self) -> &LabelSet {
    &self.labels
  }

  pub fn config(&self) -> &DecoderConfig {
    &self.config
  }

  pub fn decode(&self, raw: &RawOutput) -> Decoded {
    let stride = raw.layout.stride();
    let mut decoded = Decoded::default();

    for buffer in raw.buffers.iter() {
      let chunks = buffer.chunks_exact(stride);
      let remainder = chunks.remainder().len();

      for chunk in chunks {
        let candidate = match raw.layout {
          OutputLayout::Tuples => self.decode_tuple(chunk),
          OutputLayout::Rows { .. } => self.decode_row(chunk),
        };
        match candidate {
          Ok(Some(detection)) => decoded.detections.push(detection),
          Ok(None) => {}
          Err(skip) => decoded.skipped.push(skip),
        }
      }

      if remainder != 0 {
        decoded.skipped.push(DecodeSkip::Truncated(remainder));
      }
    }

    decoded
  }

  // [batch, class, conf, cx, cy, w, h]
  fn decode_tuple(&self, tuple: &[f32]) -> Result<Option<Detection>, DecodeSkip> {
    let confidence = tuple[2];
    if !confidence.is_finite() {
      return Err(DecodeSkip::NonFinite);
    }
    if confidence <= self.config.score_floor {
      return Ok(None);
    }

    let class_raw = tuple[1];
    if !class_raw.is_finite() {
      return Err(DecodeSkip::NonFinite);
    }
    let class_id = class_raw.round() as i64;
    let label = self.resolve(class_id)?;
    let bbox = normalized_box(&tuple[3..7])?;

    Ok(Some(Detection {
      class_id: class_id as u32,
      label,
      confidence: confidence.clamp(0.0, 1.0),
      bbox,
    }))
  }

  // [cx, cy, w, h, objectness, score_0 .. score_{n-1}]
  fn decode_row(&self, row: &[f32]) -> Result<Option<Detection>, DecodeSkip> {
    let objectness = row[4];
    if !objectness.is_finite() {
      return Err(DecodeSkip::NonFinite);
    }
    if objectness < self.config.objectness_threshold {
      return Ok(None);
    }

    let scores = &row[5..];
    if scores.is_empty() {
      return Err(DecodeSkip::ClassOutOfRange {
        class_id: 0,
        num_classes: self.labels.len(),
      });
    }
    let mut class_idx = 0usize;
    let mut class_score = f32::NEG_INFINITY;
    for (idx, &score) in scores.iter().enumerate() {
      if !score.is_finite() {
        return Err(DecodeSkip::NonFinite);
      }
      // 严格大于：分数相同时保留先出现（编号较小）的类别
      if score > class_score {
        class_score = score;
        class_idx = idx;
      }
    }

    let label = self.resolve(class_idx as i64)?;
    let bbox = normalized_box(&row[0..4])?;

    let confidence = match self.config.row_confidence {
      RowConfidence::ClassScore => class_score,
      RowConfidence::Objectness => objectness,
      RowConfidence::ObjectnessTimesClass => objectness * class_score,
    };

    Ok(Some(Detection {
      class_id: class_idx as u32,
      label,
      confidence: confidence.clamp(0.0, 1.0),
      bbox,
    }))
  }

  fn resolve(&self, class_id: i64) -> Result<String, DecodeSkip> {
    usize::try_from(class_id)
      .ok()
      .and_then(|id| self.labels.get(id))
      .map(str::to_string)
      .ok_or(DecodeSkip::ClassOutOfRange {
        class_id,
        num_classes: self.labels.len(),
      })
  }
}

fn normalized_box(values: &[f32]) -> Result<NormalizedBox, DecodeSkip> {
  if values.iter().any(|v| !v.is_finite()) {
    return Err(DecodeSkip::NonFinite);
  }
  Ok(NormalizedBox {
    cx: values[0],
    cy: values[1],
    width: values[2].max(0.0),
    height: values[3].max(0.0),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gun_fire() -> LabelSet {
    LabelSet::from_names(["Gun", "Fire"]).unwrap()
  }

  fn raw(layout: OutputLayout, buffers: Vec<Vec<f32>>) -> RawOutput {
    RawOutput {
      layout,
      buffers: buffers.into_iter().map(Vec::into_boxed_slice).collect(),
    }
  }

  #[test]
  fn test_tuple_scenario() {
    let decoder = DetectionDecoder::new(gun_fire(), DecoderConfig::default());
    let out = decoder.decode(&raw(
      OutputLayout::Tuples,
      vec![vec![0.0, 1.0, 0.9, 0.5, 0.5, 0.2, 0.2]],
    ));
    assert!(out.skipped.is_empty());
    assert_eq!(out.detections.len(), 1);
    let det = &out.detections[0];
    assert_eq!(det.class_id, 1);
    assert_eq!(det.label, "Fire");
    assert!((det.confidence - 0.9).abs() < 1e-6);
    assert_eq!(
      det.bbox,
      NormalizedBox {
        cx: 0.5,
        cy: 0.5,
        width: 0.2,
        height: 0.2
      }
    );
  }

  #[test]
  fn test_tuple_floor_and_rounding() {
    let decoder = DetectionDecoder::new(gun_fire(), DecoderConfig::default());
    let out = decoder.decode(&raw(
      OutputLayout::Tuples,
      vec![vec![
        0.0, 1.0, 0.0, 0.5, 0.5, 0.2, 0.2, // 置信度为 0，跳过
        0.0, 0.4, 0.6, 0.1, 0.1, 0.1, 0.1, // 0.4 取整为 0
      ]],
    ));
    assert_eq!(out.detections.len(), 1);
    assert_eq!(out.detections[0].label, "Gun");
  }

  #[test]
  fn test_tuple_out_of_range_class_skips_only_that_tuple() {
    let decoder = DetectionDecoder::new(gun_fire(), DecoderConfig::default());
    let out = decoder.decode(&raw(
      OutputLayout::Tuples,
      vec![vec![
        0.0, 7.0, 0.9, 0.5, 0.5, 0.2, 0.2, //
        0.0, -1.0, 0.9, 0.5, 0.5, 0.2, 0.2, //
        0.0, 0.0, 0.8, 0.3, 0.3, 0.1, 0.1,
      ]],
    ));
    assert_eq!(out.detections.len(), 1);
    assert_eq!(out.detections[0].label, "Gun");
    assert_eq!(
      out.skipped,
      vec![
        DecodeSkip::ClassOutOfRange {
          class_id: 7,
          num_classes: 2
        },
        DecodeSkip::ClassOutOfRange {
          class_id: -1,
          num_classes: 2
        },
      ]
    );
  }

  #[test]
  fn test_negative_size_is_clamped_and_nan_rejected() {
    let decoder = DetectionDecoder::new(gun_fire(), DecoderConfig::default());
    let out = decoder.decode(&raw(
      OutputLayout::Tuples,
      vec![vec![
        0.0, 0.0, 0.9, 0.5, 0.5, -0.2, 0.3, //
        0.0, 0.0, 0.9, f32::NAN, 0.5, 0.2, 0.3,
      ]],
    ));
    assert_eq!(out.detections.len(), 1);
    assert_eq!(out.detections[0].bbox.width, 0.0);
    assert_eq!(out.detections[0].bbox.height, 0.3);
    assert_eq!(out.skipped, vec![DecodeSkip::NonFinite]);
  }

  #[test]
  fn test_truncated_tail() {
    let decoder = DetectionDecoder::new(gun_fire(), DecoderConfig::default());
    let out = decoder.decode(&raw(
      OutputLayout::Tuples,
      vec![vec![0.0, 1.0, 0.9, 0.5, 0.5, 0.2, 0.2, 0.0, 1.0]],
    ));
    assert_eq!(out.detections.len(), 1);
    assert_eq!(out.skipped, vec![DecodeSkip::Truncated(2)]);
  }

  #[test]
  fn test_row_scenario() {
    let decoder = DetectionDecoder::new(gun_fire(), DecoderConfig::default());
    let out = decoder.decode(&raw(
      OutputLayout::Rows { num_classes: 2 },
      vec![vec![0.5, 0.5, 0.1, 0.1, 0.8, 0.1, 0.9]],
    ));
    assert_eq!(out.detections.len(), 1);
    assert_eq!(out.detections[0].class_id, 1);
    assert!((out.detections[0].confidence - 0.9).abs() < 1e-6);
  }

  #[test]
  fn test_row_tie_prefers_lowest_class() {
    let decoder = DetectionDecoder::new(gun_fire(), DecoderConfig::default());
    let out = decoder.decode(&raw(
      OutputLayout::Rows { num_classes: 2 },
      vec![vec![0.5, 0.5, 0.1, 0.1, 0.8, 0.7, 0.7]],
    ));
    assert_eq!(out.detections[0].class_id, 0);
    assert_eq!(out.detections[0].label, "Gun");
  }

  #[test]
  fn test_row_objectness_gate() {
    let decoder = DetectionDecoder::new(gun_fire(), DecoderConfig::default());
    let out = decoder.decode(&raw(
      OutputLayout::Rows { num_classes: 2 },
      vec![
        vec![0.5, 0.5, 0.1, 0.1, 0.3, 0.1, 0.9],
        vec![0.2, 0.2, 0.1, 0.1, 0.5, 0.9, 0.1],
      ],
    ));
    // 0.3 低于阈值被跳过，0.5 恰好等于阈值保留
    assert_eq!(out.detections.len(), 1);
    assert_eq!(out.detections[0].label, "Gun");
  }

  #[test]
  fn test_row_confidence_modes() {
    let row = vec![0.5, 0.5, 0.1, 0.1, 0.8, 0.1, 0.9];
    let conf = |mode| {
      let config = DecoderConfig {
        row_confidence: mode,
        ..DecoderConfig::default()
      };
      DetectionDecoder::new(gun_fire(), config).decode(&raw(
        OutputLayout::Rows { num_classes: 2 },
        vec![row.clone()],
      ))
      .detections[0]
        .confidence
    };
    assert!((conf(RowConfidence::ClassScore) - 0.9).abs() < 1e-6);
    assert!((conf(RowConfidence::Objectness) - 0.8).abs() < 1e-6);
    assert!((conf(RowConfidence::ObjectnessTimesClass) - 0.72).abs() < 1e-6);
  }

  #[test]
  fn test_row_more_classes_than_labels() {
    let decoder = DetectionDecoder::new(gun_fire(), DecoderConfig::default());
    let out = decoder.decode(&raw(
      OutputLayout::Rows { num_classes: 3 },
      vec![vec![0.5, 0.5, 0.1, 0.1, 0.8, 0.1, 0.2, 0.9]],
    ));
    assert!(out.detections.is_empty());
    assert_eq!(
      out.skipped,
      vec![DecodeSkip::ClassOutOfRange {
        class_id: 2,
        num_classes: 2
      }]
    );
  }

  #[test]
  fn test_decode_is_deterministic() {
    let decoder = DetectionDecoder::new(gun_fire(), DecoderConfig::default());
    let input = raw(
      OutputLayout::Rows { num_classes: 2 },
      vec![vec![
        0.5, 0.5, 0.1, 0.1, 0.8, 0.1, 0.9, //
        0.3, 0.6, 0.2, 0.4, 0.9, 0.6, 0.2,
      ]],
    );
    let first = decoder.decode(&input);
    for _ in 0..5 {
      assert_eq!(decoder.decode(&input), first);
    }
  }
}
