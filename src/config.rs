// 该文件是 Shaowang （哨望） 项目的一部分。
// src/config.rs - 流水线配置与校验
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

use thiserror::Error;
use tracing::debug;

use crate::{
  filter::FilterPolicy,
  model::{DecoderConfig, DetectionDecoder, Engine, InferenceAdapter, LabelSet, OutputLayout},
  output::Overlay,
  preprocess::DEFAULT_SCALE,
  task::PipelineLoop,
};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("{name} 超出范围 [0, 1]: {value}")]
  OutOfRange { name: &'static str, value: f32 },
  #[error("缩放系数必须大于 0: {0}")]
  InvalidScale(f32),
  #[error("关注标签不在标签集中: {0}")]
  UnknownLabel(String),
  #[error("类别数与标签数不一致: 类别 {num_classes}, 标签 {labels}")]
  ClassCountMismatch { num_classes: usize, labels: usize },
  #[error("模型输出 {name} 的形状 {shape:?} 不符合排布 {layout:?} (每项 {stride} 个元素)")]
  OutputShapeMismatch {
    name: String,
    shape: Vec<usize>,
    layout: OutputLayout,
    stride: usize,
  },
}

/// 一次运行内固定不变的流水线参数
#[derive(Debug, Clone)]
pub struct PipelineConfig {
  pub labels: LabelSet,
  pub layout: OutputLayout,
  pub decoder: DecoderConfig,
  pub confidence_threshold: f32,
  pub accepted_labels: Vec<String>,
  pub scale: f32,
  pub swap_rb: bool,
  pub label_offset: Option<f32>,
  pub frame_limit: Option<usize>,
}

impl PipelineConfig {
  /// 默认关注标签集中的全部标签
  pub fn new(labels: LabelSet, layout: OutputLayout) -> Self {
    let accepted_labels = labels.iter().map(str::to_string).collect();
    Self {
      labels,
      layout,
      decoder: DecoderConfig::default(),
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      accepted_labels,
      scale: DEFAULT_SCALE,
      swap_rb: false,
      label_offset: None,
      frame_limit: None,
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    unit_range("confidence_threshold", self.confidence_threshold)?;
    unit_range("score_floor", self.decoder.score_floor)?;
    unit_range("objectness_threshold", self.decoder.objectness_threshold)?;

    if !(self.scale.is_finite() && self.scale > 0.0) {
      return Err(ConfigError::InvalidScale(self.scale));
    }

    if let Some(label) = self
      .accepted_labels
      .iter()
      .find(|label| !self.labels.contains(label))
    {
      return Err(ConfigError::UnknownLabel(label.clone()));
    }

    if let OutputLayout::Rows { num_classes } = self.layout {
      if num_classes != self.labels.len() {
        return Err(ConfigError::ClassCountMismatch {
          num_classes,
          labels: self.labels.len(),
        });
      }
    }

    Ok(())
  }

  pub fn filter_policy(&self) -> FilterPolicy {
    FilterPolicy::new(self.confidence_threshold, self.accepted_labels.iter().cloned())
  }

  pub fn decoder(&self) -> DetectionDecoder {
    DetectionDecoder::new(self.labels.clone(), self.decoder)
  }

  pub fn overlay(&self) -> Overlay {
    match self.label_offset {
      Some(offset) => Overlay::default().with_label_offset(offset),
      None => Overlay::default(),
    }
  }

  /// 引擎声明的每个输出形状都必须能按所选排布解码
  pub fn check_outputs(&self, names: &[String], shapes: &[Vec<usize>]) -> Result<(), ConfigError> {
    for (i, shape) in shapes.iter().enumerate() {
      if !self.layout.fits_shape(shape) {
        let name = names
          .get(i)
          .cloned()
          .unwrap_or_else(|| format!("output_{}", i));
        return Err(ConfigError::OutputShapeMismatch {
          name,
          shape: shape.clone(),
          layout: self.layout,
          stride: self.layout.stride(),
        });
      }
    }
    Ok(())
  }

  /// 校验后组装处理循环
  pub fn build<E: Engine>(&self, adapter: InferenceAdapter<E>) -> Result<PipelineLoop<E>, ConfigError> {
    self.validate()?;
    self.check_outputs(adapter.output_names(), adapter.output_shapes())?;
    debug!("流水线配置: {:?}", self);
    Ok(
      PipelineLoop::new(adapter, self.decoder(), self.filter_policy())
        .scale(self.scale)
        .swap_rb(self.swap_rb)
        .overlay(self.overlay())
        .frame_limit(self.frame_limit),
    )
  }
}

fn unit_range(name: &'static str, value: f32) -> Result<(), ConfigError> {
  if (0.0..=1.0).contains(&value) {
    Ok(())
  } else {
    Err(ConfigError::OutOfRange { name, value })
  }
}
