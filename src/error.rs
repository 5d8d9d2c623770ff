// 该文件是 Shaowang （哨望） 项目的一部分。
// src/error.rs - 流水线错误定义
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

/// 单个候选框解码失败的原因，只影响该候选框
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeSkip {
  #[error("类别编号越界: {class_id} (类别数 {num_classes})")]
  ClassOutOfRange { class_id: i64, num_classes: usize },
  #[error("数值无效 (NaN 或无穷大)")]
  NonFinite,
  #[error("输出缓冲区末尾不完整: 剩余 {0} 个元素")]
  Truncated(usize),
}

/// 帧处理流水线错误
#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("无效帧: {0}")]
  InvalidFrame(String),
  #[error("张量尺寸不匹配: 期望 {expected} 个元素, 实际 {actual} 个元素")]
  ShapeMismatch { expected: usize, actual: usize },
  #[error("候选框被跳过: {0}")]
  DecodeSkip(#[from] DecodeSkip),
  #[error("推理引擎错误: {0}")]
  EngineFailure(Box<dyn std::error::Error + Send + Sync + 'static>),
  #[error("渲染输出错误: {0}")]
  Render(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl PipelineError {
  pub fn invalid_frame(msg: impl Into<String>) -> Self {
    PipelineError::InvalidFrame(msg.into())
  }

  /// 可恢复错误只丢弃当前帧（或当前候选框），循环继续
  pub fn is_recoverable(&self) -> bool {
    matches!(
      self,
      PipelineError::InvalidFrame(_) | PipelineError::DecodeSkip(_)
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_recoverable_classes() {
    assert!(PipelineError::invalid_frame("empty").is_recoverable());
    assert!(PipelineError::from(DecodeSkip::NonFinite).is_recoverable());
    assert!(
      !PipelineError::ShapeMismatch {
        expected: 3,
        actual: 2
      }
      .is_recoverable()
    );
    let engine: Box<dyn std::error::Error + Send + Sync> = "boom".into();
    assert!(!PipelineError::EngineFailure(engine).is_recoverable());
  }

  #[test]
  fn test_shape_mismatch_message() {
    let err = PipelineError::ShapeMismatch {
      expected: 519168,
      actual: 12,
    };
    let msg = err.to_string();
    assert!(msg.contains("519168"));
    assert!(msg.contains("12"));
  }
}
