// 该文件是 Shaowang （哨望） 项目的一部分。
// src/model/replay.rs - 回放录制的模型输出
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
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, model::Engine};

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch { expected: String, actual: String },
  #[error("录制文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("录制文件格式错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("录制文件不包含任何帧")]
  Empty,
  #[error("输入形状无效: {0:?}")]
  InvalidShape([usize; 4]),
  #[error("第 {frame} 帧的输出与声明的形状 {shapes:?} 不符")]
  OutputMismatch { frame: usize, shapes: Vec<Vec<usize>> },
}

#[derive(Debug, Deserialize)]
struct Recording {
  input_shape: [usize; 4],
  #[serde(default)]
  output_names: Vec<String>,
  #[serde(default)]
  output_shapes: Vec<Vec<usize>>,
  frames: Vec<Vec<Vec<f32>>>,
}

/// 按顺序循环返回录制好的原始输出缓冲区
///
/// 录制文件格式:
///
/// ```json
/// {
///   "input_shape": [1, 3, 416, 416],
///   "output_names": ["detection_out"],
///   "output_shapes": [[1, 1, 1, 7]],
///   "frames": [[[0, 1, 0.9, 0.5, 0.5, 0.2, 0.2]]]
/// }
/// ```
#[derive(Debug)]
pub struct ReplayEngine {
  input_shape: [usize; 4],
  output_names: Vec<String>,
  output_shapes: Vec<Vec<usize>>,
  frames: Vec<Vec<Box<[f32]>>>,
  cursor: usize,
}

impl FromUrlWithScheme for ReplayEngine {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayEngine {
  type Error = ReplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ReplayError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        actual: url.scheme().to_string(),
      });
    }

    info!("加载录制文件: {}", url.path());
    let text = std::fs::read_to_string(url.path())?;
    Self::from_json(&text)
  }
}

impl ReplayEngine {
  pub fn from_json(text: &str) -> Result<Self, ReplayError> {
    let recording: Recording = serde_json::from_str(text)?;
    if recording.frames.is_empty() {
      return Err(ReplayError::Empty);
    }
    let shape = recording.input_shape;
    if shape[0] != 1 || shape[1] != 3 || shape[2] == 0 || shape[3] == 0 {
      return Err(ReplayError::InvalidShape(shape));
    }

    let frames: Vec<Vec<Box<[f32]>>> = recording
      .frames
      .into_iter()
      .map(|buffers| buffers.into_iter().map(Vec::into_boxed_slice).collect())
      .collect();
    let output_names = if recording.output_names.is_empty() {
      let count = frames[0].len();
      (0..count).map(|i| format!("output_{}", i)).collect()
    } else {
      recording.output_names
    };

    // 未声明形状时按第一帧各缓冲区的长度推断为一维
    let output_shapes = if recording.output_shapes.is_empty() {
      frames[0].iter().map(|buffer| vec![buffer.len()]).collect()
    } else {
      let shapes = recording.output_shapes;
      let mismatch = frames.iter().position(|buffers| {
        buffers.len() != shapes.len()
          || buffers
            .iter()
            .zip(&shapes)
            .any(|(buffer, shape)| buffer.len() != shape.iter().product::<usize>())
      });
      if let Some(frame) = mismatch {
        return Err(ReplayError::OutputMismatch { frame, shapes });
      }
      shapes
    };

    debug!(
      "录制文件: 输入形状 {:?}, 输出层 {:?} 形状 {:?}, 共 {} 帧",
      shape,
      output_names,
      output_shapes,
      frames.len()
    );

    Ok(Self {
      input_shape: shape,
      output_names,
      output_shapes,
      frames,
      cursor: 0,
    })
  }

  pub fn num_frames(&self) -> usize {
    self.frames.len()
  }
}

impl Engine for ReplayEngine {
  type Error = ReplayError;

  fn input_shape(&self) -> [usize; 4] {
    self.input_shape
  }

  fn output_names(&self) -> &[String] {
    &self.output_names
  }

  fn output_shapes(&self) -> &[Vec<usize>] {
    &self.output_shapes
  }

  fn run(&mut self, _input: &[f32]) -> Result<Vec<Box<[f32]>>, Self::Error> {
    let output = self.frames[self.cursor].clone();
    self.cursor = (self.cursor + 1) % self.frames.len();
    Ok(output)
  }
}
