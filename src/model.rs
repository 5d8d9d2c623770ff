// 该文件是 Shaowang （哨望） 项目的一部分。
// src/model.rs - 推理引擎边界与检测结果
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

use tracing::{debug, info};

use crate::{error::PipelineError, frame::Tensor, output::Palette};

mod decode;
mod label;
mod replay;

pub use self::decode::{Decoded, DecoderConfig, DetectionDecoder, RowConfidence};
pub use self::label::{LabelSet, LabelSetError};
pub use self::replay::{ReplayEngine, ReplayError};

/// 外部推理引擎。输入输出形状在启动时查询一次。
pub trait Engine {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 引擎声明的输入形状 `[N, C, H, W]`
  fn input_shape(&self) -> [usize; 4];
  fn output_names(&self) -> &[String];
  /// 各输出张量的形状，与 `output_names` 一一对应
  fn output_shapes(&self) -> &[Vec<usize>];
  fn run(&mut self, input: &[f32]) -> Result<Vec<Box<[f32]>>, Self::Error>;
}

/// 原始输出的排布方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
  /// 连续的 7 元组 `[batch, class, conf, cx, cy, w, h]`
  Tuples,
  /// 每行 `[cx, cy, w, h, objectness, score_0 .. score_{n-1}]`
  Rows { num_classes: usize },
}

impl OutputLayout {
  pub const TUPLE_STRIDE: usize = 7;

  pub fn stride(&self) -> usize {
    match self {
      OutputLayout::Tuples => Self::TUPLE_STRIDE,
      OutputLayout::Rows { num_classes } => 5 + num_classes,
    }
  }

  /// 输出形状能否按该排布解码。行排布必须能从形状中读出行宽。
  pub fn fits_shape(&self, shape: &[usize]) -> bool {
    match (self, shape) {
      (_, []) => false,
      (OutputLayout::Tuples, [len]) => len % Self::TUPLE_STRIDE == 0,
      (OutputLayout::Rows { .. }, [_]) => false,
      (_, [.., last]) => *last == self.stride(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct RawOutput {
  pub layout: OutputLayout,
  pub buffers: Vec<Box<[f32]>>,
}

/// 以画面比例表示的框，中心点加宽高，取值通常在 [0,1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedBox {
  pub cx: f32,
  pub cy: f32,
  pub width: f32,
  pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub class_id: u32,
  pub label: String,
  pub confidence: f32,
  pub bbox: NormalizedBox,
}

/// 在推理引擎外包一层尺寸校验，并给输出打上排布标记
pub struct InferenceAdapter<E> {
  engine: E,
  layout: OutputLayout,
  input_len: usize,
}

impl<E: Engine> InferenceAdapter<E> {
  pub fn new(engine: E, layout: OutputLayout) -> Self {
    let shape = engine.input_shape();
    let input_len = shape.iter().product();
    debug!("引擎输入形状: {:?}, 元素数: {}", shape, input_len);
    Self {
      engine,
      layout,
      input_len,
    }
  }

  pub fn layout(&self) -> OutputLayout {
    self.layout
  }

  pub fn input_shape(&self) -> [usize; 4] {
    self.engine.input_shape()
  }

  pub fn input_len(&self) -> usize {
    self.input_len
  }

  pub fn output_names(&self) -> &[String] {
    self.engine.output_names()
  }

  pub fn output_shapes(&self) -> &[Vec<usize>] {
    self.engine.output_shapes()
  }

  pub fn infer(&mut self, tensor: &Tensor) -> Result<RawOutput, PipelineError> {
    if tensor.len() != self.input_len {
      return Err(PipelineError::ShapeMismatch {
        expected: self.input_len,
        actual: tensor.len(),
      });
    }

    let buffers = self
      .engine
      .run(tensor.as_slice())
      .map_err(|e| PipelineError::EngineFailure(Box::new(e)))?;

    Ok(RawOutput {
      layout: self.layout,
      buffers,
    })
  }
}

/// 启动时一次性得到的引擎相关资源
pub struct EngineBundle<E> {
  pub adapter: InferenceAdapter<E>,
  pub labels: LabelSet,
  pub output_names: Vec<String>,
  pub output_shapes: Vec<Vec<usize>>,
  pub palette: Palette,
}

impl<E: Engine> EngineBundle<E> {
  pub fn new(engine: E, layout: OutputLayout, labels: LabelSet) -> Self {
    let adapter = InferenceAdapter::new(engine, layout);
    let output_names = adapter.output_names().to_vec();
    let output_shapes = adapter.output_shapes().to_vec();
    let palette = Palette::new(labels.len());
    info!(
      "引擎就绪: 输入 {:?}, 输出层 {:?} 形状 {:?}, 类别 {}",
      adapter.input_shape(),
      output_names,
      output_shapes,
      labels.len()
    );
    Self {
      adapter,
      labels,
      output_names,
      output_shapes,
      palette,
    }
  }
}
