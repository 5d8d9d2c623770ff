// 该文件是 Shaowang （哨望） 项目的一部分。
// src/preprocess.rs - 帧归一化预处理
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

use std::borrow::Cow;

use image::{ImageBuffer, Rgb};

use crate::{
  error::PipelineError,
  frame::{Frame, RGB_CHANNELS, Tensor},
};

pub const DEFAULT_SCALE: f32 = 1.0 / 255.0;

/// 把原始帧转换为固定尺寸、固定缩放系数的 NCHW 张量
#[derive(Debug, Clone, Copy)]
pub struct FrameNormalizer {
  width: u32,
  height: u32,
  scale: f32,
  swap_rb: bool,
}

impl FrameNormalizer {
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      width,
      height,
      scale: DEFAULT_SCALE,
      swap_rb: false,
    }
  }

  pub fn scale(mut self, scale: f32) -> Self {
    self.scale = scale;
    self
  }

  /// 交换第 0 与第 2 通道 (BGR -> RGB)
  pub fn swap_rb(mut self, swap_rb: bool) -> Self {
    self.swap_rb = swap_rb;
    self
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// 分配一个与目标尺寸匹配的空张量
  pub fn allocate(&self) -> Tensor {
    Tensor::zeros(self.height as usize, self.width as usize)
  }

  pub fn normalize(&self, frame: &Frame) -> Result<Tensor, PipelineError> {
    let mut tensor = self.allocate();
    self.normalize_into(frame, &mut tensor)?;
    Ok(tensor)
  }

  /// 原地覆盖 `tensor`；失败时张量保持原尺寸与原内容
  pub fn normalize_into(&self, frame: &Frame, tensor: &mut Tensor) -> Result<(), PipelineError> {
    if frame.is_empty() {
      return Err(PipelineError::invalid_frame(format!(
        "帧尺寸为零: {}x{}",
        frame.width(),
        frame.height()
      )));
    }
    if frame.as_hwc().len() < frame.expected_len() {
      return Err(PipelineError::invalid_frame(format!(
        "帧数据长度不足: 期望 {}, 实际 {}",
        frame.expected_len(),
        frame.as_hwc().len()
      )));
    }
    if tensor.height() != self.height as usize || tensor.width() != self.width as usize {
      return Err(PipelineError::ShapeMismatch {
        expected: self.allocate().len(),
        actual: tensor.len(),
      });
    }

    let pixels = self.resize(frame)?;

    let plane = self.width as usize * self.height as usize;
    let slice = tensor.as_mut();
    for c in 0..RGB_CHANNELS {
      let src_c = if self.swap_rb { RGB_CHANNELS - 1 - c } else { c };
      let dst = &mut slice[c * plane..(c + 1) * plane];
      for (i, value) in dst.iter_mut().enumerate() {
        *value = pixels[i * RGB_CHANNELS + src_c] as f32 * self.scale;
      }
    }

    Ok(())
  }

  fn resize<'a>(&self, frame: &'a Frame) -> Result<Cow<'a, [u8]>, PipelineError> {
    let src = &frame.as_hwc()[..frame.expected_len()];
    if frame.width() == self.width && frame.height() == self.height {
      return Ok(Cow::Borrowed(src));
    }

    // 双线性缩放与通道顺序无关，BGR 数据可以直接按 Rgb 像素处理
    let view: ImageBuffer<Rgb<u8>, &[u8]> = ImageBuffer::from_raw(frame.width(), frame.height(), src)
      .ok_or_else(|| PipelineError::invalid_frame("无法构造图像视图"))?;
    let resized = image::imageops::resize(
      &view,
      self.width,
      self.height,
      image::imageops::FilterType::Triangle,
    );
    Ok(Cow::Owned(resized.into_raw()))
  }
}
