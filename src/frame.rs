// 该文件是 Shaowang （哨望） 项目的一部分。
// src/frame.rs - 原始帧与 NCHW 张量定义
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

use image::{ImageBuffer, Rgb, RgbImage};

pub const RGB_CHANNELS: usize = 3;

/// 帧内像素的通道顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
  #[default]
  Rgb,
  Bgr,
}

/// 输入源产生的原始彩色帧，HWC 交错排列，原点在左上角
///
/// 帧不校验数据长度；零尺寸或数据不足的帧由预处理阶段拒绝。
#[derive(Debug, Clone)]
pub struct Frame {
  data: Box<[u8]>,
  width: u32,
  height: u32,
  order: ChannelOrder,
  index: u64,
}

impl Frame {
  pub fn new(width: u32, height: u32, order: ChannelOrder, data: Vec<u8>) -> Self {
    Self {
      data: data.into_boxed_slice(),
      width,
      height,
      order,
      index: 0,
    }
  }

  pub fn with_index(mut self, index: u64) -> Self {
    self.index = index;
    self
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn order(&self) -> ChannelOrder {
    self.order
  }

  pub fn index(&self) -> u64 {
    self.index
  }

  pub fn as_hwc(&self) -> &[u8] {
    &self.data
  }

  /// 期望的字节数 `width * height * 3`
  pub fn expected_len(&self) -> usize {
    self.width as usize * self.height as usize * RGB_CHANNELS
  }

  pub fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  /// 转为 RGB 图像，供渲染使用；数据不足时返回 None
  pub fn to_rgb_image(&self) -> Option<RgbImage> {
    if self.is_empty() || self.data.len() < self.expected_len() {
      return None;
    }
    let data = &self.data;
    let width = self.width as usize;
    let order = self.order;
    Some(ImageBuffer::from_fn(self.width, self.height, |x, y| {
      let idx = (y as usize * width + x as usize) * RGB_CHANNELS;
      match order {
        ChannelOrder::Rgb => Rgb([data[idx], data[idx + 1], data[idx + 2]]),
        ChannelOrder::Bgr => Rgb([data[idx + 2], data[idx + 1], data[idx]]),
      }
    }))
  }
}

impl From<RgbImage> for Frame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Frame::new(width, height, ChannelOrder::Rgb, image.into_raw())
  }
}

/// 送入推理引擎的 `(1, 3, H, W)` 浮点张量
#[derive(Debug, Clone)]
pub struct Tensor {
  shape: [usize; 4],
  data: Box<[f32]>,
}

impl Tensor {
  pub fn zeros(height: usize, width: usize) -> Self {
    let shape = [1, RGB_CHANNELS, height, width];
    let data = vec![0.0f32; shape.iter().product()].into_boxed_slice();
    Self { shape, data }
  }

  pub fn shape(&self) -> [usize; 4] {
    self.shape
  }

  pub fn height(&self) -> usize {
    self.shape[2]
  }

  pub fn width(&self) -> usize {
    self.shape[3]
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }
}

impl AsMut<[f32]> for Tensor {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}
