// 该文件是 Shaowang （哨望） 项目的一部分。
// src/input/v4l_input.rs - V4L 摄像头输入
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
  FromUrl, FromUrlWithScheme,
  frame::{ChannelOrder, Frame},
};

use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;
use v4l::{
  Device, FourCC,
  buffer::Type,
  io::{mmap::Stream, traits::CaptureStream},
  video::Capture,
};

#[derive(Error, Debug)]
pub enum V4lInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("V4L error: {0}")]
  V4lError(#[from] std::io::Error),
  #[error("Unsupported pixel format: {0}")]
  UnsupportedPixelFormat(String),
  #[error("Invalid query parameter: {0}")]
  InvalidQuery(String),
}

const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const BUFFER_COUNT: u32 = 4;

/// V4L2 摄像头，要求设备支持 RGB3 输出
///
/// `v4l:///dev/video0?width=1280&height=720`
pub struct V4lInput {
  stream: Stream<'static>,
  width: u32,
  height: u32,
  index: u64,
  failed: bool,
}

impl FromUrlWithScheme for V4lInput {
  const SCHEME: &'static str = "v4l";
}

fn query_u32(url: &Url, key: &str, default: u32) -> Result<u32, V4lInputError> {
  match url.query_pairs().find(|(k, _)| k == key) {
    Some((_, v)) => v
      .parse()
      .map_err(|_| V4lInputError::InvalidQuery(format!("{}={}", key, v))),
    None => Ok(default),
  }
}

impl FromUrl for V4lInput {
  type Error = V4lInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(V4lInputError::SchemaMismatch);
    }

    let device_path = if url.path().is_empty() || url.path() == "/" {
      DEFAULT_DEVICE.to_string()
    } else {
      url.path().to_string()
    };
    let width = query_u32(url, "width", DEFAULT_WIDTH)?;
    let height = query_u32(url, "height", DEFAULT_HEIGHT)?;

    let device = Device::with_path(&device_path)?;
    let mut format = device.format()?;
    format.width = width;
    format.height = height;
    format.fourcc = FourCC::new(b"RGB3");
    let format = device.set_format(&format)?;
    if format.fourcc != FourCC::new(b"RGB3") {
      return Err(V4lInputError::UnsupportedPixelFormat(
        format.fourcc.to_string(),
      ));
    }
    info!(
      "打开摄像头: {} ({}x{} {})",
      device_path, format.width, format.height, format.fourcc
    );

    let stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)?;

    Ok(V4lInput {
      stream,
      width: format.width,
      height: format.height,
      index: 0,
      failed: false,
    })
  }
}

impl Iterator for V4lInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    if self.failed {
      return None;
    }

    let buf = match self.stream.next() {
      Ok((buf, _meta)) => buf,
      Err(e) => {
        error!("摄像头采集失败: {}", e);
        self.failed = true;
        return None;
      }
    };

    let expected = self.width as usize * self.height as usize * 3;
    if buf.len() < expected {
      // 不完整的帧交给预处理阶段拒绝
      warn!("摄像头帧数据不完整: 期望 {}, 实际 {}", expected, buf.len());
    }
    let data = buf[..buf.len().min(expected)].to_vec();

    let frame = Frame::new(self.width, self.height, ChannelOrder::Rgb, data).with_index(self.index);
    self.index += 1;
    Some(frame)
  }
}
