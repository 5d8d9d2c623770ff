// 该文件是 Shaowang （哨望） 项目的一部分。
// src/input/image_sequence.rs - 目录图像序列输入
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

use std::{
  path::{Path, PathBuf},
  thread::sleep,
  time::Duration,
};

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

#[derive(Error, Debug)]
pub enum ImageSequenceInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("No image found in directory: {0}")]
  EmptyDirectory(String),
  #[error("Invalid query parameter: {0}")]
  InvalidQuery(String),
}

/// 按文件名顺序逐帧读取目录中的图片，模拟摄像头
///
/// `frames:///data/clip?loop&interval=100` 表示循环播放，帧间隔 100 毫秒。
pub struct ImageSequenceInput {
  files: Vec<PathBuf>,
  cursor: usize,
  repeat: bool,
  interval: Option<Duration>,
  index: u64,
  failed: bool,
}

impl FromUrlWithScheme for ImageSequenceInput {
  const SCHEME: &'static str = "frames";
}

impl FromUrl for ImageSequenceInput {
  type Error = ImageSequenceInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageSequenceInputError::SchemaMismatch);
    }

    let mut repeat = false;
    let mut interval = None;
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "loop" => repeat = true,
        "interval" => {
          let ms: u64 = v
            .parse()
            .map_err(|_| ImageSequenceInputError::InvalidQuery(format!("interval={}", v)))?;
          interval = Some(Duration::from_millis(ms));
        }
        _ => debug!("忽略未知参数: {}={}", k, v),
      }
    }

    let files = list_images(Path::new(url.path()))?;
    if files.is_empty() {
      return Err(ImageSequenceInputError::EmptyDirectory(
        url.path().to_string(),
      ));
    }
    info!("图像序列: {} 共 {} 帧", url.path(), files.len());

    Ok(Self {
      files,
      cursor: 0,
      repeat,
      interval,
      index: 0,
      failed: false,
    })
  }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
  let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
    .filter_map(|entry| entry.ok().map(|e| e.path()))
    .filter(|path| {
      path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
    })
    .collect();
  files.sort();
  Ok(files)
}

impl ImageSequenceInput {
  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

impl Iterator for ImageSequenceInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    if self.failed {
      return None;
    }
    if self.cursor >= self.files.len() {
      if !self.repeat {
        return None;
      }
      self.cursor = 0;
    }

    if let Some(interval) = self.interval {
      if self.index > 0 {
        sleep(interval);
      }
    }

    let path = &self.files[self.cursor];
    let image = ImageReader::open(path)
      .map_err(image::ImageError::IoError)
      .and_then(|reader| reader.decode());
    let image = match image {
      Ok(image) => image.to_rgb8(),
      Err(e) => {
        error!("读取图像失败: {}, 错误: {}", path.display(), e);
        self.failed = true;
        return None;
      }
    };

    let frame = Frame::from(image).with_index(self.index);
    self.cursor += 1;
    self.index += 1;
    Some(frame)
  }
}
