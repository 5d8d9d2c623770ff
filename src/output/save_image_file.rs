// 该文件是 Shaowang （哨望） 项目的一部分。
// src/output/save_image_file.rs - 保存标注后的画面
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

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  output::{
    DrawInstruction, Palette, Render,
    draw::{Draw, FontError},
  },
};

/// 每帧覆盖同一个文件，作为实时画面的快照
pub struct SaveImageFileOutput {
  path: String,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("字体错误: {0}")]
  FontError(#[from] FontError),
  #[error("帧数据无法转换为图像: {0}x{1}")]
  InvalidFrame(u32, u32),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let mut draw = Draw::default();
    // image:///tmp/live.png?font=/usr/share/fonts/DejaVuSans.ttf
    if let Some((_, font)) = uri.query_pairs().find(|(k, _)| k == "font") {
      info!("加载标签字体: {}", font);
      draw = draw.with_font_file(font.into_owned())?;
    }

    Ok(SaveImageFileOutput {
      path: uri.path().to_string(),
      draw,
    })
  }
}

impl SaveImageFileOutput {
  pub fn with_palette(mut self, palette: Palette) -> Self {
    self.draw = self.draw.with_palette(palette);
    self
  }

  fn save_image(&self, image: image::RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = Path::new(&self.path).parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
      }
    }

    image
      .save(&self.path)
      .map_err(SaveImageFileError::ImageError)?;

    debug!("保存图像到文件: {}", self.path);

    Ok(())
  }
}

impl Render for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(
    &self,
    frame: &Frame,
    instructions: &[DrawInstruction],
  ) -> Result<(), Self::Error> {
    let mut image = frame
      .to_rgb_image()
      .ok_or(SaveImageFileError::InvalidFrame(frame.width(), frame.height()))?;
    self.draw.draw_on_image(&mut image, instructions);
    self.save_image(image)
  }
}
