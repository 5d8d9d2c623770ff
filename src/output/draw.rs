// 该文件是 Shaowang （哨望） 项目的一部分。
// src/output/draw.rs - 绘制指令的可视化
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::output::{DrawInstruction, Palette};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 18.0;
const LABEL_TEXT_HEIGHT: i32 = 20;
const LABEL_CHAR_WIDTH: f32 = 10.0; // 每字符平均宽度（粗略估计）
const BOX_THICKNESS: i32 = 2;

#[derive(Error, Debug)]
pub enum FontError {
  #[error("字体文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效")]
  InvalidFont,
}

pub struct Draw {
  palette: Palette,
  font: Option<FontArc>,
  font_size: f32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      palette: Palette::default(),
      font: None,
      font_size: LABEL_FONT_SIZE,
    }
  }
}

impl Draw {
  pub fn with_palette(mut self, palette: Palette) -> Self {
    self.palette = palette;
    self
  }

  /// 没有字体时只画边框和标签底色，不画文字
  pub fn with_font_file(mut self, path: impl AsRef<Path>) -> Result<Self, FontError> {
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data).map_err(|_| FontError::InvalidFont)?;
    self.font = Some(font);
    Ok(self)
  }

  pub fn draw_on_image(&self, image: &mut RgbImage, instructions: &[DrawInstruction]) {
    for ins in instructions {
      self.draw_instruction(image, ins);
    }
  }

  fn draw_instruction(&self, image: &mut RgbImage, ins: &DrawInstruction) {
    let (img_w, img_h) = (image.width() as i32, image.height() as i32);
    let color = Rgb(self.palette.color(ins.class_id));

    let x = (ins.rect.x.floor() as i32).clamp(0, img_w - 1);
    let y = (ins.rect.y.floor() as i32).clamp(0, img_h - 1);
    let right = (ins.rect.right().ceil() as i32).clamp(0, img_w);
    let bottom = (ins.rect.bottom().ceil() as i32).clamp(0, img_h);

    // 加粗边框
    for t in 0..BOX_THICKNESS {
      let width = right - x - 2 * t;
      let height = bottom - y - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x + t, y + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    let text_x = (ins.text_anchor.0 as i32).clamp(0, img_w - 1);
    // 标签底色放在锚点上方，贴着画面顶边时下移
    let text_y = (ins.text_anchor.1 as i32 - LABEL_TEXT_HEIGHT).max(0);
    let text_width = ((ins.text.len() as f32 * LABEL_CHAR_WIDTH) as i32).min(img_w - text_x);
    let text_height = LABEL_TEXT_HEIGHT.min(img_h - text_y);
    if text_width <= 0 || text_height <= 0 {
      return;
    }

    let background = Rect::at(text_x, text_y).of_size(text_width as u32, text_height as u32);
    draw_filled_rect_mut(image, background, color);

    if let Some(font) = &self.font {
      draw_text_mut(
        image,
        Rgb([255u8, 255u8, 255u8]),
        text_x,
        text_y,
        PxScale::from(self.font_size),
        font,
        &ins.text,
      );
    }
  }
}
