// 该文件是 Shaowang （哨望） 项目的一部分。
// src/output/overlay.rs - 检测框到像素坐标的绘制指令
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

use crate::model::Detection;

const LABEL_OFFSET: f32 = 5.0;

/// 原始帧像素坐标下的矩形，左上角加宽高
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl PixelRect {
  pub fn right(&self) -> f32 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f32 {
    self.y + self.height
  }
}

/// 一个检测结果的绘制指令：边框加上方的文字标签
#[derive(Debug, Clone, PartialEq)]
pub struct DrawInstruction {
  pub class_id: u32,
  pub confidence: f32,
  pub rect: PixelRect,
  pub text: String,
  /// 文字左上角
  pub text_anchor: (f32, f32),
}

/// 只计算绘制指令，不做实际渲染
#[derive(Debug, Clone, Copy)]
pub struct Overlay {
  label_offset: f32,
}

impl Default for Overlay {
  fn default() -> Self {
    Self {
      label_offset: LABEL_OFFSET,
    }
  }
}

impl Overlay {
  pub fn with_label_offset(mut self, label_offset: f32) -> Self {
    self.label_offset = label_offset;
    self
  }

  /// 把画面比例坐标映射到像素坐标，结果始终落在 `[0,W]×[0,H]` 内
  pub fn instructions(
    &self,
    detections: &[Detection],
    frame_width: u32,
    frame_height: u32,
  ) -> Vec<DrawInstruction> {
    let (fw, fh) = (frame_width as f32, frame_height as f32);

    detections
      .iter()
      .map(|det| {
        let w = det.bbox.width * fw;
        let h = det.bbox.height * fh;
        let left = det.bbox.cx * fw - w / 2.0;
        let top = det.bbox.cy * fh - h / 2.0;

        let x0 = left.clamp(0.0, fw);
        let y0 = top.clamp(0.0, fh);
        let x1 = (left + w).clamp(0.0, fw);
        let y1 = (top + h).clamp(0.0, fh);

        let rect = PixelRect {
          x: x0,
          y: y0,
          width: (x1 - x0).max(0.0),
          height: (y1 - y0).max(0.0),
        };

        DrawInstruction {
          class_id: det.class_id,
          confidence: det.confidence,
          rect,
          text: format!("{} {:.2}", det.label, det.confidence),
          text_anchor: (x0, (y0 - self.label_offset).max(0.0)),
        }
      })
      .collect()
  }
}
