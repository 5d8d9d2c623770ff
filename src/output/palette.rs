// 该文件是 Shaowang （哨望） 项目的一部分。
// src/output/palette.rs - 类别调色板
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

/// 每个类别一种颜色，在色相环上均匀分布
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
  colors: Vec<[u8; 3]>,
}

impl Default for Palette {
  fn default() -> Self {
    Self::new(1)
  }
}

impl Palette {
  pub fn new(num_classes: usize) -> Self {
    let n = num_classes.max(1);
    let colors = (0..n)
      .map(|i| {
        let hue = (i as f32 / n as f32) * 360.0;
        hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();
    Self { colors }
  }

  pub fn color(&self, class_id: u32) -> [u8; 3] {
    self.colors[class_id as usize % self.colors.len()]
  }

  pub fn len(&self) -> usize {
    self.colors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.colors.is_empty()
  }
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  [
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_palette_is_deterministic_and_wraps() {
    let a = Palette::new(3);
    let b = Palette::new(3);
    assert_eq!(a, b);
    assert_eq!(a.len(), 3);
    assert_eq!(a.color(0), a.color(3));
    assert_ne!(a.color(0), a.color(1));
  }

  #[test]
  fn test_first_color_is_red_hue() {
    let palette = Palette::new(3);
    let [r, g, b] = palette.color(0);
    assert!(r > g && r > b);
  }

  #[test]
  fn test_zero_classes_still_has_a_color() {
    assert_eq!(Palette::new(0).len(), 1);
  }
}
