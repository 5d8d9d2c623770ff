// 该文件是 Shaowang （哨望） 项目的一部分。
// src/output/log_output.rs - 以日志形式输出检测结果
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

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  output::{DrawInstruction, Render},
};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 不绘图，只把每帧的绘制指令写进日志
pub struct LogOutput {
  quiet: bool,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch(url.scheme().to_string()));
    }
    // log://?quiet 只输出有目标的帧
    let quiet = url.query_pairs().any(|(k, _)| k == "quiet");
    Ok(LogOutput { quiet })
  }
}

impl Render for LogOutput {
  type Error = LogOutputError;

  fn render_result(
    &self,
    frame: &Frame,
    instructions: &[DrawInstruction],
  ) -> Result<(), Self::Error> {
    if instructions.is_empty() {
      if !self.quiet {
        info!("帧 {}: 未发现目标", frame.index());
      }
      return Ok(());
    }

    warn!(
      "帧 {} ({}x{}): 发现 {} 个目标",
      frame.index(),
      frame.width(),
      frame.height(),
      instructions.len()
    );
    for ins in instructions {
      warn!(
        "  - {} at ({:.0}, {:.0}, {:.0}x{:.0})",
        ins.text, ins.rect.x, ins.rect.y, ins.rect.width, ins.rect.height
      );
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{frame::ChannelOrder, output::PixelRect};

  fn frame() -> Frame {
    Frame::new(4, 4, ChannelOrder::Rgb, vec![0; 48]).with_index(7)
  }

  #[test]
  fn test_quiet_flag_from_query() {
    let output = LogOutput::from_url(&Url::parse("log://").unwrap()).unwrap();
    assert!(!output.quiet);
    let output = LogOutput::from_url(&Url::parse("log://?quiet").unwrap()).unwrap();
    assert!(output.quiet);
    assert!(matches!(
      LogOutput::from_url(&Url::parse("image:///tmp/a.png").unwrap()),
      Err(LogOutputError::SchemeMismatch(s)) if s == "image"
    ));
  }

  #[test]
  fn test_renders_with_and_without_instructions() {
    let instruction = DrawInstruction {
      class_id: 1,
      confidence: 0.9,
      rect: PixelRect {
        x: 1.0,
        y: 1.0,
        width: 2.0,
        height: 2.0,
      },
      text: "Fire 0.90".to_string(),
      text_anchor: (1.0, 0.0),
    };

    for quiet in [false, true] {
      let output = LogOutput { quiet };
      assert!(output.render_result(&frame(), &[]).is_ok());
      assert!(
        output
          .render_result(&frame(), std::slice::from_ref(&instruction))
          .is_ok()
      );
    }
  }
}
