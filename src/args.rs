// 该文件是 Shaowang （哨望） 项目的一部分。
// src/args.rs - 命令行参数
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

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use url::Url;

use crate::{
  config::{DEFAULT_CONFIDENCE_THRESHOLD, PipelineConfig},
  model::{DecoderConfig, LabelSet, LabelSetError, OutputLayout, RowConfidence},
  preprocess::DEFAULT_SCALE,
};

/// 哨望：视频流危险目标检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 持续处理输入流，直到流结束或收到中断信号
  Watch {
    #[command(flatten)]
    common: CommonArgs,
    /// 输出目标
    /// - log://           以日志形式输出
    /// - image:///a.png   保存最新一帧的标注结果，可加 ?font=/path/font.ttf
    #[arg(long, value_name = "OUTPUT", default_value = "log://")]
    output: Url,
    /// 最大处理帧数，不指定表示无限制
    #[arg(long, value_name = "COUNT")]
    max_frames: Option<usize>,
  },
  /// 在输入的第一帧上重复推理，统计平均耗时
  Bench {
    #[command(flatten)]
    common: CommonArgs,
    /// 重复次数
    #[arg(long, default_value = "100", value_name = "COUNT")]
    repeat: usize,
  },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutArg {
  /// `[batch, class, conf, cx, cy, w, h]` 元组
  Tuples,
  /// `[cx, cy, w, h, objectness, scores...]` 行
  Rows,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowConfidenceArg {
  ClassScore,
  Objectness,
  ObjectnessTimesClass,
}

impl From<RowConfidenceArg> for RowConfidence {
  fn from(arg: RowConfidenceArg) -> Self {
    match arg {
      RowConfidenceArg::ClassScore => RowConfidence::ClassScore,
      RowConfidenceArg::Objectness => RowConfidence::Objectness,
      RowConfidenceArg::ObjectnessTimesClass => RowConfidence::ObjectnessTimesClass,
    }
  }
}

#[derive(clap::Args, Debug, Clone)]
pub struct CommonArgs {
  /// 推理引擎，例如 replay:///data/recording.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源
  /// - image:///a.jpg        单张图片
  /// - frames:///dir?loop     目录中的图片序列
  /// - v4l:///dev/video0      V4L2 摄像头（需 v4l_input 特性）
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 标签文件，每行一个标签；不指定时使用内置的 Gun/Fire/Rifle
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)，严格大于该值才会上报
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub threshold: f32,

  /// 关注的标签，逗号分隔；不指定时关注全部标签
  #[arg(long, value_delimiter = ',', value_name = "LABELS")]
  pub accept: Option<Vec<String>>,

  /// 模型输出排布
  #[arg(long, value_enum, default_value_t = LayoutArg::Tuples)]
  pub layout: LayoutArg,

  /// 行排布下的置信度取法
  #[arg(long, value_enum, default_value_t = RowConfidenceArg::ClassScore)]
  pub row_confidence: RowConfidenceArg,

  /// 行排布下的目标性阈值
  #[arg(long, default_value_t = 0.5, value_name = "THRESHOLD")]
  pub objectness_threshold: f32,

  /// 元组排布下的置信度下限
  #[arg(long, default_value_t = 0.0, value_name = "FLOOR")]
  pub score_floor: f32,

  /// 像素缩放系数
  #[arg(long, default_value_t = DEFAULT_SCALE, value_name = "SCALE")]
  pub scale: f32,

  /// 交换 R/B 通道
  #[arg(long)]
  pub swap_rb: bool,
}

impl CommonArgs {
  pub fn label_set(&self) -> Result<LabelSet, LabelSetError> {
    match &self.labels {
      Some(path) => LabelSet::from_file(path),
      None => Ok(LabelSet::default()),
    }
  }

  /// 组装配置，尚未校验
  pub fn to_config(&self, frame_limit: Option<usize>) -> Result<PipelineConfig, LabelSetError> {
    let labels = self.label_set()?;
    let layout = match self.layout {
      LayoutArg::Tuples => OutputLayout::Tuples,
      LayoutArg::Rows => OutputLayout::Rows {
        num_classes: labels.len(),
      },
    };

    let mut config = PipelineConfig::new(labels, layout);
    config.decoder = DecoderConfig {
      score_floor: self.score_floor,
      objectness_threshold: self.objectness_threshold,
      row_confidence: self.row_confidence.into(),
    };
    config.confidence_threshold = self.threshold;
    if let Some(accept) = &self.accept {
      config.accepted_labels = accept.iter().map(|s| s.trim().to_string()).collect();
    }
    config.scale = self.scale;
    config.swap_rb = self.swap_rb;
    config.frame_limit = frame_limit;
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_watch() {
    let args = Args::try_parse_from([
      "shaowang",
      "watch",
      "--model",
      "replay:///tmp/rec.json",
      "--input",
      "frames:///tmp/clip",
      "--accept",
      "Fire,Gun",
      "--threshold",
      "0.75",
      "--max-frames",
      "10",
    ])
    .unwrap();

    let Command::Watch {
      common,
      output,
      max_frames,
    } = args.command
    else {
      panic!("expected watch");
    };
    assert_eq!(output.scheme(), "log");
    assert_eq!(max_frames, Some(10));

    let config = common.to_config(max_frames).unwrap();
    assert_eq!(config.accepted_labels, vec!["Fire", "Gun"]);
    assert_eq!(config.confidence_threshold, 0.75);
    assert_eq!(config.layout, OutputLayout::Tuples);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_rows_layout_uses_label_count() {
    let args = Args::try_parse_from([
      "shaowang",
      "bench",
      "--model",
      "replay:///tmp/rec.json",
      "--input",
      "image:///tmp/a.png",
      "--layout",
      "rows",
      "--row-confidence",
      "objectness-times-class",
    ])
    .unwrap();

    let Command::Bench { common, repeat } = args.command else {
      panic!("expected bench");
    };
    assert_eq!(repeat, 100);
    let config = common.to_config(None).unwrap();
    assert_eq!(config.layout, OutputLayout::Rows { num_classes: 3 });
    assert_eq!(
      config.decoder.row_confidence,
      RowConfidence::ObjectnessTimesClass
    );
  }
}
