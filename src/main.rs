// 该文件是 Shaowang （哨望） 项目的一部分。
// src/main.rs - 项目主程序
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

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::info;
use url::Url;

use shaowang::{
  FromUrl,
  args::{Args, Command, CommonArgs},
  input::InputWrapper,
  model::{EngineBundle, ReplayEngine},
  output::{OutputWrapper, Palette},
  task::{BenchmarkTask, Cancellation, PipelineLoop},
};

fn prepare(common: &CommonArgs, max_frames: Option<usize>) -> Result<(PipelineLoop<ReplayEngine>, Palette)> {
  info!("推理引擎: {}", common.model);
  info!("输入来源: {}", common.input);

  let config = common.to_config(max_frames)?;
  config.validate()?;

  let engine = ReplayEngine::from_url(&common.model)?;
  let bundle = EngineBundle::new(engine, config.layout, config.labels.clone());
  let pipeline = config.build(bundle.adapter)?;
  Ok((pipeline, bundle.palette))
}

fn watch(common: &CommonArgs, output: &Url, max_frames: Option<usize>) -> Result<()> {
  let (mut pipeline, palette) = prepare(common, max_frames)?;
  info!("输出目标: {}", output);

  let input = InputWrapper::from_url(&common.input)?;
  let output = OutputWrapper::from_url(output)?.with_palette(palette);
  let mut cancel = Cancellation::ctrlc()?;

  let summary = pipeline.run(input, &output, &mut cancel)?;
  info!("共处理 {} 帧, 命中 {} 个目标", summary.processed, summary.detections);
  Ok(())
}

fn bench(common: &CommonArgs, repeat: usize) -> Result<()> {
  let (mut pipeline, _palette) = prepare(common, None)?;

  let mut input = InputWrapper::from_url(&common.input)?;
  let frame = input.next().ok_or_else(|| anyhow!("输入中没有可用的帧"))?;

  let report = BenchmarkTask::default()
    .with_repeat(repeat)
    .run_task(&mut pipeline, &frame)?;
  for det in &report.detections {
    info!(
      "检测到: {} {:.2} @ ({:.3}, {:.3}, {:.3}, {:.3})",
      det.label, det.confidence, det.bbox.cx, det.bbox.cy, det.bbox.width, det.bbox.height
    );
  }
  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  match &args.command {
    Command::Watch {
      common,
      output,
      max_frames,
    } => watch(common, output, *max_frames),
    Command::Bench { common, repeat } => bench(common, *repeat),
  }
}
