// 该文件是 Shaowang （哨望） 项目的一部分。
// src/task.rs - 帧处理循环
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
  sync::mpsc::{self, Receiver, Sender},
  thread,
  time::{Duration, Instant},
};
use tracing::{debug, info, warn};

use crate::{
  error::{DecodeSkip, PipelineError},
  filter::FilterPolicy,
  frame::{Frame, Tensor},
  model::{Detection, DetectionDecoder, Engine, InferenceAdapter},
  output::{DrawInstruction, Overlay, Render},
  preprocess::FrameNormalizer,
};

const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);
const BENCHMARK_WARMUP: usize = 2;

/// 停止请求，每次循环开始时检查一次
pub struct Cancellation {
  rx: Option<Receiver<()>>,
  requested: bool,
}

impl Cancellation {
  /// 永不触发
  pub fn never() -> Self {
    Self {
      rx: None,
      requested: false,
    }
  }

  pub fn channel() -> (Sender<()>, Self) {
    let (tx, rx) = mpsc::channel();
    (
      tx,
      Self {
        rx: Some(rx),
        requested: false,
      },
    )
  }

  /// 安装 Ctrl-C 处理器；中断后 30 秒仍未退出则强制结束进程
  pub fn ctrlc() -> Result<Self, ctrlc::Error> {
    let (tx, cancel) = Self::channel();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(FORCE_EXIT_AFTER);
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;
    Ok(cancel)
  }

  pub fn is_requested(&mut self) -> bool {
    if !self.requested {
      if let Some(rx) = &self.rx {
        self.requested = rx.try_recv().is_ok();
      }
    }
    self.requested
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
  Cancelled,
  EndOfStream,
  FrameLimit,
  Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
  Idle,
  Running,
  Terminated(Termination),
}

/// 单帧处理结果
#[derive(Debug, Clone)]
pub struct FrameReport {
  pub candidates: usize,
  pub skipped: Vec<DecodeSkip>,
  pub accepted: Vec<Detection>,
  pub instructions: Vec<DrawInstruction>,
  pub infer_time: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
  Processed {
    candidates: usize,
    skipped: Vec<DecodeSkip>,
    accepted: usize,
  },
  Dropped {
    reason: String,
  },
}

/// 每帧结束时发出的唯一一条观测事件
#[derive(Debug, Clone)]
pub struct FrameEvent {
  pub index: u64,
  pub outcome: FrameOutcome,
  pub infer_time: Duration,
  pub total_time: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
  pub frames: usize,
  pub processed: usize,
  pub dropped: usize,
  pub detections: usize,
  pub skipped_candidates: usize,
  pub termination: Termination,
}

pub trait FrameObserver {
  fn on_frame(&mut self, event: &FrameEvent);
  fn on_terminate(&mut self, _summary: &RunSummary) {}
}

/// 用 tracing 输出每帧事件
#[derive(Debug, Default)]
pub struct TracingObserver;

impl FrameObserver for TracingObserver {
  fn on_frame(&mut self, event: &FrameEvent) {
    match &event.outcome {
      FrameOutcome::Processed {
        candidates,
        skipped,
        accepted,
      } => {
        info!(
          "第 {} 帧: 候选 {}, 跳过 {}, 命中 {}, 推理 {:.2?} / 总计 {:.2?}",
          event.index,
          candidates,
          skipped.len(),
          accepted,
          event.infer_time,
          event.total_time
        );
        if !skipped.is_empty() {
          debug!("第 {} 帧跳过的候选框: {:?}", event.index, skipped);
        }
      }
      FrameOutcome::Dropped { reason } => warn!("第 {} 帧被丢弃: {}", event.index, reason),
    }
  }

  fn on_terminate(&mut self, summary: &RunSummary) {
    info!(
      "任务结束 ({:?}): 共 {} 帧, 处理 {}, 丢弃 {}, 命中 {}",
      summary.termination, summary.frames, summary.processed, summary.dropped, summary.detections
    );
  }
}

#[derive(Debug, Default)]
pub struct NullObserver;

impl FrameObserver for NullObserver {
  fn on_frame(&mut self, _event: &FrameEvent) {}
}

/// 预处理、推理、解码、筛选、绘制指令，逐帧同步执行
pub struct PipelineLoop<E, O = TracingObserver> {
  normalizer: FrameNormalizer,
  adapter: InferenceAdapter<E>,
  decoder: DetectionDecoder,
  policy: FilterPolicy,
  overlay: Overlay,
  observer: O,
  tensor: Tensor,
  frame_limit: Option<usize>,
  state: LoopState,
}

impl<E: Engine> PipelineLoop<E, TracingObserver> {
  /// 模型输入尺寸取自引擎声明的输入形状
  pub fn new(adapter: InferenceAdapter<E>, decoder: DetectionDecoder, policy: FilterPolicy) -> Self {
    let [_, _, height, width] = adapter.input_shape();
    let normalizer = FrameNormalizer::new(width as u32, height as u32);
    let tensor = normalizer.allocate();
    Self {
      normalizer,
      adapter,
      decoder,
      policy,
      overlay: Overlay::default(),
      observer: TracingObserver,
      tensor,
      frame_limit: None,
      state: LoopState::Idle,
    }
  }
}

impl<E: Engine, O: FrameObserver> PipelineLoop<E, O> {
  pub fn with_observer<O2: FrameObserver>(self, observer: O2) -> PipelineLoop<E, O2> {
    PipelineLoop {
      normalizer: self.normalizer,
      adapter: self.adapter,
      decoder: self.decoder,
      policy: self.policy,
      overlay: self.overlay,
      observer,
      tensor: self.tensor,
      frame_limit: self.frame_limit,
      state: self.state,
    }
  }

  pub fn scale(mut self, scale: f32) -> Self {
    self.normalizer = self.normalizer.scale(scale);
    self
  }

  pub fn swap_rb(mut self, swap_rb: bool) -> Self {
    self.normalizer = self.normalizer.swap_rb(swap_rb);
    self
  }

  pub fn overlay(mut self, overlay: Overlay) -> Self {
    self.overlay = overlay;
    self
  }

  pub fn frame_limit(mut self, frame_limit: Option<usize>) -> Self {
    self.frame_limit = frame_limit;
    self
  }

  pub fn state(&self) -> LoopState {
    self.state
  }

  pub fn observer(&self) -> &O {
    &self.observer
  }

  pub fn tensor(&self) -> &Tensor {
    &self.tensor
  }

  /// 处理一帧。张量缓冲区在各帧之间复用并原地覆盖。
  pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameReport, PipelineError> {
    self.normalizer.normalize_into(frame, &mut self.tensor)?;

    let now = Instant::now();
    let raw = self.adapter.infer(&self.tensor)?;
    let infer_time = now.elapsed();

    let decoded = self.decoder.decode(&raw);
    let candidates = decoded.detections.len();
    let skipped = decoded.skipped;

    let accepted = self.policy.apply(decoded.detections);
    let instructions = self
      .overlay
      .instructions(&accepted, frame.width(), frame.height());

    Ok(FrameReport {
      candidates,
      skipped,
      accepted,
      instructions,
      infer_time,
    })
  }

  pub fn run<I, R>(
    &mut self,
    input: I,
    output: &R,
    cancel: &mut Cancellation,
  ) -> Result<RunSummary, PipelineError>
  where
    I: IntoIterator<Item = Frame>,
    R: Render,
    R::Error: std::error::Error + Send + Sync + 'static,
  {
    info!("开始任务...");
    self.state = LoopState::Running;
    let mut summary = RunSummary {
      frames: 0,
      processed: 0,
      dropped: 0,
      detections: 0,
      skipped_candidates: 0,
      termination: Termination::EndOfStream,
    };
    let mut frames = input.into_iter();

    let termination = loop {
      if cancel.is_requested() {
        warn!("中断信号接收，退出任务循环");
        break Termination::Cancelled;
      }
      if self.frame_limit.is_some_and(|n| summary.frames >= n) {
        info!("达到指定帧数 {}, 退出任务循环", summary.frames);
        break Termination::FrameLimit;
      }
      let Some(frame) = frames.next() else {
        info!("输入流结束");
        break Termination::EndOfStream;
      };
      summary.frames += 1;

      let started = Instant::now();
      let result = self.process_frame(&frame).and_then(|report| {
        output
          .render_result(&frame, &report.instructions)
          .map_err(|e| PipelineError::Render(Box::new(e)))?;
        Ok(report)
      });

      let (outcome, infer_time) = match result {
        Ok(report) => {
          summary.processed += 1;
          summary.detections += report.accepted.len();
          summary.skipped_candidates += report.skipped.len();
          (
            FrameOutcome::Processed {
              candidates: report.candidates,
              skipped: report.skipped,
              accepted: report.accepted.len(),
            },
            report.infer_time,
          )
        }
        Err(e) if e.is_recoverable() => {
          summary.dropped += 1;
          (
            FrameOutcome::Dropped {
              reason: e.to_string(),
            },
            Duration::ZERO,
          )
        }
        Err(e) => {
          summary.termination = Termination::Fatal;
          self.state = LoopState::Terminated(Termination::Fatal);
          self.observer.on_terminate(&summary);
          return Err(e);
        }
      };

      self.observer.on_frame(&FrameEvent {
        index: frame.index(),
        outcome,
        infer_time,
        total_time: started.elapsed(),
      });
    };

    summary.termination = termination;
    self.state = LoopState::Terminated(termination);
    self.observer.on_terminate(&summary);
    Ok(summary)
  }
}

#[derive(Debug, Clone)]
pub struct BenchmarkReport {
  pub runs: usize,
  pub mean: Duration,
  pub min: Duration,
  pub max: Duration,
  pub detections: Vec<Detection>,
}

/// 在同一帧上重复执行预处理、推理与解码，统计平均耗时
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkTask {
  repeat: usize,
}

impl Default for BenchmarkTask {
  fn default() -> Self {
    Self { repeat: 100 }
  }
}

impl BenchmarkTask {
  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.repeat = repeat.max(1);
    self
  }

  pub fn run_task<E: Engine, O: FrameObserver>(
    self,
    pipeline: &mut PipelineLoop<E, O>,
    frame: &Frame,
  ) -> Result<BenchmarkReport, PipelineError> {
    info!("开始基准测试, 重复 {} 次", self.repeat);
    let mut times = Vec::with_capacity(self.repeat);
    let mut detections = Vec::new();
    for i in 0..self.repeat {
      let now = Instant::now();
      let report = pipeline.process_frame(frame)?;
      let elapsed = now.elapsed();
      debug!("({}) 处理完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      detections = report.accepted;
    }

    // 前两次为预热，不计入统计
    let measured = if times.len() > BENCHMARK_WARMUP {
      &times[BENCHMARK_WARMUP..]
    } else {
      &times[..]
    };
    let mean = measured.iter().sum::<Duration>() / measured.len() as u32;
    let min = measured.iter().copied().min().unwrap_or_default();
    let max = measured.iter().copied().max().unwrap_or_default();
    warn!("平均处理时间: {:.2?} (最短 {:.2?}, 最长 {:.2?})", mean, min, max);

    Ok(BenchmarkReport {
      runs: self.repeat,
      mean,
      min,
      max,
      detections,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    frame::ChannelOrder,
    model::{DecoderConfig, LabelSet, OutputLayout, tests::MockEngine},
  };
  use std::cell::RefCell;

  #[derive(Default)]
  struct Recorder {
    events: Vec<FrameEvent>,
    summaries: Vec<RunSummary>,
  }

  impl FrameObserver for Recorder {
    fn on_frame(&mut self, event: &FrameEvent) {
      self.events.push(event.clone());
    }

    fn on_terminate(&mut self, summary: &RunSummary) {
      self.summaries.push(*summary);
    }
  }

  #[derive(Default)]
  struct Collect {
    rendered: RefCell<Vec<Vec<DrawInstruction>>>,
  }

  #[derive(Debug, thiserror::Error)]
  #[error("never")]
  struct Never;

  impl Render for Collect {
    type Error = Never;

    fn render_result(
      &self,
      _frame: &Frame,
      instructions: &[DrawInstruction],
    ) -> Result<(), Self::Error> {
      self.rendered.borrow_mut().push(instructions.to_vec());
      Ok(())
    }
  }

  fn pipeline(shape: [usize; 4], output: Vec<f32>) -> PipelineLoop<MockEngine, Recorder> {
    let engine = MockEngine::new(shape, vec![output]);
    let adapter = InferenceAdapter::new(engine, OutputLayout::Tuples);
    let labels = LabelSet::from_names(["Gun", "Fire"]).unwrap();
    let decoder = DetectionDecoder::new(labels, DecoderConfig::default());
    PipelineLoop::new(adapter, decoder, FilterPolicy::new(0.75, ["Fire"]))
      .with_observer(Recorder::default())
  }

  fn frame(index: u64) -> Frame {
    Frame::new(8, 8, ChannelOrder::Bgr, vec![100; 192]).with_index(index)
  }

  fn empty(index: u64) -> Frame {
    Frame::new(0, 0, ChannelOrder::Bgr, Vec::new()).with_index(index)
  }

  const FIRE: [f32; 7] = [0.0, 1.0, 0.9, 0.5, 0.5, 0.2, 0.2];

  #[test]
  fn test_process_frame_end_to_end() {
    let mut pipeline = pipeline([1, 3, 4, 4], FIRE.to_vec());
    let report = pipeline.process_frame(&frame(0)).unwrap();
    assert_eq!(report.candidates, 1);
    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.accepted[0].label, "Fire");
    let rect = report.instructions[0].rect;
    assert!((rect.x - 3.2).abs() < 1e-4);
    assert!((rect.width - 1.6).abs() < 1e-4);
  }

  #[test]
  fn test_skip_reasons_reach_observer() {
    let mut output = FIRE.to_vec();
    output.extend([0.0, 5.0, 0.9, 0.5, 0.5, 0.2, 0.2, 0.0, 0.0]);
    let mut pipeline = pipeline([1, 3, 4, 4], output);
    let summary = pipeline
      .run(vec![frame(0)], &Collect::default(), &mut Cancellation::never())
      .unwrap();
    assert_eq!(summary.skipped_candidates, 2);

    let events = &pipeline.observer().events;
    assert_eq!(events.len(), 1);
    assert_eq!(
      events[0].outcome,
      FrameOutcome::Processed {
        candidates: 1,
        skipped: vec![
          DecodeSkip::ClassOutOfRange {
            class_id: 5,
            num_classes: 2
          },
          DecodeSkip::Truncated(2),
        ],
        accepted: 1,
      }
    );
  }

  #[test]
  fn test_run_skips_bad_frames_and_continues() {
    let mut pipeline = pipeline([1, 3, 4, 4], FIRE.to_vec());
    let output = Collect::default();
    let mut cancel = Cancellation::never();
    let tensor_len = pipeline.tensor().len();

    let summary = pipeline
      .run(vec![frame(0), empty(1), frame(2)], &output, &mut cancel)
      .unwrap();

    assert_eq!(summary.frames, 3);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.detections, 2);
    assert_eq!(summary.termination, Termination::EndOfStream);
    assert_eq!(pipeline.state(), LoopState::Terminated(Termination::EndOfStream));
    assert_eq!(pipeline.tensor().len(), tensor_len);
    assert_eq!(output.rendered.borrow().len(), 2);

    let events = &pipeline.observer().events;
    assert_eq!(events.len(), 3);
    assert!(matches!(events[1].outcome, FrameOutcome::Dropped { .. }));
    assert_eq!(events[2].index, 2);
    assert_eq!(pipeline.observer().summaries.len(), 1);
  }

  #[test]
  fn test_shape_mismatch_terminates_run() {
    let mut pipeline = pipeline([2, 3, 4, 4], FIRE.to_vec());
    let output = Collect::default();
    let mut cancel = Cancellation::never();
    let err = pipeline
      .run(vec![frame(0), frame(1)], &output, &mut cancel)
      .unwrap_err();
    assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    assert_eq!(pipeline.state(), LoopState::Terminated(Termination::Fatal));
    assert!(output.rendered.borrow().is_empty());
  }

  #[test]
  fn test_cancellation_checked_between_frames() {
    let mut pipeline = pipeline([1, 3, 4, 4], FIRE.to_vec());
    let output = Collect::default();
    let (tx, mut cancel) = Cancellation::channel();
    tx.send(()).unwrap();
    let summary = pipeline
      .run(vec![frame(0), frame(1)], &output, &mut cancel)
      .unwrap();
    assert_eq!(summary.frames, 0);
    assert_eq!(summary.termination, Termination::Cancelled);
    // 请求一旦收到就保持
    assert!(cancel.is_requested());
  }

  #[test]
  fn test_frame_limit() {
    let mut pipeline = pipeline([1, 3, 4, 4], FIRE.to_vec()).frame_limit(Some(2));
    let output = Collect::default();
    let mut cancel = Cancellation::never();
    let frames = (0..10).map(frame);
    let summary = pipeline.run(frames, &output, &mut cancel).unwrap();
    assert_eq!(summary.frames, 2);
    assert_eq!(summary.termination, Termination::FrameLimit);
  }

  #[test]
  fn test_benchmark_reports_mean() {
    let mut pipeline = pipeline([1, 3, 4, 4], FIRE.to_vec());
    let report = BenchmarkTask::default()
      .with_repeat(5)
      .run_task(&mut pipeline, &frame(0))
      .unwrap();
    assert_eq!(report.runs, 5);
    assert!(report.min <= report.mean && report.mean <= report.max);
    assert_eq!(report.detections.len(), 1);
  }
}
