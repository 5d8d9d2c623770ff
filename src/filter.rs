// 该文件是 Shaowang （哨望） 项目的一部分。
// src/filter.rs - 检测结果筛选策略
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

use std::collections::HashSet;

use crate::model::Detection;

/// 置信度阈值加关注标签白名单，一次运行内不变
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPolicy {
  confidence_threshold: f32,
  accepted_labels: HashSet<String>,
}

impl FilterPolicy {
  pub fn new<I, S>(confidence_threshold: f32, accepted_labels: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      confidence_threshold,
      accepted_labels: accepted_labels.into_iter().map(Into::into).collect(),
    }
  }

  pub fn confidence_threshold(&self) -> f32 {
    self.confidence_threshold
  }

  pub fn accepted_labels(&self) -> &HashSet<String> {
    &self.accepted_labels
  }

  /// 置信度严格大于阈值，且标签在白名单内
  pub fn accepts(&self, detection: &Detection) -> bool {
    detection.confidence > self.confidence_threshold
      && self.accepted_labels.contains(&detection.label)
  }

  /// 只做选择，不修改检测结果，保持输入顺序
  pub fn apply(&self, candidates: Vec<Detection>) -> Vec<Detection> {
    candidates.into_iter().filter(|d| self.accepts(d)).collect()
  }
}
