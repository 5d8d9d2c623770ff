// 该文件是 Shaowang （哨望） 项目的一部分。
// src/model/label.rs - 类别标签表
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

/// 火焰与枪械检测模型的默认类别
pub const THREAT_LABELS: [&str; 3] = ["Gun", "Fire", "Rifle"];

#[derive(Error, Debug)]
pub enum LabelSetError {
  #[error("标签文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签表为空")]
  Empty,
  #[error("重复的标签: {0}")]
  Duplicate(String),
}

/// 从 0 开始连续编号的类别标签表，顺序与模型输出一致
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
  names: Vec<String>,
}

impl Default for LabelSet {
  fn default() -> Self {
    Self {
      names: THREAT_LABELS.iter().map(|s| s.to_string()).collect(),
    }
  }
}

impl LabelSet {
  pub fn from_names<I, S>(names: I) -> Result<Self, LabelSetError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut list: Vec<String> = Vec::new();
    for name in names {
      let name = name.into();
      if list.contains(&name) {
        return Err(LabelSetError::Duplicate(name));
      }
      list.push(name);
    }
    if list.is_empty() {
      return Err(LabelSetError::Empty);
    }
    Ok(Self { names: list })
  }

  /// 每行一个标签，忽略空行与 `#` 开头的注释
  pub fn parse(text: &str) -> Result<Self, LabelSetError> {
    Self::from_names(
      text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#')),
    )
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelSetError> {
    let text = std::fs::read_to_string(path)?;
    Self::parse(&text)
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(String::as_str)
  }

  pub fn contains(&self, label: &str) -> bool {
    self.names.iter().any(|name| name == label)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}
