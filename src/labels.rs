// 该文件是 Mushu （木薯） 项目的一部分。
// src/labels.rs - 类别标签表
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

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// 木薯病害默认类别，顺序必须与模型类别编号一致
pub const CASSAVA_LABELS: [&str; 4] = [
  "Cassava Mosaic Disease",
  "Cassava Brown Streak Disease",
  "Cassava Green Mite",
  "Healthy",
];

#[derive(Error, Debug)]
pub enum LabelTableError {
  #[error("无法读取标签文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件解析失败: {0}")]
  ParseError(#[from] toml::de::Error),
  #[error("标签表为空")]
  Empty,
  #[error("标签表与模型类别数不匹配: 标签 {labels} 个, 模型类别 {classes} 个")]
  LabelTableMismatch { labels: usize, classes: usize },
}

#[derive(Deserialize)]
struct LabelFile {
  labels: Vec<String>,
}

/// 类别编号到名称的只读映射表，启动时构建，之后不再修改
#[derive(Debug, Clone)]
pub struct LabelTable {
  names: Vec<String>,
}

impl LabelTable {
  pub fn new(names: Vec<String>) -> Result<Self, LabelTableError> {
    if names.is_empty() {
      return Err(LabelTableError::Empty);
    }
    Ok(Self { names })
  }

  /// 内置的木薯病害标签表
  pub fn cassava() -> Self {
    Self {
      names: CASSAVA_LABELS.iter().map(|s| s.to_string()).collect(),
    }
  }

  /// 从 TOML 文本解析标签表
  pub fn from_toml_str(text: &str) -> Result<Self, LabelTableError> {
    let file: LabelFile = toml::from_str(text)?;
    Self::new(file.labels)
  }

  /// 从 TOML 文件加载标签表
  pub fn from_toml_file(path: &Path) -> Result<Self, LabelTableError> {
    let text = std::fs::read_to_string(path)?;
    let table = Self::from_toml_str(&text)?;
    info!("从 {} 加载 {} 个类别标签", path.display(), table.len());
    Ok(table)
  }

  /// 按类别编号查找名称，越界返回 None
  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(|s| s.as_str())
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 校验标签数量与模型类别数一致，不一致视为配置错误
  pub fn validate(&self, classes: usize) -> Result<(), LabelTableError> {
    if self.names.len() != classes {
      return Err(LabelTableError::LabelTableMismatch {
        labels: self.names.len(),
        classes,
      });
    }
    Ok(())
  }
}
