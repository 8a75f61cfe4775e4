// 该文件是 Mushu （木薯） 项目的一部分。
// src/pipeline.rs - 检测流水线
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

use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::detector::{DetectionResult, Detector, DetectorError, validate_threshold};
use crate::labels::{LabelTable, LabelTableError};
use crate::output::Visualizer;

#[derive(Error, Debug)]
pub enum PipelineError {
  /// 类别编号在标签表中无对应项，说明标签表与模型不匹配
  #[error("未知类别编号: {0}")]
  UnknownClassId(usize),
  #[error(transparent)]
  Detector(#[from] DetectorError),
}

/// 单条检测摘要
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryEntry {
  pub label: String,
  pub confidence: f32,
}

/// 将检测结果逐条映射为 (标签, 置信度) 摘要，保持输入顺序
///
/// 类别编号查不到标签时立刻报错，绝不悄悄替换为占位名称。
pub fn summarize(
  result: &DetectionResult,
  labels: &LabelTable,
) -> Result<Vec<SummaryEntry>, PipelineError> {
  result
    .detections
    .iter()
    .map(|detection| {
      let label = labels
        .get(detection.class_id)
        .ok_or(PipelineError::UnknownClassId(detection.class_id))?;
      Ok(SummaryEntry {
        label: label.to_string(),
        confidence: detection.confidence,
      })
    })
    .collect()
}

/// 从图像到 (标注图, 摘要列表) 的流水线
///
/// 检测器与标签表在组装后只读，可在并发调用间共享。
#[derive(Debug)]
pub struct Pipeline<D> {
  detector: D,
  labels: LabelTable,
  visualizer: Visualizer,
}

impl<D: Detector> Pipeline<D> {
  /// 组装流水线，并校验标签表与模型类别数一致
  ///
  /// 不一致立即以 `LabelTableMismatch` 失败，不推迟到运行时的
  /// `UnknownClassId`。
  pub fn new(detector: D, labels: LabelTable) -> Result<Self, LabelTableError> {
    labels.validate(detector.class_count())?;
    let visualizer = Visualizer::new(labels.len());
    Ok(Self {
      detector,
      labels,
      visualizer,
    })
  }

  pub fn with_visualizer(mut self, visualizer: Visualizer) -> Self {
    self.visualizer = visualizer;
    self
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  /// 处理一张图像：校验阈值、推理、过滤、标注并生成摘要
  ///
  /// 摘要为空表示“阈值以上无目标”，是正常结果而非错误。
  pub fn process(
    &self,
    image: &RgbImage,
    confidence_threshold: f32,
  ) -> Result<(RgbImage, Vec<SummaryEntry>), PipelineError> {
    // 阈值在调用检测器之前校验，非法阈值不触发任何推理
    validate_threshold(confidence_threshold)?;

    let mut result = self.detector.detect(image, confidence_threshold)?;

    // 不信任后端的边界语义，这里统一保证 >= 阈值（含端点）
    result
      .detections
      .retain(|detection| detection.confidence >= confidence_threshold);
    debug!(
      "图像 {}x{}, 阈值 {} 以上的检测: {} 个",
      result.image_width,
      result.image_height,
      confidence_threshold,
      result.len()
    );

    let entries = summarize(&result, &self.labels)?;
    let annotated = self
      .visualizer
      .annotate(image, &result.detections, &entries);

    Ok((annotated, entries))
  }
}
