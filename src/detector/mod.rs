// 该文件是 Mushu （木薯） 项目的一部分。
// src/detector/mod.rs - 检测器定义
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

mod onnx;

pub use onnx::OnnxDetector;

use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("模型不可用: {0}")]
  ModelUnavailable(String),
  #[error("无效图像: {0}")]
  InvalidImage(String),
  #[error("置信度阈值 {0} 超出 [0.0, 1.0] 范围")]
  InvalidThreshold(f32),
  #[error("推理失败: {0}")]
  InferenceFailed(String),
}

/// 单个候选检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
  /// 边界框 [x_min, y_min, x_max, y_max]，原图像素坐标
  pub bbox: [f32; 4],
  /// 类别编号
  pub class_id: usize,
  /// 置信度
  pub confidence: f32,
}

/// 单次推理的输出，检测顺序为检测器的原生顺序
#[derive(Debug, Clone)]
pub struct DetectionResult {
  pub detections: Vec<RawDetection>,
  /// 原图宽度
  pub image_width: u32,
  /// 原图高度
  pub image_height: u32,
}

impl DetectionResult {
  pub fn len(&self) -> usize {
    self.detections.len()
  }

  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }
}

/// 目标检测器契约
///
/// 返回的检测项置信度均满足 `>= confidence_threshold`（含端点）。
/// 空结果表示“阈值以上无目标”，是正常输出而非错误。
/// 实现必须可重入：已加载的检测器与标签表一样按只读状态共享。
pub trait Detector: Send + Sync {
  fn detect(
    &self,
    image: &RgbImage,
    confidence_threshold: f32,
  ) -> Result<DetectionResult, DetectorError>;

  /// 模型类别总数，用于启动时校验标签表
  fn class_count(&self) -> usize;
}

/// 校验置信度阈值在 [0.0, 1.0] 区间内（NaN 同样拒绝）
pub fn validate_threshold(threshold: f32) -> Result<(), DetectorError> {
  if !(0.0..=1.0).contains(&threshold) {
    return Err(DetectorError::InvalidThreshold(threshold));
  }
  Ok(())
}

/// 计算两个边界框的 IoU
pub fn iou(a: &RawDetection, b: &RawDetection) -> f32 {
  let x1 = a.bbox[0].max(b.bbox[0]);
  let y1 = a.bbox[1].max(b.bbox[1]);
  let x2 = a.bbox[2].min(b.bbox[2]);
  let y2 = a.bbox[3].min(b.bbox[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a.bbox[2] - a.bbox[0]) * (a.bbox[3] - a.bbox[1]);
  let area_b = (b.bbox[2] - b.bbox[0]) * (b.bbox[3] - b.bbox[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}

/// 按类别做非极大值抑制
pub fn nms(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
  // 按置信度降序排序
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut result = Vec::new();

  while !detections.is_empty() {
    let best = detections.remove(0);

    detections.retain(|det| {
      if det.class_id != best.class_id {
        return true;
      }
      iou(&best, det) < iou_threshold
    });

    result.push(best);
  }

  result
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(bbox: [f32; 4], class_id: usize, confidence: f32) -> RawDetection {
    RawDetection {
      bbox,
      class_id,
      confidence,
    }
  }

  #[test]
  fn threshold_bounds_are_inclusive() {
    assert!(validate_threshold(0.0).is_ok());
    assert!(validate_threshold(0.5).is_ok());
    assert!(validate_threshold(1.0).is_ok());
  }

  #[test]
  fn threshold_out_of_range_rejected() {
    assert!(matches!(
      validate_threshold(1.5),
      Err(DetectorError::InvalidThreshold(t)) if t == 1.5
    ));
    assert!(matches!(
      validate_threshold(-0.1),
      Err(DetectorError::InvalidThreshold(_))
    ));
    assert!(matches!(
      validate_threshold(f32::NAN),
      Err(DetectorError::InvalidThreshold(_))
    ));
  }

  #[test]
  fn iou_of_identical_boxes_is_one() {
    let a = det([10.0, 10.0, 50.0, 50.0], 0, 0.9);
    assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn iou_of_disjoint_boxes_is_zero() {
    let a = det([0.0, 0.0, 10.0, 10.0], 0, 0.9);
    let b = det([20.0, 20.0, 30.0, 30.0], 0, 0.8);
    assert_eq!(iou(&a, &b), 0.0);
  }

  #[test]
  fn nms_suppresses_overlapping_same_class() {
    let kept = nms(
      vec![
        det([0.0, 0.0, 100.0, 100.0], 0, 0.6),
        det([5.0, 5.0, 105.0, 105.0], 0, 0.9),
      ],
      0.45,
    );
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].confidence, 0.9);
  }

  #[test]
  fn nms_keeps_overlapping_different_classes() {
    let kept = nms(
      vec![
        det([0.0, 0.0, 100.0, 100.0], 0, 0.9),
        det([5.0, 5.0, 105.0, 105.0], 1, 0.8),
      ],
      0.45,
    );
    assert_eq!(kept.len(), 2);
  }

  #[test]
  fn nms_of_empty_input_is_empty() {
    assert!(nms(vec![], 0.45).is_empty());
  }
}
