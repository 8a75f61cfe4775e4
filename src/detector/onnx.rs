// 该文件是 Mushu （木薯） 项目的一部分。
// src/detector/onnx.rs - ONNX 检测器后端
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

use image::RgbImage;
use tracing::{debug, info};
use tract_onnx::prelude::*;

use super::{DetectionResult, Detector, DetectorError, RawDetection, nms, validate_threshold};

/// YOLOv5 导出模型的默认输入尺寸
const DEFAULT_INPUT_SIZE: u32 = 640;
/// 每个候选框的前置字段数（cx, cy, w, h, objectness）
const BOX_FIELDS: usize = 5;

/// 基于 tract-onnx 的 YOLOv5 检测器
///
/// 期望模型为 ultralytics 导出的解码头，输出形状 [1, N, 5 + 类别数]。
/// 类别数在加载时从输出形状推导，供启动时的标签表校验使用。
pub struct OnnxDetector {
  plan: TypedSimplePlan<TypedModel>,
  input_width: u32,
  input_height: u32,
  num_classes: usize,
  nms_threshold: f32,
}

impl OnnxDetector {
  pub fn load(model_path: &Path, nms_threshold: f32) -> Result<Self, DetectorError> {
    Self::load_with_input_size(model_path, DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE, nms_threshold)
  }

  pub fn load_with_input_size(
    model_path: &Path,
    input_width: u32,
    input_height: u32,
    nms_threshold: f32,
  ) -> Result<Self, DetectorError> {
    info!("加载模型文件: {}", model_path.display());

    let model = tract_onnx::onnx()
      .model_for_path(model_path)
      .map_err(|e| {
        DetectorError::ModelUnavailable(format!("无法读取模型 {}: {}", model_path.display(), e))
      })?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(
          f32::datum_type(),
          tvec!(1, 3, input_height as usize, input_width as usize),
        ),
      )
      .map_err(|e| DetectorError::ModelUnavailable(format!("无法设置模型输入形状: {}", e)))?
      .into_optimized()
      .map_err(|e| DetectorError::ModelUnavailable(format!("模型优化失败: {}", e)))?;

    let output_fact = model
      .output_fact(0)
      .map_err(|e| DetectorError::ModelUnavailable(format!("无法获取模型输出: {}", e)))?;
    let shape = output_fact.shape.as_concrete().ok_or_else(|| {
      DetectorError::ModelUnavailable("模型输出形状不是静态的".to_string())
    })?;

    // YOLOv5 解码头: [1, N, 5 + 类别数]
    let num_classes = match shape {
      [1, _, attrs] if *attrs > BOX_FIELDS => attrs - BOX_FIELDS,
      other => {
        return Err(DetectorError::ModelUnavailable(format!(
          "不支持的模型输出形状: {:?}",
          other
        )));
      }
    };
    debug!("模型输出形状: {:?}, 类别数: {}", shape, num_classes);

    let plan = model
      .into_runnable()
      .map_err(|e| DetectorError::ModelUnavailable(format!("模型编译失败: {}", e)))?;

    info!("模型加载完成");
    Ok(Self {
      plan,
      input_width,
      input_height,
      num_classes,
      nms_threshold,
    })
  }

  /// 缩放到模型输入尺寸并转为 NCHW 归一化张量
  fn preprocess(&self, image: &RgbImage) -> Tensor {
    let resized = image::imageops::resize(
      image,
      self.input_width,
      self.input_height,
      image::imageops::FilterType::Triangle,
    );

    tract_ndarray::Array4::from_shape_fn(
      (1, 3, self.input_height as usize, self.input_width as usize),
      |(_, c, y, x)| resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
    )
    .into()
  }

  fn postprocess(
    &self,
    output: tract_ndarray::ArrayViewD<f32>,
    confidence_threshold: f32,
    original_width: f32,
    original_height: f32,
  ) -> Vec<RawDetection> {
    let mut detections = Vec::new();

    let rows = output.shape()[1];
    let scale_x = original_width / self.input_width as f32;
    let scale_y = original_height / self.input_height as f32;

    for i in 0..rows {
      let objectness = output[[0, i, 4]];
      if objectness < confidence_threshold {
        continue;
      }

      // 找到最高类别分数
      let mut best_score = 0.0f32;
      let mut best_class = 0usize;
      for c in 0..self.num_classes {
        let score = output[[0, i, BOX_FIELDS + c]];
        if score > best_score {
          best_score = score;
          best_class = c;
        }
      }

      let confidence = objectness * best_score;
      if confidence < confidence_threshold {
        continue;
      }

      // 解码边界框并缩放回原图像素坐标
      let cx = output[[0, i, 0]];
      let cy = output[[0, i, 1]];
      let w = output[[0, i, 2]];
      let h = output[[0, i, 3]];

      let x_min = ((cx - w / 2.0) * scale_x).clamp(0.0, original_width);
      let y_min = ((cy - h / 2.0) * scale_y).clamp(0.0, original_height);
      let x_max = ((cx + w / 2.0) * scale_x).clamp(0.0, original_width);
      let y_max = ((cy + h / 2.0) * scale_y).clamp(0.0, original_height);

      detections.push(RawDetection {
        bbox: [x_min, y_min, x_max, y_max],
        class_id: best_class,
        confidence,
      });
    }

    nms(detections, self.nms_threshold)
  }
}

impl Detector for OnnxDetector {
  fn detect(
    &self,
    image: &RgbImage,
    confidence_threshold: f32,
  ) -> Result<DetectionResult, DetectorError> {
    validate_threshold(confidence_threshold)?;

    if image.width() == 0 || image.height() == 0 {
      return Err(DetectorError::InvalidImage("图像尺寸为零".to_string()));
    }

    let input = self.preprocess(image);

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(input.into()))
      .map_err(|e| DetectorError::InferenceFailed(e.to_string()))?;

    let view = outputs[0]
      .to_array_view::<f32>()
      .map_err(|e| DetectorError::InferenceFailed(e.to_string()))?;
    if view.ndim() != 3 {
      return Err(DetectorError::InferenceFailed(format!(
        "模型输出维度异常: {}",
        view.ndim()
      )));
    }

    let detections = self.postprocess(
      view,
      confidence_threshold,
      image.width() as f32,
      image.height() as f32,
    );
    debug!("检测到 {} 个目标", detections.len());

    Ok(DetectionResult {
      detections,
      image_width: image.width(),
      image_height: image.height(),
    })
  }

  fn class_count(&self) -> usize {
    self.num_classes
  }
}
