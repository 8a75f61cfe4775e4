// 该文件是 Mushu （木薯） 项目的一部分。
// src/output/visualizer.rs - 检测结果可视化
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

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::detector::RawDetection;
use crate::pipeline::SummaryEntry;

// 标签文本渲染常量
const FONT_SIZE: f32 = 16.0;
const TAG_HEIGHT: i32 = 20;
const TAG_CHAR_WIDTH: f32 = 9.0; // 每字符平均宽度（粗略估计）
const TAG_TEXT_VERTICAL_PADDING: i32 = 2;

#[derive(Error, Debug)]
pub enum VisualizerError {
  #[error("无法读取字体文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无效字体: {0}")]
  FontError(#[from] ab_glyph::InvalidFont),
}

/// 可视化工具
///
/// 标注是对原图的纯函数：克隆原图后绘制，不修改输入。
/// 未提供字体时仍绘制边框与标签底条，只跳过文字。
#[derive(Debug)]
pub struct Visualizer {
  font: Option<FontVec>,
  font_scale: PxScale,
  /// 每个类别一种颜色
  colors: Vec<Rgb<u8>>,
}

impl Visualizer {
  /// 创建可视化工具，按类别数生成颜色表
  pub fn new(num_classes: usize) -> Self {
    let count = num_classes.max(1);
    let colors: Vec<Rgb<u8>> = (0..count)
      .map(|i| {
        let hue = (i as f32 / count as f32) * 360.0;
        Self::hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();

    Self {
      font: None,
      font_scale: PxScale::from(FONT_SIZE),
      colors,
    }
  }

  /// 从 TTF 文件加载标签字体
  pub fn with_font_file(mut self, path: &Path) -> Result<Self, VisualizerError> {
    let data = std::fs::read(path)?;
    self.font = Some(FontVec::try_from_vec(data)?);
    Ok(self)
  }

  /// HSV 转 RGB
  fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
      (c, x, 0.0)
    } else if h < 120.0 {
      (x, c, 0.0)
    } else if h < 180.0 {
      (0.0, c, x)
    } else if h < 240.0 {
      (0.0, x, c)
    } else if h < 300.0 {
      (x, 0.0, c)
    } else {
      (c, 0.0, x)
    };

    Rgb([
      ((r + m) * 255.0) as u8,
      ((g + m) * 255.0) as u8,
      ((b + m) * 255.0) as u8,
    ])
  }

  /// 在原图副本上绘制检测结果
  ///
  /// `entries` 与 `detections` 按流水线约定一一对应且顺序一致。
  pub fn annotate(
    &self,
    image: &RgbImage,
    detections: &[RawDetection],
    entries: &[SummaryEntry],
  ) -> RgbImage {
    let mut annotated = image.clone();

    for (detection, entry) in detections.iter().zip(entries) {
      let color = self.colors[detection.class_id % self.colors.len()];
      self.draw_bbox(&mut annotated, detection, color);
      self.draw_tag(&mut annotated, detection, entry, color);
    }

    annotated
  }

  /// 绘制空心边框（双线加粗）
  fn draw_bbox(&self, image: &mut RgbImage, detection: &RawDetection, color: Rgb<u8>) {
    let (w, h) = (image.width() as f32, image.height() as f32);

    let x_min = detection.bbox[0].clamp(0.0, w - 1.0) as i32;
    let y_min = detection.bbox[1].clamp(0.0, h - 1.0) as i32;
    let x_max = detection.bbox[2].clamp(0.0, w - 1.0) as i32;
    let y_max = detection.bbox[3].clamp(0.0, h - 1.0) as i32;

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let width = (x_max - x_min) as u32;
    let height = (y_max - y_min) as u32;

    let rect = Rect::at(x_min, y_min).of_size(width, height);
    draw_hollow_rect_mut(image, rect, color);

    // 第二圈边框以增加可见度
    if width > 2 && height > 2 {
      let inner = Rect::at(x_min + 1, y_min + 1).of_size(width - 2, height - 2);
      draw_hollow_rect_mut(image, inner, color);
    }
  }

  /// 在边框上方绘制“标签: 置信度”底条与文字
  fn draw_tag(
    &self,
    image: &mut RgbImage,
    detection: &RawDetection,
    entry: &SummaryEntry,
    color: Rgb<u8>,
  ) {
    let (w, _h) = (image.width() as i32, image.height() as i32);

    let tag_text = format!("{}: {:.2}", entry.label, entry.confidence);

    let tag_x = (detection.bbox[0] as i32).clamp(0, w - 1);
    let tag_y = (detection.bbox[1] as i32 - TAG_HEIGHT).max(0);

    // 估算文本宽度（粗略估计），不超出图像右边界
    let text_width = (tag_text.len() as f32 * TAG_CHAR_WIDTH) as i32;
    let tag_width = text_width.min(w - tag_x);

    if tag_width <= 0 {
      return;
    }

    let rect = Rect::at(tag_x, tag_y).of_size(tag_width as u32, TAG_HEIGHT as u32);
    draw_filled_rect_mut(image, rect, color);

    if let Some(font) = &self.font {
      let text_color = Rgb([255u8, 255u8, 255u8]);
      draw_text_mut(
        image,
        text_color,
        tag_x,
        tag_y + TAG_TEXT_VERTICAL_PADDING,
        self.font_scale,
        font,
        &tag_text,
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(label: &str, confidence: f32) -> SummaryEntry {
    SummaryEntry {
      label: label.to_string(),
      confidence,
    }
  }

  fn det(bbox: [f32; 4], class_id: usize, confidence: f32) -> RawDetection {
    RawDetection {
      bbox,
      class_id,
      confidence,
    }
  }

  #[test]
  fn annotate_does_not_mutate_source() {
    let source = RgbImage::new(64, 48);
    let detections = vec![det([8.0, 8.0, 40.0, 40.0], 0, 0.9)];
    let entries = vec![entry("Healthy", 0.9)];

    let visualizer = Visualizer::new(4);
    let annotated = visualizer.annotate(&source, &detections, &entries);

    assert_eq!(annotated.dimensions(), source.dimensions());
    assert_eq!(source, RgbImage::new(64, 48));
    assert_ne!(annotated, source);
  }

  #[test]
  fn annotate_without_detections_is_identity() {
    let source = RgbImage::new(32, 32);
    let visualizer = Visualizer::new(4);
    let annotated = visualizer.annotate(&source, &[], &[]);
    assert_eq!(annotated, source);
  }

  #[test]
  fn out_of_bounds_bbox_is_clamped() {
    let source = RgbImage::new(32, 32);
    let detections = vec![det([-10.0, -10.0, 500.0, 500.0], 2, 0.7)];
    let entries = vec![entry("Cassava Green Mite", 0.7)];

    let visualizer = Visualizer::new(4);
    let annotated = visualizer.annotate(&source, &detections, &entries);
    assert_eq!(annotated.dimensions(), (32, 32));
  }

  #[test]
  fn degenerate_bbox_is_skipped() {
    let source = RgbImage::new(32, 32);
    let detections = vec![det([10.0, 10.0, 10.0, 10.0], 0, 0.5)];
    let entries = vec![entry("Healthy", 0.5)];

    let visualizer = Visualizer::new(4);
    let annotated = visualizer.annotate(&source, &detections, &entries);
    // 零面积框只留下标签底条
    assert_eq!(annotated.dimensions(), (32, 32));
  }

  #[test]
  fn color_table_covers_every_class() {
    let visualizer = Visualizer::new(4);
    assert_eq!(visualizer.colors.len(), 4);
    let pairwise_distinct = visualizer
      .colors
      .iter()
      .enumerate()
      .all(|(i, c)| visualizer.colors[i + 1..].iter().all(|d| d != c));
    assert!(pairwise_distinct);
  }
}
