// 该文件是 Mushu （木薯） 项目的一部分。
// src/output/mod.rs - 输出模块
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

mod visualizer;

pub use visualizer::{Visualizer, VisualizerError};

use std::path::Path;

use image::RgbImage;
use thiserror::Error;
use tracing::info;

use crate::pipeline::SummaryEntry;

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像保存失败: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 保存标注后的图像，必要时创建父目录
pub fn save_annotated_image(image: &RgbImage, path: &Path) -> Result<(), OutputError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }

  image.save(path)?;
  info!("保存标注图像到: {}", path.display());
  Ok(())
}

/// 将检测摘要写为纯文本记录，每行 “标签, 置信度”
pub fn write_summary_record(entries: &[SummaryEntry], path: &Path) -> Result<(), OutputError> {
  let mut records = Vec::with_capacity(entries.len());
  for entry in entries {
    records.push(format!("{}, {:.4}", entry.label, entry.confidence));
  }

  std::fs::write(path, records.join("\n"))?;
  info!("保存检测摘要到: {}", path.display());
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn summary_record_format() {
    let entries = vec![
      SummaryEntry {
        label: "Cassava Mosaic Disease".to_string(),
        confidence: 0.9137,
      },
      SummaryEntry {
        label: "Healthy".to_string(),
        confidence: 0.5,
      },
    ];

    let path = std::env::temp_dir().join(format!("mushu-record-{}.txt", std::process::id()));
    write_summary_record(&entries, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(text, "Cassava Mosaic Disease, 0.9137\nHealthy, 0.5000");
  }

  #[test]
  fn save_creates_parent_directories() {
    let dir = std::env::temp_dir().join(format!("mushu-out-{}", std::process::id()));
    let path = dir.join("nested").join("annotated.png");

    let image = RgbImage::new(4, 4);
    save_annotated_image(&image, &path).unwrap();

    assert!(path.exists());
    std::fs::remove_dir_all(&dir).unwrap();
  }
}
