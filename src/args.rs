// 该文件是 Mushu （木薯） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;

/// Mushu 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径（YOLOv5 导出）
  #[arg(long, value_name = "FILE")]
  pub model: PathBuf,

  /// 输入图片路径 (*.jpg, *.jpeg, *.png)
  #[arg(long, value_name = "SOURCE")]
  pub input: PathBuf,

  /// 标注图输出路径 (*.jpg, *.png)
  #[arg(long, value_name = "OUTPUT")]
  pub output: PathBuf,

  /// 类别标签文件路径（TOML），缺省使用内置木薯病害标签
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 标签字体文件路径（TTF），缺省时只绘制边框不绘制文字
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 检测摘要记录文件路径（纯文本）
  #[arg(long, value_name = "FILE")]
  pub record: Option<PathBuf>,
}
