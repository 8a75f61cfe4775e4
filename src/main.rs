// 该文件是 Mushu （木薯） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mushu::detector::OnnxDetector;
use mushu::input;
use mushu::labels::LabelTable;
use mushu::output::{self, Visualizer};
use mushu::pipeline::Pipeline;

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model.display());
  info!("输入图片: {}", args.input.display());
  info!("输出路径: {}", args.output.display());
  info!("置信度阈值: {}", args.confidence);
  info!("NMS 阈值: {}", args.nms_threshold);

  // 标签表与模型在启动时加载一次，此后只读
  let labels = match &args.labels {
    Some(path) => LabelTable::from_toml_file(path)
      .with_context(|| format!("无法加载标签文件: {}", path.display()))?,
    None => LabelTable::cassava(),
  };
  info!("类别标签: {} 个", labels.len());

  info!("正在加载模型...");
  let detector = OnnxDetector::load(&args.model, args.nms_threshold).context("模型加载失败")?;

  let mut visualizer = Visualizer::new(labels.len());
  if let Some(font) = &args.font {
    visualizer = visualizer
      .with_font_file(font)
      .with_context(|| format!("无法加载字体文件: {}", font.display()))?;
  }

  let pipeline = Pipeline::new(detector, labels)
    .context("标签表校验失败")?
    .with_visualizer(visualizer);

  let image = input::load_image(&args.input)
    .with_context(|| format!("无法加载输入图片: {}", args.input.display()))?;
  info!("图片尺寸: {}x{}", image.width(), image.height());

  info!("开始推理...");
  let now = std::time::Instant::now();
  let (annotated, entries) = pipeline.process(&image, args.confidence)?;
  info!("推理完成，耗时: {:.2?}", now.elapsed());

  output::save_annotated_image(&annotated, &args.output)?;

  if entries.is_empty() {
    info!("未检测到高于阈值的病害或目标");
  } else {
    info!("检测摘要:");
    for entry in &entries {
      info!("  {} — 置信度: {:.2}", entry.label, entry.confidence);
    }
  }

  if let Some(record) = &args.record {
    output::write_summary_record(&entries, record)?;
  }

  Ok(())
}
