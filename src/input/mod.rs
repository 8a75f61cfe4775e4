// 该文件是 Mushu （木薯） 项目的一部分。
// src/input/mod.rs - 图像输入
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

use std::io::Cursor;
use std::path::Path;

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("无法打开图像文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无效图像: {0}")]
  InvalidImage(#[from] image::ImageError),
}

/// 从文件加载图像并转为 3 通道 RGB
pub fn load_image(path: &Path) -> Result<RgbImage, InputError> {
  let image = ImageReader::open(path)?.decode()?.to_rgb8();
  debug!(
    "加载图像 {}: {}x{}",
    path.display(),
    image.width(),
    image.height()
  );
  Ok(image)
}

/// 从内存字节流解码图像（上传场景），格式按内容猜测
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, InputError> {
  let image = ImageReader::new(Cursor::new(bytes))
    .with_guessed_format()?
    .decode()?
    .to_rgb8();
  debug!("解码图像: {}x{}", image.width(), image.height());
  Ok(image)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{DynamicImage, ImageFormat};

  #[test]
  fn decodes_png_bytes() {
    let source = DynamicImage::new_rgb8(8, 6);
    let mut bytes = Vec::new();
    source
      .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
      .unwrap();

    let decoded = decode_image(&bytes).unwrap();
    assert_eq!(decoded.dimensions(), (8, 6));
  }

  #[test]
  fn rejects_garbage_bytes() {
    let err = decode_image(b"definitely not an image").unwrap_err();
    assert!(matches!(err, InputError::InvalidImage(_)));
  }

  #[test]
  fn missing_file_is_io_error() {
    let err = load_image(Path::new("/no/such/leaf.jpg")).unwrap_err();
    assert!(matches!(err, InputError::IoError(_)));
  }
}
