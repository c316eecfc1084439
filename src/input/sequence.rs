// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 图片序列输入 - 目录中的静态图片按文件名排序作为连续帧

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::warn;

use super::{has_extension, Capture};
use crate::error::AcquisitionError;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub struct ImageSequence {
    name: String,
    paths: std::vec::IntoIter<PathBuf>,
}

impl ImageSequence {
    pub fn open(dir: &Path) -> Result<Self, AcquisitionError> {
        let name = dir.display().to_string();
        let entries = std::fs::read_dir(dir).map_err(|e| AcquisitionError::open(&name, e))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_extension(p, &IMAGE_EXTENSIONS))
            .collect();
        if paths.is_empty() {
            return Err(AcquisitionError::Empty(name));
        }
        paths.sort();

        Ok(Self {
            name,
            paths: paths.into_iter(),
        })
    }

    /// 剩余帧数
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl Capture for ImageSequence {
    fn grab(&mut self) -> Option<RgbImage> {
        let path = self.paths.next()?;
        match image::open(&path) {
            Ok(img) => Some(img.into_rgb8()),
            Err(e) => {
                // 读取失败按流结束处理
                warn!("⚠️ 读取帧失败 {}: {}, 结束输入", path.display(), e);
                self.paths = Vec::new().into_iter();
                None
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
