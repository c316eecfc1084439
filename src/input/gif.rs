// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! GIF 动图输入

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, Frames, RgbImage};
use tracing::warn;

use super::Capture;
use crate::error::AcquisitionError;

pub struct AnimatedGif {
    name: String,
    frames: Frames<'static>,
}

impl AnimatedGif {
    pub fn open(path: &Path) -> Result<Self, AcquisitionError> {
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| AcquisitionError::open(&name, e))?;
        let decoder =
            GifDecoder::new(BufReader::new(file)).map_err(|e| AcquisitionError::open(&name, e))?;
        Ok(Self {
            name,
            frames: decoder.into_frames(),
        })
    }
}

impl Capture for AnimatedGif {
    fn grab(&mut self) -> Option<RgbImage> {
        match self.frames.next()? {
            Ok(frame) => Some(DynamicImage::ImageRgba8(frame.into_buffer()).into_rgb8()),
            Err(e) => {
                warn!("⚠️ GIF解码失败 {}: {}, 结束输入", self.name, e);
                None
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
