// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 图像缩放 (fast_image_resize)

use anyhow::{anyhow, Result};
use fast_image_resize as fr;
use image::RgbImage;

/// RGB 图像缩放到指定尺寸, 返回新图像 (源图像不变)
///
/// 尺寸相同时直接复制。
pub fn resize_rgb(src: &RgbImage, width: u32, height: u32) -> Result<RgbImage> {
    if src.width() == width && src.height() == height {
        return Ok(src.clone());
    }
    if width == 0 || height == 0 || src.width() == 0 || src.height() == 0 {
        return Err(anyhow!(
            "非法缩放尺寸: {}x{} → {}x{}",
            src.width(),
            src.height(),
            width,
            height
        ));
    }

    let src_image = fr::images::Image::from_vec_u8(
        src.width(),
        src.height(),
        src.as_raw().clone(),
        fr::PixelType::U8x3,
    )?;
    let mut dst_image = fr::images::Image::new(width, height, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    resizer.resize(
        &src_image,
        &mut dst_image,
        &fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
    )?;

    RgbImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| anyhow!("RGB图像转换失败"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_resize_dimensions_and_color() {
        let src = RgbImage::from_pixel(64, 48, Rgb([10, 200, 30]));
        let dst = resize_rgb(&src, 32, 24).unwrap();
        assert_eq!(dst.dimensions(), (32, 24));
        // 纯色图缩放后颜色不变
        assert_eq!(*dst.get_pixel(5, 5), Rgb([10, 200, 30]));
        // 源图像不变
        assert_eq!(src.dimensions(), (64, 48));
    }

    #[test]
    fn test_resize_same_size_copies() {
        let src = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let dst = resize_rgb(&src, 8, 8).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn test_resize_zero_rejected() {
        let src = RgbImage::new(8, 8);
        assert!(resize_rgb(&src, 0, 8).is_err());
    }
}
