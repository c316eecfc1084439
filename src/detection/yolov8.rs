// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 检测模型 (ONNX Runtime)
// 包含: 模型加载、预处理、推理、后处理

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::{imageops, RgbImage};
use ndarray::{s, Array, Axis, IxDyn};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use tracing::info;

use super::{non_max_suppression, Bbox, Detection, Detector};

/// YOLOv8 检测模型
pub struct Yolov8Detector {
    session: Session,
    input_name: String,
    width: u32,
    height: u32,
    names: Vec<String>,
    conf: f32,
    iou: f32,
}

impl Yolov8Detector {
    /// 加载ONNX模型
    ///
    /// * `input_size` - 模型输入尺寸 (宽, 高), 动态输入模型必须给出
    /// * `names`      - 标签词表, class id → label
    pub fn new(
        model: impl AsRef<Path>,
        input_size: (u32, u32),
        names: Vec<String>,
        conf: f32,
        iou: f32,
    ) -> Result<Self> {
        let model = model.as_ref();
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model)
            .with_context(|| format!("加载模型失败: {}", model.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| anyhow!("模型没有输入: {}", model.display()))?;

        let (width, height) = input_size;
        info!(
            "✅ YOLOv8 检测模型加载成功: {} (输入 {}x{}, {}类)",
            model.display(),
            width,
            height,
            names.len()
        );

        Ok(Self {
            session,
            input_name,
            width,
            height,
            names,
            conf,
            iou,
        })
    }

    fn scale_wh(&self, w0: f32, h0: f32) -> (f32, f32, f32) {
        let r = (self.width as f32 / w0).min(self.height as f32 / h0);
        (r, (w0 * r).round(), (h0 * r).round())
    }

    /// 预处理: 等比缩放到左上角, 其余填充灰色, NCHW 归一化
    fn preprocess(&self, image: &RgbImage) -> Array<f32, IxDyn> {
        let mut ys = Array::ones((1, 3, self.height as usize, self.width as usize)).into_dyn();
        ys.fill(144.0 / 255.0);

        let (_, w_new, h_new) = self.scale_wh(image.width() as f32, image.height() as f32);
        let resized = imageops::resize(
            image,
            (w_new as u32).max(1),
            (h_new as u32).max(1),
            imageops::FilterType::Triangle,
        );

        for (x, y, rgb) in resized.enumerate_pixels() {
            let x = x as usize;
            let y = y as usize;
            let [r, g, b] = rgb.0;
            ys[[0, 0, y, x]] = (r as f32) / 255.0;
            ys[[0, 1, y, x]] = (g as f32) / 255.0;
            ys[[0, 2, y, x]] = (b as f32) / 255.0;
        }
        ys
    }

    /// 后处理: [1, 4 + nc, anchors] → 检测结果
    fn postprocess(&self, preds: Array<f32, IxDyn>, image: &RgbImage) -> Result<Vec<Detection>> {
        const CXYWH_OFFSET: usize = 4;

        let width_original = image.width() as f32;
        let height_original = image.height() as f32;
        let (ratio, _, _) = self.scale_wh(width_original, height_original);

        let mut data = Vec::new();
        for anchor in preds.axis_iter(Axis(0)) {
            for pred in anchor.axis_iter(Axis(1)) {
                if pred.len() <= CXYWH_OFFSET {
                    return Err(anyhow!("模型输出维度异常: {}", pred.len()));
                }
                let bbox = pred.slice(s![0..CXYWH_OFFSET]);
                let clss = pred.slice(s![CXYWH_OFFSET..]);

                let Some((id, &confidence)) = clss
                    .iter()
                    .enumerate()
                    .reduce(|max, x| if x.1 > max.1 { x } else { max })
                else {
                    continue;
                };

                if confidence < self.conf {
                    continue;
                }

                let label = self
                    .names
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{id}"));

                let bbox = Bbox::from_cxcywh(
                    bbox[0] / ratio,
                    bbox[1] / ratio,
                    bbox[2] / ratio,
                    bbox[3] / ratio,
                )
                .clip(width_original, height_original);

                data.push(Detection::new(label, confidence, bbox));
            }
        }

        non_max_suppression(&mut data, self.iou, true);
        Ok(data)
    }
}

impl Detector for Yolov8Detector {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
        let xs = ort::value::Tensor::from_array(self.preprocess(image))?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => xs]?)?;
        let preds = outputs[0].try_extract_tensor::<f32>()?.into_owned();
        self.postprocess(preds, image)
    }

    fn name(&self) -> &str {
        "yolov8"
    }
}
