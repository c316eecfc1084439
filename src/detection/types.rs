// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测结果数据结构
/// Data structures for detection results
use serde::Serialize;

/// 检测框 (x, y, w, h), 帧坐标系
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Bbox {
    xmin: f32,
    ymin: f32,
    width: f32,
    height: f32,
}

impl Bbox {
    pub fn new(xmin: f32, ymin: f32, width: f32, height: f32) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
        }
    }

    /// 由中心点 + 宽高构造
    pub fn from_cxcywh(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2., cy - height / 2., width, height)
    }

    pub fn xmin(&self) -> f32 {
        self.xmin
    }

    pub fn ymin(&self) -> f32 {
        self.ymin
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn xmax(&self) -> f32 {
        self.xmin + self.width
    }

    pub fn ymax(&self) -> f32 {
        self.ymin + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn intersection_area(&self, another: &Bbox) -> f32 {
        let l = self.xmin.max(another.xmin);
        let r = self.xmax().min(another.xmax());
        let t = self.ymin.max(another.ymin);
        let b = self.ymax().min(another.ymax());
        (r - l).max(0.) * (b - t).max(0.)
    }

    pub fn union(&self, another: &Bbox) -> f32 {
        self.area() + another.area() - self.intersection_area(another)
    }

    pub fn iou(&self, another: &Bbox) -> f32 {
        let union = self.union(another);
        if union <= 0. {
            return 0.;
        }
        self.intersection_area(another) / union
    }

    /// 按比例缩放 (分析分辨率 → 原始分辨率)
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self::new(
            self.xmin * sx,
            self.ymin * sy,
            self.width * sx,
            self.height * sy,
        )
    }

    /// 裁剪到画面范围内
    pub fn clip(&self, max_w: f32, max_h: f32) -> Self {
        let x1 = self.xmin.clamp(0., max_w);
        let y1 = self.ymin.clamp(0., max_h);
        let x2 = self.xmax().clamp(0., max_w);
        let y2 = self.ymax().clamp(0., max_h);
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }
}

/// 单个检测结果: 类别标签 + 置信度 + 检测框
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: Bbox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: Bbox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

/// 贪心NMS, 按置信度降序保留与已保留框 IoU 不超过阈值的框
///
/// `same_class` 为 true 时只在同类别之间抑制
pub fn non_max_suppression(xs: &mut Vec<Detection>, iou_threshold: f32, same_class: bool) {
    xs.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            if same_class && xs[prev_index].label != xs[index].label {
                continue;
            }
            if xs[prev_index].bbox.iou(&xs[index].bbox) > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}
