//! YOLO 格式的边界框标签.

use crate::cluster::ConsensusNodule;
use crate::consts::{radius, NODULE_CLASS_ID};
use crate::{ImageSize, Point2d};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 由恶性度推导结节半径 (像素): 缺失时为 `10`, 否则为 `10 + 3 * malignancy`.
#[inline]
pub fn radius(malignancy: Option<f64>) -> f64 {
    match malignancy {
        None => radius::BASE,
        Some(m) => radius::BASE + radius::PER_MALIGNANCY * m,
    }
}

/// 归一化的 YOLO 边界框.
///
/// 所有字段都已除以图像宽/高, 但 **不** 截断到 `[0, 1]`: 靠近图像边缘的结节,
/// 其边界框可能超出单位正方形.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    /// 类别编号, 固定为 0.
    pub class_id: u32,

    /// 中心 x / 图像宽.
    pub x_center: f64,

    /// 中心 y / 图像高.
    pub y_center: f64,

    /// 框宽 / 图像宽.
    pub width: f64,

    /// 框高 / 图像高.
    pub height: f64,
}

impl BoundingBox {
    /// 以 `center` 为中心、`2 * radius` 为边长的正方形框, 按 `size` 归一化.
    pub fn encode((x, y): Point2d, radius: f64, size: ImageSize) -> Self {
        let w = size.width as f64;
        let h = size.height as f64;
        Self {
            class_id: NODULE_CLASS_ID,
            x_center: x / w,
            y_center: y / h,
            width: 2.0 * radius / w,
            height: 2.0 * radius / h,
        }
    }

    /// 由共识结节的中心和恶性度生成边界框.
    #[inline]
    pub fn from_nodule(nodule: &ConsensusNodule, size: ImageSize) -> Self {
        Self::encode(nodule.center, radius(nodule.malignancy), size)
    }
}

/// `0 xc yc w h`, 保留 6 位小数.
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.x_center, self.y_center, self.width, self.height
        )
    }
}

/// 一张图像的标签文件内容: 每个框一行, 每行以 `\n` 结尾.
pub fn label_file_contents<'a, I>(boxes: I) -> String
where
    I: IntoIterator<Item = &'a BoundingBox>,
{
    boxes.into_iter().map(|b| format!("{b}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_radius() {
        assert_eq!(radius(None), 10.0);
        assert_eq!(radius(Some(1.0)), 13.0);
        assert_eq!(radius(Some(3.5)), 20.5);
    }

    #[test]
    fn test_missing_malignancy_box() {
        let b = BoundingBox::encode((256.0, 128.0), radius(None), ImageSize::new(512, 512));
        assert_eq!(b.class_id, 0);
        assert!(float_eq(b.width, 20.0 / 512.0));
        assert!(float_eq(b.height, 0.0390625));
        assert!(float_eq(b.x_center, 0.5));
        assert!(float_eq(b.y_center, 0.25));
        assert!(b.to_string().starts_with("0 0.500000 0.250000 0.03906"));
    }

    #[test]
    fn test_edge_box_not_clamped() {
        let b = BoundingBox::encode((2.0, 510.0), radius(Some(5.0)), ImageSize::new(512, 512));
        assert!(b.x_center - b.width / 2.0 < 0.0);
        assert!(b.y_center + b.height / 2.0 > 1.0);
    }

    #[test]
    fn test_label_file_contents() {
        let size = ImageSize::new(100, 50);
        let boxes = [
            BoundingBox::encode((50.0, 25.0), 10.0, size),
            BoundingBox::encode((10.0, 10.0), 13.0, size),
        ];
        assert_eq!(
            label_file_contents(&boxes),
            "0 0.500000 0.500000 0.200000 0.400000\n0 0.100000 0.200000 0.260000 0.520000\n"
        );
        assert_eq!(label_file_contents(&[]), "");
    }
}
