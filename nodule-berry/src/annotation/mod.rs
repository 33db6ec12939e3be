//! LIDC-IDRI XML 标注解析.
//!
//! 一个病例的 XML 文件包含若干 `readingSession`, 每个 `readingSession`
//! 对应一位医师的独立阅片. 该模块把文档展开为扁平的 [`RawAnnotation`] 列表:
//! 每位医师、每个结节、每个含边缘点的切片 ROI 各一条.

mod error;
mod xml;

use crate::Point2d;
use std::collections::HashMap;

pub use error::ParseError;
pub use xml::{parse_annotation_file, parse_annotations};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// SOP Instance UID 到 DICOM 文件名的映射. 由外部协作者 (DICOM 读取方) 构建.
pub type SopUidMap = HashMap<String, String>;

/// 一位医师在一个切片上绘制的一条结节轮廓.
///
/// 解析后不可变, 只被聚类器消费.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawAnnotation {
    /// 医师编号, 即 `readingSession` 在文档中的序号 (从 0 开始).
    pub reader_id: usize,

    /// 切片的稳定标识 (SOP Instance UID). 与文件名无关.
    pub image_ref: String,

    /// 切片的 z 坐标, 按原文保存.
    pub z_position: String,

    /// 轮廓点的算术平均.
    pub center: Point2d,

    /// 医师绘制的有序轮廓点, 至少 1 个.
    pub edge_points: Vec<Point2d>,

    /// 该医师给出的恶性度评分 (1-5). 缺失时为 `None`.
    pub malignancy: Option<u8>,

    /// 通过 [`SopUidMap`] 解析出的 DICOM 文件名. 未能解析时为 `None`.
    pub filename: Option<String>,
}

impl RawAnnotation {
    /// 轮廓点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.edge_points.len()
    }

    /// 是否没有轮廓点. 由解析器产生的记录永远返回 `false`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edge_points.is_empty()
    }

    /// 文件名是否已解析.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.filename.is_some()
    }
}
