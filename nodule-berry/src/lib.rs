#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供 LIDC-IDRI 肺结节标注的解析、多医师共识聚类,
//! 以及面向 U-Net / YOLO 训练的 mask 与边界框标签生成算法.
//!
//! 该 crate 不负责 DICOM 文件读取、模型训练和推理, 这些工作由外部协作者完成.
//! 核心只消费: 按医师展开的标注记录、图像像素尺寸、SOP UID 到文件名的映射;
//! 并产出: 共识结节、二值 mask 和 YOLO 格式的标签行.
//!
//! # 注意
//!
//! 1. 该 crate 目前只针对 LIDC-IDRI 的 XML 标注格式 (命名空间 `http://www.nih.gov`),
//!   没有对其它数据源做直接适配.
//! 2. 所有栅格化过程都是确定性的: 同样的输入 (包括输入顺序) 一定得到同样的 mask.
//!
//! # 开发计划
//!
//! ### XML 标注解析 ✅
//!
//! 每个 `readingSession` 视为一位医师, 每个含边缘点的 `roi` 视为一条标注记录.
//!
//! 实现位于 `nodule-berry/src/annotation`.
//!
//! ### 共识聚类 ✅
//!
//! 同一切片 (SOP UID) 上的标注按 "首个成员为锚点" 的贪心规则合并.
//! 该规则对输入顺序敏感, 这是有意保留的行为, 不是 bug.
//!
//! 实现位于 `nodule-berry/src/cluster.rs`.
//!
//! ### 单结节栅格化 & 多结节合成 ✅
//!
//! 处理 0 / 1 / 2 / 多个边缘点的退化情况, 按质心极角排序近似星形多边形,
//! 只保留最大外轮廓, 并用形态学闭运算去除 1-2 像素的小洞.
//!
//! 实现位于 `nodule-berry/src/raster.rs`, `nodule-berry/src/compose.rs`
//! 以及 `nodule-berry/src/mask`.
//!
//! ### YOLO 标签 ✅
//!
//! 半径由恶性度决定: `10 + 3 * malignancy`, 无恶性度时为 `10`.
//! 归一化后的边界框不做 `[0, 1]` 截断.
//!
//! 实现位于 `nodule-berry/src/label.rs`.
//!
//! ### 肺窗 ✅
//!
//! 将 HU 值以窗位 -600, 窗宽 1600 映射为 8-bit 灰度值.
//!
//! 实现位于 `nodule-berry/src/window.rs`.
//!
//! ### 输出编号 ✅
//!
//! 不使用全局计数器. 每个病例的处理函数接收起始编号并返回下一个可用编号;
//! 并行处理时先写入病例私有的暂存文件名, 最后统一按病例顺序重新编号.
//!
//! 实现位于 `nodule-berry/src/export.rs`.
//!
//! ### 调试可视化 ✅
//!
//! 在切片上绘制共识结节中心圆和各医师原始轮廓.
//!
//! 实现位于 `nodule-berry/src/overlay.rs`.

/// 二维索引 `(高, 宽)`, 即 `(行, 列)`. 与 `ndarray` 的索引顺序一致.
pub type Idx2d = (usize, usize);

/// 标注坐标系中的点 `(x, y)`. `x` 向右增长, `y` 向下增长, 单位为像素.
pub type Point2d = (f64, f64);

/// 整数像素坐标 `(x, y)`. 允许为负, 以便在绘制前表达越界点.
pub type PixelXy = (i64, i64);

type Area2d = Vec<Idx2d>;
type Areas2d = Vec<Area2d>;

/// 图像的像素尺寸.
///
/// 注意这里的顺序是 `(宽, 高)`, 与 [`NoduleMask::shape`] 返回的 `(高, 宽)` 相反.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageSize {
    /// 图像宽 (列数).
    pub width: usize,

    /// 图像高 (行数).
    pub height: usize,
}

impl ImageSize {
    /// 以 `(宽, 高)` 初始化.
    #[inline]
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// 从 `ndarray` 风格的 `(高, 宽)` 形状初始化.
    #[inline]
    pub const fn from_shape((height, width): Idx2d) -> Self {
        Self { width, height }
    }

    /// 转换为 `ndarray` 风格的 `(高, 宽)` 形状.
    #[inline]
    pub const fn shape(&self) -> Idx2d {
        (self.height, self.width)
    }
}

pub mod consts;

pub mod geometry;

pub mod annotation;

pub mod cluster;

mod mask;

pub use mask::{Connectivity, ImgWriteRaw, NoduleMask, StructElem};

pub mod raster;

pub mod compose;

pub mod label;

pub mod window;

pub use window::{BitDepth, CtWindow, HuSlice, SliceImage};

pub mod dataset;

pub mod export;

pub mod overlay;

cfg_if::cfg_if! {
    if #[cfg(feature = "serde")] {
        pub mod summary;
    }
}

pub mod prelude;
