//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// mask 中背景的像素值.
    pub const BACKGROUND: u8 = 0;

    /// mask 中结节 (前景) 的像素值.
    pub const FOREGROUND: u8 = 255;

    /// 二值化门限. 严格大于该值的像素被视为前景.
    pub const BINARY_THRESHOLD: u8 = 127;

    /// 像素是否是前景?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        p > BINARY_THRESHOLD
    }

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        !is_foreground(p)
    }

    /// 按 [`BINARY_THRESHOLD`] 二值化单个像素.
    #[inline]
    pub const fn binarize(p: u8) -> u8 {
        if is_foreground(p) {
            FOREGROUND
        } else {
            BACKGROUND
        }
    }
}

/// 栅格化相关的几何常量.
pub mod raster {
    /// 单点 (以及两点端点) 绘制的实心圆半径.
    pub const DOT_RADIUS: i64 = 3;

    /// 两点连线的线宽.
    pub const LINE_THICKNESS: i64 = 5;

    /// 单结节多边形填充后闭运算结构元的尺寸 `(宽, 高)`.
    pub const POLYGON_CLOSE_KERNEL: (u8, u8) = (2, 2);

    /// 多结节合成后闭运算结构元的尺寸 `(宽, 高)`.
    pub const COMPOSITE_CLOSE_KERNEL: (u8, u8) = (3, 3);
}

/// 结节半径 (YOLO 边界框和可视化使用).
pub mod radius {
    /// 无恶性度信息时的半径.
    pub const BASE: f64 = 10.0;

    /// 每一级恶性度增加的半径.
    pub const PER_MALIGNANCY: f64 = 3.0;
}

/// LIDC-IDRI XML 标注文件的默认命名空间.
pub const LIDC_NAMESPACE: &str = "http://www.nih.gov";

/// 生成 mask 时使用的聚类距离门限 (像素).
pub const MASK_DISTANCE_THRESHOLD: f64 = 10.0;

/// 仅用于可视化时使用的聚类距离门限 (像素).
pub const VISUAL_DISTANCE_THRESHOLD: f64 = 30.0;

/// 病例目录名前缀.
pub const CASE_PREFIX: &str = "LIDC-IDRI-";

/// 每个病例目录下共识结节汇总文件的文件名.
pub const SUMMARY_FILENAME: &str = "nodule_summary_new.json";

/// 文件名无法解析的结节会汇总写入该文件 (JSON lines).
pub const NULL_FILENAME_LOG: &str = "nodule_null_filename.log";

/// 样本文件名中序号的位数.
pub const SAMPLE_INDEX_WIDTH: usize = 6;

/// YOLO 标签中唯一的类别编号.
pub const NODULE_CLASS_ID: u32 = 0;

/// 恶性度评分的合法范围.
pub const MALIGNANCY_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// 可视化使用的 RGB 颜色, 与常见的 CSS 颜色名一致.
pub mod color {
    /// 红.
    pub const RED: [u8; 3] = [255, 0, 0];

    /// 绿 (CSS `green`, 而非纯绿).
    pub const GREEN: [u8; 3] = [0, 128, 0];

    /// 蓝.
    pub const BLUE: [u8; 3] = [0, 0, 255];

    /// 黄.
    pub const YELLOW: [u8; 3] = [255, 255, 0];

    /// 品红.
    pub const MAGENTA: [u8; 3] = [255, 0, 255];

    /// 青.
    pub const CYAN: [u8; 3] = [0, 255, 255];

    /// 橙.
    pub const ORANGE: [u8; 3] = [255, 165, 0];

    /// 紫.
    pub const PURPLE: [u8; 3] = [128, 0, 128];

    /// 按医师编号循环使用的调色板.
    pub const READER_PALETTE: [[u8; 3]; 8] = [RED, GREEN, BLUE, YELLOW, MAGENTA, CYAN, ORANGE, PURPLE];
}

/// 可视化使用的线宽与半径.
pub mod overlay {
    /// 共识结节圆的线宽.
    pub const CONSENSUS_RING_WIDTH: i32 = 3;

    /// 医师轮廓的线宽.
    pub const READER_LINE_WIDTH: i32 = 2;

    /// 只有一个点的医师轮廓以该半径画圆.
    pub const READER_DOT_RADIUS: i32 = 8;
}
