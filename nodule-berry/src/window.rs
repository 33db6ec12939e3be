//! CT 窗与 HU 值切片.

use crate::{Idx2d, ImageSize, ImgWriteRaw};
use image::{GrayImage, ImageBuffer, ImageResult, Luma};
use itertools::Itertools;
use ndarray::Array2;
use std::path::Path;

/// 16-bit 单通道图像.
pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// CT 窗口, 包含窗位 (window level) 和窗宽 (window width).
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CtWindow {
    level: f32,
    width: f32,
}

impl CtWindow {
    /// 构建 CT 窗.
    ///
    /// `level` 和 `width` 必须在合理范围内, 否则返回 `None`.
    pub fn new(level: f32, width: f32) -> Option<CtWindow> {
        if (-1e5..=1e5).contains(&level) && 0.0 < width && width <= 1e5 {
            Some(Self { level, width })
        } else {
            None
        }
    }

    /// 构建一个便于展示胸部 CT 肺实质及结节的窗口 (肺窗). 该窗口的窗位为
    /// -600, 窗宽为 1600.
    #[inline]
    pub const fn from_lung_visual() -> CtWindow {
        Self {
            level: -600.0,
            width: 1600.0,
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.level - self.width / 2.0
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.level + self.width / 2.0
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// 求在当前 CT 窗设置下, `ct` HU 值对应的灰度图像素整数值 (0 <= value <= 255).
    /// 小数部分被截断而不是四舍五入.
    ///
    /// 如果 `ct` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, ct: f32) -> Option<u8> {
        if !ct.is_finite() {
            return None;
        }
        let lb = self.lower_bound();
        if ct <= lb {
            Some(u8::MIN)
        } else if ct >= self.upper_bound() {
            Some(u8::MAX)
        } else {
            // 255, not 256.
            Some((((ct - lb) / self.width()) * 255.0) as u8)
        }
    }
}

impl Default for CtWindow {
    fn default() -> Self {
        Self::from_lung_visual()
    }
}

/// 导出图像的位深.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BitDepth {
    /// 用 CT 窗映射为 8-bit 灰度.
    #[default]
    Eight,

    /// 按切片自身的最小/最大 HU 值映射为 16-bit 灰度.
    Sixteen,
}

impl BitDepth {
    /// 扩展名为 `ext` 的图像格式能否保存该位深?
    ///
    /// 16-bit 只能保存为 `png` 或 `tif`/`tiff`.
    pub fn supports_ext(&self, ext: &str) -> bool {
        match self {
            BitDepth::Eight => true,
            BitDepth::Sixteen => ["png", "tif", "tiff"].iter().any(|e| e.eq_ignore_ascii_case(ext)),
        }
    }
}

/// 导出用的单通道切片图像.
#[derive(Clone, Debug, PartialEq)]
pub enum SliceImage {
    /// 8-bit.
    Gray8(GrayImage),

    /// 16-bit.
    Gray16(Gray16Image),
}

impl SliceImage {
    /// 图像尺寸 (宽, 高).
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            SliceImage::Gray8(img) => img.dimensions(),
            SliceImage::Gray16(img) => img.dimensions(),
        }
    }

    /// 位深.
    #[inline]
    pub fn depth(&self) -> BitDepth {
        match self {
            SliceImage::Gray8(_) => BitDepth::Eight,
            SliceImage::Gray16(_) => BitDepth::Sixteen,
        }
    }
}

impl From<GrayImage> for SliceImage {
    #[inline]
    fn from(img: GrayImage) -> Self {
        SliceImage::Gray8(img)
    }
}

/// 按原样存储, 格式由扩展名决定.
impl ImgWriteRaw for SliceImage {
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        match self {
            SliceImage::Gray8(img) => img.save(path),
            SliceImage::Gray16(img) => img.save(path),
        }
    }
}

/// 以 HU 值存储的二维 CT 切片.
#[derive(Clone, Debug, PartialEq)]
pub struct HuSlice {
    data: Array2<f32>,
}

impl HuSlice {
    /// 由 DICOM 存储值构建切片: `hu = stored * slope + intercept`.
    ///
    /// `stored` 为行优先排列. 长度与 `size` 不符时返回 `None`.
    pub fn from_stored(stored: &[i32], size: ImageSize, slope: f32, intercept: f32) -> Option<Self> {
        if stored.len() != size.width * size.height {
            return None;
        }
        let hu = stored.iter().map(|&v| v as f32 * slope + intercept).collect();
        let data = Array2::from_shape_vec(size.shape(), hu).ok()?;
        Some(Self { data })
    }

    /// 直接由 HU 值初始化.
    #[inline]
    pub fn from_raw(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 图像的分辨率 (宽, 高).
    #[inline]
    pub fn image_size(&self) -> ImageSize {
        ImageSize::from_shape(self.shape())
    }

    /// 获取给定位置 (高, 宽) 的 HU 值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<f32> {
        self.data.get(pos).copied()
    }

    /// 最小和最大的有限 HU 值. 没有有限值时返回 `None`.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .minmax()
            .into_option()
    }

    /// 用 `window` 映射为 8-bit 灰度图. 无意义的 HU 值映射为 0.
    pub fn to_gray(&self, window: &CtWindow) -> GrayImage {
        let (height, width) = self.shape();
        GrayImage::from_fn(width as u32, height as u32, |w, h| {
            let hu = self.data[(h as usize, w as usize)];
            Luma([window.eval(hu).unwrap_or(u8::MIN)])
        })
    }

    /// 按切片自身的最小/最大 HU 值线性映射为 16-bit 灰度图, 小数部分截断.
    ///
    /// 切片为常数时返回全 0 图像.
    pub fn to_gray16(&self) -> Gray16Image {
        let (height, width) = self.shape();
        let (lo, hi) = self.min_max().unwrap_or((0.0, 0.0));
        let span = hi - lo;
        Gray16Image::from_fn(width as u32, height as u32, |w, h| {
            let hu = self.data[(h as usize, w as usize)];
            let v = if span > 0.0 && hu.is_finite() {
                ((hu - lo) / span * u16::MAX as f32) as u16
            } else {
                0
            };
            Luma([v])
        })
    }

    /// 按 `depth` 生成导出用的图像. 16-bit 时不使用 `window`.
    pub fn render(&self, window: &CtWindow, depth: BitDepth) -> SliceImage {
        match depth {
            BitDepth::Eight => SliceImage::Gray8(self.to_gray(window)),
            BitDepth::Sixteen => SliceImage::Gray16(self.to_gray16()),
        }
    }
}
