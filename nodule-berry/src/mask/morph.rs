//! 二值形态学: 膨胀、腐蚀和闭运算, 基于 `imageproc::morphology` 的灰度形态学.

use crate::consts::raster::{COMPOSITE_CLOSE_KERNEL, POLYGON_CLOSE_KERNEL};
use crate::NoduleMask;
use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};
use once_cell::sync::Lazy;

/// 单结节多边形填充后使用的 2x2 结构元.
pub(crate) static POLYGON_CLOSE: Lazy<StructElem> =
    Lazy::new(|| StructElem::ellipse(POLYGON_CLOSE_KERNEL.0, POLYGON_CLOSE_KERNEL.1));

/// 多结节合成后使用的 3x3 结构元.
pub(crate) static COMPOSITE_CLOSE: Lazy<StructElem> =
    Lazy::new(|| StructElem::ellipse(COMPOSITE_CLOSE_KERNEL.0, COMPOSITE_CLOSE_KERNEL.1));

/// 形态学结构元.
///
/// 同时保存结构元本身和它关于锚点的反射: 膨胀使用反射, 腐蚀使用本身,
/// 于是非对称的结构元做闭运算时结果也不会整体平移.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructElem {
    kernel: Mask,
    reflected: Mask,
    len: usize,
}

impl StructElem {
    /// 由结构元图像 (非零像素为有效元素) 和锚点 `(x, y)` 构建结构元.
    ///
    /// # 注意
    ///
    /// 图像的宽和高都不能超过 255.
    pub fn from_image(image: &GrayImage, (ax, ay): (u8, u8)) -> Self {
        let (width, height) = image.dimensions();
        let reflected_image = GrayImage::from_fn(width, height, |x, y| *image.get_pixel(width - 1 - x, height - 1 - y));
        let (rx, ry) = ((width - 1) as u8 - ax, (height - 1) as u8 - ay);
        Self {
            kernel: Mask::from_image(image, ax, ay),
            reflected: Mask::from_image(&reflected_image, rx, ry),
            len: image.pixels().filter(|p| p.0[0] != 0).count(),
        }
    }

    /// 内切于 `width x height` 矩形的椭圆结构元, 锚点位于 `(width / 2, height / 2)`.
    ///
    /// 逐行计算半弦长并按 "四舍六入五成双" 取整. 于是 2x2 为
    /// `[[0, 1], [1, 1]]`, 3x3 为十字形.
    pub fn ellipse(width: u8, height: u8) -> Self {
        let r = (height / 2) as f64;
        let c = (width / 2) as f64;
        let inv_r2 = if r > 0.0 { 1.0 / (r * r) } else { 0.0 };
        let image = GrayImage::from_fn(width as u32, height as u32, |x, y| {
            let dy = y as f64 - r;
            let on = dy.abs() <= r && {
                let dx = (c * ((r * r - dy * dy) * inv_r2).sqrt()).round_ties_even();
                (x as f64 - c).abs() <= dx
            };
            Luma([if on { u8::MAX } else { 0 }])
        });
        Self::from_image(&image, (width / 2, height / 2))
    }

    /// 有效元素个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 结构元是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl NoduleMask {
    /// 膨胀. 越界像素视为背景.
    pub fn dilate(&self, elem: &StructElem) -> Self {
        Self::from_gray_image(&grayscale_dilate(&self.to_gray_image(), &elem.reflected))
    }

    /// 腐蚀. 越界像素被忽略.
    pub fn erode(&self, elem: &StructElem) -> Self {
        Self::from_gray_image(&grayscale_erode(&self.to_gray_image(), &elem.kernel))
    }

    /// 闭运算 (先膨胀后腐蚀), 就地修改.
    ///
    /// 结果总是包含原前景, 且不会整体平移, 即使结构元不对称.
    pub fn close(&mut self, elem: &StructElem) {
        let closed = grayscale_erode(&grayscale_dilate(&self.to_gray_image(), &elem.reflected), &elem.kernel);
        *self = Self::from_gray_image(&closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::gray::{BACKGROUND, FOREGROUND};
    use crate::ImageSize;

    #[test]
    fn test_ellipse_kernels() {
        let two = StructElem::ellipse(2, 2);
        let expect = GrayImage::from_raw(2, 2, vec![0, 255, 255, 255]).unwrap();
        assert_eq!(two, StructElem::from_image(&expect, (1, 1)));
        assert_eq!(POLYGON_CLOSE.len(), 3);

        let three = StructElem::ellipse(3, 3);
        assert_eq!(three.kernel, Mask::diamond(1));
        assert_eq!(three.reflected, Mask::diamond(1));
        assert_eq!(*COMPOSITE_CLOSE, three);
        assert_eq!(three.len(), 5);
    }

    #[test]
    fn test_dilate_erode_asymmetric() {
        let mut mask = NoduleMask::zeros(ImageSize::new(5, 5));
        mask[(2, 2)] = FOREGROUND;
        let grown = mask.dilate(&POLYGON_CLOSE);
        assert_eq!(grown.foreground_pos::<Vec<_>>(), vec![(1, 2), (2, 1), (2, 2)]);
        assert_eq!(grown.erode(&POLYGON_CLOSE), mask);
    }

    #[test]
    fn test_close_fills_pinhole() {
        let mut mask = NoduleMask::zeros(ImageSize::new(9, 9));
        for h in 2..7 {
            for w in 2..7 {
                mask[(h, w)] = FOREGROUND;
            }
        }
        mask[(4, 4)] = BACKGROUND;
        mask.close(&COMPOSITE_CLOSE);
        assert_eq!(mask[(4, 4)], FOREGROUND);
        assert_eq!(mask.foreground_count(), 25);
    }

    #[test]
    fn test_close_is_extensive() {
        let mut mask = NoduleMask::zeros(ImageSize::new(8, 8));
        mask[(0, 0)] = FOREGROUND;
        mask[(3, 5)] = FOREGROUND;
        mask[(7, 7)] = FOREGROUND;
        let before = mask.clone();
        mask.close(&POLYGON_CLOSE);
        assert_eq!(mask, before);
    }
}
