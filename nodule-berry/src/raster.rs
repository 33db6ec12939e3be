//! 单结节栅格化: 把一组边缘点变成一张二值 mask.

use crate::consts::raster::{DOT_RADIUS, LINE_THICKNESS};
use crate::geometry::{clamp_round, dedup_pixels, sort_by_angle};
use crate::mask::POLYGON_CLOSE;
use crate::{ImageSize, NoduleMask, PixelXy, Point2d};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use ordered_float::OrderedFloat;

/// 将边缘点集 `points` 栅格化为尺寸为 `size` 的二值 mask.
///
/// 1. 0 个点: 全背景;
/// 2. 1 个点: 半径 3 的实心圆;
/// 3. 2 个点: 线宽 5 的线段, 两端各加一个半径 3 的实心圆;
/// 4. 3 个及以上: 按质心极角排序, 截断取整并去除连续重复点 (剩余不足 3 个时返回全背景),
///    实心填充多边形, 只保留多边形面积最大的外轮廓区域 (空洞填实), 最后做一次 2x2 闭运算.
///
/// 所有坐标在取整前都被截断到图像范围内.
///
/// # 注意
///
/// 极角排序只是近似. 对于非星形的轮廓, 多边形仍可能自相交; 自相交产生的碎片会被丢弃.
pub fn rasterize(points: &[Point2d], size: ImageSize) -> NoduleMask {
    let mut mask = NoduleMask::zeros(size);
    if size.width == 0 || size.height == 0 {
        return mask;
    }
    match points {
        [] => return mask,
        [p] => mask.fill_disc(clamp_round(*p, size), DOT_RADIUS),
        [a, b] => {
            let a = clamp_round(*a, size);
            let b = clamp_round(*b, size);
            mask.draw_thick_line(a, b, LINE_THICKNESS);
            mask.fill_disc(a, DOT_RADIUS);
            mask.fill_disc(b, DOT_RADIUS);
        }
        _ => {
            let vertices = dedup_pixels(&sort_by_angle(points), size);
            if vertices.len() < 3 {
                return mask;
            }
            mask.fill_polygon(&vertices);
            keep_largest_external(&mut mask);
            mask.close(&POLYGON_CLOSE);
        }
    }
    mask.threshold();
    mask
}

/// 只保留面积最大的外轮廓区域, 并将其内部填实.
///
/// 外轮廓指不被任何其它区域包围的区域边界. 面积是轮廓点构成的多边形面积 (鞋带公式),
/// 而不是区域的像素数; 面积相同时保留先找到的轮廓 (行优先). 没有任何前景时 mask 不变.
fn keep_largest_external(mask: &mut NoduleMask) {
    let Some(contour) = largest_external_contour(mask) else {
        return;
    };
    *mask = NoduleMask::zeros(mask.image_size());
    mask.fill_polygon(&contour);
}

/// 面积最大的外轮廓, 坐标为 `(x, y)`.
fn largest_external_contour(mask: &NoduleMask) -> Option<Vec<PixelXy>> {
    // 四周补一圈背景, 贴边的区域才能被识别为外轮廓.
    let (width, height) = (mask.width() as u32, mask.height() as u32);
    let mut padded = GrayImage::new(width + 2, height + 2);
    for ((h, w), &pixel) in mask.indexed_iter() {
        padded.put_pixel(w as u32 + 1, h as u32 + 1, image::Luma([pixel]));
    }

    find_contours::<i64>(&padded)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none() && !c.points.is_empty())
        .map(|c| c.points.iter().map(|p| (p.x - 1, p.y - 1)).collect::<Vec<_>>())
        .rev()
        .max_by_key(|points| OrderedFloat(polygon_area(points)))
}

/// 多边形 (自动闭合) 的无向面积.
fn polygon_area(points: &[PixelXy]) -> f64 {
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(&(x0, y0), &(x1, y1))| x0 * y1 - x1 * y0)
        .sum();
    twice.abs() as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::distance;

    fn fg_positions(mask: &NoduleMask) -> Vec<(usize, usize)> {
        mask.foreground_pos()
    }

    #[test]
    fn test_empty_points() {
        let mask = rasterize(&[], ImageSize::new(32, 16));
        assert_eq!(mask.shape(), (16, 32));
        assert!(mask.is_background());
    }

    #[test]
    fn test_single_point_bounded() {
        for p in [(10.0, 10.0), (3.4, 7.6), (0.0, 0.0), (31.0, 15.0)] {
            let mask = rasterize(&[p], ImageSize::new(32, 16));
            assert!(mask.foreground_count() > 0);
            for (h, w) in fg_positions(&mask) {
                assert!(distance((w as f64, h as f64), p) <= 3.0 + 1.0);
            }
        }
    }

    #[test]
    fn test_single_point_out_of_bounds_is_clamped() {
        let mask = rasterize(&[(-40.0, 100.0)], ImageSize::new(20, 20));
        assert!(mask.foreground_count() > 0);
        assert_eq!(mask[(19, 0)], 255);
    }

    #[test]
    fn test_two_points_connected() {
        let mask = rasterize(&[(2.0, 10.0), (17.0, 10.0)], ImageSize::new(20, 20));
        assert_eq!(mask[(10, 2)], 255);
        assert_eq!(mask[(10, 17)], 255);
        assert_eq!(mask.foreground_areas().len(), 1);
    }

    #[test]
    fn test_two_coincident_points() {
        let a = rasterize(&[(5.0, 5.0), (5.2, 5.1)], ImageSize::new(20, 20));
        assert!(a.foreground_count() >= 29);
    }

    #[test]
    fn test_unit_square() {
        let square = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let mask = rasterize(&square, ImageSize::new(20, 20));
        assert_eq!(mask.foreground_areas().len(), 1);
        assert!(mask.foreground_count() >= 100);
        for (h, w) in fg_positions(&mask) {
            assert!(h <= 11 && w <= 11);
        }
        assert!(mask.iter().all(|&p| p == 0 || p == 255));
    }

    #[test]
    fn test_shuffled_contour_gives_same_mask() {
        let size = ImageSize::new(40, 40);
        let ordered = [(10.0, 10.0), (30.0, 12.0), (28.0, 30.0), (12.0, 28.0)];
        let shuffled = [(28.0, 30.0), (10.0, 10.0), (12.0, 28.0), (30.0, 12.0)];
        assert_eq!(rasterize(&ordered, size), rasterize(&shuffled, size));
    }

    #[test]
    fn test_degenerate_after_dedup() {
        let mask = rasterize(&[(5.1, 5.1), (5.2, 4.9), (4.9, 5.0)], ImageSize::new(20, 20));
        assert!(mask.is_background());
    }

    #[test]
    fn test_polygon_clamped_to_canvas() {
        let big = [(-10.0, -10.0), (30.0, -10.0), (30.0, 30.0), (-10.0, 30.0)];
        let mask = rasterize(&big, ImageSize::new(20, 20));
        assert_eq!(mask.foreground_count(), 400);
    }

    #[test]
    fn test_polygon_area() {
        assert_eq!(polygon_area(&[(0, 0), (4, 0), (4, 3), (0, 3)]), 12.0);
        assert_eq!(polygon_area(&[(0, 0), (0, 3), (4, 3), (4, 0)]), 12.0);
        assert_eq!(polygon_area(&[(2, 2)]), 0.0);
    }

    #[test]
    fn test_keep_largest_external_by_contour_area() {
        // 左边是 3x3 的实心块 (轮廓面积 4), 右边是 1x12 的细线 (12 个像素, 轮廓面积 0).
        let mut mask = NoduleMask::zeros(ImageSize::new(20, 8));
        mask.fill_polygon(&[(0, 0), (2, 0), (2, 2), (0, 2)]);
        mask.draw_line((6, 5), (17, 5));
        assert_eq!(mask.foreground_count(), 21);

        keep_largest_external(&mut mask);
        assert_eq!(mask.foreground_count(), 9);
        assert_eq!(mask[(0, 0)], 255);
        assert_eq!(mask[(5, 10)], 0);
    }

    #[test]
    fn test_keep_largest_external_fills_holes() {
        // 环形区域内部的孤立碎片并入外轮廓.
        let mut mask = NoduleMask::zeros(ImageSize::new(12, 12));
        mask.fill_polygon(&[(1, 1), (10, 1), (10, 10), (1, 10)]);
        for h in 3..9 {
            for w in 3..9 {
                mask[(h, w)] = 0;
            }
        }
        mask[(5, 5)] = 255;
        keep_largest_external(&mut mask);
        assert_eq!(mask.foreground_count(), 100);
        assert_eq!(mask[(0, 0)], 0);
    }

    #[test]
    fn test_c_shaped_contour() {
        let c_shape = [
            (10.0, 10.0),
            (40.0, 10.0),
            (40.0, 18.0),
            (20.0, 18.0),
            (20.0, 32.0),
            (40.0, 32.0),
            (40.0, 40.0),
            (10.0, 40.0),
        ];
        let mask = rasterize(&c_shape, ImageSize::new(64, 64));
        assert_eq!(mask.foreground_areas().len(), 1);
        assert!(mask.foreground_count() > 0);
        assert!(mask.iter().all(|&p| p == 0 || p == 255));
    }

    #[test]
    fn test_non_finite_points() {
        let size = ImageSize::new(16, 16);
        let points = [(f64::NAN, 3.0), (f64::INFINITY, 8.0), (4.0, f64::NEG_INFINITY), (2.0, 12.0)];
        let mask = rasterize(&points, size);
        assert_eq!(mask.shape(), (16, 16));
        let _ = rasterize(&points[..1], size);
        let _ = rasterize(&points[..2], size);
    }

    #[test]
    fn test_zero_sized_canvas() {
        let mask = rasterize(&[(1.0, 1.0)], ImageSize::new(0, 0));
        assert_eq!(mask.size(), 0);
    }
}
