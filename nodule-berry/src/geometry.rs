//! 几何基础操作: 距离, 质心, 极角排序, 坐标截断.

use crate::{ImageSize, PixelXy, Point2d};
use ordered_float::OrderedFloat;

/// 两点之间的欧几里得距离.
#[inline]
pub fn distance((x1, y1): Point2d, (x2, y2): Point2d) -> f64 {
    ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
}

/// 点集的质心 (算术平均). 点集为空时返回 `None`.
pub fn centroid(points: &[Point2d]) -> Option<Point2d> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    Some((sx / n, sy / n))
}

/// 点 `p` 相对于 `origin` 的极角, 范围 `(-PI, PI]`.
#[inline]
pub fn angle_from((ox, oy): Point2d, (x, y): Point2d) -> f64 {
    (y - oy).atan2(x - ox)
}

/// 按相对点集质心的极角升序排列点集, 得到一个近似的星形多边形顶点序列.
///
/// 排序是稳定的: 极角相同的点保持原有的相对顺序.
///
/// # 注意
///
/// 这只是启发式方法. 对于非星形的轮廓, 排序后的多边形仍然可能自相交.
pub fn sort_by_angle(points: &[Point2d]) -> Vec<Point2d> {
    let Some(center) = centroid(points) else {
        return vec![];
    };
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| OrderedFloat(angle_from(center, *p)));
    sorted
}

/// 将 `v` 截断到 `[0, len - 1]` 闭区间. `len` 为 0 时返回 0.
#[inline]
pub fn clamp_coord(v: f64, len: usize) -> f64 {
    let upper = len.saturating_sub(1) as f64;
    if v.is_nan() {
        return 0.0;
    }
    num::clamp(v, 0.0, upper)
}

/// 先将点截断到图像范围内, 再四舍五入 (银行家舍入, 与 Python `round` 一致)
/// 为整数像素坐标.
///
/// 越界的标注坐标会被静默截断, 而不是被拒绝.
#[inline]
pub fn clamp_round((x, y): Point2d, size: ImageSize) -> PixelXy {
    let x = clamp_coord(x, size.width).round_ties_even() as i64;
    let y = clamp_coord(y, size.height).round_ties_even() as i64;
    (x, y)
}

/// 按顺序截断并取整, 同时去除 **连续** 重复的像素坐标.
///
/// 首尾相同的点不会被去除 (它们并不连续).
pub fn dedup_pixels(points: &[Point2d], size: ImageSize) -> Vec<PixelXy> {
    let mut ans: Vec<PixelXy> = Vec::with_capacity(points.len());
    for &p in points {
        let px = clamp_round(p, size);
        if ans.last() != Some(&px) {
            ans.push(px);
        }
    }
    ans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_distance_and_centroid() {
        assert!(float_eq(distance((0.0, 0.0), (3.0, 4.0)), 5.0));
        assert_eq!(centroid(&[]), None);
        let (cx, cy) = centroid(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]).unwrap();
        assert!(float_eq(cx, 5.0));
        assert!(float_eq(cy, 5.0));
    }

    #[test]
    fn test_sort_by_angle_square() {
        let shuffled = [(10.0, 10.0), (0.0, 0.0), (0.0, 10.0), (10.0, 0.0)];
        let sorted = sort_by_angle(&shuffled);
        assert_eq!(
            sorted,
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]
        );
    }

    #[test]
    fn test_clamp_round() {
        let size = ImageSize::new(20, 10);
        assert_eq!(clamp_round((-5.0, 3.4), size), (0, 3));
        assert_eq!(clamp_round((25.0, 9.6), size), (19, 9));
        // 与 Python 的 round 一致: 2.5 -> 2, 3.5 -> 4.
        assert_eq!(clamp_round((2.5, 3.5), size), (2, 4));
        assert_eq!(clamp_round((f64::NAN, 1.0), size), (0, 1));
    }

    #[test]
    fn test_dedup_pixels_only_consecutive() {
        let size = ImageSize::new(100, 100);
        let pts = [(1.0, 1.0), (1.2, 0.9), (5.0, 5.0), (1.0, 1.0)];
        assert_eq!(dedup_pixels(&pts, size), vec![(1, 1), (5, 5), (1, 1)]);
    }
}
