//! 在 mask 上绘制基本图元. 所有图元都以 [`FOREGROUND`] 绘制, 越界部分被裁剪.
//!
//! 绘制本身交给 `imageproc::drawing`, 这里只负责坐标换算和退化输入的处理.

use crate::consts::gray::FOREGROUND;
use crate::{NoduleMask, PixelXy};
use image::Luma;
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;

const INK: Luma<u8> = Luma([FOREGROUND]);

#[inline]
fn to_point((x, y): PixelXy) -> Point<i32> {
    Point::new(x as i32, y as i32)
}

#[inline]
fn to_f32((x, y): PixelXy) -> (f32, f32) {
    (x as f32, y as f32)
}

impl NoduleMask {
    /// 绘制以 `center` 为圆心、`radius` 为半径的实心圆 (中点圆算法).
    pub fn fill_disc(&mut self, (cx, cy): PixelXy, radius: i64) {
        self.draw_with(|canvas| draw_filled_circle_mut(canvas, (cx as i32, cy as i32), radius as i32, INK));
    }

    /// 绘制从 `a` 到 `b`、线宽为 `thickness` 的实心线段 (平头).
    ///
    /// 线段两侧各向外扩展 `(thickness - 1) / 2` 个像素, 因此奇数线宽的水平线恰好覆盖
    /// `thickness` 行. `a == b` 时退化为实心圆.
    pub fn draw_thick_line(&mut self, a: PixelXy, b: PixelXy, thickness: i64) {
        let half = (thickness - 1).max(0) as f64 / 2.0;
        let (dx, dy) = ((b.0 - a.0) as f64, (b.1 - a.1) as f64);
        let len = dx.hypot(dy);
        if len == 0.0 {
            self.fill_disc(a, half.round() as i64);
            return;
        }
        let (nx, ny) = ((-dy / len * half).round() as i64, (dx / len * half).round() as i64);
        self.fill_polygon(&[
            (a.0 + nx, a.1 + ny),
            (b.0 + nx, b.1 + ny),
            (b.0 - nx, b.1 - ny),
            (a.0 - nx, a.1 - ny),
        ]);
    }

    /// 以 Bresenham 算法绘制从 `a` 到 `b` 的单像素宽线段.
    pub fn draw_line(&mut self, a: PixelXy, b: PixelXy) {
        self.draw_with(|canvas| draw_line_segment_mut(canvas, to_f32(a), to_f32(b), INK));
    }

    /// 实心填充多边形 `vertices` (自动闭合), 多边形的边本身也被绘制.
    ///
    /// 连续重复的顶点以及与首顶点重合的尾部顶点会被去除; 剩余不足 3 个顶点时
    /// 退化为线段或单个像素. 自相交多边形会产生多个互不相连的区域.
    pub fn fill_polygon(&mut self, vertices: &[PixelXy]) {
        let mut poly: Vec<Point<i32>> = Vec::with_capacity(vertices.len());
        for p in vertices.iter().copied().map(to_point) {
            if poly.last() != Some(&p) {
                poly.push(p);
            }
        }
        while poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }

        match poly.as_slice() {
            [] => {}
            [p] => self.draw_line((p.x as i64, p.y as i64), (p.x as i64, p.y as i64)),
            [p, q] => self.draw_line((p.x as i64, p.y as i64), (q.x as i64, q.y as i64)),
            _ => self.draw_with(|canvas| draw_polygon_mut(canvas, &poly, INK)),
        }
    }
}
