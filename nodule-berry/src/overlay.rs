//! 调试可视化: 在切片上绘制共识结节和各医师的原始轮廓.

use crate::annotation::RawAnnotation;
use crate::cluster::ConsensusNodule;
use crate::consts::color::*;
use crate::consts::overlay::*;
use crate::label::radius;
use crate::Point2d;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};

/// 恶性度对应的颜色: 按向下取整后的等级 1 绿, 2 黄, 3 橙, 4 红, 5 紫; 缺失或超出范围为蓝.
pub fn malignancy_color(malignancy: Option<f64>) -> Rgb<u8> {
    let rgb = match malignancy.map(f64::floor) {
        Some(m) if m == 1.0 => GREEN,
        Some(m) if m == 2.0 => YELLOW,
        Some(m) if m == 3.0 => ORANGE,
        Some(m) if m == 4.0 => RED,
        Some(m) if m == 5.0 => PURPLE,
        _ => BLUE,
    };
    Rgb(rgb)
}

/// 第 `reader_id` 位医师的颜色.
#[inline]
pub fn reader_color(reader_id: usize) -> Rgb<u8> {
    Rgb(READER_PALETTE[reader_id % READER_PALETTE.len()])
}

/// 灰度图转为三通道 RGB 画布.
pub fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}

/// 以共识结节中心为圆心、[`radius`] 为半径画圆环, 线宽 3 像素向内延伸.
pub fn draw_consensus(canvas: &mut RgbImage, nodules: &[ConsensusNodule]) {
    for n in nodules {
        let color = malignancy_color(n.malignancy);
        let center = to_i32(n.center);
        let r = radius(n.malignancy).round() as i32;
        draw_ring(canvas, center, r, CONSENSUS_RING_WIDTH, color);
    }
}

/// 按医师颜色画出每条原始轮廓 (折线, 不闭合). 只有一个点的轮廓画为半径 8 的圆环.
pub fn draw_readers(canvas: &mut RgbImage, records: &[RawAnnotation]) {
    for r in records {
        let color = reader_color(r.reader_id);
        match r.edge_points.as_slice() {
            [] => {}
            [p] => draw_ring(canvas, to_i32(*p), READER_DOT_RADIUS, READER_LINE_WIDTH, color),
            points => {
                for pair in points.windows(2) {
                    draw_thick_segment(canvas, pair[0], pair[1], READER_LINE_WIDTH, color);
                }
            }
        }
    }
}

fn draw_ring(canvas: &mut RgbImage, center: (i32, i32), r: i32, width: i32, color: Rgb<u8>) {
    for inset in 0..width {
        if r - inset >= 0 {
            draw_hollow_circle_mut(canvas, center, r - inset, color);
        }
    }
}

/// 沿次要轴平移若干次, 得到 `width` 像素宽的线段.
fn draw_thick_segment(canvas: &mut RgbImage, (x1, y1): Point2d, (x2, y2): Point2d, width: i32, color: Rgb<u8>) {
    let horizontal = (x2 - x1).abs() >= (y2 - y1).abs();
    for k in 0..width {
        let k = k as f32;
        let (dx, dy) = if horizontal { (0.0, k) } else { (k, 0.0) };
        draw_line_segment_mut(
            canvas,
            (x1 as f32 + dx, y1 as f32 + dy),
            (x2 as f32 + dx, y2 as f32 + dy),
            color,
        );
    }
}

#[inline]
fn to_i32((x, y): Point2d) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors() {
        assert_eq!(malignancy_color(None), Rgb(BLUE));
        assert_eq!(malignancy_color(Some(1.0)), Rgb(GREEN));
        assert_eq!(malignancy_color(Some(3.67)), Rgb(ORANGE));
        assert_eq!(malignancy_color(Some(5.0)), Rgb(PURPLE));
        assert_eq!(malignancy_color(Some(0.5)), Rgb(BLUE));
        assert_eq!(reader_color(0), Rgb(RED));
        assert_eq!(reader_color(9), Rgb(GREEN));
    }

    #[test]
    fn test_draw_consensus_ring() {
        let mut canvas = gray_to_rgb(&GrayImage::new(64, 64));
        let nodule = ConsensusNodule {
            image_ref: "u".into(),
            z_position: "0".into(),
            filename: None,
            center: (32.0, 32.0),
            edge_points: vec![],
            malignancy: None,
        };
        draw_consensus(&mut canvas, &[nodule]);
        assert_eq!(*canvas.get_pixel(42, 32), Rgb(BLUE));
        assert_eq!(*canvas.get_pixel(40, 32), Rgb(BLUE));
        assert_eq!(*canvas.get_pixel(32, 32), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_readers() {
        let mut canvas = gray_to_rgb(&GrayImage::from_pixel(32, 32, image::Luma([10])));
        let record = RawAnnotation {
            reader_id: 1,
            image_ref: "u".into(),
            z_position: "0".into(),
            center: (10.0, 5.0),
            edge_points: vec![(5.0, 5.0), (15.0, 5.0)],
            malignancy: None,
            filename: None,
        };
        draw_readers(&mut canvas, &[record]);
        assert_eq!(*canvas.get_pixel(10, 5), Rgb(GREEN));
        assert_eq!(*canvas.get_pixel(10, 6), Rgb(GREEN));
        assert_eq!(*canvas.get_pixel(10, 8), Rgb([10, 10, 10]));
    }
}
