//! 多结节合成: 同一切片上的所有结节合并为一张 mask.

use crate::mask::COMPOSITE_CLOSE;
use crate::raster::rasterize;
use crate::{ImageSize, NoduleMask, Point2d};

/// 将同一切片上的多个边缘点集合成为一张二值 mask.
///
/// 每个点集独立调用 [`rasterize`], 结果按位或进全背景的累加器,
/// 最后统一做一次 3x3 闭运算并重新二值化. 没有任何点集时返回全背景 mask.
///
/// 并集满足交换律, 因此输出与点集的顺序无关.
pub fn composite<S>(point_sets: &[S], size: ImageSize) -> NoduleMask
where
    S: AsRef<[Point2d]> + Sync,
{
    let mut acc = union_all(point_sets, size);
    if !acc.is_background() {
        acc.close(&COMPOSITE_CLOSE);
        acc.threshold();
    }
    acc
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::prelude::*;

        fn union_all<S>(point_sets: &[S], size: ImageSize) -> NoduleMask
        where
            S: AsRef<[Point2d]> + Sync,
        {
            point_sets
                .par_iter()
                .map(|pts| rasterize(pts.as_ref(), size))
                .reduce(
                    || NoduleMask::zeros(size),
                    |mut a, b| {
                        a.union_assign(&b);
                        a
                    },
                )
        }
    } else {
        fn union_all<S>(point_sets: &[S], size: ImageSize) -> NoduleMask
        where
            S: AsRef<[Point2d]> + Sync,
        {
            let mut acc = NoduleMask::zeros(size);
            for pts in point_sets {
                acc.union_assign(&rasterize(pts.as_ref(), size));
            }
            acc
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: ImageSize = ImageSize::new(64, 48);

    fn blob_a() -> Vec<Point2d> {
        vec![(10.0, 10.0), (20.0, 10.0), (20.0, 20.0), (10.0, 20.0)]
    }

    fn blob_b() -> Vec<Point2d> {
        vec![(21.0, 12.0), (35.0, 14.0), (30.0, 30.0)]
    }

    #[test]
    fn test_no_nodules() {
        let sets: [Vec<Point2d>; 0] = [];
        let mask = composite(&sets, SIZE);
        assert_eq!(mask.shape(), (48, 64));
        assert!(mask.is_background());
    }

    #[test]
    fn test_empty_point_sets_contribute_nothing() {
        let empty: Vec<Point2d> = vec![];
        let mask = composite(&[empty.clone(), empty], SIZE);
        assert!(mask.is_background());
    }

    #[test]
    fn test_commutative() {
        let ab = composite(&[blob_a(), blob_b(), vec![(50.0, 40.0)]], SIZE);
        let ba = composite(&[vec![(50.0, 40.0)], blob_b(), blob_a()], SIZE);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_union_covers_each_nodule() {
        let single = rasterize(&blob_a(), SIZE);
        let both = composite(&[blob_a(), blob_b()], SIZE);
        for (pos, &pix) in single.indexed_iter() {
            if pix == 255 {
                assert_eq!(both[pos], 255);
            }
        }
        assert!(both.iter().all(|&p| p == 0 || p == 255));
    }
}
