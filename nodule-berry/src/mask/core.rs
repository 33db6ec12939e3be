use super::{neighbour4, neighbour8, Predicate};
use crate::consts::gray::*;
use crate::{Area2d, Areas2d, Idx2d, ImageSize};
use image::{GrayImage, Luma};
use ndarray::iter::Iter;
use ndarray::{Array2, ArrayView2, Ix2, Zip};
use std::collections::VecDeque;
use std::ops::{Index, IndexMut};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 连通规则.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Connectivity {
    /// 上下左右相邻.
    Four,

    /// 上下左右及对角相邻.
    Eight,
}

/// 拥有所有权的二维单通道结节 mask, 背景为 [`BACKGROUND`], 结节为 [`FOREGROUND`].
///
/// 经过 [`NoduleMask::threshold`] 后, 像素值只有 0 和 255 两种.
/// 每张 mask 都是新建的, 不存在跨切片复用.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NoduleMask {
    data: Array2<u8>,
}

impl Index<Idx2d> for NoduleMask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx2d> for NoduleMask {
    #[inline]
    fn index_mut(&mut self, index: Idx2d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl NoduleMask {
    /// 构建给定尺寸的全背景 mask.
    #[inline]
    pub fn zeros(size: ImageSize) -> Self {
        Self {
            data: Array2::zeros(size.shape()),
        }
    }

    /// 直接由底层数据初始化. 不检查像素值.
    #[inline]
    pub fn from_raw(data: Array2<u8>) -> Self {
        Self { data }
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<u8> {
        self.data
    }

    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<'_, u8> {
        self.data.view()
    }

    /// 获取可以迭代图像像素的迭代器.
    #[inline]
    pub fn iter(&self) -> Iter<'_, u8, Ix2> {
        self.data.iter()
    }

    /// 以行优先规则, 获取能迭代图像所有 `(索引, 像素值)` 的迭代器.
    #[inline]
    pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &u8)> {
        self.data.indexed_iter()
    }

    /// 以行优先规则, 获取能迭代图像所有索引的迭代器.
    #[inline]
    pub fn pos_iter(&self) -> impl Iterator<Item = Idx2d> {
        ndarray::indices(self.shape()).into_iter()
    }

    /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&u8> {
        self.data.get(pos)
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

    /// 获得图像的高.
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 获得图像的宽.
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 图像的像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 判断一个索引是否合法 (未越界).
    #[inline]
    pub fn check(&self, (h, w): Idx2d) -> bool {
        let (h_len, w_len) = self.shape();
        h < h_len && w < w_len
    }

    /// 统计图像中值为 `value` 的像素总个数.
    #[inline]
    pub fn count(&self, value: u8) -> usize {
        self.data.iter().filter(|&p| *p == value).count()
    }

    /// 统计前景像素个数.
    #[inline]
    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&p| is_foreground(*p)).count()
    }

    /// 该图是否为全背景图?
    #[inline]
    pub fn is_background(&self) -> bool {
        self.data.iter().copied().all(is_background)
    }

    /// 所有前景像素的索引.
    pub fn foreground_pos<B: FromIterator<Idx2d>>(&self) -> B {
        self.indexed_iter()
            .filter_map(|(pos, pixel)| is_foreground(*pixel).then_some(pos))
            .collect()
    }

    /// 将 `it` 中的每个索引对应的像素改为 `new`.
    pub fn fill_batch<I: IntoIterator<Item = Idx2d>>(&mut self, it: I, new: u8) {
        for pos in it.into_iter() {
            self[pos] = new;
        }
    }

    /// 逐像素按位或, 即两张 mask 的并集.
    ///
    /// # 注意
    ///
    /// 两张 mask 尺寸必须一致, 否则程序 panic.
    pub fn union_assign(&mut self, other: &NoduleMask) {
        assert_eq!(self.shape(), other.shape(), "mask 尺寸不符");
        Zip::from(&mut self.data)
            .and(&other.data)
            .for_each(|a, &b| *a |= b);
    }

    /// 以 [`BINARY_THRESHOLD`] 为门限就地二值化. 对已经是严格二值的 mask 无影响.
    pub fn threshold(&mut self) {
        self.data.mapv_inplace(binarize);
    }

    /// 按照给定相邻规则获取所有区域. 两个像素 `p1` 和 `p2` 属于同一个区域,
    /// 当且仅当存在一条从 `p1` 到 `p2` 的相邻路径, 且路径上的所有像素
    /// (包括 `p1` 和 `p2`) 都满足谓词 `pred`.
    ///
    /// 区域按其行优先意义下第一个像素的顺序排列.
    pub fn areas(&self, pred: Predicate, conn: Connectivity) -> Areas2d {
        let mut ans = Areas2d::with_capacity(1);
        let mut bfs_q = VecDeque::with_capacity(4);
        let mut vis = Array2::from_elem(self.shape(), false);

        for pos in self.pos_iter() {
            if vis[pos] || !pred(self[pos]) {
                continue;
            }
            vis[pos] = true;
            bfs_q.push_back(pos);
            let mut this_area = Area2d::with_capacity(1);
            while let Some(cur) = bfs_q.pop_front() {
                this_area.push(cur);
                let mut visit = |next: Idx2d| {
                    if self.check(next) && !vis[next] && pred(self[next]) {
                        vis[next] = true;
                        bfs_q.push_back(next);
                    }
                };
                match conn {
                    Connectivity::Four => neighbour4(cur).into_iter().for_each(&mut visit),
                    Connectivity::Eight => neighbour8(cur).into_iter().for_each(&mut visit),
                }
            }
            ans.push(this_area);
        }
        ans
    }

    /// 按照 8-相邻原则获得图像中所有前景区域.
    #[inline]
    pub fn foreground_areas(&self) -> Areas2d {
        self.areas(is_foreground, Connectivity::Eight)
    }

    /// 转换为 `image` 灰度图, 像素值按原样保留.
    pub fn to_gray_image(&self) -> GrayImage {
        let (height, width) = self.shape();
        GrayImage::from_fn(width as u32, height as u32, |w, h| Luma([self[(h as usize, w as usize)]]))
    }

    /// 由 `image` 灰度图构建, 像素值按原样保留.
    pub fn from_gray_image(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_raw(Array2::from_shape_fn((height as usize, width as usize), |(h, w)| {
            image.get_pixel(w as u32, h as u32).0[0]
        }))
    }

    /// 将 mask 作为 `GrayImage` 画布交给 `f` 修改, 再写回.
    pub(crate) fn draw_with<F: FnOnce(&mut GrayImage)>(&mut self, f: F) {
        let mut canvas = self.to_gray_image();
        f(&mut canvas);
        *self = Self::from_gray_image(&canvas);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_rows(rows: &[&str]) -> NoduleMask {
        let h = rows.len();
        let w = rows[0].len();
        let data = rows
            .iter()
            .flat_map(|r| r.bytes().map(|b| if b == b'#' { FOREGROUND } else { BACKGROUND }))
            .collect();
        NoduleMask::from_raw(Array2::from_shape_vec((h, w), data).unwrap())
    }

    #[test]
    fn test_shape_and_counts() {
        let mask = NoduleMask::zeros(ImageSize::new(7, 3));
        assert_eq!(mask.shape(), (3, 7));
        assert_eq!(mask.image_size(), ImageSize::new(7, 3));
        assert!(mask.is_background());
        assert_eq!(mask.count(BACKGROUND), 21);
        assert!(mask.check((2, 6)));
        assert!(!mask.check((3, 0)));
    }

    #[test]
    fn test_areas_connectivity() {
        let mask = from_rows(&["#...", ".#..", "...#", "...#"]);
        assert_eq!(mask.areas(is_foreground, Connectivity::Four).len(), 3);
        assert_eq!(mask.foreground_areas().len(), 1);
    }

    #[test]
    fn test_gray_image_round_trip() {
        let mask = from_rows(&["#..", ".#.", "..#", "#.#"]);
        let image = mask.to_gray_image();
        assert_eq!(image.dimensions(), (3, 4));
        assert_eq!(image.get_pixel(2, 3).0[0], FOREGROUND);
        assert_eq!(NoduleMask::from_gray_image(&image), mask);
    }

    #[test]
    fn test_union_and_threshold() {
        let mut a = from_rows(&["#..", "..."]);
        let b = from_rows(&["...", "..#"]);
        a.union_assign(&b);
        assert_eq!(a.foreground_count(), 2);

        let before = a.clone();
        a.threshold();
        assert_eq!(a, before);

        let mut gray = NoduleMask::from_raw(Array2::from_shape_vec((1, 3), vec![127, 128, 40]).unwrap());
        gray.threshold();
        assert_eq!(gray.iter().copied().collect::<Vec<_>>(), vec![0, 255, 0]);
    }

    #[test]
    #[should_panic]
    fn test_union_shape_mismatch() {
        let mut a = NoduleMask::zeros(ImageSize::new(2, 2));
        a.union_assign(&NoduleMask::zeros(ImageSize::new(3, 2)));
    }
}
