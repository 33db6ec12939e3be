//! 按固定随机种子把导出的样本划分为训练集、验证集和测试集.
//!
//! 图像从 `images/` 移动到 `images/{train,val,test}/`, 同名 (主文件名相同) 的 mask 或标签
//! 随之移动到 `masks/{...}/` 或 `labels/{...}/`.

use anyhow::ensure;
use log::{info, warn};
use nodule_berry::dataset::has_extension;
use nodule_berry::export::OutputLayout;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};

/// 三个子集的名字.
pub const SPLITS: [&str; 3] = ["train", "val", "test"];

/// 划分比例. 测试集取剩余部分.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SplitRatio {
    train: f64,
    val: f64,
}

impl SplitRatio {
    /// `train` 和 `val` 都必须非负, 且和不超过 1.
    pub fn new(train: f64, val: f64) -> Option<Self> {
        let valid = |v: f64| (0.0..=1.0).contains(&v);
        (valid(train) && valid(val) && train + val <= 1.0).then_some(Self { train, val })
    }

    /// 总数为 `total` 时各子集的大小. 训练集与验证集向下取整.
    pub fn sizes(&self, total: usize) -> [usize; 3] {
        let n_train = (total as f64 * self.train) as usize;
        let n_val = ((total as f64 * self.val) as usize).min(total - n_train);
        [n_train, n_val, total - n_train - n_val]
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self { train: 0.8, val: 0.1 }
    }
}

/// 划分 `layout` 下的样本, 返回各子集的样本数.
///
/// 只考虑 `images/` 下直接存放, 扩展名为 `layout.image_ext()` 的文件. 同样的样本集合和
/// `seed` 总是得到同样的划分. 缺少对应目标文件的图像照常移动, 并记录一条 `warn` 日志.
pub fn split_dataset(layout: &OutputLayout, seed: u64, ratio: SplitRatio) -> anyhow::Result<[usize; 3]> {
    let images_dir = layout.images_dir();
    let targets_dir = layout.targets_dir();
    ensure!(images_dir.is_dir(), "{} is not a directory", images_dir.display());

    let mut images = list_images(&images_dir, layout.image_ext())?;
    info!("Total samples: {}", images.len());

    let mut rng = StdRng::seed_from_u64(seed);
    images.shuffle(&mut rng);

    let sizes = ratio.sizes(images.len());
    let mut rest = images.as_slice();
    for (split, n) in SPLITS.into_iter().zip(sizes) {
        let (part, tail) = rest.split_at(n);
        rest = tail;

        let image_to = images_dir.join(split);
        let target_to = targets_dir.join(split);
        fs::create_dir_all(&image_to)?;
        fs::create_dir_all(&target_to)?;

        for image in part {
            let target = target_of(&targets_dir, image, layout.target_ext());
            move_into(image, &image_to)?;
            if target.is_file() {
                move_into(&target, &target_to)?;
            } else {
                warn!("{} has no matching target file", image.display());
            }
        }
        info!("{split}: {n} samples");
    }
    Ok(sizes)
}

/// 按文件名排序的图像列表.
fn list_images(dir: &Path, ext: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut ans = vec![];
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, ext) {
            ans.push(path);
        }
    }
    ans.sort();
    Ok(ans)
}

#[inline]
fn target_of(targets_dir: &Path, image: &Path, ext: &str) -> PathBuf {
    let stem = image.file_stem().unwrap_or_default();
    targets_dir.join(stem).with_extension(ext)
}

#[inline]
fn move_into(file: &Path, dir: &Path) -> std::io::Result<()> {
    match file.file_name() {
        Some(name) => fs::rename(file, dir.join(name)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodule_berry::export::{sample_name, TargetKind};

    fn make_samples(root: &Path, n: usize) -> OutputLayout {
        let layout = OutputLayout::new(root, TargetKind::Label);
        layout.create_dirs().unwrap();
        for i in 0..n {
            fs::write(layout.images_dir().join(sample_name(i, "jpg")), b"img").unwrap();
            fs::write(layout.targets_dir().join(sample_name(i, "txt")), b"").unwrap();
        }
        layout
    }

    fn names(dir: PathBuf) -> Vec<String> {
        let mut ans: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path().file_stem().unwrap().to_string_lossy().into_owned())
            .collect();
        ans.sort();
        ans
    }

    #[test]
    fn test_ratio() {
        assert_eq!(SplitRatio::default().sizes(10), [8, 1, 1]);
        assert_eq!(SplitRatio::default().sizes(9), [7, 0, 2]);
        assert_eq!(SplitRatio::default().sizes(0), [0, 0, 0]);
        assert!(SplitRatio::new(0.9, 0.2).is_none());
        assert!(SplitRatio::new(-0.1, 0.2).is_none());
        assert_eq!(SplitRatio::new(1.0, 0.0).unwrap().sizes(3), [3, 0, 0]);
    }

    #[test]
    fn test_split_moves_pairs() {
        let root = tempfile::tempdir().unwrap();
        let layout = make_samples(root.path(), 10);
        let sizes = split_dataset(&layout, 42, SplitRatio::default()).unwrap();
        assert_eq!(sizes, [8, 1, 1]);

        for (split, n) in SPLITS.into_iter().zip(sizes) {
            let images = names(layout.images_dir().join(split));
            let labels = names(layout.targets_dir().join(split));
            assert_eq!(images.len(), n);
            assert_eq!(images, labels);
        }
        assert!(list_images(&layout.images_dir(), "jpg").unwrap().is_empty());
    }

    #[test]
    fn test_split_is_seeded() {
        let assign = |seed| {
            let root = tempfile::tempdir().unwrap();
            let layout = make_samples(root.path(), 20);
            split_dataset(&layout, seed, SplitRatio::default()).unwrap();
            SPLITS.map(|s| names(layout.images_dir().join(s)))
        };
        assert_eq!(assign(42), assign(42));
    }

    #[test]
    fn test_missing_target() {
        let root = tempfile::tempdir().unwrap();
        let layout = make_samples(root.path(), 2);
        fs::remove_file(layout.targets_dir().join(sample_name(0, "txt"))).unwrap();
        split_dataset(&layout, 1, SplitRatio::new(1.0, 0.0).unwrap()).unwrap();
        assert_eq!(names(layout.images_dir().join("train")).len(), 2);
        assert_eq!(names(layout.targets_dir().join("train")), vec!["000001"]);
    }
}
