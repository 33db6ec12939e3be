//! 训练样本的输出布局与编号.
//!
//! 输出目录下有 `images/` 和 `masks/` (或 `labels/`) 两个子目录, 同一个样本在两个目录下
//! 使用相同的 6 位序号文件名 (如 `000042.jpg` 和 `000042.png`), 从而一一对应.
//!
//! 序号不来自全局计数器. 每个病例先写入以病例名为前缀的暂存文件名; 病例成功后由 [`renumber`]
//! 按病例顺序分配最终序号, [`SampleIndex`] 按值传递给下一个病例. 失败病例的暂存文件由
//! [`discard_staged`] 删除, 因此 `images/` 与目标目录下的最终样本总是成对出现.

use crate::consts::SAMPLE_INDEX_WIDTH;
use crate::label::{label_file_contents, BoundingBox};
use crate::{ImgWriteRaw, NoduleMask, SliceImage};
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 样本写出错误.
#[derive(Debug, Error)]
pub enum ExportError {
    /// 文件系统操作失败.
    #[error("output I/O failed: {0}")]
    Io(#[from] io::Error),

    /// 图像编码失败.
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// 训练目标的种类.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// 分割 mask, 写入 `masks/`.
    Mask,

    /// YOLO 标签, 写入 `labels/`.
    Label,
}

impl TargetKind {
    /// 目标子目录名.
    #[inline]
    pub const fn dir_name(&self) -> &'static str {
        match self {
            TargetKind::Mask => "masks",
            TargetKind::Label => "labels",
        }
    }

    /// 默认扩展名. mask 必须使用无损格式.
    #[inline]
    pub const fn default_ext(&self) -> &'static str {
        match self {
            TargetKind::Mask => "png",
            TargetKind::Label => "txt",
        }
    }
}

/// 样本序号计数器. 按值在病例之间传递, 不存在共享状态.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleIndex(usize);

impl SampleIndex {
    /// 从 `start` 开始计数.
    #[inline]
    pub const fn new(start: usize) -> Self {
        Self(start)
    }

    /// 下一个可用的序号.
    #[inline]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// 取出当前序号并递增.
    #[inline]
    pub fn take(&mut self) -> usize {
        let ans = self.0;
        self.0 += 1;
        ans
    }
}

/// `{index:06}.{ext}`.
#[inline]
pub fn sample_name(index: usize, ext: &str) -> String {
    format!("{index:0width$}.{ext}", width = SAMPLE_INDEX_WIDTH)
}

/// 并行处理时使用的暂存文件名 `{case}_{local:06}.{ext}`.
#[inline]
pub fn staged_name(case: &str, local: usize, ext: &str) -> String {
    format!("{case}_{local:0width$}.{ext}", width = SAMPLE_INDEX_WIDTH)
}

/// 一个样本的两个输出路径.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplePaths {
    /// 图像路径.
    pub image: PathBuf,

    /// mask / 标签路径.
    pub target: PathBuf,
}

/// 输出目录布局.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    target: TargetKind,
    image_ext: String,
    target_ext: String,
}

impl OutputLayout {
    /// 以 `root` 为输出根目录. 图像默认为 `jpg`, 目标扩展名见 [`TargetKind::default_ext`].
    pub fn new<P: AsRef<Path>>(root: P, target: TargetKind) -> Self {
        Self {
            root: root.as_ref().to_owned(),
            target,
            image_ext: "jpg".to_string(),
            target_ext: target.default_ext().to_string(),
        }
    }

    /// 修改图像扩展名.
    pub fn with_image_ext(mut self, ext: &str) -> Self {
        self.image_ext = ext.to_string();
        self
    }

    /// 修改目标扩展名.
    pub fn with_target_ext(mut self, ext: &str) -> Self {
        self.target_ext = ext.to_string();
        self
    }

    /// 输出根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 训练目标种类.
    #[inline]
    pub fn target(&self) -> TargetKind {
        self.target
    }

    /// 图像扩展名.
    #[inline]
    pub fn image_ext(&self) -> &str {
        &self.image_ext
    }

    /// 目标扩展名.
    #[inline]
    pub fn target_ext(&self) -> &str {
        &self.target_ext
    }

    /// `images/` 目录.
    #[inline]
    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// `masks/` 或 `labels/` 目录.
    #[inline]
    pub fn targets_dir(&self) -> PathBuf {
        self.root.join(self.target.dir_name())
    }

    /// 创建输出目录 (若不存在).
    pub fn create_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(self.images_dir())?;
        fs::create_dir_all(self.targets_dir())
    }

    /// 序号为 `index` 的样本的最终路径.
    pub fn final_paths(&self, index: usize) -> SamplePaths {
        SamplePaths {
            image: self.images_dir().join(sample_name(index, &self.image_ext)),
            target: self.targets_dir().join(sample_name(index, &self.target_ext)),
        }
    }

    /// 病例 `case` 的第 `local` 个样本的暂存路径.
    pub fn staged_paths(&self, case: &str, local: usize) -> SamplePaths {
        SamplePaths {
            image: self.images_dir().join(staged_name(case, local, &self.image_ext)),
            target: self.targets_dir().join(staged_name(case, local, &self.target_ext)),
        }
    }
}

/// 写出一个分割样本: 图像和按原样保存的 mask.
pub fn write_mask_sample(paths: &SamplePaths, image: &SliceImage, mask: &NoduleMask) -> Result<(), ExportError> {
    image.save_raw(&paths.image)?;
    mask.save_raw(&paths.target)?;
    Ok(())
}

/// 写出一个检测样本: 图像和 YOLO 标签文件.
pub fn write_label_sample(paths: &SamplePaths, image: &SliceImage, boxes: &[BoundingBox]) -> Result<(), ExportError> {
    image.save_raw(&paths.image)?;
    fs::write(&paths.target, label_file_contents(boxes))?;
    Ok(())
}

/// 一个病例写出的暂存样本.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedCase {
    /// 病例名 (暂存文件名前缀).
    pub case: String,

    /// 暂存样本个数, 局部序号为 `0..count`.
    pub count: usize,
}

/// 按 `staged` 的顺序, 把暂存样本重命名为从 `start` 开始的连续最终序号.
///
/// 返回下一个可用序号. 相同的 `staged` 和 `start` 总是得到相同的编号.
pub fn renumber(layout: &OutputLayout, staged: &[StagedCase], start: SampleIndex) -> Result<SampleIndex, ExportError> {
    let mut next = start;
    for case in staged {
        for local in 0..case.count {
            let from = layout.staged_paths(&case.case, local);
            let to = layout.final_paths(next.take());
            fs::rename(&from.image, &to.image)?;
            fs::rename(&from.target, &to.target)?;
        }
        debug!("{}: {} samples renumbered", case.case, case.count);
    }
    Ok(next)
}

/// 删除病例 `case` 的全部暂存样本, 返回删除的文件数. 用于丢弃处理失败的病例.
pub fn discard_staged(layout: &OutputLayout, case: &str) -> io::Result<usize> {
    let prefix = format!("{case}_");
    let mut removed = 0;
    for dir in [layout.images_dir(), layout.targets_dir()] {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
    }
    Ok(removed)
}
