//! 预处理配置.

use anyhow::ensure;
use nodule_berry::cluster::ClusterConfig;
use nodule_berry::export::{OutputLayout, TargetKind};
use nodule_berry::{BitDepth, CtWindow};
use std::path::Path;

/// 一次预处理运行的全部参数.
#[derive(Clone, Debug, PartialEq)]
pub struct PrepareConfig {
    /// 共识聚类参数.
    pub cluster: ClusterConfig,

    /// 切片转灰度图使用的 CT 窗. 只用于 8-bit 图像.
    pub window: CtWindow,

    /// 导出图像的位深.
    pub bit_depth: BitDepth,

    /// 图像扩展名.
    pub image_ext: String,

    /// mask 扩展名. 标签总是 `txt`.
    pub mask_ext: String,

    /// 病例目录下已有汇总文件时直接读取, 不重新解析 XML.
    pub reuse_summary: bool,

    /// 跳过的病例数 (按病例名排序后).
    pub skip: usize,

    /// 是否按病例并行.
    pub parallel: bool,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::MASK,
            window: utils::lung_window(),
            bit_depth: BitDepth::Eight,
            image_ext: "jpg".to_string(),
            mask_ext: "png".to_string(),
            reuse_summary: false,
            skip: 0,
            parallel: false,
        }
    }
}

impl PrepareConfig {
    /// 检查图像扩展名能否保存所选位深.
    pub fn check_image_format(&self) -> anyhow::Result<()> {
        ensure!(
            self.bit_depth.supports_ext(&self.image_ext),
            "{:?} images cannot be saved as `{}`, use png or tif",
            self.bit_depth,
            self.image_ext
        );
        Ok(())
    }

    /// 以 `out` 为根目录的输出布局.
    pub fn layout<P: AsRef<Path>>(&self, out: P, target: TargetKind) -> OutputLayout {
        let layout = OutputLayout::new(out, target).with_image_ext(&self.image_ext);
        match target {
            TargetKind::Mask => layout.with_target_ext(&self.mask_ext),
            TargetKind::Label => layout,
        }
    }
}
