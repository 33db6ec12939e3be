//! 图像的持久化存储.

use crate::NoduleMask;
use image::ImageResult;
use std::path::Path;

/// 表明一个可以通过 **按原样** 模式持久化存储的图像对象.
///
/// 图像格式由 `path` 的扩展名决定. 对 mask 应当使用无损格式 (如 `png`),
/// 否则有损压缩会破坏 0/255 的严格二值性.
pub trait ImgWriteRaw {
    /// 按原样将图片保存到 `path` 路径.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 按原样存储.
impl ImgWriteRaw for NoduleMask {
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.to_gray_image().save(path)
    }
}
