//! DICOM 读取: SOP Instance UID 映射与像素切片.
//!
//! 只读取 SOP Instance UID, 行列数, 像素表示, 重缩放斜率/截距和像素数据这几个元素.

use dicom_dictionary_std::tags;
use dicom_object::{open_file, DefaultDicomObject, OpenFileOptions, Tag};
use log::{debug, warn};
use nodule_berry::annotation::SopUidMap;
use nodule_berry::{HuSlice, ImageSize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 单个 DICOM 文件的读取错误.
#[derive(Debug, Error)]
pub enum DicomError {
    /// 文件无法打开或解析.
    #[error("failed to open DICOM file: {0}")]
    Open(String),

    /// 必需的元素缺失或无法转换.
    #[error("missing or unreadable element `{0}`")]
    Element(&'static str),

    /// 像素个数与行列数不符.
    #[error("pixel data holds {found} values, expected {expected}")]
    PixelCount {
        /// 行数 x 列数.
        expected: usize,

        /// 实际个数.
        found: usize,
    },
}

/// [`build_uid_map`] 的结果.
#[derive(Clone, Debug, Default)]
pub struct UidMapReport {
    /// SOP Instance UID 到文件名 (不含目录) 的映射. 标注中的 `filename` 来自这里.
    pub map: SopUidMap,

    /// SOP Instance UID 到完整路径的映射. 一个病例的多个序列可能有同名文件,
    /// 读取切片时必须用它定位.
    pub paths: HashMap<String, PathBuf>,

    /// 读取失败而被跳过的文件数.
    pub failed: usize,
}

impl UidMapReport {
    /// SOP Instance UID 为 `uid` 的文件路径.
    #[inline]
    pub fn path_of(&self, uid: &str) -> Option<&Path> {
        self.paths.get(uid).map(PathBuf::as_path)
    }
}

/// 只读取像素数据之前的元素, 获得 SOP Instance UID.
pub fn read_sop_uid<P: AsRef<Path>>(path: P) -> Result<String, DicomError> {
    let obj = OpenFileOptions::new()
        .read_until(tags::PIXEL_DATA)
        .open_file(path.as_ref())
        .map_err(|e| DicomError::Open(e.to_string()))?;
    string_elem(&obj, tags::SOP_INSTANCE_UID, "SOPInstanceUID")
}

/// 为一组 DICOM 文件建立 SOP Instance UID 到文件名和完整路径的映射.
///
/// 单个文件读取失败不会中断整个过程: 该文件被跳过并计数, 并记录一条 `warn` 日志.
pub fn build_uid_map(files: &[PathBuf]) -> UidMapReport {
    let mut report = UidMapReport::default();
    for path in files {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        match (read_sop_uid(path), name) {
            (Ok(uid), Some(name)) => {
                report.map.insert(uid.clone(), name);
                report.paths.insert(uid, path.clone());
            }
            (Err(e), _) => {
                warn!("{}: {e}", path.display());
                report.failed += 1;
            }
            (Ok(_), None) => report.failed += 1,
        }
    }
    debug!(
        "{} SOP UIDs mapped, {} files skipped",
        report.map.len(),
        report.failed
    );
    report
}

/// 读取 DICOM 文件的像素数据并转换为 HU 值切片.
///
/// 缺少重缩放斜率/截距时分别按 1 和 0 处理. 有符号像素 (`PixelRepresentation == 1`)
/// 按 16 位补码解释.
pub fn read_hu_slice<P: AsRef<Path>>(path: P) -> Result<HuSlice, DicomError> {
    let obj = open_file(path.as_ref()).map_err(|e| DicomError::Open(e.to_string()))?;

    let rows = int_elem(&obj, tags::ROWS, "Rows")? as usize;
    let cols = int_elem(&obj, tags::COLUMNS, "Columns")? as usize;
    let signed = int_elem(&obj, tags::PIXEL_REPRESENTATION, "PixelRepresentation").unwrap_or(0) == 1;
    let slope = float_elem(&obj, tags::RESCALE_SLOPE).unwrap_or(1.0);
    let intercept = float_elem(&obj, tags::RESCALE_INTERCEPT).unwrap_or(0.0);

    let mut stored = obj
        .element(tags::PIXEL_DATA)
        .ok()
        .and_then(|e| e.to_multi_int::<i32>().ok())
        .ok_or(DicomError::Element("PixelData"))?;
    if signed {
        stored.iter_mut().for_each(|v| *v = *v as u16 as i16 as i32);
    }

    let size = ImageSize::new(cols, rows);
    let found = stored.len();
    HuSlice::from_stored(&stored, size, slope as f32, intercept as f32).ok_or(DicomError::PixelCount {
        expected: rows * cols,
        found,
    })
}

#[inline]
fn string_elem(obj: &DefaultDicomObject, tag: Tag, name: &'static str) -> Result<String, DicomError> {
    obj.element(tag)
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|s| s.trim_end_matches(['\0', ' ']).trim().to_string())
        .ok_or(DicomError::Element(name))
}

#[inline]
fn int_elem(obj: &DefaultDicomObject, tag: Tag, name: &'static str) -> Result<i32, DicomError> {
    obj.element(tag)
        .ok()
        .and_then(|e| e.to_int::<i32>().ok())
        .ok_or(DicomError::Element(name))
}

#[inline]
fn float_elem(obj: &DefaultDicomObject, tag: Tag) -> Option<f64> {
    obj.element(tag).ok().and_then(|e| e.to_float64().ok())
}
