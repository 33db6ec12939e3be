//! 单个病例的处理.
//!
//! 每个病例相互独立: 一个病例出错只影响它自己, 由调用方记录后继续下一个病例.

use crate::config::PrepareConfig;
use anyhow::{anyhow, Context};
use log::{debug, info, warn};
use nodule_berry::annotation::{parse_annotation_file, RawAnnotation, SopUidMap};
use nodule_berry::cluster::{cluster, group_by_filename, ConsensusNodule, SliceNodules};
use nodule_berry::compose::composite;
use nodule_berry::dataset::CaseDir;
use nodule_berry::export::{write_label_sample, write_mask_sample, OutputLayout, TargetKind};
use nodule_berry::label::BoundingBox;
use nodule_berry::overlay::{draw_consensus, draw_readers, gray_to_rgb};
use nodule_berry::summary::{read_summary, to_json_lines, write_summary};
use nodule_berry::{HuSlice, Point2d};
use std::fs;
use std::path::Path;
use utils::dicom::{self, UidMapReport};

/// 单个病例的处理统计.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaseReport {
    /// 病例名.
    pub name: String,

    /// 解析出的标注记录数. 复用汇总文件时为 0.
    pub records: usize,

    /// 共识结节数.
    pub nodules: usize,

    /// 文件名无法解析的共识结节数.
    pub unresolved: usize,

    /// 至少含有一个结节的切片数.
    pub slices: usize,

    /// 写出的样本 (或可视化图像) 数.
    pub samples: usize,

    /// 找不到或无法读取而被跳过的切片数.
    pub skipped_slices: usize,

    /// 建立 SOP UID 映射时无法读取的 DICOM 文件数.
    pub unreadable_dicom: usize,
}

impl CaseReport {
    fn new(case: &CaseDir) -> Self {
        Self {
            name: case.name().to_string(),
            ..Default::default()
        }
    }
}

/// 读取病例下全部 DICOM 文件的 SOP UID. 无法读取的文件计入 `report`.
fn scan_dicom(case: &CaseDir, report: &mut CaseReport) -> anyhow::Result<UidMapReport> {
    let uids = dicom::build_uid_map(&case.dicom_files()?);
    report.unreadable_dicom += uids.failed;
    Ok(uids)
}

/// 解析病例的 XML 标注. 文件名通过 `uid_map` 解析.
pub fn load_records(case: &CaseDir, uid_map: &SopUidMap, report: &mut CaseReport) -> anyhow::Result<Vec<RawAnnotation>> {
    let xml = case
        .find_annotation()?
        .ok_or_else(|| anyhow!("{}: no XML annotation found", case.name()))?;

    let records = parse_annotation_file(&xml, uid_map).with_context(|| format!("failed to parse {}", xml.display()))?;
    report.records = records.len();
    Ok(records)
}

/// 获取病例的共识结节.
///
/// 开启 `reuse_summary` 且汇总文件存在时直接读取; 否则解析标注, 聚类并 (重新) 写出汇总文件.
pub fn load_consensus(
    case: &CaseDir,
    config: &PrepareConfig,
    uid_map: &SopUidMap,
    report: &mut CaseReport,
) -> anyhow::Result<Vec<ConsensusNodule>> {
    let summary = case.summary_path();
    if config.reuse_summary && summary.is_file() {
        let nodules = read_summary(&summary).with_context(|| format!("failed to read {}", summary.display()))?;
        debug!("{}: reusing {} nodules from summary", case.name(), nodules.len());
        report.nodules = nodules.len();
        return Ok(nodules);
    }

    let records = load_records(case, uid_map, report)?;
    let nodules = cluster(&records, &config.cluster);
    write_summary(&summary, &nodules).with_context(|| format!("failed to write {}", summary.display()))?;
    info!(
        "{}: {} records clustered into {} nodules",
        case.name(),
        records.len(),
        nodules.len()
    );
    report.nodules = nodules.len();
    Ok(nodules)
}

/// 记录文件名无法解析的结节: 每个结节一条 `warn` 日志, 并以 JSON lines 写入病例目录.
fn log_unresolved(case: &CaseDir, unresolved: &[ConsensusNodule]) -> anyhow::Result<()> {
    if unresolved.is_empty() {
        return Ok(());
    }
    for n in unresolved {
        warn!("{}: no DICOM file for SOP UID {}", case.name(), n.image_ref);
    }
    fs::write(case.null_filename_log_path(), to_json_lines(unresolved)?)?;
    Ok(())
}

/// 按 SOP UID 读取切片所在的 DICOM 文件. 找不到或无法读取时记录日志并返回 `None`.
///
/// 同一病例的不同序列可能含有同名文件, 所以不能按文件名查找.
fn read_slice(case: &CaseDir, uids: &UidMapReport, slice: &SliceNodules) -> Option<HuSlice> {
    let uid = &slice.nodules.first()?.image_ref;
    let Some(path) = uids.path_of(uid) else {
        warn!("{}: {} (SOP UID {uid}) not found", case.name(), slice.filename);
        return None;
    };
    match dicom::read_hu_slice(path) {
        Ok(hu) => Some(hu),
        Err(e) => {
            warn!("{}: {e}", path.display());
            None
        }
    }
}

/// 仅生成汇总文件 (以及无法解析文件名的结节日志).
pub fn summarize_case(case: &CaseDir, config: &PrepareConfig) -> anyhow::Result<CaseReport> {
    let mut report = CaseReport::new(case);
    let uids = scan_dicom(case, &mut report)?;
    let nodules = load_consensus(case, config, &uids.map, &mut report)?;
    let (slices, unresolved) = group_by_filename(nodules);
    report.slices = slices.len();
    report.unresolved = unresolved.len();
    log_unresolved(case, &unresolved)?;
    Ok(report)
}

/// 为一个病例写出训练样本 (图像 + mask 或标签), 每个含结节的切片一个样本.
///
/// 样本使用以病例名为前缀的暂存文件名, 局部序号为 `0..samples`. 最终编号由调用方完成;
/// 出错时已写出的暂存文件由调用方删除.
pub fn export_case(case: &CaseDir, layout: &OutputLayout, config: &PrepareConfig) -> anyhow::Result<CaseReport> {
    let mut report = CaseReport::new(case);
    let uids = scan_dicom(case, &mut report)?;
    let nodules = load_consensus(case, config, &uids.map, &mut report)?;
    let (slices, unresolved) = group_by_filename(nodules);
    report.slices = slices.len();
    report.unresolved = unresolved.len();
    log_unresolved(case, &unresolved)?;

    for slice in &slices {
        let Some(hu) = read_slice(case, &uids, slice) else {
            report.skipped_slices += 1;
            continue;
        };
        let size = hu.image_size();
        let image = hu.render(&config.window, config.bit_depth);
        let paths = layout.staged_paths(case.name(), report.samples);

        match layout.target() {
            TargetKind::Mask => {
                let point_sets: Vec<&[Point2d]> = slice.nodules.iter().map(|n| n.edge_points.as_slice()).collect();
                let mask = composite(&point_sets, size);
                write_mask_sample(&paths, &image, &mask)?;
            }
            TargetKind::Label => {
                let boxes: Vec<BoundingBox> = slice
                    .nodules
                    .iter()
                    .map(|n| BoundingBox::from_nodule(n, size))
                    .collect();
                write_label_sample(&paths, &image, &boxes)?;
            }
        }
        debug!(
            "{}: {} -> {} ({} nodules)",
            case.name(),
            slice.filename,
            paths.image.display(),
            slice.nodules.len()
        );
        report.samples += 1;
    }
    Ok(report)
}

/// 将共识结节和各医师的原始轮廓画在切片上, 写入 `out/{病例名}/{切片文件名}.png`.
///
/// 聚类使用 `config.cluster`, 不读写汇总文件.
pub fn overlay_case(case: &CaseDir, out: &Path, config: &PrepareConfig) -> anyhow::Result<CaseReport> {
    let mut report = CaseReport::new(case);
    let uids = scan_dicom(case, &mut report)?;
    let records = load_records(case, &uids.map, &mut report)?;
    let nodules = cluster(&records, &config.cluster);
    report.nodules = nodules.len();
    let (slices, unresolved) = group_by_filename(nodules);
    report.slices = slices.len();
    report.unresolved = unresolved.len();

    let dir = out.join(case.name());
    fs::create_dir_all(&dir)?;
    for slice in &slices {
        let Some(hu) = read_slice(case, &uids, slice) else {
            report.skipped_slices += 1;
            continue;
        };
        let mut canvas = gray_to_rgb(&hu.to_gray(&config.window));
        let readers: Vec<RawAnnotation> = records
            .iter()
            .filter(|r| r.filename.as_deref() == Some(slice.filename.as_str()))
            .cloned()
            .collect();
        draw_readers(&mut canvas, &readers);
        draw_consensus(&mut canvas, &slice.nodules);

        let stem = Path::new(&slice.filename)
            .file_stem()
            .map_or_else(|| slice.filename.clone(), |s| s.to_string_lossy().into_owned());
        canvas.save(dir.join(format!("{stem}.png")))?;
        report.samples += 1;
    }
    Ok(report)
}
