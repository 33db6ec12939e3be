//! 程序运行函数.
//!
//! 导出时每个病例先写入以病例名为前缀的暂存文件. 病例成功后暂存文件按病例顺序重命名为最终序号,
//! 失败则全部删除, 不占用序号. 串行时每个病例结束后立即编号, 并行时全部结束后统一编号,
//! 两种方式得到的输出完全相同.

use crate::case::{export_case, overlay_case, summarize_case, CaseReport};
use crate::config::PrepareConfig;
use crate::result::RunReport;
use log::{info, warn};
use nodule_berry::dataset::CaseDir;
use nodule_berry::export::{discard_staged, renumber, OutputLayout, SampleIndex, StagedCase};
use std::path::Path;
use std::time::Instant;

/// 为每个病例生成汇总文件.
pub fn run_summaries(cases: &[CaseDir], config: &PrepareConfig) -> RunReport {
    let start = Instant::now();
    let mut report = RunReport::new("summary");
    for (case, outcome) in cases.iter().zip(map_cases(cases, config, |c| summarize_case(c, config))) {
        report.push(case.name(), outcome);
    }
    report.set_elapsed(start.elapsed());
    report
}

/// 为每个病例生成可视化图像, 写入 `out` 下以病例名命名的子目录.
pub fn run_overlays(cases: &[CaseDir], out: &Path, config: &PrepareConfig) -> RunReport {
    let start = Instant::now();
    let mut report = RunReport::new("overlay");
    for (case, outcome) in cases.iter().zip(map_cases(cases, config, |c| overlay_case(c, out, config))) {
        report.push(case.name(), outcome);
    }
    report.set_elapsed(start.elapsed());
    report
}

/// 导出训练样本, 序号从 `first` 开始.
pub fn run_export(
    cases: &[CaseDir],
    layout: &OutputLayout,
    config: &PrepareConfig,
    first: SampleIndex,
) -> anyhow::Result<RunReport> {
    let start = Instant::now();
    config.check_image_format()?;
    layout.create_dirs()?;
    let mut report = RunReport::new(layout.target().dir_name());

    let next = if use_parallel(config) {
        export_parallel(cases, layout, config, first, &mut report)?
    } else {
        export_sequential(cases, layout, config, first, &mut report)?
    };

    report.set_next(next);
    report.set_elapsed(start.elapsed());
    Ok(report)
}

/// 结算一个病例的暂存样本: 成功时从 `next` 开始编号, 失败时删除. 返回下一个可用序号.
fn settle(
    layout: &OutputLayout,
    case: &CaseDir,
    outcome: &anyhow::Result<CaseReport>,
    next: SampleIndex,
) -> anyhow::Result<SampleIndex> {
    match outcome {
        Ok(r) => {
            let staged = [StagedCase {
                case: case.name().to_string(),
                count: r.samples,
            }];
            Ok(renumber(layout, &staged, next)?)
        }
        Err(_) => {
            let removed = discard_staged(layout, case.name())?;
            if removed > 0 {
                warn!("{}: {removed} staged files discarded", case.name());
            }
            Ok(next)
        }
    }
}

/// 逐个病例导出, 每个病例结束后立即结算.
fn export_sequential(
    cases: &[CaseDir],
    layout: &OutputLayout,
    config: &PrepareConfig,
    first: SampleIndex,
    report: &mut RunReport,
) -> anyhow::Result<SampleIndex> {
    let mut next = first;
    for case in cases {
        info!("Processing case: {}", case.name());
        let outcome = export_case(case, layout, config);
        next = settle(layout, case, &outcome, next)?;
        report.push(case.name(), outcome);
    }
    Ok(next)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::prelude::*;

        #[inline]
        fn use_parallel(config: &PrepareConfig) -> bool {
            config.parallel
        }

        fn thread_pool() -> anyhow::Result<rayon::ThreadPool> {
            Ok(rayon::ThreadPoolBuilder::new().num_threads(utils::cpus()).build()?)
        }

        /// 按病例并行执行 `f`, 结果按 `cases` 的顺序排列.
        fn map_cases<F>(cases: &[CaseDir], config: &PrepareConfig, f: F) -> Vec<anyhow::Result<CaseReport>>
        where
            F: Fn(&CaseDir) -> anyhow::Result<CaseReport> + Sync,
        {
            if !config.parallel {
                return cases.iter().map(f).collect();
            }
            match thread_pool() {
                Ok(pool) => pool.install(|| cases.par_iter().map(&f).collect()),
                Err(e) => {
                    warn!("falling back to sequential processing: {e}");
                    cases.iter().map(f).collect()
                }
            }
        }

        /// 并行导出: 全部病例结束后按病例顺序结算.
        fn export_parallel(
            cases: &[CaseDir],
            layout: &OutputLayout,
            config: &PrepareConfig,
            first: SampleIndex,
            report: &mut RunReport,
        ) -> anyhow::Result<SampleIndex> {
            let pool = thread_pool()?;
            let outcomes: Vec<anyhow::Result<CaseReport>> = pool.install(|| {
                cases
                    .par_iter()
                    .map(|case| {
                        info!("Processing case: {}", case.name());
                        export_case(case, layout, config)
                    })
                    .collect()
            });

            let mut next = first;
            for (case, outcome) in cases.iter().zip(outcomes) {
                next = settle(layout, case, &outcome, next)?;
                report.push(case.name(), outcome);
            }
            Ok(next)
        }
    } else {
        fn use_parallel(config: &PrepareConfig) -> bool {
            if config.parallel {
                warn!("built without the `rayon` feature, processing sequentially");
            }
            false
        }

        fn map_cases<F>(cases: &[CaseDir], config: &PrepareConfig, f: F) -> Vec<anyhow::Result<CaseReport>>
        where
            F: Fn(&CaseDir) -> anyhow::Result<CaseReport>,
        {
            use_parallel(config);
            cases.iter().map(f).collect()
        }

        fn export_parallel(
            cases: &[CaseDir],
            layout: &OutputLayout,
            config: &PrepareConfig,
            first: SampleIndex,
            report: &mut RunReport,
        ) -> anyhow::Result<SampleIndex> {
            export_sequential(cases, layout, config, first, report)
        }
    }
}
