//! 运行结果.

use crate::case::CaseReport;
use nodule_berry::export::SampleIndex;
use std::io::{self, Write};
use std::time::Duration;

/// 一次运行的汇总.
#[derive(Clone, Debug)]
pub struct RunReport {
    task: &'static str,
    done: Vec<CaseReport>,
    failed: Vec<(String, String)>,
    next: Option<SampleIndex>,
    elapsed: Duration,
}

impl RunReport {
    /// 名为 `task` 的空结果.
    pub fn new(task: &'static str) -> Self {
        Self {
            task,
            done: vec![],
            failed: vec![],
            next: None,
            elapsed: Duration::ZERO,
        }
    }

    /// 记录一个病例的处理结果.
    pub fn push(&mut self, name: &str, outcome: anyhow::Result<CaseReport>) {
        match outcome {
            Ok(r) => self.done.push(r),
            Err(e) => {
                log::error!("{name}: {e:#}");
                self.failed.push((name.to_string(), format!("{e:#}")));
            }
        }
    }

    /// 设置下一个可用的样本序号.
    pub fn set_next(&mut self, next: SampleIndex) {
        self.next = Some(next);
    }

    /// 设置总耗时.
    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    /// 成功处理的病例.
    #[inline]
    pub fn done(&self) -> &[CaseReport] {
        &self.done
    }

    /// 失败的病例名及错误信息.
    #[inline]
    pub fn failed(&self) -> &[(String, String)] {
        &self.failed
    }

    /// 下一个可用的样本序号. 只有导出任务会设置.
    #[inline]
    pub fn next(&self) -> Option<SampleIndex> {
        self.next
    }

    fn total(&self, f: impl Fn(&CaseReport) -> usize) -> usize {
        self.done.iter().map(f).sum()
    }

    /// 将汇总写进 `w` 中.
    pub fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        const S4: &str = "    ";

        writeln!(w, "Task `{}`:", self.task)?;
        writeln!(w, "{S4}Cases done: {}", self.done.len())?;
        writeln!(w, "{S4}Cases failed: {}", self.failed.len())?;
        writeln!(w, "{S4}Annotation records: {}", self.total(|r| r.records))?;
        writeln!(w, "{S4}Consensus nodules: {}", self.total(|r| r.nodules))?;
        writeln!(w, "{S4}Unresolved nodules: {}", self.total(|r| r.unresolved))?;
        writeln!(w, "{S4}Slices with nodules: {}", self.total(|r| r.slices))?;
        writeln!(w, "{S4}Skipped slices: {}", self.total(|r| r.skipped_slices))?;
        writeln!(w, "{S4}Unreadable DICOM files: {}", self.total(|r| r.unreadable_dicom))?;
        writeln!(w, "{S4}Samples written: {}", self.total(|r| r.samples))?;
        if let Some(next) = self.next {
            writeln!(w, "{S4}Next sample index: {}", next.get())?;
        }
        for (name, error) in &self.failed {
            writeln!(w, "{S4}Failed `{name}`: {error}")?;
        }
        write!(w, "{S4}Total time: {} ms", self.elapsed.as_millis())?;
        Ok(())
    }

    /// 打印汇总, 前后各一条分隔线.
    pub fn analyze(&self) {
        let mut buf = Vec::with_capacity(512);
        let written = utils::sep_to(&mut buf)
            .and_then(|()| self.describe_into(&mut buf))
            .and_then(|()| writeln!(buf))
            .and_then(|()| utils::sep_to(&mut buf));
        match written {
            Ok(()) => print!("{}", String::from_utf8_lossy(&buf)),
            Err(e) => log::error!("failed to describe run: {e}"),
        }
    }
}
