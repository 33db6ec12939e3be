//! 数据集目录操作.
//!
//! LIDC-IDRI 数据集根目录下, 每个病例是一个名为 `LIDC-IDRI-xxxx` 的目录,
//! 其下 (可能嵌套若干层) 存放该病例的 DICOM 切片和一份 XML 标注文件.

use crate::consts::{CASE_PREFIX, NULL_FILENAME_LOG, SUMMARY_FILENAME};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 列出 `root` 下所有病例目录, 按目录名升序排列.
///
/// 名字不以 `LIDC-IDRI-` 开头的目录和所有普通文件都被忽略.
pub fn list_cases<P: AsRef<Path>>(root: P) -> io::Result<Vec<CaseDir>> {
    let mut ans = vec![];
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(CASE_PREFIX) {
            ans.push(CaseDir {
                path: entry.path(),
                name,
            });
        }
    }
    ans.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ans)
}

/// 一个病例目录.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseDir {
    path: PathBuf,
    name: String,
}

impl CaseDir {
    /// 直接由路径初始化. 病例名取路径的最后一段.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_owned();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    /// 病例名, 如 `LIDC-IDRI-0001`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 病例目录.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 病例目录下的所有文件 (递归), 按路径升序排列.
    pub fn files(&self) -> io::Result<Vec<PathBuf>> {
        let mut ans = vec![];
        walk_sorted(&self.path, &mut ans)?;
        Ok(ans)
    }

    /// 第一个 `.xml` 标注文件 (递归查找, 按路径顺序). 不存在时返回 `None`.
    pub fn find_annotation(&self) -> io::Result<Option<PathBuf>> {
        Ok(self.files()?.into_iter().find(|p| has_extension(p, "xml")))
    }

    /// 所有 `.dcm` 文件 (扩展名大小写不敏感), 按路径升序排列.
    pub fn dicom_files(&self) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|p| has_extension(p, "dcm"))
            .collect())
    }

    /// 共识结节汇总文件的路径.
    #[inline]
    pub fn summary_path(&self) -> PathBuf {
        self.path.join(SUMMARY_FILENAME)
    }

    /// 文件名无法解析的结节日志路径.
    #[inline]
    pub fn null_filename_log_path(&self) -> PathBuf {
        self.path.join(NULL_FILENAME_LOG)
    }
}

/// 扩展名是否为 `ext` (大小写不敏感)?
#[inline]
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// 深度优先地收集 `dir` 下的所有普通文件. 同一目录内的条目按名字排序.
fn walk_sorted(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            walk_sorted(&path, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_home_dataset_dir_with() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                home_dataset_dir_with(["LIDC-IDRI"]).unwrap(),
                home.join("dataset").join("LIDC-IDRI")
            );
        }
    }

    #[test]
    fn test_list_cases_sorted() {
        let root = tempfile::tempdir().unwrap();
        for name in ["LIDC-IDRI-0002", "LIDC-IDRI-0001", "other"] {
            fs::create_dir(root.path().join(name)).unwrap();
        }
        touch(&root.path().join("LIDC-IDRI-0003"));

        let cases = list_cases(root.path()).unwrap();
        let names = cases.iter().map(CaseDir::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["LIDC-IDRI-0001", "LIDC-IDRI-0002"]);
    }

    #[test]
    fn test_case_files() {
        let root = tempfile::tempdir().unwrap();
        let case = CaseDir::new(root.path().join("LIDC-IDRI-0001"));
        let series = case.path().join("01-01-2000").join("3000566");
        touch(&series.join("000002.DCM"));
        touch(&series.join("000001.dcm"));
        touch(&series.join("069.xml"));
        touch(&case.path().join("b").join("070.xml"));
        touch(&case.path().join("notes.txt"));

        assert_eq!(case.name(), "LIDC-IDRI-0001");
        assert_eq!(
            case.find_annotation().unwrap(),
            Some(series.join("069.xml"))
        );
        assert_eq!(
            case.dicom_files().unwrap(),
            vec![series.join("000001.dcm"), series.join("000002.DCM")]
        );
        assert!(case.summary_path().ends_with(SUMMARY_FILENAME));
    }

    #[test]
    fn test_missing_case_dir() {
        let case = CaseDir::new("/definitely/not/here/LIDC-IDRI-9999");
        assert!(case.files().is_err());
    }
}
