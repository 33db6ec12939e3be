//! 对 `nodule-berry::dataset` 的更一层封装. 提供更直接的数据集路径解析.

use nodule_berry::dataset::{self, CaseDir};
use std::env;
use std::io;
use std::path::PathBuf;

/// 数据集根目录的环境变量名.
pub const DATASET_DIR_VAR: &str = "LIDC_IDRI_DIR";

/// 输出根目录的环境变量名.
pub const OUTPUT_DIR_VAR: &str = "LIDC_OUTPUT_DIR";

/// 若环境变量 `var` 非空则返回其值, 否则返回 `$HOME/dataset/{fallback}`.
/// 两者都不可用时返回 `None`.
pub fn dir_from_env_or_home(var: &str, fallback: &str) -> Option<PathBuf> {
    match env::var(var) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => dataset::home_dataset_dir_with([fallback]),
    }
}

/// 获取 LIDC-IDRI 数据集根目录.
///
/// 1. 若环境变量 `$LIDC_IDRI_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/LIDC-IDRI`.
#[inline]
pub fn dataset_dir_from_env_or_home() -> Option<PathBuf> {
    dir_from_env_or_home(DATASET_DIR_VAR, "LIDC-IDRI")
}

/// 获取输出根目录.
///
/// 1. 若环境变量 `$LIDC_OUTPUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/lidc-out`.
#[inline]
pub fn output_dir_from_env_or_home() -> Option<PathBuf> {
    dir_from_env_or_home(OUTPUT_DIR_VAR, "lidc-out")
}

/// 列出数据集根目录下的所有病例, 并跳过前 `skip` 个.
pub fn cases(root: &std::path::Path, skip: usize) -> io::Result<Vec<CaseDir>> {
    let mut ans = dataset::list_cases(root)?;
    ans.drain(..skip.min(ans.len()));
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_env_takes_precedence() {
        let var = "NODULE_UTILS_TEST_DIR_ENV";
        env::set_var(var, "/tmp/lidc");
        assert_eq!(dir_from_env_or_home(var, "x"), Some(PathBuf::from("/tmp/lidc")));
        env::remove_var(var);
        assert_eq!(
            dir_from_env_or_home(var, "x"),
            dataset::home_dataset_dir_with(["x"])
        );
    }

    #[test]
    fn test_cases_skip() {
        let root = tempfile::tempdir().unwrap();
        for name in ["LIDC-IDRI-0003", "LIDC-IDRI-0001", "LIDC-IDRI-0002"] {
            fs::create_dir(root.path().join(name)).unwrap();
        }
        let names = |skip| {
            cases(root.path(), skip)
                .unwrap()
                .iter()
                .map(|c| c.name().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(1), vec!["LIDC-IDRI-0002", "LIDC-IDRI-0003"]);
        assert!(names(10).is_empty());
    }
}
