//! 共识结节汇总文件 (`nodule_summary_new.json`) 的读写.
//!
//! 每个病例一个 JSON 数组, 元素字段为 `imageSOP_UID`, `imageZposition`,
//! `filename`, `center`, `edge_points`, `malignancy`. 未解析的文件名和缺失的恶性度写为 `null`.

use crate::cluster::ConsensusNodule;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// 汇总文件读写错误.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// 文件读写失败.
    #[error("summary I/O failed: {0}")]
    Io(#[from] io::Error),

    /// JSON 编解码失败.
    #[error("summary is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// 序列化为缩进 2 格的 JSON 数组.
#[inline]
pub fn to_json(nodules: &[ConsensusNodule]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(nodules)
}

/// 从 JSON 数组文本反序列化.
#[inline]
pub fn from_json(text: &str) -> Result<Vec<ConsensusNodule>, serde_json::Error> {
    serde_json::from_str(text)
}

/// 将共识结节写入 `path`. 已存在的文件会被覆盖.
pub fn write_summary<P: AsRef<Path>>(path: P, nodules: &[ConsensusNodule]) -> Result<(), SummaryError> {
    fs::write(path, to_json(nodules)?)?;
    Ok(())
}

/// 从 `path` 读取共识结节.
pub fn read_summary<P: AsRef<Path>>(path: P) -> Result<Vec<ConsensusNodule>, SummaryError> {
    let text = fs::read_to_string(path)?;
    Ok(from_json(&text)?)
}

/// 每个结节一行紧凑 JSON (JSON lines), 每行以 `\n` 结尾.
/// 用于汇总文件名无法解析的结节.
pub fn to_json_lines<'a, I>(nodules: I) -> Result<String, serde_json::Error>
where
    I: IntoIterator<Item = &'a ConsensusNodule>,
{
    let mut ans = String::new();
    for n in nodules {
        ans.push_str(&serde_json::to_string(n)?);
        ans.push('\n');
    }
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn nodules() -> Vec<ConsensusNodule> {
        vec![
            ConsensusNodule {
                image_ref: "1.3.6.1".to_string(),
                z_position: "-125.0".to_string(),
                filename: Some("000071.dcm".to_string()),
                center: (102.5, 100.0),
                edge_points: vec![(100.0, 100.0), (105.0, 100.0)],
                malignancy: Some(3.5),
            },
            ConsensusNodule {
                image_ref: "1.3.6.2".to_string(),
                z_position: "-127.5".to_string(),
                filename: None,
                center: (1.0, 2.0),
                edge_points: vec![(1.0, 2.0)],
                malignancy: None,
            },
        ]
    }

    #[test]
    fn test_field_names_and_nulls() {
        let v: Value = serde_json::from_str(&to_json(&nodules()).unwrap()).unwrap();
        let first = &v[0];
        assert_eq!(first["imageSOP_UID"], "1.3.6.1");
        assert_eq!(first["imageZposition"], "-125.0");
        assert_eq!(first["filename"], "000071.dcm");
        assert_eq!(first["center"], serde_json::json!([102.5, 100.0]));
        assert_eq!(first["edge_points"][1], serde_json::json!([105.0, 100.0]));
        assert_eq!(first["malignancy"], 3.5);

        let second = &v[1];
        assert!(second["filename"].is_null());
        assert!(second["malignancy"].is_null());
        assert_eq!(second.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(crate::consts::SUMMARY_FILENAME);
        write_summary(&path, &nodules()).unwrap();
        assert_eq!(read_summary(&path).unwrap(), nodules());
    }

    #[test]
    fn test_reads_integer_coordinates() {
        let text = r#"[{"imageSOP_UID": "u", "imageZposition": "1", "filename": null,
            "center": [3, 4], "edge_points": [[3, 4]], "malignancy": 2}]"#;
        let ans = from_json(text).unwrap();
        assert_eq!(ans[0].center, (3.0, 4.0));
        assert_eq!(ans[0].malignancy, Some(2.0));
    }

    #[test]
    fn test_bad_summary() {
        assert!(matches!(
            read_summary("/definitely/not/here.json"),
            Err(SummaryError::Io(_))
        ));
        assert!(from_json("{").is_err());
    }

    #[test]
    fn test_json_lines() {
        let text = to_json_lines(nodules().iter().filter(|n| !n.is_resolved())).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.ends_with('\n'));
        assert!(text.contains(r#""filename":null"#));
    }
}
