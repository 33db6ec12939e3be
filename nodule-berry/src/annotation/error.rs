//! 解析错误.

use thiserror::Error;

/// XML 标注文档解析错误.
///
/// 任意一种错误都意味着整个病例的标注不可用, 调用方应跳过该病例.
#[derive(Debug, Error)]
pub enum ParseError {
    /// 读取文件失败.
    #[error("failed to read annotation file: {0}")]
    Io(#[from] std::io::Error),

    /// 文档不是合法的 XML.
    #[error("malformed annotation document: {0}")]
    Xml(#[from] roxmltree::Error),

    /// 必需的子节点缺失.
    #[error("`{parent}` is missing mandatory child `{child}`")]
    MissingNode {
        /// 父节点名.
        parent: &'static str,

        /// 缺失的子节点名.
        child: &'static str,
    },

    /// 数值节点的内容无法解析.
    #[error("`{node}` holds a non-numeric value {text:?}")]
    BadNumber {
        /// 节点名.
        node: &'static str,

        /// 原始文本.
        text: String,
    },
}
