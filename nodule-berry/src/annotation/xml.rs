use super::{ParseError, RawAnnotation, SopUidMap};
use crate::consts::{LIDC_NAMESPACE, MALIGNANCY_RANGE};
use crate::geometry::centroid;
use crate::Point2d;
use log::{debug, warn};
use roxmltree::{Document, Node};
use std::path::Path;

/// 读取并解析 `path` 处的 XML 标注文件. 见 [`parse_annotations`].
pub fn parse_annotation_file<P: AsRef<Path>>(
    path: P,
    uid_map: &SopUidMap,
) -> Result<Vec<RawAnnotation>, ParseError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let ans = parse_annotations(&text, uid_map)?;
    debug!(
        "{}: {} annotations parsed",
        path.as_ref().display(),
        ans.len()
    );
    Ok(ans)
}

/// 将一个病例的 XML 标注文档展开为扁平的 [`RawAnnotation`] 列表.
///
/// 第 `i` 个 `readingSession` 的所有记录的 `reader_id` 均为 `i`.
/// 对每个 `unblindedReadNodule` 下的每个 `roi`:
///
/// 1. 缺少 `imageZposition` 或没有任何 `edgeMap` 的 `roi` 被跳过;
/// 2. 中心为该 `roi` 全部边缘点的算术平均;
/// 3. 文件名通过 `uid_map` 查找, 找不到时为 `None`;
/// 4. 恶性度取自结节的 `characteristics/malignancy`, 缺失或非法时为 `None`.
///
/// # 注意
///
/// 文档结构有误 (非法 XML, 缺少 `imageSOP_UID`, 坐标不是数字等) 时立即返回错误,
/// 不会产出部分结果. 单个恶性度缺失或非法不视为错误.
pub fn parse_annotations(text: &str, uid_map: &SopUidMap) -> Result<Vec<RawAnnotation>, ParseError> {
    let doc = Document::parse(text)?;
    let mut ans = Vec::with_capacity(16);

    for (reader_id, session) in children(doc.root_element(), "readingSession").enumerate() {
        for nodule in children(session, "unblindedReadNodule") {
            let malignancy = read_malignancy(nodule);
            for roi in children(nodule, "roi") {
                if let Some(record) = read_roi(roi, reader_id, malignancy, uid_map)? {
                    ans.push(record);
                }
            }
        }
    }
    Ok(ans)
}

/// 解析单个 `roi`. 应被跳过的 `roi` 返回 `Ok(None)`.
fn read_roi(
    roi: Node,
    reader_id: usize,
    malignancy: Option<u8>,
    uid_map: &SopUidMap,
) -> Result<Option<RawAnnotation>, ParseError> {
    let Some(z_node) = child(roi, "imageZposition") else {
        return Ok(None);
    };

    let edge_points = children(roi, "edgeMap")
        .map(read_edge_point)
        .collect::<Result<Vec<Point2d>, _>>()?;
    let Some(center) = centroid(&edge_points) else {
        return Ok(None);
    };

    let image_ref = child(roi, "imageSOP_UID")
        .map(text_of)
        .ok_or(ParseError::MissingNode {
            parent: "roi",
            child: "imageSOP_UID",
        })?;
    let filename = uid_map.get(&image_ref).cloned();

    Ok(Some(RawAnnotation {
        reader_id,
        image_ref,
        z_position: text_of(z_node),
        center,
        edge_points,
        malignancy,
        filename,
    }))
}

/// 解析 `edgeMap` 下的 `(xCoord, yCoord)`.
fn read_edge_point(edge: Node) -> Result<Point2d, ParseError> {
    let x = read_number(edge, "xCoord")?;
    let y = read_number(edge, "yCoord")?;
    Ok((x, y))
}

fn read_number(node: Node, name: &'static str) -> Result<f64, ParseError> {
    let text = child(node, name).map(text_of).ok_or(ParseError::MissingNode {
        parent: "edgeMap",
        child: name,
    })?;
    text.parse::<f64>()
        .map_err(|_| ParseError::BadNumber { node: name, text })
}

/// 读取结节的恶性度. 该值是可选的, 任何异常都只记录日志并返回 `None`.
fn read_malignancy(nodule: Node) -> Option<u8> {
    let text = child(nodule, "characteristics")
        .and_then(|c| child(c, "malignancy"))
        .map(text_of)?;
    match text.parse::<u8>() {
        Ok(m) if MALIGNANCY_RANGE.contains(&m) => Some(m),
        _ => {
            warn!("ignoring malignancy {text:?}: expected an integer in 1..=5");
            None
        }
    }
}

/// 节点是否是给定本地名的 LIDC 元素. 允许文档不声明命名空间.
#[inline]
fn is_lidc(node: &Node, name: &str) -> bool {
    let tag = node.tag_name();
    node.is_element()
        && tag.name() == name
        && matches!(tag.namespace(), None | Some(LIDC_NAMESPACE))
}

/// 所有名为 `name` 的直接子元素.
#[inline]
fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |c| is_lidc(c, name))
}

/// 第一个名为 `name` 的直接子元素.
#[inline]
fn child<'a, 'input>(node: Node<'a, 'input>, name: &'static str) -> Option<Node<'a, 'input>> {
    children(node, name).next()
}

/// 去除首尾空白后的节点文本. 空节点返回空串.
#[inline]
fn text_of(node: Node) -> String {
    node.text().unwrap_or_default().trim().to_owned()
}
