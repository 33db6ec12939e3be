//! 多医师共识聚类.
//!
//! 同一个结节通常被多位医师在同一切片上分别勾画. 该模块把这些记录合并为
//! 共识结节 [`ConsensusNodule`].
//!
//! # 注意
//!
//! 合并规则是 "首个成员为锚点" 的贪心规则, 而 **不是** 真正的单链接聚类:
//! 新记录只与各组的锚点 (第一个加入该组的成员中心) 比较距离, 锚点一旦确定不再变化.
//! 因此分组结果依赖输入顺序. 给定相同顺序的输入, 结果完全可复现.

use crate::annotation::RawAnnotation;
use crate::consts::{MASK_DISTANCE_THRESHOLD, VISUAL_DISTANCE_THRESHOLD};
use crate::geometry::{centroid, distance};
use crate::Point2d;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 聚类参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterConfig {
    /// 记录中心与组锚点之间的距离严格小于该值时才会并入该组.
    pub distance_threshold: f64,
}

impl ClusterConfig {
    /// 生成训练 mask 时使用的参数.
    pub const MASK: Self = Self {
        distance_threshold: MASK_DISTANCE_THRESHOLD,
    };

    /// 仅用于可视化时使用的参数 (更宽松).
    pub const VISUAL: Self = Self {
        distance_threshold: VISUAL_DISTANCE_THRESHOLD,
    };

    /// 以给定门限初始化.
    #[inline]
    pub const fn new(distance_threshold: f64) -> Self {
        Self { distance_threshold }
    }

    /// `center` 是否应当并入锚点为 `anchor` 的组?
    #[inline]
    pub fn accepts(&self, anchor: Point2d, center: Point2d) -> bool {
        distance(anchor, center) < self.distance_threshold
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::MASK
    }
}

/// 聚类过程中的一个组.
///
/// 锚点在组创建时确定, 此后不再变化.
#[derive(Clone, Debug)]
pub struct Group<'a> {
    anchor: Point2d,
    members: Vec<&'a RawAnnotation>,
}

impl<'a> Group<'a> {
    fn seed(first: &'a RawAnnotation) -> Self {
        Self {
            anchor: first.center,
            members: vec![first],
        }
    }

    /// 锚点中心.
    #[inline]
    pub fn anchor(&self) -> Point2d {
        self.anchor
    }

    /// 按加入顺序排列的组成员. 第一个成员即锚点.
    #[inline]
    pub fn members(&self) -> &[&'a RawAnnotation] {
        &self.members
    }

    /// 将组归约为共识结节.
    ///
    /// 1. 中心取各成员中心的分量平均;
    /// 2. 恶性度取有定义成员的平均, 全部缺失时为 `None`;
    /// 3. 边缘点按成员顺序直接拼接, 不去重;
    /// 4. `image_ref`, `z_position` 和 `filename` 取自锚点成员.
    pub fn reduce(&self) -> ConsensusNodule {
        let first = self.members[0];
        let centers = self.members.iter().map(|m| m.center).collect::<Vec<_>>();
        let center = centroid(&centers).unwrap_or(first.center);

        let defined = self
            .members
            .iter()
            .filter_map(|m| m.malignancy)
            .map(f64::from)
            .collect::<Vec<_>>();
        let malignancy = if defined.is_empty() {
            None
        } else {
            Some(defined.iter().sum::<f64>() / defined.len() as f64)
        };

        let edge_points = self
            .members
            .iter()
            .flat_map(|m| m.edge_points.iter().copied())
            .collect();

        ConsensusNodule {
            image_ref: first.image_ref.clone(),
            z_position: first.z_position.clone(),
            filename: first.filename.clone(),
            center,
            edge_points,
            malignancy,
        }
    }
}

/// 多位医师对同一切片上同一结节标注的合并结果.
///
/// 序列化后的字段名与 `nodule_summary_new.json` 保持一致.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsensusNodule {
    /// 切片的 SOP Instance UID.
    #[cfg_attr(feature = "serde", serde(rename = "imageSOP_UID"))]
    pub image_ref: String,

    /// 切片的 z 坐标, 按原文保存.
    #[cfg_attr(feature = "serde", serde(rename = "imageZposition"))]
    pub z_position: String,

    /// DICOM 文件名. 未解析时为 `None`.
    pub filename: Option<String>,

    /// 成员中心的平均.
    pub center: Point2d,

    /// 所有成员的边缘点, 按成员顺序拼接.
    pub edge_points: Vec<Point2d>,

    /// 有定义的恶性度的平均.
    pub malignancy: Option<f64>,
}

impl ConsensusNodule {
    /// 文件名是否已解析.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.filename.is_some()
    }
}

/// 按 `image_ref` 划分记录, 再在每个划分内贪心分组.
///
/// 划分按 `image_ref` 第一次出现的顺序排列; 划分内的组按创建顺序排列.
pub fn group_records<'a>(records: &'a [RawAnnotation], config: &ClusterConfig) -> Vec<Group<'a>> {
    let mut slot_of: HashMap<&str, usize> = HashMap::new();
    let mut partitions: Vec<Vec<&RawAnnotation>> = vec![];
    for r in records {
        let slot = *slot_of.entry(r.image_ref.as_str()).or_insert_with(|| {
            partitions.push(vec![]);
            partitions.len() - 1
        });
        partitions[slot].push(r);
    }

    partitions
        .into_iter()
        .flat_map(|partition| group_partition(partition, config))
        .collect()
}

/// 单个划分内的贪心分组: 依次把记录放入第一个接受它的组, 否则新建组.
fn group_partition<'a>(partition: Vec<&'a RawAnnotation>, config: &ClusterConfig) -> Vec<Group<'a>> {
    let mut groups: Vec<Group<'a>> = vec![];
    for r in partition {
        match groups.iter_mut().find(|g| config.accepts(g.anchor, r.center)) {
            Some(g) => g.members.push(r),
            None => groups.push(Group::seed(r)),
        }
    }
    groups
}

/// 将一个病例的全部标注记录聚类为共识结节.
pub fn cluster(records: &[RawAnnotation], config: &ClusterConfig) -> Vec<ConsensusNodule> {
    group_records(records, config)
        .iter()
        .map(Group::reduce)
        .collect()
}

/// 同一 DICOM 文件 (切片) 上的全部共识结节.
#[derive(Clone, Debug, PartialEq)]
pub struct SliceNodules {
    /// DICOM 文件名.
    pub filename: String,

    /// 该切片上的结节.
    pub nodules: Vec<ConsensusNodule>,
}

/// 按文件名对共识结节分组, 组按文件名第一次出现的顺序排列.
///
/// 文件名为 `None` 的结节不参与分组, 作为第二个返回值原样返回, 便于诊断.
pub fn group_by_filename<I>(nodules: I) -> (Vec<SliceNodules>, Vec<ConsensusNodule>)
where
    I: IntoIterator<Item = ConsensusNodule>,
{
    let mut slot_of: HashMap<String, usize> = HashMap::new();
    let mut slices: Vec<SliceNodules> = vec![];
    let mut unresolved = vec![];

    for n in nodules {
        let Some(filename) = n.filename.clone() else {
            unresolved.push(n);
            continue;
        };
        let slot = *slot_of.entry(filename).or_insert_with_key(|name| {
            slices.push(SliceNodules {
                filename: name.clone(),
                nodules: vec![],
            });
            slices.len() - 1
        });
        slices[slot].nodules.push(n);
    }
    (slices, unresolved)
}
