//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, ImageSize, PixelXy, Point2d};

pub use crate::{BitDepth, CtWindow, HuSlice, ImgWriteRaw, NoduleMask, SliceImage};

pub use crate::annotation::{parse_annotation_file, parse_annotations, ParseError, RawAnnotation, SopUidMap};
pub use crate::cluster::{cluster, group_by_filename, ClusterConfig, ConsensusNodule, SliceNodules};
pub use crate::compose::composite;
pub use crate::label::{label_file_contents, radius, BoundingBox};
pub use crate::raster::rasterize;

pub use crate::consts::gray::{BACKGROUND, FOREGROUND};

pub use crate::dataset::{home_dataset_dir_with, list_cases, CaseDir};
pub use crate::export::{OutputLayout, SampleIndex, TargetKind};

#[cfg(feature = "serde")]
pub use crate::summary::{read_summary, write_summary};
