//! 测试用的 DICOM 切片.

use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::tags;
use dicom_object::{FileMetaTableBuilder, InMemDicomObject};
use std::fs;
use std::path::Path;

/// 写出一个 `width x height` 的最小 CT 切片, SOP Instance UID 为 `uid`, 全部像素为 0 HU.
pub(crate) fn write_slice(path: &Path, uid: &str, (width, height): (u16, u16)) {
    let stored = vec![1024_u16; width as usize * height as usize];
    let mut obj = InMemDicomObject::new_empty();
    obj.put_str(tags::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.2");
    obj.put_str(tags::SOP_INSTANCE_UID, VR::UI, uid);
    obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(height)));
    obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(width)));
    obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16)));
    obj.put(DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(0_u16)));
    obj.put_str(tags::RESCALE_SLOPE, VR::DS, "1");
    obj.put_str(tags::RESCALE_INTERCEPT, VR::DS, "-1024");
    obj.put(DataElement::new(tags::PIXEL_DATA, VR::OW, PrimitiveValue::U16(stored.into())));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    obj.with_meta(FileMetaTableBuilder::new().transfer_syntax("1.2.840.10008.1.2.1"))
        .unwrap()
        .write_to_file(path)
        .unwrap();
}
