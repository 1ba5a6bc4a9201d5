//! 全局设置：GMST / GLOB

use super::{FieldDescriptor, FieldKind, RecordLayout, RecordType};

/// 游戏设置。值的类型由编辑器 ID 首字母决定（s/i/f），三个字段只会设置其一。
pub static GMST: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"GMST"),
    name: "Game Setting",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("stringValue", b"DATS", FieldKind::Text),
        FieldDescriptor::new("intValue", b"DATI", FieldKind::Int32),
        FieldDescriptor::new("floatValue", b"DATF", FieldKind::Float32),
    ],
};

pub mod gmst {
    use crate::layout::FieldIndex;
    pub const STRING_VALUE: FieldIndex = 4;
    pub const INT_VALUE: FieldIndex = 5;
    pub const FLOAT_VALUE: FieldIndex = 6;
}

pub static GLOB: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"GLOB"),
    name: "Global Variable",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("format", b"FNAM", FieldKind::UInt8),
        FieldDescriptor::new("value", b"FLTV", FieldKind::Float32),
    ],
};

pub mod glob {
    use crate::layout::FieldIndex;
    pub const FORMAT: FieldIndex = 4;
    pub const VALUE: FieldIndex = 5;
}
