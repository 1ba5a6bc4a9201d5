//! 多种记录共用的列表元素结构

use super::{FieldDescriptor, FieldKind};

/// 条件（CTDA）
pub static CONDITION_FIELDS: [FieldDescriptor; 7] = [
    FieldDescriptor::new("operType", b"CTOP", FieldKind::UInt8),
    FieldDescriptor::new("unused1", b"CTU1", FieldKind::FixedBytes(3)),
    FieldDescriptor::new("compValue", b"CTVL", FieldKind::Float32),
    FieldDescriptor::new("ifunc", b"CTFN", FieldKind::UInt32),
    FieldDescriptor::new("param1", b"CTP1", FieldKind::FormId),
    FieldDescriptor::new("param2", b"CTP2", FieldKind::UInt32),
    FieldDescriptor::new("unused2", b"CTU2", FieldKind::FixedBytes(4)),
];

pub mod condition {
    use crate::layout::FieldIndex;
    pub const OPERATOR: FieldIndex = 0;
    pub const UNUSED1: FieldIndex = 1;
    pub const VALUE: FieldIndex = 2;
    pub const FUNCTION: FieldIndex = 3;
    pub const PARAM1: FieldIndex = 4;
    pub const PARAM2: FieldIndex = 5;
    pub const UNUSED2: FieldIndex = 6;
}

/// 物品条目（CNTO）
pub static ITEM_FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor::new("item", b"ITEM", FieldKind::FormId),
    FieldDescriptor::new("count", b"CNTO", FieldKind::Int32),
];

pub mod item {
    use crate::layout::FieldIndex;
    pub const ITEM: FieldIndex = 0;
    pub const COUNT: FieldIndex = 1;
}

/// 脚本效果（SCIT），作为 0/1 个元素的列表挂在效果下
pub static SCRIPT_EFFECT_FIELDS: [FieldDescriptor; 6] = [
    FieldDescriptor::new("script", b"SCRI", FieldKind::FormId),
    FieldDescriptor::new("school", b"SCHL", FieldKind::UInt32),
    FieldDescriptor::new("visual", b"VFXC", FieldKind::FixedBytes(4)),
    FieldDescriptor::new("flags", b"SEFL", FieldKind::UInt8),
    FieldDescriptor::new("unused1", b"SEUN", FieldKind::FixedBytes(3)),
    FieldDescriptor::new("full", b"FULL", FieldKind::Text),
];

pub mod script_effect {
    use crate::layout::FieldIndex;
    pub const SCRIPT: FieldIndex = 0;
    pub const SCHOOL: FieldIndex = 1;
    pub const VISUAL: FieldIndex = 2;
    pub const FLAGS: FieldIndex = 3;
    pub const UNUSED1: FieldIndex = 4;
    pub const FULL: FieldIndex = 5;
}

/// 魔法效果条目（EFID/EFIT）
pub static EFFECT_FIELDS: [FieldDescriptor; 7] = [
    FieldDescriptor::new("name", b"EFID", FieldKind::FixedBytes(4)),
    FieldDescriptor::new("magnitude", b"MAGN", FieldKind::UInt32),
    FieldDescriptor::new("area", b"AREA", FieldKind::UInt32),
    FieldDescriptor::new("duration", b"DURA", FieldKind::UInt32),
    FieldDescriptor::new("rangeType", b"RANG", FieldKind::UInt32),
    FieldDescriptor::new("actorValue", b"ACTV", FieldKind::Int32),
    FieldDescriptor::new("scriptEffect", b"SCIT", FieldKind::List(&SCRIPT_EFFECT_FIELDS)),
];

pub mod effect {
    use crate::layout::FieldIndex;
    pub const NAME: FieldIndex = 0;
    pub const MAGNITUDE: FieldIndex = 1;
    pub const AREA: FieldIndex = 2;
    pub const DURATION: FieldIndex = 3;
    pub const RANGE: FieldIndex = 4;
    pub const ACTOR_VALUE: FieldIndex = 5;
    pub const SCRIPT_EFFECT: FieldIndex = 6;
}

/// 单个 FormID 的列表元素（法术表、AI 包、话题等）
pub static FORM_ID_ELEMENT: [FieldDescriptor; 1] = [
    FieldDescriptor::new("value", b"FMID", FieldKind::FormId),
];

pub mod form_id_element {
    use crate::layout::FieldIndex;
    pub const VALUE: FieldIndex = 0;
}
