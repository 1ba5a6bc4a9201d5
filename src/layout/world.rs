//! 世界空间与引用：WRLD / CELL / REFR / ACHR
//!
//! CELL 可以独立存在（室内单元格），也可以挂在 WRLD 下；
//! REFR / ACHR 必须挂在 CELL 下。

use super::common::FORM_ID_ELEMENT;
use super::{FieldDescriptor, FieldKind, RecordLayout, RecordType};

pub static WRLD: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"WRLD"),
    name: "Worldspace",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("parent", b"WNAM", FieldKind::FormId),
        FieldDescriptor::new("climate", b"CNAM", FieldKind::FormId),
        FieldDescriptor::new("water", b"NAM2", FieldKind::FormId),
        FieldDescriptor::new("mapPath", b"ICON", FieldKind::Text),
        FieldDescriptor::new("flags", b"DATA", FieldKind::UInt8),
    ],
};

pub mod wrld {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const PARENT: FieldIndex = 5;
    pub const CLIMATE: FieldIndex = 6;
    pub const WATER: FieldIndex = 7;
    pub const MAP_PATH: FieldIndex = 8;
    pub const FLAGS: FieldIndex = 9;
}

pub static CELL: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"CELL"),
    name: "Cell",
    parents: &[RecordType::new(b"WRLD")],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("flags", b"DATA", FieldKind::UInt8),
        FieldDescriptor::new("posX", b"XCLX", FieldKind::Int32),
        FieldDescriptor::new("posY", b"XCLY", FieldKind::Int32),
        FieldDescriptor::new("regions", b"XCRL", FieldKind::List(&FORM_ID_ELEMENT)),
        FieldDescriptor::new("music", b"XCMT", FieldKind::UInt8),
        FieldDescriptor::new("waterHeight", b"XCLW", FieldKind::Float32),
        FieldDescriptor::new("climate", b"XCCM", FieldKind::FormId),
        FieldDescriptor::new("water", b"XCWT", FieldKind::FormId),
        FieldDescriptor::new("owner", b"XOWN", FieldKind::FormId),
        FieldDescriptor::new("rank", b"XRNK", FieldKind::Int32),
        FieldDescriptor::new("globalVariable", b"XGLB", FieldKind::FormId),
    ],
};

pub mod cell {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const FLAGS: FieldIndex = 5;
    pub const POS_X: FieldIndex = 6;
    pub const POS_Y: FieldIndex = 7;
    pub const REGIONS: FieldIndex = 8;
    pub const MUSIC: FieldIndex = 9;
    pub const WATER_HEIGHT: FieldIndex = 10;
    pub const CLIMATE: FieldIndex = 11;
    pub const WATER: FieldIndex = 12;
    pub const OWNER: FieldIndex = 13;
    pub const RANK: FieldIndex = 14;
    pub const GLOBAL: FieldIndex = 15;
}

pub static REFR: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"REFR"),
    name: "Placed Object",
    parents: &[RecordType::new(b"CELL")],
    parent_required: true,
    fields: &[
        FieldDescriptor::new("base", b"NAME", FieldKind::FormId),
        FieldDescriptor::new("owner", b"XOWN", FieldKind::FormId),
        FieldDescriptor::new("rank", b"XRNK", FieldKind::Int32),
        FieldDescriptor::new("globalVariable", b"XGLB", FieldKind::FormId),
        FieldDescriptor::new("enableParent", b"XESP", FieldKind::FormId),
        FieldDescriptor::new("enableParentFlags", b"XESF", FieldKind::UInt8),
        FieldDescriptor::new("destination", b"XTEL", FieldKind::FormId),
        FieldDescriptor::new("lockLevel", b"XLOC", FieldKind::UInt8),
        FieldDescriptor::new("lockKey", b"XLKY", FieldKind::FormId),
        FieldDescriptor::new("lockFlags", b"XLFL", FieldKind::UInt8),
        FieldDescriptor::new("scale", b"XSCL", FieldKind::Float32),
        FieldDescriptor::new("posX", b"POSX", FieldKind::Float32),
        FieldDescriptor::new("posY", b"POSY", FieldKind::Float32),
        FieldDescriptor::new("posZ", b"POSZ", FieldKind::Float32),
        FieldDescriptor::new("rotX", b"ROTX", FieldKind::Float32),
        FieldDescriptor::new("rotY", b"ROTY", FieldKind::Float32),
        FieldDescriptor::new("rotZ", b"ROTZ", FieldKind::Float32),
        FieldDescriptor::new("count", b"XCNT", FieldKind::Int32),
        FieldDescriptor::new("ragdollData", b"XRGD", FieldKind::Bytes),
    ],
};

pub mod refr {
    use crate::layout::FieldIndex;
    pub const BASE: FieldIndex = 4;
    pub const OWNER: FieldIndex = 5;
    pub const RANK: FieldIndex = 6;
    pub const GLOBAL: FieldIndex = 7;
    pub const ENABLE_PARENT: FieldIndex = 8;
    pub const ENABLE_PARENT_FLAGS: FieldIndex = 9;
    pub const DESTINATION: FieldIndex = 10;
    pub const LOCK_LEVEL: FieldIndex = 11;
    pub const LOCK_KEY: FieldIndex = 12;
    pub const LOCK_FLAGS: FieldIndex = 13;
    pub const SCALE: FieldIndex = 14;
    pub const POS_X: FieldIndex = 15;
    pub const POS_Y: FieldIndex = 16;
    pub const POS_Z: FieldIndex = 17;
    pub const ROT_X: FieldIndex = 18;
    pub const ROT_Y: FieldIndex = 19;
    pub const ROT_Z: FieldIndex = 20;
    pub const COUNT: FieldIndex = 21;
    pub const RAGDOLL: FieldIndex = 22;
}

pub static ACHR: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"ACHR"),
    name: "Placed NPC",
    parents: &[RecordType::new(b"CELL")],
    parent_required: true,
    fields: &[
        FieldDescriptor::new("base", b"NAME", FieldKind::FormId),
        FieldDescriptor::new("merchantContainer", b"XMRC", FieldKind::FormId),
        FieldDescriptor::new("horse", b"XHRS", FieldKind::FormId),
        FieldDescriptor::new("enableParent", b"XESP", FieldKind::FormId),
        FieldDescriptor::new("enableParentFlags", b"XESF", FieldKind::UInt8),
        FieldDescriptor::new("scale", b"XSCL", FieldKind::Float32),
        FieldDescriptor::new("posX", b"POSX", FieldKind::Float32),
        FieldDescriptor::new("posY", b"POSY", FieldKind::Float32),
        FieldDescriptor::new("posZ", b"POSZ", FieldKind::Float32),
        FieldDescriptor::new("rotX", b"ROTX", FieldKind::Float32),
        FieldDescriptor::new("rotY", b"ROTY", FieldKind::Float32),
        FieldDescriptor::new("rotZ", b"ROTZ", FieldKind::Float32),
        FieldDescriptor::new("ragdollData", b"XRGD", FieldKind::Bytes),
    ],
};

pub mod achr {
    use crate::layout::FieldIndex;
    pub const BASE: FieldIndex = 4;
    pub const MERCHANT_CONTAINER: FieldIndex = 5;
    pub const HORSE: FieldIndex = 6;
    pub const ENABLE_PARENT: FieldIndex = 7;
    pub const ENABLE_PARENT_FLAGS: FieldIndex = 8;
    pub const SCALE: FieldIndex = 9;
    pub const POS_X: FieldIndex = 10;
    pub const POS_Y: FieldIndex = 11;
    pub const POS_Z: FieldIndex = 12;
    pub const ROT_X: FieldIndex = 13;
    pub const ROT_Y: FieldIndex = 14;
    pub const ROT_Z: FieldIndex = 15;
    pub const RAGDOLL: FieldIndex = 16;
}
