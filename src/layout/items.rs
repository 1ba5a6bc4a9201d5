//! 物品类记录：WEAP / ARMO / AMMO / BOOK / MISC

use super::{FieldDescriptor, FieldKind, RecordLayout, RecordType};

pub static WEAP: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"WEAP"),
    name: "Weapon",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("modPath", b"MODL", FieldKind::Text),
        FieldDescriptor::new("iconPath", b"ICON", FieldKind::Text),
        FieldDescriptor::new("script", b"SCRI", FieldKind::FormId),
        FieldDescriptor::new("enchantment", b"ENAM", FieldKind::FormId),
        FieldDescriptor::new("enchantPoints", b"ANAM", FieldKind::UInt16),
        FieldDescriptor::new("weaponType", b"WTYP", FieldKind::UInt32),
        FieldDescriptor::new("speed", b"SPED", FieldKind::Float32),
        FieldDescriptor::new("reach", b"RECH", FieldKind::Float32),
        FieldDescriptor::new("flags", b"WFLG", FieldKind::UInt32),
        FieldDescriptor::new("value", b"VALU", FieldKind::UInt32),
        FieldDescriptor::new("health", b"HLTH", FieldKind::UInt32),
        FieldDescriptor::new("weight", b"WGHT", FieldKind::Float32),
        FieldDescriptor::new("damage", b"DAMG", FieldKind::UInt16),
    ],
};

pub mod weap {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const MODEL: FieldIndex = 5;
    pub const ICON: FieldIndex = 6;
    pub const SCRIPT: FieldIndex = 7;
    pub const ENCHANTMENT: FieldIndex = 8;
    pub const ENCHANT_POINTS: FieldIndex = 9;
    pub const WEAPON_TYPE: FieldIndex = 10;
    pub const SPEED: FieldIndex = 11;
    pub const REACH: FieldIndex = 12;
    pub const FLAGS: FieldIndex = 13;
    pub const VALUE: FieldIndex = 14;
    pub const HEALTH: FieldIndex = 15;
    pub const WEIGHT: FieldIndex = 16;
    pub const DAMAGE: FieldIndex = 17;
}

pub static ARMO: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"ARMO"),
    name: "Armor",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("script", b"SCRI", FieldKind::FormId),
        FieldDescriptor::new("enchantment", b"ENAM", FieldKind::FormId),
        FieldDescriptor::new("enchantPoints", b"ANAM", FieldKind::UInt16),
        FieldDescriptor::new("flags", b"BMDT", FieldKind::UInt32),
        FieldDescriptor::new("maleBody", b"MODL", FieldKind::Text),
        FieldDescriptor::new("maleWorld", b"MOD2", FieldKind::Text),
        FieldDescriptor::new("maleIconPath", b"ICON", FieldKind::Text),
        FieldDescriptor::new("femaleBody", b"MOD3", FieldKind::Text),
        FieldDescriptor::new("femaleWorld", b"MOD4", FieldKind::Text),
        FieldDescriptor::new("femaleIconPath", b"ICO2", FieldKind::Text),
        FieldDescriptor::new("strength", b"ARST", FieldKind::UInt16),
        FieldDescriptor::new("value", b"VALU", FieldKind::UInt32),
        FieldDescriptor::new("health", b"HLTH", FieldKind::UInt32),
        FieldDescriptor::new("weight", b"WGHT", FieldKind::Float32),
    ],
};

pub mod armo {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const SCRIPT: FieldIndex = 5;
    pub const ENCHANTMENT: FieldIndex = 6;
    pub const ENCHANT_POINTS: FieldIndex = 7;
    pub const FLAGS: FieldIndex = 8;
    pub const MALE_BODY: FieldIndex = 9;
    pub const MALE_WORLD: FieldIndex = 10;
    pub const MALE_ICON: FieldIndex = 11;
    pub const FEMALE_BODY: FieldIndex = 12;
    pub const FEMALE_WORLD: FieldIndex = 13;
    pub const FEMALE_ICON: FieldIndex = 14;
    pub const STRENGTH: FieldIndex = 15;
    pub const VALUE: FieldIndex = 16;
    pub const HEALTH: FieldIndex = 17;
    pub const WEIGHT: FieldIndex = 18;
}

pub static AMMO: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"AMMO"),
    name: "Ammunition",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("modPath", b"MODL", FieldKind::Text),
        FieldDescriptor::new("iconPath", b"ICON", FieldKind::Text),
        FieldDescriptor::new("enchantment", b"ENAM", FieldKind::FormId),
        FieldDescriptor::new("enchantPoints", b"ANAM", FieldKind::UInt16),
        FieldDescriptor::new("speed", b"SPED", FieldKind::Float32),
        FieldDescriptor::new("flags", b"AFLG", FieldKind::UInt8),
        FieldDescriptor::new("unused1", b"AUNU", FieldKind::FixedBytes(3)),
        FieldDescriptor::new("value", b"VALU", FieldKind::UInt32),
        FieldDescriptor::new("weight", b"WGHT", FieldKind::Float32),
        FieldDescriptor::new("damage", b"DAMG", FieldKind::UInt16),
    ],
};

pub mod ammo {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const MODEL: FieldIndex = 5;
    pub const ICON: FieldIndex = 6;
    pub const ENCHANTMENT: FieldIndex = 7;
    pub const ENCHANT_POINTS: FieldIndex = 8;
    pub const SPEED: FieldIndex = 9;
    pub const FLAGS: FieldIndex = 10;
    pub const UNUSED1: FieldIndex = 11;
    pub const VALUE: FieldIndex = 12;
    pub const WEIGHT: FieldIndex = 13;
    pub const DAMAGE: FieldIndex = 14;
}

pub static BOOK: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"BOOK"),
    name: "Book",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("modPath", b"MODL", FieldKind::Text),
        FieldDescriptor::new("iconPath", b"ICON", FieldKind::Text),
        FieldDescriptor::new("text", b"DESC", FieldKind::Text),
        FieldDescriptor::new("script", b"SCRI", FieldKind::FormId),
        FieldDescriptor::new("enchantment", b"ENAM", FieldKind::FormId),
        FieldDescriptor::new("enchantPoints", b"ANAM", FieldKind::UInt16),
        FieldDescriptor::new("flags", b"BFLG", FieldKind::UInt8),
        FieldDescriptor::new("teaches", b"TEAC", FieldKind::Int8),
        FieldDescriptor::new("value", b"VALU", FieldKind::UInt32),
        FieldDescriptor::new("weight", b"WGHT", FieldKind::Float32),
    ],
};

pub mod book {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const MODEL: FieldIndex = 5;
    pub const ICON: FieldIndex = 6;
    pub const TEXT: FieldIndex = 7;
    pub const SCRIPT: FieldIndex = 8;
    pub const ENCHANTMENT: FieldIndex = 9;
    pub const ENCHANT_POINTS: FieldIndex = 10;
    pub const FLAGS: FieldIndex = 11;
    pub const TEACHES: FieldIndex = 12;
    pub const VALUE: FieldIndex = 13;
    pub const WEIGHT: FieldIndex = 14;
}

pub static MISC: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"MISC"),
    name: "Misc Item",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("modPath", b"MODL", FieldKind::Text),
        FieldDescriptor::new("iconPath", b"ICON", FieldKind::Text),
        FieldDescriptor::new("script", b"SCRI", FieldKind::FormId),
        FieldDescriptor::new("value", b"VALU", FieldKind::Int32),
        FieldDescriptor::new("weight", b"WGHT", FieldKind::Float32),
    ],
};

pub mod misc {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const MODEL: FieldIndex = 5;
    pub const ICON: FieldIndex = 6;
    pub const SCRIPT: FieldIndex = 7;
    pub const VALUE: FieldIndex = 8;
    pub const WEIGHT: FieldIndex = 9;
}
