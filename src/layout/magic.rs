//! 魔法类记录：MGEF / SPEL / ENCH

use super::common::EFFECT_FIELDS;
use super::{FieldDescriptor, FieldKind, RecordLayout, RecordType};

pub static MGEF: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"MGEF"),
    name: "Magic Effect",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("text", b"DESC", FieldKind::Text),
        FieldDescriptor::new("iconPath", b"ICON", FieldKind::Text),
        FieldDescriptor::new("modPath", b"MODL", FieldKind::Text),
        FieldDescriptor::new("flags", b"MFLG", FieldKind::UInt32),
        FieldDescriptor::new("baseCost", b"BCST", FieldKind::Float32),
        FieldDescriptor::new("associated", b"ASSC", FieldKind::FormId),
        FieldDescriptor::new("school", b"SCHL", FieldKind::Int32),
        FieldDescriptor::new("resistValue", b"RSTV", FieldKind::Int32),
        FieldDescriptor::new("light", b"LGHT", FieldKind::FormId),
        FieldDescriptor::new("projectileSpeed", b"PSPD", FieldKind::Float32),
        FieldDescriptor::new("effectShader", b"EFSH", FieldKind::FormId),
        FieldDescriptor::new("counterEffects", b"ESCL", FieldKind::List(&COUNTER_FIELDS)),
    ],
};

static COUNTER_FIELDS: [FieldDescriptor; 1] = [
    FieldDescriptor::new("code", b"ESCE", FieldKind::FixedBytes(4)),
];

pub mod mgef {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const DESCRIPTION: FieldIndex = 5;
    pub const ICON: FieldIndex = 6;
    pub const MODEL: FieldIndex = 7;
    pub const FLAGS: FieldIndex = 8;
    pub const BASE_COST: FieldIndex = 9;
    pub const ASSOCIATED: FieldIndex = 10;
    pub const SCHOOL: FieldIndex = 11;
    pub const RESIST_VALUE: FieldIndex = 12;
    pub const LIGHT: FieldIndex = 13;
    pub const PROJECTILE_SPEED: FieldIndex = 14;
    pub const EFFECT_SHADER: FieldIndex = 15;
    pub const COUNTER_EFFECTS: FieldIndex = 16;

    pub mod counter {
        pub const CODE: crate::layout::FieldIndex = 0;
    }
}

pub static SPEL: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"SPEL"),
    name: "Spell",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("spellType", b"SPTP", FieldKind::UInt32),
        FieldDescriptor::new("cost", b"COST", FieldKind::UInt32),
        FieldDescriptor::new("levelType", b"LEVL", FieldKind::UInt32),
        FieldDescriptor::new("flags", b"SPFL", FieldKind::UInt8),
        FieldDescriptor::new("unused1", b"SPUN", FieldKind::FixedBytes(3)),
        FieldDescriptor::new("effects", b"EFFL", FieldKind::List(&EFFECT_FIELDS)),
    ],
};

pub mod spel {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const SPELL_TYPE: FieldIndex = 5;
    pub const COST: FieldIndex = 6;
    pub const LEVEL_TYPE: FieldIndex = 7;
    pub const FLAGS: FieldIndex = 8;
    pub const UNUSED1: FieldIndex = 9;
    pub const EFFECTS: FieldIndex = 10;
}

pub static ENCH: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"ENCH"),
    name: "Enchantment",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("itemType", b"ITYP", FieldKind::UInt32),
        FieldDescriptor::new("chargeAmount", b"CHRG", FieldKind::UInt32),
        FieldDescriptor::new("enchantCost", b"ECST", FieldKind::UInt32),
        FieldDescriptor::new("flags", b"ENFL", FieldKind::UInt8),
        FieldDescriptor::new("unused1", b"ENUN", FieldKind::FixedBytes(3)),
        FieldDescriptor::new("effects", b"EFFL", FieldKind::List(&EFFECT_FIELDS)),
    ],
};

pub mod ench {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const ITEM_TYPE: FieldIndex = 5;
    pub const CHARGE_AMOUNT: FieldIndex = 6;
    pub const ENCHANT_COST: FieldIndex = 7;
    pub const FLAGS: FieldIndex = 8;
    pub const UNUSED1: FieldIndex = 9;
    pub const EFFECTS: FieldIndex = 10;
}
