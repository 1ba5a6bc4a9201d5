//! 角色与容器类记录：CLAS / FACT / NPC_ / CONT / LVLI

use super::common::{FORM_ID_ELEMENT, ITEM_FIELDS};
use super::{FieldDescriptor, FieldKind, RecordLayout, RecordType};

pub static CLAS: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"CLAS"),
    name: "Class",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("description", b"DESC", FieldKind::Text),
        FieldDescriptor::new("iconPath", b"ICON", FieldKind::Text),
        FieldDescriptor::new("primary1", b"PRI1", FieldKind::Int32),
        FieldDescriptor::new("primary2", b"PRI2", FieldKind::Int32),
        FieldDescriptor::new("specialization", b"SPEC", FieldKind::UInt32),
        FieldDescriptor::new("majors", b"MSKL", FieldKind::List(&SKILL_FIELDS)),
        FieldDescriptor::new("flags", b"CFLG", FieldKind::UInt32),
        FieldDescriptor::new("services", b"SERV", FieldKind::UInt32),
        FieldDescriptor::new("trainSkill", b"TSKL", FieldKind::Int8),
        FieldDescriptor::new("trainLevel", b"TLVL", FieldKind::UInt8),
        FieldDescriptor::new("unused1", b"CUNU", FieldKind::FixedBytes(2)),
    ],
};

static SKILL_FIELDS: [FieldDescriptor; 1] = [
    FieldDescriptor::new("skill", b"SKIL", FieldKind::Int32),
];

pub mod clas {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const DESCRIPTION: FieldIndex = 5;
    pub const ICON: FieldIndex = 6;
    pub const PRIMARY1: FieldIndex = 7;
    pub const PRIMARY2: FieldIndex = 8;
    pub const SPECIALIZATION: FieldIndex = 9;
    pub const MAJORS: FieldIndex = 10;
    pub const FLAGS: FieldIndex = 11;
    pub const SERVICES: FieldIndex = 12;
    pub const TRAIN_SKILL: FieldIndex = 13;
    pub const TRAIN_LEVEL: FieldIndex = 14;
    pub const UNUSED1: FieldIndex = 15;

    pub mod major {
        pub const SKILL: crate::layout::FieldIndex = 0;
    }
}

pub static FACT: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"FACT"),
    name: "Faction",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("relations", b"XNAM", FieldKind::List(&RELATION_FIELDS)),
        FieldDescriptor::new("flags", b"DATA", FieldKind::UInt8),
        FieldDescriptor::new("crimeGoldMultiplier", b"CNAM", FieldKind::Float32),
        FieldDescriptor::new("ranks", b"RNKL", FieldKind::List(&RANK_FIELDS)),
    ],
};

static RELATION_FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor::new("faction", b"FACT", FieldKind::FormId),
    FieldDescriptor::new("mod", b"MODI", FieldKind::Int32),
];

static RANK_FIELDS: [FieldDescriptor; 4] = [
    FieldDescriptor::new("rank", b"RNAM", FieldKind::Int32),
    FieldDescriptor::new("male", b"MNAM", FieldKind::Text),
    FieldDescriptor::new("female", b"FNAM", FieldKind::Text),
    FieldDescriptor::new("insigniaPath", b"INAM", FieldKind::Text),
];

pub mod fact {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const RELATIONS: FieldIndex = 5;
    pub const FLAGS: FieldIndex = 6;
    pub const CRIME_GOLD_MULTIPLIER: FieldIndex = 7;
    pub const RANKS: FieldIndex = 8;

    pub mod relation {
        use crate::layout::FieldIndex;
        pub const FACTION: FieldIndex = 0;
        pub const MODIFIER: FieldIndex = 1;
    }

    pub mod rank {
        use crate::layout::FieldIndex;
        pub const RANK: FieldIndex = 0;
        pub const MALE: FieldIndex = 1;
        pub const FEMALE: FieldIndex = 2;
        pub const INSIGNIA: FieldIndex = 3;
    }
}

pub static NPC_: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"NPC_"),
    name: "Non-Player Character",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("modPath", b"MODL", FieldKind::Text),
        FieldDescriptor::new("flags", b"NFLG", FieldKind::UInt32),
        FieldDescriptor::new("baseSpell", b"BSPL", FieldKind::UInt16),
        FieldDescriptor::new("fatigue", b"FATG", FieldKind::UInt16),
        FieldDescriptor::new("barterGold", b"BGLD", FieldKind::UInt16),
        FieldDescriptor::new("level", b"LEVL", FieldKind::Int16),
        FieldDescriptor::new("calcMin", b"CMIN", FieldKind::UInt16),
        FieldDescriptor::new("calcMax", b"CMAX", FieldKind::UInt16),
        FieldDescriptor::new("factions", b"SNAM", FieldKind::List(&MEMBERSHIP_FIELDS)),
        FieldDescriptor::new("deathItem", b"INAM", FieldKind::FormId),
        FieldDescriptor::new("race", b"RNAM", FieldKind::FormId),
        FieldDescriptor::new("spells", b"SPLL", FieldKind::List(&FORM_ID_ELEMENT)),
        FieldDescriptor::new("script", b"SCRI", FieldKind::FormId),
        FieldDescriptor::new("items", b"CNTL", FieldKind::List(&ITEM_FIELDS)),
        FieldDescriptor::new("aiPackages", b"PKGL", FieldKind::List(&FORM_ID_ELEMENT)),
        FieldDescriptor::new("iclass", b"CNAM", FieldKind::FormId),
        FieldDescriptor::new("hair", b"HNAM", FieldKind::FormId),
        FieldDescriptor::new("hairLength", b"LNAM", FieldKind::Float32),
        FieldDescriptor::new("eye", b"ENAM", FieldKind::FormId),
        FieldDescriptor::new("combatStyle", b"ZNAM", FieldKind::FormId),
        FieldDescriptor::new("fggs", b"FGGS", FieldKind::Bytes),
    ],
};

static MEMBERSHIP_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::new("faction", b"FACT", FieldKind::FormId),
    FieldDescriptor::new("rank", b"RANK", FieldKind::UInt8),
    FieldDescriptor::new("unused1", b"FUNU", FieldKind::FixedBytes(3)),
];

pub mod npc {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const MODEL: FieldIndex = 5;
    pub const FLAGS: FieldIndex = 6;
    pub const BASE_SPELL: FieldIndex = 7;
    pub const FATIGUE: FieldIndex = 8;
    pub const BARTER_GOLD: FieldIndex = 9;
    pub const LEVEL: FieldIndex = 10;
    pub const CALC_MIN: FieldIndex = 11;
    pub const CALC_MAX: FieldIndex = 12;
    pub const FACTIONS: FieldIndex = 13;
    pub const DEATH_ITEM: FieldIndex = 14;
    pub const RACE: FieldIndex = 15;
    pub const SPELLS: FieldIndex = 16;
    pub const SCRIPT: FieldIndex = 17;
    pub const ITEMS: FieldIndex = 18;
    pub const AI_PACKAGES: FieldIndex = 19;
    pub const CLASS: FieldIndex = 20;
    pub const HAIR: FieldIndex = 21;
    pub const HAIR_LENGTH: FieldIndex = 22;
    pub const EYE: FieldIndex = 23;
    pub const COMBAT_STYLE: FieldIndex = 24;
    pub const FGGS: FieldIndex = 25;

    pub mod faction {
        use crate::layout::FieldIndex;
        pub const FACTION: FieldIndex = 0;
        pub const RANK: FieldIndex = 1;
        pub const UNUSED1: FieldIndex = 2;
    }
}

pub static CONT: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"CONT"),
    name: "Container",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("modPath", b"MODL", FieldKind::Text),
        FieldDescriptor::new("script", b"SCRI", FieldKind::FormId),
        FieldDescriptor::new("items", b"CNTL", FieldKind::List(&ITEM_FIELDS)),
        FieldDescriptor::new("flags", b"CFLG", FieldKind::UInt8),
        FieldDescriptor::new("weight", b"WGHT", FieldKind::Float32),
        FieldDescriptor::new("soundOpen", b"SNAM", FieldKind::FormId),
        FieldDescriptor::new("soundClose", b"QNAM", FieldKind::FormId),
    ],
};

pub mod cont {
    use crate::layout::FieldIndex;
    pub const FULL: FieldIndex = 4;
    pub const MODEL: FieldIndex = 5;
    pub const SCRIPT: FieldIndex = 6;
    pub const ITEMS: FieldIndex = 7;
    pub const FLAGS: FieldIndex = 8;
    pub const WEIGHT: FieldIndex = 9;
    pub const SOUND_OPEN: FieldIndex = 10;
    pub const SOUND_CLOSE: FieldIndex = 11;
}

pub static LVLI: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"LVLI"),
    name: "Leveled Item",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("chanceNone", b"LVLD", FieldKind::UInt8),
        FieldDescriptor::new("flags", b"LVLF", FieldKind::UInt8),
        FieldDescriptor::new("entries", b"LVLO", FieldKind::List(&LEVELED_ENTRY_FIELDS)),
    ],
};

static LEVELED_ENTRY_FIELDS: [FieldDescriptor; 5] = [
    FieldDescriptor::new("level", b"LVLV", FieldKind::Int16),
    FieldDescriptor::new("unused1", b"LVU1", FieldKind::FixedBytes(2)),
    FieldDescriptor::new("listId", b"LVID", FieldKind::FormId),
    FieldDescriptor::new("count", b"LVCT", FieldKind::Int16),
    FieldDescriptor::new("unused2", b"LVU2", FieldKind::FixedBytes(2)),
];

pub mod lvli {
    use crate::layout::FieldIndex;
    pub const CHANCE_NONE: FieldIndex = 4;
    pub const FLAGS: FieldIndex = 5;
    pub const ENTRIES: FieldIndex = 6;

    pub mod entry {
        use crate::layout::FieldIndex;
        pub const LEVEL: FieldIndex = 0;
        pub const UNUSED1: FieldIndex = 1;
        pub const LIST_ID: FieldIndex = 2;
        pub const COUNT: FieldIndex = 3;
        pub const UNUSED2: FieldIndex = 4;
    }
}
