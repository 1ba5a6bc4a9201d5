//! 任务与对话：QUST / DIAL / INFO

use super::common::{CONDITION_FIELDS, FORM_ID_ELEMENT};
use super::{FieldDescriptor, FieldKind, RecordLayout, RecordType};

pub static QUST: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"QUST"),
    name: "Quest",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("script", b"SCRI", FieldKind::FormId),
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("iconPath", b"ICON", FieldKind::Text),
        FieldDescriptor::new("flags", b"QFLG", FieldKind::UInt8),
        FieldDescriptor::new("priority", b"QPRI", FieldKind::UInt8),
        FieldDescriptor::new("conditions", b"CTDL", FieldKind::List(&CONDITION_FIELDS)),
        FieldDescriptor::new("stages", b"STGL", FieldKind::List(&STAGE_FIELDS)),
        FieldDescriptor::new("targets", b"QSTL", FieldKind::List(&TARGET_FIELDS)),
    ],
};

static STAGE_FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor::new("stage", b"INDX", FieldKind::Int16),
    FieldDescriptor::new("entries", b"QSDL", FieldKind::List(&LOG_ENTRY_FIELDS)),
];

static LOG_ENTRY_FIELDS: [FieldDescriptor; 4] = [
    FieldDescriptor::new("flags", b"QSDT", FieldKind::UInt8),
    FieldDescriptor::new("conditions", b"CTDL", FieldKind::List(&CONDITION_FIELDS)),
    FieldDescriptor::new("text", b"CNAM", FieldKind::Text),
    FieldDescriptor::new("scriptText", b"SCTX", FieldKind::Text),
];

static TARGET_FIELDS: [FieldDescriptor; 4] = [
    FieldDescriptor::new("targetId", b"QSTA", FieldKind::FormId),
    FieldDescriptor::new("flags", b"QTFL", FieldKind::UInt8),
    FieldDescriptor::new("unused1", b"QTUN", FieldKind::FixedBytes(3)),
    FieldDescriptor::new("conditions", b"CTDL", FieldKind::List(&CONDITION_FIELDS)),
];

pub mod qust {
    use crate::layout::FieldIndex;
    pub const SCRIPT: FieldIndex = 4;
    pub const FULL: FieldIndex = 5;
    pub const ICON: FieldIndex = 6;
    pub const FLAGS: FieldIndex = 7;
    pub const PRIORITY: FieldIndex = 8;
    pub const CONDITIONS: FieldIndex = 9;
    pub const STAGES: FieldIndex = 10;
    pub const TARGETS: FieldIndex = 11;

    pub mod stage {
        use crate::layout::FieldIndex;
        pub const STAGE: FieldIndex = 0;
        pub const ENTRIES: FieldIndex = 1;
    }

    pub mod entry {
        use crate::layout::FieldIndex;
        pub const FLAGS: FieldIndex = 0;
        pub const CONDITIONS: FieldIndex = 1;
        pub const TEXT: FieldIndex = 2;
        pub const SCRIPT_TEXT: FieldIndex = 3;
    }

    pub mod target {
        use crate::layout::FieldIndex;
        pub const TARGET: FieldIndex = 0;
        pub const FLAGS: FieldIndex = 1;
        pub const UNUSED1: FieldIndex = 2;
        pub const CONDITIONS: FieldIndex = 3;
    }
}

pub static DIAL: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"DIAL"),
    name: "Dialogue Topic",
    parents: &[],
    parent_required: false,
    fields: &[
        FieldDescriptor::new("quests", b"QSTL", FieldKind::List(&FORM_ID_ELEMENT)),
        FieldDescriptor::new("full", b"FULL", FieldKind::Text),
        FieldDescriptor::new("dialType", b"DATA", FieldKind::UInt8),
    ],
};

pub mod dial {
    use crate::layout::FieldIndex;
    pub const QUESTS: FieldIndex = 4;
    pub const FULL: FieldIndex = 5;
    pub const DIALOG_TYPE: FieldIndex = 6;
}

pub static INFO: RecordLayout = RecordLayout {
    record_type: RecordType::new(b"INFO"),
    name: "Dialogue Response",
    parents: &[RecordType::new(b"DIAL")],
    parent_required: true,
    fields: &[
        FieldDescriptor::new("dialType", b"DTYP", FieldKind::UInt8),
        FieldDescriptor::new("nextSpeaker", b"NSPK", FieldKind::UInt8),
        FieldDescriptor::new("flags", b"IFLG", FieldKind::UInt8),
        FieldDescriptor::new("quest", b"QSTI", FieldKind::FormId),
        FieldDescriptor::new("topic", b"TPIC", FieldKind::FormId),
        FieldDescriptor::new("prevInfo", b"PNAM", FieldKind::FormId),
        FieldDescriptor::new("addTopics", b"NAME", FieldKind::List(&FORM_ID_ELEMENT)),
        FieldDescriptor::new("responses", b"TRDL", FieldKind::List(&RESPONSE_FIELDS)),
        FieldDescriptor::new("conditions", b"CTDL", FieldKind::List(&CONDITION_FIELDS)),
        FieldDescriptor::new("choices", b"TCLT", FieldKind::List(&FORM_ID_ELEMENT)),
        FieldDescriptor::new("scriptText", b"SCTX", FieldKind::Text),
    ],
};

static RESPONSE_FIELDS: [FieldDescriptor; 7] = [
    FieldDescriptor::new("emotionType", b"TRDT", FieldKind::UInt32),
    FieldDescriptor::new("emotionValue", b"EMOV", FieldKind::Int32),
    FieldDescriptor::new("unused1", b"TRU1", FieldKind::FixedBytes(4)),
    FieldDescriptor::new("responseNum", b"RNUM", FieldKind::UInt8),
    FieldDescriptor::new("unused2", b"TRU2", FieldKind::FixedBytes(3)),
    FieldDescriptor::new("responseText", b"NAM1", FieldKind::Text),
    FieldDescriptor::new("actorNotes", b"NAM2", FieldKind::Text),
];

pub mod info {
    use crate::layout::FieldIndex;
    pub const DIALOG_TYPE: FieldIndex = 4;
    pub const NEXT_SPEAKER: FieldIndex = 5;
    pub const FLAGS: FieldIndex = 6;
    pub const QUEST: FieldIndex = 7;
    pub const TOPIC: FieldIndex = 8;
    pub const PREVIOUS_INFO: FieldIndex = 9;
    pub const ADD_TOPICS: FieldIndex = 10;
    pub const RESPONSES: FieldIndex = 11;
    pub const CONDITIONS: FieldIndex = 12;
    pub const CHOICES: FieldIndex = 13;
    pub const SCRIPT_TEXT: FieldIndex = 14;

    pub mod response {
        use crate::layout::FieldIndex;
        pub const EMOTION_TYPE: FieldIndex = 0;
        pub const EMOTION_VALUE: FieldIndex = 1;
        pub const UNUSED1: FieldIndex = 2;
        pub const RESPONSE_NUMBER: FieldIndex = 3;
        pub const UNUSED2: FieldIndex = 4;
        pub const TEXT: FieldIndex = 5;
        pub const ACTOR_NOTES: FieldIndex = 6;
    }
}
