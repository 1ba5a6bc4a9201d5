//! 字段描述表
//!
//! 每种受支持的记录类型都有一张静态布局表：字段索引 → (名称, 子记录标签, 类型)。
//! 索引 0..=3 是所有记录共有的字段，类型专属字段从 [`FIRST_FIELD`] 开始编号。
//! 列表元素内部的字段从 0 开始编号。

use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::path::{FieldPath, MAX_LIST_DEPTH};
use crate::utils::EspError;

pub mod common;
pub mod items;
pub mod actors;
pub mod magic;
pub mod world;
pub mod dialogue;
pub mod misc;

/// 字段索引
pub type FieldIndex = usize;

/// 记录头标志位（写入时保留删除位）
pub const FLAGS: FieldIndex = 0;
/// 记录自身 FormID（只读）
pub const FORM_ID: FieldIndex = 1;
/// 版本控制信息（时间戳在低 16 位）
pub const VERSION_CONTROL: FieldIndex = 2;
/// 编辑器 ID（EDID）
pub const EDITOR_ID: FieldIndex = 3;
/// 第一个类型专属字段
pub const FIRST_FIELD: FieldIndex = 4;

/// 存放在记录头中、不以子记录形式序列化的字段数量
pub const HEADER_FIELDS: FieldIndex = 3;

/// 4 字符记录类型
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordType(pub [u8; 4]);

impl RecordType {
    pub const fn new(tag: &[u8; 4]) -> Self {
        RecordType(*tag)
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordType({})", self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = EspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_graphic()) {
            return Err(EspError::UnsupportedRecordType(s.to_string()));
        }
        let mut tag = [0u8; 4];
        tag.copy_from_slice(bytes);
        Ok(RecordType(tag))
    }
}

impl Serialize for RecordType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

/// 字段类型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    FormId,
    /// 以 NUL 结尾的字符串
    Text,
    /// 变长字节块
    Bytes,
    /// 定长字节块（填充/未使用字段）
    FixedBytes(usize),
    /// 重复结构，参数为元素内的字段表
    List(&'static [FieldDescriptor]),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Int8 => "Int8",
            FieldKind::UInt8 => "UInt8",
            FieldKind::Int16 => "Int16",
            FieldKind::UInt16 => "UInt16",
            FieldKind::Int32 => "Int32",
            FieldKind::UInt32 => "UInt32",
            FieldKind::Float32 => "Float32",
            FieldKind::FormId => "FormID",
            FieldKind::Text => "Text",
            FieldKind::Bytes => "Bytes",
            FieldKind::FixedBytes(_) => "FixedBytes",
            FieldKind::List(_) => "List",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FieldKind::List(_))
    }

    pub fn element_fields(&self) -> Option<&'static [FieldDescriptor]> {
        match self {
            FieldKind::List(fields) => Some(fields),
            _ => None,
        }
    }

    /// 列表嵌套深度（标量为 0）
    pub fn list_depth(&self) -> usize {
        match self {
            FieldKind::List(fields) => {
                1 + fields.iter().map(|f| f.kind.list_depth()).max().unwrap_or(0)
            }
            _ => 0,
        }
    }
}

/// 字段描述
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub tag: [u8; 4],
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, tag: &[u8; 4], kind: FieldKind) -> Self {
        FieldDescriptor { name, tag: *tag, kind }
    }
}

/// 所有记录共有的字段（索引 0..=3）
pub static COMMON_FIELDS: [FieldDescriptor; 4] = [
    FieldDescriptor::new("flags", b"FLAG", FieldKind::UInt32),
    FieldDescriptor::new("formID", b"FMID", FieldKind::FormId),
    FieldDescriptor::new("versionControl", b"VCTL", FieldKind::UInt32),
    FieldDescriptor::new("eid", b"EDID", FieldKind::Text),
];

/// 记录布局
#[derive(Debug)]
pub struct RecordLayout {
    pub record_type: RecordType,
    pub name: &'static str,
    /// 可以容纳此类记录的父记录类型
    pub parents: &'static [RecordType],
    /// 是否必须位于父记录之内
    pub parent_required: bool,
    /// 类型专属字段，依次占用索引 FIRST_FIELD..
    pub fields: &'static [FieldDescriptor],
}

impl RecordLayout {
    /// 按索引取顶层字段描述
    pub fn descriptor(&self, index: FieldIndex) -> Option<&'static FieldDescriptor> {
        if index < FIRST_FIELD {
            COMMON_FIELDS.get(index)
        } else {
            self.fields.get(index - FIRST_FIELD)
        }
    }

    pub fn field_count(&self) -> usize {
        FIRST_FIELD + self.fields.len()
    }

    /// 按子记录标签查找可序列化的顶层字段
    pub fn find_by_tag(&self, tag: &[u8; 4]) -> Option<(FieldIndex, &'static FieldDescriptor)> {
        self.stored_fields().find(|(_, d)| &d.tag == tag)
    }

    /// 按名称查找顶层字段
    pub fn field_index(&self, name: &str) -> Option<FieldIndex> {
        (0..self.field_count()).find(|&i| self.descriptor(i).map(|d| d.name) == Some(name))
    }

    /// 以子记录形式存储的顶层字段（不含记录头字段）
    pub fn stored_fields(&self) -> impl Iterator<Item = (FieldIndex, &'static FieldDescriptor)> + '_ {
        (HEADER_FIELDS..self.field_count()).filter_map(move |i| self.descriptor(i).map(|d| (i, d)))
    }

    pub fn is_container_scoped(&self) -> bool {
        !self.parents.is_empty()
    }

    pub fn accepts_parent(&self, parent: RecordType) -> bool {
        self.parents.contains(&parent)
    }

    /// 沿路径解析字段描述
    pub fn resolve(&self, path: &FieldPath) -> Result<&'static FieldDescriptor, EspError> {
        if path.depth() > MAX_LIST_DEPTH {
            return Err(EspError::NestingTooDeep { max: MAX_LIST_DEPTH });
        }
        let mut desc = self.descriptor(path.root()).ok_or(EspError::UndefinedField {
            record_type: self.record_type,
            field: path.root(),
        })?;
        let mut current = path.root();
        for step in path.steps() {
            let elements = desc.kind.element_fields().ok_or(EspError::KindMismatch {
                record_type: self.record_type,
                field: current,
                expected: desc.kind.name(),
                found: "List",
            })?;
            desc = elements.get(step.field).ok_or(EspError::UndefinedField {
                record_type: self.record_type,
                field: step.field,
            })?;
            current = step.field;
        }
        Ok(desc)
    }
}

/// 字段表视图：记录顶层或某个列表元素
#[derive(Debug, Clone, Copy)]
pub enum FieldTable {
    Record(&'static RecordLayout),
    Element(&'static [FieldDescriptor]),
}

impl FieldTable {
    pub fn descriptor(&self, index: FieldIndex) -> Option<&'static FieldDescriptor> {
        match self {
            FieldTable::Record(layout) => layout.descriptor(index),
            FieldTable::Element(fields) => fields.get(index),
        }
    }

    pub fn find_by_tag(&self, tag: &[u8; 4]) -> Option<(FieldIndex, &'static FieldDescriptor)> {
        match self {
            FieldTable::Record(layout) => layout.find_by_tag(tag),
            FieldTable::Element(fields) => fields.iter().enumerate().find(|(_, d)| &d.tag == tag),
        }
    }

    /// 是否以子记录形式存储（记录头字段不是）
    pub fn is_stored(&self, index: FieldIndex) -> bool {
        match self {
            FieldTable::Record(_) => index >= HEADER_FIELDS,
            FieldTable::Element(_) => true,
        }
    }
}

static ALL_LAYOUTS: [&RecordLayout; 22] = [
    &misc::GMST,
    &misc::GLOB,
    &actors::CLAS,
    &actors::FACT,
    &magic::MGEF,
    &magic::SPEL,
    &magic::ENCH,
    &items::WEAP,
    &items::ARMO,
    &items::AMMO,
    &items::BOOK,
    &items::MISC,
    &actors::CONT,
    &actors::NPC_,
    &actors::LVLI,
    &dialogue::QUST,
    &dialogue::DIAL,
    &dialogue::INFO,
    &world::WRLD,
    &world::CELL,
    &world::REFR,
    &world::ACHR,
];

/// 所有受支持的布局（按顶层组的写出顺序）
pub fn all_layouts() -> &'static [&'static RecordLayout] {
    &ALL_LAYOUTS
}

/// 查找记录类型的布局
pub fn layout_for(record_type: RecordType) -> Option<&'static RecordLayout> {
    ALL_LAYOUTS.iter().copied().find(|l| l.record_type == record_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_fields() {
        let weap = layout_for(RecordType::new(b"WEAP")).unwrap();
        assert_eq!(weap.descriptor(EDITOR_ID).unwrap().tag, *b"EDID");
        assert_eq!(weap.descriptor(FLAGS).unwrap().kind, FieldKind::UInt32);
        assert!(weap.find_by_tag(b"FLAG").is_none(), "记录头字段不以标签查找");
    }

    #[test]
    fn test_tags_unique_per_level() {
        fn check(fields: &[FieldDescriptor], owner: &str) {
            for (i, a) in fields.iter().enumerate() {
                for b in &fields[i + 1..] {
                    assert_ne!(a.tag, b.tag, "{owner}: 标签重复 {}", String::from_utf8_lossy(&a.tag));
                }
                if let FieldKind::List(inner) = a.kind {
                    check(inner, a.name);
                }
            }
        }
        for layout in all_layouts() {
            let stored: Vec<FieldDescriptor> = layout.stored_fields().map(|(_, d)| *d).collect();
            check(&stored, layout.name);
        }
    }

    #[test]
    fn test_nesting_within_limit() {
        for layout in all_layouts() {
            for field in layout.fields {
                assert!(field.kind.list_depth() <= MAX_LIST_DEPTH, "{} 嵌套过深", layout.name);
            }
        }
        // QUST 的阶段 → 日志 → 条件 恰好三层
        let qust = layout_for(RecordType::new(b"QUST")).unwrap();
        let stages = qust.descriptor(dialogue::qust::STAGES).unwrap();
        assert_eq!(stages.kind.list_depth(), 3);
    }

    #[test]
    fn test_resolve_path() {
        let cont = layout_for(RecordType::new(b"CONT")).unwrap();
        let path = FieldPath::new(actors::cont::ITEMS).at(0, common::item::COUNT);
        assert_eq!(cont.resolve(&path).unwrap().kind, FieldKind::Int32);

        let bad = FieldPath::new(actors::cont::ITEMS).at(0, 9);
        assert!(matches!(cont.resolve(&bad), Err(EspError::UndefinedField { .. })));

        let not_list = FieldPath::new(actors::cont::WEIGHT).at(0, 0);
        assert!(matches!(cont.resolve(&not_list), Err(EspError::KindMismatch { .. })));

        assert!(matches!(
            cont.resolve(&FieldPath::new(200)),
            Err(EspError::UndefinedField { .. })
        ));
    }

    #[test]
    fn test_record_type_parse() {
        assert_eq!("NPC_".parse::<RecordType>().unwrap(), RecordType::new(b"NPC_"));
        assert!("NPC".parse::<RecordType>().is_err());
        assert_eq!(RecordType::new(b"WEAP").to_string(), "WEAP");
    }

    #[test]
    fn test_container_scoped() {
        let refr = layout_for(RecordType::new(b"REFR")).unwrap();
        assert!(refr.parent_required);
        assert!(refr.accepts_parent(RecordType::new(b"CELL")));
        let cell = layout_for(RecordType::new(b"CELL")).unwrap();
        assert!(cell.is_container_scoped() && !cell.parent_required);
        assert!(layout_for(RecordType::new(b"STAT")).is_none());
    }
}
