//! 解码后的字段集合及其与子记录流之间的编解码
//!
//! 每个字段对应一个以描述符标签命名的子记录。列表字段整体存放在一个子记录中：
//! `u32` 元素数量，随后每个元素为 `u32` 长度 + 元素自身的子记录流。
//! 无法识别或格式不符的子记录原样保留，写回时追加在已知字段之后。

use std::collections::BTreeMap;
use std::io::Cursor;

use crate::datatypes::read_u32;
use crate::form_id::FormId;
use crate::layout::{FieldIndex, FieldKind, FieldTable};
use crate::path::FieldPath;
use crate::subrecord::Subrecord;
use crate::utils::EspError;
use crate::value::FieldValue;

/// 字段槽位
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(FieldValue),
    List(Vec<FieldSet>),
}

impl Slot {
    fn for_each_form_id_mut(&mut self, f: &mut dyn FnMut(&mut FormId)) {
        match self {
            Slot::Value(value) => {
                if let Some(id) = value.form_id_mut() {
                    f(id);
                }
            }
            Slot::List(items) => {
                for item in items {
                    item.for_each_form_id_mut(f);
                }
            }
        }
    }

    /// 复制并转换其中的 FormID；任一 FormID 无法转换时返回 `None`
    pub fn map_form_ids(&self, f: &mut dyn FnMut(FormId) -> Option<FormId>) -> Option<Slot> {
        let mut copy = self.clone();
        let mut ok = true;
        copy.for_each_form_id_mut(&mut |id| match f(*id) {
            Some(mapped) => *id = mapped,
            None => ok = false,
        });
        ok.then_some(copy)
    }
}

/// 一条记录（或一个列表元素）的字段集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    slots: BTreeMap<FieldIndex, Slot>,
    unknown: Vec<Subrecord>,
}

impl FieldSet {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.unknown.is_empty()
    }

    pub fn slot(&self, index: FieldIndex) -> Option<&Slot> {
        self.slots.get(&index)
    }

    pub fn slots(&self) -> impl Iterator<Item = (FieldIndex, &Slot)> {
        self.slots.iter().map(|(i, s)| (*i, s))
    }

    /// 无法识别、原样保留的子记录
    pub fn unknown(&self) -> &[Subrecord] {
        &self.unknown
    }

    /// 定位路径末端字段所在的集合
    fn locate(&self, path: &FieldPath) -> Option<(&FieldSet, FieldIndex)> {
        let mut set = self;
        let mut field = path.root();
        for step in path.steps() {
            match set.slots.get(&field) {
                Some(Slot::List(items)) => set = items.get(step.index)?,
                _ => return None,
            }
            field = step.field;
        }
        Some((set, field))
    }

    /// 可变定位；中间列表不存在或下标越界时报错，不做任何修改
    fn locate_mut(&mut self, path: &FieldPath) -> Result<(&mut FieldSet, FieldIndex), EspError> {
        let mut set = self;
        let mut field = path.root();
        for step in path.steps() {
            set = match set.slots.get_mut(&field) {
                Some(Slot::List(items)) => {
                    let len = items.len();
                    items
                        .get_mut(step.index)
                        .ok_or(EspError::IndexOutOfRange { index: step.index, len })?
                }
                _ => return Err(EspError::IndexOutOfRange { index: step.index, len: 0 }),
            };
            field = step.field;
        }
        Ok((set, field))
    }

    pub fn value(&self, path: &FieldPath) -> Option<&FieldValue> {
        let (set, field) = self.locate(path)?;
        match set.slots.get(&field)? {
            Slot::Value(v) => Some(v),
            Slot::List(_) => None,
        }
    }

    /// 设置或清除（`None`）一个标量字段
    pub fn set_value(&mut self, path: &FieldPath, value: Option<FieldValue>) -> Result<(), EspError> {
        let (set, field) = self.locate_mut(path)?;
        match value {
            Some(v) => {
                set.slots.insert(field, Slot::Value(v));
            }
            None => {
                set.slots.remove(&field);
            }
        }
        Ok(())
    }

    /// 列表长度；列表未设置或外层下标越界时为 0
    pub fn list_len(&self, path: &FieldPath) -> usize {
        match self.locate(path).and_then(|(set, field)| set.slots.get(&field)) {
            Some(Slot::List(items)) => items.len(),
            _ => 0,
        }
    }

    fn list_mut(&mut self, path: &FieldPath) -> Result<&mut Vec<FieldSet>, EspError> {
        let (set, field) = self.locate_mut(path)?;
        let slot = set.slots.entry(field).or_insert_with(|| Slot::List(Vec::new()));
        match slot {
            Slot::List(items) => Ok(items),
            Slot::Value(v) => Err(EspError::Malformed(format!(
                "field {} holds a {} value where a list was expected",
                field,
                v.kind_name()
            ))),
        }
    }

    /// 在列表末尾追加一个空元素，返回其下标
    pub fn push_element(&mut self, path: &FieldPath) -> Result<usize, EspError> {
        let items = self.list_mut(path)?;
        items.push(FieldSet::default());
        Ok(items.len() - 1)
    }

    /// 删除列表最后一个元素；列表为空时返回 `false`
    pub fn pop_element(&mut self, path: &FieldPath) -> Result<bool, EspError> {
        let (set, field) = self.locate_mut(path)?;
        let popped = match set.slots.get_mut(&field) {
            Some(Slot::List(items)) => items.pop().is_some(),
            _ => false,
        };
        if let Some(Slot::List(items)) = set.slots.get(&field) {
            if items.is_empty() {
                set.slots.remove(&field);
            }
        }
        Ok(popped)
    }

    /// 用 `element` 整体替换某个元素，返回原来的内容
    pub fn replace_element(&mut self, path: &FieldPath, index: usize, element: FieldSet) -> Result<FieldSet, EspError> {
        let items = self.list_mut(path)?;
        let len = items.len();
        let slot = items.get_mut(index).ok_or(EspError::IndexOutOfRange { index, len })?;
        Ok(std::mem::replace(slot, element))
    }

    /// 访问全部 FormID（含所有层级的列表元素）
    pub fn for_each_form_id_mut(&mut self, f: &mut dyn FnMut(&mut FormId)) {
        for slot in self.slots.values_mut() {
            slot.for_each_form_id_mut(f);
        }
    }

    /// 收集全部非空 FormID
    pub fn form_ids(&self) -> Vec<FormId> {
        let mut ids = Vec::new();
        let mut copy = self.clone();
        copy.for_each_form_id_mut(&mut |id| {
            if !id.is_none() {
                ids.push(*id);
            }
        });
        ids
    }

    /// 从子记录流解码
    pub fn decode(data: &[u8], table: FieldTable, master_count: usize) -> Result<FieldSet, EspError> {
        let subrecords = Subrecord::parse_stream(data)?;
        Ok(Self::from_subrecords(subrecords, table, master_count))
    }

    /// 把子记录归入字段槽位，无法识别的保留在 `unknown` 中
    pub fn from_subrecords(subrecords: Vec<Subrecord>, table: FieldTable, master_count: usize) -> FieldSet {
        let mut set = FieldSet::default();
        for sub in subrecords {
            let Some((index, desc)) = table.find_by_tag(&sub.tag) else {
                tracing::debug!("保留未知子记录 {}", sub.tag_str());
                set.unknown.push(sub);
                continue;
            };
            if set.slots.contains_key(&index) {
                tracing::warn!("重复的子记录 {}，原样保留", sub.tag_str());
                set.unknown.push(sub);
                continue;
            }
            let slot = match desc.kind {
                FieldKind::List(elements) => {
                    decode_list(&sub.data, elements, master_count).map(Slot::List)
                }
                ref kind => FieldValue::decode(kind, &sub.data, master_count).map(Slot::Value),
            };
            match slot {
                Some(slot) => {
                    set.slots.insert(index, slot);
                }
                None => {
                    tracing::warn!(
                        "子记录 {} 的数据不符合字段类型 {}（{} bytes），原样保留",
                        sub.tag_str(),
                        desc.kind.name(),
                        sub.data.len()
                    );
                    set.unknown.push(sub);
                }
            }
        }
        set
    }

    /// 编码为子记录流
    pub fn encode(&self, table: FieldTable, master_count: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for (&index, slot) in &self.slots {
            if !table.is_stored(index) {
                continue;
            }
            let Some(desc) = table.descriptor(index) else {
                tracing::warn!("字段 {} 没有描述符，跳过写出", index);
                continue;
            };
            let data = match (slot, desc.kind) {
                (Slot::List(items), FieldKind::List(elements)) => {
                    encode_list(items, elements, master_count)
                }
                (Slot::Value(value), _) => value.encode(master_count),
                (Slot::List(_), _) => continue,
            };
            Subrecord::write_to(&desc.tag, &data, &mut out);
        }
        for sub in &self.unknown {
            sub.write(&mut out);
        }
        out
    }
}

fn decode_list(
    data: &[u8],
    elements: &'static [crate::layout::FieldDescriptor],
    master_count: usize,
) -> Option<Vec<FieldSet>> {
    let mut cursor = Cursor::new(data);
    let count = read_u32(&mut cursor).ok()? as usize;
    let mut items = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        let len = read_u32(&mut cursor).ok()? as usize;
        let start = cursor.position() as usize;
        let end = start.checked_add(len)?;
        let bytes = data.get(start..end)?;
        let element = FieldSet::decode(bytes, FieldTable::Element(elements), master_count).ok()?;
        items.push(element);
        cursor.set_position(end as u64);
    }
    if cursor.position() as usize != data.len() {
        return None;
    }
    Some(items)
}

fn encode_list(
    items: &[FieldSet],
    elements: &'static [crate::layout::FieldDescriptor],
    master_count: usize,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(items.len() as u32).to_le_bytes());
    for item in items {
        let bytes = item.encode(FieldTable::Element(elements), master_count);
        out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&bytes);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::actors::{cont, CONT};
    use crate::layout::common::item;
    use crate::layout::EDITOR_ID;

    fn table() -> FieldTable {
        FieldTable::Record(&CONT)
    }

    #[test]
    fn test_encode_decode_with_list() {
        let mut set = FieldSet::default();
        set.set_value(&FieldPath::new(EDITOR_ID), Some(FieldValue::Text("Chest01".into()))).unwrap();
        set.set_value(&FieldPath::new(cont::WEIGHT), Some(FieldValue::Float32(10.0))).unwrap();
        let items = FieldPath::new(cont::ITEMS);
        let i = set.push_element(&items).unwrap();
        set.set_value(&items.element(i, item::ITEM), Some(FieldValue::FormId(FormId::from_raw(0x0100_0014)))).unwrap();
        set.set_value(&items.element(i, item::COUNT), Some(FieldValue::Int32(3))).unwrap();

        let bytes = set.encode(table(), 1);
        let decoded = FieldSet::decode(&bytes, table(), 1).unwrap();
        assert_eq!(decoded, set);
        assert_eq!(decoded.list_len(&items), 1);
        assert_eq!(
            decoded.value(&items.element(0, item::COUNT)),
            Some(&FieldValue::Int32(3))
        );
    }

    #[test]
    fn test_unknown_subrecords_preserved() {
        let mut raw = Vec::new();
        Subrecord::write_to(b"EDID", b"Box\0", &mut raw);
        Subrecord::write_to(b"ZZZZ", &[1, 2, 3], &mut raw);
        // 宽度不符的 WGHT 也按未知保留
        Subrecord::write_to(b"WGHT", &[1, 2], &mut raw);

        let set = FieldSet::decode(&raw, table(), 0).unwrap();
        assert_eq!(set.unknown().len(), 2);
        assert_eq!(set.value(&FieldPath::new(EDITOR_ID)), Some(&FieldValue::Text("Box".into())));

        let again = FieldSet::decode(&set.encode(table(), 0), table(), 0).unwrap();
        assert_eq!(again.unknown(), set.unknown());
    }

    #[test]
    fn test_out_of_range_write_changes_nothing() {
        let mut set = FieldSet::default();
        let items = FieldPath::new(cont::ITEMS);
        set.push_element(&items).unwrap();
        let before = set.clone();

        let err = set
            .set_value(&items.element(3, item::COUNT), Some(FieldValue::Int32(1)))
            .unwrap_err();
        assert!(matches!(err, EspError::IndexOutOfRange { index: 3, len: 1 }));
        assert_eq!(set, before);
    }

    #[test]
    fn test_pop_and_reset() {
        let mut set = FieldSet::default();
        let items = FieldPath::new(cont::ITEMS);
        assert!(!set.pop_element(&items).unwrap());
        set.push_element(&items).unwrap();
        set.set_value(&items.element(0, item::COUNT), Some(FieldValue::Int32(9))).unwrap();
        let old = set.replace_element(&items, 0, FieldSet::default()).unwrap();
        assert_eq!(set.value(&items.element(0, item::COUNT)), None);
        assert_eq!(old.value(&FieldPath::new(item::COUNT)), Some(&FieldValue::Int32(9)));
        assert!(set.pop_element(&items).unwrap());
        assert_eq!(set.list_len(&items), 0);
        assert!(set.slot(cont::ITEMS).is_none());
    }

    #[test]
    fn test_form_id_walk() {
        let mut set = FieldSet::default();
        set.set_value(&FieldPath::new(cont::SCRIPT), Some(FieldValue::FormId(FormId::from_raw(0x0100_0001)))).unwrap();
        let items = FieldPath::new(cont::ITEMS);
        set.push_element(&items).unwrap();
        set.set_value(&items.element(0, item::ITEM), Some(FieldValue::FormId(FormId::from_raw(0x0100_0002)))).unwrap();
        assert_eq!(set.form_ids().len(), 2);

        set.for_each_form_id_mut(&mut |id| *id = FormId::NONE);
        assert!(set.form_ids().is_empty());
    }
}
