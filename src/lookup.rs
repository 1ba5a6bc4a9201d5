//! 跨文件查询：覆盖链、冲突、历史
//!
//! 同一长格式 FormID 在多个文件中出现时，加载顺序最靠后的版本获胜。
//! 已删除（墓碑）记录不参与这些查询。

use crate::collection::Collection;
use crate::fields::Slot;
use crate::form_id::{self, FormId, LongFormId};
use crate::handle::{FileId, RecordHandle, RecordId};
use crate::layout::{FieldIndex, RecordType, FIRST_FIELD};
use crate::mod_file::ModFile;
use crate::utils::EspError;

impl Collection {
    /// 按文件名查找（不区分大小写）
    pub fn lookup_file(&self, name: &str) -> Option<FileId> {
        self.files()
            .find(|(_, f)| f.name() == name)
            .map(|(id, _)| id)
    }

    /// 长格式 FormID 的全部版本，获胜版本在前
    pub fn lookup_records(&self, long: &LongFormId) -> Vec<RecordHandle> {
        let mut found: Vec<RecordHandle> = self
            .files()
            .filter_map(|(id, file)| find_live(file, long).map(|r| RecordHandle::new(id, r)))
            .collect();
        found.reverse();
        found
    }

    pub fn winning_record(&self, long: &LongFormId) -> Option<RecordHandle> {
        self.lookup_records(long).into_iter().next()
    }

    /// 记录是否为其 FormID 的获胜版本
    pub fn is_winning(&self, handle: RecordHandle) -> Result<bool, EspError> {
        let long = self.long_form_id(handle)?;
        Ok(self.winning_record(&long) == Some(handle))
    }

    /// 其它文件中的同一记录（获胜版本在前，不含自身）
    pub fn conflicts(&self, handle: RecordHandle) -> Result<Vec<RecordHandle>, EspError> {
        let long = self.long_form_id(handle)?;
        Ok(self
            .lookup_records(&long)
            .into_iter()
            .filter(|&h| h != handle)
            .collect())
    }

    /// 加载顺序在此记录之前的版本，最早的在前
    pub fn history(&self, handle: RecordHandle) -> Result<Vec<RecordHandle>, EspError> {
        let long = self.long_form_id(handle)?;
        let position = self
            .load_position(handle.file)
            .ok_or(EspError::UnknownFile(handle.file))?;
        Ok(self
            .files()
            .take(position)
            .filter_map(|(id, file)| find_live(file, &long).map(|r| RecordHandle::new(id, r)))
            .collect())
    }

    /// 与上一个版本相比取值不同的顶层字段
    ///
    /// `fields` 为空时比较全部字段。没有更早版本时返回所有已设置的字段。
    /// FormID 按长格式比较，所以主文件列表的差异不会造成误报。
    pub fn conflict_details(
        &self,
        handle: RecordHandle,
        fields: &[FieldIndex],
    ) -> Result<Vec<FieldIndex>, EspError> {
        let record = self.record(handle)?;
        let current = record.fields()?;
        let layout = record.require_layout()?;
        let candidates: Vec<FieldIndex> = if fields.is_empty() {
            (FIRST_FIELD..layout.field_count()).collect()
        } else {
            fields.to_vec()
        };

        let Some(&previous) = self.history(handle)?.last() else {
            return Ok(candidates
                .into_iter()
                .filter(|&i| current.slot(i).is_some())
                .collect());
        };

        let previous_set = self.record(previous)?.fields()?;
        let ours = self.file(handle.file)?;
        let theirs = self.file(previous.file)?;

        Ok(candidates
            .into_iter()
            .filter(|&i| {
                let mine = current.slot(i);
                let old = previous_set.slot(i).map(|s| translate_slot(s, theirs, ours));
                match (mine, old) {
                    (None, None) => false,
                    (Some(a), Some(Some(b))) => a != &b,
                    _ => true,
                }
            })
            .collect())
    }

    /// 文件中是否存在该记录（未删除）
    pub fn has_record(&self, file: FileId, long: &LongFormId) -> Result<bool, EspError> {
        Ok(find_live(self.file(file)?, long).is_some())
    }

    /// 按编辑器 ID 查找获胜记录（不区分大小写）
    pub fn find_by_editor_id(&self, record_type: RecordType, editor_id: &str) -> Option<RecordHandle> {
        for (id, file) in self.files().collect::<Vec<_>>().into_iter().rev() {
            for &rid in file.records_of_type(record_type) {
                let Some(record) = file.record(rid) else { continue };
                if record.is_deleted() {
                    continue;
                }
                if record
                    .editor_id()
                    .is_some_and(|e| e.eq_ignore_ascii_case(editor_id))
                {
                    return Some(RecordHandle::new(id, rid));
                }
            }
        }
        None
    }
}

fn find_live(file: &ModFile, long: &LongFormId) -> Option<RecordId> {
    let short = form_id::lookup(file, long)?;
    let id = file.find(short)?;
    file.record(id).filter(|r| !r.is_deleted()).map(|_| id)
}

/// 把另一个文件中的字段值换算到 `to` 的主文件约定；无法表达时为 `None`
fn translate_slot(slot: &Slot, from: &ModFile, to: &ModFile) -> Option<Slot> {
    slot.map_form_ids(&mut |id: FormId| {
        if id.is_none() {
            return Some(id);
        }
        let long = form_id::resolve(from, id)?;
        form_id::lookup(to, &long)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::{memory_collection, new_file};
    use crate::io::MemoryEspStore;
    use crate::layout::items::weap;
    use crate::path::FieldPath;
    use crate::value::FieldValue;

    #[test]
    fn test_override_chain() {
        let store = MemoryEspStore::new();
        let mut c = memory_collection(&store);
        let a = new_file(&mut c, "A.esm");
        let b = new_file(&mut c, "B.esp");
        let d = new_file(&mut c, "C.esp");

        let original = c.create_record(a, RecordType::new(b"WEAP"), None).unwrap();
        c.set::<String>(original, &FieldPath::new(crate::layout::EDITOR_ID), "Sword".into())
            .unwrap();
        let long = c.long_form_id(original).unwrap();
        let over_b = c.copy_as_override(original, b, None).unwrap();
        let over_c = c.copy_as_override(original, d, None).unwrap();

        assert_eq!(c.lookup_records(&long), vec![over_c, over_b, original]);
        assert_eq!(c.winning_record(&long), Some(over_c));
        assert!(c.is_winning(over_c).unwrap());
        assert!(!c.is_winning(original).unwrap());
        assert_eq!(c.conflicts(over_b).unwrap(), vec![over_c, original]);
        assert_eq!(c.history(over_c).unwrap(), vec![original, over_b]);
        assert!(c.history(original).unwrap().is_empty());
        assert!(c.has_record(b, &long).unwrap());
        assert_eq!(c.lookup_file("c.ESP"), Some(d));
        assert_eq!(c.find_by_editor_id(RecordType::new(b"WEAP"), "sword"), Some(over_c));
    }

    #[test]
    fn test_conflict_details() {
        let store = MemoryEspStore::new();
        let mut c = memory_collection(&store);
        let a = new_file(&mut c, "A.esm");
        let b = new_file(&mut c, "B.esp");

        let original = c.create_record(a, RecordType::new(b"WEAP"), None).unwrap();
        c.write(original, &FieldPath::new(weap::VALUE), FieldValue::UInt32(10)).unwrap();
        c.write(original, &FieldPath::new(weap::ENCHANTMENT), FieldValue::FormId(FormId::from_raw(0x900)))
            .unwrap();
        assert_eq!(
            c.conflict_details(original, &[]).unwrap(),
            vec![weap::ENCHANTMENT, weap::VALUE]
        );

        let over = c.copy_as_override(original, b, None).unwrap();
        // FormID 字段已换算为 B 的主文件约定，仍视为相同
        assert!(c.conflict_details(over, &[]).unwrap().is_empty());

        c.write(over, &FieldPath::new(weap::VALUE), FieldValue::UInt32(25)).unwrap();
        assert_eq!(c.conflict_details(over, &[]).unwrap(), vec![weap::VALUE]);
        assert!(c.conflict_details(over, &[weap::ENCHANTMENT]).unwrap().is_empty());
    }
}
