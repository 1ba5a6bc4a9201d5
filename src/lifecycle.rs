//! 记录生命周期：加载、卸载、删除、引用重写、重编号

use std::collections::HashMap;

use crate::collection::Collection;
use crate::form_id::{self, FormId, LongFormId, MasterList, MasterName};
use crate::handle::{FileId, RecordHandle, RecordId};
use crate::record::RecordState;
use crate::utils::EspError;

/// 某个文件主文件列表的快照，用于在修改记录时换算 FormID
struct MasterSnapshot {
    name: MasterName,
    masters: Vec<MasterName>,
}

impl MasterList for MasterSnapshot {
    fn file_name(&self) -> &MasterName {
        &self.name
    }

    fn masters(&self) -> &[MasterName] {
        &self.masters
    }
}

impl Collection {
    /// 解码记录字段；已加载时无操作
    pub fn load(&self, handle: RecordHandle) -> Result<(), EspError> {
        let record = self.record(handle)?;
        if record.layout().is_some() {
            record.load()?;
        }
        Ok(())
    }

    /// 丢弃解码结果及未保存的修改
    pub fn unload(&mut self, handle: RecordHandle) -> Result<(), EspError> {
        self.record_mut(handle)?.unload();
        Ok(())
    }

    pub fn is_deleted(&self, handle: RecordHandle) -> Result<bool, EspError> {
        Ok(self.record(handle)?.is_deleted())
    }

    pub fn record_state(&self, handle: RecordHandle) -> Result<RecordState, EspError> {
        Ok(self.record(handle)?.state())
    }

    /// 记录所属文件
    pub fn parent_file(&self, handle: RecordHandle) -> Result<FileId, EspError> {
        self.record(handle)?;
        Ok(handle.file)
    }

    /// 容器记录（CELL / DIAL / WRLD）
    pub fn parent_of(&self, handle: RecordHandle) -> Result<Option<RecordHandle>, EspError> {
        Ok(self
            .record(handle)?
            .parent()
            .map(|p| RecordHandle::new(handle.file, p)))
    }

    /// 未删除的子记录
    pub fn children_of(&self, handle: RecordHandle) -> Result<Vec<RecordHandle>, EspError> {
        let file = self.file(handle.file)?;
        Ok(self
            .record(handle)?
            .children()
            .iter()
            .filter(|&&c| file.record(c).is_some_and(|r| !r.is_deleted()))
            .map(|&c| RecordHandle::new(handle.file, c))
            .collect())
    }

    /// 标记删除
    ///
    /// 位于容器中的记录必须给出其父记录；子记录一并标记删除。重复删除无操作。
    pub fn delete(&mut self, handle: RecordHandle, parent: Option<RecordHandle>) -> Result<(), EspError> {
        let record = self.record(handle)?;
        if record.is_deleted() {
            return Ok(());
        }

        let expected = record.parent().map(|p| RecordHandle::new(handle.file, p));
        match (expected, parent) {
            (None, None) => {}
            (Some(e), Some(p)) if e == p => {}
            (Some(_), None) => return Err(EspError::ParentRequired(record.record_type)),
            (_, Some(p)) => {
                return Err(EspError::ParentMismatch {
                    record_type: record.record_type,
                    parent: p,
                })
            }
        }

        let file = self.file_mut(handle.file)?;
        let mut pending = vec![handle.record];
        let mut count = 0usize;
        while let Some(id) = pending.pop() {
            let Some(record) = file.record_mut(id) else { continue };
            if record.is_deleted() {
                continue;
            }
            record.mark_deleted();
            pending.extend(record.children().iter().copied());
            count += 1;
        }
        file.detach(handle.record);
        file.dirty = true;
        tracing::debug!("{} 已标记删除（含子记录共 {} 条）", handle, count);
        Ok(())
    }

    /// 把记录中等于 `old` 的 FormID 字段改为 `new`，返回改写的字段数
    pub fn update_references(
        &mut self,
        handle: RecordHandle,
        old: &LongFormId,
        new: &LongFormId,
    ) -> Result<usize, EspError> {
        let Some(old_short) = self.lookup_short(handle.file, old)? else {
            self.record(handle)?;
            return Ok(0);
        };
        let record = self.record(handle)?;
        record.require_layout()?;
        let count = record
            .fields()?
            .form_ids()
            .into_iter()
            .filter(|&id| id == old_short)
            .count();
        if count == 0 {
            return Ok(0);
        }

        let new_short = self.unresolve(handle.file, new)?;
        let fields = self.record_mut(handle)?.fields_mut()?;
        fields.for_each_form_id_mut(&mut |id| {
            if *id == old_short {
                *id = new_short;
            }
        });
        self.file_mut(handle.file)?.dirty = true;
        Ok(count)
    }

    /// 在整个集合中把对 `old` 的引用改为 `new`
    ///
    /// 先确认所有受影响的文件都能引用 `new`，再开始修改。
    pub fn update_references_all(&mut self, old: &LongFormId, new: &LongFormId) -> Result<usize, EspError> {
        let mut affected = Vec::new();
        for (file_id, file) in self.files() {
            let Some(old_short) = form_id::lookup(file, old) else { continue };
            for rid in file.record_ids() {
                let Some(record) = file.record(rid) else { continue };
                if record.is_deleted() || record.layout().is_none() {
                    continue;
                }
                if record.fields()?.form_ids().contains(&old_short) {
                    affected.push(RecordHandle::new(file_id, rid));
                }
            }
        }
        for handle in &affected {
            self.check_can_reference(handle.file, &new.master)?;
        }

        let mut total = 0;
        for handle in affected {
            total += self.update_references(handle, old, new)?;
        }
        tracing::info!("引用 {} -> {}: 改写 {} 处", old, new, total);
        Ok(total)
    }

    /// 修改文件自有记录的对象索引，同时更新覆盖版本和所有引用
    pub fn renumber(&mut self, handle: RecordHandle, new_object: u32) -> Result<usize, EspError> {
        let record = self.record(handle)?;
        if record.form_id.master_index() != 0 {
            return Err(EspError::InvalidFormId(format!(
                "{} is an override and cannot be renumbered",
                record.form_id
            )));
        }
        let file = self.file(handle.file)?;
        let new_short = FormId::new(0, new_object)?;
        if new_object > file.max_object_index() {
            return Err(EspError::ObjectIndexOverflow(new_object));
        }
        if file.find(new_short).is_some() {
            return Err(EspError::InvalidFormId(format!("{} is already in use", new_short)));
        }

        let old_long = self.long_form_id(handle)?;
        let new_long = LongFormId::new(file.name().clone(), new_object)?;
        let renames = HashMap::from([(old_long, new_long)]);
        self.rename_form_ids(&renames)
    }

    /// 同时应用一组改名（同一主文件内），改写记录自身 FormID 和所有字段引用
    ///
    /// 返回改写的字段引用数。
    pub(crate) fn rename_form_ids(&mut self, renames: &HashMap<LongFormId, LongFormId>) -> Result<usize, EspError> {
        let order: Vec<FileId> = self.load_order().to_vec();
        let mut total = 0;

        for file_id in order {
            let file = self.file_mut(file_id)?;
            let ctx = MasterSnapshot {
                name: file.name().clone(),
                masters: file.masters().to_vec(),
            };
            let map = |id: FormId| -> Option<FormId> {
                let long = form_id::resolve(&ctx, id)?;
                let target = renames.get(&long)?;
                form_id::lookup(&ctx, target)
            };

            let ids: Vec<RecordId> = file.record_ids().collect();
            let mut identity = Vec::new();
            let mut changed = false;
            for rid in ids {
                let Some(record) = file.record_mut(rid) else { continue };
                if let Some(new_id) = map(record.form_id) {
                    identity.push((rid, new_id));
                }
                if record.layout().is_none() {
                    continue;
                }
                let hits = record.fields()?.form_ids().into_iter().filter(|&id| map(id).is_some()).count();
                if hits == 0 {
                    continue;
                }
                record.fields_mut()?.for_each_form_id_mut(&mut |id| {
                    if let Some(new_id) = map(*id) {
                        *id = new_id;
                    }
                });
                total += hits;
                changed = true;
            }
            for (rid, new_id) in identity {
                file.reindex(rid, new_id);
            }
            if changed {
                file.dirty = true;
            }
        }
        Ok(total)
    }
}
