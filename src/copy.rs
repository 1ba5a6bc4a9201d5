//! 记录复制：作为覆盖版本或作为新记录复制到另一个文件
//!
//! 字段中的 FormID 先在源文件中解析为长格式，再在目标文件中换算回短格式，
//! 目标文件缺少的主文件会被追加。所有检查在修改目标文件之前完成。

use std::collections::HashMap;

use crate::collection::Collection;
use crate::form_id::{self, FormId, LongFormId, MasterList};
use crate::handle::{FileId, RecordHandle};
use crate::record::Record;
use crate::utils::EspError;

/// 复制选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// 保留 FormID（覆盖版本）；否则在目标文件中分配新的对象索引
    pub as_override: bool,
    /// 目标文件中的父记录
    pub parent: Option<RecordHandle>,
    /// 未指定父记录时，把源记录父记录的获胜版本作为覆盖复制到目标文件
    pub use_winning_parents: bool,
}

impl CopyOptions {
    pub fn overriding() -> Self {
        CopyOptions { as_override: true, ..Default::default() }
    }

    pub fn with_parent(mut self, parent: RecordHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn winning_parents(mut self) -> Self {
        self.use_winning_parents = true;
        self
    }
}

impl Collection {
    /// 作为覆盖版本复制；目标文件已有该记录时直接返回已有版本
    pub fn copy_as_override(
        &mut self,
        source: RecordHandle,
        target: FileId,
        parent: Option<RecordHandle>,
    ) -> Result<RecordHandle, EspError> {
        self.copy_record(source, target, &CopyOptions { as_override: true, parent, use_winning_parents: false })
    }

    /// 作为新记录复制，使用目标文件的新对象索引
    pub fn copy_as_new(
        &mut self,
        source: RecordHandle,
        target: FileId,
        parent: Option<RecordHandle>,
    ) -> Result<RecordHandle, EspError> {
        self.copy_record(source, target, &CopyOptions { as_override: false, parent, use_winning_parents: false })
    }

    pub fn copy_record(
        &mut self,
        source: RecordHandle,
        target: FileId,
        options: &CopyOptions,
    ) -> Result<RecordHandle, EspError> {
        let src = self.record(source)?;
        if src.is_deleted() {
            return Err(EspError::DeletedRecord(source));
        }
        let record_type = src.record_type;
        src.require_layout()?;
        self.file(target)?;
        let own_long = self.long_form_id(source)?;

        if options.as_override {
            if let Some(existing) = self.live_record(target, &own_long)? {
                return Ok(existing);
            }
            self.check_can_reference(target, &own_long.master)?;
        } else {
            self.file(target)?.peek_object_index()?;
        }

        let references = self.collect_references(source)?;
        for long in references.values() {
            self.check_can_reference(target, &long.master)?;
        }

        // 父记录
        let winning_parent = match (options.parent, self.parent_of(source)?) {
            (None, Some(src_parent)) if options.use_winning_parents => {
                let parent_long = self.long_form_id(src_parent)?;
                self.check_can_reference(target, &parent_long.master)?;
                Some(self.winning_record(&parent_long).unwrap_or(src_parent))
            }
            _ => None,
        };
        if winning_parent.is_none() {
            self.check_parent(target, record_type, options.parent)?;
        }

        // 以下开始修改目标文件
        let parent = match winning_parent {
            Some(winner) => {
                let copied = self.copy_record(winner, target, &CopyOptions::overriding().winning_parents())?;
                self.check_parent(target, record_type, Some(copied))?
            }
            None => self.check_parent(target, record_type, options.parent)?,
        };

        let mut remap: HashMap<FormId, FormId> = HashMap::with_capacity(references.len());
        for (short, long) in &references {
            remap.insert(*short, self.unresolve(target, long)?);
        }
        let form_id = if options.as_override {
            self.unresolve(target, &own_long)?
        } else {
            FormId::new(0, self.file_mut(target)?.mint_object_index()?)?
        };

        let master_count = self.file(target)?.masters().len();
        let src = self.record(source)?;
        let mut fields = src.fields()?.clone();
        fields.for_each_form_id_mut(&mut |id| {
            if let Some(mapped) = remap.get(id) {
                *id = *mapped;
            }
        });
        let record = Record::with_fields(src, form_id, fields, master_count);

        let target_file = self.file_mut(target)?;
        if options.as_override {
            // 目标文件中残留的墓碑不再占用索引
            target_file.unindex(form_id);
        }
        let id = target_file.insert(record, parent);
        target_file.dirty = true;
        tracing::debug!(
            "复制 {} -> {} ({}, {})",
            own_long,
            target_file.name(),
            form_id,
            if options.as_override { "覆盖" } else { "新记录" }
        );
        Ok(RecordHandle::new(target, id))
    }

    /// 源记录字段中出现的全部非空 FormID 及其长格式
    fn collect_references(&self, source: RecordHandle) -> Result<HashMap<FormId, LongFormId>, EspError> {
        let file = self.file(source.file)?;
        let mut references = HashMap::new();
        for id in self.record(source)?.fields()?.form_ids() {
            if id.is_none() || references.contains_key(&id) {
                continue;
            }
            let long = form_id::resolve(file, id).ok_or_else(|| {
                EspError::InvalidFormId(format!("{} cannot be resolved in {}", id, file.name()))
            })?;
            references.insert(id, long);
        }
        Ok(references)
    }

    /// 文件中未删除的该记录
    fn live_record(&self, file: FileId, long: &LongFormId) -> Result<Option<RecordHandle>, EspError> {
        let target = self.file(file)?;
        Ok(form_id::lookup(target, long)
            .and_then(|short| target.find(short))
            .filter(|&rid| target.record(rid).is_some_and(|r| !r.is_deleted()))
            .map(|rid| RecordHandle::new(file, rid)))
    }
}
