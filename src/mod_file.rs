//! 集合中的单个插件文件
//!
//! 记录存放在按槽位编号的数组中（[`RecordId`] 就是下标），删除的记录保留槽位直到保存。
//! 另有按类型的插入顺序索引和按短格式 FormID 的查找索引。

use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::form_id::{
    FormId, MasterList, MasterListMut, MasterName, FIRST_OBJECT_INDEX, LIGHT_MAX_OBJECT_INDEX,
    OBJECT_INDEX_MASK,
};
use crate::group::{Group, GroupChild};
use crate::handle::RecordId;
use crate::io::RawEspData;
use crate::layout::RecordType;
use crate::plugin::{Plugin, PluginHeader};
use crate::record::Record;
use crate::utils::EspError;

/// 文件的加载进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadState {
    /// 只读取了文件头
    HeaderOnly,
    /// 记录头已建立索引，字段按需解码
    Minimal,
    /// 全部字段已解码
    Full,
}

/// 插件文件
#[derive(Debug)]
pub struct ModFile {
    name: MasterName,
    path: PathBuf,
    pub(crate) header: PluginHeader,
    records: Vec<Option<Record>>,
    by_type: BTreeMap<RecordType, Vec<RecordId>>,
    index: HashMap<FormId, RecordId>,
    pending: Option<RawEspData>,
    header_len: usize,
    load_state: LoadState,
    saveable: bool,
    pub(crate) dirty: bool,
}

impl MasterList for ModFile {
    fn file_name(&self) -> &MasterName {
        &self.name
    }

    fn masters(&self) -> &[MasterName] {
        &self.header.masters
    }
}

impl MasterListMut for ModFile {
    fn push_master(&mut self, master: MasterName) {
        tracing::debug!("{} 新增主文件 {}", self.name, master);
        self.header.masters.push(master);
        self.dirty = true;
    }
}

impl ModFile {
    /// 新建空文件（尚未写入磁盘）
    pub fn new_empty(name: MasterName, path: PathBuf, saveable: bool) -> Self {
        let mut header = PluginHeader::default();
        if has_extension(&path, "esm") {
            header.flags |= crate::datatypes::RecordFlags::MASTER_FILE.bits();
        }
        if has_extension(&path, "esl") {
            header.set_light(true);
        }
        ModFile {
            name,
            path,
            header,
            records: Vec::new(),
            by_type: BTreeMap::new(),
            index: HashMap::new(),
            pending: None,
            header_len: 0,
            load_state: LoadState::Full,
            saveable,
            dirty: true,
        }
    }

    /// 从原始字节建立文件，只解析文件头
    pub fn from_raw(name: MasterName, path: PathBuf, data: RawEspData, saveable: bool) -> Result<Self, EspError> {
        let (header, header_len) = Plugin::parse_header(data.as_slice())?;
        tracing::debug!(
            "已读取 {} 的文件头: {} 个主文件, {} 条记录",
            name,
            header.masters.len(),
            header.num_records
        );
        Ok(ModFile {
            name,
            path,
            header,
            records: Vec::new(),
            by_type: BTreeMap::new(),
            index: HashMap::new(),
            pending: Some(data),
            header_len,
            load_state: LoadState::HeaderOnly,
            saveable,
            dirty: false,
        })
    }

    /// 解析记录；`full` 时同时解码全部字段
    pub fn load(&mut self, full: bool) -> Result<(), EspError> {
        if let Some(data) = self.pending.take() {
            let master_count = self.header.masters.len();
            let mut groups = match Plugin::parse_groups(data.as_slice(), self.header_len, master_count) {
                Ok(groups) => groups,
                Err(e) => {
                    self.pending = Some(data);
                    return Err(e);
                }
            };
            if full {
                groups
                    .par_iter_mut()
                    .try_for_each(|g| decode_group(g))?;
            }
            for group in groups {
                self.populate(group, None);
            }
            self.load_state = if full { LoadState::Full } else { LoadState::Minimal };
            tracing::info!("已加载 {}: {} 条记录", self.name, self.record_count());
            return Ok(());
        }

        if full && self.load_state < LoadState::Full {
            for record in self.records.iter().flatten() {
                if record.layout().is_some() {
                    record.load()?;
                }
            }
            self.load_state = LoadState::Full;
        }
        Ok(())
    }

    /// 把组内记录登记到文件中，维护父子关系
    fn populate(&mut self, group: Group, parent: Option<RecordId>) {
        let parent = if group.group_type.is_children_group() {
            let master_count = self.header.masters.len();
            let owner = FormId::from_disk(group.label_u32(), master_count);
            match self.index.get(&owner) {
                Some(&id) => Some(id),
                None => {
                    tracing::warn!("{}: 子组的父记录 {} 不存在", self.name, owner);
                    None
                }
            }
        } else {
            parent
        };

        for child in group.children {
            match child {
                GroupChild::Record(record) => {
                    self.insert(record, parent);
                }
                GroupChild::Group(sub) => self.populate(*sub, parent),
            }
        }
    }

    /// 登记一条记录
    pub(crate) fn insert(&mut self, mut record: Record, parent: Option<RecordId>) -> RecordId {
        let id = RecordId(self.records.len() as u32);
        record.parent = parent;
        if let Some(pid) = parent {
            if let Some(Some(p)) = self.records.get_mut(pid.index()) {
                p.children.push(id);
            }
        }
        self.by_type.entry(record.record_type).or_default().push(id);
        if !record.form_id.is_none() {
            if let Some(previous) = self.index.insert(record.form_id, id) {
                tracing::warn!("{}: FormID {} 重复（槽位 {:?}）", self.name, record.form_id, previous);
            }
        }
        self.records.push(Some(record));
        id
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id.index())?.as_ref()
    }

    pub fn record_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.records.get_mut(id.index())?.as_mut()
    }

    /// 全部记录槽位（含已删除）
    pub fn record_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_some())
            .map(|(i, _)| RecordId(i as u32))
    }

    /// 某类型的记录，按插入顺序（含已删除）
    pub fn records_of_type(&self, record_type: RecordType) -> &[RecordId] {
        self.by_type.get(&record_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 文件中出现过的记录类型
    pub fn record_types(&self) -> impl Iterator<Item = RecordType> + '_ {
        self.by_type.keys().copied()
    }

    /// 按短格式 FormID 查找
    pub fn find(&self, form_id: FormId) -> Option<RecordId> {
        self.index.get(&form_id).copied()
    }

    /// 修改记录的 FormID 并更新索引
    pub(crate) fn reindex(&mut self, id: RecordId, new_form_id: FormId) {
        let Some(record) = self.record_mut(id) else { return };
        let old = record.form_id;
        record.form_id = new_form_id;
        record.is_modified = true;
        if self.index.get(&old) == Some(&id) {
            self.index.remove(&old);
        }
        self.index.insert(new_form_id, id);
        self.dirty = true;
    }

    /// 从 FormID 索引中移除（记录本身保留）
    pub(crate) fn unindex(&mut self, form_id: FormId) {
        self.index.remove(&form_id);
    }

    /// 从父记录的子列表中移除
    pub(crate) fn detach(&mut self, id: RecordId) {
        let parent = self.record(id).and_then(|r| r.parent);
        if let Some(pid) = parent {
            if let Some(p) = self.record_mut(pid) {
                p.children.retain(|&c| c != id);
            }
        }
    }

    /// 当前可分配的最大对象索引
    pub fn max_object_index(&self) -> u32 {
        if self.is_light() {
            LIGHT_MAX_OBJECT_INDEX
        } else {
            OBJECT_INDEX_MASK
        }
    }

    /// 查看下一个可用对象索引（不分配）
    pub fn peek_object_index(&self) -> Result<u32, EspError> {
        let max = self.max_object_index();
        let mut candidate = self.header.next_object_id.max(FIRST_OBJECT_INDEX);
        while candidate <= max {
            if !self.index.contains_key(&FormId::from_raw(candidate)) {
                return Ok(candidate);
            }
            candidate += 1;
        }
        Err(EspError::ObjectIndexExhausted(self.name.to_string()))
    }

    /// 分配一个新的对象索引
    pub fn mint_object_index(&mut self) -> Result<u32, EspError> {
        let object = self.peek_object_index()?;
        self.header.next_object_id = object + 1;
        Ok(object)
    }

    /// 丢弃全部已删除记录
    ///
    /// 槽位原地置空，其余记录的 [`RecordId`] 保持不变。
    pub(crate) fn purge_deleted(&mut self) -> usize {
        let mut purged = Vec::new();
        for (i, slot) in self.records.iter_mut().enumerate() {
            if slot.as_ref().is_some_and(|r| r.is_deleted()) {
                *slot = None;
                purged.push(RecordId(i as u32));
            }
        }
        if purged.is_empty() {
            return 0;
        }

        for record in self.records.iter_mut().flatten() {
            if record.parent.is_some_and(|p| purged.contains(&p)) {
                record.parent = None;
            }
            record.children.retain(|c| !purged.contains(c));
        }
        self.rebuild_indexes();
        purged.len()
    }

    fn rebuild_indexes(&mut self) {
        self.by_type.clear();
        self.index.clear();
        for (i, record) in self.records.iter().enumerate() {
            if let Some(record) = record {
                let id = RecordId(i as u32);
                self.by_type.entry(record.record_type).or_default().push(id);
                if !record.form_id.is_none() {
                    self.index.insert(record.form_id, id);
                }
            }
        }
    }

    /// 保存完成后把所有记录固化为新的快照
    pub(crate) fn commit_saved(&mut self) {
        let master_count = self.header.masters.len();
        for record in self.records.iter_mut().flatten() {
            if record.is_modified {
                record.commit_backing(master_count);
            }
        }
        self.dirty = false;
    }

    pub fn name(&self) -> &MasterName {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &PluginHeader {
        &self.header
    }

    pub fn is_master(&self) -> bool {
        self.header.is_master() || has_extension(&self.path, "esm")
    }

    pub fn is_light(&self) -> bool {
        self.header.is_light() || has_extension(&self.path, "esl")
    }

    pub fn is_saveable(&self) -> bool {
        self.saveable
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty || self.records.iter().flatten().any(|r| r.is_modified)
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    /// 槽位中的记录数（含已删除）
    pub fn record_count(&self) -> usize {
        self.records.iter().flatten().count()
    }
}

fn decode_group(group: &mut Group) -> Result<(), EspError> {
    for child in &mut group.children {
        match child {
            GroupChild::Record(record) => {
                if record.layout().is_some() {
                    record.load()?;
                }
            }
            GroupChild::Group(sub) => decode_group(sub)?,
        }
    }
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form_id::{lookup, resolve, unresolve, LongFormId};

    fn misc(object: u32) -> Record {
        Record::new(RecordType::new(b"MISC"), FormId::from_raw(object))
    }

    #[test]
    fn test_mint_skips_used_indices() {
        let mut file = ModFile::new_empty("New.esp".into(), "New.esp".into(), true);
        file.insert(misc(0x800), None);
        assert_eq!(file.mint_object_index().unwrap(), 0x801);
        assert_eq!(file.mint_object_index().unwrap(), 0x802);
    }

    #[test]
    fn test_light_file_exhaustion() {
        let mut file = ModFile::new_empty("Small.esl".into(), "Small.esl".into(), true);
        assert!(file.is_light());
        file.header.next_object_id = LIGHT_MAX_OBJECT_INDEX;
        assert_eq!(file.mint_object_index().unwrap(), 0xFFF);
        assert!(matches!(file.mint_object_index(), Err(EspError::ObjectIndexExhausted(_))));
    }

    #[test]
    fn test_purge_keeps_slots() {
        let mut file = ModFile::new_empty("P.esp".into(), "P.esp".into(), true);
        let cell = file.insert(Record::new(RecordType::new(b"CELL"), FormId::from_raw(0x800)), None);
        let gone = file.insert(misc(0x801), None);
        let refr = file.insert(Record::new(RecordType::new(b"REFR"), FormId::from_raw(0x802)), Some(cell));
        let dropped = file.insert(Record::new(RecordType::new(b"REFR"), FormId::from_raw(0x803)), Some(cell));
        file.record_mut(gone).unwrap().mark_deleted();
        file.record_mut(dropped).unwrap().mark_deleted();

        assert_eq!(file.purge_deleted(), 2);
        assert_eq!(file.record_count(), 2);
        assert!(file.record(gone).is_none());
        assert_eq!(file.find(FormId::from_raw(0x802)), Some(refr));
        assert_eq!(file.find(FormId::from_raw(0x800)), Some(cell));
        assert_eq!(file.record(refr).unwrap().parent, Some(cell));
        assert_eq!(file.record(cell).unwrap().children(), &[refr]);
        assert!(file.find(FormId::from_raw(0x801)).is_none());
        assert_eq!(file.records_of_type(RecordType::new(b"REFR")), &[refr]);

        // 新记录追加在末尾，不复用空槽位
        let next = file.insert(misc(0x804), None);
        assert_eq!(next.index(), 4);
    }

    #[test]
    fn test_master_list_context() {
        let mut file = ModFile::new_empty("B.esp".into(), "B.esp".into(), true);
        let long = LongFormId::new("A.esm", 0x14).unwrap();
        assert_eq!(lookup(&file, &long), None);
        let short = unresolve(&mut file, &long).unwrap();
        assert_eq!(short.raw(), 0x0100_0014);
        assert_eq!(resolve(&file, short), Some(long));
        assert_eq!(file.header().masters.len(), 1);
    }
}
