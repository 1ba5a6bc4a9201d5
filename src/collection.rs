//! 多文件记录集合
//!
//! 集合按加载顺序持有全部 [`ModFile`]，所有操作都通过显式传入的 `&Collection` / `&mut Collection` 完成。
//! 文件用 [`FileId`] 寻址，记录用 [`RecordHandle`] 寻址；两者都是不携带数据的整数。

use std::path::PathBuf;

use crate::config::{AddFileOptions, CollectionConfig, LoadPolicy};
use crate::form_id::{self, FormId, LongFormId, MasterList, MasterName};
use crate::handle::{FileId, RecordHandle, RecordId};
use crate::io::{DefaultEspReader, DefaultEspWriter, EspReader, EspWriter};
use crate::layout::{layout_for, RecordType};
use crate::mod_file::{LoadState, ModFile};
use crate::plugin::FileStats;
use crate::probe::{DataDirProbe, MasterNameProbe};
use crate::record::Record;
use crate::utils::EspError;

/// 记录集合
pub struct Collection {
    config: CollectionConfig,
    files: Vec<Option<ModFile>>,
    load_order: Vec<FileId>,
    reader: Box<dyn EspReader + Send>,
    writer: Box<dyn EspWriter + Send>,
    probe: Option<Box<dyn MasterNameProbe + Send>>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("config", &self.config)
            .field("load_order", &self.load_order)
            .finish_non_exhaustive()
    }
}

impl Collection {
    /// 使用文件系统读写创建空集合，文件名按数据目录中的实际拼写匹配
    pub fn new(config: CollectionConfig) -> Self {
        let probe = DataDirProbe::new(config.data_dir.clone());
        let mut collection = Self::with_io(config, Box::new(DefaultEspReader), Box::new(DefaultEspWriter));
        collection.set_probe(Box::new(probe));
        collection
    }

    /// 使用自定义读写实现创建空集合
    pub fn with_io(
        config: CollectionConfig,
        reader: Box<dyn EspReader + Send>,
        writer: Box<dyn EspWriter + Send>,
    ) -> Self {
        Collection {
            config,
            files: Vec::new(),
            load_order: Vec::new(),
            reader,
            writer,
            probe: None,
        }
    }

    /// 按配置添加全部文件并加载
    pub fn from_config(config: CollectionConfig) -> Result<Self, EspError> {
        let entries = config.files.clone();
        let policy = config.load_policy;
        let mut collection = Self::new(config);
        for entry in &entries {
            collection.add_file(&entry.name, AddFileOptions::from(entry))?;
        }
        match policy {
            LoadPolicy::Minimal => collection.load_minimal()?,
            LoadPolicy::Full => collection.load_full()?,
        }
        Ok(collection)
    }

    pub fn set_probe(&mut self, probe: Box<dyn MasterNameProbe + Send>) {
        self.probe = Some(probe);
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// 关闭集合，释放全部文件
    pub fn close(self) {
        tracing::debug!("关闭集合: {} 个文件", self.load_order.len());
    }

    /// 添加文件到加载顺序末尾（只解析文件头）
    pub fn add_file(&mut self, name: &str, options: AddFileOptions) -> Result<FileId, EspError> {
        let master_name = MasterName::new(name);
        if self.lookup_file(name).is_some() {
            return Err(EspError::DuplicateFile(name.to_string()));
        }

        let disk_name = self
            .probe
            .as_ref()
            .and_then(|p| p.probe(name))
            .unwrap_or_else(|| name.to_string());
        let path = self.config.path_of(&disk_name);

        let file = if self.reader.exists(&path) {
            let data = self.reader.read(&path)?;
            ModFile::from_raw(master_name, path, data, options.saveable)?
        } else if options.create_if_missing {
            tracing::info!("{} 不存在，新建空文件", name);
            ModFile::new_empty(master_name, path, options.saveable)
        } else {
            return Err(EspError::FileNotFound(path.display().to_string()));
        };

        for master in file.masters() {
            if self.lookup_file(master.as_str()).is_none() {
                return Err(EspError::MissingMaster {
                    file: name.to_string(),
                    master: master.to_string(),
                });
            }
        }

        let id = FileId(self.files.len() as u32);
        self.files.push(Some(file));
        self.load_order.push(id);
        tracing::info!("已添加 {} ({})，加载顺序位置 {}", name, id, self.load_order.len() - 1);
        Ok(id)
    }

    /// 索引所有未加载文件的记录头
    pub fn load_minimal(&mut self) -> Result<(), EspError> {
        self.load_pending(false)
    }

    /// 加载所有文件并解码全部字段
    pub fn load_full(&mut self) -> Result<(), EspError> {
        self.load_pending(true)
    }

    fn load_pending(&mut self, full: bool) -> Result<(), EspError> {
        for &id in &self.load_order {
            let Some(Some(file)) = self.files.get_mut(id.index()) else { continue };
            let needed = match file.load_state() {
                LoadState::HeaderOnly => true,
                LoadState::Minimal => full,
                LoadState::Full => false,
            };
            if needed {
                file.load(full)?;
            }
        }
        Ok(())
    }

    pub fn file(&self, id: FileId) -> Result<&ModFile, EspError> {
        self.files
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(EspError::UnknownFile(id))
    }

    pub fn file_mut(&mut self, id: FileId) -> Result<&mut ModFile, EspError> {
        self.files
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(EspError::UnknownFile(id))
    }

    /// 按加载顺序遍历文件
    pub fn files(&self) -> impl Iterator<Item = (FileId, &ModFile)> + '_ {
        self.load_order
            .iter()
            .filter_map(move |&id| self.file(id).ok().map(|f| (id, f)))
    }

    pub fn record(&self, handle: RecordHandle) -> Result<&Record, EspError> {
        self.files
            .get(handle.file.index())
            .and_then(Option::as_ref)
            .and_then(|f| f.record(handle.record))
            .ok_or(EspError::InvalidHandle(handle))
    }

    pub fn record_mut(&mut self, handle: RecordHandle) -> Result<&mut Record, EspError> {
        self.files
            .get_mut(handle.file.index())
            .and_then(Option::as_mut)
            .and_then(|f| f.record_mut(handle.record))
            .ok_or(EspError::InvalidHandle(handle))
    }

    /// 文件中某类型的全部记录（含已删除）
    pub fn records(&self, file: FileId, record_type: RecordType) -> Result<Vec<RecordHandle>, EspError> {
        Ok(self
            .file(file)?
            .records_of_type(record_type)
            .iter()
            .map(|&r| RecordHandle::new(file, r))
            .collect())
    }

    /// 在文件中新建记录，分配新的对象索引
    pub fn create_record(
        &mut self,
        file: FileId,
        record_type: RecordType,
        parent: Option<RecordHandle>,
    ) -> Result<RecordHandle, EspError> {
        let parent = self.check_parent(file, record_type, parent)?;
        let target = self.file_mut(file)?;
        let object = target.mint_object_index()?;
        let record = Record::new(record_type, FormId::new(0, object)?);
        let id = target.insert(record, parent);
        target.dirty = true;
        tracing::debug!("{} 新建 {} 记录 {:08X}", target.name(), record_type, object);
        Ok(RecordHandle::new(file, id))
    }

    /// 校验父记录：必须位于同一文件、未删除、类型可容纳该记录
    pub(crate) fn check_parent(
        &self,
        file: FileId,
        record_type: RecordType,
        parent: Option<RecordHandle>,
    ) -> Result<Option<RecordId>, EspError> {
        let layout = layout_for(record_type)
            .ok_or_else(|| EspError::UnsupportedRecordType(record_type.to_string()))?;
        self.file(file)?;

        let Some(parent) = parent else {
            if layout.parent_required {
                return Err(EspError::ParentRequired(record_type));
            }
            return Ok(None);
        };

        let mismatch = EspError::ParentMismatch { record_type, parent };
        if parent.file != file {
            return Err(mismatch);
        }
        let parent_record = self.record(parent)?;
        if parent_record.is_deleted() {
            return Err(EspError::DeletedRecord(parent));
        }
        if !layout.accepts_parent(parent_record.record_type) {
            return Err(mismatch);
        }
        Ok(Some(parent.record))
    }

    pub fn load_order(&self) -> &[FileId] {
        &self.load_order
    }

    /// 文件在加载顺序中的位置
    pub fn load_position(&self, file: FileId) -> Option<usize> {
        self.load_order.iter().position(|&f| f == file)
    }

    /// 文件中的短格式 FormID 转长格式
    pub fn resolve(&self, file: FileId, short: FormId) -> Result<Option<LongFormId>, EspError> {
        Ok(form_id::resolve(self.file(file)?, short))
    }

    /// 长格式转文件中的短格式，不追加主文件
    pub fn lookup_short(&self, file: FileId, long: &LongFormId) -> Result<Option<FormId>, EspError> {
        Ok(form_id::lookup(self.file(file)?, long))
    }

    /// 文件能否不追加主文件就表达该 FormID
    pub fn validate_form_id(&self, file: FileId, long: &LongFormId) -> Result<bool, EspError> {
        Ok(self.lookup_short(file, long)?.is_some())
    }

    /// 长格式转短格式，必要时追加主文件（主文件必须已加载且排在前面）
    pub fn unresolve(&mut self, file: FileId, long: &LongFormId) -> Result<FormId, EspError> {
        if let Some(short) = self.lookup_short(file, long)? {
            return Ok(short);
        }
        self.check_can_reference(file, &long.master)?;
        form_id::unresolve(self.file_mut(file)?, long)
    }

    /// `master` 是否已加载并排在 `file` 之前
    pub(crate) fn check_can_reference(&self, file: FileId, master: &MasterName) -> Result<(), EspError> {
        let target = self.file(file)?;
        if target.name() == master || target.masters().contains(master) {
            return Ok(());
        }
        let position = self.load_position(file);
        let master_position = self
            .lookup_file(master.as_str())
            .and_then(|m| self.load_position(m));
        match (master_position, position) {
            (Some(m), Some(f)) if m < f => Ok(()),
            _ => Err(EspError::LoadOrderViolation {
                file: target.name().to_string(),
                master: master.to_string(),
            }),
        }
    }

    /// 记录自身的长格式 FormID
    pub fn long_form_id(&self, handle: RecordHandle) -> Result<LongFormId, EspError> {
        let record = self.record(handle)?;
        form_id::resolve(self.file(handle.file)?, record.form_id)
            .ok_or_else(|| EspError::InvalidFormId(record.form_id.to_string()))
    }

    /// 显示长格式 FormID，主文件名使用磁盘上的实际拼写（如果配置了探测器）
    pub fn display_long(&self, long: &LongFormId) -> String {
        let master = self
            .probe
            .as_ref()
            .and_then(|p| p.probe(long.master.as_str()))
            .unwrap_or_else(|| long.master.to_string());
        format!("{:08X}|{}", long.object_index(), master)
    }

    /// 保存文件；已删除记录在此时清除
    pub fn save(&mut self, file: FileId) -> Result<PathBuf, EspError> {
        let backup_on_save = self.config.backup_on_save;
        let target = self
            .files
            .get_mut(file.index())
            .and_then(Option::as_mut)
            .ok_or(EspError::UnknownFile(file))?;
        if !target.is_saveable() {
            return Err(EspError::NotSaveable(target.name().to_string()));
        }
        // 释放映射的原始数据后才能覆盖同一路径
        if target.load_state() == LoadState::HeaderOnly {
            target.load(false)?;
        }

        // 已删除的记录不会写出；写入成功后才从内存中清除
        let bytes = target.to_bytes()?;
        let path = target.path().to_path_buf();

        if backup_on_save {
            if let Some(backup) = self.writer.backup(&path)? {
                tracing::info!("已备份到 {:?}", backup);
            }
        }
        self.writer.write(&bytes, &path)?;
        let purged = target.purge_deleted();
        target.commit_saved();

        tracing::info!(
            "已保存 {} 到 {:?}: {} 字节，清除 {} 条已删除记录",
            target.name(),
            path,
            bytes.len(),
            purged
        );
        Ok(path)
    }

    /// 从集合中移除文件；仍被后续文件作为主文件引用时拒绝
    pub fn unload_file(&mut self, file: FileId) -> Result<(), EspError> {
        let name = self.file(file)?.name().clone();
        for (id, other) in self.files() {
            if id != file && other.masters().contains(&name) {
                return Err(EspError::MasterInUse {
                    master: name.to_string(),
                    dependent: other.name().to_string(),
                });
            }
        }
        self.files[file.index()] = None;
        self.load_order.retain(|&f| f != file);
        tracing::info!("已卸载 {}", name);
        Ok(())
    }

    pub fn stats(&self, file: FileId) -> Result<FileStats, EspError> {
        Ok(self.file(file)?.stats())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::io::MemoryEspStore;

    pub(crate) fn memory_collection(store: &MemoryEspStore) -> Collection {
        Collection::with_io(
            CollectionConfig::default(),
            Box::new(store.clone()),
            Box::new(store.clone()),
        )
    }

    pub(crate) fn new_file(collection: &mut Collection, name: &str) -> FileId {
        collection
            .add_file(name, AddFileOptions { create_if_missing: true, saveable: true })
            .unwrap()
    }

    #[test]
    fn test_add_file_rules() {
        let store = MemoryEspStore::new();
        let mut collection = memory_collection(&store);
        let a = new_file(&mut collection, "A.esm");
        assert!(matches!(
            collection.add_file("a.ESM", AddFileOptions { create_if_missing: true, saveable: true }),
            Err(EspError::DuplicateFile(_))
        ));
        assert!(matches!(
            collection.add_file("Missing.esp", AddFileOptions::default()),
            Err(EspError::FileNotFound(_))
        ));
        assert_eq!(collection.load_order(), &[a]);
        assert!(collection.file(a).unwrap().is_master());
    }

    #[test]
    fn test_missing_master_rejected() {
        let store = MemoryEspStore::new();
        let mut writer = memory_collection(&store);
        let a = new_file(&mut writer, "A.esm");
        let b = new_file(&mut writer, "B.esp");
        let long = LongFormId::new("A.esm", 0x800).unwrap();
        writer.unresolve(b, &long).unwrap();
        writer.save(a).unwrap();
        writer.save(b).unwrap();

        let mut reader = memory_collection(&store);
        let err = reader.add_file("B.esp", AddFileOptions::default()).unwrap_err();
        assert!(matches!(err, EspError::MissingMaster { .. }));
        reader.add_file("A.esm", AddFileOptions::default()).unwrap();
        reader.add_file("B.esp", AddFileOptions::default()).unwrap();
    }

    #[test]
    fn test_create_record_parents() {
        let store = MemoryEspStore::new();
        let mut collection = memory_collection(&store);
        let f = new_file(&mut collection, "F.esp");
        let refr = RecordType::new(b"REFR");
        assert!(matches!(
            collection.create_record(f, refr, None),
            Err(EspError::ParentRequired(_))
        ));
        let weap = collection.create_record(f, RecordType::new(b"WEAP"), None).unwrap();
        assert!(matches!(
            collection.create_record(f, refr, Some(weap)),
            Err(EspError::ParentMismatch { .. })
        ));
        let cell = collection.create_record(f, RecordType::new(b"CELL"), None).unwrap();
        let r = collection.create_record(f, refr, Some(cell)).unwrap();
        assert_eq!(collection.record(r).unwrap().parent(), Some(cell.record));
        assert_eq!(collection.record(weap).unwrap().form_id.raw(), 0x800);
        assert_eq!(collection.record(r).unwrap().form_id.raw(), 0x802);
        assert!(matches!(
            collection.create_record(f, RecordType::new(b"XXXX"), None),
            Err(EspError::UnsupportedRecordType(_))
        ));
    }

    #[test]
    fn test_unresolve_load_order() {
        let store = MemoryEspStore::new();
        let mut collection = memory_collection(&store);
        let a = new_file(&mut collection, "A.esm");
        let b = new_file(&mut collection, "B.esp");
        let from_b = LongFormId::new("B.esp", 0x900).unwrap();
        assert!(matches!(
            collection.unresolve(a, &from_b),
            Err(EspError::LoadOrderViolation { .. })
        ));
        assert!(collection.file(a).unwrap().masters().is_empty());

        let from_a = LongFormId::new("A.esm", 0x900).unwrap();
        assert!(!collection.validate_form_id(b, &from_a).unwrap());
        let short = collection.unresolve(b, &from_a).unwrap();
        assert_eq!(short.raw(), 0x0100_0900);
        assert!(collection.validate_form_id(b, &from_a).unwrap());
        assert_eq!(collection.resolve(b, short).unwrap(), Some(from_a));
    }

    #[test]
    fn test_unload_file_in_use() {
        let store = MemoryEspStore::new();
        let mut collection = memory_collection(&store);
        let a = new_file(&mut collection, "A.esm");
        let b = new_file(&mut collection, "B.esp");
        collection.unresolve(b, &LongFormId::new("A.esm", 0x801).unwrap()).unwrap();
        assert!(matches!(collection.unload_file(a), Err(EspError::MasterInUse { .. })));
        collection.unload_file(b).unwrap();
        collection.unload_file(a).unwrap();
        assert!(collection.load_order().is_empty());
        assert!(matches!(collection.file(a), Err(EspError::UnknownFile(_))));
    }

    #[test]
    fn test_save_not_saveable() {
        let store = MemoryEspStore::new();
        let mut collection = memory_collection(&store);
        let f = collection
            .add_file("Locked.esp", AddFileOptions { create_if_missing: true, saveable: false })
            .unwrap();
        assert!(matches!(collection.save(f), Err(EspError::NotSaveable(_))));
        assert!(store.get(std::path::Path::new("Locked.esp")).is_none());
    }

    #[test]
    fn test_save_makes_backup() {
        let store = MemoryEspStore::new();
        let mut collection = memory_collection(&store);
        let f = new_file(&mut collection, "P.esp");
        collection.save(f).unwrap();
        collection.create_record(f, RecordType::new(b"MISC"), None).unwrap();
        collection.save(f).unwrap();
        assert!(store.get(std::path::Path::new("P.bak")).is_some());
        assert!(!collection.file(f).unwrap().is_dirty());
    }

    /// 写入总是失败的存储
    struct FailingWriter;

    impl EspWriter for FailingWriter {
        fn write(&self, _data: &[u8], _path: &std::path::Path) -> Result<(), EspError> {
            Err(EspError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        }

        fn backup(&self, _path: &std::path::Path) -> Result<Option<PathBuf>, EspError> {
            Ok(None)
        }
    }

    #[test]
    fn test_handles_survive_save() {
        use crate::layout::EDITOR_ID;
        use crate::path::FieldPath;

        let store = MemoryEspStore::new();
        let mut collection = memory_collection(&store);
        let f = new_file(&mut collection, "F.esp");
        let misc = RecordType::new(b"MISC");
        let a = collection.create_record(f, misc, None).unwrap();
        let b = collection.create_record(f, misc, None).unwrap();
        let d = collection.create_record(f, misc, None).unwrap();
        let eid = FieldPath::new(EDITOR_ID);
        collection.set::<String>(b, &eid, "B".into()).unwrap();
        collection.set::<String>(d, &eid, "D".into()).unwrap();
        collection.delete(a, None).unwrap();

        collection.save(f).unwrap();
        assert_eq!(collection.get::<String>(b, &eid).unwrap().as_deref(), Some("B"));
        assert_eq!(collection.get::<String>(d, &eid).unwrap().as_deref(), Some("D"));
        assert!(matches!(collection.record(a), Err(EspError::InvalidHandle(_))));
        assert_eq!(collection.records(f, misc).unwrap(), vec![b, d]);

        // 保存后新建的记录不会占用已清除的槽位
        let e = collection.create_record(f, misc, None).unwrap();
        assert!(matches!(collection.record(a), Err(EspError::InvalidHandle(_))));
        assert_ne!(e, a);
    }

    #[test]
    fn test_failed_write_keeps_tombstones() {
        let store = MemoryEspStore::new();
        let mut collection =
            Collection::with_io(CollectionConfig::default(), Box::new(store.clone()), Box::new(FailingWriter));
        let f = new_file(&mut collection, "F.esp");
        let misc = RecordType::new(b"MISC");
        let kept = collection.create_record(f, misc, None).unwrap();
        let gone = collection.create_record(f, misc, None).unwrap();
        collection.delete(gone, None).unwrap();

        assert!(matches!(collection.save(f), Err(EspError::IoError(_))));
        assert!(collection.is_deleted(gone).unwrap());
        assert_eq!(collection.records(f, misc).unwrap(), vec![kept, gone]);
        assert!(collection.file(f).unwrap().is_dirty());
        assert!(store.get(std::path::Path::new("F.esp")).is_none());
    }
}
