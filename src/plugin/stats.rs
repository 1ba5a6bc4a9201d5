use crate::layout::RecordType;
use crate::mod_file::ModFile;
use crate::record::RecordState;
use serde::Serialize;
use std::collections::BTreeMap;

/// 文件统计信息
#[derive(Debug, Clone, Serialize)]
pub struct FileStats {
    pub name: String,
    pub plugin_type: String,
    pub is_master: bool,
    pub is_light: bool,
    pub master_count: usize,
    pub record_count: usize,
    pub deleted_count: usize,
    pub loaded_count: usize,
    pub modified_count: usize,
    pub type_counts: BTreeMap<RecordType, usize>,
}

impl std::fmt::Display for FileStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== 插件统计信息 ===")?;
        writeln!(f, "名称: {}", self.name)?;
        writeln!(f, "类型: {}", self.plugin_type)?;
        writeln!(f, "主文件: {}", if self.is_master { "是" } else { "否" })?;
        writeln!(f, "轻量插件: {}", if self.is_light { "是" } else { "否" })?;
        writeln!(f, "依赖主文件数: {}", self.master_count)?;
        writeln!(f, "记录数量: {}", self.record_count)?;
        writeln!(f, "已删除: {}", self.deleted_count)?;
        writeln!(f, "已加载: {}", self.loaded_count)?;
        writeln!(f, "未保存修改: {}", self.modified_count)?;
        for (record_type, count) in &self.type_counts {
            writeln!(f, "  {}: {}", record_type, count)?;
        }
        Ok(())
    }
}

impl ModFile {
    /// 获取统计信息
    pub fn stats(&self) -> FileStats {
        let mut stats = FileStats {
            name: self.name().to_string(),
            plugin_type: self.plugin_type().to_string(),
            is_master: self.is_master(),
            is_light: self.is_light(),
            master_count: self.header().masters.len(),
            record_count: 0,
            deleted_count: 0,
            loaded_count: 0,
            modified_count: 0,
            type_counts: BTreeMap::new(),
        };

        for id in self.record_ids() {
            let Some(record) = self.record(id) else { continue };
            match record.state() {
                RecordState::Deleted => {
                    stats.deleted_count += 1;
                    continue;
                }
                RecordState::Modified => stats.modified_count += 1,
                RecordState::Loaded => stats.loaded_count += 1,
                RecordState::Unloaded => {}
            }
            stats.record_count += 1;
            *stats.type_counts.entry(record.record_type).or_default() += 1;
        }
        stats
    }

    /// 插件类型（ESM / ESL / ESP）
    pub fn plugin_type(&self) -> &'static str {
        if self.is_light() {
            "ESL"
        } else if self.is_master() {
            "ESM"
        } else {
            "ESP"
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::form_id::FormId;
    use crate::layout::RecordType;
    use crate::mod_file::ModFile;
    use crate::record::Record;

    #[test]
    fn test_stats_counts() {
        let mut file = ModFile::new_empty("Base.esm".into(), "Base.esm".into(), true);
        file.insert(Record::new(RecordType::new(b"WEAP"), FormId::from_raw(0x800)), None);
        file.insert(Record::new(RecordType::new(b"WEAP"), FormId::from_raw(0x801)), None);
        let misc = file.insert(Record::new(RecordType::new(b"MISC"), FormId::from_raw(0x802)), None);
        file.record_mut(misc).unwrap().mark_deleted();

        let stats = file.stats();
        assert_eq!(stats.plugin_type, "ESM");
        assert_eq!(stats.record_count, 2);
        assert_eq!(stats.deleted_count, 1);
        assert_eq!(stats.modified_count, 2);
        assert_eq!(stats.type_counts[&RecordType::new(b"WEAP")], 2);
        assert!(stats.to_string().contains("WEAP: 2"));
    }
}
