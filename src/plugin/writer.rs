use crate::group::{Group, GroupType};
use crate::handle::RecordId;
use crate::layout::{all_layouts, RecordType};
use crate::mod_file::ModFile;
use crate::utils::EspError;
use std::collections::BTreeSet;

/// 子组类型：父记录类型 -> 子组类型
fn children_group_type(parent: RecordType) -> Option<GroupType> {
    match &parent.0 {
        b"WRLD" => Some(GroupType::World),
        b"CELL" => Some(GroupType::Cell),
        b"DIAL" => Some(GroupType::Topic),
        _ => None,
    }
}

impl ModFile {
    /// 序列化整个文件
    ///
    /// 顶层组按布局注册表顺序写出，未知类型排在最后；
    /// 容器内记录写在父记录之后的子组中。已删除的记录不会写出。
    pub fn to_bytes(&self) -> Result<Vec<u8>, EspError> {
        let master_count = self.header.masters.len();
        let mut body = Vec::new();
        let mut count = 0u32;

        let known: Vec<RecordType> = all_layouts().iter().map(|l| l.record_type).collect();
        let extra: BTreeSet<RecordType> = self.record_types().filter(|t| !known.contains(t)).collect();

        for record_type in known.into_iter().chain(extra) {
            let roots: Vec<RecordId> = self
                .records_of_type(record_type)
                .iter()
                .copied()
                .filter(|&id| self.record(id).is_some_and(|r| r.parent().is_none() && !r.is_deleted()))
                .collect();
            if roots.is_empty() {
                continue;
            }

            let start = Group::begin(&mut body, record_type.0, GroupType::Normal);
            count += 1;
            for id in roots {
                count += self.write_tree(id, &mut body, master_count)?;
            }
            Group::end(&mut body, start);
        }

        let mut header = self.header.clone();
        header.num_records = count;

        let mut out = Vec::with_capacity(body.len() + 256);
        header.to_record().write(&mut out, 0)?;
        out.extend_from_slice(&body);

        tracing::debug!("{} 序列化完成: {} 字节, {} 个记录/组", self.name(), out.len(), count);
        Ok(out)
    }

    /// 写出记录及其子组，返回写出的记录/组数量
    fn write_tree(&self, id: RecordId, out: &mut Vec<u8>, master_count: usize) -> Result<u32, EspError> {
        let Some(record) = self.record(id) else {
            return Ok(0);
        };
        if record.is_deleted() {
            return Ok(0);
        }
        record.write(out, master_count)?;
        let mut count = 1;

        let children: Vec<RecordId> = record
            .children()
            .iter()
            .copied()
            .filter(|&c| self.record(c).is_some_and(|r| !r.is_deleted()))
            .collect();
        if children.is_empty() {
            return Ok(count);
        }

        let Some(group_type) = children_group_type(record.record_type) else {
            tracing::warn!("{} 类型的记录 {} 不能拥有子记录，子记录被忽略", record.record_type, record.form_id);
            return Ok(count);
        };

        let label = record.form_id.to_disk(master_count).to_le_bytes();
        let start = Group::begin(out, label, group_type);
        count += 1;
        for child in children {
            count += self.write_tree(child, out, master_count)?;
        }
        Group::end(out, start);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::form_id::FormId;
    use crate::io::RawEspData;
    use crate::layout::RecordType;
    use crate::mod_file::ModFile;
    use crate::record::Record;

    #[test]
    fn test_roundtrip_with_children() {
        let mut file = ModFile::new_empty("W.esp".into(), "W.esp".into(), true);
        file.header.masters.push("Base.esm".into());
        let wrld = file.insert(Record::new(RecordType::new(b"WRLD"), FormId::from_raw(0x800)), None);
        let cell = file.insert(Record::new(RecordType::new(b"CELL"), FormId::from_raw(0x801)), Some(wrld));
        file.insert(Record::new(RecordType::new(b"REFR"), FormId::from_raw(0x802)), Some(cell));
        let gone = file.insert(Record::new(RecordType::new(b"MISC"), FormId::from_raw(0x803)), None);
        file.record_mut(gone).unwrap().mark_deleted();

        let bytes = file.to_bytes().unwrap();
        let mut reloaded =
            ModFile::from_raw("W.esp".into(), "W.esp".into(), RawEspData::owned(bytes), true).unwrap();
        // WRLD 组 + WRLD + 世界子组 + CELL + 单元格子组 + REFR
        assert_eq!(reloaded.header().num_records, 6);
        reloaded.load(true).unwrap();

        assert_eq!(reloaded.record_count(), 3);
        let wrld = reloaded.find(FormId::from_raw(0x800)).unwrap();
        let cell = reloaded.find(FormId::from_raw(0x801)).unwrap();
        let refr = reloaded.find(FormId::from_raw(0x802)).unwrap();
        assert_eq!(reloaded.record(cell).unwrap().parent(), Some(wrld));
        assert_eq!(reloaded.record(refr).unwrap().parent(), Some(cell));
        assert!(reloaded.find(FormId::from_raw(0x803)).is_none());
    }
}
