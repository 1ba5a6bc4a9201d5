use std::collections::HashMap;

use crate::collection::Collection;
use crate::form_id::{LongFormId, FIRST_OBJECT_INDEX, LIGHT_MAX_OBJECT_INDEX};
use crate::handle::FileId;
use crate::utils::EspError;

/// 轻量插件最多容纳的自有记录数
pub const LIGHT_RECORD_LIMIT: usize = (LIGHT_MAX_OBJECT_INDEX - FIRST_OBJECT_INDEX + 1) as usize;

impl Collection {
    /// 重编号自有记录以符合 ESL (Light Plugin) 规范
    ///
    /// 文件自己的记录按原对象索引顺序重新编号为 `0x800` 起的连续索引，
    /// 覆盖版本不受影响。集合中其它文件对这些记录的引用一并改写，
    /// 最后设置轻量标志。返回重新编号的记录数。
    ///
    /// # 错误
    /// - 自有记录超过 2048 个时返回 [`EspError::LightFileOverflow`]，文件保持不变
    pub fn compact_light(&mut self, file: FileId) -> Result<usize, EspError> {
        let target = self.file(file)?;
        let mut own: Vec<u32> = target
            .record_ids()
            .filter_map(|rid| target.record(rid))
            .filter(|r| !r.is_deleted() && !r.form_id.is_none() && r.form_id.master_index() == 0)
            .map(|r| r.form_id.object_index())
            .collect();
        if own.len() > LIGHT_RECORD_LIMIT {
            return Err(EspError::LightFileOverflow { count: own.len() });
        }
        own.sort_unstable();

        let name = target.name().clone();
        let mut renames = HashMap::new();
        for (n, &old) in own.iter().enumerate() {
            let new = FIRST_OBJECT_INDEX + n as u32;
            if new != old {
                renames.insert(
                    LongFormId::new(name.clone(), old)?,
                    LongFormId::new(name.clone(), new)?,
                );
            }
        }

        let references = if renames.is_empty() {
            0
        } else {
            self.rename_form_ids(&renames)?
        };

        let target = self.file_mut(file)?;
        target.header.set_light(true);
        target.header.next_object_id = FIRST_OBJECT_INDEX + own.len() as u32;
        target.dirty = true;
        tracing::info!(
            "{} ESL 重编号完成：{} 条记录，改动 {} 个，改写引用 {} 处",
            name,
            own.len(),
            renames.len(),
            references
        );
        Ok(renames.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::{memory_collection, new_file};
    use crate::io::MemoryEspStore;
    use crate::layout::items::weap;
    use crate::layout::RecordType;
    use crate::path::FieldPath;

    #[test]
    fn test_compact_light_renumbers_and_rewrites() {
        let store = MemoryEspStore::new();
        let mut c = memory_collection(&store);
        let a = new_file(&mut c, "A.esp");
        let b = new_file(&mut c, "B.esp");

        let ench = c.create_record(a, RecordType::new(b"ENCH"), None).unwrap();
        c.renumber(ench, 0x5000).unwrap();
        let weapon = c.create_record(a, RecordType::new(b"WEAP"), None).unwrap();
        let ench_long = c.long_form_id(ench).unwrap();
        c.write_long_form_id(weapon, &FieldPath::new(weap::ENCHANTMENT), &ench_long).unwrap();
        let over = c.copy_as_override(weapon, b, None).unwrap();

        // ENCH 0x5000, WEAP 0x801 -> WEAP 0x800, ENCH 0x801
        let changed = c.compact_light(a).unwrap();
        assert_eq!(changed, 2);
        assert!(c.file(a).unwrap().is_light());
        assert_eq!(c.file(a).unwrap().header().next_object_id, 0x802);

        let new_ench = LongFormId::new("A.esp", 0x801).unwrap();
        assert_eq!(c.long_form_id(ench).unwrap(), new_ench);
        assert_eq!(c.long_form_id(weapon).unwrap().object_index(), 0x800);
        assert_eq!(
            c.read_long_form_id(over, &FieldPath::new(weap::ENCHANTMENT)).unwrap(),
            Some(new_ench)
        );
        assert_eq!(c.long_form_id(over).unwrap().object_index(), 0x800);
    }

    #[test]
    fn test_compact_light_overflow() {
        let store = MemoryEspStore::new();
        let mut c = memory_collection(&store);
        let a = new_file(&mut c, "Big.esp");
        for _ in 0..=LIGHT_RECORD_LIMIT {
            c.create_record(a, RecordType::new(b"MISC"), None).unwrap();
        }
        let err = c.compact_light(a).unwrap_err();
        assert!(matches!(err, EspError::LightFileOverflow { count } if count == LIGHT_RECORD_LIMIT + 1));
        assert!(!c.file(a).unwrap().is_light());
    }
}
