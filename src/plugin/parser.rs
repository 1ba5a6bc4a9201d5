use super::{Plugin, PluginHeader};
use crate::datatypes::read_u32;
use crate::group::Group;
use crate::record::Record;
use crate::utils::EspError;
use rayon::prelude::*;
use std::io::{Cursor, Read};

impl Plugin {
    /// 解析完整插件
    pub fn parse(data: &[u8]) -> Result<Self, EspError> {
        let (header, offset) = Self::parse_header(data)?;
        let groups = Self::parse_groups(data, offset, header.masters.len())?;
        Ok(Plugin { header, groups })
    }

    /// 只解析 TES4 文件头，返回文件头及其后的偏移
    pub fn parse_header(data: &[u8]) -> Result<(PluginHeader, usize), EspError> {
        let mut cursor = Cursor::new(data);
        let record = Record::parse(&mut cursor, 0).map_err(|e| {
            tracing::debug!("文件头解析失败: {}", e);
            EspError::InvalidFormat
        })?;
        let header = PluginHeader::from_record(&record)?;
        Ok((header, cursor.position() as usize))
    }

    /// 解析所有组（并行版本）
    pub(crate) fn parse_groups(
        data: &[u8],
        offset: usize,
        master_count: usize,
    ) -> Result<Vec<Group>, EspError> {
        // 第一遍：快速扫描获取所有顶级 Group 边界
        let group_ranges = Self::scan_group_boundaries(data, offset)?;

        if group_ranges.is_empty() {
            return Ok(Vec::new());
        }

        // 第二遍：并行解析每个 Group
        group_ranges
            .par_iter()
            .map(|&(start, size)| {
                let end = start + size as usize;
                let group_data = data.get(start..end).ok_or_else(|| {
                    EspError::Malformed(format!(
                        "Group 边界超出数据范围: {}..{} (数据长度: {})",
                        start,
                        end,
                        data.len()
                    ))
                })?;
                Group::parse(&mut Cursor::new(group_data), master_count)
            })
            .collect()
    }

    /// 扫描顶级 Group 边界（用于并行解析）
    fn scan_group_boundaries(data: &[u8], offset: usize) -> Result<Vec<(usize, u32)>, EspError> {
        let mut boundaries = Vec::new();
        let mut cursor = Cursor::new(data);
        cursor.set_position(offset as u64);

        while cursor.position() < data.len() as u64 {
            let pos = cursor.position() as usize;

            // 至少需要 8 字节：类型 + 大小
            if pos + 8 > data.len() {
                return Err(EspError::Malformed(format!("文件末尾有 {} 字节无法解析", data.len() - pos)));
            }

            let mut type_bytes = [0u8; 4];
            cursor.read_exact(&mut type_bytes)?;
            if &type_bytes != b"GRUP" {
                return Err(EspError::Malformed(format!(
                    "在位置 {} 期望 GRUP，但找到 {}",
                    pos,
                    String::from_utf8_lossy(&type_bytes)
                )));
            }

            let size = read_u32(&mut cursor)?;
            if !(24..=200_000_000).contains(&size) {
                return Err(EspError::Malformed(format!("在位置 {} 发现异常 Group 大小: {} bytes", pos, size)));
            }

            boundaries.push((pos, size));
            cursor.set_position((pos + size as usize) as u64);
        }

        Ok(boundaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{GroupChild, GroupType};
    use crate::subrecord::Subrecord;

    fn sample_plugin() -> Vec<u8> {
        let header = PluginHeader {
            masters: vec!["A.esm".into()],
            ..PluginHeader::default()
        };
        let mut out = Vec::new();
        header.to_record().write(&mut out, 0).unwrap();

        let start = Group::begin(&mut out, *b"MISC", GroupType::Normal);
        let mut data = Vec::new();
        Subrecord::write_to(b"EDID", b"Gem\0", &mut data);
        out.extend_from_slice(b"MISC");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0x0100_0801u32.to_le_bytes());
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(&data);
        Group::end(&mut out, start);
        out
    }

    #[test]
    fn test_parse_plugin() {
        let bytes = sample_plugin();
        let plugin = Plugin::parse(&bytes).unwrap();
        assert_eq!(plugin.header.masters.len(), 1);
        assert_eq!(plugin.groups.len(), 1);
        match &plugin.groups[0].children[0] {
            GroupChild::Record(r) => {
                assert_eq!(r.form_id.raw(), 0x801);
                assert_eq!(r.editor_id().as_deref(), Some("Gem"));
            }
            other => panic!("unexpected child {other:?}"),
        }
    }

    #[test]
    fn test_garbage_after_header() {
        let mut bytes = sample_plugin();
        bytes.extend_from_slice(b"JUNKJUNKJUNK");
        assert!(Plugin::parse(&bytes).is_err());
    }

    #[test]
    fn test_not_a_plugin() {
        assert!(matches!(Plugin::parse_header(b"hello"), Err(EspError::InvalidFormat)));
    }
}
