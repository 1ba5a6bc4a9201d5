use crate::datatypes::{read_i32, read_u16, read_u32};
use crate::record::Record;
use crate::utils::EspError;
use std::io::{Cursor, Read};

/// 组类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupType {
    /// 顶层组（标签为记录类型）
    Normal,
    /// 世界空间子组（标签为 WRLD FormID）
    World,
    /// 室内单元格块 / 子块
    InteriorBlock,
    InteriorSubBlock,
    /// 室外单元格块 / 子块
    ExteriorBlock,
    ExteriorSubBlock,
    /// 单元格子组（标签为 CELL FormID）
    Cell,
    /// 话题子组（标签为 DIAL FormID）
    Topic,
    /// 单元格持久 / 临时 / 远景引用
    CellPersistent,
    CellTemporary,
    CellVisibleDistant,
    /// 未知类型
    Unknown(i32),
}

impl GroupType {
    /// 转换为i32值
    pub fn to_i32(&self) -> i32 {
        match self {
            GroupType::Normal => 0,
            GroupType::World => 1,
            GroupType::InteriorBlock => 2,
            GroupType::InteriorSubBlock => 3,
            GroupType::ExteriorBlock => 4,
            GroupType::ExteriorSubBlock => 5,
            GroupType::Cell => 6,
            GroupType::Topic => 7,
            GroupType::CellPersistent => 8,
            GroupType::CellTemporary => 9,
            GroupType::CellVisibleDistant => 10,
            GroupType::Unknown(value) => *value,
        }
    }

    /// 标签是否为父记录 FormID（子组）
    pub fn is_children_group(&self) -> bool {
        matches!(self, GroupType::World | GroupType::Cell | GroupType::Topic)
    }
}

impl From<i32> for GroupType {
    fn from(value: i32) -> Self {
        match value {
            0 => GroupType::Normal,
            1 => GroupType::World,
            2 => GroupType::InteriorBlock,
            3 => GroupType::InteriorSubBlock,
            4 => GroupType::ExteriorBlock,
            5 => GroupType::ExteriorSubBlock,
            6 => GroupType::Cell,
            7 => GroupType::Topic,
            8 => GroupType::CellPersistent,
            9 => GroupType::CellTemporary,
            10 => GroupType::CellVisibleDistant,
            _ => GroupType::Unknown(value),
        }
    }
}

/// 组结构
#[derive(Debug)]
pub struct Group {
    /// 组大小(包含头部24字节)
    pub size: u32,
    /// 标签
    pub label: [u8; 4],
    /// 组类型
    pub group_type: GroupType,
    /// 时间戳
    pub timestamp: u16,
    /// 版本控制信息
    pub version_control_info: u16,
    /// 未知字段
    pub unknown: u32,
    /// 子元素
    pub children: Vec<GroupChild>,
}

/// 组子元素
#[derive(Debug)]
pub enum GroupChild {
    /// 子组
    Group(Box<Group>),
    /// 记录
    Record(Record),
}

impl Group {
    /// 解析组
    pub fn parse(cursor: &mut Cursor<&[u8]>, master_count: usize) -> Result<Self, EspError> {
        if cursor.position() + 24 > cursor.get_ref().len() as u64 {
            return Err(EspError::Malformed("Insufficient data for group header".into()));
        }

        let mut type_bytes = [0u8; 4];
        cursor.read_exact(&mut type_bytes)?;
        if &type_bytes != b"GRUP" {
            return Err(EspError::Malformed(format!(
                "Expected GRUP, found {}",
                String::from_utf8_lossy(&type_bytes)
            )));
        }

        let size = read_u32(cursor)?;
        if size > 200_000_000 {
            return Err(EspError::Malformed(format!("组大小异常: {} bytes (可能数据损坏)", size)));
        }
        if size < 24 {
            return Err(EspError::Malformed(format!("组大小太小: {} bytes (最小应为24字节)", size)));
        }

        let mut label = [0u8; 4];
        cursor.read_exact(&mut label)?;
        let group_type = GroupType::from(read_i32(cursor)?);
        let timestamp = read_u16(cursor)?;
        let version_control_info = read_u16(cursor)?;
        let unknown = read_u32(cursor)?;

        let data_size = size - 24;
        if cursor.position() + data_size as u64 > cursor.get_ref().len() as u64 {
            return Err(EspError::Malformed(format!(
                "Insufficient data for group data: expected {} bytes",
                data_size
            )));
        }

        let data_end = cursor.position() + data_size as u64;
        let mut children = Vec::new();
        while cursor.position() < data_end {
            // 预读取4字节判断类型
            let peek_pos = cursor.position();
            let mut peek_bytes = [0u8; 4];
            cursor.read_exact(&mut peek_bytes)?;
            cursor.set_position(peek_pos);

            if &peek_bytes == b"GRUP" {
                let child_group = Group::parse(cursor, master_count)?;
                children.push(GroupChild::Group(Box::new(child_group)));
            } else {
                let record = Record::parse(cursor, master_count)?;
                children.push(GroupChild::Record(record));
            }
        }

        Ok(Group {
            size,
            label,
            group_type,
            timestamp,
            version_control_info,
            unknown,
            children,
        })
    }

    /// 标签解释为 u32（子组的父记录磁盘 FormID）
    pub fn label_u32(&self) -> u32 {
        u32::from_le_bytes(self.label)
    }

    /// 获取组标签字符串
    pub fn get_label_string(&self) -> String {
        String::from_utf8_lossy(&self.label).into_owned()
    }

    /// 写出组头（大小先占位），返回组起始位置
    pub fn begin(out: &mut Vec<u8>, label: [u8; 4], group_type: GroupType) -> usize {
        let start = out.len();
        out.extend_from_slice(b"GRUP");
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&label);
        out.extend_from_slice(&group_type.to_i32().to_le_bytes());
        out.extend_from_slice(&[0u8; 8]);
        start
    }

    /// 回填组大小
    pub fn end(out: &mut [u8], start: usize) {
        let size = (out.len() - start) as u32;
        out[start + 4..start + 8].copy_from_slice(&size.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_end_patches_size() {
        let mut out = Vec::new();
        let start = Group::begin(&mut out, *b"WEAP", GroupType::Normal);
        out.extend_from_slice(&[1, 2, 3]);
        Group::end(&mut out, start);

        let group = Group::parse(&mut Cursor::new(out.as_slice()), 0);
        // 三个字节不是合法记录
        assert!(group.is_err());
        assert_eq!(u32::from_le_bytes(out[4..8].try_into().unwrap()), 27);
    }

    #[test]
    fn test_empty_group() {
        let mut out = Vec::new();
        let start = Group::begin(&mut out, 0x0000_0801u32.to_le_bytes(), GroupType::Cell);
        Group::end(&mut out, start);

        let group = Group::parse(&mut Cursor::new(out.as_slice()), 0).unwrap();
        assert_eq!(group.group_type, GroupType::Cell);
        assert!(group.group_type.is_children_group());
        assert_eq!(group.label_u32(), 0x801);
        assert!(group.children.is_empty());
    }

    #[test]
    fn test_group_type_roundtrip() {
        for v in 0..=11 {
            assert_eq!(GroupType::from(v).to_i32(), v);
        }
    }
}
