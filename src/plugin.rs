//! 插件文件的磁盘表示：TES4 文件头 + 顶层组
//!
//! 解析见 `parser`，从 [`ModFile`](crate::mod_file::ModFile) 写回字节见 `writer`。

use crate::datatypes::{read_f32, read_u32, RawString, RecordFlags};
use crate::form_id::{MasterName, FIRST_OBJECT_INDEX};
use crate::group::Group;
use crate::layout::RecordType;
use crate::record::Record;
use crate::subrecord::Subrecord;
use crate::utils::EspError;
use std::io::Cursor;

mod parser;
mod writer;
pub mod esl;
pub mod stats;

pub use stats::FileStats;

/// 文件头记录类型
pub const TES4: RecordType = RecordType::new(b"TES4");

/// 新建文件写入的版本号
const DEFAULT_VERSION: f32 = 1.0;

/// 解析后的插件：文件头 + 全部顶层组
#[derive(Debug)]
pub struct Plugin {
    pub header: PluginHeader,
    pub groups: Vec<Group>,
}

/// TES4 文件头
#[derive(Debug, Clone, PartialEq)]
pub struct PluginHeader {
    /// 记录头标志位（ESM / ESL 等）
    pub flags: u32,
    /// HEDR 版本
    pub version: f32,
    /// HEDR 记录数
    pub num_records: u32,
    /// HEDR 下一个可用对象索引
    pub next_object_id: u32,
    pub author: Option<String>,
    pub description: Option<String>,
    /// 主文件列表（MAST）
    pub masters: Vec<MasterName>,
    /// 其它文件头子记录（原样保留）
    pub extra: Vec<Subrecord>,
    pub internal_version: u16,
}

impl Default for PluginHeader {
    fn default() -> Self {
        PluginHeader {
            flags: 0,
            version: DEFAULT_VERSION,
            num_records: 0,
            next_object_id: FIRST_OBJECT_INDEX,
            author: None,
            description: None,
            masters: Vec::new(),
            extra: Vec::new(),
            internal_version: 0,
        }
    }
}

impl PluginHeader {
    /// 从 TES4 记录读取
    pub fn from_record(record: &Record) -> Result<Self, EspError> {
        if record.record_type != TES4 {
            return Err(EspError::InvalidFormat);
        }

        let mut header = PluginHeader {
            flags: record.flags,
            internal_version: record.internal_version,
            ..PluginHeader::default()
        };

        for sub in record.subrecords()? {
            match &sub.tag {
                b"HEDR" if sub.data.len() >= 12 => {
                    let mut cursor = Cursor::new(sub.data.as_slice());
                    header.version = read_f32(&mut cursor)?;
                    header.num_records = read_u32(&mut cursor)?;
                    header.next_object_id = read_u32(&mut cursor)?;
                }
                b"CNAM" => header.author = Some(RawString::parse_zstring(&sub.data).content),
                b"SNAM" => header.description = Some(RawString::parse_zstring(&sub.data).content),
                b"MAST" => header
                    .masters
                    .push(MasterName::new(RawString::parse_zstring(&sub.data).content)),
                // 每个 MAST 之后的 8 字节文件大小，写出时重新生成
                b"DATA" => {}
                _ => header.extra.push(sub),
            }
        }

        Ok(header)
    }

    /// 生成 TES4 记录
    pub fn to_record(&self) -> Record {
        let mut subs = Vec::new();

        let mut hedr = Vec::with_capacity(12);
        hedr.extend_from_slice(&self.version.to_le_bytes());
        hedr.extend_from_slice(&self.num_records.to_le_bytes());
        hedr.extend_from_slice(&self.next_object_id.to_le_bytes());
        subs.push(Subrecord::new(*b"HEDR", hedr));

        if let Some(author) = &self.author {
            subs.push(Subrecord::new(*b"CNAM", RawString::encode_zstring(author)));
        }
        if let Some(description) = &self.description {
            subs.push(Subrecord::new(*b"SNAM", RawString::encode_zstring(description)));
        }
        for master in &self.masters {
            subs.push(Subrecord::new(*b"MAST", RawString::encode_zstring(master.as_str())));
            subs.push(Subrecord::new(*b"DATA", vec![0u8; 8]));
        }
        subs.extend(self.extra.iter().cloned());

        let mut record = Record::from_subrecords(TES4, self.flags, &subs);
        record.internal_version = self.internal_version;
        record
    }

    pub fn is_master(&self) -> bool {
        self.flags & RecordFlags::MASTER_FILE.bits() != 0
    }

    pub fn is_light(&self) -> bool {
        self.flags & RecordFlags::LIGHT_MASTER.bits() != 0
    }

    pub fn set_light(&mut self, light: bool) {
        if light {
            self.flags |= RecordFlags::LIGHT_MASTER.bits();
        } else {
            self.flags &= !RecordFlags::LIGHT_MASTER.bits();
        }
    }
}
