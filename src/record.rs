use crate::datatypes::{read_u16, read_u32, RecordFlags};
use crate::fields::FieldSet;
use crate::form_id::FormId;
use crate::handle::RecordId;
use crate::layout::{layout_for, FieldTable, RecordLayout, RecordType, EDITOR_ID};
use crate::path::FieldPath;
use crate::subrecord::Subrecord;
use crate::utils::EspError;
use crate::value::FieldValue;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::cell::OnceCell;
use std::io::{Cursor, Read, Write};

/// 记录状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// 仅有记录头，字段尚未解码
    Unloaded,
    /// 字段已解码
    Loaded,
    /// 有未保存的修改
    Modified,
    /// 已标记删除
    Deleted,
}

/// 记录结构
///
/// `raw_data` 是后备快照（解压后的子记录流，按 `raw_master_count` 个主文件的磁盘约定编码）。
/// 字段在第一次访问时从快照解码；`unload` 丢弃解码结果（连同未保存的修改）。
#[derive(Debug)]
pub struct Record {
    /// 记录类型
    pub record_type: RecordType,
    /// 标志位（原始32位数据）
    pub flags: u32,
    /// FormID（引擎短格式）
    pub form_id: FormId,
    /// 时间戳
    pub timestamp: u16,
    /// 版本控制信息
    pub version_control_info: u16,
    /// 内部版本
    pub internal_version: u16,
    /// 未知字段
    pub unknown: u16,
    layout: Option<&'static RecordLayout>,
    /// 原始压缩数据（未修改的压缩记录按原样写回）
    original_compressed_data: Option<Vec<u8>>,
    raw_data: Vec<u8>,
    raw_master_count: usize,
    fields: OnceCell<FieldSet>,
    pub(crate) parent: Option<RecordId>,
    pub(crate) children: Vec<RecordId>,
    /// 是否已被修改
    pub is_modified: bool,
}

impl Record {
    /// 新建空记录
    pub fn new(record_type: RecordType, form_id: FormId) -> Self {
        let fields = OnceCell::from(FieldSet::default());
        Record {
            record_type,
            flags: 0,
            form_id,
            timestamp: 0,
            version_control_info: 0,
            internal_version: 0,
            unknown: 0,
            layout: layout_for(record_type),
            original_compressed_data: None,
            raw_data: Vec::new(),
            raw_master_count: 0,
            fields,
            parent: None,
            children: Vec::new(),
            is_modified: true,
        }
    }

    /// 以给定字段新建记录（复制记录时使用），同时生成后备快照
    pub fn with_fields(template: &Record, form_id: FormId, fields: FieldSet, master_count: usize) -> Self {
        let mut record = Record::new(template.record_type, form_id);
        record.flags = template.flags & !RecordFlags::DELETED.bits();
        record.timestamp = template.timestamp;
        record.version_control_info = template.version_control_info;
        record.internal_version = template.internal_version;
        record.unknown = template.unknown;
        record.fields = OnceCell::from(fields);
        record.commit_backing(master_count);
        record.is_modified = true;
        record
    }

    /// 解析记录
    pub fn parse(cursor: &mut Cursor<&[u8]>, master_count: usize) -> Result<Self, EspError> {
        Self::validate_header_size(cursor)?;

        let mut type_bytes = [0u8; 4];
        cursor.read_exact(&mut type_bytes)?;
        let record_type = RecordType(type_bytes);

        let data_size = read_u32(cursor)?;
        Self::validate_data_size(data_size, record_type)?;

        let flags = read_u32(cursor)?;
        let raw_form_id = read_u32(cursor)?;
        let timestamp = read_u16(cursor)?;
        let version_control_info = read_u16(cursor)?;
        let internal_version = read_u16(cursor)?;
        let unknown = read_u16(cursor)?;

        Self::validate_data_availability(cursor, data_size)?;

        let mut data = vec![0u8; data_size as usize];
        cursor.read_exact(&mut data)?;

        let (raw_data, original_compressed_data) = Self::handle_compression(data, flags, record_type)?;

        tracing::trace!(
            "解析记录 {} {:08X} ({} bytes)",
            record_type,
            raw_form_id,
            raw_data.len()
        );

        Ok(Record {
            record_type,
            flags,
            form_id: FormId::from_disk(raw_form_id, master_count),
            timestamp,
            version_control_info,
            internal_version,
            unknown,
            layout: layout_for(record_type),
            original_compressed_data,
            raw_data,
            raw_master_count: master_count,
            fields: OnceCell::new(),
            parent: None,
            children: Vec::new(),
            is_modified: false,
        })
    }

    /// 验证头部大小
    fn validate_header_size(cursor: &Cursor<&[u8]>) -> Result<(), EspError> {
        if cursor.position() + 24 > cursor.get_ref().len() as u64 {
            return Err(EspError::Malformed("Insufficient data for record header".into()));
        }
        Ok(())
    }

    /// 验证数据大小
    fn validate_data_size(data_size: u32, record_type: RecordType) -> Result<(), EspError> {
        if data_size > 100_000_000 {
            return Err(EspError::Malformed(format!(
                "记录 {} 数据大小异常: {} bytes (可能数据损坏)",
                record_type, data_size
            )));
        }
        Ok(())
    }

    /// 验证数据可用性
    fn validate_data_availability(cursor: &Cursor<&[u8]>, data_size: u32) -> Result<(), EspError> {
        if cursor.position() + data_size as u64 > cursor.get_ref().len() as u64 {
            return Err(EspError::Malformed(format!(
                "Insufficient data for record data: expected {} bytes",
                data_size
            )));
        }
        Ok(())
    }

    /// 处理压缩数据，返回 (解压后的数据, 原始压缩数据)
    fn handle_compression(
        data: Vec<u8>,
        flags: u32,
        record_type: RecordType,
    ) -> Result<(Vec<u8>, Option<Vec<u8>>), EspError> {
        if flags & RecordFlags::COMPRESSED.bits() == 0 {
            return Ok((data, None));
        }
        let decompressed = Self::decompress_data(&data).map_err(|e| {
            tracing::warn!("记录 {} 解压失败: {}", record_type, e);
            e
        })?;
        tracing::trace!("成功解压记录 {}: {} -> {} bytes", record_type, data.len(), decompressed.len());
        Ok((decompressed, Some(data)))
    }

    /// 解压缩数据
    fn decompress_data(data: &[u8]) -> Result<Vec<u8>, EspError> {
        if data.len() < 4 {
            return Err(EspError::CompressionError("压缩数据太短，无法包含解压大小".into()));
        }

        let mut data_cursor = Cursor::new(data);
        let decompressed_size = read_u32(&mut data_cursor)?;
        if decompressed_size > 50_000_000 {
            return Err(EspError::CompressionError(format!(
                "解压大小过大: {} bytes (可能数据损坏)",
                decompressed_size
            )));
        }

        let mut decoder = ZlibDecoder::new(&data[4..]);
        let mut decompressed = Vec::with_capacity(decompressed_size as usize);
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| EspError::CompressionError(e.to_string()))?;

        if decompressed.len() != decompressed_size as usize {
            return Err(EspError::CompressionError(format!(
                "解压大小不匹配: 期望 {} bytes，实际 {} bytes",
                decompressed_size,
                decompressed.len()
            )));
        }

        Ok(decompressed)
    }

    /// 压缩数据（4 字节解压大小 + zlib 流）
    fn compress_data(data: &[u8]) -> Result<Vec<u8>, EspError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        let compressed = encoder
            .finish()
            .map_err(|e| EspError::CompressionError(e.to_string()))?;

        let mut result = Vec::with_capacity(compressed.len() + 4);
        result.extend_from_slice(&(data.len() as u32).to_le_bytes());
        result.extend_from_slice(&compressed);
        Ok(result)
    }

    pub fn layout(&self) -> Option<&'static RecordLayout> {
        self.layout
    }

    /// 布局；不受支持的记录类型报错
    pub fn require_layout(&self) -> Result<&'static RecordLayout, EspError> {
        self.layout
            .ok_or_else(|| EspError::UnsupportedRecordType(self.record_type.to_string()))
    }

    /// 解码后的字段（首次访问时从快照解码）
    pub fn fields(&self) -> Result<&FieldSet, EspError> {
        if let Some(fields) = self.fields.get() {
            return Ok(fields);
        }
        let layout = self.require_layout()?;
        let decoded = FieldSet::decode(&self.raw_data, FieldTable::Record(layout), self.raw_master_count)?;
        Ok(self.fields.get_or_init(|| decoded))
    }

    /// 可变字段；调用方负责之后的修改标记
    pub fn fields_mut(&mut self) -> Result<&mut FieldSet, EspError> {
        self.fields()?;
        self.is_modified = true;
        self.original_compressed_data = None;
        self.fields
            .get_mut()
            .ok_or_else(|| EspError::Malformed("record fields not decoded".into()))
    }

    /// 强制解码
    pub fn load(&self) -> Result<(), EspError> {
        self.fields().map(|_| ())
    }

    /// 丢弃解码结果与未保存的修改，回到快照
    pub fn unload(&mut self) {
        if self.layout.is_some() {
            self.fields.take();
        }
        self.is_modified = false;
    }

    pub fn is_loaded(&self) -> bool {
        self.fields.get().is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.flags & RecordFlags::DELETED.bits() != 0
    }

    pub fn mark_deleted(&mut self) {
        self.flags |= RecordFlags::DELETED.bits();
        self.is_modified = true;
    }

    pub fn state(&self) -> RecordState {
        if self.is_deleted() {
            RecordState::Deleted
        } else if self.is_modified {
            RecordState::Modified
        } else if self.is_loaded() {
            RecordState::Loaded
        } else {
            RecordState::Unloaded
        }
    }

    pub fn parent(&self) -> Option<RecordId> {
        self.parent
    }

    pub fn children(&self) -> &[RecordId] {
        &self.children
    }

    /// 获取编辑器ID
    pub fn editor_id(&self) -> Option<String> {
        if let Some(fields) = self.fields.get() {
            return match fields.value(&FieldPath::new(EDITOR_ID)) {
                Some(FieldValue::Text(s)) => Some(s.clone()),
                _ => None,
            };
        }
        // 未加载时直接扫描快照，不触发完整解码
        Subrecord::parse_stream(&self.raw_data)
            .ok()?
            .into_iter()
            .find(|s| &s.tag == b"EDID")
            .map(|s| crate::datatypes::RawString::parse_zstring(&s.data).content)
    }

    /// 当前内容编码为子记录流（按 `master_count` 个主文件的磁盘约定）
    pub fn encode_data(&self, master_count: usize) -> Result<Vec<u8>, EspError> {
        match self.layout {
            Some(layout) => {
                if !self.is_loaded() && self.raw_master_count == master_count {
                    return Ok(self.raw_data.clone());
                }
                Ok(self.fields()?.encode(FieldTable::Record(layout), master_count))
            }
            None => {
                if self.raw_master_count != master_count {
                    tracing::warn!(
                        "记录 {} 类型不受支持，主文件数量变化后其中的 FormID 无法重映射",
                        self.record_type
                    );
                }
                Ok(self.raw_data.clone())
            }
        }
    }

    /// 写出记录（24 字节记录头 + 数据）
    pub fn write(&self, out: &mut Vec<u8>, master_count: usize) -> Result<(), EspError> {
        let compressed = self.flags & RecordFlags::COMPRESSED.bits() != 0;
        let data = match (&self.original_compressed_data, compressed) {
            (Some(original), true) if !self.is_modified && self.raw_master_count == master_count => {
                original.clone()
            }
            (_, true) => Self::compress_data(&self.encode_data(master_count)?)?,
            (_, false) => self.encode_data(master_count)?,
        };

        out.extend_from_slice(&self.record_type.0);
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.form_id.to_disk(master_count).to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.version_control_info.to_le_bytes());
        out.extend_from_slice(&self.internal_version.to_le_bytes());
        out.extend_from_slice(&self.unknown.to_le_bytes());
        out.extend_from_slice(&data);
        Ok(())
    }

    /// 把当前内容固化为新的后备快照（保存之后调用）
    pub fn commit_backing(&mut self, master_count: usize) {
        match self.encode_data(master_count) {
            Ok(data) => {
                self.raw_data = data;
                self.raw_master_count = master_count;
            }
            Err(e) => tracing::warn!("记录 {} 快照更新失败: {}", self.form_id, e),
        }
        self.original_compressed_data = None;
        self.is_modified = false;
    }

    /// 原始子记录（TES4 等无布局记录使用）
    pub fn subrecords(&self) -> Result<Vec<Subrecord>, EspError> {
        Subrecord::parse_stream(&self.raw_data)
    }

    /// 直接以子记录构造无布局记录（写出文件头时使用）
    pub fn from_subrecords(record_type: RecordType, flags: u32, subrecords: &[Subrecord]) -> Self {
        let mut record = Record::new(record_type, FormId::NONE);
        record.flags = flags;
        record.layout = None;
        let mut data = Vec::new();
        for sub in subrecords {
            sub.write(&mut data);
        }
        record.raw_data = data;
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::items::weap;

    fn weapon_bytes(flags: u32, data: &[u8], raw_form_id: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"WEAP");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&raw_form_id.to_le_bytes());
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(data);
        out
    }

    fn weapon_payload() -> Vec<u8> {
        let mut data = Vec::new();
        Subrecord::write_to(b"EDID", b"IronSword\0", &mut data);
        Subrecord::write_to(b"DAMG", &12u16.to_le_bytes(), &mut data);
        Subrecord::write_to(b"ENAM", &0x0000_0014u32.to_le_bytes(), &mut data);
        data
    }

    #[test]
    fn test_parse_is_lazy() {
        let bytes = weapon_bytes(0, &weapon_payload(), 0x0100_0801);
        let record = Record::parse(&mut Cursor::new(bytes.as_slice()), 1).unwrap();
        assert_eq!(record.state(), RecordState::Unloaded);
        assert_eq!(record.form_id, FormId::from_raw(0x0000_0801));
        assert_eq!(record.editor_id().as_deref(), Some("IronSword"));
        assert_eq!(record.state(), RecordState::Unloaded);

        let fields = record.fields().unwrap();
        assert_eq!(fields.value(&FieldPath::new(weap::DAMAGE)), Some(&FieldValue::UInt16(12)));
        // 磁盘上的主文件 0 → 短格式索引 1
        assert_eq!(
            fields.value(&FieldPath::new(weap::ENCHANTMENT)),
            Some(&FieldValue::FormId(FormId::from_raw(0x0100_0014)))
        );
        assert_eq!(record.state(), RecordState::Loaded);
    }

    #[test]
    fn test_unload_discards_edits() {
        let bytes = weapon_bytes(0, &weapon_payload(), 0x0100_0801);
        let mut record = Record::parse(&mut Cursor::new(bytes.as_slice()), 1).unwrap();
        record
            .fields_mut()
            .unwrap()
            .set_value(&FieldPath::new(weap::DAMAGE), Some(FieldValue::UInt16(99)))
            .unwrap();
        assert_eq!(record.state(), RecordState::Modified);

        record.unload();
        assert_eq!(record.state(), RecordState::Unloaded);
        assert_eq!(
            record.fields().unwrap().value(&FieldPath::new(weap::DAMAGE)),
            Some(&FieldValue::UInt16(12))
        );
    }

    #[test]
    fn test_compressed_roundtrip() {
        let payload = weapon_payload();
        let compressed = Record::compress_data(&payload).unwrap();
        let bytes = weapon_bytes(RecordFlags::COMPRESSED.bits(), &compressed, 0x0000_0801);
        let record = Record::parse(&mut Cursor::new(bytes.as_slice()), 0).unwrap();
        assert_eq!(record.editor_id().as_deref(), Some("IronSword"));

        // 未修改的压缩记录原样写回
        let mut out = Vec::new();
        record.write(&mut out, 0).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_write_remaps_when_master_count_changes() {
        let bytes = weapon_bytes(0, &weapon_payload(), 0x0100_0801);
        let record = Record::parse(&mut Cursor::new(bytes.as_slice()), 1).unwrap();

        let mut out = Vec::new();
        record.write(&mut out, 2).unwrap();
        let again = Record::parse(&mut Cursor::new(out.as_slice()), 2).unwrap();
        assert_eq!(again.form_id, record.form_id);
        assert_eq!(
            again.fields().unwrap().value(&FieldPath::new(weap::ENCHANTMENT)),
            Some(&FieldValue::FormId(FormId::from_raw(0x0100_0014)))
        );
    }

    #[test]
    fn test_truncated_record() {
        let mut bytes = weapon_bytes(0, &weapon_payload(), 1);
        bytes.truncate(30);
        assert!(Record::parse(&mut Cursor::new(bytes.as_slice()), 0).is_err());
    }
}
