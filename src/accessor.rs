//! 字段读写
//!
//! 所有字段都用 [`FieldPath`] 寻址，由记录布局确定类型。任何被拒绝的调用都不会修改记录。
//!
//! 记录头字段的特殊处理：
//! - `FLAGS` 写入时保留 `DELETED` 位（删除只能通过 `delete`）
//! - `FORM_ID` 只读
//! - `VERSION_CONTROL` 低 16 位为时间戳，高 16 位为版本控制信息

use crate::collection::Collection;
use crate::datatypes::RecordFlags;
use crate::fields::FieldSet;
use crate::form_id::{self, FormId, LongFormId, MasterList};
use crate::handle::RecordHandle;
use crate::layout::{FieldDescriptor, FieldKind, FLAGS, FORM_ID, VERSION_CONTROL};
use crate::path::FieldPath;
use crate::record::Record;
use crate::utils::EspError;
use crate::value::{FieldType, FieldValue};

fn descriptor(record: &Record, path: &FieldPath) -> Result<&'static FieldDescriptor, EspError> {
    record.require_layout()?.resolve(path)
}

fn kind_mismatch(record: &Record, path: &FieldPath, desc: &FieldDescriptor, found: &'static str) -> EspError {
    EspError::KindMismatch {
        record_type: record.record_type,
        field: path.leaf(),
        expected: desc.kind.name(),
        found,
    }
}

/// 标量字段的描述；列表字段报错
fn scalar_descriptor(record: &Record, path: &FieldPath) -> Result<&'static FieldDescriptor, EspError> {
    let desc = descriptor(record, path)?;
    if desc.kind.is_list() {
        return Err(kind_mismatch(record, path, desc, "Value"));
    }
    Ok(desc)
}

fn list_descriptor(record: &Record, path: &FieldPath) -> Result<&'static FieldDescriptor, EspError> {
    let desc = descriptor(record, path)?;
    if !desc.kind.is_list() {
        return Err(kind_mismatch(record, path, desc, "List"));
    }
    Ok(desc)
}

/// 路径经过的每一级列表下标都必须存在
fn check_indices(fields: &FieldSet, path: &FieldPath) -> Result<(), EspError> {
    let mut prefix = FieldPath::new(path.root());
    for step in path.steps() {
        let len = fields.list_len(&prefix);
        if step.index >= len {
            return Err(EspError::IndexOutOfRange { index: step.index, len });
        }
        prefix = prefix.at(step.index, step.field);
    }
    Ok(())
}

/// `master_count` 是记录所在文件的主文件数量，短格式 FormID 的主文件索引不能超过它
fn check_value(
    record: &Record,
    path: &FieldPath,
    desc: &FieldDescriptor,
    value: &FieldValue,
    master_count: usize,
) -> Result<(), EspError> {
    if !value.matches(&desc.kind) {
        return Err(kind_mismatch(record, path, desc, value.kind_name()));
    }
    if let FieldValue::FormId(id) = value {
        if !id.is_none() && id.master_index() as usize > master_count {
            return Err(EspError::InvalidFormId(format!(
                "{} refers to master {} but the file has {} masters",
                id,
                id.master_index(),
                master_count
            )));
        }
    }
    if let (FieldKind::FixedBytes(n), FieldValue::Bytes(bytes)) = (&desc.kind, value) {
        if bytes.len() != *n {
            return Err(EspError::FixedSizeMismatch { expected: *n, actual: bytes.len() });
        }
    }
    Ok(())
}

fn header_value(record: &Record, field: usize) -> Option<FieldValue> {
    match field {
        FLAGS => Some(FieldValue::UInt32(record.flags)),
        FORM_ID => (!record.form_id.is_none()).then_some(FieldValue::FormId(record.form_id)),
        VERSION_CONTROL => Some(FieldValue::UInt32(
            ((record.version_control_info as u32) << 16) | record.timestamp as u32,
        )),
        _ => None,
    }
}

fn is_header_path(path: &FieldPath) -> bool {
    path.is_top_level() && matches!(path.root(), FLAGS | FORM_ID | VERSION_CONTROL)
}

impl Collection {
    /// 读取字段；未设置或列表下标越界时为 `None`
    pub fn read(&self, handle: RecordHandle, path: &FieldPath) -> Result<Option<FieldValue>, EspError> {
        let record = self.record(handle)?;
        scalar_descriptor(record, path)?;
        if is_header_path(path) {
            return Ok(header_value(record, path.root()));
        }
        Ok(record.fields()?.value(path).cloned())
    }

    /// 写入字段，值的类型必须与布局一致
    pub fn write(&mut self, handle: RecordHandle, path: &FieldPath, value: FieldValue) -> Result<(), EspError> {
        self.store(handle, path, Some(value))
    }

    /// 清除字段（变为未设置）
    pub fn clear(&mut self, handle: RecordHandle, path: &FieldPath) -> Result<(), EspError> {
        self.store(handle, path, None)
    }

    fn store(&mut self, handle: RecordHandle, path: &FieldPath, value: Option<FieldValue>) -> Result<(), EspError> {
        let record = self.record(handle)?;
        let desc = scalar_descriptor(record, path)?;
        if path.is_top_level() && path.root() == FORM_ID {
            return Err(EspError::ReadOnlyField {
                record_type: record.record_type,
                field: FORM_ID,
            });
        }
        if let Some(v) = &value {
            let master_count = self.file(handle.file)?.masters().len();
            check_value(record, path, desc, v, master_count)?;
        }
        if !is_header_path(path) {
            check_indices(record.fields()?, path)?;
        }

        let record = self.record_mut(handle)?;
        if is_header_path(path) {
            let bits = value.as_ref().and_then(FieldValue::as_bits).unwrap_or(0);
            match path.root() {
                FLAGS => {
                    let deleted = record.flags & RecordFlags::DELETED.bits();
                    record.flags = (bits & !RecordFlags::DELETED.bits()) | deleted;
                }
                _ => {
                    record.timestamp = (bits & 0xFFFF) as u16;
                    record.version_control_info = (bits >> 16) as u16;
                }
            }
            record.is_modified = true;
        } else {
            record.fields_mut()?.set_value(path, value)?;
        }
        self.file_mut(handle.file)?.dirty = true;
        Ok(())
    }

    /// 类型化读取
    pub fn get<T: FieldType>(&self, handle: RecordHandle, path: &FieldPath) -> Result<Option<T>, EspError> {
        let record = self.record(handle)?;
        let desc = scalar_descriptor(record, path)?;
        if !T::accepts(&desc.kind) {
            return Err(kind_mismatch(record, path, desc, T::KIND_NAME));
        }
        Ok(self.read(handle, path)?.as_ref().and_then(T::from_value))
    }

    /// 类型化写入
    pub fn set<T: FieldType>(&mut self, handle: RecordHandle, path: &FieldPath, value: T) -> Result<(), EspError> {
        let record = self.record(handle)?;
        let desc = scalar_descriptor(record, path)?;
        if !T::accepts(&desc.kind) {
            return Err(kind_mismatch(record, path, desc, T::KIND_NAME));
        }
        self.write(handle, path, value.into_value())
    }

    /// 借用读取文本字段，不复制
    pub fn read_text(&self, handle: RecordHandle, path: &FieldPath) -> Result<Option<&str>, EspError> {
        let record = self.record(handle)?;
        let desc = scalar_descriptor(record, path)?;
        if desc.kind != FieldKind::Text {
            return Err(kind_mismatch(record, path, desc, "Text"));
        }
        Ok(match record.fields()?.value(path) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        })
    }

    /// 读取 FormID 字段并转为长格式
    pub fn read_long_form_id(&self, handle: RecordHandle, path: &FieldPath) -> Result<Option<LongFormId>, EspError> {
        let Some(short) = self.get::<FormId>(handle, path)? else {
            return Ok(None);
        };
        Ok(form_id::resolve(self.file(handle.file)?, short))
    }

    /// 以长格式写入 FormID 字段，必要时为文件追加主文件
    pub fn write_long_form_id(&mut self, handle: RecordHandle, path: &FieldPath, long: &LongFormId) -> Result<(), EspError> {
        let record = self.record(handle)?;
        let desc = scalar_descriptor(record, path)?;
        if path.is_top_level() && path.root() == FORM_ID {
            return Err(EspError::ReadOnlyField { record_type: record.record_type, field: FORM_ID });
        }
        check_value(record, path, desc, &FieldValue::FormId(FormId::NONE), 0)?;
        check_indices(record.fields()?, path)?;

        let short = self.unresolve(handle.file, long)?;
        self.write(handle, path, FieldValue::FormId(short))
    }

    /// 列表元素数量；列表未设置时为 0
    pub fn list_len(&self, handle: RecordHandle, path: &FieldPath) -> Result<usize, EspError> {
        let record = self.record(handle)?;
        list_descriptor(record, path)?;
        Ok(record.fields()?.list_len(path))
    }

    /// 在列表末尾追加空元素，返回新下标
    pub fn create_element(&mut self, handle: RecordHandle, path: &FieldPath) -> Result<usize, EspError> {
        let record = self.record(handle)?;
        list_descriptor(record, path)?;
        check_indices(record.fields()?, path)?;

        let index = self.record_mut(handle)?.fields_mut()?.push_element(path)?;
        self.file_mut(handle.file)?.dirty = true;
        Ok(index)
    }

    /// 删除列表最后一个元素
    pub fn delete_element(&mut self, handle: RecordHandle, path: &FieldPath) -> Result<(), EspError> {
        let record = self.record(handle)?;
        list_descriptor(record, path)?;
        let fields = record.fields()?;
        check_indices(fields, path)?;
        if fields.list_len(path) == 0 {
            return Err(EspError::IndexOutOfRange { index: 0, len: 0 });
        }

        self.record_mut(handle)?.fields_mut()?.pop_element(path)?;
        self.file_mut(handle.file)?.dirty = true;
        Ok(())
    }

    /// 整体替换某个元素，返回原来的内容
    pub(crate) fn replace_element(
        &mut self,
        handle: RecordHandle,
        path: &FieldPath,
        index: usize,
        element: FieldSet,
    ) -> Result<FieldSet, EspError> {
        let record = self.record(handle)?;
        list_descriptor(record, path)?;
        let fields = record.fields()?;
        check_indices(fields, path)?;
        let len = fields.list_len(path);
        if index >= len {
            return Err(EspError::IndexOutOfRange { index, len });
        }

        let previous = self.record_mut(handle)?.fields_mut()?.replace_element(path, index, element)?;
        self.file_mut(handle.file)?.dirty = true;
        Ok(previous)
    }
}
