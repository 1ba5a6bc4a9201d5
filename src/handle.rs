use serde::Serialize;
use std::fmt;

/// 集合内文件的句柄（文件生命周期内稳定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(pub(crate) u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 文件内记录槽位（删除的记录保留槽位，直到保存时清理）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId(pub(crate) u32);

impl RecordId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// 记录句柄：所属文件 + 槽位
///
/// 句柄只是值，不借用集合；失效后的访问返回 `EspError::InvalidHandle`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordHandle {
    pub file: FileId,
    pub record: RecordId,
}

impl RecordHandle {
    pub fn new(file: FileId, record: RecordId) -> Self {
        RecordHandle { file, record }
    }
}

impl fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.record.0)
    }
}
