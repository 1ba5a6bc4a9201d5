use thiserror::Error;
use std::path::{Path, PathBuf};

use crate::handle::{FileId, RecordHandle};
use crate::layout::{FieldIndex, RecordType};

/// 自定义错误类型
///
/// "不存在"（字段未设置、记录未找到、列表越界读取）一律用 `Option::None` 表达，
/// 不会出现在这里。
#[derive(Error, Debug)]
pub enum EspError {
    #[error("Invalid file format")]
    InvalidFormat,

    #[error("Unsupported record type: {0}")]
    UnsupportedRecordType(String),

    #[error("Compression error: {0}")]
    CompressionError(String),

    #[error("Malformed data: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // --- 集合 / 文件 ---
    #[error("Unknown file handle: {0}")]
    UnknownFile(FileId),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File already in collection: {0}")]
    DuplicateFile(String),

    #[error("{file} requires master {master}, which is not loaded before it")]
    MissingMaster { file: String, master: String },

    #[error("{master} cannot be referenced from {file}: it does not precede it in load order")]
    LoadOrderViolation { file: String, master: String },

    #[error("{master} is still a master of {dependent}")]
    MasterInUse { master: String, dependent: String },

    #[error("{0} is not saveable")]
    NotSaveable(String),

    // --- 记录 / 字段 ---
    #[error("Invalid record handle: {0}")]
    InvalidHandle(RecordHandle),

    #[error("Field {field} is not defined for {record_type}")]
    UndefinedField { record_type: RecordType, field: FieldIndex },

    #[error("Field {field} of {record_type} is read-only")]
    ReadOnlyField { record_type: RecordType, field: FieldIndex },

    #[error("Field {field} of {record_type} holds {expected}, not {found}")]
    KindMismatch {
        record_type: RecordType,
        field: FieldIndex,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Fixed-size field expects {expected} bytes, got {actual}")]
    FixedSizeMismatch { expected: usize, actual: usize },

    #[error("List index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Field path nests deeper than {max} list levels")]
    NestingTooDeep { max: usize },

    #[error("Required field {field} of list element is missing")]
    MissingField { field: FieldIndex },

    // --- FormID ---
    #[error("Object index {0:#X} does not fit in 24 bits")]
    ObjectIndexOverflow(u32),

    #[error("Invalid FormID: {0}")]
    InvalidFormId(String),

    #[error("No free object index left in {0}")]
    ObjectIndexExhausted(String),

    #[error("{0} has too many masters")]
    TooManyMasters(String),

    #[error("Light plugin record limit exceeded: {count} records (max 2048)")]
    LightFileOverflow { count: usize },

    // --- 复制 / 删除 ---
    #[error("Record {0} is deleted")]
    DeletedRecord(RecordHandle),

    #[error("{0} records must be placed inside a parent record")]
    ParentRequired(RecordType),

    #[error("{parent} is not a valid parent for this {record_type} record")]
    ParentMismatch { record_type: RecordType, parent: RecordHandle },

    // --- 列表同步 ---
    #[error("List reconcile stopped after {completed} element operations: {source}")]
    ListReconcile {
        completed: usize,
        source: Box<EspError>,
    },
}

/// 创建文件备份
pub fn create_backup(file_path: &Path) -> Result<PathBuf, EspError> {
    if !file_path.exists() {
        return Err(EspError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "原文件不存在"
        )));
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let backup_path = file_path.with_extension(format!("{}.bak", timestamp));

    std::fs::copy(file_path, &backup_path)
        .map_err(EspError::IoError)?;

    tracing::debug!("已创建备份文件: {:?}", backup_path);
    Ok(backup_path)
}

/// 插件文件名比较（Bethesda 文件名不区分大小写）
pub fn same_file_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
