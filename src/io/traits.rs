/// IO 抽象层 - trait 定义
///
/// 读写 trait 只负责字节的搬运，不负责解析或序列化。

use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;

use crate::utils::EspError;

/// 插件文件字节：内存映射或自有缓冲
#[derive(Debug)]
pub enum EspBytes {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for EspBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            EspBytes::Mapped(map) => map,
            EspBytes::Owned(bytes) => bytes,
        }
    }
}

/// ESP 文件原始数据
#[derive(Debug)]
pub struct RawEspData {
    /// 文件的原始字节数据
    pub bytes: EspBytes,
}

impl RawEspData {
    pub fn owned(bytes: Vec<u8>) -> Self {
        RawEspData { bytes: EspBytes::Owned(bytes) }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

/// ESP 文件读取 trait
pub trait EspReader {
    /// 读取 ESP 文件的原始数据
    fn read(&self, path: &Path) -> Result<RawEspData, EspError>;

    /// 文件是否存在
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// ESP 文件写入 trait
pub trait EspWriter {
    /// 写入 ESP 文件数据
    fn write(&self, data: &[u8], path: &Path) -> Result<(), EspError>;

    /// 覆盖前备份已有文件；没有可备份的文件时返回 `None`
    fn backup(&self, path: &Path) -> Result<Option<std::path::PathBuf>, EspError> {
        if path.is_file() {
            crate::utils::create_backup(path).map(Some)
        } else {
            Ok(None)
        }
    }
}
