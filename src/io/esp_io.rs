/// ESP 文件 IO 实现
///
/// 默认实现基于文件系统，读取时使用内存映射；
/// `MemoryEspStore` 把文件保存在内存中，供测试和工具链内部使用。
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use memmap2::Mmap;

use super::traits::{EspBytes, EspReader, EspWriter, RawEspData};
use crate::utils::EspError;

/// 默认的 ESP 文件读取器（内存映射）
#[derive(Debug, Clone, Default)]
pub struct DefaultEspReader;

impl EspReader for DefaultEspReader {
    fn read(&self, path: &Path) -> Result<RawEspData, EspError> {
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EspError::FileNotFound(path.display().to_string()),
            _ => EspError::IoError(e),
        })?;
        // 空文件无法映射
        if file.metadata()?.len() == 0 {
            return Ok(RawEspData::owned(Vec::new()));
        }
        // SAFETY: 映射只读；集合持有映射期间不会写同一路径（保存前先完成解析）
        let map = unsafe { Mmap::map(&file)? };
        Ok(RawEspData { bytes: EspBytes::Mapped(map) })
    }
}

/// 默认的 ESP 文件写入器（基于 std::fs）
#[derive(Debug, Clone, Default)]
pub struct DefaultEspWriter;

impl EspWriter for DefaultEspWriter {
    fn write(&self, data: &[u8], path: &Path) -> Result<(), EspError> {
        // 确保父目录存在
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, data)?;
        Ok(())
    }
}

/// 内存中的插件存储，读写共享同一份数据
#[derive(Debug, Clone, Default)]
pub struct MemoryEspStore {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
}

impl MemoryEspStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), bytes);
        }
    }

    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(path).cloned()
    }
}

impl EspReader for MemoryEspStore {
    fn read(&self, path: &Path) -> Result<RawEspData, EspError> {
        self.get(path)
            .map(RawEspData::owned)
            .ok_or_else(|| EspError::FileNotFound(path.display().to_string()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().map(|f| f.contains_key(path)).unwrap_or(false)
    }
}

impl EspWriter for MemoryEspStore {
    fn write(&self, data: &[u8], path: &Path) -> Result<(), EspError> {
        self.insert(path, data.to_vec());
        Ok(())
    }

    fn backup(&self, path: &Path) -> Result<Option<PathBuf>, EspError> {
        let Some(bytes) = self.get(path) else {
            return Ok(None);
        };
        let backup = path.with_extension("bak");
        self.insert(backup.clone(), bytes);
        Ok(Some(backup))
    }
}
