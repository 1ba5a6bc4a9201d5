//! 集合配置（JSON）
//!
//! ```json
//! {
//!   "data_dir": "Data",
//!   "load_policy": "minimal",
//!   "files": [
//!     { "name": "Oblivion.esm", "saveable": false },
//!     { "name": "MyPatch.esp", "create_if_missing": true }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::EspError;

/// 加载策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPolicy {
    /// 只索引记录头，字段按需解码
    Minimal,
    /// 一次性解码所有字段
    #[default]
    Full,
}

/// 配置中的单个文件条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(default)]
    pub create_if_missing: bool,
    #[serde(default = "default_true")]
    pub saveable: bool,
}

/// 集合配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// 插件所在目录
    #[serde(default)]
    pub data_dir: PathBuf,
    /// 保存前备份已有文件
    #[serde(default = "default_true")]
    pub backup_on_save: bool,
    #[serde(default)]
    pub load_policy: LoadPolicy,
    /// 按加载顺序排列
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

fn default_true() -> bool {
    true
}

impl Default for CollectionConfig {
    fn default() -> Self {
        CollectionConfig {
            data_dir: PathBuf::new(),
            backup_on_save: true,
            load_policy: LoadPolicy::default(),
            files: Vec::new(),
        }
    }
}

impl CollectionConfig {
    /// 以数据目录创建默认配置
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        CollectionConfig {
            data_dir: data_dir.into(),
            ..CollectionConfig::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, EspError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, EspError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// 文件在数据目录中的路径
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

/// `add_file` 选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddFileOptions {
    /// 文件不存在时新建空文件
    pub create_if_missing: bool,
    /// 是否允许保存
    pub saveable: bool,
}

impl Default for AddFileOptions {
    fn default() -> Self {
        AddFileOptions {
            create_if_missing: false,
            saveable: true,
        }
    }
}

impl From<&FileEntry> for AddFileOptions {
    fn from(entry: &FileEntry) -> Self {
        AddFileOptions {
            create_if_missing: entry.create_if_missing,
            saveable: entry.saveable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config = CollectionConfig::from_json_str(r#"{ "files": [ { "name": "A.esm" } ] }"#).unwrap();
        assert!(config.backup_on_save);
        assert_eq!(config.load_policy, LoadPolicy::Full);
        assert_eq!(config.files.len(), 1);
        assert!(config.files[0].saveable);
        assert!(!config.files[0].create_if_missing);
    }

    #[test]
    fn test_full_json() {
        let text = r#"{
            "data_dir": "Data",
            "backup_on_save": false,
            "load_policy": "minimal",
            "files": [
                { "name": "A.esm", "saveable": false },
                { "name": "B.esp", "create_if_missing": true }
            ]
        }"#;
        let config = CollectionConfig::from_json_str(text).unwrap();
        assert_eq!(config.load_policy, LoadPolicy::Minimal);
        assert_eq!(config.path_of("B.esp"), PathBuf::from("Data").join("B.esp"));
        let options = AddFileOptions::from(&config.files[1]);
        assert!(options.create_if_missing && options.saveable);
        assert!(!AddFileOptions::from(&config.files[0]).saveable);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            CollectionConfig::from_json_str("{ nope"),
            Err(EspError::JsonError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collection.json");
        std::fs::write(&path, r#"{ "load_policy": "full" }"#).unwrap();
        let config = CollectionConfig::from_json_file(&path).unwrap();
        assert!(config.files.is_empty());
    }
}
