use std::path::PathBuf;

/// 主文件名探测：返回文件在磁盘上的实际拼写
pub trait MasterNameProbe {
    fn probe(&self, name: &str) -> Option<String>;
}

/// 在数据目录中按不区分大小写的方式查找文件
#[derive(Debug, Clone)]
pub struct DataDirProbe {
    data_dir: PathBuf,
}

impl DataDirProbe {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        DataDirProbe { data_dir: data_dir.into() }
    }
}

impl MasterNameProbe for DataDirProbe {
    fn probe(&self, name: &str) -> Option<String> {
        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("无法读取目录 {:?}: {}", self.data_dir, e);
                return None;
            }
        };
        entries
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .find(|file_name| file_name.eq_ignore_ascii_case(name))
    }
}
