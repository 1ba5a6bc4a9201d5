pub mod datatypes;
pub mod record;
pub mod group;
pub mod plugin;
pub mod subrecord;
pub mod utils;
pub mod io;

pub mod form_id;
pub mod handle;
pub mod layout;
pub mod path;
pub mod value;
pub mod fields;
pub mod flags;

pub mod config;
pub mod probe;
pub mod mod_file;
pub mod collection;
pub mod lookup;
pub mod accessor;
pub mod lifecycle;
pub mod list_sync;
pub mod elements;
pub mod copy;
pub mod export;

// 重新导出主要结构
pub use collection::Collection;
pub use config::{AddFileOptions, CollectionConfig, FileEntry, LoadPolicy};
pub use copy::CopyOptions;
pub use form_id::{FormId, LongFormId, MasterName};
pub use handle::{FileId, RecordHandle, RecordId};
pub use layout::{FieldIndex, RecordType};
pub use list_sync::{ListElement, ReconcileReport};
pub use mod_file::{LoadState, ModFile};
pub use path::FieldPath;
pub use plugin::{FileStats, Plugin, PluginHeader};
pub use record::{Record, RecordState};
pub use group::Group;
pub use subrecord::Subrecord;
pub use utils::EspError;
pub use value::{FieldType, FieldValue};

// 常量定义
pub const SUPPORTED_EXTENSIONS: &[&str] = &["esp", "esm", "esl"];
