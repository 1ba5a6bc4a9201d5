/// IO 抽象层模块
///
/// 该模块提供了插件文件读写的抽象接口，集合通过它们访问磁盘，
/// 测试可以换成内存实现。
///
/// - **traits**: 定义 Reader/Writer trait 接口
/// - **esp_io**: 默认的文件系统实现（内存映射读取）与内存实现
pub mod traits;
pub mod esp_io;

// === 导出 trait 定义 ===
pub use traits::{EspBytes, EspReader, EspWriter, RawEspData};

// === 导出默认实现 ===
pub use esp_io::{DefaultEspReader, DefaultEspWriter, MemoryEspStore};
