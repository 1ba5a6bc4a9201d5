use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

// 基础整数类型读取函数
pub fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, std::io::Error> {
    cursor.read_u8()
}

pub fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, std::io::Error> {
    cursor.read_u16::<LittleEndian>()
}

pub fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, std::io::Error> {
    cursor.read_u32::<LittleEndian>()
}

pub fn read_i32(cursor: &mut Cursor<&[u8]>) -> Result<i32, std::io::Error> {
    cursor.read_i32::<LittleEndian>()
}

pub fn read_f32(cursor: &mut Cursor<&[u8]>) -> Result<f32, std::io::Error> {
    cursor.read_f32::<LittleEndian>()
}

// 支持的编码
const SUPPORTED_ENCODINGS: &[&str] = &["utf-8", "windows-1252", "windows-1250", "windows-1251"];

#[derive(Debug, Clone)]
pub struct RawString {
    pub content: String,
    pub encoding: String,
}

impl RawString {
    /// 尝试多种编码解码
    pub fn decode(data: &[u8]) -> Self {
        for encoding_name in SUPPORTED_ENCODINGS {
            if let Some(encoding) = encoding_rs::Encoding::for_label(encoding_name.as_bytes()) {
                let (decoded, _, had_errors) = encoding.decode(data);
                if !had_errors {
                    return RawString {
                        content: decoded.into_owned(),
                        encoding: encoding_name.to_string(),
                    };
                }
            }
        }

        // 回退到UTF-8，忽略错误
        RawString {
            content: String::from_utf8_lossy(data).into_owned(),
            encoding: "utf-8".to_string(),
        }
    }

    /// Z字符串解析(以null结尾)
    pub fn parse_zstring(data: &[u8]) -> Self {
        let null_pos = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        Self::decode(&data[..null_pos])
    }

    /// Z字符串编码（UTF-8）
    ///
    /// 解码时先尝试 UTF-8，因此写出的文本总能原样读回。
    pub fn encode_zstring(text: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        bytes
    }
}

// 记录标志位定义
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RecordFlags: u32 {
        const MASTER_FILE = 0x00000001;        // ESM标志
        const DELETED = 0x00000020;            // 已删除
        const LOCALIZED = 0x00000080;          // 本地化
        const LIGHT_MASTER = 0x00000200;       // 轻量级主文件
        const PERSISTENT = 0x00000400;         // 持久化
        const DISABLED = 0x00000800;           // 禁用
        const VISIBLE_DISTANT = 0x00008000;    // 远距离可见
        const COMPRESSED = 0x00040000;         // 压缩
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstring_roundtrip_ascii() {
        let bytes = RawString::encode_zstring("IronSword");
        assert_eq!(bytes.last(), Some(&0));
        assert_eq!(RawString::parse_zstring(&bytes).content, "IronSword");
    }

    #[test]
    fn test_zstring_utf8_exact() {
        // 看起来像 1252 误读结果的文本也必须原样保留
        for text in ["Café", "Ã©", "Меч"] {
            let bytes = RawString::encode_zstring(text);
            assert_eq!(&bytes[..bytes.len() - 1], text.as_bytes());
            assert_eq!(RawString::parse_zstring(&bytes).content, text);
        }
    }

    #[test]
    fn test_legacy_codepage_fallback() {
        // 游戏原文件中的 1252 单字节文本
        let raw = [b'C', b'a', b'f', 0xE9, 0];
        let decoded = RawString::parse_zstring(&raw);
        assert_eq!(decoded.content, "Café");
        assert_eq!(decoded.encoding, "windows-1252");
    }

    #[test]
    fn test_scalar_readers() {
        let mut out = Vec::new();
        out.extend_from_slice(&1.5f32.to_le_bytes());
        out.extend_from_slice(&7u16.to_le_bytes());
        let mut cursor = Cursor::new(out.as_slice());
        assert_eq!(read_f32(&mut cursor).unwrap(), 1.5);
        assert_eq!(read_u16(&mut cursor).unwrap(), 7);
    }
}
