use crate::datatypes::{read_u16, read_u32};
use crate::utils::EspError;
use std::io::{Cursor, Read};

/// 超长子记录的前缀标签：其 4 字节数据给出下一个子记录的真实长度
pub const XXXX: [u8; 4] = *b"XXXX";

/// 子记录结构
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subrecord {
    /// 4字符标签（原始字节）
    pub tag: [u8; 4],
    /// 原始数据
    pub data: Vec<u8>,
}

impl Subrecord {
    pub fn new(tag: [u8; 4], data: Vec<u8>) -> Self {
        Subrecord { tag, data }
    }

    /// 解析子记录
    ///
    /// `size_override` 来自前一个 XXXX 子记录。
    pub fn parse(cursor: &mut Cursor<&[u8]>, size_override: Option<u32>) -> Result<Self, EspError> {
        // 检查是否有足够的数据读取头部
        if cursor.position() + 6 > cursor.get_ref().len() as u64 {
            return Err(EspError::Malformed("Insufficient data for subrecord header".into()));
        }

        let mut tag = [0u8; 4];
        cursor.read_exact(&mut tag)?;
        let header_size = read_u16(cursor)? as u32;
        let size = size_override.unwrap_or(header_size);

        // 检查是否有足够的数据
        if cursor.position() + size as u64 > cursor.get_ref().len() as u64 {
            return Err(EspError::Malformed(format!(
                "Insufficient data for subrecord {}: expected {} bytes",
                String::from_utf8_lossy(&tag),
                size
            )));
        }

        let mut data = vec![0u8; size as usize];
        cursor.read_exact(&mut data)?;

        Ok(Subrecord { tag, data })
    }

    /// 解析记录数据中的全部子记录
    pub fn parse_stream(data: &[u8]) -> Result<Vec<Subrecord>, EspError> {
        let mut subrecords = Vec::new();
        let mut cursor = Cursor::new(data);
        let mut size_override = None;

        while cursor.position() < data.len() as u64 {
            let remaining = data.len() as u64 - cursor.position();

            // 子记录最小头部大小为 6 字节，不足时只允许是 NULL 填充
            if remaining < 6 {
                let remaining_bytes = &data[cursor.position() as usize..];
                if remaining_bytes.iter().all(|&b| b == 0) {
                    tracing::trace!("跳过 {} 字节的 NULL 填充", remaining);
                    break;
                }
                return Err(EspError::Malformed(format!(
                    "记录末尾有 {} 字节非 NULL 数据，无法解析为子记录: {:02X?}",
                    remaining, remaining_bytes
                )));
            }

            let pos_before = cursor.position();
            let subrecord = Subrecord::parse(&mut cursor, size_override.take()).map_err(|e| {
                tracing::warn!(
                    position = pos_before,
                    parsed = subrecords.len(),
                    "子记录解析失败: {}",
                    e
                );
                e
            })?;

            if subrecord.tag == XXXX && subrecord.data.len() == 4 {
                let mut size_cursor = Cursor::new(subrecord.data.as_slice());
                size_override = Some(read_u32(&mut size_cursor)?);
                continue;
            }
            subrecords.push(subrecord);
        }

        Ok(subrecords)
    }

    /// 写出子记录，超过 65535 字节时先写 XXXX 前缀
    pub fn write_to(tag: &[u8; 4], data: &[u8], out: &mut Vec<u8>) {
        if data.len() > u16::MAX as usize {
            out.extend_from_slice(&XXXX);
            out.extend_from_slice(&4u16.to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(tag);
            out.extend_from_slice(&0u16.to_le_bytes());
        } else {
            out.extend_from_slice(tag);
            out.extend_from_slice(&(data.len() as u16).to_le_bytes());
        }
        out.extend_from_slice(data);
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        Self::write_to(&self.tag, &self.data, out);
    }

    /// 获取子记录标签字符串
    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag).into_owned()
    }
}
