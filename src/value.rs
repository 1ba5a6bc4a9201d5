use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::datatypes::{read_f32, read_i32, read_u16, read_u32, read_u8, RawString};
use crate::form_id::FormId;
use crate::layout::FieldKind;

/// 字段值（标量）
///
/// FormID 总是以引擎短格式保存，编解码时按记录的主文件数量与磁盘约定互转。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum FieldValue {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Float32(f32),
    FormId(FormId),
    Text(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Int8(_) => "Int8",
            FieldValue::UInt8(_) => "UInt8",
            FieldValue::Int16(_) => "Int16",
            FieldValue::UInt16(_) => "UInt16",
            FieldValue::Int32(_) => "Int32",
            FieldValue::UInt32(_) => "UInt32",
            FieldValue::Float32(_) => "Float32",
            FieldValue::FormId(_) => "FormID",
            FieldValue::Text(_) => "Text",
            FieldValue::Bytes(_) => "Bytes",
        }
    }

    /// 值能否存入该类型的字段（定长字节块的长度另行检查）
    pub fn matches(&self, kind: &FieldKind) -> bool {
        matches!(
            (self, kind),
            (FieldValue::Int8(_), FieldKind::Int8)
                | (FieldValue::UInt8(_), FieldKind::UInt8)
                | (FieldValue::Int16(_), FieldKind::Int16)
                | (FieldValue::UInt16(_), FieldKind::UInt16)
                | (FieldValue::Int32(_), FieldKind::Int32)
                | (FieldValue::UInt32(_), FieldKind::UInt32)
                | (FieldValue::Float32(_), FieldKind::Float32)
                | (FieldValue::FormId(_), FieldKind::FormId)
                | (FieldValue::Text(_), FieldKind::Text)
                | (FieldValue::Bytes(_), FieldKind::Bytes)
                | (FieldValue::Bytes(_), FieldKind::FixedBytes(_))
        )
    }

    /// 无符号整数值（标志位读写用）
    pub fn as_bits(&self) -> Option<u32> {
        match self {
            FieldValue::UInt8(v) => Some(*v as u32),
            FieldValue::UInt16(v) => Some(*v as u32),
            FieldValue::UInt32(v) => Some(*v),
            _ => None,
        }
    }

    /// 按字段宽度构造无符号整数值，放不下时返回 `None`
    pub fn from_bits(kind: &FieldKind, bits: u32) -> Option<FieldValue> {
        match kind {
            FieldKind::UInt8 => u8::try_from(bits).ok().map(FieldValue::UInt8),
            FieldKind::UInt16 => u16::try_from(bits).ok().map(FieldValue::UInt16),
            FieldKind::UInt32 => Some(FieldValue::UInt32(bits)),
            _ => None,
        }
    }

    /// 编码为子记录数据
    pub fn encode(&self, master_count: usize) -> Vec<u8> {
        match self {
            FieldValue::Int8(v) => v.to_le_bytes().to_vec(),
            FieldValue::UInt8(v) => vec![*v],
            FieldValue::Int16(v) => v.to_le_bytes().to_vec(),
            FieldValue::UInt16(v) => v.to_le_bytes().to_vec(),
            FieldValue::Int32(v) => v.to_le_bytes().to_vec(),
            FieldValue::UInt32(v) => v.to_le_bytes().to_vec(),
            FieldValue::Float32(v) => v.to_le_bytes().to_vec(),
            FieldValue::FormId(v) => v.to_disk(master_count).to_le_bytes().to_vec(),
            FieldValue::Text(s) => RawString::encode_zstring(s),
            FieldValue::Bytes(b) => b.clone(),
        }
    }

    /// 按字段类型解码，数据长度不符时返回 `None`
    pub fn decode(kind: &FieldKind, data: &[u8], master_count: usize) -> Option<FieldValue> {
        let mut cursor = Cursor::new(data);
        let exact = |n: usize| data.len() == n;
        let value = match kind {
            FieldKind::Int8 if exact(1) => FieldValue::Int8(read_u8(&mut cursor).ok()? as i8),
            FieldKind::UInt8 if exact(1) => FieldValue::UInt8(read_u8(&mut cursor).ok()?),
            FieldKind::Int16 if exact(2) => FieldValue::Int16(read_u16(&mut cursor).ok()? as i16),
            FieldKind::UInt16 if exact(2) => FieldValue::UInt16(read_u16(&mut cursor).ok()?),
            FieldKind::Int32 if exact(4) => FieldValue::Int32(read_i32(&mut cursor).ok()?),
            FieldKind::UInt32 if exact(4) => FieldValue::UInt32(read_u32(&mut cursor).ok()?),
            FieldKind::Float32 if exact(4) => FieldValue::Float32(read_f32(&mut cursor).ok()?),
            FieldKind::FormId if exact(4) => {
                FieldValue::FormId(FormId::from_disk(read_u32(&mut cursor).ok()?, master_count))
            }
            FieldKind::Text => FieldValue::Text(RawString::parse_zstring(data).content),
            FieldKind::Bytes => FieldValue::Bytes(data.to_vec()),
            FieldKind::FixedBytes(n) if exact(*n) => FieldValue::Bytes(data.to_vec()),
            _ => return None,
        };
        Some(value)
    }

    /// 可变地访问其中的 FormID
    pub fn form_id_mut(&mut self) -> Option<&mut FormId> {
        match self {
            FieldValue::FormId(id) => Some(id),
            _ => None,
        }
    }
}

/// 可与 [`FieldValue`] 互转的 Rust 类型，用于类型化读写
pub trait FieldType: Sized {
    const KIND_NAME: &'static str;

    fn accepts(kind: &FieldKind) -> bool;
    fn from_value(value: &FieldValue) -> Option<Self>;
    fn into_value(self) -> FieldValue;
}

macro_rules! scalar_field_type {
    ($ty:ty, $variant:ident, $kind:ident) => {
        impl FieldType for $ty {
            const KIND_NAME: &'static str = stringify!($variant);

            fn accepts(kind: &FieldKind) -> bool {
                matches!(kind, FieldKind::$kind)
            }

            fn from_value(value: &FieldValue) -> Option<Self> {
                match value {
                    FieldValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }

            fn into_value(self) -> FieldValue {
                FieldValue::$variant(self)
            }
        }
    };
}

scalar_field_type!(i8, Int8, Int8);
scalar_field_type!(u8, UInt8, UInt8);
scalar_field_type!(i16, Int16, Int16);
scalar_field_type!(u16, UInt16, UInt16);
scalar_field_type!(i32, Int32, Int32);
scalar_field_type!(u32, UInt32, UInt32);
scalar_field_type!(f32, Float32, Float32);
scalar_field_type!(FormId, FormId, FormId);

impl FieldType for String {
    const KIND_NAME: &'static str = "Text";

    fn accepts(kind: &FieldKind) -> bool {
        matches!(kind, FieldKind::Text)
    }

    fn from_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> FieldValue {
        FieldValue::Text(self)
    }
}

impl FieldType for Vec<u8> {
    const KIND_NAME: &'static str = "Bytes";

    fn accepts(kind: &FieldKind) -> bool {
        matches!(kind, FieldKind::Bytes | FieldKind::FixedBytes(_))
    }

    fn from_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> FieldValue {
        FieldValue::Bytes(self)
    }
}

impl<const N: usize> FieldType for [u8; N] {
    const KIND_NAME: &'static str = "FixedBytes";

    fn accepts(kind: &FieldKind) -> bool {
        matches!(kind, FieldKind::FixedBytes(n) if *n == N)
    }

    fn from_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bytes(b) => b.as_slice().try_into().ok(),
            _ => None,
        }
    }

    fn into_value(self) -> FieldValue {
        FieldValue::Bytes(self.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_wrong_width() {
        assert_eq!(FieldValue::decode(&FieldKind::UInt32, &[1, 0, 0], 0), None);
        assert_eq!(FieldValue::decode(&FieldKind::FixedBytes(3), &[0; 4], 0), None);
        assert_eq!(
            FieldValue::decode(&FieldKind::Int16, &(-5i16).to_le_bytes(), 0),
            Some(FieldValue::Int16(-5))
        );
    }

    #[test]
    fn test_form_id_uses_disk_convention() {
        // 1 个主文件：磁盘上自身索引为 1
        let own = FieldValue::FormId(FormId::from_raw(0x0000_0801));
        assert_eq!(own.encode(1), 0x0100_0801u32.to_le_bytes().to_vec());
        assert_eq!(FieldValue::decode(&FieldKind::FormId, &0x0100_0801u32.to_le_bytes(), 1), Some(own));
    }

    #[test]
    fn test_text_is_zero_terminated() {
        let bytes = FieldValue::Text("Iron".into()).encode(0);
        assert_eq!(bytes, b"Iron\0");
        assert_eq!(FieldValue::decode(&FieldKind::Text, &bytes, 0), Some(FieldValue::Text("Iron".into())));
    }

    #[test]
    fn test_bits_respect_width() {
        assert_eq!(FieldValue::from_bits(&FieldKind::UInt8, 0x1FF), None);
        assert_eq!(FieldValue::from_bits(&FieldKind::UInt16, 0x1FF), Some(FieldValue::UInt16(0x1FF)));
        assert_eq!(FieldValue::UInt8(0x0A).as_bits(), Some(0x0A));
        assert_eq!(FieldValue::Int32(1).as_bits(), None);
    }

    #[test]
    fn test_field_type_accepts() {
        assert!(<[u8; 3]>::accepts(&FieldKind::FixedBytes(3)));
        assert!(!<[u8; 4]>::accepts(&FieldKind::FixedBytes(3)));
        assert!(!u32::accepts(&FieldKind::UInt16));
        assert_eq!(<[u8; 2]>::from_value(&FieldValue::Bytes(vec![1, 2])), Some([1, 2]));
    }
}
