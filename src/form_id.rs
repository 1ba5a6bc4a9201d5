//! FormID 编解码
//!
//! 引擎内部统一使用"短格式"：高 8 位是主文件索引，低 24 位是对象索引。
//! 索引 0 表示文件自身，1..=N 依次对应该文件的第 1..N 个主文件。
//!
//! 磁盘上的约定与之不同（主文件在前，自身索引等于主文件数量），
//! 由 [`FormId::to_disk`] / [`FormId::from_disk`] 在读写边界上转换。
//!
//! "长格式" [`LongFormId`] 用文件名代替索引，可以在不同文件之间比较。

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::utils::EspError;

/// 对象索引掩码（低 24 位）
pub const OBJECT_INDEX_MASK: u32 = 0x00FF_FFFF;

/// 单个文件最多可声明的主文件数量
pub const MAX_MASTERS: usize = 254;

/// 新分配对象索引的起点（更低的索引保留给引擎）
pub const FIRST_OBJECT_INDEX: u32 = 0x800;

/// 轻量级插件可用的最大对象索引
pub const LIGHT_MAX_OBJECT_INDEX: u32 = 0xFFF;

/// 短格式 FormID（引擎约定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(u32);

impl FormId {
    /// 空引用
    pub const NONE: FormId = FormId(0);

    pub fn new(master_index: u8, object_index: u32) -> Result<Self, EspError> {
        if object_index > OBJECT_INDEX_MASK {
            return Err(EspError::ObjectIndexOverflow(object_index));
        }
        Ok(FormId(((master_index as u32) << 24) | object_index))
    }

    pub const fn from_raw(raw: u32) -> Self {
        FormId(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn master_index(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn object_index(self) -> u32 {
        self.0 & OBJECT_INDEX_MASK
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// 转换为磁盘约定
    pub fn to_disk(self, master_count: usize) -> u32 {
        if self.is_none() {
            return 0;
        }
        let disk_index = match self.master_index() as usize {
            0 => master_count,
            index => index - 1,
        };
        ((disk_index as u32) << 24) | self.object_index()
    }

    /// 从磁盘约定转换
    ///
    /// 超出主文件列表的索引视为文件自身。
    pub fn from_disk(raw: u32, master_count: usize) -> Self {
        if raw == 0 {
            return FormId::NONE;
        }
        let disk_index = (raw >> 24) as usize;
        let object = raw & OBJECT_INDEX_MASK;
        if disk_index >= master_count {
            FormId(object)
        } else {
            FormId(((disk_index as u32 + 1) << 24) | object)
        }
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "None")
        } else {
            write!(f, "{:08X}", self.0)
        }
    }
}

/// 插件文件名（比较时不区分大小写）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasterName(String);

impl MasterName {
    pub fn new(name: impl Into<String>) -> Self {
        MasterName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn folded(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl PartialEq for MasterName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for MasterName {}

impl PartialEq<str> for MasterName {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Hash for MasterName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.folded() {
            state.write_u8(b);
        }
    }
}

impl PartialOrd for MasterName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MasterName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl fmt::Display for MasterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MasterName {
    fn from(value: &str) -> Self {
        MasterName(value.to_string())
    }
}

impl From<String> for MasterName {
    fn from(value: String) -> Self {
        MasterName(value)
    }
}

/// 长格式 FormID：(定义文件名, 对象索引)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LongFormId {
    pub master: MasterName,
    object: u32,
}

impl LongFormId {
    pub fn new(master: impl Into<MasterName>, object: u32) -> Result<Self, EspError> {
        if object > OBJECT_INDEX_MASK {
            return Err(EspError::ObjectIndexOverflow(object));
        }
        Ok(LongFormId { master: master.into(), object })
    }

    pub fn object_index(&self) -> u32 {
        self.object
    }
}

impl fmt::Display for LongFormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}|{}", self.object, self.master)
    }
}

impl FromStr for LongFormId {
    type Err = EspError;

    /// 解析 `0001A2B3|Oblivion.esm` 形式的文本
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hex, master) = s
            .split_once('|')
            .ok_or_else(|| EspError::InvalidFormId(s.to_string()))?;
        let hex = hex.trim();
        let hex = hex
            .strip_prefix("0x")
            .or_else(|| hex.strip_prefix("0X"))
            .unwrap_or(hex);
        let object = u32::from_str_radix(hex, 16)
            .map_err(|_| EspError::InvalidFormId(s.to_string()))?;
        let master = master.trim();
        if master.is_empty() {
            return Err(EspError::InvalidFormId(s.to_string()));
        }
        LongFormId::new(master, object)
    }
}

/// 提供 FormID 转换所需的文件上下文：文件名与主文件列表
pub trait MasterList {
    fn file_name(&self) -> &MasterName;
    fn masters(&self) -> &[MasterName];
}

/// 可追加主文件的上下文
pub trait MasterListMut: MasterList {
    fn push_master(&mut self, master: MasterName);
}

/// 短格式 → 长格式
///
/// 空引用或索引超出主文件列表时返回 `None`。
pub fn resolve<C: MasterList + ?Sized>(ctx: &C, short: FormId) -> Option<LongFormId> {
    if short.is_none() {
        return None;
    }
    let master = match short.master_index() as usize {
        0 => ctx.file_name().clone(),
        index => ctx.masters().get(index - 1)?.clone(),
    };
    Some(LongFormId { master, object: short.object_index() })
}

/// 长格式 → 短格式（只读）
pub fn lookup<C: MasterList + ?Sized>(ctx: &C, long: &LongFormId) -> Option<FormId> {
    if &long.master == ctx.file_name() {
        return Some(FormId(long.object));
    }
    ctx.masters()
        .iter()
        .position(|m| m == &long.master)
        .map(|pos| FormId((((pos + 1) as u32) << 24) | long.object))
}

/// 长格式 → 短格式，必要时把定义文件追加为新的主文件
pub fn unresolve<C: MasterListMut + ?Sized>(ctx: &mut C, long: &LongFormId) -> Result<FormId, EspError> {
    if let Some(short) = lookup(ctx, long) {
        return Ok(short);
    }
    if ctx.masters().len() >= MAX_MASTERS {
        return Err(EspError::TooManyMasters(ctx.file_name().to_string()));
    }
    ctx.push_master(long.master.clone());
    let index = ctx.masters().len() as u32;
    Ok(FormId((index << 24) | long.object))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestFile {
        name: MasterName,
        masters: Vec<MasterName>,
    }

    impl MasterList for TestFile {
        fn file_name(&self) -> &MasterName {
            &self.name
        }
        fn masters(&self) -> &[MasterName] {
            &self.masters
        }
    }

    impl MasterListMut for TestFile {
        fn push_master(&mut self, master: MasterName) {
            self.masters.push(master);
        }
    }

    fn file_b() -> TestFile {
        TestFile {
            name: "B.esp".into(),
            masters: vec!["A.esm".into()],
        }
    }

    #[test]
    fn test_resolve_self_and_master() {
        let b = file_b();
        assert_eq!(
            resolve(&b, FormId::from_raw(0x0000_0801)),
            Some(LongFormId::new("B.esp", 0x801).unwrap())
        );
        assert_eq!(
            resolve(&b, FormId::from_raw(0x0100_0801)),
            Some(LongFormId::new("A.esm", 0x801).unwrap())
        );
        assert_eq!(resolve(&b, FormId::NONE), None);
        assert_eq!(resolve(&b, FormId::from_raw(0x0500_0001)), None);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let b = file_b();
        let long = LongFormId::new("a.ESM", 0x14).unwrap();
        assert_eq!(lookup(&b, &long), Some(FormId::from_raw(0x0100_0014)));
        assert_eq!(lookup(&b, &LongFormId::new("C.esp", 1).unwrap()), None);
    }

    #[test]
    fn test_unresolve_appends_master() {
        let mut b = file_b();
        let long = LongFormId::new("C.esp", 0x900).unwrap();
        let short = unresolve(&mut b, &long).unwrap();
        assert_eq!(short, FormId::from_raw(0x0200_0900));
        assert_eq!(b.masters.len(), 2);
        // 再次转换不会重复追加
        assert_eq!(unresolve(&mut b, &long).unwrap(), short);
        assert_eq!(b.masters.len(), 2);
        assert_eq!(resolve(&b, short), Some(long));
    }

    #[test]
    fn test_too_many_masters() {
        let mut f = TestFile {
            name: "Big.esp".into(),
            masters: (0..MAX_MASTERS).map(|i| MasterName::new(format!("M{i}.esm"))).collect(),
        };
        let err = unresolve(&mut f, &LongFormId::new("Extra.esm", 1).unwrap()).unwrap_err();
        assert!(matches!(err, EspError::TooManyMasters(_)));
    }

    #[test]
    fn test_disk_conversion() {
        // 磁盘上：主文件 0 = A.esm，自身 = 1
        assert_eq!(FormId::from_disk(0x0000_0014, 1), FormId::from_raw(0x0100_0014));
        assert_eq!(FormId::from_disk(0x0100_0801, 1), FormId::from_raw(0x0000_0801));
        assert_eq!(FormId::from_disk(0, 1), FormId::NONE);

        assert_eq!(FormId::from_raw(0x0100_0014).to_disk(1), 0x0000_0014);
        assert_eq!(FormId::from_raw(0x0000_0801).to_disk(1), 0x0100_0801);
        assert_eq!(FormId::NONE.to_disk(3), 0);
    }

    #[test]
    fn test_object_index_overflow() {
        assert!(matches!(FormId::new(0, 0x0100_0000), Err(EspError::ObjectIndexOverflow(_))));
        assert!(LongFormId::new("A.esm", 0x0100_0000).is_err());
    }

    #[test]
    fn test_long_form_id_text() {
        let long: LongFormId = "0001A2B3|Oblivion.esm".parse().unwrap();
        assert_eq!(long.object_index(), 0x01A2B3);
        assert_eq!(long.to_string(), "0001A2B3|Oblivion.esm");
        assert!("nonsense".parse::<LongFormId>().is_err());
        assert!("XYZ|A.esm".parse::<LongFormId>().is_err());
    }

    #[test]
    fn test_short_display() {
        assert_eq!(FormId::from_raw(0x0100_0801).to_string(), "01000801");
        assert_eq!(FormId::NONE.to_string(), "None");
    }
}
