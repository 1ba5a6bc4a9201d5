//! 标志位字段
//!
//! 标志位类型用 `bitflags` 定义，通过 [`Collection::flags`] / [`Collection::set_flag`]
//! 对某个整数字段做读-改-写。互斥的位组（例如魔法效果的投射类型）用实现
//! [`FlagGroup`] 的枚举表示，写入时只改动该组的掩码位。

use bitflags::Flags;

use crate::collection::Collection;
use crate::handle::RecordHandle;
use crate::layout::FieldKind;
use crate::path::FieldPath;
use crate::utils::EspError;
use crate::value::FieldValue;

bitflags::bitflags! {
    /// WEAP 标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WeaponFlags: u32 {
        const NOT_NORMAL_WEAPON = 0x0000_0001;
    }
}

bitflags::bitflags! {
    /// ARMO 部位标志中的附加位
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ArmorFlags: u32 {
        const HIDE_RINGS = 1 << 16;
        const HIDE_AMULET = 1 << 17;
        const NOT_PLAYABLE = 1 << 22;
        const HEAVY_ARMOR = 1 << 23;
    }
}

bitflags::bitflags! {
    /// MGEF 标志（投射类型见 [`ProjectileType`]）
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MagicEffectFlags: u32 {
        const HOSTILE = 1 << 0;
        const RECOVER = 1 << 1;
        const DETRIMENTAL = 1 << 2;
        const MAGNITUDE_PERCENT = 1 << 3;
        const SELF = 1 << 4;
        const TOUCH = 1 << 5;
        const TARGET = 1 << 6;
        const NO_DURATION = 1 << 7;
        const NO_MAGNITUDE = 1 << 8;
        const NO_AREA = 1 << 9;
        const FX_PERSIST = 1 << 10;
        const SPELLMAKING = 1 << 11;
        const ENCHANTING = 1 << 12;
        const NO_INGREDIENT = 1 << 13;
        const USE_WEAPON = 1 << 16;
        const USE_ARMOR = 1 << 17;
        const USE_CREATURE = 1 << 18;
        const USE_SKILL = 1 << 19;
        const USE_ATTRIBUTE = 1 << 20;
        const USE_ACTOR_VALUE = 1 << 24;
        const NO_HIT_EFFECT = 1 << 27;
    }
}

bitflags::bitflags! {
    /// SPEL 标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpellFlags: u32 {
        const NO_AUTO_CALC = 0x01;
        /// 同时占用第 1 位和第 3 位
        const IMMUNE_TO_SILENCE = 0x02 | 0x08;
        const START_SPELL = 0x04;
        const IGNORE_LOS = 0x10;
        const SCRIPT_EFFECT_ALWAYS_APPLIES = 0x20;
        const DISALLOW_ABSORB_REFLECT = 0x40;
        const TOUCH_EXPLODES_WITHOUT_TARGET = 0x80;
    }
}

bitflags::bitflags! {
    /// CELL 标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellFlags: u32 {
        const IS_INTERIOR = 0x01;
        const HAS_WATER = 0x02;
        const INVERT_FAST_TRAVEL = 0x04;
        const FORCE_HIDE_LAND = 0x08;
        const PUBLIC_PLACE = 0x20;
        const HAND_CHANGED = 0x40;
        const BEHAVE_LIKE_EXTERIOR = 0x80;
    }
}

bitflags::bitflags! {
    /// QUST 标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct QuestFlags: u32 {
        const START_GAME_ENABLED = 0x01;
        const REPEATED_TOPICS = 0x04;
        const REPEATED_STAGES = 0x08;
    }
}

bitflags::bitflags! {
    /// NPC_ 标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NpcFlags: u32 {
        const FEMALE = 1 << 0;
        const ESSENTIAL = 1 << 1;
        const RESPAWN = 1 << 3;
        const AUTO_CALC = 1 << 4;
        const PC_LEVEL_OFFSET = 1 << 7;
        const NO_LOW_LEVEL = 1 << 9;
        const NO_RUMORS = 1 << 13;
        const SUMMONABLE = 1 << 14;
        const NO_PERSUASION = 1 << 15;
        const CAN_CORPSE_CHECK = 1 << 20;
    }
}

bitflags::bitflags! {
    /// LVLI 标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LeveledFlags: u32 {
        const CALC_FROM_ALL_LEVELS = 0x01;
        const CALC_FOR_EACH_ITEM = 0x02;
        const USE_ALL = 0x04;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BookFlags: u32 {
        const IS_SCROLL = 0x01;
        const IS_FIXED = 0x02;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FactionFlags: u32 {
        const HIDDEN_FROM_PC = 0x01;
        const EVIL = 0x02;
        const SPECIAL_COMBAT = 0x04;
    }
}

/// 互斥位组：掩码内的位合起来只表示一个取值
pub trait FlagGroup: Sized + Copy {
    const MASK: u32;

    /// `bits` 已按 `MASK` 截取
    fn from_bits(bits: u32) -> Self;
    fn bits(self) -> u32;
}

/// MGEF 投射类型（第 25、26 位）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileType {
    Ball,
    Spray,
    Bolt,
    Fog,
}

const SPRAY_BIT: u32 = 1 << 25;
const BOLT_BIT: u32 = 1 << 26;

impl FlagGroup for ProjectileType {
    const MASK: u32 = SPRAY_BIT | BOLT_BIT;

    fn from_bits(bits: u32) -> Self {
        match (bits & SPRAY_BIT != 0, bits & BOLT_BIT != 0) {
            (false, false) => ProjectileType::Ball,
            (true, false) => ProjectileType::Spray,
            (false, true) => ProjectileType::Bolt,
            (true, true) => ProjectileType::Fog,
        }
    }

    fn bits(self) -> u32 {
        match self {
            ProjectileType::Ball => 0,
            ProjectileType::Spray => SPRAY_BIT,
            ProjectileType::Bolt => BOLT_BIT,
            ProjectileType::Fog => SPRAY_BIT | BOLT_BIT,
        }
    }
}

impl Collection {
    /// 读取整数字段的原始位；未设置时为 0
    fn flag_bits(&self, handle: RecordHandle, path: &FieldPath) -> Result<u32, EspError> {
        let record = self.record(handle)?;
        let desc = record.require_layout()?.resolve(path)?;
        if !matches!(desc.kind, FieldKind::UInt8 | FieldKind::UInt16 | FieldKind::UInt32) {
            return Err(EspError::KindMismatch {
                record_type: record.record_type,
                field: path.leaf(),
                expected: desc.kind.name(),
                found: "Flags",
            });
        }
        Ok(self
            .read(handle, path)?
            .and_then(|v| v.as_bits())
            .unwrap_or(0))
    }

    fn write_bits(&mut self, handle: RecordHandle, path: &FieldPath, bits: u32) -> Result<(), EspError> {
        let record = self.record(handle)?;
        let desc = record.require_layout()?.resolve(path)?;
        let value = FieldValue::from_bits(&desc.kind, bits).ok_or(EspError::KindMismatch {
            record_type: record.record_type,
            field: path.leaf(),
            expected: desc.kind.name(),
            found: "UInt32",
        })?;
        self.write(handle, path, value)
    }

    /// 以标志位类型读取（保留未定义的位）
    pub fn flags<F: Flags<Bits = u32>>(&self, handle: RecordHandle, path: &FieldPath) -> Result<F, EspError> {
        Ok(F::from_bits_retain(self.flag_bits(handle, path)?))
    }

    pub fn has_flag<F: Flags<Bits = u32>>(
        &self,
        handle: RecordHandle,
        path: &FieldPath,
        flag: F,
    ) -> Result<bool, EspError> {
        Ok(self.flags::<F>(handle, path)?.contains(flag))
    }

    /// 设置或清除一个标志，其余位不变
    pub fn set_flag<F: Flags<Bits = u32>>(
        &mut self,
        handle: RecordHandle,
        path: &FieldPath,
        flag: F,
        on: bool,
    ) -> Result<(), EspError> {
        let bits = self.flag_bits(handle, path)?;
        let bits = if on { bits | flag.bits() } else { bits & !flag.bits() };
        self.write_bits(handle, path, bits)
    }

    /// 整体替换字段的所有位
    pub fn set_flags<F: Flags<Bits = u32>>(
        &mut self,
        handle: RecordHandle,
        path: &FieldPath,
        flags: F,
    ) -> Result<(), EspError> {
        self.flag_bits(handle, path)?;
        self.write_bits(handle, path, flags.bits())
    }

    pub fn flag_group<G: FlagGroup>(&self, handle: RecordHandle, path: &FieldPath) -> Result<G, EspError> {
        Ok(G::from_bits(self.flag_bits(handle, path)? & G::MASK))
    }

    /// 写入互斥位组，只改动该组的掩码位
    pub fn set_flag_group<G: FlagGroup>(
        &mut self,
        handle: RecordHandle,
        path: &FieldPath,
        value: G,
    ) -> Result<(), EspError> {
        let bits = self.flag_bits(handle, path)?;
        self.write_bits(handle, path, (bits & !G::MASK) | value.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::{memory_collection, new_file};
    use crate::datatypes::RecordFlags;
    use crate::io::MemoryEspStore;
    use crate::layout::magic::{mgef, spel};
    use crate::layout::{RecordType, EDITOR_ID, FLAGS};

    fn record(kind: &[u8; 4]) -> (Collection, RecordHandle) {
        let store = MemoryEspStore::new();
        let mut c = memory_collection(&store);
        let f = new_file(&mut c, "Flags.esp");
        let h = c.create_record(f, RecordType::new(kind), None).unwrap();
        (c, h)
    }

    #[test]
    fn test_flags_are_independent() {
        let (mut c, h) = record(b"MGEF");
        let path = FieldPath::new(mgef::FLAGS);
        c.set_flag(h, &path, MagicEffectFlags::HOSTILE, true).unwrap();
        c.set_flag(h, &path, MagicEffectFlags::NO_AREA, true).unwrap();
        c.set_flag(h, &path, MagicEffectFlags::HOSTILE, false).unwrap();

        let flags = c.flags::<MagicEffectFlags>(h, &path).unwrap();
        assert_eq!(flags, MagicEffectFlags::NO_AREA);
        assert!(!c.has_flag(h, &path, MagicEffectFlags::HOSTILE).unwrap());
    }

    #[test]
    fn test_projectile_group_is_exclusive() {
        let (mut c, h) = record(b"MGEF");
        let path = FieldPath::new(mgef::FLAGS);
        c.set_flag(h, &path, MagicEffectFlags::SPELLMAKING, true).unwrap();
        assert_eq!(c.flag_group::<ProjectileType>(h, &path).unwrap(), ProjectileType::Ball);

        c.set_flag_group(h, &path, ProjectileType::Spray).unwrap();
        c.set_flag_group(h, &path, ProjectileType::Bolt).unwrap();
        assert_eq!(c.flag_group::<ProjectileType>(h, &path).unwrap(), ProjectileType::Bolt);
        let bits = c.get::<u32>(h, &path).unwrap().unwrap();
        assert_eq!(bits, BOLT_BIT | MagicEffectFlags::SPELLMAKING.bits());

        c.set_flag_group(h, &path, ProjectileType::Fog).unwrap();
        assert_eq!(c.flag_group::<ProjectileType>(h, &path).unwrap(), ProjectileType::Fog);
    }

    #[test]
    fn test_composite_spell_flag() {
        let (mut c, h) = record(b"SPEL");
        let path = FieldPath::new(spel::FLAGS);
        c.set_flag(h, &path, SpellFlags::IMMUNE_TO_SILENCE, true).unwrap();
        assert_eq!(c.get::<u8>(h, &path).unwrap(), Some(0x0A));
        c.set_flag(h, &path, SpellFlags::IMMUNE_TO_SILENCE, false).unwrap();
        assert_eq!(c.get::<u8>(h, &path).unwrap(), Some(0));
    }

    #[test]
    fn test_narrow_field_rejects_wide_bits() {
        let (mut c, h) = record(b"SPEL");
        let path = FieldPath::new(spel::FLAGS);
        let err = c.set_flag(h, &path, ArmorFlags::HEAVY_ARMOR, true).unwrap_err();
        assert!(matches!(err, EspError::KindMismatch { .. }));
        assert_eq!(c.get::<u8>(h, &path).unwrap(), None);
        assert!(matches!(
            c.flags::<SpellFlags>(h, &FieldPath::new(EDITOR_ID)),
            Err(EspError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_record_header_flags_keep_deleted() {
        let (mut c, h) = record(b"MISC");
        c.record_mut(h).unwrap().mark_deleted();
        c.set_flags(h, &FieldPath::new(FLAGS), RecordFlags::PERSISTENT).unwrap();
        let flags = c.flags::<RecordFlags>(h, &FieldPath::new(FLAGS)).unwrap();
        assert!(flags.contains(RecordFlags::PERSISTENT | RecordFlags::DELETED));
    }
}
