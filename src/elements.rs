//! 常用列表元素的类型化表示
//!
//! 每个结构对应布局中的一种列表元素，配合 [`Collection::write_list`](crate::Collection::write_list)
//! 和 [`Collection::read_list`](crate::Collection::read_list) 使用。FormID 字段保存的是
//! 记录所在文件约定下的短格式。

use serde::{Deserialize, Serialize};

use crate::form_id::FormId;
use crate::layout::actors::{fact, lvli, npc};
use crate::layout::common::{condition, effect, form_id_element, item, script_effect};
use crate::layout::dialogue::{info, qust};
use crate::layout::FieldIndex;
use crate::list_sync::{ElementReader, ElementWriter, ListElement};
use crate::utils::EspError;

fn fixed<const N: usize>(reader: &ElementReader<'_>, field: FieldIndex) -> Result<Option<[u8; N]>, EspError> {
    let Some(bytes) = reader.get::<Vec<u8>>(field)? else {
        return Ok(None);
    };
    bytes
        .try_into()
        .map(Some)
        .map_err(|b: Vec<u8>| EspError::FixedSizeMismatch { expected: N, actual: b.len() })
}

fn zeros(writer: &mut ElementWriter<'_>, field: FieldIndex, len: usize) -> Result<(), EspError> {
    writer.set(field, vec![0u8; len])
}

/// 容器或 NPC 的物品条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerItem {
    pub item: FormId,
    pub count: i32,
}

impl ListElement for ContainerItem {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(item::ITEM, self.item)?;
        w.set(item::COUNT, self.count)
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        Ok(ContainerItem {
            item: r.require(item::ITEM)?,
            count: r.get(item::COUNT)?.unwrap_or(1),
        })
    }
}

/// 只含一个 FormID 的元素（法术表、AI 包、话题列表）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormIdEntry(pub FormId);

impl ListElement for FormIdEntry {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(form_id_element::VALUE, self.0)
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        r.require(form_id_element::VALUE).map(FormIdEntry)
    }
}

/// 升级列表条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeveledEntry {
    pub level: i16,
    pub list_id: FormId,
    pub count: i16,
}

impl ListElement for LeveledEntry {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(lvli::entry::LEVEL, self.level)?;
        zeros(w, lvli::entry::UNUSED1, 2)?;
        w.set(lvli::entry::LIST_ID, self.list_id)?;
        w.set(lvli::entry::COUNT, self.count)?;
        zeros(w, lvli::entry::UNUSED2, 2)
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        Ok(LeveledEntry {
            level: r.require(lvli::entry::LEVEL)?,
            list_id: r.require(lvli::entry::LIST_ID)?,
            count: r.get(lvli::entry::COUNT)?.unwrap_or(1),
        })
    }
}

/// 脚本效果附加数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEffect {
    pub script: FormId,
    pub school: u32,
    pub visual: [u8; 4],
    pub flags: u8,
    pub name: Option<String>,
}

impl ListElement for ScriptEffect {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(script_effect::SCRIPT, self.script)?;
        w.set(script_effect::SCHOOL, self.school)?;
        w.set(script_effect::VISUAL, self.visual.to_vec())?;
        w.set(script_effect::FLAGS, self.flags)?;
        zeros(w, script_effect::UNUSED1, 3)?;
        w.set_opt(script_effect::FULL, self.name.clone())
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        Ok(ScriptEffect {
            script: r.require(script_effect::SCRIPT)?,
            school: r.get(script_effect::SCHOOL)?.unwrap_or_default(),
            visual: fixed(r, script_effect::VISUAL)?.unwrap_or_default(),
            flags: r.get(script_effect::FLAGS)?.unwrap_or_default(),
            name: r.get(script_effect::FULL)?,
        })
    }
}

/// 法术、附魔等的效果条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    /// 四字符效果代码，如 `FIDG`
    pub name: [u8; 4],
    pub magnitude: u32,
    pub area: u32,
    pub duration: u32,
    pub range: u32,
    pub actor_value: i32,
    pub script_effect: Option<ScriptEffect>,
}

impl ListElement for Effect {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(effect::NAME, self.name.to_vec())?;
        w.set(effect::MAGNITUDE, self.magnitude)?;
        w.set(effect::AREA, self.area)?;
        w.set(effect::DURATION, self.duration)?;
        w.set(effect::RANGE, self.range)?;
        w.set(effect::ACTOR_VALUE, self.actor_value)?;
        let script: Vec<ScriptEffect> = self.script_effect.iter().cloned().collect();
        w.list(effect::SCRIPT_EFFECT, &script)?;
        Ok(())
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        Ok(Effect {
            name: fixed(r, effect::NAME)?.ok_or(EspError::MissingField { field: effect::NAME })?,
            magnitude: r.get(effect::MAGNITUDE)?.unwrap_or_default(),
            area: r.get(effect::AREA)?.unwrap_or_default(),
            duration: r.get(effect::DURATION)?.unwrap_or_default(),
            range: r.get(effect::RANGE)?.unwrap_or_default(),
            actor_value: r.get(effect::ACTOR_VALUE)?.unwrap_or(-1),
            script_effect: r.list::<ScriptEffect>(effect::SCRIPT_EFFECT)?.into_iter().next(),
        })
    }
}

/// 条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// 比较运算符与标志位
    pub operator: u8,
    pub value: f32,
    pub function: u32,
    pub param1: FormId,
    pub param2: u32,
}

impl ListElement for Condition {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(condition::OPERATOR, self.operator)?;
        zeros(w, condition::UNUSED1, 3)?;
        w.set(condition::VALUE, self.value)?;
        w.set(condition::FUNCTION, self.function)?;
        w.set(condition::PARAM1, self.param1)?;
        w.set(condition::PARAM2, self.param2)?;
        zeros(w, condition::UNUSED2, 4)
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        Ok(Condition {
            operator: r.get(condition::OPERATOR)?.unwrap_or_default(),
            value: r.get(condition::VALUE)?.unwrap_or_default(),
            function: r.require(condition::FUNCTION)?,
            param1: r.get(condition::PARAM1)?.unwrap_or(FormId::NONE),
            param2: r.get(condition::PARAM2)?.unwrap_or_default(),
        })
    }
}

/// 任务日志条目
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogEntry {
    pub flags: u8,
    pub conditions: Vec<Condition>,
    pub text: Option<String>,
    pub script_text: Option<String>,
}

impl ListElement for LogEntry {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(qust::entry::FLAGS, self.flags)?;
        w.list(qust::entry::CONDITIONS, &self.conditions)?;
        w.set_opt(qust::entry::TEXT, self.text.clone())?;
        w.set_opt(qust::entry::SCRIPT_TEXT, self.script_text.clone())
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        Ok(LogEntry {
            flags: r.get(qust::entry::FLAGS)?.unwrap_or_default(),
            conditions: r.list(qust::entry::CONDITIONS)?,
            text: r.get(qust::entry::TEXT)?,
            script_text: r.get(qust::entry::SCRIPT_TEXT)?,
        })
    }
}

/// 任务阶段
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestStage {
    pub stage: i16,
    pub entries: Vec<LogEntry>,
}

impl ListElement for QuestStage {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(qust::stage::STAGE, self.stage)?;
        w.list(qust::stage::ENTRIES, &self.entries)?;
        Ok(())
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        Ok(QuestStage {
            stage: r.require(qust::stage::STAGE)?,
            entries: r.list(qust::stage::ENTRIES)?,
        })
    }
}

/// 任务目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestTarget {
    pub target: FormId,
    pub flags: u8,
    pub conditions: Vec<Condition>,
}

impl ListElement for QuestTarget {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(qust::target::TARGET, self.target)?;
        w.set(qust::target::FLAGS, self.flags)?;
        zeros(w, qust::target::UNUSED1, 3)?;
        w.list(qust::target::CONDITIONS, &self.conditions)?;
        Ok(())
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        Ok(QuestTarget {
            target: r.require(qust::target::TARGET)?,
            flags: r.get(qust::target::FLAGS)?.unwrap_or_default(),
            conditions: r.list(qust::target::CONDITIONS)?,
        })
    }
}

/// 派系等级
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionRank {
    pub rank: i32,
    pub male: Option<String>,
    pub female: Option<String>,
    pub insignia: Option<String>,
}

impl ListElement for FactionRank {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(fact::rank::RANK, self.rank)?;
        w.set_opt(fact::rank::MALE, self.male.clone())?;
        w.set_opt(fact::rank::FEMALE, self.female.clone())?;
        w.set_opt(fact::rank::INSIGNIA, self.insignia.clone())
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        Ok(FactionRank {
            rank: r.require(fact::rank::RANK)?,
            male: r.get(fact::rank::MALE)?,
            female: r.get(fact::rank::FEMALE)?,
            insignia: r.get(fact::rank::INSIGNIA)?,
        })
    }
}

/// 派系间关系
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionRelation {
    pub faction: FormId,
    pub modifier: i32,
}

impl ListElement for FactionRelation {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(fact::relation::FACTION, self.faction)?;
        w.set(fact::relation::MODIFIER, self.modifier)
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        Ok(FactionRelation {
            faction: r.require(fact::relation::FACTION)?,
            modifier: r.get(fact::relation::MODIFIER)?.unwrap_or_default(),
        })
    }
}

/// NPC 所属派系
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorFaction {
    pub faction: FormId,
    pub rank: u8,
}

impl ListElement for ActorFaction {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(npc::faction::FACTION, self.faction)?;
        w.set(npc::faction::RANK, self.rank)?;
        zeros(w, npc::faction::UNUSED1, 3)
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        Ok(ActorFaction {
            faction: r.require(npc::faction::FACTION)?,
            rank: r.get(npc::faction::RANK)?.unwrap_or_default(),
        })
    }
}

/// 对话回应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueResponse {
    pub emotion_type: u32,
    pub emotion_value: i32,
    pub response_number: u8,
    pub text: String,
    pub actor_notes: Option<String>,
}

impl ListElement for DialogueResponse {
    fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
        w.set(info::response::EMOTION_TYPE, self.emotion_type)?;
        w.set(info::response::EMOTION_VALUE, self.emotion_value)?;
        zeros(w, info::response::UNUSED1, 4)?;
        w.set(info::response::RESPONSE_NUMBER, self.response_number)?;
        zeros(w, info::response::UNUSED2, 3)?;
        w.set(info::response::TEXT, self.text.clone())?;
        w.set_opt(info::response::ACTOR_NOTES, self.actor_notes.clone())
    }

    fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
        Ok(DialogueResponse {
            emotion_type: r.get(info::response::EMOTION_TYPE)?.unwrap_or_default(),
            emotion_value: r.get(info::response::EMOTION_VALUE)?.unwrap_or_default(),
            response_number: r.get(info::response::RESPONSE_NUMBER)?.unwrap_or(1),
            text: r.get(info::response::TEXT)?.unwrap_or_default(),
            actor_notes: r.get(info::response::ACTOR_NOTES)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::{memory_collection, new_file};
    use crate::io::MemoryEspStore;
    use crate::layout::magic::spel;
    use crate::layout::RecordType;
    use crate::path::FieldPath;

    fn cond(function: u32) -> Condition {
        Condition { operator: 0x20, value: 1.0, function, param1: FormId::NONE, param2: 0 }
    }

    fn entry(text: &str, conditions: usize) -> LogEntry {
        LogEntry {
            flags: 1,
            conditions: (0..conditions as u32).map(cond).collect(),
            text: Some(text.into()),
            script_text: None,
        }
    }

    #[test]
    fn test_quest_three_levels() {
        let store = MemoryEspStore::new();
        let mut c = memory_collection(&store);
        let f = new_file(&mut c, "Q.esp");
        let h = c.create_record(f, RecordType::new(b"QUST"), None).unwrap();
        let stages_path = FieldPath::new(qust::STAGES);

        let mut stages = vec![
            QuestStage { stage: 10, entries: vec![entry("开始", 3), entry("备选", 1)] },
            QuestStage { stage: 20, entries: vec![entry("结束", 2)] },
        ];
        c.write_list(h, &stages_path, &stages).unwrap();
        assert_eq!(c.read_list::<QuestStage>(h, &stages_path).unwrap(), stages);

        // 缩短最内层，删除一个日志条目
        stages[0].entries[0].conditions.truncate(1);
        stages[0].entries.pop();
        c.write_list(h, &stages_path, &stages).unwrap();
        assert_eq!(c.read_list::<QuestStage>(h, &stages_path).unwrap(), stages);

        let conditions = stages_path
            .element(0, qust::stage::ENTRIES)
            .at(0, qust::entry::CONDITIONS);
        assert_eq!(c.list_len(h, &conditions).unwrap(), 1);
        let padding = conditions.element(0, condition::UNUSED2);
        assert_eq!(c.get::<Vec<u8>>(h, &padding).unwrap(), Some(vec![0; 4]));
    }

    #[test]
    fn test_effect_with_script_effect() {
        let store = MemoryEspStore::new();
        let mut c = memory_collection(&store);
        let f = new_file(&mut c, "S.esp");
        let h = c.create_record(f, RecordType::new(b"SPEL"), None).unwrap();
        let path = FieldPath::new(spel::EFFECTS);

        let effects = vec![
            Effect {
                name: *b"FIDG",
                magnitude: 5,
                area: 0,
                duration: 30,
                range: 0,
                actor_value: -1,
                script_effect: None,
            },
            Effect {
                name: *b"SEFF",
                magnitude: 0,
                area: 0,
                duration: 10,
                range: 1,
                actor_value: -1,
                script_effect: Some(ScriptEffect {
                    script: FormId::from_raw(0x0000_0900),
                    school: 3,
                    visual: *b"LITE",
                    flags: 1,
                    name: Some("Blessing".into()),
                }),
            },
        ];
        c.write_list(h, &path, &effects).unwrap();
        assert_eq!(c.read_list::<Effect>(h, &path).unwrap(), effects);

        // 去掉脚本效果后子列表清空
        let plain: Vec<Effect> = effects
            .iter()
            .cloned()
            .map(|e| Effect { script_effect: None, ..e })
            .collect();
        c.write_list(h, &path, &plain).unwrap();
        assert_eq!(
            c.list_len(h, &path.element(1, effect::SCRIPT_EFFECT)).unwrap(),
            0
        );
    }

    #[test]
    fn test_actor_factions_and_missing_field() {
        let store = MemoryEspStore::new();
        let mut c = memory_collection(&store);
        let f = new_file(&mut c, "N.esp");
        let h = c.create_record(f, RecordType::new(b"NPC_"), None).unwrap();
        let path = FieldPath::new(npc::FACTIONS);

        let factions = vec![ActorFaction { faction: FormId::from_raw(0x801), rank: 2 }];
        c.write_list(h, &path, &factions).unwrap();
        assert_eq!(c.read_list::<ActorFaction>(h, &path).unwrap(), factions);

        c.create_element(h, &path).unwrap();
        let err = c.read_list::<ActorFaction>(h, &path).unwrap_err();
        assert!(matches!(err, EspError::MissingField { field: npc::faction::FACTION }));
    }
}
