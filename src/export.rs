//! 记录导出为 JSON（字段名取自布局，FormID 显示为长格式）

use serde_json::{json, Map, Value};

use crate::collection::Collection;
use crate::fields::{FieldSet, Slot};
use crate::form_id::{self, FormId};
use crate::handle::RecordHandle;
use crate::layout::{FieldDescriptor, FieldKind};
use crate::mod_file::ModFile;
use crate::utils::EspError;
use crate::value::FieldValue;

impl Collection {
    /// 把记录导出为 JSON 对象
    pub fn record_json(&self, handle: RecordHandle) -> Result<Value, EspError> {
        let record = self.record(handle)?;
        let layout = record.require_layout()?;
        let file = self.file(handle.file)?;
        let long = self.long_form_id(handle)?;

        let mut out = Map::new();
        out.insert("type".into(), json!(record.record_type));
        out.insert("file".into(), json!(file.name().as_str()));
        out.insert("formID".into(), json!(self.display_long(&long)));
        out.insert("flags".into(), json!(record.flags));
        out.insert(
            "versionControl".into(),
            json!(((record.version_control_info as u32) << 16) | record.timestamp as u32),
        );

        let fields = record.fields()?;
        for (index, slot) in fields.slots() {
            let Some(desc) = layout.descriptor(index) else { continue };
            out.insert(desc.name.into(), self.slot_json(file, desc, slot));
        }
        if !fields.unknown().is_empty() {
            let tags: Vec<String> = fields
                .unknown()
                .iter()
                .map(|s| String::from_utf8_lossy(&s.tag).into_owned())
                .collect();
            out.insert("unknownSubrecords".into(), json!(tags));
        }
        Ok(Value::Object(out))
    }

    fn slot_json(&self, file: &ModFile, desc: &FieldDescriptor, slot: &Slot) -> Value {
        match (slot, &desc.kind) {
            (Slot::Value(value), _) => self.value_json(file, value),
            (Slot::List(items), FieldKind::List(element)) => Value::Array(
                items
                    .iter()
                    .map(|item| self.element_json(file, element, item))
                    .collect(),
            ),
            (Slot::List(items), _) => json!(items.len()),
        }
    }

    fn element_json(&self, file: &ModFile, element: &[FieldDescriptor], set: &FieldSet) -> Value {
        let mut out = Map::new();
        for (index, slot) in set.slots() {
            let Some(desc) = element.get(index) else { continue };
            out.insert(desc.name.into(), self.slot_json(file, desc, slot));
        }
        Value::Object(out)
    }

    fn value_json(&self, file: &ModFile, value: &FieldValue) -> Value {
        match value {
            FieldValue::FormId(id) => self.form_id_json(file, *id),
            FieldValue::Int8(v) => json!(v),
            FieldValue::UInt8(v) => json!(v),
            FieldValue::Int16(v) => json!(v),
            FieldValue::UInt16(v) => json!(v),
            FieldValue::Int32(v) => json!(v),
            FieldValue::UInt32(v) => json!(v),
            FieldValue::Float32(v) => json!(v),
            FieldValue::Text(s) => json!(s),
            FieldValue::Bytes(b) => json!(b.iter().map(|x| format!("{:02X}", x)).collect::<String>()),
        }
    }

    fn form_id_json(&self, file: &ModFile, id: FormId) -> Value {
        if id.is_none() {
            return Value::Null;
        }
        match form_id::resolve(file, id) {
            Some(long) => json!(self.display_long(&long)),
            // 主文件索引越界，保留原值
            None => json!(id.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::{memory_collection, new_file};
    use crate::elements::ContainerItem;
    use crate::io::MemoryEspStore;
    use crate::layout::actors::cont;
    use crate::layout::{RecordType, EDITOR_ID};
    use crate::path::FieldPath;

    #[test]
    fn test_record_json() {
        let store = MemoryEspStore::new();
        let mut c = memory_collection(&store);
        let a = new_file(&mut c, "A.esm");
        let b = new_file(&mut c, "B.esp");
        let misc = c.create_record(a, RecordType::new(b"MISC"), None).unwrap();
        let misc_long = c.long_form_id(misc).unwrap();

        let chest = c.create_record(b, RecordType::new(b"CONT"), None).unwrap();
        c.set::<String>(chest, &FieldPath::new(EDITOR_ID), "Chest01".into()).unwrap();
        let item = c.unresolve(b, &misc_long).unwrap();
        c.write_list(chest, &FieldPath::new(cont::ITEMS), &[ContainerItem { item, count: 3 }])
            .unwrap();

        let value = c.record_json(chest).unwrap();
        assert_eq!(value["type"], "CONT");
        assert_eq!(value["formID"], "00000800|B.esp");
        assert_eq!(value["eid"], "Chest01");
        assert_eq!(value["items"][0]["item"], "00000800|A.esm");
        assert_eq!(value["items"][0]["count"], 3);
    }
}
