//! 列表同步
//!
//! 把某个列表字段调整为期望的元素序列：先从末尾删除多余元素，再在末尾追加缺少的元素，
//! 最后逐个重置并写入每个元素。增删失败时立即停止，不进入写入阶段。

use crate::collection::Collection;
use crate::fields::FieldSet;
use crate::handle::RecordHandle;
use crate::layout::FieldIndex;
use crate::path::FieldPath;
use crate::utils::EspError;
use crate::value::FieldType;

/// 列表元素：能把自身写入元素字段，也能从元素字段读回
pub trait ListElement: Sized {
    fn write_fields(&self, writer: &mut ElementWriter<'_>) -> Result<(), EspError>;
    fn read_fields(reader: &ElementReader<'_>) -> Result<Self, EspError>;
}

/// 列表同步所需的底层操作
pub trait ListEngine {
    fn element_count(&self) -> Result<usize, EspError>;
    /// 在末尾追加空元素
    fn create_element(&mut self) -> Result<usize, EspError>;
    /// 删除最后一个元素
    fn delete_element(&mut self) -> Result<(), EspError>;
    /// 重置并写入下标处的元素
    fn write_element<T: ListElement>(&mut self, index: usize, value: &T) -> Result<(), EspError>;
}

/// 一次同步的操作统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub deleted: usize,
    pub written: usize,
}

/// 把列表调整为 `desired`
pub fn reconcile<E: ListEngine, T: ListElement>(engine: &mut E, desired: &[T]) -> Result<ReconcileReport, EspError> {
    let current = engine.element_count()?;
    let mut report = ReconcileReport::default();
    let stop = |completed: usize, e: EspError| EspError::ListReconcile {
        completed,
        source: Box::new(e),
    };

    if current > desired.len() {
        for _ in desired.len()..current {
            engine
                .delete_element()
                .map_err(|e| stop(report.deleted, e))?;
            report.deleted += 1;
        }
    } else {
        for _ in current..desired.len() {
            engine
                .create_element()
                .map_err(|e| stop(report.created, e))?;
            report.created += 1;
        }
    }

    for (index, value) in desired.iter().enumerate() {
        engine.write_element(index, value)?;
        report.written += 1;
    }
    Ok(report)
}

/// 绑定到集合中某条记录某个列表字段的同步实现
pub struct CollectionList<'a> {
    collection: &'a mut Collection,
    handle: RecordHandle,
    path: FieldPath,
}

impl<'a> CollectionList<'a> {
    pub fn new(collection: &'a mut Collection, handle: RecordHandle, path: FieldPath) -> Self {
        CollectionList { collection, handle, path }
    }
}

impl ListEngine for CollectionList<'_> {
    fn element_count(&self) -> Result<usize, EspError> {
        self.collection.list_len(self.handle, &self.path)
    }

    fn create_element(&mut self) -> Result<usize, EspError> {
        self.collection.create_element(self.handle, &self.path)
    }

    fn delete_element(&mut self) -> Result<(), EspError> {
        self.collection.delete_element(self.handle, &self.path)
    }

    /// 元素先清空再逐字段写入；任一字段失败时恢复原内容
    fn write_element<T: ListElement>(&mut self, index: usize, value: &T) -> Result<(), EspError> {
        let previous = self
            .collection
            .replace_element(self.handle, &self.path, index, FieldSet::default())?;
        let mut writer = ElementWriter {
            collection: self.collection,
            handle: self.handle,
            path: &self.path,
            index,
        };
        if let Err(e) = value.write_fields(&mut writer) {
            self.collection
                .replace_element(self.handle, &self.path, index, previous)?;
            return Err(e);
        }
        Ok(())
    }
}

/// 写入单个列表元素的字段
pub struct ElementWriter<'a> {
    collection: &'a mut Collection,
    handle: RecordHandle,
    path: &'a FieldPath,
    index: usize,
}

impl ElementWriter<'_> {
    pub fn set<T: FieldType>(&mut self, field: FieldIndex, value: T) -> Result<(), EspError> {
        let path = self.path.element(self.index, field);
        self.collection.set(self.handle, &path, value)
    }

    /// `None` 时保持字段未设置
    pub fn set_opt<T: FieldType>(&mut self, field: FieldIndex, value: Option<T>) -> Result<(), EspError> {
        match value {
            Some(v) => self.set(field, v),
            None => Ok(()),
        }
    }

    /// 同步嵌套列表
    pub fn list<U: ListElement>(&mut self, field: FieldIndex, desired: &[U]) -> Result<ReconcileReport, EspError> {
        let path = self.path.element(self.index, field);
        reconcile(&mut CollectionList::new(self.collection, self.handle, path), desired)
    }
}

/// 读取单个列表元素的字段
pub struct ElementReader<'a> {
    collection: &'a Collection,
    handle: RecordHandle,
    path: &'a FieldPath,
    index: usize,
}

impl ElementReader<'_> {
    pub fn get<T: FieldType>(&self, field: FieldIndex) -> Result<Option<T>, EspError> {
        self.collection
            .get(self.handle, &self.path.element(self.index, field))
    }

    /// 必须存在的字段
    pub fn require<T: FieldType>(&self, field: FieldIndex) -> Result<T, EspError> {
        self.get(field)?.ok_or(EspError::MissingField { field })
    }

    /// 读取嵌套列表
    pub fn list<U: ListElement>(&self, field: FieldIndex) -> Result<Vec<U>, EspError> {
        self.collection
            .read_list(self.handle, &self.path.element(self.index, field))
    }
}

impl Collection {
    /// 读取列表字段的全部元素
    pub fn read_list<T: ListElement>(&self, handle: RecordHandle, path: &FieldPath) -> Result<Vec<T>, EspError> {
        let len = self.list_len(handle, path)?;
        (0..len)
            .map(|index| {
                T::read_fields(&ElementReader {
                    collection: self,
                    handle,
                    path,
                    index,
                })
            })
            .collect()
    }

    /// 把列表字段同步为 `desired`
    pub fn write_list<T: ListElement>(
        &mut self,
        handle: RecordHandle,
        path: &FieldPath,
        desired: &[T],
    ) -> Result<ReconcileReport, EspError> {
        self.list_len(handle, path)?;
        let report = reconcile(&mut CollectionList::new(self, handle, path.clone()), desired)?;
        tracing::debug!(
            "{} 列表 {} 同步: +{} -{} 写入 {}",
            handle,
            path,
            report.created,
            report.deleted,
            report.written
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::{memory_collection, new_file};
    use crate::elements::ContainerItem;
    use crate::form_id::FormId;
    use crate::io::MemoryEspStore;
    use crate::layout::actors::cont;
    use crate::layout::RecordType;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Create,
        Delete,
        Write(usize),
    }

    /// 只记录操作的列表
    struct FakeList {
        len: usize,
        ops: Vec<Op>,
        fail_create_after: Option<usize>,
    }

    impl FakeList {
        fn new(len: usize) -> Self {
            FakeList { len, ops: Vec::new(), fail_create_after: None }
        }
    }

    impl ListEngine for FakeList {
        fn element_count(&self) -> Result<usize, EspError> {
            Ok(self.len)
        }

        fn create_element(&mut self) -> Result<usize, EspError> {
            let created = self.ops.iter().filter(|o| **o == Op::Create).count();
            if self.fail_create_after == Some(created) {
                return Err(EspError::ObjectIndexExhausted("fake".into()));
            }
            self.ops.push(Op::Create);
            self.len += 1;
            Ok(self.len - 1)
        }

        fn delete_element(&mut self) -> Result<(), EspError> {
            self.ops.push(Op::Delete);
            self.len -= 1;
            Ok(())
        }

        fn write_element<T: ListElement>(&mut self, index: usize, _value: &T) -> Result<(), EspError> {
            self.ops.push(Op::Write(index));
            Ok(())
        }
    }

    fn items(n: usize) -> Vec<ContainerItem> {
        (0..n)
            .map(|i| ContainerItem { item: FormId::from_raw(0x800 + i as u32), count: i as i32 + 1 })
            .collect()
    }

    #[test]
    fn test_shrink_issues_exact_deletes() {
        let mut list = FakeList::new(5);
        let report = reconcile(&mut list, &items(3)).unwrap();
        assert_eq!(report, ReconcileReport { created: 0, deleted: 2, written: 3 });
        assert_eq!(
            list.ops,
            vec![Op::Delete, Op::Delete, Op::Write(0), Op::Write(1), Op::Write(2)]
        );
    }

    #[test]
    fn test_grow_appends() {
        let mut list = FakeList::new(1);
        let report = reconcile(&mut list, &items(3)).unwrap();
        assert_eq!(report, ReconcileReport { created: 2, deleted: 0, written: 3 });
        assert_eq!(list.len, 3);
    }

    #[test]
    fn test_create_failure_stops_before_writes() {
        let mut list = FakeList::new(0);
        list.fail_create_after = Some(1);
        let err = reconcile(&mut list, &items(3)).unwrap_err();
        assert!(matches!(err, EspError::ListReconcile { completed: 1, .. }));
        assert_eq!(list.ops, vec![Op::Create]);
    }

    #[test]
    fn test_collection_roundtrip() {
        let store = MemoryEspStore::new();
        let mut c = memory_collection(&store);
        let f = new_file(&mut c, "F.esp");
        let h = c.create_record(f, RecordType::new(b"CONT"), None).unwrap();
        let path = FieldPath::new(cont::ITEMS);

        c.write_list(h, &path, &items(5)).unwrap();
        let report = c.write_list(h, &path, &items(3)).unwrap();
        assert_eq!(report.deleted, 2);
        assert_eq!(c.list_len(h, &path).unwrap(), 3);
        assert_eq!(c.read_list::<ContainerItem>(h, &path).unwrap(), items(3));

        c.write_list::<ContainerItem>(h, &path, &[]).unwrap();
        assert_eq!(c.list_len(h, &path).unwrap(), 0);
    }

    #[test]
    fn test_write_list_rejects_scalar() {
        let store = MemoryEspStore::new();
        let mut c = memory_collection(&store);
        let f = new_file(&mut c, "F.esp");
        let h = c.create_record(f, RecordType::new(b"CONT"), None).unwrap();
        let err = c.write_list(h, &FieldPath::new(cont::WEIGHT), &items(1)).unwrap_err();
        assert!(matches!(err, EspError::KindMismatch { .. }));
    }

    /// 写入数量后因类型错误失败的元素
    struct HalfWritten {
        count: i32,
    }

    impl ListElement for HalfWritten {
        fn write_fields(&self, w: &mut ElementWriter<'_>) -> Result<(), EspError> {
            w.set(crate::layout::common::item::COUNT, self.count)?;
            w.set(crate::layout::common::item::ITEM, 1.0f32)
        }

        fn read_fields(r: &ElementReader<'_>) -> Result<Self, EspError> {
            Ok(HalfWritten { count: r.require(crate::layout::common::item::COUNT)? })
        }
    }

    #[test]
    fn test_failed_element_write_keeps_old_content() {
        let store = MemoryEspStore::new();
        let mut c = memory_collection(&store);
        let f = new_file(&mut c, "F.esp");
        let h = c.create_record(f, RecordType::new(b"CONT"), None).unwrap();
        let path = FieldPath::new(cont::ITEMS);
        c.write_list(h, &path, &items(2)).unwrap();

        let err = c.write_list(h, &path, &[HalfWritten { count: 99 }]).unwrap_err();
        assert!(matches!(err, EspError::KindMismatch { .. }));
        assert_eq!(c.read_list::<ContainerItem>(h, &path).unwrap(), items(1));
    }
}
