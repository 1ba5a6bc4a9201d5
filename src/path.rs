use std::fmt;

use crate::layout::FieldIndex;

/// 列表最多嵌套三层（列表 / 子列表 / 子子列表）
pub const MAX_LIST_DEPTH: usize = 3;

/// 路径中的一级：列表元素下标 + 元素内字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathStep {
    pub index: usize,
    pub field: FieldIndex,
}

/// 字段路径
///
/// `FieldPath::new(ITEMS).at(2, COUNT)` 表示顶层字段 `ITEMS` 的第 2 个元素中的 `COUNT`。
/// 路径本身不做校验，深度和字段是否存在在使用时对照布局检查。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    root: FieldIndex,
    steps: Vec<PathStep>,
}

impl FieldPath {
    pub fn new(root: FieldIndex) -> Self {
        FieldPath { root, steps: Vec::new() }
    }

    /// 进入列表的某个元素
    pub fn at(mut self, index: usize, field: FieldIndex) -> Self {
        self.steps.push(PathStep { index, field });
        self
    }

    /// 同 [`at`](Self::at)，但不消耗自身
    pub fn element(&self, index: usize, field: FieldIndex) -> Self {
        self.clone().at(index, field)
    }

    pub fn root(&self) -> FieldIndex {
        self.root
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// 经过的列表层数
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// 末端字段索引
    pub fn leaf(&self) -> FieldIndex {
        self.steps.last().map(|s| s.field).unwrap_or(self.root)
    }

    pub fn is_top_level(&self) -> bool {
        self.steps.is_empty()
    }
}

impl From<FieldIndex> for FieldPath {
    fn from(root: FieldIndex) -> Self {
        FieldPath::new(root)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for step in &self.steps {
            write!(f, "[{}].{}", step.index, step.field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_building() {
        let path = FieldPath::new(10).at(1, 1).at(0, 2);
        assert_eq!(path.depth(), 2);
        assert_eq!(path.leaf(), 2);
        assert_eq!(path.to_string(), "10[1].1[0].2");
        assert!(FieldPath::from(4).is_top_level());
    }
}
