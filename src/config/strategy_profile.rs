use serde::{Deserialize, Serialize};

/// 分组配种策略（持久化对象）
///
/// 存储位置：config_kv（scope_id='global'，key='strategy/{group_label}'）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStrategy {
    /// 分组标签（与育种指数表中的分组一致）
    pub group_label: String,

    /// 按配种次数排列的配种方式（第1次、第2次……，最多4项）
    ///
    /// 例如 ["性控", "性控", "常规", "肉牛"]
    #[serde(default)]
    pub methods: Vec<String>,

    /// 说明（可选）
    #[serde(default)]
    pub description: Option<String>,
}

impl GroupStrategy {
    pub fn new(group_label: &str, methods: &[&str]) -> Self {
        Self {
            group_label: group_label.to_string(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            description: None,
        }
    }
}
