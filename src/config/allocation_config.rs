// ==========================================
// 奶牛选配系统 - 分配运行配置
// ==========================================
// 每次运行显式传入，不使用全局单例
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::strategy_profile::GroupStrategy;
use crate::domain::assignment::MAX_ROUNDS;
use crate::domain::types::InbreedingThreshold;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

// ==========================================
// AllocationConfig - 分配配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// 近交系数上限
    pub inbreeding_threshold: InbreedingThreshold,

    /// 是否控制隐性基因（开启后不安全/数据缺失的组合不参与分配）
    pub control_defect_genes: bool,

    /// 本次处理的分组；未选中的分组在结果库中保持不变
    pub selected_groups: Vec<String>,

    /// 每个冻精类型的选择轮数（1..=3）
    pub rounds: usize,

    /// 库存耗尽后是否给出兜底推荐（不扣减库存，单独标记）
    pub advisory_fallback: bool,

    /// 是否只在下次配种方式对应的冻精类型中分配
    pub restrict_to_planned_category: bool,

    /// 分组配种策略
    pub strategies: Vec<GroupStrategy>,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            inbreeding_threshold: InbreedingThreshold::default(),
            control_defect_genes: false,
            selected_groups: Vec::new(),
            rounds: MAX_ROUNDS,
            advisory_fallback: true,
            restrict_to_planned_category: false,
            strategies: Vec::new(),
        }
    }
}

impl AllocationConfig {
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// 有效轮数（钳制到 1..=3）
    pub fn effective_rounds(&self) -> usize {
        self.rounds.clamp(1, MAX_ROUNDS)
    }

    /// 去重、去空白后的分组集合
    pub fn selected_group_set(&self) -> BTreeSet<String> {
        self.selected_groups
            .iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect()
    }

    pub fn strategy_for(&self, group_label: &str) -> Option<&GroupStrategy> {
        self.strategies.iter().find(|s| s.group_label == group_label)
    }

    /// 校验配置（返回问题描述）
    pub fn validate(&self) -> Result<(), String> {
        if self.selected_group_set().is_empty() {
            return Err("未选择任何分组".to_string());
        }
        if self.rounds == 0 || self.rounds > MAX_ROUNDS {
            return Err(format!("选择轮数必须在 1..={} 之间，实际: {}", MAX_ROUNDS, self.rounds));
        }
        let mut seen = BTreeSet::new();
        for s in &self.strategies {
            if !seen.insert(s.group_label.as_str()) {
                return Err(format!("分组策略重复: {}", s.group_label));
            }
        }
        Ok(())
    }
}
