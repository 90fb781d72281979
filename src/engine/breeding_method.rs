// ==========================================
// 奶牛选配系统 - 下次配种方式
// ==========================================
// 规则: 按已配次数索引配种方式列表（最多4项）
//       配次超出列表长度时沿用最后一项
// ==========================================

use crate::config::strategy_profile::GroupStrategy;
use crate::domain::semen::BreedingMethod;
use crate::domain::warning::AllocationWarning;

/// 配种方式列表上限
pub const MAX_METHODS: usize = 4;

/// 按配次排列的配种方式
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodSchedule {
    methods: Vec<BreedingMethod>,
}

impl MethodSchedule {
    pub fn new(methods: Vec<BreedingMethod>) -> Self {
        Self { methods }
    }

    /// 从分组策略构建
    ///
    /// 超过4项截断；无法识别的方式跳过；均记告警
    pub fn from_strategy(strategy: &GroupStrategy) -> (Self, Vec<AllocationWarning>) {
        let mut warnings = Vec::new();
        let mut methods = Vec::new();

        for raw in &strategy.methods {
            match BreedingMethod::parse(raw) {
                Some(m) => methods.push(m),
                None => warnings.push(AllocationWarning::StrategyAdjusted {
                    group_label: strategy.group_label.clone(),
                    message: format!("无法识别的配种方式: {}", raw),
                }),
            }
        }

        if methods.len() > MAX_METHODS {
            warnings.push(AllocationWarning::StrategyAdjusted {
                group_label: strategy.group_label.clone(),
                message: format!("配种方式共 {} 项，仅保留前 {} 项", methods.len(), MAX_METHODS),
            });
            methods.truncate(MAX_METHODS);
        }

        (Self { methods }, warnings)
    }

    pub fn methods(&self) -> &[BreedingMethod] {
        &self.methods
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// 选出下次配种所用的方式
///
/// `schedule[min(prior_service_count, len - 1)]`；空列表返回 None
pub fn next_breeding_method(
    prior_service_count: u32,
    schedule: &MethodSchedule,
) -> Option<&BreedingMethod> {
    let last = schedule.methods.len().checked_sub(1)?;
    let idx = usize::try_from(prior_service_count).unwrap_or(usize::MAX).min(last);
    schedule.methods.get(idx)
}
