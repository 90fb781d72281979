// ==========================================
// 奶牛选配系统 - 冻精库存
// ==========================================
// 职责: 按 (公牛, 冻精类型) 维护剩余支数
// 红线: try_consume 是唯一的扣减入口；剩余数永不为负
// 并发: 运行期间由分配引擎独占 (&mut)，扣减天然串行
// ==========================================

use crate::domain::semen::{LotKey, SemenLot};
use crate::domain::types::SemenCategory;
use crate::domain::warning::AllocationWarning;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct SireInventory {
    initial: BTreeMap<LotKey, u32>,
    remaining: BTreeMap<LotKey, u32>,
}

impl SireInventory {
    /// 从库存快照构建
    ///
    /// 负数归零并告警；超出 u32 的数量截断到 u32::MAX
    pub fn load<I>(counts: I) -> (Self, Vec<AllocationWarning>)
    where
        I: IntoIterator<Item = (LotKey, i64)>,
    {
        let mut warnings = Vec::new();
        let mut initial = BTreeMap::new();

        for ((sire_id, category), raw) in counts {
            let doses = if raw < 0 {
                warn!(sire_id = %sire_id, category = %category, raw, "库存为负，已归零");
                warnings.push(AllocationWarning::NegativeDosesClamped {
                    sire_id: sire_id.clone(),
                    category,
                    raw,
                });
                0
            } else {
                u32::try_from(raw).unwrap_or(u32::MAX)
            };
            *initial.entry((sire_id, category)).or_insert(0u32) = doses;
        }

        let inventory = Self {
            remaining: initial.clone(),
            initial,
        };
        (inventory, warnings)
    }

    /// 原子地“检查并扣减”一支
    ///
    /// 剩余 > 0 时扣减并返回 true；否则无副作用返回 false
    pub fn try_consume(&mut self, sire_id: &str, category: SemenCategory) -> bool {
        match self.remaining.get_mut(&(sire_id.to_string(), category)) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn remaining(&self, sire_id: &str, category: SemenCategory) -> u32 {
        self.remaining
            .get(&(sire_id.to_string(), category))
            .copied()
            .unwrap_or(0)
    }

    pub fn initial(&self, sire_id: &str, category: SemenCategory) -> u32 {
        self.initial
            .get(&(sire_id.to_string(), category))
            .copied()
            .unwrap_or(0)
    }

    pub fn contains(&self, sire_id: &str, category: SemenCategory) -> bool {
        self.remaining.contains_key(&(sire_id.to_string(), category))
    }

    /// 某类型下的全部公牛（含已用完的，按公牛号升序）
    pub fn sires(&self, category: SemenCategory) -> Vec<&str> {
        self.remaining
            .keys()
            .filter(|(_, c)| *c == category)
            .map(|(s, _)| s.as_str())
            .collect()
    }

    /// 当前剩余快照
    pub fn snapshot(&self) -> BTreeMap<LotKey, u32> {
        self.remaining.clone()
    }

    /// 初始快照
    pub fn initial_snapshot(&self) -> &BTreeMap<LotKey, u32> {
        &self.initial
    }

    pub fn lots(&self) -> Vec<SemenLot> {
        self.remaining
            .iter()
            .map(|((sire_id, category), left)| SemenLot {
                sire_id: sire_id.clone(),
                semen_category: *category,
                remaining_doses: *left,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}
