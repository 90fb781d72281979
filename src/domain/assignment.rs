// ==========================================
// 奶牛选配系统 - 分配结果
// ==========================================
// AssignmentRow: 每头母牛一行，常规/性控各最多3选
// SireUsage / RoundStats / AllocationSummary: 汇总报表
// ==========================================

use crate::domain::types::{CommitPass, SemenCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 每个冻精类型的最大选择轮数
pub const MAX_ROUNDS: usize = 3;

// ==========================================
// AssignmentPick - 单个选择
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentPick {
    pub sire_id: String,
    pub offspring_score: f64,
    pub inbreeding_coefficient: f64,
    pub pass: CommitPass, // Advisory 表示无真实库存支撑
}

impl AssignmentPick {
    pub fn is_advisory(&self) -> bool {
        self.pass.is_advisory()
    }
}

// ==========================================
// AssignmentRow - 母牛分配行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRow {
    pub animal_id: String,
    pub group_label: String,
    pub rank_score: Option<f64>,
    pub planned_method: Option<String>,
    pub conventional: [Option<AssignmentPick>; MAX_ROUNDS],
    pub sexed: [Option<AssignmentPick>; MAX_ROUNDS],
}

impl AssignmentRow {
    pub fn new(animal_id: &str, group_label: &str, rank_score: Option<f64>) -> Self {
        Self {
            animal_id: animal_id.to_string(),
            group_label: group_label.to_string(),
            rank_score,
            planned_method: None,
            conventional: Default::default(),
            sexed: Default::default(),
        }
    }

    pub fn picks(&self, category: SemenCategory) -> &[Option<AssignmentPick>; MAX_ROUNDS] {
        match category {
            SemenCategory::Conventional => &self.conventional,
            SemenCategory::Sexed => &self.sexed,
        }
    }

    fn picks_mut(&mut self, category: SemenCategory) -> &mut [Option<AssignmentPick>; MAX_ROUNDS] {
        match category {
            SemenCategory::Conventional => &mut self.conventional,
            SemenCategory::Sexed => &mut self.sexed,
        }
    }

    /// 某冻精类型下是否已分配过该公牛
    pub fn has_sire(&self, category: SemenCategory, sire_id: &str) -> bool {
        self.picks(category)
            .iter()
            .flatten()
            .any(|p| p.sire_id == sire_id)
    }

    /// 写入第 round 选（1 起）
    ///
    /// 已写入的格子不可覆盖；同类型重复公牛拒绝写入
    pub fn commit(&mut self, category: SemenCategory, round: usize, pick: AssignmentPick) -> bool {
        if round == 0 || round > MAX_ROUNDS || self.has_sire(category, &pick.sire_id) {
            return false;
        }
        let slot = &mut self.picks_mut(category)[round - 1];
        if slot.is_some() {
            return false;
        }
        *slot = Some(pick);
        true
    }

    pub fn pick(&self, category: SemenCategory, round: usize) -> Option<&AssignmentPick> {
        if round == 0 || round > MAX_ROUNDS {
            return None;
        }
        self.picks(category)[round - 1].as_ref()
    }

    /// 所有非空选择
    pub fn all_picks(&self) -> impl Iterator<Item = (SemenCategory, usize, &AssignmentPick)> {
        SemenCategory::ALL.into_iter().flat_map(move |category| {
            self.picks(category)
                .iter()
                .enumerate()
                .filter_map(move |(idx, p)| p.as_ref().map(|p| (category, idx + 1, p)))
        })
    }
}

// ==========================================
// SireUsage - 公牛冻精使用汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SireUsage {
    pub sire_id: String,
    pub category: SemenCategory,
    pub initial_doses: u32,
    pub consumed: u32,
    pub remaining: u32,
    pub advisory_picks: u32, // 兜底推荐次数（不扣减库存）
}

// ==========================================
// RoundStats - 按组/类型/轮次统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStats {
    pub group_label: String,
    pub category: SemenCategory,
    pub round: usize,
    /// 有库存支撑的选择
    pub strict: usize,
    /// 兜底推荐（不扣减库存）
    pub advisory: usize,
    /// 参与本类型但两遍都没有候选
    pub unassigned: usize,
    /// 下次配种方式不属于本类型而跳过（仅 restrict_to_planned_category 开启时）
    #[serde(default)]
    pub skipped: usize,
}

impl RoundStats {
    /// 本轮涉及的母牛总数
    pub fn total(&self) -> usize {
        self.strict + self.advisory + self.unassigned + self.skipped
    }
}

// ==========================================
// AllocationSummary - 分配汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub groups: Vec<String>,
    pub animals_allocated: usize,
    pub round_stats: Vec<RoundStats>,
    pub sire_usage: Vec<SireUsage>,
    pub warning_count: usize,
}

impl AllocationSummary {
    /// 按 (类型, 轮次) 合计未分配数量
    pub fn unassigned_total(&self, category: SemenCategory, round: usize) -> usize {
        self.round_stats
            .iter()
            .filter(|s| s.category == category && s.round == round)
            .map(|s| s.unassigned)
            .sum()
    }

    pub fn strict_total(&self) -> usize {
        self.round_stats.iter().map(|s| s.strict).sum()
    }

    pub fn advisory_total(&self) -> usize {
        self.round_stats.iter().map(|s| s.advisory).sum()
    }
}
