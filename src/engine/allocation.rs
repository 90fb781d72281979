// ==========================================
// 奶牛选配系统 - 冻精分配引擎
// ==========================================
// 流程（每个分组、每个冻精类型独立）:
//   1. 组内母牛按育种指数降序（稳定）
//   2. 第 1..=N 选: 逐头母牛构建候选公牛
//      - 排除本类型已分配过的公牛
//      - 近交系数 ≤ 阈值；开启隐性基因控制时仅保留 Safe
//      - 后代得分降序，同分按公牛号升序
//   3. 第一遍（严格）: 依次 try_consume，成功即定
//   4. 第二遍（兜底）: 第一遍未分到的母牛取首个合格候选，不扣库存，标记 ADVISORY
// 红线: 引擎不直接改库存计数；取消只在两头母牛之间生效
// ==========================================

use crate::config::allocation_config::AllocationConfig;
use crate::domain::animal::Animal;
use crate::domain::assignment::{AssignmentPick, AssignmentRow, RoundStats, SireUsage};
use crate::domain::compatibility::CompatibilityRecord;
use crate::domain::semen::LotKey;
use crate::domain::types::{CommitPass, SemenCategory};
use crate::domain::warning::AllocationWarning;
use crate::engine::breeding_method::{next_breeding_method, MethodSchedule};
use crate::engine::catalog::AnimalCatalog;
use crate::engine::error::{AllocationError, AllocationResult};
use crate::engine::inventory::SireInventory;
use crate::engine::oracle::CompatibilityOracle;
use crate::engine::progress::CancellationToken;
use crate::i18n::t_with_args;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

// ==========================================
// AllocationRun - 一次分配的产出（尚未落库）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct AllocationRun {
    pub groups: Vec<String>,
    pub rows: Vec<AssignmentRow>,
    pub round_stats: Vec<RoundStats>,
    pub advisory_picks: BTreeMap<LotKey, u32>,
    pub warnings: Vec<AllocationWarning>,
}

impl AllocationRun {
    /// 按公牛/类型汇总冻精使用情况
    ///
    /// consumed = 初始 - 剩余（仅第一遍扣减）；兜底推荐单独计数
    pub fn sire_usage(&self, inventory: &SireInventory) -> Vec<SireUsage> {
        inventory
            .initial_snapshot()
            .iter()
            .map(|((sire_id, category), initial)| {
                let remaining = inventory.remaining(sire_id, *category);
                SireUsage {
                    sire_id: sire_id.clone(),
                    category: *category,
                    initial_doses: *initial,
                    consumed: initial.saturating_sub(remaining),
                    remaining,
                    advisory_picks: self
                        .advisory_picks
                        .get(&(sire_id.clone(), *category))
                        .copied()
                        .unwrap_or(0),
                }
            })
            .collect()
    }
}

/// 候选公牛
#[derive(Debug, Clone)]
struct Candidate {
    sire_id: String,
    record: CompatibilityRecord,
}

impl Candidate {
    fn to_pick(&self, pass: CommitPass) -> AssignmentPick {
        AssignmentPick {
            sire_id: self.sire_id.clone(),
            offspring_score: self.record.offspring_score,
            inbreeding_coefficient: self.record.inbreeding_coefficient,
            pass,
        }
    }
}

/// 一次运行中的共享状态
struct RunState<'a> {
    inventory: &'a mut SireInventory,
    oracle: &'a dyn CompatibilityOracle,
    config: &'a AllocationConfig,
    cancel: &'a CancellationToken,
    gaps: BTreeSet<(String, String)>,
    run: AllocationRun,
}

impl RunState<'_> {
    fn check_cancel(&self) -> AllocationResult<()> {
        if self.cancel.is_cancelled() {
            return Err(AllocationError::Cancelled);
        }
        Ok(())
    }

    fn push_warning(&mut self, warning: AllocationWarning) {
        warn!(kind = warning.kind(), "{}", warning);
        self.run.warnings.push(warning);
    }
}

// ==========================================
// AllocationEngine - 分配引擎（无状态）
// ==========================================
pub struct AllocationEngine;

impl AllocationEngine {
    pub fn new() -> Self {
        Self
    }

    /// 执行分配
    ///
    /// # 参数
    /// - catalog: 母牛名册
    /// - inventory: 冻精库存（运行期间独占，会被扣减）
    /// - oracle: 相容性查询
    /// - config: 本次运行配置（所选分组、阈值、隐性基因控制等）
    /// - cancel: 取消令牌
    /// - on_group: 每个分组开始前回调 (序号, 分组总数, 分组名)
    ///
    /// # 返回
    /// 分配行 + 轮次统计 + 告警；取消时返回 Cancelled
    #[instrument(skip_all, fields(groups = config.selected_groups.len()))]
    pub fn perform_allocation(
        &self,
        catalog: &AnimalCatalog,
        inventory: &mut SireInventory,
        oracle: &dyn CompatibilityOracle,
        config: &AllocationConfig,
        cancel: &CancellationToken,
        on_group: &mut dyn FnMut(usize, usize, &str),
    ) -> AllocationResult<AllocationRun> {
        config.validate().map_err(AllocationError::InvalidConfig)?;

        let selected = config.selected_group_set();
        let groups = catalog.partition_by_group(&selected);

        let mut state = RunState {
            inventory,
            oracle,
            config,
            cancel,
            gaps: BTreeSet::new(),
            run: AllocationRun {
                groups: selected.iter().cloned().collect(),
                ..Default::default()
            },
        };

        // 库存中有、矩阵中完全没有的公牛
        let mut unknown = BTreeSet::new();
        for category in SemenCategory::ALL {
            for sire in state.inventory.sires(category) {
                if !oracle.knows_sire(sire) {
                    unknown.insert(sire.to_string());
                }
            }
        }
        for sire_id in unknown {
            state.push_warning(AllocationWarning::SireWithoutCompatibility { sire_id });
        }

        for label in selected.iter().filter(|g| !groups.contains_key(*g)) {
            info!(group = %label, "所选分组无可分配母牛");
        }

        let total = groups.len();
        for (idx, (label, members)) in groups.iter().enumerate() {
            state.check_cancel()?;
            on_group(idx, total, label);

            let schedule = match config.strategy_for(label) {
                Some(strategy) => {
                    let (schedule, warnings) = MethodSchedule::from_strategy(strategy);
                    for w in warnings {
                        state.push_warning(w);
                    }
                    Some(schedule)
                }
                None => None,
            };

            self.allocate_group(label, members, schedule.as_ref(), &mut state)?;
        }

        Ok(state.run)
    }

    /// 单个分组的分配
    #[instrument(skip_all, fields(group = %group_label, animals = members.len()))]
    fn allocate_group(
        &self,
        group_label: &str,
        members: &[&Animal],
        schedule: Option<&MethodSchedule>,
        state: &mut RunState<'_>,
    ) -> AllocationResult<()> {
        // 无矩阵数据的母牛不参与排序
        let mut animals: Vec<&Animal> = Vec::with_capacity(members.len());
        for animal in members {
            if state.oracle.knows_animal(&animal.animal_id) {
                animals.push(*animal);
            } else {
                state.push_warning(AllocationWarning::AnimalWithoutCompatibility {
                    animal_id: animal.animal_id.clone(),
                });
            }
        }

        let mut rows: Vec<AssignmentRow> = Vec::with_capacity(animals.len());
        let mut allowed: Vec<Vec<SemenCategory>> = Vec::with_capacity(animals.len());
        for animal in &animals {
            let mut row = AssignmentRow::new(&animal.animal_id, group_label, animal.rank_score);
            let method = schedule.and_then(|s| next_breeding_method(animal.prior_service_count, s));
            if let Some(m) = method {
                row.planned_method = Some(m.label.clone());
            }
            // 按计划类型限定时，肉牛/无类型的母牛不参与奶牛冻精分配
            let categories = match (state.config.restrict_to_planned_category, method) {
                (true, Some(m)) => m.category.into_iter().collect(),
                _ => SemenCategory::ALL.to_vec(),
            };
            rows.push(row);
            allowed.push(categories);
        }

        let rounds = state.config.effective_rounds();
        for category in SemenCategory::ALL {
            let pool: Vec<String> = state
                .inventory
                .sires(category)
                .into_iter()
                .map(String::from)
                .collect();

            for round in 1..=rounds {
                let stats = self.allocate_round(
                    group_label, category, round, &animals, &allowed, &pool, &mut rows, state,
                )?;
                if stats.unassigned > 0 {
                    let round_text = round.to_string();
                    let count_text = stats.unassigned.to_string();
                    info!(
                        "{}",
                        t_with_args(
                            "summary.unassigned",
                            &[
                                ("category", category.label_zh()),
                                ("round", round_text.as_str()),
                                ("count", count_text.as_str()),
                            ],
                        )
                    );
                }
                state.run.round_stats.push(stats);
            }
        }

        info!(
            group = %group_label,
            rows = rows.len(),
            "分组分配完成"
        );
        state.run.rows.extend(rows);
        Ok(())
    }

    /// 单个 (类型, 轮次) 的两遍分配
    #[allow(clippy::too_many_arguments)]
    fn allocate_round(
        &self,
        group_label: &str,
        category: SemenCategory,
        round: usize,
        animals: &[&Animal],
        allowed: &[Vec<SemenCategory>],
        pool: &[String],
        rows: &mut [AssignmentRow],
        state: &mut RunState<'_>,
    ) -> AllocationResult<RoundStats> {
        let mut stats = RoundStats {
            group_label: group_label.to_string(),
            category,
            round,
            strict: 0,
            advisory: 0,
            unassigned: 0,
            skipped: 0,
        };

        // ===== 第一遍: 严格遵守库存 =====
        let mut unassigned: Vec<(usize, Vec<Candidate>)> = Vec::new();
        for (idx, animal) in animals.iter().enumerate() {
            state.check_cancel()?;
            if !allowed[idx].contains(&category) {
                stats.skipped += 1;
                continue;
            }

            let candidates = self.candidates(animal, category, &rows[idx], pool, state);
            let chosen = candidates
                .iter()
                .find(|c| state.inventory.try_consume(&c.sire_id, category));

            match chosen {
                Some(c) => {
                    let committed = rows[idx].commit(category, round, c.to_pick(CommitPass::Strict));
                    debug_assert!(committed);
                    stats.strict += 1;
                    debug!(
                        animal_id = %animal.animal_id,
                        sire_id = %c.sire_id,
                        category = %category,
                        round,
                        "严格分配"
                    );
                }
                None => unassigned.push((idx, candidates)),
            }
        }

        // ===== 第二遍: 兜底推荐（不扣减库存） =====
        for (idx, candidates) in unassigned {
            state.check_cancel()?;
            let fallback = if state.config.advisory_fallback {
                candidates.first()
            } else {
                None
            };

            match fallback {
                Some(c) => {
                    let committed = rows[idx].commit(category, round, c.to_pick(CommitPass::Advisory));
                    debug_assert!(committed);
                    *state
                        .run
                        .advisory_picks
                        .entry((c.sire_id.clone(), category))
                        .or_insert(0) += 1;
                    stats.advisory += 1;
                    debug!(
                        animal_id = %animals[idx].animal_id,
                        sire_id = %c.sire_id,
                        category = %category,
                        round,
                        "兜底推荐"
                    );
                }
                None => stats.unassigned += 1,
            }
        }

        Ok(stats)
    }

    /// 构建候选公牛列表（已过滤 + 已排序）
    fn candidates(
        &self,
        animal: &Animal,
        category: SemenCategory,
        row: &AssignmentRow,
        pool: &[String],
        state: &mut RunState<'_>,
    ) -> Vec<Candidate> {
        let threshold = state.config.inbreeding_threshold;
        let control_defect = state.config.control_defect_genes;

        let mut list = Vec::new();
        for sire_id in pool {
            if row.has_sire(category, sire_id) {
                continue;
            }
            let Some(record) = state.oracle.evaluate(&animal.animal_id, sire_id) else {
                // 整头公牛缺失已在运行开始时告警
                if state.oracle.knows_sire(sire_id)
                    && state
                        .gaps
                        .insert((animal.animal_id.clone(), sire_id.clone()))
                {
                    state.push_warning(AllocationWarning::CompatibilityGap {
                        animal_id: animal.animal_id.clone(),
                        sire_id: sire_id.clone(),
                    });
                }
                continue;
            };
            if !threshold.allows(record.inbreeding_coefficient) {
                continue;
            }
            if control_defect && !record.defect_safe() {
                continue;
            }
            list.push(Candidate {
                sire_id: sire_id.clone(),
                record,
            });
        }

        list.sort_by(|a, b| {
            b.record
                .offspring_score
                .partial_cmp(&a.record.offspring_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.sire_id.cmp(&b.sire_id))
        });
        list
    }
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
