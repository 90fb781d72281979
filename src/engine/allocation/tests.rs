use super::*;
use crate::config::strategy_profile::GroupStrategy;
use crate::domain::compatibility::RawCompatibilityRecord;
use crate::domain::types::{DefectVerdict, InbreedingThreshold};
use crate::engine::oracle::MatrixOracle;

// ==========================================
// 测试辅助
// ==========================================

fn animal(id: &str, group: &str, score: Option<f64>, row: usize) -> Animal {
    Animal {
        animal_id: id.to_string(),
        group_label: group.to_string(),
        rank_score: score,
        prior_service_count: 0,
        row_number: row,
    }
}

fn pair(a: &str, s: &str, score: f64, inbreeding: f64) -> RawCompatibilityRecord {
    pair_with(a, s, score, inbreeding, DefectVerdict::Safe)
}

fn pair_with(
    a: &str,
    s: &str,
    score: f64,
    inbreeding: f64,
    verdict: DefectVerdict,
) -> RawCompatibilityRecord {
    RawCompatibilityRecord {
        animal_id: a.to_string(),
        sire_id: s.to_string(),
        offspring_score: Some(score),
        inbreeding_coefficient: Some(inbreeding),
        defect_verdict: verdict,
        row_number: 0,
    }
}

fn lot(s: &str, c: SemenCategory, n: i64) -> (LotKey, i64) {
    ((s.to_string(), c), n)
}

fn config(groups: &[&str]) -> AllocationConfig {
    AllocationConfig {
        selected_groups: groups.iter().map(|g| g.to_string()).collect(),
        ..Default::default()
    }
}

fn run(
    animals: Vec<Animal>,
    lots: Vec<(LotKey, i64)>,
    pairs: Vec<RawCompatibilityRecord>,
    cfg: &AllocationConfig,
) -> (AllocationRun, SireInventory) {
    let catalog = AnimalCatalog::from_animals(animals);
    let (mut inventory, _) = SireInventory::load(lots);
    let oracle = MatrixOracle::from_records(pairs);
    let result = AllocationEngine::new()
        .perform_allocation(
            &catalog,
            &mut inventory,
            &oracle,
            cfg,
            &CancellationToken::new(),
            &mut |_, _, _| {},
        )
        .unwrap();
    (result, inventory)
}

fn row<'a>(run: &'a AllocationRun, id: &str) -> &'a AssignmentRow {
    run.rows.iter().find(|r| r.animal_id == id).unwrap()
}

/// 中等规模的确定性数据集
fn herd_fixture() -> (Vec<Animal>, Vec<(LotKey, i64)>, Vec<RawCompatibilityRecord>) {
    let mut animals = Vec::new();
    let mut pairs = Vec::new();
    let sires = ["S1", "S2", "S3", "S4", "S5"];
    for i in 0..30 {
        let id = format!("C{:03}", i);
        let group = if i % 3 == 0 { "G2" } else { "G1" };
        // 制造同分与空值
        let score = if i % 7 == 0 { None } else { Some(((i * 37) % 11) as f64) };
        animals.push(animal(&id, group, score, i + 2));
        for (j, sire) in sires.iter().enumerate() {
            let inbreeding = ((i + j) % 5) as f64 * 0.02; // 0..0.08
            let verdict = if (i + j) % 4 == 0 {
                DefectVerdict::Unsafe
            } else if (i + j) % 9 == 0 {
                DefectVerdict::MissingData
            } else {
                DefectVerdict::Safe
            };
            pairs.push(pair_with(&id, sire, ((i * j) % 13) as f64, inbreeding, verdict));
        }
    }
    let lots = vec![
        lot("S1", SemenCategory::Conventional, 6),
        lot("S2", SemenCategory::Conventional, 4),
        lot("S3", SemenCategory::Conventional, 10),
        lot("S3", SemenCategory::Sexed, 5),
        lot("S4", SemenCategory::Sexed, 3),
        lot("S5", SemenCategory::Sexed, 0),
    ];
    (animals, lots, pairs)
}

// ==========================================
// 场景
// ==========================================

#[test]
fn test_higher_rank_takes_only_dose_then_advisory() {
    let animals = vec![animal("B", "G1", Some(80.0), 3), animal("A", "G1", Some(90.0), 2)];
    let lots = vec![lot("S1", SemenCategory::Conventional, 1)];
    let pairs = vec![pair("A", "S1", 100.0, 0.01), pair("B", "S1", 90.0, 0.01)];
    let cfg = config(&["G1"]);

    let (result, inventory) = run(animals, lots, pairs, &cfg);

    let a = row(&result, "A").pick(SemenCategory::Conventional, 1).unwrap();
    assert_eq!(a.sire_id, "S1");
    assert_eq!(a.pass, CommitPass::Strict);

    let b = row(&result, "B").pick(SemenCategory::Conventional, 1).unwrap();
    assert_eq!(b.sire_id, "S1");
    assert_eq!(b.pass, CommitPass::Advisory);

    assert_eq!(inventory.remaining("S1", SemenCategory::Conventional), 0);

    let usage = result.sire_usage(&inventory);
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].consumed, 1);
    assert_eq!(usage[0].advisory_picks, 1);

    // 结果行按组内排序输出
    assert_eq!(result.rows[0].animal_id, "A");
}

#[test]
fn test_pair_above_threshold_never_strict() {
    let animals = vec![animal("A", "G1", Some(90.0), 2)];
    let lots = vec![
        lot("S1", SemenCategory::Conventional, 5),
        lot("S2", SemenCategory::Conventional, 5),
    ];
    let pairs = vec![pair("A", "S1", 120.0, 0.0625), pair("A", "S2", 80.0, 0.03)];
    let cfg = AllocationConfig {
        inbreeding_threshold: InbreedingThreshold::Pct3125,
        ..config(&["G1"])
    };

    let (result, inventory) = run(animals, lots, pairs, &cfg);

    let r = row(&result, "A");
    assert_eq!(r.pick(SemenCategory::Conventional, 1).unwrap().sire_id, "S2");
    assert!(r.pick(SemenCategory::Conventional, 2).is_none());
    assert!(!r.all_picks().any(|(_, _, p)| p.sire_id == "S1"));
    assert_eq!(inventory.remaining("S1", SemenCategory::Conventional), 5);
}

#[test]
fn test_unlimited_threshold_accepts_any_coefficient() {
    let animals = vec![animal("A", "G1", Some(90.0), 2)];
    let lots = vec![lot("S1", SemenCategory::Conventional, 1)];
    let pairs = vec![pair("A", "S1", 100.0, 0.25)];
    let cfg = AllocationConfig {
        inbreeding_threshold: InbreedingThreshold::Unlimited,
        ..config(&["G1"])
    };
    let (result, _) = run(animals, lots, pairs, &cfg);
    assert_eq!(
        row(&result, "A").pick(SemenCategory::Conventional, 1).unwrap().pass,
        CommitPass::Strict
    );
}

#[test]
fn test_defect_control_excludes_unsafe_and_missing_data() {
    let animals = vec![animal("A", "G1", Some(90.0), 2)];
    let lots = vec![
        lot("S1", SemenCategory::Conventional, 1),
        lot("S2", SemenCategory::Conventional, 1),
        lot("S3", SemenCategory::Conventional, 1),
    ];
    let pairs = vec![
        pair_with("A", "S1", 100.0, 0.01, DefectVerdict::Unsafe),
        pair_with("A", "S2", 95.0, 0.01, DefectVerdict::MissingData),
        pair_with("A", "S3", 50.0, 0.01, DefectVerdict::Safe),
    ];

    let cfg = AllocationConfig {
        control_defect_genes: true,
        ..config(&["G1"])
    };
    let (result, _) = run(animals.clone(), lots.clone(), pairs.clone(), &cfg);
    let r = row(&result, "A");
    assert_eq!(r.pick(SemenCategory::Conventional, 1).unwrap().sire_id, "S3");
    assert!(r.pick(SemenCategory::Conventional, 2).is_none());

    // 关闭控制时按得分排序
    let (result, _) = run(animals, lots, pairs, &config(&["G1"]));
    let r = row(&result, "A");
    assert_eq!(r.pick(SemenCategory::Conventional, 1).unwrap().sire_id, "S1");
    assert_eq!(r.pick(SemenCategory::Conventional, 2).unwrap().sire_id, "S2");
    assert_eq!(r.pick(SemenCategory::Conventional, 3).unwrap().sire_id, "S3");
}

#[test]
fn test_equal_scores_break_ties_by_sire_id() {
    let animals = vec![animal("A", "G1", Some(90.0), 2)];
    let lots = vec![
        lot("SB", SemenCategory::Sexed, 1),
        lot("SA", SemenCategory::Sexed, 1),
    ];
    let pairs = vec![pair("A", "SB", 100.0, 0.01), pair("A", "SA", 100.0, 0.01)];
    let (result, _) = run(animals, lots, pairs, &config(&["G1"]));
    let r = row(&result, "A");
    assert_eq!(r.pick(SemenCategory::Sexed, 1).unwrap().sire_id, "SA");
    assert_eq!(r.pick(SemenCategory::Sexed, 2).unwrap().sire_id, "SB");
}

#[test]
fn test_advisory_disabled_leaves_slot_empty() {
    let animals = vec![animal("A", "G1", Some(90.0), 2), animal("B", "G1", Some(80.0), 3)];
    let lots = vec![lot("S1", SemenCategory::Conventional, 1)];
    let pairs = vec![pair("A", "S1", 100.0, 0.01), pair("B", "S1", 90.0, 0.01)];
    let cfg = AllocationConfig {
        advisory_fallback: false,
        ..config(&["G1"])
    };
    let (result, _) = run(animals, lots, pairs, &cfg);

    assert!(row(&result, "B").pick(SemenCategory::Conventional, 1).is_none());
    let stats = result
        .round_stats
        .iter()
        .find(|s| s.category == SemenCategory::Conventional && s.round == 1)
        .unwrap();
    assert_eq!((stats.strict, stats.advisory, stats.unassigned), (1, 0, 1));
}

#[test]
fn test_rounds_limited_by_config() {
    let animals = vec![animal("A", "G1", Some(90.0), 2)];
    let lots = vec![
        lot("S1", SemenCategory::Conventional, 1),
        lot("S2", SemenCategory::Conventional, 1),
    ];
    let pairs = vec![pair("A", "S1", 100.0, 0.01), pair("A", "S2", 90.0, 0.01)];
    let cfg = AllocationConfig {
        rounds: 1,
        ..config(&["G1"])
    };
    let (result, inventory) = run(animals, lots, pairs, &cfg);
    assert!(row(&result, "A").pick(SemenCategory::Conventional, 2).is_none());
    assert_eq!(inventory.remaining("S2", SemenCategory::Conventional), 1);
    assert!(result.round_stats.iter().all(|s| s.round == 1));
}

#[test]
fn test_unselected_group_not_touched() {
    let animals = vec![animal("A", "G1", Some(90.0), 2), animal("B", "G2", Some(99.0), 3)];
    let lots = vec![lot("S1", SemenCategory::Conventional, 1)];
    let pairs = vec![pair("A", "S1", 100.0, 0.01), pair("B", "S1", 100.0, 0.01)];
    let (result, inventory) = run(animals, lots, pairs, &config(&["G1"]));

    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.groups, vec!["G1".to_string()]);
    assert_eq!(row(&result, "A").pick(SemenCategory::Conventional, 1).unwrap().pass, CommitPass::Strict);
    assert_eq!(inventory.remaining("S1", SemenCategory::Conventional), 0);
}

#[test]
fn test_animal_without_matrix_data_is_excluded() {
    let animals = vec![animal("A", "G1", Some(90.0), 2), animal("X", "G1", Some(99.0), 3)];
    let lots = vec![lot("S1", SemenCategory::Conventional, 1)];
    let pairs = vec![pair("A", "S1", 100.0, 0.01)];
    let (result, _) = run(animals, lots, pairs, &config(&["G1"]));

    assert_eq!(result.rows.len(), 1);
    assert_eq!(row(&result, "A").pick(SemenCategory::Conventional, 1).unwrap().pass, CommitPass::Strict);
    assert!(result.warnings.iter().any(
        |w| matches!(w, AllocationWarning::AnimalWithoutCompatibility { animal_id } if animal_id == "X")
    ));
}

#[test]
fn test_gap_and_unknown_sire_are_warnings() {
    let animals = vec![animal("A", "G1", Some(90.0), 2), animal("B", "G1", Some(80.0), 3)];
    let lots = vec![
        lot("S1", SemenCategory::Conventional, 5),
        lot("S2", SemenCategory::Conventional, 5),
        lot("S9", SemenCategory::Conventional, 5),
    ];
    // B × S2 无数据；S9 完全不在矩阵中
    let pairs = vec![
        pair("A", "S1", 100.0, 0.01),
        pair("A", "S2", 90.0, 0.01),
        pair("B", "S1", 95.0, 0.01),
    ];
    let (result, inventory) = run(animals, lots, pairs, &config(&["G1"]));

    let gaps: Vec<_> = result
        .warnings
        .iter()
        .filter(|w| matches!(w, AllocationWarning::CompatibilityGap { .. }))
        .collect();
    // 同一组合只告警一次
    assert_eq!(gaps.len(), 1);
    assert!(result.warnings.iter().any(
        |w| matches!(w, AllocationWarning::SireWithoutCompatibility { sire_id } if sire_id == "S9")
    ));
    assert!(!row(&result, "B").has_sire(SemenCategory::Conventional, "S2"));
    assert_eq!(inventory.remaining("S9", SemenCategory::Conventional), 5);
}

#[test]
fn test_restrict_to_planned_category() {
    let mut heifer = animal("A", "G1", Some(90.0), 2);
    heifer.prior_service_count = 0;
    let mut repeat = animal("B", "G1", Some(80.0), 3);
    repeat.prior_service_count = 7; // 超出列表长度，沿用最后一项
    let mut beef = animal("C", "G2", Some(70.0), 4);
    beef.prior_service_count = 1;

    let lots = vec![
        lot("S1", SemenCategory::Conventional, 5),
        lot("S1", SemenCategory::Sexed, 5),
    ];
    let pairs = vec![
        pair("A", "S1", 100.0, 0.01),
        pair("B", "S1", 100.0, 0.01),
        pair("C", "S1", 100.0, 0.01),
    ];
    let cfg = AllocationConfig {
        restrict_to_planned_category: true,
        strategies: vec![
            GroupStrategy::new("G1", &["性控", "常规"]),
            GroupStrategy::new("G2", &["性控", "肉牛"]),
        ],
        ..config(&["G1", "G2"])
    };
    let (result, _) = run(vec![heifer, repeat, beef], lots, pairs, &cfg);

    let a = row(&result, "A");
    assert_eq!(a.planned_method.as_deref(), Some("性控"));
    assert!(a.pick(SemenCategory::Sexed, 1).is_some());
    assert!(a.pick(SemenCategory::Conventional, 1).is_none());

    let b = row(&result, "B");
    assert_eq!(b.planned_method.as_deref(), Some("常规"));
    assert!(b.pick(SemenCategory::Conventional, 1).is_some());
    assert!(b.pick(SemenCategory::Sexed, 1).is_none());

    let c = row(&result, "C");
    assert_eq!(c.planned_method.as_deref(), Some("肉牛"));
    assert_eq!(c.all_picks().count(), 0);

    // 被跳过的母牛计入 skipped，统计不漏人
    for stats in &result.round_stats {
        let members = if stats.group_label == "G1" { 2 } else { 1 };
        assert_eq!(stats.total(), members, "{:?}", stats);
        assert_eq!(stats.skipped, 1, "{:?}", stats);
    }
}

#[test]
fn test_planned_method_recorded_without_restriction() {
    let mut a = animal("A", "G1", Some(90.0), 2);
    a.prior_service_count = 1;
    let lots = vec![
        lot("S1", SemenCategory::Conventional, 5),
        lot("S1", SemenCategory::Sexed, 5),
    ];
    let cfg = AllocationConfig {
        strategies: vec![GroupStrategy::new("G1", &["性控", "常规"])],
        ..config(&["G1"])
    };
    let (result, _) = run(vec![a], lots, vec![pair("A", "S1", 100.0, 0.01)], &cfg);
    let r = row(&result, "A");
    assert_eq!(r.planned_method.as_deref(), Some("常规"));
    assert!(r.pick(SemenCategory::Sexed, 1).is_some());
    assert!(r.pick(SemenCategory::Conventional, 1).is_some());
}

#[test]
fn test_cancel_before_start_returns_cancelled() {
    let (animals, lots, pairs) = herd_fixture();
    let catalog = AnimalCatalog::from_animals(animals);
    let (mut inventory, _) = SireInventory::load(lots);
    let before = inventory.snapshot();
    let oracle = MatrixOracle::from_records(pairs);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = AllocationEngine::new()
        .perform_allocation(
            &catalog,
            &mut inventory,
            &oracle,
            &config(&["G1", "G2"]),
            &cancel,
            &mut |_, _, _| {},
        )
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(inventory.snapshot(), before);
}

#[test]
fn test_cancel_between_groups() {
    let (animals, lots, pairs) = herd_fixture();
    let catalog = AnimalCatalog::from_animals(animals);
    let (mut inventory, _) = SireInventory::load(lots);
    let oracle = MatrixOracle::from_records(pairs);
    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    let mut seen = Vec::new();

    let err = AllocationEngine::new()
        .perform_allocation(
            &catalog,
            &mut inventory,
            &oracle,
            &config(&["G1", "G2"]),
            &cancel,
            &mut |idx, total, group| {
                seen.push((idx, total, group.to_string()));
                handle.cancel();
            },
        )
        .unwrap_err();
    assert!(matches!(err, AllocationError::Cancelled));
    assert_eq!(seen, vec![(0, 2, "G1".to_string())]);
}

#[test]
fn test_invalid_config_rejected() {
    let catalog = AnimalCatalog::from_animals(vec![]);
    let (mut inventory, _) = SireInventory::load(Vec::<(LotKey, i64)>::new());
    let oracle = MatrixOracle::default();
    let err = AllocationEngine::new()
        .perform_allocation(
            &catalog,
            &mut inventory,
            &oracle,
            &AllocationConfig::default(),
            &CancellationToken::new(),
            &mut |_, _, _| {},
        )
        .unwrap_err();
    assert!(matches!(err, AllocationError::InvalidConfig(_)));
}

// ==========================================
// 性质
// ==========================================

#[test]
fn test_determinism() {
    let (animals, lots, pairs) = herd_fixture();
    let cfg = AllocationConfig {
        control_defect_genes: true,
        ..config(&["G1", "G2"])
    };
    let (first, inv1) = run(animals.clone(), lots.clone(), pairs.clone(), &cfg);
    let (second, inv2) = run(animals, lots, pairs, &cfg);

    assert_eq!(
        serde_json::to_string(&first.rows).unwrap(),
        serde_json::to_string(&second.rows).unwrap()
    );
    assert_eq!(first.round_stats, second.round_stats);
    assert_eq!(inv1.snapshot(), inv2.snapshot());
}

#[test]
fn test_inventory_conservation() {
    let (animals, lots, pairs) = herd_fixture();
    let (result, inventory) = run(animals, lots, pairs, &config(&["G1", "G2"]));

    for ((sire_id, category), initial) in inventory.initial_snapshot() {
        let strict = result
            .rows
            .iter()
            .flat_map(|r| r.all_picks())
            .filter(|(c, _, p)| c == category && &p.sire_id == sire_id && p.pass == CommitPass::Strict)
            .count() as u32;
        let advisory = result
            .rows
            .iter()
            .flat_map(|r| r.all_picks())
            .filter(|(c, _, p)| c == category && &p.sire_id == sire_id && p.is_advisory())
            .count() as u32;
        assert_eq!(initial - inventory.remaining(sire_id, *category), strict);
        assert_eq!(
            result.advisory_picks.get(&(sire_id.clone(), *category)).copied().unwrap_or(0),
            advisory
        );
    }
}

#[test]
fn test_no_duplicate_sire_within_category() {
    let (animals, lots, pairs) = herd_fixture();
    let (result, _) = run(animals, lots, pairs, &config(&["G1", "G2"]));

    for r in &result.rows {
        for category in SemenCategory::ALL {
            let sires: Vec<&str> = r
                .picks(category)
                .iter()
                .flatten()
                .map(|p| p.sire_id.as_str())
                .collect();
            let unique: BTreeSet<&str> = sires.iter().copied().collect();
            assert_eq!(sires.len(), unique.len(), "duplicate sire for {}", r.animal_id);
        }
    }
}

#[test]
fn test_threshold_and_defect_respected_by_strict_picks() {
    let (animals, lots, pairs) = herd_fixture();
    let lookup: std::collections::HashMap<(String, String), DefectVerdict> = pairs
        .iter()
        .map(|p| ((p.animal_id.clone(), p.sire_id.clone()), p.defect_verdict))
        .collect();
    let cfg = AllocationConfig {
        inbreeding_threshold: InbreedingThreshold::Pct3125,
        control_defect_genes: true,
        ..config(&["G1", "G2"])
    };
    let (result, _) = run(animals, lots, pairs, &cfg);

    let mut strict = 0;
    for r in &result.rows {
        for (_, _, p) in r.all_picks().filter(|(_, _, p)| p.pass == CommitPass::Strict) {
            strict += 1;
            assert!(p.inbreeding_coefficient <= 0.03125 + 1e-9);
            assert_eq!(
                lookup[&(r.animal_id.clone(), p.sire_id.clone())],
                DefectVerdict::Safe
            );
        }
    }
    assert!(strict > 0);
}

#[test]
fn test_round_stats_account_for_every_animal() {
    let (animals, lots, pairs) = herd_fixture();
    let (result, _) = run(animals, lots, pairs, &config(&["G1", "G2"]));

    for stats in &result.round_stats {
        let members = result
            .rows
            .iter()
            .filter(|r| r.group_label == stats.group_label)
            .count();
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.total(), members);
    }
    // 2 组 × 2 类型 × 3 轮
    assert_eq!(result.round_stats.len(), 12);
}
