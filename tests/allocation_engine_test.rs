// ==========================================
// 分配引擎集成测试
// ==========================================
// 测试目标: 导入层 → 引擎 的跨模块性质
// - 输入表中的脏库存行（负数/超大数）在扣减前已被处理
// - 库存守恒以输入表为准
// - 组内排序 / 取消
// 单模块性质（确定性、不重复公牛、阈值）见 engine/allocation/tests.rs
// ==========================================

mod test_helpers;

use dairy_mating::config::AllocationConfig;
use dairy_mating::domain::types::{DefectVerdict, InbreedingThreshold, SemenCategory};
use dairy_mating::domain::{Animal, AllocationWarning, LotKey, RawCompatibilityRecord};
use dairy_mating::engine::{
    AllocationEngine, AllocationRun, AnimalCatalog, CancellationToken, MatrixOracle,
    SireInventory,
};
use dairy_mating::importer::HerdImporter;
use std::collections::BTreeMap;
use test_helpers::{config_for, sample_herd};

/// 生成确定性的牧场数据（简单线性同余序列）
struct Herd {
    animals: Vec<Animal>,
    lots: Vec<(LotKey, i64)>,
    pairs: Vec<RawCompatibilityRecord>,
}

fn lcg(seed: &mut u64) -> u64 {
    *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    *seed >> 33
}

fn herd(seed: u64) -> Herd {
    let mut s = seed;
    let groups = ["头胎", "经产", "后备"];
    let sires: Vec<String> = (1..=8).map(|i| format!("HO{:03}", i)).collect();

    let mut animals = Vec::new();
    let mut pairs = Vec::new();
    for i in 0..60 {
        let id = format!("{}", 20000 + i);
        let rank = if lcg(&mut s) % 10 == 0 {
            None
        } else {
            Some((lcg(&mut s) % 50) as f64)
        };
        animals.push(Animal {
            animal_id: id.clone(),
            group_label: groups[i % groups.len()].to_string(),
            rank_score: rank,
            prior_service_count: (lcg(&mut s) % 5) as u32,
            row_number: i + 2,
        });
        for sire in &sires {
            // 少量组合缺失
            if lcg(&mut s) % 17 == 0 {
                continue;
            }
            let verdict = match lcg(&mut s) % 6 {
                0 => DefectVerdict::Unsafe,
                1 => DefectVerdict::MissingData,
                _ => DefectVerdict::Safe,
            };
            pairs.push(RawCompatibilityRecord {
                animal_id: id.clone(),
                sire_id: sire.clone(),
                offspring_score: Some((lcg(&mut s) % 400) as f64 / 2.0),
                inbreeding_coefficient: Some((lcg(&mut s) % 16) as f64 / 100.0),
                defect_verdict: verdict,
                row_number: pairs.len() + 2,
            });
        }
    }

    let mut lots = Vec::new();
    for (k, sire) in sires.iter().enumerate() {
        lots.push(((sire.clone(), SemenCategory::Conventional), (k as i64 * 3) % 11));
        if k % 2 == 0 {
            lots.push(((sire.clone(), SemenCategory::Sexed), (k as i64 * 5) % 7));
        }
    }
    Herd { animals, lots, pairs }
}

fn config(threshold: InbreedingThreshold, defect: bool) -> AllocationConfig {
    AllocationConfig {
        selected_groups: vec!["头胎".into(), "经产".into(), "后备".into()],
        inbreeding_threshold: threshold,
        control_defect_genes: defect,
        ..Default::default()
    }
}

fn allocate(h: &Herd, cfg: &AllocationConfig) -> (AllocationRun, SireInventory, MatrixOracle) {
    let catalog = AnimalCatalog::from_animals(h.animals.clone());
    let (mut inventory, _) = SireInventory::load(h.lots.clone());
    let oracle = MatrixOracle::from_records(h.pairs.clone());
    let run = AllocationEngine::new()
        .perform_allocation(
            &catalog,
            &mut inventory,
            &oracle,
            cfg,
            &CancellationToken::new(),
            &mut |_, _, _| {},
        )
        .expect("allocation failed");
    (run, inventory, oracle)
}

/// 从三份 CSV 走完整加载链路后分配
fn allocate_from_files(
    herd: &test_helpers::HerdFiles,
    cfg: &AllocationConfig,
) -> (AllocationRun, SireInventory, Vec<AllocationWarning>) {
    let importer = HerdImporter::default();
    let catalog = AnimalCatalog::load(&importer, &herd.inputs.animals_path).unwrap();
    let stock = importer.load_inventory(&herd.inputs.inventory_path).unwrap();
    let (mut inventory, load_warnings) = SireInventory::load(stock.records);
    let matrix = importer.load_compatibility(&herd.inputs.matrix_path).unwrap();
    let oracle = MatrixOracle::from_records(matrix.records);

    let mut warnings = stock.warnings;
    warnings.extend(load_warnings);
    let run = AllocationEngine::new()
        .perform_allocation(
            &catalog,
            &mut inventory,
            &oracle,
            cfg,
            &CancellationToken::new(),
            &mut |_, _, _| {},
        )
        .expect("allocation failed");
    (run, inventory, warnings)
}

#[test]
fn test_negative_stock_row_does_not_offset_positive_stock() {
    let herd = sample_herd();
    herd.rewrite(
        "inventory.csv",
        "公牛号,冻精类型,数量\nS1,常规,5\nS1,常规,-3\nS2,常规,1\nS3,性控,1\n",
    );
    let (run, inventory, warnings) = allocate_from_files(&herd, &config_for(&["G1", "G2"]));

    // 负数行逐行归零，S1 初始仍为 5
    assert_eq!(inventory.initial("S1", SemenCategory::Conventional), 5);
    let clamped: Vec<&AllocationWarning> = warnings
        .iter()
        .filter(|w| w.kind() == "NEGATIVE_DOSES_CLAMPED")
        .collect();
    assert_eq!(clamped.len(), 1);

    // 库存守恒: 严格选择次数 = 初始 - 剩余
    let mut strict: BTreeMap<LotKey, u32> = BTreeMap::new();
    for row in &run.rows {
        for (category, _, pick) in row.all_picks() {
            if !pick.is_advisory() {
                *strict.entry((pick.sire_id.clone(), category)).or_default() += 1;
            }
        }
    }
    for (key, initial) in inventory.initial_snapshot() {
        let used = initial - inventory.remaining(&key.0, key.1);
        assert_eq!(used, strict.get(key).copied().unwrap_or(0), "{:?}", key);
    }
    assert_eq!(strict.get(&("S1".to_string(), SemenCategory::Conventional)), Some(&5));
}

#[test]
fn test_huge_stock_rows_saturate_instead_of_overflowing() {
    let herd = sample_herd();
    herd.rewrite(
        "inventory.csv",
        "公牛号,冻精类型,数量\nS1,常规,9223372036854775807\nS1,常规,1\nS3,性控,1\n",
    );
    let (run, inventory, warnings) = allocate_from_files(&herd, &config_for(&["G1"]));

    assert_eq!(inventory.initial("S1", SemenCategory::Conventional), u32::MAX);
    assert!(warnings.iter().all(|w| w.kind() != "NEGATIVE_DOSES_CLAMPED"));
    assert_eq!(run.rows.len(), 4);
}

#[test]
fn test_rank_order_within_group() {
    let h = herd(9);
    let (run, _, _) = allocate(&h, &config(InbreedingThreshold::Pct625, false));

    for group in ["头胎", "经产", "后备"] {
        let ranks: Vec<Option<f64>> = run
            .rows
            .iter()
            .filter(|r| r.group_label == group)
            .map(|r| r.rank_score)
            .collect();
        assert!(!ranks.is_empty());
        // 非空降序，空值在最后
        let first_none = ranks.iter().position(Option::is_none).unwrap_or(ranks.len());
        assert!(ranks[first_none..].iter().all(Option::is_none));
        assert!(ranks[..first_none].windows(2).all(|w| w[0] >= w[1]));
    }
}

#[test]
fn test_cancelled_token_stops_run() {
    let h = herd(3);
    let catalog = AnimalCatalog::from_animals(h.animals.clone());
    let (mut inventory, _) = SireInventory::load(h.lots.clone());
    let before = inventory.snapshot();
    let oracle = MatrixOracle::from_records(h.pairs.clone());

    let token = CancellationToken::new();
    let trigger = token.clone();
    let err = AllocationEngine::new()
        .perform_allocation(
            &catalog,
            &mut inventory,
            &oracle,
            &config(InbreedingThreshold::Pct625, false),
            &token,
            &mut |idx, _, _| {
                if idx == 1 {
                    trigger.cancel();
                }
            },
        )
        .unwrap_err();
    assert!(err.is_cancelled());
    // 第一个分组可能已扣减，但取消后不会继续
    assert!(inventory
        .snapshot()
        .iter()
        .all(|(k, v)| *v <= before[k]));
}
