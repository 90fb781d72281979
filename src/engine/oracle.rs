// ==========================================
// 奶牛选配系统 - 选配相容性查询
// ==========================================
// 职责: (母牛, 公牛) → 后代得分/近交系数/隐性基因判定
// 实现: 推荐矩阵预先载入内存，查询无副作用
// ==========================================

use crate::domain::compatibility::{CompatibilityRecord, RawCompatibilityRecord};
use std::collections::{HashMap, HashSet};

/// 相容性查询接口（纯函数语义）
pub trait CompatibilityOracle {
    /// 查询组合；None 表示无数据（视为不合格）
    fn evaluate(&self, animal_id: &str, sire_id: &str) -> Option<CompatibilityRecord>;

    /// 母牛在参考数据中是否有任何记录
    fn knows_animal(&self, animal_id: &str) -> bool;

    /// 公牛在参考数据中是否有任何记录
    fn knows_sire(&self, sire_id: &str) -> bool;
}

// ==========================================
// MatrixOracle - 基于推荐矩阵的实现
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct MatrixOracle {
    pairs: HashMap<(String, String), CompatibilityRecord>,
    animals: HashSet<String>,
    sires: HashSet<String>,
}

impl MatrixOracle {
    /// 载入推荐矩阵
    ///
    /// 得分或近交系数缺失的行只登记母牛/公牛，不形成可用组合
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RawCompatibilityRecord>,
    {
        let mut oracle = Self::default();
        for r in records {
            oracle.animals.insert(r.animal_id.clone());
            oracle.sires.insert(r.sire_id.clone());
            if let (Some(offspring_score), Some(inbreeding_coefficient)) =
                (r.offspring_score, r.inbreeding_coefficient)
            {
                oracle.pairs.insert(
                    (r.animal_id, r.sire_id),
                    CompatibilityRecord {
                        offspring_score,
                        inbreeding_coefficient,
                        defect_verdict: r.defect_verdict,
                    },
                );
            }
        }
        oracle
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// 矩阵中出现的公牛（升序）
    pub fn sire_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sires.iter().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

impl CompatibilityOracle for MatrixOracle {
    fn evaluate(&self, animal_id: &str, sire_id: &str) -> Option<CompatibilityRecord> {
        self.pairs
            .get(&(animal_id.to_string(), sire_id.to_string()))
            .copied()
    }

    fn knows_animal(&self, animal_id: &str) -> bool {
        self.animals.contains(animal_id)
    }

    fn knows_sire(&self, sire_id: &str) -> bool {
        self.sires.contains(sire_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::DefectVerdict;

    fn raw(animal: &str, sire: &str, score: Option<f64>, inbreeding: Option<f64>) -> RawCompatibilityRecord {
        RawCompatibilityRecord {
            animal_id: animal.to_string(),
            sire_id: sire.to_string(),
            offspring_score: score,
            inbreeding_coefficient: inbreeding,
            defect_verdict: DefectVerdict::Safe,
            row_number: 2,
        }
    }

    #[test]
    fn test_evaluate_known_and_missing_pairs() {
        let oracle = MatrixOracle::from_records(vec![
            raw("A", "S1", Some(100.0), Some(0.01)),
            raw("A", "S2", Some(90.0), None),
        ]);

        let rec = oracle.evaluate("A", "S1").unwrap();
        assert_eq!(rec.offspring_score, 100.0);
        assert!(rec.defect_safe());

        // 近交系数缺失的组合不可用，但公牛仍登记
        assert!(oracle.evaluate("A", "S2").is_none());
        assert!(oracle.knows_sire("S2"));
        assert!(oracle.knows_animal("A"));
        assert!(!oracle.knows_animal("B"));
        assert_eq!(oracle.pair_count(), 1);
        assert_eq!(oracle.sire_ids(), vec!["S1", "S2"]);
    }
}
