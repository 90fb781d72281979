// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时结果库、CSV 输入表生成、常用配置
// ==========================================

#![allow(dead_code)]

use dairy_mating::config::{AllocationConfig, GroupStrategy};
use dairy_mating::db::open_result_store;
use dairy_mating::engine::AllocationInputs;
use std::error::Error;
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};

/// 创建临时结果库（已建表）
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();
    open_result_store(&db_path)?;
    Ok((temp_file, db_path))
}

/// 在目录中写入 CSV 文件
pub fn write_csv(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// 三份输入表
pub struct HerdFiles {
    pub dir: TempDir,
    pub inputs: AllocationInputs,
}

impl HerdFiles {
    pub fn new(animals: &str, inventory: &str, matrix: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let inputs = AllocationInputs {
            animals_path: write_csv(dir.path(), "index.csv", animals),
            inventory_path: write_csv(dir.path(), "inventory.csv", inventory),
            matrix_path: write_csv(dir.path(), "matrix.csv", matrix),
        };
        Self { dir, inputs }
    }

    /// 替换某一份输入表
    pub fn rewrite(&self, name: &str, content: &str) {
        write_csv(self.dir.path(), name, content);
    }
}

/// 示例牧场: 两个分组，常规/性控各两头公牛
///
/// - G1: C01(98) C02(95) C03(90) C04(85)
/// - G2: C05(92) C06(88)
/// - C07 未分组
pub fn sample_herd() -> HerdFiles {
    let animals = "\
牛号,分组,育种指数,配次
C01,G1,98,0
C02,G1,95,1
C03,G1,90,2
C04,G1,85,0
C05,G2,92,0
C06,G2,88,3
C07,,99,0
";
    let inventory = "\
公牛号,冻精类型,数量
S1,常规,2
S2,常规,3
S3,性控,1
S4,性控,2
";
    let mut matrix = String::from("牛号,公牛号,后代得分,近交系数,隐性基因\n");
    let cows = ["C01", "C02", "C03", "C04", "C05", "C06", "C07"];
    for (ci, cow) in cows.iter().enumerate() {
        for (si, sire) in ["S1", "S2", "S3", "S4"].iter().enumerate() {
            let score = 100 + ((ci * 7 + si * 5) % 13) as i64;
            // C03 × S2 近交偏高
            let inbreeding = if *cow == "C03" && *sire == "S2" { "8.5%" } else { "2.1%" };
            // C04 × S1 隐性基因不安全
            let defect = if *cow == "C04" && *sire == "S1" { "NO safe" } else { "Safe" };
            matrix.push_str(&format!("{},{},{},{},{}\n", cow, sire, score, inbreeding, defect));
        }
    }
    HerdFiles::new(animals, inventory, &matrix)
}

/// 选择指定分组的配置（其余为默认值）
pub fn config_for(groups: &[&str]) -> AllocationConfig {
    AllocationConfig {
        selected_groups: groups.iter().map(|g| g.to_string()).collect(),
        ..Default::default()
    }
}

/// G1 的配种策略: 第1次性控、第2次性控、第3次常规、之后肉牛
pub fn g1_strategy() -> GroupStrategy {
    GroupStrategy::new("G1", &["性控", "性控", "常规", "肉牛"])
}
