// ==========================================
// 奶牛选配系统 - 分配结果 CSV 导出
// ==========================================
// 宽表: 每头母牛一行，常规/性控各3选（公牛/后代得分/近交系数/兜底标记）
// 使用表: 每个 (公牛, 冻精类型) 一行
// 供报表层（Excel/PPT）读取
// ==========================================

use crate::domain::assignment::{AssignmentRow, SireUsage, MAX_ROUNDS};
use crate::domain::types::SemenCategory;
use crate::repository::error::RepositoryResult;
use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub struct CsvResultExporter;

impl CsvResultExporter {
    /// 宽表表头
    pub fn assignment_headers() -> Vec<String> {
        let mut headers: Vec<String> = ["牛号", "分组", "育种指数", "下次配种方式"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for category in SemenCategory::ALL {
            let label = category.label_zh();
            for round in 1..=MAX_ROUNDS {
                headers.push(format!("{}第{}选", label, round));
                headers.push(format!("{}第{}选后代得分", label, round));
                headers.push(format!("{}第{}选近交系数", label, round));
                headers.push(format!("{}第{}选兜底", label, round));
            }
        }
        headers
    }

    fn assignment_record(row: &AssignmentRow) -> Vec<String> {
        let mut record = vec![
            row.animal_id.clone(),
            row.group_label.clone(),
            row.rank_score.map(|s| s.to_string()).unwrap_or_default(),
            row.planned_method.clone().unwrap_or_default(),
        ];
        for category in SemenCategory::ALL {
            for pick in row.picks(category) {
                match pick {
                    Some(p) => {
                        record.push(p.sire_id.clone());
                        record.push(p.offspring_score.to_string());
                        record.push(format_percent(p.inbreeding_coefficient));
                        record.push(if p.is_advisory() { "是" } else { "" }.to_string());
                    }
                    None => record.extend(std::iter::repeat(String::new()).take(4)),
                }
            }
        }
        record
    }

    /// 写出分配宽表
    pub fn write_assignments<W: Write>(&self, out: W, rows: &[AssignmentRow]) -> RepositoryResult<usize> {
        let mut writer = Writer::from_writer(out);
        writer.write_record(Self::assignment_headers())?;
        for row in rows {
            writer.write_record(Self::assignment_record(row))?;
        }
        writer.flush()?;
        Ok(rows.len())
    }

    /// 写出公牛使用表
    pub fn write_sire_usage<W: Write>(&self, out: W, usage: &[SireUsage]) -> RepositoryResult<usize> {
        let mut writer = Writer::from_writer(out);
        writer.write_record(["公牛号", "冻精类型", "初始数量", "已使用", "剩余", "兜底推荐次数"])?;
        for u in usage {
            writer.write_record([
                u.sire_id.clone(),
                u.category.label_zh().to_string(),
                u.initial_doses.to_string(),
                u.consumed.to_string(),
                u.remaining.to_string(),
                u.advisory_picks.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(usage.len())
    }

    pub fn export_assignments<P: AsRef<Path>>(&self, path: P, rows: &[AssignmentRow]) -> RepositoryResult<usize> {
        let file = File::create(path.as_ref())?;
        self.write_assignments(file, rows)
    }

    pub fn export_sire_usage<P: AsRef<Path>>(&self, path: P, usage: &[SireUsage]) -> RepositoryResult<usize> {
        let file = File::create(path.as_ref())?;
        self.write_sire_usage(file, usage)
    }
}

/// 0.03125 → "3.13%"
fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}
