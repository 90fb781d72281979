// ==========================================
// 奶牛选配系统 - 数据清洗器
// ==========================================
// 职责: 数值/百分比/隐性基因判定/配次 的显式解析
// 原则: 解析失败返回 None 或默认值，由调用方记录告警，不吞异常
// ==========================================

use crate::domain::types::DefectVerdict;

pub struct DataCleaner;

/// 解析结果：值 + 是否发生了回退
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cleaned<T> {
    pub value: T,
    pub fell_back: bool,
}

impl<T> Cleaned<T> {
    fn ok(value: T) -> Self {
        Self { value, fell_back: false }
    }

    fn fallback(value: T) -> Self {
        Self { value, fell_back: true }
    }
}

impl DataCleaner {
    /// 解析浮点数（去千分位逗号）；空值 → None；无法解析 → None + 回退标记
    pub fn parse_f64(&self, raw: Option<&str>) -> Cleaned<Option<f64>> {
        let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
            return Cleaned::ok(None);
        };
        match value.replace(',', "").parse::<f64>() {
            Ok(v) if v.is_finite() => Cleaned::ok(Some(v)),
            _ => Cleaned::fallback(None),
        }
    }

    /// 解析百分比为 [0,1] 小数
    ///
    /// - "3.12%" → 0.0312
    /// - 不带 % 且 ≤ 1 → 视为小数；> 1 → 视为百分数
    pub fn parse_fraction(&self, raw: Option<&str>) -> Cleaned<Option<f64>> {
        let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
            return Cleaned::ok(None);
        };

        let parsed = match value.strip_suffix('%') {
            Some(pct) => pct.trim().parse::<f64>().ok().map(|v| v / 100.0),
            None => value
                .parse::<f64>()
                .ok()
                .map(|v| if v > 1.0 { v / 100.0 } else { v }),
        };

        match parsed {
            Some(v) if v.is_finite() && (0.0..=1.0).contains(&v) => Cleaned::ok(Some(v)),
            Some(v) if v.is_finite() => Cleaned::fallback(Some(v.clamp(0.0, 1.0))),
            _ => Cleaned::fallback(None),
        }
    }

    /// 解析隐性基因判定；未知文本一律视为数据缺失
    pub fn parse_defect_verdict(&self, raw: Option<&str>) -> DefectVerdict {
        let value = raw.map(|v| v.trim().to_lowercase()).unwrap_or_default();
        match value.as_str() {
            "safe" | "安全" | "是" => DefectVerdict::Safe,
            "no safe" | "nosafe" | "not safe" | "unsafe" | "不安全" | "否" => DefectVerdict::Unsafe,
            _ => DefectVerdict::MissingData,
        }
    }

    /// 解析配次：缺失 → 0；非法/负数 → 0 + 回退标记
    pub fn parse_service_count(&self, raw: Option<&str>) -> Cleaned<u32> {
        let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
            return Cleaned::ok(0);
        };
        if let Ok(v) = value.parse::<u32>() {
            return Cleaned::ok(v);
        }
        // Excel 单元格常以 "2.0" 形式出现
        match value.parse::<f64>() {
            Ok(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Cleaned::ok(v as u32),
            _ => Cleaned::fallback(0),
        }
    }

    /// 解析库存数量（允许负数，由库存加载时归零并告警）
    pub fn parse_doses(&self, raw: Option<&str>) -> Cleaned<Option<i64>> {
        let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
            return Cleaned::ok(None);
        };
        if let Ok(v) = value.replace(',', "").parse::<i64>() {
            return Cleaned::ok(Some(v));
        }
        match value.parse::<f64>() {
            Ok(v) if v.is_finite() && v.fract() == 0.0 => Cleaned::ok(Some(v as i64)),
            _ => Cleaned::fallback(None),
        }
    }

    /// 标识字段标准化：去空白；Excel 数字型牛号去掉 ".0"
    pub fn clean_identifier(&self, raw: Option<&str>) -> Option<String> {
        let value = raw?.trim();
        if value.is_empty() {
            return None;
        }
        let value = value.strip_suffix(".0").filter(|v| v.chars().all(|c| c.is_ascii_digit())).unwrap_or(value);
        Some(value.to_string())
    }
}
