// ==========================================
// 奶牛选配系统 - 领域类型定义
// ==========================================
// 冻精类型 / 近交阈值 / 隐性基因判定 / 分配通道
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 冻精类型 (Semen Category)
// ==========================================
// 常规与性控为互斥的两个候选池
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemenCategory {
    Conventional, // 常规
    Sexed,        // 性控
}

impl SemenCategory {
    /// 引擎处理顺序（常规在前）
    pub const ALL: [SemenCategory; 2] = [SemenCategory::Conventional, SemenCategory::Sexed];

    /// 从源数据的自由文本归一化
    ///
    /// 无法识别时返回 None，由调用方记录警告
    pub fn normalize(raw: &str) -> Option<Self> {
        let value = raw.trim().to_lowercase();
        match value.as_str() {
            "常规" | "常规冻精" | "普通" | "普通冻精" | "conventional" | "conv" => {
                Some(SemenCategory::Conventional)
            }
            "性控" | "性控冻精" | "性别控制" | "sexed" => Some(SemenCategory::Sexed),
            _ => None,
        }
    }

    /// 中文名称（导出表头使用）
    pub fn label_zh(&self) -> &'static str {
        match self {
            SemenCategory::Conventional => "常规",
            SemenCategory::Sexed => "性控",
        }
    }
}

impl fmt::Display for SemenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemenCategory::Conventional => write!(f, "CONVENTIONAL"),
            SemenCategory::Sexed => write!(f, "SEXED"),
        }
    }
}

impl FromStr for SemenCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CONVENTIONAL" => Ok(SemenCategory::Conventional),
            "SEXED" => Ok(SemenCategory::Sexed),
            other => SemenCategory::normalize(other)
                .ok_or_else(|| format!("未知冻精类型: {}", other)),
        }
    }
}

// ==========================================
// 近交系数阈值 (Inbreeding Threshold)
// ==========================================
// 可选档位: 3.125% / 6.25% / 12.5% / 不限
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ThresholdRepr", into = "ThresholdRepr")]
pub enum InbreedingThreshold {
    Pct3125,
    Pct625,
    Pct125,
    Unlimited,
}

impl InbreedingThreshold {
    /// 阈值（小数形式）；不限时为 None
    pub fn limit(&self) -> Option<f64> {
        match self {
            InbreedingThreshold::Pct3125 => Some(0.03125),
            InbreedingThreshold::Pct625 => Some(0.0625),
            InbreedingThreshold::Pct125 => Some(0.125),
            InbreedingThreshold::Unlimited => None,
        }
    }

    /// 近交系数是否在阈值内（含等于）
    pub fn allows(&self, coefficient: f64) -> bool {
        match self.limit() {
            Some(limit) => coefficient <= limit + 1e-12,
            None => true,
        }
    }

    /// 从小数形式匹配档位
    pub fn from_fraction(value: f64) -> Option<Self> {
        const EPS: f64 = 1e-9;
        [
            InbreedingThreshold::Pct3125,
            InbreedingThreshold::Pct625,
            InbreedingThreshold::Pct125,
        ]
        .into_iter()
        .find(|t| t.limit().map(|l| (l - value).abs() < EPS).unwrap_or(false))
    }
}

impl Default for InbreedingThreshold {
    fn default() -> Self {
        InbreedingThreshold::Pct625
    }
}

impl fmt::Display for InbreedingThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InbreedingThreshold::Pct3125 => write!(f, "3.125%"),
            InbreedingThreshold::Pct625 => write!(f, "6.25%"),
            InbreedingThreshold::Pct125 => write!(f, "12.5%"),
            InbreedingThreshold::Unlimited => write!(f, "不限"),
        }
    }
}

impl FromStr for InbreedingThreshold {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        match value.to_lowercase().as_str() {
            "不限" | "unlimited" | "none" | "" => return Ok(InbreedingThreshold::Unlimited),
            _ => {}
        }

        let fraction = match value.strip_suffix('%') {
            Some(pct) => pct
                .trim()
                .parse::<f64>()
                .map(|v| v / 100.0)
                .map_err(|_| format!("无法解析近交阈值: {}", value))?,
            None => value
                .parse::<f64>()
                .map_err(|_| format!("无法解析近交阈值: {}", value))?,
        };

        InbreedingThreshold::from_fraction(fraction)
            .ok_or_else(|| format!("近交阈值仅支持 3.125% / 6.25% / 12.5% / 不限，实际: {}", value))
    }
}

/// serde 中间表示：接受 "6.25%" / "不限" / 0.0625
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ThresholdRepr {
    Text(String),
    Fraction(f64),
}

impl TryFrom<ThresholdRepr> for InbreedingThreshold {
    type Error = String;

    fn try_from(repr: ThresholdRepr) -> Result<Self, Self::Error> {
        match repr {
            ThresholdRepr::Text(s) => s.parse(),
            ThresholdRepr::Fraction(v) => InbreedingThreshold::from_fraction(v)
                .ok_or_else(|| format!("近交阈值仅支持 0.03125 / 0.0625 / 0.125，实际: {}", v)),
        }
    }
}

impl From<InbreedingThreshold> for ThresholdRepr {
    fn from(t: InbreedingThreshold) -> Self {
        match t {
            InbreedingThreshold::Unlimited => ThresholdRepr::Text("unlimited".to_string()),
            other => ThresholdRepr::Text(other.to_string()),
        }
    }
}

// ==========================================
// 隐性基因判定 (Defect Verdict)
// ==========================================
// 源数据: "Safe" / "NO safe" / "missing data"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefectVerdict {
    Safe,
    Unsafe,
    MissingData,
}

impl DefectVerdict {
    /// 只有明确 Safe 才视为安全，缺失数据按不安全处理
    pub fn is_safe(&self) -> bool {
        matches!(self, DefectVerdict::Safe)
    }
}

impl fmt::Display for DefectVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefectVerdict::Safe => write!(f, "Safe"),
            DefectVerdict::Unsafe => write!(f, "NO safe"),
            DefectVerdict::MissingData => write!(f, "missing data"),
        }
    }
}

// ==========================================
// 分配通道 (Commit Pass)
// ==========================================
// Strict: 第一轮，占用真实库存
// Advisory: 第二轮兜底推荐，不占用库存
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitPass {
    Strict,
    Advisory,
}

impl CommitPass {
    pub fn is_advisory(&self) -> bool {
        matches!(self, CommitPass::Advisory)
    }
}

impl fmt::Display for CommitPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitPass::Strict => write!(f, "STRICT"),
            CommitPass::Advisory => write!(f, "ADVISORY"),
        }
    }
}

impl FromStr for CommitPass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "STRICT" => Ok(CommitPass::Strict),
            "ADVISORY" => Ok(CommitPass::Advisory),
            other => Err(format!("未知分配通道: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_normalize() {
        assert_eq!(SemenCategory::normalize(" 常规 "), Some(SemenCategory::Conventional));
        assert_eq!(SemenCategory::normalize("性控冻精"), Some(SemenCategory::Sexed));
        assert_eq!(SemenCategory::normalize("Sexed"), Some(SemenCategory::Sexed));
        assert_eq!(SemenCategory::normalize("肉牛"), None);
    }

    #[test]
    fn test_threshold_parse() {
        assert_eq!("6.25%".parse::<InbreedingThreshold>(), Ok(InbreedingThreshold::Pct625));
        assert_eq!("0.125".parse::<InbreedingThreshold>(), Ok(InbreedingThreshold::Pct125));
        assert_eq!("不限".parse::<InbreedingThreshold>(), Ok(InbreedingThreshold::Unlimited));
        assert!("5%".parse::<InbreedingThreshold>().is_err());
    }

    #[test]
    fn test_threshold_allows_boundary() {
        let t = InbreedingThreshold::Pct3125;
        assert!(t.allows(0.03125));
        assert!(!t.allows(0.0625));
        assert!(InbreedingThreshold::Unlimited.allows(0.9));
    }

    #[test]
    fn test_threshold_serde() {
        let t: InbreedingThreshold = serde_json::from_str("\"3.125%\"").unwrap();
        assert_eq!(t, InbreedingThreshold::Pct3125);
        let t: InbreedingThreshold = serde_json::from_str("0.0625").unwrap();
        assert_eq!(t, InbreedingThreshold::Pct625);
        assert_eq!(serde_json::to_string(&InbreedingThreshold::Pct125).unwrap(), "\"12.5%\"");
    }

    #[test]
    fn test_missing_data_is_not_safe() {
        assert!(DefectVerdict::Safe.is_safe());
        assert!(!DefectVerdict::Unsafe.is_safe());
        assert!(!DefectVerdict::MissingData.is_safe());
    }
}
