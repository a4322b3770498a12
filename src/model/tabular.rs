//! Tabular data dictionary nodes: table → variable → statistic / category

use std::fmt;

use serde::Serialize;

/// A tabular data file's dictionary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTable {
    pub var_quantity: u64,
    pub case_quantity: u64,
    pub original_file_format: String,
    pub original_file_name: String,
    pub original_file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unf: Option<String>,
    /// Document order
    pub variables: Vec<DataVariable>,
}

/// One column of a data table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataVariable {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub weighted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<VariableInterval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<VariableFormat>,
    pub ordered_factor: bool,
    pub factor: bool,
    pub file_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unf: Option<String>,
    pub summary_statistics: Vec<SummaryStatistic>,
    pub categories: Vec<VariableCategory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableInterval {
    Discrete,
    Continuous,
    Nominal,
    Dichotomous,
}

impl VariableInterval {
    /// Case-insensitive; the abbreviated `contin` spelling means continuous
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "DISCRETE" => Some(Self::Discrete),
            "CONTIN" | "CONTINUOUS" => Some(Self::Continuous),
            "NOMINAL" => Some(Self::Nominal),
            "DICHOTOMOUS" => Some(Self::Dichotomous),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableFormat {
    Numeric,
    Character,
}

impl VariableFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NUMERIC" => Some(Self::Numeric),
            "CHARACTER" => Some(Self::Character),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryStatisticType {
    Mean,
    Medn,
    Mode,
    Vald,
    Invd,
    Min,
    Max,
    Stdev,
}

impl SummaryStatisticType {
    /// Every statistic, in the order they are emitted
    pub const ALL: [SummaryStatisticType; 8] = [
        Self::Mean,
        Self::Medn,
        Self::Mode,
        Self::Vald,
        Self::Invd,
        Self::Min,
        Self::Max,
        Self::Stdev,
    ];

    /// Key used in the `summaryStatistics` object
    pub fn key(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Medn => "medn",
            Self::Mode => "mode",
            Self::Vald => "vald",
            Self::Invd => "invd",
            Self::Min => "min",
            Self::Max => "max",
            Self::Stdev => "stdev",
        }
    }
}

impl fmt::Display for SummaryStatisticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStatistic {
    #[serde(rename = "type")]
    pub kind: SummaryStatisticType,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableCategory {
    pub label: String,
    pub value: String,
}
