//! Data dictionary parsing: table, variables, statistics, categories
//!
//! The structure is fixed, so nothing here consults the field type
//! registry. Any shape or enumeration mismatch is fatal.

use serde_json::Value;

use super::node::{self, Object};
use crate::error::{ParseError, Result};
use crate::model::{
    DataTable, DataVariable, SummaryStatistic, SummaryStatisticType, VariableCategory, VariableFormat,
    VariableInterval,
};

/// Parse a `dataTables` array; each entry wraps a `dataTable` object
pub fn parse_data_tables(nodes: &[Value]) -> Result<Vec<DataTable>> {
    nodes
        .iter()
        .map(|entry| {
            let wrapper = node::as_object(entry, "data table entry")?;
            let table = node::present(wrapper, "dataTable")
                .ok_or_else(|| ParseError::structural("data table entry has no dataTable"))?;
            parse_data_table(table)
        })
        .collect()
}

pub fn parse_data_table(value: &Value) -> Result<DataTable> {
    let obj = node::as_object(value, "dataTable")?;

    let variables = match node::present(obj, "dataVariables") {
        Some(vars) => node::as_array(vars, "dataVariables")?
            .iter()
            .map(parse_data_variable)
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(DataTable {
        var_quantity: node::required_u64(obj, "varQuantity", "dataTable")?,
        case_quantity: node::required_u64(obj, "caseQuantity", "dataTable")?,
        original_file_format: node::required_string(obj, "originalFileFormat", "dataTable")?,
        original_file_name: node::required_string(obj, "originalFileName", "dataTable")?,
        original_file_size: node::required_u64(obj, "originalFileSize", "dataTable")?,
        unf: node::opt_string(obj, "UNF")?,
        variables,
    })
}

fn parse_data_variable(value: &Value) -> Result<DataVariable> {
    let obj = node::as_object(value, "data variable")?;

    let interval = node::opt_string(obj, "variableIntervalType")?
        .map(|s| {
            VariableInterval::parse(&s)
                .ok_or_else(|| ParseError::format("variableIntervalType", format!("unknown interval type '{}'", s)))
        })
        .transpose()?;

    let format = node::opt_string(obj, "variableFormatType")?
        .map(|s| {
            VariableFormat::parse(&s)
                .ok_or_else(|| ParseError::format("variableFormatType", format!("unknown format type '{}'", s)))
        })
        .transpose()?;

    let categories = match node::present(obj, "variableCategories") {
        Some(cats) => parse_variable_categories(node::as_array(cats, "variableCategories")?)?,
        None => Vec::new(),
    };

    Ok(DataVariable {
        name: node::opt_string(obj, "name")?,
        label: node::opt_string(obj, "label")?,
        weighted: node::opt_bool(obj, "weighted")?.unwrap_or(false),
        interval,
        format,
        ordered_factor: node::opt_bool(obj, "orderedFactor")?.unwrap_or(false),
        factor: node::opt_bool(obj, "factor")?.unwrap_or(false),
        file_order: node::required_i64(obj, "fileOrder", "data variable")?,
        unf: node::opt_string(obj, "UNF")?,
        summary_statistics: parse_summary_statistics(node::present(obj, "summaryStatistics"))?,
        categories,
    })
}

/// Statistics in fixed order; blank values are skipped
pub fn parse_summary_statistics(value: Option<&Value>) -> Result<Vec<SummaryStatistic>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let obj = node::as_object(value, "summaryStatistics")?;

    let mut statistics = Vec::new();
    for kind in SummaryStatisticType::ALL {
        if let Some(stat) = node::opt_text(obj, kind.key())? {
            if !stat.trim().is_empty() {
                statistics.push(SummaryStatistic { kind, value: stat });
            }
        }
    }
    Ok(statistics)
}

pub fn parse_variable_categories(nodes: &[Value]) -> Result<Vec<VariableCategory>> {
    nodes
        .iter()
        .map(|value| {
            let obj: &Object = node::as_object(value, "variable category")?;
            Ok(VariableCategory {
                label: node::opt_text(obj, "label")?.unwrap_or_default(),
                value: node::opt_text(obj, "value")?.unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> Value {
        json!({
            "varQuantity": 2,
            "caseQuantity": "150",
            "originalFileFormat": "text/csv",
            "originalFileName": "survey.csv",
            "originalFileSize": 20480,
            "UNF": "UNF:6:abc==",
            "dataVariables": [
                {
                    "name": "age",
                    "label": "Age in years",
                    "variableIntervalType": "contin",
                    "variableFormatType": "NUMERIC",
                    "fileOrder": 0,
                    "summaryStatistics": {"stdev": "11.2", "mean": "41.5", "mode": "", "max": 90}
                },
                {
                    "name": "sex",
                    "variableIntervalType": "DISCRETE",
                    "variableFormatType": "CHARACTER",
                    "factor": true,
                    "fileOrder": 1,
                    "variableCategories": [{"label": "Female", "value": "F"}, {"value": "M"}]
                }
            ]
        })
    }

    #[test]
    fn test_parse_table() {
        let parsed = parse_data_tables(&[json!({"dataTable": table()})]).unwrap();
        assert_eq!(parsed.len(), 1);

        let t = &parsed[0];
        assert_eq!(t.case_quantity, 150);
        assert_eq!(t.original_file_size, 20480);
        assert_eq!(t.variables.len(), 2);

        let age = &t.variables[0];
        assert_eq!(age.interval, Some(VariableInterval::Continuous));
        assert_eq!(age.format, Some(VariableFormat::Numeric));
        let stats: Vec<(SummaryStatisticType, &str)> =
            age.summary_statistics.iter().map(|s| (s.kind, s.value.as_str())).collect();
        assert_eq!(
            stats,
            vec![
                (SummaryStatisticType::Mean, "41.5"),
                (SummaryStatisticType::Max, "90"),
                (SummaryStatisticType::Stdev, "11.2"),
            ]
        );

        let sex = &t.variables[1];
        assert!(sex.factor);
        assert_eq!(sex.interval, Some(VariableInterval::Discrete));
        assert_eq!(sex.categories[1].label, "");
        assert_eq!(sex.categories[1].value, "M");
    }

    #[test]
    fn test_unknown_interval_names_the_field() {
        let mut t = table();
        t["dataVariables"][0]["variableIntervalType"] = json!("ordinal");
        match parse_data_table(&t) {
            Err(ParseError::Format { field, .. }) => assert_eq!(field, "variableIntervalType"),
            other => panic!("Expected Format error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_order() {
        let mut t = table();
        t["dataVariables"][1].as_object_mut().unwrap().remove("fileOrder");
        assert!(matches!(parse_data_table(&t), Err(ParseError::Structural(_))));
    }

    #[test]
    fn test_missing_wrapper() {
        assert!(matches!(
            parse_data_tables(&[table()]),
            Err(ParseError::Structural(_))
        ));
    }

    #[test]
    fn test_table_without_variables() {
        let mut t = table();
        t.as_object_mut().unwrap().remove("dataVariables");
        assert!(parse_data_table(&t).unwrap().variables.is_empty());
    }
}
