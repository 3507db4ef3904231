use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::BusinessInfo;

/// What a run starts from
#[derive(Debug, Clone, PartialEq)]
pub struct RunInput {
    pub business_info: BusinessInfo,
    pub recipients: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InputFile {
    Wrapped {
        business_info: BusinessInfo,
        #[serde(default)]
        recipients: Vec<String>,
    },
    Bare(BusinessInfo),
}

/// Read a run input file
///
/// Accepts either `{"business_info": {...}, "recipients": [...]}` or a bare
/// business info object.
pub fn read_run_input(path: &Path) -> Result<RunInput> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_run_input(&content)
}

pub fn parse_run_input(json: &str) -> Result<RunInput> {
    let file: InputFile = serde_json::from_str(json).context("Failed to parse run input JSON")?;
    Ok(match file {
        InputFile::Wrapped {
            business_info,
            recipients,
        } => RunInput {
            business_info,
            recipients,
        },
        InputFile::Bare(business_info) => RunInput {
            business_info,
            recipients: Vec::new(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrapped_input() {
        let input = parse_run_input(
            r#"{"business_info": {"industry": "Battery manufacturing", "employee_count": 45},
                "recipients": ["ops@example.com"]}"#,
        )
        .unwrap();
        assert_eq!(input.business_info.industry, "Battery manufacturing");
        assert_eq!(input.business_info.employee_count, 45);
        assert_eq!(input.recipients, vec!["ops@example.com"]);
    }

    #[test]
    fn test_parse_bare_business_info() {
        let input =
            parse_run_input(r#"{"industry": "Food processing", "processes": ["mixing"]}"#).unwrap();
        assert_eq!(input.business_info.industry, "Food processing");
        assert_eq!(input.business_info.processes, vec!["mixing"]);
        assert!(input.recipients.is_empty());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(parse_run_input("industry: food").is_err());
    }
}
