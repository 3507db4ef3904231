use serde_json::Value;
use tracing::info;

use super::{StageContext, complete_with_parse_retry};
use crate::error::PipelineError;
use crate::graph::StageId;
use crate::llm::build_prioritize_prompt;
use crate::models::{Diagnostic, PipelineState, Priority, StageDelta, StageOutput};
use crate::normalize::{extract_json, str_field};

/// Upper bound on the line number a numbered label may claim
const MAX_NUMBERED_SLOT: usize = 1000;

/// Priority labels by response position
///
/// Accepts a JSON array of labels or objects with a `priority` field, one
/// slot per element. Text responses give one slot per line between the first
/// and last labelled line, or place each label at its line number when the
/// lines are numbered ("3. LOW"). Slots without a recognizable label are
/// `None`. Returns `None` when the response carries no label at all.
pub fn parse_priorities(text: &str) -> Option<Vec<Option<Priority>>> {
    let slots = match extract_json(text) {
        Some(Value::Array(items)) => items.iter().map(label_of).collect(),
        _ => parse_lines(text),
    };
    slots.iter().any(Option::is_some).then_some(slots)
}

fn label_of(item: &Value) -> Option<Priority> {
    match item {
        Value::String(s) => Priority::parse(s),
        Value::Object(map) => str_field(map, &["priority"]).and_then(|p| Priority::parse(&p)),
        _ => None,
    }
}

fn parse_lines(text: &str) -> Vec<Option<Priority>> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let numbered: Vec<(usize, Option<Priority>)> = lines
        .iter()
        .filter_map(|line| {
            let (n, rest) = split_line_number(line)?;
            Some((n, Priority::parse(rest)))
        })
        .collect();

    if numbered.iter().any(|(_, label)| label.is_some()) {
        let len = numbered.iter().map(|(n, _)| *n).max().unwrap_or(0);
        let mut slots = vec![None; len];
        for (n, label) in numbered {
            if label.is_some() {
                slots[n - 1] = label;
            }
        }
        return slots;
    }

    let first = lines.iter().position(|l| Priority::parse(l).is_some());
    let last = lines.iter().rposition(|l| Priority::parse(l).is_some());
    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last]
            .iter()
            .map(|l| Priority::parse(l))
            .collect(),
        _ => Vec::new(),
    }
}

/// Split "3. LOW" or "3) LOW" into its line number and remainder
fn split_line_number(line: &str) -> Option<(usize, &str)> {
    let digits = line.find(|c: char| !c.is_ascii_digit())?;
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix(['.', ')', ':'])?;
    let n: usize = line[..digits].parse().ok()?;
    (1..=MAX_NUMBERED_SLOT).contains(&n).then_some((n, rest))
}

pub async fn execute_prioritize(
    ctx: &StageContext<'_>,
    state: &PipelineState,
) -> Result<StageOutput, PipelineError> {
    let count = state.regulations.len();
    if count == 0 {
        return Ok(StageOutput::new(StageDelta::Priorities(Vec::new())));
    }

    let prompt = build_prioritize_prompt(&state.business_info, &state.regulations);
    let slots = complete_with_parse_retry(
        ctx.client,
        StageId::Prioritize,
        &prompt,
        ctx.config.items.parse_retries,
        parse_priorities,
    )
    .await?
    .unwrap_or_default();

    let priorities: Vec<Priority> = (0..count)
        .map(|i| slots.get(i).copied().flatten().unwrap_or_default())
        .collect();

    let missing = (0..count)
        .filter(|&i| slots.get(i).copied().flatten().is_none())
        .count();
    let mut diagnostics = Vec::new();
    if missing > 0 {
        diagnostics.push(Diagnostic::new(
            StageId::Prioritize,
            format!(
                "{} of {} regulations had no priority label; defaulted to MEDIUM",
                missing,
                count
            ),
        ));
    }

    for (regulation, priority) in state.regulations.iter().zip(&priorities) {
        info!("  [{}] {}", priority, regulation.name);
    }

    Ok(StageOutput::with_diagnostics(
        StageDelta::Priorities(priorities),
        diagnostics,
    ))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::llm::{ClientError, TextGenerationClient};
    use crate::models::{BusinessInfo, Category, Regulation};
    use crate::stages::PipelineConfig;

    use crate::models::Priority::{High, Low, Medium};

    struct OneLabel;

    #[async_trait]
    impl TextGenerationClient for OneLabel {
        async fn complete(&self, prompt: &str) -> Result<String, ClientError> {
            assert!(prompt.starts_with("# Regulation prioritization"));
            Ok("HIGH".to_string())
        }
    }

    fn state(names: &[&str]) -> PipelineState {
        let mut state = PipelineState::new(BusinessInfo::default());
        for (i, name) in names.iter().enumerate() {
            state.regulations.push(Regulation {
                id: format!("REG-00{}", i + 1),
                name: name.to_string(),
                category: Category::FactoryOperations,
                why_applicable: String::new(),
                authority: String::new(),
                priority: Priority::Low,
                requirements: vec![],
                reference_url: None,
                evidence: vec![],
            });
        }
        state
    }

    #[test]
    fn test_parse_lines_with_noise() {
        let text = "Here you go:\n1. HIGH\n2. low\n\n3. Medium - penalties are moderate";
        let parsed = parse_priorities(text).unwrap();
        assert_eq!(parsed, vec![Some(High), Some(Low), Some(Medium)]);
    }

    #[test]
    fn test_unlabelled_line_keeps_its_position() {
        assert_eq!(
            parse_priorities("HIGH\nN/A\nLOW").unwrap(),
            vec![Some(High), None, Some(Low)]
        );
        assert_eq!(
            parse_priorities("Priorities:\nHIGH\nunsure\nLOW\nThanks!").unwrap(),
            vec![Some(High), None, Some(Low)]
        );
    }

    #[test]
    fn test_numbered_lines_place_by_number() {
        assert_eq!(
            parse_priorities("1. HIGH\n3) LOW").unwrap(),
            vec![Some(High), None, Some(Low)]
        );
        assert_eq!(
            parse_priorities("1. Chemicals Act (low-volume exemption): HIGH\n2. N/A\n3. MEDIUM")
                .unwrap(),
            vec![Some(High), None, Some(Medium)]
        );
    }

    #[test]
    fn test_parse_json_array() {
        assert_eq!(
            parse_priorities(r#"["HIGH", {"priority": "LOW"}, 3, "MEDIUM"]"#).unwrap(),
            vec![Some(High), Some(Low), None, Some(Medium)]
        );
    }

    #[test]
    fn test_parse_nothing() {
        assert!(parse_priorities("I am not sure.").is_none());
        assert!(parse_priorities("[1, 2]").is_none());
    }

    #[tokio::test]
    async fn test_missing_labels_default_to_medium() {
        let config = PipelineConfig::default();
        let ctx = StageContext {
            client: &OneLabel,
            config: &config,
        };
        let state = state(&["Business Licence Act", "Food Safety Act", "Signage Bylaw"]);

        let output = execute_prioritize(&ctx, &state).await.unwrap();
        let StageDelta::Priorities(priorities) = output.delta else {
            panic!("wrong delta");
        };
        assert_eq!(priorities, vec![High, Medium, Medium]);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].stage, StageId::Prioritize);
        assert!(output.diagnostics[0].message.starts_with("2 of 3 regulations"));
    }
}
