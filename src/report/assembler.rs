use crate::evidence::EvidenceMerger;
use crate::models::{
    ActionItem, EvidenceRecord, FinalReport, PipelineState, Priority, ReportSection, RiskAssessment,
    SectionKind,
};

use super::{ReportConfig, format_evidence_link};

/// Collates the normalized run state into the final document
pub struct ReportAssembler<'a> {
    config: &'a ReportConfig,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(config: &'a ReportConfig) -> Self {
        Self { config }
    }

    /// Every evidence list in the run, deduplicated
    ///
    /// Order: regulations, then tasks, then plans, then risk items.
    pub fn citations(state: &PipelineState) -> Vec<EvidenceRecord> {
        let mut merger = EvidenceMerger::new();
        merger.extend(state.regulations.iter().flat_map(|r| &r.evidence));
        merger.extend(state.tasks.iter().flat_map(|t| &t.evidence));
        merger.extend(state.plans.iter().flat_map(|p| &p.evidence));
        merger.extend(state.risk_items().iter().flat_map(|r| &r.evidence));
        merger.finish()
    }

    /// Build the report; `executive_summary` is inserted verbatim
    pub fn assemble(
        &self,
        state: &PipelineState,
        executive_summary: &str,
        generated_on: &str,
    ) -> FinalReport {
        let citations = Self::citations(state);

        let full_document = SectionKind::ORDER
            .iter()
            .map(|&kind| ReportSection {
                kind,
                title: kind.title().to_string(),
                body: match kind {
                    SectionKind::BusinessContext => business_context(state),
                    SectionKind::RegulationCatalogue => regulation_catalogue(state),
                    SectionKind::Checklist => checklist(state),
                    SectionKind::PlanTimeline => plan_timeline(state),
                    SectionKind::RiskMatrix => {
                        risk_matrix(state.risk.as_ref(), self.config.max_high_risk_listed)
                    }
                    SectionKind::NarrativeSummary => executive_summary.trim().to_string(),
                    SectionKind::CitationIndex => citation_index(&citations),
                },
            })
            .collect();

        FinalReport {
            title: format!("Compliance Report: {}", state.business_info.label()),
            generated_on: generated_on.to_string(),
            executive_summary: executive_summary.trim().to_string(),
            key_insights: key_insights(state),
            action_items: action_items(state),
            risk_highlights: risk_highlights(state.risk.as_ref()),
            next_steps: next_steps(state),
            full_document,
            citations,
            disclaimer: self.config.disclaimer.clone(),
            pdf_path: None,
        }
    }
}

fn priority_count(state: &PipelineState, priority: Priority) -> usize {
    state
        .regulations
        .iter()
        .filter(|r| r.priority == priority)
        .count()
}

fn evidence_lines(body: &mut String, evidence: &[EvidenceRecord], indent: &str) {
    if evidence.is_empty() {
        return;
    }
    body.push_str(&format!("{}- Sources:\n", indent));
    for record in evidence {
        body.push_str(&format!("{}  - {}\n", indent, format_evidence_link(record)));
    }
}

fn business_context(state: &PipelineState) -> String {
    let info = &state.business_info;
    let mut body = String::from("| Field | Value |\n|---|---|\n");
    body.push_str(&format!("| Industry | {} |\n", info.industry));
    body.push_str(&format!("| Product | {} |\n", info.product_name));
    body.push_str(&format!("| Raw materials | {} |\n", info.raw_materials));
    body.push_str(&format!("| Processes | {} |\n", info.processes.join(", ")));
    body.push_str(&format!("| Employees | {} |\n", info.employee_count));
    body.push_str(&format!("| Sales channels | {} |\n", info.sales_channels.join(", ")));
    if !info.export_countries.is_empty() {
        body.push_str(&format!(
            "| Export countries | {} |\n",
            info.export_countries.join(", ")
        ));
    }
    if !state.keywords.is_empty() {
        body.push_str(&format!("\nSearch keywords: {}\n", state.keywords.join(", ")));
    }
    body
}

fn regulation_catalogue(state: &PipelineState) -> String {
    if state.regulations.is_empty() {
        return "No applicable regulations were identified.\n".to_string();
    }

    let mut body = format!(
        "{} regulations apply (HIGH {}, MEDIUM {}, LOW {}).\n\n",
        state.regulations.len(),
        priority_count(state, Priority::High),
        priority_count(state, Priority::Medium),
        priority_count(state, Priority::Low),
    );

    for priority in Priority::ALL {
        let regulations: Vec<_> = state
            .regulations
            .iter()
            .filter(|r| r.priority == priority)
            .collect();
        if regulations.is_empty() {
            continue;
        }
        body.push_str(&format!("### {} ({})\n\n", priority, priority.action_window()));
        for regulation in regulations {
            body.push_str(&format!(
                "**{}. {}**\n- Category: {}\n- Authority: {}\n- Why it applies: {}\n",
                regulation.id,
                regulation.name,
                regulation.category,
                regulation.authority,
                regulation.why_applicable
            ));
            for requirement in &regulation.requirements {
                body.push_str(&format!("- Requirement: {}\n", requirement));
            }
            evidence_lines(&mut body, &regulation.evidence, "");
            body.push('\n');
        }
    }
    body
}

fn checklist(state: &PipelineState) -> String {
    if state.tasks.is_empty() {
        return "No checklist tasks were generated.\n".to_string();
    }

    let mut body = String::new();
    for regulation in &state.regulations {
        let tasks: Vec<_> = state.tasks_for(&regulation.id).collect();
        if tasks.is_empty() {
            continue;
        }
        body.push_str(&format!("### {} ({})\n\n", regulation.name, regulation.id));
        for (i, task) in tasks.iter().enumerate() {
            body.push_str(&format!(
                "{}. **{}**\n   - Owner: {}\n   - Deadline: {}\n   - Estimated time: {}\n",
                i + 1,
                task.name,
                task.responsible_party,
                task.deadline,
                task.estimated_time
            ));
            for step in &task.steps {
                body.push_str(&format!("   - {}\n", step));
            }
            evidence_lines(&mut body, &task.evidence, "   ");
        }
        body.push('\n');
    }
    body
}

fn plan_timeline(state: &PipelineState) -> String {
    if state.plans.is_empty() {
        return "No execution plans were produced.\n".to_string();
    }

    let mut body = String::new();
    for plan in &state.plans {
        body.push_str(&format!(
            "### {} {}\n\n- Timeline: {}\n- Start: {}\n- Critical path: {}\n",
            plan.plan_id,
            plan.regulation_name,
            plan.timeline,
            plan.start_date,
            plan.critical_path.join(" → ")
        ));
        for milestone in &plan.milestones {
            body.push_str(&format!(
                "- Milestone: {} (tasks {}; due {})\n",
                milestone.name,
                milestone.task_ids.join(", "),
                if milestone.deadline.is_empty() {
                    "TBD"
                } else {
                    milestone.deadline.as_str()
                }
            ));
        }
        for (task, deps) in &plan.dependencies {
            body.push_str(&format!("- Task {} after {}\n", task, deps.join(", ")));
        }
        for group in &plan.parallel_groups {
            body.push_str(&format!("- In parallel: {}\n", group.join(", ")));
        }
        body.push('\n');
    }
    body
}

fn risk_matrix(risk: Option<&RiskAssessment>, max_listed: usize) -> String {
    let Some(risk) = risk else {
        return "Risk assessment was not performed.\n".to_string();
    };

    let mut body = format!(
        "Overall risk score: **{:.2}/10** ({})\n\n\
         | Level | Count |\n|---|---|\n| High | {} |\n| Medium | {} |\n| Low | {} |\n\n",
        risk.overall_score,
        risk.level(),
        risk.matrix.high.len(),
        risk.matrix.medium.len(),
        risk.matrix.low.len(),
    );

    let high: Vec<_> = risk.high_risk_items().collect();
    if !high.is_empty() {
        body.push_str("### High-risk regulations\n\n");
        for item in high.iter().take(max_listed) {
            body.push_str(&format!(
                "- **{}** (score {:.1}): {} {}\n",
                item.regulation_name, item.risk_score, item.penalty_type, item.penalty_amount
            ));
            if !item.business_impact.is_empty() {
                body.push_str(&format!("  - Impact: {}\n", item.business_impact));
            }
            if !item.mitigation.is_empty() {
                body.push_str(&format!("  - Mitigation: {}\n", item.mitigation));
            }
            evidence_lines(&mut body, &item.evidence, "  ");
        }
        if high.len() > max_listed {
            body.push_str(&format!("- ... and {} more\n", high.len() - max_listed));
        }
        body.push('\n');
    }

    if !risk.recommendations.is_empty() {
        body.push_str("### Recommendations\n\n");
        for recommendation in &risk.recommendations {
            body.push_str(&format!("- {}\n", recommendation));
        }
    }
    body
}

fn citation_index(citations: &[EvidenceRecord]) -> String {
    if citations.is_empty() {
        return "No sources were cited.\n".to_string();
    }
    citations
        .iter()
        .enumerate()
        .map(|(i, record)| format!("{}. {}\n", i + 1, format_evidence_link(record)))
        .collect()
}

fn key_insights(state: &PipelineState) -> Vec<String> {
    let mut insights = vec![
        format!(
            "{} regulations apply and need systematic compliance management",
            state.regulations.len()
        ),
        format!(
            "{} HIGH priority regulations must be completed before operations start",
            priority_count(state, Priority::High)
        ),
    ];
    if let Some(risk) = &state.risk {
        insights.push(format!(
            "Overall risk score {:.1}/10: {}",
            risk.overall_score,
            if risk.overall_score >= 7.0 {
                "immediate response needed"
            } else {
                "expert consultation recommended"
            }
        ));
    }
    insights
}

fn action_items(state: &PipelineState) -> Vec<ActionItem> {
    state
        .regulations
        .iter()
        .filter(|r| r.priority == Priority::High)
        .take(3)
        .map(|r| ActionItem {
            name: format!("Start compliance work for {}", r.name),
            deadline: Priority::High.default_start_date().to_string(),
            priority: Priority::High,
        })
        .collect()
}

fn risk_highlights(risk: Option<&RiskAssessment>) -> Vec<String> {
    let Some(risk) = risk else {
        return Vec::new();
    };
    risk.high_risk_items()
        .take(3)
        .map(|item| {
            let penalty = if item.penalty_type.is_empty() {
                "no penalty information"
            } else {
                item.penalty_type.as_str()
            };
            let impact = if item.business_impact.is_empty() {
                "impact not stated"
            } else {
                item.business_impact.as_str()
            };
            format!("{}: {} - {}", item.regulation_name, penalty, impact)
        })
        .collect()
}

fn next_steps(state: &PipelineState) -> Vec<String> {
    vec![
        format!(
            "Immediately: start the {} HIGH priority regulations",
            priority_count(state, Priority::High)
        ),
        "Within 1 week: assign owners for every checklist task".to_string(),
        "Within 2 weeks: confirm the execution schedule and budget".to_string(),
        "Within 1 month: set up monthly progress monitoring".to_string(),
        "Quarterly: have the plan reviewed by a compliance expert".to_string(),
    ]
}
