use crate::models::{
    BusinessInfo, ChecklistTask, EvidenceRecord, Regulation, RiskAssessment, SearchResult,
    truncate,
};

/// Number of search results shown to the classifier
const CLASSIFY_SOURCE_LIMIT: usize = 5;

fn push_business(prompt: &mut String, info: &BusinessInfo) {
    prompt.push_str("## Business\n");
    prompt.push_str(&format!("Industry: {}\n", info.industry));
    prompt.push_str(&format!("Product: {}\n", info.product_name));
    prompt.push_str(&format!("Raw materials: {}\n", info.raw_materials));
    prompt.push_str(&format!("Processes: {}\n", info.processes.join(", ")));
    prompt.push_str(&format!("Employees: {}\n", info.employee_count));
    if !info.sales_channels.is_empty() {
        prompt.push_str(&format!("Sales channels: {}\n", info.sales_channels.join(", ")));
    }
    if !info.export_countries.is_empty() {
        prompt.push_str(&format!(
            "Export countries: {}\n",
            info.export_countries.join(", ")
        ));
    }
    prompt.push('\n');
}

fn push_sources(prompt: &mut String, evidence: &[EvidenceRecord]) {
    prompt.push_str("## Available sources\n");
    if evidence.is_empty() {
        prompt.push_str("No registered sources.\n\n");
        return;
    }
    for src in evidence {
        prompt.push_str(&format!(
            "{} | {}\nURL: {}\nExcerpt: {}\n",
            src.source_id, src.title, src.url, src.snippet
        ));
    }
    prompt.push('\n');
}

fn push_regulation(prompt: &mut String, regulation: &Regulation) {
    prompt.push_str(&format!("Regulation: {}\n", regulation.name));
    prompt.push_str(&format!("Category: {}\n", regulation.category));
    prompt.push_str(&format!("Authority: {}\n", regulation.authority));
    prompt.push_str(&format!("Priority: {}\n", regulation.priority));
    prompt.push_str(&format!("Why applicable: {}\n", regulation.why_applicable));
    prompt.push_str("Key requirements:\n");
    for req in &regulation.requirements {
        prompt.push_str(&format!("  - {}\n", req));
    }
    prompt.push('\n');
}

/// Ask for 5-7 search keywords describing the regulatory exposure
pub fn build_keywords_prompt(info: &BusinessInfo) -> String {
    let mut prompt = String::from("# Keyword extraction\n\n");
    push_business(&mut prompt, info);
    prompt.push_str(
        "Extract 5 to 7 search keywords that identify the regulations, permits and \
certifications this business is subject to.\n\
Respond with JSON only: {\"keywords\": [\"keyword1\", \"keyword2\"]}\n",
    );
    prompt
}

/// Ask for applicable regulations grounded in the numbered search results
pub fn build_classify_prompt(info: &BusinessInfo, results: &[SearchResult]) -> String {
    let mut prompt = String::from("# Regulation classification\n\n");
    push_business(&mut prompt, info);

    prompt.push_str("## Search results\n");
    if results.is_empty() {
        prompt.push_str("No search results; rely on well-established regulations only.\n");
    }
    for result in results.iter().take(CLASSIFY_SOURCE_LIMIT) {
        prompt.push_str(&format!(
            "{} | {}\nURL: {}\nSummary: {}\n\n",
            result.source_id,
            result.title,
            result.url,
            truncate(&result.content, 300)
        ));
    }

    prompt.push_str(
        "\n## Instructions\n\
1. Propose 5 to 7 regulations. Cite at least one source id for each.\n\
2. category is one of: safety_environment | product_certification | factory_operations.\n\
3. key_requirements holds 2 to 4 actionable sentences.\n\
4. Respond with a JSON array only:\n\
[{\"name\": \"...\", \"category\": \"...\", \"why_applicable\": \"...\", \"authority\": \"...\", \
\"key_requirements\": [\"...\"], \"reference_url\": \"https://...\", \
\"sources\": [{\"source_id\": \"SRC-001\", \"excerpt\": \"...\"}]}]\n",
    );
    prompt
}

/// Ask for one priority label per regulation, one per line
pub fn build_prioritize_prompt(info: &BusinessInfo, regulations: &[Regulation]) -> String {
    let mut prompt = String::from("# Regulation prioritization\n\n");
    push_business(&mut prompt, info);

    prompt.push_str("## Regulations\n");
    for (i, regulation) in regulations.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {} ({})\n",
            i + 1,
            regulation.name,
            regulation.category
        ));
    }
    prompt.push_str(
        "\nAssign each regulation HIGH, MEDIUM or LOW priority based on penalties and \
how soon it applies to operations.\n\
Respond with exactly one label per line, in the same order, and nothing else.\n",
    );
    prompt
}

/// Ask for 3-5 actionable tasks for one regulation
pub fn build_checklist_prompt(regulation: &Regulation, today: &str) -> String {
    let mut prompt = String::from("# Checklist generation\n\n");
    push_regulation(&mut prompt, regulation);
    push_sources(&mut prompt, &regulation.evidence);
    prompt.push_str(&format!("Today: {}\n\n", today));
    prompt.push_str(
        "## Instructions\n\
1. Produce 3 to 5 tasks. The last step of each task secures records or proof.\n\
2. Deadlines are YYYY-MM-DD: HIGH within 1-3 months, MEDIUM 3-6 months, LOW 6-12 months.\n\
3. Cite sources by source_id in evidence.\n\
4. Respond with a JSON array only:\n\
[{\"task_name\": \"...\", \"responsible_dept\": \"...\", \"deadline\": \"YYYY-MM-DD\", \
\"method\": [\"1. ...\"], \"estimated_time\": \"2 weeks\", \
\"evidence\": [{\"source_id\": \"SRC-001\", \"justification\": \"...\"}]}]\n",
    );
    prompt
}

/// Ask for a milestone/dependency plan over the numbered tasks of one regulation
pub fn build_plan_prompt(regulation: &Regulation, tasks: &[&ChecklistTask]) -> String {
    let mut prompt = String::from("# Execution planning\n\n");
    prompt.push_str(&format!("Regulation: {}\n", regulation.name));
    prompt.push_str(&format!("Priority: {}\n\n", regulation.priority));

    prompt.push_str("## Tasks\n");
    for (i, task) in tasks.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {}\n   Owner: {}\n   Deadline: {}\n   Duration: {}\n",
            i + 1,
            task.name,
            task.responsible_party,
            task.deadline,
            task.estimated_time
        ));
    }

    prompt.push_str(
        "\nRefer to tasks by their number only.\n\
Respond with JSON only:\n\
{\"timeline\": \"3 months\", \"start_date\": \"immediately\", \
\"milestones\": [{\"name\": \"...\", \"deadline\": \"...\", \"tasks\": [\"1\", \"2\"], \
\"completion_criteria\": \"...\"}], \"dependencies\": {\"2\": [\"1\"]}, \
\"parallel_tasks\": [[\"1\", \"3\"]], \"critical_path\": [\"1\", \"2\"]}\n",
    );
    prompt
}

/// Ask for penalty exposure and a 0-10 score for one regulation
pub fn build_risk_prompt(info: &BusinessInfo, regulation: &Regulation) -> String {
    let mut prompt = String::from("# Risk assessment\n\n");
    push_business(&mut prompt, info);
    push_regulation(&mut prompt, regulation);
    push_sources(&mut prompt, &regulation.evidence);
    prompt.push_str(
        "## Instructions\n\
Assess the risk of non-compliance. Respond with a JSON object only:\n\
{\"penalty_amount\": \"...\", \"penalty_type\": \"criminal|fine|administrative|\", \
\"business_impact\": \"...\", \"risk_score\": 0-10, \"past_cases\": [\"...\"], \
\"mitigation\": \"...\", \
\"evidence\": [{\"source_id\": \"SRC-001\", \"justification\": \"...\"}]}\n",
    );
    prompt
}

/// Ask for the narrative executive summary of the assembled report
pub fn build_summary_prompt(
    info: &BusinessInfo,
    regulations: &[Regulation],
    task_count: usize,
    risk: Option<&RiskAssessment>,
) -> String {
    let mut prompt = String::from("# Executive summary\n\n");
    push_business(&mut prompt, info);

    prompt.push_str(&format!(
        "Applicable regulations: {}\nChecklist tasks: {}\n",
        regulations.len(),
        task_count
    ));
    for regulation in regulations {
        prompt.push_str(&format!("- [{}] {}\n", regulation.priority, regulation.name));
    }
    if let Some(risk) = risk {
        prompt.push_str(&format!(
            "Overall risk score: {:.1}/10 ({} high-risk)\n",
            risk.overall_score,
            risk.matrix.high.len()
        ));
    }
    prompt.push_str(
        "\nWrite a 3-4 sentence executive summary for the business owner. \
Plain prose, no headings or lists.\n",
    );
    prompt
}
