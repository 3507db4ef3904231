use std::path::Path;

use async_trait::async_trait;

use crate::models::{BusinessInfo, FinalReport, NotifyOutcome};

/// Delivery collaborator for the finished report
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        attachment: Option<&Path>,
    ) -> NotifyOutcome;
}

/// Check an address has one `@` and a dotted domain
pub fn validate_recipient(address: &str) -> Result<(), String> {
    let address = address.trim();
    if address.is_empty() {
        return Err("recipient address is empty".to_string());
    }

    let mut parts = address.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("invalid address {:?}: expected user@example.com", address));
    };
    if local.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(format!("invalid address {:?}: expected user@example.com", address));
    }
    Ok(())
}

pub fn email_subject(info: &BusinessInfo) -> String {
    format!("[RegTrack] Compliance report: {}", info.label())
}

/// Plain-text email body summarizing the report
pub fn email_body(
    report: &FinalReport,
    info: &BusinessInfo,
    task_count: usize,
    plan_count: usize,
    attachment: Option<&Path>,
) -> String {
    let mut body = String::new();

    body.push_str(&format!("Compliance analysis for {}\n\n", info.label()));
    body.push_str("Summary\n-------\n");
    if report.executive_summary.trim().is_empty() {
        body.push_str("No summary available.\n");
    } else {
        body.push_str(report.executive_summary.trim());
        body.push('\n');
    }

    body.push_str(&format!(
        "\nChecklist tasks: {}\nExecution plans: {}\n",
        task_count, plan_count
    ));

    if !report.key_insights.is_empty() {
        body.push_str("\nKey insights\n");
        for insight in &report.key_insights {
            body.push_str(&format!("- {}\n", insight));
        }
    }
    if !report.next_steps.is_empty() {
        body.push_str("\nNext steps\n");
        for (i, step) in report.next_steps.iter().enumerate() {
            body.push_str(&format!("{}. {}\n", i + 1, step));
        }
    }

    match attachment.and_then(Path::file_name) {
        Some(name) => body.push_str(&format!(
            "\nThe full report is attached ({}).\n",
            name.to_string_lossy()
        )),
        None => body.push_str(
            "\nThe full report file could not be produced; see the summary above.\n",
        ),
    }

    body
}
