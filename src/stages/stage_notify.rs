use tracing::{info, warn};

use crate::error::PipelineError;
use crate::graph::StageId;
use crate::io::{Notifier, email_body, email_subject, validate_recipient};
use crate::models::{
    Diagnostic, NotificationStatus, PipelineState, RecipientResult, StageDelta, StageOutput,
};

fn skipped(note: &str) -> StageOutput {
    info!("Notification skipped: {}", note);
    StageOutput::with_diagnostics(
        StageDelta::Notification(NotificationStatus::skipped(note)),
        vec![Diagnostic::new(StageId::Notify, format!("notification skipped: {}", note))],
    )
}

/// Deliver the report to the run's recipients
///
/// Never fails the run: invalid addresses and delivery errors end up in the
/// per-recipient results.
pub async fn execute_notify(
    notifier: Option<&dyn Notifier>,
    state: &PipelineState,
) -> Result<StageOutput, PipelineError> {
    let Some(notifier) = notifier else {
        return Ok(skipped("no notifier configured"));
    };
    let recipients = state.effective_recipients();
    if recipients.is_empty() {
        return Ok(skipped("no recipients"));
    }
    let Some(report) = &state.report else {
        return Ok(skipped("no report"));
    };

    let mut results: Vec<RecipientResult> = Vec::new();
    let mut valid: Vec<String> = Vec::new();
    for recipient in recipients {
        match validate_recipient(&recipient) {
            Ok(()) => valid.push(recipient.trim().to_string()),
            Err(e) => {
                warn!("Not sending to {:?}: {}", recipient, e);
                results.push(RecipientResult::failed(recipient, e));
            }
        }
    }

    let subject = email_subject(&state.business_info);
    let attachment = report.pdf_path.clone();

    let mut attempted = false;
    let mut delivered = false;
    if !valid.is_empty() {
        let body = email_body(
            report,
            &state.business_info,
            state.tasks.len(),
            state.plans.len(),
            attachment.as_deref(),
        );
        let outcome = notifier
            .send(&valid, &subject, &body, attachment.as_deref())
            .await;
        attempted = true;
        delivered = outcome.success;
        results.extend(outcome.per_recipient);
    }

    let success = attempted && delivered && results.iter().all(|r| r.success);
    let diagnostics = results
        .iter()
        .filter(|r| !r.success)
        .map(|r| {
            Diagnostic::for_item(
                StageId::Notify,
                &r.recipient,
                r.error.as_deref().unwrap_or("delivery failed"),
            )
        })
        .collect();

    info!(
        "Notification: {} of {} recipients delivered",
        results.iter().filter(|r| r.success).count(),
        results.len()
    );

    Ok(StageOutput::with_diagnostics(
        StageDelta::Notification(NotificationStatus {
            attempted,
            success,
            subject,
            attachment,
            recipients: results,
            note: None,
        }),
        diagnostics,
    ))
}
