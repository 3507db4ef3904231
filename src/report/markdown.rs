use reqwest::Url;

use crate::models::{EvidenceRecord, FinalReport};

/// Host part of `url`, if it parses as an absolute URL
fn hostname(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Markdown link for a citation: `[title](url) summary`
///
/// Falls back to the URL's hostname when the title is empty or is itself a URL.
pub fn format_evidence_link(record: &EvidenceRecord) -> String {
    let url = record.url.trim();
    let title = record.title.trim();

    let title_is_url = title.starts_with("http://")
        || title.starts_with("https://")
        || (!url.is_empty() && title.eq_ignore_ascii_case(url));

    let label = if title.is_empty() || title_is_url {
        hostname(url)
            .or_else(|| hostname(title))
            .unwrap_or_else(|| {
                if record.source_id.is_empty() {
                    "Unknown".to_string()
                } else {
                    record.source_id.clone()
                }
            })
    } else {
        title.to_string()
    };

    let summary = record.summary();
    let link = if url.is_empty() {
        format!("**{}**", label)
    } else {
        format!("[{}]({})", label, url)
    };

    if summary.is_empty() {
        link
    } else {
        format!("{} {}", link, summary)
    }
}

impl FinalReport {
    /// Render the whole document, disclaimer last
    pub fn to_markdown(&self) -> String {
        let mut md = format!("# {}\n\n", self.title);
        if !self.generated_on.is_empty() {
            md.push_str(&format!("Generated: {}\n\n", self.generated_on));
        }

        for (i, section) in self.full_document.iter().enumerate() {
            md.push_str(&format!("## {}. {}\n\n", i + 1, section.title));
            md.push_str(section.body.trim_end());
            md.push_str("\n\n");
        }

        if !self.next_steps.is_empty() {
            md.push_str("## Next Steps\n\n");
            for step in &self.next_steps {
                md.push_str(&format!("- {}\n", step));
            }
            md.push('\n');
        }

        if !self.disclaimer.is_empty() {
            md.push_str("---\n\n");
            md.push_str(&format!("> {}\n", self.disclaimer));
        }
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportSection, SectionKind};

    fn record(title: &str, url: &str) -> EvidenceRecord {
        EvidenceRecord {
            source_id: "SRC-001".to_string(),
            title: title.to_string(),
            url: url.to_string(),
            snippet: "Article 3\nrequires registration".to_string(),
            justification: String::new(),
        }
    }

    #[test]
    fn test_link_with_title() {
        assert_eq!(
            format_evidence_link(&record("Chemicals Act", "https://law.example.org/a")),
            "[Chemicals Act](https://law.example.org/a) Article 3 requires registration"
        );
    }

    #[test]
    fn test_link_falls_back_to_hostname() {
        let link = format_evidence_link(&record("", "https://www.law.example.org/a?x=1"));
        assert!(link.starts_with("[www.law.example.org](https://www.law.example.org/a?x=1)"));

        let link = format_evidence_link(&record(
            "https://www.law.example.org/a",
            "https://www.law.example.org/a",
        ));
        assert!(link.starts_with("[www.law.example.org]"));
    }

    #[test]
    fn test_link_prefers_justification() {
        let mut rec = record("Act", "");
        rec.justification = "Applies to lithium cells".to_string();
        assert_eq!(format_evidence_link(&rec), "**Act** Applies to lithium cells");
    }

    #[test]
    fn test_markdown_numbers_sections_and_ends_with_disclaimer() {
        let report = FinalReport {
            title: "Compliance Report".to_string(),
            full_document: vec![
                ReportSection {
                    kind: SectionKind::BusinessContext,
                    title: SectionKind::BusinessContext.title().to_string(),
                    body: "ctx\n".to_string(),
                },
                ReportSection {
                    kind: SectionKind::NarrativeSummary,
                    title: SectionKind::NarrativeSummary.title().to_string(),
                    body: "summary".to_string(),
                },
            ],
            disclaimer: "Not legal advice.".to_string(),
            ..Default::default()
        };
        let md = report.to_markdown();
        assert!(md.starts_with("# Compliance Report\n"));
        assert!(md.contains("## 1. Business Context\n\nctx\n"));
        assert!(md.contains("## 2. Executive Summary\n\nsummary\n"));
        assert!(md.trim_end().ends_with("> Not legal advice."));
    }
}
