use serde::{Deserialize, Serialize};

use super::EvidenceRecord;

/// Thresholds used to bucket risk scores
#[derive(Debug, Clone)]
pub struct RiskConfig {
    /// Scores at or above this are high risk
    pub high_threshold: f64,
    /// Scores at or above this (and below high) are medium risk
    pub medium_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_threshold: 7.0,
            medium_threshold: 4.0,
        }
    }
}

/// Non-compliance risk for one regulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskItem {
    pub regulation_id: String,
    pub regulation_name: String,
    pub penalty_amount: String,
    pub penalty_type: String,
    pub business_impact: String,
    /// Always within 0.0..=10.0
    pub risk_score: f64,
    pub past_cases: Vec<String>,
    pub mitigation: String,
    pub evidence: Vec<EvidenceRecord>,
}

/// Regulation ids bucketed by risk score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMatrix {
    pub high: Vec<String>,
    pub medium: Vec<String>,
    pub low: Vec<String>,
}

/// Aggregated output of the risk stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub items: Vec<RiskItem>,
    /// Arithmetic mean of item scores, rounded to two decimals
    pub overall_score: f64,
    pub matrix: RiskMatrix,
    pub recommendations: Vec<String>,
}

impl RiskAssessment {
    /// Aggregate scored items into an assessment
    ///
    /// `high_priority_count` is the number of HIGH priority regulations in the run.
    pub fn from_items(
        items: Vec<RiskItem>,
        config: &RiskConfig,
        high_priority_count: usize,
    ) -> Self {
        let overall_score = if items.is_empty() {
            0.0
        } else {
            let mean = items.iter().map(|i| i.risk_score).sum::<f64>() / items.len() as f64;
            (mean * 100.0).round() / 100.0
        };

        let mut matrix = RiskMatrix::default();
        for item in &items {
            let bucket = if item.risk_score >= config.high_threshold {
                &mut matrix.high
            } else if item.risk_score >= config.medium_threshold {
                &mut matrix.medium
            } else {
                &mut matrix.low
            };
            bucket.push(item.regulation_id.clone());
        }

        let mut recommendations = Vec::new();
        if !matrix.high.is_empty() {
            recommendations.push(format!(
                "{} high-risk regulations: start compliance work immediately",
                matrix.high.len()
            ));
        }
        if overall_score >= config.high_threshold {
            recommendations.push("Liability insurance is strongly recommended".to_string());
        }
        if high_priority_count > 0 {
            recommendations.push(format!(
                "{} HIGH priority regulations must be completed before operations start",
                high_priority_count
            ));
        }
        recommendations.push("Set up a monthly compliance status review".to_string());

        Self {
            items,
            overall_score,
            matrix,
            recommendations,
        }
    }

    /// Items in the high bucket, in assessment order
    pub fn high_risk_items(&self) -> impl Iterator<Item = &RiskItem> {
        self.items
            .iter()
            .filter(|item| self.matrix.high.contains(&item.regulation_id))
    }

    /// Qualitative label for the overall score
    pub fn level(&self) -> &'static str {
        if self.overall_score >= 8.0 {
            "very high"
        } else if self.overall_score >= 6.0 {
            "high"
        } else {
            "moderate"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, score: f64) -> RiskItem {
        RiskItem {
            regulation_id: id.to_string(),
            regulation_name: format!("Regulation {}", id),
            penalty_amount: String::new(),
            penalty_type: String::new(),
            business_impact: String::new(),
            risk_score: score,
            past_cases: vec![],
            mitigation: String::new(),
            evidence: vec![],
        }
    }

    #[test]
    fn test_overall_score_is_mean() {
        let assessment = RiskAssessment::from_items(
            vec![item("REG-001", 8.0), item("REG-002", 5.0), item("REG-003", 2.0)],
            &RiskConfig::default(),
            0,
        );
        assert_eq!(assessment.overall_score, 5.0);
        assert_eq!(assessment.matrix.high, vec!["REG-001"]);
        assert_eq!(assessment.matrix.medium, vec!["REG-002"]);
        assert_eq!(assessment.matrix.low, vec!["REG-003"]);
        assert_eq!(assessment.high_risk_items().count(), 1);
    }

    #[test]
    fn test_overall_score_rounded() {
        let assessment = RiskAssessment::from_items(
            vec![item("a", 7.0), item("b", 7.0), item("c", 8.0)],
            &RiskConfig::default(),
            0,
        );
        assert_eq!(assessment.overall_score, 7.33);
    }

    #[test]
    fn test_empty_assessment() {
        let assessment = RiskAssessment::from_items(vec![], &RiskConfig::default(), 0);
        assert_eq!(assessment.overall_score, 0.0);
        assert_eq!(assessment.recommendations.len(), 1);
    }

    #[test]
    fn test_recommendations_for_high_risk() {
        let assessment = RiskAssessment::from_items(
            vec![item("a", 9.0), item("b", 8.0)],
            &RiskConfig::default(),
            2,
        );
        assert_eq!(assessment.recommendations.len(), 4);
        assert!(assessment.recommendations[0].starts_with("2 high-risk"));
        assert_eq!(assessment.level(), "very high");
    }
}
