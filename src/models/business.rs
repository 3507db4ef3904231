use serde::{Deserialize, Serialize};

/// Description of the business whose regulatory exposure is analysed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessInfo {
    pub industry: String,
    pub product_name: String,
    pub raw_materials: String,
    pub processes: Vec<String>,
    pub employee_count: u32,
    pub sales_channels: Vec<String>,
    pub export_countries: Vec<String>,
    /// Fallback recipient when the run is started without explicit recipients
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

impl BusinessInfo {
    /// Short one-line label used in prompts and report subjects
    pub fn label(&self) -> String {
        match (self.industry.trim(), self.product_name.trim()) {
            ("", "") => "business".to_string(),
            (industry, "") => industry.to_string(),
            ("", product) => product.to_string(),
            (industry, product) => format!("{} ({})", industry, product),
        }
    }
}
