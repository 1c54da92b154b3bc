use serde::{Deserialize, Serialize};

use crate::scripts::repo_types::{ScriptInputs, ScriptRequest};

/// Request body for `POST /scripts/generate`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateRequest {
    pub product_name: String,
    pub target_audience: String,
    pub tone: String,
    pub ad_style: String,
    pub call_to_action: Option<String>,
}

impl From<GenerateRequest> for ScriptInputs {
    fn from(r: GenerateRequest) -> Self {
        Self {
            product_name: r.product_name.trim().to_string(),
            target_audience: r.target_audience.trim().to_string(),
            tone: r.tone.trim().to_string(),
            ad_style: r.ad_style.trim().to_string(),
            call_to_action: r
                .call_to_action
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub scripts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub scripts: Vec<ScriptRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_trimmed_and_blank_cta_dropped() {
        let req: GenerateRequest = serde_json::from_str(
            r#"{"productName":"  Brew Box ","targetAudience":"students","tone":"fun",
                "adStyle":"ugc","callToAction":"   "}"#,
        )
        .unwrap();
        let inputs = ScriptInputs::from(req);
        assert_eq!(inputs.product_name, "Brew Box");
        assert_eq!(inputs.call_to_action, None);
    }

    #[test]
    fn missing_fields_become_blank() {
        let req: GenerateRequest = serde_json::from_str(r#"{"tone":"calm"}"#).unwrap();
        let inputs = ScriptInputs::from(req);
        let err = inputs.validate().unwrap_err();
        assert!(err.contains("productName is required"));
        assert!(err.contains("adStyle is required"));
        assert!(!err.contains("tone"));
    }
}
