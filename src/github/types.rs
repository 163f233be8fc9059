use serde::Deserialize;

/// The fields we ask `gh pr view --json` for.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrView {
    #[serde(rename = "headRefName")]
    pub head_ref_name: String,
}
