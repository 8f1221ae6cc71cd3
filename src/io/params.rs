use std::path::Path;

use anyhow::Context;

use crate::model::params::MspeirvParams;
use crate::model::sia::Campaign;

/// Load a parameter set from a JSON file and check it.
pub fn load_params_json(path: impl AsRef<Path>) -> anyhow::Result<MspeirvParams> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read parameter file: {}", path.display()))?;
    let params: MspeirvParams = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse parameter file: {}", path.display()))?;
    params
        .check()
        .with_context(|| format!("Invalid parameters in {}", path.display()))?;
    Ok(params)
}

/// Load a JSON array of campaigns.
pub fn load_campaigns_json(path: impl AsRef<Path>) -> anyhow::Result<Vec<Campaign>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read campaign file: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse campaign file: {}", path.display()))
}
