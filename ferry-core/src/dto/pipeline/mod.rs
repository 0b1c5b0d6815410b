//! Pipeline DTOs

use serde::{Deserialize, Serialize};

/// Request to create a new pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePipeline {
    pub name: String,
    #[serde(default)]
    pub governance: Vec<String>,
}

/// Request to edit a pipeline's name and governance tags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePipeline {
    pub name: String,
    #[serde(default)]
    pub governance: Vec<String>,
}
