//! STIX 2 bundle format
//!
//! Only the fields the reports read are modelled; everything else in the
//! bundle is ignored.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub objects: Vec<StixObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalReference {
    pub source_name: String,
    #[serde(default)]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KillChainPhase {
    pub kill_chain_name: String,
    pub phase_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StixObject {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default)]
    pub x_mitre_deprecated: bool,
    #[serde(default)]
    pub external_references: Vec<ExternalReference>,
    #[serde(default)]
    pub kill_chain_phases: Vec<KillChainPhase>,
    #[serde(default)]
    pub x_mitre_platforms: Vec<String>,
    #[serde(default)]
    pub x_mitre_data_sources: Vec<String>,
    /// Group aliases
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Software aliases
    #[serde(default)]
    pub x_mitre_aliases: Vec<String>,
    #[serde(default)]
    pub relationship_type: Option<String>,
    #[serde(default)]
    pub source_ref: Option<String>,
    #[serde(default)]
    pub target_ref: Option<String>,
}

impl StixObject {
    /// ATT&CK ID (`T1003`, `G0016`, ...) from the mitre external reference
    pub fn attack_id(&self) -> Option<&str> {
        self.external_references
            .iter()
            .find(|r| r.source_name.starts_with("mitre-"))
            .and_then(|r| r.external_id.as_deref())
    }

    pub fn is_active(&self) -> bool {
        !self.revoked && !self.x_mitre_deprecated
    }
}
