//! ATT&CK knowledge base
//!
//! Loads the STIX bundles kept in the cache directory
//! (`enterprise-attack.json`, `mobile-attack.json`). The bundles are never
//! downloaded; a missing bundle is a `KnowledgeBase` error.

pub mod stix;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use dettect_core::errors::DettectError;
use dettect_core::model::{MitigationDomain, Platform, Stage};

use crate::errors::Result;
use stix::{Bundle, StixObject};

pub const ENTERPRISE_BUNDLE: &str = "enterprise-attack.json";
pub const MOBILE_BUNDLE: &str = "mobile-attack.json";

const PRE_ATTACK_TACTICS: [&str; 2] = ["reconnaissance", "resource-development"];

/// Object family in the knowledge base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Technique,
    Group,
    Software,
    Mitigation,
}

impl ObjectKind {
    fn from_stix(object_type: &str) -> Option<Self> {
        match object_type {
            "attack-pattern" => Some(ObjectKind::Technique),
            "intrusion-set" => Some(ObjectKind::Group),
            "malware" | "tool" => Some(ObjectKind::Software),
            "course-of-action" => Some(ObjectKind::Mitigation),
            _ => None,
        }
    }
}

/// A technique, group, software or mitigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackObject {
    pub stix_id: String,
    pub attack_id: String,
    pub name: String,
    pub kind: ObjectKind,
    pub aliases: Vec<String>,
    pub platforms: Vec<String>,
    /// Data sources as listed in ATT&CK (`Process: Process Creation`)
    pub data_sources: Vec<String>,
    pub tactics: Vec<String>,
    pub created: String,
    pub modified: String,
}

impl AttackObject {
    fn from_stix(object: &StixObject, kind: ObjectKind) -> Option<Self> {
        let mut aliases = object.aliases.clone();
        aliases.extend(object.x_mitre_aliases.iter().cloned());
        Some(Self {
            stix_id: object.id.clone(),
            attack_id: object.attack_id()?.to_string(),
            name: object.name.clone().unwrap_or_default(),
            kind,
            aliases,
            platforms: object.x_mitre_platforms.clone(),
            data_sources: object.x_mitre_data_sources.clone(),
            tactics: object
                .kill_chain_phases
                .iter()
                .filter(|p| p.kill_chain_name.starts_with("mitre-"))
                .map(|p| p.phase_name.clone())
                .collect(),
            created: object.created.clone().unwrap_or_default(),
            modified: object.modified.clone().unwrap_or_default(),
        })
    }

    /// Matches an ATT&CK ID, name or alias (case-insensitive)
    pub fn is_known_as(&self, needle: &str) -> bool {
        let needle = needle.trim();
        self.attack_id.eq_ignore_ascii_case(needle)
            || self.name.eq_ignore_ascii_case(needle)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(needle))
    }

    pub fn on_platform(&self, platform: Platform) -> bool {
        platform == Platform::All
            || self
                .platforms
                .iter()
                .any(|p| p.eq_ignore_ascii_case(platform.name()))
    }

    /// Techniques whose tactics are all pre-compromise belong to pre-attack
    pub fn in_stage(&self, stage: Stage) -> bool {
        let pre = !self.tactics.is_empty()
            && self
                .tactics
                .iter()
                .all(|t| PRE_ATTACK_TACTICS.contains(&t.as_str()));
        match stage {
            Stage::PreAttack => pre,
            Stage::Attack => !pre,
        }
    }

    /// Data source names in the form used by administration files
    ///
    /// `Process: Process Creation` is reported as `Process Creation`.
    pub fn data_source_names(&self) -> impl Iterator<Item = &str> {
        self.data_sources
            .iter()
            .map(|ds| ds.split_once(": ").map_or(ds.as_str(), |(_, component)| component))
    }
}

/// `uses` / `mitigates` edge between two objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub relationship_type: String,
    pub source: String,
    pub target: String,
}

/// One ATT&CK domain loaded from a bundle
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    objects: Vec<AttackObject>,
    index: HashMap<String, usize>,
    relationships: Vec<Relationship>,
}

impl KnowledgeBase {
    /// Path of the bundle for a domain
    pub fn bundle_path(dir: &Path, domain: MitigationDomain) -> PathBuf {
        match domain {
            MitigationDomain::Enterprise => dir.join(ENTERPRISE_BUNDLE),
            MitigationDomain::Mobile => dir.join(MOBILE_BUNDLE),
        }
    }

    /// Load the bundle of `domain` from `dir`
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeBase` when the bundle is missing or malformed.
    pub fn load(dir: &Path, domain: MitigationDomain) -> Result<Self> {
        let path = Self::bundle_path(dir, domain);
        if !path.is_file() {
            return Err(DettectError::KnowledgeBaseMissing { path }.into());
        }
        let text = fs::read_to_string(&path).map_err(|e| DettectError::KnowledgeBaseMalformed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let bundle: Bundle =
            serde_json::from_str(&text).map_err(|e| DettectError::KnowledgeBaseMalformed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let kb = Self::from_bundle(bundle);
        tracing::debug!(
            path = %path.display(),
            objects = kb.objects.len(),
            relationships = kb.relationships.len(),
            "knowledge base loaded"
        );
        Ok(kb)
    }

    /// Load the enterprise domain
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeBase` when the bundle is missing or malformed.
    pub fn enterprise(dir: &Path) -> Result<Self> {
        Self::load(dir, MitigationDomain::Enterprise)
    }

    pub fn from_bundle(bundle: Bundle) -> Self {
        let mut kb = Self::default();
        for object in &bundle.objects {
            if !object.is_active() {
                continue;
            }
            if object.object_type == "relationship" {
                if let (Some(kind), Some(source), Some(target)) = (
                    object.relationship_type.as_ref(),
                    object.source_ref.as_ref(),
                    object.target_ref.as_ref(),
                ) {
                    kb.relationships.push(Relationship {
                        relationship_type: kind.clone(),
                        source: source.clone(),
                        target: target.clone(),
                    });
                }
                continue;
            }
            let Some(kind) = ObjectKind::from_stix(&object.object_type) else {
                continue;
            };
            if let Some(attack_object) = AttackObject::from_stix(object, kind) {
                kb.index
                    .insert(attack_object.stix_id.clone(), kb.objects.len());
                kb.objects.push(attack_object);
            }
        }
        kb
    }

    pub fn objects(&self, kind: ObjectKind) -> impl Iterator<Item = &AttackObject> {
        self.objects.iter().filter(move |o| o.kind == kind)
    }

    pub fn techniques(&self) -> impl Iterator<Item = &AttackObject> {
        self.objects(ObjectKind::Technique)
    }

    pub fn groups(&self) -> impl Iterator<Item = &AttackObject> {
        self.objects(ObjectKind::Group)
    }

    pub fn technique(&self, attack_id: &str) -> Option<&AttackObject> {
        self.techniques()
            .find(|t| t.attack_id.eq_ignore_ascii_case(attack_id))
    }

    pub fn by_stix_id(&self, stix_id: &str) -> Option<&AttackObject> {
        self.index.get(stix_id).map(|i| &self.objects[*i])
    }

    /// Targets of `relationship_type` edges leaving `source`, of one kind
    pub fn related(
        &self,
        source: &str,
        relationship_type: &str,
        kind: ObjectKind,
    ) -> Vec<&AttackObject> {
        self.relationships
            .iter()
            .filter(|r| r.source == source && r.relationship_type == relationship_type)
            .filter_map(|r| self.by_stix_id(&r.target))
            .filter(|o| o.kind == kind)
            .collect()
    }

    /// ATT&CK IDs of the techniques an object (group or software) uses
    pub fn techniques_used_by(&self, source: &AttackObject) -> BTreeSet<String> {
        self.related(&source.stix_id, "uses", ObjectKind::Technique)
            .into_iter()
            .map(|t| t.attack_id.clone())
            .collect()
    }

    pub fn software_used_by(&self, group: &AttackObject) -> Vec<&AttackObject> {
        self.related(&group.stix_id, "uses", ObjectKind::Software)
    }

    pub fn techniques_mitigated_by(&self, mitigation: &AttackObject) -> BTreeSet<String> {
        self.related(&mitigation.stix_id, "mitigates", ObjectKind::Technique)
            .into_iter()
            .map(|t| t.attack_id.clone())
            .collect()
    }

    /// Resolve a group selector: `all` or a comma-separated list of IDs,
    /// names or aliases
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming the first selector that matches no group.
    pub fn resolve_groups(&self, selector: &str) -> Result<Vec<&AttackObject>> {
        if selector.trim().eq_ignore_ascii_case("all") {
            return Ok(self.groups().collect());
        }
        let mut resolved: Vec<&AttackObject> = Vec::new();
        for needle in selector.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let group = self
                .groups()
                .find(|g| g.is_known_as(needle))
                .ok_or_else(|| DettectError::UnknownGroup {
                    group: needle.to_string(),
                })?;
            if !resolved.iter().any(|g| g.stix_id == group.stix_id) {
                resolved.push(group);
            }
        }
        Ok(resolved)
    }

    /// Active techniques per data source name (administration-file form)
    pub fn techniques_by_data_source(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for technique in self.techniques() {
            for ds in technique.data_source_names() {
                map.entry(ds.to_string())
                    .or_default()
                    .insert(technique.attack_id.clone());
            }
        }
        map
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Small enterprise bundle
    pub const BUNDLE: &str = r#"{
  "type": "bundle",
  "objects": [
    {"type": "attack-pattern", "id": "attack-pattern--1", "name": "OS Credential Dumping",
     "created": "2017-05-31T21:30:19.735Z", "modified": "2021-04-29T14:49:39.188Z",
     "external_references": [{"source_name": "mitre-attack", "external_id": "T1003"}],
     "kill_chain_phases": [{"kill_chain_name": "mitre-attack", "phase_name": "credential-access"}],
     "x_mitre_platforms": ["Windows", "Linux"],
     "x_mitre_data_sources": ["Process: Process Access", "Command: Command Execution"]},
    {"type": "attack-pattern", "id": "attack-pattern--2", "name": "Process Injection",
     "created": "2017-05-31T21:30:47.843Z", "modified": "2021-10-18T12:22:10.010Z",
     "external_references": [{"source_name": "mitre-attack", "external_id": "T1055"}],
     "kill_chain_phases": [{"kill_chain_name": "mitre-attack", "phase_name": "defense-evasion"}],
     "x_mitre_platforms": ["Windows"],
     "x_mitre_data_sources": ["Process: Process Access"]},
    {"type": "attack-pattern", "id": "attack-pattern--3", "name": "Gather Victim Host Information",
     "created": "2020-10-02T16:27:55.713Z", "modified": "2021-04-15T03:48:37.301Z",
     "external_references": [{"source_name": "mitre-attack", "external_id": "T1592"}],
     "kill_chain_phases": [{"kill_chain_name": "mitre-attack", "phase_name": "reconnaissance"}],
     "x_mitre_platforms": ["PRE"]},
    {"type": "attack-pattern", "id": "attack-pattern--4", "name": "Old Technique", "revoked": true,
     "external_references": [{"source_name": "mitre-attack", "external_id": "T1999"}]},
    {"type": "intrusion-set", "id": "intrusion-set--1", "name": "APT28", "aliases": ["APT28", "Sofacy"],
     "created": "2017-05-31T21:31:48.664Z", "modified": "2021-10-15T16:48:08.973Z",
     "external_references": [{"source_name": "mitre-attack", "external_id": "G0007"}]},
    {"type": "intrusion-set", "id": "intrusion-set--2", "name": "APT29",
     "created": "2017-05-31T21:31:52.748Z", "modified": "2021-10-16T01:50:56.000Z",
     "external_references": [{"source_name": "mitre-attack", "external_id": "G0016"}]},
    {"type": "malware", "id": "malware--1", "name": "Mimikatz", "x_mitre_aliases": ["mimikatz"],
     "created": "2017-05-31T21:32:31.601Z", "modified": "2021-08-23T20:25:20.363Z",
     "external_references": [{"source_name": "mitre-attack", "external_id": "S0002"}]},
    {"type": "course-of-action", "id": "course-of-action--1", "name": "Privileged Account Management",
     "created": "2019-06-06T16:50:58.767Z", "modified": "2020-03-31T13:07:15.684Z",
     "external_references": [{"source_name": "mitre-attack", "external_id": "M1026"}]},
    {"type": "relationship", "id": "relationship--1", "relationship_type": "uses",
     "source_ref": "intrusion-set--1", "target_ref": "attack-pattern--1"},
    {"type": "relationship", "id": "relationship--2", "relationship_type": "uses",
     "source_ref": "intrusion-set--2", "target_ref": "attack-pattern--2"},
    {"type": "relationship", "id": "relationship--3", "relationship_type": "uses",
     "source_ref": "intrusion-set--2", "target_ref": "malware--1"},
    {"type": "relationship", "id": "relationship--4", "relationship_type": "uses",
     "source_ref": "malware--1", "target_ref": "attack-pattern--1"},
    {"type": "relationship", "id": "relationship--5", "relationship_type": "mitigates",
     "source_ref": "course-of-action--1", "target_ref": "attack-pattern--1"}
  ]
}"#;
}
