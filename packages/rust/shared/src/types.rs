//! Core domain types shared by every DemoForge phase.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Maximum length of a [`stable_id`].
pub const STABLE_ID_MAX_LEN: usize = 25;

/// TLD suffixes stripped when deriving a stable id. Longest first.
const STRIPPED_SUFFIXES: &[&str] = &[
    ".co.uk", ".org.uk", ".com.au", ".net.au", ".co.at", ".or.at", ".clinic", ".health",
    ".com", ".net", ".org", ".de", ".at", ".ch", ".uk", ".au", ".io", ".co", ".us", ".ca",
    ".eu",
];

// ---------------------------------------------------------------------------
// LeadId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for lead identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub Uuid);

impl LeadId {
    /// Generate a new time-sortable lead identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Discovery output
// ---------------------------------------------------------------------------

/// A business listing returned by the search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadCandidate {
    pub url: String,
    pub title: String,
    /// Body text excerpt from the search result.
    pub snippet: String,
    /// Identifier assigned by the search collaborator.
    pub external_id: String,
}

impl LeadCandidate {
    /// A candidate for an operator-supplied URL with no search metadata.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            external_id: url.clone(),
            url,
            title: String::new(),
            snippet: String::new(),
        }
    }
}

/// Where a lead came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeadSource {
    /// Found by candidate discovery.
    Search,
    /// Supplied directly by the operator.
    Manual,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Manual => "manual",
        }
    }
}

// ---------------------------------------------------------------------------
// PracticeProfile
// ---------------------------------------------------------------------------

/// Primary/secondary brand colors as CSS hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandColors {
    pub primary: String,
    pub secondary: String,
}

impl Default for BrandColors {
    fn default() -> Self {
        Self {
            primary: "#0f766e".into(),
            secondary: "#f5f5f4".into(),
        }
    }
}

/// Everything the downstream phases know about one practice.
///
/// Built once by the site extractor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeProfile {
    pub company_name: String,
    /// Named contact ("Dr. Jane Smith") or a team label.
    pub contact_label: String,
    pub phone: String,
    pub email: String,
    pub location: String,
    pub services: Vec<String>,
    pub practice_type_tag: String,
    /// Derived from the source domain with [`stable_id`].
    pub stable_id: String,
    pub lead_source: LeadSource,
    /// 0–100 heuristic.
    pub lead_score: u8,
    pub brand_colors: BrandColors,
    pub source_url: String,
    /// `true` when no named contact was found and copy should address the team.
    pub is_generalized: bool,
}

// ---------------------------------------------------------------------------
// Store / repository / deployment records
// ---------------------------------------------------------------------------

/// A lead's tracking record in the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub store_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub demo_url: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

/// A freshly created remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub name: String,
    pub html_url: String,
    pub clone_url: String,
    pub full_name: String,
    pub owner: String,
}

/// Whether a deployment produced a live domain or a predicted fallback URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentStatus {
    Deployed,
    Fallback,
}

/// Which tier produced the deployment URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployMethod {
    Primary,
    Secondary,
    StaticFallback,
}

impl std::fmt::Display for DeployMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::StaticFallback => "static-fallback",
        };
        f.write_str(s)
    }
}

/// Outcome of the deployment phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub url: String,
    pub status: DeploymentStatus,
    pub method: DeployMethod,
}

// ---------------------------------------------------------------------------
// WorkflowSpec
// ---------------------------------------------------------------------------

/// Parameters governing one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    pub lead_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default)]
    pub filters: Vec<String>,
}

impl WorkflowSpec {
    /// A spec that only sets the lead count.
    pub fn with_count(lead_count: u32) -> Self {
        Self {
            lead_count,
            specialty: None,
            location: None,
            search_query: None,
            filters: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stable ids
// ---------------------------------------------------------------------------

/// Derive a stable, URL-safe practice id from a domain.
///
/// Pure function of its input: lower-cases, drops `www.` and one known TLD
/// suffix, collapses runs of non-alphanumerics into single hyphens and caps the
/// result at [`STABLE_ID_MAX_LEN`] characters with no leading/trailing hyphen.
pub fn stable_id(domain: &str) -> String {
    let lowered = domain.trim().to_ascii_lowercase();
    let mut host = lowered.strip_prefix("www.").unwrap_or(&lowered);

    for suffix in STRIPPED_SUFFIXES {
        if let Some(stripped) = host.strip_suffix(suffix) {
            if !stripped.is_empty() {
                host = stripped;
                break;
            }
        }
    }

    let mut slug = String::with_capacity(host.len());
    for c in host.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let trimmed = slug.trim_matches('-');
    let capped: String = trimmed.chars().take(STABLE_ID_MAX_LEN).collect();
    let capped = capped.trim_end_matches('-');

    if capped.is_empty() {
        "practice".to_string()
    } else {
        capped.to_string()
    }
}

/// Extract the host of `url`, tolerating missing schemes.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url)
        .or_else(|_| Url::parse(&format!("https://{url}")))
        .ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn assert_well_formed(id: &str) {
        let re = Regex::new(r"^[a-z0-9-]{1,25}$").unwrap();
        assert!(re.is_match(id), "malformed id: {id}");
        assert!(!id.starts_with('-') && !id.ends_with('-'), "edge hyphen: {id}");
    }

    #[test]
    fn stable_id_strips_www_and_tld() {
        assert_eq!(stable_id("www.GlowSkinClinic.com"), "glowskinclinic");
        assert_eq!(stable_id("smile-dental.co.uk"), "smile-dental");
        assert_eq!(stable_id("derma.com.au"), "derma");
    }

    #[test]
    fn stable_id_collapses_separators() {
        assert_eq!(stable_id("dr--müller__aesthetics.at"), "dr-m-ller-aesthetics");
        assert_eq!(stable_id("beauty.berlin.de"), "beauty-berlin");
    }

    #[test]
    fn stable_id_truncates_without_trailing_hyphen() {
        let id = stable_id("the-very-long-practice-name-aesthetic-clinic.com");
        assert!(id.len() <= STABLE_ID_MAX_LEN);
        assert_well_formed(&id);

        // Cut lands right after a separator.
        let id = stable_id("abcdefghijklmnopqrstuvwx-yz.com");
        assert_eq!(id, "abcdefghijklmnopqrstuvwx");
    }

    #[test]
    fn stable_id_is_deterministic_and_well_formed() {
        let domains = [
            "www.example.com",
            "---.com",
            "xn--bcher-kva.example",
            "a.b.c.d.e.f.g.h.i.j.k.l.m.n.o.p",
            "UPPER.CASE.ORG",
            "",
            "com",
        ];
        for d in domains {
            let a = stable_id(d);
            let b = stable_id(d);
            assert_eq!(a, b);
            assert_well_formed(&a);
        }
    }

    #[test]
    fn domain_of_handles_schemes() {
        assert_eq!(
            domain_of("https://www.glow.com/about").as_deref(),
            Some("www.glow.com")
        );
        assert_eq!(domain_of("glow.com").as_deref(), Some("glow.com"));
        assert_eq!(domain_of("::not a url::"), None);
    }

    #[test]
    fn workflow_spec_uses_camel_case() {
        let json = r#"{"leadCount":3,"location":"Berlin","filters":["exclude generic"]}"#;
        let spec: WorkflowSpec = serde_json::from_str(json).expect("parse");
        assert_eq!(spec.lead_count, 3);
        assert_eq!(spec.location.as_deref(), Some("Berlin"));
        assert!(spec.specialty.is_none());
        assert_eq!(spec.filters, vec!["exclude generic"]);
    }

    #[test]
    fn deployment_enums_serialize_kebab_case() {
        let result = DeploymentResult {
            url: "https://x.github.io/y".into(),
            status: DeploymentStatus::Fallback,
            method: DeployMethod::StaticFallback,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""status":"fallback""#));
        assert!(json.contains(r#""method":"static-fallback""#));
    }
}
