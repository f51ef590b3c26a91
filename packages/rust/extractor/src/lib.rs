//! Site extraction: fetch a practice website and turn it into a [`PracticeProfile`].
//!
//! Extraction never fails. A page that can't be fetched yields a fallback
//! profile built from the domain alone; completion failures fall back to
//! generic services and location.

mod fetch;
mod heuristics;
mod page;

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use demoforge_llm::{CompletionClient, CompletionRequest, parse_json_reply};
use demoforge_shared::{BrandColors, LeadSource, PracticeProfile, domain_of, stable_id};

pub use fetch::{FetchedPage, HttpFetcher, PageFetcher};
pub use heuristics::{
    FALLBACK_SCORE, ScoreSignals, lead_score, practice_type_tag, synthesize_phone, title_case_id,
};
pub use page::{MAX_TEXT_CHARS, Page, named_contact};

/// Services used when the completion collaborator gives nothing usable.
pub const DEFAULT_SERVICES: &[&str] = &["Aesthetic Treatments", "Cosmetic Surgery", "Dermatology"];

/// Location used when the completion collaborator gives nothing usable.
pub const DEFAULT_LOCATION: &str = "Professional Healthcare Location";

/// Contact label for practices without a named doctor.
pub const TEAM_CONTACT: &str = "Practice Team";

/// Most services kept from a completion.
const MAX_SERVICES: usize = 8;

const EXTRACTION_SYSTEM_PROMPT: &str = "You extract facts from the website text of aesthetic and \
cosmetic healthcare practices. Reply with a single JSON object and nothing else.";

#[derive(Debug, Deserialize)]
struct ServicesReply {
    services: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LocationReply {
    location: String,
}

// ---------------------------------------------------------------------------
// SiteExtractor
// ---------------------------------------------------------------------------

/// Builds practice profiles from websites.
#[derive(Clone)]
pub struct SiteExtractor {
    fetcher: Arc<dyn PageFetcher>,
    llm: Arc<dyn CompletionClient>,
}

impl SiteExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, llm: Arc<dyn CompletionClient>) -> Self {
        Self { fetcher, llm }
    }

    /// Extract a profile for `url`.
    #[instrument(skip_all, fields(url = %url, source = source.as_str()))]
    pub async fn extract(&self, url: &str, source: LeadSource) -> PracticeProfile {
        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "page fetch failed, using fallback profile");
                return fallback_profile(url, source);
            }
        };

        // `Html` is not `Send`, so read everything from the parsed page
        // before awaiting.
        let (text, on_page_email, colors, title, company_name) = {
            let parsed = Page::parse(&page.html);
            (
                parsed.visible_text(),
                parsed.first_email(),
                parsed.brand_colors(),
                parsed.title().unwrap_or_default(),
                parsed.company_name(),
            )
        };

        let (services, location) =
            tokio::join!(self.ask_services(&text), self.ask_location(&text));
        debug!(
            llm_services = services.is_some(),
            llm_location = location.is_some(),
            "completion answers received"
        );

        let domain = domain_of(url).unwrap_or_else(|| url.to_string());
        let id = stable_id(&domain);
        let bare_domain = domain.trim_start_matches("www.").to_string();

        let contact = named_contact(&text);

        let score = lead_score(ScoreSignals {
            llm_services: services.is_some(),
            llm_location: location.is_some(),
            on_page_email: on_page_email.is_some(),
            named_contact: contact.is_some(),
            https: url.starts_with("https://") || page.final_url.starts_with("https://"),
        });

        let profile = PracticeProfile {
            company_name: company_name.unwrap_or_else(|| title_case_id(&id)),
            is_generalized: contact.is_none(),
            contact_label: contact.unwrap_or_else(|| TEAM_CONTACT.to_string()),
            phone: synthesize_phone(&bare_domain),
            email: on_page_email.unwrap_or_else(|| format!("info@{bare_domain}")),
            location: location.unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            services: services.unwrap_or_else(default_services),
            practice_type_tag: practice_type_tag(&format!("{title} {text}")).to_string(),
            stable_id: id,
            lead_source: source,
            lead_score: score,
            brand_colors: brand_colors_from(colors),
            source_url: url.to_string(),
        };

        info!(
            company = %profile.company_name,
            stable_id = %profile.stable_id,
            score = profile.lead_score,
            "profile extracted"
        );
        profile
    }

    async fn ask_services(&self, text: &str) -> Option<Vec<String>> {
        let prompt = format!(
            "List the treatments and services this practice offers, at most {MAX_SERVICES}.\n\
             Respond as {{\"services\": [\"...\"]}}.\n\nWebsite text:\n{text}"
        );
        let reply = self.complete(prompt).await?;
        let parsed: ServicesReply = parse_json_reply(&reply)?;

        let services: Vec<String> = parsed
            .services
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(MAX_SERVICES)
            .collect();
        (!services.is_empty()).then_some(services)
    }

    async fn ask_location(&self, text: &str) -> Option<String> {
        let prompt = format!(
            "Where is this practice located? Give city and country.\n\
             Respond as {{\"location\": \"City, Country\"}}.\n\nWebsite text:\n{text}"
        );
        let reply = self.complete(prompt).await?;
        let parsed: LocationReply = parse_json_reply(&reply)?;

        let location = parsed.location.trim().to_string();
        (!location.is_empty()).then_some(location)
    }

    async fn complete(&self, prompt: String) -> Option<String> {
        let request = CompletionRequest::new(EXTRACTION_SYSTEM_PROMPT, prompt);
        match self.llm.complete(request).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(error = %e, "completion failed during extraction");
                None
            }
        }
    }
}

/// Profile for a site that couldn't be fetched.
pub fn fallback_profile(url: &str, source: LeadSource) -> PracticeProfile {
    let domain = domain_of(url).unwrap_or_else(|| url.to_string());
    let bare_domain = domain.trim_start_matches("www.").to_string();
    let id = stable_id(&domain);

    PracticeProfile {
        company_name: title_case_id(&id),
        contact_label: TEAM_CONTACT.to_string(),
        phone: synthesize_phone(&bare_domain),
        email: format!("info@{bare_domain}"),
        location: DEFAULT_LOCATION.to_string(),
        services: default_services(),
        practice_type_tag: heuristics::DEFAULT_PRACTICE_TYPE.to_string(),
        stable_id: id,
        lead_source: source,
        lead_score: FALLBACK_SCORE,
        brand_colors: BrandColors::default(),
        source_url: url.to_string(),
        is_generalized: true,
    }
}

fn default_services() -> Vec<String> {
    DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect()
}

fn brand_colors_from(colors: Vec<String>) -> BrandColors {
    let defaults = BrandColors::default();
    let mut iter = colors.into_iter();
    BrandColors {
        primary: iter.next().unwrap_or(defaults.primary),
        secondary: iter.next().unwrap_or(defaults.secondary),
    }
}
