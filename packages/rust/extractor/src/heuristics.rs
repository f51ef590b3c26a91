//! Deterministic heuristics for profile fields the page doesn't state directly.

use sha2::{Digest, Sha256};

/// Base lead score before any bonus.
const SCORE_BASE: u32 = 40;
/// Score assigned to fallback profiles.
pub const FALLBACK_SCORE: u8 = 20;

/// Practice type tags, most specific first. The first tag with a matching
/// keyword wins; `aesthetic` is the default.
const PRACTICE_TYPES: &[(&str, &[&str])] = &[
    (
        "plastic-surgery",
        &[
            "plastic surg", "plastische chirurgie", "rhinoplast", "facelift", "breast augmentation",
            "brustvergrößerung", "liposuction", "fettabsaugung",
        ],
    ),
    (
        "dermatology",
        &["dermatolog", "hautarzt", "hautärzt", "skin cancer", "hautkrebs"],
    ),
    (
        "dental",
        &["dental", "dentist", "zahnarzt", "zahnärzt", "orthodont", "teeth whitening"],
    ),
    ("medspa", &["med spa", "medspa", "medical spa", "med-spa"]),
];

pub const DEFAULT_PRACTICE_TYPE: &str = "aesthetic";

/// Classify a practice from its visible text and title.
pub fn practice_type_tag(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    PRACTICE_TYPES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(tag, _)| *tag)
        .unwrap_or(DEFAULT_PRACTICE_TYPE)
}

/// Synthesize a plausible phone number from the domain.
///
/// The same domain always yields the same number. Country format follows the
/// TLD: `.uk` and `.au` get their national formats, everything else US.
pub fn synthesize_phone(domain: &str) -> String {
    let domain = domain.trim().to_ascii_lowercase();
    let digest = Sha256::digest(domain.as_bytes());
    let d: Vec<u8> = digest.iter().map(|b| b % 10).collect();
    let digits = |range: std::ops::Range<usize>| -> String {
        d[range].iter().map(|n| char::from(b'0' + n)).collect()
    };

    if domain.ends_with(".uk") {
        format!("+44 20 7{} {}", digits(0..3), digits(3..7))
    } else if domain.ends_with(".au") {
        format!("+61 2 {} {}", digits(0..4), digits(4..8))
    } else {
        format!("+1 (555) {}-{}", digits(0..3), digits(3..7))
    }
}

/// Inputs to [`lead_score`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreSignals {
    pub llm_services: bool,
    pub llm_location: bool,
    pub on_page_email: bool,
    pub named_contact: bool,
    pub https: bool,
}

/// 40 base, +15 per LLM field, +10 per page signal, clamped to 100.
pub fn lead_score(signals: ScoreSignals) -> u8 {
    let mut score = SCORE_BASE;
    if signals.llm_services {
        score += 15;
    }
    if signals.llm_location {
        score += 15;
    }
    if signals.on_page_email {
        score += 10;
    }
    if signals.named_contact {
        score += 10;
    }
    if signals.https {
        score += 10;
    }
    score.min(100) as u8
}

/// `glow-skin-clinic` → `Glow Skin Clinic`.
pub fn title_case_id(id: &str) -> String {
    id.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
