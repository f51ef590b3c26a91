//! Location matching with local-language and city synonyms.
//!
//! A requested location matches a candidate when any term of its synonym set
//! appears in the candidate's text. Locations with no table entry match only
//! themselves.

use demoforge_shared::LeadCandidate;

/// Country names and local spellings, followed by the cities that count as
/// inside the country.
struct Country {
    names: &'static [&'static str],
    cities: &'static [&'static str],
}

const COUNTRIES: &[Country] = &[
    Country {
        names: &["austria", "österreich", "osterreich"],
        cities: &["vienna", "wien", "graz", "salzburg", "linz", "innsbruck", "klagenfurt"],
    },
    Country {
        names: &["germany", "deutschland"],
        cities: &[
            "berlin", "munich", "münchen", "muenchen", "hamburg", "frankfurt", "cologne", "köln",
            "koeln", "düsseldorf", "duesseldorf", "stuttgart",
        ],
    },
    Country {
        names: &["switzerland", "schweiz", "suisse"],
        cities: &["zurich", "zürich", "geneva", "genève", "basel", "bern"],
    },
    Country {
        names: &["uk", "united kingdom", "england", "great britain", "britain"],
        cities: &["london", "manchester", "birmingham", "leeds", "glasgow", "edinburgh"],
    },
    Country {
        names: &["usa", "united states"],
        cities: &[
            "new york", "los angeles", "miami", "chicago", "houston", "dallas", "beverly hills",
        ],
    },
    Country {
        names: &["australia"],
        cities: &["sydney", "melbourne", "brisbane", "perth", "adelaide"],
    },
];

/// Cities known under more than one name. A city absent here matches only itself.
const CITY_ALIASES: &[&[&str]] = &[
    &["vienna", "wien"],
    &["munich", "münchen", "muenchen"],
    &["cologne", "köln", "koeln"],
    &["düsseldorf", "duesseldorf"],
    &["zurich", "zürich"],
    &["geneva", "genève"],
    &["new york", "nyc"],
];

/// Lookup keys that are too ambiguous to match as text themselves.
const KEY_ALIASES: &[(&str, &str)] = &[
    ("us", "usa"),
    ("u.s.", "usa"),
    ("america", "usa"),
    ("united states of america", "usa"),
    ("gb", "uk"),
];

/// Terms at or below this length must match a whole word.
const SHORT_TERM_LEN: usize = 3;

/// The synonym set for `location`, including the location itself.
///
/// A country expands to its local names and its cities. A city expands to its
/// own aliases only, so `berlin` never admits a clinic in `münchen`.
pub fn synonyms_for(location: &str) -> Vec<String> {
    let key = location.trim().to_lowercase();
    if key.is_empty() {
        return Vec::new();
    }
    let key = KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(key);

    let mut terms: Vec<String> = if let Some(country) =
        COUNTRIES.iter().find(|c| c.names.contains(&key.as_str()))
    {
        country
            .names
            .iter()
            .chain(country.cities)
            .map(|t| t.to_string())
            .collect()
    } else if let Some(city) = CITY_ALIASES.iter().find(|g| g.contains(&key.as_str())) {
        city.iter().map(|t| t.to_string()).collect()
    } else {
        Vec::new()
    };

    if !terms.contains(&key) {
        terms.push(key);
    }
    terms
}

/// Does `candidate` mention any term of `synonyms`?
pub fn matches_location(candidate: &LeadCandidate, synonyms: &[String]) -> bool {
    if synonyms.is_empty() {
        return true;
    }
    let haystack = format!("{} {} {}", candidate.title, candidate.snippet, candidate.url)
        .to_lowercase();
    synonyms.iter().any(|term| contains_term(&haystack, term))
}

/// Substring match, or whole-word match for short terms like `uk` or `us`.
pub(crate) fn contains_term(haystack: &str, term: &str) -> bool {
    if term.chars().count() > SHORT_TERM_LEN {
        return haystack.contains(term);
    }
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == term)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, snippet: &str) -> LeadCandidate {
        LeadCandidate {
            url: "https://clinic.example".into(),
            title: title.into(),
            snippet: snippet.into(),
            external_id: "x".into(),
        }
    }

    #[test]
    fn austria_matches_local_names_and_cities() {
        let syn = synonyms_for("Austria");
        assert!(matches_location(&candidate("Ästhetik Zentrum", "Ihre Praxis in Wien"), &syn));
        assert!(matches_location(&candidate("Derma Graz", ""), &syn));
        assert!(matches_location(&candidate("", "Beste Klinik in Österreich"), &syn));
        assert!(!matches_location(&candidate("Berlin Aesthetics", "Mitte"), &syn));
    }

    #[test]
    fn city_keys_expand_to_city_only() {
        let syn = synonyms_for("vienna");
        assert!(syn.contains(&"wien".to_string()));
        assert!(!syn.contains(&"graz".to_string()));

        let syn = synonyms_for("München");
        assert!(syn.contains(&"munich".to_string()));
        assert!(!syn.contains(&"berlin".to_string()));
    }

    #[test]
    fn city_without_aliases_rejects_other_cities_of_its_country() {
        let syn = synonyms_for("Berlin");
        assert_eq!(syn, vec!["berlin".to_string()]);
        assert!(matches_location(&candidate("Berlin Aesthetics", "Mitte"), &syn));
        assert!(!matches_location(&candidate("Ästhetik München", "Schwabing"), &syn));
        assert!(!matches_location(&candidate("Hamburg Skin", ""), &syn));

        let syn = synonyms_for("Sydney");
        assert!(!matches_location(&candidate("Melbourne Cosmetic", ""), &syn));
    }

    #[test]
    fn unknown_location_matches_itself_only() {
        let syn = synonyms_for("Reykjavik");
        assert_eq!(syn, vec!["reykjavik".to_string()]);
        assert!(matches_location(&candidate("Reykjavik Skin", ""), &syn));
        assert!(!matches_location(&candidate("Oslo Skin", ""), &syn));
    }

    #[test]
    fn short_terms_need_whole_words() {
        let syn = synonyms_for("UK");
        assert!(matches_location(&candidate("Harley Street Clinic, UK", ""), &syn));
        assert!(!matches_location(&candidate("Ukulele lessons", ""), &syn));

        let syn = synonyms_for("US");
        assert!(!matches_location(&candidate("About us", "Contact us"), &syn));
        assert!(matches_location(&candidate("Miami Med Spa", ""), &syn));
    }

    #[test]
    fn url_counts_as_location_text() {
        let syn = synonyms_for("Berlin");
        let mut c = candidate("Aesthetics", "");
        c.url = "https://aesthetics-berlin.de".into();
        assert!(matches_location(&c, &syn));
    }
}
