//! Voice assistant prompt and opening line.
//!
//! Both are pure functions of the profile so that a regenerated demo always
//! says the same thing.

use demoforge_shared::PracticeProfile;

/// Name the demo assistant introduces itself with.
pub const ASSISTANT_NAME: &str = "Sophie";

/// Synthetic appointment slots offered in every demo.
pub const AVAILABILITY_SLOTS: &[&str] = &[
    "Tuesday at 10:00 AM",
    "Wednesday at 2:30 PM",
    "Thursday at 11:00 AM",
    "Friday at 4:00 PM",
];

/// Location the extractor uses when nothing better is known.
const UNKNOWN_LOCATION: &str = "Professional Healthcare Location";

fn specialty_wording(tag: &str) -> &'static str {
    match tag {
        "dermatology" => "dermatology practice",
        "plastic-surgery" => "plastic surgery practice",
        "dental" => "cosmetic dental practice",
        "medspa" => "medical spa",
        _ => "aesthetic clinic",
    }
}

fn location_wording(location: &str) -> String {
    let location = location.trim();
    if location.is_empty() || location == UNKNOWN_LOCATION {
        String::new()
    } else {
        format!(" in {location}")
    }
}

/// Who callers are speaking on behalf of.
fn host_wording(profile: &PracticeProfile) -> String {
    if profile.is_generalized {
        format!("the team at {}", profile.company_name)
    } else {
        format!("{} at {}", profile.contact_label, profile.company_name)
    }
}

/// System prompt for the practice's voice assistant.
pub fn system_prompt(profile: &PracticeProfile) -> String {
    let services = profile
        .services
        .iter()
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n");
    let slots = AVAILABILITY_SLOTS
        .iter()
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are {ASSISTANT_NAME}, the virtual receptionist for {company}, a {specialty}{location}. \
You answer calls on behalf of {host}.\n\n\
Services offered:\n{services}\n\n\
Available consultation slots this week:\n{slots}\n\n\
Guidelines:\n\
- Be warm, concise and professional.\n\
- Help callers understand the services above and book a consultation in one of the available slots.\n\
- Never give medical advice or quote prices; offer a consultation instead.\n\
- If asked for contact details, the phone number is {phone} and the email is {email}.",
        company = profile.company_name,
        specialty = specialty_wording(&profile.practice_type_tag),
        location = location_wording(&profile.location),
        host = host_wording(profile),
        phone = profile.phone,
        email = profile.email,
    )
}

/// First sentence the assistant speaks.
pub fn opening_line(profile: &PracticeProfile) -> String {
    if profile.is_generalized {
        format!(
            "Hello, thank you for calling {}! This is {ASSISTANT_NAME}. How can our team help you today?",
            profile.company_name
        )
    } else {
        format!(
            "Hello, thank you for calling {}! This is {ASSISTANT_NAME}, {}'s assistant. How can I help you today?",
            profile.company_name, profile.contact_label
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_profile;

    #[test]
    fn prompt_is_deterministic_and_complete() {
        let profile = sample_profile();
        let a = system_prompt(&profile);
        assert_eq!(a, system_prompt(&profile));

        assert!(a.starts_with("You are Sophie"));
        assert!(a.contains("- Botox\n- Dermal Fillers"));
        assert!(a.contains("aesthetic clinic in Vienna, Austria"));
        assert!(a.contains("Dr. Anna Weber at Glow Aesthetics"));
        for slot in AVAILABILITY_SLOTS {
            assert!(a.contains(slot));
        }
    }

    #[test]
    fn generalized_profiles_address_the_team() {
        let mut profile = sample_profile();
        profile.is_generalized = true;
        profile.contact_label = "Practice Team".into();
        profile.location = UNKNOWN_LOCATION.into();
        profile.practice_type_tag = "medspa".into();

        let prompt = system_prompt(&profile);
        assert!(prompt.contains("the team at Glow Aesthetics"));
        assert!(prompt.contains("a medical spa."));
        assert!(!prompt.contains(UNKNOWN_LOCATION));

        let line = opening_line(&profile);
        assert!(line.contains("our team"));
        assert!(!line.contains("Practice Team"));
    }

    #[test]
    fn named_opening_line_mentions_doctor() {
        let line = opening_line(&sample_profile());
        assert!(line.contains("Dr. Anna Weber's assistant"));
    }
}
