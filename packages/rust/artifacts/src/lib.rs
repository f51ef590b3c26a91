//! Generated demo artifacts: assistant prompt and repository file set.
//!
//! Everything here is pure. The repository materializer writes the files, the
//! agent provisioner sends the prompt.

mod prompt;
mod template;

pub use prompt::{ASSISTANT_NAME, AVAILABILITY_SLOTS, opening_line, system_prompt};
pub use template::{GeneratedFile, TEMPLATE_PATHS, render_template};

#[cfg(test)]
pub(crate) mod tests {
    use demoforge_shared::{BrandColors, LeadSource, PracticeProfile};

    pub fn sample_profile() -> PracticeProfile {
        PracticeProfile {
            company_name: "Glow Aesthetics".into(),
            contact_label: "Dr. Anna Weber".into(),
            phone: "+1 (555) 123-4567".into(),
            email: "hello@glow.at".into(),
            location: "Vienna, Austria".into(),
            services: vec!["Botox".into(), "Dermal Fillers".into()],
            practice_type_tag: "aesthetic".into(),
            stable_id: "glow".into(),
            lead_source: LeadSource::Search,
            lead_score: 90,
            brand_colors: BrandColors {
                primary: "#c2185b".into(),
                secondary: "#f5f5f4".into(),
            },
            source_url: "https://glow.at".into(),
            is_generalized: false,
        }
    }
}
