//! HTML inspection: visible text, names, contacts and colors.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Maximum characters of visible text handed to the completion collaborator.
pub const MAX_TEXT_CHARS: usize = 3_000;

/// Elements whose text is never visible content.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "svg", "template", "iframe", "head"];

/// Title separators; the company name is whatever comes before the first one.
const TITLE_SEPARATORS: &[&str] = &["|", " - ", " – ", " — ", ":"];

/// Colors that say nothing about a brand.
const NEUTRAL_COLORS: &[&str] = &["#fff", "#ffffff", "#000", "#000000"];

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static SITE_NAME_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:site_name"]"#).expect("valid selector")
});
static THEME_COLOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name="theme-color"]"#).expect("valid selector"));
static STYLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("style, [style]").expect("valid selector"));
static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}")
        .expect("valid regex")
});
static DOCTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bDr\.?\s+(\p{Lu}\p{Ll}+(?:-\p{Lu}\p{Ll}+)?)\s+(\p{Lu}\p{Ll}+(?:-\p{Lu}\p{Ll}+)?)")
        .expect("valid regex")
});
static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{3})\b").expect("valid regex"));

/// Parsed page with the lookups the extractor needs.
pub struct Page {
    doc: Html,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Self {
            doc: Html::parse_document(html),
        }
    }

    /// Visible text with whitespace collapsed, capped at [`MAX_TEXT_CHARS`].
    pub fn visible_text(&self) -> String {
        let root = self
            .doc
            .select(&BODY_SEL)
            .next()
            .unwrap_or_else(|| self.doc.root_element());

        let mut raw = String::new();
        collect_text(root, &mut raw);

        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.chars().take(MAX_TEXT_CHARS).collect()
    }

    pub fn title(&self) -> Option<String> {
        self.doc
            .select(&TITLE_SEL)
            .next()
            .map(|el| normalize_ws(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    }

    pub fn site_name(&self) -> Option<String> {
        self.doc
            .select(&SITE_NAME_SEL)
            .filter_map(|el| el.value().attr("content"))
            .map(normalize_ws)
            .find(|n| !n.is_empty())
    }

    /// `og:site_name`, else the title up to its first separator.
    pub fn company_name(&self) -> Option<String> {
        self.site_name()
            .or_else(|| self.title().and_then(|t| name_from_title(&t)))
    }

    /// First plausible email address anywhere in the markup.
    pub fn first_email(&self) -> Option<String> {
        first_email_in(&self.doc.html())
    }

    /// `meta[name=theme-color]`, then distinct non-neutral hex colors from styles.
    pub fn brand_colors(&self) -> Vec<String> {
        let mut colors: Vec<String> = Vec::new();
        let mut push = |c: &str| {
            let c = c.trim().to_ascii_lowercase();
            if HEX_COLOR_RE.is_match(&c) && !NEUTRAL_COLORS.contains(&c.as_str()) && !colors.contains(&c) {
                colors.push(c);
            }
        };

        for el in self.doc.select(&THEME_COLOR_SEL) {
            if let Some(content) = el.value().attr("content") {
                push(content);
            }
        }

        for el in self.doc.select(&STYLE_SEL) {
            let css = match el.value().name() {
                "style" => el.text().collect::<String>(),
                _ => el.value().attr("style").unwrap_or_default().to_string(),
            };
            for m in HEX_COLOR_RE.find_iter(&css) {
                push(m.as_str());
            }
        }

        colors
    }
}

/// First "Dr. Firstname Lastname" in `text`.
pub fn named_contact(text: &str) -> Option<String> {
    DOCTOR_RE
        .captures(text)
        .map(|caps| format!("Dr. {} {}", &caps[1], &caps[2]))
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            if !SKIPPED_TAGS.contains(&el.value().name()) {
                collect_text(el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title text before the first separator, if anything is left.
pub(crate) fn name_from_title(title: &str) -> Option<String> {
    let cut = TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| title.find(sep))
        .min()
        .unwrap_or(title.len());
    let name = title[..cut].trim();
    (!name.is_empty()).then(|| name.to_string())
}

pub(crate) fn first_email_in(haystack: &str) -> Option<String> {
    EMAIL_RE
        .find_iter(haystack)
        .map(|m| m.as_str().trim_end_matches('.').to_ascii_lowercase())
        .find(|email| !is_asset_name(email))
}

/// `logo@2x.png` and friends look like addresses but aren't.
fn is_asset_name(email: &str) -> bool {
    const ASSET_EXTS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".avif", ".css", ".js"];
    ASSET_EXTS.iter().any(|ext| email.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<!doctype html>
<html>
<head>
  <title>Glow Aesthetics | Botox &amp; Fillers in Vienna</title>
  <meta name="theme-color" content="#C2185B">
  <style>.btn { color: #ffffff; background: #7b1fa2; } .x { color: #C2185B; }</style>
  <script>var tracking = "Dr. Evil Script";</script>
</head>
<body>
  <header style="border-color: #00897b">Welcome</header>
  <p>Meet   Dr. Anna Weber, our lead physician.</p>
  <img src="logo@2x.png">
  <a href="mailto:Hello@GlowAesthetics.at">Write us</a>
  <noscript>Enable JavaScript</noscript>
</body>
</html>"##;

    #[test]
    fn visible_text_skips_scripts_and_collapses_whitespace() {
        let page = Page::parse(SAMPLE);
        let text = page.visible_text();
        assert!(text.contains("Meet Dr. Anna Weber, our lead physician."));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("Enable JavaScript"));
        assert!(!text.contains("  "));
    }

    #[test]
    fn visible_text_is_capped() {
        let body = "word ".repeat(2_000);
        let page = Page::parse(&format!("<html><body><p>{body}</p></body></html>"));
        assert_eq!(page.visible_text().chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn company_name_prefers_site_name() {
        let page = Page::parse(SAMPLE);
        assert_eq!(page.company_name().as_deref(), Some("Glow Aesthetics"));

        let page = Page::parse(
            r#"<html><head><meta property="og:site_name" content="Glow Vienna"><title>Home | Glow</title></head></html>"#,
        );
        assert_eq!(page.company_name().as_deref(), Some("Glow Vienna"));
    }

    #[test]
    fn title_separators() {
        assert_eq!(name_from_title("Skin Studio - Home").as_deref(), Some("Skin Studio"));
        assert_eq!(name_from_title("Anti-Aging Center").as_deref(), Some("Anti-Aging Center"));
        assert_eq!(name_from_title("Derma: Welcome").as_deref(), Some("Derma"));
        assert_eq!(name_from_title("| Home"), None);
    }

    #[test]
    fn finds_named_contact_in_visible_text() {
        let page = Page::parse(SAMPLE);
        let text = page.visible_text();
        assert_eq!(named_contact(&text).as_deref(), Some("Dr. Anna Weber"));
        assert_eq!(named_contact("Dr Jane Smith-Jones and staff").as_deref(), Some("Dr. Jane Smith-Jones"));
        assert_eq!(named_contact("Our team of experts"), None);
    }

    #[test]
    fn first_email_skips_asset_names() {
        let page = Page::parse(SAMPLE);
        assert_eq!(page.first_email().as_deref(), Some("hello@glowaesthetics.at"));
        assert_eq!(first_email_in("icon@2x.png only"), None);
    }

    #[test]
    fn brand_colors_theme_first_then_styles() {
        let page = Page::parse(SAMPLE);
        let colors = page.brand_colors();
        assert_eq!(colors[0], "#c2185b");
        assert!(colors.contains(&"#7b1fa2".to_string()));
        assert!(colors.contains(&"#00897b".to_string()));
        assert!(!colors.contains(&"#ffffff".to_string()));
        assert_eq!(colors.iter().filter(|c| *c == "#c2185b").count(), 1);
    }
}
