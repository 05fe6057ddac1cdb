//! Title generation: language-prefixed names, core topics and numeric
//! de-duplication suffixes.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{Catalog, GENERAL_TOPIC, UNKNOWN_LANGUAGE};
use crate::signature::is_meaningful;
use crate::text;

pub const MAX_NAME_LEN: usize = 50;

/// Frequent keywords used in a keyword-based name
pub const NAME_KEYWORDS: usize = 3;

/// Fallback body when neither keywords nor a topic are available
pub const FALLBACK_NAME: &str = "code";

/// Lowercase, map separators to `-`, drop everything outside `[a-z0-9-_]`,
/// collapse dash runs and truncate.
pub fn sanitize_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    for c in raw.to_lowercase().chars() {
        let c = if c.is_whitespace() || c == '.' || c == '/' { '-' } else { c };
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
            continue;
        }
        if c == '-' && (name.is_empty() || name.ends_with('-')) {
            continue;
        }
        name.push(c);
    }
    name.truncate(MAX_NAME_LEN);
    name.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Split `name-3` into `("name", Some(3))`. A suffix needs a separator, so
/// `base64` stays whole.
pub fn split_numeric_suffix(title: &str) -> (&str, Option<u32>) {
    let digits = title.len() - title.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 || digits == title.len() {
        return (title, None);
    }
    let (head, tail) = title.split_at(title.len() - digits);
    match head.strip_suffix(['-', '_']) {
        Some(base) if !base.is_empty() => (base, tail.parse().ok()),
        _ => (title, None),
    }
}

/// Title with its language prefix and trailing number removed.
///
/// `"javascript-auth-2"` and `"JavaScript auth"` share the core topic `"auth"`.
pub fn core_topic(title: &str, catalog: &Catalog) -> String {
    let sanitized = sanitize_name(title);
    let (base, _) = split_numeric_suffix(&sanitized);

    let stripped = catalog
        .languages
        .iter()
        .map(|l| l.name)
        .chain([UNKNOWN_LANGUAGE])
        .find_map(|lang| {
            base.strip_prefix(lang)
                .and_then(|rest| rest.strip_prefix(['-', '_']))
        })
        .unwrap_or(base);

    stripped.trim_matches(|c| c == '-' || c == '_').to_string()
}

#[derive(Debug, Clone)]
pub struct NameGenerator {
    catalog: Arc<Catalog>,
}

impl NameGenerator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Most frequent meaningful tokens; ties keep first-seen order
    pub fn top_keywords(&self, text: &str, n: usize) -> Vec<String> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        for (index, token) in text::tokens(text).into_iter().enumerate() {
            if !is_meaningful(&self.catalog, &token) {
                continue;
            }
            counts.entry(token).or_insert((0, index)).0 += 1;
        }

        let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        ranked.into_iter().take(n).map(|(token, _)| token).collect()
    }

    /// Name before de-duplication: `<language>-<top keywords>` or `<language>-<topic>`
    pub fn base_name(&self, language: &str, text: &str, topic: &str) -> String {
        let keywords = self.top_keywords(text, NAME_KEYWORDS);
        let body = if !keywords.is_empty() {
            keywords.join("-")
        } else if topic != GENERAL_TOPIC && !topic.is_empty() {
            topic.to_string()
        } else {
            FALLBACK_NAME.to_string()
        };
        prefixed(language, &body)
    }

    pub fn generate_name(&self, language: &str, text: &str, topic: &str, existing_titles: &[&str]) -> String {
        let name = self.base_name(language, text, topic);
        self.dedupe(&name, existing_titles)
    }

    /// Append the next free integer suffix when a title with the same core
    /// topic already exists. An unsuffixed title counts as number 1.
    pub fn dedupe(&self, name: &str, existing_titles: &[&str]) -> String {
        let topic = core_topic(name, &self.catalog);
        let highest = existing_titles
            .iter()
            .filter(|title| core_topic(title, &self.catalog) == topic)
            .map(|title| {
                let sanitized = sanitize_name(title);
                split_numeric_suffix(&sanitized).1.unwrap_or(1)
            })
            .max();

        match highest {
            None => name.to_string(),
            Some(n) => {
                let suffix = format!("-{}", n + 1);
                let mut base = name.to_string();
                base.truncate(MAX_NAME_LEN.saturating_sub(suffix.len()));
                let base = base.trim_end_matches(['-', '_']);
                debug!("Name {} collides with existing titles, using suffix {}", name, suffix);
                format!("{}{}", base, suffix)
            }
        }
    }

    /// Keyword, topic and framework flavoured names, unique and capped
    pub fn smart_names(
        &self,
        language: &str,
        text: &str,
        topic: &str,
        frameworks: &[String],
        existing_titles: &[&str],
        cap: usize,
    ) -> Vec<String> {
        let mut raw = vec![self.base_name(language, text, topic)];
        if topic != GENERAL_TOPIC && !topic.is_empty() {
            raw.push(prefixed(language, topic));
        }
        if let Some(framework) = frameworks.first() {
            let body = self
                .top_keywords(text, 1)
                .into_iter()
                .next()
                .unwrap_or_else(|| topic.to_string());
            raw.push(sanitize_name(&format!("{}-{}", framework, body)));
        }

        let mut names: Vec<String> = Vec::new();
        for name in raw {
            let name = self.dedupe(&name, existing_titles);
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        names.truncate(cap);
        names
    }
}

fn prefixed(language: &str, body: &str) -> String {
    if language.is_empty() || language == UNKNOWN_LANGUAGE {
        sanitize_name(body)
    } else {
        sanitize_name(&format!("{}-{}", language, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> (NameGenerator, Arc<Catalog>) {
        let catalog = Arc::new(Catalog::new().unwrap());
        (NameGenerator::new(catalog.clone()), catalog)
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("My Auth Helpers!"), "my-auth-helpers");
        assert_eq!(sanitize_name("  --weird__name--  "), "weird__name");
        assert_eq!(sanitize_name(&"x".repeat(80)).len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_split_numeric_suffix() {
        assert_eq!(split_numeric_suffix("auth-3"), ("auth", Some(3)));
        assert_eq!(split_numeric_suffix("auth_12"), ("auth", Some(12)));
        assert_eq!(split_numeric_suffix("base64"), ("base64", None));
        assert_eq!(split_numeric_suffix("2024"), ("2024", None));
    }

    #[test]
    fn test_core_topic() {
        let (_, catalog) = generator();
        assert_eq!(core_topic("javascript-auth-2", &catalog), "auth");
        assert_eq!(core_topic("JavaScript Auth", &catalog), "auth");
        assert_eq!(core_topic("python-data-loader", &catalog), "data-loader");
        assert_eq!(core_topic("notes", &catalog), "notes");
    }

    #[test]
    fn test_generate_name_from_keywords() {
        let (names, _) = generator();
        let name = names.generate_name("javascript", "function add(a,b){return a+b}", "general", &[]);
        assert_eq!(name, "javascript-add");
    }

    #[test]
    fn test_generate_name_falls_back_to_topic() {
        let (names, _) = generator();
        assert_eq!(names.generate_name("python", "x = 1", "algorithms", &[]), "python-algorithms");
        assert_eq!(names.generate_name("unknown", "", "general", &[]), "code");
    }

    #[test]
    fn test_dedupe_uses_next_suffix() {
        let (names, _) = generator();
        assert_eq!(names.dedupe("javascript-add", &["javascript-add"]), "javascript-add-2");
        assert_eq!(
            names.dedupe("javascript-add", &["javascript-add", "javascript-add-4", "python-sort"]),
            "javascript-add-5"
        );
        assert_eq!(names.dedupe("javascript-add", &["python-sort"]), "javascript-add");
    }

    #[test]
    fn test_top_keywords_by_frequency() {
        let (names, _) = generator();
        let text = "cart.total = cart.items.reduce(sum); cart.save(); items";
        assert_eq!(names.top_keywords(text, 2), vec!["cart", "items"]);
    }

    #[test]
    fn test_smart_names() {
        let (names, _) = generator();
        let frameworks = vec!["react".to_string()];
        let variants = names.smart_names(
            "javascript",
            "function login(user) { return auth(user); }",
            "auth",
            &frameworks,
            &[],
            3,
        );
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[1], "javascript-auth");
        assert!(variants[2].starts_with("react-"));
    }
}
