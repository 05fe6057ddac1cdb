use code_organizer_schemas::{ContentItem, CorpusSnapshot, LanguageDetection, TopicClassification};
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{Catalog, GENERAL_TOPIC, UNKNOWN_LANGUAGE};
use crate::naming::NameGenerator;
use crate::text;

/// Language score that maps to full confidence
pub const LANGUAGE_CONFIDENCE_SCALE: f64 = 20.0;
/// Topic score that maps to full confidence
pub const TOPIC_CONFIDENCE_SCALE: f64 = 15.0;
/// Upper bound of the personalization boost from corpus history
pub const MAX_CONTEXT_BOOST: f64 = 0.2;
pub const MAX_TOPIC_TAGS: usize = 5;
/// Runner-up topics added to the suggested tags
pub const SECONDARY_TOPICS: usize = 2;

/// Scores text against the language and topic catalogs
#[derive(Debug, Clone)]
pub struct Classifier {
    catalog: Arc<Catalog>,
    names: NameGenerator,
}

impl Classifier {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            names: NameGenerator::new(catalog.clone()),
            catalog,
        }
    }

    pub fn names(&self) -> &NameGenerator {
        &self.names
    }

    /// Arg-max over weighted motif, keyword, extension and framework hits
    pub fn detect_language(&self, text: &str) -> LanguageDetection {
        let tokens = text::tokens(text);
        let mut best: Option<(&'static str, f64)> = None;

        for profile in &self.catalog.languages {
            let evidence = profile.evidence(text, &tokens);
            let w = profile.weights;
            let score = w.motif * evidence.motif_hits as f64
                + w.keyword * evidence.keyword_hits as f64
                + w.extension * evidence.extension_hits as f64
                + w.framework * evidence.framework_hits as f64;
            if score > 0.0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((profile.name, score));
            }
        }

        let (language, confidence, frameworks) = match best {
            Some((name, score)) => {
                let frameworks = self
                    .catalog
                    .language(name)
                    .map(|p| p.frameworks_in(text))
                    .unwrap_or_default();
                (name, (score / LANGUAGE_CONFIDENCE_SCALE).min(1.0), frameworks)
            }
            None => (UNKNOWN_LANGUAGE, 0.0, Vec::new()),
        };

        let topic = self.primary_topic(text);
        let suggested_name = self.names.generate_name(language, text, topic, &[]);

        debug!(
            "Detected language {} (confidence {:.2}, frameworks {:?})",
            language, confidence, frameworks
        );

        LanguageDetection {
            language: language.to_string(),
            confidence,
            frameworks: dedup(frameworks.into_iter().map(String::from).collect()),
            suggested_name,
        }
    }

    /// Arg-max over weighted topic pattern hits, plus related and runner-up tags
    pub fn classify_topic(&self, text: &str) -> TopicClassification {
        let ranked = self.rank_topics(text);

        let Some(&(primary, best)) = ranked.first() else {
            return TopicClassification {
                topic: GENERAL_TOPIC.to_string(),
                confidence: 0.0,
                suggested_tags: Vec::new(),
            };
        };

        let mut tags: Vec<String> = self
            .catalog
            .topic(primary)
            .map(|t| t.related.iter().map(|r| r.to_string()).collect())
            .unwrap_or_default();
        tags.extend(
            ranked
                .iter()
                .skip(1)
                .take(SECONDARY_TOPICS)
                .map(|(name, _)| name.to_string()),
        );
        let mut tags = dedup(tags);
        tags.retain(|t| t != primary);
        tags.truncate(MAX_TOPIC_TAGS);

        let confidence = (best / TOPIC_CONFIDENCE_SCALE).min(1.0);
        debug!("Classified topic {} (confidence {:.2})", primary, confidence);

        TopicClassification {
            topic: primary.to_string(),
            confidence,
            suggested_tags: tags,
        }
    }

    /// Language detection personalized by the user's language history and
    /// framework hints from the most recent items
    pub fn detect_language_with_context(
        &self,
        text: &str,
        corpus: &CorpusSnapshot,
        recent_window: usize,
    ) -> LanguageDetection {
        let mut detection = self.detect_language(text);
        if detection.language == UNKNOWN_LANGUAGE || corpus.is_empty() {
            return detection;
        }

        let same_language = corpus
            .items()
            .filter(|item| item.language.as_deref() == Some(detection.language.as_str()))
            .count();
        detection.confidence = boosted(detection.confidence, same_language, corpus.len());

        if let Some(profile) = self.catalog.language(&detection.language) {
            for item in recent_items(corpus, recent_window) {
                if item.language.as_deref() != Some(profile.name) {
                    continue;
                }
                for framework in profile.frameworks_in(&item.text) {
                    if !detection.frameworks.iter().any(|f| f == framework) {
                        detection.frameworks.push(framework.to_string());
                    }
                }
            }
        }

        let titles = file_titles(corpus);
        detection.suggested_name = self
            .names
            .generate_name(&detection.language, text, self.primary_topic(text), &titles);

        debug!(
            "Personalized language {} to confidence {:.2} ({} of {} corpus items)",
            detection.language,
            detection.confidence,
            same_language,
            corpus.len()
        );

        detection
    }

    /// Topic classification boosted by how often the user tags items with it
    pub fn classify_topic_with_context(&self, text: &str, corpus: &CorpusSnapshot) -> TopicClassification {
        let mut classification = self.classify_topic(text);
        if classification.topic == GENERAL_TOPIC || corpus.is_empty() {
            return classification;
        }

        let tagged = corpus
            .items()
            .filter(|item| item.tags.iter().any(|t| t == &classification.topic))
            .count();
        classification.confidence = boosted(classification.confidence, tagged, corpus.len());
        classification
    }

    /// Name for new text, de-duplicated against the corpus file titles
    pub fn suggest_name(&self, language: &str, topic: &str, text: &str, corpus: &CorpusSnapshot) -> String {
        self.names
            .generate_name(language, text, topic, &file_titles(corpus))
    }

    fn rank_topics(&self, text: &str) -> Vec<(&'static str, f64)> {
        let mut ranked: Vec<(&'static str, f64)> = self
            .catalog
            .topics
            .iter()
            .map(|t| (t.name, t.score(text)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        // Stable sort keeps catalog order among equal scores
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    fn primary_topic(&self, text: &str) -> &'static str {
        self.rank_topics(text)
            .first()
            .map_or(GENERAL_TOPIC, |&(name, _)| name)
    }
}

/// Most recent items first, ties by id
pub fn recent_items(corpus: &CorpusSnapshot, window: usize) -> Vec<&ContentItem> {
    let mut items: Vec<&ContentItem> = corpus.items().collect();
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
    items.truncate(window);
    items
}

pub fn file_titles(corpus: &CorpusSnapshot) -> Vec<&str> {
    corpus
        .files
        .iter()
        .filter_map(|f| f.title.as_deref())
        .collect()
}

fn boosted(confidence: f64, hits: usize, total: usize) -> f64 {
    if total == 0 {
        return confidence;
    }
    let ratio = hits as f64 / total as f64;
    (confidence + MAX_CONTEXT_BOOST * ratio).min(1.0)
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn classifier() -> Classifier {
        Classifier::new(Arc::new(Catalog::new().unwrap()))
    }

    #[test]
    fn test_detect_javascript() {
        let detection = classifier().detect_language("function add(a,b){return a+b}");
        assert_eq!(detection.language, "javascript");
        assert!(detection.confidence > 0.0);
        assert!(detection.suggested_name.starts_with("javascript-"));
    }

    #[test]
    fn test_detect_python_with_frameworks() {
        let text = "import pandas as pd\n\ndef load(path):\n    df = pd.read_csv(path)\n    return df\n";
        let detection = classifier().detect_language(text);
        assert_eq!(detection.language, "python");
        assert_eq!(detection.frameworks, vec!["pandas"]);
    }

    #[test]
    fn test_detect_unknown() {
        let detection = classifier().detect_language("   ");
        assert_eq!(detection.language, UNKNOWN_LANGUAGE);
        assert_eq!(detection.confidence, 0.0);
        assert!(detection.frameworks.is_empty());
    }

    #[test]
    fn test_language_confidence_capped() {
        let text = "const a = require('a');\n".repeat(40);
        let detection = classifier().detect_language(&text);
        assert_eq!(detection.language, "javascript");
        assert_eq!(detection.confidence, 1.0);
    }

    #[test]
    fn test_classify_topic_auth() {
        let text = "async function login(email, password) {\n  const token = jwt.sign({ email });\n  return token;\n}";
        let topic = classifier().classify_topic(text);
        assert_eq!(topic.topic, "auth");
        assert!(topic.confidence > 0.0);
        assert!(topic.suggested_tags.contains(&"security".to_string()));
        assert!(topic.suggested_tags.len() <= MAX_TOPIC_TAGS);
        assert!(!topic.suggested_tags.contains(&"auth".to_string()));
    }

    #[test]
    fn test_classify_topic_general() {
        let topic = classifier().classify_topic("x = 1");
        assert_eq!(topic.topic, GENERAL_TOPIC);
        assert!(topic.suggested_tags.is_empty());
    }

    #[test]
    fn test_context_boost_bounded() {
        let classifier = classifier();
        let text = "function add(a,b){return a+b}";
        let base = classifier.detect_language(text);

        let now = Utc::now();
        let files = (0..4)
            .map(|i| {
                ContentItem::file(format!("f{}", i), "javascript-math", "const x = 1;", now - Duration::minutes(i))
                    .with_language("javascript")
            })
            .collect();
        let corpus = CorpusSnapshot::new(files, vec![]);
        let personalized = classifier.detect_language_with_context(text, &corpus, 10);

        assert!(personalized.confidence > base.confidence);
        assert!(personalized.confidence <= base.confidence + MAX_CONTEXT_BOOST + 1e-9);
    }

    #[test]
    fn test_recent_framework_hints() {
        let classifier = classifier();
        let now = Utc::now();
        let react = ContentItem::snippet("s1", "import React from 'react';", now).with_language("javascript");
        let corpus = CorpusSnapshot::new(vec![], vec![react]);
        let detection = classifier.detect_language_with_context("const x = () => 1;", &corpus, 5);
        assert_eq!(detection.frameworks, vec!["react"]);
    }

    #[test]
    fn test_suggest_name_dedupes_against_files() {
        let classifier = classifier();
        let now = Utc::now();
        let corpus = CorpusSnapshot::new(vec![ContentItem::file("f1", "javascript-add", "", now)], vec![]);
        let name = classifier.suggest_name("javascript", "general", "function add(a,b){return a+b}", &corpus);
        assert_eq!(name, "javascript-add-2");
    }
}
