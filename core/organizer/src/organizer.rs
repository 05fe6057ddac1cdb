//! The classify pipeline and the engine facade the service and CLI call into.

use chrono::{DateTime, Utc};
use code_organizer_analysis::{
    classifier::file_titles, AppendAdvisor, Catalog, Classifier, SequenceDetector, SimilarityEngine, GENERAL_TOPIC,
    UNKNOWN_LANGUAGE,
};
use code_organizer_schemas::{
    generate_item_id, BatchMergeResult, Classification, ClassifyOutcome, ContentGroup, ContentItem, CorpusSnapshot,
    GroupingResult, LanguageDetection, MergeCandidate, MergeOptions, MergeResult, OrganizationSuggestions,
    SequenceAnalysis, SimilarityResult, TopicClassification,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use crate::config::OrganizerConfig;
use crate::error::{OrganizerError, Result};
use crate::grouping::GroupingEngine;
use crate::merge::MergeEngine;

/// Every engine wired to one shared catalog. Holds no per-call state, so one
/// instance serves concurrent requests.
#[derive(Debug, Clone)]
pub struct CodeOrganizer {
    config: OrganizerConfig,
    classifier: Classifier,
    similarity: SimilarityEngine,
    sequences: SequenceDetector,
    advisor: AppendAdvisor,
    merges: MergeEngine,
    grouping: GroupingEngine,
}

impl CodeOrganizer {
    pub fn new(config: OrganizerConfig) -> Result<Self> {
        let catalog = Catalog::new()?;
        Ok(Self::with_catalog(config, Arc::new(catalog)))
    }

    pub fn with_catalog(config: OrganizerConfig, catalog: Arc<Catalog>) -> Self {
        Self {
            classifier: Classifier::new(catalog.clone()),
            similarity: SimilarityEngine::new(catalog.clone()),
            sequences: SequenceDetector::new(catalog.clone()),
            advisor: AppendAdvisor::new(catalog.clone()),
            merges: MergeEngine::new(catalog.clone(), config.max_merge_candidates),
            grouping: GroupingEngine::new(catalog, config.max_groups),
            config,
        }
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    /// Classify new text against the corpus and decide where it belongs.
    /// Nothing is written anywhere; persisting the outcome is the caller's job.
    pub fn process_and_classify(
        &self,
        text: &str,
        timestamp: DateTime<Utc>,
        corpus: &CorpusSnapshot,
        include_suggestions: bool,
    ) -> ClassifyOutcome {
        let language = self
            .classifier
            .detect_language_with_context(text, corpus, self.config.recent_window);
        let topic = self.classifier.classify_topic_with_context(text, corpus);
        info!(
            "Classified text as {} / {} against {} corpus items",
            language.language,
            topic.topic,
            corpus.len()
        );

        let mut similar_items = self
            .similarity
            .find_similar_content(text, corpus.items(), self.config.search_threshold);
        similar_items.truncate(self.config.max_similar_items);
        info!("Found {} similar items", similar_items.len());

        let suggested_name = self
            .classifier
            .suggest_name(&language.language, &topic.topic, text, corpus);
        let suggested_tags = suggested_tags(&language, &topic);

        let mut item = ContentItem::snippet(generate_item_id().0, text, timestamp).with_tags(suggested_tags.clone());
        if language.language != UNKNOWN_LANGUAGE {
            item = item.with_language(language.language.clone());
        }

        let append = self
            .advisor
            .should_append_to_existing(&item, &suggested_name, corpus, &similar_items);
        info!(
            "Append decision: {} ({:?}, confidence {:.2})",
            append.should_append, append.reason, append.confidence
        );

        let suggestions =
            include_suggestions.then(|| self.suggestions(&item, &language, &topic, &suggested_tags, corpus));

        ClassifyOutcome {
            classification: Classification {
                language,
                topic,
                suggested_name,
                suggested_tags,
                append,
                similar_items,
            },
            suggestions,
        }
    }

    fn suggestions(
        &self,
        item: &ContentItem,
        language: &LanguageDetection,
        topic: &TopicClassification,
        tags: &[String],
        corpus: &CorpusSnapshot,
    ) -> OrganizationSuggestions {
        let merge_candidates = if self.config.suggest_merges {
            let targets: Vec<ContentItem> = corpus.items().cloned().collect();
            self.merges.find_merge_candidates(item, &targets)
        } else {
            Vec::new()
        };

        let group_suggestions = if self.config.suggest_groups {
            self.related_groups(item, tags, corpus)
        } else {
            Vec::new()
        };

        let smart_names = if self.config.suggest_names {
            self.classifier.names().smart_names(
                &language.language,
                &item.text,
                &topic.topic,
                &language.frameworks,
                &file_titles(corpus),
                self.config.max_smart_names,
            )
        } else {
            Vec::new()
        };

        info!(
            "Suggestions: {} merge candidates, {} groups, {} names",
            merge_candidates.len(),
            group_suggestions.len(),
            smart_names.len()
        );
        OrganizationSuggestions {
            merge_candidates,
            group_suggestions,
            smart_names,
        }
    }

    /// Corpus groups sharing a tag, topic or project with the new item
    fn related_groups(&self, item: &ContentItem, tags: &[String], corpus: &CorpusSnapshot) -> Vec<ContentGroup> {
        let extractor = self.similarity.extractor();
        let wanted: HashSet<&str> = tags.iter().map(String::as_str).collect();
        let projects: HashSet<String> = extractor.project_indicators(&item.text).into_iter().collect();

        self.grouping
            .group_content(corpus)
            .groups
            .into_iter()
            .filter(|group| {
                group.tags.iter().any(|t| wanted.contains(t.as_str()))
                    || (!projects.is_empty()
                        && group.members.iter().any(|m| {
                            corpus.find(&m.item_id).is_some_and(|member| {
                                extractor
                                    .project_indicators(&member.text)
                                    .iter()
                                    .any(|p| projects.contains(p))
                            })
                        }))
            })
            .take(self.config.max_group_suggestions)
            .collect()
    }

    pub fn calculate_similarity(&self, a: &str, b: &str) -> SimilarityResult {
        self.similarity.calculate_similarity(a, b)
    }

    pub fn analyze_sequence(&self, item: &ContentItem, related: &[ContentItem]) -> SequenceAnalysis {
        self.sequences.analyze(item, related)
    }

    pub fn find_merge_candidates(&self, source: &ContentItem, targets: &[ContentItem]) -> Vec<MergeCandidate> {
        self.merges.find_merge_candidates(source, targets)
    }

    /// Merge `source` into `target` using a candidate produced for that pair
    pub fn execute_merge(
        &self,
        source: &ContentItem,
        target: &ContentItem,
        candidate: &MergeCandidate,
        options: &MergeOptions,
    ) -> Result<MergeResult> {
        if candidate.source_id != source.id {
            return Err(OrganizerError::CandidateMismatch {
                candidate: candidate.source_id.clone(),
                item: source.id.clone(),
            });
        }
        if candidate.target_id != target.id {
            return Err(OrganizerError::CandidateMismatch {
                candidate: candidate.target_id.clone(),
                item: target.id.clone(),
            });
        }
        Ok(self.merges.execute_merge(source, target, candidate, options))
    }

    pub fn batch_merge(&self, items: &[ContentItem]) -> BatchMergeResult {
        self.merges.batch_merge(items)
    }

    pub fn group_content(&self, corpus: &CorpusSnapshot) -> GroupingResult {
        self.grouping.group_content(corpus)
    }
}

/// Language, topic, related topics and frameworks, without placeholders
fn suggested_tags(language: &LanguageDetection, topic: &TopicClassification) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: &str| {
        let tag = tag.to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    };
    if language.language != UNKNOWN_LANGUAGE {
        push(&language.language);
    }
    if topic.topic != GENERAL_TOPIC {
        push(&topic.topic);
    }
    for tag in &topic.suggested_tags {
        push(tag);
    }
    for framework in &language.frameworks {
        push(framework);
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_organizer_schemas::AppendReason;

    fn organizer() -> CodeOrganizer {
        CodeOrganizer::new(OrganizerConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_corpus_starts_new_item() {
        let outcome = organizer().process_and_classify(
            "function add(a, b) { return a + b; }",
            Utc::now(),
            &CorpusSnapshot::default(),
            false,
        );
        let classification = outcome.classification;
        assert_eq!(classification.language.language, "javascript");
        assert!(classification.suggested_name.starts_with("javascript-"));
        assert!(classification.suggested_tags.contains(&"javascript".to_string()));
        assert!(!classification.append.should_append);
        assert_eq!(classification.append.reason, AppendReason::NoMatch);
        assert!(classification.similar_items.is_empty());
        assert!(outcome.suggestions.is_none());
    }

    #[test]
    fn test_blank_text_is_a_valid_outcome() {
        let outcome = organizer().process_and_classify("   ", Utc::now(), &CorpusSnapshot::default(), true);
        assert_eq!(outcome.classification.language.language, UNKNOWN_LANGUAGE);
        assert_eq!(outcome.classification.topic.topic, GENERAL_TOPIC);
        let suggestions = outcome.suggestions.unwrap();
        assert!(suggestions.merge_candidates.is_empty());
        assert!(suggestions.group_suggestions.is_empty());
    }

    #[test]
    fn test_blank_text_not_appended_to_fallback_named_file() {
        let now = Utc::now();
        let file = ContentItem::file("f1", "code-2", "SELECT id FROM orders;", now);
        let corpus = CorpusSnapshot::new(vec![file], vec![]);

        let outcome = organizer().process_and_classify("   \n  ", now, &corpus, false);
        assert!(!outcome.classification.append.should_append);
        assert_eq!(outcome.classification.append.reason, AppendReason::NoMatch);
    }

    #[test]
    fn test_similar_items_respect_cap() {
        let now = Utc::now();
        let snippets: Vec<ContentItem> = (0..5)
            .map(|i| ContentItem::snippet(format!("s{}", i), "const total = items.reduce((a, b) => a + b, 0);", now))
            .collect();
        let config = OrganizerConfig {
            max_similar_items: 2,
            ..OrganizerConfig::default()
        };
        let organizer = CodeOrganizer::new(config).unwrap();
        let outcome = organizer.process_and_classify(
            "const total = items.reduce((a, b) => a + b, 0);",
            now,
            &CorpusSnapshot::new(vec![], snippets),
            false,
        );
        assert_eq!(outcome.classification.similar_items.len(), 2);
        assert!(outcome.classification.append.should_append);
    }

    #[test]
    fn test_suggestion_steps_can_be_disabled() {
        let config = OrganizerConfig {
            suggest_merges: false,
            suggest_groups: false,
            suggest_names: false,
            ..OrganizerConfig::default()
        };
        let now = Utc::now();
        let corpus = CorpusSnapshot::new(vec![], vec![ContentItem::snippet("a", "function foo() {}", now)]);
        let outcome = CodeOrganizer::new(config)
            .unwrap()
            .process_and_classify("foo();", now, &corpus, true);
        let suggestions = outcome.suggestions.unwrap();
        assert!(suggestions.merge_candidates.is_empty());
        assert!(suggestions.smart_names.is_empty());
    }

    #[test]
    fn test_execute_merge_rejects_mismatched_candidate() {
        let organizer = organizer();
        let now = Utc::now();
        let a = ContentItem::snippet("a", "function foo() {}", now);
        let b = ContentItem::snippet("b", "foo();", now);
        let candidates = organizer.find_merge_candidates(&b, std::slice::from_ref(&a));
        let candidate = candidates.first().unwrap();

        let err = organizer
            .execute_merge(&a, &b, candidate, &MergeOptions::default())
            .unwrap_err();
        assert!(matches!(err, OrganizerError::CandidateMismatch { .. }));
        assert!(organizer.execute_merge(&b, &a, candidate, &MergeOptions::default()).is_ok());
    }

    #[test]
    fn test_suggested_tags_skip_placeholders() {
        let language = LanguageDetection {
            language: UNKNOWN_LANGUAGE.to_string(),
            confidence: 0.0,
            frameworks: vec!["React".to_string()],
            suggested_name: String::new(),
        };
        let topic = TopicClassification {
            topic: GENERAL_TOPIC.to_string(),
            confidence: 0.0,
            suggested_tags: vec!["react".to_string()],
        };
        assert_eq!(suggested_tags(&language, &topic), vec!["react"]);
    }
}
