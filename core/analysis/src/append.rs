use code_organizer_schemas::{
    AppendDecision, AppendReason, ContentItem, CorpusSnapshot, ItemKind, SequencePatternType, SimilarItem,
};
use std::sync::Arc;
use tracing::debug;

use crate::catalog::Catalog;
use crate::naming::{core_topic, FALLBACK_NAME};
use crate::sequence::SequenceDetector;
use crate::text;

/// Confidence reported for an exact core-topic match
pub const CORE_TOPIC_CONFIDENCE: f64 = 0.9;
/// Top similarity above this appends outright
pub const HIGH_SIMILARITY_APPEND: f64 = 0.5;
/// Continuation confidence above this appends to the candidate file
pub const CONTINUATION_APPEND: f64 = 0.7;
/// Last-resort similarity cut-off
pub const MODERATE_SIMILARITY_APPEND: f64 = 0.4;

/// Decides whether new text extends an existing file or starts a new one
#[derive(Debug, Clone)]
pub struct AppendAdvisor {
    catalog: Arc<Catalog>,
    sequences: SequenceDetector,
}

impl AppendAdvisor {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            sequences: SequenceDetector::new(catalog.clone()),
            catalog,
        }
    }

    /// Rules in order, first match wins:
    /// 1. a corpus file shares the suggested name's core topic, unless the
    ///    name is the fallback for text with nothing to name it by
    /// 2. top similarity above 0.5
    /// 3. continuation of the top candidate's file above 0.7
    /// 4. top similarity above 0.4
    ///
    /// `similar` must be sorted best first.
    pub fn should_append_to_existing(
        &self,
        item: &ContentItem,
        suggested_name: &str,
        corpus: &CorpusSnapshot,
        similar: &[SimilarItem],
    ) -> AppendDecision {
        let topic = core_topic(suggested_name, &self.catalog);
        let nameable = topic != FALLBACK_NAME && !text::tokens(&item.text).is_empty();
        if nameable && !topic.is_empty() {
            let matching = corpus.files.iter().find(|file| {
                file.title
                    .as_deref()
                    .is_some_and(|title| core_topic(title, &self.catalog) == topic)
            });
            if let Some(file) = matching {
                debug!("Core topic {} matches file {}", topic, file.id);
                return AppendDecision {
                    should_append: true,
                    target_id: Some(file.id.clone()),
                    reason: AppendReason::CoreTopicMatch,
                    confidence: CORE_TOPIC_CONFIDENCE,
                };
            }
        }

        let Some(top) = similar.first() else {
            return AppendDecision::new_item();
        };
        let score = top.similarity.score;
        let target = corpus.find(&top.item_id).map(|candidate| owning_file(candidate, corpus));
        let target_id = target.map_or_else(|| top.item_id.clone(), |t| t.id.clone());

        if score > HIGH_SIMILARITY_APPEND {
            return AppendDecision {
                should_append: true,
                target_id: Some(target_id),
                reason: AppendReason::HighSimilarity,
                confidence: score,
            };
        }

        if let Some(target) = target {
            let mut related = vec![target.clone()];
            if target.kind == ItemKind::File {
                related.extend(corpus.snippets_in_file(&target.id).cloned());
            }
            let pattern = self.sequences.detect_pattern(item, &related);
            if pattern.pattern_type == SequencePatternType::Continuation && pattern.confidence > CONTINUATION_APPEND {
                return AppendDecision {
                    should_append: true,
                    target_id: Some(target_id),
                    reason: AppendReason::SequenceContinuation,
                    confidence: pattern.confidence,
                };
            }
        }

        if score > MODERATE_SIMILARITY_APPEND {
            return AppendDecision {
                should_append: true,
                target_id: Some(target_id),
                reason: AppendReason::ModerateSimilarity,
                confidence: score,
            };
        }

        AppendDecision::new_item()
    }
}

/// The file a snippet was saved into, or the item itself
fn owning_file<'a>(item: &'a ContentItem, corpus: &'a CorpusSnapshot) -> &'a ContentItem {
    item.file_id
        .as_ref()
        .and_then(|file_id| corpus.files.iter().find(|f| &f.id == file_id))
        .unwrap_or(item)
}
