//! Merge candidates, single-pair execution and batch merging.
//!
//! Strategy applicability, first table row wins ties:
//! - sequence continuation: detector continuation confidence x 0.9
//! - semantic consolidation: similarity x 0.8 when high or related
//! - dependency integration: 0.7 when one side calls what the other declares
//! - evolution replacement: 0.8 (improvement vocabulary on the newer side) or 0.4,
//!   only within 24h and above 0.6 similarity
//! - feature integration: 0.6 when new-feature vocabulary is present and similarity > 0.4

use chrono::Duration;
use code_organizer_analysis::catalog::comment_prefix_for;
use code_organizer_analysis::{text, Catalog, SequenceDetector, SignatureExtractor, SimilarityEngine};
use code_organizer_schemas::{
    BatchMergeResult, ConflictResolution, ContentItem, MergeCandidate, MergeConflict, MergeOptions, MergeResult,
    MergeStrategy, MergeType, MergedGroup, MergedMetadata, SequenceAnalysis, SequencePatternType, SimilarityCategory,
    SimilarityResult, UnmergedGroup,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::conflict::{self, ConflictAnalyzer};

pub const SEQUENCE_WEIGHT: f64 = 0.9;
pub const SEMANTIC_WEIGHT: f64 = 0.8;
pub const DEPENDENCY_CONFIDENCE: f64 = 0.7;
pub const EVOLUTION_WINDOW_HOURS: i64 = 24;
pub const EVOLUTION_MIN_SIMILARITY: f64 = 0.6;
pub const EVOLUTION_IMPROVED: f64 = 0.8;
pub const EVOLUTION_PLAIN: f64 = 0.4;
pub const FEATURE_CONFIDENCE: f64 = 0.6;
pub const FEATURE_MIN_SIMILARITY: f64 = 0.4;

/// Candidates scoring below this are discarded
pub const MIN_CANDIDATE_CONFIDENCE: f64 = 0.3;
pub const DEFAULT_MAX_CANDIDATES: usize = 5;
/// Batch groups split where neighbour similarity is at or below this
pub const BATCH_SPLIT_SIMILARITY: f64 = 0.5;
pub const PREVIEW_LINES: usize = 10;

/// Everything the strategy functions need about one source/target pair
struct Pair<'a> {
    source: &'a ContentItem,
    target: &'a ContentItem,
    similarity: SimilarityResult,
    sequence: SequenceAnalysis,
    /// Names the source calls that only the target declares
    source_uses: Vec<String>,
    /// Names the target calls that only the source declares
    target_uses: Vec<String>,
}

impl<'a> Pair<'a> {
    fn newer_and_older(&self) -> (&'a ContentItem, &'a ContentItem) {
        if self.target.timestamp > self.source.timestamp {
            (self.target, self.source)
        } else {
            (self.source, self.target)
        }
    }

    fn source_first(&self) -> bool {
        self.sequence.sequence.position_of(&self.source.id) == Some(0)
    }
}

struct Applicable {
    confidence: f64,
    merge_type: MergeType,
    reason: String,
}

type Applicability = fn(&MergeEngine, &Pair) -> Option<Applicable>;
type Execute = fn(&MergeEngine, &Pair) -> String;

const STRATEGIES: [(MergeStrategy, Applicability, Execute); 5] = [
    (
        MergeStrategy::SequenceContinuation,
        MergeEngine::continuation_applies,
        MergeEngine::concatenate,
    ),
    (
        MergeStrategy::SemanticConsolidation,
        MergeEngine::consolidation_applies,
        MergeEngine::consolidate,
    ),
    (
        MergeStrategy::DependencyIntegration,
        MergeEngine::dependency_applies,
        MergeEngine::integrate_dependency,
    ),
    (
        MergeStrategy::EvolutionReplacement,
        MergeEngine::evolution_applies,
        MergeEngine::replace_with_history,
    ),
    (
        MergeStrategy::FeatureIntegration,
        MergeEngine::feature_applies,
        MergeEngine::integrate_features,
    ),
];

fn executor(strategy: MergeStrategy) -> Execute {
    STRATEGIES
        .iter()
        .find(|(s, _, _)| *s == strategy)
        .map(|(_, _, execute)| *execute)
        .unwrap_or(MergeEngine::concatenate)
}

#[derive(Debug, Clone)]
pub struct MergeEngine {
    similarity: SimilarityEngine,
    sequences: SequenceDetector,
    conflicts: ConflictAnalyzer,
    max_candidates: usize,
}

impl MergeEngine {
    pub fn new(catalog: Arc<Catalog>, max_candidates: usize) -> Self {
        Self {
            similarity: SimilarityEngine::new(catalog.clone()),
            sequences: SequenceDetector::new(catalog.clone()),
            conflicts: ConflictAnalyzer::new(SignatureExtractor::new(catalog)),
            max_candidates,
        }
    }

    fn extractor(&self) -> &SignatureExtractor {
        self.similarity.extractor()
    }

    pub fn analyze_conflicts(&self, source: &ContentItem, target: &ContentItem) -> Vec<MergeConflict> {
        self.conflicts.analyze(source, target)
    }

    fn pair<'a>(&self, source: &'a ContentItem, target: &'a ContentItem) -> Pair<'a> {
        let extractor = self.extractor();
        let source_declared = declared(extractor, &source.text);
        let target_declared = declared(extractor, &target.text);
        let uses = |text: &str, own: &HashSet<String>, other: &HashSet<String>| -> Vec<String> {
            let mut names: Vec<String> = extractor
                .calls(text)
                .into_iter()
                .filter(|c| other.contains(c) && !own.contains(c))
                .collect();
            names.sort();
            names.dedup();
            names
        };

        Pair {
            source,
            target,
            similarity: self.similarity.calculate_similarity(&source.text, &target.text),
            sequence: self.sequences.analyze(source, std::slice::from_ref(target)),
            source_uses: uses(&source.text, &source_declared, &target_declared),
            target_uses: uses(&target.text, &target_declared, &source_declared),
        }
    }

    /// Best strategy per target, top candidates by confidence
    pub fn find_merge_candidates(&self, source: &ContentItem, targets: &[ContentItem]) -> Vec<MergeCandidate> {
        let mut candidates: Vec<MergeCandidate> = targets
            .iter()
            .filter(|t| t.id != source.id && !t.text.trim().is_empty())
            .filter_map(|target| self.best_candidate(source, target))
            .collect();

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.target_id.cmp(&b.target_id))
        });
        candidates.truncate(self.max_candidates);

        debug!("Found {} merge candidates for {}", candidates.len(), source.id);
        candidates
    }

    fn best_candidate(&self, source: &ContentItem, target: &ContentItem) -> Option<MergeCandidate> {
        if source.text.trim().is_empty() {
            return None;
        }
        let pair = self.pair(source, target);

        let mut best: Option<(MergeStrategy, Applicable, Execute)> = None;
        for (strategy, applies, execute) in STRATEGIES {
            let Some(found) = applies(self, &pair) else {
                continue;
            };
            if found.confidence < MIN_CANDIDATE_CONFIDENCE {
                continue;
            }
            if best.as_ref().map_or(true, |(_, b, _)| found.confidence > b.confidence) {
                best = Some((strategy, found, execute));
            }
        }
        let (strategy, found, execute) = best?;

        let merged = execute(self, &pair);
        let preview = merged.lines().take(PREVIEW_LINES).collect::<Vec<_>>().join("\n");

        Some(MergeCandidate {
            source_id: source.id.clone(),
            target_id: target.id.clone(),
            merge_type: found.merge_type,
            strategy,
            confidence: found.confidence,
            reason: found.reason,
            conflicts: self.conflicts.analyze(source, target),
            preview,
        })
    }

    fn continuation_applies(&self, pair: &Pair) -> Option<Applicable> {
        let confidence = pair
            .sequence
            .sequence
            .items
            .iter()
            .filter(|i| i.pattern_type == SequencePatternType::Continuation)
            .map(|i| i.confidence)
            .fold(0.0, f64::max);
        if confidence <= 0.0 {
            return None;
        }
        let merge_type = if pair.source_first() {
            MergeType::Prepend
        } else {
            MergeType::Append
        };
        Some(Applicable {
            confidence: confidence * SEQUENCE_WEIGHT,
            merge_type,
            reason: format!("Items continue each other (sequence confidence {:.2})", confidence),
        })
    }

    fn consolidation_applies(&self, pair: &Pair) -> Option<Applicable> {
        match pair.similarity.category {
            SimilarityCategory::HighSimilarity | SimilarityCategory::Related => Some(Applicable {
                confidence: pair.similarity.score * SEMANTIC_WEIGHT,
                merge_type: MergeType::Consolidate,
                reason: format!("Similar content (similarity {:.2})", pair.similarity.score),
            }),
            _ => None,
        }
    }

    fn dependency_applies(&self, pair: &Pair) -> Option<Applicable> {
        let name = pair.source_uses.first().or_else(|| pair.target_uses.first())?;
        Some(Applicable {
            confidence: DEPENDENCY_CONFIDENCE,
            merge_type: MergeType::Interleave,
            reason: format!("{} is declared in one item and used in the other", name),
        })
    }

    fn evolution_applies(&self, pair: &Pair) -> Option<Applicable> {
        let apart = (pair.source.timestamp - pair.target.timestamp).num_seconds().abs();
        if apart >= Duration::hours(EVOLUTION_WINDOW_HOURS).num_seconds()
            || pair.similarity.score <= EVOLUTION_MIN_SIMILARITY
        {
            return None;
        }
        let (newer, _) = pair.newer_and_older();
        let improved = self.extractor().catalog().vocabulary.improvement.is_match(&newer.text);
        Some(Applicable {
            confidence: if improved { EVOLUTION_IMPROVED } else { EVOLUTION_PLAIN },
            merge_type: MergeType::Replace,
            reason: if improved {
                format!("{} is an improved version", newer.id)
            } else {
                format!("{} is a newer version", newer.id)
            },
        })
    }

    fn feature_applies(&self, pair: &Pair) -> Option<Applicable> {
        let vocab = &self.extractor().catalog().vocabulary;
        let has_feature =
            vocab.new_functionality.is_match(&pair.source.text) || vocab.new_functionality.is_match(&pair.target.text);
        if !has_feature || pair.similarity.score <= FEATURE_MIN_SIMILARITY {
            return None;
        }
        Some(Applicable {
            confidence: FEATURE_CONFIDENCE,
            merge_type: MergeType::Consolidate,
            reason: "New functionality on top of shared code".to_string(),
        })
    }

    /// Both texts in detector order
    fn concatenate(&self, pair: &Pair) -> String {
        if pair.source_first() {
            join_texts(&pair.source.text, &pair.target.text)
        } else {
            join_texts(&pair.target.text, &pair.source.text)
        }
    }

    /// Source, then target lines with no equivalent in the source
    fn consolidate(&self, pair: &Pair) -> String {
        let present: HashSet<String> = text::non_blank_lines(&pair.source.text)
            .map(text::normalize_line)
            .collect();
        let mut merged: Vec<&str> = pair.source.text.lines().collect();
        for line in pair.target.text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if text::is_punctuation_only(line) || !present.contains(&text::normalize_line(line)) {
                merged.push(line);
            }
        }
        merged.join("\n")
    }

    /// The item that declares what the other uses goes first
    fn integrate_dependency(&self, pair: &Pair) -> String {
        if !pair.source_uses.is_empty() {
            join_texts(&pair.target.text, &pair.source.text)
        } else {
            join_texts(&pair.source.text, &pair.target.text)
        }
    }

    /// Newer text, then the older one commented out
    fn replace_with_history(&self, pair: &Pair) -> String {
        let (newer, older) = pair.newer_and_older();
        let language = newer
            .language
            .clone()
            .unwrap_or_else(|| self.extractor().guess_language(&newer.text));
        let prefix = comment_prefix_for(&language);

        let mut merged = newer.text.trim_end().to_string();
        merged.push_str(&format!("\n\n{} Previous version:", prefix));
        for line in older.text.lines() {
            if line.trim().is_empty() {
                merged.push_str(&format!("\n{}", prefix));
            } else {
                merged.push_str(&format!("\n{} {}", prefix, line));
            }
        }
        merged
    }

    /// Shared leading run, then each top-level declaration once
    fn integrate_features(&self, pair: &Pair) -> String {
        let a: Vec<&str> = pair.source.text.lines().collect();
        let b: Vec<&str> = pair.target.text.lines().collect();
        let common = a
            .iter()
            .zip(b.iter())
            .take_while(|(x, y)| text::normalize_line(x) == text::normalize_line(y))
            .count();

        let mut merged: Vec<String> = a[..common].iter().map(|l| l.to_string()).collect();
        let mut seen: HashSet<String> = HashSet::new();
        for chunk in top_level_chunks(&a[common..]).into_iter().chain(top_level_chunks(&b[common..])) {
            let key = self.chunk_key(&chunk);
            if seen.insert(key) {
                merged.push(chunk);
            }
        }
        merged.join("\n")
    }

    fn chunk_key(&self, chunk: &str) -> String {
        let extractor = self.extractor();
        extractor
            .functions(chunk)
            .into_iter()
            .chain(extractor.classes(chunk))
            .next()
            .unwrap_or_else(|| text::normalize_whitespace(chunk))
    }

    /// Execute a candidate after re-checking conflicts. Unresolved manual
    /// conflicts refuse the merge; validation problems only warn.
    pub fn execute_merge(
        &self,
        source: &ContentItem,
        target: &ContentItem,
        candidate: &MergeCandidate,
        options: &MergeOptions,
    ) -> MergeResult {
        let conflicts = self.conflicts.analyze(source, target);
        let blocking = conflict::unresolved(&conflicts, options);
        if !blocking.is_empty() {
            let warnings: Vec<String> = blocking
                .iter()
                .map(|c| format!("Unresolved {} conflict: {}", c.conflict_type.as_str(), c.description))
                .collect();
            warn!(
                "Refusing merge of {} into {}: {} unresolved conflicts",
                source.id,
                target.id,
                warnings.len()
            );
            return MergeResult::refused(warnings);
        }

        let pair = self.pair(source, target);
        let merged = executor(candidate.strategy)(self, &pair);
        let warnings = self.validate(&merged);
        if !warnings.is_empty() {
            debug!("Merged content failed validation: {}", warnings.join("; "));
        }

        let applied_resolutions = conflicts
            .iter()
            .map(|c| {
                let how = if options.skipped_conflicts.contains(&c.conflict_type) {
                    "skipped"
                } else if c.resolution == ConflictResolution::Auto {
                    "resolved automatically"
                } else {
                    "resolved by caller"
                };
                format!("{}: {}", c.conflict_type.as_str(), how)
            })
            .collect();

        let mut tags: Vec<String> = source.tags.clone();
        for tag in &target.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        info!(
            "Merged {} and {} with {}",
            source.id,
            target.id,
            candidate.strategy.as_str()
        );
        MergeResult {
            success: true,
            merged_metadata: Some(MergedMetadata {
                source_ids: vec![source.id.clone(), target.id.clone()],
                strategy: candidate.strategy,
                merge_type: candidate.merge_type,
                language: source.language.clone().or_else(|| target.language.clone()),
                tags,
                line_count: merged.lines().count(),
                validated: warnings.is_empty(),
            }),
            merged_content: Some(merged),
            applied_resolutions,
            warnings,
        }
    }

    /// Brace balance and use of every imported name
    fn validate(&self, merged: &str) -> Vec<String> {
        let mut warnings = Vec::new();
        let (open, close) = text::count_braces(merged);
        if open != close {
            warnings.push(format!("Unbalanced braces after merge ({} open, {} closed)", open, close));
        }
        for name in self.extractor().imported_names(merged) {
            if text::word_occurrences(merged, &name) <= 1 {
                warnings.push(format!("Imported name {} is never used", name));
            }
        }
        warnings
    }

    /// Order the set once, split it into runs of related items and fold each
    /// run into one merged item. Failures are reported per group.
    pub fn batch_merge(&self, items: &[ContentItem]) -> BatchMergeResult {
        let mut result = BatchMergeResult::default();
        if items.is_empty() {
            return result;
        }

        let sequence = self.sequences.analyze_sequence(items);
        let ordered: Vec<(&ContentItem, SequencePatternType)> = sequence
            .items
            .iter()
            .filter_map(|s| items.iter().find(|i| i.id == s.item_id).map(|i| (i, s.pattern_type)))
            .collect();

        let mut groups: Vec<Vec<&ContentItem>> = Vec::new();
        let mut previous: Option<(&ContentItem, SequencePatternType)> = None;
        for &(item, pattern_type) in &ordered {
            let split = match previous {
                None => true,
                Some((prev, prev_type)) => {
                    let similarity = self.similarity.calculate_similarity(&prev.text, &item.text);
                    similarity.score <= BATCH_SPLIT_SIMILARITY && prev_type != pattern_type
                }
            };
            if split {
                groups.push(Vec::new());
            }
            if let Some(group) = groups.last_mut() {
                group.push(item);
            }
            previous = Some((item, pattern_type));
        }

        for group in groups {
            let item_ids: Vec<_> = group.iter().map(|i| i.id.clone()).collect();
            if group.len() < 2 {
                result.unmerged.push(UnmergedGroup {
                    item_ids,
                    reason: "No related items to merge with".to_string(),
                });
                continue;
            }
            match self.fold(&group) {
                Ok(mut merged) => {
                    if let Some(metadata) = merged.merged_metadata.as_mut() {
                        metadata.source_ids = item_ids.clone();
                    }
                    result.merged.push(MergedGroup { item_ids, result: merged });
                }
                Err(reason) => {
                    warn!("Batch merge step failed: {}", reason);
                    result.unmerged.push(UnmergedGroup { item_ids, reason });
                }
            }
        }

        info!(
            "Batch merge of {} items: {} merged groups, {} unmerged",
            items.len(),
            result.merged.len(),
            result.unmerged.len()
        );
        result
    }

    /// Left fold of an ordered group through single-pair merges
    fn fold(&self, group: &[&ContentItem]) -> Result<MergeResult, String> {
        let mut acc: ContentItem = group[0].clone();
        let mut last: Option<MergeResult> = None;

        for &next in &group[1..] {
            let candidate = self
                .best_candidate(&acc, next)
                .unwrap_or_else(|| fallback_candidate(&acc, next));
            let merged = self.execute_merge(&acc, next, &candidate, &MergeOptions::default());
            if !merged.success {
                return Err(format!("Could not merge {}: {}", next.id, merged.warnings.join("; ")));
            }

            let content = merged.merged_content.clone().unwrap_or_default();
            let tags = merged
                .merged_metadata
                .as_ref()
                .map(|m| m.tags.clone())
                .unwrap_or_default();
            acc = ContentItem {
                text: content,
                timestamp: acc.timestamp.max(next.timestamp),
                language: acc.language.clone().or_else(|| next.language.clone()),
                tags,
                ..acc
            };
            last = Some(merged);
        }
        last.ok_or_else(|| "No related items to merge with".to_string())
    }
}

/// Stand-in when no strategy qualifies for two neighbours in a batch run.
/// Executes as a continuation, so the detector still decides which text
/// comes first.
fn fallback_candidate(source: &ContentItem, target: &ContentItem) -> MergeCandidate {
    MergeCandidate {
        source_id: source.id.clone(),
        target_id: target.id.clone(),
        merge_type: MergeType::Append,
        strategy: MergeStrategy::SequenceContinuation,
        confidence: 0.0,
        reason: "Adjacent in sequence order".to_string(),
        conflicts: Vec::new(),
        preview: String::new(),
    }
}

fn declared(extractor: &SignatureExtractor, text: &str) -> HashSet<String> {
    extractor
        .functions(text)
        .into_iter()
        .chain(extractor.classes(text))
        .collect()
}

fn join_texts(first: &str, second: &str) -> String {
    format!("{}\n{}", first.trim_end(), second.trim_start_matches('\n'))
}

/// Split lines into chunks that each start at an unindented line
fn top_level_chunks(lines: &[&str]) -> Vec<String> {
    let mut chunks: Vec<Vec<&str>> = Vec::new();
    for &line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let starts_chunk = text::leading_width(line) == 0 && !text::is_punctuation_only(line);
        match chunks.last_mut() {
            Some(chunk) if !starts_chunk => chunk.push(line),
            _ => chunks.push(vec![line]),
        }
    }
    chunks.into_iter().map(|c| c.join("\n")).collect()
}
