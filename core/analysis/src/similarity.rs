//! Four-signal similarity between two texts.
//!
//! score = 0.35 semantic + 0.25 structural + 0.25 lexical + 0.15 contextual
//!
//! Every sub-score is built from undirected set or sequence measures, so
//! `compare(a, b)` and `compare(b, a)` produce identical results.

use code_organizer_schemas::{
    ContentItem, ContentSignature, SimilarItem, SimilarityBreakdown, SimilarityCategory,
    SimilarityResult, StructuralFingerprint,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{Catalog, UNKNOWN_LANGUAGE};
use crate::signature::SignatureExtractor;
use crate::text;

pub const SEMANTIC_WEIGHT: f64 = 0.35;
pub const STRUCTURAL_WEIGHT: f64 = 0.25;
pub const LEXICAL_WEIGHT: f64 = 0.25;
pub const CONTEXTUAL_WEIGHT: f64 = 0.15;

/// Default cut-off for corpus searches; scores at or below are dropped
pub const DEFAULT_SEARCH_THRESHOLD: f64 = 0.3;

pub const SHINGLE_SIZE: usize = 3;

/// Reason thresholds (explanatory only, never fed back into the score)
const SEMANTIC_REASON: f64 = 0.5;
const STRUCTURAL_REASON: f64 = 0.6;
const LEXICAL_REASON: f64 = 0.5;
const CONTEXTUAL_REASON: f64 = 0.5;
const MAX_SHARED_NAMES: usize = 5;

/// Cross-language affinity for structurally related languages
const LANGUAGE_AFFINITY: &[(&str, &str, f64)] = &[
    ("javascript", "typescript", 0.8),
    ("c", "cpp", 0.7),
    ("java", "kotlin", 0.6),
    ("java", "csharp", 0.5),
    ("cpp", "csharp", 0.4),
    ("css", "html", 0.3),
];

/// Text plus everything the comparison needs, computed once per call
#[derive(Debug, Clone)]
pub struct TextProfile {
    raw: String,
    pub normalized: String,
    pub signature: ContentSignature,
    shingles: HashSet<String>,
    pattern_set: HashSet<String>,
}

impl TextProfile {
    pub fn is_blank(&self) -> bool {
        self.normalized.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    extractor: SignatureExtractor,
}

impl SimilarityEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            extractor: SignatureExtractor::new(catalog),
        }
    }

    pub fn extractor(&self) -> &SignatureExtractor {
        &self.extractor
    }

    pub fn profile(&self, text: &str) -> TextProfile {
        let signature = self.extractor.extract(text);
        TextProfile {
            raw: text.to_string(),
            normalized: text::normalize_whitespace(text),
            shingles: text::shingles(text, SHINGLE_SIZE),
            pattern_set: signature.code_patterns.iter().cloned().collect(),
            signature,
        }
    }

    pub fn calculate_similarity(&self, a: &str, b: &str) -> SimilarityResult {
        self.compare(&self.profile(a), &self.profile(b))
    }

    /// Identical texts, or non-blank texts equal up to whitespace, short-circuit
    /// to an exact match. Whitespace-only text matches only itself.
    pub fn compare(&self, a: &TextProfile, b: &TextProfile) -> SimilarityResult {
        if !a.raw.is_empty() && a.raw == b.raw {
            return identical();
        }
        if !a.is_blank() && a.normalized == b.normalized {
            return identical();
        }

        let breakdown = SimilarityBreakdown {
            semantic: semantic(&a.signature, &b.signature),
            structural: structural(a, b),
            lexical: text::jaccard(&a.shingles, &b.shingles),
            contextual: contextual(&a.signature, &b.signature),
        };

        let score = (SEMANTIC_WEIGHT * breakdown.semantic
            + STRUCTURAL_WEIGHT * breakdown.structural
            + LEXICAL_WEIGHT * breakdown.lexical
            + CONTEXTUAL_WEIGHT * breakdown.contextual)
            .clamp(0.0, 1.0);

        SimilarityResult {
            score,
            category: SimilarityCategory::from_score(score),
            reasons: reasons(&breakdown, &a.signature, &b.signature),
            confidence: confidence(&breakdown),
            breakdown,
        }
    }

    /// Corpus items scoring above `threshold`, best first (ties by id)
    pub fn find_similar_content<'a, I>(&self, target: &str, candidates: I, threshold: f64) -> Vec<SimilarItem>
    where
        I: IntoIterator<Item = &'a ContentItem>,
    {
        let target = self.profile(target);
        let mut similar: Vec<SimilarItem> = candidates
            .into_iter()
            .filter_map(|item| {
                let similarity = self.compare(&target, &self.profile(&item.text));
                (similarity.score > threshold).then(|| SimilarItem {
                    item_id: item.id.clone(),
                    similarity,
                })
            })
            .collect();

        similar.sort_by(|a, b| {
            b.similarity
                .score
                .total_cmp(&a.similarity.score)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });

        debug!(
            "Similarity search kept {} items above {:.2}",
            similar.len(),
            threshold
        );
        similar
    }
}

fn identical() -> SimilarityResult {
    SimilarityResult {
        score: 1.0,
        category: SimilarityCategory::ExactMatch,
        reasons: vec!["Identical content".to_string()],
        confidence: 1.0,
        breakdown: SimilarityBreakdown {
            semantic: 1.0,
            structural: 1.0,
            lexical: 1.0,
            contextual: 1.0,
        },
    }
}

fn semantic(a: &ContentSignature, b: &ContentSignature) -> f64 {
    let keywords = text::jaccard_strings(&a.keywords, &b.keywords);
    let names = (text::jaccard_strings(&a.functions, &b.functions)
        + text::jaccard_strings(&a.classes, &b.classes))
        / 2.0;
    let imports = text::jaccard_strings(&a.imports, &b.imports);
    0.5 * keywords + 0.3 * names + 0.2 * imports
}

fn structural(a: &TextProfile, b: &TextProfile) -> f64 {
    0.4 * text::jaccard(&a.pattern_set, &b.pattern_set)
        + 0.4 * fingerprint_similarity(&a.signature.fingerprint, &b.signature.fingerprint)
        + 0.2 * language_compatibility(&a.signature.language, &b.signature.language)
}

fn contextual(a: &ContentSignature, b: &ContentSignature) -> f64 {
    0.4 * text::jaccard_strings(&a.variables, &b.variables)
        + 0.4 * text::jaccard_strings(&a.functions, &b.functions)
        + 0.2 * text::jaccard_strings(&a.classes, &b.classes)
}

/// 1.0 on an exact match, otherwise normalized edit distance of the
/// indentation sequences
pub fn fingerprint_similarity(a: &StructuralFingerprint, b: &StructuralFingerprint) -> f64 {
    if a == b {
        return 1.0;
    }
    let longest = a.indentation.len().max(b.indentation.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - text::levenshtein(&a.indentation, &b.indentation) as f64 / longest as f64
}

/// Same language 1.0, known pairs from the affinity table, otherwise 0.
/// Undetected text carries no language evidence, so two `unknown` sides
/// score 0 rather than counting as the same language.
pub fn language_compatibility(a: &str, b: &str) -> f64 {
    if a == UNKNOWN_LANGUAGE || b == UNKNOWN_LANGUAGE {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    LANGUAGE_AFFINITY
        .iter()
        .find(|(x, y, _)| (*x == a && *y == b) || (*x == b && *y == a))
        .map_or(0.0, |(_, _, affinity)| *affinity)
}

/// 1 - standard deviation of the four sub-scores
fn confidence(breakdown: &SimilarityBreakdown) -> f64 {
    let values = breakdown.values();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (1.0 - variance.sqrt()).clamp(0.0, 1.0)
}

fn reasons(breakdown: &SimilarityBreakdown, a: &ContentSignature, b: &ContentSignature) -> Vec<String> {
    let mut reasons = Vec::new();

    if breakdown.semantic > SEMANTIC_REASON {
        reasons.push("Similar keywords and identifiers".to_string());
    }
    if breakdown.structural > STRUCTURAL_REASON {
        reasons.push("Similar code structure".to_string());
    }
    if breakdown.lexical > LEXICAL_REASON {
        reasons.push("High textual overlap".to_string());
    }
    if breakdown.contextual > CONTEXTUAL_REASON {
        reasons.push("Shared variables and functions".to_string());
    }
    if a.language == b.language && a.language != UNKNOWN_LANGUAGE {
        reasons.push(format!("Same language: {}", a.language));
    }

    let shared_functions = shared(&a.functions, &b.functions);
    if !shared_functions.is_empty() {
        reasons.push(format!("Shared functions: {}", shared_functions.join(", ")));
    }
    let shared_imports = shared(&a.imports, &b.imports);
    if !shared_imports.is_empty() {
        reasons.push(format!("Shared imports: {}", shared_imports.join(", ")));
    }

    reasons
}

/// Sorted intersection so the reason text does not depend on argument order
fn shared<'a>(a: &'a [String], b: &[String]) -> Vec<&'a str> {
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let mut common: Vec<&str> = a
        .iter()
        .map(String::as_str)
        .filter(|name| b.contains(name))
        .collect();
    common.sort_unstable();
    common.dedup();
    common.truncate(MAX_SHARED_NAMES);
    common
}
