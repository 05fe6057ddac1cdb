//! Sequence pattern detection and insertion ordering.
//!
//! Detector weights, per signal:
//! - continuation: unbalanced braces 0.3, open function 0.4, open final statement 0.2,
//!   continuation marker 0.5, unused import 0.3
//! - dependency: dependency defined elsewhere 0.6, external type reference 0.4, setup vocabulary 0.3
//! - evolution: version marker 0.4, improvement 0.3, optimization 0.3, above-average complexity 0.2
//! - refactor: refactor vocabulary 0.5, indentation variants 0.4, naming change 0.3, section comments 0.2
//! - feature addition: new functionality 0.4, feature flag 0.3, endpoint 0.4, component 0.3

use chrono::{DateTime, Utc};
use code_organizer_schemas::{
    CodeSequence, ContentItem, ContentSignature, ItemId, SequenceAnalysis, SequencePattern,
    SequencePatternType, SequencedItem, Timeline,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::Catalog;
use crate::signature::{complexity, SignatureExtractor};
use crate::text::{self, NamingConvention};

pub const CONTINUATION_UNBALANCED_BRACES: f64 = 0.3;
pub const CONTINUATION_OPEN_FUNCTION: f64 = 0.4;
pub const CONTINUATION_OPEN_STATEMENT: f64 = 0.2;
pub const CONTINUATION_MARKER: f64 = 0.5;
pub const CONTINUATION_UNUSED_IMPORT: f64 = 0.3;

pub const DEPENDENCY_DEFINED_ELSEWHERE: f64 = 0.6;
pub const DEPENDENCY_EXTERNAL_TYPE: f64 = 0.4;
pub const DEPENDENCY_SETUP: f64 = 0.3;

pub const EVOLUTION_VERSION: f64 = 0.4;
pub const EVOLUTION_IMPROVEMENT: f64 = 0.3;
pub const EVOLUTION_OPTIMIZATION: f64 = 0.3;
pub const EVOLUTION_COMPLEXITY: f64 = 0.2;
/// Complexity above this multiple of the set average counts as grown
pub const EVOLUTION_COMPLEXITY_RATIO: f64 = 1.2;

pub const REFACTOR_VOCABULARY: f64 = 0.5;
pub const REFACTOR_INDENT_VARIANTS: f64 = 0.4;
pub const REFACTOR_NAMING: f64 = 0.3;
pub const REFACTOR_SECTIONS: f64 = 0.2;

pub const FEATURE_NEW_FUNCTIONALITY: f64 = 0.4;
pub const FEATURE_FLAG: f64 = 0.3;
pub const FEATURE_ENDPOINT: f64 = 0.4;
pub const FEATURE_COMPONENT: f64 = 0.3;

/// Sets spanning less than this many seconds are always linear
pub const LINEAR_SPAN_SECS: i64 = 3600;
pub const BRANCHED_MIN_TYPES: usize = 3;
pub const CONVERGENT_EVOLUTION_SHARE: f64 = 0.6;

/// Trailing tokens that leave a statement open
const OPEN_ENDINGS: &[&str] = &[",", "(", "[", "{", "+", "-", "*", "/", "=", "&&", "||", ".", "\\", "=>"];

/// Per-item facts computed once per call and shared by all detectors
struct ItemFacts<'a> {
    id: &'a ItemId,
    timestamp: DateTime<Utc>,
    text: &'a str,
    signature: ContentSignature,
    declared: HashSet<String>,
    calls: HashSet<String>,
    imported: Vec<String>,
    types: Vec<String>,
    open_braces: usize,
    close_braces: usize,
    complexity: f64,
    indent_unit: Option<usize>,
    naming: Option<NamingConvention>,
}

impl ItemFacts<'_> {
    fn left_open(&self) -> bool {
        self.open_braces > self.close_braces
    }
}

#[derive(Debug, Default)]
struct Detection {
    confidence: f64,
    evidence: Vec<String>,
    order_hint: usize,
}

impl Detection {
    fn signal(&mut self, weight: f64, evidence: impl Into<String>) {
        self.confidence += weight;
        self.evidence.push(evidence.into());
    }

    fn into_pattern(self, pattern_type: SequencePatternType) -> SequencePattern {
        SequencePattern {
            pattern_type,
            confidence: self.confidence.min(1.0),
            evidence: self.evidence,
            order_hint: self.order_hint,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SequenceDetector {
    extractor: SignatureExtractor,
}

impl SequenceDetector {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            extractor: SignatureExtractor::new(catalog),
        }
    }

    fn catalog(&self) -> &Catalog {
        self.extractor.catalog()
    }

    /// Pattern of `item` relative to `related`, plus the ordering of the whole set
    pub fn analyze(&self, item: &ContentItem, related: &[ContentItem]) -> SequenceAnalysis {
        let mut set: Vec<&ContentItem> = related.iter().filter(|r| r.id != item.id).collect();
        set.push(item);

        let facts = self.facts(&set);
        let subject = facts.len() - 1;
        let pattern = self.detect(subject, &facts);

        debug!(
            "Sequence pattern for {}: {} ({:.2})",
            item.id,
            pattern.pattern_type.as_str(),
            pattern.confidence
        );

        SequenceAnalysis {
            pattern,
            sequence: self.order(&facts),
        }
    }

    /// Strongest pattern of `item` among `related`
    pub fn detect_pattern(&self, item: &ContentItem, related: &[ContentItem]) -> SequencePattern {
        self.analyze(item, related).pattern
    }

    /// Order a whole set and aggregate its patterns
    pub fn analyze_sequence(&self, items: &[ContentItem]) -> CodeSequence {
        let set: Vec<&ContentItem> = items.iter().collect();
        self.order(&self.facts(&set))
    }

    fn facts<'a>(&self, items: &[&'a ContentItem]) -> Vec<ItemFacts<'a>> {
        items
            .iter()
            .map(|item| {
                let signature = self.extractor.extract(&item.text);
                let declared: HashSet<String> = signature
                    .functions
                    .iter()
                    .chain(signature.classes.iter())
                    .cloned()
                    .collect();
                let (open_braces, close_braces) = text::count_braces(&item.text);
                ItemFacts {
                    id: &item.id,
                    timestamp: item.timestamp,
                    text: &item.text,
                    complexity: complexity(&signature) as f64,
                    calls: self.extractor.calls(&item.text).into_iter().collect(),
                    imported: self.extractor.imported_names(&item.text),
                    types: self.extractor.type_references(&item.text),
                    indent_unit: text::indent_unit(text::non_blank_lines(&item.text)),
                    naming: text::naming_convention(&signature.variables),
                    declared,
                    signature,
                    open_braces,
                    close_braces,
                }
            })
            .collect()
    }

    /// Run every detector on `facts[subject]`; the highest confidence wins and
    /// ties keep the earlier detector
    fn detect(&self, subject: usize, facts: &[ItemFacts]) -> SequencePattern {
        let mut best: Option<SequencePattern> = None;
        for pattern_type in SequencePatternType::ALL {
            let detection = match pattern_type {
                SequencePatternType::Continuation => self.continuation(subject, facts),
                SequencePatternType::Dependency => self.dependency(subject, facts),
                SequencePatternType::Evolution => self.evolution(subject, facts),
                SequencePatternType::Refactor => self.refactor(subject, facts),
                SequencePatternType::FeatureAddition => self.feature_addition(subject, facts),
            };
            let pattern = detection.into_pattern(pattern_type);
            if best.as_ref().map_or(true, |b| pattern.confidence > b.confidence) {
                best = Some(pattern);
            }
        }
        best.unwrap_or(SequencePattern {
            pattern_type: SequencePatternType::Continuation,
            confidence: 0.0,
            evidence: Vec::new(),
            order_hint: 0,
        })
    }

    fn continuation(&self, subject: usize, facts: &[ItemFacts]) -> Detection {
        let item = &facts[subject];
        let mut d = Detection::default();

        if item.open_braces != item.close_braces {
            d.signal(
                CONTINUATION_UNBALANCED_BRACES,
                format!("Unbalanced braces ({} open, {} closed)", item.open_braces, item.close_braces),
            );
        }
        if item.left_open() && !item.signature.functions.is_empty() {
            d.signal(CONTINUATION_OPEN_FUNCTION, "Function body is not closed");
        }
        if let Some(last) = text::non_blank_lines(item.text).last() {
            let last = last.trim_end();
            if OPEN_ENDINGS.iter().any(|e| last.ends_with(e)) {
                d.signal(CONTINUATION_OPEN_STATEMENT, "Final statement is not terminated");
            }
        }
        if self.catalog().vocabulary.continuation_marker.is_match(item.text) {
            d.signal(CONTINUATION_MARKER, "Explicit continuation marker");
        }
        if let Some(unused) = item
            .imported
            .iter()
            .find(|name| text::word_occurrences(item.text, name) <= 1)
        {
            d.signal(CONTINUATION_UNUSED_IMPORT, format!("Import {} is not used yet", unused));
        }

        if others(subject, facts).any(|o| o.left_open()) {
            d.order_hint = 1;
        }
        d
    }

    fn dependency(&self, subject: usize, facts: &[ItemFacts]) -> Detection {
        let item = &facts[subject];
        let mut d = Detection::default();

        let declared_elsewhere: HashSet<&String> = others(subject, facts).flat_map(|o| o.declared.iter()).collect();
        let mut uses: Vec<&String> = item
            .calls
            .iter()
            .filter(|c| !item.declared.contains(*c) && declared_elsewhere.contains(c))
            .collect();
        uses.sort();

        let called_elsewhere: HashSet<&String> = others(subject, facts)
            .flat_map(|o| o.calls.iter().filter(move |c| !o.declared.contains(*c)))
            .collect();
        let mut provides: Vec<&String> = item.declared.iter().filter(|n| called_elsewhere.contains(n)).collect();
        provides.sort();

        if let Some(name) = uses.first() {
            d.signal(DEPENDENCY_DEFINED_ELSEWHERE, format!("Uses {} defined in another item", name));
        } else if let Some(name) = provides.first() {
            d.signal(DEPENDENCY_DEFINED_ELSEWHERE, format!("Defines {} used by another item", name));
        }

        if let Some(external) = item.types.iter().find(|t| !item.signature.classes.contains(*t)) {
            d.signal(DEPENDENCY_EXTERNAL_TYPE, format!("References external type {}", external));
        }
        if self.catalog().vocabulary.setup.is_match(item.text) {
            d.signal(DEPENDENCY_SETUP, "Setup or configuration code");
        }

        d.order_hint = uses.len();
        d
    }

    fn evolution(&self, subject: usize, facts: &[ItemFacts]) -> Detection {
        let item = &facts[subject];
        let vocab = &self.catalog().vocabulary;
        let mut d = Detection::default();

        if vocab.version_marker.is_match(item.text) {
            d.signal(EVOLUTION_VERSION, "Version marker");
        }
        if vocab.improvement.is_match(item.text) {
            d.signal(EVOLUTION_IMPROVEMENT, "Improvement vocabulary");
        }
        if vocab.optimization.is_match(item.text) {
            d.signal(EVOLUTION_OPTIMIZATION, "Optimization vocabulary");
        }

        if facts.len() > 1 {
            let average = facts.iter().map(|f| f.complexity).sum::<f64>() / facts.len() as f64;
            if item.complexity > EVOLUTION_COMPLEXITY_RATIO * average {
                d.signal(EVOLUTION_COMPLEXITY, "More complex than related items");
            }
            if others(subject, facts).any(|o| o.complexity > average) {
                d.order_hint = 1;
            }
        }
        d
    }

    fn refactor(&self, subject: usize, facts: &[ItemFacts]) -> Detection {
        let item = &facts[subject];
        let vocab = &self.catalog().vocabulary;
        let mut d = Detection::default();

        if vocab.refactor.is_match(item.text) {
            d.signal(REFACTOR_VOCABULARY, "Refactor vocabulary");
            d.order_hint = 1;
        }

        let units: HashSet<usize> = facts.iter().filter_map(|f| f.indent_unit).collect();
        if units.len() > 1 {
            d.signal(REFACTOR_INDENT_VARIANTS, format!("{} indentation variants", units.len()));
        }

        if let Some(convention) = item.naming {
            if others(subject, facts).any(|o| o.naming.is_some_and(|n| n != convention)) {
                d.signal(REFACTOR_NAMING, format!("Renamed to {}", convention.as_str()));
            }
        }
        if vocab.section_comment.is_match(item.text) {
            d.signal(REFACTOR_SECTIONS, "Structural section comments");
        }
        d
    }

    fn feature_addition(&self, subject: usize, facts: &[ItemFacts]) -> Detection {
        let item = &facts[subject];
        let vocab = &self.catalog().vocabulary;
        let mut d = Detection::default();

        let signals = [
            (&vocab.new_functionality, FEATURE_NEW_FUNCTIONALITY, "New functionality vocabulary"),
            (&vocab.feature_flag, FEATURE_FLAG, "Feature flag or toggle"),
            (&vocab.endpoint, FEATURE_ENDPOINT, "New endpoint"),
            (&vocab.component, FEATURE_COMPONENT, "New component"),
        ];
        for (pattern, weight, evidence) in signals {
            if pattern.is_match(item.text) {
                d.signal(weight, evidence);
                d.order_hint = 1;
            }
        }
        d
    }

    /// Sort by order hint, then timestamp, then id, and aggregate
    fn order(&self, facts: &[ItemFacts]) -> CodeSequence {
        let patterns: Vec<SequencePattern> = (0..facts.len()).map(|i| self.detect(i, facts)).collect();

        let mut indices: Vec<usize> = (0..facts.len()).collect();
        indices.sort_by(|&a, &b| {
            patterns[a]
                .order_hint
                .cmp(&patterns[b].order_hint)
                .then(facts[a].timestamp.cmp(&facts[b].timestamp))
                .then_with(|| facts[a].id.cmp(facts[b].id))
        });

        let items: Vec<SequencedItem> = indices
            .iter()
            .enumerate()
            .map(|(position, &i)| SequencedItem {
                item_id: facts[i].id.clone(),
                position,
                pattern_type: patterns[i].pattern_type,
                confidence: patterns[i].confidence,
            })
            .collect();

        let ordered: Vec<&SequencePattern> = indices.iter().map(|&i| &patterns[i]).collect();
        let timeline = timeline(facts, &patterns);

        CodeSequence {
            items,
            pattern: aggregate(&ordered),
            timeline,
        }
    }
}

fn others<'f, 'a>(subject: usize, facts: &'f [ItemFacts<'a>]) -> impl Iterator<Item = &'f ItemFacts<'a>> {
    facts
        .iter()
        .enumerate()
        .filter(move |(i, _)| *i != subject)
        .map(|(_, f)| f)
}

/// Majority type (ties by enumeration order), mean confidence, evidence union
fn aggregate(patterns: &[&SequencePattern]) -> SequencePattern {
    let majority = SequencePatternType::ALL
        .into_iter()
        .map(|t| (t, patterns.iter().filter(|p| p.pattern_type == t).count()))
        .fold((SequencePatternType::Continuation, 0), |best, (t, count)| {
            if count > best.1 {
                (t, count)
            } else {
                best
            }
        })
        .0;

    let confidence = if patterns.is_empty() {
        0.0
    } else {
        patterns.iter().map(|p| p.confidence).sum::<f64>() / patterns.len() as f64
    };

    let mut evidence: Vec<String> = Vec::new();
    for e in patterns.iter().flat_map(|p| p.evidence.iter()) {
        if !evidence.contains(e) {
            evidence.push(e.clone());
        }
    }

    SequencePattern {
        pattern_type: majority,
        confidence,
        evidence,
        order_hint: 0,
    }
}

fn timeline(facts: &[ItemFacts], patterns: &[SequencePattern]) -> Timeline {
    let (Some(first), Some(last)) = (
        facts.iter().map(|f| f.timestamp).min(),
        facts.iter().map(|f| f.timestamp).max(),
    ) else {
        return Timeline::Linear;
    };

    if (last - first).num_seconds() < LINEAR_SPAN_SECS {
        return Timeline::Linear;
    }

    let distinct: HashSet<SequencePatternType> = patterns.iter().map(|p| p.pattern_type).collect();
    if distinct.len() >= BRANCHED_MIN_TYPES {
        return Timeline::Branched;
    }

    let evolution = patterns
        .iter()
        .filter(|p| p.pattern_type == SequencePatternType::Evolution)
        .count();
    if evolution as f64 / patterns.len() as f64 > CONVERGENT_EVOLUTION_SHARE {
        return Timeline::Convergent;
    }

    Timeline::Linear
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn detector() -> SequenceDetector {
        SequenceDetector::new(Arc::new(Catalog::new().unwrap()))
    }

    #[test]
    fn test_dependency_between_declaration_and_call() {
        let detector = detector();
        let now = Utc::now();
        let decl = ContentItem::snippet("decl", "function foo(){}", now - Duration::minutes(5));
        let call = ContentItem::snippet("call", "foo()", now);

        let pattern = detector.detect_pattern(&call, &[decl.clone()]);
        assert_eq!(pattern.pattern_type, SequencePatternType::Dependency);
        assert!(pattern.confidence >= 0.6);

        let reverse = detector.detect_pattern(&decl, &[call]);
        assert_eq!(reverse.pattern_type, SequencePatternType::Dependency);
        assert!(reverse.confidence >= 0.6);
    }

    #[test]
    fn test_open_brace_ordered_before_close() {
        let detector = detector();
        let now = Utc::now();
        let head = ContentItem::snippet("head", "function foo() {\n  let x = 1;", now);
        // The closing half was saved first but still sorts after the opener
        let tail = ContentItem::snippet("tail", "  return x;\n}", now - Duration::minutes(2));

        let sequence = detector.analyze_sequence(&[tail, head]);
        let ids: Vec<&str> = sequence.ordered_ids().iter().map(|id| id.0.as_str()).collect();
        assert_eq!(ids, vec!["head", "tail"]);
        assert_eq!(sequence.items[0].position, 0);
        assert_eq!(sequence.items[1].position, 1);
        assert_eq!(sequence.items[0].pattern_type, SequencePatternType::Continuation);
    }

    #[test]
    fn test_continuation_marker() {
        let detector = detector();
        let item = ContentItem::snippet("a", "const rows = load();\n// TODO: more filters", Utc::now());
        let pattern = detector.detect_pattern(&item, &[]);
        assert_eq!(pattern.pattern_type, SequencePatternType::Continuation);
        assert!(pattern.confidence >= CONTINUATION_MARKER);
    }

    #[test]
    fn test_evolution_vocabulary() {
        let detector = detector();
        let item = ContentItem::snippet(
            "a",
            "// version 2.0: improved and optimized lookup\nconst cache = new Map();",
            Utc::now(),
        );
        let pattern = detector.detect_pattern(&item, &[]);
        assert_eq!(pattern.pattern_type, SequencePatternType::Evolution);
        assert!((pattern.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_is_capped() {
        let detector = detector();
        let item = ContentItem::snippet(
            "a",
            "// new feature: add endpoint behind feature flag\napp.get('/users', renderComponent);",
            Utc::now(),
        );
        let pattern = detector.detect_pattern(&item, &[]);
        assert_eq!(pattern.pattern_type, SequencePatternType::FeatureAddition);
        assert!(pattern.confidence <= 1.0);
    }

    #[test]
    fn test_empty_set() {
        let sequence = detector().analyze_sequence(&[]);
        assert!(sequence.items.is_empty());
        assert_eq!(sequence.timeline, Timeline::Linear);
        assert_eq!(sequence.pattern.confidence, 0.0);
    }

    #[test]
    fn test_timeline_short_span_is_linear() {
        let detector = detector();
        let now = Utc::now();
        let items = vec![
            ContentItem::snippet("a", "// version 2 improved", now),
            ContentItem::snippet("b", "// refactored helpers", now - Duration::minutes(10)),
            ContentItem::snippet("c", "foo(", now - Duration::minutes(20)),
        ];
        assert_eq!(detector.analyze_sequence(&items).timeline, Timeline::Linear);
    }

    #[test]
    fn test_timeline_branched_and_convergent() {
        let detector = detector();
        let now = Utc::now();
        let branched = vec![
            ContentItem::snippet("a", "// version 2 improved", now),
            ContentItem::snippet("b", "// refactored helpers", now - Duration::hours(3)),
            ContentItem::snippet("c", "foo(", now - Duration::hours(6)),
        ];
        assert_eq!(detector.analyze_sequence(&branched).timeline, Timeline::Branched);

        let convergent = vec![
            ContentItem::snippet("a", "// version 3 optimized", now),
            ContentItem::snippet("b", "// version 2 improved", now - Duration::hours(3)),
        ];
        assert_eq!(detector.analyze_sequence(&convergent).timeline, Timeline::Convergent);
    }

    #[test]
    fn test_aggregate_majority_and_mean() {
        let p = |t, c| SequencePattern {
            pattern_type: t,
            confidence: c,
            evidence: vec!["x".to_string()],
            order_hint: 0,
        };
        let a = p(SequencePatternType::Refactor, 0.5);
        let b = p(SequencePatternType::Dependency, 0.7);
        let c = p(SequencePatternType::Refactor, 0.3);
        let agg = aggregate(&[&a, &b, &c]);
        assert_eq!(agg.pattern_type, SequencePatternType::Refactor);
        assert!((agg.confidence - 0.5).abs() < 1e-9);
        assert_eq!(agg.evidence, vec!["x"]);

        let tie = aggregate(&[&b, &a]);
        assert_eq!(tie.pattern_type, SequencePatternType::Dependency);
    }
}
