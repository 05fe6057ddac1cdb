//! Corpus grouping by five independent strategies, then overlap merging,
//! filtering and ranking.
//!
//! Strategy weights (mean 0.2): semantic 0.30, temporal 0.20, project 0.25,
//! dependency 0.15, topic 0.10. A group's confidence is its base score times
//! weight/mean, capped at 1.

use chrono::{DateTime, Duration, Utc};
use code_organizer_analysis::{
    text, Catalog, Classifier, SimilarityEngine, TextProfile, GENERAL_TOPIC, UNKNOWN_LANGUAGE,
};
use code_organizer_schemas::{
    generate_group_id, ActionType, ContentGroup, ContentItem, CorpusSnapshot, GroupId, GroupMember, ItemId,
    GroupRelationship, GroupType, GroupingResult, GroupingStrategy, RelationshipType, StrategyReport,
    SuggestedAction,
};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

pub const SEMANTIC_WEIGHT: f64 = 0.30;
pub const TEMPORAL_WEIGHT: f64 = 0.20;
pub const PROJECT_WEIGHT: f64 = 0.25;
pub const DEPENDENCY_WEIGHT: f64 = 0.15;
pub const TOPIC_WEIGHT: f64 = 0.10;
const MEAN_WEIGHT: f64 = 0.2;

/// Pairwise similarity required to join a semantic cluster
pub const SEMANTIC_CLUSTER_SIMILARITY: f64 = 0.6;
/// Gap that closes a temporal window
pub const SESSION_GAP_MINUTES: i64 = 60;
pub const SESSION_CONFIDENCE: f64 = 0.8;
pub const PERIOD_CONFIDENCE: f64 = 0.6;
pub const PROJECT_CONFIDENCE: f64 = 0.8;
pub const DEPENDENCY_CONFIDENCE: f64 = 0.7;

/// Member-set Jaccard above which two groups are combined
pub const OVERLAP_MERGE_RATIO: f64 = 0.3;
pub const MIN_GROUP_CONFIDENCE: f64 = 0.3;
pub const DEFAULT_MAX_GROUPS: usize = 20;
pub const MAX_GROUP_TAGS: usize = 8;
pub const MAX_RELATIONSHIPS: usize = 5;

/// Mean internal similarity above which a merge is suggested
pub const MERGE_ACTION_SIMILARITY: f64 = 0.8;
/// Groups larger than this get a split suggestion
pub const SPLIT_ACTION_SIZE: usize = 8;
pub const ARCHIVE_AGE_DAYS: i64 = 90;

pub const DEPENDS_ON_STRENGTH: f64 = 0.8;
pub const IMPLEMENTS_STRENGTH: f64 = 0.7;
pub const REFACTORS_STRENGTH: f64 = 0.6;
pub const SUPERSEDES_STRENGTH: f64 = 0.7;

type Strategy = fn(&GroupingEngine, &Context) -> Vec<Draft>;

const STRATEGIES: [(GroupingStrategy, f64, Strategy); 5] = [
    (GroupingStrategy::Semantic, SEMANTIC_WEIGHT, GroupingEngine::semantic_groups),
    (GroupingStrategy::Temporal, TEMPORAL_WEIGHT, GroupingEngine::temporal_groups),
    (GroupingStrategy::Project, PROJECT_WEIGHT, GroupingEngine::project_groups),
    (GroupingStrategy::Dependency, DEPENDENCY_WEIGHT, GroupingEngine::dependency_groups),
    (GroupingStrategy::Topic, TOPIC_WEIGHT, GroupingEngine::topic_groups),
];

/// Per-item facts computed once per call
struct Entry<'a> {
    item: &'a ContentItem,
    profile: TextProfile,
    language: String,
    topic: String,
    topic_confidence: f64,
    declared: HashSet<String>,
    calls: HashSet<String>,
    types: HashSet<String>,
    indicators: Vec<String>,
}

struct Context<'a> {
    entries: Vec<Entry<'a>>,
    /// Row-major pairwise similarity scores
    similarity: Vec<f64>,
}

impl Context<'_> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn similarity(&self, i: usize, j: usize) -> f64 {
        self.similarity[i * self.len() + j]
    }

    fn mean_similarity(&self, members: &[usize]) -> f64 {
        let mut total = 0.0;
        let mut pairs = 0usize;
        for (k, &i) in members.iter().enumerate() {
            for &j in &members[k + 1..] {
                total += self.similarity(i, j);
                pairs += 1;
            }
        }
        if pairs == 0 {
            0.0
        } else {
            total / pairs as f64
        }
    }
}

/// A group before ids, relationships and actions are attached
#[derive(Debug, Clone)]
struct Draft {
    title: String,
    confidence: f64,
    /// Entry index and relevance
    members: Vec<(usize, f64)>,
    tags: Vec<String>,
    strategies: Vec<GroupingStrategy>,
    merged_from: usize,
}

impl Draft {
    fn member_set(&self) -> HashSet<usize> {
        self.members.iter().map(|(i, _)| *i).collect()
    }

    fn indices(&self) -> Vec<usize> {
        self.members.iter().map(|(i, _)| *i).collect()
    }
}

#[derive(Debug, Clone)]
pub struct GroupingEngine {
    catalog: Arc<Catalog>,
    similarity: SimilarityEngine,
    classifier: Classifier,
    max_groups: usize,
}

impl GroupingEngine {
    pub fn new(catalog: Arc<Catalog>, max_groups: usize) -> Self {
        Self {
            similarity: SimilarityEngine::new(catalog.clone()),
            classifier: Classifier::new(catalog.clone()),
            catalog,
            max_groups,
        }
    }

    pub fn group_content(&self, corpus: &CorpusSnapshot) -> GroupingResult {
        let (context, skipped) = self.context(corpus);

        let mut drafts = Vec::new();
        let mut strategy_reports = Vec::new();
        for (strategy, weight, run) in STRATEGIES {
            let mut found = run(self, &context);
            for draft in &mut found {
                draft.confidence = weighted_confidence(draft.confidence, weight);
                draft.strategies = vec![strategy];
                draft.tags = self.tags(&context, &draft.indices());
            }
            debug!("{} strategy found {} groups", strategy.as_str(), found.len());
            strategy_reports.push(StrategyReport {
                strategy,
                groups_found: found.len(),
            });
            drafts.extend(found);
        }

        let mut drafts = merge_overlapping(drafts);
        drafts.retain(|d| d.confidence > MIN_GROUP_CONFIDENCE && d.members.len() > 1);
        drafts.sort_by(|a, b| {
            let score_a = a.confidence * a.members.len() as f64;
            let score_b = b.confidence * b.members.len() as f64;
            score_b
                .partial_cmp(&score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.title.cmp(&b.title))
        });
        drafts.truncate(self.max_groups);

        let newest = corpus.items().map(|i| i.timestamp).max();
        let ids: Vec<GroupId> = drafts.iter().map(|_| generate_group_id()).collect();
        let groups: Vec<ContentGroup> = drafts
            .iter()
            .enumerate()
            .map(|(k, draft)| self.finish(&context, &drafts, &ids, k, draft, newest))
            .collect();

        info!(
            "Grouped {} items into {} groups ({} skipped)",
            context.len(),
            groups.len(),
            skipped.len()
        );
        GroupingResult {
            groups,
            strategy_reports,
            skipped,
        }
    }

    fn context<'a>(&self, corpus: &'a CorpusSnapshot) -> (Context<'a>, Vec<ItemId>) {
        let extractor = self.similarity.extractor();
        let mut skipped = Vec::new();
        let mut entries = Vec::new();

        for item in corpus.items() {
            if item.text.trim().is_empty() {
                skipped.push(item.id.clone());
                continue;
            }
            let profile = self.similarity.profile(&item.text);
            let topic = self.classifier.classify_topic(&item.text);
            let declared = extractor
                .functions(&item.text)
                .into_iter()
                .chain(extractor.classes(&item.text))
                .collect();
            entries.push(Entry {
                item,
                language: item
                    .language
                    .clone()
                    .unwrap_or_else(|| profile.signature.language.clone()),
                profile,
                topic: topic.topic,
                topic_confidence: topic.confidence,
                declared,
                calls: extractor.calls(&item.text).into_iter().collect(),
                types: extractor.type_references(&item.text).into_iter().collect(),
                indicators: extractor.project_indicators(&item.text),
            });
        }

        let n = entries.len();
        let mut similarity = vec![0.0; n * n];
        for i in 0..n {
            similarity[i * n + i] = 1.0;
            for j in i + 1..n {
                let score = self.similarity.compare(&entries[i].profile, &entries[j].profile).score;
                similarity[i * n + j] = score;
                similarity[j * n + i] = score;
            }
        }

        (Context { entries, similarity }, skipped)
    }

    /// Greedy clustering around each unprocessed seed
    fn semantic_groups(&self, context: &Context) -> Vec<Draft> {
        let mut processed = vec![false; context.len()];
        let mut drafts = Vec::new();

        for seed in 0..context.len() {
            if processed[seed] {
                continue;
            }
            processed[seed] = true;
            let mut members = vec![(seed, 1.0)];
            for other in seed + 1..context.len() {
                let score = context.similarity(seed, other);
                if !processed[other] && score > SEMANTIC_CLUSTER_SIMILARITY {
                    processed[other] = true;
                    members.push((other, score));
                }
            }
            if members.len() < 2 {
                continue;
            }
            let base = members.iter().skip(1).map(|(_, s)| s).sum::<f64>() / (members.len() - 1) as f64;
            let entry = &context.entries[seed];
            drafts.push(draft(format!("Similar {} code", label(&entry.topic, &entry.language)), base, members));
        }
        drafts
    }

    /// Time-sorted windows that close after a one-hour gap
    fn temporal_groups(&self, context: &Context) -> Vec<Draft> {
        let mut order: Vec<usize> = (0..context.len()).collect();
        order.sort_by_key(|&i| (context.entries[i].item.timestamp, context.entries[i].item.id.clone()));

        let gap = Duration::minutes(SESSION_GAP_MINUTES);
        let mut windows: Vec<Vec<usize>> = Vec::new();
        let mut window_end: Option<DateTime<Utc>> = None;
        for i in order {
            let ts = context.entries[i].item.timestamp;
            match (windows.last_mut(), window_end) {
                (Some(window), Some(end)) if ts - end <= gap => window.push(i),
                _ => windows.push(vec![i]),
            }
            window_end = Some(window_end.map_or(ts, |end| end.max(ts)));
        }

        windows
            .into_iter()
            .filter(|w| w.len() > 1)
            .map(|w| {
                let first = context.entries[w[0]].item.timestamp;
                let last = context.entries[w[w.len() - 1]].item.timestamp;
                let (title, base) = if last - first < gap {
                    (format!("Session {}", first.format("%Y-%m-%d %H:%M")), SESSION_CONFIDENCE)
                } else {
                    (format!("Development period from {}", first.format("%Y-%m-%d")), PERIOD_CONFIDENCE)
                };
                draft(title, base, w.into_iter().map(|i| (i, 1.0)).collect())
            })
            .collect()
    }

    /// Items sharing a project indicator
    fn project_groups(&self, context: &Context) -> Vec<Draft> {
        let mut by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, entry) in context.entries.iter().enumerate() {
            for name in &entry.indicators {
                by_name.entry(name.as_str()).or_default().push(i);
            }
        }
        by_name
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(name, members)| {
                draft(
                    format!("Project {}", name),
                    PROJECT_CONFIDENCE,
                    members.into_iter().map(|i| (i, 1.0)).collect(),
                )
            })
            .collect()
    }

    /// Weakly connected components of the call graph
    fn dependency_groups(&self, context: &Context) -> Vec<Draft> {
        let graph = call_graph(context);
        let mut components = UnionFind::<usize>::new(graph.node_count());
        for edge in graph.edge_references() {
            components.union(edge.source().index(), edge.target().index());
        }

        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..context.len() {
            by_root.entry(components.find(i)).or_default().push(i);
        }

        by_root
            .into_values()
            .filter(|members| members.len() > 1)
            .map(|members| {
                let mut names: Vec<&String> = members.iter().flat_map(|&i| &context.entries[i].declared).collect();
                names.sort();
                names.dedup();
                let title = match names.first() {
                    Some(name) => format!("Code connected through {}", name),
                    None => "Connected code".to_string(),
                };
                draft(title, DEPENDENCY_CONFIDENCE, members.into_iter().map(|i| (i, 1.0)).collect())
            })
            .collect()
    }

    /// Buckets by classified topic
    fn topic_groups(&self, context: &Context) -> Vec<Draft> {
        let mut by_topic: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, entry) in context.entries.iter().enumerate() {
            if entry.topic != GENERAL_TOPIC {
                by_topic.entry(entry.topic.as_str()).or_default().push(i);
            }
        }
        by_topic
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(topic, members)| {
                let base =
                    members.iter().map(|&i| context.entries[i].topic_confidence).sum::<f64>() / members.len() as f64;
                let members = members
                    .into_iter()
                    .map(|i| (i, context.entries[i].topic_confidence))
                    .collect();
                draft(format!("{} snippets", topic), base, members)
            })
            .collect()
    }

    /// Most frequent member languages, topics and tags
    fn tags(&self, context: &Context, members: &[usize]) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &i in members {
            let entry = &context.entries[i];
            let mut own: Vec<&str> = entry.item.tags.iter().map(String::as_str).collect();
            if entry.language != UNKNOWN_LANGUAGE {
                own.push(&entry.language);
            }
            if entry.topic != GENERAL_TOPIC {
                own.push(&entry.topic);
            }
            own.sort();
            own.dedup();
            for tag in own {
                *counts.entry(tag).or_default() += 1;
            }
        }
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(MAX_GROUP_TAGS)
            .map(|(t, _)| t.to_string())
            .collect()
    }

    fn finish(
        &self,
        context: &Context,
        drafts: &[Draft],
        ids: &[GroupId],
        k: usize,
        draft: &Draft,
        newest: Option<DateTime<Utc>>,
    ) -> ContentGroup {
        let mut ordered = draft.members.clone();
        ordered.sort_by_key(|(i, _)| (context.entries[*i].item.timestamp, context.entries[*i].item.id.clone()));
        let members: Vec<GroupMember> = ordered
            .iter()
            .enumerate()
            .map(|(position, (i, relevance))| GroupMember {
                item_id: context.entries[*i].item.id.clone(),
                relevance: *relevance,
                suggested_position: position,
            })
            .collect();

        let strategies: Vec<&str> = draft.strategies.iter().map(|s| s.as_str()).collect();
        ContentGroup {
            id: ids[k].clone(),
            title: draft.title.clone(),
            description: format!("{} items grouped by {}", members.len(), strategies.join(", ")),
            group_type: self.group_type(context, draft),
            confidence: draft.confidence,
            relationships: self.relationships(context, drafts, ids, k),
            tags: draft.tags.clone(),
            suggested_actions: self.actions(context, draft, newest),
            strategies: draft.strategies.clone(),
            members,
        }
    }

    fn group_type(&self, context: &Context, draft: &Draft) -> GroupType {
        let vocab = &self.catalog.vocabulary;
        let texts: Vec<&str> = draft.members.iter().map(|(i, _)| context.entries[*i].item.text.as_str()).collect();
        let joined = texts.join("\n");

        if vocab.tutorial.is_match(&joined) {
            GroupType::Tutorial
        } else if vocab.experiment.is_match(&joined) {
            GroupType::Experiment
        } else if vocab.component.is_match(&joined) {
            GroupType::Component
        } else if vocab.utility.is_match(&joined) {
            GroupType::Utility
        } else if vocab.new_functionality.is_match(&joined) {
            GroupType::Feature
        } else {
            GroupType::Project
        }
    }

    fn actions(&self, context: &Context, draft: &Draft, newest: Option<DateTime<Utc>>) -> Vec<SuggestedAction> {
        let mut actions = Vec::new();
        let indices = draft.indices();

        if draft.merged_from > 1 {
            actions.push(SuggestedAction {
                action: ActionType::Merge,
                reason: format!("Combined from {} overlapping groups", draft.merged_from),
                confidence: draft.confidence,
            });
        }

        let internal = context.mean_similarity(&indices);
        if internal > MERGE_ACTION_SIMILARITY {
            actions.push(SuggestedAction {
                action: ActionType::Merge,
                reason: format!("Members are nearly identical (similarity {:.2})", internal),
                confidence: internal,
            });
        }

        if indices.len() > SPLIT_ACTION_SIZE {
            actions.push(SuggestedAction {
                action: ActionType::Split,
                reason: format!("{} members is too many for one group", indices.len()),
                confidence: 0.6,
            });
        }

        if draft.strategies.contains(&GroupingStrategy::Temporal) {
            actions.push(SuggestedAction {
                action: ActionType::Reorder,
                reason: "Order members by when they were written".to_string(),
                confidence: 0.7,
            });
        }

        if let Some(newest) = newest {
            let cutoff = newest - Duration::days(ARCHIVE_AGE_DAYS);
            if indices.iter().all(|&i| context.entries[i].item.timestamp < cutoff) {
                actions.push(SuggestedAction {
                    action: ActionType::Archive,
                    reason: format!("Untouched for more than {} days", ARCHIVE_AGE_DAYS),
                    confidence: 0.5,
                });
            }
        }

        if indices.iter().any(|&i| context.entries[i].item.is_favorite) {
            actions.push(SuggestedAction {
                action: ActionType::Promote,
                reason: "Contains a favorite".to_string(),
                confidence: 0.8,
            });
        }
        actions
    }

    /// Strongest relationship from group `k` to each other group
    fn relationships(&self, context: &Context, drafts: &[Draft], ids: &[GroupId], k: usize) -> Vec<GroupRelationship> {
        let own = &drafts[k];
        let mut found: Vec<GroupRelationship> = drafts
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != k)
            .filter_map(|(other, draft)| {
                self.relationship(context, own, draft).map(|(relationship_type, strength)| GroupRelationship {
                    target_group_id: ids[other].clone(),
                    relationship_type,
                    strength,
                })
            })
            .collect();
        found.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap_or(std::cmp::Ordering::Equal));
        found.truncate(MAX_RELATIONSHIPS);
        found
    }

    fn relationship(&self, context: &Context, a: &Draft, b: &Draft) -> Option<(RelationshipType, f64)> {
        let vocab = &self.catalog.vocabulary;
        let a_entries: Vec<&Entry> = a.members.iter().map(|(i, _)| &context.entries[*i]).collect();
        let b_entries: Vec<&Entry> = b.members.iter().map(|(i, _)| &context.entries[*i]).collect();

        let a_declared: HashSet<&String> = a_entries.iter().flat_map(|e| &e.declared).collect();
        let b_declared: HashSet<&String> = b_entries.iter().flat_map(|e| &e.declared).collect();
        let shares_declaration = !a_declared.is_disjoint(&b_declared);

        let a_oldest = a_entries.iter().map(|e| e.item.timestamp).min();
        let b_newest = b_entries.iter().map(|e| e.item.timestamp).max();
        let newer = matches!((a_oldest, b_newest), (Some(x), Some(y)) if x > y);

        let a_text = |pattern: &regex::Regex| a_entries.iter().any(|e| pattern.is_match(&e.item.text));

        if shares_declaration && newer && (a_text(&vocab.version_marker) || a_text(&vocab.improvement)) {
            return Some((RelationshipType::Supersedes, SUPERSEDES_STRENGTH));
        }
        if shares_declaration && a_text(&vocab.refactor) {
            return Some((RelationshipType::Refactors, REFACTORS_STRENGTH));
        }

        let b_classes: HashSet<&String> = b_entries
            .iter()
            .flat_map(|e| e.profile.signature.classes.iter())
            .filter(|c| !a_declared.contains(c))
            .collect();
        if a_entries.iter().any(|e| e.types.iter().any(|t| b_classes.contains(t))) {
            return Some((RelationshipType::Implements, IMPLEMENTS_STRENGTH));
        }

        let uses_b = a_entries
            .iter()
            .any(|e| e.calls.iter().any(|c| b_declared.contains(c) && !a_declared.contains(c)));
        if uses_b {
            return Some((RelationshipType::DependsOn, DEPENDS_ON_STRENGTH));
        }

        let tag_overlap = text::jaccard_strings(&a.tags, &b.tags);
        if newer && tag_overlap > 0.0 {
            return Some((RelationshipType::Extends, tag_overlap));
        }
        None
    }
}

fn draft(title: String, base: f64, members: Vec<(usize, f64)>) -> Draft {
    Draft {
        title,
        confidence: base,
        members,
        tags: Vec::new(),
        strategies: Vec::new(),
        merged_from: 1,
    }
}

fn label<'a>(topic: &'a str, language: &'a str) -> &'a str {
    if topic != GENERAL_TOPIC {
        topic
    } else if language != UNKNOWN_LANGUAGE {
        language
    } else {
        "related"
    }
}

/// Edge from each item to every other item declaring a name it calls
fn call_graph(context: &Context) -> DiGraph<usize, ()> {
    let mut graph = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..context.len()).map(|i| graph.add_node(i)).collect();
    for (i, user) in context.entries.iter().enumerate() {
        for (j, provider) in context.entries.iter().enumerate() {
            if i == j {
                continue;
            }
            let depends = user
                .calls
                .iter()
                .any(|c| provider.declared.contains(c) && !user.declared.contains(c));
            if depends {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }
    }
    graph
}

/// Combine any two groups whose member sets overlap above the ratio, until
/// no pair does
/// Base confidence scaled by the strategy weight relative to the mean weight
fn weighted_confidence(base: f64, weight: f64) -> f64 {
    (base * weight / MEAN_WEIGHT).min(1.0)
}

/// Combine groups whose member sets overlap by more than
/// [`OVERLAP_MERGE_RATIO`] (intersection over union) until none do
fn merge_overlapping(mut drafts: Vec<Draft>) -> Vec<Draft> {
    loop {
        let mut pair = None;
        'search: for i in 0..drafts.len() {
            let a = drafts[i].member_set();
            for j in i + 1..drafts.len() {
                if text::jaccard(&a, &drafts[j].member_set()) > OVERLAP_MERGE_RATIO {
                    pair = Some((i, j));
                    break 'search;
                }
            }
        }
        let Some((i, j)) = pair else {
            return drafts;
        };

        let absorbed = drafts.remove(j);
        let base = &mut drafts[i];
        debug!("Merging group '{}' into '{}'", absorbed.title, base.title);

        if absorbed.confidence > base.confidence {
            base.title = absorbed.title.clone();
        }
        base.confidence = (base.confidence + absorbed.confidence) / 2.0;
        for (index, relevance) in absorbed.members {
            match base.members.iter_mut().find(|(m, _)| *m == index) {
                Some(existing) => existing.1 = existing.1.max(relevance),
                None => base.members.push((index, relevance)),
            }
        }
        for tag in absorbed.tags {
            if !base.tags.contains(&tag) {
                base.tags.push(tag);
            }
        }
        base.tags.truncate(MAX_GROUP_TAGS);
        for strategy in absorbed.strategies {
            if !base.strategies.contains(&strategy) {
                base.strategies.push(strategy);
            }
        }
        base.merged_from += absorbed.merged_from;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> GroupingEngine {
        GroupingEngine::new(Arc::new(Catalog::new().unwrap()), DEFAULT_MAX_GROUPS)
    }

    fn members(ids: &[usize]) -> Vec<(usize, f64)> {
        ids.iter().map(|&i| (i, 1.0)).collect()
    }

    #[test]
    fn test_overlapping_groups_merge() {
        // 3 shared of 7 distinct members
        let mut a = draft("a".to_string(), 0.8, members(&[0, 1, 2, 3, 4]));
        a.strategies = vec![GroupingStrategy::Semantic];
        let mut b = draft("b".to_string(), 0.4, members(&[0, 1, 2, 5, 6]));
        b.strategies = vec![GroupingStrategy::Topic];

        let merged = merge_overlapping(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "a");
        assert_eq!(merged[0].members.len(), 7);
        assert!((merged[0].confidence - 0.6).abs() < 1e-9);
        assert_eq!(merged[0].strategies, vec![GroupingStrategy::Semantic, GroupingStrategy::Topic]);
        assert_eq!(merged[0].merged_from, 2);
    }

    #[test]
    fn test_overlap_threshold_is_exclusive() {
        // 3 shared of 10 distinct members is exactly the threshold
        let a = draft("a".to_string(), 0.8, members(&[0, 1, 2, 3, 4, 5]));
        let b = draft("b".to_string(), 0.8, members(&[0, 1, 2, 6, 7, 8, 9]));
        assert_eq!(merge_overlapping(vec![a, b]).len(), 2);

        // 3 shared of 9 distinct members is just above it
        let a = draft("a".to_string(), 0.8, members(&[0, 1, 2, 3, 4, 5]));
        let b = draft("b".to_string(), 0.8, members(&[0, 1, 2, 6, 7, 8]));
        assert_eq!(merge_overlapping(vec![a, b]).len(), 1);
    }

    #[test]
    fn test_two_of_five_shared_stays_separate() {
        let a = draft("a".to_string(), 0.8, members(&[0, 1, 2, 3, 4]));
        let b = draft("b".to_string(), 0.8, members(&[0, 1, 5, 6, 7]));
        assert_eq!(merge_overlapping(vec![a, b]).len(), 2);
    }

    #[test]
    fn test_small_overlap_stays_separate() {
        let a = draft("a".to_string(), 0.8, members(&[0, 1, 2, 3]));
        let b = draft("b".to_string(), 0.8, members(&[3, 4, 5, 6]));
        assert_eq!(merge_overlapping(vec![a, b]).len(), 2);
    }

    #[test]
    fn test_strategy_weight_scaling() {
        assert!((weighted_confidence(0.8, SEMANTIC_WEIGHT) - 1.0).abs() < 1e-9);
        assert!((weighted_confidence(0.6, TEMPORAL_WEIGHT) - 0.6).abs() < 1e-9);
        assert!((weighted_confidence(0.6, PROJECT_WEIGHT) - 0.75).abs() < 1e-9);
        assert!((weighted_confidence(0.7, DEPENDENCY_WEIGHT) - 0.525).abs() < 1e-9);
        assert!((weighted_confidence(0.8, TOPIC_WEIGHT) - 0.4).abs() < 1e-9);
        assert_eq!(weighted_confidence(0.9, SEMANTIC_WEIGHT), 1.0);
        assert_eq!(
            (SEMANTIC_WEIGHT, TEMPORAL_WEIGHT, PROJECT_WEIGHT, DEPENDENCY_WEIGHT, TOPIC_WEIGHT),
            (0.30, 0.20, 0.25, 0.15, 0.10)
        );
    }

    #[test]
    fn test_dependency_and_session_groups() {
        let now = Utc::now();
        let corpus = CorpusSnapshot::new(
            vec![],
            vec![
                ContentItem::snippet("a", "function foo() {\n  return 1;\n}", now - Duration::minutes(5)),
                ContentItem::snippet("b", "const x = foo();", now),
                ContentItem::snippet("c", "SELECT * FROM orders;", now - Duration::days(3)),
            ],
        );
        let result = engine().group_content(&corpus);

        let report = |s: GroupingStrategy| {
            result
                .strategy_reports
                .iter()
                .find(|r| r.strategy == s)
                .map(|r| r.groups_found)
                .unwrap()
        };
        assert_eq!(report(GroupingStrategy::Dependency), 1);
        assert_eq!(report(GroupingStrategy::Temporal), 1);

        let group = result
            .groups
            .iter()
            .find(|g| g.strategies.contains(&GroupingStrategy::Dependency))
            .unwrap();
        assert!(group.contains(&ItemId::from("a")));
        assert!(group.contains(&ItemId::from("b")));
        assert!(!group.contains(&ItemId::from("c")));
        assert!(group.strategies.contains(&GroupingStrategy::Temporal));
        assert_eq!(group.members[0].item_id, ItemId::from("a"));
        assert!(group
            .suggested_actions
            .iter()
            .any(|a| a.action == ActionType::Reorder));
    }

    #[test]
    fn test_blank_items_are_skipped() {
        let now = Utc::now();
        let corpus = CorpusSnapshot::new(
            vec![],
            vec![ContentItem::snippet("blank", "   \n", now), ContentItem::snippet("a", "const a = 1;", now)],
        );
        let result = engine().group_content(&corpus);
        assert_eq!(result.skipped, vec![ItemId::from("blank")]);
        assert!(result.groups.is_empty());
        assert_eq!(result.strategy_reports.len(), 5);
    }

    #[test]
    fn test_project_indicators_group_items() {
        let now = Utc::now();
        let corpus = CorpusSnapshot::new(
            vec![],
            vec![
                ContentItem::snippet("a", "import { Button } from '@acme/ui';", now - Duration::days(10)),
                ContentItem::snippet("b", "import { Modal } from '@acme/ui';", now - Duration::days(5)),
            ],
        );
        let result = engine().group_content(&corpus);
        assert!(result
            .groups
            .iter()
            .any(|g| g.strategies.contains(&GroupingStrategy::Project) && g.len() == 2));
    }

    #[test]
    fn test_archive_and_promote_actions() {
        let now = Utc::now();
        let old = now - Duration::days(200);
        let corpus = CorpusSnapshot::new(
            vec![],
            vec![
                ContentItem::snippet("a", "function foo() {\n  return 1;\n}", old).favorite(),
                ContentItem::snippet("b", "const x = foo();", old + Duration::minutes(1)),
                ContentItem::snippet("c", "SELECT * FROM orders;", now),
            ],
        );
        let result = engine().group_content(&corpus);
        let group = result
            .groups
            .iter()
            .find(|g| g.contains(&ItemId::from("a")))
            .unwrap();
        let actions: Vec<ActionType> = group.suggested_actions.iter().map(|a| a.action).collect();
        assert!(actions.contains(&ActionType::Archive));
        assert!(actions.contains(&ActionType::Promote));
    }

    #[test]
    fn test_groups_sorted_and_capped() {
        let now = Utc::now();
        let snippets: Vec<ContentItem> = (0..6)
            .map(|i| ContentItem::snippet(format!("s{}", i), format!("const v{} = fetch('/api/{}');", i, i), now))
            .collect();
        let engine = GroupingEngine::new(Arc::new(Catalog::new().unwrap()), 1);
        let result = engine.group_content(&CorpusSnapshot::new(vec![], snippets));
        assert!(result.groups.len() <= 1);
        for group in &result.groups {
            assert!(group.confidence > MIN_GROUP_CONFIDENCE);
            assert!(group.len() > 1);
        }
    }
}
