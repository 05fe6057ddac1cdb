use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ULID and ID Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        ItemId(value.to_string())
    }
}

// ============================================================================
// Corpus Schema
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    #[serde(rename = "file")]
    File,
    #[serde(rename = "snippet")]
    Snippet,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::File => "file",
            ItemKind::Snippet => "snippet",
        }
    }
}

/// A saved piece of code owned by the persistence layer. The engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    pub kind: ItemKind,
    #[serde(default)]
    pub title: Option<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Owning file for snippets that were saved into a file
    #[serde(default)]
    pub file_id: Option<ItemId>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl ContentItem {
    pub fn snippet(id: impl Into<String>, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: ItemId(id.into()),
            kind: ItemKind::Snippet,
            title: None,
            text: text.into(),
            timestamp,
            file_id: None,
            language: None,
            tags: Vec::new(),
            is_favorite: false,
        }
    }

    pub fn file(
        id: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ItemId(id.into()),
            kind: ItemKind::File,
            title: Some(title.into()),
            text: text.into(),
            timestamp,
            file_id: None,
            language: None,
            tags: Vec::new(),
            is_favorite: false,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_file(mut self, file_id: &ItemId) -> Self {
        self.file_id = Some(file_id.clone());
        self
    }

    pub fn favorite(mut self) -> Self {
        self.is_favorite = true;
        self
    }
}

/// Read-only view of the user's saved files and snippets for one call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusSnapshot {
    #[serde(default)]
    pub files: Vec<ContentItem>,
    #[serde(default)]
    pub snippets: Vec<ContentItem>,
}

impl CorpusSnapshot {
    pub fn new(files: Vec<ContentItem>, snippets: Vec<ContentItem>) -> Self {
        Self { files, snippets }
    }

    /// Files first, then snippets
    pub fn items(&self) -> impl Iterator<Item = &ContentItem> {
        self.files.iter().chain(self.snippets.iter())
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.snippets.is_empty()
    }

    pub fn find(&self, id: &ItemId) -> Option<&ContentItem> {
        self.items().find(|item| &item.id == id)
    }

    /// Snippets saved into the given file
    pub fn snippets_in_file<'a>(&'a self, file_id: &'a ItemId) -> impl Iterator<Item = &'a ContentItem> + 'a {
        self.snippets
            .iter()
            .filter(move |s| s.file_id.as_ref() == Some(file_id))
    }
}

// ============================================================================
// Signature Schema
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructuralFingerprint {
    /// Indentation depth of the first non-blank lines
    pub indentation: Vec<usize>,
    pub open_braces: usize,
    pub close_braces: usize,
    pub line_count: usize,
}

impl fmt::Display for StructuralFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let depths: Vec<String> = self.indentation.iter().map(|d| d.to_string()).collect();
        write!(
            f,
            "{}|{}|{}|{}",
            depths.join("-"),
            self.open_braces,
            self.close_braces,
            self.line_count
        )
    }
}

/// Feature bag derived from raw text. Recomputed on every call, never cached.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentSignature {
    pub keywords: Vec<String>,
    /// Motif names, one entry per occurrence
    pub code_patterns: Vec<String>,
    pub fingerprint: StructuralFingerprint,
    pub language: String,
    pub imports: Vec<String>,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub variables: Vec<String>,
}

// ============================================================================
// Similarity Schema
// ============================================================================

pub const EXACT_MATCH_THRESHOLD: f64 = 0.9;
pub const HIGH_SIMILARITY_THRESHOLD: f64 = 0.7;
pub const RELATED_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimilarityCategory {
    #[serde(rename = "exact_match")]
    ExactMatch,
    #[serde(rename = "high_similarity")]
    HighSimilarity,
    #[serde(rename = "related")]
    Related,
    #[serde(rename = "unrelated")]
    Unrelated,
}

impl SimilarityCategory {
    pub fn from_score(score: f64) -> Self {
        if score >= EXACT_MATCH_THRESHOLD {
            SimilarityCategory::ExactMatch
        } else if score >= HIGH_SIMILARITY_THRESHOLD {
            SimilarityCategory::HighSimilarity
        } else if score >= RELATED_THRESHOLD {
            SimilarityCategory::Related
        } else {
            SimilarityCategory::Unrelated
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityCategory::ExactMatch => "exact_match",
            SimilarityCategory::HighSimilarity => "high_similarity",
            SimilarityCategory::Related => "related",
            SimilarityCategory::Unrelated => "unrelated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimilarityBreakdown {
    pub semantic: f64,
    pub structural: f64,
    pub lexical: f64,
    pub contextual: f64,
}

impl SimilarityBreakdown {
    pub fn values(&self) -> [f64; 4] {
        [self.semantic, self.structural, self.lexical, self.contextual]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub score: f64,
    pub category: SimilarityCategory,
    pub reasons: Vec<String>,
    pub confidence: f64,
    pub breakdown: SimilarityBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarItem {
    pub item_id: ItemId,
    pub similarity: SimilarityResult,
}

// ============================================================================
// Sequence Schema
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequencePatternType {
    #[serde(rename = "continuation")]
    Continuation,
    #[serde(rename = "dependency")]
    Dependency,
    #[serde(rename = "evolution")]
    Evolution,
    #[serde(rename = "refactor")]
    Refactor,
    #[serde(rename = "feature_addition")]
    FeatureAddition,
}

impl SequencePatternType {
    /// Fixed enumeration order, used to break ties
    pub const ALL: [SequencePatternType; 5] = [
        SequencePatternType::Continuation,
        SequencePatternType::Dependency,
        SequencePatternType::Evolution,
        SequencePatternType::Refactor,
        SequencePatternType::FeatureAddition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SequencePatternType::Continuation => "continuation",
            SequencePatternType::Dependency => "dependency",
            SequencePatternType::Evolution => "evolution",
            SequencePatternType::Refactor => "refactor",
            SequencePatternType::FeatureAddition => "feature_addition",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencePattern {
    pub pattern_type: SequencePatternType,
    pub confidence: f64,
    pub evidence: Vec<String>,
    /// Coarse local ordering signal; larger sorts later
    pub order_hint: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeline {
    #[serde(rename = "linear")]
    Linear,
    #[serde(rename = "branched")]
    Branched,
    #[serde(rename = "convergent")]
    Convergent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencedItem {
    pub item_id: ItemId,
    pub position: usize,
    pub pattern_type: SequencePatternType,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSequence {
    /// Ordered by position, 0..n-1
    pub items: Vec<SequencedItem>,
    pub pattern: SequencePattern,
    pub timeline: Timeline,
}

impl CodeSequence {
    pub fn ordered_ids(&self) -> Vec<&ItemId> {
        self.items.iter().map(|i| &i.item_id).collect()
    }

    pub fn position_of(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().find(|i| &i.item_id == id).map(|i| i.position)
    }
}

/// Pattern detected for a new item plus the ordering of the whole set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceAnalysis {
    pub pattern: SequencePattern,
    pub sequence: CodeSequence,
}

// ============================================================================
// Merge Schema
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeType {
    #[serde(rename = "append")]
    Append,
    #[serde(rename = "prepend")]
    Prepend,
    #[serde(rename = "replace")]
    Replace,
    #[serde(rename = "interleave")]
    Interleave,
    #[serde(rename = "consolidate")]
    Consolidate,
}

impl MergeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeType::Append => "append",
            MergeType::Prepend => "prepend",
            MergeType::Replace => "replace",
            MergeType::Interleave => "interleave",
            MergeType::Consolidate => "consolidate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeStrategy {
    #[serde(rename = "sequence_continuation")]
    SequenceContinuation,
    #[serde(rename = "semantic_consolidation")]
    SemanticConsolidation,
    #[serde(rename = "dependency_integration")]
    DependencyIntegration,
    #[serde(rename = "evolution_replacement")]
    EvolutionReplacement,
    #[serde(rename = "feature_integration")]
    FeatureIntegration,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::SequenceContinuation => "sequence_continuation",
            MergeStrategy::SemanticConsolidation => "semantic_consolidation",
            MergeStrategy::DependencyIntegration => "dependency_integration",
            MergeStrategy::EvolutionReplacement => "evolution_replacement",
            MergeStrategy::FeatureIntegration => "feature_integration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictType {
    #[serde(rename = "duplicate_content")]
    DuplicateContent,
    #[serde(rename = "conflicting_logic")]
    ConflictingLogic,
    #[serde(rename = "different_style")]
    DifferentStyle,
    #[serde(rename = "version_mismatch")]
    VersionMismatch,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::DuplicateContent => "duplicate_content",
            ConflictType::ConflictingLogic => "conflicting_logic",
            ConflictType::DifferentStyle => "different_style",
            ConflictType::VersionMismatch => "version_mismatch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConflictSeverity {
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictResolution {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "skip")]
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConflict {
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub resolution: ConflictResolution,
    pub description: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeCandidate {
    pub source_id: ItemId,
    pub target_id: ItemId,
    pub merge_type: MergeType,
    pub strategy: MergeStrategy,
    pub confidence: f64,
    pub reason: String,
    pub conflicts: Vec<MergeConflict>,
    pub preview: String,
}

/// Caller decisions applied when executing a merge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Manual conflict types the user has already resolved
    #[serde(default)]
    pub resolved_conflicts: Vec<ConflictType>,
    /// Conflict types the user chose to ignore
    #[serde(default)]
    pub skipped_conflicts: Vec<ConflictType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedMetadata {
    pub source_ids: Vec<ItemId>,
    pub strategy: MergeStrategy,
    pub merge_type: MergeType,
    pub language: Option<String>,
    pub tags: Vec<String>,
    pub line_count: usize,
    /// False when post-merge validation raised warnings
    pub validated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub success: bool,
    pub merged_content: Option<String>,
    pub merged_metadata: Option<MergedMetadata>,
    pub applied_resolutions: Vec<String>,
    pub warnings: Vec<String>,
}

impl MergeResult {
    pub fn refused(warnings: Vec<String>) -> Self {
        Self {
            success: false,
            merged_content: None,
            merged_metadata: None,
            applied_resolutions: Vec::new(),
            warnings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedGroup {
    pub item_ids: Vec<ItemId>,
    pub result: MergeResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmergedGroup {
    pub item_ids: Vec<ItemId>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchMergeResult {
    pub merged: Vec<MergedGroup>,
    pub unmerged: Vec<UnmergedGroup>,
}

// ============================================================================
// Grouping Schema
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupType {
    #[serde(rename = "project")]
    Project,
    #[serde(rename = "feature")]
    Feature,
    #[serde(rename = "component")]
    Component,
    #[serde(rename = "utility")]
    Utility,
    #[serde(rename = "tutorial")]
    Tutorial,
    #[serde(rename = "experiment")]
    Experiment,
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Project => "project",
            GroupType::Feature => "feature",
            GroupType::Component => "component",
            GroupType::Utility => "utility",
            GroupType::Tutorial => "tutorial",
            GroupType::Experiment => "experiment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupingStrategy {
    #[serde(rename = "semantic")]
    Semantic,
    #[serde(rename = "temporal")]
    Temporal,
    #[serde(rename = "project")]
    Project,
    #[serde(rename = "dependency")]
    Dependency,
    #[serde(rename = "topic")]
    Topic,
}

impl GroupingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingStrategy::Semantic => "semantic",
            GroupingStrategy::Temporal => "temporal",
            GroupingStrategy::Project => "project",
            GroupingStrategy::Dependency => "dependency",
            GroupingStrategy::Topic => "topic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipType {
    #[serde(rename = "depends_on")]
    DependsOn,
    #[serde(rename = "extends")]
    Extends,
    #[serde(rename = "implements")]
    Implements,
    #[serde(rename = "refactors")]
    Refactors,
    #[serde(rename = "supersedes")]
    Supersedes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    #[serde(rename = "merge")]
    Merge,
    #[serde(rename = "split")]
    Split,
    #[serde(rename = "reorder")]
    Reorder,
    #[serde(rename = "archive")]
    Archive,
    #[serde(rename = "promote")]
    Promote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub item_id: ItemId,
    pub relevance: f64,
    pub suggested_position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRelationship {
    pub target_group_id: GroupId,
    pub relationship_type: RelationshipType,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub action: ActionType,
    pub reason: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentGroup {
    pub id: GroupId,
    pub title: String,
    pub description: String,
    pub group_type: GroupType,
    pub confidence: f64,
    pub members: Vec<GroupMember>,
    pub relationships: Vec<GroupRelationship>,
    pub tags: Vec<String>,
    pub suggested_actions: Vec<SuggestedAction>,
    /// Strategies that produced (or were merged into) this group
    pub strategies: Vec<GroupingStrategy>,
}

impl ContentGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.members.iter().any(|m| &m.item_id == id)
    }

    pub fn member_ids(&self) -> Vec<&ItemId> {
        self.members.iter().map(|m| &m.item_id).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyReport {
    pub strategy: GroupingStrategy,
    pub groups_found: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupingResult {
    pub groups: Vec<ContentGroup>,
    pub strategy_reports: Vec<StrategyReport>,
    /// Items left out because their text was blank
    pub skipped: Vec<ItemId>,
}

// ============================================================================
// Classification Schema
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDetection {
    pub language: String,
    pub confidence: f64,
    pub frameworks: Vec<String>,
    pub suggested_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicClassification {
    pub topic: String,
    pub confidence: f64,
    pub suggested_tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppendReason {
    #[serde(rename = "core_topic_match")]
    CoreTopicMatch,
    #[serde(rename = "high_similarity")]
    HighSimilarity,
    #[serde(rename = "sequence_continuation")]
    SequenceContinuation,
    #[serde(rename = "moderate_similarity")]
    ModerateSimilarity,
    #[serde(rename = "no_match")]
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendDecision {
    pub should_append: bool,
    pub target_id: Option<ItemId>,
    pub reason: AppendReason,
    pub confidence: f64,
}

impl AppendDecision {
    pub fn new_item() -> Self {
        Self {
            should_append: false,
            target_id: None,
            reason: AppendReason::NoMatch,
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub language: LanguageDetection,
    pub topic: TopicClassification,
    pub suggested_name: String,
    pub suggested_tags: Vec<String>,
    pub append: AppendDecision,
    pub similar_items: Vec<SimilarItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationSuggestions {
    pub merge_candidates: Vec<MergeCandidate>,
    pub group_suggestions: Vec<ContentGroup>,
    pub smart_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyOutcome {
    pub classification: Classification,
    pub suggestions: Option<OrganizationSuggestions>,
}

// ============================================================================
// API Request Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub corpus: CorpusSnapshot,
    #[serde(default)]
    pub include_suggestions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityRequest {
    pub a: String,
    pub b: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceRequest {
    pub item: ContentItem,
    #[serde(default)]
    pub related: Vec<ContentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeCandidatesRequest {
    pub source: ContentItem,
    pub targets: Vec<ContentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeExecuteRequest {
    pub source: ContentItem,
    pub target: ContentItem,
    pub candidate: MergeCandidate,
    #[serde(default)]
    pub options: MergeOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMergeRequest {
    pub items: Vec<ContentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRequest {
    pub corpus: CorpusSnapshot,
}

// ============================================================================
// Helper Functions
// ============================================================================

pub fn generate_item_id() -> ItemId {
    ItemId(format!("item_{}", ulid::Ulid::new()))
}

pub fn generate_group_id() -> GroupId {
    GroupId(format!("grp_{}", ulid::Ulid::new()))
}
