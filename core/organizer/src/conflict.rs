//! Conflict analysis between two items about to be merged.
//!
//! | conflict          | severity | resolution |
//! |-------------------|----------|------------|
//! | duplicate_content | medium   | auto       |
//! | conflicting_logic | high     | manual     |
//! | different_style   | low      | auto       |
//! | version_mismatch  | medium   | manual     |

use code_organizer_analysis::{text, SignatureExtractor};
use code_organizer_schemas::{
    ConflictResolution, ConflictSeverity, ConflictType, ContentItem, MergeConflict, MergeOptions,
};
use std::collections::HashSet;
use tracing::debug;

/// Share of one side's lines recurring in the other that counts as duplication
pub const DUPLICATE_LINE_RATIO: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct ConflictAnalyzer {
    extractor: SignatureExtractor,
}

impl ConflictAnalyzer {
    pub fn new(extractor: SignatureExtractor) -> Self {
        Self { extractor }
    }

    pub fn analyze(&self, source: &ContentItem, target: &ContentItem) -> Vec<MergeConflict> {
        let mut conflicts = Vec::new();
        conflicts.extend(duplicate_content(&source.text, &target.text));
        conflicts.extend(self.conflicting_logic(&source.text, &target.text));
        conflicts.extend(self.different_style(&source.text, &target.text));
        conflicts.extend(self.version_mismatch(&source.text, &target.text));

        debug!(
            "Found {} conflicts between {} and {}",
            conflicts.len(),
            source.id,
            target.id
        );
        conflicts
    }

    fn conflicting_logic(&self, a: &str, b: &str) -> Option<MergeConflict> {
        let mut contradictions = Vec::new();

        let conditions_a = self.conditions(a);
        let conditions_b = self.conditions(b);
        let mut flipped: Vec<&String> = conditions_a
            .iter()
            .filter(|(expr, negated)| conditions_b.contains(&(expr.clone(), !negated)))
            .map(|(expr, _)| expr)
            .collect();
        flipped.sort();
        flipped.dedup();
        if let Some(expr) = flipped.first() {
            contradictions.push(format!("opposite conditions on `{}`", expr));
        }

        let (true_a, false_a) = returns_boolean(a);
        let (true_b, false_b) = returns_boolean(b);
        if (true_a && !false_a && false_b && !true_b) || (false_a && !true_a && true_b && !false_b) {
            contradictions.push("one side returns true where the other returns false".to_string());
        }

        let (enable_a, disable_a) = toggles(a);
        let (enable_b, disable_b) = toggles(b);
        if (enable_a && !disable_a && disable_b && !enable_b) || (disable_a && !enable_a && enable_b && !disable_b) {
            contradictions.push("one side enables what the other disables".to_string());
        }

        if contradictions.is_empty() {
            return None;
        }
        Some(MergeConflict {
            conflict_type: ConflictType::ConflictingLogic,
            severity: ConflictSeverity::High,
            resolution: ConflictResolution::Manual,
            description: format!("Conflicting logic: {}", contradictions.join("; ")),
            suggestions: vec![
                "Review both branches before merging".to_string(),
                "Keep only one version of the condition".to_string(),
            ],
        })
    }

    /// `(expression, negated)` pairs from `if (...)` and python `if ...:` headers
    fn conditions(&self, text: &str) -> HashSet<(String, bool)> {
        let scanners = &self.extractor.catalog().scanners;
        let mut found = HashSet::new();
        for caps in scanners.condition.captures_iter(text) {
            let expr = text::normalize_line(&caps[2]);
            if !expr.is_empty() {
                found.insert((expr, &caps[1] == "!"));
            }
        }
        for caps in scanners.python_condition.captures_iter(text) {
            found.insert((caps[2].to_string(), caps.get(1).is_some()));
        }
        found
    }

    fn different_style(&self, a: &str, b: &str) -> Option<MergeConflict> {
        let mut differences = Vec::new();

        let unit_a = text::indent_unit(text::non_blank_lines(a));
        let unit_b = text::indent_unit(text::non_blank_lines(b));
        if let (Some(x), Some(y)) = (unit_a, unit_b) {
            if x != y {
                differences.push(format!("indentation {} vs {}", x, y));
            }
        }

        if let (Some(x), Some(y)) = (text::quote_style(a), text::quote_style(b)) {
            if x != y {
                differences.push("single vs double quotes".to_string());
            }
        }

        let names_a = self.names(a);
        let names_b = self.names(b);
        if let (Some(x), Some(y)) = (text::naming_convention(&names_a), text::naming_convention(&names_b)) {
            if x != y {
                differences.push(format!("{} vs {}", x.as_str(), y.as_str()));
            }
        }

        if differences.is_empty() {
            return None;
        }
        Some(MergeConflict {
            conflict_type: ConflictType::DifferentStyle,
            severity: ConflictSeverity::Low,
            resolution: ConflictResolution::Auto,
            description: format!("Different style: {}", differences.join(", ")),
            suggestions: vec!["Reformat the merged result with one style".to_string()],
        })
    }

    fn names(&self, text: &str) -> Vec<String> {
        let mut names = self.extractor.functions(text);
        names.extend(self.extractor.variables(text));
        names
    }

    fn version_mismatch(&self, a: &str, b: &str) -> Option<MergeConflict> {
        let versions_a: HashSet<String> = self.extractor.versions(a).into_iter().collect();
        let versions_b: HashSet<String> = self.extractor.versions(b).into_iter().collect();
        if versions_a.is_empty() || versions_b.is_empty() || !versions_a.is_disjoint(&versions_b) {
            return None;
        }

        let mut a_sorted: Vec<&String> = versions_a.iter().collect();
        let mut b_sorted: Vec<&String> = versions_b.iter().collect();
        a_sorted.sort();
        b_sorted.sort();
        Some(MergeConflict {
            conflict_type: ConflictType::VersionMismatch,
            severity: ConflictSeverity::Medium,
            resolution: ConflictResolution::Manual,
            description: format!(
                "Version mismatch: {} vs {}",
                join(&a_sorted),
                join(&b_sorted)
            ),
            suggestions: vec![
                "Pick the version the merged code should declare".to_string(),
                "Keep the newer version and note the older one".to_string(),
            ],
        })
    }
}

/// More than 30% of one side's non-trivial lines recur in the other
fn duplicate_content(a: &str, b: &str) -> Option<MergeConflict> {
    let lines_a = significant_lines(a);
    let lines_b = significant_lines(b);
    if lines_a.is_empty() || lines_b.is_empty() {
        return None;
    }
    let set_a: HashSet<&str> = lines_a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = lines_b.iter().map(String::as_str).collect();

    let shared_a = lines_a.iter().filter(|l| set_b.contains(l.as_str())).count();
    let shared_b = lines_b.iter().filter(|l| set_a.contains(l.as_str())).count();
    let ratio_a = shared_a as f64 / lines_a.len() as f64;
    let ratio_b = shared_b as f64 / lines_b.len() as f64;
    let ratio = ratio_a.max(ratio_b);

    if ratio <= DUPLICATE_LINE_RATIO {
        return None;
    }
    Some(MergeConflict {
        conflict_type: ConflictType::DuplicateContent,
        severity: ConflictSeverity::Medium,
        resolution: ConflictResolution::Auto,
        description: format!("{:.0}% of lines appear in both items", ratio * 100.0),
        suggestions: vec![
            "Drop the duplicated lines".to_string(),
            "Consolidate into a single copy".to_string(),
        ],
    })
}

/// Normalized non-blank lines that carry more than brackets
pub fn significant_lines(text: &str) -> Vec<String> {
    text::non_blank_lines(text)
        .filter(|l| !text::is_punctuation_only(l))
        .map(text::normalize_line)
        .collect()
}

fn returns_boolean(text: &str) -> (bool, bool) {
    let normalized = text::normalize_whitespace(text);
    (
        normalized.contains("return true"),
        normalized.contains("return false"),
    )
}

fn toggles(text: &str) -> (bool, bool) {
    let tokens = text::tokens(text);
    (
        tokens.iter().any(|t| t.starts_with("enable")),
        tokens.iter().any(|t| t.starts_with("disable")),
    )
}

fn join(values: &[&String]) -> String {
    values.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
}

/// Manual conflicts the caller has neither resolved nor skipped
pub fn unresolved<'a>(conflicts: &'a [MergeConflict], options: &MergeOptions) -> Vec<&'a MergeConflict> {
    conflicts
        .iter()
        .filter(|c| c.resolution == ConflictResolution::Manual)
        .filter(|c| {
            !options.resolved_conflicts.contains(&c.conflict_type)
                && !options.skipped_conflicts.contains(&c.conflict_type)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use code_organizer_analysis::Catalog;
    use std::sync::Arc;

    fn analyzer() -> ConflictAnalyzer {
        ConflictAnalyzer::new(SignatureExtractor::new(Arc::new(Catalog::new().unwrap())))
    }

    fn item(id: &str, text: &str) -> ContentItem {
        ContentItem::snippet(id, text, Utc::now())
    }

    fn types(conflicts: &[MergeConflict]) -> Vec<ConflictType> {
        conflicts.iter().map(|c| c.conflict_type).collect()
    }

    #[test]
    fn test_opposite_conditions() {
        let conflicts = analyzer().analyze(
            &item("a", "if (x) {\n  run();\n}"),
            &item("b", "if (!x) {\n  run();\n}"),
        );
        let logic = conflicts
            .iter()
            .find(|c| c.conflict_type == ConflictType::ConflictingLogic)
            .unwrap();
        assert_eq!(logic.severity, ConflictSeverity::High);
        assert_eq!(logic.resolution, ConflictResolution::Manual);
        assert!(logic.description.contains("`x`"));
    }

    #[test]
    fn test_return_and_toggle_contradictions() {
        let analyzer = analyzer();
        let conflicts = analyzer.analyze(
            &item("a", "function ok() { return true; }"),
            &item("b", "function ok() { return false; }"),
        );
        assert!(types(&conflicts).contains(&ConflictType::ConflictingLogic));

        let conflicts = analyzer.analyze(&item("a", "enableCache();"), &item("b", "disableCache();"));
        assert!(types(&conflicts).contains(&ConflictType::ConflictingLogic));
    }

    #[test]
    fn test_duplicate_content_ignores_punctuation_lines() {
        let a = "function a() {\n  step1();\n  step2();\n}";
        let b = "function b() {\n  other();\n}";
        assert!(duplicate_content(a, b).is_none());

        let c = "function c() {\n  step1();\n  step2();\n  step3();\n}";
        let dup = duplicate_content(a, c).unwrap();
        assert_eq!(dup.resolution, ConflictResolution::Auto);
        assert_eq!(dup.severity, ConflictSeverity::Medium);
    }

    #[test]
    fn test_different_style() {
        let conflicts = analyzer().analyze(
            &item("a", "function a() {\n  const userName = 'x';\n}"),
            &item("b", "function b() {\n    const user_name = \"x\";\n}"),
        );
        let style = conflicts
            .iter()
            .find(|c| c.conflict_type == ConflictType::DifferentStyle)
            .unwrap();
        assert_eq!(style.resolution, ConflictResolution::Auto);
        assert!(style.description.contains("indentation 2 vs 4"));
        assert!(style.description.contains("single vs double quotes"));
        assert!(style.description.contains("camelCase vs snake_case"));
    }

    #[test]
    fn test_version_mismatch() {
        let conflicts = analyzer().analyze(&item("a", "// version: 1.2.0"), &item("b", "// version: 2.0.0"));
        let version = conflicts
            .iter()
            .find(|c| c.conflict_type == ConflictType::VersionMismatch)
            .unwrap();
        assert_eq!(version.resolution, ConflictResolution::Manual);

        let same = analyzer().analyze(&item("a", "// version: 1.2.0"), &item("b", "// version: 1.2.0 tweak"));
        assert!(!types(&same).contains(&ConflictType::VersionMismatch));
    }

    #[test]
    fn test_unresolved_respects_options() {
        let conflicts = analyzer().analyze(&item("a", "if (x) { go(); }"), &item("b", "if (!x) { go(); }"));
        assert_eq!(unresolved(&conflicts, &MergeOptions::default()).len(), 1);

        let options = MergeOptions {
            resolved_conflicts: vec![ConflictType::ConflictingLogic],
            skipped_conflicts: vec![],
        };
        assert!(unresolved(&conflicts, &options).is_empty());
    }

    #[test]
    fn test_clean_pair_has_no_conflicts() {
        let conflicts = analyzer().analyze(&item("a", "const a = 1;"), &item("b", "const b = 2;"));
        assert!(conflicts.is_empty());
    }
}
