use code_organizer_analysis::{Catalog, SimilarityEngine};
use code_organizer_schemas::SimilarityCategory;
use proptest::prelude::*;
use std::sync::{Arc, OnceLock};

fn engine() -> &'static SimilarityEngine {
    static ENGINE: OnceLock<SimilarityEngine> = OnceLock::new();
    ENGINE.get_or_init(|| SimilarityEngine::new(Arc::new(Catalog::new().unwrap())))
}

/// Code-ish text: identifiers, punctuation and indentation
fn code_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,8}",
            Just("function ".to_string()),
            Just("if (x) {".to_string()),
            Just("}".to_string()),
            Just("return ".to_string()),
            Just("\n    ".to_string()),
            Just(";\n".to_string()),
            Just("import a from 'b';\n".to_string()),
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn score_and_confidence_in_unit_range(a in code_text(), b in code_text()) {
        let result = engine().calculate_similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&result.score));
        prop_assert!((0.0..=1.0).contains(&result.confidence));
        for value in result.breakdown.values() {
            prop_assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn similarity_is_deterministic(a in code_text(), b in code_text()) {
        prop_assert_eq!(engine().calculate_similarity(&a, &b), engine().calculate_similarity(&a, &b));
    }

    #[test]
    fn similarity_is_symmetric(a in code_text(), b in code_text()) {
        prop_assert_eq!(engine().calculate_similarity(&a, &b), engine().calculate_similarity(&b, &a));
    }

    #[test]
    fn self_similarity_is_exact(a in "[a-z]{1,10}( [a-z(){};]{1,10}){0,8}") {
        let result = engine().calculate_similarity(&a, &a);
        prop_assert_eq!(result.score, 1.0);
        prop_assert_eq!(result.category, SimilarityCategory::ExactMatch);
    }

    #[test]
    fn whitespace_only_self_similarity_is_exact(a in "[ \t\n]{1,12}") {
        let result = engine().calculate_similarity(&a, &a);
        prop_assert_eq!(result.score, 1.0);
        prop_assert_eq!(result.category, SimilarityCategory::ExactMatch);
    }

    #[test]
    fn category_matches_score(a in code_text(), b in code_text()) {
        let result = engine().calculate_similarity(&a, &b);
        prop_assert_eq!(result.category, SimilarityCategory::from_score(result.score));
    }
}
