use code_organizer_schemas::{ContentSignature, StructuralFingerprint};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{Catalog, UNKNOWN_LANGUAGE};
use crate::text;

pub const MAX_KEYWORDS: usize = 50;
pub const MAX_VARIABLES: usize = 30;
pub const FINGERPRINT_LINES: usize = 20;

/// Language-guess multipliers: motif count, keyword density, extension hits
pub const GUESS_MOTIF_WEIGHT: f64 = 1.0;
pub const GUESS_DENSITY_WEIGHT: f64 = 10.0;
pub const GUESS_EXTENSION_WEIGHT: f64 = 2.0;

/// Keywords that introduce a declaration, so `foo(` right after them is not a call
const DECLARING_WORDS: &[&str] = &["function", "def", "fn", "func", "fun", "class", "new"];

/// Derives a [`ContentSignature`] from raw text.
///
/// Pure function of the text: the same input always yields the same
/// signature, and nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct SignatureExtractor {
    catalog: Arc<Catalog>,
}

impl SignatureExtractor {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn extract(&self, text: &str) -> ContentSignature {
        let signature = ContentSignature {
            keywords: self.keywords(text),
            code_patterns: self.code_patterns(text),
            fingerprint: fingerprint(text),
            language: self.guess_language(text),
            imports: self.imports(text),
            functions: self.functions(text),
            classes: self.classes(text),
            variables: self.variables(text),
        };

        debug!(
            "Extracted signature: {} keywords, {} motifs, language {}",
            signature.keywords.len(),
            signature.code_patterns.len(),
            signature.language
        );

        signature
    }

    /// First unique meaningful tokens in scan order
    pub fn keywords(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut keywords = Vec::new();
        for token in text::tokens(text) {
            if !is_meaningful(&self.catalog, &token) {
                continue;
            }
            if seen.insert(token.clone()) {
                keywords.push(token);
                if keywords.len() == MAX_KEYWORDS {
                    break;
                }
            }
        }
        keywords
    }

    /// Motif names, one entry per occurrence, in catalog order
    pub fn code_patterns(&self, text: &str) -> Vec<String> {
        let mut patterns = Vec::new();
        for motif in &self.catalog.motifs {
            let hits = motif.pattern.find_iter(text).count();
            patterns.extend(std::iter::repeat(motif.name.to_string()).take(hits));
        }
        patterns
    }

    pub fn guess_language(&self, text: &str) -> String {
        let tokens = text::tokens(text);
        let mut best: Option<(&'static str, f64)> = None;

        for profile in &self.catalog.languages {
            let evidence = profile.evidence(text, &tokens);
            let score = evidence.motif_hits as f64 * GUESS_MOTIF_WEIGHT
                + evidence.keyword_density() * GUESS_DENSITY_WEIGHT
                + evidence.extension_hits as f64 * GUESS_EXTENSION_WEIGHT;
            // Strict comparison keeps the earlier language on ties
            if score > 0.0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((profile.name, score));
            }
        }

        best.map_or(UNKNOWN_LANGUAGE, |(name, _)| name).to_string()
    }

    pub fn imports(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        for pattern in &self.catalog.scanners.import_sources {
            for caps in pattern.captures_iter(text) {
                found.push(caps[1].trim().to_string());
            }
        }
        dedup(found)
    }

    pub fn functions(&self, text: &str) -> Vec<String> {
        self.declared_names(&self.catalog.scanners.functions, text)
    }

    pub fn classes(&self, text: &str) -> Vec<String> {
        self.declared_names(&self.catalog.scanners.classes, text)
    }

    pub fn variables(&self, text: &str) -> Vec<String> {
        let mut names = self.declared_names(&self.catalog.scanners.variables, text);
        names.truncate(MAX_VARIABLES);
        names
    }

    fn declared_names(&self, patterns: &[regex::Regex], text: &str) -> Vec<String> {
        let mut found = Vec::new();
        for pattern in patterns {
            for caps in pattern.captures_iter(text) {
                let name = &caps[1];
                if !self.catalog.is_reserved(name) {
                    found.push(name.to_string());
                }
            }
        }
        dedup(found)
    }

    /// Local names bound by import statements (`import { a as b }` yields `b`)
    pub fn imported_names(&self, text: &str) -> Vec<String> {
        let scanners = &self.catalog.scanners;
        let mut names = Vec::new();

        for re in [
            &scanners.js_default_import,
            &scanners.js_namespace_import,
            &scanners.require_binding,
        ] {
            for caps in re.captures_iter(text) {
                names.push(caps[1].to_string());
            }
        }

        for re in [
            &scanners.js_named_import,
            &scanners.require_destructure,
            &scanners.python_from_import,
        ] {
            for caps in re.captures_iter(text) {
                names.extend(split_binding_list(&caps[1]));
            }
        }

        for caps in scanners.python_import.captures_iter(text) {
            let name = match caps.get(2) {
                Some(alias) => alias.as_str(),
                None => caps[1].rsplit('.').next().unwrap_or(&caps[1]),
            };
            names.push(name.to_string());
        }

        for caps in scanners.path_import.captures_iter(text) {
            let path = &caps[1];
            if let Some(last) = path.rsplit(['.', ':']).find(|s| !s.is_empty()) {
                if last != "*" {
                    names.push(last.to_string());
                }
            }
        }

        dedup(names)
    }

    /// Called names that are not declaration sites and not reserved words
    pub fn calls(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        for caps in self.catalog.scanners.calls.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            let name = m.as_str();
            if self.catalog.is_reserved(name) {
                continue;
            }
            let preceding = text[..m.start()].trim_end();
            let previous_word = preceding
                .rsplit(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
                .next()
                .unwrap_or_default();
            if DECLARING_WORDS.contains(&previous_word) || preceding.ends_with('.') {
                continue;
            }
            found.push(name.to_string());
        }
        dedup(found)
    }

    /// Capitalized type names referenced through extends/implements, annotations or `new`
    pub fn type_references(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        for pattern in &self.catalog.scanners.type_references {
            for caps in pattern.captures_iter(text) {
                found.push(caps[1].to_string());
            }
        }
        dedup(found)
    }

    pub fn versions(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        for pattern in &self.catalog.scanners.versions {
            for caps in pattern.captures_iter(text) {
                found.push(caps[1].to_string());
            }
        }
        dedup(found)
    }

    /// Names hinting at the project an item belongs to: import-source heads,
    /// package declarations and scoped package names
    pub fn project_indicators(&self, text: &str) -> Vec<String> {
        let scanners = &self.catalog.scanners;
        let mut found = Vec::new();

        for source in self.imports(text) {
            if let Some(head) = import_head(&source) {
                found.push(head);
            }
        }
        for caps in scanners.package_declaration.captures_iter(text) {
            if let Some(head) = caps[1].split('.').next() {
                found.push(head.to_lowercase());
            }
        }
        for caps in scanners.scoped_package.captures_iter(text) {
            found.push(caps[1].to_lowercase());
        }

        dedup(found)
    }
}

/// Tokens longer than two characters that are neither numbers nor stop-words
pub fn is_meaningful(catalog: &Catalog, token: &str) -> bool {
    token.chars().count() > 2
        && token.parse::<f64>().is_err()
        && !catalog.stop_words.contains(token)
}

/// Indentation depths of the first non-blank lines plus brace and line counts
pub fn fingerprint(text: &str) -> StructuralFingerprint {
    let sampled: Vec<&str> = text::non_blank_lines(text).take(FINGERPRINT_LINES).collect();
    let unit = text::indent_unit(sampled.iter().copied());
    let indentation = sampled
        .iter()
        .map(|line| match unit {
            Some(unit) => text::leading_width(line) / unit,
            None => 0,
        })
        .collect();
    let (open_braces, close_braces) = text::count_braces(text);

    StructuralFingerprint {
        indentation,
        open_braces,
        close_braces,
        line_count: text.lines().count(),
    }
}

/// Rough size measure used by the evolution heuristics
pub fn complexity(signature: &ContentSignature) -> usize {
    signature.fingerprint.line_count
        + signature.code_patterns.len()
        + signature.functions.len()
        + signature.classes.len()
}

fn import_head(source: &str) -> Option<String> {
    if source.starts_with('.') || source.starts_with('/') {
        return None;
    }
    if source.starts_with('@') {
        return source.split('/').next().map(str::to_lowercase);
    }
    let head = source
        .split(['/', '.', ':'])
        .find(|s| !s.is_empty())?
        .to_lowercase();
    // Standard library roots say nothing about the project
    match head.as_str() {
        "std" | "java" | "javax" | "system" | "os" | "sys" | "fs" | "path" | "http" | "core" => None,
        _ => Some(head),
    }
}

fn split_binding_list(list: &str) -> Vec<String> {
    list.split(',')
        .filter_map(|part| {
            let part = part.trim();
            let name = match part.split_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => match part.split_once(':') {
                    Some((_, alias)) => alias.trim(),
                    None => part,
                },
            };
            if name.is_empty() || name == "*" {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SignatureExtractor {
        SignatureExtractor::new(Arc::new(Catalog::new().unwrap()))
    }

    #[test]
    fn test_signature_is_deterministic() {
        let extractor = extractor();
        let text = "import React from 'react';\nfunction App() {\n  const [n, setN] = useState(0);\n  return n;\n}";
        assert_eq!(extractor.extract(text), extractor.extract(text));
    }

    #[test]
    fn test_keywords_filtering() {
        let extractor = extractor();
        let keywords = extractor.keywords("function calculateTotal(items) { return items.length + 42 + ab; }");
        assert_eq!(keywords, vec!["calculatetotal", "items", "length"]);
    }

    #[test]
    fn test_keywords_capped() {
        let extractor = extractor();
        let text: String = (0..80).map(|i| format!("word{} ", i)).collect();
        assert_eq!(extractor.keywords(&text).len(), MAX_KEYWORDS);
    }

    #[test]
    fn test_code_patterns_multiset() {
        let extractor = extractor();
        let patterns = extractor.code_patterns("if (a) { x(); }\nif (b) { y(); }");
        assert_eq!(patterns.iter().filter(|p| *p == "if_statement").count(), 2);
    }

    #[test]
    fn test_fingerprint() {
        let fp = fingerprint("fn main() {\n    let x = 1;\n\n        x\n}\n");
        assert_eq!(fp.indentation, vec![0, 1, 2, 0]);
        assert_eq!(fp.open_braces, 1);
        assert_eq!(fp.close_braces, 1);
        assert_eq!(fp.line_count, 5);
    }

    #[test]
    fn test_guess_language() {
        let extractor = extractor();
        assert_eq!(extractor.guess_language("def greet(name):\n    print(name)\n"), "python");
        assert_eq!(extractor.guess_language("const add = (a, b) => a + b;"), "javascript");
        assert_eq!(extractor.guess_language(""), UNKNOWN_LANGUAGE);
        assert_eq!(extractor.guess_language("!!! ???"), UNKNOWN_LANGUAGE);
    }

    #[test]
    fn test_declarations() {
        let extractor = extractor();
        let text = "class Cart {}\nfunction addItem(item) {}\nconst total = 0;\nif (total) {}";
        let sig = extractor.extract(text);
        assert_eq!(sig.classes, vec!["Cart"]);
        assert_eq!(sig.functions, vec!["addItem"]);
        assert!(sig.variables.contains(&"total".to_string()));
        assert!(!sig.functions.contains(&"if".to_string()));
    }

    #[test]
    fn test_imports_and_imported_names() {
        let extractor = extractor();
        let text = "import React, { useState as useS } from 'react';\nconst fs = require('fs');\nfrom os.path import join";
        let imports = extractor.imports(text);
        assert!(imports.contains(&"react".to_string()));
        assert!(imports.contains(&"fs".to_string()));
        assert!(imports.contains(&"os.path".to_string()));

        let names = extractor.imported_names(text);
        assert!(names.contains(&"React".to_string()));
        assert!(names.contains(&"useS".to_string()));
        assert!(names.contains(&"fs".to_string()));
        assert!(names.contains(&"join".to_string()));
    }

    #[test]
    fn test_calls_skip_declarations() {
        let extractor = extractor();
        assert!(extractor.calls("function foo() {}").is_empty());
        assert_eq!(extractor.calls("const r = foo();\nbar(r);"), vec!["foo", "bar"]);
        assert!(extractor.calls("obj.method();").is_empty());
    }

    #[test]
    fn test_project_indicators() {
        let extractor = extractor();
        let text = "import { Button } from '@acme/ui';\nimport helpers from './helpers';";
        assert_eq!(extractor.project_indicators(text), vec!["@acme"]);
        let java = "package shop.cart;\nimport java.util.List;";
        assert_eq!(extractor.project_indicators(java), vec!["shop"]);
    }

    #[test]
    fn test_versions() {
        let extractor = extractor();
        assert_eq!(extractor.versions("// version: 2.1.0"), vec!["2.1.0"]);
        assert!(extractor.versions("let x = 1;").is_empty());
    }
}
