//! Small text utilities shared by the extractors and scorers.

use std::collections::HashSet;
use std::hash::Hash;

/// Column width a tab counts for when measuring indentation
pub const TAB_WIDTH: usize = 4;

/// Identifier-ish tokens, lowercased, in scan order
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Intersection over union. Two empty sets score 0.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

pub fn jaccard_strings(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    jaccard(&a, &b)
}

/// Edit distance over any comparable sequence.
pub fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let (m, n) = (a.len(), b.len());
    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];
    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

/// Lowercase and collapse every whitespace run to a single space
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Trim and collapse internal whitespace, case preserved
pub fn normalize_line(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|l| !l.trim().is_empty())
}

/// Lines made only of brackets and separators, like `}` or `});`
pub fn is_punctuation_only(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| matches!(c, '{' | '}' | '(' | ')' | '[' | ']' | ';' | ',' | ':'))
}

pub fn count_braces(text: &str) -> (usize, usize) {
    let open = text.chars().filter(|&c| c == '{').count();
    let close = text.chars().filter(|&c| c == '}').count();
    (open, close)
}

/// Leading whitespace width in columns
pub fn leading_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

/// Smallest non-zero indentation width among the lines, if any line is indented
pub fn indent_unit<'a, I>(lines: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter(|l| !l.trim().is_empty())
        .map(leading_width)
        .filter(|&w| w > 0)
        .min()
}

/// Character n-grams over whitespace-normalized lowercase text.
/// Text shorter than `n` yields itself as the only shingle.
pub fn shingles(text: &str, n: usize) -> HashSet<String> {
    let normalized = normalize_whitespace(text);
    let chars: Vec<char> = normalized.chars().collect();
    if chars.is_empty() {
        return HashSet::new();
    }
    if chars.len() < n {
        return std::iter::once(normalized).collect();
    }
    chars.windows(n).map(|w| w.iter().collect()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingConvention {
    CamelCase,
    SnakeCase,
}

impl NamingConvention {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingConvention::CamelCase => "camelCase",
            NamingConvention::SnakeCase => "snake_case",
        }
    }
}

fn convention_of(name: &str) -> Option<NamingConvention> {
    let trimmed = name.trim_matches('_');
    if trimmed.contains('_') && !trimmed.chars().any(|c| c.is_uppercase()) {
        Some(NamingConvention::SnakeCase)
    } else if !trimmed.contains('_')
        && trimmed.chars().next().is_some_and(|c| c.is_lowercase())
        && trimmed.chars().any(|c| c.is_uppercase())
    {
        Some(NamingConvention::CamelCase)
    } else {
        None
    }
}

/// Majority convention among multi-word names; `None` when undecided
pub fn naming_convention<S: AsRef<str>>(names: &[S]) -> Option<NamingConvention> {
    let (mut camel, mut snake) = (0usize, 0usize);
    for name in names {
        match convention_of(name.as_ref()) {
            Some(NamingConvention::CamelCase) => camel += 1,
            Some(NamingConvention::SnakeCase) => snake += 1,
            None => {}
        }
    }
    match camel.cmp(&snake) {
        std::cmp::Ordering::Greater => Some(NamingConvention::CamelCase),
        std::cmp::Ordering::Less => Some(NamingConvention::SnakeCase),
        std::cmp::Ordering::Equal => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Single,
    Double,
}

/// Majority string quote character; `None` on a tie
pub fn quote_style(text: &str) -> Option<QuoteStyle> {
    let single = text.chars().filter(|&c| c == '\'').count();
    let double = text.chars().filter(|&c| c == '"').count();
    match single.cmp(&double) {
        std::cmp::Ordering::Greater => Some(QuoteStyle::Single),
        std::cmp::Ordering::Less => Some(QuoteStyle::Double),
        std::cmp::Ordering::Equal => None,
    }
}

/// Whole-word occurrence count of `word` in `text`
pub fn word_occurrences(text: &str, word: &str) -> usize {
    if word.is_empty() {
        return 0;
    }
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|t| *t == word)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jaccard_empty_sets() {
        let a: HashSet<&str> = HashSet::new();
        assert_eq!(jaccard(&a, &a), 0.0);
    }

    #[test]
    fn test_jaccard_partial_overlap() {
        let a: HashSet<_> = ["a", "b", "c"].into_iter().collect();
        let b: HashSet<_> = ["b", "c", "d"].into_iter().collect();
        assert!((jaccard(&a, &b) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein(&[0, 1, 2], &[0, 1, 2]), 0);
        assert_eq!(levenshtein(&[0, 1, 2], &[0, 2]), 1);
        assert_eq!(levenshtein::<usize>(&[], &[1, 1]), 2);
        let a: Vec<char> = "kitten".chars().collect();
        let b: Vec<char> = "sitting".chars().collect();
        assert_eq!(levenshtein(&a, &b), 3);
    }

    #[test]
    fn test_shingles_normalize_whitespace() {
        let a = shingles("Foo  Bar", 3);
        let b = shingles("foo\nbar", 3);
        assert_eq!(a, b);
        assert!(a.contains("foo"));
        assert_eq!(shingles("ab", 3).len(), 1);
        assert!(shingles("   ", 3).is_empty());
    }

    #[test]
    fn test_indent_unit() {
        let lines = ["fn a() {", "    let x = 1;", "        x", "}"];
        assert_eq!(indent_unit(lines), Some(4));
        assert_eq!(indent_unit(["a", "b"]), None);
        assert_eq!(leading_width("\t  x"), 6);
    }

    #[test]
    fn test_naming_convention() {
        assert_eq!(
            naming_convention(&["getUser", "saveUser", "load_all"]),
            Some(NamingConvention::CamelCase)
        );
        assert_eq!(
            naming_convention(&["get_user", "save_user"]),
            Some(NamingConvention::SnakeCase)
        );
        assert_eq!(naming_convention(&["x", "y"]), None);
    }

    #[test]
    fn test_quote_style_and_words() {
        assert_eq!(quote_style("a = 'x'; b = 'y'"), Some(QuoteStyle::Single));
        assert_eq!(quote_style(r#"a = "x""#), Some(QuoteStyle::Double));
        assert_eq!(word_occurrences("foo(); foobar(); foo", "foo"), 2);
    }

    #[test]
    fn test_punctuation_only() {
        assert!(is_punctuation_only("  });"));
        assert!(!is_punctuation_only("return x;"));
    }
}
