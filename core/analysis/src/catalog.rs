//! Immutable heuristic catalogs: language and topic profiles, code motifs,
//! stop-words, sequence/merge vocabularies and the extraction scanners.
//!
//! Everything is compiled once by [`Catalog::new`] and shared by reference;
//! nothing in here is mutated after construction.

use regex::Regex;
use std::collections::HashSet;

use crate::error::{AnalysisError, Result};

/// Name reported when no language scores above zero
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Topic reported when no topic pattern matches
pub const GENERAL_TOPIC: &str = "general";

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| AnalysisError::invalid_pattern(pattern, e))
}

fn compile_all(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(p)).collect()
}

// ============================================================================
// Languages
// ============================================================================

/// Per-language multipliers for the detection score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageWeights {
    pub motif: f64,
    pub keyword: f64,
    pub extension: f64,
    pub framework: f64,
}

pub const DEFAULT_LANGUAGE_WEIGHTS: LanguageWeights = LanguageWeights {
    motif: 3.0,
    keyword: 2.0,
    extension: 5.0,
    framework: 3.0,
};

#[derive(Debug)]
pub struct Framework {
    pub name: &'static str,
    pub pattern: Regex,
}

#[derive(Debug)]
pub struct LanguageProfile {
    pub name: &'static str,
    pub motifs: Vec<Regex>,
    pub keywords: HashSet<&'static str>,
    pub extensions: &'static [&'static str],
    pub frameworks: Vec<Framework>,
    pub weights: LanguageWeights,
}

/// Raw hit counts of one language profile against one text
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LanguageEvidence {
    pub motif_hits: usize,
    pub keyword_hits: usize,
    pub extension_hits: usize,
    pub framework_hits: usize,
    pub token_count: usize,
}

impl LanguageEvidence {
    pub fn keyword_density(&self) -> f64 {
        if self.token_count == 0 {
            0.0
        } else {
            self.keyword_hits as f64 / self.token_count as f64
        }
    }
}

impl LanguageProfile {
    /// `tokens` must be the lowercased token stream of `text`
    pub fn evidence(&self, text: &str, tokens: &[String]) -> LanguageEvidence {
        LanguageEvidence {
            motif_hits: self.motifs.iter().map(|m| m.find_iter(text).count()).sum(),
            keyword_hits: tokens
                .iter()
                .filter(|t| self.keywords.contains(t.as_str()))
                .count(),
            extension_hits: self.extensions.iter().map(|ext| extension_hits(text, ext)).sum(),
            framework_hits: self
                .frameworks
                .iter()
                .filter(|f| f.pattern.is_match(text))
                .count(),
            token_count: tokens.len(),
        }
    }

    /// Frameworks referenced by the text, in catalog order
    pub fn frameworks_in(&self, text: &str) -> Vec<&'static str> {
        self.frameworks
            .iter()
            .filter(|f| f.pattern.is_match(text))
            .map(|f| f.name)
            .collect()
    }
}

/// Occurrences of `ext` that end a file name, so `.h` does not count inside `.html`
fn extension_hits(text: &str, ext: &str) -> usize {
    text.match_indices(ext)
        .filter(|(at, _)| {
            text[at + ext.len()..]
                .chars()
                .next()
                .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
        })
        .count()
}

/// Line comment prefix used when older code is kept as history
pub fn comment_prefix_for(language: &str) -> &'static str {
    match language {
        "python" | "ruby" => "#",
        "sql" => "--",
        _ => "//",
    }
}

struct LanguageSpec {
    name: &'static str,
    motifs: &'static [&'static str],
    keywords: &'static [&'static str],
    extensions: &'static [&'static str],
    frameworks: &'static [(&'static str, &'static str)],
}

/// Scan order matters: ties go to the earlier entry.
const LANGUAGE_SPECS: &[LanguageSpec] = &[
    LanguageSpec {
        name: "javascript",
        motifs: &[
            r"\bfunction\s*\w*\s*\(",
            r"\b(const|let|var)\s+\w+\s*=",
            r"=>",
            r"console\.\w+\s*\(",
            r"\brequire\s*\(",
            r"\b(document|window)\.",
            r"module\.exports|export\s+default",
            r"===|!==",
        ],
        keywords: &[
            "function", "const", "let", "var", "undefined", "typeof", "instanceof",
            "prototype", "console", "document", "window", "require", "module", "exports",
        ],
        extensions: &[".js", ".jsx", ".mjs"],
        frameworks: &[
            ("react", r#"\bReact\b|from\s+['"]react['"]|\buse(State|Effect)\s*\("#),
            ("vue", r#"\bVue\b|from\s+['"]vue['"]"#),
            ("express", r#"\bexpress\s*\(|['"]express['"]"#),
            ("node", r#"require\(\s*['"](fs|path|http|os)['"]\s*\)|process\.env"#),
            ("jquery", r"\bjQuery\b|\$\(\s*['\x22]"),
            ("nextjs", r#"['"]next/|getServerSideProps|getStaticProps"#),
            ("react-native", r#"['"]react-native['"]"#),
        ],
    },
    LanguageSpec {
        name: "typescript",
        motifs: &[
            r":\s*(string|number|boolean|any|void|unknown|never)\b",
            r"\binterface\s+\w+",
            r"\btype\s+\w+\s*=",
            r"\b(public|private|protected|readonly)\s+\w+\s*[:(]",
            r"\bas\s+(string|number|any|const)\b",
            r"\benum\s+\w+\s*\{",
            r"<\w+(\[\])?>\s*\(",
        ],
        keywords: &[
            "interface", "type", "enum", "implements", "readonly", "namespace",
            "declare", "keyof", "any", "never", "unknown",
        ],
        extensions: &[".ts", ".tsx"],
        frameworks: &[
            ("angular", r"@angular/|@Component\s*\(|@Injectable\s*\("),
            ("nestjs", r"@nestjs/|@Controller\s*\("),
            ("react", r#"from\s+['"]react['"]|React\.FC"#),
        ],
    },
    LanguageSpec {
        name: "python",
        motifs: &[
            r"\bdef\s+\w+\s*\(",
            r"(?m)^\s*from\s+[\w.]+\s+import\b",
            r"\bself\.",
            r"(?m)^\s*(if|for|while|def|class|elif|else|try|except|with)\b[^\n{]*:\s*$",
            r"\belif\b",
            r"\bprint\s*\(",
            r"__\w+__",
        ],
        keywords: &[
            "def", "elif", "self", "none", "lambda", "pass", "yield", "except",
            "raise", "print", "nonlocal", "global", "kwargs", "args",
        ],
        extensions: &[".py", ".pyw"],
        frameworks: &[
            ("django", r"\bdjango\b|models\.Model"),
            ("flask", r"\bflask\b|\bFlask\s*\(|@app\.route"),
            ("fastapi", r"\bfastapi\b|FastAPI\s*\("),
            ("pandas", r"\bpandas\b|\bpd\.\w+"),
            ("numpy", r"\bnumpy\b|\bnp\.\w+"),
            ("pytorch", r"\btorch\b"),
            ("tensorflow", r"\btensorflow\b|\btf\.\w+"),
        ],
    },
    LanguageSpec {
        name: "java",
        motifs: &[
            r"\bpublic\s+(static\s+)?(class|void|int|String|boolean)\b",
            r"System\.out\.print",
            r"\b(private|protected)\s+\w+(<[\w, ]+>)?\s+\w+\s*[;=(]",
            r"@Override",
            r"(?m)^\s*import\s+java\.",
            r"\bthrows\s+\w+",
        ],
        keywords: &[
            "public", "private", "protected", "static", "void", "extends", "implements",
            "final", "package", "throws", "boolean", "string", "system",
        ],
        extensions: &[".java"],
        frameworks: &[
            ("spring", r"@SpringBootApplication|@RestController|springframework"),
            ("android", r"\bandroid\.|\bActivity\b"),
            ("junit", r"org\.junit|@Test\b"),
        ],
    },
    LanguageSpec {
        name: "csharp",
        motifs: &[
            r"(?m)^\s*using\s+System",
            r"\bnamespace\s+[\w.]+",
            r"Console\.Write",
            r"\{\s*get;\s*(set;)?\s*\}",
            r"(?m)^\s*\[\w+(\(.*\))?\]\s*$",
        ],
        keywords: &[
            "using", "namespace", "readonly", "override", "async", "await", "var",
            "string", "bool", "console", "linq",
        ],
        extensions: &[".cs"],
        frameworks: &[
            ("aspnet", r"Microsoft\.AspNetCore|\[ApiController\]"),
            ("unity", r"UnityEngine|MonoBehaviour"),
        ],
    },
    LanguageSpec {
        name: "cpp",
        motifs: &[
            r"(?m)^\s*#include\s*[<\x22]",
            r"\bstd::",
            r"\bcout\s*<<",
            r"\btemplate\s*<",
            r"\b\w+::\w+\s*\(",
        ],
        keywords: &[
            "include", "std", "cout", "cin", "endl", "template", "typename", "nullptr",
            "virtual", "unsigned",
        ],
        extensions: &[".cpp", ".hpp", ".cc", ".h"],
        frameworks: &[
            ("qt", r"#include\s*<Q\w+>"),
            ("boost", r"\bboost::"),
        ],
    },
    LanguageSpec {
        name: "rust",
        motifs: &[
            r"\bfn\s+\w+",
            r"\blet\s+mut\b",
            r"\bimpl\b",
            r"\bpub\s+(fn|struct|enum|mod|trait)\b",
            r"println!\s*\(",
            r"&mut\b",
            r"#\[derive",
        ],
        keywords: &[
            "fn", "mut", "impl", "pub", "struct", "trait", "match", "crate", "mod",
            "some", "ok", "err", "usize", "vec",
        ],
        extensions: &[".rs"],
        frameworks: &[
            ("tokio", r"\btokio::"),
            ("serde", r"\bserde\b"),
            ("actix", r"\bactix_web\b"),
            ("axum", r"\baxum::"),
        ],
    },
    LanguageSpec {
        name: "go",
        motifs: &[
            r"\bfunc\s+(\(\w+\s+\*?\w+\)\s*)?\w+\s*\(",
            r":=",
            r"(?m)^\s*package\s+\w+\s*$",
            r"\bfmt\.\w+\s*\(",
            r"\bdefer\b",
            r"\bchan\b",
        ],
        keywords: &[
            "func", "package", "defer", "chan", "go", "range", "nil", "fmt", "make",
        ],
        extensions: &[".go"],
        frameworks: &[("gin", r"\bgin\.\w+"), ("echo", r"\becho\.New\s*\(")],
    },
    LanguageSpec {
        name: "swift",
        motifs: &[
            r"\bguard\s+let\b",
            r"\bif\s+let\b",
            r"(?m)^\s*import\s+(UIKit|SwiftUI|Foundation)\b",
            r"@(State|Published|ObservedObject)\b",
            r"\bvar\s+\w+\s*:\s*[A-Z]\w*",
            r"\bfunc\s+\w+\s*\([^)]*\)\s*(->\s*\w+\s*)?\{",
        ],
        keywords: &["guard", "protocol", "extension", "func", "nil", "some", "inout"],
        extensions: &[".swift"],
        frameworks: &[
            ("swiftui", r"\bSwiftUI\b|:\s*View\b"),
            ("uikit", r"\bUIKit\b|UIViewController"),
        ],
    },
    LanguageSpec {
        name: "kotlin",
        motifs: &[
            r"\bfun\s+\w+\s*\(",
            r"\bval\s+\w+",
            r"\bdata\s+class\b",
            r"\bcompanion\s+object\b",
            r"\bwhen\s*\(",
        ],
        keywords: &["fun", "val", "when", "companion", "suspend", "lateinit", "object"],
        extensions: &[".kt", ".kts"],
        frameworks: &[
            ("android", r"AppCompatActivity|\bandroid\."),
            ("ktor", r"\bio\.ktor\b"),
            ("compose", r"@Composable"),
        ],
    },
    LanguageSpec {
        name: "php",
        motifs: &[
            r"<\?php",
            r"\$\w+\s*=",
            r"\$\w+->\w+",
            r"\becho\b",
            r"function\s+\w+\s*\(\s*\$",
        ],
        keywords: &["echo", "php", "foreach", "array", "require_once", "isset"],
        extensions: &[".php"],
        frameworks: &[
            ("laravel", r"Illuminate\\|Route::"),
            ("symfony", r"Symfony\\"),
        ],
    },
    LanguageSpec {
        name: "ruby",
        motifs: &[
            r"(?m)^\s*end\s*$",
            r"\bputs\s",
            r"\battr_(accessor|reader|writer)\b",
            r"\.each\s+do\b",
            r"(?m)^\s*require\s+['\x22]",
            r"\bdo\s*\|\w+\|",
        ],
        keywords: &["end", "puts", "elsif", "unless", "do", "nil", "attr_accessor"],
        extensions: &[".rb"],
        frameworks: &[("rails", r"\bRails\b|ActiveRecord|ApplicationController")],
    },
    LanguageSpec {
        name: "sql",
        motifs: &[
            r"(?i)\bselect\s+[\w*,\s.]+\s+from\b",
            r"(?i)\binsert\s+into\b",
            r"(?i)\bcreate\s+table\b",
            r"(?i)\bupdate\s+\w+\s+set\b",
            r"(?i)\b(inner|left|right)\s+join\b",
        ],
        keywords: &[
            "select", "from", "where", "insert", "into", "join", "table", "values",
            "group", "order",
        ],
        extensions: &[".sql"],
        frameworks: &[],
    },
    LanguageSpec {
        name: "html",
        motifs: &[
            r"(?i)<(div|span|html|body|head|ul|li|button|input|form|section|nav)\b[^>]*>",
            r"</\w+>",
            r"(?i)<!DOCTYPE",
        ],
        keywords: &["div", "span", "href", "src", "html", "body"],
        extensions: &[".html", ".htm"],
        frameworks: &[("bootstrap", r"\bbootstrap\b|\bbtn-\w+")],
    },
    LanguageSpec {
        name: "css",
        motifs: &[
            r"(?m)^\s*[.#]?[\w-]+\s*\{",
            r"@media\b",
            r"\b(color|margin|padding|display|font-size|border)\s*:",
        ],
        keywords: &["color", "margin", "padding", "display", "border", "px"],
        extensions: &[".css", ".scss"],
        frameworks: &[("tailwind", r"@tailwind\b")],
    },
];

// ============================================================================
// Topics
// ============================================================================

#[derive(Debug)]
pub struct TopicProfile {
    pub name: &'static str,
    pub weight: f64,
    pub patterns: Vec<Regex>,
    pub related: &'static [&'static str],
}

impl TopicProfile {
    /// Total match count across all patterns
    pub fn hits(&self, text: &str) -> usize {
        self.patterns.iter().map(|p| p.find_iter(text).count()).sum()
    }

    pub fn score(&self, text: &str) -> f64 {
        self.weight * self.hits(text) as f64
    }
}

struct TopicSpec {
    name: &'static str,
    weight: f64,
    patterns: &'static [&'static str],
    related: &'static [&'static str],
}

const TOPIC_SPECS: &[TopicSpec] = &[
    TopicSpec {
        name: "auth",
        weight: 5.0,
        patterns: &[
            r"(?i)\b(auth\w*|login|logout|sign_?in|sign_?up|password|jwt|oauth|credentials?)\b",
            r"(?i)\b(bcrypt|hashPassword|verifyToken|verifyPassword|accessToken|refreshToken)\b",
        ],
        related: &["security", "user-management"],
    },
    TopicSpec {
        name: "database",
        weight: 5.0,
        patterns: &[
            r"(?i)\b(select|insert|update|delete)\b[^\n;]*\b(from|into|set|where)\b",
            r"(?i)\b(database|query|sql|mongoose|sequelize|prisma|collection|transaction|orm)\b",
            r"(?i)\b(mongodb|postgres\w*|mysql|sqlite|redis)\b",
        ],
        related: &["data-storage", "backend"],
    },
    TopicSpec {
        name: "api",
        weight: 4.0,
        patterns: &[
            r"(?i)\b(endpoint|router|controller|middleware|graphql|rest)\b",
            r"\b(app|router)\.(get|post|put|delete|patch)\s*\(",
            r"\b(req|res)\.(body|params|query|status|json|send)\b",
        ],
        related: &["backend", "http"],
    },
    TopicSpec {
        name: "ui",
        weight: 4.0,
        patterns: &[
            r"<[A-Za-z][\w.]*[^>]*/?>",
            r"\b(render|useState|props|className|onClick|onChange|setState)\b",
            r"(?i)\b(button|modal|layout|stylesheet)\b",
        ],
        related: &["frontend", "components"],
    },
    TopicSpec {
        name: "data-processing",
        weight: 4.0,
        patterns: &[
            r"\.(map|filter|reduce|groupBy|flatMap)\s*\(",
            r"(?i)\b(parse|transform|aggregate|csv|dataframe|normalize)\w*\b",
        ],
        related: &["data", "transformation"],
    },
    TopicSpec {
        name: "api-integration",
        weight: 4.0,
        patterns: &[
            r"\b(fetch|axios|XMLHttpRequest|HttpClient)\b",
            r"\brequests\.(get|post|put|delete)\s*\(",
            r"(?i)\b(api_?key|webhook|bearer|headers)\b",
            r"https?://",
        ],
        related: &["http", "third-party"],
    },
    TopicSpec {
        name: "testing",
        weight: 5.0,
        patterns: &[
            r"\b(describe|it|test|expect|beforeEach|afterEach)\s*\(",
            r"\b(assert\w*|mock\w*|jest|pytest|unittest)\b",
            r"@Test\b",
        ],
        related: &["quality-assurance", "unit-tests"],
    },
    TopicSpec {
        name: "algorithms",
        weight: 3.0,
        patterns: &[
            r"(?i)\b(binary\s*search|recursion|recursive|fibonacci|factorial|memoi[sz]\w*|dijkstra|bfs|dfs)\b",
            r"(?i)\b(pivot|mid|left|right|queue|stack|heap|visited)\b",
        ],
        related: &["data-structures", "problem-solving"],
    },
    TopicSpec {
        name: "mobile-development",
        weight: 5.0,
        patterns: &[
            r"(?i)\b(android|ios|swiftui|uikit|flutter|viewcontroller|appcompatactivity)\b",
            r"react-native|@Composable|\bStyleSheet\.create\b",
        ],
        related: &["mobile", "ui"],
    },
    TopicSpec {
        name: "web-development",
        weight: 3.0,
        patterns: &[
            r"\b(document|window|localStorage|addEventListener|querySelector)\b",
            r"(?i)\b(dom|html|css|browser)\b",
        ],
        related: &["frontend", "ui"],
    },
    TopicSpec {
        name: "backend-development",
        weight: 3.0,
        patterns: &[
            r"(?i)\b(server|express|django|flask|spring|listen|port)\b",
            r"process\.env|os\.environ",
        ],
        related: &["backend", "api"],
    },
];

// ============================================================================
// Code motifs
// ============================================================================

#[derive(Debug)]
pub struct CodeMotif {
    pub name: &'static str,
    pub pattern: Regex,
}

const MOTIF_SPECS: &[(&str, &str)] = &[
    ("if_statement", r"\bif\s*\("),
    ("python_if", r"(?m)^\s*(if|elif)\s+[^\n(]*:\s*$"),
    ("else_clause", r"\belse\b"),
    ("for_loop", r"\bfor\s*\("),
    ("for_in_loop", r"\bfor\s+\w+\s+in\b"),
    ("while_loop", r"\bwhile\s*\(?"),
    ("switch_statement", r"\b(switch|match)\s*\(?[\w.]+\)?\s*\{"),
    ("try_catch", r"\btry\s*(\{|:)"),
    ("function_declaration", r"\b(function|def|fn|func|fun)\s+\w+"),
    ("arrow_function", r"=>"),
    ("class_declaration", r"\bclass\s+\w+"),
    ("const_declaration", r"\bconst\s+\w+"),
    ("let_declaration", r"\blet\s+\w+"),
    ("var_declaration", r"\bvar\s+\w+"),
    ("import_statement", r"(?m)^\s*(import|from|use|using|#include)\b"),
    ("require_call", r"\brequire\s*\("),
    ("react_hook", r"\buse(State|Effect|Context|Reducer|Memo|Callback|Ref)\s*\("),
    ("async_function", r"\basync\b"),
    ("await_expression", r"\bawait\b"),
    ("promise_chain", r"\.then\s*\(|\bnew\s+Promise\b"),
    ("http_call", r"\bfetch\s*\(|\baxios\.\w+\s*\(|\brequests\.(get|post|put|delete)\s*\("),
    ("return_statement", r"\breturn\b"),
];

// ============================================================================
// Word lists
// ============================================================================

const STOP_WORDS: &[&str] = &[
    // English
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her",
    "was", "one", "our", "out", "has", "have", "his", "how", "its", "may", "new", "now",
    "old", "see", "two", "way", "who", "did", "get", "got", "let", "put", "say", "she",
    "too", "use", "this", "that", "with", "from", "they", "will", "would", "there",
    "their", "what", "about", "which", "when", "make", "like", "just", "into", "than",
    "then", "them", "these", "some", "only", "also", "here", "more", "very", "should",
    // Code keywords carry no topical meaning
    "function", "return", "const", "var", "else", "while", "import", "export",
    "default", "class", "def", "public", "private", "protected", "static", "void",
    "this", "self", "true", "false", "null", "none", "undefined", "int", "string",
    "bool", "boolean", "async", "await", "try", "catch", "except", "finally", "throw",
    "raise", "new", "elif", "break", "continue", "pass", "lambda", "yield", "struct",
    "impl", "pub", "mut", "func", "fun", "val", "package", "require", "module",
    "extends", "implements", "interface", "type", "enum", "case", "switch", "console",
    "log", "print", "println", "printf", "err", "error",
];

/// Identifiers that look like calls or declarations but are syntax
const RESERVED_WORDS: &[&str] = &[
    "if", "else", "for", "while", "switch", "catch", "function", "return", "typeof",
    "instanceof", "new", "delete", "void", "await", "async", "yield", "super", "this",
    "import", "export", "require", "def", "class", "elif", "except", "with", "match",
    "fn", "func", "fun", "when", "sizeof", "print", "println", "assert", "and", "or",
    "not", "in", "is", "lambda", "const", "let", "var", "val", "static", "public",
    "private", "protected", "struct", "enum", "interface", "type", "try", "throw",
    "raise", "do", "loop", "foreach", "using", "namespace", "package", "constructor",
    "get", "set", "self", "none", "null", "true", "false", "undefined", "end",
];

// ============================================================================
// Vocabularies
// ============================================================================

/// Word patterns behind the sequence, merge and grouping heuristics
#[derive(Debug)]
pub struct Vocabulary {
    pub continuation_marker: Regex,
    pub setup: Regex,
    pub version_marker: Regex,
    pub improvement: Regex,
    pub optimization: Regex,
    pub refactor: Regex,
    pub section_comment: Regex,
    pub new_functionality: Regex,
    pub feature_flag: Regex,
    pub endpoint: Regex,
    pub component: Regex,
    pub utility: Regex,
    pub tutorial: Regex,
    pub experiment: Regex,
}

impl Vocabulary {
    fn new() -> Result<Self> {
        Ok(Self {
            continuation_marker: compile(
                r"(?im)((//|#|/\*|\*|--)\s*(to be continued|continued|continue[sd]?|todo|more)\b|^\s*\.\.\.\s*$)",
            )?,
            setup: compile(
                r"(?i)\b(config\w*|configure|setup|init|initiali[sz]e|bootstrap|register|provider|settings|env)\b",
            )?,
            version_marker: compile(r"(?i)(\bversion\s*[:=]?\s*\S*\d|@version\b|\bv\d+(\.\d+)*\b)")?,
            improvement: compile(
                r"(?i)\b(improved?|improvements?|better|enhanced?|enhancements?|updated?|upgraded?|fixe[sd]|revised?)\b",
            )?,
            optimization: compile(
                r"(?i)\b(optimi[sz]ed?|optimi[sz]ation|faster|performance|efficient|cached?|memoi[sz]ed?)\b",
            )?,
            refactor: compile(
                r"(?i)\b(refactor(ed|ing)?|restructur(e|ed|ing)|clean\s?up|extract(ed)?|renamed?|simplif(y|ied))\b",
            )?,
            section_comment: compile(
                r"(?m)^\s*(//|#|--)\s*(={3,}|-{3,}|#{3,}|\*{3,}|section\b|region\b|MARK:)|^\s*#(pragma\s+)?(end)?region\b|^\s*/\*\*",
            )?,
            new_functionality: compile(
                r"(?i)\b(new\s+feature|added?|adds|implement(ed|s)?|introduc(e|ed|es)|support\s+for|feature)\b",
            )?,
            feature_flag: compile(
                r"(?i)(feature[_ ]?flags?|is_?enabled|\benabled?\b|\btoggle\w*|FEATURE_\w+|\bflags?\.)",
            )?,
            endpoint: compile(
                r"(?i)(\b(app|router)\.(get|post|put|delete|patch)\s*\(|@(get|post|put|delete)mapping|@app\.route|\bendpoints?\b|\broutes?\b)",
            )?,
            component: compile(
                r"(?i)(export\s+default\s+function|react\.component|extends\s+component\b|@component\b|\bcomponents?\b|\brender\s*\()",
            )?,
            utility: compile(r"(?i)\b(utils?|utilit(y|ies)|helpers?|format\w*|convert\w*)\b")?,
            tutorial: compile(r"(?i)\b(step\s*\d+|tutorial|example|lesson|exercise|demo)\b")?,
            experiment: compile(r"(?i)\b(experiment\w*|playground|scratch|prototype|poc|trying)\b")?,
        })
    }
}

// ============================================================================
// Extraction scanners
// ============================================================================

/// Category-specific scans used by the signature extractor and the
/// dependency heuristics
#[derive(Debug)]
pub struct Scanners {
    pub import_sources: Vec<Regex>,
    pub js_default_import: Regex,
    pub js_named_import: Regex,
    pub js_namespace_import: Regex,
    pub require_binding: Regex,
    pub require_destructure: Regex,
    pub python_from_import: Regex,
    pub python_import: Regex,
    pub path_import: Regex,
    pub functions: Vec<Regex>,
    pub classes: Vec<Regex>,
    pub variables: Vec<Regex>,
    pub calls: Regex,
    pub type_references: Vec<Regex>,
    pub versions: Vec<Regex>,
    pub package_declaration: Regex,
    pub scoped_package: Regex,
    pub condition: Regex,
    pub python_condition: Regex,
}

impl Scanners {
    fn new() -> Result<Self> {
        Ok(Self {
            import_sources: compile_all(&[
                r#"(?m)^\s*import\s+(?:[\w*{}\s,$]+\s+from\s+)?['"]([^'"]+)['"]"#,
                r#"(?m)^\s*export\s+[\w*{}\s,]+\s+from\s+['"]([^'"]+)['"]"#,
                r"(?m)^\s*from\s+([\w.]+)\s+import\b",
                r"(?m)^\s*import\s+([\w.]+)(?:\s+as\s+\w+)?\s*;?\s*$",
                r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
                r"(?m)^\s*use\s+([\w:]+)",
                r#"(?m)^\s*#include\s*[<"]([^>"]+)[>"]"#,
                r"(?m)^\s*using\s+([\w.]+)\s*;",
            ])?,
            js_default_import: compile(r"(?m)^\s*import\s+([A-Za-z_$][\w$]*)\s*(?:,|\s+from\b)")?,
            js_named_import: compile(r"(?m)^\s*import\s+(?:[A-Za-z_$][\w$]*\s*,\s*)?\{([^}]*)\}")?,
            js_namespace_import: compile(r"(?m)^\s*import\s+\*\s+as\s+([A-Za-z_$][\w$]*)")?,
            require_binding: compile(r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*require\s*\(")?,
            require_destructure: compile(r"\b(?:const|let|var)\s*\{([^}]*)\}\s*=\s*require\s*\(")?,
            python_from_import: compile(r"(?m)^[ \t]*from\s+[\w.]+\s+import[ \t]+([\w \t,]+)$")?,
            python_import: compile(r"(?m)^\s*import\s+([\w.]+)(?:\s+as\s+(\w+))?\s*$")?,
            path_import: compile(r"(?m)^\s*(?:use|import)\s+([\w.:]+?)(?:::\*)?\s*;")?,
            functions: compile_all(&[
                r"\bfunction\s*\*?\s+([A-Za-z_$][\w$]*)",
                r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|[A-Za-z_$][\w$]*\s*=>)",
                r"\bdef\s+([A-Za-z_]\w*)",
                r"\bfn\s+([A-Za-z_]\w*)",
                r"\bfunc\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)",
                r"\bfun\s+([A-Za-z_]\w*)",
                r"(?m)^\s*(?:(?:public|private|protected|static|final|abstract|override|virtual|async|synchronized)\s+)+[\w<>\[\],.?]+\s+([A-Za-z_]\w*)\s*\([^)]*\)\s*(?:throws\s+[\w.,\s]+)?\{",
                r"(?m)^\s*(?:async\s+)?([A-Za-z_$][\w$]*)\s*\([^)]*\)\s*\{",
            ])?,
            classes: compile_all(&[
                r"\bclass\s+([A-Za-z_]\w*)",
                r"\binterface\s+([A-Za-z_]\w*)",
                r"\bstruct\s+([A-Za-z_]\w*)",
                r"\benum\s+([A-Za-z_]\w*)",
                r"\btrait\s+([A-Za-z_]\w*)",
                r"\bprotocol\s+([A-Za-z_]\w*)",
                r"\btype\s+([A-Z]\w*)\s*(?:=|struct\b|interface\b)",
            ])?,
            variables: compile_all(&[
                r"\b(?:const|let|var|val)\s+(?:mut\s+)?([A-Za-z_$][\w$]*)",
                r"(?m)^\s*([A-Za-z_]\w*)\s*(?::\s*[\w\[\]]+\s*)?=[^=>]",
                r"\b([A-Za-z_]\w*)\s*:=",
                r"\b(?:int|float|double|bool|boolean|char|long|short|auto|String|string)\s+([A-Za-z_]\w*)\s*[=;]",
                r"\$([A-Za-z_]\w*)\s*=[^=]",
            ])?,
            calls: compile(r"\b([A-Za-z_$][\w$]*)\s*\(")?,
            type_references: compile_all(&[
                r"\b(?:extends|implements)\s+([A-Z]\w*)",
                r":\s*([A-Z]\w*)",
                r"\bnew\s+([A-Z]\w*)",
                r"<([A-Z]\w*)>",
            ])?,
            versions: compile_all(&[
                r#"(?i)\bversion\s*[:=]?\s*['"]?v?(\d+(?:\.\d+)+)"#,
                r"(?i)@version\s+v?(\d+(?:\.\d+)*)",
                r"(?i)\bv(\d+\.\d+(?:\.\d+)?)\b",
            ])?,
            package_declaration: compile(r"(?m)^\s*package\s+([\w.]+)\s*;?\s*$")?,
            scoped_package: compile(r#"['"](@[\w-]+)/[\w.-]+"#)?,
            condition: compile(r"\bif\s*\(\s*(!?)\s*([^()]*?)\s*\)")?,
            python_condition: compile(r"(?m)\bif\s+(not\s+)?([\w.]+)\s*:")?,
        })
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug)]
pub struct Catalog {
    pub languages: Vec<LanguageProfile>,
    pub topics: Vec<TopicProfile>,
    pub motifs: Vec<CodeMotif>,
    pub stop_words: HashSet<&'static str>,
    pub reserved: HashSet<&'static str>,
    pub vocabulary: Vocabulary,
    pub scanners: Scanners,
}

impl Catalog {
    pub fn new() -> Result<Self> {
        let languages = LANGUAGE_SPECS
            .iter()
            .map(|spec| {
                Ok(LanguageProfile {
                    name: spec.name,
                    motifs: compile_all(spec.motifs)?,
                    keywords: spec.keywords.iter().copied().collect(),
                    extensions: spec.extensions,
                    frameworks: spec
                        .frameworks
                        .iter()
                        .map(|(name, pattern)| {
                            Ok(Framework {
                                name,
                                pattern: compile(pattern)?,
                            })
                        })
                        .collect::<Result<Vec<_>>>()?,
                    weights: DEFAULT_LANGUAGE_WEIGHTS,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let topics = TOPIC_SPECS
            .iter()
            .map(|spec| {
                Ok(TopicProfile {
                    name: spec.name,
                    weight: spec.weight,
                    patterns: compile_all(spec.patterns)?,
                    related: spec.related,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let motifs = MOTIF_SPECS
            .iter()
            .map(|(name, pattern)| {
                Ok(CodeMotif {
                    name,
                    pattern: compile(pattern)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            languages,
            topics,
            motifs,
            stop_words: STOP_WORDS.iter().copied().collect(),
            reserved: RESERVED_WORDS.iter().copied().collect(),
            vocabulary: Vocabulary::new()?,
            scanners: Scanners::new()?,
        })
    }

    pub fn language(&self, name: &str) -> Option<&LanguageProfile> {
        self.languages.iter().find(|l| l.name == name)
    }

    pub fn topic(&self, name: &str) -> Option<&TopicProfile> {
        self.topics.iter().find(|t| t.name == name)
    }

    pub fn is_reserved(&self, word: &str) -> bool {
        self.reserved.contains(word.to_lowercase().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_compiles() {
        let catalog = Catalog::new().unwrap();
        assert!(catalog.languages.len() >= 12);
        assert_eq!(catalog.languages[0].name, "javascript");
        assert!(catalog.motifs.len() >= 20);
        assert!(catalog.topic("auth").is_some());
        assert!(catalog.topic("backend-development").is_some());
    }

    #[test]
    fn test_language_evidence() {
        let catalog = Catalog::new().unwrap();
        let text = "const x = require('./util.js');";
        let tokens = crate::text::tokens(text);
        let js = catalog.language("javascript").unwrap();
        let evidence = js.evidence(text, &tokens);
        assert!(evidence.motif_hits >= 2);
        assert!(evidence.keyword_hits >= 2);
        assert_eq!(evidence.extension_hits, 1);
        assert!(evidence.keyword_density() > 0.0);
    }

    #[test]
    fn test_extension_hits_match_whole_suffix() {
        let catalog = Catalog::new().unwrap();
        let cpp = catalog.language("cpp").unwrap();
        let html = "<!-- see index.html -->";
        assert_eq!(cpp.evidence(html, &crate::text::tokens(html)).extension_hits, 0);
        let header = "#include \"vector.h\"";
        assert_eq!(cpp.evidence(header, &crate::text::tokens(header)).extension_hits, 1);

        let js = catalog.language("javascript").unwrap();
        let json = "load('package.json')";
        assert_eq!(js.evidence(json, &crate::text::tokens(json)).extension_hits, 0);
    }

    #[test]
    fn test_frameworks_in() {
        let catalog = Catalog::new().unwrap();
        let js = catalog.language("javascript").unwrap();
        let frameworks = js.frameworks_in("import React from 'react';\nconst [a, b] = useState(0);");
        assert_eq!(frameworks, vec!["react"]);
    }

    #[test]
    fn test_topic_hits() {
        let catalog = Catalog::new().unwrap();
        let auth = catalog.topic("auth").unwrap();
        assert!(auth.hits("function login(user, password) { return jwt.sign(user); }") >= 3);
        assert_eq!(auth.hits("let total = a + b;"), 0);
    }

    #[test]
    fn test_vocabulary_markers() {
        let catalog = Catalog::new().unwrap();
        let vocab = &catalog.vocabulary;
        assert!(vocab.continuation_marker.is_match("foo();\n// TODO: more below"));
        assert!(!vocab.continuation_marker.is_match("for (;;) { continue; }"));
        assert!(vocab.improvement.is_match("// improved error handling"));
        assert!(vocab.refactor.is_match("# refactored into helpers"));
    }
}
