//! Build constraints: which `.go` files the Go toolchain would compile for a
//! target platform.
//!
//! Two mechanisms decide it. File names ending in `_GOOS`, `_GOARCH` or
//! `_GOOS_GOARCH` only build on that platform, and a `//go:build` line (or the
//! older `// +build` lines) in the file header gates the whole file.

use std::path::Path;
use tracing::trace;

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

/// Target platform and extra tags files are selected for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub goos: String,
    pub goarch: String,
    /// User tags, as passed to `go build -tags`
    pub tags: Vec<String>,
}

impl Default for BuildContext {
    /// `GOOS`/`GOARCH` from the environment, else the host platform
    fn default() -> Self {
        Self::new(
            std::env::var("GOOS").unwrap_or_else(|_| host_os().to_string()),
            std::env::var("GOARCH").unwrap_or_else(|_| host_arch().to_string()),
        )
    }
}

impl BuildContext {
    pub fn new(goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        Self {
            goos: goos.into(),
            goarch: goarch.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Whether a single build tag holds for this context
    pub fn satisfies(&self, tag: &str) -> bool {
        if tag == "ignore" {
            return false;
        }
        if tag == self.goos || tag == self.goarch || tag == "gc" {
            return true;
        }
        let implied = match self.goos.as_str() {
            "android" => tag == "linux",
            "ios" => tag == "darwin",
            "illumos" => tag == "solaris",
            _ => false,
        };
        if implied || (tag == "unix" && UNIX_OS.contains(&self.goos.as_str())) {
            return true;
        }
        if let Some(minor) = tag.strip_prefix("go1.") {
            return minor.parse::<u32>().is_ok();
        }
        self.tags.iter().any(|t| t == tag)
    }

    /// File name suffix check: `stat_linux.go`, `asm_amd64.go`, `zsys_linux_arm64.go`
    pub fn matches_file_name(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let stem = name.strip_suffix(".go").unwrap_or(name);
        let stem = stem.strip_suffix("_test").unwrap_or(stem);

        let parts: Vec<&str> = stem.split('_').collect();
        // The first element is the base name; `linux.go` carries no constraint
        if parts.len() < 2 {
            return true;
        }

        let last = parts[parts.len() - 1];
        let before = parts[parts.len() - 2];

        if parts.len() >= 3 && KNOWN_OS.contains(&before) && KNOWN_ARCH.contains(&last) {
            return self.satisfies(before) && self.satisfies(last);
        }
        if KNOWN_OS.contains(&last) || KNOWN_ARCH.contains(&last) {
            return self.satisfies(last);
        }
        true
    }

    /// Header check: `//go:build` wins over `// +build` lines
    pub fn matches_source(&self, source: &str) -> bool {
        let header = ConstraintHeader::scan(source);

        if let Some(expr) = header.go_build {
            return match parse_expr(expr) {
                Some(constraint) => constraint.eval(self),
                None => {
                    trace!("Unparsable build constraint treated as unsatisfied: {}", expr);
                    false
                }
            };
        }

        // Lines are ANDed, space-separated options ORed, commas ANDed
        header.plus_build.iter().all(|line| {
            line.split_whitespace().any(|option| {
                option.split(',').all(|term| match term.strip_prefix('!') {
                    Some(tag) => !self.satisfies(tag),
                    None => self.satisfies(term),
                })
            })
        })
    }

    /// Both checks, reading the file when the name passes
    pub fn matches_file(&self, path: &Path) -> bool {
        if !self.matches_file_name(path) {
            return false;
        }
        match std::fs::read_to_string(path) {
            Ok(source) => self.matches_source(&source),
            // Leave unreadable files to the parser, which reports the error
            Err(_) => true,
        }
    }
}

/// Go spelling of the host OS
pub fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Go spelling of the host architecture
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        "wasm32" => "wasm",
        other => other,
    }
}

/// Constraint lines found before the package clause
struct ConstraintHeader<'a> {
    go_build: Option<&'a str>,
    plus_build: Vec<&'a str>,
}

impl<'a> ConstraintHeader<'a> {
    fn scan(source: &'a str) -> Self {
        let mut header = Self {
            go_build: None,
            plus_build: Vec::new(),
        };
        let mut in_block = false;

        for line in source.lines() {
            let line = line.trim();
            if in_block {
                if line.contains("*/") {
                    in_block = false;
                }
                continue;
            }
            if line.is_empty() {
                continue;
            }
            if line.starts_with("/*") {
                in_block = !line.contains("*/");
                continue;
            }
            let Some(comment) = line.strip_prefix("//") else {
                // package clause or any other code ends the header
                break;
            };
            if let Some(expr) = comment.strip_prefix("go:build") {
                if header.go_build.is_none() {
                    header.go_build = Some(expr.trim());
                }
            } else if let Some(rest) = comment.trim_start().strip_prefix("+build") {
                header.plus_build.push(rest.trim());
            }
        }

        header
    }
}

/// Parsed `//go:build` expression
#[derive(Debug, Clone, PartialEq, Eq)]
enum Constraint {
    Tag(String),
    Not(Box<Constraint>),
    And(Box<Constraint>, Box<Constraint>),
    Or(Box<Constraint>, Box<Constraint>),
}

impl Constraint {
    fn eval(&self, ctx: &BuildContext) -> bool {
        match self {
            Constraint::Tag(tag) => ctx.satisfies(tag),
            Constraint::Not(inner) => !inner.eval(ctx),
            Constraint::And(a, b) => a.eval(ctx) && b.eval(ctx),
            Constraint::Or(a, b) => a.eval(ctx) || b.eval(ctx),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Tag(&'a str),
    Not,
    And,
    Or,
    Open,
    Close,
}

fn tokenize(expr: &str) -> Option<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = expr.trim_start();

    while let Some(c) = rest.chars().next() {
        let (token, len) = match c {
            '!' => (Token::Not, 1),
            '(' => (Token::Open, 1),
            ')' => (Token::Close, 1),
            '&' if rest.starts_with("&&") => (Token::And, 2),
            '|' if rest.starts_with("||") => (Token::Or, 2),
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let len = rest
                    .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
                    .unwrap_or(rest.len());
                (Token::Tag(&rest[..len]), len)
            }
            _ => return None,
        };
        tokens.push(token);
        rest = rest[len..].trim_start();
    }

    Some(tokens)
}

/// `expr := and ('||' and)*`, `and := unary ('&&' unary)*`,
/// `unary := '!' unary | '(' expr ')' | tag`
fn parse_expr(expr: &str) -> Option<Constraint> {
    let tokens = tokenize(expr)?;
    let mut pos = 0;
    let constraint = parse_or(&tokens, &mut pos)?;
    (pos == tokens.len()).then_some(constraint)
}

fn parse_or(tokens: &[Token], pos: &mut usize) -> Option<Constraint> {
    let mut left = parse_and(tokens, pos)?;
    while tokens.get(*pos) == Some(&Token::Or) {
        *pos += 1;
        let right = parse_and(tokens, pos)?;
        left = Constraint::Or(Box::new(left), Box::new(right));
    }
    Some(left)
}

fn parse_and(tokens: &[Token], pos: &mut usize) -> Option<Constraint> {
    let mut left = parse_unary(tokens, pos)?;
    while tokens.get(*pos) == Some(&Token::And) {
        *pos += 1;
        let right = parse_unary(tokens, pos)?;
        left = Constraint::And(Box::new(left), Box::new(right));
    }
    Some(left)
}

fn parse_unary(tokens: &[Token], pos: &mut usize) -> Option<Constraint> {
    let token = tokens.get(*pos)?;
    *pos += 1;
    match token {
        Token::Not => Some(Constraint::Not(Box::new(parse_unary(tokens, pos)?))),
        Token::Open => {
            let inner = parse_or(tokens, pos)?;
            if tokens.get(*pos) != Some(&Token::Close) {
                return None;
            }
            *pos += 1;
            Some(inner)
        }
        Token::Tag(tag) => Some(Constraint::Tag(tag.to_string())),
        _ => None,
    }
}
