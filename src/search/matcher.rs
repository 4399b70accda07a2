// src/search/matcher.rs
//
// Compiles a `Node` tree into a `Matcher` that can be evaluated repeatedly
// against many lines without re-parsing or re-compiling regexes (spec.md
// §4.3.3: "compilation is a separate, one-time step from evaluation").
// Evaluation is short-circuiting: `And`/`Or` stop at the first
// false/true child.

use super::ast::{LeafKind, Node, NumOp};
use super::fuzzy::{fuzzy_score, fuzzy_score_ci};
use regex::{Regex, RegexBuilder};

/// What a compiled leaf needs from the thing being matched. A log line
/// implements this over its text/fields/tags; other peers can implement it
/// over whatever they search.
pub trait MatchContext {
    /// Full searchable text of the record (what bare/quoted/fuzzy/regex
    /// leaves without a `$field:` prefix match against).
    fn text(&self) -> &str;
    /// String value of a named field, if present.
    fn field_text(&self, field: &str) -> Option<&str>;
    /// Numeric value of a named field, if present and numeric.
    fn field_numeric(&self, field: &str) -> Option<f64>;
    /// Tags attached to the record.
    fn tags(&self) -> &[String];
    /// `#marked` — whether this record has been marked by the user.
    fn is_marked(&self) -> bool;
    /// `#userquery` — whether this record originated from a user-issued
    /// query rather than system-generated output.
    fn is_user_query(&self) -> bool;
}

#[derive(Debug)]
enum CompiledLeaf {
    ExactCi(String),
    ExactCs(String),
    FuzzyCi(String),
    FuzzyCs(String),
    RegexCi(Regex),
    RegexCs(Regex),
    Tag { name: String, exact: bool },
    Marked,
    UserQuery,
    Numeric { field: String, op: NumOp, value: f64 },
    Field { field: String, inner: Box<CompiledLeaf> },
    /// A leaf that failed to compile (should not happen for a
    /// already-validated AST, but kept total rather than panicking).
    Never,
}

#[derive(Debug)]
pub enum Matcher {
    And(Vec<Matcher>),
    Or(Vec<Matcher>),
    Not(Box<Matcher>),
    Leaf(CompiledLeaf),
    /// A parse-error node always fails to match.
    Never,
}

/// Compiles an AST node into an evaluatable matcher. Regex leaves were
/// already validated during lexing, so compilation here cannot meaningfully
/// fail; a defensive `Never` is used if it somehow does.
pub fn compile(node: &Node) -> Matcher {
    match node {
        Node::And(parts) => Matcher::And(parts.iter().map(compile).collect()),
        Node::Or(parts) => Matcher::Or(parts.iter().map(compile).collect()),
        Node::Not(inner) => Matcher::Not(Box::new(compile(inner))),
        Node::Error(_) => Matcher::Never,
        Node::Leaf(leaf) => Matcher::Leaf(compile_leaf(&leaf.kind)),
    }
}

fn compile_leaf(kind: &LeafKind) -> CompiledLeaf {
    match kind {
        LeafKind::ExactCi(s) => CompiledLeaf::ExactCi(s.to_lowercase()),
        LeafKind::ExactCs(s) => CompiledLeaf::ExactCs(s.clone()),
        LeafKind::FuzzyCi(s) => CompiledLeaf::FuzzyCi(s.to_lowercase()),
        LeafKind::FuzzyCs(s) => CompiledLeaf::FuzzyCs(s.clone()),
        LeafKind::RegexCi(src) => match RegexBuilder::new(src).case_insensitive(true).build() {
            Ok(re) => CompiledLeaf::RegexCi(re),
            Err(_) => CompiledLeaf::Never,
        },
        LeafKind::RegexCs(src) => match Regex::new(src) {
            Ok(re) => CompiledLeaf::RegexCs(re),
            Err(_) => CompiledLeaf::Never,
        },
        LeafKind::Tag { name, exact } => CompiledLeaf::Tag {
            name: name.clone(),
            exact: *exact,
        },
        LeafKind::Marked => CompiledLeaf::Marked,
        LeafKind::UserQuery => CompiledLeaf::UserQuery,
        LeafKind::Numeric { field, op, value } => CompiledLeaf::Numeric {
            field: field.clone(),
            op: *op,
            value: *value,
        },
        LeafKind::Field { field, value } => CompiledLeaf::Field {
            field: field.clone(),
            inner: Box::new(compile_leaf(value)),
        },
    }
}

impl Matcher {
    pub fn eval(&self, ctx: &dyn MatchContext) -> bool {
        match self {
            Matcher::And(parts) => parts.iter().all(|m| m.eval(ctx)),
            Matcher::Or(parts) => parts.iter().any(|m| m.eval(ctx)),
            Matcher::Not(inner) => !inner.eval(ctx),
            Matcher::Never => false,
            Matcher::Leaf(leaf) => eval_leaf(leaf, ctx, None),
        }
    }
}

fn eval_leaf(leaf: &CompiledLeaf, ctx: &dyn MatchContext, field_override: Option<&str>) -> bool {
    match leaf {
        CompiledLeaf::ExactCi(needle) => text_source(ctx, field_override)
            .map(|t| t.to_lowercase().contains(needle.as_str()))
            .unwrap_or(false),
        CompiledLeaf::ExactCs(needle) => text_source(ctx, field_override)
            .map(|t| t.contains(needle.as_str()))
            .unwrap_or(false),
        CompiledLeaf::FuzzyCi(needle) => text_source(ctx, field_override)
            .map(|t| fuzzy_score_ci(t, needle).is_some())
            .unwrap_or(false),
        CompiledLeaf::FuzzyCs(needle) => text_source(ctx, field_override)
            .map(|t| fuzzy_score(t, needle).is_some())
            .unwrap_or(false),
        CompiledLeaf::RegexCi(re) => text_source(ctx, field_override)
            .map(|t| re.is_match(t))
            .unwrap_or(false),
        CompiledLeaf::RegexCs(re) => text_source(ctx, field_override)
            .map(|t| re.is_match(t))
            .unwrap_or(false),
        CompiledLeaf::Tag { name, exact } => ctx.tags().iter().any(|t| {
            if *exact {
                t == name
            } else {
                t.eq_ignore_ascii_case(name) || t.to_lowercase().starts_with(&name.to_lowercase())
            }
        }),
        CompiledLeaf::Marked => ctx.is_marked(),
        CompiledLeaf::UserQuery => ctx.is_user_query(),
        CompiledLeaf::Numeric { field, op, value } => match ctx.field_numeric(field) {
            Some(actual) => match op {
                NumOp::Gt => actual > *value,
                NumOp::Lt => actual < *value,
                NumOp::Ge => actual >= *value,
                NumOp::Le => actual <= *value,
                NumOp::Eq => (actual - *value).abs() < f64::EPSILON,
            },
            None => false,
        },
        CompiledLeaf::Field { field, inner } => eval_leaf(inner, ctx, Some(field.as_str())),
        CompiledLeaf::Never => false,
    }
}

fn text_source<'a>(ctx: &'a dyn MatchContext, field_override: Option<&str>) -> Option<&'a str> {
    match field_override {
        Some(field) => ctx.field_text(field),
        None => Some(ctx.text()),
    }
}

/// Convenience: returns the fuzzy score of a match if the tree is a single
/// fuzzy leaf and it matched; used by callers that want to rank results
/// rather than just filter them (spec.md §4.3.2, "results ranked by fuzzy
/// score when the top-level query is a single fuzzy leaf").
pub fn fuzzy_rank_score(node: &Node, ctx: &dyn MatchContext) -> Option<i64> {
    let Node::Leaf(leaf) = node else { return None };
    match &leaf.kind {
        LeafKind::FuzzyCi(needle) => fuzzy_score_ci(ctx.text(), needle),
        LeafKind::FuzzyCs(needle) => fuzzy_score(ctx.text(), needle),
        _ => None,
    }
}
