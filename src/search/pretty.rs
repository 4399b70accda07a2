// src/search/pretty.rs
//
// Renders an AST node back into query text. Exists so the round-trip
// property `parse(pretty(tree)) == tree` (spec.md's parser invariant) can be
// exercised directly: spans are recomputed by the reparse, so pretty-printed
// output only needs to be *parseable back to an equal tree*, not
// byte-identical to whatever the user originally typed.

use super::ast::{LeafKind, Node, NumOp};

pub fn pretty(node: &Node) -> String {
    match node {
        Node::And(parts) => parts.iter().map(pretty_atom).collect::<Vec<_>>().join(" "),
        Node::Or(parts) => parts.iter().map(pretty_atom).collect::<Vec<_>>().join(" | "),
        Node::Not(inner) => format!("-{}", pretty_negatable(inner)),
        Node::Leaf(leaf) => pretty_leaf(&leaf.kind),
        Node::Error(_) => String::new(),
    }
}

fn pretty_atom(node: &Node) -> String {
    match node {
        Node::And(_) | Node::Or(_) => format!("({})", pretty(node)),
        _ => pretty(node),
    }
}

fn pretty_negatable(node: &Node) -> String {
    match node {
        Node::Leaf(leaf) => pretty_leaf(&leaf.kind),
        other => format!("({})", pretty(other)),
    }
}

fn pretty_leaf(kind: &LeafKind) -> String {
    match kind {
        LeafKind::ExactCi(s) => {
            if needs_quoting(s) {
                format!("\"{}\"", escape(s, '"'))
            } else {
                s.clone()
            }
        }
        LeafKind::ExactCs(s) => format!("'{}'", escape(s, '\'')),
        LeafKind::FuzzyCi(s) => format!("~{}", pretty_leaf(&LeafKind::ExactCi(s.clone()))),
        LeafKind::FuzzyCs(s) => format!("~{}", pretty_leaf(&LeafKind::ExactCs(s.clone()))),
        LeafKind::RegexCi(src) => format!("/{}/", escape(src, '/')),
        LeafKind::RegexCs(src) => format!("c/{}/", escape(src, '/')),
        LeafKind::Tag { name, exact } => {
            if *exact {
                format!("#{}/", name)
            } else {
                format!("#{}", name)
            }
        }
        LeafKind::Marked => "#marked".to_string(),
        LeafKind::UserQuery => "#userquery".to_string(),
        LeafKind::Numeric { field, op, value } => {
            format!("${}:{}{}", field, op_str(*op), format_num(*value))
        }
        LeafKind::Field { field, value } => format!("${}:{}", field, pretty_leaf(value)),
    }
}

fn op_str(op: NumOp) -> &'static str {
    match op {
        NumOp::Gt => ">",
        NumOp::Lt => "<",
        NumOp::Ge => ">=",
        NumOp::Le => "<=",
        NumOp::Eq => "",
    }
}

fn format_num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

fn needs_quoting(s: &str) -> bool {
    if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '(' || c == ')' || c == '|') {
        return true;
    }
    // A leading character the lexer treats specially would otherwise be
    // reinterpreted on reparse (as a fuzzy/tag/regex marker) instead of as
    // the start of a plain word.
    match s.chars().next() {
        Some('~') | Some('#') | Some('/') | Some('"') | Some('\'') | Some('-') | Some('$') => true,
        Some('c') if s.starts_with("c/") => true,
        _ => false,
    }
}

fn escape(s: &str, quote: char) -> String {
    s.replace(quote, &format!("\\{}", quote))
}
