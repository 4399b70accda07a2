// src/search/parser.rs
//
// Grammar layer over `lexer::lex`'s flat token stream: adjacency means AND,
// `|` means OR (lower precedence than adjacency), parens group, and nothing
// the lexer hands back ever aborts the whole parse — grouping mismatches
// just turn into `Node::Error` leaves at the offending span so a partially
// malformed query still returns a best-effort tree (spec.md §7).

use super::ast::Node;
use super::lexer::{lex, RawTok};

/// Parses a full query string into a single tree. Never fails: unparsable
/// spans become `Node::Error` leaves rather than aborting.
pub fn parse(input: &str) -> Node {
    let toks = lex(input);
    let mut pos = 0usize;
    let node = parse_or(&toks, &mut pos, input.chars().count());
    if pos < toks.len() {
        // Trailing unmatched `)` tokens: fold them in as empty-span errors
        // rather than silently dropping them.
        let mut extra = vec![node];
        while pos < toks.len() {
            if let RawTok::RParen(p) = toks[pos] {
                extra.push(Node::Error(super::ast::ErrorSpan {
                    start: p,
                    end: p + 1,
                    message: "unmatched ')'".into(),
                }));
            }
            pos += 1;
        }
        return Node::And(extra);
    }
    node
}

/// `or_expr := and_expr ('|' and_expr)*`
fn parse_or(toks: &[RawTok], pos: &mut usize, end_of_input: usize) -> Node {
    let mut branches = vec![parse_and(toks, pos, end_of_input)];
    while let Some(RawTok::Pipe(_)) = toks.get(*pos) {
        *pos += 1;
        branches.push(parse_and(toks, pos, end_of_input));
    }
    if branches.len() == 1 {
        branches.pop().unwrap()
    } else {
        Node::Or(branches)
    }
}

/// `and_expr := atom+` where an `atom` is a leaf/error/group; stops at `|`,
/// `)`, or end of stream.
fn parse_and(toks: &[RawTok], pos: &mut usize, end_of_input: usize) -> Node {
    let mut parts = Vec::new();
    loop {
        match toks.get(*pos) {
            None | Some(RawTok::Pipe(_)) | Some(RawTok::RParen(_)) => break,
            Some(RawTok::LParen(open)) => {
                let open = *open;
                *pos += 1;
                let inner = parse_or(toks, pos, end_of_input);
                match toks.get(*pos) {
                    Some(RawTok::RParen(_)) => {
                        *pos += 1;
                        parts.push(inner);
                    }
                    _ => {
                        // Unterminated group: keep what parsed, flag the
                        // opening paren.
                        parts.push(Node::Error(super::ast::ErrorSpan {
                            start: open,
                            end: open + 1,
                            message: "unterminated '('".into(),
                        }));
                        parts.push(inner);
                    }
                }
            }
            Some(RawTok::Atom(node)) => {
                parts.push(node.clone());
                *pos += 1;
            }
        }
    }

    if parts.is_empty() {
        Node::Error(super::ast::ErrorSpan {
            start: end_of_input,
            end: end_of_input,
            message: "empty expression".into(),
        })
    } else if parts.len() == 1 {
        parts.pop().unwrap()
    } else {
        Node::And(parts)
    }
}
