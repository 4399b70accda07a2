// src/search/lexer.rs
//
// Turns a query string into a flat sequence of structural tokens and
// already-parsed atom nodes (spec.md §4.3.1 `token`, `not_token`,
// `field_token`, `unmod_token`). Keeping atom lexing and grammar shape
// (AND-by-adjacency, OR-by-`|`, grouping) separate lets the grammar parser
// in `parser.rs` stay a small, obviously-correct recursive descent over this
// token list.

use super::ast::{LeafKind, Node, NumOp};
use regex::RegexBuilder;

#[derive(Debug, Clone)]
pub enum RawTok {
    LParen(usize),
    RParen(usize),
    Pipe(usize),
    Atom(Node),
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')' || c == '|'
}

pub fn lex(input: &str) -> Vec<RawTok> {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut i = 0usize;
    let mut toks = Vec::new();

    while i < len {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                toks.push(RawTok::LParen(i));
                i += 1;
            }
            ')' => {
                toks.push(RawTok::RParen(i));
                i += 1;
            }
            '|' => {
                toks.push(RawTok::Pipe(i));
                i += 1;
            }
            '-' => {
                let start = i;
                i += 1;
                if i >= len || is_boundary(chars[i]) {
                    toks.push(RawTok::Atom(Node::Error(super::ast::ErrorSpan {
                        start,
                        end: i,
                        message: "'-' with no following token".into(),
                    })));
                } else if chars[i] == '$' {
                    let (node, new_i) = lex_field(&chars, i);
                    toks.push(RawTok::Atom(negate(node)));
                    i = new_i;
                } else {
                    let (res, new_i) = lex_unmod(&chars, i);
                    let node = leaf_result_to_node(res, i, new_i);
                    toks.push(RawTok::Atom(negate(node)));
                    i = new_i;
                }
            }
            '$' => {
                let (node, new_i) = lex_field(&chars, i);
                toks.push(RawTok::Atom(node));
                i = new_i;
            }
            _ => {
                let (res, new_i) = lex_unmod(&chars, i);
                let node = leaf_result_to_node(res, i, new_i);
                toks.push(RawTok::Atom(node));
                i = new_i;
            }
        }
    }

    toks
}

fn negate(node: Node) -> Node {
    match node {
        Node::Error(_) => node,
        other => Node::Not(Box::new(other)),
    }
}

fn leaf_result_to_node(res: Result<LeafKind, String>, start: usize, end: usize) -> Node {
    match res {
        Ok(kind) => Node::Leaf(super::ast::Leaf { kind, start, end }),
        Err(message) => Node::Error(super::ast::ErrorSpan { start, end, message }),
    }
}

/// `unmod_token := fuzzy | regexp | tag | simple`
fn lex_unmod(chars: &[char], i: usize) -> (Result<LeafKind, String>, usize) {
    let c = chars[i];
    match c {
        '~' => lex_fuzzy(chars, i),
        '#' => lex_tag(chars, i),
        '"' => lex_quoted(chars, i, true),
        '\'' => lex_quoted(chars, i, false),
        '/' => lex_regex(chars, i, false),
        'c' if chars.get(i + 1) == Some(&'/') => lex_regex(chars, i + 1, true),
        _ => {
            let (word, new_i) = lex_word(chars, i);
            (Ok(LeafKind::ExactCi(word)), new_i)
        }
    }
}

/// `simple := DQUOTE | SQUOTE | WORD`
fn lex_simple(chars: &[char], i: usize) -> (Result<LeafKind, String>, usize) {
    match chars[i] {
        '"' => lex_quoted(chars, i, true),
        '\'' => lex_quoted(chars, i, false),
        _ => {
            let (word, new_i) = lex_word(chars, i);
            (Ok(LeafKind::ExactCi(word)), new_i)
        }
    }
}

/// `fuzzy := '~' simple`
fn lex_fuzzy(chars: &[char], i: usize) -> (Result<LeafKind, String>, usize) {
    let start = i;
    let j = i + 1;
    if j >= chars.len() || is_boundary(chars[j]) {
        return (
            Err("'~' with no following token".into()),
            start + 1,
        );
    }
    let (inner, new_i) = lex_simple(chars, j);
    let mapped = inner.map(|k| match k {
        LeafKind::ExactCi(text) => LeafKind::FuzzyCi(text),
        LeafKind::ExactCs(text) => LeafKind::FuzzyCs(text),
        other => other,
    });
    (mapped, new_i)
}

/// `tag := '#' WORD ['/']`
fn lex_tag(chars: &[char], i: usize) -> (Result<LeafKind, String>, usize) {
    let j = i + 1;
    let (word, new_i) = lex_word(chars, j);
    if word.is_empty() {
        return (Err("'#' with no tag name".into()), new_i);
    }
    let exact = word.ends_with('/');
    let name = if exact {
        word[..word.len() - 1].to_string()
    } else {
        word
    };
    if name.is_empty() {
        return (Err("'#' with no tag name".into()), new_i);
    }
    let kind = match name.to_lowercase().as_str() {
        "marked" | "m" => LeafKind::Marked,
        "userquery" => LeafKind::UserQuery,
        _ => LeafKind::Tag { name, exact },
    };
    (Ok(kind), new_i)
}

/// `regexp := '/' <regex> '/' | 'c/' <regex> '/'`. `i` points at the opening
/// `/` (the caller has already consumed a leading `c` for the case-sensitive
/// form).
fn lex_regex(chars: &[char], i: usize, case_sensitive: bool) -> (Result<LeafKind, String>, usize) {
    let len = chars.len();
    let mut j = i + 1;
    let mut pattern = String::new();
    loop {
        if j >= len {
            return (Err("unterminated regex literal".into()), j);
        }
        if chars[j] == '\\' && j + 1 < len && chars[j + 1] == '/' {
            pattern.push('/');
            j += 2;
            continue;
        }
        if chars[j] == '/' {
            j += 1;
            break;
        }
        pattern.push(chars[j]);
        j += 1;
    }

    let compiled = RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .build();

    match compiled {
        Ok(_) if case_sensitive => (Ok(LeafKind::RegexCs(pattern)), j),
        Ok(_) => (Ok(LeafKind::RegexCi(pattern)), j),
        Err(e) => (Err(format!("invalid regex: {}", e)), j),
    }
}

/// `DQUOTE` / `SQUOTE`. `quote_char` is `"` or `'`; `i` points at the opening
/// quote. Supports `\"`/`\'` as an escaped literal quote.
fn lex_quoted(chars: &[char], i: usize, double: bool) -> (Result<LeafKind, String>, usize) {
    let quote_char = if double { '"' } else { '\'' };
    let len = chars.len();
    let mut j = i + 1;
    let mut buf = String::new();
    loop {
        if j >= len {
            return (Err("unterminated quoted string".into()), j);
        }
        if chars[j] == '\\' && j + 1 < len && chars[j + 1] == quote_char {
            buf.push(quote_char);
            j += 2;
            continue;
        }
        if chars[j] == quote_char {
            j += 1;
            break;
        }
        buf.push(chars[j]);
        j += 1;
    }
    let kind = if double {
        LeafKind::ExactCi(buf)
    } else {
        LeafKind::ExactCs(buf)
    };
    (Ok(kind), j)
}

/// Maximal run of non-boundary characters starting at `i`.
fn lex_word(chars: &[char], i: usize) -> (String, usize) {
    let len = chars.len();
    let mut j = i;
    while j < len && !is_boundary(chars[j]) {
        j += 1;
    }
    (chars[i..j].iter().collect(), j)
}

fn try_parse_numeric(text: &str) -> Option<(NumOp, f64)> {
    let (op, rest) = if let Some(r) = text.strip_prefix(">=") {
        (NumOp::Ge, r)
    } else if let Some(r) = text.strip_prefix("<=") {
        (NumOp::Le, r)
    } else if let Some(r) = text.strip_prefix('>') {
        (NumOp::Gt, r)
    } else if let Some(r) = text.strip_prefix('<') {
        (NumOp::Lt, r)
    } else {
        (NumOp::Eq, text)
    };
    rest.parse::<f64>().ok().map(|v| (op, v))
}

/// `field_token := '$' WORD` (see module docs on the split between "value
/// glued to the word" and "value delegated to the following unmod_token").
fn lex_field(chars: &[char], i: usize) -> (Node, usize) {
    let start = i;
    let len = chars.len();
    let name_start = i + 1;
    let mut j = name_start;
    while j < len && chars[j] != ':' && !is_boundary(chars[j]) {
        j += 1;
    }
    let field_name: String = chars[name_start..j].iter().collect();

    if j >= len || chars[j] != ':' {
        let mut k = j;
        while k < len && !is_boundary(chars[k]) {
            k += 1;
        }
        return (
            Node::Error(super::ast::ErrorSpan {
                start,
                end: k,
                message: "field token has no ':'".into(),
            }),
            k,
        );
    }

    if field_name.is_empty() {
        let mut k = j + 1;
        while k < len && !is_boundary(chars[k]) {
            k += 1;
        }
        return (
            Node::Error(super::ast::ErrorSpan {
                start,
                end: k,
                message: "field token has no field name".into(),
            }),
            k,
        );
    }

    let value_start = j + 1;
    if value_start >= len || is_boundary(chars[value_start]) {
        return (
            Node::Error(super::ast::ErrorSpan {
                start,
                end: value_start,
                message: "field token has no value".into(),
            }),
            value_start,
        );
    }

    let vc = chars[value_start];
    let is_special = matches!(vc, '"' | '\'' | '~' | '/' | '#')
        || (vc == 'c' && chars.get(value_start + 1) == Some(&'/'));

    if is_special {
        let (res, new_i) = lex_unmod(chars, value_start);
        match res {
            Ok(kind) => (
                Node::Leaf(super::ast::Leaf {
                    kind: LeafKind::Field {
                        field: field_name,
                        value: Box::new(kind),
                    },
                    start,
                    end: new_i,
                }),
                new_i,
            ),
            Err(message) => (
                Node::Error(super::ast::ErrorSpan {
                    start,
                    end: new_i,
                    message,
                }),
                new_i,
            ),
        }
    } else {
        let mut k = value_start;
        while k < len && !is_boundary(chars[k]) {
            k += 1;
        }
        let value_text: String = chars[value_start..k].iter().collect();
        let kind = if let Some((op, value)) = try_parse_numeric(&value_text) {
            LeafKind::Numeric {
                field: field_name,
                op,
                value,
            }
        } else {
            LeafKind::Field {
                field: field_name,
                value: Box::new(LeafKind::ExactCi(value_text)),
            }
        };
        (
            Node::Leaf(super::ast::Leaf {
                kind,
                start,
                end: k,
            }),
            k,
        )
    }
}
