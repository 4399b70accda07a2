// src/goroutine/stack_parser.rs
//
// Parses the managed runtime's textual stack dump for one goroutine
// (spec.md §4.4.4 / S6) into a structured `ParsedGoRoutine`. The dump
// format itself is an opaque blob from this crate's point of view — only
// the shapes named in the spec are recognized; anything else is preserved
// as best-effort text.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref HEADER_RE: Regex =
        Regex::new(r"^goroutine (\d+) \[(.*)\]:$").expect("static regex");
    static ref CREATED_BY_RE: Regex =
        Regex::new(r"^created by (.+) in goroutine (\d+)").expect("static regex");
    static ref FILE_LINE_RE: Regex =
        Regex::new(r"^\s*(\S+\.go):(\d+)(?:\s+(\+0x[0-9a-fA-F]+))?\s*$").expect("static regex");
    /// `pkg.(*Type).Method(args)` / `pkg.Type.Method(args)` / `pkg.Func(args)`,
    /// ordered most-specific first. `args` only captures up to the first
    /// paren; the real arg text is re-extracted via balanced-paren scanning.
    /// Package paths may contain `/` (and, for the plain-func case, further
    /// `.` as in domain-style import paths); only frame lines carrying an
    /// actual call are matched here, so the trailing `(` stays mandatory.
    static ref FUNC_LINE_RE: Regex = Regex::new(
        r"^\s*(?:(?:[A-Za-z0-9_./]+\.)?(?P<recv_type>\(\*[A-Za-z0-9_]+\))\.(?P<recv_method>[A-Za-z0-9_]+)|(?P<plain_type>[A-Za-z0-9_/]+)\.(?P<plain_method>[A-Za-z0-9_]+)|(?P<func>[A-Za-z0-9_./]+))\("
    )
    .expect("static regex");
    static ref DURATION_RE: Regex =
        Regex::new(r"^(\d+) (ns|us|µs|ms|seconds?|minutes?|hours?|days?)$").expect("static regex");
}

const SELF_STACK_SANDWICH: [&str; 4] = [
    "created by outrig.(*GoRoutine).Run",
    "runtime.goexit",
    "outrig.(*GoRoutine).Run.func1",
    "outrig.(*GoRoutine).Run",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub package: String,
    pub receiver: Option<String>,
    pub function: String,
    pub args: String,
    pub file: Option<String>,
    pub line: Option<u64>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedGoRoutine {
    pub go_id: u64,
    pub raw_state: String,
    pub primary_state: String,
    pub state_duration_ms: Option<u64>,
    pub extra_states: Vec<String>,
    pub frames: Vec<Frame>,
    pub created_by_go_id: Option<u64>,
    pub created_by_frame: Option<Frame>,
}

impl ParsedGoRoutine {
    /// A placeholder record for a goroutine the peer needs to answer about
    /// but has no parseable stack for (spec.md §7: "surface a minimal
    /// ParsedGoRoutine when the peer needs a record at all").
    pub fn inactive(go_id: u64) -> Self {
        ParsedGoRoutine {
            go_id,
            raw_state: String::new(),
            primary_state: "inactive".to_string(),
            state_duration_ms: None,
            extra_states: Vec::new(),
            frames: Vec::new(),
            created_by_go_id: None,
            created_by_frame: None,
        }
    }
}

/// Splits the bracketed header state into `(primary, duration_ms,
/// extra_states)` (spec.md §4.4.4 "State components").
fn split_state(raw_state: &str) -> (String, Option<u64>, Vec<String>) {
    let parts: Vec<&str> = raw_state.split(',').map(|s| s.trim()).collect();
    let primary = parts.first().copied().unwrap_or("").to_string();
    let mut duration_ms = None;
    let mut extras = Vec::new();
    for part in parts.iter().skip(1) {
        if let Some(caps) = DURATION_RE.captures(part) {
            let n: u64 = caps[1].parse().unwrap_or(0);
            let unit = &caps[2];
            let ms = match unit {
                "ns" => n / 1_000_000,
                "us" | "µs" => n / 1_000,
                "ms" => n,
                u if u.starts_with("second") => n * 1_000,
                u if u.starts_with("minute") => n * 60_000,
                u if u.starts_with("hour") => n * 3_600_000,
                u if u.starts_with("day") => n * 86_400_000,
                _ => n,
            };
            duration_ms = Some(ms);
        } else {
            extras.push(part.to_string());
        }
    }
    (primary, duration_ms, extras)
}

/// Extracts the content of the outermost balanced parens starting at
/// `open_idx` (the index of the `(`), returning `(args, consumed_len)`.
fn extract_balanced_args(s: &str, open_idx: usize) -> Option<(String, usize)> {
    let bytes: Vec<char> = s.chars().collect();
    if bytes.get(open_idx) != Some(&'(') {
        return None;
    }
    let mut depth = 0i32;
    let mut i = open_idx;
    while i < bytes.len() {
        match bytes[i] {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let inner: String = bytes[open_idx + 1..i].iter().collect();
                    return Some((inner, i - open_idx + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Package is everything up to the first `.` occurring after the last `/`.
fn split_package(qualified: &str) -> (String, String) {
    let slash_idx = qualified.rfind('/').map(|i| i + 1).unwrap_or(0);
    match qualified[slash_idx..].find('.') {
        Some(rel_dot) => {
            let dot = slash_idx + rel_dot;
            (qualified[..dot].to_string(), qualified[dot + 1..].to_string())
        }
        None => (String::new(), qualified.to_string()),
    }
}

fn parse_func_line(line: &str) -> Option<Frame> {
    let caps = FUNC_LINE_RE.captures(line)?;
    let whole_match = caps.get(0)?;
    let open_paren_idx = whole_match.end() - 1;
    let (args, _) = extract_balanced_args(line, open_paren_idx).unwrap_or((String::new(), 0));

    if let (Some(recv_type), Some(recv_method)) =
        (caps.name("recv_type"), caps.name("recv_method"))
    {
        let prefix = &line[..recv_type.start()];
        let package = prefix.trim_end_matches('.').trim().to_string();
        return Some(Frame {
            package,
            receiver: Some(recv_type.as_str().to_string()),
            function: recv_method.as_str().to_string(),
            args,
            file: None,
            line: None,
            offset: None,
        });
    }

    if let (Some(plain_type), Some(plain_method)) =
        (caps.name("plain_type"), caps.name("plain_method"))
    {
        let prefix = &line[..plain_type.start()];
        let qualified = format!("{}{}", prefix, plain_type.as_str());
        let (package, base) = split_package(&qualified);
        return Some(Frame {
            package,
            receiver: Some(base),
            function: plain_method.as_str().to_string(),
            args,
            file: None,
            line: None,
            offset: None,
        });
    }

    if let Some(func) = caps.name("func") {
        let prefix = &line[..func.start()];
        let qualified = format!("{}{}", prefix, func.as_str());
        let (package, name) = split_package(&qualified);
        return Some(Frame {
            package,
            receiver: None,
            function: name,
            args,
            file: None,
            line: None,
            offset: None,
        });
    }

    None
}

/// Parses a bare qualified function reference with no call parens, as found
/// on a `created by ...` line: `pkg.(*Type).Method` or `pkg.Func`.
fn parse_qualified_func(text: &str) -> Option<Frame> {
    let text = text.trim();
    if let Some(recv_start) = text.find("(*") {
        let package = text[..recv_start].trim_end_matches('.').to_string();
        let rest = &text[recv_start..];
        let close = rest.find(')')?;
        let receiver = rest[..=close].to_string();
        let method = rest[close + 1..].strip_prefix('.')?;
        return Some(Frame {
            package,
            receiver: Some(receiver),
            function: method.to_string(),
            args: String::new(),
            file: None,
            line: None,
            offset: None,
        });
    }
    let (package, name) = split_package(text);
    Some(Frame {
        package,
        receiver: None,
        function: name,
        args: String::new(),
        file: None,
        line: None,
        offset: None,
    })
}

fn attach_file_line(frame: &mut Frame, line: &str) -> bool {
    if let Some(caps) = FILE_LINE_RE.captures(line) {
        frame.file = Some(caps[1].to_string());
        frame.line = caps.get(2).and_then(|m| m.as_str().parse().ok());
        frame.offset = caps.get(3).map(|m| m.as_str().to_string());
        true
    } else {
        false
    }
}

/// Parses a standalone `created by <fn> in goroutine <m>` line (as found on
/// a `GoDecl.real_created_by` field) into `(creator_go_id, frame)`.
pub fn parse_created_by_text(text: &str) -> Option<(u64, Frame)> {
    let caps = CREATED_BY_RE.captures(text.trim())?;
    let go_id = caps[2].parse().ok()?;
    let frame = parse_qualified_func(&caps[1])?;
    Some((go_id, frame))
}

/// Scans a stack's text for its `created by ... in goroutine N` line, if
/// any (used to lazily cache a goroutine's creator the first time its full
/// stack text is seen).
pub fn find_created_by_in_stack(stack_text: &str) -> Option<(u64, Frame)> {
    for line in stack_text.lines() {
        if let Some(result) = parse_created_by_text(line) {
            return Some(result);
        }
    }
    None
}

/// Parses one goroutine's stack-dump text into a `ParsedGoRoutine`. Returns
/// `None` if the header line itself can't be recognized (spec.md §7: the
/// caller drops that frame and may substitute `ParsedGoRoutine::inactive`).
pub fn parse_stack(stack_text: &str) -> Option<ParsedGoRoutine> {
    let lines: Vec<&str> = stack_text.lines().collect();
    if lines.is_empty() {
        return None;
    }

    let header_caps = HEADER_RE.captures(lines[0].trim())?;
    let go_id: u64 = header_caps[1].parse().ok()?;
    let raw_state = header_caps[2].to_string();
    let (primary_state, state_duration_ms, extra_states) = split_state(&raw_state);

    let mut frames = Vec::new();
    let mut created_by_go_id = None;
    let mut created_by_frame = None;

    let mut i = 1;
    while i < lines.len() {
        let line = lines[i];
        if line.trim().is_empty() {
            i += 1;
            continue;
        }
        if let Some(caps) = CREATED_BY_RE.captures(line.trim()) {
            created_by_go_id = caps[2].parse().ok();
            if let Some(mut frame) = parse_qualified_func(&caps[1]) {
                if i + 1 < lines.len() && attach_file_line(&mut frame, lines[i + 1]) {
                    i += 1;
                }
                created_by_frame = Some(frame);
            }
            i += 1;
            continue;
        }
        if let Some(mut frame) = parse_func_line(line) {
            if i + 1 < lines.len() && attach_file_line(&mut frame, lines[i + 1]) {
                i += 1;
            }
            frames.push(frame);
        }
        i += 1;
    }

    Some(ParsedGoRoutine {
        go_id,
        raw_state,
        primary_state,
        state_duration_ms,
        extra_states,
        frames,
        created_by_go_id,
        created_by_frame,
    })
}

/// Patches a goroutine's own scheduling frames out of its stack when it was
/// launched through the collector's wrapper (spec.md §4.4.4, "Outrig-self
/// stack patching"). `real_creator_frame` is appended in place of the
/// stripped sandwich. Applies only on an exact match of the fixed
/// last-four-lines pattern; otherwise the stack is returned unchanged.
pub fn patch_self_stack(mut parsed: ParsedGoRoutine, real_creator_frame: Option<Frame>) -> ParsedGoRoutine {
    if parsed.frames.len() < 4 {
        return parsed;
    }
    let tail_start = parsed.frames.len() - 4;
    let tail_matches = parsed.frames[tail_start..]
        .iter()
        .zip(SELF_STACK_SANDWICH.iter())
        .all(|(f, pattern)| {
            let rendered = match &f.receiver {
                Some(r) => format!("{}.{}.{}", f.package, r, f.function),
                None => format!("{}.{}", f.package, f.function),
            };
            pattern.ends_with(&rendered)
        });

    if tail_matches {
        parsed.frames.truncate(tail_start);
        if let Some(frame) = real_creator_frame {
            parsed.frames.push(frame);
        }
    }
    parsed
}
