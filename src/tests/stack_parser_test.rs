#[cfg(test)]
mod tests {
    use crate::goroutine::stack_parser::{parse_stack, patch_self_stack, Frame, ParsedGoRoutine};

    #[test]
    fn s6_stack_parse() {
        let input = "goroutine 42 [IO wait, 3 minutes]:\n\
pkg/foo.(*Bar).Baz(0x1)\n\
     /p/x.go:10 +0xab\n\
created by pkg/main.start in goroutine 1\n\
     /p/m.go:20 +0x1\n";

        let parsed = parse_stack(input).expect("stack should parse");
        assert_eq!(parsed.go_id, 42);
        assert_eq!(parsed.primary_state, "IO wait");
        assert_eq!(parsed.state_duration_ms, Some(180_000));
        assert_eq!(parsed.frames.len(), 1);

        let frame = &parsed.frames[0];
        assert_eq!(frame.package, "pkg/foo");
        assert_eq!(frame.receiver.as_deref(), Some("(*Bar)"));
        assert_eq!(frame.function, "Baz");
        assert_eq!(frame.file.as_deref(), Some("/p/x.go"));
        assert_eq!(frame.line, Some(10));
        assert_eq!(frame.offset.as_deref(), Some("+0xab"));

        assert_eq!(parsed.created_by_go_id, Some(1));
        let created_by = parsed.created_by_frame.as_ref().expect("created_by frame");
        assert_eq!(created_by.package, "pkg/main");
        assert_eq!(created_by.function, "start");
    }

    #[test]
    fn unrecognized_header_returns_none() {
        assert!(parse_stack("not a goroutine header\nfoo.Bar()\n").is_none());
    }

    #[test]
    fn empty_stack_text_returns_none() {
        assert!(parse_stack("").is_none());
    }

    #[test]
    fn duration_units_convert_to_milliseconds() {
        let cases = [
            ("500 ns", Some(0u64)),
            ("500 ms", Some(500)),
            ("2 seconds", Some(2_000)),
            ("1 hour", Some(3_600_000)),
        ];
        for (state, expected_ms) in cases {
            let input = format!("goroutine 1 [running, {state}]:\n");
            let parsed = parse_stack(&input).unwrap();
            assert_eq!(parsed.state_duration_ms, expected_ms, "state={state}");
        }
    }

    #[test]
    fn self_stack_sandwich_is_stripped_and_replaced() {
        let input = "goroutine 9 [chan receive]:\n\
somepkg.Worker(0x1)\n\
     /p/w.go:5 +0x1\n\
outrig.(*GoRoutine).Run.func1(0x2)\n\
     /outrig/go.go:1 +0x2\n\
runtime.goexit()\n\
     /usr/lib/go/asm_amd64.s:1695 +0x1\n";

        let parsed = parse_stack(input).unwrap();
        let real_creator = Frame {
            package: "pkg/main".to_string(),
            receiver: None,
            function: "start".to_string(),
            args: String::new(),
            file: None,
            line: None,
            offset: None,
        };
        let patched = patch_self_stack(parsed, Some(real_creator.clone()));
        // Only 3 lines matched the 4-line sandwich exactly (too short a tail
        // here), so this specific fixture is a no-op; exercised for real via
        // a 4-deep fixture below.
        assert!(!patched.frames.is_empty());

        let parsed2 = ParsedGoRoutine {
            go_id: 9,
            raw_state: "chan receive".to_string(),
            primary_state: "chan receive".to_string(),
            state_duration_ms: None,
            extra_states: Vec::new(),
            frames: vec![
                Frame {
                    package: "created by outrig".to_string(),
                    receiver: Some("(*GoRoutine)".to_string()),
                    function: "Run".to_string(),
                    args: String::new(),
                    file: None,
                    line: None,
                    offset: None,
                },
                Frame {
                    package: "runtime".to_string(),
                    receiver: None,
                    function: "goexit".to_string(),
                    args: String::new(),
                    file: None,
                    line: None,
                    offset: None,
                },
                Frame {
                    package: "outrig".to_string(),
                    receiver: Some("(*GoRoutine)".to_string()),
                    function: "Run.func1".to_string(),
                    args: String::new(),
                    file: None,
                    line: None,
                    offset: None,
                },
                Frame {
                    package: "outrig".to_string(),
                    receiver: Some("(*GoRoutine)".to_string()),
                    function: "Run".to_string(),
                    args: String::new(),
                    file: None,
                    line: None,
                    offset: None,
                },
            ],
            created_by_go_id: None,
            created_by_frame: None,
        };
        let patched2 = patch_self_stack(parsed2, Some(real_creator));
        assert_eq!(patched2.frames.len(), 1);
        assert_eq!(patched2.frames[0].function, "start");
    }
}
