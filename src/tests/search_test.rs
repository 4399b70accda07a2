#[cfg(test)]
mod tests {
    use crate::search::ast::{LeafKind, Node};
    use crate::search::matcher::{compile, MatchContext};
    use crate::search::parser::parse;
    use crate::search::pretty::pretty;

    struct Line {
        text: String,
        marked: bool,
    }

    impl Line {
        fn new(text: &str) -> Self {
            Line {
                text: text.to_string(),
                marked: false,
            }
        }
    }

    impl MatchContext for Line {
        fn text(&self) -> &str {
            &self.text
        }
        fn field_text(&self, _field: &str) -> Option<&str> {
            None
        }
        fn field_numeric(&self, _field: &str) -> Option<f64> {
            None
        }
        fn tags(&self) -> &[String] {
            &[]
        }
        fn is_marked(&self) -> bool {
            self.marked
        }
        fn is_user_query(&self) -> bool {
            false
        }
    }

    fn matches(query: &str, text: &str) -> bool {
        let tree = parse(query);
        let matcher = compile(&tree);
        matcher.eval(&Line::new(text))
    }

    #[test]
    fn empty_query_matches_everything() {
        // IP-7: the empty query returns every line.
        assert!(matches("", "anything at all"));
        assert!(matches("   ", "anything at all"));
    }

    #[test]
    fn s1_log_ingest_and_search() {
        assert!(matches("\"alpha\"", "alpha"));
        assert!(matches("\"alpha\"", "alpha beta"));
        assert!(!matches("\"alpha\"", "beta"));

        assert!(matches("\"alpha\" -\"beta\"", "alpha"));
        assert!(!matches("\"alpha\" -\"beta\"", "alpha beta"));

        assert!(matches("\"alpha\" | \"beta\"", "alpha"));
        assert!(matches("\"alpha\" | \"beta\"", "beta"));
        assert!(matches("\"alpha\" | \"beta\"", "alpha beta"));
    }

    #[test]
    fn s2_fuzzy() {
        assert!(matches("~otrg", "outrigctl"));
        assert!(!matches("~xyz", "outrigctl"));
    }

    #[test]
    fn case_sensitivity_quote_styles() {
        assert!(matches("\"Alpha\"", "alpha"));
        assert!(!matches("'Alpha'", "alpha"));
        assert!(matches("'Alpha'", "Alpha"));
    }

    #[test]
    fn regex_leaves() {
        assert!(matches("/a.c/", "ABC"));
        assert!(!matches("c/a.c/", "ABC"));
        assert!(matches("c/a.c/", "abc"));
    }

    #[test]
    fn numeric_field_operators() {
        struct Numbered(f64);
        impl MatchContext for Numbered {
            fn text(&self) -> &str {
                ""
            }
            fn field_text(&self, _field: &str) -> Option<&str> {
                None
            }
            fn field_numeric(&self, field: &str) -> Option<f64> {
                if field == "goid" {
                    Some(self.0)
                } else {
                    None
                }
            }
            fn tags(&self) -> &[String] {
                &[]
            }
            fn is_marked(&self) -> bool {
                false
            }
            fn is_user_query(&self) -> bool {
                false
            }
        }

        let tree = parse("$goid:>500");
        let matcher = compile(&tree);
        assert!(matcher.eval(&Numbered(501.0)));
        assert!(!matcher.eval(&Numbered(500.0)));
    }

    #[test]
    fn marked_and_tag_predicates() {
        struct Tagged {
            tags: Vec<String>,
            marked: bool,
        }
        impl MatchContext for Tagged {
            fn text(&self) -> &str {
                ""
            }
            fn field_text(&self, _field: &str) -> Option<&str> {
                None
            }
            fn field_numeric(&self, _field: &str) -> Option<f64> {
                None
            }
            fn tags(&self) -> &[String] {
                &self.tags
            }
            fn is_marked(&self) -> bool {
                self.marked
            }
            fn is_user_query(&self) -> bool {
                false
            }
        }

        let marked_line = Tagged {
            tags: vec!["foo".into()],
            marked: true,
        };
        let unmarked_line = Tagged {
            tags: vec!["foo/bar".into()],
            marked: false,
        };

        let marked_matcher = compile(&parse("#marked"));
        assert!(marked_matcher.eval(&marked_line));
        assert!(!marked_matcher.eval(&unmarked_line));

        let tag_matcher = compile(&parse("#foo"));
        assert!(tag_matcher.eval(&marked_line));
        assert!(tag_matcher.eval(&unmarked_line));

        let exact_tag_matcher = compile(&parse("#foo/"));
        assert!(!exact_tag_matcher.eval(&marked_line));
        assert!(!exact_tag_matcher.eval(&unmarked_line));
    }

    #[test]
    fn ip8_query_and_negation_partition_every_line() {
        // Restricted to a single leaf, per IP-8.
        let cases = ["hello world", "goodbye", "", "hello"];
        for text in cases {
            let positive = matches("\"hello\"", text);
            let negative = matches("-\"hello\"", text);
            assert_ne!(positive, negative, "text={text:?}");
        }
    }

    #[test]
    fn parse_error_node_does_not_abort_the_rest_of_the_query() {
        let tree = parse("\"ok\" /unterminated");
        assert!(!tree.error_spans().is_empty());
        let matcher = compile(&tree);
        // The error subtree contributes no matches, so the AND with it never
        // matches, but the tree is still produced rather than failing outright.
        assert!(!matcher.eval(&Line::new("ok")));
    }

    fn sample_trees() -> Vec<Node> {
        vec![
            parse("hello"),
            parse("\"hello world\""),
            parse("'Case Sensitive'"),
            parse("~fuzzy"),
            parse("/a.*b/"),
            parse("c/A.*B/"),
            parse("#tag"),
            parse("#tag/"),
            parse("#marked"),
            parse("#userquery"),
            parse("$goid:>500"),
            parse("$source:\"/dev/stdout\""),
            parse("-hello"),
            parse("hello world"),
            parse("hello | world"),
            parse("(hello | world) -goodbye"),
        ]
    }

    #[test]
    fn rt1_pretty_then_parse_round_trips() {
        for tree in sample_trees() {
            let printed = pretty(&tree);
            let reparsed = parse(&printed);
            assert_eq!(tree, reparsed, "round trip failed for {printed:?}");
        }
    }

    #[test]
    fn field_token_delegates_to_following_unmod_token() {
        let tree = parse("$source:/std(out|err)/");
        match tree {
            Node::Leaf(leaf) => match leaf.kind {
                LeafKind::Field { field, value } => {
                    assert_eq!(field, "source");
                    assert!(matches!(*value, LeafKind::RegexCi(_)));
                }
                other => panic!("unexpected leaf kind: {other:?}"),
            },
            other => panic!("unexpected node: {other:?}"),
        }
    }
}
