use super::{classify, scan, LineKind, LineVisitor, ScannedLine, SectionMarker, Span};

fn kinds(input: &str) -> Vec<LineKind> {
    classify(input.as_bytes())
        .into_iter()
        .map(|(_, kind)| kind)
        .collect()
}

fn single(input: &str) -> LineKind {
    let kinds = kinds(input);
    assert_eq!(kinds.len(), 1, "expected one logical line in {input:?}, got {kinds:?}");
    kinds[0]
}

fn text<'a>(input: &'a str, span: Span) -> &'a str {
    &input[span.range()]
}

#[test]
fn test_blank_and_comment_lines_are_plain() {
    assert_eq!(kinds("\n  \n; comment\n# other\n"), vec![LineKind::Plain; 4]);
}

#[test]
fn test_simple_property() {
    let input = "  key = value  \n";
    let LineKind::Property { section, name, value } = single(input) else {
        panic!("expected a property");
    };
    assert_eq!(section, None);
    assert_eq!(text(input, name), "key");
    assert_eq!(text(input, value), "value");
}

#[test]
fn test_inner_whitespace_belongs_to_the_value() {
    let input = "title = Hello World ; greeting\n";
    let LineKind::Property { value, .. } = single(input) else {
        panic!("expected a property");
    };
    assert_eq!(text(input, value), "Hello World");
}

#[test]
fn test_quoted_name_and_value_exclude_quotes() {
    let input = "\"my key\" = \" padded ; not a comment \"\n";
    let LineKind::Property { name, value, .. } = single(input) else {
        panic!("expected a property");
    };
    assert_eq!(text(input, name), "my key");
    assert_eq!(text(input, value), " padded ; not a comment ");
}

#[test]
fn test_section_declaration() {
    let input = "[ Server Settings ] ; trailing\n";
    let LineKind::Section { name } = single(input) else {
        panic!("expected a section");
    };
    assert_eq!(text(input, name), "Server Settings");
}

#[test]
fn test_quoted_section_name_may_contain_brackets() {
    let input = "[\"a]b\"]\n";
    let LineKind::Section { name } = single(input) else {
        panic!("expected a section");
    };
    assert_eq!(text(input, name), "a]b");
}

#[test]
fn test_empty_value_points_after_the_equals_sign() {
    let input = "key = \n";
    let LineKind::Property { value, .. } = single(input) else {
        panic!("expected a property");
    };
    assert_eq!(value, Span::new(6, 0));
}

#[test]
fn test_ambiguous_inputs_resolve_as_documented() {
    assert_eq!(single("[\"Hello]\"\n"), LineKind::Malformed);
    assert_eq!(single("[World\n"), LineKind::Malformed);
    assert_eq!(single("[[Yay]\n"), LineKind::Malformed);
    assert_eq!(single("Foo = Bar = Baz\n"), LineKind::Malformed);
    assert_eq!(single("Foo = \"Bar\" Baz\n"), LineKind::Malformed);
    assert_eq!(single("[Yay = Nay]\n"), LineKind::Malformed);
    assert_eq!(single("\"Hello\n"), LineKind::Malformed);
    assert_eq!(single("\"Foo\" Bar = Baz\n"), LineKind::Malformed);
}

#[test]
fn test_bracketed_name_before_equals_is_a_plain_assignment() {
    let input = "[Foo] = Bar\n";
    let LineKind::Property { section, name, value } = single(input) else {
        panic!("expected a property");
    };
    assert_eq!(section, None);
    assert_eq!(text(input, name), "Foo");
    assert_eq!(text(input, value), "Bar");
}

#[test]
fn test_section_and_assignment_share_a_line() {
    let input = "[Foo] Bar = Baz\n";
    let LineKind::Property { section, name, value } = single(input) else {
        panic!("expected a property");
    };
    let SectionMarker { name: section_name, end } = section.unwrap();
    assert_eq!(text(input, section_name), "Foo");
    assert_eq!(end, 5);
    assert_eq!(text(input, name), "Bar");
    assert_eq!(text(input, value), "Baz");
}

#[test]
fn test_two_sections_on_one_line_split_without_newline() {
    let input = "[Woop][Woop]\n";
    let lines = classify(input.as_bytes());
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].0, 0..6);
    assert_eq!(lines[1].0, 6..13);
    for (range, kind) in lines {
        let LineKind::Section { name } = kind else {
            panic!("expected a section");
        };
        assert_eq!(&input[range][name.range()], "Woop");
    }
}

#[test]
fn test_brackets_after_equals_are_value_bytes() {
    let input = "Foo = [Bar]\nBaz = ]][Qux\n";
    let lines = classify(input.as_bytes());
    let values: Vec<&str> = lines
        .iter()
        .map(|(range, kind)| {
            let LineKind::Property { value, .. } = kind else {
                panic!("expected a property, got {kind:?}");
            };
            &input[range.clone()][value.range()]
        })
        .collect();
    assert_eq!(values, vec!["[Bar]", "]][Qux"]);
}

#[test]
fn test_text_without_assignment_is_malformed() {
    assert_eq!(single("just words\n"), LineKind::Malformed);
    assert_eq!(single("[Foo] Bar\n"), LineKind::Malformed);
    assert_eq!(single("= value\n"), LineKind::Malformed);
    assert_eq!(single("[]\n"), LineKind::Malformed);
    assert_eq!(single("] = x\n"), LineKind::Malformed);
    assert_eq!(single("Foo [Bar] = x\n"), LineKind::Malformed);
}

#[test]
fn test_comment_after_closed_quote_is_fine() {
    let input = "Foo = \"Bar\" ; note\n";
    let LineKind::Property { value, .. } = single(input) else {
        panic!("expected a property");
    };
    assert_eq!(text(input, value), "Bar");
}

#[test]
fn test_quote_suppresses_markers_until_closed() {
    let input = "Foo = \"a = [b] # c\"\n";
    let LineKind::Property { value, .. } = single(input) else {
        panic!("expected a property");
    };
    assert_eq!(text(input, value), "a = [b] # c");
}

#[test]
fn test_final_line_without_line_break_is_submitted() {
    let lines = classify(b"a = 1\nb = 2");
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].0, 6..11);
    assert!(matches!(lines[1].1, LineKind::Property { .. }));
}

#[test]
fn test_crlf_is_kept_in_the_line_but_not_the_value() {
    let input = "a = 1\r\n";
    let lines = classify(input.as_bytes());
    assert_eq!(lines[0].0, 0..7);
    let LineKind::Property { value, .. } = lines[0].1 else {
        panic!("expected a property");
    };
    assert_eq!(text(input, value), "1");
}

#[test]
fn test_every_byte_lands_in_exactly_one_line() {
    let input = "x=1\n[A][B] y = 2\n[[bad\n\"open\n; c\n[C]";
    let lines = classify(input.as_bytes());
    let mut expected_start = 0;
    for (range, _) in &lines {
        assert_eq!(range.start, expected_start);
        expected_start = range.end;
    }
    assert_eq!(expected_start, input.len());
}

#[test]
fn test_empty_input_has_no_lines() {
    assert!(classify(b"").is_empty());
}

struct StopAfter(usize);

impl LineVisitor for StopAfter {
    type Error = usize;

    fn visit_line(&mut self, line: ScannedLine<'_>) -> Result<(), usize> {
        if self.0 == 0 {
            return Err(line.offset);
        }
        self.0 -= 1;
        Ok(())
    }
}

#[test]
fn test_visitor_errors_stop_the_scan() {
    let result = scan(b"a = 1\nb = 2\nc = 3\n", &mut StopAfter(2));
    assert_eq!(result, Err(12));
}
