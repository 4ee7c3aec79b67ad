//! Merged trace construction from foreign failures

mod common;

use common::*;
use common::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use tandem_bridge::trace::{self, parse_frame, FrameOrigin};
use tandem_bridge::ExceptionTranslator;

#[test]
fn test_merged_trace_order() {
    let translator = ExceptionTranslator::default();
    let site_line = line!() + 1;
    let ex = translator.translate(
        "boom",
        &["at foo (bar.js:10:3)", "garbage line", "at baz (qux/quux.ts:42)"],
    );

    let frames = ex.frames();
    assert_eq!(frames.len(), 3);

    assert_eq!(frames[0].origin, FrameOrigin::Host);
    assert_eq!(frames[0].file, file!());
    assert_eq!(frames[0].line, site_line);

    assert_eq!(frames[1].declaring_type, "external");
    assert_eq!(frames[1].symbol, "foo");
    assert_eq!(frames[1].file, "bar.js");
    assert_eq!(frames[1].line, 10);

    assert_eq!(frames[2].symbol, "baz");
    assert_eq!(frames[2].file, "qux/quux.ts");
    assert_eq!(frames[2].line, 42);

    assert_eq!(ex.dropped_frames(), 1);
}

#[test]
fn test_host_frames_follow_foreign_frames() {
    let _outer = trace::enter("App", "main");
    let _inner = trace::enter("Worker", "step");

    let ex = ExceptionTranslator::new("js").translate("boom", &["at f (a.js:1)"]);
    let kinds: Vec<_> = ex
        .frames()
        .iter()
        .map(|f| (f.declaring_type.as_str(), f.symbol.as_str()))
        .collect();

    assert_eq!(
        kinds,
        vec![
            ("Worker", "step"),
            ("js", "f"),
            ("Worker", "step"),
            ("App", "main"),
        ]
    );
}

#[test]
fn test_all_frames_dropped() {
    let ex = ExceptionTranslator::default().translate("boom", &["", "nope", "at x"]);
    assert_eq!(ex.frames().len(), 1);
    assert_eq!(ex.dropped_frames(), 3);
    assert_eq!(ex.foreign_frames().count(), 0);
}

#[rstest]
#[case("at foo (bar.js:10:3)", Some(3))]
#[case("at foo (bar.js:10)", None)]
fn test_column_is_optional(#[case] text: &str, #[case] column: Option<u32>) {
    let frame = parse_frame(text).unwrap();
    assert_eq!(frame.line, 10);
    assert_eq!(frame.column, column);
}

#[test]
fn test_column_not_kept_in_merged_frame() {
    let ex = ExceptionTranslator::default().translate("boom", &["at foo (bar.js:10:3)"]);
    let frame = ex.foreign_frames().next().unwrap();
    assert_eq!(frame.file, "bar.js");
    assert_eq!(frame.to_string(), "at external.foo(bar.js:10)");
}

proptest! {
    #[test]
    fn prop_translate_never_panics(lines in prop::collection::vec(".*", 0..8)) {
        let ex = ExceptionTranslator::default().translate("boom", lines.as_slice());
        prop_assert_eq!(ex.frames().len() + ex.dropped_frames(), lines.len() + 1);
    }

    #[test]
    fn prop_well_formed_frames_parse(
        symbol in "[a-z_][a-z0-9_.]{0,12}",
        dir in "[a-z0-9_]{1,8}",
        ext in "[a-z]{1,4}",
        line in 0u32..1_000_000,
        column in proptest::option::of(0u32..500),
    ) {
        let location = format!("{}/file.{}", dir, ext);
        let text = match column {
            Some(c) => format!("    at {} ({}:{}:{})", symbol, location, line, c),
            None => format!("at {} ({}:{})", symbol, location, line),
        };
        let parsed = parse_frame(&text).unwrap();
        prop_assert_eq!(parsed.symbol, symbol);
        prop_assert_eq!(parsed.location, location);
        prop_assert_eq!(parsed.line, line);
        prop_assert_eq!(parsed.column, column);
    }
}
