//! Public API behaviour of step identifiers.

use karta_patterns::{Parameter, PatternError, SegmentKind, StepIdentifier};
use rstest::rstest;

#[rstest]
#[case(r#"I have "\d+" cucumbers"#, "I have 10 cucumbers", Some(vec![Parameter::Int(10)]))]
#[case(r#"I have "\d+" cucumbers"#, r#"I have "10" cucumbers"#, Some(vec![Parameter::Int(10)]))]
#[case(r#"I have "\d+" cucumbers"#, r#"I have "10" cucumbers in my basket"#, None)]
#[case("I order {long} units", "I order -3 units", Some(vec![Parameter::Int(-3)]))]
#[case("I order {long} units", "I order many units", None)]
#[case("greet {string}", r#"greet "the world""#, Some(vec![Parameter::Text("the world".into())]))]
#[case("greet {string}", "greet the world", None)]
fn matches_step_text(
    #[case] pattern: &str,
    #[case] text: &str,
    #[case] expected: Option<Vec<Parameter>>,
) {
    let Ok(identifier) = StepIdentifier::compile(pattern) else {
        panic!("{pattern} should compile");
    };
    assert_eq!(identifier.matches(text), expected);
}

#[test]
fn exposes_segments() {
    let Ok(identifier) = StepIdentifier::compile(r#"pick "red|blue" then {int}"#) else {
        panic!("identifier should compile");
    };
    let kinds: Vec<_> = identifier.segments().iter().map(|s| s.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            SegmentKind::Text,
            SegmentKind::Regex,
            SegmentKind::Text,
            SegmentKind::Int
        ]
    );
    assert_eq!(identifier.matches("pick red then 2").map(|p| p.len()), Some(2));
}

#[test]
fn exposes_segment_error_details() {
    let Err(err) = StepIdentifier::compile("a {colour}") else {
        panic!("expected segment error");
    };
    let info = match err {
        PatternError::Segment(info) => info,
        PatternError::Regex(other) => panic!("expected segment error, got regex error {other}"),
    };
    assert_eq!(info.segment.as_deref(), Some("colour"));
    assert_eq!(info.position, 2);
}
