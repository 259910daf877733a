//! Scenario outline expansion.
//!
//! Each data row of an `Examples:` table produces an independent copy of the
//! template scenario with every `<column>` placeholder in step text and doc
//! strings replaced by that row's cell.

use super::error::ParseError;
use crate::model::{Scenario, Step};

/// Expand `template` once per data row of `table`.
///
/// `line` is the line of the table's header row.
pub(crate) fn expand(
    template: &Scenario,
    table: Vec<Vec<String>>,
    line: usize,
) -> Result<Vec<Scenario>, ParseError> {
    let mut rows = table.into_iter();
    let header = rows.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = rows.collect();
    if rows.is_empty() {
        return Err(ParseError::InvalidTable {
            line,
            reason: "at least one example data row needs to be provided".into(),
        });
    }
    rows.into_iter()
        .enumerate()
        .map(|(offset, row)| {
            if row.len() != header.len() {
                return Err(ParseError::InvalidTable {
                    line: line + offset + 1,
                    reason: format!(
                        "example row has {} cells but the header has {}",
                        row.len(),
                        header.len()
                    ),
                });
            }
            let bindings: Vec<(&str, &str)> = header
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(String::as_str))
                .collect();
            let mut scenario = template.clone();
            for steps in [
                &mut scenario.setup_steps,
                &mut scenario.steps,
                &mut scenario.teardown_steps,
            ] {
                for step in steps.iter_mut() {
                    step.visit_mut(&mut |s: &mut Step| bind_step(s, &bindings));
                }
            }
            Ok(scenario)
        })
        .collect()
}

fn bind_step(step: &mut Step, bindings: &[(&str, &str)]) {
    step.identifier = substitute(&step.identifier, bindings);
    if let Some(doc) = step.doc_string.as_mut() {
        *doc = substitute(doc, bindings);
    }
}

/// Replace `<name>` placeholders in a single left-to-right pass so values
/// that themselves look like placeholders are left untouched. Unknown names
/// are kept verbatim.
pub(crate) fn substitute(text: &str, bindings: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((before, after_open)) = rest.split_once('<') {
        out.push_str(before);
        let value = after_open.split_once('>').and_then(|(name, tail)| {
            bindings
                .iter()
                .find(|(column, _)| *column == name)
                .map(|(_, value)| (*value, tail))
        });
        if let Some((value, tail)) = value {
            out.push_str(value);
            rest = tail;
        } else {
            out.push('<');
            rest = after_open;
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests expand known tables")]
mod tests {
    use super::*;
    use karta_patterns::Conjunction;
    use rstest::rstest;

    fn table(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| (*cell).to_owned()).collect())
            .collect()
    }

    fn template() -> Scenario {
        let mut note = Step::new(Conjunction::Then, "the note reads <b>");
        note.doc_string = Some("total <a>".into());
        Scenario::new(
            "Adding",
            vec![
                Step::new(Conjunction::Given, "I have <a> apples"),
                Step::new(Conjunction::If, "<a> is positive")
                    .with_condition(vec![Step::new(Conjunction::Then, "I eat <a>")]),
                note,
            ],
        )
        .with_tags(["outline"])
    }

    #[test]
    fn expands_one_scenario_per_row() {
        let scenarios = expand(&template(), table(&[&["a", "b"], &["1", "x"], &["2", "y"]]), 4).unwrap();
        assert_eq!(scenarios.len(), 2);
        let texts: Vec<Vec<String>> = scenarios
            .iter()
            .map(|s| {
                let mut texts = Vec::new();
                for step in &s.steps {
                    step.visit(&mut |st| texts.push(st.identifier.clone()));
                }
                texts
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                vec!["I have 1 apples", "1 is positive", "I eat 1", "the note reads x"],
                vec!["I have 2 apples", "2 is positive", "I eat 2", "the note reads y"],
            ]
        );
        let last = scenarios.last().and_then(|s| s.steps.last()).unwrap();
        assert_eq!(last.doc_string.as_deref(), Some("total 2"));
        assert!(scenarios.iter().all(|s| s.name == "Adding" && s.tags.contains("outline")));
    }

    #[test]
    fn header_only_table_is_rejected() {
        let err = expand(&template(), table(&[&["a", "b"]]), 9).unwrap_err();
        assert!(matches!(err, ParseError::InvalidTable { line: 9, .. }));
    }

    #[test]
    fn ragged_row_reports_its_line() {
        let err = expand(&template(), table(&[&["a", "b"], &["1", "x"], &["2"]]), 9).unwrap_err();
        assert!(matches!(err, ParseError::InvalidTable { line: 11, .. }));
    }

    #[rstest]
    #[case("<a> and <b>", "1 and <a>")]
    #[case("a < b > c", "a < b > c")]
    #[case("<unknown> <a>", "<unknown> 1")]
    #[case("no placeholders", "no placeholders")]
    fn substitutes_in_one_pass(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(substitute(text, &[("a", "1"), ("b", "<a>")]), expected);
    }
}
