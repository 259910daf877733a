//! `JUnit` XML writer for run results.
//!
//! Each feature becomes a `<testsuite>` and each scenario execution a
//! `<testcase>`. Scenarios of features with several iterations carry the
//! iteration index in their name so repeated executions stay distinct. A
//! failed scenario includes a `<failure>` child holding the recorded error.

use std::fmt::{self, Write};

use super::Summary;
use crate::results::{FeatureResult, Outcome, RunResult, ScenarioResult};

/// Render `run` as a `JUnit` XML document.
///
/// # Examples
/// ```
/// use karta::reporting::junit;
/// use karta::results::RunResult;
///
/// let mut output = String::new();
/// junit::write(&mut output, &RunResult::start("nightly", 7)).unwrap();
/// assert!(output.contains("<testsuites name=\"nightly\""));
/// ```
///
/// # Errors
/// Returns an error if writing to the provided formatter fails.
pub fn write<W: Write>(writer: &mut W, run: &RunResult) -> fmt::Result {
    let summary = Summary::of(run);
    writer.write_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
    writer.write_str("<testsuites name=\"")?;
    write_escaped(writer, &run.name)?;
    writeln!(
        writer,
        "\" tests=\"{}\" failures=\"{}\" time=\"{}\">",
        summary.scenarios,
        summary.failed_scenarios,
        seconds(&run.outcome)
    )?;
    writeln!(writer, "  <properties>")?;
    writeln!(writer, "    <property name=\"seed\" value=\"{}\" />", run.seed)?;
    writeln!(writer, "  </properties>")?;
    for feature in &run.feature_results {
        write_suite(writer, feature)?;
    }
    writer.write_str("</testsuites>\n")
}

/// Render `run` as a `JUnit` XML string.
///
/// # Errors
/// Returns an error if formatting fails.
pub fn to_string(run: &RunResult) -> Result<String, fmt::Error> {
    let mut output = String::new();
    write(&mut output, run)?;
    Ok(output)
}

fn write_suite<W: Write>(writer: &mut W, feature: &FeatureResult) -> fmt::Result {
    let failures = feature
        .scenario_results
        .iter()
        .filter(|s| !s.is_successful())
        .count();
    writer.write_str("  <testsuite name=\"")?;
    write_escaped(writer, &feature.name)?;
    writeln!(
        writer,
        "\" tests=\"{}\" failures=\"{failures}\" time=\"{}\">",
        feature.scenario_results.len(),
        seconds(&feature.outcome)
    )?;
    let repeated = feature.iterations_count > 1;
    for scenario in &feature.scenario_results {
        write_case(writer, feature, scenario, repeated)?;
    }
    writer.write_str("  </testsuite>\n")
}

fn write_case<W: Write>(
    writer: &mut W,
    feature: &FeatureResult,
    scenario: &ScenarioResult,
    repeated: bool,
) -> fmt::Result {
    writer.write_str("    <testcase name=\"")?;
    write_escaped(writer, &scenario.name)?;
    if repeated {
        write!(writer, " [iteration {}]", scenario.iteration_index)?;
    }
    writer.write_str("\" classname=\"")?;
    write_escaped(writer, feature.source.as_deref().unwrap_or(&feature.name))?;
    write!(writer, "\" time=\"{}\"", seconds(&scenario.outcome))?;
    if scenario.is_successful() {
        return writer.write_str(" />\n");
    }
    writer.write_str(">\n      <failure message=\"")?;
    let error = scenario.error().unwrap_or("scenario failed");
    write_escaped(writer, error.lines().next().unwrap_or(error))?;
    writer.write_str("\">")?;
    write_escaped(writer, error)?;
    writer.write_str("</failure>\n    </testcase>\n")
}

/// Elapsed seconds with millisecond precision.
fn seconds(outcome: &Outcome) -> String {
    let Some(elapsed) = outcome.duration() else {
        return "0.000".to_owned();
    };
    let whole = elapsed.num_seconds();
    let millis = (elapsed - chrono::Duration::seconds(whole)).num_milliseconds();
    format!("{whole}.{millis:03}")
}

fn write_escaped<W: Write>(writer: &mut W, value: &str) -> fmt::Result {
    const INVALID_REPLACEMENT: &str = "&#xFFFD;";
    for character in value.chars() {
        if !is_valid_xml_character(character) {
            writer.write_str(INVALID_REPLACEMENT)?;
            continue;
        }
        match character {
            '&' => writer.write_str("&amp;")?,
            '<' => writer.write_str("&lt;")?,
            '>' => writer.write_str("&gt;")?,
            '"' => writer.write_str("&quot;")?,
            '\'' => writer.write_str("&apos;")?,
            other => writer.write_char(other)?,
        }
    }
    Ok(())
}

fn is_valid_xml_character(character: char) -> bool {
    matches!(
        u32::from(character),
        0x09 | 0x0A | 0x0D
            | 0x20..=0xD7FF
            | 0xE000..=0xFFFD
            | 0x1_0000..=0x10_FFFF
    )
}
