//! Normalisation of step handler return values.

use derive_more::From;
use serde_json::{Map, Value};

use super::StepError;

/// Value returned by a step handler.
///
/// Handlers may return nothing, a boolean, a data map, or a full outcome.
/// Plain steps record the data in their result and merge it into the
/// scenario data; condition and loop steps read the value as their guard.
#[derive(Debug, Clone, Default, PartialEq, From)]
pub enum StepReturn {
    /// Nothing; a plain step succeeds and a guard is false.
    #[default]
    Unit,
    /// Success flag for plain steps, guard value for conditions and loops.
    Bool(bool),
    /// Data recorded in the step result.
    Data(Map<String, Value>),
    /// Data with an explicit success flag and optional error text.
    Outcome {
        /// Data recorded in the step result.
        data: Map<String, Value>,
        /// Whether the step succeeded.
        successful: bool,
        /// Error text recorded when present.
        error: Option<String>,
    },
}

impl StepReturn {
    /// Guard value of the return when used by a condition or loop.
    ///
    /// Nothing and empty data are false; an outcome is its success flag.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Unit => false,
            Self::Bool(flag) => *flag,
            Self::Data(data) => !data.is_empty(),
            Self::Outcome { successful, .. } => *successful,
        }
    }

    /// Split into recorded data, success flag and error text.
    #[must_use]
    pub fn into_parts(self) -> (Map<String, Value>, bool, Option<String>) {
        match self {
            Self::Unit => (Map::new(), true, None),
            Self::Bool(flag) => (Map::new(), flag, None),
            Self::Data(data) => (data, true, None),
            Self::Outcome {
                data,
                successful,
                error,
            } => {
                let successful = successful && error.is_none();
                (data, successful, error)
            }
        }
    }
}

/// Conversion from the values step handlers are allowed to return.
pub trait IntoStepOutcome {
    /// Normalise into a step return or a handler failure.
    ///
    /// # Errors
    /// Returns [`StepError`] when the handler reported failure.
    fn into_outcome(self) -> Result<StepReturn, StepError>;
}

impl IntoStepOutcome for () {
    fn into_outcome(self) -> Result<StepReturn, StepError> {
        Ok(StepReturn::Unit)
    }
}

impl IntoStepOutcome for bool {
    fn into_outcome(self) -> Result<StepReturn, StepError> {
        Ok(StepReturn::Bool(self))
    }
}

impl IntoStepOutcome for Map<String, Value> {
    fn into_outcome(self) -> Result<StepReturn, StepError> {
        Ok(StepReturn::Data(self))
    }
}

impl IntoStepOutcome for StepReturn {
    fn into_outcome(self) -> Result<StepReturn, StepError> {
        Ok(self)
    }
}

impl<T, E> IntoStepOutcome for Result<T, E>
where
    T: IntoStepOutcome,
    E: Into<StepError>,
{
    fn into_outcome(self) -> Result<StepReturn, StepError> {
        self.map_err(Into::into)?.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn data() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".into(), json!(7));
        map
    }

    #[rstest]
    #[case(StepReturn::Unit, false)]
    #[case(StepReturn::Bool(true), true)]
    #[case(StepReturn::Data(Map::new()), false)]
    #[case(StepReturn::Data(data()), true)]
    #[case(StepReturn::from((Map::new(), false, None)), false)]
    fn guard_truthiness(#[case] value: StepReturn, #[case] expected: bool) {
        assert_eq!(value.is_truthy(), expected);
    }

    #[test]
    fn outcome_with_error_is_unsuccessful() {
        let (data, successful, error) =
            StepReturn::from((data(), true, Some("bad".to_owned()))).into_parts();
        assert_eq!(data.get("id"), Some(&json!(7)));
        assert!(!successful);
        assert_eq!(error.as_deref(), Some("bad"));
    }

    #[test]
    fn results_propagate_errors() {
        let ok: Result<bool, String> = Ok(false);
        assert_eq!(ok.into_outcome(), Ok(StepReturn::Bool(false)));
        let err: Result<(), &str> = Err("boom");
        assert_eq!(err.into_outcome(), Err(StepError::Failed("boom".into())));
        assert_eq!(().into_outcome(), Ok(StepReturn::Unit));
        assert_eq!(data().into_outcome(), Ok(StepReturn::Data(data())));
    }
}
