use thiserror::Error;

/**
    Error returned by `FromStr` implementations on option enums.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}', expected one of: {expected}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl ParseError {
    pub(crate) fn new(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected,
        }
    }
}
