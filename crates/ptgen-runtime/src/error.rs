use crate::definition::SemanticError;

/// Errors reported while driving a token stream against a table.
///
/// These errors describe the input (or a table that was flagged unusable),
/// never a corrupted table: a machine can be run again after any of them.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error(
        "syntax error at {context}: found {found}, expecting {}",
        display_expected(expected)
    )]
    Syntax {
        /// The state number or stack top at which the error was detected.
        context: String,
        /// The offending lookahead symbol.
        found: String,
        expected: Vec<String>,
    },

    #[error("unknown token {token}")]
    UnknownToken { token: String },

    #[error("the parse table has conflicts and cannot be used for parsing")]
    UnusableTable,

    #[error("conflicting actions in state {state} on {lookahead}")]
    Conflict { state: String, lookahead: String },

    #[error("missing goto entry from state {state} on {symbol}")]
    MissingGoto { state: String, symbol: String },

    #[error("missing `{close}' to terminate the delegated segment")]
    UnbalancedDelegation { close: String },

    #[error("semantic action failed: {}", _0)]
    Semantic(#[source] SemanticError),
}

/// The display name of the end of input in diagnostics.
pub(crate) const END_OF_INPUT: &str = "$";

fn display_expected(expected: &[String]) -> String {
    match expected {
        [] => "nothing".to_owned(),
        [one] => one.clone(),
        many => format!("one of {}", many.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_message() {
        let err = ParseError::Syntax {
            context: "state S#003".into(),
            found: "`)'".into(),
            expected: vec!["`id'".into(), "`('".into()],
        };
        assert_eq!(
            err.to_string(),
            "syntax error at state S#003: found `)', expecting one of `id', `('"
        );

        let err = ParseError::Syntax {
            context: "E".into(),
            found: "$".into(),
            expected: vec![],
        };
        assert_eq!(err.to_string(), "syntax error at E: found $, expecting nothing");
    }
}
