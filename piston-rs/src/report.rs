//! Serializable rendering of command errors, for machine-readable output.

use crate::error::{CommandError, ExecutionError, ParseError};
use serde::Serialize;

/// Flat description of a failed command, suitable for JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// `parse_error` or `execution_error`.
    pub category: &'static str,
    /// Variant name, e.g. `missing_required_part`.
    pub kind: &'static str,
    pub message: String,
    pub command_path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    /// Underlying causes, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
    pub exit_code: i32,
}

impl ErrorReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.message.clone())
    }
}

impl From<&ParseError> for ErrorReport {
    fn from(error: &ParseError) -> Self {
        Self {
            category: "parse_error",
            kind: error.kind(),
            message: error.to_string(),
            command_path: error.command_path().to_vec(),
            part: error.part().map(String::from),
            causes: Vec::new(),
            exit_code: 1,
        }
    }
}

impl From<&ExecutionError> for ErrorReport {
    fn from(error: &ExecutionError) -> Self {
        Self {
            category: "execution_error",
            kind: "action_failed",
            message: error.to_string(),
            command_path: error.command_path.clone(),
            part: None,
            causes: error.source.chain().map(ToString::to_string).collect(),
            exit_code: 101,
        }
    }
}

impl From<&CommandError> for ErrorReport {
    fn from(error: &CommandError) -> Self {
        match error {
            CommandError::Parse(error) => error.into(),
            CommandError::Execution(error) => error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_error_report_shape() {
        let error = CommandError::Parse(ParseError::MissingRequiredPart {
            path: vec!["copy".into()],
            part: "<pattern>".into(),
        });
        let report = ErrorReport::from(&error);
        assert_eq!(report.exit_code, error.exit_code());

        let value: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(
            value,
            json!({
                "category": "parse_error",
                "kind": "missing_required_part",
                "message": "Missing <pattern> for 'copy'",
                "command_path": ["copy"],
                "part": "<pattern>",
                "exit_code": 1
            })
        );
    }

    #[test]
    fn test_execution_error_report_keeps_causes() {
        let source = anyhow::anyhow!("permission denied").context("could not write clipboard");
        let error = ExecutionError {
            command_path: vec!["clip".into(), "clear".into()],
            source,
        };
        let report = ErrorReport::from(&error);
        assert_eq!(report.kind, "action_failed");
        assert_eq!(
            report.causes,
            vec!["could not write clipboard", "permission denied"]
        );
        assert_eq!(report.exit_code, 101);

        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("part").is_none());
    }
}
