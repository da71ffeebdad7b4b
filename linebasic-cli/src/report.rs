use std::path::Path;

use clap::ValueEnum;
use linebasic_core::CoreError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Machine-readable form of one diagnostic.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub kind: &'static str,
    pub code: Option<&'static str>,
    pub message: &'a str,
    pub line: Option<u32>,
    pub line_text: Option<&'a str>,
    pub rendered: String,
}

impl<'a> Report<'a> {
    pub fn new(err: &'a CoreError) -> Self {
        let rendered = err.to_string();
        match err {
            CoreError::Semantic(err) => Report {
                kind: "semantic",
                code: Some(err.code().as_str()),
                message: err.message(),
                line: err.input_ref().map(|at| at.line_number()),
                line_text: Some(err.line_text()),
                rendered,
            },
            CoreError::Runtime(err) => Report {
                kind: "runtime",
                code: Some(err.code().as_str()),
                message: err.cause().message(),
                line: err.location().map(|at| at.input_ref().line_number()),
                line_text: err.location().map(|at| at.line_text()),
                rendered,
            },
            CoreError::ParseError { line, message } => Report {
                kind: "parse",
                code: None,
                message,
                line: u32::try_from(*line).ok(),
                line_text: None,
                rendered,
            },
            CoreError::SourceIo(_) => Report {
                kind: "io",
                code: None,
                message: "",
                line: None,
                line_text: None,
                rendered,
            },
        }
    }
}

/// Renders `err` for stderr, prefixed with the file it came from.
pub fn render(err: &CoreError, path: &Path, format: Format) -> anyhow::Result<String> {
    match format {
        Format::Text => Ok(format!("{}: {err}", path.display())),
        Format::Json => Ok(serde_json::to_string(&Report::new(err))?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime_error(source: &str) -> CoreError {
        let mut out = Vec::new();
        linebasic_core::run_source(source, &mut out).expect_err("program should fail")
    }

    #[test]
    fn runtime_report_carries_code_and_location() {
        let err = runtime_error("10 PRINT 1/0\n");
        let report = Report::new(&err);
        assert_eq!(report.kind, "runtime");
        assert_eq!(report.code, Some("DIVISION_BY_ZERO"));
        assert_eq!(report.message, "Division by zero");
        assert_eq!(report.line, Some(10));
        assert_eq!(report.line_text, Some("PRINT 1/0"));
        assert_eq!(
            report.rendered,
            "[DIVISION_BY_ZERO] Division by zero\nLine: 10\nPRINT 1/0"
        );
    }

    #[test]
    fn json_rendering_is_one_object() {
        let err = linebasic_core::check_source("10 WEND\n").expect_err("invalid program");
        let json = render(&err, Path::new("a.bas"), Format::Json).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse json");
        assert_eq!(value["kind"], "semantic");
        assert_eq!(value["code"], "WEND_WITHOUT_WHILE");
        assert_eq!(value["line"], 10);
        assert_eq!(value["line_text"], "WEND");
    }

    #[test]
    fn text_rendering_names_the_file() {
        let err = linebasic_core::check_source("10 WEND\n").expect_err("invalid program");
        let text = render(&err, Path::new("a.bas"), Format::Text).expect("text");
        assert!(text.starts_with("a.bas: [WEND_WITHOUT_WHILE] "), "{text}");
        assert!(text.ends_with("LINE:\nWEND"), "{text}");
    }
}
