//! Error rendering using ariadne
//!
//! Expression errors point into short expression strings embedded in a
//! registry spec. Rather than mapping those offsets back into the spec
//! file, diagnostics are rendered against the expression source itself,
//! with the owning declaration (for example `invariant "safe"`) used as
//! the source label.

use crate::span::Span;
use ariadne::{Color, Label, Report, ReportKind, Source};
use std::io::Write;

/// A diagnostic that can be rendered with ariadne
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The main error message
    pub message: String,
    /// The primary span within the expression source
    pub span: Option<Span>,
    /// Label text attached to the primary span
    pub label: Option<String>,
    /// Help text shown at the bottom
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
            label: None,
            help: None,
        }
    }

    /// Set the primary span with a label
    pub fn with_span_label(mut self, span: Span, label: impl Into<String>) -> Self {
        self.span = Some(span);
        self.label = Some(label.into());
        self
    }

    /// Add help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render this diagnostic to a writer.
    ///
    /// `origin` names the declaration the expression came from and
    /// `source` is the expression string itself.
    pub fn render(
        &self,
        origin: &str,
        source: &str,
        writer: &mut impl Write,
    ) -> std::io::Result<()> {
        let offset = self.span.map(|s| s.start as usize).unwrap_or(0);
        let mut builder =
            Report::build(ReportKind::Error, origin, offset).with_message(&self.message);

        if let Some(span) = self.span {
            let label = Label::new((origin, span.start as usize..span.end as usize))
                .with_color(Color::Red);
            let label = if let Some(ref text) = self.label {
                label.with_message(text)
            } else {
                label
            };
            builder = builder.with_label(label);
        }

        if let Some(ref help) = self.help {
            builder = builder.with_help(help);
        }

        builder
            .finish()
            .write((origin, Source::from(source)), writer)
    }

    /// Render this diagnostic to stderr
    pub fn eprint(&self, origin: &str, source: &str) {
        let mut buf = Vec::new();
        let _ = self.render(origin, source, &mut buf);
        let _ = std::io::stderr().write_all(&buf);
    }
}

/// Create a diagnostic from an expression syntax error
pub fn syntax_diagnostic(message: &str, span: Span) -> Diagnostic {
    Diagnostic::error(message.to_string()).with_span_label(span, "here")
}

/// Create a diagnostic from an expression type error
pub fn type_diagnostic(message: &str, span: Span) -> Diagnostic {
    Diagnostic::error(format!("type error: {message}"))
        .with_span_label(span, "type mismatch here")
}

impl crate::Error {
    /// Convert this error to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            crate::Error::Syntax { message, span } => syntax_diagnostic(message, *span),
        }
    }
}
