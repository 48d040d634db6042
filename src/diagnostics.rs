//! User-facing diagnostics and their code-frame rendering.
//!
//! Diagnostics accumulate in a [`DiagnosticSink`] for the whole run. A run
//! that produced at least one diagnostic yields no schema; the sink is drained
//! with [`DiagnosticSink::finish`], which deduplicates by message and primary
//! location and orders the result by source position.

use crate::model::{SourceMap, Span};
use log::debug;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write;

/// Which part of the taxonomy a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticCategory {
    /// Malformed tags and unsupported type shapes, local to one declaration.
    Syntax,
    /// Whole-graph problems: collisions, incompatible fields, cycles.
    Semantic,
}

/// A secondary location, e.g. "also defined here".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RelatedLocation {
    pub span: Span,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub message: String,
    pub primary: Span,
    pub related: Vec<RelatedLocation>,
}

impl Diagnostic {
    pub fn syntax(primary: Span, message: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Syntax,
            message: message.into(),
            primary,
            related: Vec::new(),
        }
    }

    pub fn semantic(primary: Span, message: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Semantic,
            message: message.into(),
            primary,
            related: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related.push(RelatedLocation {
            span,
            message: message.into(),
        });
        self
    }
}

/// Accumulates diagnostics for one extraction run.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    items: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        debug!("diagnostic: {}", diagnostic.message);
        self.items.push(diagnostic);
    }

    pub fn syntax(&mut self, span: Span, message: impl Into<String>) {
        self.push(Diagnostic::syntax(span, message));
    }

    pub fn semantic(&mut self, span: Span, message: impl Into<String>) {
        self.push(Diagnostic::semantic(span, message));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Deduplicated diagnostics ordered by primary location, then message.
    pub fn finish(self) -> Vec<Diagnostic> {
        let mut seen = HashSet::new();
        let mut items: Vec<Diagnostic> = self
            .items
            .into_iter()
            .filter(|d| seen.insert((d.message.clone(), d.primary)))
            .collect();
        items.sort_by(|a, b| {
            (a.primary.file, a.primary.start, a.primary.end, &a.message).cmp(&(
                b.primary.file,
                b.primary.start,
                b.primary.end,
                &b.message,
            ))
        });
        items
    }
}

/// Renders diagnostics as source excerpts with an underline.
///
/// ```text
/// error: Duplicate field name `id` on type `User`.
///   --> src/models.rs:12:12
///    |
/// 12 |     pub fn id(&self) -> String {
///    |            ^^
///    = note: also defined here
///   --> src/models.rs:4:9
///    |
///  4 |     pub id: String,
///    |         ^^
/// ```
pub struct CodeFrame<'a> {
    sources: &'a SourceMap,
}

impl<'a> CodeFrame<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "error: {}", diagnostic.message);
        self.write_excerpt(&mut output, &diagnostic.primary);

        for related in &diagnostic.related {
            let _ = writeln!(output, "   = note: {}", related.message);
            self.write_excerpt(&mut output, &related.span);
        }

        output
    }

    pub fn format_all(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics
            .iter()
            .map(|d| self.format(d))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn write_excerpt(&self, output: &mut String, span: &Span) {
        let path = self.sources.path(span);
        let (line, col) = self.sources.line_col(span);
        let _ = writeln!(output, "  --> {}:{}:{}", path.display(), line, col);

        let Some(source_line) = self
            .sources
            .file(span.file)
            .and_then(|file| file.line_text(line))
        else {
            return;
        };

        let gutter = line.to_string().len();
        let _ = writeln!(output, "{} |", " ".repeat(gutter));
        let _ = writeln!(output, "{} | {}", line, source_line);

        // Multi-line spans are underlined to the end of their first line.
        let line_chars = source_line.chars().count();
        let span_chars = self.sources.snippet(span).chars().count();
        let start = col.saturating_sub(1).min(line_chars);
        let width = span_chars.min(line_chars.saturating_sub(start)).max(1);
        let _ = writeln!(
            output,
            "{} | {}{}",
            " ".repeat(gutter),
            " ".repeat(start),
            "^".repeat(width)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileId;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn sources() -> (SourceMap, FileId) {
        let mut map = SourceMap::new();
        let id = map.add_file(
            PathBuf::from("src/models.rs"),
            "pub struct User {\n    pub id: String,\n}\n".to_string(),
        );
        (map, id)
    }

    #[test]
    fn test_finish_dedupes_and_sorts() {
        let (_, file) = sources();
        let mut sink = DiagnosticSink::new();
        sink.semantic(Span::new(file, 20, 22), "second");
        sink.syntax(Span::new(file, 4, 10), "first");
        sink.semantic(Span::new(file, 20, 22), "second");

        let items = sink.finish();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].message, "first");
        assert_eq!(items[1].message, "second");
    }

    #[test]
    fn test_same_message_different_location_is_kept() {
        let (_, file) = sources();
        let mut sink = DiagnosticSink::new();
        sink.syntax(Span::new(file, 0, 3), "oops");
        sink.syntax(Span::new(file, 4, 10), "oops");

        assert_eq!(sink.finish().len(), 2);
    }

    #[test]
    fn test_code_frame_underlines_span() {
        let (map, file) = sources();
        let diagnostic = Diagnostic::semantic(Span::new(file, 26, 28), "Duplicate field `id`.")
            .with_related(Span::new(file, 11, 15), "type declared here");

        let rendered = CodeFrame::new(&map).format(&diagnostic);
        let expected = "\
error: Duplicate field `id`.
  --> src/models.rs:2:9
  |
2 |     pub id: String,
  |         ^^
   = note: type declared here
  --> src/models.rs:1:12
  |
1 | pub struct User {
  |            ^^^^
";
        assert_eq!(rendered, expected);
    }
}
