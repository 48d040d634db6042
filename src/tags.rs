//! Doc-comment tag parsing.
//!
//! Every declaration, member, enum variant and argument-object field carries
//! its doc comments as [`Annotation::Doc`] entries. This module joins them
//! into one text, splits tag lines from description lines, and maps every
//! tag back to a precise source span for diagnostics.
//!
//! A line is a tag line when its first non-blank character is `@` followed
//! by a letter. `@gql*` words must belong to the fixed vocabulary in
//! [`TagName`]; `@deprecated` and `@killsParentOnException` are field
//! sub-tags; any other `@word` is a directive application.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::literal::{self, ConstValue};
use crate::model::{Annotation, Span};

/// The fixed `@gql*` tag vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagName {
    Type,
    Interface,
    Union,
    Enum,
    Scalar,
    Input,
    Field,
    QueryField,
    MutationField,
    SubscriptionField,
    OperationType,
    Directive,
    Context,
    Annotate,
    Implements,
    External,
}

const ALL_TAGS: [TagName; 16] = [
    TagName::Type,
    TagName::Interface,
    TagName::Union,
    TagName::Enum,
    TagName::Scalar,
    TagName::Input,
    TagName::Field,
    TagName::QueryField,
    TagName::MutationField,
    TagName::SubscriptionField,
    TagName::OperationType,
    TagName::Directive,
    TagName::Context,
    TagName::Annotate,
    TagName::Implements,
    TagName::External,
];

impl TagName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagName::Type => "@gqlType",
            TagName::Interface => "@gqlInterface",
            TagName::Union => "@gqlUnion",
            TagName::Enum => "@gqlEnum",
            TagName::Scalar => "@gqlScalar",
            TagName::Input => "@gqlInput",
            TagName::Field => "@gqlField",
            TagName::QueryField => "@gqlQueryField",
            TagName::MutationField => "@gqlMutationField",
            TagName::SubscriptionField => "@gqlSubscriptionField",
            TagName::OperationType => "@gqlOperationType",
            TagName::Directive => "@gqlDirective",
            TagName::Context => "@gqlContext",
            TagName::Annotate => "@gqlAnnotate",
            TagName::Implements => "@gqlImplements",
            TagName::External => "@gqlExternal",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        ALL_TAGS.iter().copied().find(|tag| &tag.as_str()[1..] == word)
    }

    /// Tags that decide what a declaration is. At most one per declaration.
    pub fn is_kind(&self) -> bool {
        matches!(
            self,
            TagName::Type
                | TagName::Interface
                | TagName::Union
                | TagName::Enum
                | TagName::Scalar
                | TagName::Input
                | TagName::Field
                | TagName::QueryField
                | TagName::MutationField
                | TagName::SubscriptionField
                | TagName::Directive
                | TagName::Context
                | TagName::External
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: TagName,
    /// Span of the `@gql...` word.
    pub span: Span,
    /// Remaining text on the tag line, trimmed.
    pub body: String,
    pub body_span: Span,
}

impl Tag {
    /// First whitespace-separated word of the body.
    pub fn first_word(&self) -> Option<&str> {
        self.body.split_whitespace().next()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deprecation {
    pub reason: Option<String>,
    pub span: Span,
}

/// One `name: value` argument of a directive application.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentUse {
    pub name: String,
    pub value: ConstValue,
    pub span: Span,
}

/// A directive applied in a doc comment: `@cost(credits: 10)` or
/// `@gqlAnnotate cost(credits: 10)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveUse {
    pub name: String,
    pub span: Span,
    pub arguments: Vec<ArgumentUse>,
    /// An argument list was present or the use came from `@gqlAnnotate`,
    /// so the use cannot be an ordinary comment.
    pub explicit: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDoc {
    pub tags: Vec<Tag>,
    pub description: Option<String>,
    pub deprecated: Option<Deprecation>,
    pub kills_parent: Option<Span>,
    pub directives: Vec<DirectiveUse>,
}

impl ParsedDoc {
    pub fn find(&self, name: TagName) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name == name)
    }

    pub fn all(&self, name: TagName) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter(move |tag| tag.name == name)
    }

    pub fn kind_tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter(|tag| tag.name.is_kind())
    }

    pub fn has_gql_tags(&self) -> bool {
        !self.tags.is_empty()
    }
}

/// A line of doc text plus where it came from.
struct Segment {
    joined_start: usize,
    len: usize,
    source_start: Option<u32>,
    fallback: Span,
    after_attribute: Option<Span>,
}

/// All doc comments of one item joined with `\n`.
struct DocText {
    text: String,
    segments: Vec<Segment>,
}

impl DocText {
    fn build(annotations: &[Annotation]) -> Self {
        let mut text = String::new();
        let mut segments = Vec::new();
        let mut attribute: Option<Span> = None;

        for annotation in annotations {
            match annotation {
                Annotation::Attribute { span, .. } => {
                    attribute.get_or_insert(*span);
                }
                Annotation::Doc {
                    text: doc,
                    span,
                    text_start,
                } => {
                    let mut line_offset = 0usize;
                    for raw_line in doc.split('\n') {
                        let (stripped, skipped) = strip_block_prefix(raw_line);
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        segments.push(Segment {
                            joined_start: text.len(),
                            len: stripped.len(),
                            source_start: text_start
                                .map(|start| start + (line_offset + skipped) as u32),
                            fallback: *span,
                            after_attribute: attribute,
                        });
                        text.push_str(stripped);
                        line_offset += raw_line.len() + 1;
                    }
                }
            }
        }

        Self { text, segments }
    }

    fn segment_at(&self, offset: usize) -> Option<&Segment> {
        self.segments
            .iter()
            .rev()
            .find(|segment| segment.joined_start <= offset)
    }

    fn position(&self, offset: usize) -> Option<(u32, Span)> {
        let segment = self.segment_at(offset)?;
        let source_start = segment.source_start?;
        let delta = offset.saturating_sub(segment.joined_start).min(segment.len);
        Some((source_start + delta as u32, segment.fallback))
    }

    /// Source span of a range of the joined text. Falls back to the whole
    /// comment when the comment text is not verbatim source.
    fn span(&self, start: usize, end: usize) -> Span {
        match (self.position(start), self.position(end)) {
            (Some((from, fallback)), Some((to, _))) => Span::new(fallback.file, from, to),
            (Some((from, fallback)), None) => Span::new(fallback.file, from, from),
            _ => self
                .segment_at(start)
                .map(|segment| segment.fallback)
                .unwrap_or_else(|| Span::new(crate::model::FileId(0), 0, 0)),
        }
    }

    fn attribute_before(&self, offset: usize) -> Option<Span> {
        self.segment_at(offset)?.after_attribute
    }
}

// `/** ... */` comments keep their ` * ` line prefixes.
fn strip_block_prefix(line: &str) -> (&str, usize) {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix('*') {
        if !rest.starts_with('/') {
            let skipped = line.len() - rest.len();
            return (rest, skipped);
        }
    }
    (line, 0)
}

/// Byte index of the `)` closing the `(` at `open`, skipping string literals.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text[open..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn word_end(text: &str, start: usize) -> usize {
    text[start..]
        .char_indices()
        .find(|(_, ch)| !(ch.is_ascii_alphanumeric() || *ch == '_'))
        .map(|(idx, _)| start + idx)
        .unwrap_or(text.len())
}

fn line_end(text: &str, from: usize) -> usize {
    text[from..].find('\n').map(|idx| from + idx).unwrap_or(text.len())
}

/// Parses the doc comments among `annotations`.
///
/// Malformed tags are reported to `sink`; the returned [`ParsedDoc`] holds
/// whatever could be recovered so collection continues.
pub fn parse_doc(annotations: &[Annotation], sink: &mut DiagnosticSink) -> ParsedDoc {
    let doc = DocText::build(annotations);
    let text = doc.text.as_str();
    let mut parsed = ParsedDoc::default();
    let mut description: Vec<&str> = Vec::new();
    let mut cursor = 0usize;

    while cursor <= text.len() {
        let end = line_end(text, cursor);
        let line = &text[cursor..end];
        let indent = line.len() - line.trim_start().len();
        let at = cursor + indent;
        let is_tag_line = text[at..end].starts_with('@')
            && text[at + 1..end]
                .chars()
                .next()
                .is_some_and(|ch| ch.is_ascii_alphabetic());

        let next = if is_tag_line {
            parse_tag_line(&doc, at, end, &mut parsed, sink)
        } else {
            description.push(line.trim());
            end
        };
        cursor = next + 1;
    }

    while description.first().is_some_and(|line| line.is_empty()) {
        description.remove(0);
    }
    while description.last().is_some_and(|line| line.is_empty()) {
        description.pop();
    }
    if !description.is_empty() {
        parsed.description = Some(description.join("\n"));
    }

    parsed
}

/// Parses one tag starting at `at`; returns the offset of the end of the
/// last line it consumed.
fn parse_tag_line(
    doc: &DocText,
    at: usize,
    end: usize,
    parsed: &mut ParsedDoc,
    sink: &mut DiagnosticSink,
) -> usize {
    let text = doc.text.as_str();
    let word_end = word_end(text, at + 1);
    let word = &text[at + 1..word_end];
    let word_span = doc.span(at, word_end);

    if word.starts_with("gql") || word == "deprecated" || word == "killsParentOnException" {
        if let Some(attribute) = doc.attribute_before(at) {
            sink.push(
                Diagnostic::syntax(
                    word_span,
                    format!(
                        "Tag `@{}` must be placed before all attributes on this item. Move the doc comment above the attribute.",
                        word
                    ),
                )
                .with_related(attribute, "attribute appears here"),
            );
        }
    }

    match word {
        "deprecated" => {
            let reason = text[word_end..end].trim();
            if parsed.deprecated.is_some() {
                sink.syntax(word_span, "Duplicate `@deprecated` tag.");
            }
            parsed.deprecated = Some(Deprecation {
                reason: (!reason.is_empty()).then(|| reason.to_string()),
                span: word_span,
            });
            end
        }
        "killsParentOnException" => {
            if !text[word_end..end].trim().is_empty() {
                sink.syntax(
                    word_span,
                    "Unexpected text after `@killsParentOnException`. This tag takes no arguments.",
                );
            }
            parsed.kills_parent = Some(word_span);
            end
        }
        "gqlAnnotate" => parse_annotate(doc, word_span, word_end, end, parsed, sink),
        _ if word.starts_with("gql") => {
            let Some(name) = TagName::from_word(word) else {
                sink.syntax(
                    word_span,
                    format!(
                        "Unknown tag `@{}`. Known tags are: {}.",
                        word,
                        ALL_TAGS
                            .iter()
                            .map(|tag| format!("`{}`", tag.as_str()))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                );
                return end;
            };
            let raw_body = &text[word_end..end];
            let leading = raw_body.len() - raw_body.trim_start().len();
            let body = raw_body.trim();
            let body_start = word_end + leading;
            parsed.tags.push(Tag {
                name,
                span: word_span,
                body: body.to_string(),
                body_span: doc.span(body_start, body_start + body.len()),
            });
            end
        }
        _ => parse_directive_use(doc, word, at, word_end, word_span, false, parsed, sink)
            .unwrap_or(end),
    }
}

/// `@gqlAnnotate name(args)`: an explicit directive application.
fn parse_annotate(
    doc: &DocText,
    tag_span: Span,
    word_end: usize,
    end: usize,
    parsed: &mut ParsedDoc,
    sink: &mut DiagnosticSink,
) -> usize {
    let text = doc.text.as_str();
    let rest = &text[word_end..end];
    let name_start = word_end + (rest.len() - rest.trim_start().len());
    let name_end = self::word_end(text, name_start);
    if name_end == name_start {
        sink.syntax(
            tag_span,
            "Expected a directive name after `@gqlAnnotate`, e.g. `@gqlAnnotate cost(credits: 10)`.",
        );
        return end;
    }
    let name = &text[name_start..name_end];
    let name_span = doc.span(name_start, name_end);
    parse_directive_use(doc, name, name_start, name_end, name_span, true, parsed, sink)
        .unwrap_or(end)
}

/// Records a directive application whose name ends at `name_end`. Returns
/// the end of the last consumed line when an argument list spanned lines.
#[allow(clippy::too_many_arguments)]
fn parse_directive_use(
    doc: &DocText,
    name: &str,
    at: usize,
    name_end: usize,
    name_span: Span,
    annotate: bool,
    parsed: &mut ParsedDoc,
    sink: &mut DiagnosticSink,
) -> Option<usize> {
    let text = doc.text.as_str();
    if !text[name_end..].starts_with('(') {
        parsed.directives.push(DirectiveUse {
            name: name.to_string(),
            span: name_span,
            arguments: Vec::new(),
            explicit: annotate,
        });
        return None;
    }

    let Some(close) = matching_paren(text, name_end) else {
        sink.syntax(
            doc.span(at, name_end + 1),
            format!("Unbalanced parentheses in arguments to `@{}`.", name),
        );
        return None;
    };

    let args_start = name_end + 1;
    let mut arguments = Vec::new();
    match literal::parse_arguments(&text[args_start..close]) {
        Ok(parsed_args) => {
            for argument in parsed_args {
                let start = args_start + argument.offset;
                arguments.push(ArgumentUse {
                    span: doc.span(start, start + argument.name.len()),
                    name: argument.name,
                    value: argument.value,
                });
            }
        }
        Err(err) => {
            let offset = args_start + err.offset;
            sink.syntax(
                doc.span(offset, offset + 1),
                format!("Invalid argument to directive `@{}`: {}", name, err.message),
            );
            return Some(line_end(text, close));
        }
    }

    parsed.directives.push(DirectiveUse {
        name: name.to_string(),
        span: doc.span(at, close + 1),
        arguments,
        explicit: true,
    });
    Some(line_end(text, close))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileId;
    use pretty_assertions::assert_eq;

    const FILE: FileId = FileId(0);

    /// Builds `///` annotations whose text starts at the given offsets.
    fn docs(lines: &[(&str, u32)]) -> Vec<Annotation> {
        lines
            .iter()
            .map(|(text, start)| Annotation::Doc {
                text: text.to_string(),
                span: Span::new(FILE, start - 3, start + text.len() as u32),
                text_start: Some(*start),
            })
            .collect()
    }

    fn parse(annotations: &[Annotation]) -> (ParsedDoc, Vec<Diagnostic>) {
        let mut sink = DiagnosticSink::new();
        let parsed = parse_doc(annotations, &mut sink);
        (parsed, sink.finish())
    }

    #[test]
    fn test_kind_tag_with_name_and_description() {
        let (parsed, diagnostics) = parse(&docs(&[
            (" A registered user.", 3),
            ("", 26),
            (" Second paragraph.", 30),
            (" @gqlType Member", 52),
        ]));

        assert!(diagnostics.is_empty());
        assert_eq!(parsed.tags.len(), 1);
        assert_eq!(parsed.tags[0].name, TagName::Type);
        assert_eq!(parsed.tags[0].body, "Member");
        assert_eq!(parsed.tags[0].span, Span::new(FILE, 53, 61));
        assert_eq!(parsed.tags[0].body_span, Span::new(FILE, 62, 68));
        assert_eq!(
            parsed.description.as_deref(),
            Some("A registered user.\n\nSecond paragraph.")
        );
    }

    #[test]
    fn test_deprecated_and_kills_parent() {
        let (parsed, diagnostics) = parse(&docs(&[
            (" @gqlField", 3),
            (" @deprecated Use `fullName` instead", 20),
            (" @killsParentOnException", 60),
        ]));

        assert!(diagnostics.is_empty());
        assert_eq!(
            parsed.deprecated.unwrap().reason.as_deref(),
            Some("Use `fullName` instead")
        );
        assert!(parsed.kills_parent.is_some());
        assert!(parsed.description.is_none());
    }

    #[test]
    fn test_unknown_gql_tag() {
        let (parsed, diagnostics) = parse(&docs(&[(" @gqlTyp", 3)]));

        assert!(parsed.tags.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with("Unknown tag `@gqlTyp`"));
        assert_eq!(diagnostics[0].primary, Span::new(FILE, 4, 11));
    }

    #[test]
    fn test_directive_application_with_arguments() {
        let (parsed, diagnostics) = parse(&docs(&[
            (" @gqlField", 3),
            (r#" @cost(credits: 10, tags: ["a"])"#, 20),
        ]));

        assert!(diagnostics.is_empty());
        assert_eq!(parsed.directives.len(), 1);
        let directive = &parsed.directives[0];
        assert_eq!(directive.name, "cost");
        assert!(directive.explicit);
        assert_eq!(directive.arguments[0].name, "credits");
        assert_eq!(directive.arguments[0].value, ConstValue::Int(10));
        assert_eq!(directive.arguments[0].span, Span::new(FILE, 27, 34));
    }

    #[test]
    fn test_bare_word_is_implicit_directive() {
        let (parsed, _) = parse(&docs(&[(" @see the docs", 3)]));

        assert_eq!(parsed.directives.len(), 1);
        assert!(!parsed.directives[0].explicit);
        assert!(parsed.directives[0].arguments.is_empty());
    }

    #[test]
    fn test_multiline_arguments() {
        let (parsed, diagnostics) = parse(&docs(&[
            (" @complexity(", 3),
            ("   value: 5,", 20),
            (" )", 36),
            (" Trailing description.", 42),
        ]));

        assert!(diagnostics.is_empty());
        assert_eq!(parsed.directives[0].arguments[0].name, "value");
        assert_eq!(parsed.description.as_deref(), Some("Trailing description."));
    }

    #[test]
    fn test_unbalanced_arguments() {
        let (parsed, diagnostics) = parse(&docs(&[(" @cost(credits: 10", 3)]));

        assert!(parsed.directives.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Unbalanced parentheses"));
    }

    #[test]
    fn test_variable_argument_is_rejected() {
        let (_, diagnostics) = parse(&docs(&[(" @cost(credits: $n)", 3)]));

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Variables are not allowed"));
        assert_eq!(diagnostics[0].primary.start, 19);
    }

    #[test]
    fn test_annotate_is_explicit() {
        let (parsed, diagnostics) = parse(&docs(&[(" @gqlAnnotate internal", 3)]));

        assert!(diagnostics.is_empty());
        assert!(parsed.tags.is_empty());
        assert_eq!(parsed.directives[0].name, "internal");
        assert!(parsed.directives[0].explicit);
    }

    #[test]
    fn test_tag_after_attribute_is_reported() {
        let mut annotations = vec![Annotation::Attribute {
            name: "derive".to_string(),
            span: Span::new(FILE, 0, 16),
        }];
        annotations.extend(docs(&[(" @gqlType", 20)]));

        let (parsed, diagnostics) = parse(&annotations);
        assert_eq!(parsed.tags.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("must be placed before"));
        assert_eq!(diagnostics[0].related[0].span, Span::new(FILE, 0, 16));
    }

    #[test]
    fn test_plain_doc_after_attribute_is_fine() {
        let mut annotations = vec![Annotation::Attribute {
            name: "derive".to_string(),
            span: Span::new(FILE, 0, 16),
        }];
        annotations.extend(docs(&[(" Just prose.", 20)]));

        let (parsed, diagnostics) = parse(&annotations);
        assert!(diagnostics.is_empty());
        assert_eq!(parsed.description.as_deref(), Some("Just prose."));
    }

    #[test]
    fn test_block_comment_prefixes_are_stripped() {
        let annotations = vec![Annotation::Doc {
            text: "\n * @gqlEnum\n * Colors.\n ".to_string(),
            span: Span::new(FILE, 0, 30),
            text_start: Some(3),
        }];

        let (parsed, diagnostics) = parse(&annotations);
        assert!(diagnostics.is_empty());
        assert_eq!(parsed.tags[0].name, TagName::Enum);
        assert_eq!(parsed.tags[0].span, Span::new(FILE, 7, 15));
        assert_eq!(parsed.description.as_deref(), Some("Colors."));
    }
}
