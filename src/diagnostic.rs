use owo_colors::OwoColorize;
use std::fmt;

/// A region of source text.
///
/// `start`/`end` are byte offsets; `line`/`column` (both 1-based, column counted
/// in characters) locate `start` so errors can be reported without the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self { start, end, line, column }
    }

    pub fn merge(self, other: Span) -> Span {
        let first = if self.start <= other.start { self } else { other };
        Span {
            start: first.start,
            end: self.end.max(other.end),
            line: first.line,
            column: first.column,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps byte offsets to line/column pairs.
#[derive(Debug)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(offset, _)| offset + 1))
            .collect();
        Self { source, line_starts }
    }

    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self.source[line_start..offset].chars().count() + 1;
        (line + 1, column)
    }

    pub fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.position(start);
        Span::new(start, end, line, column)
    }

    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts
            .get(line.saturating_sub(1))
            .copied()
            .unwrap_or(self.source.len())
    }

    pub fn line_text(&self, line: usize) -> Option<&'a str> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self.line_starts.get(line).map_or(self.source.len(), |next| next - 1);
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl Label {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self { span, message: message.into() }
    }
}

/// A host-facing report produced from any stage error.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    pub label: Option<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            label: None,
            notes: Vec::new(),
        }
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.label = Some(Label::new(span, message));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Renders diagnostics in a compiler-style layout:
///
/// ```text
/// error[E0202]: unsupported operand types for +: 'int' and 'str'
///   --> script.sp:3:9
///    |
///  3 |     x = 1 + "a"
///    |         ^^^^^^^ here
/// ```
pub struct DiagnosticRenderer<'a> {
    index: LineIndex<'a>,
    file_name: &'a str,
    use_color: bool,
}

impl<'a> DiagnosticRenderer<'a> {
    pub fn new(source: &'a str, file_name: &'a str, use_color: bool) -> Self {
        Self {
            index: LineIndex::new(source),
            file_name,
            use_color,
        }
    }

    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();
        let header = format!("error[{}]", diagnostic.code);
        let header = self.paint(&header, |s| s.red().bold().to_string());
        out.push_str(&format!(
            "{}: {}\n",
            header,
            self.paint(&diagnostic.message, |s| s.bold().to_string())
        ));

        if let Some(label) = &diagnostic.label {
            self.render_label(&mut out, label);
        }

        for note in &diagnostic.notes {
            out.push_str(&format!("  {} {}\n", self.paint("=", |s| s.blue().to_string()), note));
        }
        out
    }

    fn render_label(&self, out: &mut String, label: &Label) {
        let span = label.span;
        let gutter_width = span.line.to_string().len() + 1;
        let bar = self.paint("|", |s| s.blue().to_string());

        out.push_str(&format!(
            "{:>width$} {}:{}:{}\n",
            self.paint("-->", |s| s.blue().to_string()),
            self.file_name,
            span.line,
            span.column,
            width = gutter_width + 2
        ));

        let Some(text) = self.index.line_text(span.line) else {
            return;
        };
        out.push_str(&format!("{:width$} {}\n", "", bar, width = gutter_width));
        out.push_str(&format!(
            "{:>width$} {} {}\n",
            self.paint(&span.line.to_string(), |s| s.blue().to_string()),
            bar,
            text,
            width = gutter_width
        ));

        let line_chars = text.chars().count();
        let span_chars = if span.is_empty() {
            1
        } else {
            let line_end = self.index.line_start(span.line) + text.len();
            let end = span.end.min(line_end).max(span.start);
            self.index_slice(span.start, end).chars().count().max(1)
        };
        let width = span_chars.min(line_chars.saturating_sub(span.column.saturating_sub(1)).max(1));
        let carets = "^".repeat(width);
        let marker = format!("{}{} {}", " ".repeat(span.column.saturating_sub(1)), carets, label.message);
        out.push_str(&format!(
            "{:width$} {} {}\n",
            "",
            bar,
            self.paint(marker.trim_end(), |s| s.red().to_string()),
            width = gutter_width
        ));
    }

    fn index_slice(&self, start: usize, end: usize) -> &str {
        self.index.source.get(start..end).unwrap_or("")
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> String) -> String {
        if self.use_color {
            style(text)
        } else {
            text.to_string()
        }
    }
}

pub fn render_diagnostics(
    source: &str,
    file_name: &str,
    diagnostics: &[Diagnostic],
    use_color: bool,
) -> String {
    let renderer = DiagnosticRenderer::new(source, file_name, use_color);
    let mut output = String::new();
    for diagnostic in diagnostics {
        output.push_str(&renderer.render(diagnostic));
        output.push('\n');
    }

    let errors = diagnostics.len();
    if errors > 0 {
        let plural = if errors == 1 { "" } else { "s" };
        output.push_str(&format!("error: aborting due to {} error{}\n", errors, plural));
    }
    output
}
