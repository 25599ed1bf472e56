use std::{ops::Range, path::Path};

pub mod compiler;
pub mod globals;
pub mod keycodes;

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    /// Byte range in the source.
    pub span: Option<Range<usize>>,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n    at: ({:?})", &self.message, &self.span)
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self {
            message: err.to_string(),
            span: None,
        }
    }
}

impl From<&str> for ConfigError {
    fn from(err: &str) -> Self {
        Self {
            message: err.to_string(),
            span: None,
        }
    }
}

impl ConfigError {
    pub fn new(message: String, span: Range<usize>) -> Self {
        Self {
            message,
            span: Some(span),
        }
    }

    /// The span in chars rather than bytes.
    fn char_span(&self, source: &str) -> Option<Range<usize>> {
        let span = self.span.clone()?;
        let to_char = |byte: usize| source.char_indices().take_while(|(i, _)| *i < byte).count();
        Some(to_char(span.start)..to_char(span.end))
    }

    /// One based line and column of the start of the span.
    pub fn line_col(&self, source: &str) -> Option<(usize, usize)> {
        let start = self.span.as_ref()?.start.min(source.len());
        let before = &source[..start];
        let line = before.matches('\n').count() + 1;
        let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        Some((line, col))
    }
}

/// Compile `src`, printing any error with its source context to stderr.
pub fn pretty_compile<'s>(
    file: &Path,
    src: &'s str,
) -> Result<compiler::KeyboardConfig<'s>, ConfigError> {
    match compiler::compile(src) {
        Ok(config) => {
            log::debug!(
                "compiled {}: {} layers, {} tapdances",
                file.display(),
                config.layer_count(),
                config.tapdance_count()
            );
            Ok(config)
        }
        Err(err) => {
            use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
            let filename = file.to_str().unwrap_or("<unknown>");
            let mut colors = ColorGenerator::new();

            let a = colors.next();
            if let Some(span) = err.char_span(src) {
                let _ = Report::build(ReportKind::Error, (filename, span.clone()))
                    .with_message("Invalid config".to_string())
                    .with_label(
                        Label::new((filename, span))
                            .with_message(&err.message)
                            .with_color(a),
                    )
                    .finish()
                    .eprint((filename, Source::from(src)));
            }
            Err(err)
        }
    }
}

pub fn text_to_binary(source: &str) -> Result<Vec<u16>, ConfigError> {
    let file = Path::new("<unknown>");
    let config = pretty_compile(file, source)?;
    Ok(config.serialize())
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod test;
