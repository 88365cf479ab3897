// ============================
// crates/backend-lib/src/redact.rs
// ============================
//! Redaction of personally identifiable fields in log output.
//!
//! A field is written as `name=value`. With an explicit separator the value
//! runs up to the next separator (kept) or the end of the line. Formatted
//! `tracing` lines have no fixed separator: there a value is either a
//! double-quoted string or runs up to the next ` key=` token.

use regex::{Captures, Regex};
use std::io::{self, Write};
use std::sync::LazyLock;
use tracing_subscriber::fmt::MakeWriter;

/// Fields redacted by default
pub const PII_FIELDS: [&str; 5] = ["name", "email", "phone", "ssn", "password"];

/// Replacement written in place of a redacted value
pub const REDACTION: &str = "***";

/// Default separator between fields of a log message
pub const SEPARATOR: &str = ";";

/// Start of the next field in a formatted tracing line
static NEXT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r" [A-Za-z_][A-Za-z0-9_.]*=").expect("next-field pattern is valid")
});

#[derive(Debug, Clone)]
enum Boundary {
    Separator,
    LogField,
}

/// Compiled set of field patterns
#[derive(Debug, Clone)]
pub struct Redactor {
    patterns: Vec<(String, Regex)>,
    redaction: String,
    boundary: Boundary,
}

impl Redactor {
    pub fn new<S: AsRef<str>>(fields: &[S], redaction: &str, separator: &str) -> Self {
        let sep = regex::escape(separator);
        // word boundary so `name` does not eat `username`
        Self::compile(fields, redaction, Boundary::Separator, |field| {
            format!(r"(?m)\b{field}=.*?(?P<sep>{sep}|$)")
        })
    }

    /// Redactor for lines produced by `tracing_subscriber::fmt`
    pub fn for_log_lines<S: AsRef<str>>(fields: &[S], redaction: &str) -> Self {
        Self::compile(fields, redaction, Boundary::LogField, |field| {
            format!(r"\b{field}=")
        })
    }

    fn compile<S: AsRef<str>>(
        fields: &[S],
        redaction: &str,
        boundary: Boundary,
        pattern: impl Fn(&str) -> String,
    ) -> Self {
        let patterns = fields
            .iter()
            .map(|field| {
                let field = field.as_ref();
                let re = Regex::new(&pattern(&regex::escape(field)))
                    .expect("field pattern is fully escaped");
                (field.to_string(), re)
            })
            .collect();

        Self {
            patterns,
            redaction: redaction.to_string(),
            boundary,
        }
    }

    /// Return `message` with every configured field value replaced
    pub fn redact(&self, message: &str) -> String {
        let mut out = message.to_string();
        for (field, re) in &self.patterns {
            out = match self.boundary {
                Boundary::Separator => re
                    .replace_all(&out, |caps: &Captures<'_>| {
                        format!("{field}={}{}", self.redaction, &caps["sep"])
                    })
                    .into_owned(),
                Boundary::LogField => self.redact_log_field(re, &out),
            };
        }
        out
    }

    fn redact_log_field(&self, key: &Regex, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = 0;
        for m in key.find_iter(text) {
            // a key inside an already redacted value
            if m.start() < rest {
                continue;
            }
            out.push_str(&text[rest..m.start()]);
            out.push_str(m.as_str());
            out.push_str(&self.redaction);
            rest = m.end() + log_value_len(&text[m.end()..]);
        }
        out.push_str(&text[rest..]);
        out
    }
}

/// Length of the field value at the start of `value`
fn log_value_len(value: &str) -> usize {
    if let Some(quoted) = value.strip_prefix('"') {
        let mut escaped = false;
        for (i, c) in quoted.char_indices() {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => return i + 2,
                // unterminated quote ends with the line
                '\n' => return i + 1,
                _ => escaped = false,
            }
        }
        return value.len();
    }

    let line_end = value.find('\n').unwrap_or(value.len());
    NEXT_FIELD
        .find(&value[..line_end])
        .map_or(line_end, |m| m.start())
}

/// Redact `fields` in `message`, keeping the separator after each value
pub fn filter_datum<S: AsRef<str>>(
    fields: &[S],
    redaction: &str,
    message: &str,
    separator: &str,
) -> String {
    Redactor::new(fields, redaction, separator).redact(message)
}

/// `MakeWriter` that redacts each formatted log line before writing it
#[derive(Debug, Clone)]
pub struct RedactingMakeWriter<M> {
    inner: M,
    redactor: Redactor,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(inner: M, redactor: Redactor) -> Self {
        Self { inner, redactor }
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<'a, M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
            redactor: &self.redactor,
            buf: Vec::new(),
        }
    }
}

/// Buffers one event and writes it redacted on flush or drop
pub struct RedactingWriter<'a, W: Write> {
    inner: W,
    redactor: &'a Redactor,
    buf: Vec<u8>,
}

impl<W: Write> RedactingWriter<'_, W> {
    fn drain(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&self.buf);
        let redacted = self.redactor.redact(&text);
        self.buf.clear();
        self.inner.write_all(redacted.as_bytes())
    }
}

impl<W: Write> Write for RedactingWriter<'_, W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain()?;
        self.inner.flush()
    }
}

impl<W: Write> Drop for RedactingWriter<'_, W> {
    fn drop(&mut self) {
        let _ = self.drain();
        let _ = self.inner.flush();
    }
}
