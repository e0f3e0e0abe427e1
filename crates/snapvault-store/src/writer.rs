//! Artifact writers.
//!
//! Each variant renders its content to bytes first, so validation failures
//! never leave a partial file behind, then creates the target exclusively.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use snapvault_core::VaultError;

/// Field separator for [`Table`] output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
}

impl Delimiter {
    pub fn as_char(&self) -> char {
        match self {
            Self::Comma => ',',
            Self::Tab => '\t',
        }
    }
}

/// Rectangular string table: a header and rows of the same width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    delimiter: Delimiter,
}

impl Table {
    /// An empty table with `header`.
    pub fn new<I, S>(header: I, delimiter: Delimiter) -> Result<Self, VaultError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let header: Vec<String> = header.into_iter().map(Into::into).collect();
        if header.is_empty() {
            return Err(VaultError::InvalidArtifact(
                "table header must have at least one column".into(),
            ));
        }
        Ok(Self {
            header,
            rows: Vec::new(),
            delimiter,
        })
    }

    /// Append a row. Fails if its width differs from the header's.
    pub fn push_row<I, S>(&mut self, row: I) -> Result<(), VaultError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = row.into_iter().map(Into::into).collect();
        if row.len() != self.header.len() {
            return Err(VaultError::InvalidArtifact(format!(
                "row {} has {} fields, header has {}",
                self.rows.len() + 1,
                row.len(),
                self.header.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn render(&self) -> String {
        let sep = self.delimiter.as_char();
        let mut out = String::new();
        for record in std::iter::once(&self.header).chain(self.rows.iter()) {
            let line: Vec<String> = record.iter().map(|f| quote(f, sep)).collect();
            out.push_str(&line.join(&sep.to_string()));
            out.push('\n');
        }
        out
    }
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn quote(field: &str, sep: char) -> String {
    if needs_quotes(field, sep) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// How an artifact's content is turned into bytes.
#[derive(Debug, Clone)]
pub enum ArtifactWriter {
    /// UTF-8 text, written as-is.
    Text(String),
    /// Opaque bytes, e.g. a serialized page capture.
    Bytes(Vec<u8>),
    /// Pretty-printed JSON document with a trailing newline.
    Json(serde_json::Value),
    /// YAML document.
    Yaml(serde_yaml::Value),
    /// Delimited table.
    Table(Table),
}

impl ArtifactWriter {
    /// Short name of the variant, for logs and receipts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
            Self::Yaml(_) => "yaml",
            Self::Table(_) => "table",
        }
    }

    /// Render the content to bytes without touching the filesystem.
    pub fn render(&self) -> Result<Vec<u8>, VaultError> {
        match self {
            Self::Text(text) => Ok(text.as_bytes().to_vec()),
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Json(value) => {
                let mut out = serde_json::to_vec_pretty(value)
                    .map_err(|e| VaultError::Serialization(e.to_string()))?;
                out.push(b'\n');
                Ok(out)
            }
            Self::Yaml(value) => serde_yaml::to_string(value)
                .map(String::into_bytes)
                .map_err(|e| VaultError::Serialization(e.to_string())),
            Self::Table(table) => Ok(table.render().into_bytes()),
        }
    }

    /// Create `path` (which must not exist) and write the content.
    /// Returns the number of bytes written.
    pub fn write_to(&self, path: &Path) -> Result<u64, VaultError> {
        let bytes = self.render()?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => VaultError::AlreadyExists(path.to_path_buf()),
                _ => VaultError::io(path, e),
            })?;
        file.write_all(&bytes).map_err(|e| VaultError::io(path, e))?;
        file.sync_all().map_err(|e| VaultError::io(path, e))?;
        Ok(bytes.len() as u64)
    }
}
