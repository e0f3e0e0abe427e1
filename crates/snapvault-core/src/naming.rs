//! # Snapshot Naming
//!
//! Every captured artifact gets a canonical, sortable file name:
//!
//! ```text
//! <prefix>_<kind>_<YYYY-MM-DD>_<revision>.<extension>   revision known
//! <prefix>_<kind>_<YYYY-MM-DD>.<extension>              revision unknown
//! ```
//!
//! e.g. `helm_models_raw_2024-01-15_abc1234.yaml` or
//! `scale_leaderboard_intermediate_2024-03-01.parquet`.
//!
//! ## Field rules
//!
//! `kind` and `revision` may not contain `_`, `/`, or whitespace. `kind` may
//! not contain `.` either, but a revision may (`v1.2`): the extension is
//! alphanumeric and always taken after the last dot. A revision may not
//! itself look like a date. The prefix may contain underscores. With those
//! rules every name produced here parses back to the same fields.
//!
//! ## Parsing
//!
//! The stem is split on `_` and anchored on the date segment: if the last
//! segment is a date there is no revision, otherwise the second-to-last
//! segment must be a date and the last one is the revision. Names written
//! by the earlier pipeline with an empty revision (`..._2024-01-15_.yaml`)
//! parse as "no revision".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::temporal::CaptureDate;

/// Prefix of HELM model snapshots.
pub const HELM_MODELS_PREFIX: &str = "helm_models";
/// Prefix of Scale leaderboard snapshots.
pub const SCALE_LEADERBOARD_PREFIX: &str = "scale_leaderboard";

fn forbidden(c: char) -> bool {
    c == '_' || c == '/' || c == '\\' || c.is_whitespace()
}

fn validate_field(label: &str, value: &str, allow_dot: bool) -> Result<String, VaultError> {
    if value.is_empty() {
        return Err(VaultError::naming(value, format!("{label} is required")));
    }
    if let Some(c) = value
        .chars()
        .find(|c| forbidden(*c) || (!allow_dot && *c == '.'))
    {
        return Err(VaultError::naming(
            value,
            format!("{label} contains forbidden character {c:?}"),
        ));
    }
    Ok(value.to_string())
}

fn validate_prefix(prefix: &str) -> Result<String, VaultError> {
    if prefix.is_empty() {
        return Err(VaultError::naming(prefix, "prefix is required"));
    }
    if let Some(c) = prefix
        .chars()
        .find(|c| *c == '.' || *c == '/' || *c == '\\' || c.is_whitespace())
    {
        return Err(VaultError::naming(
            prefix,
            format!("prefix contains forbidden character {c:?}"),
        ));
    }
    Ok(prefix.to_string())
}

fn validate_extension(ext: &str) -> Result<String, VaultError> {
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(VaultError::naming(ext, "extension must be non-empty ASCII alphanumerics"));
    }
    Ok(ext.to_string())
}

/// Artifact kind tag, e.g. `raw` or `intermediate`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactKind(String);

impl ArtifactKind {
    /// Validate a kind tag.
    pub fn new(s: &str) -> Result<Self, VaultError> {
        validate_field("kind", s, false).map(Self)
    }

    /// Raw scrape output.
    pub fn raw() -> Self {
        Self("raw".into())
    }

    /// Derived, cleaned table.
    pub fn intermediate() -> Self {
        Self("intermediate".into())
    }

    /// The kind as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ArtifactKind {
    type Error = VaultError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<ArtifactKind> for String {
    fn from(k: ArtifactKind) -> Self {
        k.0
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short identifier of the upstream content version, e.g. a commit hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Revision(String);

impl Revision {
    /// Validate a non-empty revision. Dots are allowed (`v1.2`).
    pub fn new(s: &str) -> Result<Self, VaultError> {
        let v = validate_field("revision", s, true)?;
        if CaptureDate::parse(&v).is_ok() {
            return Err(VaultError::naming(s, "revision may not be a YYYY-MM-DD date"));
        }
        Ok(Self(v))
    }

    /// Treat an empty string as "unknown revision".
    pub fn optional(s: &str) -> Result<Option<Self>, VaultError> {
        if s.is_empty() {
            Ok(None)
        } else {
            Self::new(s).map(Some)
        }
    }

    /// The revision as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Revision {
    type Error = VaultError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<Revision> for String {
    fn from(r: Revision) -> Self {
        r.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The structured fields of a snapshot file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotName {
    prefix: String,
    kind: ArtifactKind,
    date: CaptureDate,
    revision: Option<Revision>,
    extension: String,
}

impl SnapshotName {
    /// Assemble a name from validated parts.
    pub fn new(
        prefix: &str,
        kind: ArtifactKind,
        date: CaptureDate,
        revision: Option<Revision>,
        extension: &str,
    ) -> Result<Self, VaultError> {
        Ok(Self {
            prefix: validate_prefix(prefix)?,
            kind,
            date,
            revision,
            extension: validate_extension(extension)?,
        })
    }

    /// Recover the fields from a path or bare file name.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self, VaultError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| VaultError::naming(&display, "path has no UTF-8 file name"))?;
        let (stem, extension) = file_name
            .rsplit_once('.')
            .ok_or_else(|| VaultError::naming(file_name, "missing extension"))?;
        let segments: Vec<&str> = stem.split('_').collect();
        let n = segments.len();

        let (prefix_end, kind, date, revision) = if n >= 3 && is_date(segments[n - 1]) {
            (n - 2, segments[n - 2], segments[n - 1], None)
        } else if n >= 4 && is_date(segments[n - 2]) {
            (n - 3, segments[n - 3], segments[n - 2], Some(segments[n - 1]))
        } else {
            return Err(VaultError::naming(
                file_name,
                "expected <prefix>_<kind>_<YYYY-MM-DD>[_<revision>].<ext>",
            ));
        };

        let revision = match revision {
            Some(r) => Revision::optional(r)?,
            None => None,
        };
        Self::new(
            &segments[..prefix_end].join("_"),
            ArtifactKind::new(kind)?,
            CaptureDate::parse(date)?,
            revision,
            extension,
        )
    }

    /// Render the canonical file name.
    pub fn file_name(&self) -> String {
        match &self.revision {
            Some(rev) => format!(
                "{}_{}_{}_{}.{}",
                self.prefix, self.kind, self.date, rev, self.extension
            ),
            None => format!("{}_{}_{}.{}", self.prefix, self.kind, self.date, self.extension),
        }
    }

    /// The file name joined onto `dir`.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    /// Dataset prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Artifact kind.
    pub fn kind(&self) -> &ArtifactKind {
        &self.kind
    }

    /// Capture date.
    pub fn date(&self) -> CaptureDate {
        self.date
    }

    /// Upstream revision, if known.
    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    /// File extension without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl std::fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.file_name())
    }
}

fn is_date(segment: &str) -> bool {
    CaptureDate::parse(segment).is_ok()
}

/// Produces names for one dataset prefix.
#[derive(Debug, Clone)]
pub struct SnapshotNamer {
    prefix: String,
}

impl SnapshotNamer {
    /// Create a namer for `prefix`.
    pub fn new(prefix: &str) -> Result<Self, VaultError> {
        Ok(Self {
            prefix: validate_prefix(prefix)?,
        })
    }

    /// The dataset prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Name a snapshot. An empty `revision` means unknown; a missing `date`
    /// means today.
    pub fn name(
        &self,
        kind: &str,
        extension: &str,
        revision: &str,
        date: Option<CaptureDate>,
    ) -> Result<SnapshotName, VaultError> {
        SnapshotName::new(
            &self.prefix,
            ArtifactKind::new(kind)?,
            date.unwrap_or_else(CaptureDate::today),
            Revision::optional(revision)?,
            extension,
        )
    }

    /// Parse `path` and return `(kind, date, revision)`.
    ///
    /// Fails if the name belongs to a different prefix.
    pub fn parse(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(ArtifactKind, CaptureDate, Option<Revision>), VaultError> {
        let name = SnapshotName::parse(path)?;
        if name.prefix != self.prefix {
            return Err(VaultError::naming(
                name.file_name(),
                format!("prefix {:?} does not match {:?}", name.prefix, self.prefix),
            ));
        }
        Ok((name.kind, name.date, name.revision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(s: &str) -> CaptureDate {
        CaptureDate::parse(s).unwrap()
    }

    #[test]
    fn helm_raw_name() {
        let namer = SnapshotNamer::new(HELM_MODELS_PREFIX).unwrap();
        let name = namer
            .name("raw", "yaml", "abc1234", Some(date("2024-01-15")))
            .unwrap();
        assert_eq!(name.file_name(), "helm_models_raw_2024-01-15_abc1234.yaml");
    }

    #[test]
    fn empty_revision_omits_separator() {
        let namer = SnapshotNamer::new(SCALE_LEADERBOARD_PREFIX).unwrap();
        let name = namer
            .name("intermediate", "parquet", "", Some(date("2024-03-01")))
            .unwrap();
        assert_eq!(
            name.file_name(),
            "scale_leaderboard_intermediate_2024-03-01.parquet"
        );
    }

    #[test]
    fn parse_two_trailing_fields() {
        let name =
            SnapshotName::parse("scale_leaderboard_intermediate_2024-03-01.parquet").unwrap();
        assert_eq!(name.prefix(), "scale_leaderboard");
        assert_eq!(name.kind().as_str(), "intermediate");
        assert_eq!(name.date(), date("2024-03-01"));
        assert!(name.revision().is_none());
        assert_eq!(name.extension(), "parquet");
    }

    #[test]
    fn parse_three_trailing_fields_from_full_path() {
        let name =
            SnapshotName::parse("data/01_raw/helm_models_raw_2024-01-15_abc1234.yaml").unwrap();
        assert_eq!(name.prefix(), "helm_models");
        assert_eq!(name.kind().as_str(), "raw");
        assert_eq!(name.revision().map(Revision::as_str), Some("abc1234"));
    }

    #[test]
    fn parse_legacy_empty_revision() {
        let name = SnapshotName::parse("helm_models_raw_2024-01-15_.yaml").unwrap();
        assert!(name.revision().is_none());
        assert_eq!(name.date(), date("2024-01-15"));
        // Re-rendering normalizes to the canonical form.
        assert_eq!(name.file_name(), "helm_models_raw_2024-01-15.yaml");
    }

    #[test]
    fn parse_rejects_non_conforming_names() {
        assert!(SnapshotName::parse("notes.txt").is_err());
        assert!(SnapshotName::parse("helm_models_raw_yesterday_abc.yaml").is_err());
        assert!(SnapshotName::parse("helm_models_raw_2024-01-15").is_err());
        assert!(SnapshotName::parse("raw_2024-01-15.yaml").is_err());
    }

    #[test]
    fn fields_reject_underscores() {
        assert!(ArtifactKind::new("raw_v2").is_err());
        assert!(Revision::new("abc_123").is_err());
        assert!(Revision::new("2024-01-01").is_err());
        assert!(ArtifactKind::new("").is_err());
        assert!(SnapshotNamer::new("bad prefix").is_err());
    }

    #[test]
    fn namer_parse_checks_prefix() {
        let namer = SnapshotNamer::new(HELM_MODELS_PREFIX).unwrap();
        let (kind, d, rev) = namer
            .parse("helm_models_raw_2024-01-15_abc1234.yaml")
            .unwrap();
        assert_eq!(kind, ArtifactKind::raw());
        assert_eq!(d, date("2024-01-15"));
        assert_eq!(rev.unwrap().as_str(), "abc1234");
        assert!(namer
            .parse("scale_leaderboard_raw_2024-01-15.pickle")
            .is_err());
    }

    #[test]
    fn dotted_revision_round_trips() {
        let namer = SnapshotNamer::new(HELM_MODELS_PREFIX).unwrap();
        let name = namer
            .name("raw", "yaml", "v1.2", Some(date("2024-01-15")))
            .unwrap();
        assert_eq!(name.file_name(), "helm_models_raw_2024-01-15_v1.2.yaml");

        let parsed = SnapshotName::parse(name.file_name()).unwrap();
        assert_eq!(parsed.revision().map(Revision::as_str), Some("v1.2"));
        assert_eq!(parsed.extension(), "yaml");
        assert_eq!(parsed, name);
    }

    #[test]
    fn dots_stay_forbidden_in_kind_and_extension() {
        assert!(ArtifactKind::new("raw.v2").is_err());
        let namer = SnapshotNamer::new(HELM_MODELS_PREFIX).unwrap();
        assert!(namer
            .name("raw", "tar.gz", "v1.2", Some(date("2024-01-15")))
            .is_err());
    }

    #[test]
    fn kind_serde_validates() {
        let ok: ArtifactKind = serde_json::from_str("\"raw\"").unwrap();
        assert_eq!(ok, ArtifactKind::raw());
        assert!(serde_json::from_str::<ArtifactKind>("\"a_b\"").is_err());
    }

    proptest! {
        #[test]
        fn name_parse_round_trip(
            prefix in "[a-z]{1,8}(_[a-z]{1,8})?",
            kind in "[a-z][a-z0-9-]{0,10}",
            revision in "[a-z][a-z0-9.-]{0,11}",
            ext in "[a-z]{1,6}",
            y in 1970i32..2100,
            m in 1u32..=12,
            d in 1u32..=28,
        ) {
            let namer = SnapshotNamer::new(&prefix).unwrap();
            let day = CaptureDate::from_ymd(y, m, d).unwrap();
            let name = namer.name(&kind, &ext, &revision, Some(day)).unwrap();
            let (k, parsed_date, rev) = namer.parse(name.file_name()).unwrap();
            prop_assert_eq!(k.as_str(), kind.as_str());
            prop_assert_eq!(parsed_date, day);
            prop_assert_eq!(rev.map(|r| r.as_str().to_string()), Some(revision));
        }
    }
}
