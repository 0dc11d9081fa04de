use crate::formats::MERGE_CASES_FORMAT_V1;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    #[default]
    Shell,
    Deep,
}

/// One merge fixture: `old` is merged toward `new`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct MergeCase {
    pub name: String,
    pub old: String,
    pub new: String,
    #[serde(default)]
    pub mode: CaseMode,
    /// Flushed text of `old` after the merge is applied.
    pub merged: Option<String>,
    /// Rendered patch plan, one line per patch.
    pub plan: Option<Vec<String>>,
    /// Whether the merged text must equal `new`.
    #[serde(default)]
    pub converges: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
struct MergeCaseManifest {
    format: String,
    cases: Vec<MergeCase>,
}

/// Load a `.toml` or `.json` merge case manifest.
pub fn load_merge_cases(path: &Path) -> Vec<MergeCase> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read merge cases {path:?}: {err}"));
    let manifest: MergeCaseManifest = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content)
            .unwrap_or_else(|err| panic!("failed to parse merge cases {path:?}: {err}")),
        Some("json") => serde_json::from_str(&content)
            .unwrap_or_else(|err| panic!("failed to parse merge cases {path:?}: {err}")),
        other => panic!("unsupported merge case manifest extension {other:?} for {path:?}"),
    };
    assert_eq!(
        manifest.format, MERGE_CASES_FORMAT_V1,
        "unsupported format in {path:?}"
    );
    assert!(!manifest.cases.is_empty(), "no cases in {path:?}");

    let mut names = BTreeSet::new();
    for case in &manifest.cases {
        assert!(
            !case.name.trim().is_empty(),
            "merge case name must be non-empty in {path:?}"
        );
        assert!(
            names.insert(case.name.as_str()),
            "duplicate merge case '{}' in {path:?}",
            case.name
        );
        assert!(
            case.merged.is_some() || case.plan.is_some() || case.converges,
            "merge case '{}' in {path:?} asserts nothing",
            case.name
        );
    }
    manifest.cases
}
