//! Study ingestion library
//!
//! JSON study definition → `Study` → compressed study file, plus the directory scan and
//! report formatting used by the `kv_ingest` CLI.

use anyhow::{Context, Result};
use kv_core::grammar::expected_pattern;
use kv_core::groups::display_key;
use kv_core::save::{from_json, load_from_path, save_to_path, to_json};
use kv_core::{
    AliasTable, AxisDefinition, ErrorCategory, GrammarConfig, GroupResolution, IngestReport,
    SchemaModel, Study, StudyRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Study definition as written by hand or exported by the desktop app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyDefinition {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    pub max_participants: u32,
    pub max_attempts: u32,
    pub axes: Vec<AxisDefinition>,
    /// Overrides the grammar from the environment when present
    #[serde(default)]
    pub grammar: Option<GrammarConfig>,
    /// Sub-value → display alias
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl StudyDefinition {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read study definition: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse study definition: {}", path.display()))
    }

    pub fn into_study(self, fallback_grammar: GrammarConfig) -> Result<Study> {
        let grammar = self.grammar.unwrap_or(fallback_grammar);
        grammar.validate()?;

        let schema = SchemaModel::create_with_grammar(
            self.axes,
            self.max_participants,
            self.max_attempts,
            grammar,
        )?;
        let mut study = Study::create(&self.name, &self.comment, schema)?;
        for (sub_value, alias) in &self.aliases {
            study
                .set_alias(sub_value, alias)
                .with_context(|| format!("Invalid alias for '{}'", sub_value))?;
        }
        Ok(study)
    }
}

pub fn open_study(path: &Path) -> Result<Study> {
    let record = load_from_path(path)
        .with_context(|| format!("Failed to read study file: {}", path.display()))?;
    record
        .into_study()
        .with_context(|| format!("Failed to rebuild study from: {}", path.display()))
}

pub fn write_study(path: &Path, study: &Study) -> Result<()> {
    save_to_path(path, &StudyRecord::from_study(study))
        .with_context(|| format!("Failed to write study file: {}", path.display()))
}

pub fn export_json(study: &Study) -> Result<String> {
    Ok(to_json(&StudyRecord::from_study(study))?)
}

pub fn import_json(path: &Path) -> Result<Study> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read study export: {}", path.display()))?;
    Ok(from_json(&json)?.into_study()?)
}

/// Names of the data files directly inside `dir`, filtered by the grammar's extensions
/// and sorted.
pub fn collect_candidate_names(dir: &Path, grammar: &GrammarConfig) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let accepted = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| grammar.accepts_extension(ext));
        if let (true, Some(name)) = (accepted, path.file_name().and_then(|n| n.to_str())) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

pub fn format_report(report: &IngestReport, study: &Study) -> String {
    let mut lines = Vec::new();
    for name in &report.accepted {
        lines.push(format!("✅ {}", name));
    }

    let mut show_pattern = false;
    for rejection in &report.rejected {
        let category = rejection.error.category();
        show_pattern |=
            matches!(category, ErrorCategory::Structural | ErrorCategory::SchemaViolation);
        lines.push(format!("❌ {}: {} [{:?}]", rejection.file_name, rejection.error, category));
    }
    if show_pattern {
        lines.push(format!("   Expected: {}", expected_pattern(study.schema())));
    }

    for name in &report.skipped {
        lines.push(format!("⏭  {}", name));
    }

    lines.push(report.summary());
    lines.join("\n")
}

pub fn format_groups(resolution: &GroupResolution, aliases: &AliasTable) -> String {
    let mut lines = Vec::new();
    for group in &resolution.groups {
        lines.push(format!("{} ({} files)", group.display_label(aliases), group.members.len()));
    }
    if !resolution.warnings.is_empty() {
        lines.push(format!("⚠️  {} empty group(s)", resolution.warnings.len()));
    }
    lines.join("\n")
}

pub fn format_coverage(study: &Study) -> String {
    let mut lines = Vec::new();

    let params = study.study_parameters();
    lines.push(format!("Participants: {}", params.participants.join(", ")));
    for (axis, values) in &params.values_by_axis {
        lines.push(format!("{}: {}", axis, values.join(", ")));
    }

    let gaps = study.missing_mandatory();
    if gaps.is_empty() {
        lines.push("No missing mandatory sub-values".to_string());
    }
    for gap in gaps {
        lines.push(format!(
            "⚠️  {} has no '{}' file for: {}",
            gap.participant,
            gap.axis,
            gap.missing.join(", ")
        ));
    }

    let separator = study.schema().separator();
    lines.push("Cells:".to_string());
    for key in study.full_group_keys() {
        lines.push(format!("   {}", display_key(&key, study.aliases(), separator)));
    }

    lines.join("\n")
}
