// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

//! Builds the `nextflow run` command for one project.

use std::path::Path;

use serde::Deserialize;

use crate::app::errors::{AppError, AppResult};

use super::shell::{remote_join, shell_word};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimmingTool {
    TrimGalore,
    Fastp,
    Flexbar,
}

impl TrimmingTool {
    fn as_str(self) -> &'static str {
        match self {
            TrimmingTool::TrimGalore => "trim_galore",
            TrimmingTool::Fastp => "fastp",
            TrimmingTool::Flexbar => "flexbar",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assembler {
    Megahit,
    Metaspades,
    Hybrid,
}

impl Assembler {
    fn as_str(self) -> &'static str {
        match self {
            Assembler::Megahit => "megahit",
            Assembler::Metaspades => "metaspades",
            Assembler::Hybrid => "hybrid",
        }
    }
}

/// Reference database locations on the remote host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabasePaths {
    pub kraken2_db: String,
    pub checkv_db: String,
    pub blastdb_viruses: String,
    pub blastdb_nt: String,
    pub blastdb_nr: String,
    pub diamonddb: String,
}

/// Pipeline stages to leave out, read from the `[skip]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkipFlags {
    pub quality: bool,
    pub trimming: bool,
    pub assembly: bool,
    pub blast_annotation: bool,
    pub taxonomic_profiling: bool,
    pub viral_analysis: bool,
    pub coverage_analysis: bool,
    pub contig_organization: bool,
    pub visualization: bool,
    pub final_report: bool,
}

impl SkipFlags {
    fn enabled(&self) -> impl Iterator<Item = &'static str> {
        [
            (self.quality, "--skip_quality"),
            (self.trimming, "--skip_trimming"),
            (self.assembly, "--skip_assembly"),
            (self.blast_annotation, "--skip_blast_annotation"),
            (self.taxonomic_profiling, "--skip_taxonomic_profiling"),
            (self.viral_analysis, "--skip_viral_analysis"),
            (self.coverage_analysis, "--skip_coverage_analysis"),
            (self.contig_organization, "--skip_contig_organization"),
            (self.visualization, "--skip_visualization"),
            (self.final_report, "--skip_final_report"),
        ]
        .into_iter()
        .filter_map(|(on, flag)| on.then_some(flag))
    }
}

/// Contents of a pipeline settings file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    pub trimming_tool: TrimmingTool,
    pub assembler: Assembler,
    pub min_contig_length: u32,
    pub quality: u32,
    pub profile: String,
    pub queue: String,
    pub databases: DatabasePaths,
    pub skip: SkipFlags,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            trimming_tool: TrimmingTool::TrimGalore,
            assembler: Assembler::Hybrid,
            min_contig_length: 200,
            quality: 30,
            profile: "slurm".to_string(),
            queue: "compute".to_string(),
            databases: DatabasePaths::default(),
            skip: SkipFlags::default(),
        }
    }
}

impl PipelineSettings {
    pub fn from_toml(contents: &str) -> AppResult<Self> {
        toml::from_str(contents)
            .map_err(|err| AppError::invalid_argument(format!("invalid pipeline settings: {err}")))
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            AppError::invalid_argument(format!(
                "failed to read pipeline settings {}: {err}",
                path.display()
            ))
        })?;
        Self::from_toml(&contents)
    }
}

/// Resolved `nextflow run` command for `project_path`.
///
/// Database flags with an empty path are left out; `--queue` only appears
/// when a queue is set.
pub fn build_pipeline_command(
    pipeline_path: &str,
    project_path: &str,
    settings: &PipelineSettings,
) -> AppResult<String> {
    if pipeline_path.trim().is_empty() {
        return Err(AppError::invalid_argument("pipeline_path is not configured"));
    }
    if project_path.trim().is_empty() {
        return Err(AppError::invalid_argument("project path must not be empty"));
    }
    let project_path = project_path.trim_end_matches('/');

    let mut parts = vec![
        "nextflow run".to_string(),
        shell_word(&remote_join(pipeline_path, "main.nf")),
    ];
    let mut flag = |name: &str, value: &str| {
        parts.push(format!("--{name} {}", shell_word(value)));
    };

    flag("input", &remote_join(project_path, "raw/samplesheet.csv"));
    flag("outdir", &remote_join(project_path, "results"));

    let db = &settings.databases;
    for (name, value) in [("kraken2_db", &db.kraken2_db), ("checkv_db", &db.checkv_db)] {
        if !value.trim().is_empty() {
            flag(name, value);
        }
    }
    flag(
        "adapters",
        &remote_join(pipeline_path, "assets/illumina_adapter.fa"),
    );
    for (name, value) in [
        ("blastdb_viruses", &db.blastdb_viruses),
        ("blastdb_nt", &db.blastdb_nt),
        ("blastdb_nr", &db.blastdb_nr),
        ("diamonddb", &db.diamonddb),
    ] {
        if !value.trim().is_empty() {
            flag(name, value);
        }
    }

    flag("trimming_tool", settings.trimming_tool.as_str());
    flag("assembler", settings.assembler.as_str());
    flag("quality", &settings.quality.to_string());
    flag("min_contig_length", &settings.min_contig_length.to_string());

    parts.push(format!("-profile {}", shell_word(&settings.profile)));
    if !settings.queue.trim().is_empty() {
        parts.push(format!("--queue {}", shell_word(settings.queue.trim())));
    }
    parts.extend(settings.skip.enabled().map(str::to_string));

    Ok(parts.join(" "))
}
