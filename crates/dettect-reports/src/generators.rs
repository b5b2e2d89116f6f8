//! Filesystem-backed generators
//!
//! `FsGenerators` implements every generator trait the dispatcher calls.
//! Reports are written into the output directory of the `Environment`;
//! the technique administration updater rewrites its input in place after
//! taking a timestamped backup.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{Local, NaiveDate};

use dettect_core::collaborators::{
    AdminFileSynthesizer, AdminFileUpdater, FilterResult, GraphPlotter, GroupHeatMapRequest,
    GroupHeatMapper, GroupOutcome, LayerBuilder, QueryFilter, SpreadsheetExporter,
    StatisticsReporter,
};
use dettect_core::environment::Environment;
use dettect_core::model::{
    AdministrationArtifact, ArtifactRef, MitigationDomain, OverlayType, ScoreDimension, SortKey,
    UpdateKind,
};
use dettect_core::{log_op_end, log_op_error, log_op_start, Interrupt, StepStatus};
use dettect_store::admin::{self, DataSourceAdministration, TechniqueAdministration};
use dettect_store::errors::Result;
use dettect_store::knowledge::KnowledgeBase;

use crate::group::{self, Overlay};
use crate::scoring::{self, TechniqueCoverage};
use crate::{export, graph, layer, statistics, synthesize, update};

/// Report generators writing into the output directory
#[derive(Debug, Clone)]
pub struct FsGenerators {
    env: Environment,
    kb_dir: PathBuf,
    interrupt: Interrupt,
}

impl FsGenerators {
    pub fn new(env: Environment, kb_dir: impl Into<PathBuf>, interrupt: Interrupt) -> Self {
        Self {
            env,
            kb_dir: kb_dir.into(),
            interrupt,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    fn timed<T>(&self, op: &'static str, run: impl FnOnce() -> Result<T>) -> Result<T> {
        log_op_start!(op);
        let start = Instant::now();
        let result = run();
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                log_op_end!(op, duration_ms = duration_ms);
            }
            Err(err) => {
                log_op_error!(op, err.clone(), duration_ms = duration_ms);
            }
        }
        result
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn knowledge_base(&self) -> Result<KnowledgeBase> {
        KnowledgeBase::enterprise(&self.kb_dir)
    }

    fn coverage(
        &self,
        file_ds: &DataSourceAdministration,
    ) -> Result<BTreeMap<String, TechniqueCoverage>> {
        Ok(scoring::technique_coverage(&self.knowledge_base()?, file_ds))
    }

    /// Coverage for metadata only; a missing knowledge base is not fatal
    fn optional_coverage(
        &self,
        file_ds: Option<&ArtifactRef>,
    ) -> Result<Option<BTreeMap<String, TechniqueCoverage>>> {
        let Some(artifact) = file_ds else {
            return Ok(None);
        };
        let source = admin::load_data_sources(artifact.path())?;
        match self.coverage(&source) {
            Ok(coverage) => Ok(Some(coverage)),
            Err(err) => {
                tracing::warn!(error = %err, "data source metadata left out of the layer");
                Ok(None)
            }
        }
    }

    fn write_layer(&self, file_name: String, built: &layer::Layer) -> Result<StepStatus> {
        let path = self.env.output_path(&file_name);
        built.write(&path)?;
        println!("File written: {}", path.display());
        Ok(StepStatus::Written(vec![path]))
    }

    fn write_graph(&self, file_name: String, svg: String) -> Result<StepStatus> {
        let path = self.env.output_path(&file_name);
        dettect_store::atomic::atomic_write(&path, svg.as_bytes())?;
        println!("File written: {}", path.display());
        Ok(StepStatus::Written(vec![path]))
    }
}

/// Name used in report file names: the `name` key, else the file stem
pub fn report_name(name: &str, artifact: &AdministrationArtifact) -> String {
    let name = name.trim();
    if name.is_empty() {
        return artifact.stem();
    }
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

impl LayerBuilder for FsGenerators {
    fn data_source_layer(&self, file_ds: &ArtifactRef) -> Result<StepStatus> {
        self.timed("data_source_layer", || {
            let source = admin::load_data_sources(file_ds.path())?;
            let coverage = self.coverage(&source)?;
            let name = report_name(&source.name, file_ds);
            let built = layer::data_source_layer(
                &name,
                layer::declared_platforms(&source.platform),
                &coverage,
            );
            self.write_layer(format!("data_sources_{}.json", name), &built)
        })
    }

    fn technique_layer(
        &self,
        dimension: ScoreDimension,
        file_tech: &ArtifactRef,
        file_ds: Option<&ArtifactRef>,
        overlay: bool,
    ) -> Result<StepStatus> {
        let op = if overlay { "technique_overlay" } else { "technique_layer" };
        self.timed(op, || {
            let techniques = admin::load_techniques(file_tech.path())?;
            let coverage = self.optional_coverage(file_ds)?;
            let name = report_name(&techniques.name, file_tech);
            if overlay {
                let built = layer::overlay_layer(&techniques, coverage.as_ref());
                self.write_layer(format!("visibility_and_detection_{}.json", name), &built)
            } else {
                let built = layer::technique_layer(dimension, &techniques, coverage.as_ref());
                self.write_layer(
                    format!("{}_{}.json", dimension.name(), name),
                    &built,
                )
            }
        })
    }
}

impl SpreadsheetExporter for FsGenerators {
    fn export_data_sources(&self, file_ds: &ArtifactRef) -> Result<StepStatus> {
        self.timed("export_data_sources", || {
            let source = admin::load_data_sources(file_ds.path())?;
            let path = self
                .env
                .output_path(&format!("data_sources_{}.csv", report_name(&source.name, file_ds)));
            export::export_data_sources(&path, &source, &self.interrupt)?;
            println!("File written: {}", path.display());
            Ok(StepStatus::Written(vec![path]))
        })
    }

    fn export_techniques(&self, file_tech: &ArtifactRef) -> Result<StepStatus> {
        self.timed("export_techniques", || {
            let techniques = admin::load_techniques(file_tech.path())?;
            let path = self.env.output_path(&format!(
                "techniques_{}.csv",
                report_name(&techniques.name, file_tech)
            ));
            export::export_techniques(&path, &techniques, &self.interrupt)?;
            println!("File written: {}", path.display());
            Ok(StepStatus::Written(vec![path]))
        })
    }
}

impl GraphPlotter for FsGenerators {
    fn plot_data_sources(&self, file_ds: &ArtifactRef) -> Result<StepStatus> {
        self.timed("plot_data_sources", || {
            let source = admin::load_data_sources(file_ds.path())?;
            let points = graph::cumulative(graph::data_source_dates(&source));
            if points.is_empty() {
                let reason = "no connected data sources with a date to plot".to_string();
                println!("[!] {}", reason);
                return Ok(StepStatus::Skipped(reason));
            }
            let name = report_name(&source.name, file_ds);
            let svg = graph::step_chart(
                &format!("Data sources connected over time: {}", name),
                "Data sources",
                &points,
            );
            self.write_graph(format!("graph_data_sources_{}.svg", name), svg)
        })
    }

    fn plot_techniques(
        &self,
        dimension: ScoreDimension,
        file_tech: &ArtifactRef,
    ) -> Result<StepStatus> {
        self.timed("plot_techniques", || {
            let techniques = admin::load_techniques(file_tech.path())?;
            let points = graph::cumulative(graph::technique_dates(&techniques, dimension));
            if points.is_empty() {
                let reason = format!("no dated {} scores to plot", dimension.name());
                println!("[!] {}", reason);
                return Ok(StepStatus::Skipped(reason));
            }
            let name = report_name(&techniques.name, file_tech);
            let svg = graph::step_chart(
                &format!("Techniques with {} over time: {}", dimension.name(), name),
                "Techniques",
                &points,
            );
            self.write_graph(format!("graph_{}_{}.svg", dimension.name(), name), svg)
        })
    }
}

impl AdminFileSynthesizer for FsGenerators {
    fn synthesize_technique_admin(&self, file_ds: &ArtifactRef) -> Result<StepStatus> {
        self.timed("synthesize_technique_admin", || {
            let source = admin::load_data_sources(file_ds.path())?;
            let coverage = self.coverage(&source)?;
            let synthesized = synthesize::synthesize(&source, &coverage, self.today());
            let path = self.env.output_path(&format!(
                "techniques-administration-{}.yaml",
                report_name(&source.name, file_ds)
            ));
            admin::save(&path, &synthesized)?;
            println!(
                "File written: {} ({} techniques)",
                path.display(),
                synthesized.techniques.len()
            );
            Ok(StepStatus::Written(vec![path]))
        })
    }
}

impl AdminFileUpdater for FsGenerators {
    fn update_technique_admin(
        &self,
        file_ds: &ArtifactRef,
        file_tech: &ArtifactRef,
    ) -> Result<StepStatus> {
        self.timed("update_technique_admin", || {
            let source = admin::load_data_sources(file_ds.path())?;
            let coverage = self.coverage(&source)?;
            let mut techniques: TechniqueAdministration = admin::load_techniques(file_tech.path())?;

            let summary = update::apply(&mut techniques, &coverage, self.today(), &self.interrupt)?;
            for (technique_id, current, proposed) in &summary.manual {
                println!(
                    "[i] {}: manual visibility score {} kept (data sources suggest {})",
                    technique_id, current, proposed
                );
            }
            if summary.is_unchanged() {
                println!("[i] No visibility scores to update in '{}'", file_tech.path().display());
                return Ok(StepStatus::Printed);
            }

            let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
            let backup = update::backup(file_tech.path(), &stamp)?;
            admin::save(file_tech.path(), &techniques)?;
            println!(
                "Updated {} and added {} techniques in '{}' (backup: {})",
                summary.updated.len(),
                summary.added.len(),
                file_tech.path().display(),
                backup.display()
            );
            Ok(StepStatus::Written(vec![file_tech.path().to_path_buf(), backup]))
        })
    }
}

impl GroupHeatMapper for FsGenerators {
    fn group_heat_map(
        &self,
        request: &GroupHeatMapRequest,
        filter: &dyn QueryFilter,
    ) -> Result<GroupOutcome> {
        self.timed("group_heat_map", || {
            let options = &request.options;
            let kb = self.knowledge_base()?;
            let groups = group::select_groups(&kb, &options.groups, options.software_group)?;

            let mut overlay_admin: Option<TechniqueAdministration> = None;
            if let Some(artifact) = &request.overlay_artifact {
                let source = match &request.queries {
                    Some(queries) => match filter.filter(artifact, queries)? {
                        FilterResult::Derived(derived) => derived,
                        FilterResult::NoResults => return Ok(GroupOutcome::NoResults),
                    },
                    None => artifact.clone(),
                };
                overlay_admin = Some(admin::load_techniques(source.path())?);
            } else if request.queries.is_some() {
                tracing::warn!(
                    "queries ignored: no technique administration overlay to apply them to"
                );
            }

            let overlay = match (options.overlay_type, &overlay_admin) {
                (OverlayType::Group, _) => match &options.overlay {
                    Some(selector) => Overlay::Groups(group::select_groups(
                        &kb,
                        selector,
                        options.software_group,
                    )?),
                    None => Overlay::None,
                },
                (overlay_type, Some(techniques)) => match group::overlay_dimension(overlay_type) {
                    Some(dimension) => Overlay::Scores(dimension, techniques),
                    None => Overlay::None,
                },
                (_, None) => Overlay::None,
            };

            let built = group::heat_map(&kb, options, &groups, &overlay);
            let file_name = format!("{}.json", group::file_safe(&options.groups));
            let status = self.write_layer(file_name, &built)?;
            Ok(GroupOutcome::Completed(status))
        })
    }
}

impl StatisticsReporter for FsGenerators {
    fn data_source_coverage(&self) -> Result<StepStatus> {
        self.timed("statistics_data_sources", || {
            let kb = self.knowledge_base()?;
            let rows = statistics::data_source_counts(&kb);
            print!("{}", statistics::render_counts("Data source", &rows));
            Ok(StepStatus::Printed)
        })
    }

    fn mitigation_coverage(&self, domain: MitigationDomain) -> Result<StepStatus> {
        self.timed("statistics_mitigations", || {
            let kb = KnowledgeBase::load(&self.kb_dir, domain)?;
            let rows = statistics::mitigation_counts(&kb);
            print!("{}", statistics::render_counts("Mitigation", &rows));
            Ok(StepStatus::Printed)
        })
    }

    fn updates(&self, kind: UpdateKind, sort: SortKey) -> Result<StepStatus> {
        self.timed("statistics_updates", || {
            let kb = self.knowledge_base()?;
            let rows = statistics::updates(&kb, kind, sort);
            print!("{}", statistics::render_updates(kind, sort, &rows));
            Ok(StepStatus::Printed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dettect_core::model::ArtifactKind;

    #[test]
    fn test_report_name_prefers_document_name() {
        let artifact =
            AdministrationArtifact::supplied("data/ds-admin.yaml", ArtifactKind::DataSourceAdmin);
        assert_eq!(report_name("Example Lab", &artifact), "Example_Lab");
        assert_eq!(report_name("  ", &artifact), "ds-admin");
    }
}
