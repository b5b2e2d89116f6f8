//! Session: environment plus filesystem collaborators
//!
//! Built once per process; the interactive loop runs many requests against
//! the same session.

use std::path::PathBuf;

use dettect_core::{Collaborators, Environment, ExecutionOutcome, Interrupt, ModeRequest, Result};
use dettect_core_types::InvocationId;
use dettect_engine::dispatch;
use dettect_reports::FsGenerators;
use dettect_store::{FsQueryFilter, FsValidator};

use super::GlobalArgs;

pub struct Session {
    env: Environment,
    interrupt: Interrupt,
    validator: FsValidator,
    filter: FsQueryFilter,
    generators: FsGenerators,
}

impl Session {
    /// Bootstrap `cache/` and `output/` under the root and wire the
    /// collaborators
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn open(global: &GlobalArgs, interrupt: Interrupt) -> Result<Self> {
        let env = Environment::bootstrap(&global.root)?;
        let kb_dir: PathBuf = global
            .knowledge_base
            .clone()
            .unwrap_or_else(|| env.cache_dir().to_path_buf());

        Ok(Self {
            validator: FsValidator::new(),
            filter: FsQueryFilter::new(env.clone()),
            generators: FsGenerators::new(env.clone(), kb_dir, interrupt.clone()),
            env,
            interrupt,
        })
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            validator: &self.validator,
            filter: &self.filter,
            layers: &self.generators,
            spreadsheets: &self.generators,
            graphs: &self.generators,
            synthesizer: &self.generators,
            updater: &self.generators,
            groups: &self.generators,
            statistics: &self.generators,
        }
    }

    /// Run one request; `Ok(false)` when it aborted on a precondition
    ///
    /// The abort reason is printed as a one-line diagnostic.
    ///
    /// # Errors
    ///
    /// Returns the fatal error of a failing collaborator.
    pub fn execute(&self, request: &ModeRequest) -> Result<bool> {
        let invocation_id = InvocationId::new();
        let outcome = dispatch(
            &invocation_id,
            request,
            &self.env,
            self.collaborators(),
            &self.interrupt,
        )?;

        match outcome {
            ExecutionOutcome::Success(report) => {
                tracing::debug!(
                    invocation_id = %invocation_id,
                    files = report.written_files().len(),
                    "invocation complete"
                );
                Ok(true)
            }
            ExecutionOutcome::Aborted(reason) => {
                println!("[!] {}", reason);
                Ok(false)
            }
        }
    }
}
