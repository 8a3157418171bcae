//! Scaffold pipeline: directory init, content generation, manifest registration.
//!
//! The phases are separate calls keyed by the plugin slug. Each one is
//! idempotent or additive, so a caller whose host killed a long operation can
//! re-invoke a single phase without repeating the earlier ones. Every phase
//! validates its entry first, records one progress line, and reports through a
//! [`ScaffoldResult`] rather than an error.

use anyhow::{Context, Result};
use plugsmith_config::WorkspaceLayout;
use plugsmith_core::{ErrorKind, PluginError, ScaffoldResult};
use plugsmith_logging::{PhaseOutcome, ProgressLog};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::manifest::PluginEntry;
use crate::store::ManifestStore;
use crate::template::render_escaped;
use crate::templates::{BuiltinTemplates, DirectoryTemplates, FileKind, TemplateSource};
use crate::validation::check_typed;

/// Pipeline state. After a successful phase the state stays on that phase's
/// name (`Initializing` after `init`, `GeneratingContent` after
/// `generate_content`); it moves on when the next phase is entered. `Failed`
/// and `Complete` are terminal for a full run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaffoldState {
    Idle,
    Initializing,
    GeneratingContent,
    Registering,
    Complete,
    /// Some generated files failed, or registration failed after files were written.
    PartialFailure,
    Failed,
}

impl ScaffoldState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::GeneratingContent => "generating_content",
            Self::Registering => "registering",
            Self::Complete => "complete",
            Self::PartialFailure => "partial_failure",
            Self::Failed => "failed",
        }
    }
}

/// Templates the layout asks for: a directory override, or the built-ins.
pub fn template_source_for(layout: &WorkspaceLayout) -> Arc<dyn TemplateSource> {
    match &layout.templates_dir {
        Some(dir) => Arc::new(DirectoryTemplates::new(dir)),
        None => Arc::new(BuiltinTemplates),
    }
}

pub struct ScaffoldPipeline {
    layout: WorkspaceLayout,
    templates: Arc<dyn TemplateSource>,
    store: ManifestStore,
    state: ScaffoldState,
    progress: ProgressLog,
}

impl ScaffoldPipeline {
    pub fn new(layout: WorkspaceLayout, templates: Arc<dyn TemplateSource>) -> Self {
        let store = ManifestStore::new(&layout.manifest_path);
        Self {
            layout,
            templates,
            store,
            state: ScaffoldState::Idle,
            progress: ProgressLog::new(Uuid::new_v4().to_string()),
        }
    }

    pub fn from_layout(layout: WorkspaceLayout) -> Self {
        let templates = template_source_for(&layout);
        Self::new(layout, templates)
    }

    /// The last phase entered, or its outcome when it ended the run.
    pub fn state(&self) -> ScaffoldState {
        self.state
    }

    pub fn progress(&self) -> &ProgressLog {
        &self.progress
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    pub fn plugin_dir(&self, entry: &PluginEntry) -> PathBuf {
        self.layout.plugin_dir(&entry.slug)
    }

    /// Validation failures stop a phase before it touches the filesystem.
    fn enter(&mut self, phase: ScaffoldState, entry: &PluginEntry) -> Option<ScaffoldResult> {
        self.state = phase;
        debug!(run = %self.progress.run_id(), slug = %entry.slug, phase = phase.label(), "Entering phase");
        match check_typed(entry) {
            Ok(()) => None,
            Err(e) => {
                let err = PluginError::Validation(e.to_string());
                Some(self.fail(entry, phase, &err))
            }
        }
    }

    fn fail(&mut self, entry: &PluginEntry, phase: ScaffoldState, err: &PluginError) -> ScaffoldResult {
        self.state = ScaffoldState::Failed;
        self.progress
            .record(&entry.slug, phase.label(), PhaseOutcome::Failed, err.to_string());
        ScaffoldResult::failed(err)
    }

    /// Phase 1: create the plugin directory and its ancestors.
    pub async fn init(&mut self, entry: &PluginEntry) -> ScaffoldResult {
        let phase = ScaffoldState::Initializing;
        if let Some(rejected) = self.enter(phase, entry) {
            return rejected;
        }

        let dir = self.plugin_dir(entry);
        let existed = dir.is_dir();
        if let Err(e) = fs::create_dir_all(&dir).await {
            let err = PluginError::io(dir.display(), e);
            return self.fail(entry, phase, &err);
        }

        let message = if existed {
            format!("{} already exists", self.relative(&dir))
        } else {
            format!("created {}", self.relative(&dir))
        };
        self.progress
            .record(&entry.slug, phase.label(), PhaseOutcome::Succeeded, message);
        ScaffoldResult::ok()
    }

    /// Phase 2: render and write every file kind. Files fail independently.
    pub async fn generate_content(&mut self, entry: &PluginEntry) -> ScaffoldResult {
        let phase = ScaffoldState::GeneratingContent;
        if let Some(rejected) = self.enter(phase, entry) {
            return rejected;
        }

        let dir = self.plugin_dir(entry);
        let mut written = Vec::new();
        let mut failures = Vec::new();
        for kind in FileKind::ALL {
            match self.generate_file(kind, entry, &dir).await {
                Ok(()) => written.push(kind.file_name()),
                Err(e) => {
                    warn!(slug = %entry.slug, file = kind.file_name(), error = %format!("{e:#}"), "File generation failed");
                    failures.push(format!("{}: {e:#}", kind.file_name()));
                }
            }
        }

        if failures.is_empty() {
            self.progress.record(
                &entry.slug,
                phase.label(),
                PhaseOutcome::Succeeded,
                format!("wrote {}", written.join(", ")),
            );
            return ScaffoldResult::ok();
        }

        let detail = failures.join("; ");
        if written.is_empty() {
            let err = PluginError::Io {
                path: dir.display().to_string(),
                message: format!("no files generated: {detail}"),
            };
            return self.fail(entry, phase, &err);
        }

        self.state = ScaffoldState::PartialFailure;
        self.progress.record(
            &entry.slug,
            phase.label(),
            PhaseOutcome::Partial,
            format!("wrote {}; failed {}", written.join(", "), failures.len()),
        );
        ScaffoldResult::partial(
            true,
            format!("{} of {} files failed: {detail}", failures.len(), FileKind::ALL.len()),
            ErrorKind::Io,
        )
    }

    async fn generate_file(&self, kind: FileKind, entry: &PluginEntry, dir: &Path) -> Result<()> {
        let template = self.templates.load(kind).await?;
        let content = render_escaped(&template, entry, kind.escape());
        let path = dir.join(kind.file_name());
        fs::write(&path, content)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }

    /// Phase 3: upsert the entry into the manifest. Files already written stay
    /// on disk when this fails, so the result is marked partial.
    pub async fn register(&mut self, entry: &PluginEntry) -> ScaffoldResult {
        let phase = ScaffoldState::Registering;
        if let Some(rejected) = self.enter(phase, entry) {
            return rejected;
        }

        let result = self.store.register(entry).await;
        if result.success {
            self.state = ScaffoldState::Complete;
            let message = format!("manifest {}", self.relative(self.store.path()));
            self.progress
                .record(&entry.slug, phase.label(), PhaseOutcome::Succeeded, message);
            return result;
        }

        let error = result.error.unwrap_or_else(|| "registration failed".to_string());
        self.state = ScaffoldState::Failed;
        self.progress
            .record(&entry.slug, phase.label(), PhaseOutcome::Failed, error.clone());
        ScaffoldResult::partial(
            false,
            format!("files may be ahead of the manifest; retry registration: {error}"),
            result.error_kind.unwrap_or(ErrorKind::Io),
        )
    }

    /// All three phases in order. Stops after a failed phase; a partial content
    /// phase still proceeds to registration and the run ends in `PartialFailure`.
    pub async fn run(&mut self, entry: &PluginEntry) -> ScaffoldResult {
        let init = self.init(entry).await;
        if !init.success {
            return init;
        }

        let content = self.generate_content(entry).await;
        if !content.success {
            return ScaffoldResult {
                partial_success: Some(true),
                ..content
            };
        }

        let registered = self.register(entry).await;
        if registered.success && content.is_partial() {
            self.state = ScaffoldState::PartialFailure;
            return content;
        }
        registered
    }

    /// The caller gave up waiting on a phase. Registration is an idempotent
    /// upsert, so it is attempted unconditionally; the earlier phases' effects
    /// stay unconfirmed either way.
    pub async fn recover_after_timeout(&mut self, entry: &PluginEntry) -> ScaffoldResult {
        let registered = self.register(entry).await;
        // A rejected entry never reached the filesystem; that failure is confirmed.
        if registered.error_kind == Some(ErrorKind::Validation) {
            return registered;
        }
        let message = if registered.success {
            "suspected timeout: registration confirmed, generated files unconfirmed".to_string()
        } else {
            format!(
                "suspected timeout: registration also failed: {}",
                registered.error.as_deref().unwrap_or("unknown error")
            )
        };
        let outcome = if registered.success {
            PhaseOutcome::Partial
        } else {
            PhaseOutcome::Failed
        };
        self.progress.record(&entry.slug, "recovery", outcome, message.clone());
        ScaffoldResult::partial(registered.success, message, ErrorKind::TimeoutSuspicion)
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.layout.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugsmith_config::PlugsmithConfig;
    use tempfile::TempDir;

    fn pipeline(dir: &TempDir) -> ScaffoldPipeline {
        ScaffoldPipeline::from_layout(WorkspaceLayout::at(dir.path(), &PlugsmithConfig::default()))
    }

    fn demo() -> PluginEntry {
        PluginEntry::local("demo", "Demo", "./demo")
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut p = pipeline(&dir);
        assert!(p.init(&demo()).await.success);
        assert!(dir.path().join("plugins/demo").is_dir());
        assert!(p.init(&demo()).await.success);
        assert_eq!(p.state(), ScaffoldState::Initializing);
        assert!(p.progress().lines()[1].contains("already exists"));
    }

    #[tokio::test]
    async fn init_fails_when_target_is_a_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("plugins"), "not a dir").unwrap();
        let mut p = pipeline(&dir);
        let result = p.init(&demo()).await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Io));
        assert_eq!(p.state(), ScaffoldState::Failed);
    }

    #[tokio::test]
    async fn invalid_entry_never_touches_disk() {
        let dir = TempDir::new().unwrap();
        let mut p = pipeline(&dir);
        let result = p.init(&PluginEntry::local("Bad_Slug", "x", "./x")).await;
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        assert!(!dir.path().join("plugins").exists());
    }

    #[tokio::test]
    async fn content_without_directory_fails_every_file() {
        let dir = TempDir::new().unwrap();
        let mut p = pipeline(&dir);
        let result = p.generate_content(&demo()).await;
        assert!(!result.success);
        assert!(result.partial_success.is_none());
        assert!(result.error.unwrap().contains("no files generated"));
    }

    #[tokio::test]
    async fn generated_json_files_parse() {
        let dir = TempDir::new().unwrap();
        let mut p = pipeline(&dir);
        let mut entry = PluginEntry::remote("quoted", "Say \"hi\"", "@acme/quoted");
        entry.description = Some("Line one\nline two".into());
        entry.groups = vec!["read".into(), "edit".into()];
        entry.role_definition = Some("You review code.".into());
        assert!(p.init(&entry).await.success);
        assert_eq!(p.generate_content(&entry).await, ScaffoldResult::ok());

        let plugin_dir = dir.path().join("plugins/quoted");
        let package: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(plugin_dir.join("package.json")).unwrap()).unwrap();
        assert_eq!(package["displayName"], "Say \"hi\"");
        assert_eq!(package["plugin"]["package"], "@acme/quoted");
        let config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(plugin_dir.join("plugin.config.json")).unwrap()).unwrap();
        assert_eq!(config["groups"], serde_json::json!(["read", "edit"]));
        assert_eq!(config["roleDefinition"], "You review code.");
    }

    #[tokio::test]
    async fn register_failure_is_partial() {
        let dir = TempDir::new().unwrap();
        // A directory where the manifest file should go makes the write fail.
        std::fs::create_dir_all(dir.path().join(".plugsmith/plugins.json")).unwrap();
        let mut p = pipeline(&dir);
        let result = p.register(&demo()).await;
        assert!(!result.success);
        assert!(result.is_partial());
        assert_eq!(p.state(), ScaffoldState::Failed);
    }

    #[tokio::test]
    async fn run_completes_all_phases() {
        let dir = TempDir::new().unwrap();
        let mut p = pipeline(&dir);
        let result = p.run(&demo()).await;
        assert_eq!(result, ScaffoldResult::ok());
        assert_eq!(p.state(), ScaffoldState::Complete);
        assert_eq!(p.progress().events().len(), 3);
        assert_eq!(p.store().load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recovery_reports_timeout_suspicion() {
        let dir = TempDir::new().unwrap();
        let mut p = pipeline(&dir);
        assert!(p.register(&demo()).await.success);

        let result = p.recover_after_timeout(&demo()).await;
        assert!(result.success);
        assert!(result.is_partial());
        assert_eq!(result.error_kind, Some(ErrorKind::TimeoutSuspicion));
        assert_eq!(p.store().load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recovery_keeps_validation_failures_confirmed() {
        let dir = TempDir::new().unwrap();
        let mut p = pipeline(&dir);
        let result = p.recover_after_timeout(&PluginEntry::local("Bad Slug", "Bad", "./bad")).await;
        assert!(!result.success);
        assert!(result.partial_success.is_none());
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        assert!(!dir.path().join(".plugsmith").exists());
    }

    fn templates_without_readme(dir: &TempDir) -> Arc<dyn TemplateSource> {
        let templates = dir.path().join("templates");
        std::fs::create_dir_all(&templates).unwrap();
        for kind in FileKind::ALL {
            if kind != FileKind::Readme {
                std::fs::write(templates.join(kind.template_name()), BuiltinTemplates::get(kind)).unwrap();
            }
        }
        Arc::new(DirectoryTemplates::new(templates))
    }

    #[tokio::test]
    async fn run_registers_after_partial_content() {
        let dir = TempDir::new().unwrap();
        let layout = WorkspaceLayout::at(dir.path(), &PlugsmithConfig::default());
        let mut p = ScaffoldPipeline::new(layout, templates_without_readme(&dir));

        let result = p.run(&demo()).await;
        assert!(result.success);
        assert_eq!(result.partial_success, Some(true));
        assert_eq!(result.error_kind, Some(ErrorKind::Io));
        assert!(result.error.unwrap().contains("README.md"));
        assert_eq!(p.state(), ScaffoldState::PartialFailure);
        assert!(p.store().load().await.unwrap().get("demo").is_some());
        assert_eq!(p.progress().events().len(), 3);
    }

    #[tokio::test]
    async fn run_stops_when_no_content_is_written() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty-templates");
        std::fs::create_dir_all(&empty).unwrap();
        let layout = WorkspaceLayout::at(dir.path(), &PlugsmithConfig::default());
        let mut p = ScaffoldPipeline::new(layout, Arc::new(DirectoryTemplates::new(empty)));

        let result = p.run(&demo()).await;
        assert!(!result.success);
        assert_eq!(result.partial_success, Some(true));
        assert_eq!(result.error_kind, Some(ErrorKind::Io));
        assert_eq!(p.state(), ScaffoldState::Failed);
        assert!(dir.path().join("plugins/demo").is_dir());
        assert!(!p.store().path().exists());
    }
}
