//! Task registration and execution for a whole site build.

use std::path::PathBuf;
use std::sync::Arc;

use explorer_render::ComponentRegistry;
use explorer_tasks::{Runner, RunReport, Task, TaskError, TaskExecutor, TaskGraph, TaskGraphBuilder};

use crate::bundle::{PageBundler, SharedBundler};
use crate::config::BuildConfig;
use crate::error::{BuildError, DiscoveryError, MinifyError, TemplateError};
use crate::minify::{minify_directory, Minifier, OxcMinifier};
use crate::pages::{discover_pages, Page};
use crate::quality::{check_coverage, lint_whitespace, CoverageError, CoverageSummary, ExternalTool, LintError};
use crate::render::{PageRenderer, PageTemplate};

/// Work performed by a registered task.
#[derive(Debug, Clone)]
pub enum TaskAction {
    Clean,
    BundleShared,
    BundlePage(Arc<Page>),
    RenderPage(Arc<Page>),
    /// Only orders its predecessors
    Group,
    Minify,
    LintWhitespace,
    LintPackage,
    LintTool(ExternalTool),
    Coverage,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Minify(#[from] MinifyError),

    #[error(transparent)]
    Lint(#[from] LintError),

    #[error(transparent)]
    Coverage(#[from] CoverageError),

    #[error("Failed to clean {}: {source}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("{} task(s) failed:\n{}", .0.len(), format_failures(.0))]
    TasksFailed(Vec<(String, PipelineError)>),
}

fn format_failures(failures: &[(String, PipelineError)]) -> String {
    failures
        .iter()
        .map(|(task, err)| format!("  {task}: {err}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A site's task graph together with everything its tasks need.
pub struct Pipeline {
    config: BuildConfig,
    pages: Vec<Arc<Page>>,
    graph: TaskGraph<TaskAction>,
    shared: SharedBundler,
    page_bundler: PageBundler,
    components: ComponentRegistry,
    minifier: Box<dyn Minifier>,
}

impl Pipeline {
    /// Discover pages and register every task.
    pub fn new(config: BuildConfig) -> Result<Self, PipelineError> {
        let pages: Vec<Arc<Page>> = discover_pages(&config.pages_dir, &config.build_dir)?
            .into_iter()
            .map(Arc::new)
            .collect();
        let graph = register_tasks(&config, &pages)?;

        Ok(Self {
            shared: SharedBundler::new(&config),
            page_bundler: PageBundler::new(&config),
            config,
            pages,
            graph,
            components: ComponentRegistry::new(),
            minifier: Box::new(OxcMinifier::default()),
        })
    }

    /// Use `components` to look up page components.
    pub fn with_components(mut self, components: ComponentRegistry) -> Self {
        self.components = components;
        self
    }

    pub fn with_minifier(mut self, minifier: impl Minifier + 'static) -> Self {
        self.minifier = Box::new(minifier);
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn graph(&self) -> &TaskGraph<TaskAction> {
        &self.graph
    }

    pub fn pages(&self) -> &[Arc<Page>] {
        &self.pages
    }

    pub fn shared_bundler(&self) -> &SharedBundler {
        &self.shared
    }

    /// Run `target` and its predecessors under the configured failure policy.
    pub fn run(&self, target: &str) -> Result<RunReport<PipelineError>, TaskError> {
        tracing::info!("Running '{}' ({} page(s))", target, self.pages.len());
        Runner::new(self.config.policy).run(&self.graph, target, self)
    }

    /// Like [`Pipeline::run`], but any failed task is an error.
    pub fn run_checked(&self, target: &str) -> Result<RunReport<PipelineError>, PipelineError> {
        let mut report = self.run(target)?;
        if report.is_success() {
            return Ok(report);
        }
        if !report.skipped.is_empty() {
            tracing::warn!("Skipped {} task(s): {}", report.skipped.len(), report.skipped.join(", "));
        }
        Err(PipelineError::TasksFailed(std::mem::take(&mut report.failed)))
    }

    fn clean(&self) -> Result<(), PipelineError> {
        let dir = &self.config.build_dir;
        match std::fs::remove_dir_all(dir) {
            Ok(()) => {
                tracing::debug!("Removed {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PipelineError::Clean {
                path: dir.clone(),
                source,
            }),
        }
    }

    fn render_page(&self, page: &Page) -> Result<(), PipelineError> {
        let component = self
            .components
            .load(&page.name, &page.entry)
            .map_err(|source| TemplateError::Render {
                page: page.name.clone(),
                source,
            })?;
        let template = PageTemplate::load(&self.config.template)?;
        PageRenderer::new(template, self.config.base_title.as_str()).render(page, component.as_ref())?;
        Ok(())
    }

    fn coverage(&self) -> Result<(), PipelineError> {
        let quality = &self.config.quality;
        if let Some(command) = &quality.test_command {
            command.run(&self.config.root).map_err(CoverageError::Runner)?;
        }
        let summary = CoverageSummary::load(&self.config.root.join(&quality.coverage_summary))?;
        check_coverage(&summary, &quality.thresholds)?;
        Ok(())
    }
}

impl TaskExecutor for Pipeline {
    type Action = TaskAction;
    type Error = PipelineError;

    fn execute(&self, task: &Task<TaskAction>) -> Result<(), PipelineError> {
        let quality = &self.config.quality;
        match &task.action {
            TaskAction::Clean => self.clean(),
            TaskAction::BundleShared => {
                self.shared.build(&self.config.shared_libs)?;
                Ok(())
            }
            TaskAction::BundlePage(page) => {
                self.page_bundler.build(page)?;
                Ok(())
            }
            TaskAction::RenderPage(page) => self.render_page(page),
            TaskAction::Group => Ok(()),
            TaskAction::Minify => {
                minify_directory(&self.config.build_dir, self.minifier.as_ref())?;
                Ok(())
            }
            TaskAction::LintWhitespace => {
                lint_whitespace(&self.config.root, &quality.whitespace, &quality.whitespace_rules)?;
                Ok(())
            }
            TaskAction::LintPackage => {
                lint_whitespace(&self.config.root, &quality.package_files, &quality.package_rules)?;
                Ok(())
            }
            TaskAction::LintTool(tool) => {
                tool.run(&self.config.root).map_err(LintError::Tool)?;
                Ok(())
            }
            TaskAction::Coverage => self.coverage(),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("pages", &self.pages)
            .field("tasks", &self.graph.len())
            .field("components", &self.components)
            .finish()
    }
}

fn register_tasks(config: &BuildConfig, pages: &[Arc<Page>]) -> Result<TaskGraph<TaskAction>, TaskError> {
    const NONE: &[&str] = &[];
    let mut builder = TaskGraphBuilder::new();

    builder.register("clean", NONE, TaskAction::Clean)?;
    builder.register("bundle:shared", &["clean"], TaskAction::BundleShared)?;

    let mut rendered = vec!["bundle:shared".to_string()];
    for page in pages {
        let bundle = format!("page:{}:bundle", page.name);
        let render = format!("page:{}:build-page", page.name);
        builder.register(bundle.clone(), &["bundle:shared"], TaskAction::BundlePage(Arc::clone(page)))?;
        builder.register(render.clone(), &[bundle], TaskAction::RenderPage(Arc::clone(page)))?;
        rendered.push(render);
    }
    builder.register("bundle", rendered.as_slice(), TaskAction::Group)?;

    let build = if config.minify {
        TaskAction::Minify
    } else {
        TaskAction::Group
    };
    builder.register("build", &["bundle"], build)?;

    let mut lints = vec!["lint:whitespace".to_string(), "lint:package".to_string()];
    builder.register("lint:whitespace", NONE, TaskAction::LintWhitespace)?;
    builder.register("lint:package", NONE, TaskAction::LintPackage)?;
    for tool in &config.quality.linters {
        let name = format!("lint:{}", tool.name);
        builder.register(name.clone(), NONE, TaskAction::LintTool(tool.clone()))?;
        lints.push(name);
    }
    builder.register("lint", lints.as_slice(), TaskAction::Group)?;

    builder.register("coverage", NONE, TaskAction::Coverage)?;
    builder.register("test", &["lint", "coverage"], TaskAction::Group)?;
    builder.register("default", &["test"], TaskAction::Group)?;

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaffold::scaffold;
    use explorer_render::{ClientContext, Component, Element, Node, RenderContext, RenderError};
    use explorer_tasks::FailurePolicy;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const LIBRARIES: &[&str] = &["react", "redux", "react-redux", "react-dom"];

    fn marker(name: &str) -> String {
        format!("IMPLEMENTATION OF {name}")
    }

    /// Scaffolded site with stand-in packages for every shared library.
    fn site() -> TempDir {
        let tmp = TempDir::new().unwrap();
        scaffold(tmp.path(), false).unwrap();
        for name in LIBRARIES {
            let dir = tmp.path().join("node_modules").join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(
                dir.join("index.js"),
                format!("/* {} */\nmodule.exports = {{ name: '{name}' }};\n", marker(name)),
            )
            .unwrap();
        }
        tmp
    }

    fn pipeline(root: &Path) -> Pipeline {
        Pipeline::new(BuildConfig::for_root(root)).unwrap()
    }

    #[test]
    fn registers_original_task_names() {
        let tmp = site();
        let pipeline = pipeline(tmp.path());

        let listing = pipeline.graph().listing();

        assert_eq!(
            listing.main_tasks,
            vec!["build", "bundle", "clean", "coverage", "default", "lint", "test"]
        );
        assert_eq!(
            listing.sub_tasks,
            vec![
                "bundle:shared",
                "lint:package",
                "lint:whitespace",
                "page:about:build-page",
                "page:about:bundle",
                "page:index:build-page",
                "page:index:bundle",
            ]
        );
    }

    #[test]
    fn build_writes_one_bundle_and_document_per_page() {
        let tmp = site();
        let pipeline = pipeline(tmp.path());

        let report = pipeline.run_checked("build").unwrap();

        assert!(report.skipped.is_empty());
        assert_eq!(pipeline.shared_bundler().build_count(), 1);
        let build = tmp.path().join("build");
        assert!(build.join("shared.js").is_file());
        assert!(build.join("shared.min.js").is_file());
        for page in ["about", "index"] {
            assert!(build.join(page).join("main.js").is_file());
            assert!(build.join(page).join("main.min.js").is_file());
            assert!(build.join(page).join("main.min.js.map").is_file());
            assert!(build.join(page).join("index.html").is_file());
        }
    }

    #[test]
    fn page_bundles_never_embed_shared_libraries() {
        let tmp = site();
        let pipeline = pipeline(tmp.path());

        pipeline.run_checked("bundle").unwrap();

        let shared = fs::read_to_string(tmp.path().join("build/shared.js")).unwrap();
        for page in ["about", "index"] {
            let code = fs::read_to_string(tmp.path().join("build").join(page).join("main.js")).unwrap();
            for name in LIBRARIES {
                assert!(!code.contains(&marker(name)), "{page} embeds {name}");
                assert!(shared.contains(&marker(name)));
            }
            assert!(code.contains("components/navigation/Navigation.jsx"));
        }
    }

    #[test]
    fn documents_carry_component_titles() {
        let tmp = site();
        let pipeline = pipeline(tmp.path());

        pipeline.run_checked("bundle").unwrap();

        let about = fs::read_to_string(tmp.path().join("build/about/index.html")).unwrap();
        let index = fs::read_to_string(tmp.path().join("build/index/index.html")).unwrap();
        assert!(about.contains("<title>Project Explorer | About</title>"));
        assert!(about.contains("<h1>Hello!</h1>"));
        assert!(index.contains("<title>Project Explorer </title>"));
        assert!(index.contains("<nav class=\"navigation\">"));
    }

    #[derive(Default)]
    struct MountCounter {
        mounts: AtomicUsize,
    }

    impl Component for MountCounter {
        fn name(&self) -> &str {
            "MountCounter"
        }

        fn title(&self) -> Option<&str> {
            Some("About")
        }

        fn render(&self, _ctx: &RenderContext) -> Result<Node, RenderError> {
            Ok(Element::new("main").text("counted").into())
        }

        fn did_mount(&self, client: &mut ClientContext<'_>) {
            self.mounts.fetch_add(1, Ordering::SeqCst);
            client.alert("browser only");
        }
    }

    #[test]
    fn rendering_never_runs_client_hooks() {
        let tmp = site();
        let counter = Arc::new(MountCounter::default());
        let mut components = ComponentRegistry::new();
        components.register("about", counter.clone());
        let pipeline = pipeline(tmp.path()).with_components(components);

        pipeline.run_checked("page:about:build-page").unwrap();

        let html = fs::read_to_string(tmp.path().join("build/about/index.html")).unwrap();
        assert!(html.contains("<main>counted</main>"));
        assert_eq!(counter.mounts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_shared_library_aborts_before_pages() {
        let tmp = site();
        fs::remove_dir_all(tmp.path().join("node_modules/redux")).unwrap();
        let pipeline = pipeline(tmp.path());

        let err = pipeline.run_checked("bundle").unwrap_err();

        let PipelineError::TasksFailed(failed) = err else {
            panic!("expected task failures");
        };
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "bundle:shared");
        assert!(!tmp.path().join("build/about/main.js").exists());
    }

    #[test]
    fn keep_going_confines_a_page_failure() {
        let tmp = site();
        fs::write(tmp.path().join("pages/about/About.jsx"), "export default class {\n").unwrap();
        let mut config = BuildConfig::for_root(tmp.path());
        config.policy = FailurePolicy::KeepGoing;
        let pipeline = Pipeline::new(config).unwrap();

        let report = pipeline.run("bundle").unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "page:about:bundle");
        assert!(report.completed.contains(&"page:index:build-page".to_string()));
        let mut skipped = report.skipped.clone();
        skipped.sort();
        assert_eq!(skipped, vec!["bundle".to_string(), "page:about:build-page".to_string()]);
    }

    #[test]
    fn clean_removes_previous_output() {
        let tmp = site();
        fs::create_dir_all(tmp.path().join("build/stale")).unwrap();
        fs::write(tmp.path().join("build/stale/main.js"), "old").unwrap();
        let pipeline = pipeline(tmp.path());

        pipeline.run_checked("clean").unwrap();

        assert!(!tmp.path().join("build").exists());
    }

    #[test]
    fn scaffold_passes_whitespace_lint() {
        let tmp = site();
        let pipeline = pipeline(tmp.path());

        let report = pipeline.run_checked("lint").unwrap();

        assert_eq!(report.completed.len(), 3);
    }

    #[test]
    fn coverage_gate_reads_the_summary() {
        let tmp = site();
        let summary = tmp.path().join("coverage/coverage-summary.json");
        fs::create_dir_all(summary.parent().unwrap()).unwrap();
        fs::write(
            &summary,
            r#"{"total": {"statements": {"pct": 79}, "branches": {"pct": 85}, "functions": {"pct": 90}, "lines": {"pct": 95}}}"#,
        )
        .unwrap();
        let pipeline = pipeline(tmp.path());

        let err = pipeline.run_checked("coverage").unwrap_err();

        let PipelineError::TasksFailed(failed) = err else {
            panic!("expected task failures");
        };
        let PipelineError::Coverage(coverage) = &failed[0].1 else {
            panic!("expected a coverage failure");
        };
        assert_eq!(coverage.failed_categories(), vec![crate::quality::CoverageCategory::Statements]);
    }

    #[test]
    fn missing_pages_directory_fails_discovery() {
        let tmp = TempDir::new().unwrap();

        let err = Pipeline::new(BuildConfig::for_root(tmp.path())).unwrap_err();

        assert!(matches!(err, PipelineError::Discovery(DiscoveryError::Missing(_))));
    }
}
