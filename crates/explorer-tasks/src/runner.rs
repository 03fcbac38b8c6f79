//! Wave-based task execution.

use std::collections::HashSet;
use std::time::Instant;

use rayon::prelude::*;

use crate::graph::{Task, TaskError, TaskGraph};

/// What happens to the rest of a run once a task fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Finish the current wave, then start nothing else.
    #[default]
    Abort,

    /// Skip only the failed task's transitive dependents.
    KeepGoing,
}

/// Performs the work behind task actions.
pub trait TaskExecutor: Sync {
    type Action: Sync;
    type Error: std::error::Error + Send;

    fn execute(&self, task: &Task<Self::Action>) -> Result<(), Self::Error>;
}

/// Outcome of running a target.
#[derive(Debug)]
pub struct RunReport<E> {
    pub completed: Vec<String>,
    pub failed: Vec<(String, E)>,
    pub skipped: Vec<String>,
}

impl<E> RunReport<E> {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs targets of a task graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runner {
    pub policy: FailurePolicy,
}

impl Runner {
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    /// Run `target` and its transitive predecessors, each exactly once.
    ///
    /// Task failures are collected in the report; only planning problems
    /// (an unknown target) are returned as errors.
    pub fn run<X: TaskExecutor>(
        &self,
        graph: &TaskGraph<X::Action>,
        target: &str,
        executor: &X,
    ) -> Result<RunReport<X::Error>, TaskError> {
        let waves = graph.waves(target)?;
        let mut report = RunReport {
            completed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        };
        let mut blocked: HashSet<String> = HashSet::new();
        let mut aborted = false;

        for wave in waves {
            if aborted {
                report.skipped.extend(wave);
                continue;
            }

            let (runnable, skipped): (Vec<String>, Vec<String>) =
                wave.into_iter().partition(|name| !blocked.contains(name));
            for name in &skipped {
                tracing::warn!("Skipping '{}' after an upstream failure", name);
            }
            report.skipped.extend(skipped);

            let results: Vec<(String, Result<(), X::Error>)> = runnable
                .into_par_iter()
                .filter_map(|name| {
                    let task = graph.get(&name)?;
                    tracing::info!("Starting '{}'...", name);
                    let started = Instant::now();
                    let result = executor.execute(task);
                    match &result {
                        Ok(()) => tracing::info!("Finished '{}' after {:.2?}", name, started.elapsed()),
                        Err(e) => tracing::error!("'{}' errored after {:.2?}: {}", name, started.elapsed(), e),
                    }
                    Some((name, result))
                })
                .collect();

            for (name, result) in results {
                match result {
                    Ok(()) => report.completed.push(name),
                    Err(e) => {
                        match self.policy {
                            FailurePolicy::Abort => aborted = true,
                            FailurePolicy::KeepGoing => blocked.extend(graph.dependents(&name)),
                        }
                        report.failed.push((name, e));
                    }
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TaskGraphBuilder;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("{0} failed")]
    struct Failed(String);

    #[derive(Default)]
    struct Recorder {
        fail: Vec<&'static str>,
        log: Mutex<Vec<String>>,
        shared_builds: AtomicUsize,
    }

    impl TaskExecutor for Recorder {
        type Action = ();
        type Error = Failed;

        fn execute(&self, task: &Task<()>) -> Result<(), Failed> {
            if task.name == "bundle:shared" {
                self.shared_builds.fetch_add(1, Ordering::SeqCst);
            }
            self.log.lock().unwrap().push(task.name.clone());
            if self.fail.contains(&task.name.as_str()) {
                return Err(Failed(task.name.clone()));
            }
            Ok(())
        }
    }

    fn site(pages: &[&str]) -> TaskGraph<()> {
        let mut builder = TaskGraphBuilder::new();
        builder.register("clean", &[] as &[&str], ()).unwrap();
        builder.register("bundle:shared", &["clean"], ()).unwrap();
        let mut rendered = Vec::new();
        for page in pages {
            let bundle = format!("page:{page}:bundle");
            let render = format!("page:{page}:build-page");
            builder.register(bundle.clone(), &["bundle:shared"], ()).unwrap();
            builder.register(render.clone(), &[bundle], ()).unwrap();
            rendered.push(render);
        }
        builder.register("bundle", rendered.as_slice(), ()).unwrap();
        builder.build().unwrap()
    }

    fn position(log: &[String], name: &str) -> usize {
        log.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn shared_task_runs_once_before_every_page() {
        let graph = site(&["about", "index", "projects"]);
        let recorder = Recorder::default();

        let report = Runner::default().run(&graph, "bundle", &recorder).unwrap();

        assert!(report.is_success());
        assert_eq!(report.completed.len(), 9);
        assert_eq!(recorder.shared_builds.load(Ordering::SeqCst), 1);
        let log = recorder.log.lock().unwrap();
        for page in ["about", "index", "projects"] {
            assert!(position(&log, "bundle:shared") < position(&log, &format!("page:{page}:bundle")));
            assert!(
                position(&log, &format!("page:{page}:bundle")) < position(&log, &format!("page:{page}:build-page"))
            );
        }
    }

    #[test]
    fn abort_stops_after_failing_wave() {
        let graph = site(&["about", "index"]);
        let recorder = Recorder {
            fail: vec!["page:about:bundle"],
            ..Default::default()
        };

        let report = Runner::new(FailurePolicy::Abort).run(&graph, "bundle", &recorder).unwrap();

        assert_eq!(report.failed.len(), 1);
        assert!(report.completed.contains(&"page:index:bundle".to_string()));
        assert!(report.skipped.contains(&"page:index:build-page".to_string()));
        assert!(report.skipped.contains(&"bundle".to_string()));
    }

    #[test]
    fn keep_going_only_skips_dependents() {
        let graph = site(&["about", "index"]);
        let recorder = Recorder {
            fail: vec!["page:about:bundle"],
            ..Default::default()
        };

        let report = Runner::new(FailurePolicy::KeepGoing)
            .run(&graph, "bundle", &recorder)
            .unwrap();

        assert!(report.completed.contains(&"page:index:build-page".to_string()));
        let mut skipped = report.skipped.clone();
        skipped.sort();
        assert_eq!(skipped, vec!["bundle".to_string(), "page:about:build-page".to_string()]);
    }

    #[test]
    fn failed_shared_bundle_blocks_every_page() {
        let graph = site(&["about", "index"]);
        let recorder = Recorder {
            fail: vec!["bundle:shared"],
            ..Default::default()
        };

        let report = Runner::new(FailurePolicy::KeepGoing)
            .run(&graph, "bundle", &recorder)
            .unwrap();

        assert_eq!(report.completed, vec!["clean".to_string()]);
        assert_eq!(report.skipped.len(), 5);
    }

    #[test]
    fn runs_only_the_targets_closure() {
        let graph = site(&["about", "index"]);
        let recorder = Recorder::default();

        let report = Runner::default()
            .run(&graph, "page:index:bundle", &recorder)
            .unwrap();

        assert_eq!(
            report.completed,
            vec!["clean".to_string(), "bundle:shared".to_string(), "page:index:bundle".to_string()]
        );
    }

    #[test]
    fn unknown_target_is_an_error() {
        let graph = site(&["about"]);

        let err = Runner::default().run(&graph, "deploy", &Recorder::default()).unwrap_err();

        assert_eq!(err, TaskError::UnknownTask("deploy".to_string()));
    }
}
