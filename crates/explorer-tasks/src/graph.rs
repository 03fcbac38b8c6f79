//! Task DAG construction and wave planning.

use std::collections::{HashMap, HashSet};

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

/// A named unit of work.
#[derive(Debug, Clone)]
pub struct Task<A> {
    pub name: String,
    pub predecessors: Vec<String>,
    pub action: A,
}

/// Errors raised while declaring or planning tasks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("Registering '{task}' after '{predecessor}' would create a dependency cycle")]
    Cycle { task: String, predecessor: String },

    #[error("Task '{task}' depends on unknown task '{predecessor}'")]
    UnknownPredecessor { task: String, predecessor: String },

    #[error("Task '{0}' is not registered")]
    UnknownTask(String),

    #[error("Dependency cycle detected in task graph")]
    CycleDetected,
}

/// Collects task registrations.
///
/// Predecessors may be named before they are registered; every name must be
/// registered by the time [`TaskGraphBuilder::build`] is called.
#[derive(Debug)]
pub struct TaskGraphBuilder<A> {
    /// Edges run from predecessor to dependent.
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
    tasks: HashMap<String, Task<A>>,
    order: Vec<String>,
}

impl<A> Default for TaskGraphBuilder<A> {
    fn default() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            tasks: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<A> TaskGraphBuilder<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Fails without side effects on duplicates and cycles.
    pub fn register<S: AsRef<str>>(
        &mut self,
        name: impl Into<String>,
        predecessors: &[S],
        action: A,
    ) -> Result<(), TaskError> {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            return Err(TaskError::DuplicateTask(name));
        }

        let mut preds: Vec<String> = Vec::new();
        for pred in predecessors {
            let pred = pred.as_ref();
            if !preds.iter().any(|p| p == pred) {
                preds.push(pred.to_string());
            }
        }

        // An edge pred -> name closes a cycle iff name already reaches pred.
        for pred in &preds {
            let closes_cycle = *pred == name
                || match (self.index.get(&name), self.index.get(pred)) {
                    (Some(&from), Some(&to)) => has_path_connecting(&self.graph, from, to, None),
                    _ => false,
                };
            if closes_cycle {
                return Err(TaskError::Cycle {
                    task: name,
                    predecessor: pred.clone(),
                });
            }
        }

        let node = self.node(&name);
        for pred in &preds {
            let pred_node = self.node(pred);
            self.graph.add_edge(pred_node, node, ());
        }

        self.order.push(name.clone());
        self.tasks.insert(
            name.clone(),
            Task {
                name,
                predecessors: preds,
                action,
            },
        );
        Ok(())
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Validate all predecessors exist and freeze the graph.
    pub fn build(self) -> Result<TaskGraph<A>, TaskError> {
        for name in &self.order {
            let task = &self.tasks[name];
            if let Some(missing) = task.predecessors.iter().find(|p| !self.tasks.contains_key(*p)) {
                return Err(TaskError::UnknownPredecessor {
                    task: name.clone(),
                    predecessor: missing.clone(),
                });
            }
        }

        toposort(&self.graph, None).map_err(|_| TaskError::CycleDetected)?;

        Ok(TaskGraph {
            graph: self.graph,
            index: self.index,
            tasks: self.tasks,
            order: self.order,
        })
    }
}

/// A validated, acyclic task graph.
#[derive(Debug)]
pub struct TaskGraph<A> {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
    tasks: HashMap<String, Task<A>>,
    order: Vec<String>,
}

/// Registered task names for display, split at the `:` naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListing<'a> {
    pub main_tasks: Vec<&'a str>,
    pub sub_tasks: Vec<&'a str>,
}

impl<A> TaskGraph<A> {
    pub fn get(&self, name: &str) -> Option<&Task<A>> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Tasks in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task<A>> {
        self.order.iter().map(|name| &self.tasks[name])
    }

    /// Main tasks and sub-tasks (names containing `:`), each sorted.
    pub fn listing(&self) -> TaskListing<'_> {
        let (mut sub_tasks, mut main_tasks): (Vec<&str>, Vec<&str>) =
            self.order.iter().map(String::as_str).partition(|name| name.contains(':'));
        main_tasks.sort_unstable();
        sub_tasks.sort_unstable();
        TaskListing { main_tasks, sub_tasks }
    }

    /// `target` and all of its transitive predecessors.
    pub fn closure(&self, target: &str) -> Result<HashSet<String>, TaskError> {
        let start = *self
            .index
            .get(target)
            .ok_or_else(|| TaskError::UnknownTask(target.to_string()))?;

        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if seen.insert(idx) {
                stack.extend(self.graph.neighbors_directed(idx, Direction::Incoming));
            }
        }
        Ok(seen.into_iter().map(|idx| self.graph[idx].clone()).collect())
    }

    /// Execution waves for `target`: every task's predecessors sit in earlier
    /// waves. Tasks within a wave are in registration order.
    pub fn waves(&self, target: &str) -> Result<Vec<Vec<String>>, TaskError> {
        let members = self.closure(target)?;

        let mut in_degree: HashMap<&str, usize> = members
            .iter()
            .map(|name| (name.as_str(), self.tasks[name].predecessors.len()))
            .collect();

        let mut waves = Vec::new();
        while !in_degree.is_empty() {
            let ready: Vec<String> = self
                .order
                .iter()
                .filter(|name| in_degree.get(name.as_str()) == Some(&0))
                .cloned()
                .collect();

            if ready.is_empty() {
                return Err(TaskError::CycleDetected);
            }

            for name in &ready {
                in_degree.remove(name.as_str());
                let idx = self.index[name];
                for dependent in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                    if let Some(degree) = in_degree.get_mut(self.graph[dependent].as_str()) {
                        *degree -= 1;
                    }
                }
            }
            waves.push(ready);
        }

        Ok(waves)
    }

    /// Transitive dependents of `name`.
    pub fn dependents(&self, name: &str) -> HashSet<String> {
        let Some(&start) = self.index.get(name) else {
            return HashSet::new();
        };
        let mut seen = HashSet::new();
        let mut stack: Vec<NodeIndex> = self.graph.neighbors_directed(start, Direction::Outgoing).collect();
        while let Some(idx) = stack.pop() {
            if seen.insert(idx) {
                stack.extend(self.graph.neighbors_directed(idx, Direction::Outgoing));
            }
        }
        seen.into_iter().map(|idx| self.graph[idx].clone()).collect()
    }
}
