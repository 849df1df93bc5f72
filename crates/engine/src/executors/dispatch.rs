// SPDX-License-Identifier: MIT

//! Maps a task's `type` tag to the `Executor` that handles it (spec.md §4.5,
//! §9 "Tagged task variants": "`execute(ctx, task)` dispatches on the tag to
//! a per-type handler with a typed payload projection").

use std::collections::HashMap;
use std::sync::Arc;

use rcab_adapters::JobAdapter;
use rcab_core::{Clock, TaskType};

use crate::executor::Executor;
use crate::executors::{
    build_dataset::BuildDatasetExecutor, build_image::BuildImageExecutor,
    collect_result::CollectResultExecutor, inject_fault::InjectFaultExecutor,
    restart_pedestal::RestartPedestalExecutor, run_algorithm::RunAlgorithmExecutor,
};

/// Owns one boxed `Executor` per `TaskType`. Built once at daemon startup
/// and shared (via `Arc`) across the whole worker pool.
pub struct ExecutorRegistry<A: JobAdapter, C: Clock> {
    handlers: HashMap<TaskType, Arc<dyn Executor<A, C>>>,
}

impl<A: JobAdapter, C: Clock> ExecutorRegistry<A, C> {
    /// Wires up the six stock executors named in spec.md §4.5.
    pub fn standard() -> Self {
        let mut handlers: HashMap<TaskType, Arc<dyn Executor<A, C>>> = HashMap::new();
        handlers.insert(TaskType::InjectFault, Arc::new(InjectFaultExecutor));
        handlers.insert(TaskType::BuildDataset, Arc::new(BuildDatasetExecutor));
        handlers.insert(TaskType::RunAlgorithm, Arc::new(RunAlgorithmExecutor));
        handlers.insert(TaskType::CollectResult, Arc::new(CollectResultExecutor));
        handlers.insert(TaskType::BuildImage, Arc::new(BuildImageExecutor));
        handlers.insert(TaskType::RestartPedestal, Arc::new(RestartPedestalExecutor));
        Self { handlers }
    }

    /// Overrides or adds a handler; used by tests to substitute a fake for
    /// a single task type while keeping the rest of the standard registry.
    pub fn with_override(mut self, task_type: TaskType, handler: Arc<dyn Executor<A, C>>) -> Self {
        self.handlers.insert(task_type, handler);
        self
    }

    pub fn for_type(&self, task_type: TaskType) -> Arc<dyn Executor<A, C>> {
        Arc::clone(
            self.handlers
                .get(&task_type)
                .unwrap_or_else(|| panic!("no executor registered for {task_type}")),
        )
    }
}

impl<A: JobAdapter, C: Clock> Default for ExecutorRegistry<A, C> {
    fn default() -> Self {
        Self::standard()
    }
}
