// SPDX-License-Identifier: MIT

//! Domain repositories for the records executors own outright (spec.md §3
//! "Ownership": "Executors never mutate persistent state except through
//! Task Store and the domain repositories they own"). One `parking_lot`
//! guarded map per record kind, the same shape as `TaskStore`'s
//! materialized state but keyed by the record's own identity rather than
//! folded from events.

use parking_lot::Mutex;
use rcab_core::{
    ContainerRecord, ExecutionId, ExecutionRecord, InjectionSchedule, PedestalRecord, TaskId,
};
use std::collections::HashMap;

use crate::error::StorageError;

/// Injection Schedules, Execution Records, Container Records and Pedestal
/// Records (spec.md §3, SPEC_FULL.md §3 supplements).
#[derive(Default)]
pub struct RecordStore {
    injections: Mutex<HashMap<TaskId, InjectionSchedule>>,
    executions: Mutex<HashMap<ExecutionId, ExecutionRecord>>,
    containers: Mutex<HashMap<TaskId, ContainerRecord>>,
    pedestals: Mutex<HashMap<(String, String), PedestalRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_injection(&self, schedule: InjectionSchedule) {
        self.injections.lock().insert(schedule.task_id, schedule);
    }

    pub fn get_injection(&self, task_id: TaskId) -> Result<InjectionSchedule, StorageError> {
        self.injections.lock().get(&task_id).cloned().ok_or(StorageError::TaskNotFound(task_id))
    }

    pub fn update_injection(
        &self,
        task_id: TaskId,
        f: impl FnOnce(&mut InjectionSchedule),
    ) -> Result<InjectionSchedule, StorageError> {
        let mut injections = self.injections.lock();
        let schedule = injections.get_mut(&task_id).ok_or(StorageError::TaskNotFound(task_id))?;
        f(schedule);
        Ok(schedule.clone())
    }

    pub fn put_execution(&self, record: ExecutionRecord) {
        self.executions.lock().insert(record.id, record);
    }

    pub fn get_execution(&self, id: ExecutionId) -> Option<ExecutionRecord> {
        self.executions.lock().get(&id).cloned()
    }

    pub fn update_execution(
        &self,
        id: ExecutionId,
        f: impl FnOnce(&mut ExecutionRecord),
    ) -> Option<ExecutionRecord> {
        let mut executions = self.executions.lock();
        let record = executions.get_mut(&id)?;
        f(record);
        Some(record.clone())
    }

    /// Finds the execution record produced for `task_id` — each RUN_ALGORITHM
    /// task produces exactly one, so COLLECT_RESULT looks it up by its
    /// `parent_task_id` rather than by execution id directly.
    pub fn find_execution_by_task(&self, task_id: TaskId) -> Option<ExecutionRecord> {
        self.executions.lock().values().find(|r| r.task_id == task_id).cloned()
    }

    pub fn put_container(&self, record: ContainerRecord) {
        self.containers.lock().insert(record.task_id, record);
    }

    pub fn get_container(&self, task_id: TaskId) -> Option<ContainerRecord> {
        self.containers.lock().get(&task_id).cloned()
    }

    pub fn update_container(
        &self,
        task_id: TaskId,
        f: impl FnOnce(&mut ContainerRecord),
    ) -> Option<ContainerRecord> {
        let mut containers = self.containers.lock();
        let record = containers.get_mut(&task_id)?;
        f(record);
        Some(record.clone())
    }

    pub fn put_pedestal(&self, record: PedestalRecord) {
        self.pedestals.lock().insert((record.namespace.clone(), record.helm_release.clone()), record);
    }

    pub fn get_pedestal(&self, namespace: &str, helm_release: &str) -> Option<PedestalRecord> {
        self.pedestals.lock().get(&(namespace.to_string(), helm_release.to_string())).cloned()
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
