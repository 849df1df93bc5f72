// SPDX-License-Identifier: MIT

//! COLLECT_RESULT executor (spec.md §4.5): the only executor that never
//! fronts an orchestrator job. It reads the `ExecutionRecord` its parent
//! RUN_ALGORITHM produced and, for the detector role, fans out the
//! benchmark-declared follow-up algorithms — or short-circuits the trace
//! straight to COMPLETED if the detector found nothing to chase (spec.md §8
//! "detector-no-anomaly short circuit").

use async_trait::async_trait;
use rcab_core::task::payload;
use rcab_core::{Clock, Event, ExecutionRecord, ExecutionState, Task, TaskConfig};

use super::fields::{self, PendingAlgorithm};
use crate::context::TaskContext;
use crate::error::ExecutorError;
use crate::executor::{ExecOutcome, Executor};

pub struct CollectResultExecutor;

const ANOMALIES_LABEL: &str = "anomalies_count";

#[async_trait]
impl<A: rcab_adapters::JobAdapter, C: Clock> Executor<A, C> for CollectResultExecutor {
    async fn execute(
        &self,
        ctx: &TaskContext<A, C>,
        task: &Task,
    ) -> Result<ExecOutcome, ExecutorError> {
        let role = payload::optional_string(&task.payload, fields::ROLE)
            .unwrap_or_else(|| fields::ROLE_USER.to_string());
        let parent_id = task.parent_task_id.ok_or_else(|| {
            ExecutorError::Validation("COLLECT_RESULT requires parent_task_id".into())
        })?;

        let record = ctx.records.find_execution_by_task(parent_id).ok_or_else(|| {
            ExecutorError::Permanent(format!("no execution record produced by task {parent_id}"))
        })?;

        if role == fields::ROLE_DETECTOR {
            self.collect_detector(ctx, task, record)
        } else {
            self.collect_user(ctx, task, record)
        }
    }
}

impl CollectResultExecutor {
    fn collect_user<A: rcab_adapters::JobAdapter, C: Clock>(
        &self,
        ctx: &TaskContext<A, C>,
        task: &Task,
        record: ExecutionRecord,
    ) -> Result<ExecOutcome, ExecutorError> {
        let event = if record.state == ExecutionState::Success {
            Event::AlgoResultCollection { task_id: task.id, execution_id: record.id }
        } else {
            Event::AlgoNoResultData { task_id: task.id, execution_id: record.id }
        };
        ctx.bus.append(task.trace_id, event, None);
        Ok(ExecOutcome::Completed)
    }

    fn collect_detector<A: rcab_adapters::JobAdapter, C: Clock>(
        &self,
        ctx: &TaskContext<A, C>,
        task: &Task,
        record: ExecutionRecord,
    ) -> Result<ExecOutcome, ExecutorError> {
        if record.state != ExecutionState::Success {
            ctx.bus.append(
                task.trace_id,
                Event::DatapackNoDetectorData { task_id: task.id },
                None,
            );
            return self.complete_with_short_circuit(ctx, task);
        }

        let anomalies: u32 =
            record.labels.get(ANOMALIES_LABEL).and_then(|v| v.parse().ok()).unwrap_or(0);

        if anomalies == 0 {
            ctx.bus.append(task.trace_id, Event::DatapackNoAnomaly { task_id: task.id }, None);
            return self.complete_with_short_circuit(ctx, task);
        }

        ctx.bus.append(
            task.trace_id,
            Event::DatapackResultCollection { task_id: task.id, anomalies },
            None,
        );

        let pending = fields::pending_algorithms_from_payload(&task.payload);
        let now = ctx.clock.epoch_ms();
        for algorithm in pending {
            self.submit_run_algorithm(ctx, task, &record, &algorithm, now)?;
        }

        Ok(ExecOutcome::Completed)
    }

    fn submit_run_algorithm<A: rcab_adapters::JobAdapter, C: Clock>(
        &self,
        ctx: &TaskContext<A, C>,
        task: &Task,
        record: &ExecutionRecord,
        algorithm: &PendingAlgorithm,
        now: u64,
    ) -> Result<(), ExecutorError> {
        let mut payload = rcab_core::task::Payload::new();
        payload.insert(fields::NAMESPACE.into(), task.payload.get(fields::NAMESPACE).cloned().unwrap_or_default());
        payload.insert(fields::ALGORITHM_IMAGE.into(), algorithm.algorithm_image.clone().into());
        payload.insert(
            fields::ALGORITHM_VERSION_ID.into(),
            algorithm.algorithm_version_id.clone().into(),
        );
        payload.insert(fields::DATAPACK_ID.into(), record.datapack_id.clone().into());
        payload.insert(fields::ROLE.into(), fields::ROLE_USER.into());

        let config = TaskConfig {
            task_type: rcab_core::TaskType::RunAlgorithm,
            immediate: true,
            execute_time_epoch_ms: None,
            cron_expr: None,
            retry_policy: task.retry_policy,
            payload,
            trace_id: task.trace_id,
            group_id: task.group_id,
            parent_task_id: task.parent_task_id,
            project_id: task.project_id.clone(),
            user_id: task.user_id.clone(),
            trace_carrier: task.trace_carrier.clone(),
            group_carrier: task.group_carrier.clone(),
        };
        ctx.scheduler.submit(config, now).map_err(|err| ExecutorError::Infra(err.to_string()))?;
        Ok(())
    }

    fn complete_with_short_circuit<A: rcab_adapters::JobAdapter, C: Clock>(
        &self,
        ctx: &TaskContext<A, C>,
        task: &Task,
    ) -> Result<ExecOutcome, ExecutorError> {
        let now = ctx.clock.epoch_ms();
        ctx.store
            .short_circuit_trace_complete(task.trace_id, now)
            .map_err(|err| ExecutorError::Infra(err.to_string()))?;
        Ok(ExecOutcome::Completed)
    }
}

#[cfg(test)]
#[path = "collect_result_tests.rs"]
mod tests;
