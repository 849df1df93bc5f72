// SPDX-License-Identifier: MIT

//! RUN_ALGORITHM executor (spec.md §4.5): admits on the EXECUTE token
//! category and creates the job that runs one algorithm (detector or
//! user-submitted) against a built datapack.

use std::time::Duration;

use async_trait::async_trait;
use rcab_adapters::spec::base_env;
use rcab_adapters::{mandatory_annotations, mandatory_labels, JobAdapter, JobSpec};
use rcab_arbiter::Category;
use rcab_core::task::payload;
use rcab_core::{Clock, Event, Task};

use super::arbitration::acquire_token_or_reschedule;
use super::fields;
use crate::context::TaskContext;
use crate::error::ExecutorError;
use crate::executor::{ExecOutcome, Executor};

pub struct RunAlgorithmExecutor;

#[async_trait]
impl<A: JobAdapter, C: Clock> Executor<A, C> for RunAlgorithmExecutor {
    async fn execute(
        &self,
        ctx: &TaskContext<A, C>,
        task: &Task,
    ) -> Result<ExecOutcome, ExecutorError> {
        let namespace = payload::string(&task.payload, fields::NAMESPACE)?;
        let image = payload::string(&task.payload, fields::ALGORITHM_IMAGE)?;
        let algorithm_version_id = payload::string(&task.payload, fields::ALGORITHM_VERSION_ID)?;
        let datapack_id = payload::string(&task.payload, fields::DATAPACK_ID)?;
        let role = payload::optional_string(&task.payload, fields::ROLE)
            .unwrap_or_else(|| fields::ROLE_USER.to_string());

        let lease_ttl = Duration::from_secs(ctx.config.token_lease_ttl_secs);
        if let Some(outcome) =
            acquire_token_or_reschedule(ctx, task, Category::Execute, lease_ttl).await?
        {
            return Ok(outcome);
        }

        let record = rcab_core::ExecutionRecord::new(task.id, algorithm_version_id.clone(), datapack_id.clone());
        ctx.records.put_execution(record);

        let labels = mandatory_labels(
            task.id,
            task.trace_id,
            task.group_id,
            &task.project_id,
            &task.user_id,
            task.task_type,
        );
        let annotations = mandatory_annotations(&task.trace_carrier, &task.group_carrier);
        let now = ctx.clock.epoch_ms();
        let mut env = base_env(&ctx.config.timezone, now, &ctx.config.workspace_root.display().to_string());
        env.insert("ALGORITHM_VERSION_ID".into(), algorithm_version_id);
        env.insert("DATAPACK_ID".into(), datapack_id);
        env.insert("ROLE".into(), role);

        let spec = JobSpec { task_id: task.id, namespace, image, command: None, labels, annotations, env };
        let job_name = spec.job_name();
        ctx.adapter.create_job(spec).await?;
        ctx.bus.append(task.trace_id, Event::JobAdded { task_id: task.id, job_name }, None);

        Ok(ExecOutcome::AwaitingCallback)
    }
}

#[cfg(test)]
#[path = "run_algorithm_tests.rs"]
mod tests;
