// SPDX-License-Identifier: MIT

//! BUILD_DATASET executor (spec.md §4.5): admits on the BUILD token
//! category, reads the parent INJECT_FAULT's `InjectionSchedule` for the
//! fault window it must package, and creates the build job.

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

pub struct BuildDatasetExecutor;

#[async_trait]
impl<A: JobAdapter, C: Clock> Executor<A, C> for BuildDatasetExecutor {
    async fn execute(
        &self,
        ctx: &TaskContext<A, C>,
        task: &Task,
    ) -> Result<ExecOutcome, ExecutorError> {
        let namespace = payload::string(&task.payload, fields::NAMESPACE)?;
        let benchmark = payload::string(&task.payload, fields::BENCHMARK)?;
        let image = payload::string(&task.payload, fields::BUILD_IMAGE)?;

        let parent_id = task.parent_task_id.ok_or_else(|| {
            ExecutorError::Validation("BUILD_DATASET requires parent_task_id".into())
        })?;
        let injection = ctx
            .records
            .get_injection(parent_id)
            .map_err(|err| ExecutorError::Validation(err.to_string()))?;

        let lease_ttl = Duration::from_secs(ctx.config.token_lease_ttl_secs);
        if let Some(outcome) =
            acquire_token_or_reschedule(ctx, task, Category::Build, lease_ttl).await?
        {
            return Ok(outcome);
        }

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
        env.insert("BENCHMARK".into(), benchmark.clone());
        env.insert("NAMESPACE".into(), namespace.clone());
        if let Some(start) = injection.start_time_epoch_ms {
            env.insert("FAULT_START_TIME".into(), start.to_string());
        }
        if let Some(end) = injection.end_time_epoch_ms {
            env.insert("FAULT_END_TIME".into(), end.to_string());
        }

        let spec = JobSpec {
            task_id: task.id,
            namespace,
            image,
            command: None,
            labels,
            annotations,
            env,
        };
        let job_name = spec.job_name();
        ctx.adapter.create_job(spec).await?;
        ctx.bus.append(task.trace_id, Event::JobAdded { task_id: task.id, job_name }, None);

        Ok(ExecOutcome::AwaitingCallback)
    }
}

#[cfg(test)]
#[path = "build_dataset_tests.rs"]
mod tests;
