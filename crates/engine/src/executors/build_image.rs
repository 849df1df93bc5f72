// SPDX-License-Identifier: MIT

//! BUILD_IMAGE executor (SPEC_FULL.md §3 supplement, spec.md §4.5 pattern):
//! admits on the BUILD token category and creates the job that checks out
//! `source_revision` and builds a benchmark's container image.

use std::time::Duration;

use async_trait::async_trait;
use rcab_adapters::spec::base_env;
use rcab_adapters::{mandatory_annotations, mandatory_labels, JobAdapter, JobSpec};
use rcab_arbiter::Category;
use rcab_core::task::payload;
use rcab_core::{Clock, ContainerRecord, Event, ExecutionState, Task};

use super::arbitration::acquire_token_or_reschedule;
use super::fields;
use crate::context::TaskContext;
use crate::error::ExecutorError;
use crate::executor::{ExecOutcome, Executor};

pub struct BuildImageExecutor;

#[async_trait]
impl<A: JobAdapter, C: Clock> Executor<A, C> for BuildImageExecutor {
    async fn execute(
        &self,
        ctx: &TaskContext<A, C>,
        task: &Task,
    ) -> Result<ExecOutcome, ExecutorError> {
        let benchmark = payload::string(&task.payload, fields::BENCHMARK)?;
        let source_revision = payload::string(&task.payload, fields::SOURCE_REVISION)?;
        let builder_image = payload::optional_string(&task.payload, fields::BUILDER_IMAGE)
            .unwrap_or_else(|| ctx.config.image_builder_image.clone());

        let lease_ttl = Duration::from_secs(ctx.config.token_lease_ttl_secs);
        if let Some(outcome) =
            acquire_token_or_reschedule(ctx, task, Category::Build, lease_ttl).await?
        {
            return Ok(outcome);
        }

        ctx.records.put_container(ContainerRecord {
            task_id: task.id,
            benchmark: benchmark.clone(),
            source_revision: source_revision.clone(),
            image_ref: None,
            built_at_epoch_ms: None,
            status: ExecutionState::Created,
        });

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
        env.insert("BENCHMARK".into(), benchmark);
        env.insert("SOURCE_REVISION".into(), source_revision);

        let spec = JobSpec {
            task_id: task.id,
            namespace: ctx.config.kube_namespace.clone(),
            image: builder_image,
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
#[path = "build_image_tests.rs"]
mod tests;
