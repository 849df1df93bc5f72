// SPDX-License-Identifier: MIT

//! RESTART_PEDESTAL executor (SPEC_FULL.md §3 supplement, spec.md §4.5
//! pattern): acquires the same namespace lock INJECT_FAULT uses (a Helm
//! upgrade and a running fault injection must never overlap in one
//! namespace) and creates the job that drives the Helm install/upgrade.

use std::time::Duration;

use async_trait::async_trait;
use rcab_adapters::spec::base_env;
use rcab_adapters::{mandatory_annotations, mandatory_labels, JobAdapter, JobSpec};
use rcab_core::task::payload;
use rcab_core::{Clock, Event, Task};

use super::arbitration::acquire_namespace_or_reschedule;
use super::fields;
use crate::context::{deadline_for, TaskContext};
use crate::error::ExecutorError;
use crate::executor::{ExecOutcome, Executor};

pub struct RestartPedestalExecutor;

#[async_trait]
impl<A: JobAdapter, C: Clock> Executor<A, C> for RestartPedestalExecutor {
    async fn execute(
        &self,
        ctx: &TaskContext<A, C>,
        task: &Task,
    ) -> Result<ExecOutcome, ExecutorError> {
        let namespace = payload::string(&task.payload, fields::NAMESPACE)?;
        let helm_release = payload::string(&task.payload, fields::HELM_RELEASE)?;
        let helm_chart = payload::string(&task.payload, fields::HELM_CHART)?;
        let values = task.payload.get("values").cloned().unwrap_or(serde_json::Value::Null);

        let ttl = deadline_for(task.task_type)
            + Duration::from_secs(ctx.config.namespace_lock_safety_margin_secs);
        if let Some(outcome) =
            acquire_namespace_or_reschedule(ctx, task, &namespace, ttl).await?
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
        env.insert("HELM_RELEASE".into(), helm_release.clone());
        env.insert("HELM_CHART".into(), helm_chart.clone());
        env.insert("HELM_VALUES".into(), values.to_string());

        let spec = JobSpec {
            task_id: task.id,
            namespace,
            image: ctx.config.pedestal_upgrader_image.clone(),
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
#[path = "restart_pedestal_tests.rs"]
mod tests;
