// SPDX-License-Identifier: MIT

//! INJECT_FAULT executor (spec.md §4.5): acquires the namespace exclusively
//! for the injection's whole window, creates the fault-injection custom
//! resource, and waits for the orchestrator's lifecycle callback.

use std::time::Duration;

use async_trait::async_trait;
use rcab_adapters::{mandatory_annotations, mandatory_labels, InjectionSpec, JobAdapter};
use rcab_core::task::payload;
use rcab_core::{Clock, Event, InjectionSchedule, Task};

use super::arbitration::acquire_namespace_or_reschedule;
use super::fields;
use crate::context::TaskContext;
use crate::error::ExecutorError;
use crate::executor::{ExecOutcome, Executor};

pub struct InjectFaultExecutor;

#[async_trait]
impl<A: JobAdapter, C: Clock> Executor<A, C> for InjectFaultExecutor {
    async fn execute(
        &self,
        ctx: &TaskContext<A, C>,
        task: &Task,
    ) -> Result<ExecOutcome, ExecutorError> {
        let namespace = payload::string(&task.payload, fields::NAMESPACE)?;
        let fault_type = payload::string(&task.payload, fields::FAULT_TYPE)?;
        let benchmark = payload::string(&task.payload, fields::BENCHMARK)?;
        let pre_duration = payload::positive_int_secs(&task.payload, fields::PRE_DURATION)?;
        let fault_duration = payload::positive_int_secs(&task.payload, fields::FAULT_DURATION)?;
        let display_config = task.payload.get(fields::DISPLAY_CONFIG).cloned().unwrap_or(serde_json::Value::Null);
        let engine_config = task.payload.get(fields::ENGINE_CONFIG).cloned().unwrap_or(serde_json::Value::Null);

        let ttl = Duration::from_secs(
            pre_duration + fault_duration + ctx.config.namespace_lock_safety_margin_secs,
        );
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

        let spec = InjectionSpec {
            task_id: task.id,
            namespace: namespace.clone(),
            fault_type: fault_type.clone(),
            display_config: display_config.clone(),
            engine_config: engine_config.clone(),
            pre_duration_sec: pre_duration,
            fault_duration_sec: fault_duration,
            benchmark: benchmark.clone(),
            labels,
            annotations,
        };

        let mut schedule = InjectionSchedule::new(
            task.id,
            fault_type,
            display_config,
            engine_config,
            pre_duration,
            fault_duration,
            benchmark.clone(),
            namespace.clone(),
        );
        schedule.injection_name = Some(spec.injection_name());
        ctx.records.put_injection(schedule);

        ctx.adapter.create_injection(spec).await?;

        ctx.bus.append(
            task.trace_id,
            Event::FaultInjectionStarted { task_id: task.id, namespace, benchmark },
            None,
        );

        Ok(ExecOutcome::AwaitingCallback)
    }
}

#[cfg(test)]
#[path = "inject_fault_tests.rs"]
mod tests;
