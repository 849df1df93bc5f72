// SPDX-License-Identifier: MIT

//! The Pipeline Composer (spec.md §4.8, component C8): turns a `Submission`
//! into a `Group`, one `Trace` per submission item, and that trace's head
//! task(s) — the downstream chain is produced by the executors themselves
//! (spec.md §4.8, §4.5).

use std::sync::Arc;

use opentelemetry::global;
use rcab_adapters::JobAdapter;
use rcab_core::task::Payload;
use rcab_core::{
    Carrier, Clock, Group, GroupId, TaskConfig, TaskId, TaskType, Trace, TraceId, TraceType,
};
use rcab_engine::executors::fields;
use rcab_engine::Scheduler;

use crate::error::ComposerError;
use crate::overlap::reject_overlaps;
use crate::submission::{AlgorithmRunRequest, InjectionRequest, Submission, SubmissionItem};

/// One trace produced from one submission item, with the ids a caller needs
/// to track it (spec.md §6 "Response: group id + list of (index, trace id,
/// head task id)").
#[derive(Debug, Clone)]
pub struct TraceSubmission {
    pub index: usize,
    pub trace_id: TraceId,
    pub head_task_ids: Vec<TaskId>,
}

#[derive(Debug, Clone)]
pub struct SubmissionResult {
    pub group_id: GroupId,
    pub traces: Vec<TraceSubmission>,
}

/// Derives task DAGs from domain requests and hands their head tasks to the
/// scheduler (spec.md §4.8).
pub struct Composer<A: JobAdapter, C: Clock> {
    scheduler: Arc<Scheduler<A, C>>,
}

impl<A: JobAdapter, C: Clock> Composer<A, C> {
    pub fn new(scheduler: Arc<Scheduler<A, C>>) -> Self {
        Self { scheduler }
    }

    /// Turns one `Submission` into a group, its traces, and their head
    /// tasks. Validation (empty submission, overlapping injection windows)
    /// happens before any store write (spec.md §7 `ValidationError`: "no
    /// side effects").
    pub fn compose(&self, submission: Submission) -> Result<SubmissionResult, ComposerError> {
        if submission.items.is_empty() {
            return Err(ComposerError::EmptySubmission);
        }
        for (index, item) in submission.items.iter().enumerate() {
            if let SubmissionItem::AlgorithmRun(run) = item {
                if run.algorithms.is_empty() {
                    return Err(ComposerError::NoAlgorithms(index));
                }
            }
        }

        let now = self.scheduler.clock().epoch_ms();

        let injection_items: Vec<(usize, &InjectionRequest)> = submission
            .items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match item {
                SubmissionItem::Injection(request) => Some((index, request)),
                SubmissionItem::AlgorithmRun(_) => None,
            })
            .collect();
        reject_overlaps(&injection_items, now)?;

        let group_carrier = carrier_from_current_span();
        let group = Group::new(submission.project_id.clone(), now);
        let group_id = group.id;

        let mut traces = Vec::with_capacity(submission.items.len());
        let mut new_traces: Vec<Trace> = Vec::with_capacity(submission.items.len());
        let mut head_configs: Vec<TaskConfig> = Vec::new();

        for (index, item) in submission.items.into_iter().enumerate() {
            match item {
                SubmissionItem::Injection(request) => {
                    let leaf_num = 1 + request.user_algorithms.len() as u32;
                    let trace_type = if request.user_algorithms.is_empty() {
                        TraceType::DatapackBuild
                    } else {
                        TraceType::FullPipeline
                    };
                    let trace = Trace::new(trace_type, group_id, &submission.project_id, leaf_num, now);
                    let trace_id = trace.id;
                    let trace_carrier = carrier_from_current_span();

                    let config = inject_fault_config(
                        &request,
                        trace_id,
                        group_id,
                        &submission.project_id,
                        &submission.user_id,
                        trace_carrier,
                        group_carrier.clone(),
                    );

                    traces.push(TraceSubmission { index, trace_id, head_task_ids: Vec::new() });
                    new_traces.push(trace);
                    head_configs.push(config);
                }
                SubmissionItem::AlgorithmRun(request) => {
                    let leaf_num = request.algorithms.len() as u32;
                    let trace =
                        Trace::new(TraceType::AlgorithmRun, group_id, &submission.project_id, leaf_num, now);
                    let trace_id = trace.id;
                    let trace_carrier = carrier_from_current_span();

                    for algorithm in &request.algorithms {
                        let config = run_algorithm_config(
                            &request,
                            algorithm,
                            trace_id,
                            group_id,
                            &submission.project_id,
                            &submission.user_id,
                            trace_carrier.clone(),
                            group_carrier.clone(),
                        );
                        head_configs.push(config);
                    }

                    traces.push(TraceSubmission { index, trace_id, head_task_ids: Vec::new() });
                    new_traces.push(trace);
                }
            }
        }

        // Only now, with validation complete, do we touch the store.
        let mut group = group;
        for trace in &new_traces {
            group.add_member(trace.id);
        }
        self.scheduler.store().create_group(group)?;
        for trace in new_traces {
            self.scheduler.store().create_trace(trace)?;
        }

        let mut configs_by_trace: std::collections::HashMap<TraceId, Vec<TaskConfig>> =
            std::collections::HashMap::new();
        for config in head_configs {
            configs_by_trace.entry(config.trace_id).or_default().push(config);
        }

        for trace_submission in &mut traces {
            let configs = configs_by_trace.remove(&trace_submission.trace_id).unwrap_or_default();
            for config in configs {
                if config.cron_expr.is_some() {
                    self.scheduler.register_cron(config, now)?;
                } else {
                    let task = self.scheduler.submit(config, now)?;
                    trace_submission.head_task_ids.push(task.id);
                }
            }
        }

        Ok(SubmissionResult { group_id, traces })
    }
}

#[allow(clippy::too_many_arguments)]
fn inject_fault_config(
    request: &InjectionRequest,
    trace_id: TraceId,
    group_id: GroupId,
    project_id: &str,
    user_id: &str,
    trace_carrier: Carrier,
    group_carrier: Carrier,
) -> TaskConfig {
    let mut payload = Payload::new();
    payload.insert(fields::NAMESPACE.into(), request.namespace.clone().into());
    payload.insert(fields::FAULT_TYPE.into(), request.fault_type.clone().into());
    payload.insert(fields::BENCHMARK.into(), request.benchmark.clone().into());
    payload.insert(fields::PRE_DURATION.into(), request.pre_duration_sec.into());
    payload.insert(fields::FAULT_DURATION.into(), request.fault_duration_sec.into());
    payload.insert(fields::DISPLAY_CONFIG.into(), request.display_config.clone());
    payload.insert(fields::ENGINE_CONFIG.into(), request.engine_config.clone());
    payload.insert(fields::BUILD_IMAGE.into(), request.build_image.clone().into());
    payload.insert(fields::DETECTOR_IMAGE.into(), request.detector_algorithm_image.clone().into());
    payload.insert(fields::DETECTOR_VERSION_ID.into(), request.detector_algorithm_version_id.clone().into());
    if !request.user_algorithms.is_empty() {
        let pending: Vec<fields::PendingAlgorithm> =
            request.user_algorithms.iter().map(Into::into).collect();
        payload.insert(fields::PENDING_ALGORITHMS.into(), fields::pending_algorithms_to_value(&pending));
    }

    TaskConfig {
        task_type: TaskType::InjectFault,
        immediate: request.execute_time_epoch_ms.is_none() && request.cron_expr.is_none(),
        execute_time_epoch_ms: request.execute_time_epoch_ms,
        cron_expr: request.cron_expr.clone(),
        retry_policy: request.retry_policy.unwrap_or_default(),
        payload,
        trace_id,
        group_id,
        parent_task_id: None,
        project_id: project_id.to_string(),
        user_id: user_id.to_string(),
        trace_carrier,
        group_carrier,
    }
}

#[allow(clippy::too_many_arguments)]
fn run_algorithm_config(
    request: &AlgorithmRunRequest,
    algorithm: &fields::PendingAlgorithm,
    trace_id: TraceId,
    group_id: GroupId,
    project_id: &str,
    user_id: &str,
    trace_carrier: Carrier,
    group_carrier: Carrier,
) -> TaskConfig {
    let mut payload = Payload::new();
    payload.insert(fields::NAMESPACE.into(), request.namespace.clone().into());
    payload.insert(fields::ALGORITHM_IMAGE.into(), algorithm.algorithm_image.clone().into());
    payload.insert(fields::ALGORITHM_VERSION_ID.into(), algorithm.algorithm_version_id.clone().into());
    payload.insert(fields::DATAPACK_ID.into(), request.datapack_id.clone().into());
    payload.insert(fields::ROLE.into(), fields::ROLE_USER.into());

    TaskConfig {
        task_type: TaskType::RunAlgorithm,
        immediate: request.execute_time_epoch_ms.is_none() && request.cron_expr.is_none(),
        execute_time_epoch_ms: request.execute_time_epoch_ms,
        cron_expr: request.cron_expr.clone(),
        retry_policy: request.retry_policy.unwrap_or_default(),
        payload,
        trace_id,
        group_id,
        parent_task_id: None,
        project_id: project_id.to_string(),
        user_id: user_id.to_string(),
        trace_carrier,
        group_carrier,
    }
}

/// Captures the current tracing span's context into a fresh `Carrier`
/// (spec.md §4.7 "Composer initializes both [carriers] at submission").
/// Empty if there is no active span or no global propagator configured —
/// a task with no upstream trace context is still valid.
fn carrier_from_current_span() -> Carrier {
    use tracing_opentelemetry::OpenTelemetrySpanExt;
    let mut carrier = Carrier::new();
    let context = tracing::Span::current().context();
    global::get_text_map_propagator(|propagator| propagator.inject_context(&context, &mut carrier));
    carrier
}

#[cfg(test)]
#[path = "composer_tests.rs"]
mod tests;
