// SPDX-License-Identifier: MIT

//! Translates the Job Adapter's outward `LifecycleEvent` stream back into
//! task-store transitions (spec.md §4.6, §5 "waits for job completion are
//! not in-worker"). Runs as its own driver alongside the worker pool,
//! delayed-queue and cron drivers (`Scheduler::run`): one task per event
//! source rather than polling them from inside the worker loop.

use std::sync::Arc;

use rcab_adapters::{JobAdapter, LifecycleEvent};
use rcab_arbiter::Category;
use rcab_core::{
    Clock, Event, ExecutionState, PedestalRecord, Task, TaskConfig, TaskId, TaskState, TaskType,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::arbitration::release_namespace;
use super::fields;
use crate::scheduler::Scheduler;

/// Runs until `cancel` fires or the adapter's broadcast channel closes.
pub async fn run<A: JobAdapter, C: Clock>(scheduler: Arc<Scheduler<A, C>>, cancel: CancellationToken) {
    let mut rx = scheduler.adapter().subscribe();
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return,
            event = rx.recv() => event,
        };

        match event {
            Ok(event) => handle_event(&scheduler, event).await,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "callback router lagged behind lifecycle event stream");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Resolves the mandatory `task_id` label back to a live, RUNNING task.
/// `None` means a stale callback for a task that already finished
/// (cancellation, duplicate watch event, or a lagged/replayed
/// notification) — the caller should silently drop it.
fn running_task_for<A: JobAdapter, C: Clock>(
    scheduler: &Scheduler<A, C>,
    labels: &std::collections::BTreeMap<String, String>,
) -> Option<Task> {
    let task_id: TaskId = labels.get("task_id")?.parse().ok()?;
    let task = scheduler.store().get_task(task_id).ok()?;
    if task.state != TaskState::Running {
        return None;
    }
    Some(task)
}

async fn handle_event<A: JobAdapter, C: Clock>(scheduler: &Arc<Scheduler<A, C>>, event: LifecycleEvent) {
    match event {
        LifecycleEvent::JobAdded { .. } | LifecycleEvent::InjectionAdded { .. } => {}

        LifecycleEvent::JobSucceeded { labels, .. } => {
            let Some(task) = running_task_for(scheduler, &labels) else { return };
            on_job_succeeded(scheduler, task, labels).await;
        }

        LifecycleEvent::JobFailed { labels, reason, .. } => {
            let Some(task) = running_task_for(scheduler, &labels) else { return };
            on_job_failed(scheduler, task, reason).await;
        }

        LifecycleEvent::InjectionSucceeded { labels, start_time_epoch_ms, end_time_epoch_ms, .. } => {
            let Some(task) = running_task_for(scheduler, &labels) else { return };
            on_injection_succeeded(scheduler, task, start_time_epoch_ms, end_time_epoch_ms).await;
        }

        LifecycleEvent::InjectionFailed { labels, reason, .. } => {
            let Some(task) = running_task_for(scheduler, &labels) else { return };
            on_injection_failed(scheduler, task, reason).await;
        }
    }
}

async fn on_injection_succeeded<A: JobAdapter, C: Clock>(
    scheduler: &Arc<Scheduler<A, C>>,
    task: Task,
    start_ms: u64,
    end_ms: u64,
) {
    let namespace = task
        .payload
        .get(fields::NAMESPACE)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    release_namespace(scheduler.namespace_lock(), &task, &namespace);

    let _ = scheduler.records().update_injection(task.id, |schedule| {
        schedule.status = rcab_core::InjectionStatus::InjectSuccess;
        schedule.start_time_epoch_ms = Some(start_ms);
        schedule.end_time_epoch_ms = Some(end_ms);
    });

    let now = scheduler.clock().epoch_ms();
    if let Ok(updated) = scheduler.store().update_task_state(task.id, TaskState::Completed, None, now) {
        scheduler.bus().append(
            updated.trace_id,
            Event::TaskCompleted { task_id: task.id, trace_id: updated.trace_id },
            None,
        );
    }
    scheduler.bus().append(
        task.trace_id,
        Event::FaultInjectionCompleted { task_id: task.id, namespace },
        None,
    );
    crate::trace_finalize::finalize_trace(scheduler.store(), scheduler.bus(), task.trace_id);

    submit_build_dataset(scheduler, &task, now);
}

async fn on_injection_failed<A: JobAdapter, C: Clock>(
    scheduler: &Arc<Scheduler<A, C>>,
    task: Task,
    reason: String,
) {
    let namespace = task
        .payload
        .get(fields::NAMESPACE)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    release_namespace(scheduler.namespace_lock(), &task, &namespace);

    let _ = scheduler.records().update_injection(task.id, |schedule| {
        schedule.status = rcab_core::InjectionStatus::InjectFailed;
    });

    scheduler.bus().append(
        task.trace_id,
        Event::FaultInjectionFailed { task_id: task.id, namespace, reason: reason.clone() },
        None,
    );

    let now = scheduler.clock().epoch_ms();
    if let Err(err) = scheduler.apply_retry(&task, reason, now) {
        tracing::warn!(task_id = %task.id, error = %err, "failed to apply retry policy after injection failure");
    }
}

fn submit_build_dataset<A: JobAdapter, C: Clock>(scheduler: &Arc<Scheduler<A, C>>, task: &Task, now: u64) {
    let mut payload = rcab_core::task::Payload::new();
    for key in [
        fields::NAMESPACE,
        fields::BENCHMARK,
        fields::BUILD_IMAGE,
        fields::DETECTOR_IMAGE,
        fields::DETECTOR_VERSION_ID,
        fields::PENDING_ALGORITHMS,
    ] {
        if let Some(value) = task.payload.get(key) {
            payload.insert(key.to_string(), value.clone());
        }
    }

    let config = TaskConfig {
        task_type: TaskType::BuildDataset,
        immediate: true,
        execute_time_epoch_ms: None,
        cron_expr: None,
        retry_policy: task.retry_policy,
        payload,
        trace_id: task.trace_id,
        group_id: task.group_id,
        parent_task_id: Some(task.id),
        project_id: task.project_id.clone(),
        user_id: task.user_id.clone(),
        trace_carrier: task.trace_carrier.clone(),
        group_carrier: task.group_carrier.clone(),
    };
    if let Err(err) = scheduler.submit(config, now) {
        tracing::warn!(task_id = %task.id, error = %err, "failed to submit BUILD_DATASET successor");
    }
}

async fn on_job_succeeded<A: JobAdapter, C: Clock>(
    scheduler: &Arc<Scheduler<A, C>>,
    task: Task,
    labels: std::collections::BTreeMap<String, String>,
) {
    let now = scheduler.clock().epoch_ms();

    match task.task_type {
        TaskType::BuildDataset => {
            scheduler.token_bucket().release(Category::Build, task.id, task.trace_id);
            let dataset_id = labels.get("dataset_id").cloned().unwrap_or_else(|| task.id.to_string());
            scheduler.bus().append(
                task.trace_id,
                Event::DatapackBuildSucceed { task_id: task.id, dataset_id: dataset_id.clone() },
                None,
            );
            complete_task(scheduler, &task, now);
            submit_run_algorithm_detector(scheduler, &task, &dataset_id, now);
        }
        TaskType::RunAlgorithm => {
            scheduler.token_bucket().release(Category::Execute, task.id, task.trace_id);
            if let Some(execution_id) = find_execution_id(scheduler, task.id) {
                let updated = scheduler.records().update_execution(execution_id, |record| {
                    record.state = ExecutionState::Success;
                    record.labels.extend(labels.clone());
                });
                if let Some(record) = updated {
                    scheduler.bus().append(
                        task.trace_id,
                        Event::AlgoRunSucceed { task_id: task.id, execution_id: record.id },
                        None,
                    );
                }
            }
            complete_task(scheduler, &task, now);
            submit_collect_result(scheduler, &task, now);
        }
        TaskType::BuildImage => {
            scheduler.token_bucket().release(Category::Build, task.id, task.trace_id);
            let image_ref = labels.get("image_ref").cloned().unwrap_or_else(|| task.id.to_string());
            let _ = scheduler.records().update_container(task.id, |record| {
                record.image_ref = Some(image_ref.clone());
                record.built_at_epoch_ms = Some(now);
                record.status = ExecutionState::Success;
            });
            scheduler.bus().append(
                task.trace_id,
                Event::ImageBuildSucceed { task_id: task.id, image_ref },
                None,
            );
            complete_task(scheduler, &task, now);
        }
        TaskType::RestartPedestal => {
            let namespace = task
                .payload
                .get(fields::NAMESPACE)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let helm_release = task
                .payload
                .get(fields::HELM_RELEASE)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            release_namespace(scheduler.namespace_lock(), &task, &namespace);
            scheduler.records().put_pedestal(PedestalRecord {
                namespace: namespace.clone(),
                helm_release: helm_release.clone(),
                revision: 1,
                status: ExecutionState::Success,
            });
            scheduler.bus().append(
                task.trace_id,
                Event::PedestalRestarted { task_id: task.id, namespace, helm_release },
                None,
            );
            complete_task(scheduler, &task, now);
        }
        TaskType::InjectFault | TaskType::CollectResult => {
            // INJECT_FAULT reports through Injection* events, not Job*;
            // COLLECT_RESULT never fronts a job at all (see `collect_result`).
        }
    }
}

async fn on_job_failed<A: JobAdapter, C: Clock>(scheduler: &Arc<Scheduler<A, C>>, task: Task, reason: String) {
    let now = scheduler.clock().epoch_ms();

    match task.task_type {
        TaskType::BuildDataset => {
            scheduler.token_bucket().release(Category::Build, task.id, task.trace_id);
            scheduler.bus().append(
                task.trace_id,
                Event::DatapackBuildFailed { task_id: task.id, reason: reason.clone() },
                None,
            );
        }
        TaskType::RunAlgorithm => {
            scheduler.token_bucket().release(Category::Execute, task.id, task.trace_id);
            if let Some(execution_id) = find_execution_id(scheduler, task.id) {
                if let Some(record) = scheduler.records().update_execution(execution_id, |record| {
                    record.state = ExecutionState::Failed;
                }) {
                    scheduler.bus().append(
                        task.trace_id,
                        Event::AlgoRunFailed {
                            task_id: task.id,
                            execution_id: record.id,
                            reason: reason.clone(),
                        },
                        None,
                    );
                }
            }
        }
        TaskType::BuildImage => {
            scheduler.token_bucket().release(Category::Build, task.id, task.trace_id);
            scheduler.bus().append(
                task.trace_id,
                Event::ImageBuildFailed { task_id: task.id, reason: reason.clone() },
                None,
            );
        }
        TaskType::RestartPedestal => {
            let namespace = task
                .payload
                .get(fields::NAMESPACE)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            release_namespace(scheduler.namespace_lock(), &task, &namespace);
        }
        TaskType::InjectFault | TaskType::CollectResult => {}
    }

    if let Err(err) = scheduler.apply_retry(&task, reason, now) {
        tracing::warn!(task_id = %task.id, error = %err, "failed to apply retry policy after job failure");
    }
}

fn complete_task<A: JobAdapter, C: Clock>(scheduler: &Arc<Scheduler<A, C>>, task: &Task, now: u64) {
    if let Ok(updated) = scheduler.store().update_task_state(task.id, TaskState::Completed, None, now) {
        scheduler.bus().append(
            updated.trace_id,
            Event::TaskCompleted { task_id: task.id, trace_id: updated.trace_id },
            None,
        );
        crate::trace_finalize::finalize_trace(scheduler.store(), scheduler.bus(), updated.trace_id);
    }
}

fn find_execution_id<A: JobAdapter, C: Clock>(
    scheduler: &Arc<Scheduler<A, C>>,
    task_id: TaskId,
) -> Option<rcab_core::ExecutionId> {
    scheduler.records().find_execution_by_task(task_id).map(|record| record.id)
}

fn submit_run_algorithm_detector<A: JobAdapter, C: Clock>(
    scheduler: &Arc<Scheduler<A, C>>,
    task: &Task,
    dataset_id: &str,
    now: u64,
) {
    let mut payload = rcab_core::task::Payload::new();
    if let Some(namespace) = task.payload.get(fields::NAMESPACE) {
        payload.insert(fields::NAMESPACE.to_string(), namespace.clone());
    }
    if let Some(image) = task.payload.get(fields::DETECTOR_IMAGE) {
        payload.insert(fields::ALGORITHM_IMAGE.to_string(), image.clone());
    }
    if let Some(version) = task.payload.get(fields::DETECTOR_VERSION_ID) {
        payload.insert(fields::ALGORITHM_VERSION_ID.to_string(), version.clone());
    }
    payload.insert(fields::DATAPACK_ID.to_string(), dataset_id.into());
    payload.insert(fields::ROLE.to_string(), fields::ROLE_DETECTOR.into());
    if let Some(pending) = task.payload.get(fields::PENDING_ALGORITHMS) {
        payload.insert(fields::PENDING_ALGORITHMS.to_string(), pending.clone());
    }

    let config = TaskConfig {
        task_type: TaskType::RunAlgorithm,
        immediate: true,
        execute_time_epoch_ms: None,
        cron_expr: None,
        retry_policy: task.retry_policy,
        payload,
        trace_id: task.trace_id,
        group_id: task.group_id,
        parent_task_id: Some(task.id),
        project_id: task.project_id.clone(),
        user_id: task.user_id.clone(),
        trace_carrier: task.trace_carrier.clone(),
        group_carrier: task.group_carrier.clone(),
    };
    if let Err(err) = scheduler.submit(config, now) {
        tracing::warn!(task_id = %task.id, error = %err, "failed to submit detector RUN_ALGORITHM successor");
    }
}

fn submit_collect_result<A: JobAdapter, C: Clock>(scheduler: &Arc<Scheduler<A, C>>, task: &Task, now: u64) {
    let mut payload = rcab_core::task::Payload::new();
    if let Some(role) = task.payload.get(fields::ROLE) {
        payload.insert(fields::ROLE.to_string(), role.clone());
    }
    if let Some(pending) = task.payload.get(fields::PENDING_ALGORITHMS) {
        payload.insert(fields::PENDING_ALGORITHMS.to_string(), pending.clone());
    }

    let config = TaskConfig {
        task_type: TaskType::CollectResult,
        immediate: true,
        execute_time_epoch_ms: None,
        cron_expr: None,
        retry_policy: task.retry_policy,
        payload,
        trace_id: task.trace_id,
        group_id: task.group_id,
        parent_task_id: Some(task.id),
        project_id: task.project_id.clone(),
        user_id: task.user_id.clone(),
        trace_carrier: task.trace_carrier.clone(),
        group_carrier: task.group_carrier.clone(),
    };
    if let Err(err) = scheduler.submit(config, now) {
        tracing::warn!(task_id = %task.id, error = %err, "failed to submit COLLECT_RESULT successor");
    }
}

#[cfg(test)]
#[path = "callback_router_tests.rs"]
mod tests;
