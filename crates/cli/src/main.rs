// SPDX-License-Identifier: MIT

//! `rcab` — operator CLI for the benchmarking control plane.
//!
//! Each subcommand is a thin call into the library crates the daemon itself
//! wires up (spec.md §6, SPEC_FULL.md "AMBIENT CLI"): `submit` composes a
//! submission file into a group/trace/head-task chain, `list`/`show` read
//! back Task Store state, `cancel` drives the scheduler's cancellation path,
//! and `stream` tails a trace's Event Bus as newline-delimited JSON. There is
//! no wire/HTTP transport to a separately-running daemon (that binding is
//! out of scope, per spec.md §1) — every invocation wires its own
//! short-lived `Service` against the real cluster, the same way the daemon
//! does, so `list`/`show`/`cancel` only see tasks submitted earlier in the
//! *same* invocation. See DESIGN.md for why this is the right boundary to
//! draw without a wire protocol.

mod submission_dto;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rcab_adapters::{InjectionResourceKind, KubeJobAdapter};
use rcab_composer::Submission;
use rcab_core::{format_wall_clock, Config, SystemClock, TaskId, TraceId};
use rcab_daemon::Service;
use rcab_storage::{Pagination, TaskFilter};

use submission_dto::SubmissionDto;

#[derive(Parser)]
#[command(name = "rcab", about = "Operator CLI for the RCA benchmarking control plane")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compose a submission file into a group/trace/head-task chain.
    Submit {
        /// Path to a JSON submission file (see submission_dto.rs for the shape).
        file: PathBuf,
    },
    /// List tasks, optionally filtered by trace.
    List {
        #[arg(long)]
        trace_id: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        size: u32,
    },
    /// Show one task by id.
    Show {
        task_id: String,
    },
    /// Cancel a pending or running task.
    Cancel {
        task_id: String,
    },
    /// Tail a trace's event log as newline-delimited JSON.
    Stream {
        trace_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let service = build_service(config).await?;

    match cli.command {
        Command::Submit { file } => submit(&service, &file)?,
        Command::List { trace_id, page, size } => list(&service, trace_id.as_deref(), page, size)?,
        Command::Show { task_id } => show(&service, &task_id)?,
        Command::Cancel { task_id } => cancel(&service, &task_id)?,
        Command::Stream { trace_id } => stream(&service, &trace_id).await?,
    }

    Ok(())
}

async fn build_service(config: Config) -> Result<Arc<Service<KubeJobAdapter, SystemClock>>, anyhow::Error> {
    let injection_kind = InjectionResourceKind {
        group: config.injection_group.clone(),
        version: config.injection_version.clone(),
        kind: config.injection_kind.clone(),
    };
    let adapter = Arc::new(
        KubeJobAdapter::new(config.kube_namespace.clone(), injection_kind, config.log_dir.clone())
            .await
            .map_err(anyhow::Error::from)?,
    );
    Ok(Arc::new(Service::new(config, adapter, SystemClock)))
}

fn submit(service: &Service<KubeJobAdapter, SystemClock>, file: &PathBuf) -> Result<(), anyhow::Error> {
    let contents = std::fs::read_to_string(file)?;
    let dto: SubmissionDto = serde_json::from_str(&contents)?;
    let submission: Submission = dto.into();

    let result = service.submit(submission)?;
    println!("group_id: {}", result.group_id);
    for trace in &result.traces {
        println!(
            "  item[{}] trace_id={} head_tasks={}",
            trace.index,
            trace.trace_id,
            trace.head_task_ids.iter().map(TaskId::to_string).collect::<Vec<_>>().join(",")
        );
    }
    Ok(())
}

fn list(
    service: &Service<KubeJobAdapter, SystemClock>,
    trace_id: Option<&str>,
    page: u32,
    size: u32,
) -> Result<(), anyhow::Error> {
    let mut filter = TaskFilter::default();
    if let Some(trace_id) = trace_id {
        filter.trace_id = Some(trace_id.parse::<TraceId>()?);
    }
    let pagination = Pagination::new(page, size)?;
    let (tasks, total) = service.scheduler().store().list_tasks(&filter, pagination);
    let timezone = &service.scheduler().config().timezone;
    for task in &tasks {
        println!(
            "{} [{:?}] created {}",
            task.id,
            task.state,
            format_wall_clock(task.created_at_epoch_ms, timezone)
        );
    }
    eprintln!("{} of {} total", tasks.len(), total);
    Ok(())
}

fn show(service: &Service<KubeJobAdapter, SystemClock>, task_id: &str) -> Result<(), anyhow::Error> {
    let task_id = task_id.parse::<TaskId>()?;
    let task = service.scheduler().store().get_task(task_id)?;
    let timezone = &service.scheduler().config().timezone;
    println!("{}", serde_json::to_string_pretty(&task)?);
    println!("created_at: {}", format_wall_clock(task.created_at_epoch_ms, timezone));
    println!("updated_at: {}", format_wall_clock(task.updated_at_epoch_ms, timezone));
    Ok(())
}

fn cancel(service: &Service<KubeJobAdapter, SystemClock>, task_id: &str) -> Result<(), anyhow::Error> {
    let task_id = task_id.parse::<TaskId>()?;
    let now = service.scheduler().clock().epoch_ms();
    service.scheduler().cancel(task_id, now)?;
    println!("cancelled {task_id}");
    Ok(())
}

async fn stream(service: &Service<KubeJobAdapter, SystemClock>, trace_id: &str) -> Result<(), anyhow::Error> {
    let trace_id = trace_id.parse::<TraceId>()?;
    let mut subscription = service.scheduler().bus().subscribe(trace_id, 0);
    while let Some(event) = subscription.next().await {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
