// SPDX-License-Identifier: MIT

//! On-disk JSON shape for `rcab submit`, mirroring the Submission API DTOs
//! in `rcab-composer` (spec.md §6) since those domain types intentionally
//! don't derive `serde` — only the CLI's file format needs to.

use rcab_composer::{AlgorithmRequest, AlgorithmRunRequest, InjectionRequest, Submission, SubmissionItem};
use rcab_core::RetryPolicy;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AlgorithmRequestDto {
    pub algorithm_version_id: String,
    pub algorithm_image: String,
}

impl From<AlgorithmRequestDto> for AlgorithmRequest {
    fn from(dto: AlgorithmRequestDto) -> Self {
        AlgorithmRequest {
            algorithm_version_id: dto.algorithm_version_id,
            algorithm_image: dto.algorithm_image,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RetryPolicyDto {
    pub max_attempts: u32,
    pub backoff_sec: u64,
}

impl From<RetryPolicyDto> for RetryPolicy {
    fn from(dto: RetryPolicyDto) -> Self {
        RetryPolicy::new(dto.max_attempts, dto.backoff_sec)
    }
}

#[derive(Debug, Deserialize)]
pub struct InjectionRequestDto {
    pub namespace: String,
    pub fault_type: String,
    pub benchmark: String,
    pub pre_duration_sec: u64,
    pub fault_duration_sec: u64,
    #[serde(default)]
    pub display_config: serde_json::Value,
    #[serde(default)]
    pub engine_config: serde_json::Value,
    pub build_image: String,
    pub detector_algorithm_image: String,
    pub detector_algorithm_version_id: String,
    #[serde(default)]
    pub user_algorithms: Vec<AlgorithmRequestDto>,
    #[serde(default)]
    pub execute_time_epoch_ms: Option<u64>,
    #[serde(default)]
    pub cron_expr: Option<String>,
    #[serde(default)]
    pub retry_policy: Option<RetryPolicyDto>,
}

impl From<InjectionRequestDto> for InjectionRequest {
    fn from(dto: InjectionRequestDto) -> Self {
        InjectionRequest {
            namespace: dto.namespace,
            fault_type: dto.fault_type,
            benchmark: dto.benchmark,
            pre_duration_sec: dto.pre_duration_sec,
            fault_duration_sec: dto.fault_duration_sec,
            display_config: dto.display_config,
            engine_config: dto.engine_config,
            build_image: dto.build_image,
            detector_algorithm_image: dto.detector_algorithm_image,
            detector_algorithm_version_id: dto.detector_algorithm_version_id,
            user_algorithms: dto.user_algorithms.into_iter().map(Into::into).collect(),
            execute_time_epoch_ms: dto.execute_time_epoch_ms,
            cron_expr: dto.cron_expr,
            retry_policy: dto.retry_policy.map(Into::into),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AlgorithmRunRequestDto {
    pub namespace: String,
    pub datapack_id: String,
    pub algorithms: Vec<AlgorithmRequestDto>,
    #[serde(default)]
    pub execute_time_epoch_ms: Option<u64>,
    #[serde(default)]
    pub cron_expr: Option<String>,
    #[serde(default)]
    pub retry_policy: Option<RetryPolicyDto>,
}

impl From<AlgorithmRunRequestDto> for AlgorithmRunRequest {
    fn from(dto: AlgorithmRunRequestDto) -> Self {
        AlgorithmRunRequest {
            namespace: dto.namespace,
            datapack_id: dto.datapack_id,
            algorithms: dto.algorithms.into_iter().map(Into::into).collect(),
            execute_time_epoch_ms: dto.execute_time_epoch_ms,
            cron_expr: dto.cron_expr,
            retry_policy: dto.retry_policy.map(Into::into),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionItemDto {
    Injection(InjectionRequestDto),
    AlgorithmRun(AlgorithmRunRequestDto),
}

impl From<SubmissionItemDto> for SubmissionItem {
    fn from(dto: SubmissionItemDto) -> Self {
        match dto {
            SubmissionItemDto::Injection(request) => SubmissionItem::Injection(request.into()),
            SubmissionItemDto::AlgorithmRun(request) => SubmissionItem::AlgorithmRun(request.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmissionDto {
    pub project_id: String,
    pub user_id: String,
    pub items: Vec<SubmissionItemDto>,
}

impl From<SubmissionDto> for Submission {
    fn from(dto: SubmissionDto) -> Self {
        Submission {
            project_id: dto.project_id,
            user_id: dto.user_id,
            items: dto.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
#[path = "submission_dto_tests.rs"]
mod tests;
