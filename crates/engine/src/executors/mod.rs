// SPDX-License-Identifier: MIT

//! The six stock executors (spec.md §4.5) plus the registry that dispatches
//! to them and the admission logic they share.

mod arbitration;
pub mod fields;

mod build_dataset;
mod build_image;
mod collect_result;
mod inject_fault;
mod restart_pedestal;
mod run_algorithm;

pub mod callback_router;
pub mod dispatch;
