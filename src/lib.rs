//! Requisition Tracker Library
//!
//! Tracks a single procurement requisition through a fixed, sequential
//! Finance → COO → CFO → CEO approval chain, keeping line-item totals
//! consistent and persisting the record to local storage.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod commands;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;

pub use errors::ServiceError;
pub use models::{
    ApprovalStatus, ApprovalStep, ApproverRole, Attachment, AttachmentCategory, LineItem,
    Requisition, RequisitionPatch, StepStatus,
};
