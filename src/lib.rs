//! Traffic count homologation pipeline.
//!
//! Uploaded count workbooks from several providers are normalized into one
//! canonical row shape, gap-filled by linear interpolation, merged by source
//! priority, and homologated against a client template into the final report
//! workbook. The `routes` gateway exposes the pipeline over HTTP.

pub mod config;
pub mod error;
pub mod homologate;
pub mod interpolate;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod readers;
pub mod routes;
pub mod session;
pub mod template;
pub mod xlsx;

pub use config::Config;
