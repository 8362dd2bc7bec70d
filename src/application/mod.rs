//! Application services: orchestration over the content API and media host.

pub mod api;
pub mod dashboard;
pub mod editor;
pub mod error;
pub mod reconcile;
pub mod retry;
pub mod uploads;
pub mod wizard;
