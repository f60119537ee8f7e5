//! InsightBites terminal viewer
//!
//! Presentation layer over `inspection-core`: table and card views, one-shot
//! queries, and an interactive browse loop.

pub mod browse;
pub mod render;
