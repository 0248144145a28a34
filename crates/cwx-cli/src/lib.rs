//! CLI library components for the clinical workstation context tools.

pub mod backlog;
pub mod logging;
