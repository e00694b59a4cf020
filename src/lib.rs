//! Pipetrend - pipeline and job duration trends for GitLab projects.

// ============================================================================
// Core Infrastructure
// ============================================================================

pub mod config;
pub mod store;

// ============================================================================
// Domain
// ============================================================================

pub mod auth;
pub mod gitlab;
pub mod report;
pub mod trim;
