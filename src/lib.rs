//! Keeps `sourceApiVersion` in an SFDX project manifest in step with the
//! newest API version a server advertises, optionally proposing the change
//! as a GitLab merge request.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod manifest;
pub mod proposer;
pub mod runner;
pub mod types;

#[cfg(test)]
mod tests;
