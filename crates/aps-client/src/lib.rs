//! Asynchronous client for the Autodesk Platform Services APIs used by the
//! viewer gateway.
//!
//! The gateway only ever talks to APS through the [`ModelService`] trait:
//! [`ApsClient`] is the HTTP implementation (two-legged auth, OSS buckets,
//! model derivative jobs) and [`InMemoryModelService`] backs tests and local
//! wiring. Object identifiers become viewer-friendly [`ModelUrn`]s and
//! translation manifests are reduced with [`flatten`].

mod auth;
mod client;
mod derivative;
pub mod manifest;
mod memory;
mod oss;
mod service;
pub mod urn;

use thiserror::Error;

pub use auth::{AccessToken, Scope};
pub use client::{
    ApsClient, ApsClientConfig, DEFAULT_BASE_URL, DEFAULT_MAX_URLS_PER_REQUEST, DEFAULT_PART_SIZE,
};
pub use manifest::{flatten, Derivative, Manifest, StatusSummary};
pub use memory::{InMemoryModelService, Operation, RecordedCall};
pub use service::{ModelService, ObjectEntry, TranslationJob};
pub use urn::{InvalidReference, ModelUrn};

#[derive(Debug, Error)]
pub enum ApsError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("resource not found")]
    NotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    InvalidReference(#[from] InvalidReference),
    #[error("signed upload returned {got} urls, expected {expected}")]
    MissingUploadUrl { expected: usize, got: usize },
}
