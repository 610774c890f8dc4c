pub mod catch_all;
pub mod client;
pub mod config;
pub mod extract;
pub mod finder;
pub mod patterns;
pub mod provider;
pub mod runner;
pub mod store;
pub mod verifier;

pub use client::{VerificationClient, VerificationOutcome};
pub use config::Settings;
pub use finder::{run_finder, FinderReport, FinderRequest};
pub use provider::{ApiProvider, VerificationStatus};
pub use runner::{run_batch, BatchProgress};
pub use store::ResultStore;
pub use verifier::{run_verifier, VerifierReport};
