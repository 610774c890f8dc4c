use crate::catch_all::{self, CatchAllFlag, NameTally};
use crate::client::VerificationClient;
use crate::config::Settings;
use crate::extract::extract_domain;
use crate::patterns::{candidates_for_names, Candidate};
use crate::runner::{run_batch, BatchProgress};
use crate::store::{ResultStore, SOURCE_FINDER};
use anyhow::{bail, Result};
use std::collections::HashSet;

/// Input for one finder run: a domain and the full names to guess for.
#[derive(Debug, Clone)]
pub struct FinderRequest {
    pub domain: String,
    pub names: Vec<String>,
}

/// Valid addresses found for one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameResult {
    pub name: String,
    pub candidates_tried: usize,
    pub valid_emails: Vec<String>,
}

#[derive(Debug)]
pub struct FinderReport {
    pub domain: String,
    pub total_candidates: usize,
    pub results: Vec<NameResult>,
    /// Every unique valid address across the whole search.
    pub all_valid: Vec<String>,
    pub catch_all: Option<CatchAllFlag>,
    /// False when the catch-all heuristic suppressed persistence or the
    /// store write failed.
    pub persisted: bool,
}

/// Generate candidates for each name, verify the unique set, bucket valid
/// hits back per name, run the catch-all heuristic, and persist unflagged
/// results. Each call owns all of its state; overlapping runs share nothing
/// but the store.
pub async fn run_finder<P>(
    settings: &Settings,
    store: Option<&ResultStore>,
    request: &FinderRequest,
    progress: P,
) -> Result<FinderReport>
where
    P: FnMut(BatchProgress),
{
    let domain = extract_domain(&request.domain);
    if domain.is_empty() {
        bail!("A domain is required");
    }
    let names: Vec<String> = request
        .names
        .iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        bail!("At least one name is required");
    }

    let candidates = candidates_for_names(&names, &domain, &settings.email_patterns);
    if candidates.is_empty() {
        bail!("No candidates generated; check the name list and enabled patterns");
    }

    let mut seen = HashSet::new();
    let unique_addresses: Vec<String> = candidates
        .iter()
        .filter(|c| seen.insert(c.address.clone()))
        .map(|c| c.address.clone())
        .collect();

    log::info!(
        "Checking {} candidates for {} name(s) at {domain}",
        unique_addresses.len(),
        names.len()
    );

    let client = VerificationClient::new(settings)?;
    let outcomes = run_batch(
        &unique_addresses,
        settings.effective_parallelism(),
        |address| {
            let client = client.clone();
            async move { client.verify(&address).await }
        },
        progress,
    )
    .await;

    let valid_addresses: HashSet<&str> = outcomes
        .iter()
        .filter(|o| o.is_valid)
        .map(|o| o.address.as_str())
        .collect();

    let (results, tallies) = bucket_by_name(&names, &candidates, &valid_addresses);
    let catch_all = catch_all::evaluate(&settings.catch_all, &tallies);

    let mut all_valid: Vec<String> = Vec::new();
    for result in &results {
        for email in &result.valid_emails {
            if !all_valid.contains(email) {
                all_valid.push(email.clone());
            }
        }
    }

    let mut persisted = false;
    if let Some(flag) = &catch_all {
        log::warn!("Catch-all suspected for {domain}: {}; results not persisted", flag.reason);
    } else if let Some(store) = store {
        persisted = persist(store, &outcomes);
    }

    Ok(FinderReport {
        domain,
        total_candidates: unique_addresses.len(),
        results,
        all_valid,
        catch_all,
        persisted,
    })
}

/// Map verified addresses back onto the names that generated them. An
/// address generated for two names credits both.
fn bucket_by_name(
    names: &[String],
    candidates: &[Candidate],
    valid_addresses: &HashSet<&str>,
) -> (Vec<NameResult>, Vec<NameTally>) {
    let mut results = Vec::with_capacity(names.len());
    let mut tallies = Vec::with_capacity(names.len());

    for name in names {
        let mut tried: Vec<&str> = Vec::new();
        let mut valid_emails: Vec<String> = Vec::new();
        for candidate in candidates.iter().filter(|c| &c.source_name == name) {
            if tried.contains(&candidate.address.as_str()) {
                continue;
            }
            tried.push(&candidate.address);
            if valid_addresses.contains(candidate.address.as_str()) {
                valid_emails.push(candidate.address.clone());
            }
        }

        tallies.push(NameTally {
            name: name.clone(),
            tried: tried.len(),
            valid: valid_emails.len(),
        });
        results.push(NameResult {
            name: name.clone(),
            candidates_tried: tried.len(),
            valid_emails,
        });
    }

    (results, tallies)
}

/// Store writes are best effort; a failure is logged and the results are
/// still reported.
fn persist(store: &ResultStore, outcomes: &[crate::client::VerificationOutcome]) -> bool {
    if let Err(e) = store.append_log(outcomes, SOURCE_FINDER) {
        log::warn!("Failed to append finder results to the log: {e}");
        return false;
    }
    match store.add_valid(outcomes, SOURCE_FINDER) {
        Ok(added) => {
            log::debug!("Stored {added} new valid address(es)");
            true
        }
        Err(e) => {
            log::warn!("Failed to store valid addresses: {e}");
            false
        }
    }
}
