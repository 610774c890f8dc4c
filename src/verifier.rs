use crate::client::{VerificationClient, VerificationOutcome};
use crate::config::Settings;
use crate::extract::extract_emails;
use crate::runner::{run_batch, BatchProgress};
use crate::store::{ResultStore, SOURCE_VERIFIER};
use anyhow::{bail, Result};

#[derive(Debug)]
pub struct VerifierReport {
    pub outcomes: Vec<VerificationOutcome>,
    /// Addresses that verified as Valid, in batch order.
    pub valid: Vec<String>,
    /// New rows added to the valid-address index.
    pub newly_stored: usize,
    pub persisted: bool,
}

/// Verify every address found in free-form input text. All outcomes are
/// appended to the log; Valid ones also go to the valid-address index.
pub async fn run_verifier<P>(
    settings: &Settings,
    store: Option<&ResultStore>,
    input_text: &str,
    progress: P,
) -> Result<VerifierReport>
where
    P: FnMut(BatchProgress),
{
    let emails = extract_emails(input_text);
    if emails.is_empty() {
        bail!("No email addresses found in the input");
    }

    log::info!("Verifying {} email(s)", emails.len());

    let client = VerificationClient::new(settings)?;
    let outcomes = run_batch(
        &emails,
        settings.effective_parallelism(),
        |address| {
            let client = client.clone();
            async move { client.verify(&address).await }
        },
        progress,
    )
    .await;

    let valid: Vec<String> = outcomes
        .iter()
        .filter(|o| o.is_valid)
        .map(|o| o.address.clone())
        .collect();

    let mut newly_stored = 0;
    let mut persisted = false;
    if let Some(store) = store {
        // Best effort; a store failure never hides the results.
        match store.append_log(&outcomes, SOURCE_VERIFIER) {
            Ok(()) => persisted = true,
            Err(e) => log::warn!("Failed to append verification log: {e}"),
        }
        match store.add_valid(&outcomes, SOURCE_VERIFIER) {
            Ok(added) => newly_stored = added,
            Err(e) => {
                persisted = false;
                log::warn!("Failed to store valid addresses: {e}");
            }
        }
    }

    Ok(VerifierReport {
        outcomes,
        valid,
        newly_stored,
        persisted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::VerificationStatus;

    #[tokio::test]
    async fn test_run_verifier_rejects_input_without_emails() {
        let settings = Settings::default();
        assert!(run_verifier(&settings, None, "", |_| {}).await.is_err());
        assert!(run_verifier(&settings, None, "no emails here", |_| {})
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_run_verifier_survives_unreachable_api() {
        let mut settings = Settings::default();
        settings.api_url = "http://127.0.0.1:9/validate".to_string();
        settings.timeout_seconds = 2;
        settings.max_parallel_requests = 2;

        let dir = tempfile::tempdir().unwrap();
        let store =
            ResultStore::open(dir.path().join("store.db").to_str().unwrap()).unwrap();

        let input = "a@example.com, b@example.com\nc@example.com";
        let mut reports = Vec::new();
        let report = run_verifier(&settings, Some(&store), input, |p| reports.push(p.processed))
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.status == VerificationStatus::Unknown));
        assert!(report.valid.is_empty());
        assert_eq!(report.newly_stored, 0);
        assert!(report.persisted);
        assert_eq!(reports, vec![2, 3]);
        assert_eq!(store.stats().unwrap().total_verified, 3);
    }

    #[tokio::test]
    async fn test_run_verifier_deduplicates_input() {
        let mut settings = Settings::default();
        settings.api_url = "http://127.0.0.1:9/validate".to_string();
        settings.timeout_seconds = 2;

        let input = "dup@example.com dup@example.com";
        let report = run_verifier(&settings, None, input, |_| {}).await.unwrap();
        assert_eq!(report.outcomes.len(), 1);
    }
}
