use crate::client::VerificationOutcome;
use anyhow::Result;
use futures::future::join_all;
use std::future::Future;

/// Cumulative progress after each completed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub processed: usize,
    pub total: usize,
}

/// Drive a list of addresses through a validation call with bounded
/// concurrency: consecutive chunks of `parallelism` addresses, all calls in a
/// chunk in flight together, strictly sequential between chunks. The external
/// APIs publish no rate-limit contract, so this caps burst size.
///
/// A check that resolves to `Err` is logged and excluded from the results; it
/// never aborts the chunk or the batch. The progress callback fires once per
/// chunk with counts that include excluded calls.
pub async fn run_batch<F, Fut, P>(
    addresses: &[String],
    parallelism: usize,
    check: F,
    mut progress: P,
) -> Vec<VerificationOutcome>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<VerificationOutcome>>,
    P: FnMut(BatchProgress),
{
    let chunk_size = parallelism.max(1);
    let total = addresses.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut processed = 0;

    for chunk in addresses.chunks(chunk_size) {
        let calls: Vec<_> = chunk.iter().map(|address| check(address.clone())).collect();
        for (address, result) in chunk.iter().zip(join_all(calls).await) {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    log::error!("Validation call for {address} failed to dispatch: {e}");
                }
            }
        }

        processed += chunk.len();
        progress(BatchProgress { processed, total });
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::VerificationStatus;
    use chrono::Utc;

    fn ok_outcome(address: &str) -> VerificationOutcome {
        VerificationOutcome {
            address: address.to_string(),
            is_valid: true,
            status: VerificationStatus::Valid,
            detail: "ok".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn addresses(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("user{i}@example.com")).collect()
    }

    #[tokio::test]
    async fn test_chunked_progress_counts() {
        let input = addresses(120);
        let mut reports = Vec::new();

        let outcomes = run_batch(
            &input,
            50,
            |address| async move { Ok(ok_outcome(&address)) },
            |p| reports.push(p),
        )
        .await;

        assert_eq!(outcomes.len(), 120);
        assert_eq!(
            reports,
            vec![
                BatchProgress { processed: 50, total: 120 },
                BatchProgress { processed: 100, total: 120 },
                BatchProgress { processed: 120, total: 120 },
            ]
        );
    }

    #[tokio::test]
    async fn test_exact_multiple_of_chunk_size() {
        let input = addresses(100);
        let mut reports = Vec::new();

        let outcomes = run_batch(
            &input,
            50,
            |address| async move { Ok(ok_outcome(&address)) },
            |p| reports.push(p.processed),
        )
        .await;

        assert_eq!(outcomes.len(), 100);
        assert_eq!(reports, vec![50, 100]);
    }

    #[tokio::test]
    async fn test_failed_call_is_excluded_not_fatal() {
        let input = addresses(5);
        let poisoned = input[1].clone();

        let outcomes = run_batch(
            &input,
            2,
            |address| {
                let poisoned = poisoned.clone();
                async move {
                    if address == poisoned {
                        anyhow::bail!("boom");
                    }
                    Ok(ok_outcome(&address))
                }
            },
            |_| {},
        )
        .await;

        // The chunk-mate of the failed call and all later chunks survive.
        let got: Vec<&str> = outcomes.iter().map(|o| o.address.as_str()).collect();
        assert_eq!(
            got,
            vec![
                "user0@example.com",
                "user2@example.com",
                "user3@example.com",
                "user4@example.com"
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_counts_include_failed_calls() {
        let input = addresses(4);
        let mut reports = Vec::new();

        run_batch(
            &input,
            2,
            |_| async move { Err(anyhow::anyhow!("down")) },
            |p| reports.push(p.processed),
        )
        .await;

        assert_eq!(reports, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_zero_parallelism_still_makes_progress() {
        let input = addresses(3);
        let outcomes = run_batch(
            &input,
            0,
            |address| async move { Ok(ok_outcome(&address)) },
            |_| {},
        )
        .await;
        assert_eq!(outcomes.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let mut reports = Vec::new();
        let outcomes = run_batch(
            &[],
            50,
            |address: String| async move { Ok(ok_outcome(&address)) },
            |p: BatchProgress| reports.push(p),
        )
        .await;
        assert!(outcomes.is_empty());
        assert!(reports.is_empty());
    }
}
