mod support;

use std::sync::Arc;

use anyhow::Result;
use kroger_cli::api::KrogerApi;
use kroger_cli::browser::WaitOutcome;
use kroger_cli::report::NoopReporter;
use support::{
    payload_page, signed_in_page, test_credentials, visible_config, MockSessionFactory,
    SessionScript,
};

fn api_with(factory: Arc<MockSessionFactory>) -> KrogerApi {
    KrogerApi::new(visible_config(), test_credentials())
        .with_factory(factory)
        .with_reporter(Arc::new(NoopReporter))
}

fn profile_session() -> SessionScript {
    SessionScript::new()
        .with_content(signed_in_page("Profile Information"))
        .with_content(payload_page(r#"{"userId":"u-7","emailAddress":"pat@example.com"}"#))
}

#[tokio::test]
async fn account_info_is_fetched_once_per_run() -> Result<()> {
    let factory = Arc::new(MockSessionFactory::new());
    factory.push_session(profile_session());

    let api = api_with(factory.clone());
    let first = api.account_info().await?;
    let second = api.account_info().await?;

    assert_eq!(factory.open_count(), 1);
    match (first, second) {
        (Some(a), Some(b)) => {
            assert_eq!(a.user_id, "u-7");
            assert_eq!(a.user_id, b.user_id);
        }
        other => anyhow::bail!("expected the profile twice, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn missing_payload_is_cached_as_absent() -> Result<()> {
    let factory = Arc::new(MockSessionFactory::new());
    // Signed in, but the endpoint renders no embedded payload.
    factory.push_session(
        SessionScript::new()
            .with_content(signed_in_page("Profile Information"))
            .with_content("<html><body>Service unavailable</body></html>"),
    );

    let api = api_with(factory.clone());
    match api.account_info().await? {
        None => {}
        other => anyhow::bail!("expected no profile, got {:?}", other),
    }
    match api.account_info().await? {
        None => {}
        other => anyhow::bail!("expected the absent result to be reused, got {:?}", other),
    }
    assert_eq!(factory.open_count(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_sign_in_is_cached_as_absent() -> Result<()> {
    let factory = Arc::new(MockSessionFactory::new());
    factory.push_session(
        SessionScript::new().with_navigation_wait(WaitOutcome::TimedOut),
    );

    let api = api_with(factory.clone());
    assert!(api.points_balance().await?.is_none());
    assert!(api.points_balance().await?.is_none());
    assert_eq!(factory.open_count(), 1);
    Ok(())
}

#[tokio::test]
async fn points_balance_requires_a_program_balance() -> Result<()> {
    let factory = Arc::new(MockSessionFactory::new());
    factory.push_session(
        SessionScript::new()
            .with_content(signed_in_page("Profile Information"))
            .with_content(payload_page(r#"[{"programName":"Fuel Points"}]"#)),
    );

    let api = api_with(factory.clone());
    match api.points_balance().await? {
        None => {}
        other => anyhow::bail!("expected no summary without a balance, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn points_balance_reads_the_primary_program() -> Result<()> {
    let factory = Arc::new(MockSessionFactory::new());
    factory.push_session(
        SessionScript::new()
            .with_content(signed_in_page("Profile Information"))
            .with_content(payload_page(
                r#"[{"programName":"Fuel Points","programBalance":{"balance":450}}]"#,
            )),
    );

    let api = api_with(factory.clone());
    let summary = match api.points_balance().await? {
        Some(summary) => summary,
        None => anyhow::bail!("expected a points summary"),
    };
    assert_eq!(summary.primary_balance(), Some(450));
    Ok(())
}

#[tokio::test]
async fn purchases_summary_counts_receipts() -> Result<()> {
    let factory = Arc::new(MockSessionFactory::new());
    factory.push_session(
        SessionScript::new()
            .with_content(signed_in_page("Profile Information"))
            .with_content(payload_page(
                r#"[{"receiptId":"r-1","transactionTotal":41.52},{"receiptId":"r-2"}]"#,
            )),
    );

    let api = api_with(factory.clone());
    let summary = match api.purchases_summary().await? {
        Some(summary) => summary,
        None => anyhow::bail!("expected a purchases summary"),
    };
    assert_eq!(summary.receipt_count(), 2);
    Ok(())
}

#[tokio::test]
async fn each_read_opens_its_own_session() -> Result<()> {
    let factory = Arc::new(MockSessionFactory::new());
    factory.push_session(profile_session());
    factory.push_session(
        SessionScript::new()
            .with_content(signed_in_page("Profile Information"))
            .with_content(payload_page(
                r#"[{"programBalance":{"balance":100}}]"#,
            )),
    );

    let api = api_with(factory.clone());
    assert!(api.account_info().await?.is_some());
    assert!(api.points_balance().await?.is_some());
    assert_eq!(factory.open_count(), 2);
    Ok(())
}
