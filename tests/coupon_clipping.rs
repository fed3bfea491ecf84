mod support;

use std::sync::Arc;

use anyhow::Result;
use kroger_cli::api::KrogerApi;
use kroger_cli::browser::{Visibility, WaitOutcome};
use kroger_cli::config::Config;
use support::{signed_in_page, test_credentials, MockSessionFactory, RecordingReporter, SessionScript};

fn setup(factory: Arc<MockSessionFactory>) -> (KrogerApi, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::default());
    let api = KrogerApi::new(Config::default(), test_credentials())
        .with_factory(factory)
        .with_reporter(reporter.clone());
    (api, reporter)
}

// Paused time lets the settle delays between clip rounds elapse instantly.
#[tokio::test(start_paused = true)]
async fn clipping_walks_the_gallery_repeatedly() -> Result<()> {
    let factory = Arc::new(MockSessionFactory::new());
    let session = factory.push_session(
        SessionScript::new().with_content(signed_in_page("Coupons Clipped")),
    );

    let (api, reporter) = setup(factory.clone());
    match api.clip_coupons().await? {
        Some(()) => {}
        None => anyhow::bail!("expected the clip run to complete"),
    }

    assert_eq!(factory.opened_visibilities(), vec![Visibility::Headless]);
    assert!(session.was_closed());

    let key_presses = session.key_presses.lock().unwrap().clone();
    assert_eq!(
        key_presses.first(),
        Some(&("body".to_string(), "Escape".to_string()))
    );
    let end_presses = key_presses
        .iter()
        .filter(|(selector, key)| selector == "body" && key == "End")
        .count();
    assert_eq!(end_presses, 6);

    let evaluated = session.evaluated.lock().unwrap().clone();
    assert_eq!(evaluated.len(), 6);
    assert!(evaluated.iter().all(|js| js.contains("kds-Button--favorable")));

    let progress = reporter.progress.lock().unwrap().clone();
    assert!(
        progress.iter().any(|m| m.contains("Applying the coupons")),
        "missing progress report: {progress:?}"
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_sign_in_skips_clipping() -> Result<()> {
    let factory = Arc::new(MockSessionFactory::new());
    let first = factory.push_session(
        SessionScript::new().with_navigation_wait(WaitOutcome::TimedOut),
    );
    let second = factory.push_session(
        SessionScript::new().with_navigation_wait(WaitOutcome::TimedOut),
    );

    let (api, _reporter) = setup(factory.clone());
    match api.clip_coupons().await? {
        None => {}
        other => anyhow::bail!("expected no clip run, got {:?}", other),
    }

    assert_eq!(factory.open_count(), 2);
    assert!(first.evaluated.lock().unwrap().is_empty());
    assert!(second.evaluated.lock().unwrap().is_empty());
    assert!(first.was_closed());
    assert!(second.was_closed());
    Ok(())
}
