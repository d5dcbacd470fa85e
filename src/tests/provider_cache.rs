use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::helpers::time::ManualClock;
use crate::sources::provider::TokenProvider;
use crate::tests::common::{env_for, id_token_body, sample_jwt, AuthStub, Router};

const NOW: u64 = 1_750_000_000;

#[tokio::test]
async fn fetches_then_caches_expiry_from_the_token() {
    let token = sample_jwt(NOW + 3600, "first");
    let reply = token.clone();
    let stub = AuthStub::spawn(move |_| id_token_body(&reply)).await;

    let provider = TokenProvider::builder()
        .vars(env_for(stub.addr))
        .clock(ManualClock::new(NOW))
        .build()
        .unwrap();

    assert_eq!(provider.get_valid_token().await.unwrap(), token);
    let cached = provider.cached().await.expect("slot populated");
    assert_eq!(cached.value, token);
    assert_eq!(cached.exp_unix_ts, NOW + 3600);
    assert_eq!(stub.hits(), 1);
}

#[tokio::test]
async fn second_call_within_margin_reuses_the_cache() {
    let token = sample_jwt(NOW + 3600, "reused");
    let reply = token.clone();
    let stub = AuthStub::spawn(move |_| id_token_body(&reply)).await;
    let provider = TokenProvider::builder()
        .vars(env_for(stub.addr))
        .clock(ManualClock::new(NOW))
        .build()
        .unwrap();

    let first = provider.get_valid_token().await.unwrap();
    let second = provider.get_valid_token().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(stub.hits(), 1);
}

#[tokio::test]
async fn refreshes_inside_the_sixty_second_margin() {
    let exp = NOW + 3600;
    let stub = AuthStub::spawn(move |n| id_token_body(&sample_jwt(exp, &format!("hit-{}", n)))).await;
    let clock = ManualClock::new(exp - 61);
    let provider = TokenProvider::builder()
        .vars(env_for(stub.addr))
        .clock(clock.clone())
        .build()
        .unwrap();

    // empty slot
    let first = provider.get_valid_token().await.unwrap();
    assert_eq!(stub.hits(), 1);

    // expiry is now + 61: served from cache
    assert_eq!(provider.get_valid_token().await.unwrap(), first);
    assert_eq!(stub.hits(), 1);

    // expiry is now + 60: exactly on the margin, refresh
    clock.set(exp - 60);
    let second = provider.get_valid_token().await.unwrap();
    assert_eq!(stub.hits(), 2);
    assert_ne!(first, second);

    // expiry is now + 59: refresh again
    clock.set(exp - 59);
    provider.get_valid_token().await.unwrap();
    assert_eq!(stub.hits(), 3);
}

#[tokio::test]
async fn custom_margin_is_honoured() {
    let exp = NOW + 600;
    let stub = AuthStub::spawn(move |_| id_token_body(&sample_jwt(exp, "m"))).await;
    let clock = ManualClock::new(NOW);
    let provider = TokenProvider::builder()
        .vars(env_for(stub.addr))
        .clock(clock.clone())
        .safety_margin_seconds(300)
        .build()
        .unwrap();

    provider.get_valid_token().await.unwrap();
    clock.advance(299);
    provider.get_valid_token().await.unwrap();
    assert_eq!(stub.hits(), 1);

    clock.advance(1);
    provider.get_valid_token().await.unwrap();
    assert_eq!(stub.hits(), 2);
}

#[tokio::test]
async fn far_future_token_is_served_without_further_calls() {
    let token = sample_jwt(9_999_999_999, "long-lived");
    let reply = token.clone();
    let stub = AuthStub::spawn(move |_| id_token_body(&reply)).await;
    assert!((Utc::now().timestamp() as u64) < 9_999_999_939);

    // real clock
    let provider = TokenProvider::builder().vars(env_for(stub.addr)).build().unwrap();

    let first = provider.get_valid_token().await.unwrap();
    assert_eq!(first.split('.').count(), 3);
    assert_eq!(first, token);
    assert_eq!(provider.get_valid_token().await.unwrap(), token);
    assert_eq!(stub.hits(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cold_callers_share_one_authentication() {
    let token = sample_jwt(NOW + 3600, "shared");
    let reply = token.clone();
    let stub = AuthStub::spawn_with(move |_| id_token_body(&reply), Duration::from_millis(100), Router::new()).await;
    let provider = Arc::new(
        TokenProvider::builder()
            .vars(env_for(stub.addr))
            .clock(ManualClock::new(NOW))
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let provider = provider.clone();
            tokio::spawn(async move { provider.get_valid_token().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), token);
    }
    assert_eq!(stub.hits(), 1);
}

#[tokio::test]
async fn clones_share_the_cache() {
    let stub = AuthStub::spawn(move |_| id_token_body(&sample_jwt(NOW + 3600, "clone"))).await;
    let provider = TokenProvider::builder()
        .vars(env_for(stub.addr))
        .clock(ManualClock::new(NOW))
        .build()
        .unwrap();
    let other = provider.clone();

    provider.get_valid_token().await.unwrap();
    other.get_valid_token().await.unwrap();
    assert_eq!(stub.hits(), 1);
}

#[tokio::test]
async fn refresh_and_invalidate_bypass_the_cache() {
    let stub = AuthStub::spawn(move |n| id_token_body(&sample_jwt(NOW + 3600, &format!("hit-{}", n)))).await;
    let provider = TokenProvider::builder()
        .vars(env_for(stub.addr))
        .clock(ManualClock::new(NOW))
        .build()
        .unwrap();

    let first = provider.get_valid_token().await.unwrap();
    let refreshed = provider.refresh().await.unwrap();
    assert_ne!(first, refreshed);
    assert_eq!(provider.cached().await.unwrap().value, refreshed);
    assert_eq!(stub.hits(), 2);

    provider.invalidate().await;
    assert!(provider.cached().await.is_none());
    provider.get_valid_token().await.unwrap();
    assert_eq!(stub.hits(), 3);
}

#[tokio::test]
async fn exp_beyond_i64_range_is_cached_with_logging_enabled() {
    // field values are only evaluated when a subscriber wants them
    let _subscriber = tracing::subscriber::set_default(
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish(),
    );

    let exp = 1u64 << 63;
    let token = sample_jwt(exp, "far");
    let reply = token.clone();
    let stub = AuthStub::spawn(move |_| id_token_body(&reply)).await;
    let provider = TokenProvider::builder()
        .vars(env_for(stub.addr))
        .clock(ManualClock::new(NOW))
        .build()
        .unwrap();

    assert_eq!(provider.get_valid_token().await.unwrap(), token);
    let cached = provider.cached().await.unwrap();
    assert_eq!(cached.exp_unix_ts, exp);
    assert!(cached.seconds_remaining(NOW) > 0);
    assert_eq!(provider.get_valid_token().await.unwrap(), token);
    assert_eq!(stub.hits(), 1);
}
