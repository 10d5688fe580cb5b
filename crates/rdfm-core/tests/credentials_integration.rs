use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kameo::actor::Spawn;
use kameo::error::SendError;

use rdfm_api::AuthToken;
use rdfm_core::*;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Authenticator that tracks how many handshakes overlap
#[derive(Default)]
struct SlowAuthenticator {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    issued: AtomicUsize,
}

#[async_trait]
impl Authenticator for SlowAuthenticator {
    async fn authenticate(&self) -> Result<AuthToken, CoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(20)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(AuthToken::new(format!("token-{n}")))
    }
}

struct RejectingAuthenticator;

#[async_trait]
impl Authenticator for RejectingAuthenticator {
    async fn authenticate(&self) -> Result<AuthToken, CoreError> {
        Err(CoreError::CommandFailed("exit status 1".to_string()))
    }
}

struct HungAuthenticator;

#[async_trait]
impl Authenticator for HungAuthenticator {
    async fn authenticate(&self) -> Result<AuthToken, CoreError> {
        std::future::pending().await
    }
}

struct DenyingAuthenticator;

#[async_trait]
impl Authenticator for DenyingAuthenticator {
    async fn authenticate(&self) -> Result<AuthToken, CoreError> {
        Err(CoreError::AuthenticationFailed("bad credentials".to_string()))
    }
}

#[tokio::test]
async fn test_handshakes_are_serialized() {
    let authenticator = Arc::new(SlowAuthenticator::default());
    let actor = CredentialActor::spawn(CredentialActorArgs {
        authenticator: authenticator.clone(),
        initial_token: None,
        handshake_timeout: HANDSHAKE_TIMEOUT,
    });

    let (a, b, c) = tokio::join!(
        async { actor.ask(Reauthenticate).await },
        async { actor.ask(Reauthenticate).await },
        async { actor.ask(Reauthenticate).await },
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    assert_eq!(authenticator.max_in_flight.load(Ordering::SeqCst), 1);
    let snapshot = actor.ask(CurrentToken).await.unwrap();
    assert_eq!(snapshot.token.as_str(), "token-2");

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test]
async fn test_failed_handshake_keeps_token() {
    let actor = CredentialActor::spawn(CredentialActorArgs {
        authenticator: Arc::new(RejectingAuthenticator),
        initial_token: Some(AuthToken::new("persisted")),
        handshake_timeout: HANDSHAKE_TIMEOUT,
    });

    let result = actor.ask(Reauthenticate).await;
    assert!(result.is_err());

    let snapshot = actor.ask(CurrentToken).await.unwrap();
    assert_eq!(snapshot.token.as_str(), "persisted");

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test]
async fn test_starts_without_token() {
    let actor = CredentialActor::spawn(CredentialActorArgs {
        authenticator: Arc::new(RejectingAuthenticator),
        initial_token: None,
        handshake_timeout: HANDSHAKE_TIMEOUT,
    });

    let snapshot = actor.ask(CurrentToken).await.unwrap();
    assert!(snapshot.token.is_empty());
    assert!(snapshot.obtained_at.is_none());

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_hung_handshake_is_cut_off() {
    let actor = CredentialActor::spawn(CredentialActorArgs {
        authenticator: Arc::new(HungAuthenticator),
        initial_token: Some(AuthToken::new("persisted")),
        handshake_timeout: HANDSHAKE_TIMEOUT,
    });

    let started = tokio::time::Instant::now();
    let Err(SendError::HandlerError(err)) = actor.ask(Reauthenticate).await else {
        panic!("expected the handshake to fail");
    };
    assert!(started.elapsed() >= HANDSHAKE_TIMEOUT);
    assert!(matches!(err, CoreError::AuthenticationFailed(ref m) if m.contains("timed out")));

    let snapshot = actor.ask(CurrentToken).await.unwrap();
    assert_eq!(snapshot.token.as_str(), "persisted");

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test]
async fn test_authentication_error_is_not_wrapped_twice() {
    let actor = CredentialActor::spawn(CredentialActorArgs {
        authenticator: Arc::new(DenyingAuthenticator),
        initial_token: None,
        handshake_timeout: HANDSHAKE_TIMEOUT,
    });

    let Err(SendError::HandlerError(err)) = actor.ask(Reauthenticate).await else {
        panic!("expected the handshake to fail");
    };
    assert_eq!(err.to_string(), "failed to authenticate: bad credentials");

    actor.stop_gracefully().await.unwrap();
}
