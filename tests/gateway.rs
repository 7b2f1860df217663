//! End-to-end properties of the gateway core.
//!
//! Covers the contracts the route layer and connector clients rely on:
//! credential preservation across unrelated updates, fuzzy connection
//! lookup, idempotent lazy initialization, the worker→HTTP fallback chain,
//! and deterministic offline mock routing.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hublink::clients::github::{GithubClient, GithubRest};
use hublink::dispatch::{RestFallback, WorkerTransport, DEFAULT_WORKER_TIMEOUT};
use hublink::mock::MockRouter;
use hublink::models::{ConnectionPatch, CredentialMap, NewConnection};
use hublink::store::{ConnectionStore, MemoryStore};

fn memory_store() -> ConnectionStore {
    ConnectionStore::new(Arc::new(MemoryStore::new()))
}

fn github_credentials(token: &str) -> CredentialMap {
    let mut credentials = CredentialMap::new();
    credentials.insert("token".into(), token.into());
    credentials
}

async fn seed_github(store: &ConnectionStore, token: &str) -> uuid::Uuid {
    store
        .create(NewConnection {
            name: "GitHub".into(),
            service_type: "github".into(),
            is_connected: true,
            is_mock: false,
            credentials: github_credentials(token),
        })
        .await
        .unwrap()
        .id
}

fn github_client(store: &ConnectionStore, mock: &Arc<MockRouter>, api_base: &str) -> GithubClient {
    GithubClient::new(
        store.clone(),
        mock.clone(),
        // No worker binary deployed: every dispatch exercises the fallback.
        WorkerTransport::new("/nonexistent/hublink-worker-github", DEFAULT_WORKER_TIMEOUT),
        api_base,
    )
}

mod credential_store {
    use super::*;

    // Scenario from the credential-preservation contract: toggling
    // is_connected must not touch the token.
    #[tokio::test]
    async fn toggle_keeps_credentials() {
        let store = memory_store();
        let id = seed_github(&store, "abc").await;

        let updated = store
            .update(id, ConnectionPatch::connected(false))
            .await
            .unwrap();

        assert!(!updated.is_connected);
        assert_eq!(updated.credentials.get("token").map(String::as_str), Some("abc"));
    }

    #[tokio::test]
    async fn empty_credentials_update_is_ignored() {
        let store = memory_store();
        let id = seed_github(&store, "abc").await;

        let updated = store
            .update(id, ConnectionPatch::credentials_only(CredentialMap::new()))
            .await
            .unwrap();

        assert_eq!(updated.credentials.get("token").map(String::as_str), Some("abc"));
    }

    #[tokio::test]
    async fn lookup_tolerates_display_name_drift() {
        let store = memory_store();
        store
            .create(NewConnection {
                name: "Triple Whale".into(),
                service_type: "triplewhale".into(),
                is_connected: true,
                is_mock: false,
                credentials: CredentialMap::new(),
            })
            .await
            .unwrap();

        let by_key = store.get("triplewhale").await.unwrap().unwrap();
        let by_upper = store.get("TRIPLEWHALE").await.unwrap().unwrap();
        assert_eq!(by_key.id, by_upper.id);
    }
}

mod fallback_chain {
    use super::*;

    fn repo_body() -> serde_json::Value {
        json!({
            "id": 1296269,
            "full_name": "octocat/hello-world",
            "private": false,
            "open_issues_count": 42,
        })
    }

    // With the worker binary absent, the dispatch result must be exactly
    // what the direct REST call produces.
    #[tokio::test]
    async fn fallback_matches_direct_secondary_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_body()))
            .mount(&server)
            .await;

        let store = memory_store();
        seed_github(&store, "abc").await;
        let mock = Arc::new(MockRouter::new(store.clone(), vec!["github".into()]));
        let client = github_client(&store, &mock, &server.uri());

        let args = json!({ "owner": "octocat", "repo": "hello-world" });
        let via_chain = client.call("get_repository", args.clone()).await;

        let direct = GithubRest::new(server.uri())
            .call("get_repository", &args, &github_credentials("abc"))
            .await
            .unwrap();

        assert!(via_chain.success);
        assert_eq!(via_chain, direct);
        assert_eq!(via_chain.data.unwrap()["full_name"], "octocat/hello-world");
    }

    // Bad credentials surface as a secondary-transport failure result,
    // never as a crash or a raised error.
    #[tokio::test]
    async fn bad_token_is_a_failure_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
            )
            .mount(&server)
            .await;

        let store = memory_store();
        seed_github(&store, "wrong").await;
        let mock = Arc::new(MockRouter::new(store.clone(), vec!["github".into()]));
        let client = github_client(&store, &mock, &server.uri());

        let result = client
            .call(
                "get_repository",
                json!({ "owner": "octocat", "repo": "hello-world" }),
            )
            .await;

        assert!(!result.success);
        assert!(result.message.unwrap().contains("401"));
        // Primary-transport context rides along for diagnostics.
        assert!(result.error.unwrap().contains("not present"));
    }

    #[tokio::test]
    async fn unsupported_tool_fails_fast() {
        let store = memory_store();
        let mock = Arc::new(MockRouter::new(store.clone(), vec!["github".into()]));
        let client = github_client(&store, &mock, "http://127.0.0.1:9");

        let result = client.call("delete_everything", json!({})).await;

        assert!(!result.success);
        assert!(result.message.unwrap().contains("unsupported tool"));
    }

    #[tokio::test]
    async fn unconnected_service_fails_without_network() {
        let store = memory_store();
        let mock = Arc::new(MockRouter::new(store.clone(), vec!["github".into()]));
        // Closed port: any network attempt would fail loudly anyway.
        let client = github_client(&store, &mock, "http://127.0.0.1:9");

        let result = client
            .call("get_repository", json!({ "owner": "o", "repo": "r" }))
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("not_connected"));
    }
}

mod mock_routing {
    use super::*;

    // Mocked dispatch must not perform any network I/O and must be
    // deterministic in (service, tool, args).
    #[tokio::test]
    async fn mock_dispatch_is_deterministic_and_offline() {
        let store = memory_store();
        let mock = Arc::new(MockRouter::new(store.clone(), vec!["github".into()]));
        mock.set_enabled(true).await.unwrap();

        // A worker that would hang and an API base that refuses
        // connections: if either were touched, the calls below would not
        // come back successful.
        let client = GithubClient::new(
            store.clone(),
            mock.clone(),
            WorkerTransport::new("/bin/sleep", Duration::from_secs(1))
                .with_args(vec!["30".into()]),
            "http://127.0.0.1:9",
        );

        let args = json!({ "owner": "octocat", "repo": "hello-world" });
        let first = client.call("get_repository", args.clone()).await;
        let second = client.call("get_repository", args.clone()).await;
        let other_tool = client.call("list_issues", args).await;

        assert!(first.success);
        assert_eq!(first, second);
        assert_ne!(first.data, other_tool.data);
    }

    #[tokio::test]
    async fn disabling_mock_mode_restores_real_routing() {
        let store = memory_store();
        let id = seed_github(&store, "real-token").await;
        let mock = Arc::new(MockRouter::new(store.clone(), vec!["github".into()]));

        mock.set_enabled(true).await.unwrap();
        assert!(mock.should_use_mock("github").await);

        mock.set_enabled(false).await.unwrap();
        assert!(!mock.should_use_mock("github").await);

        let conn = store.get_by_id(id).await.unwrap().unwrap();
        assert!(!conn.is_mock);
        assert!(!conn.is_connected);
        // Disabling only flips flags: a credentials blob is still present.
        assert!(!conn.credentials.is_empty());
    }
}
