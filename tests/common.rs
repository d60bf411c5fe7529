#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use tokennet::config::{ClientConfig, LocalStoreConfig};
use tokennet::models::SessionCookie;
use tokennet::store::{CredentialStore, LocalStore};
use tokennet::{NetClient, NetError};

pub const APP_ID: &str = "app-1";
pub const APP_SECRET: &str = "secret";
pub const LOGIN_PATH: &str = "/platform/application/login";
pub const REFRESH_PATH: &str = "/platform/application/update_token";

/// A config whose login and refresh endpoints live on `base_url`.
pub fn client_config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::new(
        APP_ID,
        APP_SECRET,
        format!("{}{}", base_url, LOGIN_PATH),
        format!("{}{}", base_url, REFRESH_PATH),
    );
    config.deadline_in_ms = 2_000;
    config.timeout_in_ms = 2_000;
    config
}

/// The JSON body of an API response.
pub fn envelope(code: i64, message: &str, data: Value) -> String {
    json!({ "code": code, "message": message, "data": data }).to_string()
}

pub fn token_body(token: &str) -> String {
    envelope(200, "ok", json!({ "AccessToken": token }))
}

/// A local store that counts token writes.
pub struct CountingStore {
    inner: LocalStore,
    writes: AtomicUsize,
    invalidations: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(CountingStore {
            inner: LocalStore::new(APP_ID, "PHPSESSID", &LocalStoreConfig::default()),
            writes: AtomicUsize::new(0),
            invalidations: AtomicUsize::new(0),
        })
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for CountingStore {
    async fn ensure_ready(&self) -> Result<(), NetError> {
        self.inner.ensure_ready().await
    }

    async fn get_token(&self) -> String {
        self.inner.get_token().await
    }

    async fn set_token(&self, token: &str) -> Result<(), NetError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if token.is_empty() {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.set_token(token).await
    }

    async fn get_session_cookie(&self) -> Option<SessionCookie> {
        self.inner.get_session_cookie().await
    }

    async fn set_session_cookie(&self, cookies: &[SessionCookie]) -> Result<(), NetError> {
        self.inner.set_session_cookie(cookies).await
    }

    fn backend(&self) -> &str {
        "counting"
    }
}

/// A store whose reads take `delay`, like a backend that stopped answering.
pub struct SlowStore {
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(SlowStore { delay })
    }
}

#[async_trait]
impl CredentialStore for SlowStore {
    async fn ensure_ready(&self) -> Result<(), NetError> {
        Ok(())
    }

    async fn get_token(&self) -> String {
        tokio::time::sleep(self.delay).await;
        "slow-tok".to_string()
    }

    async fn set_token(&self, _token: &str) -> Result<(), NetError> {
        Ok(())
    }

    async fn get_session_cookie(&self) -> Option<SessionCookie> {
        tokio::time::sleep(self.delay).await;
        None
    }

    async fn set_session_cookie(&self, _cookies: &[SessionCookie]) -> Result<(), NetError> {
        Ok(())
    }

    fn backend(&self) -> &str {
        "slow"
    }
}

/// A client on a counting store that already holds `token`.
pub async fn client_with_token(config: ClientConfig, token: &str) -> (NetClient, Arc<CountingStore>) {
    let store = CountingStore::new();
    store.inner.set_token(token).await.expect("seed token");
    let client = NetClient::with_store(config, store.clone()).expect("client should build");
    (client, store)
}

/// Accepts connections and never answers them.
pub async fn silent_server() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind silent listener");
    let addr = listener.local_addr().expect("listener address");
    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (format!("http://{}", addr), handle)
}

/// Accepts one connection, never answers, and reports when the peer closes it.
pub async fn hang_up_detector() -> (String, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind detector listener");
    let addr = listener.local_addr().expect("listener address");
    let (closed_tx, closed_rx) = oneshot::channel();
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut buf = [0u8; 1024];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
        let _ = closed_tx.send(());
    });
    (format!("http://{}", addr), closed_rx)
}
