//! Captures the messages the server sends to its mail relay.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RelayedMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

type Outbox = Arc<Mutex<Vec<RelayedMail>>>;

pub struct FakeMailRelay {
    pub url: String,
    outbox: Outbox,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

async fn accept(State(outbox): State<Outbox>, Json(mail): Json<RelayedMail>) -> StatusCode {
    outbox.lock().unwrap().push(mail);
    StatusCode::ACCEPTED
}

impl FakeMailRelay {
    pub async fn spawn() -> Self {
        let outbox: Outbox = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/send", post(accept))
            .with_state(outbox.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake mail relay");
        let port = listener.local_addr().expect("No local address").port();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake mail relay failed");
        });

        Self {
            url: format!("http://127.0.0.1:{}/send", port),
            outbox,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn mails(&self) -> Vec<RelayedMail> {
        self.outbox.lock().unwrap().clone()
    }

    pub fn mails_to(&self, to: &str) -> Vec<RelayedMail> {
        self.mails().into_iter().filter(|m| m.to == to).collect()
    }
}

impl Drop for FakeMailRelay {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
