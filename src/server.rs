//! Dev server and reload notifier.
//!
//! Two independent pieces share this module:
//!
//! 1. **HTTP server**: serves the build root on a dedicated thread running
//!    a current-thread tokio runtime.
//! 2. **Reload channel**: a websocket listener collects browser connections
//!    on one thread, while a second thread drains [`ReloadEvent`]s and
//!    pushes a `reload:<task>` frame to every connected client. Clients
//!    apply last-event-wins; there is no ordering guarantee between events
//!    from different tasks.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use axum::Router;
use camino::Utf8PathBuf;
use console::style;
use tower_http::services::ServeDir;
use tungstenite::WebSocket;

use crate::task::TaskId;

const HTTP_PORT: u16 = 8080;
const WS_PORT: u16 = 1337;
const MAX_CLIENTS: usize = 10;

/// Transient signal emitted after a task finishes writing its outputs.
/// Consumed immediately by the reload thread, never persisted.
#[derive(Debug, Clone, Copy)]
pub struct ReloadEvent {
    pub task: TaskId,
    pub at: SystemTime,
}

impl ReloadEvent {
    pub(crate) fn now(task: TaskId) -> Self {
        Self {
            task,
            at: SystemTime::now(),
        }
    }
}

/// Bind the websocket listener, falling back to an ephemeral port when the
/// default one is taken.
pub(crate) fn reserve_ws_port() -> std::io::Result<(TcpListener, u16)> {
    let listener = match TcpListener::bind(("127.0.0.1", WS_PORT)) {
        Ok(sock) => sock,
        Err(_) => TcpListener::bind("127.0.0.1:0")?,
    };

    let port = listener.local_addr()?.port();
    Ok((listener, port))
}

pub(crate) fn new_thread_ws_incoming(
    server: TcpListener,
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for stream in server.incoming() {
            let Ok(stream) = stream else { continue };
            match tungstenite::accept(stream) {
                Ok(socket) => clients.lock().unwrap().push(socket),
                Err(e) => tracing::debug!("websocket handshake failed: {e}"),
            }
        }
    })
}

pub(crate) fn new_thread_ws_reload(
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
) -> (Sender<ReloadEvent>, JoinHandle<()>) {
    let (tx, rx) = std::sync::mpsc::channel::<ReloadEvent>();

    let thread = thread::spawn(move || {
        while let Ok(event) = rx.recv() {
            tracing::debug!(task = event.task.name(), at = ?event.at, "pushing reload");

            let message = format!("reload:{}", event.task.name());
            let mut clients = clients.lock().unwrap();
            let mut broken = vec![];

            for (i, socket) in clients.iter_mut().enumerate() {
                match socket.send(message.clone().into()) {
                    Ok(_) => {}
                    Err(tungstenite::error::Error::Io(e)) => {
                        if e.kind() == std::io::ErrorKind::BrokenPipe {
                            broken.push(i);
                        }
                    }
                    Err(e) => {
                        tracing::error!("websocket send failed: {e:?}");
                    }
                }
            }

            for i in broken.into_iter().rev() {
                clients.remove(i);
            }

            // Close all but the last MAX_CLIENTS connections
            let len = clients.len();
            if len > MAX_CLIENTS {
                for mut socket in clients.drain(0..len - MAX_CLIENTS) {
                    socket.close(None).ok();
                }
            }
        }
    });

    (tx, thread)
}

/// Serve the build root over HTTP.
pub(crate) fn start_http(root: Utf8PathBuf) -> JoinHandle<Result<(), anyhow::Error>> {
    let url = style(format!("http://localhost:{HTTP_PORT}/")).yellow();
    tracing::info!(%url, "starting a HTTP server");

    thread::spawn(move || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
            .block_on(serve(root, HTTP_PORT))
    })
}

async fn serve(root: Utf8PathBuf, port: u16) -> Result<(), anyhow::Error> {
    let address = SocketAddr::from(([127, 0, 0, 1], port));
    let address = tokio::net::TcpListener::bind(address).await?;

    let router = Router::new().fallback_service(ServeDir::new(root));

    axum::serve(address, router).await?;

    Ok(())
}
