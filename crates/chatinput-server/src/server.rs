//! TCP listener and per-connection tasks.
//!
//! ```text
//! socket ──► reader task ──► Coordinator::on_incoming_message
//!                                 │ PassThrough
//!                                 ▼
//!                            main loop ──► flows::handle_line
//! main loop ──► ServerHost::send_message ──► queue ──► writer task ──► socket
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chatinput_core::runtime::{MainLoop, TokioScheduler};
use chatinput_core::{Coordinator, Disposition, UserId};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::flows::{self, ChatLine, ChatState};
use crate::host::ServerHost;

/// Bound chat server.
pub struct ChatServer {
    listener: TcpListener,
    state: Arc<ChatState>,
}

impl ChatServer {
    /// Bind the listener and start the main loop.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn bind(config: &Config) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.server.bind)
            .await
            .with_context(|| format!("Failed to bind {}", config.server.bind))?;

        let (main_loop, main) = MainLoop::new();
        let scheduler = TokioScheduler::current(main.clone())?;
        let host = Arc::new(ServerHost::new(main, scheduler, config.server.ansi_colors));
        let coordinator = Coordinator::try_new(host.clone(), config.input.clone())?;
        main_loop.spawn();

        Ok(Self {
            listener,
            state: Arc::new(ChatState {
                host,
                coordinator,
                prompts: config.prompts.clone(),
            }),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> &Arc<ChatState> {
        &self.state
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn serve_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down...");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            tokio::spawn(handle_connection(self.state.clone(), stream, addr));
                        }
                        Err(e) => error!(error = %e, "accept failed"),
                    }
                }
            }
        }
    }

    /// Accept connections forever.
    pub async fn serve(self) -> Result<()> {
        self.serve_until(std::future::pending()).await
    }
}

async fn handle_connection(state: Arc<ChatState>, stream: TcpStream, addr: SocketAddr) {
    let user = UserId::new();
    info!(user = %user, addr = %addr, "client connected");

    let (reader, mut writer) = stream.into_split();
    let mut outbound = state.host.connect(user);

    let writer_task = tokio::spawn(async move {
        while let Some(line) = outbound.recv().await {
            let written = async {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await
            };
            if let Err(e) = written.await {
                debug!(error = %e, "write failed");
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    on_main(&state, move |state| flows::welcome(state, user));

    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug!(user = %user, error = %e, "read failed");
                break;
            }
        };
        let line = line.trim_end_matches('\r').to_string();

        if state.coordinator.on_incoming_message(user, &line) == Disposition::Consumed {
            continue;
        }

        let quit = ChatLine::parse(&line) == ChatLine::Quit;
        on_main(&state, move |state| flows::handle_line(state, user, &line));
        if quit {
            break;
        }
    }

    on_main(&state, move |state| flows::leave(state, user));
    if let Err(e) = writer_task.await {
        debug!(error = %e, "writer task ended abnormally");
    }
}

/// Run `f` on the main loop with the shared state.
fn on_main<F>(state: &Arc<ChatState>, f: F)
where
    F: FnOnce(&ChatState) + Send + 'static,
{
    let shared = state.clone();
    state.host.dispatch(Box::new(move || f(&shared)));
}
