//! Newline-delimited JSON-RPC over a byte stream
//!
//! One line is one message. Each message is handled on its own task, so
//! responses can be written out of order; the writer is shared behind a mutex
//! and every response is written as a single line.

use std::{future::Future, io, sync::Arc};

use serde_json::Value;
use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
    task::JoinSet,
};
use tracing::{debug, error, info, trace, warn};

use crate::{
    errors::error_message,
    mcp::{
        dispatcher::Dispatcher,
        rpc::{json_rpc_error, INVALID_REQUEST, PARSE_ERROR},
        server::handle_json_rpc_value,
    },
};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to read from input: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write output: {0}")]
    Write(#[source] io::Error),
    #[error("{0} request task(s) ended without a response")]
    Drain(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfInput,
    Shutdown,
}

enum Line {
    Complete,
    Oversized(usize),
}

pub struct StdioTransport<W> {
    dispatcher: Dispatcher,
    writer: Arc<Mutex<W>>,
    max_request_size: usize,
    tasks: JoinSet<()>,
    failed_tasks: usize,
}

impl<W> StdioTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(dispatcher: Dispatcher, writer: W, max_request_size: usize) -> Self {
        Self {
            dispatcher,
            writer: Arc::new(Mutex::new(writer)),
            max_request_size,
            tasks: JoinSet::new(),
            failed_tasks: 0,
        }
    }

    /// Reads messages until the input ends or `shutdown` resolves.
    ///
    /// In-flight requests keep running after this returns; call [`close`](Self::close)
    /// to wait for them.
    pub async fn run<R, S>(&mut self, mut reader: R, shutdown: S) -> Result<StopReason, TransportError>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut buffer = Vec::new();

        loop {
            self.reap_finished();

            let line = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(in_flight = self.tasks.len(), "shutdown requested, no longer reading input");
                    return Ok(StopReason::Shutdown);
                }
                line = next_line(&mut reader, self.max_request_size, &mut buffer) => {
                    line.map_err(TransportError::Read)?
                }
            };

            match line {
                None => {
                    info!(in_flight = self.tasks.len(), "input closed");
                    return Ok(StopReason::EndOfInput);
                }
                Some(Line::Oversized(size)) => {
                    warn!(size, limit = self.max_request_size, "rejecting oversized message");
                    let response = json_rpc_error(
                        None,
                        INVALID_REQUEST,
                        &format!(
                            "Request exceeds maximum size of {} bytes",
                            self.max_request_size
                        ),
                    );
                    write_line(&self.writer, &response)
                        .await
                        .map_err(TransportError::Write)?;
                }
                Some(Line::Complete) => self.accept(&buffer).await?,
            }
        }
    }

    async fn accept(&mut self, raw: &[u8]) -> Result<(), TransportError> {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        trace!(message = %text, "received line");

        let payload: Value = match serde_json::from_str(text) {
            Ok(payload) => payload,
            Err(err) => {
                debug!(error = %err, "unparseable message");
                let response = json_rpc_error(None, PARSE_ERROR, "Parse error");
                return write_line(&self.writer, &response)
                    .await
                    .map_err(TransportError::Write);
            }
        };

        let dispatcher = self.dispatcher.clone();
        let writer = Arc::clone(&self.writer);
        self.tasks.spawn(async move {
            let Some(response) = handle_json_rpc_value(&dispatcher, payload).await else {
                return;
            };
            if let Err(err) = write_line(&writer, &response).await {
                error!(error = %err, "failed to write response");
            }
        });
        Ok(())
    }

    fn reap_finished(&mut self) {
        while let Some(outcome) = self.tasks.try_join_next() {
            if let Err(join_error) = outcome {
                log_task_failure(join_error);
                self.failed_tasks += 1;
            }
        }
    }

    /// Waits for every in-flight request to write its response, then flushes.
    ///
    /// Fails if any request task died without answering, during the run or
    /// while draining.
    pub async fn close(mut self) -> Result<(), TransportError> {
        while let Some(outcome) = self.tasks.join_next().await {
            if let Err(join_error) = outcome {
                log_task_failure(join_error);
                self.failed_tasks += 1;
            }
        }

        self.writer
            .lock()
            .await
            .flush()
            .await
            .map_err(TransportError::Write)?;

        if self.failed_tasks > 0 {
            return Err(TransportError::Drain(self.failed_tasks));
        }
        debug!("transport closed");
        Ok(())
    }
}

fn log_task_failure(join_error: tokio::task::JoinError) {
    if join_error.is_panic() {
        let payload = join_error.into_panic();
        error!(error = %error_message(payload.as_ref()), "request task panicked");
    } else {
        warn!("request task was cancelled");
    }
}

async fn write_line<W>(writer: &Mutex<W>, message: &Value) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = serde_json::to_vec(message)?;
    encoded.push(b'\n');

    let mut writer = writer.lock().await;
    writer.write_all(&encoded).await?;
    writer.flush().await
}

/// Reads one line into `buffer` without holding more than `limit` bytes of it.
async fn next_line<R>(reader: &mut R, limit: usize, buffer: &mut Vec<u8>) -> io::Result<Option<Line>>
where
    R: AsyncBufRead + Unpin,
{
    buffer.clear();
    let mut total = 0usize;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(match total {
                0 => None,
                _ if total > limit => Some(Line::Oversized(total)),
                _ => Some(Line::Complete),
            });
        }

        let (chunk_len, consumed, finished) = match available.iter().position(|byte| *byte == b'\n') {
            Some(newline) => (newline, newline + 1, true),
            None => (available.len(), available.len(), false),
        };
        total += chunk_len;
        if total <= limit {
            buffer.extend_from_slice(&available[..chunk_len]);
        }
        reader.consume(consumed);

        if finished {
            return Ok(Some(if total > limit {
                Line::Oversized(total)
            } else {
                Line::Complete
            }));
        }
    }
}
