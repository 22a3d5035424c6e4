//! 流式转发泵
//!
//! 源站响应体由独立任务读取，经有界通道交给客户端响应体：
//!
//! ```text
//! origin bytes_stream ──pump task──▶ mpsc(capacity) ──▶ Body::from_stream ──▶ client
//!                         ▲                                   │
//!                         └──────── CancellationToken ◀───────┘ (drop guard)
//! ```
//!
//! - 客户端断开：响应体被丢弃，drop guard 取消令牌，泵任务停止读取源站并丢弃源站连接
//! - 源站出错：泵任务向通道写入一个 io 错误并取消令牌，客户端连接随之中断
//! - 通道满时泵任务阻塞，从而对源站施加背压

use axum::body::{Body, Bytes};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::io;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};
use veilink_common::metrics::{ACTIVE_STREAMS, BYTES_RELAYED, STREAMS_FINISHED};

/// 泵任务的结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// 源站数据全部送达
    Completed,
    /// 客户端断开或外部取消
    Cancelled,
    /// 源站流出错
    Failed,
}

impl PumpOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            PumpOutcome::Completed => "completed",
            PumpOutcome::Cancelled => "cancelled",
            PumpOutcome::Failed => "failed",
        }
    }
}

/// 把源站流搬运到通道，直到结束、出错或被取消
pub async fn pump<S, E>(
    mut upstream: S,
    tx: mpsc::Sender<io::Result<Bytes>>,
    cancel: CancellationToken,
) -> PumpOutcome
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return PumpOutcome::Cancelled,
            next = upstream.next() => next,
        };

        match next {
            None => return PumpOutcome::Completed,
            Some(Ok(chunk)) => {
                let len = chunk.len() as u64;
                let sent = tokio::select! {
                    _ = cancel.cancelled() => return PumpOutcome::Cancelled,
                    sent = tx.send(Ok(chunk)) => sent,
                };
                if sent.is_err() {
                    // 接收端已丢弃
                    return PumpOutcome::Cancelled;
                }
                BYTES_RELAYED.inc_by(len);
            }
            Some(Err(e)) => {
                warn!("Origin stream failed: {}", e);
                let _ = tx.send(Err(io::Error::other(e.to_string()))).await;
                cancel.cancel();
                return PumpOutcome::Failed;
            }
        }
    }
}

/// 启动泵任务并返回客户端响应体
///
/// `first` 是调用方为确认源站可用而提前读取的首个分块。
pub fn spawn_body<S, E>(first: Option<Bytes>, upstream: S, capacity: usize) -> Body
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    ACTIVE_STREAMS.inc();
    tokio::spawn(async move {
        let outcome = match first {
            Some(chunk) => {
                let len = chunk.len() as u64;
                if tx.send(Ok(chunk)).await.is_err() {
                    PumpOutcome::Cancelled
                } else {
                    BYTES_RELAYED.inc_by(len);
                    pump(upstream, tx, task_cancel).await
                }
            }
            None => pump(upstream, tx, task_cancel).await,
        };
        ACTIVE_STREAMS.dec();
        STREAMS_FINISHED.with_label_values(&[outcome.as_str()]).inc();
        debug!("Relay stream finished: {}", outcome.as_str());
    });

    Body::from_stream(receiver_stream(rx, cancel.drop_guard()))
}

/// 通道接收端包装成流；流被丢弃时 guard 一并丢弃，取消泵任务
fn receiver_stream(
    rx: mpsc::Receiver<io::Result<Bytes>>,
    guard: DropGuard,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    futures::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        rx.recv().await.map(|item| (item, (rx, guard)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::time::Duration;

    fn chunks(parts: &[&'static str]) -> Vec<Result<Bytes, io::Error>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect()
    }

    #[tokio::test]
    async fn test_pump_completes() {
        let (tx, mut rx) = mpsc::channel(8);
        let upstream = stream::iter(chunks(&["ab", "cd"]));
        let outcome = pump(upstream, tx, CancellationToken::new()).await;
        assert_eq!(outcome, PumpOutcome::Completed);

        let mut collected = Vec::new();
        while let Some(item) = rx.recv().await {
            collected.extend_from_slice(&item.unwrap());
        }
        assert_eq!(collected, b"abcd");
    }

    #[tokio::test]
    async fn test_pump_failure_cancels_token() {
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let upstream = stream::iter(vec![
            Ok(Bytes::from_static(b"ok")),
            Err(io::Error::other("connection reset")),
            Ok(Bytes::from_static(b"never")),
        ]);

        let outcome = pump(upstream, tx, cancel.clone()).await;
        assert_eq!(outcome, PumpOutcome::Failed);
        assert!(cancel.is_cancelled());

        assert_eq!(rx.recv().await.unwrap().unwrap(), Bytes::from_static(b"ok"));
        assert!(rx.recv().await.unwrap().is_err());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_pump_stops_when_cancelled() {
        let (tx, _rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = pump(stream::pending::<Result<Bytes, io::Error>>(), tx, cancel).await;
        assert_eq!(outcome, PumpOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_dropping_body_cancels_pump() {
        let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(1);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            pump(
                stream::pending::<Result<Bytes, io::Error>>(),
                tx,
                task_cancel,
            )
            .await
        });

        let body = receiver_stream(rx, cancel.drop_guard());
        drop(body);

        let outcome = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, PumpOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_spawn_body_yields_first_chunk_then_rest() {
        let body = spawn_body(
            Some(Bytes::from_static(b"head-")),
            stream::iter(chunks(&["middle-", "tail"])),
            2,
        );
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"head-middle-tail");
    }
}
