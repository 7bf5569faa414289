//! Push-only subscription to live prediction events over WebSocket.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::Stream;
use severity_core::StreamMessage;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

use crate::client::PredictionClient;
use crate::error::StreamError;

/// Decoded messages from the streaming endpoint.
///
/// Text frames are decoded as [`StreamMessage`]; a frame that fails to decode
/// yields an error item and the stream continues. Binary and control frames
/// are skipped. The stream ends on a close frame or when the socket drops.
pub struct PredictionStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl PredictionStream {
    pub async fn connect(url: &str) -> Result<Self, StreamError> {
        info!(url = %url, "connecting to prediction stream");
        let (socket, response) = connect_async(url).await?;
        debug!(status = response.status().as_u16(), "prediction stream connected");
        Ok(Self {
            socket,
            closed: false,
        })
    }
}

impl Stream for PredictionStream {
    type Item = Result<StreamMessage, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(None);
        }
        loop {
            match ready!(Pin::new(&mut this.socket).poll_next(cx)) {
                None => {
                    this.closed = true;
                    return Poll::Ready(None);
                }
                Some(Err(e)) => {
                    this.closed = true;
                    return Poll::Ready(Some(Err(e.into())));
                }
                Some(Ok(Message::Text(text))) => {
                    return Poll::Ready(Some(
                        serde_json::from_str(text.as_str()).map_err(StreamError::from),
                    ));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "prediction stream closed by server");
                    this.closed = true;
                    return Poll::Ready(None);
                }
                Some(Ok(_)) => continue,
            }
        }
    }
}

impl PredictionClient {
    /// Open the streaming channel configured in `ws_url`.
    pub async fn subscribe(&self) -> Result<PredictionStream, StreamError> {
        PredictionStream::connect(&self.config().ws_url).await
    }
}
