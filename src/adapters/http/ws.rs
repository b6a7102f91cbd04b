use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::adapters::http::state::HttpState;
use crate::domain::{
    detection::InferenceResult,
    errors::PipelineError,
    stream::StreamReply,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Connecting,
    Streaming,
    Closed,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(st): State<HttpState>) -> impl axum::response::IntoResponse {
    debug!(state = ?ConnectionState::Connecting, "stream upgrade requested");
    ws.on_failed_upgrade(|e| warn!(error = %e, "stream handshake failed"))
        .on_upgrade(move |socket| {
            let conn = st.connections.enter();
            let span = info_span!("stream", conn = conn.id);
            async move {
                handle_socket(socket, st).await;
                drop(conn);
            }
            .instrument(span)
        })
}

/// Bucle leer → inferir → responder de un cliente.
///
/// Los frames se procesan de uno en uno: no se lee el siguiente mensaje hasta que la
/// respuesta anterior está enviada. Los errores del pipeline se convierten en
/// respuestas de error; los errores de transporte terminan el bucle.
async fn handle_socket(mut socket: WebSocket, st: HttpState) {
    let mut shutdown = st.shutdown.clone();
    if *shutdown.borrow_and_update() {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let mut state = ConnectionState::Streaming;
    info!(?state, "client connected");

    let mut out = st.pools.bytes.acquire();
    let mut frames = 0u64;

    while state == ConnectionState::Streaming {
        let msg = tokio::select! {
            msg = socket.recv() => msg,
            _ = shutdown.changed() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        };

        let frame = match msg {
            Some(Ok(Message::Binary(frame))) => frame,
            Some(Ok(Message::Close(_))) | None => {
                state = ConnectionState::Closed;
                continue;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                debug!(error = %e, "read failed");
                break;
            }
        };

        let result = st.pipeline.detect(frame).await;
        if let Err(e) = &result {
            warn!(error = %e, "frame rejected");
        }
        encode_reply(&mut out, &result);
        frames += 1;

        if let Err(e) = socket.send(Message::Text(reply_text(&out))).await {
            debug!(error = %e, "write failed");
            break;
        }
    }

    out.release();
    info!(state = ?ConnectionState::Closed, frames, "client disconnected");
}

const SERIALIZATION_FAILED: &str = r#"{"error":"reply serialization failed"}"#;

fn encode_reply(out: &mut Vec<u8>, result: &Result<InferenceResult, PipelineError>) {
    out.clear();
    let reply = match result {
        Ok(detections) => StreamReply::Detections { detections },
        Err(e) => StreamReply::Error { error: e.to_string() },
    };
    if let Err(e) = serde_json::to_writer(&mut *out, &reply) {
        warn!(error = %e, "reply serialization failed");
        out.clear();
        out.extend_from_slice(SERIALIZATION_FAILED.as_bytes());
    }
}

/// `Message::Text` es dueño de su `String`: una copia del buffer por respuesta.
fn reply_text(out: &[u8]) -> String {
    String::from_utf8(out.to_vec()).unwrap_or_else(|e| {
        error!(error = %e, "reply is not valid UTF-8");
        SERIALIZATION_FAILED.to_string()
    })
}
