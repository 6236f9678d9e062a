use axum::{
    debug_handler,
    extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::realtime::{ClientEvent, Connection, ConnectionHandle, Relay};

#[debug_handler(state = crate::AppState)]
pub async fn chat_ws(
    State(relay): State<Relay>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| serve_socket(stream, relay))
}

async fn serve_socket(stream: WebSocket, relay: Relay) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut connection = Connection::new(ConnectionHandle::new(tx));
    let (mut sender, mut receiver) = stream.split();

    let mut push_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!("failed to serialize server event: {err}");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                    Ok(event) => connection.on_event(&relay, event),
                    Err(err) => tracing::warn!(raw = %text.as_str(), error = %err, "ignoring socket frame"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(err)) => {
                    tracing::debug!("socket receive error: {err}");
                    break;
                }
                Some(Ok(_)) => {}
            },
            _ = &mut push_task => break,
        }
    }

    connection.close(&relay);
    push_task.abort();
}
