//! WebSocket transport for the live occupancy feed
//!
//! Each snapshot from the broadcaster is forwarded as one text frame. The
//! subscription is registered before the upgrade so a store failure is
//! reported as a normal HTTP error.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::select;
use tracing::{debug, info, warn};

use crate::interfaces::http::common::ApiError;
use crate::notifications::{SharedBroadcaster, Subscription};

#[derive(Clone)]
pub struct NotificationState {
    pub broadcaster: SharedBroadcaster,
}

pub async fn ws_spots_handler(
    ws: WebSocketUpgrade,
    State(state): State<NotificationState>,
) -> Response {
    match state.broadcaster.subscribe().await {
        Ok(subscription) => ws
            .on_upgrade(move |socket| pump_snapshots(socket, subscription))
            .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

async fn pump_snapshots(socket: WebSocket, mut subscription: Subscription) {
    let subscriber = subscription.id();
    let (mut sender, mut receiver) = socket.split();
    info!(%subscriber, "📡 WebSocket stream opened");

    loop {
        select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(%subscriber, error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }

            snapshot = subscription.recv() => {
                let Some(snapshot) = snapshot else {
                    // Removed by the broadcaster (stalled or shutting down)
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                };
                if let Err(e) = sender.send(Message::Text(snapshot.as_ref().into())).await {
                    debug!(%subscriber, error = %e, "WebSocket send failed");
                    break;
                }
            }
        }
    }

    info!(%subscriber, "WebSocket stream closed");
}
