use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::messages::ClientMessage;
use super::registry::{outbound_channel, ConnectionId, SubscriptionRegistry};
use crate::context::AppContext;

/// Handle WebSocket upgrade request
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(ctx): State<Arc<AppContext>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

/// Handle WebSocket connection
///
/// The reader loop owns the registration; a spawned writer drains the
/// connection's outbound queue into the socket. Whichever side ends first,
/// the registration is dropped exactly once on the way out.
async fn handle_socket(socket: WebSocket, ctx: Arc<AppContext>) {
    let (mut sink, mut stream) = socket.split();
    let registry = Arc::clone(&ctx.registry);

    let (tx, mut rx) = outbound_channel(ctx.config.ws_outbound_capacity);
    let connection = registry.register(tx);

    info!("WebSocket client connected: {}", connection);

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = sink.send(Message::Text(frame.to_string())).await {
                debug!("Send to {} failed: {}", connection, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        apply_control_message(&registry, connection, &text);
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket client disconnected: {}", connection);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error on {}: {}", connection, e);
                        break;
                    }
                    None => break,
                    // Ping/pong are answered by the protocol layer; binary frames are ignored
                    Some(Ok(_)) => {}
                }
            }
            _ = &mut writer => {
                debug!("Writer for {} finished", connection);
                break;
            }
        }
    }

    registry.drop_connection(connection);
    writer.abort();

    info!("WebSocket connection closed: {}", connection);
}

/// Apply one inbound text frame to the registry
///
/// Malformed and unknown messages are ignored; the connection stays open.
pub fn apply_control_message(
    registry: &SubscriptionRegistry,
    connection: ConnectionId,
    text: &str,
) -> Option<ClientMessage> {
    let message = ClientMessage::parse(text)?;

    match &message {
        ClientMessage::Subscribe { symbol } => {
            if registry.subscribe(connection, symbol) {
                info!("Client {} subscribed to {}", connection, symbol);
            }
        }
        ClientMessage::Unsubscribe { symbol } => {
            if registry.unsubscribe(connection, symbol) {
                info!("Client {} unsubscribed from {}", connection, symbol);
            }
        }
    }

    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::create_router;
    use crate::config::AppConfig;
    use crate::market_data::provider::mock::ScriptedProvider;
    use crate::models::QuoteUpdate;
    use futures::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::Message as ClientFrame;

    async fn wait_until(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_socket_lifecycle() {
        let ctx = Arc::new(AppContext::new(
            AppConfig::default(),
            Arc::new(ScriptedProvider::new()),
        ));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(Arc::clone(&ctx));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
            .await
            .unwrap();

        // Registered with an empty subscription set
        wait_until(|| ctx.registry.connection_count() == 1).await;
        assert_eq!(ctx.registry.symbol_count(), 0);

        client
            .send(ClientFrame::Text(r#"{"type":"subscribe","symbol":"aapl"}"#.into()))
            .await
            .unwrap();
        client.send(ClientFrame::Text("{{ not json".into())).await.unwrap();
        client
            .send(ClientFrame::Text(r#"{"type":"subscribe","symbol":"MSFT"}"#.into()))
            .await
            .unwrap();

        // The malformed frame in between did not end the connection
        wait_until(|| ctx.registry.symbol_count() == 2).await;
        assert_eq!(ctx.registry.connection_count(), 1);

        let report = ctx.broadcaster.publish(&QuoteUpdate {
            symbol: "AAPL".to_string(),
            price: 151.25,
            change_amount: 1.25,
            change_percent: 0.83,
            volume: 52_000_000,
        });
        assert_eq!(report.delivered, 1);

        let frame = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match client.next().await {
                    Some(Ok(ClientFrame::Text(text))) => return text.to_string(),
                    Some(Ok(_)) => continue,
                    other => panic!("socket ended early: {:?}", other),
                }
            }
        })
        .await
        .expect("no stock_update received");

        let message: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(message["type"], "stock_update");
        assert_eq!(message["data"]["symbol"], "AAPL");
        assert_eq!(message["data"]["price"], 151.25);

        client.close(None).await.unwrap();

        // Registration and every index entry are gone after close
        wait_until(|| ctx.registry.connection_count() == 0).await;
        assert_eq!(ctx.registry.symbol_count(), 0);
    }

    #[test]
    fn test_control_messages_drive_registry() {
        let registry = SubscriptionRegistry::new();
        let (tx, _rx) = outbound_channel(4);
        let id = registry.register(tx);

        apply_control_message(&registry, id, r#"{"type":"subscribe","symbol":"aapl"}"#);
        assert!(registry.is_subscribed(id, "AAPL"));

        apply_control_message(&registry, id, r#"{"type":"unsubscribe","symbol":"AAPL"}"#);
        assert!(!registry.is_subscribed(id, "AAPL"));
    }

    #[test]
    fn test_garbage_is_ignored() {
        let registry = SubscriptionRegistry::new();
        let (tx, _rx) = outbound_channel(4);
        let id = registry.register(tx);
        registry.subscribe(id, "TSLA");

        assert!(apply_control_message(&registry, id, "{{{").is_none());
        assert!(apply_control_message(&registry, id, r#"{"type":"reset"}"#).is_none());

        assert!(registry.is_registered(id));
        assert_eq!(registry.subscriptions(id), vec!["TSLA"]);
    }
}
