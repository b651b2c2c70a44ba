// web-server/src/realtime/session.rs
use std::time::{Duration, Instant};
use actix::{Actor, ActorContext, Addr, AsyncContext, StreamHandler};
use actix_web_actors::ws;
use common::Principal;
use serde_json::json;
use uuid::Uuid;

use super::registry::{ConnectionRegistry, RegisterConnection, UnregisterConnection};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// One authenticated real-time connection.
///
/// Created only after the handshake passed token validation; a reconnect
/// gets a new actor and a new handshake.
pub struct NotificationSession {
    connection_id: Uuid,
    principal: Principal,
    last_heartbeat: Instant,
    registry: Addr<ConnectionRegistry>,
}

impl NotificationSession {
    pub fn new(principal: Principal, registry: Addr<ConnectionRegistry>) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            principal,
            last_heartbeat: Instant::now(),
            registry,
        }
    }

    // Heartbeat with timeout detection
    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                tracing::warn!("Connection heartbeat timeout: {}", act.connection_id);
                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }
}

impl Actor for NotificationSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "Real-time connection {} opened for principal {}",
            self.connection_id,
            self.principal.id
        );

        self.heartbeat(ctx);

        self.registry.do_send(RegisterConnection {
            connection_id: self.connection_id,
            principal: self.principal.clone(),
        });

        let welcome = json!({
            "type": "connected",
            "connection_id": self.connection_id,
            "user": self.principal,
        });
        ctx.text(welcome.to_string());
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Real-time connection {} closed", self.connection_id);

        self.registry.do_send(UnregisterConnection {
            connection_id: self.connection_id,
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for NotificationSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                // Inbound payloads belong to the notification features, not to this hub
                tracing::debug!("Ignoring inbound message on {}: {} bytes", self.connection_id, text.len());
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("Connection {} closing: {:?}", self.connection_id, reason);
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::error!("WebSocket protocol error on {}: {}", self.connection_id, e);
                ctx.stop();
            }
            _ => (),
        }
    }
}
