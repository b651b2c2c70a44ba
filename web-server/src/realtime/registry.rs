// web-server/src/realtime/registry.rs
use std::collections::HashMap;
use actix::{Actor, Context, Handler, Message, MessageResult};
use common::Principal;
use uuid::Uuid;

#[derive(Message)]
#[rtype(result = "()")]
pub struct RegisterConnection {
    pub connection_id: Uuid,
    pub principal: Principal,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct UnregisterConnection {
    pub connection_id: Uuid,
}

/// Number of open real-time connections
#[derive(Message)]
#[rtype(result = "usize")]
pub struct ConnectionCount;

/// Tracks authenticated real-time connections
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<Uuid, Principal>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for ConnectionRegistry {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("ConnectionRegistry started");
    }
}

impl Handler<RegisterConnection> for ConnectionRegistry {
    type Result = ();

    fn handle(&mut self, msg: RegisterConnection, _ctx: &mut Self::Context) -> Self::Result {
        tracing::info!(
            "Registered connection {} for principal {}",
            msg.connection_id,
            msg.principal.id
        );
        self.connections.insert(msg.connection_id, msg.principal);
    }
}

impl Handler<UnregisterConnection> for ConnectionRegistry {
    type Result = ();

    fn handle(&mut self, msg: UnregisterConnection, _ctx: &mut Self::Context) -> Self::Result {
        if let Some(principal) = self.connections.remove(&msg.connection_id) {
            tracing::info!(
                "Unregistered connection {} for principal {}",
                msg.connection_id,
                principal.id
            );
        }
    }
}

impl Handler<ConnectionCount> for ConnectionRegistry {
    type Result = MessageResult<ConnectionCount>;

    fn handle(&mut self, _msg: ConnectionCount, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.connections.len())
    }
}
