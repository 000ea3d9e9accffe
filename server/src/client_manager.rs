//! Connection management for the quiz server
//!
//! This module tracks every live WebSocket connection, including:
//! - Connection lifecycle (accept, close)
//! - Identifier assignment for routing coordinator output
//! - Capacity enforcement
//! - Outbound delivery through each connection's writer channel
//!
//! Connection identity is deliberately separate from player identity: a
//! player who reconnects gets a new `ConnectionId` but keeps their
//! `PlayerId` inside the session.

use log::{debug, info, warn};
use shared::ServerPacket;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;

/// Identifier the server assigns to each accepted connection
pub type ConnectionId = u32;

/// Channel feeding a connection's writer task
pub type ConnectionTx = mpsc::UnboundedSender<ServerPacket>;

/// Represents one accepted connection
///
/// Each connection maintains:
/// - Its identifier and peer address for logging
/// - The time it was accepted
/// - The sender half of its outbound packet queue
#[derive(Debug)]
pub struct Connection {
    /// Unique connection identifier assigned by the server
    pub id: ConnectionId,
    /// Peer address of the socket
    pub addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
    /// Outbound packets are pushed here and written by the connection's task
    pub sender: ConnectionTx,
}

impl Connection {
    /// Creates a new connection record
    pub fn new(id: ConnectionId, addr: SocketAddr, sender: ConnectionTx) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Queues a packet for this connection
    ///
    /// Returns false if the writer task is gone, which means the socket is
    /// closing and a disconnect event is on its way.
    pub fn send(&self, packet: ServerPacket) -> bool {
        self.sender.send(packet).is_ok()
    }
}

/// Manages all live connections
///
/// The ClientManager owns the only route from the coordinator to the
/// sockets. It is mutated exclusively by the server loop, so no locking is
/// needed.
pub struct ClientManager {
    /// Live connections indexed by their identifier
    connections: HashMap<ConnectionId, Connection>,
    /// Next identifier to hand out
    next_connection_id: ConnectionId,
    /// Maximum number of concurrent connections allowed
    max_connections: usize,
}

impl ClientManager {
    /// Creates a connection manager with the given capacity
    ///
    /// Identifiers start at 1 and increase for every accepted connection.
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_connection_id: 1,
            max_connections,
        }
    }

    /// Registers a new connection
    ///
    /// Returns the assigned identifier, or None if the server is at capacity.
    pub fn add_connection(&mut self, addr: SocketAddr, sender: ConnectionTx) -> Option<ConnectionId> {
        if self.connections.len() >= self.max_connections {
            warn!(
                "Rejecting connection from {}: {} connections open",
                addr,
                self.connections.len()
            );
            return None;
        }

        let id = self.next_connection_id;
        self.next_connection_id = self.next_connection_id.wrapping_add(1).max(1);

        info!("Connection {} opened from {}", id, addr);
        self.connections.insert(id, Connection::new(id, addr, sender));
        Some(id)
    }

    /// Forgets a connection
    ///
    /// Returns true if it was known. Dropping the record drops its sender,
    /// which ends the writer task and closes the socket.
    pub fn remove_connection(&mut self, id: ConnectionId) -> bool {
        if let Some(connection) = self.connections.remove(&id) {
            info!(
                "Connection {} from {} closed after {:?}",
                id,
                connection.addr,
                connection.connected_at.elapsed()
            );
            true
        } else {
            false
        }
    }

    /// Delivers a packet to one connection
    ///
    /// Unknown or closing connections are skipped; delivery is best effort.
    pub fn send(&self, id: ConnectionId, packet: ServerPacket) -> bool {
        match self.connections.get(&id) {
            Some(connection) => {
                debug!("-> {}: {:?}", id, packet);
                connection.send(packet)
            }
            None => {
                debug!("Dropping packet for unknown connection {}", id);
                false
            }
        }
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Returns the number of open connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if no connections are open
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

/// Tests cover connection lifecycle, capacity enforcement and delivery.
#[cfg(test)]
mod tests {
    use super::*;
    use shared::JoinCode;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    fn channel() -> (ConnectionTx, mpsc::UnboundedReceiver<ServerPacket>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new(5);
        assert_eq!(manager.max_connections, 5);
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_add_multiple_connections() {
        let mut manager = ClientManager::new(3);
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        let id1 = manager.add_connection(test_addr(), tx1).unwrap();
        let id2 = manager.add_connection(test_addr2(), tx2).unwrap();

        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
        assert_eq!(manager.len(), 2);
        assert!(manager.contains(id1) && manager.contains(id2));
    }

    #[test]
    fn test_add_connection_max_capacity() {
        let mut manager = ClientManager::new(1);
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        assert!(manager.add_connection(test_addr(), tx1).is_some());
        assert!(manager.add_connection(test_addr2(), tx2).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_connection() {
        let mut manager = ClientManager::new(2);
        let (tx, _rx) = channel();
        let id = manager.add_connection(test_addr(), tx).unwrap();

        assert!(manager.remove_connection(id));
        assert!(!manager.contains(id));
        assert!(!manager.remove_connection(id));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_send_delivers_to_channel() {
        let mut manager = ClientManager::new(2);
        let (tx, mut rx) = channel();
        let id = manager.add_connection(test_addr(), tx).unwrap();

        let packet = ServerPacket::SessionCreated {
            code: JoinCode::from(123456),
        };
        assert!(manager.send(id, packet.clone()));
        assert_eq!(rx.try_recv().unwrap(), packet);
    }

    #[test]
    fn test_send_to_unknown_or_closed() {
        let mut manager = ClientManager::new(2);
        assert!(!manager.send(42, ServerPacket::error("nobody home")));

        let (tx, rx) = channel();
        let id = manager.add_connection(test_addr(), tx).unwrap();
        drop(rx);
        assert!(!manager.send(id, ServerPacket::error("writer gone")));
    }
}
