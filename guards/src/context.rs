//! Per-client context handed to message guards.

use std::net::IpAddr;

use tokio::sync::mpsc;

use palisade_messages::OutgoingMessage;

/// The connected client a message came from, plus the channel for pushing
/// messages back to it. The host's writer task drains the receiving end.
pub struct ClientContext {
    pub ip: IpAddr,
    outgoing_tx: mpsc::UnboundedSender<OutgoingMessage>,
}

impl ClientContext {
    /// Create a context and the receiver the host drains into the socket.
    pub fn new(ip: IpAddr) -> (Self, mpsc::UnboundedReceiver<OutgoingMessage>) {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        (Self { ip, outgoing_tx }, outgoing_rx)
    }

    /// Queue a message for delivery to the client. Delivery failure means
    /// the client is already gone; there is nothing useful to do about it.
    pub fn send_message(&self, message: OutgoingMessage) {
        let _ = self.outgoing_tx.send(message);
    }
}
