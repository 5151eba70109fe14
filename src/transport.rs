use core::net::Ipv4Addr;

/// Object to implement access to the UDP socket.
/// The embedding process owns the socket and its multicast memberships,
/// see [crate::types::Universe::multicast_addr] for the groups to join.
pub trait UdpTransport {
    type TransportError;

    /// Receive a single waiting datagram without blocking.
    /// Returns the number of bytes read and the sender address,
    /// or `None` when no datagram is waiting.
    fn try_receive(
        &mut self,
        buffer: &mut [u8],
    ) -> Result<Option<(usize, Ipv4Addr)>, Self::TransportError>;

    /// Send a datagram to the destination.
    /// Returns the number of bytes actually sent.
    fn send_to(
        &mut self,
        buffer: &[u8],
        destination: Ipv4Addr,
        port: u16,
    ) -> Result<usize, Self::TransportError>;
}
