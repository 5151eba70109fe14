//! Rust library for receiving sACN (ANSI E1.31) lighting data over UDP, merging concurrent
//! senders and driving local DMX512 outputs through interchangeable transports and sinks.
//! This library features no-std as well as no-alloc support (no heap allocation) to target
//! embedded as well as os platforms.
//!
//! Please refer to the [official specifications](https://tsp.esta.org/) published by the ESTA.
//!
//! <div class="warning">This library is wip, it has not yet received extensive testing and the api
//! might not be final.</div>
//!
//! # Usage
//! These examples show the basic usage with in-memory collaborators. Replace them with
//! your UDP socket and your output hardware. The embedding process owns the socket, the
//! multicast group memberships and the clock behind the `now_millis` arguments.
//!
//! ## Receiving
//!
//! ```rust
//! use core::net::Ipv4Addr;
//! use std::collections::VecDeque;
//!
//! use sacn_bridge::bridge::{BridgeConfig, SacnBridge};
//! use sacn_bridge::data_packet::{DataPacket, SourceName};
//! use sacn_bridge::merge::MergedFrame;
//! use sacn_bridge::output::OutputSink;
//! use sacn_bridge::source_cid::SourceCid;
//! use sacn_bridge::transport::UdpTransport;
//! use sacn_bridge::types::{DmxData, Priority, Universe};
//!
//! // Replace this with your UDP socket.
//! #[derive(Default)]
//! struct QueueTransport {
//!     incoming: VecDeque<(Vec<u8>, Ipv4Addr)>,
//! }
//!
//! impl UdpTransport for QueueTransport {
//!     type TransportError = core::convert::Infallible;
//!
//!     fn try_receive(
//!         &mut self,
//!         buffer: &mut [u8],
//!     ) -> Result<Option<(usize, Ipv4Addr)>, Self::TransportError> {
//!         Ok(self.incoming.pop_front().map(|(datagram, sender)| {
//!             buffer[..datagram.len()].copy_from_slice(&datagram);
//!             (datagram.len(), sender)
//!         }))
//!     }
//!
//!     fn send_to(
//!         &mut self,
//!         buffer: &[u8],
//!         _destination: Ipv4Addr,
//!         _port: u16,
//!     ) -> Result<usize, Self::TransportError> {
//!         Ok(buffer.len())
//!     }
//! }
//!
//! // Replace this with your DMX hardware.
//! struct MonitorSink;
//!
//! impl OutputSink for MonitorSink {
//!     type SinkError = core::convert::Infallible;
//!
//!     fn set_output(
//!         &mut self,
//!         universe: Universe,
//!         frame: &MergedFrame,
//!     ) -> Result<(), Self::SinkError> {
//!         println!("universe {universe}: {:?}", frame.as_slice());
//!         Ok(())
//!     }
//! }
//!
//! let universe = Universe::new(1).unwrap();
//!
//! // Serve up to 4 universes/input ports with 4 concurrent senders each.
//! let mut bridge = SacnBridge::<_, _, 4, 4>::new(
//!     QueueTransport::default(),
//!     MonitorSink,
//!     BridgeConfig::new(SourceCid::try_parse("7158e365-2e0e-4708-9b54-2f4d80f428d3").unwrap()),
//! );
//!
//! // Join universe.multicast_addr() on your socket when registering.
//! bridge.add_output_universe(universe).unwrap();
//!
//! // A packet as some console on the network would send it.
//! let mut source_name = SourceName::new();
//! source_name.push_str("demo console").unwrap();
//! let packet = DataPacket {
//!     cid: SourceCid::new([0x11; 16]),
//!     source_name,
//!     priority: Priority::default(),
//!     sequence_number: 0,
//!     stream_terminated: false,
//!     preview_data: false,
//!     universe,
//!     dmx_data: DmxData::from_slice(&[255, 128, 0]).unwrap(),
//! };
//! bridge
//!     .get_transport()
//!     .incoming
//!     .push_back((packet.serialize().to_vec(), Ipv4Addr::new(10, 0, 0, 2)));
//!
//! // Drain the socket, then let the periodic tick expire silent senders.
//! while bridge.poll(0).unwrap() {}
//! bridge.tick(1000).unwrap();
//!
//! assert_eq!(
//!     bridge.get_merged_frame(universe).unwrap().as_slice(),
//!     &[255, 128, 0]
//! );
//! ```
//!
//! ## Transmitting
//!
//! ```rust
//! use core::net::Ipv4Addr;
//!
//! use sacn_bridge::bridge::{BridgeConfig, InputPortConfig, SacnBridge};
//! use sacn_bridge::data_packet::DataPacket;
//! use sacn_bridge::merge::MergedFrame;
//! use sacn_bridge::output::OutputSink;
//! use sacn_bridge::source_cid::SourceCid;
//! use sacn_bridge::transport::UdpTransport;
//! use sacn_bridge::types::{Priority, Universe};
//!
//! struct LoggingTransport {
//!     sent: Vec<(Vec<u8>, Ipv4Addr, u16)>,
//! }
//!
//! impl UdpTransport for LoggingTransport {
//!     type TransportError = core::convert::Infallible;
//!
//!     fn try_receive(
//!         &mut self,
//!         _buffer: &mut [u8],
//!     ) -> Result<Option<(usize, Ipv4Addr)>, Self::TransportError> {
//!         Ok(None)
//!     }
//!
//!     fn send_to(
//!         &mut self,
//!         buffer: &[u8],
//!         destination: Ipv4Addr,
//!         port: u16,
//!     ) -> Result<usize, Self::TransportError> {
//!         self.sent.push((buffer.to_vec(), destination, port));
//!         Ok(buffer.len())
//!     }
//! }
//!
//! struct NullSink;
//!
//! impl OutputSink for NullSink {
//!     type SinkError = core::convert::Infallible;
//!
//!     fn set_output(
//!         &mut self,
//!         _universe: Universe,
//!         _frame: &MergedFrame,
//!     ) -> Result<(), Self::SinkError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut bridge = SacnBridge::<_, _, 2, 2>::new(
//!     LoggingTransport { sent: Vec::new() },
//!     NullSink,
//!     BridgeConfig::new(SourceCid::new([0x42; 16])),
//! );
//!
//! // Forward the first local DMX input port to universe 2.
//! bridge
//!     .add_input_port(InputPortConfig::multicast(
//!         Universe::new(2).unwrap(),
//!         Priority::default(),
//!     ))
//!     .unwrap();
//!
//! bridge.handle_dmx_input(0, &[10, 20, 30]).unwrap();
//!
//! let (datagram, destination, port) = &bridge.get_transport().sent[0];
//! assert_eq!(*destination, Ipv4Addr::new(239, 255, 0, 2));
//! assert_eq!(*port, 5568);
//!
//! let echoed = DataPacket::deserialize(datagram).unwrap();
//! assert_eq!(echoed.universe.as_u16(), 2);
//! assert_eq!(echoed.dmx_data.as_slice(), &[10, 20, 30]);
//! ```
//!

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Module for building E1.31 to DMX bridges.
pub mod bridge;
pub mod consts;
/// Serialization and deserialization of E1.31 data packets.
pub mod data_packet;
mod layouts;
/// Combining the senders of a universe into one outgoing frame.
pub mod merge;
pub mod output;
pub mod source_cid;
/// Registry of the senders currently heard on each universe.
pub mod source_table;
pub mod transport;
pub mod types;
