use core::net::Ipv4Addr;

use crate::consts::{
    DATA_PACKET_MAX_SIZE, DMX_UNIVERSE_SIZE, E131_DEFAULT_PORT, SOURCE_LOSS_TIMEOUT_MILLIS,
};
use crate::data_packet::{DataPacket, SourceName};
use crate::merge::{merge_universe, MergedFrame};
use crate::output::OutputSink;
use crate::source_cid::SourceCid;
use crate::source_table::{AdmitResult, SourceTable};
use crate::transport::UdpTransport;
use crate::types::{ConfigError, DmxData, MergeMode, Priority, SourceLossPolicy, Universe};

/// Startup configuration of a [SacnBridge].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// The component identifier stamped into outgoing packets and used
    /// to drop our own multicast loopback.
    pub cid: SourceCid,
    /// The name stamped into outgoing packets.
    pub source_name: SourceName,
    pub merge_mode: MergeMode,
    pub source_loss_policy: SourceLossPolicy,
    pub source_loss_timeout_millis: u32,
}

impl BridgeConfig {
    /// Protocol defaults: HTP merge, hold the last frame on source loss,
    /// 2.5 second source loss timeout.
    pub fn new(cid: SourceCid) -> Self {
        let mut source_name = SourceName::new();
        source_name.push_str("sacn-bridge").unwrap();

        Self {
            cid,
            source_name,
            merge_mode: MergeMode::default(),
            source_loss_policy: SourceLossPolicy::default(),
            source_loss_timeout_millis: SOURCE_LOSS_TIMEOUT_MILLIS,
        }
    }
}

/// Configuration of one local DMX input port.
#[derive(Debug, Copy, Clone)]
pub struct InputPortConfig {
    /// The universe outgoing packets are addressed to.
    pub universe: Universe,
    pub priority: Priority,
    /// Where outgoing packets are sent.
    pub destination: Ipv4Addr,
}

impl InputPortConfig {
    /// A port transmitting to the universe's multicast group.
    pub fn multicast(universe: Universe, priority: Priority) -> Self {
        Self {
            universe,
            priority,
            destination: universe.multicast_addr(),
        }
    }
}

/// Counters over everything the bridge dropped, accepted or sent.
/// Protocol level conditions are non fatal and only show up here.
#[derive(Debug, Default, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeStats {
    /// Datagrams that failed E1.31 decoding.
    pub malformed_packets: u32,
    /// Packets carrying our own cid.
    pub loopback_packets: u32,
    /// Packets flagged as preview data.
    pub preview_packets: u32,
    /// Packets for universes without a configured output.
    pub unknown_universe_packets: u32,
    /// Packets rejected by the sequence window.
    pub out_of_order_packets: u32,
    /// Packets dropped because every sender slot was taken.
    pub sources_exceeded: u32,
    /// Packets that created or refreshed a source entry.
    pub accepted_packets: u32,
    /// Sources dropped by the loss timeout.
    pub timed_out_sources: u32,
    /// Sources removed after announcing stream termination.
    pub terminated_sources: u32,
    /// Packets transmitted on the local DMX input path.
    pub sent_packets: u32,
}

/// Errors that can escape the bridge. Protocol level conditions never
/// do, they are counted in [BridgeStats] instead.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError<TransportError, SinkError> {
    /// Fewer bytes were sent than the serialized packet holds.
    TruncatedSend,
    /// A transport specific error occurred.
    TransportError(TransportError),
    /// A sink specific error occurred.
    SinkError(SinkError),
}

impl<TransportError: core::fmt::Display, SinkError: core::fmt::Display> core::fmt::Display
    for BridgeError<TransportError, SinkError>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BridgeError::TruncatedSend => write!(f, "fewer bytes were sent than requested"),
            BridgeError::TransportError(error) => core::fmt::Display::fmt(error, f),
            BridgeError::SinkError(error) => core::fmt::Display::fmt(error, f),
        }
    }
}

#[cfg(feature = "std")]
impl<
        TransportError: core::fmt::Display + core::fmt::Debug,
        SinkError: core::fmt::Display + core::fmt::Debug,
    > std::error::Error for BridgeError<TransportError, SinkError>
{
}

#[derive(Debug)]
struct OutputUniverse {
    universe: Universe,
    frame: MergedFrame,
}

struct InputPort {
    universe: Universe,
    priority: Priority,
    destination: Ipv4Addr,
    sequence_number: u8,
    enabled: bool,
}

/// The structure to build an E1.31 to DMX bridge.
///
/// `PORTS` bounds the configurable output universes and input ports,
/// `SOURCES` the concurrent senders tracked per universe. The bridge is
/// single threaded and run to completion, time only enters through the
/// `now_millis` parameters which must come from one monotonic clock.
pub struct SacnBridge<T: UdpTransport, O: OutputSink, const PORTS: usize, const SOURCES: usize> {
    transport: T,
    output: O,
    cid: SourceCid,
    source_name: SourceName,
    merge_mode: MergeMode,
    source_loss_policy: SourceLossPolicy,
    source_table: SourceTable<PORTS, SOURCES>,
    outputs: heapless::Vec<OutputUniverse, PORTS>,
    input_ports: heapless::Vec<InputPort, PORTS>,
    stats: BridgeStats,
}

impl<T: UdpTransport, O: OutputSink, const PORTS: usize, const SOURCES: usize>
    SacnBridge<T, O, PORTS, SOURCES>
{
    /// Creates a new [SacnBridge].
    pub fn new(transport: T, output: O, config: BridgeConfig) -> Self {
        Self {
            transport,
            output,
            cid: config.cid,
            source_name: config.source_name,
            merge_mode: config.merge_mode,
            source_loss_policy: config.source_loss_policy,
            source_table: SourceTable::new(config.source_loss_timeout_millis),
            outputs: heapless::Vec::new(),
            input_ports: heapless::Vec::new(),
            stats: BridgeStats::default(),
        }
    }

    /// Registers a universe to receive, merge and forward to the sink.
    /// The embedder is responsible for joining its multicast group.
    pub fn add_output_universe(&mut self, universe: Universe) -> Result<(), ConfigError> {
        self.source_table.add_universe(universe)?;
        self.outputs
            .push(OutputUniverse {
                universe,
                frame: MergedFrame::new(),
            })
            .unwrap();

        Ok(())
    }

    /// Registers a local DMX input port. Ports start out enabled and are
    /// addressed by their registration index.
    pub fn add_input_port(&mut self, config: InputPortConfig) -> Result<(), ConfigError> {
        self.input_ports
            .push(InputPort {
                universe: config.universe,
                priority: config.priority,
                destination: config.destination,
                sequence_number: 0,
                enabled: true,
            })
            .map_err(|_| ConfigError::TooManyInputPorts)
    }

    /// Disabled ports ignore incoming samples. Unknown indexes are ignored.
    pub fn set_input_port_enabled(&mut self, port_index: usize, enabled: bool) {
        if let Some(port) = self.input_ports.get_mut(port_index) {
            port.enabled = enabled;
        }
    }

    /// Receives and processes at most one waiting datagram. Call this
    /// function as often as you can.
    ///
    /// Returns false if no datagram was waiting.
    pub fn poll(
        &mut self,
        now_millis: u64,
    ) -> Result<bool, BridgeError<T::TransportError, O::SinkError>> {
        let mut buffer = [0; DATA_PACKET_MAX_SIZE];

        let received = self
            .transport
            .try_receive(&mut buffer)
            .map_err(BridgeError::TransportError)?;

        match received {
            Some((size, sender)) => {
                self.handle_packet(&buffer[..size], sender, now_millis)?;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    /// Processes one received datagram.
    ///
    /// Malformed datagrams and every other protocol level condition are
    /// counted, never returned, so a hostile network cannot take the
    /// bridge down. Only sink errors surface. The sender address is
    /// accepted for symmetry with the transport but not consulted,
    /// senders are identified by their cid.
    pub fn handle_packet(
        &mut self,
        buffer: &[u8],
        _sender: Ipv4Addr,
        now_millis: u64,
    ) -> Result<(), BridgeError<T::TransportError, O::SinkError>> {
        let packet = match DataPacket::deserialize(buffer) {
            Ok(packet) => packet,
            Err(_) => {
                self.stats.malformed_packets += 1;
                return Ok(());
            },
        };

        if packet.cid == self.cid {
            self.stats.loopback_packets += 1;
            return Ok(());
        }

        if packet.preview_data {
            self.stats.preview_packets += 1;
            return Ok(());
        }

        let universe = packet.universe;

        // stale senders leave before the packet is judged
        let stats = &mut self.stats;
        let evicted = self
            .source_table
            .expire_universe(universe, now_millis, |_, _| {
                stats.timed_out_sources += 1;
            });

        let admitted = self.source_table.admit(
            universe,
            packet.cid,
            packet.priority,
            packet.sequence_number,
            &packet.dmx_data,
            packet.stream_terminated,
            now_millis,
        );

        match admitted {
            AdmitResult::NewSource | AdmitResult::Updated => {
                self.stats.accepted_packets += 1;
                self.remerge(universe)?;
            },
            AdmitResult::Terminated => {
                self.remerge(universe)?;
                self.stats.terminated_sources += self.source_table.sweep_terminated(universe);
            },
            AdmitResult::OutOfOrder => {
                self.stats.out_of_order_packets += 1;
                if evicted > 0 {
                    self.remerge(universe)?;
                }
            },
            AdmitResult::TableFull => {
                self.stats.sources_exceeded += 1;
                if evicted > 0 {
                    self.remerge(universe)?;
                }
            },
            AdmitResult::UnknownUniverse => {
                self.stats.unknown_universe_packets += 1;
            },
        }

        Ok(())
    }

    /// Runs source loss expiry across every universe and pushes fresh
    /// frames for those that lost a sender. Call at least once a second.
    pub fn tick(
        &mut self,
        now_millis: u64,
    ) -> Result<(), BridgeError<T::TransportError, O::SinkError>> {
        let mut dirty: heapless::Vec<Universe, PORTS> = heapless::Vec::new();

        let stats = &mut self.stats;
        self.source_table.expire(now_millis, |universe, _| {
            stats.timed_out_sources += 1;
            if !dirty.contains(&universe) {
                dirty.push(universe).ok();
            }
        });

        for universe in dirty {
            self.remerge(universe)?;
        }

        Ok(())
    }

    /// Transmits locally captured channel data on an input port.
    ///
    /// Builds a data packet from the bridge identity and the port's
    /// universe, priority and next sequence number, then sends it to the
    /// port's destination on the E1.31 port. The sequence number advances
    /// even when the send fails. Unknown and disabled ports are ignored.
    /// Channel data beyond a full universe is truncated.
    pub fn handle_dmx_input(
        &mut self,
        port_index: usize,
        channels: &[u8],
    ) -> Result<(), BridgeError<T::TransportError, O::SinkError>> {
        let (universe, priority, destination, sequence_number) = {
            let port = match self.input_ports.get_mut(port_index) {
                Some(port) => port,
                None => return Ok(()),
            };

            if !port.enabled {
                return Ok(());
            }

            let sequence_number = port.sequence_number;
            port.sequence_number = port.sequence_number.wrapping_add(1);

            (
                port.universe,
                port.priority,
                port.destination,
                sequence_number,
            )
        };

        let channels = &channels[..channels.len().min(DMX_UNIVERSE_SIZE)];

        let packet = DataPacket {
            cid: self.cid,
            source_name: self.source_name.clone(),
            priority,
            sequence_number,
            stream_terminated: false,
            preview_data: false,
            universe,
            dmx_data: DmxData::from_slice(channels).unwrap(),
        };

        let binary = packet.serialize();
        let sent = self
            .transport
            .send_to(&binary, destination, E131_DEFAULT_PORT)
            .map_err(BridgeError::TransportError)?;

        if sent != binary.len() {
            return Err(BridgeError::TruncatedSend);
        }

        self.stats.sent_packets += 1;

        Ok(())
    }

    fn remerge(
        &mut self,
        universe: Universe,
    ) -> Result<(), BridgeError<T::TransportError, O::SinkError>> {
        let entries = self.source_table.entries_for(universe);
        let source_lost = !entries.iter().any(|entry| !entry.terminated);
        let merged = merge_universe(entries, self.merge_mode);

        let output = match self
            .outputs
            .iter_mut()
            .find(|output| output.universe == universe)
        {
            Some(output) => output,
            None => return Ok(()),
        };

        // An accepted zero channel frame is data. The loss policy only
        // covers losing every live sender.
        if source_lost {
            match self.source_loss_policy {
                SourceLossPolicy::HoldLast => return Ok(()),
                SourceLossPolicy::Blank => output.frame = MergedFrame::blank(),
            }
        } else {
            output.frame = merged;
        }

        self.output
            .set_output(universe, &output.frame)
            .map_err(BridgeError::SinkError)
    }

    /// Get the transport, for example to reconfigure the underlying socket.
    pub fn get_transport(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Get the output sink.
    pub fn get_output(&mut self) -> &mut O {
        &mut self.output
    }

    /// Get the counters collected since startup.
    pub fn get_stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Get the frame most recently handed to the sink for a universe.
    pub fn get_merged_frame(&self, universe: Universe) -> Option<&MergedFrame> {
        self.outputs
            .iter()
            .find(|output| output.universe == universe)
            .map(|output| &output.frame)
    }

    /// Get the component identifier of this bridge.
    pub fn get_cid(&self) -> SourceCid {
        self.cid
    }

    /// Get the configured merge mode.
    pub fn get_merge_mode(&self) -> MergeMode {
        self.merge_mode
    }
}
