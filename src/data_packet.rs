use crate::consts::{
    ACN_PACKET_IDENTIFIER, DATA_PACKET_MAX_SIZE, DATA_PACKET_MIN_SIZE, DMP_ADDRESS_AND_DATA_TYPE,
    DMP_LAYER_OFFSET, DMX_NULL_START, FRAMING_LAYER_OFFSET, LAYER_FLAGS, POSTAMBLE_SIZE,
    PREAMBLE_SIZE, PROPERTY_VALUES_OFFSET, ROOT_LAYER_FLAGS_OFFSET, SOURCE_NAME_LENGTH,
    VECTOR_DATA_PACKET, VECTOR_DMP_SET_PROPERTY, VECTOR_ROOT_DATA,
};
use crate::layouts::data_packet_layout;
use crate::source_cid::SourceCid;
use crate::types::{DmxData, Priority, Universe};
use modular_bitfield::bitfield;
use modular_bitfield::prelude::B6;

/// Binary representation of an E1.31 data packet.
pub type BinaryDataPacket = heapless::Vec<u8, DATA_PACKET_MAX_SIZE>;

/// The human readable name a sender assigns itself.
pub type SourceName = heapless::String<SOURCE_NAME_LENGTH>;

#[bitfield]
struct OptionsField {
    #[skip]
    reserved: B6,
    /// The sender is shutting this stream down.
    pub stream_terminated: bool,
    /// The data is intended for visualizers, not for live output.
    pub preview_data: bool,
}

/// A decoded E1.31 data packet.
///
/// The synchronization address is not represented. Synchronized operation is
/// unsupported, so packets are processed as they arrive and the field is
/// always encoded as zero.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DataPacket {
    pub cid: SourceCid,
    pub source_name: SourceName,
    pub priority: Priority,
    pub sequence_number: u8,
    pub stream_terminated: bool,
    pub preview_data: bool,
    pub universe: Universe,
    /// Channel data without the start code slot.
    pub dmx_data: DmxData,
}

impl DataPacket {
    pub fn deserialize(buffer: &[u8]) -> Result<Self, DataPacketDeserializationError> {
        deserialize_data_packet(buffer)
    }

    pub fn serialize(&self) -> BinaryDataPacket {
        serialize_data_packet(self)
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataPacketDeserializationError {
    /// Buffer must be at least 126 bytes
    BufferTooSmall,
    /// Buffer must be at most 638 bytes
    BufferTooBig,
    /// Wrong preamble or postamble size
    WrongPreamble,
    /// The 12 byte ACN packet identifier did not match
    WrongPacketIdentifier,
    /// A flags nibble was not 0x7; contains contents of the nibble
    WrongFlags(u8),
    /// A layer length field disagrees with the datagram size; contains result of parsing
    WrongLayerLength(usize),
    /// Root layer carries something other than E1.31 data; contains contents of the vector field
    WrongRootVector(u32),
    /// Framing layer carries something other than a data packet; contains contents of the vector field
    WrongFramingVector(u32),
    /// DMP layer carries something other than set-property; contains contents of the vector field
    WrongDmpVector(u8),
    /// Address and data type must be 0xA1; contains contents of the field
    WrongAddressAndDataType(u8),
    /// First property address must be 0; contains contents of the field
    WrongFirstPropertyAddress(u16),
    /// Address increment must be 1; contains contents of the field
    WrongAddressIncrement(u16),
    /// Property value count disagrees with the payload; contains result of parsing
    WrongPropertyValueCount(usize),
    /// Slot 0 was not the DMX null start code; contains contents of the slot
    WrongStartCode(u8),
    /// The source name was not valid utf-8
    WrongSourceName,
    /// Priority above 200; contains contents of the field
    PriorityOutOfRange(u8),
    /// Universe outside 1..=63999; contains contents of the field
    UniverseOutOfRange(u16),
}

impl core::fmt::Display for DataPacketDeserializationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DataPacketDeserializationError::BufferTooSmall => write!(f, "buffer too small"),
            DataPacketDeserializationError::BufferTooBig => write!(f, "buffer too big"),
            DataPacketDeserializationError::WrongPreamble => {
                write!(f, "preamble or postamble size is incorrect")
            },
            DataPacketDeserializationError::WrongPacketIdentifier => {
                write!(f, "acn packet identifier is incorrect")
            },
            DataPacketDeserializationError::WrongFlags(flags) => {
                write!(f, "flags nibble {:#x} is incorrect", flags)
            },
            DataPacketDeserializationError::WrongLayerLength(length) => {
                write!(f, "layer length {} is incorrect", length)
            },
            DataPacketDeserializationError::WrongRootVector(vector) => {
                write!(f, "root vector {:#010x} is not data", vector)
            },
            DataPacketDeserializationError::WrongFramingVector(vector) => {
                write!(f, "framing vector {:#010x} is not a data packet", vector)
            },
            DataPacketDeserializationError::WrongDmpVector(vector) => {
                write!(f, "dmp vector {:#04x} is not set-property", vector)
            },
            DataPacketDeserializationError::WrongAddressAndDataType(value) => {
                write!(f, "address and data type {:#04x} is incorrect", value)
            },
            DataPacketDeserializationError::WrongFirstPropertyAddress(address) => {
                write!(f, "first property address {} is incorrect", address)
            },
            DataPacketDeserializationError::WrongAddressIncrement(increment) => {
                write!(f, "address increment {} is incorrect", increment)
            },
            DataPacketDeserializationError::WrongPropertyValueCount(count) => {
                write!(f, "property value count {} is incorrect", count)
            },
            DataPacketDeserializationError::WrongStartCode(start_code) => {
                write!(f, "start code {:#04x} is incorrect", start_code)
            },
            DataPacketDeserializationError::WrongSourceName => {
                write!(f, "source name is not valid utf-8")
            },
            DataPacketDeserializationError::PriorityOutOfRange(priority) => {
                write!(f, "priority {} is out of range", priority)
            },
            DataPacketDeserializationError::UniverseOutOfRange(universe) => {
                write!(f, "universe {} is out of range", universe)
            },
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DataPacketDeserializationError {}

fn check_flags_length(
    raw: u16,
    expected_length: usize,
) -> Result<(), DataPacketDeserializationError> {
    let flags = (raw >> 12) as u8;
    if flags != LAYER_FLAGS {
        return Err(DataPacketDeserializationError::WrongFlags(flags));
    }

    let length = (raw & 0x0FFF) as usize;
    if length != expected_length {
        return Err(DataPacketDeserializationError::WrongLayerLength(length));
    }

    Ok(())
}

fn encode_flags_length(length: usize) -> u16 {
    ((LAYER_FLAGS as u16) << 12) | length as u16
}

/// Deserialize an E1.31 data packet.
/// Buffer must be between 126 and 638 bytes.
pub fn deserialize_data_packet(
    buffer: &[u8],
) -> Result<DataPacket, DataPacketDeserializationError> {
    let buffer_size = buffer.len();

    if buffer_size < DATA_PACKET_MIN_SIZE {
        return Err(DataPacketDeserializationError::BufferTooSmall);
    }

    if buffer_size > DATA_PACKET_MAX_SIZE {
        return Err(DataPacketDeserializationError::BufferTooBig);
    }

    let packet_view = data_packet_layout::View::new(buffer);

    if packet_view.preamble_size().read() != PREAMBLE_SIZE
        || packet_view.postamble_size().read() != POSTAMBLE_SIZE
    {
        return Err(DataPacketDeserializationError::WrongPreamble);
    }

    if packet_view.acn_packet_identifier() != &ACN_PACKET_IDENTIFIER {
        return Err(DataPacketDeserializationError::WrongPacketIdentifier);
    }

    check_flags_length(
        packet_view.root_flags_length().read(),
        buffer_size - ROOT_LAYER_FLAGS_OFFSET,
    )?;

    let root_vector = packet_view.root_vector().read();
    if root_vector != VECTOR_ROOT_DATA {
        return Err(DataPacketDeserializationError::WrongRootVector(root_vector));
    }

    check_flags_length(
        packet_view.framing_flags_length().read(),
        buffer_size - FRAMING_LAYER_OFFSET,
    )?;

    let framing_vector = packet_view.framing_vector().read();
    if framing_vector != VECTOR_DATA_PACKET {
        return Err(DataPacketDeserializationError::WrongFramingVector(
            framing_vector,
        ));
    }

    check_flags_length(
        packet_view.dmp_flags_length().read(),
        buffer_size - DMP_LAYER_OFFSET,
    )?;

    let dmp_vector = packet_view.dmp_vector().read();
    if dmp_vector != VECTOR_DMP_SET_PROPERTY {
        return Err(DataPacketDeserializationError::WrongDmpVector(dmp_vector));
    }

    let address_and_data_type = packet_view.address_and_data_type().read();
    if address_and_data_type != DMP_ADDRESS_AND_DATA_TYPE {
        return Err(DataPacketDeserializationError::WrongAddressAndDataType(
            address_and_data_type,
        ));
    }

    let first_property_address = packet_view.first_property_address().read();
    if first_property_address != 0 {
        return Err(DataPacketDeserializationError::WrongFirstPropertyAddress(
            first_property_address,
        ));
    }

    let address_increment = packet_view.address_increment().read();
    if address_increment != 1 {
        return Err(DataPacketDeserializationError::WrongAddressIncrement(
            address_increment,
        ));
    }

    let property_values = packet_view.property_values();
    let property_value_count = packet_view.property_value_count().read() as usize;
    if property_value_count != property_values.len() {
        return Err(DataPacketDeserializationError::WrongPropertyValueCount(
            property_value_count,
        ));
    }

    let start_code = property_values[0];
    if start_code != DMX_NULL_START {
        return Err(DataPacketDeserializationError::WrongStartCode(start_code));
    }

    // The name is utf-8 padded with zero bytes, everything past the first one is ignored.
    let name_bytes = packet_view.source_name();
    let name_end = name_bytes
        .iter()
        .position(|&byte| byte == 0)
        .unwrap_or(SOURCE_NAME_LENGTH);
    let source_name = SourceName::from_utf8(
        heapless::Vec::from_slice(&name_bytes[..name_end])
            .or(Err(DataPacketDeserializationError::WrongSourceName))?,
    )
    .or(Err(DataPacketDeserializationError::WrongSourceName))?;

    let priority_field = packet_view.priority().read();
    let priority = Priority::new(priority_field)
        .map_err(|_| DataPacketDeserializationError::PriorityOutOfRange(priority_field))?;

    let universe_field = packet_view.universe().read();
    let universe = Universe::new(universe_field)
        .map_err(|_| DataPacketDeserializationError::UniverseOutOfRange(universe_field))?;

    let options = OptionsField::from_bytes([packet_view.options().read()]);

    // Redundant after the property value count check
    let dmx_data = DmxData::from_slice(&property_values[1..])
        .map_err(|_| DataPacketDeserializationError::BufferTooBig)?;

    Ok(DataPacket {
        cid: SourceCid::from_bytes(packet_view.cid()),
        source_name,
        priority,
        sequence_number: packet_view.sequence_number().read(),
        stream_terminated: options.stream_terminated(),
        preview_data: options.preview_data(),
        universe,
        dmx_data,
    })
}

/// Serializes an E1.31 data packet to a binary Vec.
pub fn serialize_data_packet(packet: &DataPacket) -> BinaryDataPacket {
    let property_value_count = packet.dmx_data.len() + 1;
    let total_packet_size = PROPERTY_VALUES_OFFSET + property_value_count;

    let mut dst = [0u8; DATA_PACKET_MAX_SIZE];
    let mut packet_view = data_packet_layout::View::new(&mut dst[..total_packet_size]);

    packet_view.preamble_size_mut().write(PREAMBLE_SIZE);
    packet_view.postamble_size_mut().write(POSTAMBLE_SIZE);
    packet_view
        .acn_packet_identifier_mut()
        .copy_from_slice(&ACN_PACKET_IDENTIFIER);
    packet_view
        .root_flags_length_mut()
        .write(encode_flags_length(
            total_packet_size - ROOT_LAYER_FLAGS_OFFSET,
        ));
    packet_view.root_vector_mut().write(VECTOR_ROOT_DATA);
    packet_view.cid_mut().copy_from_slice(packet.cid.as_bytes());

    packet_view
        .framing_flags_length_mut()
        .write(encode_flags_length(total_packet_size - FRAMING_LAYER_OFFSET));
    packet_view.framing_vector_mut().write(VECTOR_DATA_PACKET);
    // remaining name bytes stay zero
    packet_view.source_name_mut()[..packet.source_name.len()]
        .copy_from_slice(packet.source_name.as_bytes());
    packet_view.priority_mut().write(packet.priority.as_u8());
    packet_view.synchronization_address_mut().write(0);
    packet_view
        .sequence_number_mut()
        .write(packet.sequence_number);

    let options = OptionsField::new()
        .with_stream_terminated(packet.stream_terminated)
        .with_preview_data(packet.preview_data);
    packet_view.options_mut().write(options.into_bytes()[0]);
    packet_view.universe_mut().write(packet.universe.as_u16());

    packet_view.dmp_flags_length_mut().write(encode_flags_length(
        total_packet_size - DMP_LAYER_OFFSET,
    ));
    packet_view.dmp_vector_mut().write(VECTOR_DMP_SET_PROPERTY);
    packet_view
        .address_and_data_type_mut()
        .write(DMP_ADDRESS_AND_DATA_TYPE);
    packet_view.first_property_address_mut().write(0);
    packet_view.address_increment_mut().write(1);
    packet_view
        .property_value_count_mut()
        .write(property_value_count as u16);

    let property_values = packet_view.property_values_mut();
    property_values[0] = DMX_NULL_START;
    property_values[1..].copy_from_slice(&packet.dmx_data);

    heapless::Vec::from_slice(&dst[..total_packet_size]).unwrap()
}
