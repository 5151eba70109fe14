pub const DMX_NULL_START: u8 = 0x00;
pub const DMX_UNIVERSE_SIZE: usize = 512;

pub const E131_DEFAULT_PORT: u16 = 5568;

/// "ASC-E1.17" followed by three zero bytes.
pub const ACN_PACKET_IDENTIFIER: [u8; 12] = *b"ASC-E1.17\x00\x00\x00";

pub const PREAMBLE_SIZE: u16 = 0x0010;
pub const POSTAMBLE_SIZE: u16 = 0x0000;

pub const VECTOR_ROOT_DATA: u32 = 0x0000_0004;
pub const VECTOR_DATA_PACKET: u32 = 0x0000_0002;
pub const VECTOR_DMP_SET_PROPERTY: u8 = 0x02;

pub const DMP_ADDRESS_AND_DATA_TYPE: u8 = 0xA1;

/// Upper nibble of every flags-and-length field.
pub const LAYER_FLAGS: u8 = 0x07;
/// The root layer length field counts from its own offset to the packet end.
pub const ROOT_LAYER_FLAGS_OFFSET: usize = 16;
pub const FRAMING_LAYER_OFFSET: usize = 38;
pub const DMP_LAYER_OFFSET: usize = 115;
pub const PROPERTY_VALUES_OFFSET: usize = 125;

/// Full header + start code, no channel data.
pub const DATA_PACKET_MIN_SIZE: usize = PROPERTY_VALUES_OFFSET + 1;
pub const DATA_PACKET_MAX_SIZE: usize = PROPERTY_VALUES_OFFSET + 1 + DMX_UNIVERSE_SIZE;

pub const CID_LENGTH: usize = 16;
pub const SOURCE_NAME_LENGTH: usize = 64;

pub const UNIVERSE_LOWEST: u16 = 1;
pub const UNIVERSE_HIGHEST: u16 = 63999;

pub const PRIORITY_HIGHEST: u8 = 200;
pub const DEFAULT_PRIORITY: u8 = 100;

/// Largest accepted forward distance between consecutive sequence numbers.
pub const SEQUENCE_ACCEPT_WINDOW: i8 = 96;

pub const SOURCE_LOSS_TIMEOUT_MILLIS: u32 = 2500;
