binary_layout::binary_layout!(data_packet_layout, BigEndian, {
    // root layer
    preamble_size: u16,
    postamble_size: u16,
    acn_packet_identifier: [u8; 12],
    root_flags_length: u16,
    root_vector: u32,
    cid: [u8; 16],
    // framing layer
    framing_flags_length: u16,
    framing_vector: u32,
    source_name: [u8; 64],
    priority: u8,
    synchronization_address: u16,
    sequence_number: u8,
    options: u8,
    universe: u16,
    // dmp layer
    dmp_flags_length: u16,
    dmp_vector: u8,
    address_and_data_type: u8,
    first_property_address: u16,
    address_increment: u16,
    property_value_count: u16,
    property_values: [u8],
});
