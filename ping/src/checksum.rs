//! Internet Checksum Implementation (RFC 1071)
//!
//! Also hosts the two-byte byte-order helpers used for header fields.

/// Calculate Internet checksum for an ICMP packet
///
/// Sums big-endian 16-bit words, pads an odd trailing byte with zero,
/// folds every carry back into the low half and returns the complement.
pub fn calculate_checksum(data: &[u8]) -> u16 {
    finalize_checksum(partial_checksum(data, 0))
}

/// Verify checksum of a packet
///
/// Returns true if checksum is valid (result is zero when computed over
/// data including the checksum field).
pub fn verify_checksum(data: &[u8]) -> bool {
    calculate_checksum(data) == 0
}

/// Compute the checksum of `packet` in place.
///
/// The two bytes at `offset` are treated as zero during the sum and then
/// receive the result in network byte order. Must be called again whenever
/// any other byte of the packet changes.
///
/// # Panics
/// Panics if `offset + 2` exceeds the packet length.
pub fn fill_checksum(packet: &mut [u8], offset: usize) {
    packet[offset..offset + 2].fill(0);
    let checksum = calculate_checksum(packet);
    packet[offset..offset + 2].copy_from_slice(&checksum.to_be_bytes());
}

/// Calculate partial checksum (for incremental computation)
pub fn partial_checksum(data: &[u8], initial: u32) -> u32 {
    let mut sum = initial;
    let mut words = data.chunks_exact(2);

    for word in &mut words {
        sum = sum.wrapping_add(u16::from_be_bytes([word[0], word[1]]) as u32);
    }

    if let [last] = words.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }

    sum
}

/// Finalize a partial checksum
///
/// A single fold can itself carry, so folding repeats until the high half
/// is empty.
pub fn finalize_checksum(sum: u32) -> u16 {
    let mut s = sum;
    while s >> 16 != 0 {
        s = (s & 0xFFFF) + (s >> 16);
    }
    !(s as u16)
}

/// Convert a host-order value to network (big-endian) order.
#[inline]
pub const fn to_network_order16(value: u16) -> u16 {
    value.to_be()
}

/// Convert a network-order value to host order.
#[inline]
pub const fn from_network_order16(value: u16) -> u16 {
    u16::from_be(value)
}
