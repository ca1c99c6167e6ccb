//! Byte-order detection and correction.
//!
//! Every multi-byte value decoded from a file goes through a
//! [`ByteOrderCorrector`]: the raw bytes are reversed in place when the
//! file's byte order differs from the host's, and are then interpreted in
//! host order.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the machine running this code.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Endianness::Little
        } else {
            Endianness::Big
        }
    }
}

impl Default for Endianness {
    /// GDF and EDF both store little-endian data.
    fn default() -> Self {
        Endianness::Little
    }
}

/// Reverses the bytes of a single multi-byte value in place.
pub fn reverse_bytes(data: &mut [u8]) {
    data.reverse();
}

/// Reverses every `width`-byte element of `data` in place.
pub fn reverse_each(data: &mut [u8], width: usize) {
    if width < 2 {
        return;
    }
    for chunk in data.chunks_exact_mut(width) {
        reverse_bytes(chunk);
    }
}

/// Converts raw file bytes into host-order values.
///
/// The host order is normally [`Endianness::native`]; it can be set
/// explicitly to check that decoding gives the same values on a machine of
/// the opposite endianness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteOrderCorrector {
    file: Endianness,
    host: Endianness,
}

impl ByteOrderCorrector {
    pub fn new(file: Endianness) -> Self {
        Self::with_host(file, Endianness::native())
    }

    pub fn with_host(file: Endianness, host: Endianness) -> Self {
        ByteOrderCorrector { file, host }
    }

    pub fn file_order(&self) -> Endianness {
        self.file
    }

    pub fn host_order(&self) -> Endianness {
        self.host
    }

    pub fn needs_swap(&self) -> bool {
        self.file != self.host
    }

    /// Puts one field's bytes into host order.
    pub fn correct(&self, field: &mut [u8]) {
        if self.needs_swap() {
            reverse_bytes(field);
        }
    }

    /// Puts a packed array of `width`-byte values into host order.
    pub fn correct_each(&self, data: &mut [u8], width: usize) {
        if self.needs_swap() {
            reverse_each(data, width);
        }
    }

    // The accessors below read bytes that are already in host order.

    pub fn u16(&self, b: &[u8]) -> u16 {
        match self.host {
            Endianness::Little => LittleEndian::read_u16(b),
            Endianness::Big => BigEndian::read_u16(b),
        }
    }

    pub fn i16(&self, b: &[u8]) -> i16 {
        match self.host {
            Endianness::Little => LittleEndian::read_i16(b),
            Endianness::Big => BigEndian::read_i16(b),
        }
    }

    /// Signed 24-bit value, as stored by BDF.
    pub fn i24(&self, b: &[u8]) -> i32 {
        match self.host {
            Endianness::Little => LittleEndian::read_i24(b),
            Endianness::Big => BigEndian::read_i24(b),
        }
    }

    pub fn u32(&self, b: &[u8]) -> u32 {
        match self.host {
            Endianness::Little => LittleEndian::read_u32(b),
            Endianness::Big => BigEndian::read_u32(b),
        }
    }

    pub fn i32(&self, b: &[u8]) -> i32 {
        match self.host {
            Endianness::Little => LittleEndian::read_i32(b),
            Endianness::Big => BigEndian::read_i32(b),
        }
    }

    pub fn u64(&self, b: &[u8]) -> u64 {
        match self.host {
            Endianness::Little => LittleEndian::read_u64(b),
            Endianness::Big => BigEndian::read_u64(b),
        }
    }

    pub fn i64(&self, b: &[u8]) -> i64 {
        match self.host {
            Endianness::Little => LittleEndian::read_i64(b),
            Endianness::Big => BigEndian::read_i64(b),
        }
    }

    pub fn f32(&self, b: &[u8]) -> f32 {
        match self.host {
            Endianness::Little => LittleEndian::read_f32(b),
            Endianness::Big => BigEndian::read_f32(b),
        }
    }

    pub fn f64(&self, b: &[u8]) -> f64 {
        match self.host {
            Endianness::Little => LittleEndian::read_f64(b),
            Endianness::Big => BigEndian::read_f64(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_matches_platform() {
        let one = 1u32.to_ne_bytes();
        let expected = if one[0] == 1 { Endianness::Little } else { Endianness::Big };
        assert_eq!(Endianness::native(), expected);
    }

    #[test]
    fn test_reverse_each() {
        let mut data = [1u8, 2, 3, 4, 5, 6];
        reverse_each(&mut data, 2);
        assert_eq!(data, [2, 1, 4, 3, 6, 5]);

        let mut data = [1u8, 2, 3];
        reverse_each(&mut data, 1);
        assert_eq!(data, [1, 2, 3]);
    }

    #[test]
    fn test_same_value_on_both_hosts() {
        // Little-endian file bytes decoded on a little and on a big host.
        for host in [Endianness::Little, Endianness::Big] {
            let order = ByteOrderCorrector::with_host(Endianness::Little, host);

            let mut b = 0xBEEFu16.to_le_bytes();
            order.correct(&mut b);
            assert_eq!(order.u16(&b), 0xBEEF);

            let mut b = [0x00u8, 0x00, 0x80];
            order.correct(&mut b);
            assert_eq!(order.i24(&b), -8_388_608);

            let mut b = (-123_456i32).to_le_bytes();
            order.correct(&mut b);
            assert_eq!(order.i32(&b), -123_456);

            let mut b = 0x0123_4567_89AB_CDEFu64.to_le_bytes();
            order.correct(&mut b);
            assert_eq!(order.u64(&b), 0x0123_4567_89AB_CDEF);

            let mut b = 3.25f32.to_le_bytes();
            order.correct(&mut b);
            assert_eq!(order.f32(&b), 3.25);

            let mut b = (-1.0e-7f64).to_le_bytes();
            order.correct(&mut b);
            assert_eq!(order.f64(&b), -1.0e-7);
        }
    }

    #[test]
    fn test_big_endian_file() {
        for host in [Endianness::Little, Endianness::Big] {
            let order = ByteOrderCorrector::with_host(Endianness::Big, host);
            assert_eq!(order.needs_swap(), host == Endianness::Little);

            let mut packed = Vec::new();
            for v in [-2i16, 300, i16::MIN] {
                packed.extend_from_slice(&v.to_be_bytes());
            }
            order.correct_each(&mut packed, 2);
            let decoded: Vec<i16> = packed.chunks(2).map(|c| order.i16(c)).collect();
            assert_eq!(decoded, vec![-2, 300, i16::MIN]);
        }
    }
}
