//! Decoding of the GDF v2 fixed and variable headers.

use std::io::{Read, Seek, SeekFrom};

use crate::endian::{ByteOrderCorrector, Endianness};
use crate::error::{Result, SigError};
use crate::types::{decode_text, FixedHeader, VariableHeader};

pub const FIXED_HEADER_SIZE: u64 = 256;
pub const CHANNEL_HEADER_SIZE: u64 = 256;

/// Reads header fields in file order, correcting the byte order of every
/// multi-byte value.
pub(crate) struct FieldReader<'a, R> {
    inner: &'a mut R,
    order: ByteOrderCorrector,
}

impl<'a, R: Read + Seek> FieldReader<'a, R> {
    pub fn new(inner: &'a mut R, order: ByteOrderCorrector) -> Self {
        FieldReader { inner, order }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads `N` bytes of a numeric field and puts them in host order.
    fn field<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = self.array::<N>()?;
        self.order.correct(&mut buf);
        Ok(buf)
    }

    pub fn bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn text(&mut self, n: usize) -> Result<String> {
        Ok(decode_text(&self.bytes(n)?))
    }

    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Current(n as i64))?;
        Ok(())
    }

    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    #[cfg(test)]
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        let b = self.field::<2>()?;
        Ok(self.order.u16(&b))
    }

    pub fn u32(&mut self) -> Result<u32> {
        let b = self.field::<4>()?;
        Ok(self.order.u32(&b))
    }

    /// 24-bit unsigned integer, used by the event table.
    pub fn u24(&mut self) -> Result<u32> {
        let mut b = self.field::<3>()?;
        // Correction leaves host order; widen to little-endian for decoding.
        if self.order.host_order() == Endianness::Big {
            b.reverse();
        }
        Ok(u32::from(b[0]) | u32::from(b[1]) << 8 | u32::from(b[2]) << 16)
    }

    pub fn u64(&mut self) -> Result<u64> {
        let b = self.field::<8>()?;
        Ok(self.order.u64(&b))
    }

    pub fn i64(&mut self) -> Result<i64> {
        let b = self.field::<8>()?;
        Ok(self.order.i64(&b))
    }

    pub fn f32(&mut self) -> Result<f32> {
        let b = self.field::<4>()?;
        Ok(self.order.f32(&b))
    }

    pub fn f64(&mut self) -> Result<f64> {
        let b = self.field::<8>()?;
        Ok(self.order.f64(&b))
    }

    fn u16_vec(&mut self, n: usize) -> Result<Vec<u16>> {
        (0..n).map(|_| self.u16()).collect()
    }

    fn u32_vec(&mut self, n: usize) -> Result<Vec<u32>> {
        (0..n).map(|_| self.u32()).collect()
    }

    fn f32_vec(&mut self, n: usize) -> Result<Vec<f32>> {
        (0..n).map(|_| self.f32()).collect()
    }

    fn f64_vec(&mut self, n: usize) -> Result<Vec<f64>> {
        (0..n).map(|_| self.f64()).collect()
    }

    fn text_vec(&mut self, n: usize, width: usize) -> Result<Vec<String>> {
        (0..n).map(|_| self.text(width)).collect()
    }
}

/// Parses `"GDF 2.51"` into `(major, minor)`.
fn parse_version(version_id: &[u8]) -> Option<(u32, u32)> {
    let text = String::from_utf8_lossy(version_id.get(4..)?);
    let text = text.trim_start();
    let (major, rest) = text.split_once('.')?;
    let minor: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    Some((major.trim().parse().ok()?, minor.parse().ok()?))
}

/// Reads the 256-byte fixed header. Returns it with the version encoded as
/// `minor + 100 * major`.
pub(crate) fn read_fixed_header<R: Read + Seek>(
    reader: &mut FieldReader<'_, R>,
) -> Result<(FixedHeader, u32)> {
    let version_id = reader.bytes(8)?;
    if &version_id[..3] != b"GDF" {
        return Err(SigError::format(format!(
            "unrecognized file format: bad magic {:?}",
            String::from_utf8_lossy(&version_id[..3])
        )));
    }
    let (major, minor) = parse_version(&version_id).ok_or_else(|| {
        SigError::format(format!(
            "malformed version {:?}",
            String::from_utf8_lossy(&version_id)
        ))
    })?;
    if major != 2 {
        return Err(SigError::format(format!(
            "unsupported GDF version {}.{}",
            major, minor
        )));
    }
    let version = minor + 100 * major;

    let mut h = FixedHeader {
        version_id: decode_text(&version_id),
        ..Default::default()
    };

    h.patient_id = reader.text(66)?;
    reader.skip(10)?;
    h.drugs = reader.u8()?;
    h.weight = reader.u8()?;
    h.height = reader.u8()?;
    h.patient_details = reader.u8()?;
    h.recording_id = reader.text(64)?;
    for v in h.recording_location.iter_mut() {
        *v = reader.u32()?;
    }
    for v in h.start_date.iter_mut() {
        *v = reader.u32()?;
    }
    for v in h.birthday.iter_mut() {
        *v = reader.u32()?;
    }
    h.header_length = reader.u16()?;
    h.icd.copy_from_slice(&reader.bytes(6)?);
    h.equipment_provider_id = reader.u64()?;
    reader.skip(6)?;
    for v in h.headsize.iter_mut() {
        *v = reader.u16()?;
    }
    for v in h.position_re.iter_mut() {
        *v = reader.f32()?;
    }
    for v in h.position_ge.iter_mut() {
        *v = reader.f32()?;
    }

    h.number_of_data_records = reader.i64()?;
    if h.number_of_data_records < 0 {
        return Err(SigError::format(
            "GDF file with unknown number of data records is not supported",
        ));
    }

    h.duration_of_data_record = if version > 220 {
        reader.f64()?
    } else {
        let numerator = reader.u32()?;
        let denominator = reader.u32()?;
        if denominator == 0 {
            return Err(SigError::format("data record duration has a zero denominator"));
        }
        numerator as f64 / denominator as f64
    };

    h.number_of_channels = reader.u16()?;
    reader.skip(2)?;

    Ok((h, version))
}

/// Reads the variable header: every field is stored for all channels before
/// the next field starts.
pub(crate) fn read_variable_header<R: Read + Seek>(
    reader: &mut FieldReader<'_, R>,
    channels: usize,
) -> Result<VariableHeader> {
    let n = channels;
    let mut h = VariableHeader {
        label: reader.text_vec(n, 16)?,
        type_of_sensor: reader.text_vec(n, 80)?,
        ..Default::default()
    };

    // Obsolete textual physical dimension.
    reader.skip(6 * n as u64)?;

    h.physical_dimension_code = reader.u16_vec(n)?;
    h.physical_minimum = reader.f64_vec(n)?;
    h.physical_maximum = reader.f64_vec(n)?;
    h.digital_minimum = reader.f64_vec(n)?;
    h.digital_maximum = reader.f64_vec(n)?;

    // Obsolete textual prefiltering.
    reader.skip(64 * n as u64)?;

    h.time_offset = reader.f32_vec(n)?;
    h.lowpass = reader.f32_vec(n)?;
    h.highpass = reader.f32_vec(n)?;
    h.notch = reader.f32_vec(n)?;
    h.samples_per_record = reader.u32_vec(n)?;
    h.type_of_data = reader.u32_vec(n)?;

    h.sensor_position = Vec::with_capacity(n);
    for _ in 0..n {
        let mut position = [0f32; 3];
        for v in position.iter_mut() {
            *v = reader.f32()?;
        }
        h.sensor_position.push(position);
    }

    h.sensor_info = Vec::with_capacity(n);
    for _ in 0..n {
        let mut info = [0u8; 20];
        info.copy_from_slice(&reader.bytes(20)?);
        h.sensor_info.push(info);
    }

    Ok(h)
}
