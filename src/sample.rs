//! Conversion of raw on-disk samples to floating point output.

use crate::endian::ByteOrderCorrector;
use crate::types::DataType;

/// Element type of caller-supplied output buffers.
pub trait SampleValue: Copy + Default + PartialEq + std::fmt::Debug {
    fn from_f64(value: f64) -> Self;
}

impl SampleValue for f32 {
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl SampleValue for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }
}

impl DataType {
    /// Interprets one sample whose bytes are already in host order.
    ///
    /// `raw` must hold at least [`DataType::size`] bytes.
    pub fn decode(self, raw: &[u8], order: &ByteOrderCorrector) -> f64 {
        match self {
            DataType::Int8 => raw[0] as i8 as f64,
            DataType::UInt8 => raw[0] as f64,
            DataType::Int16 => order.i16(raw) as f64,
            DataType::UInt16 => order.u16(raw) as f64,
            DataType::Int32 => order.i32(raw) as f64,
            DataType::UInt32 => order.u32(raw) as f64,
            DataType::Int64 => order.i64(raw) as f64,
            DataType::UInt64 => order.u64(raw) as f64,
            DataType::Float32 => order.f32(raw) as f64,
            DataType::Float64 => order.f64(raw),
        }
    }

    /// Decodes a packed buffer of file-order samples into `out`.
    ///
    /// The raw buffer is byte-order corrected in place.
    pub fn decode_all(self, raw: &mut [u8], order: &ByteOrderCorrector, out: &mut [f64]) {
        let size = self.size();
        order.correct_each(raw, size);
        for (value, chunk) in out.iter_mut().zip(raw.chunks_exact(size)) {
            *value = self.decode(chunk, order);
        }
    }
}

/// Linear map from digital codes to physical units for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub digital_minimum: f64,
    /// `(digital_max - digital_min) / (physical_max - physical_min)`
    pub scale: f64,
    pub physical_minimum: f64,
}

impl Calibration {
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.digital_minimum) / self.scale + self.physical_minimum
    }

    pub fn apply_all(&self, values: &mut [f64]) {
        for v in values {
            *v = self.apply(*v);
        }
    }

    /// True when the ranges produce finite, non-zero scaling.
    pub fn is_well_formed(&self) -> bool {
        self.scale.is_finite() && self.scale != 0.0
    }
}
