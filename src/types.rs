use std::fmt;

use crate::sample::Calibration;

/// Container formats understood by [`crate::OpenOptions::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Gdf2,
    Edf,
    Bdf,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Gdf2 => write!(f, "GDF2"),
            FileType::Edf => write!(f, "EDF"),
            FileType::Bdf => write!(f, "BDF"),
        }
    }
}

/// On-disk sample encoding of a GDF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl DataType {
    /// Looks up the GDF `typeOfData` code.
    pub fn from_code(code: u32) -> Option<Self> {
        let data_type = match code {
            1 => DataType::Int8,
            2 => DataType::UInt8,
            3 => DataType::Int16,
            4 => DataType::UInt16,
            5 => DataType::Int32,
            6 => DataType::UInt32,
            7 => DataType::Int64,
            8 => DataType::UInt64,
            16 => DataType::Float32,
            17 => DataType::Float64,
            _ => return None,
        };
        Some(data_type)
    }

    pub fn code(self) -> u32 {
        match self {
            DataType::Int8 => 1,
            DataType::UInt8 => 2,
            DataType::Int16 => 3,
            DataType::UInt16 => 4,
            DataType::Int32 => 5,
            DataType::UInt32 => 6,
            DataType::Int64 => 7,
            DataType::UInt64 => 8,
            DataType::Float32 => 16,
            DataType::Float64 => 17,
        }
    }

    /// Size of one sample in bytes.
    pub fn size(self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 8,
        }
    }
}

/// Static attributes of one channel, independent of the container format.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelHeader {
    pub label: String,
    pub physical_minimum: f64,
    pub physical_maximum: f64,
    pub digital_minimum: f64,
    pub digital_maximum: f64,
    pub samples_per_record: u32,
}

impl ChannelHeader {
    /// Digital units per physical unit.
    pub fn calibration_scale(&self) -> f64 {
        (self.digital_maximum - self.digital_minimum)
            / (self.physical_maximum - self.physical_minimum)
    }

    pub fn calibration(&self) -> Calibration {
        Calibration {
            digital_minimum: self.digital_minimum,
            scale: self.calibration_scale(),
            physical_minimum: self.physical_minimum,
        }
    }
}

/// Days from 0000-01-01 to 1970-01-01 in the GDF day numbering.
pub const GDF_UNIX_EPOCH_DAYS: u32 = 719_529;

/// The 256-byte fixed header of a GDF v2 file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedHeader {
    pub version_id: String,
    pub patient_id: String,
    pub drugs: u8,
    pub weight: u8,
    pub height: u8,
    pub patient_details: u8,
    pub recording_id: String,
    pub recording_location: [u32; 4],
    /// Fixed-point day count: `[fraction of day * 2^32, days since year 0]`.
    pub start_date: [u32; 2],
    pub birthday: [u32; 2],
    /// Header length in 256-byte blocks.
    pub header_length: u16,
    pub icd: [u8; 6],
    pub equipment_provider_id: u64,
    pub headsize: [u16; 3],
    pub position_re: [f32; 3],
    pub position_ge: [f32; 3],
    pub number_of_data_records: i64,
    /// Seconds; decoded from either encoding the version allows.
    pub duration_of_data_record: f64,
    pub number_of_channels: u16,
}

impl FixedHeader {
    /// Recording start as seconds since the Unix epoch.
    pub fn start_epoch_seconds(&self) -> i64 {
        let fraction_of_day = self.start_date[0] as f64 * 2f64.powi(-32);
        let days = self.start_date[1] as f64 - GDF_UNIX_EPOCH_DAYS as f64 + fraction_of_day;
        (days * 86_400.0).round() as i64
    }
}

/// The GDF v2 variable header stored field by field, one entry per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableHeader {
    pub label: Vec<String>,
    pub type_of_sensor: Vec<String>,
    pub physical_dimension_code: Vec<u16>,
    pub physical_minimum: Vec<f64>,
    pub physical_maximum: Vec<f64>,
    pub digital_minimum: Vec<f64>,
    pub digital_maximum: Vec<f64>,
    pub time_offset: Vec<f32>,
    pub lowpass: Vec<f32>,
    pub highpass: Vec<f32>,
    pub notch: Vec<f32>,
    pub samples_per_record: Vec<u32>,
    pub type_of_data: Vec<u32>,
    pub sensor_position: Vec<[f32; 3]>,
    pub sensor_info: Vec<[u8; 20]>,
}

impl VariableHeader {
    pub fn channel_count(&self) -> usize {
        self.label.len()
    }

    pub fn channel(&self, i: usize) -> Option<ChannelHeader> {
        if i >= self.channel_count() {
            return None;
        }
        Some(ChannelHeader {
            label: self.label[i].clone(),
            physical_minimum: self.physical_minimum[i],
            physical_maximum: self.physical_maximum[i],
            digital_minimum: self.digital_minimum[i],
            digital_maximum: self.digital_maximum[i],
            samples_per_record: self.samples_per_record[i],
        })
    }
}

/// Decodes a fixed-width text field: stops at the first NUL and drops
/// trailing padding.
pub fn decode_text(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim_end().to_string()
}
