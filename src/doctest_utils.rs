// Internal utilities for documentation and unit tests.
// Builds GDF2, EDF and BDF files in memory so that no binary test data has to
// be committed.

use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::endian::Endianness;
use crate::types::{DataType, GDF_UNIX_EPOCH_DAYS};
use crate::Result;

/// `start_date` of 2009-01-06 21:17:39 UTC (Unix time 1231276659).
pub const DEFAULT_GDF_START_DATE: [u32; 2] = [0xE323_4568, GDF_UNIX_EPOCH_DAYS + 14_250];

/// Deterministic sample value stored at `sample` of `channel` in a GDF
/// fixture. Always representable in `data_type`.
pub fn gdf_sample(data_type: DataType, channel: usize, sample: u64) -> f64 {
    let (modulus, offset) = match data_type {
        DataType::Int8 => (200, 100),
        DataType::UInt8 => (200, 0),
        DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => (60_000, 0),
        _ => (60_000, 30_000),
    };
    let v = ((sample * 37 + channel as u64 * 1009) % modulus) as i64 - offset;
    match data_type {
        DataType::Float32 | DataType::Float64 => v as f64 * 0.25,
        _ => v as f64,
    }
}

/// Deterministic digital value stored at `sample` of `channel` in an EDF
/// (16-bit) or BDF (24-bit) fixture.
pub fn edf_sample(channel: usize, sample: u64, bdf: bool) -> i32 {
    let (modulus, offset) = if bdf { (8_000_000, 4_000_000) } else { (60_000, 30_000) };
    ((sample * 37 + channel as u64 * 1009) % modulus) as i32 - offset
}

/// Appends multi-byte values in a chosen byte order.
struct ByteWriter {
    buf: Vec<u8>,
    order: Endianness,
}

macro_rules! put {
    ($name:ident, $t:ty, $write:ident, $size:expr) => {
        fn $name(&mut self, v: $t) {
            let mut b = [0u8; $size];
            match self.order {
                Endianness::Little => LittleEndian::$write(&mut b, v),
                Endianness::Big => BigEndian::$write(&mut b, v),
            }
            self.buf.extend_from_slice(&b);
        }
    };
}

impl ByteWriter {
    fn new(order: Endianness) -> Self {
        ByteWriter { buf: Vec::new(), order }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Zero-padded (GDF) or space-padded (EDF) text field.
    fn text(&mut self, s: &str, width: usize, pad: u8) {
        let bytes = s.as_bytes();
        let n = bytes.len().min(width);
        self.buf.extend_from_slice(&bytes[..n]);
        self.buf.resize(self.buf.len() + width - n, pad);
    }

    fn zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    fn u24(&mut self, v: u32) {
        let b = [v as u8, (v >> 8) as u8, (v >> 16) as u8];
        match self.order {
            Endianness::Little => self.buf.extend_from_slice(&b),
            Endianness::Big => self.buf.extend(b.iter().rev()),
        }
    }

    put!(u16, u16, write_u16, 2);
    put!(i16, i16, write_i16, 2);
    put!(u32, u32, write_u32, 4);
    put!(i32, i32, write_i32, 4);
    put!(u64, u64, write_u64, 8);
    put!(i64, i64, write_i64, 8);
    put!(f32, f32, write_f32, 4);
    put!(f64, f64, write_f64, 8);

    fn sample(&mut self, data_type: DataType, v: f64) {
        match data_type {
            DataType::Int8 => self.u8(v as i8 as u8),
            DataType::UInt8 => self.u8(v as u8),
            DataType::Int16 => self.i16(v as i16),
            DataType::UInt16 => self.u16(v as u16),
            DataType::Int32 => self.i32(v as i32),
            DataType::UInt32 => self.u32(v as u32),
            DataType::Int64 => self.i64(v as i64),
            DataType::UInt64 => self.u64(v as u64),
            DataType::Float32 => self.f32(v as f32),
            DataType::Float64 => self.f64(v),
        }
    }
}

/// One event as stored on disk: `position` is one-based.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gdf2Event {
    pub position: u32,
    pub event_type: u16,
    pub channel: u16,
    pub duration: u32,
}

/// Synthesizes a GDF v2 file. Every channel shares the data type and the
/// number of samples per record; samples come from [`gdf_sample`].
#[derive(Debug, Clone)]
pub struct Gdf2Builder {
    pub version: String,
    pub patient_id: String,
    pub recording_id: String,
    pub recording_location: [u32; 4],
    pub start_date: [u32; 2],
    pub birthday: [u32; 2],
    pub equipment_provider_id: u64,
    pub headsize: [u16; 3],
    pub position_re: [f32; 3],
    pub position_ge: [f32; 3],
    pub channels: usize,
    pub samples_per_record: u32,
    pub records: i64,
    /// Written in place of `records` without changing the data section.
    pub number_of_records_override: Option<i64>,
    /// Seconds per record.
    pub duration: f64,
    pub data_type: DataType,
    /// Written in place of the code of `data_type`.
    pub type_code_override: Option<u32>,
    pub physical_dimension_code: u16,
    pub physical_minimum: f64,
    pub physical_maximum: f64,
    pub digital_minimum: f64,
    pub digital_maximum: f64,
    pub time_offset: f32,
    pub lowpass: f32,
    pub highpass: f32,
    pub notch: f32,
    pub sensor_position: [f32; 3],
    pub events: Vec<Gdf2Event>,
    pub event_mode: u8,
    /// Event table rate; the signal rate when `None`.
    pub event_rate: Option<f32>,
    order: Endianness,
}

impl Gdf2Builder {
    /// Int16 file of one-second records with labels `CH0`, `CH1`, ...
    pub fn new(channels: usize, samples_per_record: u32, records: i64) -> Self {
        Gdf2Builder {
            version: "GDF 2.51".to_string(),
            patient_id: "X X 06-JAN-1970 Patient".to_string(),
            recording_id: "sigfile fixture".to_string(),
            recording_location: [0; 4],
            start_date: DEFAULT_GDF_START_DATE,
            birthday: [0; 2],
            equipment_provider_id: 0,
            headsize: [0; 3],
            position_re: [0.0; 3],
            position_ge: [0.0; 3],
            channels,
            samples_per_record,
            records,
            number_of_records_override: None,
            duration: 1.0,
            data_type: DataType::Int16,
            type_code_override: None,
            physical_dimension_code: 4275,
            physical_minimum: -512.0,
            physical_maximum: 512.0,
            digital_minimum: -32768.0,
            digital_maximum: 32767.0,
            time_offset: 0.0,
            lowpass: 0.0,
            highpass: 0.0,
            notch: 0.0,
            sensor_position: [0.0; 3],
            events: Vec::new(),
            event_mode: 1,
            event_rate: None,
            order: Endianness::Little,
        }
    }

    /// Byte order of every multi-byte value in the file.
    pub fn byte_order(mut self, order: Endianness) -> Self {
        self.order = order;
        self
    }

    /// `"GDF 2.51"` as 251.
    fn version_number(&self) -> u32 {
        let digits: String = self.version.chars().filter(char::is_ascii_digit).collect();
        digits.parse().unwrap_or(0)
    }

    pub fn sampling_frequency(&self) -> f64 {
        f64::from(self.samples_per_record) / self.duration
    }

    pub fn samples_recorded(&self) -> u64 {
        u64::from(self.samples_per_record) * self.records.max(0) as u64
    }

    pub fn start_of_data(&self) -> u64 {
        (self.channels as u64 + 1) * 256
    }

    pub fn start_of_event_table(&self) -> u64 {
        self.start_of_data() + self.samples_recorded() * self.channels as u64 * self.data_type.size() as u64
    }

    /// Value of `sample` of `channel` as stored in the file.
    pub fn sample(&self, channel: usize, sample: u64) -> f64 {
        gdf_sample(self.data_type, channel, sample)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new(self.order);
        let n = self.channels;

        // Fixed header.
        w.text(&self.version, 8, b' ');
        w.text(&self.patient_id, 66, 0);
        w.zeros(10);
        w.zeros(4);
        w.text(&self.recording_id, 64, 0);
        for &v in &self.recording_location {
            w.u32(v);
        }
        for &v in &self.start_date {
            w.u32(v);
        }
        for &v in &self.birthday {
            w.u32(v);
        }
        w.u16(n as u16 + 1);
        w.zeros(6);
        w.u64(self.equipment_provider_id);
        w.zeros(6);
        for &v in &self.headsize {
            w.u16(v);
        }
        for &v in self.position_re.iter().chain(&self.position_ge) {
            w.f32(v);
        }
        w.i64(self.number_of_records_override.unwrap_or(self.records));
        if self.version_number() > 220 {
            w.f64(self.duration);
        } else {
            w.u32((self.duration * 1e6).round() as u32);
            w.u32(1_000_000);
        }
        w.u16(n as u16);
        w.zeros(2);
        debug_assert_eq!(w.buf.len(), 256);

        // Variable header, one field for all channels at a time.
        for i in 0..n {
            w.text(&format!("CH{}", i), 16, 0);
        }
        for _ in 0..n {
            w.text("Ag/AgCl", 80, 0);
        }
        w.zeros(6 * n);
        for _ in 0..n {
            w.u16(self.physical_dimension_code);
        }
        for v in [
            self.physical_minimum,
            self.physical_maximum,
            self.digital_minimum,
            self.digital_maximum,
        ] {
            for _ in 0..n {
                w.f64(v);
            }
        }
        w.zeros(64 * n);
        for v in [self.time_offset, self.lowpass, self.highpass, self.notch] {
            for _ in 0..n {
                w.f32(v);
            }
        }
        for _ in 0..n {
            w.u32(self.samples_per_record);
        }
        let code = self.type_code_override.unwrap_or_else(|| self.data_type.code());
        for _ in 0..n {
            w.u32(code);
        }
        for _ in 0..n {
            for &v in &self.sensor_position {
                w.f32(v);
            }
        }
        w.zeros(20 * n);
        debug_assert_eq!(w.buf.len() as u64, self.start_of_data());

        // Data records, channel after channel.
        let spr = u64::from(self.samples_per_record);
        for record in 0..self.records.max(0) as u64 {
            for channel in 0..n {
                for s in 0..spr {
                    w.sample(self.data_type, self.sample(channel, record * spr + s));
                }
            }
        }

        if !self.events.is_empty() {
            w.u8(self.event_mode);
            w.u24(self.events.len() as u32);
            w.f32(self.event_rate.unwrap_or(self.sampling_frequency() as f32));
            for e in &self.events {
                w.u32(e.position);
            }
            for e in &self.events {
                w.u16(e.event_type);
            }
            if self.event_mode == 3 {
                for e in &self.events {
                    w.u16(e.channel);
                }
                for e in &self.events {
                    w.u32(e.duration);
                }
            }
        }

        w.buf
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }
}

/// Synthesizes an EDF, EDF+C or BDF file with samples from [`edf_sample`].
#[derive(Debug, Clone)]
pub struct EdfBuilder {
    pub bdf: bool,
    /// Start of the reserved field, e.g. `EDF+C`, `24BIT` or empty.
    pub reserved: String,
    pub patient: String,
    pub recording: String,
    pub start_date: String,
    pub start_time: String,
    pub duration: String,
    pub records: i64,
    /// One entry per data signal.
    pub samples_per_record: Vec<usize>,
    pub physical_minimum: f64,
    pub physical_maximum: f64,
    pub digital_minimum: i32,
    pub digital_maximum: i32,
    /// Inserts an annotation signal before this data signal.
    pub annotations_at: Option<usize>,
    pub annotation_samples: usize,
}

impl EdfBuilder {
    /// EDF+C file with one-second records and labels `CH0`, `CH1`, ...
    pub fn new(channels: usize, samples_per_record: usize, records: i64) -> Self {
        EdfBuilder {
            bdf: false,
            reserved: "EDF+C".to_string(),
            patient: "X X X X".to_string(),
            recording: "Startdate X X X X".to_string(),
            start_date: "06.01.09".to_string(),
            start_time: "21.17.39".to_string(),
            duration: "1".to_string(),
            records,
            samples_per_record: vec![samples_per_record; channels],
            physical_minimum: -500.0,
            physical_maximum: 500.0,
            digital_minimum: -32768,
            digital_maximum: 32767,
            annotations_at: None,
            annotation_samples: 30,
        }
    }

    /// 24-bit BDF file.
    pub fn bdf(channels: usize, samples_per_record: usize, records: i64) -> Self {
        EdfBuilder {
            bdf: true,
            reserved: "24BIT".to_string(),
            digital_minimum: -8_388_608,
            digital_maximum: 8_388_607,
            ..Self::new(channels, samples_per_record, records)
        }
    }

    fn sample_size(&self) -> usize {
        if self.bdf {
            3
        } else {
            2
        }
    }

    fn signal_count(&self) -> usize {
        self.samples_per_record.len() + usize::from(self.annotations_at.is_some())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new(Endianness::Little);
        let ns = self.signal_count();

        if self.bdf {
            w.u8(0xFF);
            w.text("BIOSEMI", 7, b' ');
        } else {
            w.text("0", 8, b' ');
        }
        w.text(&self.patient, 80, b' ');
        w.text(&self.recording, 80, b' ');
        w.text(&self.start_date, 8, b' ');
        w.text(&self.start_time, 8, b' ');
        w.text(&((ns + 1) * 256).to_string(), 8, b' ');
        w.text(&self.reserved, 44, b' ');
        w.text(&self.records.to_string(), 8, b' ');
        w.text(&self.duration, 8, b' ');
        w.text(&ns.to_string(), 4, b' ');

        // Signal order as stored, `None` for the annotation signal.
        let mut layout: Vec<Option<usize>> = (0..self.samples_per_record.len()).map(Some).collect();
        if let Some(at) = self.annotations_at {
            layout.insert(at.min(layout.len()), None);
        }
        let annotation_label = if self.bdf { "BDF Annotations" } else { "EDF Annotations" };

        for s in &layout {
            match s {
                Some(i) => w.text(&format!("CH{}", i), 16, b' '),
                None => w.text(annotation_label, 16, b' '),
            }
        }
        for s in &layout {
            w.text(if s.is_some() { "AgAgCl electrode" } else { "" }, 80, b' ');
        }
        for s in &layout {
            w.text(if s.is_some() { "uV" } else { "" }, 8, b' ');
        }
        let annotation_range = (-1.0, 1.0, -32768, 32767);
        for s in &layout {
            let v = if s.is_some() { self.physical_minimum } else { annotation_range.0 };
            w.text(&v.to_string(), 8, b' ');
        }
        for s in &layout {
            let v = if s.is_some() { self.physical_maximum } else { annotation_range.1 };
            w.text(&v.to_string(), 8, b' ');
        }
        for s in &layout {
            let v = if s.is_some() { self.digital_minimum } else { annotation_range.2 };
            w.text(&v.to_string(), 8, b' ');
        }
        for s in &layout {
            let v = if s.is_some() { self.digital_maximum } else { annotation_range.3 };
            w.text(&v.to_string(), 8, b' ');
        }
        for s in &layout {
            w.text(if s.is_some() { "HP:0.1Hz LP:70Hz" } else { "" }, 80, b' ');
        }
        for s in &layout {
            let spr = s.map_or(self.annotation_samples, |i| self.samples_per_record[i]);
            w.text(&spr.to_string(), 8, b' ');
        }
        w.text("", 32 * ns, b' ');

        for record in 0..self.records.max(0) as u64 {
            for s in &layout {
                match s {
                    Some(i) => {
                        let spr = self.samples_per_record[*i] as u64;
                        for k in 0..spr {
                            let v = edf_sample(*i, record * spr + k, self.bdf);
                            if self.bdf {
                                w.buf.extend_from_slice(&v.to_le_bytes()[..3]);
                            } else {
                                w.i16(v as i16);
                            }
                        }
                    }
                    None => {
                        let width = self.annotation_samples * self.sample_size();
                        let tal = format!("+{}\x14\x14\0", record);
                        w.text(&tal, width, 0);
                    }
                }
            }
        }

        w.buf
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }
}

/// Creates a small GDF v2 file for documentation examples: 4 channels at
/// 256 Hz, 10 seconds, int16.
pub fn create_simple_gdf2_file<P: AsRef<Path>>(path: P) -> Result<()> {
    Gdf2Builder::new(4, 256, 10).write(path)
}
