//! GDF v2 reader implemented directly on the file bytes.

mod events;
mod header;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::datafile::{fill_default_montage, DataFile};
use crate::endian::{ByteOrderCorrector, Endianness};
use crate::error::{Result, SigError};
use crate::model::{DataModel, Event, EventType};
use crate::record::{check_request, read_records, RecordBuffers, RecordLayout};
use crate::sample::{Calibration, SampleValue};
use crate::types::{ChannelHeader, DataType, FixedHeader, VariableHeader};

pub use events::{GdfEvent, GdfEventTable};
pub use header::{CHANNEL_HEADER_SIZE, FIXED_HEADER_SIZE};

use events::read_event_table;
use header::{read_fixed_header, read_variable_header, FieldReader};

/// A GDF v2.x recording opened for reading.
///
/// All channels are assumed to share the sampling rate and data type of
/// channel 0; files mixing rates or types are read with channel 0's values.
///
/// # Examples
///
/// ```rust
/// use sigfile::{DataFile, Gdf2File};
///
/// # sigfile::doctest_utils::create_simple_gdf2_file("recording.gdf")?;
/// let mut file = Gdf2File::open("recording.gdf", true)?;
/// println!("{} channels at {} Hz", file.channel_count(), file.sampling_frequency());
///
/// // One second of every channel, channel after channel.
/// let n = file.sampling_frequency() as usize;
/// let mut data = vec![0.0f32; file.channel_count() * n];
/// file.read_signal(&mut data, 0, n as i64 - 1)?;
/// # std::fs::remove_file("recording.gdf").ok();
/// # Ok::<(), sigfile::SigError>(())
/// ```
pub struct Gdf2File {
    path: PathBuf,
    file: BufReader<File>,
    file_len: u64,
    order: ByteOrderCorrector,
    fixed: FixedHeader,
    variable: VariableHeader,
    version: u32,
    data_type: DataType,
    sampling_frequency: f64,
    samples_recorded: u64,
    start_of_event_table: u64,
    calibrations: Option<Vec<Calibration>>,
    layout: RecordLayout,
    buffers: RecordBuffers,
}

impl Gdf2File {
    /// Opens a little-endian GDF v2 file.
    ///
    /// With `calibrated` set, samples are returned in physical units;
    /// otherwise the raw digital values are returned.
    ///
    /// # Errors
    ///
    /// * [`SigError::FileNotFound`] if the file doesn't exist
    /// * [`SigError::Format`] for a bad magic, a major version other than 2,
    ///   an unsupported data type or an unknown number of records
    /// * [`SigError::Io`] if the headers are truncated
    pub fn open<P: AsRef<Path>>(path: P, calibrated: bool) -> Result<Self> {
        Self::open_with_byte_order(path, calibrated, Endianness::Little)
    }

    /// Opens a GDF v2 file whose multi-byte values are stored in `byte_order`.
    pub fn open_with_byte_order<P: AsRef<Path>>(
        path: P,
        calibrated: bool,
        byte_order: Endianness,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                SigError::FileNotFound(format!("{}: {}", path.display(), e))
            }
            _ => SigError::Io(e),
        })?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let order = ByteOrderCorrector::new(byte_order);

        let mut fields = FieldReader::new(&mut reader, order);
        let (fixed, version) = read_fixed_header(&mut fields)?;

        let channel_count = fixed.number_of_channels as usize;
        if channel_count == 0 {
            return Err(SigError::format("file has no channels"));
        }
        let variable = read_variable_header(&mut fields, channel_count)?;

        let samples_per_record = variable.samples_per_record[0];
        if samples_per_record == 0 {
            return Err(SigError::format("channel 0 has zero samples per record"));
        }
        if variable.samples_per_record.iter().any(|&s| s != samples_per_record) {
            warn!(
                "{}: channels differ in samples per record, using {} for all of them",
                path.display(),
                samples_per_record
            );
        }

        let code = variable.type_of_data[0];
        let data_type = DataType::from_code(code)
            .ok_or_else(|| SigError::format(format!("unsupported data type {}", code)))?;
        if variable.type_of_data.iter().any(|&t| t != code) {
            warn!(
                "{}: channels differ in data type, using {:?} for all of them",
                path.display(),
                data_type
            );
        }

        let records = fixed.number_of_data_records as u64;
        let too_large = || {
            SigError::format(format!(
                "{} records of {} samples do not fit in the file",
                records, samples_per_record
            ))
        };
        let samples_recorded = u64::from(samples_per_record)
            .checked_mul(records)
            .filter(|&n| n <= i64::MAX as u64)
            .ok_or_else(too_large)?;
        let start_of_data = FIXED_HEADER_SIZE * u64::from(fixed.header_length);
        let layout = RecordLayout::packed(
            start_of_data,
            channel_count,
            samples_per_record as usize,
            data_type.size(),
        )?;
        // 至少一条记录必须能放进文件
        if records > 0 && layout.record_bytes as u64 > file_len {
            return Err(too_large());
        }
        let start_of_event_table = (layout.record_bytes as u64)
            .checked_mul(records)
            .and_then(|data_bytes| data_bytes.checked_add(start_of_data))
            .ok_or_else(too_large)?;
        let sampling_frequency = f64::from(samples_per_record) / fixed.duration_of_data_record;

        let calibrations = if calibrated {
            let calibrations: Vec<Calibration> = (0..channel_count)
                .filter_map(|i| variable.channel(i))
                .map(|c| c.calibration())
                .collect();
            if let Some(i) = calibrations.iter().position(|c| !c.is_well_formed()) {
                warn!(
                    "{}: channel {} has degenerate calibration ranges",
                    path.display(),
                    i
                );
            }
            Some(calibrations)
        } else {
            None
        };

        debug!(
            "opened {}: {}, {} channels, {} records of {} samples, {} Hz, {:?}",
            path.display(),
            fixed.version_id,
            channel_count,
            records,
            samples_per_record,
            sampling_frequency,
            data_type
        );

        Ok(Gdf2File {
            path: path.to_path_buf(),
            file: reader,
            file_len,
            order,
            fixed,
            variable,
            version,
            data_type,
            sampling_frequency,
            samples_recorded,
            start_of_event_table,
            calibrations,
            layout,
            buffers: RecordBuffers::default(),
        })
    }

    pub fn fixed_header(&self) -> &FixedHeader {
        &self.fixed
    }

    pub fn variable_header(&self) -> &VariableHeader {
        &self.variable
    }

    /// Format version as `minor + 100 * major`, e.g. 251 for GDF 2.51.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn byte_order(&self) -> Endianness {
        self.order.file_order()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrations.is_some()
    }

    pub fn samples_per_record(&self) -> u32 {
        self.layout.samples_per_record as u32
    }

    pub fn record_count(&self) -> i64 {
        self.fixed.number_of_data_records
    }

    pub fn start_of_data(&self) -> u64 {
        self.layout.start_of_data
    }

    pub fn start_of_event_table(&self) -> u64 {
        self.start_of_event_table
    }

    /// Decodes the event table following the data records, if there is one.
    pub fn read_event_table(&mut self) -> Result<Option<GdfEventTable>> {
        let mut fields = FieldReader::new(&mut self.file, self.order);
        read_event_table(&mut fields, self.start_of_event_table, self.file_len)
    }

    /// Closes the file.
    pub fn close(self) {}
}

impl DataFile for Gdf2File {
    fn file_path(&self) -> &Path {
        &self.path
    }

    fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    fn channel_count(&self) -> usize {
        self.variable.channel_count()
    }

    fn samples_recorded(&self) -> u64 {
        self.samples_recorded
    }

    /// GDF stores the start in UTC, so `timezone_hours` is not used.
    fn start_date(&self, _timezone_hours: i32) -> i64 {
        self.fixed.start_epoch_seconds()
    }

    fn channel(&self, channel: usize) -> Result<ChannelHeader> {
        self.variable
            .channel(channel)
            .ok_or(SigError::InvalidChannelIndex(channel))
    }

    fn read_channels<T: SampleValue>(
        &mut self,
        channels: &mut [&mut [T]],
        first_sample: u64,
        last_sample: u64,
    ) -> Result<()> {
        check_request(
            channels,
            self.channel_count(),
            first_sample,
            last_sample,
            self.samples_recorded,
        )?;

        let Gdf2File {
            file,
            layout,
            buffers,
            calibrations,
            data_type,
            order,
            ..
        } = self;
        let data_type = *data_type;
        let order = *order;
        let calibrations = calibrations.as_deref();

        read_records(
            file,
            layout,
            buffers,
            channels,
            first_sample,
            last_sample,
            |channel, raw, out| {
                data_type.decode_all(raw, &order, out);
                if let Some(calibrations) = calibrations {
                    calibrations[channel].apply_all(out);
                }
            },
        )
    }

    /// Fills the default montage and decodes the event table into
    /// montage 0.
    fn load(&mut self, model: &mut DataModel) -> Result<()> {
        fill_default_montage(self, model)?;

        let table = match self.read_event_table()? {
            Some(table) => table,
            None => return Ok(()),
        };

        // One event type per distinct code, in order of first appearance.
        let mut type_rows = BTreeMap::new();
        for event in &table.events {
            if !type_rows.contains_key(&event.event_type) {
                let row = model.event_types.row_count();
                model.event_types.insert_rows(row, 1);
                model.event_types.set_row(
                    row,
                    EventType {
                        id: i32::from(event.event_type),
                        name: format!("Type {:#06x}", event.event_type),
                        ..model.event_types.row(row)
                    },
                );
                type_rows.insert(event.event_type, row as i32);
            }
        }

        let events = model.montages.event_table_mut(0);
        let first_row = events.row_count();
        events.insert_rows(first_row, table.events.len());
        for (i, event) in table.events.iter().enumerate() {
            let row = first_row + i;
            events.set_row(
                row,
                Event {
                    event_type: type_rows[&event.event_type],
                    position: table.rescale(event.position, self.sampling_frequency) as i64,
                    duration: table.rescale(u64::from(event.duration), self.sampling_frequency)
                        as i64,
                    channel: i32::from(event.channel) - 1,
                    ..events.row(row)
                },
            );
        }

        debug!(
            "{}: loaded {} events of {} types",
            self.path.display(),
            table.events.len(),
            type_rows.len()
        );
        Ok(())
    }
}
