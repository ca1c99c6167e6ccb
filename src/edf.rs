//! EDF, EDF+C and BDF reader sharing the channel reader of the GDF backend.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};

use crate::datafile::DataFile;
use crate::endian::{ByteOrderCorrector, Endianness};
use crate::error::{Result, SigError};
use crate::record::{check_request, read_records, RecordBuffers, RecordLayout};
use crate::sample::{Calibration, SampleValue};
use crate::types::{ChannelHeader, FileType};
use crate::utils::{parse_edf_time, parse_int_field, parse_number_field};
use crate::{MAX_SIGNALS, TIME_DIMENSION};

const BLOCK_SIZE: usize = 256;
const BDF_MAGIC: &[u8; 8] = b"\xFFBIOSEMI";

/// Parameters of one data signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalParam {
    pub label: String,
    pub transducer: String,
    pub physical_dimension: String,
    pub physical_min: f64,
    pub physical_max: f64,
    pub digital_min: i32,
    pub digital_max: i32,
    pub prefilter: String,
    pub samples_per_record: u32,
}

impl SignalParam {
    pub fn channel_header(&self) -> ChannelHeader {
        ChannelHeader {
            label: self.label.clone(),
            physical_minimum: self.physical_min,
            physical_maximum: self.physical_max,
            digital_minimum: f64::from(self.digital_min),
            digital_maximum: f64::from(self.digital_max),
            samples_per_record: self.samples_per_record,
        }
    }
}

/// Decoded EDF/BDF header. Annotation signals are not listed in `signals`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdfHeader {
    pub file_type: FileType,
    /// Set for EDF+C and BDF+C files.
    pub is_plus: bool,
    pub patient: String,
    pub recording: String,
    /// EDF+ patient subfields; empty for plain EDF.
    pub patient_code: String,
    pub sex: String,
    pub birthdate: String,
    pub patient_name: String,
    pub patient_additional: String,
    /// EDF+ recording subfields; empty for plain EDF.
    pub admin_code: String,
    pub technician: String,
    pub equipment: String,
    pub recording_additional: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub datarecords_in_file: i64,
    /// Duration of one data record in 100 ns units.
    pub datarecord_duration: i64,
    pub signals: Vec<SignalParam>,
}

impl EdfHeader {
    /// Duration of the recording in 100 ns units.
    pub fn file_duration(&self) -> i64 {
        self.datarecord_duration * self.datarecords_in_file
    }
}

/// An EDF, EDF+C or BDF recording opened for reading.
///
/// All data signals must share the same number of samples per record.
///
/// # Examples
///
/// ```rust
/// use sigfile::{DataFile, EdfFile};
///
/// # sigfile::doctest_utils::EdfBuilder::new(2, 256, 4).write("recording.edf")?;
/// let mut file = EdfFile::open("recording.edf", true)?;
/// println!("Patient: {}", file.header().patient_name);
///
/// let mut data = vec![0.0f64; file.channel_count() * 256];
/// file.read_signal(&mut data, 0, 255)?;
/// # std::fs::remove_file("recording.edf").ok();
/// # Ok::<(), sigfile::SigError>(())
/// ```
pub struct EdfFile {
    path: PathBuf,
    file: BufReader<File>,
    header: EdfHeader,
    order: ByteOrderCorrector,
    sample_size: usize,
    sampling_frequency: f64,
    samples_recorded: u64,
    digital_ranges: Vec<(f64, f64)>,
    calibrations: Option<Vec<Calibration>>,
    layout: RecordLayout,
    buffers: RecordBuffers,
}

impl EdfFile {
    /// Opens an EDF, EDF+C or BDF file.
    ///
    /// # Errors
    ///
    /// * [`SigError::FileNotFound`] if the file doesn't exist
    /// * [`SigError::UnsupportedFileType`] if it is neither EDF nor BDF
    /// * [`SigError::DiscontinuousFile`] for EDF+D and BDF+D files
    /// * [`SigError::Format`] for a malformed header or signals with
    ///   different numbers of samples per record
    pub fn open<P: AsRef<Path>>(path: P, calibrated: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                SigError::FileNotFound(format!("{}: {}", path.display(), e))
            }
            _ => SigError::Io(e),
        })?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        // 读取并解析头部
        let parsed = parse_header(&mut reader)?;
        let header = parsed.header;

        let samples_per_record = header.signals[0].samples_per_record;
        if let Some(s) = header
            .signals
            .iter()
            .find(|s| s.samples_per_record != samples_per_record)
        {
            warn!(
                "{}: signal {} has {} samples per record, signal 0 has {}",
                path.display(),
                s.label,
                s.samples_per_record,
                samples_per_record
            );
            return Err(SigError::format(
                "signals with different sampling rates are not supported",
            ));
        }

        let records = header.datarecords_in_file as u64;
        let layout = RecordLayout {
            start_of_data: parsed.header_size,
            record_bytes: parsed.record_size,
            samples_per_record: samples_per_record as usize,
            sample_size: parsed.sample_size,
            channel_offsets: parsed.channel_offsets,
        };

        let expected_len = records
            .checked_mul(layout.record_bytes as u64)
            .and_then(|data_bytes| data_bytes.checked_add(layout.start_of_data));
        match expected_len {
            Some(expected_len) if expected_len <= file_len => {}
            _ => {
                return Err(SigError::format(format!(
                    "file is {} bytes, header describes {} records of {} bytes",
                    file_len, records, layout.record_bytes
                )))
            }
        }

        let sampling_frequency = f64::from(samples_per_record) * TIME_DIMENSION as f64
            / header.datarecord_duration as f64;

        let channels: Vec<ChannelHeader> =
            header.signals.iter().map(SignalParam::channel_header).collect();
        let digital_ranges = channels
            .iter()
            .map(|c| (c.digital_minimum, c.digital_maximum))
            .collect();
        let calibrations = if calibrated {
            Some(channels.iter().map(ChannelHeader::calibration).collect())
        } else {
            None
        };

        debug!(
            "opened {}: {}{}, {} signals, {} records of {} samples, {} Hz",
            path.display(),
            header.file_type,
            if header.is_plus { "+C" } else { "" },
            header.signals.len(),
            records,
            samples_per_record,
            sampling_frequency
        );

        Ok(EdfFile {
            path: path.to_path_buf(),
            file: reader,
            order: ByteOrderCorrector::new(Endianness::Little),
            sample_size: parsed.sample_size,
            sampling_frequency,
            samples_recorded: u64::from(samples_per_record) * records,
            digital_ranges,
            calibrations,
            layout,
            buffers: RecordBuffers::default(),
            header,
        })
    }

    pub fn header(&self) -> &EdfHeader {
        &self.header
    }

    pub fn file_type(&self) -> FileType {
        self.header.file_type
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrations.is_some()
    }

    pub fn record_count(&self) -> i64 {
        self.header.datarecords_in_file
    }

    /// Closes the file.
    pub fn close(self) {}
}

impl DataFile for EdfFile {
    fn file_path(&self) -> &Path {
        &self.path
    }

    fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    fn channel_count(&self) -> usize {
        self.header.signals.len()
    }

    fn samples_recorded(&self) -> u64 {
        self.samples_recorded
    }

    /// EDF stores local wall-clock time; `timezone_hours` is the offset of
    /// that clock from UTC.
    fn start_date(&self, timezone_hours: i32) -> i64 {
        NaiveDateTime::new(self.header.start_date, self.header.start_time)
            .and_utc()
            .timestamp()
            - i64::from(timezone_hours) * 3600
    }

    fn channel(&self, channel: usize) -> Result<ChannelHeader> {
        self.header
            .signals
            .get(channel)
            .map(SignalParam::channel_header)
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

        let EdfFile {
            file,
            layout,
            buffers,
            calibrations,
            digital_ranges,
            sample_size,
            order,
            ..
        } = self;
        let sample_size = *sample_size;
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
                decode_block(raw, sample_size, &order, out);
                // 应用数字范围限制
                let (min, max) = digital_ranges[channel];
                for v in out.iter_mut() {
                    *v = v.clamp(min, max);
                }
                if let Some(calibrations) = calibrations {
                    calibrations[channel].apply_all(out);
                }
            },
        )
    }
}

/// Decodes a block of 16-bit (EDF) or 24-bit (BDF) little-endian samples.
fn decode_block(raw: &mut [u8], sample_size: usize, order: &ByteOrderCorrector, out: &mut [f64]) {
    order.correct_each(raw, sample_size);
    for (o, b) in out.iter_mut().zip(raw.chunks_exact(sample_size)) {
        *o = match sample_size {
            3 => f64::from(order.i24(b)),
            _ => f64::from(order.i16(b)),
        };
    }
}

struct ParsedHeader {
    header: EdfHeader,
    header_size: u64,
    record_size: usize,
    sample_size: usize,
    channel_offsets: Vec<usize>,
}

fn field(block: &[u8], start: usize, len: usize) -> String {
    String::from_utf8_lossy(&block[start..start + len]).to_string()
}

/// 解析EDF/BDF文件头部
fn parse_header<R: Read>(reader: &mut R) -> Result<ParsedHeader> {
    let mut main_header = [0u8; BLOCK_SIZE];
    reader.read_exact(&mut main_header)?;

    let file_type = if &main_header[0..8] == BDF_MAGIC {
        FileType::Bdf
    } else if &main_header[0..8] == b"0       " {
        FileType::Edf
    } else {
        return Err(SigError::UnsupportedFileType(format!(
            "not an EDF or BDF file: {:?}",
            String::from_utf8_lossy(&main_header[0..8])
        )));
    };
    let sample_size = if file_type == FileType::Bdf { 3 } else { 2 };

    // 解析信号数量
    let total_signal_count = parse_int_field(&field(&main_header, 252, 4), "number of signals")?;
    if total_signal_count < 1 || total_signal_count > MAX_SIGNALS as i64 {
        return Err(SigError::format(format!(
            "invalid number of signals {}",
            total_signal_count
        )));
    }
    let total_signal_count = total_signal_count as usize;

    // 验证头部大小
    let header_size = parse_int_field(&field(&main_header, 184, 8), "header size")?;
    let expected_header_size = (total_signal_count + 1) * BLOCK_SIZE;
    if header_size != expected_header_size as i64 {
        return Err(SigError::format(format!(
            "header size is {}, {} signals need {}",
            header_size, total_signal_count, expected_header_size
        )));
    }

    // 检查EDF+/BDF+标识
    let is_plus = match &main_header[192..197] {
        b"EDF+C" | b"BDF+C" => true,
        b"EDF+D" | b"BDF+D" => return Err(SigError::DiscontinuousFile),
        _ => false,
    };

    let patient = field(&main_header, 8, 80).trim().to_string();
    let recording = field(&main_header, 88, 80).trim().to_string();

    let (start_date, start_time) =
        parse_datetime(&field(&main_header, 168, 8), &field(&main_header, 176, 8))?;

    let datarecords = parse_int_field(&field(&main_header, 236, 8), "number of data records")?;
    if datarecords < 0 {
        return Err(SigError::format(format!(
            "unknown number of data records ({})",
            datarecords
        )));
    }

    let duration_str = field(&main_header, 244, 8);
    let datarecord_duration = if duration_str.trim() == "1" {
        TIME_DIMENSION
    } else {
        parse_edf_time(&duration_str)?
    };
    if datarecord_duration <= 0 {
        return Err(SigError::format(format!(
            "invalid data record duration {:?}",
            duration_str.trim()
        )));
    }

    // 读取信号头部信息
    let mut signal_header = vec![0u8; total_signal_count * BLOCK_SIZE];
    reader.read_exact(&mut signal_header)?;

    let (signals, channel_offsets, record_size) =
        parse_signals(&signal_header, total_signal_count, file_type, sample_size)?;
    if signals.is_empty() {
        return Err(SigError::format("file has no data signals"));
    }

    let mut header = EdfHeader {
        file_type,
        is_plus,
        patient,
        recording,
        patient_code: String::new(),
        sex: String::new(),
        birthdate: String::new(),
        patient_name: String::new(),
        patient_additional: String::new(),
        admin_code: String::new(),
        technician: String::new(),
        equipment: String::new(),
        recording_additional: String::new(),
        start_date,
        start_time,
        datarecords_in_file: datarecords,
        datarecord_duration,
        signals,
    };
    if is_plus {
        parse_plus_patient(&mut header);
        parse_plus_recording(&mut header);
    }

    Ok(ParsedHeader {
        header,
        header_size: expected_header_size as u64,
        record_size,
        sample_size,
        channel_offsets,
    })
}

/// 解析日期时间 "dd.mm.yy" / "hh.mm.ss"
fn parse_datetime(date_str: &str, time_str: &str) -> Result<(NaiveDate, NaiveTime)> {
    let invalid = || SigError::format(format!("invalid start {:?} {:?}", date_str, time_str));

    let date_parts: Vec<&str> = date_str.split('.').collect();
    let time_parts: Vec<&str> = time_str.split('.').collect();
    if date_parts.len() != 3 || time_parts.len() != 3 {
        return Err(invalid());
    }

    let field = |part: &str, name: &str| -> Result<u32> {
        let value = parse_int_field(part, name)?;
        u32::try_from(value).map_err(|_| invalid())
    };

    let day = field(date_parts[0], "start day")?;
    let month = field(date_parts[1], "start month")?;
    let year = {
        let yy = field(date_parts[2], "start year")? as i32;
        if yy > 84 {
            1900 + yy
        } else {
            2000 + yy
        }
    };
    let start_date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;

    let hour = field(time_parts[0], "start hour")?;
    let minute = field(time_parts[1], "start minute")?;
    let second = field(time_parts[2], "start second")?;
    let start_time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(invalid)?;

    Ok((start_date, start_time))
}

/// 解析信号参数
///
/// Returns the data signals, the offset of each data signal's block inside
/// a record and the total record size in bytes.
fn parse_signals(
    signal_header: &[u8],
    total_signal_count: usize,
    file_type: FileType,
    sample_size: usize,
) -> Result<(Vec<SignalParam>, Vec<usize>, usize)> {
    let annotation_label = match file_type {
        FileType::Bdf => "BDF Annotations",
        _ => "EDF Annotations",
    };
    let n = total_signal_count;
    let mut signals = Vec::new();
    let mut channel_offsets = Vec::new();
    let mut buffer_offset = 0;

    for i in 0..n {
        let label = field(signal_header, i * 16, 16).trim().to_string();
        let samples_per_record =
            parse_int_field(&field(signal_header, n * 216 + i * 8, 8), "samples per record")?;
        if samples_per_record < 1 || samples_per_record > i64::from(u32::MAX) {
            return Err(SigError::format(format!(
                "signal {} has {} samples per record",
                i, samples_per_record
            )));
        }
        let samples_per_record = samples_per_record as u32;

        // 注释信号只占用记录空间
        if label == annotation_label {
            buffer_offset += samples_per_record as usize * sample_size;
            continue;
        }

        let physical_min =
            parse_number_field(&field(signal_header, n * 104 + i * 8, 8), "physical minimum")?;
        let physical_max =
            parse_number_field(&field(signal_header, n * 112 + i * 8, 8), "physical maximum")?;
        let digital_min =
            parse_int_field(&field(signal_header, n * 120 + i * 8, 8), "digital minimum")?;
        let digital_max =
            parse_int_field(&field(signal_header, n * 128 + i * 8, 8), "digital maximum")?;

        if physical_min == physical_max {
            return Err(SigError::format(format!(
                "signal {} has equal physical minimum and maximum",
                label
            )));
        }
        if digital_min >= digital_max {
            return Err(SigError::format(format!(
                "signal {} has digital minimum {} >= maximum {}",
                label, digital_min, digital_max
            )));
        }
        let (lowest, highest) = if sample_size == 3 {
            (-8_388_608, 8_388_607)
        } else {
            (i64::from(i16::MIN), i64::from(i16::MAX))
        };
        if digital_min < lowest || digital_max > highest {
            return Err(SigError::format(format!(
                "signal {} digital range {}..{} exceeds the sample width",
                label, digital_min, digital_max
            )));
        }

        signals.push(SignalParam {
            label,
            transducer: field(signal_header, n * 16 + i * 80, 80).trim().to_string(),
            physical_dimension: field(signal_header, n * 96 + i * 8, 8).trim().to_string(),
            physical_min,
            physical_max,
            digital_min: digital_min as i32,
            digital_max: digital_max as i32,
            prefilter: field(signal_header, n * 136 + i * 80, 80).trim().to_string(),
            samples_per_record,
        });
        channel_offsets.push(buffer_offset);
        buffer_offset += samples_per_record as usize * sample_size;
    }

    Ok((signals, channel_offsets, buffer_offset))
}

/// 解析EDF+患者字段: "code sex birthdate name additional"
fn parse_plus_patient(header: &mut EdfHeader) {
    let parts: Vec<&str> = header.patient.split_whitespace().collect();
    let subfield = |i: usize| parts.get(i).map(|s| s.replace('_', " ")).unwrap_or_default();

    header.patient_code = subfield(0);
    header.sex = subfield(1);
    header.birthdate = subfield(2);
    header.patient_name = subfield(3);
    header.patient_additional = parts.get(4..).map(|s| s.join(" ")).unwrap_or_default();
}

/// 解析EDF+记录字段: "Startdate dd-MMM-yyyy admincode technician equipment additional"
fn parse_plus_recording(header: &mut EdfHeader) {
    let parts: Vec<&str> = header.recording.split_whitespace().collect();
    if parts.first() != Some(&"Startdate") {
        warn!("EDF+ recording field does not start with \"Startdate\"");
        return;
    }
    let subfield = |i: usize| parts.get(i).map(|s| s.replace('_', " ")).unwrap_or_default();

    header.admin_code = subfield(2);
    header.technician = subfield(3);
    header.equipment = subfield(4);
    header.recording_additional = parts.get(5..).map(|s| s.join(" ")).unwrap_or_default();
}
