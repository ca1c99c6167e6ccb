//! Opening a recording without knowing its format in advance.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::debug;

use crate::datafile::DataFile;
use crate::edf::EdfFile;
use crate::endian::Endianness;
use crate::error::{Result, SigError};
use crate::gdf2::Gdf2File;
use crate::model::DataModel;
use crate::sample::SampleValue;
use crate::types::{ChannelHeader, FileType};

/// Options used to open a [`RecordingFile`].
///
/// # Examples
///
/// ```rust
/// use sigfile::{FileType, OpenOptions};
///
/// # sigfile::doctest_utils::create_simple_gdf2_file("options.gdf")?;
/// let file = OpenOptions::new()
///     .calibrated(false)
///     .file_type(FileType::Gdf2)
///     .open("options.gdf")?;
/// assert_eq!(file.file_type(), FileType::Gdf2);
/// # std::fs::remove_file("options.gdf").ok();
/// # Ok::<(), sigfile::SigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions {
    calibrated: bool,
    byte_order: Endianness,
    file_type: Option<FileType>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            calibrated: true,
            byte_order: Endianness::Little,
            file_type: None,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return physical values (the default) instead of digital ones.
    pub fn calibrated(&mut self, calibrated: bool) -> &mut Self {
        self.calibrated = calibrated;
        self
    }

    /// Byte order of GDF files. EDF and BDF are always little-endian.
    pub fn byte_order(&mut self, byte_order: Endianness) -> &mut Self {
        self.byte_order = byte_order;
        self
    }

    /// Skips format detection.
    pub fn file_type(&mut self, file_type: FileType) -> &mut Self {
        self.file_type = Some(file_type);
        self
    }

    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<RecordingFile> {
        let path = path.as_ref();
        let file_type = match self.file_type {
            Some(file_type) => file_type,
            None => detect_file_type(path)?,
        };
        debug!("opening {} as {}", path.display(), file_type);

        match file_type {
            FileType::Gdf2 => Ok(RecordingFile::Gdf2(Gdf2File::open_with_byte_order(
                path,
                self.calibrated,
                self.byte_order,
            )?)),
            FileType::Edf | FileType::Bdf => {
                Ok(RecordingFile::Edf(EdfFile::open(path, self.calibrated)?))
            }
        }
    }
}

/// Guesses the format from the extension, then from the first bytes.
pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("gdf") => return Ok(FileType::Gdf2),
        Some("edf") => return Ok(FileType::Edf),
        Some("bdf") => return Ok(FileType::Bdf),
        _ => {}
    }

    let mut file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => SigError::FileNotFound(format!("{}: {}", path.display(), e)),
        _ => SigError::Io(e),
    })?;
    let mut magic = [0u8; 8];
    file.read_exact(&mut magic).map_err(|_| {
        SigError::UnsupportedFileType(format!("{}: file too short", path.display()))
    })?;

    if magic.starts_with(b"GDF") {
        Ok(FileType::Gdf2)
    } else if &magic == b"0       " {
        Ok(FileType::Edf)
    } else if &magic == b"\xFFBIOSEMI" {
        Ok(FileType::Bdf)
    } else {
        Err(SigError::UnsupportedFileType(format!(
            "{}: unrecognized format",
            path.display()
        )))
    }
}

/// A recording in any supported format.
pub enum RecordingFile {
    Gdf2(Gdf2File),
    Edf(EdfFile),
}

macro_rules! dispatch {
    ($self:expr, $f:ident => $body:expr) => {
        match $self {
            RecordingFile::Gdf2($f) => $body,
            RecordingFile::Edf($f) => $body,
        }
    };
}

impl RecordingFile {
    /// Opens `path` with the default [`OpenOptions`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        OpenOptions::new().open(path)
    }

    pub fn file_type(&self) -> FileType {
        match self {
            RecordingFile::Gdf2(_) => FileType::Gdf2,
            RecordingFile::Edf(f) => f.file_type(),
        }
    }

    pub fn is_calibrated(&self) -> bool {
        dispatch!(self, f => f.is_calibrated())
    }

    /// Closes the file.
    pub fn close(self) {
        dispatch!(self, f => f.close())
    }
}

impl DataFile for RecordingFile {
    fn file_path(&self) -> &Path {
        dispatch!(self, f => f.file_path())
    }

    fn sampling_frequency(&self) -> f64 {
        dispatch!(self, f => f.sampling_frequency())
    }

    fn channel_count(&self) -> usize {
        dispatch!(self, f => f.channel_count())
    }

    fn samples_recorded(&self) -> u64 {
        dispatch!(self, f => f.samples_recorded())
    }

    fn start_date(&self, timezone_hours: i32) -> i64 {
        dispatch!(self, f => f.start_date(timezone_hours))
    }

    fn channel(&self, channel: usize) -> Result<ChannelHeader> {
        dispatch!(self, f => f.channel(channel))
    }

    fn read_channels<T: SampleValue>(
        &mut self,
        channels: &mut [&mut [T]],
        first_sample: u64,
        last_sample: u64,
    ) -> Result<()> {
        dispatch!(self, f => f.read_channels(channels, first_sample, last_sample))
    }

    fn load(&mut self, model: &mut DataModel) -> Result<()> {
        dispatch!(self, f => f.load(model))
    }
}
