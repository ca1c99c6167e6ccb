use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use sigfile::doctest_utils::{Gdf2Builder, Gdf2Event};
use sigfile::{Calibration, DataFile, DataModel, DataType, Endianness, Gdf2File, SigError};
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// 测试文件放在临时目录里，随 TempDir 一起删除
struct Fixture {
    _dir: TempDir,
    path: PathBuf,
    builder: Gdf2Builder,
}

fn fixture(builder: Gdf2Builder) -> Fixture {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording.gdf");
    builder.write(&path).unwrap();
    Fixture { _dir: dir, path, builder }
}

fn write_bytes(bytes: &[u8]) -> (TempDir, PathBuf) {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.gdf");
    std::fs::write(&path, bytes).unwrap();
    (dir, path)
}

fn calibration(builder: &Gdf2Builder) -> Calibration {
    Calibration {
        digital_minimum: builder.digital_minimum,
        scale: (builder.digital_maximum - builder.digital_minimum)
            / (builder.physical_maximum - builder.physical_minimum),
        physical_minimum: builder.physical_minimum,
    }
}

/// Value the reader should return for `sample` of `channel`.
fn expected(builder: &Gdf2Builder, channel: usize, sample: u64, calibrated: bool) -> f64 {
    let raw = builder.sample(channel, sample);
    if calibrated {
        calibration(builder).apply(raw)
    } else {
        raw
    }
}

fn assert_close(actual: f64, expected: f64, tolerance: f64, what: &str) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{}: got {}, expected {}",
        what,
        actual,
        expected
    );
}

/// The 19-channel, 200 Hz recording of 364000 samples per channel.
fn long_recording() -> Fixture {
    fixture(Gdf2Builder::new(19, 200, 1820))
}

#[test]
fn test_metadata() {
    let f = long_recording();
    let file = Gdf2File::open(&f.path, true).unwrap();

    assert_eq!(file.sampling_frequency(), 200.0);
    assert_eq!(file.channel_count(), 19);
    assert_eq!(file.samples_recorded(), 364_000);
    assert_eq!(file.version(), 251);
    assert_eq!(file.data_type(), DataType::Int16);
    assert_eq!(file.samples_per_record(), 200);
    assert_eq!(file.record_count(), 1820);
    assert_eq!(file.start_of_data(), 20 * 256);
    assert_eq!(file.start_of_event_table(), f.builder.start_of_event_table());
    assert_eq!(file.fixed_header().version_id, "GDF 2.51");
    assert_eq!(file.variable_header().label[18], "CH18");
    assert_eq!(file.label(3).unwrap(), "CH3");
    assert_eq!(file.physical_minimum(0).unwrap(), -512.0);
    assert_eq!(file.physical_maximum(0).unwrap(), 512.0);
    assert_eq!(file.digital_minimum(0).unwrap(), -32768.0);
    assert_eq!(file.digital_maximum(0).unwrap(), 32767.0);
    assert!(matches!(file.label(19), Err(SigError::InvalidChannelIndex(19))));
    assert_eq!(file.file_path(), f.path.as_path());
}

#[test]
fn test_start_date() {
    let f = fixture(Gdf2Builder::new(1, 10, 1));
    let file = Gdf2File::open(&f.path, true).unwrap();

    // Tue Jan  6 21:17:39 2009 UTC; GDF ignores the time zone.
    assert_eq!(file.start_date(0), 1_231_276_659);
    assert_eq!(file.start_date(5), 1_231_276_659);
    let start = file.start_datetime().unwrap();
    assert_eq!(start.format("%Y-%m-%d %H:%M:%S").to_string(), "2009-01-06 21:17:39");
}

#[test]
fn test_out_of_bounds() {
    let f = long_recording();
    let mut file = Gdf2File::open(&f.path, true).unwrap();
    let channels = file.channel_count();
    let n_normal = 149usize;
    let n_zero = 229usize;
    let width = n_normal + n_zero;

    let mut a = vec![0.0f64; width * channels];
    let mut b = vec![0.0f64; n_normal * channels];
    file.read_signal(&mut a, -(n_zero as i64), n_normal as i64 - 1).unwrap();
    file.read_signal(&mut b, 0, n_normal as i64 - 1).unwrap();

    for j in 0..channels {
        for i in 0..n_zero {
            assert_eq!(a[width * j + i], 0.0);
        }
        for i in 0..n_normal {
            assert_eq!(a[width * j + n_zero + i], b[n_normal * j + i]);
        }
    }

    let last = file.samples_recorded() as i64 - 1;
    file.read_signal(&mut a, last - n_normal as i64 + 1, last + n_zero as i64).unwrap();
    file.read_signal(&mut b, last - n_normal as i64 + 1, last).unwrap();

    for j in 0..channels {
        for i in 0..n_zero {
            assert_eq!(a[width * j + n_normal + i], 0.0);
        }
        for i in 0..n_normal {
            assert_eq!(a[width * j + i], b[n_normal * j + i]);
        }
    }
}

#[test]
fn test_leading_padding_values() {
    let f = long_recording();
    let mut file = Gdf2File::open(&f.path, true).unwrap();

    // Samples -229..=148: 229 zeros then samples 0..=148 of every channel.
    let mut data = vec![f64::NAN; 19 * 378];
    file.read_signal(&mut data, -229, 148).unwrap();

    for c in 0..19 {
        let span = &data[c * 378..(c + 1) * 378];
        assert!(span[..229].iter().all(|&v| v == 0.0), "channel {}", c);
        for s in 0..149 {
            assert_close(span[229 + s], expected(&f.builder, c, s as u64, true), 1e-6, "sample");
        }
    }
}

#[test]
fn test_data_every_type() {
    let types = [
        DataType::Int8,
        DataType::UInt8,
        DataType::Int16,
        DataType::UInt16,
        DataType::Int32,
        DataType::UInt32,
        DataType::Int64,
        DataType::UInt64,
        DataType::Float32,
        DataType::Float64,
    ];

    for data_type in types {
        let mut builder = Gdf2Builder::new(3, 50, 4);
        builder.data_type = data_type;
        let f = fixture(builder);
        let mut file = Gdf2File::open(&f.path, true).unwrap();
        assert_eq!(file.data_type(), data_type);

        let n = file.samples_recorded() as usize;
        let mut doubles = vec![0.0f64; 3 * n];
        let mut floats = vec![0.0f32; 3 * n];
        file.read_signal(&mut doubles, 0, n as i64 - 1).unwrap();
        file.read_signal(&mut floats, 0, n as i64 - 1).unwrap();

        for c in 0..3 {
            for s in 0..n {
                let value = expected(&f.builder, c, s as u64, true);
                let what = format!("{:?} channel {} sample {}", data_type, c, s);
                assert_close(doubles[c * n + s], value, 1e-6, &what);
                assert_close(f64::from(floats[c * n + s]), value, 1e-2, &what);
            }
        }
    }
}

#[test]
fn test_uncalibrated_values_are_digital() {
    let f = fixture(Gdf2Builder::new(2, 32, 3));
    let mut file = Gdf2File::open(&f.path, false).unwrap();
    assert!(!file.is_calibrated());

    let mut data = vec![0.0f64; 2 * 96];
    file.read_signal(&mut data, 0, 95).unwrap();
    for c in 0..2 {
        for s in 0..96 {
            assert_eq!(data[c * 96 + s], f.builder.sample(c, s as u64));
        }
    }
}

#[test]
fn test_calibration_maps_digital_range() {
    let mut builder = Gdf2Builder::new(1, 4, 1);
    builder.digital_minimum = 0.0;
    builder.digital_maximum = 1000.0;
    builder.physical_minimum = -1.0;
    builder.physical_maximum = 1.0;
    let f = fixture(builder);

    let mut calibrated = Gdf2File::open(&f.path, true).unwrap();
    let mut raw = Gdf2File::open(&f.path, false).unwrap();
    let mut physical = [0.0f64; 4];
    let mut digital = [0.0f64; 4];
    calibrated.read_signal(&mut physical, 0, 3).unwrap();
    raw.read_signal(&mut digital, 0, 3).unwrap();

    for (p, d) in physical.iter().zip(&digital) {
        assert_close(*p, (d - 0.0) / 500.0 - 1.0, 1e-12, "calibrated");
    }
}

#[test]
fn test_reads_across_record_boundaries() {
    let f = fixture(Gdf2Builder::new(3, 10, 6));
    let mut file = Gdf2File::open(&f.path, true).unwrap();

    for (first, last) in [(9, 10), (7, 22), (0, 0), (59, 59), (10, 19), (3, 56)] {
        let n = (last - first + 1) as usize;
        let mut data = vec![0.0f64; 3 * n];
        file.read_signal(&mut data, first, last).unwrap();
        for c in 0..3 {
            for i in 0..n {
                let s = first as u64 + i as u64;
                assert_close(
                    data[c * n + i],
                    expected(&f.builder, c, s, true),
                    1e-9,
                    &format!("[{}, {}] channel {} sample {}", first, last, c, s),
                );
            }
        }
    }
}

#[test]
fn test_split_reads_match_one_read() {
    let f = fixture(Gdf2Builder::new(4, 25, 3));
    let mut file = Gdf2File::open(&f.path, true).unwrap();

    let mut whole = vec![0.0f64; 4 * 50];
    let mut first = vec![0.0f64; 4 * 25];
    let mut second = vec![0.0f64; 4 * 25];
    file.read_signal(&mut whole, 0, 49).unwrap();
    file.read_signal(&mut first, 0, 24).unwrap();
    file.read_signal(&mut second, 25, 49).unwrap();

    for c in 0..4 {
        assert_eq!(whole[c * 50..c * 50 + 25], first[c * 25..(c + 1) * 25]);
        assert_eq!(whole[c * 50 + 25..(c + 1) * 50], second[c * 25..(c + 1) * 25]);
    }
}

#[test]
fn test_repeated_reads_are_identical() {
    let f = fixture(Gdf2Builder::new(2, 16, 8));
    let mut file = Gdf2File::open(&f.path, true).unwrap();

    let mut first = vec![0.0f32; 2 * 40];
    let mut other = vec![0.0f32; 2 * 5];
    let mut second = vec![0.0f32; 2 * 40];
    file.read_signal(&mut first, 30, 69).unwrap();
    file.read_signal(&mut other, 100, 104).unwrap();
    file.read_signal(&mut second, 30, 69).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_big_endian_file() {
    let mut builder = Gdf2Builder::new(2, 20, 3);
    builder.data_type = DataType::Int32;
    builder.events = vec![Gdf2Event { position: 3, event_type: 0x0101, channel: 0, duration: 0 }];
    let f = fixture(builder.byte_order(Endianness::Big));

    let mut file = Gdf2File::open_with_byte_order(&f.path, true, Endianness::Big).unwrap();
    assert_eq!(file.byte_order(), Endianness::Big);
    assert_eq!(file.channel_count(), 2);
    assert_eq!(file.samples_recorded(), 60);
    assert_eq!(file.start_date(0), 1_231_276_659);

    let mut data = vec![0.0f64; 2 * 60];
    file.read_signal(&mut data, 0, 59).unwrap();
    for c in 0..2 {
        for s in 0..60 {
            assert_close(data[c * 60 + s], expected(&f.builder, c, s as u64, true), 1e-6, "sample");
        }
    }

    let table = file.read_event_table().unwrap().unwrap();
    assert_eq!(table.events[0].position, 2);
    assert_eq!(table.events[0].event_type, 0x0101);

    // The same bytes read as little-endian are not a valid file.
    assert!(Gdf2File::open(&f.path, true).is_err());
}

#[test]
fn test_rational_record_duration() {
    let mut builder = Gdf2Builder::new(1, 100, 2);
    builder.version = "GDF 2.10".to_string();
    builder.duration = 0.5;
    let f = fixture(builder);

    let file = Gdf2File::open(&f.path, true).unwrap();
    assert_eq!(file.version(), 210);
    assert_close(file.sampling_frequency(), 200.0, 1e-9, "sampling frequency");
}

#[test]
fn test_invalid_files() {
    let valid = Gdf2Builder::new(2, 10, 2);

    let mut bytes = valid.to_bytes();
    bytes[..3].copy_from_slice(b"XYZ");
    let (_dir, path) = write_bytes(&bytes);
    assert!(matches!(Gdf2File::open(&path, true), Err(SigError::Format(_))));

    let mut builder = valid.clone();
    builder.version = "GDF 1.25".to_string();
    let (_dir, path) = write_bytes(&builder.to_bytes());
    assert!(matches!(Gdf2File::open(&path, true), Err(SigError::Format(_))));

    let mut builder = valid.clone();
    builder.type_code_override = Some(9);
    let (_dir, path) = write_bytes(&builder.to_bytes());
    assert!(matches!(Gdf2File::open(&path, true), Err(SigError::Format(_))));

    let mut builder = valid.clone();
    builder.number_of_records_override = Some(-1);
    let (_dir, path) = write_bytes(&builder.to_bytes());
    assert!(matches!(Gdf2File::open(&path, true), Err(SigError::Format(_))));

    let mut builder = valid.clone();
    builder.samples_per_record = 0;
    builder.records = 0;
    let (_dir, path) = write_bytes(&builder.to_bytes());
    assert!(matches!(Gdf2File::open(&path, true), Err(SigError::Format(_))));

    // Record counts and sizes too large for the file are rejected at open.
    for records in [i64::MAX, i64::MAX / 10, 1 << 62] {
        let mut builder = valid.clone();
        builder.number_of_records_override = Some(records);
        let (_dir, path) = write_bytes(&builder.to_bytes());
        assert!(matches!(Gdf2File::open(&path, true), Err(SigError::Format(_))));
    }

    // Samples per record of both channels, in the variable header.
    let mut bytes = valid.to_bytes();
    let spr_offset = 256 + 2 * 216;
    bytes[spr_offset..spr_offset + 8].copy_from_slice(&[0xFF; 8]);
    let (_dir, path) = write_bytes(&bytes);
    assert!(matches!(Gdf2File::open(&path, true), Err(SigError::Format(_))));
}

#[test]
fn test_truncated_files() {
    let bytes = Gdf2Builder::new(2, 10, 2).to_bytes();

    let (_dir, path) = write_bytes(&[]);
    match Gdf2File::open(&path, true) {
        Err(SigError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("expected an I/O error, got {:?}", other.err()),
    }

    let (_dir, path) = write_bytes(&bytes[..256 + 100]);
    assert!(matches!(Gdf2File::open(&path, true), Err(SigError::Io(_))));

    // Headers intact, last record cut short.
    let (_dir, path) = write_bytes(&bytes[..bytes.len() - 4]);
    let mut file = Gdf2File::open(&path, true).unwrap();
    let mut data = vec![0.0f64; 2 * 10];
    file.read_signal(&mut data, 0, 9).unwrap();
    assert!(matches!(file.read_signal(&mut data, 10, 19), Err(SigError::Io(_))));
}

#[test]
fn test_missing_file() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Gdf2File::open(dir.path().join("missing.gdf"), true),
        Err(SigError::FileNotFound(_))
    ));
}

#[test]
fn test_channel_reader_preconditions() {
    let f = fixture(Gdf2Builder::new(2, 10, 2));
    let mut file = Gdf2File::open(&f.path, true).unwrap();

    let mut a = [0.0f64; 5];
    let mut b = [0.0f64; 5];
    {
        let mut channels: Vec<&mut [f64]> = vec![&mut a[..], &mut b[..]];
        assert!(matches!(
            file.read_channels(&mut channels, 16, 20),
            Err(SigError::OutOfRange { first: 16, last: 20, samples: 20 })
        ));
        assert!(matches!(
            file.read_channels(&mut channels, 4, 0),
            Err(SigError::InvalidArgument(_))
        ));
        file.read_channels(&mut channels, 15, 19).unwrap();
    }
    assert_close(a[4], expected(&f.builder, 0, 19, true), 1e-9, "last sample");
    assert_close(b[0], expected(&f.builder, 1, 15, true), 1e-9, "first sample");

    let mut small = vec![0.0f64; 2 * 5 - 1];
    assert!(matches!(file.read_signal(&mut small, 0, 4), Err(SigError::InvalidArgument(_))));
    assert!(matches!(file.read_signal(&mut small, 4, 3), Err(SigError::InvalidArgument(_))));
}

#[test]
fn test_range_entirely_outside() {
    let f = fixture(Gdf2Builder::new(2, 10, 2));
    let mut file = Gdf2File::open(&f.path, true).unwrap();

    let mut data = vec![1.0f32; 2 * 10];
    file.read_signal(&mut data, -20, -11).unwrap();
    assert!(data.iter().all(|&v| v == 0.0));

    let mut data = vec![1.0f32; 2 * 10];
    file.read_signal(&mut data, 20, 29).unwrap();
    assert!(data.iter().all(|&v| v == 0.0));
}

#[test]
fn test_event_table() {
    let mut builder = Gdf2Builder::new(3, 200, 5);
    builder.event_mode = 3;
    builder.event_rate = Some(100.0);
    builder.events = vec![
        Gdf2Event { position: 11, event_type: 0x0300, channel: 0, duration: 5 },
        Gdf2Event { position: 51, event_type: 0x0411, channel: 2, duration: 0 },
        Gdf2Event { position: 101, event_type: 0x0300, channel: 1, duration: 1 },
    ];
    let f = fixture(builder);
    let mut file = Gdf2File::open(&f.path, true).unwrap();

    let table = file.read_event_table().unwrap().unwrap();
    assert_eq!(table.mode, 3);
    assert_eq!(table.sampling_rate, 100.0);
    assert_eq!(table.events.len(), 3);
    assert_eq!(table.events[1].position, 50);
    assert_eq!(table.events[1].channel, 2);

    let mut model = DataModel::new();
    file.load(&mut model).unwrap();

    assert_eq!(model.event_types.row_count(), 2);
    assert_eq!(model.event_types.row(0).id, 0x0300);
    assert_eq!(model.event_types.row(0).name, "Type 0x0300");
    assert_eq!(model.event_types.row(1).id, 0x0411);

    assert_eq!(model.montages.row_count(), 1);
    let tracks = model.montages.track_table(0);
    assert_eq!(tracks.row_count(), 3);
    assert_eq!(tracks.row(2).label, "CH2");

    // Positions and durations are converted from 100 Hz to 200 Hz.
    let events = model.montages.event_table(0);
    assert_eq!(events.row_count(), 3);
    let e = events.row(0);
    assert_eq!((e.event_type, e.position, e.duration, e.channel), (0, 20, 10, -1));
    let e = events.row(1);
    assert_eq!((e.event_type, e.position, e.duration, e.channel), (1, 100, 0, 1));
    let e = events.row(2);
    assert_eq!((e.event_type, e.position, e.duration, e.channel), (0, 200, 2, 0));
}

#[test]
fn test_load_without_events() {
    let f = fixture(Gdf2Builder::new(4, 10, 1));
    let mut file = Gdf2File::open(&f.path, true).unwrap();
    assert_eq!(file.read_event_table().unwrap(), None);

    let mut model = DataModel::new();
    file.load(&mut model).unwrap();
    assert_eq!(model.event_types.row_count(), 0);
    assert_eq!(model.montages.event_table(0).row_count(), 0);
    assert_eq!(model.montages.track_table(0).row_count(), 4);
}

#[test]
fn test_shared_between_threads() {
    let f = fixture(Gdf2Builder::new(2, 25, 40));
    let file = Arc::new(Mutex::new(Gdf2File::open(&f.path, true).unwrap()));
    let builder = Arc::new(f.builder.clone());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let file = Arc::clone(&file);
            let builder = Arc::clone(&builder);
            thread::spawn(move || {
                for round in 0..20 {
                    let first = ((t * 173 + round * 59) % 1000) as i64 - 10;
                    let last = first + 30;
                    let mut data = vec![0.0f64; 2 * 31];
                    file.lock().unwrap().read_signal(&mut data, first, last).unwrap();

                    for c in 0..2 {
                        for i in 0..31 {
                            let s = first + i as i64;
                            let value = if (0..1000).contains(&s) {
                                expected(&builder, c, s as u64, true)
                            } else {
                                0.0
                            };
                            assert_close(data[c * 31 + i], value, 1e-9, "threaded read");
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    if let Ok(file) = Arc::try_unwrap(file) {
        file.into_inner().unwrap().close();
    }
}
