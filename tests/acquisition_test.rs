//! End-to-end acquisition tests against scripted boards.

use std::time::{Duration, Instant};
use steadystate_daq::{
    config::{Config, Span, TemperatureUnit},
    output::{CsvLog, JsonLinesLog, RecordSink},
    record::ReadingValue,
    source::{ScriptedSource, SensorFault},
    Acquisition, ChannelId, Classification, RpmSampler, RunLog,
};

/// One thermocouple channel on board 2, no voltage channels, no pressure.
fn single_channel_config() -> Config {
    let mut config = Config::default();
    config.thermo.board_range = Span::new(2, 2);
    config.thermo.channel_range = Span::new(0, 0);
    config.thermo.unit = TemperatureUnit::Celsius;
    config.voltage.board_range = Span::new(1, 0);
    config.pressure = None;
    config.rpm.enabled = false;
    config
}

#[test]
fn test_default_window_warms_up_then_classifies() {
    let config = single_channel_config();
    assert_eq!(config.classifier.window_size, 1800);

    let ch = ChannelId::new(2, 0);
    let mut source = ScriptedSource::new();
    source.push_values(ch, std::iter::repeat(65.0).take(1800));

    let mut acquisition = Acquisition::new(&config);
    acquisition.setup(&mut source).unwrap();

    for cycle in 0..1799 {
        let record = acquisition.poll(&mut source).unwrap();
        assert_eq!(
            record.readings[0].classification,
            Some(Classification::Transient),
            "cycle {cycle} classified before the window filled"
        );
        assert!(record.readings[0].deviation.is_none());
    }

    let record = acquisition.poll(&mut source).unwrap();
    assert_eq!(record.readings[0].classification, Some(Classification::Steady));
    assert_eq!(record.readings[0].deviation, Some(0.0));
}

#[test]
fn test_oscillating_channel_stays_transient() {
    let mut config = single_channel_config();
    config.classifier.window_size = 10;

    let ch = ChannelId::new(2, 0);
    let mut source = ScriptedSource::new();
    // Alternating ±1 has a population deviation of exactly 1.
    source.push_values(ch, (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }));

    let mut acquisition = Acquisition::new(&config);
    let mut last = None;
    for _ in 0..20 {
        last = Some(acquisition.poll(&mut source).unwrap());
    }
    let reading = &last.unwrap().readings[0];
    assert_eq!(reading.classification, Some(Classification::Transient));
    assert!((reading.deviation.unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn test_csv_log_of_a_faulted_run() {
    let mut config = single_channel_config();
    config.classifier.window_size = 2;

    let ch = ChannelId::new(2, 0);
    let mut source = ScriptedSource::new();
    source
        .push_values(ch, [10.0, 10.1])
        .push(ch, Err(SensorFault::CommonMode))
        .push_values(ch, [10.1]);

    let mut acquisition = Acquisition::new(&config);
    let mut log = CsvLog::new(Vec::new());
    let run_log = RunLog::new();
    log.write_header(&acquisition.header()).unwrap();
    for _ in 0..4 {
        let record = acquisition.poll(&mut source).unwrap();
        log.write_record(&record).unwrap();
        run_log.record_cycle(&record);
    }

    let text = String::from_utf8(log.into_inner()).unwrap();
    let rows: Vec<Vec<&str>> = text
        .lines()
        .map(|line| line.split(',').skip(1).collect())
        .collect();

    assert_eq!(rows[0], vec!["T2.0", "T2.0_steady"]);
    assert_eq!(rows[1], vec!["10.00", "N"]);
    // Window of two: deviation of [10.0, 10.1] is 0.05.
    assert_eq!(rows[2], vec!["10.10", "Y"]);
    // The fault keeps the previous classification.
    assert_eq!(rows[3], vec!["Common Mode", "Y"]);
    assert_eq!(rows[4], vec!["10.10", "Y"]);

    let stats = run_log.stats();
    assert_eq!(stats.cycles_completed, 4);
    assert_eq!(stats.common_mode_faults, 1);
}

#[test]
fn test_jsonl_log_carries_run_metadata() {
    let config = single_channel_config();
    let ch = ChannelId::new(2, 0);
    let mut source = ScriptedSource::new();
    source.push(ch, Err(SensorFault::OpenCircuit));

    let mut acquisition = Acquisition::new(&config);
    let mut log = JsonLinesLog::new(Vec::new());
    log.write_header(&acquisition.header()).unwrap();
    let record = acquisition.poll(&mut source).unwrap();
    log.write_record(&record).unwrap();

    let text = String::from_utf8(log.into_inner()).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines[0]["run_id"], lines[1]["run_id"]);
    assert_eq!(lines[0]["columns"][1], "T2.0");
    assert_eq!(lines[1]["readings"][0]["value"]["fault"], "open_circuit");
    assert_eq!(record.readings[0].value, ReadingValue::Fault(SensorFault::OpenCircuit));
}

#[test]
fn test_sampler_feeds_rpm_estimate() {
    let mut config = single_channel_config();
    config.rpm.enabled = true;
    config.rpm.sample_count = 6;

    let tach_channel = config.rpm.channel_id();
    let mut tach = ScriptedSource::new();
    tach.push_values(tach_channel, [0.0, 0.0, 0.3, 0.3, 0.1, 0.25]);

    let sampler = RpmSampler::spawn(Box::new(tach), tach_channel, Duration::from_millis(1)).unwrap();
    let mut acquisition = Acquisition::new(&config);

    // Drain until the sampler has delivered everything and reported exhaustion.
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut delivered = 0;
    loop {
        let drained = sampler.drain(|v| {
            acquisition.ingest_rpm_sample(v);
            delivered += 1;
        });
        if drained.is_err() {
            break;
        }
        assert!(Instant::now() < deadline, "sampler did not finish");
        std::thread::sleep(Duration::from_millis(5));
    }
    sampler.stop();
    assert_eq!(delivered, 6);

    let mut source = ScriptedSource::new();
    source.push_values(ChannelId::new(2, 0), [20.0]);
    let record = acquisition.poll(&mut source).unwrap();
    assert_eq!(record.rpm, Some(20.0));
}
