//! Host behaviour through the public API.

use us_engine::{EngineConfig, CYCLE_LEN};
use us_master::{BankFile, Controller, SynthConfig};

const NOTE: [u8; 3] = [0x90, 64, 110];

#[test]
fn offline_render_is_deterministic() {
    let c = Controller::new(SynthConfig::default()).unwrap();
    let a = c.render(&NOTE, Some(0.2)).unwrap();
    let b = c.render(&NOTE, Some(0.2)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn other_channel_is_ignored() {
    let config = SynthConfig { listen_channel: 3, ..SynthConfig::default() };
    let c = Controller::new(config).unwrap();
    let rendered = c.render(&NOTE, Some(0.2)).unwrap();
    assert!(rendered.samples.iter().all(|&s| s == 0x8000));
}

#[test]
fn custom_bank_from_disk() {
    let path = std::env::temp_dir().join(format!("us-master-{}.uswb", std::process::id()));
    BankFile::builtin().unwrap().save(&path).unwrap();
    let config = SynthConfig { bank: Some(path.clone()), ..SynthConfig::default() };
    let c = Controller::new(config).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(c.bank().wavetable_count(), 4);

    let rendered = c.render(&NOTE, Some(CYCLE_LEN as f32 * 100.0 / 28_000.0)).unwrap();
    assert!(rendered.samples.iter().any(|&s| s != 0x8000));
}

#[test]
fn engine_config_mirrors_host_config() {
    let config = SynthConfig { voices: 2, initial_program: 1, ..SynthConfig::default() };
    assert_eq!(
        config.engine(),
        EngineConfig { voices: 2, initial_program: 1, ..EngineConfig::default() }
    );
}
