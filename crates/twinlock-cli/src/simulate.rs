//! `twinlock simulate`.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use tokio::{
    io::{AsyncBufReadExt, BufReader, duplex},
    sync::watch,
};
use tracing::{info, warn};
use twinlock_controller::{
    AuthorityController, ControllerConfig, ControllerError, UiController, VirtualLcd,
};
use twinlock_core::{
    Credential,
    constants::{
        CPU_FREQUENCY_HZ, CREDENTIAL_ADDRESS, INITIALIZED_FLAG, INITIALIZED_FLAG_ADDRESS,
        STORAGE_TERMINATOR,
    },
};
use twinlock_hardware::{
    HardwareError,
    mock::{MockBuzzer, MockEeprom, MockKeypad, MockKeypadHandle, MockMotor},
    timer::ClockedTimerBank,
};
use twinlock_protocol::{Link, LinkConfig};
use twinlock_storage::CredentialStore;

/// Simulated EEPROM size in bytes.
const EEPROM_SIZE: usize = 512;

/// Serial link buffer between the two nodes.
const LINK_BUFFER: usize = 64;

pub struct Options {
    pub config: Option<PathBuf>,
    pub time_scale: f64,
    pub wait_timeout_ms: Option<u64>,
    pub keys: Vec<String>,
    pub preset: Option<String>,
}

pub async fn run(options: Options) -> Result<()> {
    let mut config = match &options.config {
        Some(path) => ControllerConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ControllerConfig::default(),
    };
    if let Some(ms) = options.wait_timeout_ms {
        config.link = LinkConfig::bounded(Duration::from_millis(ms));
    }
    config.validate().context("invalid configuration")?;

    let eeprom = MockEeprom::new(EEPROM_SIZE);
    if let Some(preset) = &options.preset {
        preload_credential(&eeprom, preset)?;
    }

    let driver = Arc::new(ClockedTimerBank::new(CPU_FREQUENCY_HZ, options.time_scale)?);
    let (authority_end, ui_end) = duplex(LINK_BUFFER);
    let (motor, _motor) = MockMotor::new();
    let (buzzer, _buzzer) = MockBuzzer::new();
    let (keypad, keys) = MockKeypad::new();

    let mut authority = AuthorityController::new(
        Link::new(authority_end, config.link).with_name("authority"),
        CredentialStore::new(eeprom),
        driver,
        motor,
        buzzer,
        &config,
    )?;

    let lcd = VirtualLcd::new();
    tokio::spawn(log_frames(lcd.subscribe()));
    let mut ui = UiController::new(
        Link::new(ui_end, config.link).with_name("ui"),
        keypad,
        lcd,
        &config,
    );

    if options.keys.is_empty() {
        info!("Reading keys from stdin, one line per entry");
        tokio::spawn(feed_stdin(keys));
    } else {
        tokio::spawn(feed_script(keys, options.keys));
    }

    info!(
        time_scale = options.time_scale,
        state = %authority.state(),
        "Simulation started"
    );

    let outcome = tokio::select! {
        result = async { tokio::try_join!(authority.run(), ui.run()).map(|_| ()) } => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            Ok(())
        }
    };

    match outcome {
        Ok(()) => Ok(()),
        Err(ControllerError::Hardware(HardwareError::Disconnected { .. })) => {
            info!("Keypad input exhausted, stopping");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn preload_credential(eeprom: &MockEeprom, preset: &str) -> Result<()> {
    let credential: Credential = preset
        .parse()
        .with_context(|| format!("invalid preset credential {preset:?}"))?;
    if credential.is_empty() {
        bail!("preset credential must not be empty");
    }

    let mut string = credential.as_bytes().to_vec();
    string.push(STORAGE_TERMINATOR);
    eeprom.preload(CREDENTIAL_ADDRESS, &string);
    eeprom.preload(INITIALIZED_FLAG_ADDRESS, &[INITIALIZED_FLAG]);
    info!(len = credential.len(), "Preset credential stored");
    Ok(())
}

async fn feed_script(keys: MockKeypadHandle, lines: Vec<String>) {
    for line in lines {
        if let Err(e) = keys.send_code(&line).await {
            warn!(error = %e, line = %line, "Scripted keys rejected");
            return;
        }
    }
}

async fn feed_stdin(keys: MockKeypadHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Err(e) = keys.send_code(line.trim_end()).await {
                    warn!(error = %e, "Keys rejected");
                }
            }
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Stdin closed");
                return;
            }
        }
    }
}

async fn log_frames(mut frames: watch::Receiver<Vec<String>>) {
    while frames.changed().await.is_ok() {
        let frame = frames.borrow_and_update().clone();
        info!(
            top = frame.first().map(String::as_str).unwrap_or_default(),
            bottom = frame.get(1).map(String::as_str).unwrap_or_default(),
            "LCD"
        );
    }
}
