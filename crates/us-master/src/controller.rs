//! Drives the engine the way the firmware's main loop and timer do.
//!
//! The render loop waits on the sample mailbox, ticks the synth once per
//! consumed sample and watches the tick's events. The timer side pulls
//! the sample, feeds the DAC sink and clocks the serial line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ringbuf::HeapCons;
use spin_sleep::SpinSleeper;
use us_audio::{AudioError, BufferSink, CpalSink, SampleSink};
use us_engine::{EngineConfig, MidiEvent, SampleMailbox, Synth, SynthEvent};
use us_formats::BankFile;
use us_ir::DataBank;

use crate::config::SynthConfig;
use crate::dac::Dac;
use crate::error::{ConfigError, HostError};
use crate::serial::{drain, rx_ring, TimerTask};

/// What happened on the control side of a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// Bytes echoed on the serial transmitter.
    pub tx: Vec<u8>,
    /// Times the synth was rebuilt after a reset request.
    pub resets: usize,
    /// Input bytes lost to a full receive ring.
    pub overruns: usize,
}

/// Output of an offline render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendered {
    pub samples: Vec<u16>,
    pub report: Report,
}

/// Headless tone generator host: a validated configuration and its bank.
pub struct Controller {
    config: SynthConfig,
    bank: BankFile,
}

impl Controller {
    pub fn new(config: SynthConfig) -> Result<Self, HostError> {
        config.validate()?;
        let bank = match &config.bank {
            Some(path) => {
                let bank = BankFile::load(path)?;
                tracing::info!(
                    path = %path.display(),
                    waveforms = bank.waveform_count(),
                    wavetables = bank.wavetable_count(),
                    "loaded bank"
                );
                bank
            }
            None => {
                let bank = BankFile::builtin()?;
                if bank.wavetable_size as usize != config.wavetable_size {
                    return Err(ConfigError::invalid(
                        "wavetable_size",
                        format!("built-in bank uses {} slots", bank.wavetable_size),
                    )
                    .into());
                }
                bank
            }
        };
        Ok(Self { config, bank })
    }

    pub fn with_bank(config: SynthConfig, bank: BankFile) -> Result<Self, HostError> {
        config.validate()?;
        Ok(Self { config, bank })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn bank(&self) -> &BankFile {
        &self.bank
    }

    /// Sample periods covered by `input` plus the configured tail, or
    /// exactly `seconds` when given.
    pub fn render_length(&self, input_len: usize, seconds: Option<f32>) -> usize {
        let fs = self.config.sample_rate as f32;
        match seconds {
            Some(s) => (s.max(0.0) * fs) as usize,
            None => {
                input_len * self.config.samples_per_byte() as usize + (self.config.tail_seconds * fs) as usize
            }
        }
    }

    /// Render offline with timer and render loop in lockstep.
    pub fn render(&self, input: &[u8], seconds: Option<f32>) -> Result<Rendered, HostError> {
        let total = self.render_length(input.len(), seconds);
        let mailbox = SampleMailbox::new();
        let (line, rx) = rx_ring(input.iter().copied(), self.config.samples_per_byte());
        let mut timer = TimerTask::new(&mailbox, Dac::new(self.config.dac_bits), line);
        let mut main = MainLoop::new(self.bank.as_bank(), self.config.engine(), rx);
        let mut sink = BufferSink::with_capacity(self.config.sample_rate, total);

        tracing::debug!(bytes = input.len(), samples = total, "offline render");
        sink.start()?;
        main.render_next(&mailbox);
        for _ in 0..total {
            timer.fire(&mut sink);
            main.poll(&mailbox);
        }
        sink.stop()?;

        let mut report = main.finish();
        report.overruns = timer.line().overruns();
        Ok(Rendered { samples: sink.into_samples(), report })
    }

    /// Play through the default audio device in real time.
    ///
    /// The render loop runs on a worker thread; the timer stays on the
    /// calling thread, which owns the audio stream.
    pub fn play(&self, input: &[u8], seconds: Option<f32>) -> Result<Report, HostError> {
        let total = self.render_length(input.len(), seconds);
        let mut sink = CpalSink::new(self.config.sample_rate)?;
        let mailbox = SampleMailbox::new();
        let stop = AtomicBool::new(false);
        let (line, rx) = rx_ring(input.iter().copied(), self.config.samples_per_byte());
        let mut timer = TimerTask::new(&mailbox, Dac::new(self.config.dac_bits), line);
        let bank = self.bank.as_bank();
        let engine = self.config.engine();
        let period = Duration::from_secs_f64(1.0 / self.config.sample_rate as f64);

        tracing::info!(seconds = total as f32 / self.config.sample_rate as f32, "playing");
        std::thread::scope(|s| {
            let (mailbox, stop) = (&mailbox, &stop);
            let worker = s.spawn(move || {
                let mut main = MainLoop::new(bank, engine, rx);
                main.render_next(mailbox);
                while !stop.load(Ordering::Relaxed) {
                    if !main.poll(mailbox) {
                        std::hint::spin_loop();
                    }
                }
                main.finish()
            });

            let paced = run_timer(&mut timer, &mut sink, total, period);
            stop.store(true, Ordering::Relaxed);
            let mut report = worker.join().map_err(|_| HostError::Thread("render"))?;
            paced?;

            report.overruns = timer.line().overruns();
            if sink.dropped() > 0 {
                tracing::warn!(dropped = sink.dropped(), "samples dropped by the audio device");
            }
            Ok(report)
        })
    }
}

fn run_timer(
    timer: &mut TimerTask<'_>,
    sink: &mut CpalSink,
    total: usize,
    period: Duration,
) -> Result<(), AudioError> {
    let sleeper = SpinSleeper::default();
    sink.start()?;
    let mut deadline = Instant::now();
    for _ in 0..total {
        timer.fire(sink);
        deadline += period;
        let now = Instant::now();
        if deadline > now {
            sleeper.sleep(deadline - now);
        }
    }
    // let the device drain what is queued
    while sink.queued() > 0 {
        sleeper.sleep(period * 64);
    }
    sink.stop()
}

/// The firmware main loop: one synth tick per consumed sample.
struct MainLoop<'a> {
    bank: DataBank<'a>,
    engine: EngineConfig,
    synth: Synth<'a>,
    rx: HeapCons<u8>,
    report: Report,
}

impl<'a> MainLoop<'a> {
    fn new(bank: DataBank<'a>, engine: EngineConfig, rx: HeapCons<u8>) -> Self {
        let synth = Synth::new(bank, &engine);
        Self { bank, engine, synth, rx, report: Report::default() }
    }

    /// Render the next sample if the timer took the last one.
    fn poll(&mut self, mailbox: &SampleMailbox) -> bool {
        if !mailbox.take_consumed() {
            return false;
        }
        self.render_next(mailbox);
        true
    }

    fn render_next(&mut self, mailbox: &SampleMailbox) {
        let tick = self.synth.tick(&mut drain(&mut self.rx));
        mailbox.publish(tick.sample);
        for event in &tick.events {
            self.observe(event);
        }
        if self.synth.reset_requested() {
            self.report.resets += 1;
            tracing::warn!(resets = self.report.resets, "reset requested, rebuilding synth");
            self.synth = Synth::new(self.bank, &self.engine);
        }
    }

    fn observe(&mut self, event: &SynthEvent) {
        match *event {
            SynthEvent::Midi(MidiEvent::NoteOn { note, velocity, voices }) => {
                tracing::debug!(note, velocity, voices = %format_args!("{:04b}", voices), "note on")
            }
            SynthEvent::Midi(MidiEvent::NoteOff { note }) => tracing::debug!(note, "note off"),
            SynthEvent::Midi(MidiEvent::ControlChange { index, value }) => {
                tracing::debug!(index, value, "control change")
            }
            SynthEvent::Midi(MidiEvent::Reset) => tracing::warn!("reset byte received"),
            SynthEvent::Midi(other) => tracing::debug!(event = ?other, "midi"),
            SynthEvent::ProgramLoaded(program) => tracing::info!(program, "program loaded"),
            SynthEvent::ProgramMissing(program) => {
                tracing::info!(program, "program not in bank, defaults applied")
            }
            SynthEvent::Ping(byte) => {
                tracing::debug!(byte, "ping");
                self.report.tx.push(byte);
            }
            SynthEvent::LfoSync => tracing::debug!("lfo sync"),
            SynthEvent::WavetableLoaded { layer, index } => tracing::info!(layer, index, "wavetable loaded"),
            SynthEvent::WavetableRejected { layer, index } => {
                tracing::warn!(layer, index, "wavetable rejected, keeping previous table")
            }
            SynthEvent::Marker(slot) => tracing::trace!(slot, "marker"),
        }
    }

    fn finish(self) -> Report {
        self.report
    }
}
