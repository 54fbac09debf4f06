use anyhow::{anyhow, Context, Result};
use rodio::source::SineWave;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

use crate::config::AudioConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbientState {
    On,
    Off,
}

/// The continuous low tone: a few sines summed, low-passed, at a quiet level.
#[derive(Debug, Clone, PartialEq)]
pub struct DroneTone {
    pub frequencies_hz: Vec<f32>,
    pub lowpass_hz: u32,
    pub gain: f32,
}

impl DroneTone {
    pub fn from_config(config: &AudioConfig) -> Self {
        Self {
            frequencies_hz: config.frequencies_hz.clone(),
            lowpass_hz: config.lowpass_hz,
            gain: config.base_gain.clamp(0.0, 1.0),
        }
    }
}

/// Audio output the drone plays through. `start` runs once, on first activation.
pub trait DroneBackend {
    fn start(&mut self, tone: &DroneTone) -> Result<()>;
    fn resume(&mut self, gain: f32) -> Result<()>;
    fn suspend(&mut self) -> Result<()>;
}

/// The user-facing on/off switch over a drone backend.
pub struct AmbientAudio<B: DroneBackend> {
    backend: B,
    tone: DroneTone,
    state: AmbientState,
    started: bool,
}

impl<B: DroneBackend> AmbientAudio<B> {
    pub fn new(backend: B, tone: DroneTone) -> Self {
        Self { backend, tone, state: AmbientState::Off, started: false }
    }

    pub fn state(&self) -> AmbientState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == AmbientState::On
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn toggle(&mut self) -> AmbientState {
        let enable = !self.is_on();
        self.set_enabled(enable)
    }

    /// Activation failures leave the switch off; nothing else is affected.
    pub fn set_enabled(&mut self, enabled: bool) -> AmbientState {
        if enabled == self.is_on() {
            return self.state;
        }
        if enabled {
            match self.activate() {
                Ok(()) => self.state = AmbientState::On,
                Err(err) => {
                    log::warn!("ambient audio unavailable: {err:#}");
                    self.state = AmbientState::Off;
                }
            }
        } else {
            if let Err(err) = self.backend.suspend() {
                log::warn!("failed to suspend ambient audio: {err:#}");
            }
            self.state = AmbientState::Off;
        }
        log::debug!("ambient audio {:?}", self.state);
        self.state
    }

    fn activate(&mut self) -> Result<()> {
        if !self.started {
            self.backend.start(&self.tone)?;
            self.started = true;
        }
        self.backend.resume(self.tone.gain)
    }
}

/// Plays the drone on the default output device.
#[derive(Default)]
pub struct RodioDrone {
    output: Option<(OutputStream, OutputStreamHandle, Sink)>,
}

impl RodioDrone {
    pub fn new() -> Self {
        Self::default()
    }

    fn sink(&self) -> Result<&Sink> {
        self.output.as_ref().map(|(_, _, sink)| sink).ok_or_else(|| anyhow!("drone has not been started"))
    }
}

impl DroneBackend for RodioDrone {
    fn start(&mut self, tone: &DroneTone) -> Result<()> {
        let mut voices = tone
            .frequencies_hz
            .iter()
            .map(|hz| Box::new(SineWave::new(*hz)) as Box<dyn Source<Item = f32> + Send>);
        let first = voices.next().ok_or_else(|| anyhow!("drone needs at least one frequency"))?;
        let drone = voices.fold(first, |mixed, voice| Box::new(mixed.mix(voice)) as Box<dyn Source<Item = f32> + Send>);

        let (stream, handle) = OutputStream::try_default().context("No audio output device")?;
        let sink = Sink::try_new(&handle).context("Failed to open audio sink")?;
        sink.pause();
        sink.set_volume(0.0);
        sink.append(drone.low_pass(tone.lowpass_hz));
        self.output = Some((stream, handle, sink));
        Ok(())
    }

    fn resume(&mut self, gain: f32) -> Result<()> {
        let sink = self.sink()?;
        sink.set_volume(gain);
        sink.play();
        Ok(())
    }

    fn suspend(&mut self) -> Result<()> {
        let sink = self.sink()?;
        sink.set_volume(0.0);
        sink.pause();
        Ok(())
    }
}
