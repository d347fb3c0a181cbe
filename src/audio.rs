//! Audio feedback for graph interaction.
//!
//! `AudioUnits` is owned by one graph lifecycle instance. The output device
//! is opened lazily, only after a user gesture, and closed exactly once when
//! the instance is torn down. Any device failure turns cues off for the rest
//! of the instance; the graph keeps working silently.
//!
//! Tones are synthesized in-process by `ToneSource`. With the `sound` feature
//! they are played through rodio; without it there is no system device.

use std::f32::consts::TAU;
use std::fmt;

/// Feedback sounds the graph can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Pointer entered a node
    Hover,
    /// Node clicked (concept toggled)
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    /// Pitch-dropping drum-like tone
    Membrane,
}

/// ADSR envelope, times in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub note: &'static str,
    pub frequency_hz: f32,
    pub duration_secs: f32,
    pub waveform: Waveform,
    pub envelope: Envelope,
}

/// An eighth note at 120 bpm
const EIGHTH_NOTE_SECS: f32 = 0.25;

/// Octaves the membrane pitch falls through, and how fast
const MEMBRANE_OCTAVES: f32 = 4.0;
const MEMBRANE_PITCH_DECAY_SECS: f32 = 0.05;

/// Peak output level of a single cue
const CUE_GAIN: f32 = 0.3;

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
impl Envelope {
    /// Level at `t` seconds for a note held for `hold` seconds
    pub fn amplitude(&self, t: f32, hold: f32) -> f32 {
        let held = |t: f32| {
            if t < self.attack {
                t / self.attack.max(f32::EPSILON)
            } else if t < self.attack + self.decay {
                let k = (t - self.attack) / self.decay.max(f32::EPSILON);
                1.0 + (self.sustain - 1.0) * k
            } else {
                self.sustain
            }
        };
        if t < 0.0 {
            0.0
        } else if t < hold {
            held(t)
        } else {
            let k = (t - hold) / self.release.max(f32::EPSILON);
            if k >= 1.0 {
                0.0
            } else {
                held(hold) * (1.0 - k)
            }
        }
    }
}

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
impl Tone {
    /// Held note plus its release tail
    pub fn total_secs(&self) -> f32 {
        self.duration_secs + self.envelope.release
    }

    /// Instantaneous pitch at `t` seconds
    pub fn frequency_at(&self, t: f32) -> f32 {
        match self.waveform {
            Waveform::Sine => self.frequency_hz,
            Waveform::Membrane => {
                let octaves = MEMBRANE_OCTAVES * (-t.max(0.0) / MEMBRANE_PITCH_DECAY_SECS).exp();
                self.frequency_hz * octaves.exp2()
            }
        }
    }
}

/// Mono samples of one tone at a fixed rate
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
#[derive(Debug, Clone)]
pub struct ToneSource {
    tone: Tone,
    sample_rate: u32,
    index: u64,
    len: u64,
    phase: f32,
}

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
impl ToneSource {
    pub fn new(tone: Tone, sample_rate: u32) -> Self {
        Self {
            tone,
            sample_rate,
            index: 0,
            len: (tone.total_secs() * sample_rate as f32).ceil() as u64,
            phase: 0.0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn remaining(&self) -> usize {
        (self.len - self.index) as usize
    }
}

impl Iterator for ToneSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.index >= self.len {
            return None;
        }
        let t = self.index as f32 / self.sample_rate as f32;
        let sample = self.phase.sin() * self.tone.envelope.amplitude(t, self.tone.duration_secs) * CUE_GAIN;

        // Integrate the pitch so the membrane sweep stays continuous
        self.phase = (self.phase + TAU * self.tone.frequency_at(t) / self.sample_rate as f32) % TAU;
        self.index += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl Cue {
    pub fn tone(self) -> Tone {
        match self {
            Cue::Hover => Tone {
                note: "C5",
                frequency_hz: 523.25,
                duration_secs: EIGHTH_NOTE_SECS,
                waveform: Waveform::Sine,
                envelope: Envelope {
                    attack: 0.005,
                    decay: 0.1,
                    sustain: 0.3,
                    release: 1.0,
                },
            },
            Cue::Click => Tone {
                note: "C3",
                frequency_hz: 130.81,
                duration_secs: EIGHTH_NOTE_SECS,
                waveform: Waveform::Membrane,
                envelope: Envelope {
                    attack: 0.001,
                    decay: 0.4,
                    sustain: 0.01,
                    release: 1.4,
                },
            },
        }
    }
}

/// Sound device seam
pub trait AudioOutput {
    fn start(&mut self, tone: &Tone) -> Result<(), String>;
    /// Cut any tone that is still sounding
    fn stop_all(&mut self);
    fn close(&mut self);
}

/// Opens the output device; called at most once per `AudioUnits`
pub type OutputFactory = Box<dyn FnMut() -> Result<Box<dyn AudioOutput>, String>>;

/// The default system output device
#[cfg(feature = "sound")]
pub fn system_output() -> Result<Box<dyn AudioOutput>, String> {
    Ok(Box::new(device::RodioOutput::open()?))
}

/// Built without the `sound` feature: there is never a device
#[cfg(not(feature = "sound"))]
pub fn system_output() -> Result<Box<dyn AudioOutput>, String> {
    Err("built without audio output support".to_string())
}

#[cfg(feature = "sound")]
mod device {
    use super::{AudioOutput, Tone, ToneSource};
    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use std::time::Duration;

    const SAMPLE_RATE: u32 = 44_100;

    impl Source for ToneSource {
        fn current_frame_len(&self) -> Option<usize> {
            Some(self.remaining())
        }

        fn channels(&self) -> u16 {
            1
        }

        fn sample_rate(&self) -> u32 {
            ToneSource::sample_rate(self)
        }

        fn total_duration(&self) -> Option<Duration> {
            Some(Duration::from_secs_f32(
                self.remaining() as f32 / ToneSource::sample_rate(self) as f32,
            ))
        }
    }

    /// One sink per sounding tone so cues overlap
    pub struct RodioOutput {
        // Dropping the stream silences every sink
        stream: Option<OutputStream>,
        handle: OutputStreamHandle,
        sinks: Vec<Sink>,
    }

    impl RodioOutput {
        pub fn open() -> Result<Self, String> {
            let (stream, handle) =
                OutputStream::try_default().map_err(|e| format!("Failed to open audio device: {}", e))?;
            tracing::info!("Opened audio output");
            Ok(Self {
                stream: Some(stream),
                handle,
                sinks: Vec::new(),
            })
        }
    }

    impl AudioOutput for RodioOutput {
        fn start(&mut self, tone: &Tone) -> Result<(), String> {
            if self.stream.is_none() {
                return Err("audio output already closed".to_string());
            }
            self.sinks.retain(|sink| !sink.empty());
            let sink = Sink::try_new(&self.handle).map_err(|e| format!("Failed to start tone: {}", e))?;
            sink.append(ToneSource::new(*tone, SAMPLE_RATE));
            self.sinks.push(sink);
            Ok(())
        }

        fn stop_all(&mut self) {
            for sink in self.sinks.drain(..) {
                sink.stop();
            }
        }

        fn close(&mut self) {
            self.stop_all();
            self.stream = None;
            tracing::info!("Closed audio output");
        }
    }
}

pub struct AudioUnits {
    factory: Option<OutputFactory>,
    output: Option<Box<dyn AudioOutput>>,
    permitted: bool,
    failed: bool,
    disposed: bool,
}

impl fmt::Debug for AudioUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioUnits")
            .field("open", &self.output.is_some())
            .field("permitted", &self.permitted)
            .field("failed", &self.failed)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl AudioUnits {
    pub fn new(factory: OutputFactory) -> Self {
        Self {
            factory: Some(factory),
            output: None,
            permitted: false,
            failed: false,
            disposed: false,
        }
    }

    /// Units with no device at all
    pub fn silent() -> Self {
        Self {
            factory: None,
            output: None,
            permitted: false,
            failed: false,
            disposed: false,
        }
    }

    /// Record that a user gesture happened; output may now be opened
    pub fn grant_permission(&mut self) {
        self.permitted = true;
    }

    pub fn is_open(&self) -> bool {
        self.output.is_some()
    }

    pub fn play(&mut self, cue: Cue) {
        let tone = cue.tone();
        let Some(output) = self.ensure_output() else {
            tracing::debug!("Audio cue {:?} ({}) not played: no output", cue, tone.note);
            return;
        };
        if let Err(e) = output.start(&tone) {
            tracing::warn!("Audio output failed, disabling cues: {}", e);
            self.fail();
        }
    }

    /// Stop anything still sounding
    pub fn release(&mut self) {
        if let Some(output) = self.output.as_mut() {
            output.stop_all();
        }
    }

    /// Close the device. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(mut output) = self.output.take() {
            output.stop_all();
            output.close();
            tracing::debug!("Audio units disposed");
        }
        self.factory = None;
    }

    fn ensure_output(&mut self) -> Option<&mut Box<dyn AudioOutput>> {
        if self.disposed || self.failed || !self.permitted {
            return None;
        }
        if self.output.is_none() {
            let factory = self.factory.as_mut()?;
            match factory() {
                Ok(output) => self.output = Some(output),
                Err(e) => {
                    tracing::warn!("Audio unavailable, continuing without cues: {}", e);
                    self.fail();
                    return None;
                }
            }
        }
        self.output.as_mut()
    }

    fn fail(&mut self) {
        self.failed = true;
        if let Some(mut output) = self.output.take() {
            output.close();
        }
    }
}

impl Drop for AudioUnits {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Everything a recording output saw
    #[derive(Debug, Default)]
    pub struct AudioLog {
        pub opened: usize,
        pub started: Vec<&'static str>,
        pub stops: usize,
        pub closed: usize,
    }

    pub struct RecordingOutput {
        log: Rc<RefCell<AudioLog>>,
        fail_on_start: bool,
    }

    impl AudioOutput for RecordingOutput {
        fn start(&mut self, tone: &Tone) -> Result<(), String> {
            if self.fail_on_start {
                return Err("device lost".into());
            }
            self.log.borrow_mut().started.push(tone.note);
            Ok(())
        }

        fn stop_all(&mut self) {
            self.log.borrow_mut().stops += 1;
        }

        fn close(&mut self) {
            self.log.borrow_mut().closed += 1;
        }
    }

    pub fn recording_factory(log: Rc<RefCell<AudioLog>>, fail_on_start: bool) -> OutputFactory {
        Box::new(move || -> Result<Box<dyn AudioOutput>, String> {
            log.borrow_mut().opened += 1;
            Ok(Box::new(RecordingOutput {
                log: log.clone(),
                fail_on_start,
            }))
        })
    }
}
