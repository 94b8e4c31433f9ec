//! Alert sounds synthesized from oscillator parameters.
//!
//! A [`SoundCue`] is a set of tone layers, each an oscillator with a frequency
//! ramp and a gain automation curve, timed in seconds from the start of the
//! cue. [`SoundCue::render`] turns it into mono PCM for an [`AudioOutput`].
//!
//! [`AudioOutput`]: crate::notifier::audio::AudioOutput

use std::f32::consts::TAU;

use crate::notifier::payload::Urgency;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Sawtooth,
}

impl Waveform {
    /// Sample at `phase` measured in cycles.
    fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Sawtooth => 2.0 * (phase - (phase + 0.5).floor()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    /// One voice of the live-stream chord.
    Chime,
    /// One descending alarm sweep.
    Sweep,
    /// Low sonar ping appended to high-urgency alarms.
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    /// Jump to the value at this point.
    Set,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainPoint {
    /// Seconds from the start of the cue.
    pub time: f32,
    pub value: f32,
    /// How the curve travels from the previous point to this one.
    pub ramp: Ramp,
}

impl GainPoint {
    fn new(time: f32, value: f32, ramp: Ramp) -> Self {
        Self { time, value, ramp }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToneLayer {
    pub role: LayerRole,
    pub waveform: Waveform,
    /// Seconds from the start of the cue.
    pub start: f32,
    pub duration: f32,
    pub freq_start: f32,
    /// Reached exponentially at the end of the layer.
    pub freq_end: f32,
    pub envelope: Vec<GainPoint>,
}

impl ToneLayer {
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }

    fn frequency_at(&self, t: f32) -> f32 {
        if self.freq_start == self.freq_end || self.duration <= 0.0 {
            return self.freq_start;
        }
        let u = ((t - self.start) / self.duration).clamp(0.0, 1.0);
        self.freq_start * (self.freq_end / self.freq_start).powf(u)
    }

    fn gain_at(&self, t: f32) -> f32 {
        let points = &self.envelope;
        let Some(first) = points.first() else {
            return 0.0;
        };
        if t <= first.time {
            return first.value;
        }
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t < b.time {
                let span = (b.time - a.time).max(f32::EPSILON);
                let u = (t - a.time) / span;
                return match b.ramp {
                    Ramp::Set => a.value,
                    Ramp::Linear => a.value + (b.value - a.value) * u,
                    Ramp::Exponential if a.value > 0.0 && b.value > 0.0 => {
                        a.value * (b.value / a.value).powf(u)
                    }
                    Ramp::Exponential => a.value + (b.value - a.value) * u,
                };
            }
        }
        points.last().map(|p| p.value).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundCue {
    pub layers: Vec<ToneLayer>,
}

impl SoundCue {
    /// Seconds until the last layer stops.
    pub fn duration(&self) -> f32 {
        self.layers.iter().map(ToneLayer::end).fold(0.0, f32::max)
    }

    pub fn count(&self, role: LayerRole) -> usize {
        self.layers.iter().filter(|l| l.role == role).count()
    }

    pub fn has(&self, role: LayerRole) -> bool {
        self.count(role) > 0
    }

    /// Mix every layer into mono samples in `[-1.0, 1.0]`.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let sr = sample_rate as f32;
        let total = (self.duration() * sr).ceil() as usize;
        let mut out = vec![0.0f32; total];

        for layer in &self.layers {
            let first = (layer.start * sr).round() as usize;
            let last = ((layer.end() * sr).round() as usize).min(total);
            let mut phase = 0.0f32;
            for (i, slot) in out.iter_mut().enumerate().take(last).skip(first) {
                let t = i as f32 / sr;
                *slot += layer.waveform.sample(phase) * layer.gain_at(t);
                phase = (phase + layer.frequency_at(t) / sr).fract();
            }
        }

        for s in &mut out {
            *s = s.clamp(-1.0, 1.0);
        }
        out
    }
}

/// E5 / G5 / B5
const CHIME_FREQUENCIES: [f32; 3] = [659.25, 783.99, 987.77];
const CHIME_STAGGER: f32 = 0.05;
const CHIME_LENGTH: f32 = 1.5;

/// Bell-like chord: three sine voices with staggered onsets decaying over 1.5s.
pub fn live_stream_chime() -> SoundCue {
    let layers = CHIME_FREQUENCIES
        .iter()
        .enumerate()
        .map(|(i, &freq)| {
            let start = i as f32 * CHIME_STAGGER;
            ToneLayer {
                role: LayerRole::Chime,
                waveform: Waveform::Sine,
                start,
                duration: CHIME_LENGTH - start,
                freq_start: freq,
                freq_end: freq,
                envelope: vec![
                    GainPoint::new(0.0, 0.0, Ramp::Set),
                    GainPoint::new(0.01, 0.1 - i as f32 * 0.02, Ramp::Linear),
                    GainPoint::new(CHIME_LENGTH, 0.01, Ramp::Exponential),
                ],
            }
        })
        .collect();

    SoundCue { layers }
}

const SWEEP_SPACING: f32 = 0.6;
const SWEEP_LENGTH: f32 = 0.5;
const SWEEP_PEAK: f32 = 0.2;
const PING_LENGTH: f32 = 0.3;

pub fn sweep_count(urgency: Urgency) -> usize {
    match urgency {
        Urgency::Low => 1,
        Urgency::Medium => 2,
        Urgency::High => 3,
    }
}

/// Descending sawtooth "dive" alarm, repeated more often for more urgent
/// requests. High urgency ends with a low sine ping.
pub fn help_request_alarm(urgency: Urgency) -> SoundCue {
    let repeats = sweep_count(urgency);
    let mut layers: Vec<ToneLayer> = (0..repeats)
        .map(|i| {
            let start = i as f32 * SWEEP_SPACING;
            ToneLayer {
                role: LayerRole::Sweep,
                waveform: Waveform::Sawtooth,
                start,
                duration: SWEEP_LENGTH,
                freq_start: 800.0,
                freq_end: 400.0,
                envelope: vec![
                    GainPoint::new(start, 0.0, Ramp::Set),
                    GainPoint::new(start + 0.05, SWEEP_PEAK, Ramp::Linear),
                    GainPoint::new(start + SWEEP_LENGTH - 0.1, SWEEP_PEAK, Ramp::Linear),
                    GainPoint::new(start + SWEEP_LENGTH, 0.01, Ramp::Exponential),
                ],
            }
        })
        .collect();

    if urgency == Urgency::High {
        let start = repeats as f32 * SWEEP_SPACING;
        layers.push(ToneLayer {
            role: LayerRole::Ping,
            waveform: Waveform::Sine,
            start,
            duration: PING_LENGTH,
            freq_start: 200.0,
            freq_end: 200.0,
            envelope: vec![
                GainPoint::new(start, 0.15, Ramp::Set),
                GainPoint::new(start + PING_LENGTH, 0.01, Ramp::Exponential),
            ],
        });
    }

    SoundCue { layers }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chime_is_three_staggered_sines() {
        let cue = live_stream_chime();
        assert_eq!(cue.count(LayerRole::Chime), 3);
        assert!(cue.layers.iter().all(|l| l.waveform == Waveform::Sine));
        let starts: Vec<f32> = cue.layers.iter().map(|l| l.start).collect();
        assert!(starts.windows(2).all(|w| w[1] > w[0]));
        assert!((cue.duration() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn alarm_scales_with_urgency() {
        let low = help_request_alarm(Urgency::Low);
        let medium = help_request_alarm(Urgency::Medium);
        let high = help_request_alarm(Urgency::High);

        assert_eq!(low.count(LayerRole::Sweep), 1);
        assert_eq!(medium.count(LayerRole::Sweep), 2);
        assert_eq!(high.count(LayerRole::Sweep), 3);

        assert!(high.has(LayerRole::Ping));
        assert!(!medium.has(LayerRole::Ping));
        assert!(!low.has(LayerRole::Ping));

        let ping = high.layers.iter().find(|l| l.role == LayerRole::Ping).unwrap();
        let last_sweep_end = high
            .layers
            .iter()
            .filter(|l| l.role == LayerRole::Sweep)
            .map(ToneLayer::end)
            .fold(0.0, f32::max);
        assert!(ping.start >= last_sweep_end);
    }

    #[test]
    fn sweeps_descend() {
        let cue = help_request_alarm(Urgency::Low);
        let sweep = &cue.layers[0];
        assert_eq!(sweep.waveform, Waveform::Sawtooth);
        assert!(sweep.frequency_at(sweep.start) > sweep.frequency_at(sweep.end()));
        assert!((sweep.frequency_at(sweep.end()) - 400.0).abs() < 0.5);
    }

    #[test]
    fn envelope_decays_after_attack() {
        let cue = live_stream_chime();
        let voice = &cue.layers[0];
        assert_eq!(voice.gain_at(0.0), 0.0);
        assert!((voice.gain_at(0.01) - 0.1).abs() < 1e-4);
        assert!(voice.gain_at(0.5) < voice.gain_at(0.1));
        assert!((voice.gain_at(1.5) - 0.01).abs() < 1e-4);
    }

    #[test]
    fn render_produces_bounded_audible_samples() {
        let cue = help_request_alarm(Urgency::High);
        let samples = cue.render(8_000);
        assert_eq!(samples.len(), (cue.duration() * 8_000.0).ceil() as usize);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(samples.iter().any(|s| s.abs() > 0.05));
    }
}
