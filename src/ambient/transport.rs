//! Transport: mode switching, crossfades and chain ownership.
//!
//! The transport lives on the render side of the engine: it owns the master
//! chain and at most one live [`SoundChain`], and advances its phase on the
//! audio clock. The fade-out disposal timer is a frame deadline stored in
//! [`Phase::FadingOut`]; replacing the phase cancels it.

use crate::config::EngineConfig;
use crate::error::Result;

use super::backend::OutputConfig;
use super::chain::SoundChain;
use super::master::MasterChain;
use super::mode::SoundMode;

/// Output volume as a percentage, 0 to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Volume(u8);

impl Volume {
    pub const MUTE: Volume = Volume(0);
    pub const FULL: Volume = Volume(100);

    /// Percentages above 100 are clamped.
    pub fn from_percent(percent: u32) -> Self {
        Volume(percent.min(100) as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    pub fn is_muted(self) -> bool {
        self.0 == 0
    }

    /// Linear gain for this volume, `max_gain` at 100 %.
    pub fn coefficient(self, max_gain: f64) -> f64 {
        max_gain * f64::from(self.0) / 100.0
    }
}

/// Where the transport is in a mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FadingIn { mode: SoundMode, until: u64 },
    Playing(SoundMode),
    /// `next` is started once the chain is disposed at `dispose_at`;
    /// `SoundMode::None` means stop.
    FadingOut { mode: SoundMode, next: SoundMode, dispose_at: u64 },
}

pub struct Transport {
    config: EngineConfig,
    output: OutputConfig,
    sample_rate: f64,
    master: MasterChain,
    chain: Option<SoundChain>,
    phase: Phase,
    clock: u64,
    volume: Volume,
    chains_built: u64,
}

impl Transport {
    pub fn new(config: EngineConfig, output: OutputConfig, volume: Volume) -> Self {
        let sample_rate = f64::from(output.sample_rate);
        Transport {
            master: MasterChain::new(config.limiter_threshold_db, sample_rate),
            config,
            output,
            sample_rate,
            chain: None,
            phase: Phase::Idle,
            clock: 0,
            volume,
            chains_built: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Mode of the live chain; the outgoing mode while fading out.
    pub fn current_mode(&self) -> SoundMode {
        match self.phase {
            Phase::Idle => SoundMode::None,
            Phase::FadingIn { mode, .. }
            | Phase::Playing(mode)
            | Phase::FadingOut { mode, .. } => mode,
        }
    }

    /// Mode the transport will settle on once pending fades complete.
    pub fn target_mode(&self) -> SoundMode {
        match self.phase {
            Phase::FadingOut { next, .. } => next,
            _ => self.current_mode(),
        }
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn master_gain(&self) -> f64 {
        self.master.gain.value()
    }

    pub fn master_gain_target(&self) -> f64 {
        self.master.gain.target()
    }

    pub fn live_node_count(&self) -> usize {
        self.chain.as_ref().map_or(0, SoundChain::node_count)
    }

    pub fn live_generator_count(&self) -> usize {
        self.chain.as_ref().map_or(0, SoundChain::running_generators)
    }

    /// Frames rendered since initialization.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    fn frames(&self, secs: f64) -> u64 {
        (secs * self.sample_rate).round() as u64
    }

    pub fn set_mode(&mut self, mode: SoundMode) -> Result<()> {
        match (self.phase, mode) {
            (Phase::Idle, SoundMode::None) => Ok(()),
            (Phase::Idle, next) => self.start_chain(next),

            (Phase::FadingIn { mode: current, .. } | Phase::Playing(current), next)
                if current == next =>
            {
                Ok(())
            }
            (Phase::FadingIn { mode: current, .. } | Phase::Playing(current), next) => {
                self.begin_fade_out(current, next);
                Ok(())
            }

            (Phase::FadingOut { mode: current, dispose_at, .. }, SoundMode::None) => {
                self.phase = Phase::FadingOut {
                    mode: current,
                    next: SoundMode::None,
                    dispose_at,
                };
                Ok(())
            }
            // Fresh deadline; the ramp continues down from the current gain
            (Phase::FadingOut { mode: current, .. }, next) => {
                log::debug!("rescheduling fade-out of {current} for {next}");
                self.begin_fade_out(current, next);
                Ok(())
            }
        }
    }

    pub fn set_volume(&mut self, volume: Volume) {
        self.volume = volume;
        match self.phase {
            Phase::FadingIn { .. } | Phase::Playing(_) => {
                let target = volume.coefficient(self.config.max_gain);
                self.master.gain.ramp_to(target, self.config.volume_ramp_secs);
            }
            // Idle is already silent and a fade-out must not be undone;
            // the level is picked up by the next fade-in.
            Phase::Idle | Phase::FadingOut { .. } => {}
        }
    }

    fn start_chain(&mut self, mode: SoundMode) -> Result<()> {
        self.dispose_chain();

        let seed = self
            .config
            .seed
            .wrapping_add(self.chains_built.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        let built = SoundChain::for_mode(&self.config.presets, mode, self.sample_rate, seed);
        let mut chain = match built {
            Ok(chain) => chain,
            Err(e) => {
                log::warn!("cannot build {mode} chain, staying silent: {e}");
                self.master.gain.set_value(0.0);
                self.phase = Phase::Idle;
                return Err(e);
            }
        };
        self.chains_built += 1;

        chain.start();
        log::debug!("started {mode} chain ({} nodes)", chain.node_count());
        self.chain = Some(chain);

        self.master.gain.set_value(0.0);
        self.master
            .gain
            .ramp_to(self.volume.coefficient(self.config.max_gain), self.config.fade_in_secs);
        self.phase = Phase::FadingIn {
            mode,
            until: self.clock + self.frames(self.config.fade_in_secs),
        };
        Ok(())
    }

    fn begin_fade_out(&mut self, mode: SoundMode, next: SoundMode) {
        self.master.gain.ramp_to(0.0, self.config.fade_out_secs);
        let wait = self.frames(self.config.fade_out_secs + self.config.dispose_grace_secs);
        self.phase = Phase::FadingOut {
            mode,
            next,
            dispose_at: self.clock + wait,
        };
        log::debug!("fading out {mode}, next {next}");
    }

    fn dispose_chain(&mut self) {
        if let Some(chain) = self.chain.take() {
            chain.dispose();
        }
    }

    /// Fire phase deadlines that have come due.
    fn tick(&mut self) {
        match self.phase {
            Phase::FadingIn { mode, until } if self.clock >= until => {
                self.phase = Phase::Playing(mode);
                log::debug!("{mode} fully faded in");
            }
            Phase::FadingOut { next, dispose_at, .. } if self.clock >= dispose_at => {
                self.dispose_chain();
                self.master.gain.set_value(0.0);
                self.phase = Phase::Idle;
                if next.is_audible() {
                    // Errors are logged by start_chain and leave the transport idle
                    let _ = self.start_chain(next);
                }
            }
            _ => {}
        }
    }

    /// Render one mono frame.
    pub fn next_sample(&mut self) -> f64 {
        self.tick();
        let dry = self.chain.as_mut().map_or(0.0, SoundChain::next_sample);
        self.clock += 1;
        self.master.process(dry)
    }

    /// Fill an interleaved buffer, writing the same signal to every channel.
    ///
    /// Only whole frames are rendered; a trailing partial frame is zeroed
    /// and does not advance the clock.
    pub fn fill_buffer(&mut self, data: &mut [f32]) {
        let channels = self.output.channels.max(1);
        let whole = data.len() - data.len() % channels;
        let (frames, partial) = data.split_at_mut(whole);
        for frame in frames.chunks_exact_mut(channels) {
            let sample = self.next_sample() as f32;
            frame.fill(sample);
        }
        partial.fill(0.0);
    }

    /// Stop and drop the live chain and silence the master. Safe to repeat.
    pub fn dispose(&mut self) {
        self.dispose_chain();
        self.master.reset();
        self.phase = Phase::Idle;
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.dispose_chain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambient::preset::ChainSpec;
    use crate::error::EngineError;

    const SR: u32 = 8000;

    fn transport() -> Transport {
        let config = EngineConfig {
            seed: 1,
            ..EngineConfig::default()
        };
        Transport::new(config, OutputConfig { sample_rate: SR, channels: 1 }, Volume::FULL)
    }

    fn run(t: &mut Transport, secs: f64) {
        for _ in 0..(secs * f64::from(SR)) as usize {
            t.next_sample();
        }
    }

    #[test]
    fn volume_mapping() {
        assert_eq!(Volume::from_percent(0).coefficient(0.5), 0.0);
        assert_eq!(Volume::from_percent(100).coefficient(0.5), 0.5);
        assert_eq!(Volume::from_percent(25).coefficient(0.5), 0.125);
        assert_eq!(Volume::from_percent(250), Volume::FULL);
        assert!(Volume::MUTE.is_muted());
    }

    #[test]
    fn idle_to_playing() {
        let mut t = transport();
        t.set_mode(SoundMode::Rain).unwrap();
        assert!(matches!(t.phase(), Phase::FadingIn { mode: SoundMode::Rain, .. }));
        assert_eq!(t.live_generator_count(), 2);

        run(&mut t, 3.0);
        let halfway = t.master_gain();
        assert!(halfway > 0.2 && halfway < 0.3, "fade-in should be halfway, got {halfway}");

        run(&mut t, 3.1);
        assert_eq!(t.phase(), Phase::Playing(SoundMode::Rain));
        assert_eq!(t.master_gain(), 0.5);
    }

    #[test]
    fn stop_fades_then_disposes() {
        let mut t = transport();
        t.set_mode(SoundMode::Cafe).unwrap();
        run(&mut t, 6.5);
        t.set_mode(SoundMode::None).unwrap();
        assert_eq!(t.current_mode(), SoundMode::Cafe);
        assert_eq!(t.target_mode(), SoundMode::None);

        run(&mut t, 4.0);
        // Ramp done, chain still held until the grace period passes
        assert_eq!(t.master_gain(), 0.0);
        assert!(t.live_node_count() > 0);

        run(&mut t, 0.6);
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(t.live_node_count(), 0);
        assert_eq!(t.live_generator_count(), 0);
        assert_eq!(t.current_mode(), SoundMode::None);
    }

    #[test]
    fn switch_fades_out_then_in() {
        let mut t = transport();
        t.set_mode(SoundMode::Rain).unwrap();
        run(&mut t, 7.0);
        t.set_mode(SoundMode::Ocean).unwrap();
        assert!(matches!(
            t.phase(),
            Phase::FadingOut { mode: SoundMode::Rain, next: SoundMode::Ocean, .. }
        ));

        run(&mut t, 4.6);
        assert!(matches!(t.phase(), Phase::FadingIn { mode: SoundMode::Ocean, .. }));
        assert_eq!(t.live_generator_count(), 3);

        run(&mut t, 6.1);
        assert_eq!(t.phase(), Phase::Playing(SoundMode::Ocean));
    }

    #[test]
    fn request_during_fade_out_replaces_the_timer() {
        let mut t = transport();
        t.set_mode(SoundMode::Rain).unwrap();
        run(&mut t, 7.0);
        t.set_mode(SoundMode::Forest).unwrap();
        run(&mut t, 2.0);
        t.set_mode(SoundMode::Ocean).unwrap();

        // Rain keeps fading; nothing new is built yet
        assert!(matches!(
            t.phase(),
            Phase::FadingOut { mode: SoundMode::Rain, next: SoundMode::Ocean, .. }
        ));
        assert_eq!(t.live_generator_count(), 2);

        // The first deadline (11.5 s) passes without firing
        run(&mut t, 3.0);
        assert!(matches!(t.phase(), Phase::FadingOut { next: SoundMode::Ocean, .. }));
        assert_eq!(t.current_mode(), SoundMode::Rain);

        run(&mut t, 1.6);
        assert!(matches!(t.phase(), Phase::FadingIn { mode: SoundMode::Ocean, .. }));
        assert_eq!(t.live_node_count(), 6);

        run(&mut t, 6.1);
        assert_eq!(t.phase(), Phase::Playing(SoundMode::Ocean));
        assert_eq!(t.live_node_count(), 6);
    }

    #[test]
    fn request_during_fade_out_does_not_step_the_gain() {
        let mut t = transport();
        t.set_mode(SoundMode::Rain).unwrap();
        run(&mut t, 7.0);
        t.set_mode(SoundMode::Forest).unwrap();
        run(&mut t, 0.01);
        let before = t.master_gain();
        assert!(before > 0.45, "fade-out barely started, got {before}");

        t.set_mode(SoundMode::Ocean).unwrap();
        let mut last = before;
        for _ in 0..SR {
            t.next_sample();
            let gain = t.master_gain();
            assert!((gain - last).abs() < 1e-3, "master gain stepped {last} -> {gain}");
            assert!(gain <= last);
            last = gain;
        }
        assert!(last > 0.0);
    }

    #[test]
    fn same_mode_is_a_no_op() {
        let mut t = transport();
        t.set_mode(SoundMode::Airplane).unwrap();
        run(&mut t, 1.0);
        let before = t.phase();
        t.set_mode(SoundMode::Airplane).unwrap();
        assert_eq!(t.phase(), before);
    }

    #[test]
    fn stop_while_switching_drops_the_next_mode() {
        let mut t = transport();
        t.set_mode(SoundMode::Rain).unwrap();
        run(&mut t, 1.0);
        t.set_mode(SoundMode::Forest).unwrap();
        t.set_mode(SoundMode::None).unwrap();
        assert_eq!(t.target_mode(), SoundMode::None);
        run(&mut t, 5.0);
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(t.live_node_count(), 0);
    }

    #[test]
    fn volume_ramps_while_playing() {
        let mut t = transport();
        t.set_mode(SoundMode::Ocean).unwrap();
        run(&mut t, 6.5);
        t.set_volume(Volume::from_percent(25));
        assert_eq!(t.master_gain_target(), 0.125);

        t.next_sample();
        let first = t.master_gain();
        assert!(first > 0.49, "volume change should ramp, not jump: {first}");

        run(&mut t, 0.5);
        assert!((t.master_gain() - 0.125).abs() < 1e-9);
    }

    #[test]
    fn volume_during_fade_out_is_deferred() {
        let mut t = transport();
        t.set_mode(SoundMode::Rain).unwrap();
        run(&mut t, 6.5);
        t.set_mode(SoundMode::None).unwrap();
        t.set_volume(Volume::from_percent(80));
        assert_eq!(t.master_gain_target(), 0.0);

        run(&mut t, 5.0);
        t.set_mode(SoundMode::Rain).unwrap();
        assert!((t.master_gain_target() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn failed_build_leaves_no_chain() {
        let mut config = EngineConfig::default();
        let mut broken: ChainSpec = config.presets.get(SoundMode::Rain).unwrap().clone();
        broken.filters.clear();
        // Bypass set()'s validation to model a table that went bad at runtime
        let json = serde_json::json!({ "rain": broken });
        config.presets = serde_json::from_value(json).unwrap();

        let output = OutputConfig { sample_rate: SR, channels: 1 };
        let mut t = Transport::new(config, output, Volume::FULL);
        let err = t.set_mode(SoundMode::Rain).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPreset { .. }));
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(t.live_node_count(), 0);
    }

    #[test]
    fn fill_buffer_duplicates_channels() {
        let mut t = Transport::new(
            EngineConfig::default(),
            OutputConfig { sample_rate: SR, channels: 2 },
            Volume::FULL,
        );
        t.set_mode(SoundMode::PinkNoise).unwrap();
        let mut buf = vec![0.0f32; 2 * 4000];
        t.fill_buffer(&mut buf);
        assert!(buf.chunks(2).all(|f| f[0] == f[1]));
        assert_eq!(t.clock(), 4000);
        assert!(buf.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn fill_buffer_skips_partial_frames() {
        let mut t = Transport::new(
            EngineConfig::default(),
            OutputConfig { sample_rate: SR, channels: 2 },
            Volume::FULL,
        );
        t.set_mode(SoundMode::Rain).unwrap();
        let mut warm = vec![0.0f32; 2 * 8000];
        t.fill_buffer(&mut warm);

        let mut odd = vec![1.0f32; 5];
        t.fill_buffer(&mut odd);
        assert_eq!(t.clock(), 8002);
        assert_eq!(odd[4], 0.0);
        assert_eq!(odd[0], odd[1]);
        assert_eq!(odd[2], odd[3]);

        // The next block still starts on a frame boundary
        let mut next = vec![0.0f32; 8];
        t.fill_buffer(&mut next);
        assert_eq!(t.clock(), 8006);
        assert!(next.chunks(2).all(|f| f[0] == f[1]));
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut t = transport();
        t.set_mode(SoundMode::Forest).unwrap();
        run(&mut t, 0.5);
        t.dispose();
        t.dispose();
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(t.live_node_count(), 0);
        assert_eq!(t.master_gain(), 0.0);
    }
}
