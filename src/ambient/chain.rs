//! Sound chain: the owned node graph for one soundscape.

use crate::dsp::filter::BiquadFilter;
use crate::dsp::lfo::Lfo;
use crate::dsp::noise::NoiseSource;
use crate::error::{EngineError, Result};

use super::mode::SoundMode;
use super::preset::{ChainSpec, LfoTarget, PresetTable};

/// Frames between LFO updates.
pub const CONTROL_BLOCK: usize = 32;

/// A fixed-level gain stage that LFOs may drive.
#[derive(Debug, Clone)]
pub struct GainStage {
    pub level: f64,
}

/// One node of a chain.
#[derive(Debug, Clone)]
pub enum Node {
    Noise(NoiseSource),
    Filter(BiquadFilter),
    Lfo(Lfo),
    Gain(GainStage),
}

impl Node {
    /// Generators have a start/stop lifecycle and must be stopped on dispose.
    pub fn is_generator(&self) -> bool {
        matches!(self, Node::Noise(_) | Node::Lfo(_))
    }

    pub fn is_running(&self) -> bool {
        match self {
            Node::Noise(n) => n.is_running(),
            Node::Lfo(l) => l.is_running(),
            _ => false,
        }
    }

    fn start(&mut self) {
        match self {
            Node::Noise(n) => n.start(),
            Node::Lfo(l) => l.start(),
            _ => {}
        }
    }

    fn stop(&mut self) {
        match self {
            Node::Noise(n) => n.stop(),
            Node::Lfo(l) => l.stop(),
            _ => {}
        }
    }
}

/// An LFO wired to a parameter of another node.
#[derive(Debug, Clone, Copy)]
struct Route {
    lfo: usize,
    target: usize,
}

/// Node list plus the wiring that turns it into a signal path:
/// `source -> path[0] -> path[1] -> ... -> master`.
#[derive(Debug, Clone)]
pub struct SoundChain {
    mode: SoundMode,
    nodes: Vec<Node>,
    source: usize,
    path: Vec<usize>,
    routes: Vec<Route>,
    starters: Vec<usize>,
    started: bool,
    control_countdown: usize,
}

impl SoundChain {
    /// Build the chain for `mode` from its preset.
    pub fn for_mode(
        presets: &PresetTable,
        mode: SoundMode,
        sample_rate: f64,
        seed: u64,
    ) -> Result<Self> {
        let spec = presets.get(mode).ok_or(EngineError::InvalidMode(mode))?;
        Self::build(mode, spec, sample_rate, seed)
    }

    pub fn build(mode: SoundMode, spec: &ChainSpec, sample_rate: f64, seed: u64) -> Result<Self> {
        spec.validate(mode)?;

        let mut nodes = Vec::new();
        let mut path = Vec::new();
        let mut starters = Vec::new();

        let source = nodes.len();
        nodes.push(Node::Noise(NoiseSource::new(spec.noise, seed)));
        starters.push(source);

        let mut filter_nodes = Vec::with_capacity(spec.filters.len());
        for f in &spec.filters {
            filter_nodes.push(nodes.len());
            path.push(nodes.len());
            nodes.push(Node::Filter(BiquadFilter::new(f.kind, f.frequency, f.q, sample_rate)));
        }

        let gain_node = spec.has_gain_stage().then(|| {
            let idx = nodes.len();
            path.push(idx);
            nodes.push(Node::Gain(GainStage { level: spec.gain.unwrap_or(1.0) }));
            idx
        });

        let mut routes = Vec::with_capacity(spec.lfos.len());
        for l in &spec.lfos {
            let target = match l.target {
                // has_gain_stage() guarantees the stage exists for a gain LFO
                LfoTarget::Gain => gain_node.ok_or(EngineError::InvalidPreset {
                    mode,
                    reason: "gain lfo without a gain stage".into(),
                })?,
                LfoTarget::FilterFrequency { filter } => filter_nodes[filter],
            };
            let lfo = nodes.len();
            nodes.push(Node::Lfo(Lfo::new(l.frequency, l.min, l.max, sample_rate)));
            starters.push(lfo);
            routes.push(Route { lfo, target });
        }

        Ok(SoundChain {
            mode,
            nodes,
            source,
            path,
            routes,
            starters,
            started: false,
            control_countdown: 0,
        })
    }

    pub fn mode(&self) -> SoundMode {
        self.mode
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn generator_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_generator()).count()
    }

    pub fn running_generators(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_running()).count()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Start every generator and LFO.
    pub fn start(&mut self) {
        for &idx in &self.starters {
            self.nodes[idx].start();
        }
        self.started = true;
        self.control_countdown = 0;
    }

    /// Stop every generator. The chain renders silence afterwards.
    pub fn stop(&mut self) {
        for node in &mut self.nodes {
            if node.is_generator() {
                node.stop();
            }
        }
        self.started = false;
    }

    /// Stop every generator and release the nodes.
    pub fn dispose(mut self) {
        self.stop();
        log::debug!("disposed {} chain ({} nodes)", self.mode, self.nodes.len());
    }

    fn apply_modulation(&mut self) {
        for i in 0..self.routes.len() {
            let Route { lfo, target } = self.routes[i];
            let value = match &mut self.nodes[lfo] {
                Node::Lfo(l) => l.advance(CONTROL_BLOCK),
                _ => continue,
            };
            match &mut self.nodes[target] {
                Node::Filter(f) => f.set_frequency(value),
                Node::Gain(g) => g.level = value,
                _ => {}
            }
        }
    }

    /// Render the next mono sample of the chain.
    pub fn next_sample(&mut self) -> f64 {
        if !self.started {
            return 0.0;
        }

        if self.control_countdown == 0 {
            self.apply_modulation();
            self.control_countdown = CONTROL_BLOCK;
        }
        self.control_countdown -= 1;

        let mut sample = match &mut self.nodes[self.source] {
            Node::Noise(n) => n.next_sample(),
            _ => 0.0,
        };
        for &idx in &self.path {
            sample = match &mut self.nodes[idx] {
                Node::Filter(f) => f.process(sample),
                Node::Gain(g) => sample * g.level,
                _ => sample,
            };
        }
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambient::preset::builtin;

    const SR: f64 = 22050.0;

    fn chain(mode: SoundMode) -> SoundChain {
        SoundChain::for_mode(&PresetTable::builtin(), mode, SR, 11).unwrap()
    }

    #[test]
    fn node_layout_matches_preset() {
        // noise, highpass, lowpass, lfo, gain
        let rain = chain(SoundMode::Rain);
        assert_eq!(rain.node_count(), 5);
        assert_eq!(rain.generator_count(), 2);

        let pink = chain(SoundMode::PinkNoise);
        assert_eq!(pink.node_count(), 3);
        assert_eq!(pink.generator_count(), 1);

        let ocean = chain(SoundMode::Ocean);
        assert_eq!(ocean.node_count(), 6);
        assert_eq!(ocean.generator_count(), 3);
    }

    #[test]
    fn silent_before_start() {
        let mut c = chain(SoundMode::Rain);
        assert!(!c.is_started());
        assert_eq!(c.running_generators(), 0);
        assert!((0..512).all(|_| c.next_sample() == 0.0));
    }

    #[test]
    fn start_runs_every_generator() {
        for mode in SoundMode::audible() {
            let mut c = chain(mode);
            c.start();
            assert_eq!(c.running_generators(), c.generator_count(), "{mode}");
        }
    }

    #[test]
    fn every_mode_is_audible_and_finite() {
        for mode in SoundMode::audible() {
            let mut c = chain(mode);
            c.start();
            let samples: Vec<f64> = (0..SR as usize).map(|_| c.next_sample()).collect();
            assert!(samples.iter().all(|s| s.is_finite()), "{mode} produced non-finite output");
            let peak = samples.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
            assert!(peak > 1e-3, "{mode} is silent (peak {peak})");
            assert!(peak < 4.0, "{mode} is unreasonably hot (peak {peak})");
        }
    }

    #[test]
    fn gain_lfo_overrides_static_level() {
        let mut c = chain(SoundMode::Ocean);
        c.start();
        for _ in 0..(SR as usize * 4) {
            c.next_sample();
        }
        let level = c
            .nodes()
            .iter()
            .find_map(|n| match n {
                Node::Gain(g) => Some(g.level),
                _ => None,
            })
            .unwrap();
        assert!((0.7..=0.95).contains(&level), "gain level {level}");
        assert_ne!(level, 0.85);
    }

    #[test]
    fn forest_cutoff_sweeps() {
        let mut c = chain(SoundMode::Forest);
        c.start();
        let lowpass = |c: &SoundChain| match &c.nodes()[2] {
            Node::Filter(f) => f.frequency(),
            other => panic!("expected lowpass, got {other:?}"),
        };
        c.next_sample();
        let first = lowpass(&c);
        for _ in 0..(SR as usize * 3) {
            c.next_sample();
        }
        let later = lowpass(&c);
        assert!((3000.0..=5000.0).contains(&first));
        assert!(later > first, "lowpass should rise early in the sweep: {first} -> {later}");
    }

    #[test]
    fn dispose_stops_generators() {
        let mut c = chain(SoundMode::Airplane);
        c.start();
        c.next_sample();
        c.stop();
        assert_eq!(c.running_generators(), 0);
        assert_eq!(c.next_sample(), 0.0);
        c.dispose();
    }

    #[test]
    fn silence_has_no_chain() {
        let err =
            SoundChain::for_mode(&PresetTable::builtin(), SoundMode::None, SR, 0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMode(SoundMode::None)));
    }

    #[test]
    fn invalid_spec_builds_nothing() {
        let mut spec = builtin(SoundMode::Rain).unwrap();
        spec.filters.clear();
        assert!(SoundChain::build(SoundMode::Rain, &spec, SR, 0).is_err());
    }
}
