//! Interacting MCMC sampler: one call per frame.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::{ChainBank, ExecutionStrategy, PoolPolicy, SamplerConfig};
use crate::distances::DiffusionDistance;
use crate::motion::{accept_move, acceptance_ratio, MotionBounds, ProposalSampler, TransitionModel};
use crate::observation::{AppearanceScorer, FrameObservation, ObservationModel};
use crate::particle::Particle;
use crate::{Error, Result};

/// Outcome of sampling one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameEstimate {
    /// Pooled particle with the highest joint weight; `None` when nothing was sampled.
    pub map: Option<Particle>,
    /// Joint weight of `map`.
    pub map_weight: f64,
    /// Accepted Metropolis-Hastings moves.
    pub accepted: usize,
    /// Attempted Metropolis-Hastings moves.
    pub proposals: usize,
    /// `accepted / proposals`, or 0 without proposals.
    pub acceptance_rate: f64,
    /// Particles recorded in the pool.
    pub pool_size: usize,
    /// Interaction steps that fired.
    pub interactions: usize,
}

/// Multi-target sampler running a bank of interacting Metropolis-Hastings
/// chains.
///
/// Chain slot `l` uses motion index `l % num_motions` and feature chain
/// `l / num_motions`. All randomness comes from one seeded stream owned by the
/// sampler.
#[derive(Debug, Clone)]
pub struct ImcmcSampler {
    config: SamplerConfig,
    transition: TransitionModel,
    proposal: ProposalSampler,
    bank: ChainBank,
    rng: StdRng,
    dd: DiffusionDistance,
}

impl ImcmcSampler {
    /// Create a sampler seeded from `config.seed`.
    pub fn new(config: SamplerConfig) -> Result<Self> {
        config.validate()?;

        let transition = TransitionModel::new(config.motion_noise, config.variance);
        let proposal = ProposalSampler::new(config.motion_noise, config.variance);
        let bank = ChainBank::new(config.num_chains(), config.pool_capacity());
        let rng = StdRng::seed_from_u64(config.seed);

        Ok(Self {
            config,
            transition,
            proposal,
            bank,
            rng,
            dd: DiffusionDistance::new(),
        })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// The sampler's random stream, shared with model initialisation.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Chain buffers and pool of the last sampled frame.
    pub fn bank(&self) -> &ChainBank {
        &self.bank
    }

    /// Sample one frame starting from the previous frame's estimate `seed`.
    ///
    /// `models[j]` is the observation model of object `j`. With no objects
    /// nothing is drawn and the estimate is empty.
    pub fn sample_frame(
        &mut self,
        seed: &Particle,
        frame: &FrameObservation,
        models: &[ObservationModel],
        bounds: &MotionBounds,
    ) -> Result<FrameEstimate> {
        self.bank.reset();

        let num_objects = seed.num_objects();
        if num_objects == 0 {
            return Ok(FrameEstimate::default());
        }
        if models.len() != num_objects {
            return Err(Error::LikelihoodError(format!(
                "{} objects but {} observation models",
                num_objects,
                models.len()
            )));
        }

        let scorer = AppearanceScorer::new(self.config.likelihood_mode, self.config.lambda, frame, models);
        let num_chains = self.config.num_chains();
        let num_motions = self.config.num_motions;
        let execution = self.config.execution;

        // Global move of every object in every chain.
        let moved: Vec<Particle> = (0..num_chains)
            .map(|l| self.transition.propagate(seed, bounds, l % num_motions, &mut self.rng))
            .collect();
        self.bank.set_proposed(moved);
        score_chains(execution, num_motions, &scorer, self.bank.proposed_mut(), None, &mut self.dd)?;
        self.bank.promote_proposed();

        let factor = 0.5 / self.config.iterations as f64;
        let mut alpha = 1.0;
        let mut estimate = FrameEstimate::default();
        let mut degenerate = 0usize;

        'sweep: for _ in 0..self.config.iterations {
            let m = self.rng.gen_range(0..num_objects);

            let proposed: Vec<Particle> = (0..num_chains)
                .map(|l| {
                    self.proposal
                        .propose(&self.bank.current()[l], m, bounds, l % num_motions, &mut self.rng)
                })
                .collect();
            self.bank.set_proposed(proposed);
            score_chains(execution, num_motions, &scorer, self.bank.proposed_mut(), Some(m), &mut self.dd)?;

            for l in 0..num_chains {
                let w_new = self.bank.proposed()[l].objects[m].weight;
                let w_old = self.bank.current()[l].objects[m].weight;
                if w_new < self.config.weight_floor && w_old < self.config.weight_floor {
                    degenerate += 1;
                }

                estimate.proposals += 1;
                let ratio = acceptance_ratio(w_new, w_old, self.config.weight_floor);
                if accept_move(ratio, &mut self.rng) {
                    self.bank.accept(l, m);
                    estimate.accepted += 1;
                }

                if !self.bank.record(l) && self.config.pool_policy == PoolPolicy::StopSweep {
                    debug!("Particle pool full after {} proposals; ending sweep", estimate.proposals);
                    break 'sweep;
                }
            }

            if self.config.interaction && self.rng.gen::<f64>() <= alpha {
                alpha -= factor;
                if self.bank.interact(m, &mut self.rng) {
                    estimate.interactions += 1;
                }
            }
        }

        if degenerate > 0 {
            warn!(
                "{} of {} proposals compared weights below the floor {:e}",
                degenerate, estimate.proposals, self.config.weight_floor
            );
        }

        estimate.map = self.bank.map().cloned();
        estimate.map_weight = self.bank.map_weight().unwrap_or(0.0);
        estimate.pool_size = self.bank.pool().len();
        if estimate.proposals > 0 {
            estimate.acceptance_rate = estimate.accepted as f64 / estimate.proposals as f64;
        }

        debug!(
            "Sampled {} objects: accepted {}/{} ({:.1}%), {} interactions, MAP weight {:.4}",
            num_objects,
            estimate.accepted,
            estimate.proposals,
            100.0 * estimate.acceptance_rate,
            estimate.interactions,
            estimate.map_weight
        );

        Ok(estimate)
    }
}

/// Score chain slots, either every object (`target == None`) or one object.
///
/// Scoring draws no random numbers, so the two strategies agree exactly.
fn score_chains(
    execution: ExecutionStrategy,
    num_motions: usize,
    scorer: &AppearanceScorer<'_>,
    particles: &mut [Particle],
    target: Option<usize>,
    dd: &mut DiffusionDistance,
) -> Result<()> {
    match execution {
        ExecutionStrategy::Sequential => particles
            .iter_mut()
            .enumerate()
            .try_for_each(|(l, p)| score_particle(scorer, p, l / num_motions, target, dd)),
        ExecutionStrategy::Parallel => particles
            .par_iter_mut()
            .enumerate()
            .try_for_each_init(DiffusionDistance::new, |dd, (l, p)| {
                score_particle(scorer, p, l / num_motions, target, dd)
            }),
    }
}

fn score_particle(
    scorer: &AppearanceScorer<'_>,
    particle: &mut Particle,
    chain_index: usize,
    target: Option<usize>,
    dd: &mut DiffusionDistance,
) -> Result<()> {
    let objects = match target {
        Some(m) => m..m + 1,
        None => 0..particle.num_objects(),
    };
    for j in objects {
        let weight = scorer.score(j, &particle.objects[j], chain_index, dd)?;
        particle.objects[j].weight = weight;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{object_window, ColorReference, EigenChainDecomposer, HsvEdgeExtractor};
    use crate::particle::ObjectState;
    use image::{Rgb, RgbImage};

    fn frame() -> RgbImage {
        RgbImage::from_fn(100, 100, |x, y| {
            if (40..60).contains(&x) && (30..70).contains(&y) {
                Rgb([240, 240, 240])
            } else {
                Rgb([10, 10, 10])
            }
        })
    }

    fn setup(config: &SamplerConfig) -> (Particle, FrameObservation, Vec<ObservationModel>) {
        let obs = FrameObservation::new(&frame(), &HsvEdgeExtractor::new(config.feature_set)).unwrap();
        let state = ObjectState::at_rest(50.0, 50.0, 20.0, 40.0);
        let mut model = ObservationModel::new(obs.features.len(), config, ColorReference::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        model
            .refresh(&obs.features, object_window(&state), &EigenChainDecomposer::default(), &mut rng)
            .unwrap();
        (Particle::new(vec![state]), obs, vec![model])
    }

    fn small_config() -> SamplerConfig {
        SamplerConfig {
            iterations: 10,
            seed: 17,
            ..SamplerConfig::default()
        }
    }

    #[test]
    fn test_no_objects_is_idle() {
        let config = small_config();
        let (_, obs, _) = setup(&config);
        let mut sampler = ImcmcSampler::new(config).unwrap();
        let bounds = MotionBounds::new(100, 100, 0.9, 1.1);

        let estimate = sampler.sample_frame(&Particle::default(), &obs, &[], &bounds).unwrap();
        assert!(estimate.map.is_none());
        assert_eq!(estimate.proposals, 0);
        assert!(sampler.bank().pool().is_empty());
    }

    #[test]
    fn test_pool_and_statistics() {
        let config = small_config();
        let (seed, obs, models) = setup(&config);
        let mut sampler = ImcmcSampler::new(config.clone()).unwrap();
        let bounds = MotionBounds::new(100, 100, config.scale_min, config.scale_max);

        let estimate = sampler.sample_frame(&seed, &obs, &models, &bounds).unwrap();
        assert_eq!(estimate.proposals, config.iterations * config.num_chains());
        assert_eq!(estimate.pool_size, config.pool_capacity());
        assert!(estimate.accepted <= estimate.proposals);
        assert!((0.0..=1.0).contains(&estimate.acceptance_rate));

        let map = estimate.map.unwrap();
        let best = sampler
            .bank()
            .pool()
            .iter()
            .map(Particle::joint_weight)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(map.joint_weight(), best);
        assert_eq!(estimate.map_weight, best);
    }

    #[test]
    fn test_small_pool_stops_sweep() {
        let config = SamplerConfig {
            pool_capacity: Some(5),
            ..small_config()
        };
        let (seed, obs, models) = setup(&config);
        let mut sampler = ImcmcSampler::new(config.clone()).unwrap();
        let bounds = MotionBounds::new(100, 100, 0.9, 1.1);

        let estimate = sampler.sample_frame(&seed, &obs, &models, &bounds).unwrap();
        assert_eq!(estimate.pool_size, 5);
        assert_eq!(estimate.proposals, 6);

        let config = SamplerConfig {
            pool_policy: PoolPolicy::KeepSweeping,
            ..config
        };
        let mut sampler = ImcmcSampler::new(config.clone()).unwrap();
        let estimate = sampler.sample_frame(&seed, &obs, &models, &bounds).unwrap();
        assert_eq!(estimate.pool_size, 5);
        assert_eq!(estimate.proposals, config.iterations * config.num_chains());
    }

    #[test]
    fn test_same_seed_same_estimate() {
        let config = small_config();
        let (seed, obs, models) = setup(&config);
        let bounds = MotionBounds::new(100, 100, 0.9, 1.1);

        let mut a = ImcmcSampler::new(config.clone()).unwrap();
        let mut b = ImcmcSampler::new(config).unwrap();
        let ea = a.sample_frame(&seed, &obs, &models, &bounds).unwrap();
        let eb = b.sample_frame(&seed, &obs, &models, &bounds).unwrap();
        assert_eq!(ea.map, eb.map);
        assert_eq!(ea.accepted, eb.accepted);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let config = small_config();
        let (seed, obs, models) = setup(&config);
        let bounds = MotionBounds::new(100, 100, 0.9, 1.1);

        let mut seq = ImcmcSampler::new(config.clone()).unwrap();
        let mut par = ImcmcSampler::new(SamplerConfig {
            execution: ExecutionStrategy::Parallel,
            ..config
        })
        .unwrap();

        let es = seq.sample_frame(&seed, &obs, &models, &bounds).unwrap();
        let ep = par.sample_frame(&seed, &obs, &models, &bounds).unwrap();
        assert_eq!(es.map, ep.map);
        assert_eq!(es.accepted, ep.accepted);
        assert_eq!(seq.bank().pool(), par.bank().pool());
    }

    #[test]
    fn test_model_count_mismatch() {
        let config = small_config();
        let (seed, obs, _) = setup(&config);
        let mut sampler = ImcmcSampler::new(config).unwrap();
        let bounds = MotionBounds::new(100, 100, 0.9, 1.1);
        assert!(matches!(
            sampler.sample_frame(&seed, &obs, &[], &bounds),
            Err(Error::LikelihoodError(_))
        ));
    }

    #[test]
    fn test_model_without_chains_is_an_error() {
        let config = small_config();
        let (seed, obs, _) = setup(&config);
        let blank = ObservationModel::new(obs.features.len(), &config, ColorReference::default()).unwrap();

        let mut sampler = ImcmcSampler::new(config).unwrap();
        let bounds = MotionBounds::new(100, 100, 0.9, 1.1);
        assert!(matches!(
            sampler.sample_frame(&seed, &obs, &[blank], &bounds),
            Err(Error::LikelihoodError(_))
        ));
    }
}
