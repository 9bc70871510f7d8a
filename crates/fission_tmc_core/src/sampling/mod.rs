//! Perturbation generation: magnitude sampling and the per-distribution
//! perturbation rules

mod distribution;
mod perturber;
mod sampler;

pub use distribution::Distribution;
pub use perturber::{Perturber, ROUNDING_DECIMALS, round_value};
pub use sampler::Sampler;
