pub mod assess;
pub mod cohort;
pub mod crps;
