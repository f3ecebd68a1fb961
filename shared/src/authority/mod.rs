pub mod contested;
pub mod elected;
pub mod error;
pub mod extrapolation;
pub mod owner_driven;
