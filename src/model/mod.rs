pub mod factors;
pub mod predictor;
pub mod types;

pub use predictor::{predict_game, weights_info, WeightInfo};
pub use types::{ConfidenceLevel, Factor, GameInput, PredictionResult, SideScores};
