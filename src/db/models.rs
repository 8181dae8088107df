use serde::{Deserialize, Serialize};

use crate::model::{GameInput, PredictionResult};

/// A prediction as kept in the history, together with the inputs it was made from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPrediction {
    /// Row id; increases with insertion order
    pub id: i64,
    pub result: PredictionResult,
    pub input: GameInput,
}

/// Aggregates over the whole prediction history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionStats {
    pub total_predictions: i64,
    /// Mean of stored confidence values (0 when the history is empty)
    pub average_confidence: f64,
    /// Predictions with confidence ≥ 15
    pub high_confidence_picks: i64,
    /// Predictions with confidence < 5
    pub toss_ups: i64,
}
