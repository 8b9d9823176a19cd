pub mod circuit;
pub mod learning;
pub mod registry;
pub mod window;

pub use circuit::CircuitState;
pub use learning::{blend_threshold, detect_anomaly_default, detect_trend, ThresholdLearner, ThresholdPrediction};
pub use registry::CircuitBreakerRegistry;
pub use window::SlidingWindow;
