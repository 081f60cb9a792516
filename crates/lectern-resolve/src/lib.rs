//! Query resolution: the topic gate in front of retrieval and the answer
//! synthesizer behind it.

pub mod gate;
pub mod synthesizer;
pub mod types;

pub use gate::TopicGate;
pub use synthesizer::{AnswerSynthesizer, PromptSettings};
pub use types::*;
