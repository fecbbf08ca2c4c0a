pub mod codes;
pub mod engine;
pub mod evaluator;
pub mod gateway;
pub mod store;
pub mod timers;

// Re-export main components
pub use codes::*;
pub use engine::*;
pub use evaluator::*;
pub use gateway::*;
pub use store::*;
pub use timers::*;
