pub mod errors;
pub mod marks;
pub mod messages;
pub mod room;

// Re-export all types
pub use errors::*;
pub use marks::*;
pub use messages::*;
pub use room::*;
