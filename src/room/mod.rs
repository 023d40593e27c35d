// Public API
pub use models::{Participant, ParticipantInfo, Role, Room, WaitingInfo};
pub use registry::RoomRegistry;

// Internal modules
pub mod models;
pub mod registry;
