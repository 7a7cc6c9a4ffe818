pub mod character;
pub mod quest;
pub mod scenario;
pub mod terrain;
