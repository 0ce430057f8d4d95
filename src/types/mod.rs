//! Public types for the modelmux API.

mod capability;
mod message;
mod model;
mod options;

pub use capability::ModelCapability;
pub use message::{Message, Role};
pub use model::{ModelCost, ModelInfo};
pub use options::RequestOptions;
