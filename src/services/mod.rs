mod blob_log;
mod herbs;
mod identity;
mod pexels;
mod plant_id;
mod search;

pub use blob_log::{format_entry, TranscriptLog};
pub use herbs::detect_herb;
pub use identity::{Identity, IdentityClient};
pub use pexels::PexelsClient;
pub use plant_id::{PlantIdClient, PlantSuggestion};
pub use search::SearchClient;
