pub mod nominatim;
pub mod openrouter;

pub use nominatim::NominatimSearch;
pub use openrouter::{OpenRouterChat, OpenRouterVision};
