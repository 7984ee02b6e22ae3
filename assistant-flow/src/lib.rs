pub mod error;
pub mod intent;
pub mod interpreter;
pub mod locator;
pub mod request;
pub mod route;
pub mod router;
pub mod runner;
pub mod safety;
pub mod storage;

// Re-export commonly used types
pub use error::{AssistantError, Result, StorageError};
pub use intent::{Intent, IntentClassifier, KeywordClassifier, KeywordRule, LOCATION_KEYWORDS};
pub use interpreter::{
    GenerationSettings, PrescriptionInterpreter, STOP_MARKER, TextGenerator, VisionExtractor,
};
pub use locator::{
    LocationQuery, PlaceRecord, PlaceSearchProvider, ServiceLocator, ServiceResult, map_link,
};
pub use request::{PrescriptionImage, Request, TextRequest};
pub use route::{Dispatch, Handler, RouteOutcome, RouteTable, RouteTableBuilder};
pub use router::{CAPABILITY_SUMMARY, RequestRouter, routes};
pub use runner::ConversationRunner;
pub use safety::{DISCLAIMER, InteractionTable, SafetyAnnotator};
pub use storage::{ChatTurn, InMemorySessionStorage, Role, Session, SessionStorage};
