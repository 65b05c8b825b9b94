// Stock Intake - Core Library
// Chat command parsing, duplicate detection and confirmation for stock movements

pub mod error;
pub mod config;
pub mod movement;
pub mod text;
pub mod units;
pub mod keywords;
pub mod similarity;
pub mod parser;
pub mod cache;
pub mod classifier;
pub mod store;
pub mod deduplication;
pub mod confirmation;

// Re-export commonly used types
pub use error::{BatchError, ErrorKind, IntakeError, StoreError};
pub use config::{CacheConfig, DetectionConfig, IntakeConfig, ParserConfig};
pub use movement::{
    Batch, BatchItem, GlobalParameters, MovementKind, ParamKey, ParseFormat, ParseResult,
};
pub use units::{NormalizedQuantity, QuantityNormalizer};
pub use keywords::KeywordExtractor;
pub use similarity::SimilarityScorer;
pub use parser::{
    BatchSegmenter, BatchValidator, CommandParser, DefaultsResolver, GlobalParameterExtractor,
    LineItemParser, MovementAssembler, StockMovement,
};
pub use cache::LookupCache;
pub use classifier::{CategoryClassifier, CategoryRule, RuleCategoryClassifier};
pub use store::{
    load_history_csv, HistoricalMovement, InMemoryHistoryStore, MovementHistoryStore,
    SqliteHistoryStore,
};
pub use deduplication::{
    DuplicateDetectionResult, DuplicateDetectionService, EntryDuplicates, MatchType,
    PotentialDuplicate,
};
pub use confirmation::{
    ConfirmationError, ConfirmationState, PendingConfirmations, Resolution,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
