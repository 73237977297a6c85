//! Core module - grade parsing and the import transaction

pub mod config;
pub mod coordinator;
pub mod endpoint;
pub mod history;
pub mod parser;
pub mod report;
pub mod request;
pub mod session;

pub use config::{Config, TargetBlock};
pub use coordinator::{ImportCoordinator, ImportError, SubmitState};
pub use endpoint::{GradingEndpoint, HttpEndpoint, TransportError};
pub use history::{HistoryError, LastImport};
pub use parser::{parse, GradeRecord, ParsedDataset};
pub use report::{ImportReport, ReportLine};
pub use request::{resolve_max_grade, Action, ImportOutcome, ImportRequest, ImportResponse};
pub use session::{read_snapshot, CsvSnapshot, FileToken, ImportSession};
