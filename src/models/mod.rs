pub mod document;
pub mod line_item;
pub mod numeric;
pub mod pairing;
pub mod position;
pub mod progress;
pub mod project;
pub mod report;

pub use document::{Document, DocumentUpload};
pub use line_item::LineItem;
pub use numeric::{parse_amount, parse_quantity, parse_weight};
pub use pairing::{PairingConflict, PairingOutcome};
pub use position::PositionNormalizer;
pub use progress::{ProgressTotals, QuantityField, RecordPatch};
pub use project::{Project, ProjectId, ProjectSummary};
pub use report::{ParsedReport, ReportLayout, SkipReason, SkippedLine};
