// Application Layer - Use Cases and Business Logic

pub mod board_monitor;
pub mod position;
pub mod registration;
pub mod session;
pub mod shutdown;
pub mod triage;
pub mod visitor;

// Re-exports
pub use board_monitor::{summarize, BoardMonitor, CategorySummary};
pub use position::PositionTracker;
pub use registration::{RegistrationService, SubmitRequest};
pub use session::OperatorSession;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use triage::{TriageBoard, TriageController};
pub use visitor::VisitorSession;
