pub mod api;
pub mod policy;
pub mod rag;
pub mod scan;

pub use api::{HealthStatus, HistoryQuery, PerformanceMetrics, ScanHistoryPage};
pub use policy::SecurityPolicy;
pub use rag::{RagDocument, RagScanConfig, RagScanRequest, RagScanResponse};
pub use scan::{
    DetectionIndicator, DetectionResult, DetectionType, ScanRequest, ScanResponse, ThreatLevel,
};
