
pub use mock_backend::{FaultPoint, MockBackend, MockCursor, MockHandle, ReadBehavior, ResourceCounters};
