pub mod edit_history;
pub mod edit_session;
pub mod error;
pub mod landmass;
pub mod models;
pub mod segment;
pub mod smoothing;
pub mod spatial;
pub mod synthesizer;
pub mod versioning;

pub use edit_history::{
    DrawingSurface, EditHistory, EditHistoryController, EditNotice, EditState, MemorySurface,
    Navigation, MAX_HISTORY,
};
pub use edit_session::EditSession;
pub use error::{InputError, NeedMorePoints};
pub use landmass::{reference_landmasses, Landmass};
pub use models::{
    DistanceUnits, GenerateRouteRequest, GeoPoint, LatLng, MaritimeRoute, Port, RouteKind,
    RouteResponse, RouteSegment, SegmentStyle, SmoothRequest, SmoothResponse,
};
pub use segment::{
    segment_id, RouteType, SaveSegmentResponse, SegmentCandidate, SegmentHistoryResponse,
    SegmentMetadata, SegmentRecord, SegmentSaveRequest,
};
pub use smoothing::smooth;
pub use spatial::{distance_km, distance_nm};
pub use synthesizer::{RouteSynthesizer, SynthesizerConfig};
pub use versioning::{next_version, resolve_created_at, CreatedAtSource, VersionSnapshot};
