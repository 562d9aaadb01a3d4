//! Vizij Trail Core (engine-agnostic)
//!
//! Real-time weapon-trail ribbons: a rolling history of two moving anchor
//! points is fitted with a curve and turned into a triangle mesh that fades
//! behind the moving object. Hosts drive two phases per frame:
//! [`TrailSystem::update`] for every trail, then [`TrailSystem::late_update`]
//! to push changed mesh arrays into a [`MeshSink`].

pub mod buffer;
pub mod config;
pub mod curve;
pub mod error;
pub mod history;
pub mod ids;
pub mod snapshot;
pub mod spline;
pub mod system;
pub mod trail;

// Re-exports for consumers (adapters)
pub use buffer::{Aabb, FlushReport, GeometryBuffer, MeshSink, Segment};
pub use config::{PoolConfig, TrailConfig};
pub use curve::CurveAdapter;
pub use error::TrailError;
pub use history::HistoryWindow;
pub use ids::{BufferId, IdAllocator, MaterialKey, TrailId};
pub use snapshot::{Snapshot, SnapshotHandle, SnapshotPool};
pub use spline::{CatmullRomSpline, ControlPoint, CurveFitter};
pub use system::{AnchorResolver, TrailSystem};
pub use trail::{Anchors, TrailInstance, TrailState, MIN_FADE_DURATION};

pub use glam::{Vec2, Vec3, Vec4};
