//! Invocable pipelines.
//!
//! - korpus: DGS Korpus acquisition and analysis
//! - videos: hosted videos grouped by language
//! - poses: pose files rendered to videos

pub mod korpus;
pub mod poses;
pub mod videos;

pub use korpus::{render_charts, AnalysisSummary, KorpusOptions, KorpusPipeline, RunMode};
pub use poses::{discover, PosesOptions, PosesPipeline, RenderJob};
pub use videos::{VideosOptions, VideosPipeline};
