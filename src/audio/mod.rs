// Audio module - frame sources, lock-free frame pool and live capture

pub mod buffer_pool;
pub mod callback;
#[cfg(not(target_os = "android"))]
pub mod engine_cpal;
pub mod source;

// Re-export commonly used types for convenience
pub use buffer_pool::{
    AnalysisChannels, BufferPool, BufferPoolChannels, CaptureChannels, FrameBuffer,
};
#[cfg(not(target_os = "android"))]
pub use engine_cpal::CaptureEngine;
pub use source::{run_detector, FrameSource, SampleFrameSource, WavFrameSource};
