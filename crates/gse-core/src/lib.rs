pub mod acquisition;
pub mod calibration;
pub mod frame;
pub mod line_buffer;
pub mod pipeline;
pub mod sample;
pub mod source;
pub mod source_sim;
pub mod store;
pub mod tags;
pub mod timebase;

pub use acquisition::{
    AcquisitionConfig, AcquisitionExit, AcquisitionLoop, AcquisitionReport, AcquisitionState,
    AcquisitionStats, AcquisitionStatus, MIN_POLL_INTERVAL,
};
pub use calibration::{
    normalize, Calibration, CalibrationConfig, CalibrationConfigError, CalibrationError,
    CalibrationProfile, ChannelCalibration,
};
pub use frame::{decode, DecodeError, RawFrame};
pub use line_buffer::LineBuffer;
pub use pipeline::{FrameError, FramePipeline, Normalization, ProtocolMode};
pub use sample::Sample;
pub use source::{FrameSource, SourceError};
pub use source_sim::SimulatedController;
pub use store::{SampleStore, Snapshot};
pub use timebase::TimeBase;
