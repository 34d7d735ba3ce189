pub mod assembler;
pub mod customization;
pub mod error;
pub mod expander;
pub mod metadata;
pub mod orchestrator;
pub mod report;
pub mod unit;

pub use assembler::{Assembly, BuildPropertyAssembler};
pub use customization::{CustomizationFileWriter, PostProcessingFile, PostProcessingKind};
pub use error::*;
pub use expander::PlatformMatrixExpander;
pub use metadata::{MetadataDescriptor, MetadataPublisher};
pub use orchestrator::ExportOperationOrchestrator;
pub use report::*;
pub use unit::ExportUnit;
