//! Build metadata persisted across processes
//!
//! Maps each build key to the artifacts built for it, one
//! [`ArtifactDescriptor`] per [`ArtifactClass`]. Every lookup re-checks that
//! the referenced artifact files still exist; an entry whose files vanished
//! is evicted and reported as a miss.

pub mod descriptor;
pub mod metadata;

pub use descriptor::{ArtifactClass, ArtifactDescriptor, PackageBuild};
pub use metadata::MetadataStore;
