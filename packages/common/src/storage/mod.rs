mod descriptor;
mod error;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use descriptor::ImageDescriptor;
pub use error::StorageError;
pub use traits::AssetStore;
