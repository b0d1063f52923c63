mod core;
mod filesystem;
mod s3;

pub use core::*;
pub use filesystem::FsBlobStorage;
pub use s3::S3BlobStorage;
