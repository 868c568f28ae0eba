//! Storage backend implementations.

mod bucket;

pub mod aliyun_oss;
pub mod local;
pub mod s3;

pub use aliyun_oss::AliyunOssBackend;
pub use local::LocalBackend;
pub use s3::S3Backend;
