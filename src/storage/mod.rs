pub mod bucket;
pub mod db;
pub mod models;
pub mod object_id;
mod tables;

pub use bucket::{Bucket, BucketError, BucketOptions, DEFAULT_CHUNK_SIZE};
pub use db::{Database, DatabaseError};
pub use object_id::{ObjectId, ObjectIdError};
