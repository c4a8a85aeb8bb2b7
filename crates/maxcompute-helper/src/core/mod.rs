pub mod limits;
pub mod normalize;
pub mod paging;
pub mod query;
pub mod schema;
pub mod types;
pub mod vendor;
