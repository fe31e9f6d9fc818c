pub mod collection;
pub mod content_point;
pub mod payload_filter;
pub mod query_record;
pub mod record;
pub mod search_result;
