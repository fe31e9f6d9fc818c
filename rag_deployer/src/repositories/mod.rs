pub mod content_point_qdrant_repository;
