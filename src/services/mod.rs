pub mod annotation_service;
pub mod block_id_service;
pub mod exclusion_service;
pub mod extraction_service;
pub mod highlight_patterns;
pub mod scan_service;
pub mod storage_service;
