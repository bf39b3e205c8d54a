pub mod permission_service;
pub mod role_service;
