pub mod activity_repo;
pub mod license_repo;
pub mod profile_repo;
