pub mod activity_service;
pub mod auth_service;
pub mod caption_service;
pub mod entitlement_service;
pub mod generation_service;
pub mod license_service;
pub mod user_service;

#[cfg(test)]
pub mod test_db;
