pub mod models;
pub mod db;
pub mod repositories;
pub mod utils;

pub use sqlx;
pub use db::init_db;
