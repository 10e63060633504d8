pub mod db;
pub mod models;
pub mod recommend;
pub mod service;
pub mod spoonacular;
