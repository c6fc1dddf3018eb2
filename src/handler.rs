pub mod achievement;
pub mod admin;
pub mod article;
pub mod auth;
pub mod card;
pub mod comment;
pub mod homepage;
pub mod member;
pub mod review;
pub mod upload;
