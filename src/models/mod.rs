//! Data models for books, members and their holding relation

pub mod book;
pub mod member;
