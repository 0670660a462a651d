pub mod api;
pub mod categories;
pub mod comments;
pub mod config;
pub mod error;
pub mod options;
pub mod schema;
pub mod tables;
pub mod tags;
pub mod tree;

#[cfg(test)]
mod test_utils;

pub const CATEGORIES_API: &str = "categories";
pub const COMMENTS_API: &str = "comments";
pub const OPTIONS_API: &str = "options";
pub const POSTS_API: &str = "posts";
pub const TAGS_API: &str = "tags";
