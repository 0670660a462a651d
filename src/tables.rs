use crate::schema::*;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = taxonomies)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent: i64,
    pub ancestor: i64,
}

#[derive(Insertable)]
#[diesel(table_name = taxonomies)]
pub struct NewCategory<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub parent: i64,
    pub ancestor: i64,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: i64,
    pub parent: i64,
    pub ancestor: i64,
    pub post_id: i64,
    pub author: String,
    pub email: String,
    pub url: String,
    pub ip: String,
    pub date: chrono::NaiveDateTime,
    pub content: String,
}

#[derive(Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment<'a> {
    pub parent: i64,
    pub ancestor: i64,
    pub post_id: i64,
    pub author: &'a str,
    pub email: &'a str,
    pub url: &'a str,
    pub ip: &'a str,
    pub date: chrono::NaiveDateTime,
    pub content: &'a str,
}

/// A single row of the `options` key/value table.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = options)]
pub struct BlogOption {
    pub name: String,
    pub value: String,
}

#[derive(Insertable)]
#[diesel(table_name = options)]
pub struct NewBlogOption<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

/// `alias_of` is 0 when the tag is not an alias of another tag.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = tags)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub alias_of: i64,
}

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = tags)]
pub struct NewTag<'a> {
    pub name: &'a str,
    pub alias_of: i64,
}

#[derive(Debug, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = post_tags)]
pub struct PostTag {
    pub post_id: i64,
    pub tag_id: i64,
}

#[derive(Insertable)]
#[diesel(table_name = post_tags)]
pub struct NewPostTag {
    pub post_id: i64,
    pub tag_id: i64,
}
