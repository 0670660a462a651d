use crate::error::StoreError;
use crate::schema::comments;
pub use crate::tables::{Comment, NewComment};
use crate::tree::{build_tree, TreeItem, TreeNode, ROOT_ID};
use diesel::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[+-_.a-zA-Z0-9]+@[[:alnum:]]+(\.[[:alnum:]]+)+$").unwrap();
}

pub const MAX_AUTHOR_CHARS: usize = 32;
pub const MAX_CONTENT_CHARS: usize = 4096;

#[derive(Error, Debug)]
pub enum CommentError {
    #[error("Invalid comment: {0}")]
    Invalid(String),

    #[error("Comment not found: {0}")]
    NotFound(i64),

    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A comment as submitted by a visitor.
///
/// `id` and `ancestor` are only accepted so that a client setting them can
/// be rejected; both are assigned by [`Comment::create`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub parent: i64,
    #[serde(default)]
    pub ancestor: i64,
    pub post_id: i64,
    pub author: String,
    pub email: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub date: Option<chrono::NaiveDateTime>,
    pub content: String,
}

impl CreateCommentRequest {
    /// Checks everything that can be checked without the database and
    /// normalises the URL.
    pub fn validate(&mut self) -> Result<(), CommentError> {
        if self.id != 0 {
            return Err(CommentError::Invalid("comment id must be 0".to_string()));
        }

        if self.ancestor != 0 {
            return Err(CommentError::Invalid(
                "ancestor cannot be specified".to_string(),
            ));
        }

        let author_len = self.author.chars().count();
        if author_len == 0 || author_len > MAX_AUTHOR_CHARS {
            return Err(CommentError::Invalid(
                "author is empty or too long".to_string(),
            ));
        }

        if !EMAIL_REGEX.is_match(&self.email) {
            return Err(CommentError::Invalid("email is not valid".to_string()));
        }

        self.url = self.url.trim().to_string();

        let content_len = self.content.chars().count();
        if content_len == 0 || content_len > MAX_CONTENT_CHARS {
            return Err(CommentError::Invalid(
                "content is empty or too long".to_string(),
            ));
        }

        Ok(())
    }
}

/// Selects top-level comments (or a single comment when `id > 0`) together
/// with every reply grouped under them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ThreadQuery {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub post_id: i64,
    #[serde(default)]
    pub ascending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub children: Vec<Comment>,
}

impl TreeItem for Comment {
    fn get_id(&self) -> i64 {
        self.id
    }

    fn get_parent_id(&self) -> i64 {
        self.parent
    }
}

impl Comment {
    pub fn count_all(conn: &mut PgConnection) -> QueryResult<i64> {
        use crate::schema::comments::dsl::*;

        comments.count().get_result(conn)
    }

    pub fn get_by_id(conn: &mut PgConnection, comment_id: i64) -> QueryResult<Comment> {
        use crate::schema::comments::dsl::*;

        comments
            .find(comment_id)
            .select(Comment::as_select())
            .first(conn)
    }

    /// Deletes the comment and every reply grouped under it.
    pub fn delete_with_children(conn: &mut PgConnection, comment_id: i64) -> QueryResult<usize> {
        use crate::schema::comments::dsl::*;

        let deleted = diesel::delete(comments.filter(id.eq(comment_id).or(ancestor.eq(comment_id))))
            .execute(conn)?;

        info!(id = comment_id, deleted, "deleted comment thread");
        Ok(deleted)
    }

    pub fn get_recent(conn: &mut PgConnection, num: i64) -> QueryResult<Vec<Comment>> {
        use crate::schema::comments::dsl::*;

        comments
            .order((date.desc(), id.desc()))
            .limit(num)
            .select(Comment::as_select())
            .load(conn)
    }

    /// All replies whose top-level ancestor is `ancestor_id`.
    pub fn get_children(conn: &mut PgConnection, ancestor_id: i64) -> QueryResult<Vec<Comment>> {
        use crate::schema::comments::dsl::*;

        comments
            .filter(ancestor.eq(ancestor_id))
            .order(id.asc())
            .select(Comment::as_select())
            .load(conn)
    }

    /// Returns 0 for a top-level comment.
    pub fn get_ancestor(conn: &mut PgConnection, comment_id: i64) -> QueryResult<i64> {
        use crate::schema::comments::dsl::*;

        comments.find(comment_id).select(ancestor).first(conn)
    }

    pub fn get_threads(
        conn: &mut PgConnection,
        query: &ThreadQuery,
    ) -> QueryResult<Vec<CommentThread>> {
        use crate::schema::comments::dsl::*;

        let mut select = comments.select(Comment::as_select()).into_boxed();

        if query.id > 0 {
            select = select.filter(id.eq(query.id));
        } else {
            select = select.filter(parent.eq(ROOT_ID));

            if query.post_id > 0 {
                select = select.filter(post_id.eq(query.post_id));
            }

            select = if query.ascending {
                select.order(id.asc())
            } else {
                select.order(id.desc())
            };

            if query.count > 0 {
                select = select.limit(query.count);
                if query.offset >= 0 {
                    select = select.offset(query.offset);
                }
            }
        }

        let tops: Vec<Comment> = select.load(conn)?;

        let mut threads = Vec::with_capacity(tops.len());
        for comment in tops {
            let children = Comment::get_children(conn, comment.id)?;
            threads.push(CommentThread { comment, children });
        }

        Ok(threads)
    }

    /// Every comment of a post arranged by reply.
    pub fn get_tree_for_post(
        conn: &mut PgConnection,
        target_post_id: i64,
    ) -> QueryResult<Vec<TreeNode<Comment>>> {
        use crate::schema::comments::dsl::*;

        let all: Vec<Comment> = comments
            .filter(post_id.eq(target_post_id))
            .order(id.asc())
            .select(Comment::as_select())
            .load(conn)?;

        debug!(post_id = target_post_id, count = all.len(), "building comment tree");
        Ok(build_tree(all))
    }

    pub fn create(
        conn: &mut PgConnection,
        mut request: CreateCommentRequest,
    ) -> Result<Comment, CommentError> {
        request.validate()?;

        conn.transaction(|conn| {
            let ancestor_id = if request.parent > 0 {
                let stored = match Comment::get_ancestor(conn, request.parent) {
                    Ok(stored) => stored,
                    Err(diesel::result::Error::NotFound) => {
                        return Err(CommentError::Invalid(format!(
                            "parent comment {} does not exist",
                            request.parent
                        )));
                    }
                    Err(err) => return Err(err.into()),
                };
                if stored == ROOT_ID {
                    request.parent
                } else {
                    stored
                }
            } else {
                ROOT_ID
            };

            let new_comment = NewComment {
                parent: request.parent.max(ROOT_ID),
                ancestor: ancestor_id,
                post_id: request.post_id,
                author: &request.author,
                email: &request.email,
                url: &request.url,
                ip: &request.ip,
                date: request
                    .date
                    .unwrap_or_else(|| chrono::Utc::now().naive_utc()),
                content: &request.content,
            };

            let comment = diesel::insert_into(comments::table)
                .values(&new_comment)
                .returning(Comment::as_returning())
                .get_result(conn)?;

            info!(
                id = comment.id,
                post_id = comment.post_id,
                ancestor = comment.ancestor,
                "created comment"
            );
            Ok(comment)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::with_test_db;

    fn request(author: &str, email: &str, content: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            id: 0,
            parent: 0,
            ancestor: 0,
            post_id: 1,
            author: author.to_string(),
            email: email.to_string(),
            url: String::new(),
            ip: "127.0.0.1".to_string(),
            date: None,
            content: content.to_string(),
        }
    }

    fn reply_to(parent: i64, post: i64) -> CreateCommentRequest {
        CreateCommentRequest {
            parent,
            post_id: post,
            ..request("Bob", "bob@example.com", "A reply")
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let mut req = request("Alice", "alice@example.com", "Nice post");
        req.url = "  https://example.com  ".to_string();

        assert!(req.validate().is_ok());
        assert_eq!(req.url, "https://example.com");
    }

    #[test]
    fn test_client_assigned_ids_are_rejected() {
        let mut with_id = request("Alice", "alice@example.com", "Hi");
        with_id.id = 3;
        assert!(matches!(with_id.validate(), Err(CommentError::Invalid(_))));

        let mut with_ancestor = request("Alice", "alice@example.com", "Hi");
        with_ancestor.ancestor = 3;
        assert!(matches!(
            with_ancestor.validate(),
            Err(CommentError::Invalid(_))
        ));
    }

    #[test]
    fn test_author_length_counts_characters() {
        let mut empty = request("", "alice@example.com", "Hi");
        assert!(empty.validate().is_err());

        // 32 multi-byte characters is still within the limit
        let mut wide = request(&"名".repeat(32), "alice@example.com", "Hi");
        assert!(wide.validate().is_ok());

        let mut too_long = request(&"a".repeat(33), "alice@example.com", "Hi");
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_email_format() {
        for good in ["a@b.com", "first.last+tag@mail.example.org", "x_y@host.io"] {
            let mut req = request("Alice", good, "Hi");
            assert!(req.validate().is_ok(), "{good} should be accepted");
        }

        for bad in ["", "plainaddress", "a@b", "a@.com", "a b@c.com"] {
            let mut req = request("Alice", bad, "Hi");
            assert!(req.validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_content_limits() {
        let mut empty = request("Alice", "alice@example.com", "");
        assert!(empty.validate().is_err());

        let mut max = request("Alice", "alice@example.com", &"x".repeat(MAX_CONTENT_CHARS));
        assert!(max.validate().is_ok());

        let mut over = request(
            "Alice",
            "alice@example.com",
            &"x".repeat(MAX_CONTENT_CHARS + 1),
        );
        assert!(over.validate().is_err());
    }

    #[test]
    #[ignore = "needs a Postgres database at DATABASE_URL"]
    fn test_replies_share_the_top_level_ancestor() {
        with_test_db::<CommentError, _>(|conn| {
            let top = Comment::create(conn, request("Alice", "alice@example.com", "First"))?;
            let reply = Comment::create(conn, reply_to(top.id, 1))?;
            let nested = Comment::create(conn, reply_to(reply.id, 1))?;

            assert_eq!(top.ancestor, 0);
            assert_eq!(reply.ancestor, top.id);
            assert_eq!(nested.ancestor, top.id);
            assert_eq!(nested.parent, reply.id);

            assert_eq!(Comment::get_ancestor(conn, nested.id)?, top.id);
            assert_eq!(Comment::get_ancestor(conn, top.id)?, 0);

            let children = Comment::get_children(conn, top.id)?;
            let ids: Vec<i64> = children.iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![reply.id, nested.id]);

            Ok(())
        });
    }

    #[test]
    #[ignore = "needs a Postgres database at DATABASE_URL"]
    fn test_reply_to_missing_parent_is_rejected() {
        with_test_db::<CommentError, _>(|conn| {
            let result = Comment::create(conn, reply_to(i64::MAX, 1));
            assert!(matches!(result, Err(CommentError::Invalid(_))));
            Ok(())
        });
    }

    #[test]
    #[ignore = "needs a Postgres database at DATABASE_URL"]
    fn test_delete_removes_whole_thread() {
        with_test_db::<CommentError, _>(|conn| {
            let before = Comment::count_all(conn)?;

            let top = Comment::create(conn, request("Alice", "alice@example.com", "First"))?;
            let reply = Comment::create(conn, reply_to(top.id, 1))?;
            Comment::create(conn, reply_to(reply.id, 1))?;
            let other = Comment::create(conn, request("Carol", "carol@example.com", "Other"))?;

            assert_eq!(Comment::count_all(conn)?, before + 4);
            assert_eq!(Comment::delete_with_children(conn, top.id)?, 3);
            assert_eq!(Comment::count_all(conn)?, before + 1);
            assert!(Comment::get_by_id(conn, other.id).is_ok());

            Ok(())
        });
    }

    #[test]
    #[ignore = "needs a Postgres database at DATABASE_URL"]
    fn test_threads_and_tree_for_post() {
        with_test_db::<CommentError, _>(|conn| {
            let post = 4242;
            let mut first = request("Alice", "alice@example.com", "First");
            first.post_id = post;
            let first = Comment::create(conn, first)?;
            let mut second = request("Carol", "carol@example.com", "Second");
            second.post_id = post;
            let second = Comment::create(conn, second)?;
            let reply = Comment::create(conn, reply_to(first.id, post))?;

            let threads = Comment::get_threads(
                conn,
                &ThreadQuery {
                    post_id: post,
                    ascending: true,
                    ..ThreadQuery::default()
                },
            )?;
            let top_ids: Vec<i64> = threads.iter().map(|t| t.comment.id).collect();
            assert_eq!(top_ids, vec![first.id, second.id]);
            assert_eq!(threads[0].children.len(), 1);
            assert_eq!(threads[0].children[0].id, reply.id);

            let newest = Comment::get_threads(
                conn,
                &ThreadQuery {
                    post_id: post,
                    count: 1,
                    ..ThreadQuery::default()
                },
            )?;
            assert_eq!(newest.len(), 1);
            assert_eq!(newest[0].comment.id, second.id);

            let single = Comment::get_threads(
                conn,
                &ThreadQuery {
                    id: reply.id,
                    ..ThreadQuery::default()
                },
            )?;
            assert_eq!(single.len(), 1);
            assert_eq!(single[0].comment.id, reply.id);

            let tree = Comment::get_tree_for_post(conn, post)?;
            assert_eq!(tree.len(), 2);
            assert_eq!(tree[0].children[0].data.id, reply.id);

            Ok(())
        });
    }
}
