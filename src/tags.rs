use crate::error::StoreError;
use crate::schema::{post_tags, tags};
pub use crate::tables::{NewPostTag, NewTag, PostTag, Tag};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum TagError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Tag not found: {0}")]
    NotFound(String),

    #[error("Tag name cannot be empty")]
    EmptyName,

    #[error("Tag name already exists: {0}")]
    DuplicateName(String),
}

impl From<diesel::result::Error> for TagError {
    fn from(err: diesel::result::Error) -> Self {
        TagError::Store(err.into())
    }
}

/// Storage operations the tag helpers are written against.
///
/// An "object" is anything tags get attached to; in the blog that is a post.
pub trait TagStore {
    fn fetch_tag_by_id(&mut self, tag_id: i64) -> Result<Option<Tag>, StoreError>;

    /// Tags whose `alias_of` is `tag_id`.
    fn fetch_tags_aliasing(&mut self, tag_id: i64) -> Result<Vec<Tag>, StoreError>;

    /// Exact, case-sensitive match.
    fn fetch_tag_by_name(&mut self, name: &str) -> Result<Option<Tag>, StoreError>;

    /// Substring match on the tag name.
    fn search_tags(&mut self, fragment: &str) -> Result<Vec<Tag>, StoreError>;

    /// Inserts a tag. `None` means the name is already taken.
    fn create_tag(&mut self, new_tag: NewTag<'_>) -> Result<Option<Tag>, StoreError>;

    fn fetch_object_tags(&mut self, object_id: i64) -> Result<Vec<Tag>, StoreError>;

    fn add_association(&mut self, object_id: i64, tag_id: i64) -> Result<(), StoreError>;

    fn remove_association(&mut self, object_id: i64, tag_id: i64) -> Result<(), StoreError>;
}

/// [`TagStore`] backed by the `tags` and `post_tags` tables.
pub struct PgTagStore<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> PgTagStore<'a> {
    pub fn new(conn: &'a mut PgConnection) -> Self {
        Self { conn }
    }
}

impl TagStore for PgTagStore<'_> {
    fn fetch_tag_by_id(&mut self, tag_id: i64) -> Result<Option<Tag>, StoreError> {
        Ok(tags::table
            .find(tag_id)
            .select(Tag::as_select())
            .first(self.conn)
            .optional()?)
    }

    fn fetch_tags_aliasing(&mut self, tag_id: i64) -> Result<Vec<Tag>, StoreError> {
        Ok(tags::table
            .filter(tags::alias_of.eq(tag_id))
            .order(tags::id.asc())
            .select(Tag::as_select())
            .load(self.conn)?)
    }

    fn fetch_tag_by_name(&mut self, name: &str) -> Result<Option<Tag>, StoreError> {
        Ok(tags::table
            .filter(tags::name.eq(name))
            .select(Tag::as_select())
            .first(self.conn)
            .optional()?)
    }

    fn search_tags(&mut self, fragment: &str) -> Result<Vec<Tag>, StoreError> {
        Ok(tags::table
            .filter(tags::name.like(like_pattern(fragment)).escape('\\'))
            .order(tags::id.asc())
            .select(Tag::as_select())
            .load(self.conn)?)
    }

    fn create_tag(&mut self, new_tag: NewTag<'_>) -> Result<Option<Tag>, StoreError> {
        Ok(diesel::insert_into(tags::table)
            .values(&new_tag)
            .on_conflict(tags::name)
            .do_nothing()
            .returning(Tag::as_returning())
            .get_result(self.conn)
            .optional()?)
    }

    fn fetch_object_tags(&mut self, object_id: i64) -> Result<Vec<Tag>, StoreError> {
        Ok(post_tags::table
            .inner_join(tags::table)
            .filter(post_tags::post_id.eq(object_id))
            .order(tags::id.asc())
            .select(Tag::as_select())
            .load(self.conn)?)
    }

    fn add_association(&mut self, object_id: i64, tag_id: i64) -> Result<(), StoreError> {
        diesel::insert_into(post_tags::table)
            .values(&NewPostTag {
                post_id: object_id,
                tag_id,
            })
            .on_conflict_do_nothing()
            .execute(self.conn)?;
        Ok(())
    }

    fn remove_association(&mut self, object_id: i64, tag_id: i64) -> Result<(), StoreError> {
        diesel::delete(
            post_tags::table
                .filter(post_tags::post_id.eq(object_id))
                .filter(post_tags::tag_id.eq(tag_id)),
        )
        .execute(self.conn)?;
        Ok(())
    }
}

/// `%fragment%` with the `LIKE` wildcards in `fragment` escaped by `\`.
fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Expands `ids` by one alias hop in both directions.
///
/// For every id the tag it aliases (if any) is added, then every tag that
/// aliases it. Alias chains are not followed further: with `B -> A` and
/// `C -> B`, resolving `{A}` yields `{A, B}` only. Ids with no stored tag are
/// kept as they are, and so are ids `<= 0`: 0 marks "not an alias" and is
/// never looked up.
pub fn resolve_aliases<S: TagStore + ?Sized>(
    store: &mut S,
    ids: &BTreeSet<i64>,
) -> Result<BTreeSet<i64>, StoreError> {
    let mut resolved = ids.clone();

    let lookups: Vec<i64> = ids.iter().copied().filter(|&id| id > 0).collect();

    for &tag_id in &lookups {
        if let Some(tag) = store.fetch_tag_by_id(tag_id)? {
            if tag.alias_of != 0 {
                resolved.insert(tag.alias_of);
            }
        }
    }

    for &tag_id in &lookups {
        resolved.extend(store.fetch_tags_aliasing(tag_id)?.into_iter().map(|t| t.id));
    }

    debug!(
        requested = ids.len(),
        resolved = resolved.len(),
        "resolved tag aliases"
    );
    Ok(resolved)
}

pub fn get_tag_ids<S: TagStore + ?Sized>(
    store: &mut S,
    object_id: i64,
    with_aliases: bool,
) -> Result<BTreeSet<i64>, StoreError> {
    let ids: BTreeSet<i64> = store
        .fetch_object_tags(object_id)?
        .into_iter()
        .map(|t| t.id)
        .collect();

    if with_aliases {
        resolve_aliases(store, &ids)
    } else {
        Ok(ids)
    }
}

pub fn get_tag_names<S: TagStore + ?Sized>(
    store: &mut S,
    object_id: i64,
) -> Result<Vec<String>, StoreError> {
    Ok(store
        .fetch_object_tags(object_id)?
        .into_iter()
        .map(|t| t.name)
        .collect())
}

pub fn get_tag_id<S: TagStore + ?Sized>(
    store: &mut S,
    name: &str,
) -> Result<Option<i64>, StoreError> {
    Ok(store.fetch_tag_by_name(name)?.map(|t| t.id))
}

pub fn has_tag_name<S: TagStore + ?Sized>(store: &mut S, name: &str) -> Result<bool, StoreError> {
    Ok(get_tag_id(store, name)?.is_some())
}

pub fn search_tags<S: TagStore + ?Sized>(
    store: &mut S,
    fragment: &str,
) -> Result<Vec<Tag>, StoreError> {
    store.search_tags(fragment)
}

/// Creates a tag, refusing names that are already taken.
pub fn add_tag<S: TagStore + ?Sized>(
    store: &mut S,
    name: &str,
    alias_of: i64,
) -> Result<Tag, TagError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TagError::EmptyName);
    }

    if has_tag_name(store, name)? {
        return Err(TagError::DuplicateName(name.to_string()));
    }

    if alias_of != 0 && store.fetch_tag_by_id(alias_of)?.is_none() {
        return Err(TagError::NotFound(alias_of.to_string()));
    }

    // The name check above can race another writer; the unique index decides.
    let tag = store
        .create_tag(NewTag { name, alias_of })?
        .ok_or_else(|| TagError::DuplicateName(name.to_string()))?;
    info!(id = tag.id, name = %tag.name, alias_of, "created tag");
    Ok(tag)
}

/// Splits a comma separated tag list, trimming entries and dropping empty
/// and repeated names. Order of first appearance is kept.
pub fn parse_tag_list(list: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagSyncReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Makes the tags attached to `object_id` match `desired`, a comma separated
/// list of names.
///
/// Detached tags stay in the tag table. Names with no tag yet get a new,
/// non-alias tag.
pub fn sync_object_tags<S: TagStore + ?Sized>(
    store: &mut S,
    object_id: i64,
    desired: &str,
) -> Result<TagSyncReport, StoreError> {
    let wanted = parse_tag_list(desired);
    let current = store.fetch_object_tags(object_id)?;

    let mut report = TagSyncReport::default();

    for tag in &current {
        if !wanted.iter().any(|name| name == &tag.name) {
            store.remove_association(object_id, tag.id)?;
            report.removed.push(tag.name.clone());
        }
    }

    for name in &wanted {
        if current.iter().any(|tag| &tag.name == name) {
            continue;
        }

        let tag_id = match store.fetch_tag_by_name(name)? {
            Some(existing) => existing.id,
            None => match store.create_tag(NewTag {
                name,
                alias_of: 0,
            })? {
                Some(created) => {
                    debug!(id = created.id, name = %created.name, "created tag during sync");
                    created.id
                }
                // Created concurrently between the lookup and the insert.
                None => store
                    .fetch_tag_by_name(name)?
                    .map(|t| t.id)
                    .ok_or_else(|| {
                        StoreError::Unavailable(format!("tag {} vanished during sync", name))
                    })?,
            },
        };

        store.add_association(object_id, tag_id)?;
        report.added.push(name.clone());
    }

    if report.added.is_empty() && report.removed.is_empty() {
        debug!(object_id, "tags already in sync");
    } else {
        info!(
            object_id,
            added = ?report.added,
            removed = ?report.removed,
            "synchronized object tags"
        );
    }

    Ok(report)
}

/// Looks up a tag by id, turning a missing row into [`TagError::NotFound`].
pub fn require_tag<S: TagStore + ?Sized>(store: &mut S, tag_id: i64) -> Result<Tag, TagError> {
    store.fetch_tag_by_id(tag_id)?.ok_or_else(|| {
        warn!(id = tag_id, "tag lookup failed");
        TagError::NotFound(tag_id.to_string())
    })
}
