use crate::schema::taxonomies;
pub use crate::tables::{Category, NewCategory};
use crate::tree::{build_tree, TreeItem, TreeNode, ROOT_ID};
use diesel::prelude::*;
use tracing::{debug, info};

impl TreeItem for Category {
    fn get_id(&self) -> i64 {
        self.id
    }

    fn get_parent_id(&self) -> i64 {
        self.parent
    }
}

impl Category {
    pub fn get_by_id(conn: &mut PgConnection, category_id: i64) -> QueryResult<Category> {
        use crate::schema::taxonomies::dsl::*;

        taxonomies
            .find(category_id)
            .select(Category::as_select())
            .first(conn)
    }

    pub fn get_all(conn: &mut PgConnection) -> QueryResult<Vec<Category>> {
        use crate::schema::taxonomies::dsl::*;

        taxonomies
            .order(id.asc())
            .select(Category::as_select())
            .load(conn)
    }

    /// Direct children only; grandchildren are not included.
    pub fn get_children(conn: &mut PgConnection, parent_id: i64) -> QueryResult<Vec<Category>> {
        use crate::schema::taxonomies::dsl::*;

        taxonomies
            .filter(parent.eq(parent_id))
            .order(id.asc())
            .select(Category::as_select())
            .load(conn)
    }

    pub fn get_tree(conn: &mut PgConnection) -> QueryResult<Vec<TreeNode<Category>>> {
        let all = Category::get_all(conn)?;
        debug!(count = all.len(), "building category tree");
        Ok(build_tree(all))
    }

    /// Inserts a category below `parent_id` (0 for a top-level category).
    ///
    /// `ancestor` is the top-level category the new one ends up under, or 0
    /// when it is top-level itself.
    pub fn create(
        conn: &mut PgConnection,
        category_name: &str,
        category_slug: &str,
        parent_id: i64,
    ) -> QueryResult<Category> {
        let ancestor_id = if parent_id == ROOT_ID {
            ROOT_ID
        } else {
            let parent_category = Category::get_by_id(conn, parent_id)?;
            if parent_category.ancestor == ROOT_ID {
                parent_category.id
            } else {
                parent_category.ancestor
            }
        };

        let new_category = NewCategory {
            name: category_name,
            slug: category_slug,
            parent: parent_id,
            ancestor: ancestor_id,
        };

        let category = diesel::insert_into(taxonomies::table)
            .values(&new_category)
            .returning(Category::as_returning())
            .get_result(conn)?;

        info!(id = category.id, parent = parent_id, "created category");
        Ok(category)
    }

    pub fn update(
        conn: &mut PgConnection,
        category_id: i64,
        new_name: &str,
        new_slug: &str,
    ) -> QueryResult<Category> {
        use crate::schema::taxonomies::dsl::*;

        diesel::update(taxonomies.find(category_id))
            .set((name.eq(new_name), slug.eq(new_slug)))
            .returning(Category::as_returning())
            .get_result(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::with_test_db;

    #[test]
    #[ignore = "needs a Postgres database at DATABASE_URL"]
    fn test_create_and_read_category() {
        with_test_db::<diesel::result::Error, _>(|conn| {
            let created = Category::create(conn, "Rust", "rust", 0)?;
            assert_eq!(created.parent, 0);
            assert_eq!(created.ancestor, 0);

            let found = Category::get_by_id(conn, created.id)?;
            assert_eq!(found, created);

            Ok(())
        });
    }

    #[test]
    #[ignore = "needs a Postgres database at DATABASE_URL"]
    fn test_missing_category_is_not_found() {
        with_test_db::<diesel::result::Error, _>(|conn| {
            let result = Category::get_by_id(conn, i64::MAX);
            assert!(matches!(result, Err(diesel::result::Error::NotFound)));
            Ok(())
        });
    }

    #[test]
    #[ignore = "needs a Postgres database at DATABASE_URL"]
    fn test_ancestor_points_at_top_level_category() {
        with_test_db::<diesel::result::Error, _>(|conn| {
            let top = Category::create(conn, "Programming", "programming", 0)?;
            let middle = Category::create(conn, "Languages", "languages", top.id)?;
            let leaf = Category::create(conn, "Rust", "rust", middle.id)?;

            assert_eq!(middle.ancestor, top.id);
            assert_eq!(leaf.ancestor, top.id);
            assert_eq!(leaf.parent, middle.id);

            Ok(())
        });
    }

    #[test]
    #[ignore = "needs a Postgres database at DATABASE_URL"]
    fn test_children_and_tree() {
        with_test_db::<diesel::result::Error, _>(|conn| {
            let top = Category::create(conn, "Travel", "travel", 0)?;
            let first = Category::create(conn, "Asia", "asia", top.id)?;
            let second = Category::create(conn, "Europe", "europe", top.id)?;
            Category::create(conn, "Japan", "japan", first.id)?;

            let children = Category::get_children(conn, top.id)?;
            let child_ids: Vec<i64> = children.iter().map(|c| c.id).collect();
            assert_eq!(child_ids, vec![first.id, second.id]);

            let tree = Category::get_tree(conn)?;
            let travel = tree
                .iter()
                .find(|node| node.data.id == top.id)
                .expect("top-level category should be a root");
            assert_eq!(travel.count(), 4);
            assert_eq!(travel.children[0].data.id, first.id);
            assert_eq!(travel.children[0].children.len(), 1);

            Ok(())
        });
    }

    #[test]
    #[ignore = "needs a Postgres database at DATABASE_URL"]
    fn test_update_category() {
        with_test_db::<diesel::result::Error, _>(|conn| {
            let created = Category::create(conn, "Misc", "misc", 0)?;
            let updated = Category::update(conn, created.id, "Other", "other")?;

            assert_eq!(updated.id, created.id);
            assert_eq!(updated.name, "Other");
            assert_eq!(updated.slug, "other");

            Ok(())
        });
    }
}
