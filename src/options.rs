pub use crate::tables::{BlogOption, NewBlogOption};
use diesel::prelude::*;
use std::fmt::Display;
use tracing::debug;

impl BlogOption {
    pub fn has(conn: &mut PgConnection, option_name: &str) -> QueryResult<bool> {
        use crate::schema::options::dsl::*;

        diesel::select(diesel::dsl::exists(options.filter(name.eq(option_name)))).get_result(conn)
    }

    pub fn get(conn: &mut PgConnection, option_name: &str) -> QueryResult<Option<String>> {
        use crate::schema::options::dsl::*;

        options
            .filter(name.eq(option_name))
            .select(value)
            .first::<String>(conn)
            .optional()
    }

    /// Stores `option_value` under `option_name`, replacing any previous value.
    /// Values are kept in their `Display` form.
    pub fn set<V: Display>(
        conn: &mut PgConnection,
        option_name: &str,
        option_value: V,
    ) -> QueryResult<BlogOption> {
        use crate::schema::options::dsl::*;

        let rendered = option_value.to_string();
        let new_option = NewBlogOption {
            name: option_name,
            value: &rendered,
        };

        debug!(name = option_name, "storing option");
        diesel::insert_into(options)
            .values(&new_option)
            .on_conflict(name)
            .do_update()
            .set(value.eq(&rendered))
            .returning(BlogOption::as_returning())
            .get_result(conn)
    }

    pub fn delete(conn: &mut PgConnection, option_name: &str) -> QueryResult<usize> {
        use crate::schema::options::dsl::*;

        diesel::delete(options.filter(name.eq(option_name))).execute(conn)
    }
}
