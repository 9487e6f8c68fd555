//! Combined store trait and the SQLite implementation.

use crate::error::{StoreError, StoreResult, like_pattern};
use crate::repos::{
    CategoryRepo, CommentRepo, DocumentRepo, FavoriteRepo, SessionRepo, TagRepo, UserRepo,
};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Everything the HTTP layer needs from persistence.
#[async_trait]
pub trait BlogStore:
    UserRepo
    + SessionRepo
    + CategoryRepo
    + TagRepo
    + DocumentRepo
    + CommentRepo
    + FavoriteRepo
    + Send
    + Sync
{
    /// Create tables and indexes if they do not exist.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity.
    async fn health_check(&self) -> StoreResult<()>;
}

/// Columns of a document joined with author and category.
pub(crate) const DOCUMENT_DETAIL_SELECT: &str = r#"
    SELECT d.id, d.title, d.content, d.excerpt, d.slug, d.keywords, d.featured_image,
           d.author_id, d.category_id, d.published, d.view_count, d.created_at, d.updated_at,
           u.name AS author_name, u.email AS author_email, u.avatar AS author_avatar,
           c.name AS category_name, c.slug AS category_slug, c.color AS category_color
    FROM documents d
    JOIN users u ON u.id = d.author_id
    LEFT JOIN categories c ON c.id = d.category_id
"#;

/// Columns of a comment joined with its author.
pub(crate) const COMMENT_WITH_AUTHOR_SELECT: &str = r#"
    SELECT cm.id, cm.content, cm.author_id, cm.document_id, cm.parent_id, cm.published,
           cm.created_at, cm.updated_at,
           u.name AS author_name, u.avatar AS author_avatar
    FROM comments cm
    JOIN users u ON u.id = cm.author_id
"#;

/// Favorites joined with a summary of their document.
pub(crate) const FAVORITE_DOCUMENT_SELECT: &str = r#"
    SELECT f.id AS favorite_id, f.created_at AS favorited_at,
           d.id AS document_id, d.title, d.slug, d.excerpt, d.published, d.view_count,
           d.updated_at
    FROM favorites f
    JOIN documents d ON d.id = f.document_id
"#;

/// SQLite-backed store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) a SQLite database and run migrations.
    pub async fn new(path: impl AsRef<Path>, query_timeout_secs: Option<u64>) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // SQLite has no statement cancellation; the timeout only bounds lock waits.
        let busy_timeout = Duration::from_secs(query_timeout_secs.unwrap_or(5).max(1));

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            // Single writer avoids "database is locked" under concurrent handlers.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "SQLite store opened");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl BlogStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn not_found_unless_affected(rows: u64, what: &str) -> StoreResult<()> {
    if rows == 0 {
        Err(StoreError::NotFound(format!("{what} not found")))
    } else {
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use crate::repos::{UserFilter, UserQuery, Visibility};
    use folio_core::slug::slugify;
    use folio_core::taxonomy::DEFAULT_TAG_COLOR;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn visibility_clause(visibility: Visibility) -> &'static str {
        match visibility {
            Visibility::Published => "d.published = 1",
            Visibility::All => "1 = 1",
        }
    }

    const USER_FILTER_SQL: &str = r#"
        WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\' OR email LIKE ?1 ESCAPE '\')
          AND (?2 IS NULL OR membership_level = ?2)
          AND (?3 IS NULL OR status = ?3)
    "#;

    fn search_arg(filter: &UserFilter) -> Option<String> {
        filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern)
    }

    #[async_trait]
    impl UserRepo for SqliteStore {
        async fn create_user(&self, user: &UserRow) -> StoreResult<()> {
            sqlx::query(
                r#"
                INSERT INTO users (id, email, password_hash, name, avatar, is_admin,
                                   membership_level, status, last_login_at, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(&user.avatar)
            .bind(user.is_admin)
            .bind(&user.membership_level)
            .bind(&user.status)
            .bind(user.last_login_at)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_write(e, "user", &["email"]))?;
            Ok(())
        }

        async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn update_user(&self, user: &UserRow) -> StoreResult<()> {
            let result = sqlx::query(
                r#"
                UPDATE users
                SET email = ?, name = ?, avatar = ?, is_admin = ?, membership_level = ?,
                    status = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.avatar)
            .bind(user.is_admin)
            .bind(&user.membership_level)
            .bind(&user.status)
            .bind(user.updated_at)
            .bind(user.id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_write(e, "user", &["email"]))?;
            not_found_unless_affected(result.rows_affected(), "user")
        }

        async fn update_user_password(
            &self,
            user_id: Uuid,
            password_hash: &str,
            updated_at: OffsetDateTime,
        ) -> StoreResult<()> {
            let result =
                sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
                    .bind(password_hash)
                    .bind(updated_at)
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?;
            not_found_unless_affected(result.rows_affected(), "user")
        }

        async fn record_login(&self, user_id: Uuid, at: OffsetDateTime) -> StoreResult<()> {
            sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
                .bind(at)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn delete_user(&self, user_id: Uuid) -> StoreResult<()> {
            let mut tx = self.pool.begin().await?;

            let authored: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE author_id = ?")
                    .bind(user_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if authored > 0 {
                return Err(StoreError::Constraint(format!(
                    "user still authors {authored} document(s)"
                )));
            }

            // Sessions, favorites and comments cascade.
            let result = sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            not_found_unless_affected(result.rows_affected(), "user")?;

            tx.commit().await?;
            Ok(())
        }

        async fn list_users(&self, query: &UserQuery) -> StoreResult<Vec<UserRow>> {
            let sql = format!(
                "SELECT * FROM users {USER_FILTER_SQL} ORDER BY {} {}, id LIMIT ?4 OFFSET ?5",
                query.sort_by.column(),
                query.sort_order.as_sql(),
            );
            let rows = sqlx::query_as::<_, UserRow>(&sql)
                .bind(search_arg(&query.filter))
                .bind(&query.filter.membership_level)
                .bind(&query.filter.status)
                .bind(query.limit)
                .bind(query.offset)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn count_users(&self, filter: &UserFilter) -> StoreResult<u64> {
            let sql = format!("SELECT COUNT(*) FROM users {USER_FILTER_SQL}");
            let count: i64 = sqlx::query_scalar(&sql)
                .bind(search_arg(filter))
                .bind(&filter.membership_level)
                .bind(&filter.status)
                .fetch_one(&self.pool)
                .await?;
            Ok(count as u64)
        }
    }

    #[async_trait]
    impl SessionRepo for SqliteStore {
        async fn create_session(&self, session: &SessionRow) -> StoreResult<()> {
            sqlx::query(
                "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(session.id)
            .bind(session.user_id)
            .bind(&session.token_hash)
            .bind(session.expires_at)
            .bind(session.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_write(e, "session", &["token_hash"]))?;
            Ok(())
        }

        async fn get_session_by_hash(&self, token_hash: &str) -> StoreResult<Option<SessionRow>> {
            let row =
                sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token_hash = ?")
                    .bind(token_hash)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn delete_session(&self, session_id: Uuid) -> StoreResult<()> {
            sqlx::query("DELETE FROM sessions WHERE id = ?")
                .bind(session_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn delete_user_sessions(
            &self,
            user_id: Uuid,
            keep: Option<Uuid>,
        ) -> StoreResult<u64> {
            let result = sqlx::query(
                "DELETE FROM sessions WHERE user_id = ?1 AND (?2 IS NULL OR id != ?2)",
            )
            .bind(user_id)
            .bind(keep)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected())
        }

        async fn purge_expired_sessions(&self, now: OffsetDateTime) -> StoreResult<u64> {
            let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
                .bind(now)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected())
        }
    }

    #[async_trait]
    impl CategoryRepo for SqliteStore {
        async fn create_category(&self, category: &CategoryRow) -> StoreResult<()> {
            sqlx::query(
                "INSERT INTO categories (id, name, slug, description, color, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(&category.color)
            .bind(category.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_write(e, "category", &["slug", "name"]))?;
            Ok(())
        }

        async fn get_category(&self, category_id: Uuid) -> StoreResult<Option<CategoryRow>> {
            let row = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = ?")
                .bind(category_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_category_by_slug(&self, slug: &str) -> StoreResult<Option<CategoryRow>> {
            let row = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE slug = ?")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_categories(&self) -> StoreResult<Vec<CategoryRow>> {
            let rows = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn update_category(&self, category: &CategoryRow) -> StoreResult<()> {
            let result = sqlx::query(
                "UPDATE categories SET name = ?, slug = ?, description = ?, color = ? WHERE id = ?",
            )
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(&category.color)
            .bind(category.id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_write(e, "category", &["slug", "name"]))?;
            not_found_unless_affected(result.rows_affected(), "category")
        }

        async fn delete_category(&self, category_id: Uuid) -> StoreResult<()> {
            // documents.category_id is ON DELETE SET NULL.
            let result = sqlx::query("DELETE FROM categories WHERE id = ?")
                .bind(category_id)
                .execute(&self.pool)
                .await?;
            not_found_unless_affected(result.rows_affected(), "category")
        }
    }

    #[async_trait]
    impl TagRepo for SqliteStore {
        async fn create_tag(&self, tag: &TagRow) -> StoreResult<()> {
            sqlx::query("INSERT INTO tags (id, name, slug, color, created_at) VALUES (?, ?, ?, ?, ?)")
                .bind(tag.id)
                .bind(&tag.name)
                .bind(&tag.slug)
                .bind(&tag.color)
                .bind(tag.created_at)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::from_write(e, "tag", &["slug", "name"]))?;
            Ok(())
        }

        async fn get_tag(&self, tag_id: Uuid) -> StoreResult<Option<TagRow>> {
            let row = sqlx::query_as::<_, TagRow>("SELECT * FROM tags WHERE id = ?")
                .bind(tag_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_tags(&self) -> StoreResult<Vec<TagRow>> {
            let rows = sqlx::query_as::<_, TagRow>("SELECT * FROM tags ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn update_tag(&self, tag: &TagRow) -> StoreResult<()> {
            let result = sqlx::query("UPDATE tags SET name = ?, slug = ?, color = ? WHERE id = ?")
                .bind(&tag.name)
                .bind(&tag.slug)
                .bind(&tag.color)
                .bind(tag.id)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::from_write(e, "tag", &["slug", "name"]))?;
            not_found_unless_affected(result.rows_affected(), "tag")
        }

        async fn delete_tag(&self, tag_id: Uuid) -> StoreResult<()> {
            let result = sqlx::query("DELETE FROM tags WHERE id = ?")
                .bind(tag_id)
                .execute(&self.pool)
                .await?;
            not_found_unless_affected(result.rows_affected(), "tag")
        }

        async fn get_document_tags(&self, document_id: Uuid) -> StoreResult<Vec<TagRow>> {
            let rows = sqlx::query_as::<_, TagRow>(
                r#"
                SELECT t.* FROM tags t
                JOIN document_tags dt ON dt.tag_id = t.id
                WHERE dt.document_id = ?
                ORDER BY t.name
                "#,
            )
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn find_or_create_tags(&self, names: &[String]) -> StoreResult<Vec<TagRow>> {
            let mut tx = self.pool.begin().await?;
            let mut resolved: Vec<TagRow> = Vec::with_capacity(names.len());

            for name in names {
                let name = name.trim();
                let slug = slugify(name);
                if slug.is_empty() {
                    continue;
                }

                let existing = sqlx::query_as::<_, TagRow>(
                    "SELECT * FROM tags WHERE name = ? OR slug = ? LIMIT 1",
                )
                .bind(name)
                .bind(&slug)
                .fetch_optional(&mut *tx)
                .await?;

                let tag = match existing {
                    Some(tag) => tag,
                    None => {
                        let tag = TagRow {
                            id: Uuid::new_v4(),
                            name: name.to_string(),
                            slug,
                            color: DEFAULT_TAG_COLOR.to_string(),
                            created_at: OffsetDateTime::now_utc(),
                        };
                        sqlx::query(
                            "INSERT INTO tags (id, name, slug, color, created_at) VALUES (?, ?, ?, ?, ?)",
                        )
                        .bind(tag.id)
                        .bind(&tag.name)
                        .bind(&tag.slug)
                        .bind(&tag.color)
                        .bind(tag.created_at)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| StoreError::from_write(e, "tag", &["slug", "name"]))?;
                        tag
                    }
                };

                if !resolved.iter().any(|t| t.id == tag.id) {
                    resolved.push(tag);
                }
            }

            tx.commit().await?;
            Ok(resolved)
        }

        async fn missing_tag_ids(&self, tag_ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
            let mut missing = Vec::new();
            for tag_id in tag_ids {
                let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM tags WHERE id = ?")
                    .bind(tag_id)
                    .fetch_optional(&self.pool)
                    .await?;
                if found.is_none() {
                    missing.push(*tag_id);
                }
            }
            Ok(missing)
        }

        async fn set_document_tags(&self, document_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()> {
            let mut tx = self.pool.begin().await?;
            replace_document_tags(&mut tx, document_id, tag_ids).await?;
            tx.commit().await?;
            Ok(())
        }
    }

    async fn replace_document_tags(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        document_id: Uuid,
        tag_ids: &[Uuid],
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM document_tags WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut **tx)
            .await?;
        for tag_id in tag_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO document_tags (document_id, tag_id) VALUES (?, ?)",
            )
            .bind(document_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| StoreError::from_write(e, "document tag", &[]))?;
        }
        Ok(())
    }

    #[async_trait]
    impl DocumentRepo for SqliteStore {
        async fn create_document(
            &self,
            document: &DocumentRow,
            tag_ids: &[Uuid],
        ) -> StoreResult<()> {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                r#"
                INSERT INTO documents (id, title, content, excerpt, slug, keywords, featured_image,
                                       author_id, category_id, published, view_count,
                                       created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(document.id)
            .bind(&document.title)
            .bind(&document.content)
            .bind(&document.excerpt)
            .bind(&document.slug)
            .bind(&document.keywords)
            .bind(&document.featured_image)
            .bind(document.author_id)
            .bind(document.category_id)
            .bind(document.published)
            .bind(document.view_count)
            .bind(document.created_at)
            .bind(document.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::from_write(e, "document", &["slug"]))?;

            if !tag_ids.is_empty() {
                replace_document_tags(&mut tx, document.id, tag_ids).await?;
            }

            tx.commit().await?;
            Ok(())
        }

        async fn get_document(&self, document_id: Uuid) -> StoreResult<Option<DocumentRow>> {
            let row = sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = ?")
                .bind(document_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_document_detail(
            &self,
            document_id: Uuid,
        ) -> StoreResult<Option<DocumentDetailRow>> {
            let sql = format!("{DOCUMENT_DETAIL_SELECT} WHERE d.id = ?");
            let row = sqlx::query_as::<_, DocumentDetailRow>(&sql)
                .bind(document_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_document_by_slug(&self, slug: &str) -> StoreResult<Option<DocumentDetailRow>> {
            let sql = format!("{DOCUMENT_DETAIL_SELECT} WHERE d.slug = ?");
            let row = sqlx::query_as::<_, DocumentDetailRow>(&sql)
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_documents(
            &self,
            visibility: Visibility,
        ) -> StoreResult<Vec<DocumentDetailRow>> {
            let sql = format!(
                "{DOCUMENT_DETAIL_SELECT} WHERE {} ORDER BY d.updated_at DESC",
                visibility_clause(visibility)
            );
            let rows = sqlx::query_as::<_, DocumentDetailRow>(&sql)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn search_documents(
            &self,
            term: &str,
            visibility: Visibility,
        ) -> StoreResult<Vec<DocumentDetailRow>> {
            let sql = format!(
                r#"{DOCUMENT_DETAIL_SELECT}
                WHERE {} AND (
                    d.title LIKE ?1 ESCAPE '\'
                    OR d.content LIKE ?1 ESCAPE '\'
                    OR d.keywords LIKE ?1 ESCAPE '\'
                    OR d.excerpt LIKE ?1 ESCAPE '\'
                )
                ORDER BY d.updated_at DESC"#,
                visibility_clause(visibility)
            );
            let rows = sqlx::query_as::<_, DocumentDetailRow>(&sql)
                .bind(like_pattern(term))
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn list_documents_by_category(
            &self,
            category_id: Uuid,
            visibility: Visibility,
        ) -> StoreResult<Vec<DocumentDetailRow>> {
            let sql = format!(
                "{DOCUMENT_DETAIL_SELECT} WHERE d.category_id = ? AND {} ORDER BY d.updated_at DESC",
                visibility_clause(visibility)
            );
            let rows = sqlx::query_as::<_, DocumentDetailRow>(&sql)
                .bind(category_id)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn update_document(
            &self,
            document: &DocumentRow,
            tag_ids: Option<&[Uuid]>,
        ) -> StoreResult<()> {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query(
                r#"
                UPDATE documents
                SET title = ?, content = ?, excerpt = ?, slug = ?, keywords = ?,
                    featured_image = ?, category_id = ?, published = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&document.title)
            .bind(&document.content)
            .bind(&document.excerpt)
            .bind(&document.slug)
            .bind(&document.keywords)
            .bind(&document.featured_image)
            .bind(document.category_id)
            .bind(document.published)
            .bind(document.updated_at)
            .bind(document.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::from_write(e, "document", &["slug"]))?;
            not_found_unless_affected(result.rows_affected(), "document")?;

            if let Some(tag_ids) = tag_ids {
                replace_document_tags(&mut tx, document.id, tag_ids).await?;
            }

            tx.commit().await?;
            Ok(())
        }

        async fn delete_document(&self, document_id: Uuid) -> StoreResult<()> {
            // document_tags, comments and favorites cascade.
            let result = sqlx::query("DELETE FROM documents WHERE id = ?")
                .bind(document_id)
                .execute(&self.pool)
                .await?;
            not_found_unless_affected(result.rows_affected(), "document")
        }

        async fn increment_view_count(&self, document_id: Uuid) -> StoreResult<()> {
            sqlx::query("UPDATE documents SET view_count = view_count + 1 WHERE id = ?")
                .bind(document_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn site_stats(&self) -> StoreResult<SiteStats> {
            let (documents, published, users, comments, categories, tags): (
                i64,
                i64,
                i64,
                i64,
                i64,
                i64,
            ) = sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM documents),
                    (SELECT COUNT(*) FROM documents WHERE published = 1),
                    (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM comments),
                    (SELECT COUNT(*) FROM categories),
                    (SELECT COUNT(*) FROM tags)
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

            Ok(SiteStats {
                documents: documents as u64,
                published_documents: published as u64,
                users: users as u64,
                comments: comments as u64,
                categories: categories as u64,
                tags: tags as u64,
            })
        }
    }

    #[async_trait]
    impl CommentRepo for SqliteStore {
        async fn create_comment(&self, comment: &CommentRow) -> StoreResult<()> {
            sqlx::query(
                r#"
                INSERT INTO comments (id, content, author_id, document_id, parent_id, published,
                                      created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(comment.id)
            .bind(&comment.content)
            .bind(comment.author_id)
            .bind(comment.document_id)
            .bind(comment.parent_id)
            .bind(comment.published)
            .bind(comment.created_at)
            .bind(comment.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_write(e, "comment", &[]))?;
            Ok(())
        }

        async fn get_comment(&self, comment_id: Uuid) -> StoreResult<Option<CommentRow>> {
            let row = sqlx::query_as::<_, CommentRow>("SELECT * FROM comments WHERE id = ?")
                .bind(comment_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_document_comments(
            &self,
            document_id: Uuid,
            include_unpublished: bool,
        ) -> StoreResult<Vec<CommentWithAuthorRow>> {
            let sql = format!(
                "{COMMENT_WITH_AUTHOR_SELECT} WHERE cm.document_id = ?1 AND (?2 OR cm.published = 1) ORDER BY cm.created_at"
            );
            let rows = sqlx::query_as::<_, CommentWithAuthorRow>(&sql)
                .bind(document_id)
                .bind(include_unpublished)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn update_comment_content(
            &self,
            comment_id: Uuid,
            content: &str,
            updated_at: OffsetDateTime,
        ) -> StoreResult<()> {
            let result = sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
                .bind(content)
                .bind(updated_at)
                .bind(comment_id)
                .execute(&self.pool)
                .await?;
            not_found_unless_affected(result.rows_affected(), "comment")
        }

        async fn set_comment_published(
            &self,
            comment_id: Uuid,
            published: bool,
            updated_at: OffsetDateTime,
        ) -> StoreResult<()> {
            let result =
                sqlx::query("UPDATE comments SET published = ?, updated_at = ? WHERE id = ?")
                    .bind(published)
                    .bind(updated_at)
                    .bind(comment_id)
                    .execute(&self.pool)
                    .await?;
            not_found_unless_affected(result.rows_affected(), "comment")
        }

        async fn delete_comment(&self, comment_id: Uuid) -> StoreResult<()> {
            let result = sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(comment_id)
                .execute(&self.pool)
                .await?;
            not_found_unless_affected(result.rows_affected(), "comment")
        }
    }

    #[async_trait]
    impl FavoriteRepo for SqliteStore {
        async fn add_favorite(&self, favorite: &FavoriteRow) -> StoreResult<()> {
            sqlx::query(
                "INSERT INTO favorites (id, user_id, document_id, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(favorite.id)
            .bind(favorite.user_id)
            .bind(favorite.document_id)
            .bind(favorite.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_write(e, "favorite", &[]))?;
            Ok(())
        }

        async fn remove_favorite(&self, user_id: Uuid, document_id: Uuid) -> StoreResult<()> {
            let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND document_id = ?")
                .bind(user_id)
                .bind(document_id)
                .execute(&self.pool)
                .await?;
            not_found_unless_affected(result.rows_affected(), "favorite")
        }

        async fn is_favorited(&self, user_id: Uuid, document_id: Uuid) -> StoreResult<bool> {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = ? AND document_id = ?)",
            )
            .bind(user_id)
            .bind(document_id)
            .fetch_one(&self.pool)
            .await?;
            Ok(exists)
        }

        async fn count_favorites(&self, document_id: Uuid) -> StoreResult<u64> {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE document_id = ?")
                    .bind(document_id)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(count as u64)
        }

        async fn list_favorites(
            &self,
            user_id: Uuid,
            visibility: Visibility,
        ) -> StoreResult<Vec<FavoriteDocumentRow>> {
            let sql = format!(
                "{FAVORITE_DOCUMENT_SELECT} WHERE f.user_id = ? AND {} ORDER BY f.created_at",
                visibility_clause(visibility)
            );
            let rows = sqlx::query_as::<_, FavoriteDocumentRow>(&sql)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BLOB PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    name TEXT NOT NULL,
    avatar TEXT,
    is_admin INTEGER NOT NULL DEFAULT 0,
    membership_level TEXT NOT NULL DEFAULT 'free'
        CHECK (membership_level IN ('free', 'premium', 'vip')),
    status TEXT NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'disabled')),
    last_login_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token_hash TEXT NOT NULL UNIQUE,
    expires_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);

CREATE TABLE IF NOT EXISTS categories (
    id BLOB PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE,
    description TEXT,
    color TEXT NOT NULL DEFAULT '#3B82F6',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id BLOB PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE,
    color TEXT NOT NULL DEFAULT '#6B7280',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id BLOB PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    excerpt TEXT,
    slug TEXT NOT NULL UNIQUE,
    keywords TEXT,
    featured_image TEXT,
    author_id BLOB NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    category_id BLOB REFERENCES categories(id) ON DELETE SET NULL,
    published INTEGER NOT NULL DEFAULT 0,
    view_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_published ON documents(published, updated_at);
CREATE INDEX IF NOT EXISTS idx_documents_category ON documents(category_id);
CREATE INDEX IF NOT EXISTS idx_documents_author ON documents(author_id);

CREATE TABLE IF NOT EXISTS document_tags (
    document_id BLOB NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    tag_id BLOB NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (document_id, tag_id)
);
CREATE INDEX IF NOT EXISTS idx_document_tags_tag ON document_tags(tag_id);

CREATE TABLE IF NOT EXISTS comments (
    id BLOB PRIMARY KEY,
    content TEXT NOT NULL,
    author_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    document_id BLOB NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    parent_id BLOB REFERENCES comments(id) ON DELETE CASCADE,
    published INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_comments_document ON comments(document_id, created_at);
CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id);

CREATE TABLE IF NOT EXISTS favorites (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    document_id BLOB NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, document_id)
);
CREATE INDEX IF NOT EXISTS idx_favorites_document ON favorites(document_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use crate::repos::{SortOrder, UserFilter, UserQuery, UserSortField, Visibility};
    use folio_core::build_threads;
    use time::{Duration as TimeDuration, OffsetDateTime};
    use uuid::Uuid;

    async fn open_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("folio.db"), None)
            .await
            .unwrap();
        (dir, store)
    }

    fn user(email: &str, name: &str) -> UserRow {
        let now = OffsetDateTime::now_utc();
        UserRow {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            name: name.to_string(),
            avatar: None,
            is_admin: false,
            membership_level: "free".to_string(),
            status: "active".to_string(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn document(author_id: Uuid, slug: &str, published: bool) -> DocumentRow {
        let now = OffsetDateTime::now_utc();
        DocumentRow {
            id: Uuid::new_v4(),
            title: format!("Title {slug}"),
            content: format!("Body of {slug}"),
            excerpt: None,
            slug: slug.to_string(),
            keywords: None,
            featured_image: None,
            author_id,
            category_id: None,
            published,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn comment(author_id: Uuid, document_id: Uuid, parent_id: Option<Uuid>, offset_secs: i64) -> CommentRow {
        let at = OffsetDateTime::now_utc() + TimeDuration::seconds(offset_secs);
        CommentRow {
            id: Uuid::new_v4(),
            content: "hello".to_string(),
            author_id,
            document_id,
            parent_id,
            published: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_already_exists() {
        let (_dir, store) = open_store().await;
        store.create_user(&user("a@example.com", "A")).await.unwrap();

        let err = store
            .create_user(&user("a@example.com", "B"))
            .await
            .unwrap_err();
        match err {
            StoreError::AlreadyExists(msg) => assert!(msg.contains("email"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_document_slug_is_already_exists() {
        let (_dir, store) = open_store().await;
        let author = user("author@example.com", "Author");
        store.create_user(&author).await.unwrap();

        store
            .create_document(&document(author.id, "hello", true), &[])
            .await
            .unwrap();
        let err = store
            .create_document(&document(author.id, "hello", false), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn listing_respects_visibility() {
        let (_dir, store) = open_store().await;
        let author = user("author@example.com", "Author");
        store.create_user(&author).await.unwrap();
        store
            .create_document(&document(author.id, "public", true), &[])
            .await
            .unwrap();
        store
            .create_document(&document(author.id, "draft", false), &[])
            .await
            .unwrap();

        let public = store.list_documents(Visibility::Published).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].document.slug, "public");
        assert_eq!(public[0].author_name, "Author");

        let all = store.list_documents(Visibility::All).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let (_dir, store) = open_store().await;
        let author = user("author@example.com", "Author");
        store.create_user(&author).await.unwrap();

        let mut discount = document(author.id, "discount", true);
        discount.title = "50% off".to_string();
        store.create_document(&discount, &[]).await.unwrap();
        store
            .create_document(&document(author.id, "plain", true), &[])
            .await
            .unwrap();

        let hits = store
            .search_documents("%", Visibility::Published)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.slug, "discount");

        let hits = store
            .search_documents("BODY OF PLAIN", Visibility::Published)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn find_or_create_tags_reuses_and_dedupes() {
        let (_dir, store) = open_store().await;

        let first = store
            .find_or_create_tags(&["Rust".to_string(), "Async IO".to_string()])
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].slug, "async-io");

        let second = store
            .find_or_create_tags(&[
                "rust".to_string(),
                "Rust".to_string(),
                "   ".to_string(),
                "Async IO".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].id, first[0].id);
        assert_eq!(second[1].id, first[1].id);
        assert_eq!(store.list_tags().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn deleting_document_cascades() {
        let (_dir, store) = open_store().await;
        let author = user("author@example.com", "Author");
        store.create_user(&author).await.unwrap();
        let tags = store.find_or_create_tags(&["rust".to_string()]).await.unwrap();
        let doc = document(author.id, "doc", true);
        store.create_document(&doc, &[tags[0].id]).await.unwrap();

        let root = comment(author.id, doc.id, None, 0);
        store.create_comment(&root).await.unwrap();
        store
            .add_favorite(&FavoriteRow {
                id: Uuid::new_v4(),
                user_id: author.id,
                document_id: doc.id,
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();

        store.delete_document(doc.id).await.unwrap();

        assert!(store.get_comment(root.id).await.unwrap().is_none());
        assert!(!store.is_favorited(author.id, doc.id).await.unwrap());
        assert!(store.get_tag(tags[0].id).await.unwrap().is_some());
        let err = store.delete_document(doc.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn deleting_category_uncategorizes_documents() {
        let (_dir, store) = open_store().await;
        let author = user("author@example.com", "Author");
        store.create_user(&author).await.unwrap();
        let category = CategoryRow {
            id: Uuid::new_v4(),
            name: "Guides".to_string(),
            slug: "guides".to_string(),
            description: None,
            color: "#3B82F6".to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        store.create_category(&category).await.unwrap();
        let mut doc = document(author.id, "doc", true);
        doc.category_id = Some(category.id);
        store.create_document(&doc, &[]).await.unwrap();

        let detail = store.get_document_detail(doc.id).await.unwrap().unwrap();
        assert_eq!(detail.category_slug.as_deref(), Some("guides"));

        store.delete_category(category.id).await.unwrap();
        let detail = store.get_document_detail(doc.id).await.unwrap().unwrap();
        assert_eq!(detail.document.category_id, None);
        assert_eq!(detail.category_name, None);
    }

    #[tokio::test]
    async fn user_with_documents_cannot_be_deleted() {
        let (_dir, store) = open_store().await;
        let author = user("author@example.com", "Author");
        store.create_user(&author).await.unwrap();
        store
            .create_document(&document(author.id, "doc", true), &[])
            .await
            .unwrap();

        let err = store.delete_user(author.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        let reader = user("reader@example.com", "Reader");
        store.create_user(&reader).await.unwrap();
        store.delete_user(reader.id).await.unwrap();
        assert!(store.get_user(reader.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn comments_load_for_threading() {
        let (_dir, store) = open_store().await;
        let author = user("author@example.com", "Author");
        store.create_user(&author).await.unwrap();
        let doc = document(author.id, "doc", true);
        store.create_document(&doc, &[]).await.unwrap();

        let older = comment(author.id, doc.id, None, 0);
        let newer = comment(author.id, doc.id, None, 10);
        let reply = comment(author.id, doc.id, Some(older.id), 20);
        let mut hidden = comment(author.id, doc.id, None, 30);
        hidden.published = false;
        for c in [&older, &newer, &reply, &hidden] {
            store.create_comment(c).await.unwrap();
        }

        let rows = store.list_document_comments(doc.id, false).await.unwrap();
        assert_eq!(rows.len(), 3);
        let threads = build_threads(rows);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.comment.id, newer.id);
        assert_eq!(threads[1].replies[0].comment.comment.id, reply.id);
        assert_eq!(threads[1].replies[0].comment.author_name, "Author");

        let all = store.list_document_comments(doc.id, true).await.unwrap();
        assert_eq!(all.len(), 4);

        store.delete_comment(older.id).await.unwrap();
        assert!(store.get_comment(reply.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn favorites_are_unique_per_user_and_document() {
        let (_dir, store) = open_store().await;
        let author = user("author@example.com", "Author");
        store.create_user(&author).await.unwrap();
        let doc = document(author.id, "doc", true);
        store.create_document(&doc, &[]).await.unwrap();

        let favorite = |id| FavoriteRow {
            id,
            user_id: author.id,
            document_id: doc.id,
            created_at: OffsetDateTime::now_utc(),
        };
        store.add_favorite(&favorite(Uuid::new_v4())).await.unwrap();
        let err = store
            .add_favorite(&favorite(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        assert_eq!(store.count_favorites(doc.id).await.unwrap(), 1);
        let listed = store
            .list_favorites(author.id, Visibility::Published)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].slug, "doc");

        // Unpublishing hides the favorite from public listings only.
        let mut draft = doc.clone();
        draft.published = false;
        store.update_document(&draft, None).await.unwrap();
        assert!(
            store
                .list_favorites(author.id, Visibility::Published)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            store
                .list_favorites(author.id, Visibility::All)
                .await
                .unwrap()
                .len(),
            1
        );

        store.remove_favorite(author.id, doc.id).await.unwrap();
        let err = store.remove_favorite(author.id, doc.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn user_listing_filters_sorts_and_pages() {
        let (_dir, store) = open_store().await;
        for (email, name) in [
            ("carol@example.com", "Carol"),
            ("alice@example.com", "Alice"),
            ("bob@example.com", "Bob"),
        ] {
            store.create_user(&user(email, name)).await.unwrap();
        }
        let mut vip = user("vip@example.com", "Victor");
        vip.membership_level = "vip".to_string();
        vip.status = "disabled".to_string();
        store.create_user(&vip).await.unwrap();

        let query = UserQuery {
            sort_by: UserSortField::Name,
            sort_order: SortOrder::Asc,
            limit: 2,
            offset: 1,
            ..UserQuery::default()
        };
        let page = store.list_users(&query).await.unwrap();
        let names: Vec<_> = page.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["Bob", "Carol"]);

        let filter = UserFilter {
            search: Some("VIC".to_string()),
            ..UserFilter::default()
        };
        assert_eq!(store.count_users(&filter).await.unwrap(), 1);

        let filter = UserFilter {
            status: Some("active".to_string()),
            ..UserFilter::default()
        };
        assert_eq!(store.count_users(&filter).await.unwrap(), 3);
        assert_eq!(store.count_users(&UserFilter::default()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn sessions_purge_and_revoke() {
        let (_dir, store) = open_store().await;
        let owner = user("owner@example.com", "Owner");
        store.create_user(&owner).await.unwrap();
        let now = OffsetDateTime::now_utc();

        let session = |hash: &str, expires_at| SessionRow {
            id: Uuid::new_v4(),
            user_id: owner.id,
            token_hash: hash.to_string(),
            expires_at,
            created_at: now,
        };
        let expired = session("expired", now - TimeDuration::hours(1));
        let current = session("current", now + TimeDuration::hours(1));
        let other = session("other", now + TimeDuration::hours(1));
        for s in [&expired, &current, &other] {
            store.create_session(s).await.unwrap();
        }

        assert_eq!(store.purge_expired_sessions(now).await.unwrap(), 1);
        assert_eq!(
            store
                .delete_user_sessions(owner.id, Some(current.id))
                .await
                .unwrap(),
            1
        );
        let kept = store.get_session_by_hash("current").await.unwrap().unwrap();
        assert_eq!(kept.id, current.id);
        assert!(store.get_session_by_hash("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn site_stats_counts_everything() {
        let (_dir, store) = open_store().await;
        let author = user("author@example.com", "Author");
        store.create_user(&author).await.unwrap();
        store
            .create_document(&document(author.id, "a", true), &[])
            .await
            .unwrap();
        store
            .create_document(&document(author.id, "b", false), &[])
            .await
            .unwrap();
        store.find_or_create_tags(&["rust".to_string()]).await.unwrap();

        let stats = store.site_stats().await.unwrap();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.published_documents, 1);
        assert_eq!(stats.users, 1);
        assert_eq!(stats.tags, 1);
        assert_eq!(stats.comments, 0);
    }
}
