//! PostgreSQL-based store implementation.

use crate::error::{StoreError, StoreResult, like_pattern};
use crate::models::*;
use crate::repos::{
    CategoryRepo, CommentRepo, DocumentRepo, FavoriteRepo, SessionRepo, TagRepo, UserFilter,
    UserQuery, UserRepo, Visibility,
};
use crate::store::{
    BlogStore, COMMENT_WITH_AUTHOR_SELECT, DOCUMENT_DETAIL_SELECT, FAVORITE_DOCUMENT_SELECT,
};
use async_trait::async_trait;
use folio_core::config::PgSslMode;
use folio_core::slug::slugify;
use folio_core::taxonomy::DEFAULT_TAG_COLOR;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// PostgreSQL-based store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Connect using a full connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> StoreResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Connect using individual parameters, so the password can come from
    /// the environment.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> StoreResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> StoreResult<Self> {
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{}ms", timeout_ms))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl BlogStore for PostgresStore {
    async fn migrate(&self) -> StoreResult<()> {
        // Prepared statements hold one command each.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
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

fn visibility_clause(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Published => "d.published",
        Visibility::All => "TRUE",
    }
}

const USER_FILTER_SQL: &str = r#"
    WHERE ($1::TEXT IS NULL OR name ILIKE $1 ESCAPE '\' OR email ILIKE $1 ESCAPE '\')
      AND ($2::TEXT IS NULL OR membership_level = $2)
      AND ($3::TEXT IS NULL OR status = $3)
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
impl UserRepo for PostgresStore {
    async fn create_user(&self, user: &UserRow) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, avatar, is_admin,
                               membership_level, status, last_login_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
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
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_user(&self, user: &UserRow) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $1, name = $2, avatar = $3, is_admin = $4, membership_level = $5,
                status = $6, updated_at = $7
            WHERE id = $8
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
            sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
                .bind(password_hash)
                .bind(updated_at)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        not_found_unless_affected(result.rows_affected(), "user")
    }

    async fn record_login(&self, user_id: Uuid, at: OffsetDateTime) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let authored: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE author_id = $1")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        if authored > 0 {
            return Err(StoreError::Constraint(format!(
                "user still authors {authored} document(s)"
            )));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        not_found_unless_affected(result.rows_affected(), "user")?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_users(&self, query: &UserQuery) -> StoreResult<Vec<UserRow>> {
        let nulls = match query.sort_order.as_sql() {
            "ASC" => "NULLS FIRST",
            _ => "NULLS LAST",
        };
        let sql = format!(
            "SELECT * FROM users {USER_FILTER_SQL} ORDER BY {} {} {nulls}, id LIMIT $4 OFFSET $5",
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
impl SessionRepo for PostgresStore {
    async fn create_session(&self, session: &SessionRow) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES ($1, $2, $3, $4, $5)",
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
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_session(&self, session_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: Uuid, keep: Option<Uuid>) -> StoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM sessions WHERE user_id = $1 AND ($2::UUID IS NULL OR id <> $2)",
        )
        .bind(user_id)
        .bind(keep)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn purge_expired_sessions(&self, now: OffsetDateTime) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CategoryRepo for PostgresStore {
    async fn create_category(&self, category: &CategoryRow) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO categories (id, name, slug, description, color, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
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
        let row = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_category_by_slug(&self, slug: &str) -> StoreResult<Option<CategoryRow>> {
        let row = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE slug = $1")
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
            "UPDATE categories SET name = $1, slug = $2, description = $3, color = $4 WHERE id = $5",
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
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.pool)
            .await?;
        not_found_unless_affected(result.rows_affected(), "category")
    }
}

async fn replace_document_tags(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    document_id: Uuid,
    tag_ids: &[Uuid],
) -> StoreResult<()> {
    sqlx::query("DELETE FROM document_tags WHERE document_id = $1")
        .bind(document_id)
        .execute(&mut **tx)
        .await?;
    for tag_id in tag_ids {
        sqlx::query(
            "INSERT INTO document_tags (document_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
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
impl TagRepo for PostgresStore {
    async fn create_tag(&self, tag: &TagRow) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO tags (id, name, slug, color, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
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
        let row = sqlx::query_as::<_, TagRow>("SELECT * FROM tags WHERE id = $1")
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
        let result = sqlx::query("UPDATE tags SET name = $1, slug = $2, color = $3 WHERE id = $4")
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
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
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
            WHERE dt.document_id = $1
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
                "SELECT * FROM tags WHERE name = $1 OR slug = $2 LIMIT 1",
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
                        "INSERT INTO tags (id, name, slug, color, created_at) VALUES ($1, $2, $3, $4, $5)",
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
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM tags WHERE id = ANY($1)")
            .bind(tag_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(tag_ids
            .iter()
            .filter(|id| !found.contains(id))
            .copied()
            .collect())
    }

    async fn set_document_tags(&self, document_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        replace_document_tags(&mut tx, document_id, tag_ids).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentRepo for PostgresStore {
    async fn create_document(&self, document: &DocumentRow, tag_ids: &[Uuid]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, title, content, excerpt, slug, keywords, featured_image,
                                   author_id, category_id, published, view_count,
                                   created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
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
        let row = sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = $1")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_document_detail(&self, document_id: Uuid) -> StoreResult<Option<DocumentDetailRow>> {
        let sql = format!("{DOCUMENT_DETAIL_SELECT} WHERE d.id = $1");
        let row = sqlx::query_as::<_, DocumentDetailRow>(&sql)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_document_by_slug(&self, slug: &str) -> StoreResult<Option<DocumentDetailRow>> {
        let sql = format!("{DOCUMENT_DETAIL_SELECT} WHERE d.slug = $1");
        let row = sqlx::query_as::<_, DocumentDetailRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_documents(&self, visibility: Visibility) -> StoreResult<Vec<DocumentDetailRow>> {
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
                d.title ILIKE $1 ESCAPE '\'
                OR d.content ILIKE $1 ESCAPE '\'
                OR d.keywords ILIKE $1 ESCAPE '\'
                OR d.excerpt ILIKE $1 ESCAPE '\'
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
            "{DOCUMENT_DETAIL_SELECT} WHERE d.category_id = $1 AND {} ORDER BY d.updated_at DESC",
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
            SET title = $1, content = $2, excerpt = $3, slug = $4, keywords = $5,
                featured_image = $6, category_id = $7, published = $8, updated_at = $9
            WHERE id = $10
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
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        not_found_unless_affected(result.rows_affected(), "document")
    }

    async fn increment_view_count(&self, document_id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE documents SET view_count = view_count + 1 WHERE id = $1")
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
                (SELECT COUNT(*) FROM documents WHERE published),
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
impl CommentRepo for PostgresStore {
    async fn create_comment(&self, comment: &CommentRow) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, content, author_id, document_id, parent_id, published,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
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
        let row = sqlx::query_as::<_, CommentRow>("SELECT * FROM comments WHERE id = $1")
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
            "{COMMENT_WITH_AUTHOR_SELECT} WHERE cm.document_id = $1 AND ($2 OR cm.published) ORDER BY cm.created_at"
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
        let result = sqlx::query("UPDATE comments SET content = $1, updated_at = $2 WHERE id = $3")
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
            sqlx::query("UPDATE comments SET published = $1, updated_at = $2 WHERE id = $3")
                .bind(published)
                .bind(updated_at)
                .bind(comment_id)
                .execute(&self.pool)
                .await?;
        not_found_unless_affected(result.rows_affected(), "comment")
    }

    async fn delete_comment(&self, comment_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        not_found_unless_affected(result.rows_affected(), "comment")
    }
}

#[async_trait]
impl FavoriteRepo for PostgresStore {
    async fn add_favorite(&self, favorite: &FavoriteRow) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO favorites (id, user_id, document_id, created_at) VALUES ($1, $2, $3, $4)",
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
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND document_id = $2")
            .bind(user_id)
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        not_found_unless_affected(result.rows_affected(), "favorite")
    }

    async fn is_favorited(&self, user_id: Uuid, document_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = $1 AND document_id = $2)",
        )
        .bind(user_id)
        .bind(document_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count_favorites(&self, document_id: Uuid) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE document_id = $1")
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
            "{FAVORITE_DOCUMENT_SELECT} WHERE f.user_id = $1 AND {} ORDER BY f.created_at",
            visibility_clause(visibility)
        );
        let rows = sqlx::query_as::<_, FavoriteDocumentRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
