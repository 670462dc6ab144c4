use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::{DuplicateKind, EntityStore, EventOrdering, EventQuery, StoreError, StoreResult};
use crate::auth::IdentityProvider;
use crate::models::{
    Event, EventFields, NewEvent, NewReview, NewRsvp, Review, ReviewChanges, Rsvp, RsvpStatus,
};
use crate::utils::pagination::{Page, PageRequest};

const EVENT_COLUMNS: &str = "e.id, e.title, e.description, e.organizer_id, e.location, \
     e.start_time, e.end_time, e.is_public, e.created_at, e.updated_at, \
     ARRAY(SELECT i.user_id FROM event_invitations i WHERE i.event_id = e.id) AS invited";

const RSVP_COLUMNS: &str = "id, event_id, user_id, status, updated_at";
const REVIEW_COLUMNS: &str = "id, event_id, user_id, rating, comment, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }

    async fn fetch_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1");
        let event = sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }
}

/// Maps a unique-constraint violation to the duplicate outcome so a lost
/// race looks the same as a failed pre-check.
fn map_unique(err: sqlx::Error, kind: DuplicateKind) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(kind);
        }
    }
    StoreError::Database(err)
}

/// Makes `term` match literally inside an `ILIKE ... ESCAPE '\'` pattern.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn order_clause(ordering: EventOrdering) -> &'static str {
    match ordering {
        EventOrdering::StartTimeDesc => "e.start_time DESC, e.title",
        EventOrdering::StartTimeAsc => "e.start_time ASC, e.title",
        EventOrdering::CreatedAtDesc => "e.created_at DESC, e.title",
        EventOrdering::CreatedAtAsc => "e.created_at ASC, e.title",
    }
}

async fn replace_invitations(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event_id: Uuid,
    invited: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM event_invitations WHERE event_id = $1")
        .bind(event_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        "INSERT INTO event_invitations (event_id, user_id) \
         SELECT $1, u FROM UNNEST($2::uuid[]) AS u ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(invited)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl EntityStore for PgStore {
    async fn missing_users(&self, ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.iter().filter(|id| !found.contains(id)).copied().collect())
    }

    async fn insert_event(&self, new: NewEvent) -> StoreResult<Event> {
        let id = Uuid::new_v4();
        let fields = &new.fields;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO events (id, organizer_id, title, description, location, start_time, end_time, is_public) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id)
        .bind(new.organizer_id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.location)
        .bind(fields.start_time)
        .bind(fields.end_time)
        .bind(fields.is_public)
        .execute(&mut *tx)
        .await?;
        replace_invitations(&mut tx, id, &fields.invited).await?;
        tx.commit().await?;

        self.fetch_event(id)
            .await?
            .ok_or(StoreError::NotFound { entity: "Event", id })
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        self.fetch_event(id).await
    }

    async fn list_public_events(&self, query: &EventQuery, page: PageRequest) -> StoreResult<Page<Event>> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| format!("%{}%", escape_like(term)));
        let filter = "e.is_public AND ($1::text IS NULL \
             OR e.title ILIKE $1 ESCAPE '\\' OR e.description ILIKE $1 ESCAPE '\\' \
             OR e.location ILIKE $1 ESCAPE '\\' OR u.username ILIKE $1 ESCAPE '\\')";

        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM events e LEFT JOIN users u ON u.id = e.organizer_id WHERE {filter}"
        ))
            .bind(pattern.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events e LEFT JOIN users u ON u.id = e.organizer_id \
             WHERE {filter} ORDER BY {} LIMIT $2 OFFSET $3",
            order_clause(query.ordering)
        );
        let events = sqlx::query_as::<_, Event>(&sql)
            .bind(pattern.as_deref())
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(events, count.max(0) as u64, page))
    }

    async fn update_event(&self, id: Uuid, fields: EventFields) -> StoreResult<Event> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE events SET title = $2, description = $3, location = $4, start_time = $5, \
             end_time = $6, is_public = $7, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.location)
        .bind(fields.start_time)
        .bind(fields.end_time)
        .bind(fields.is_public)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "Event", id });
        }
        replace_invitations(&mut tx, id, &fields.invited).await?;
        tx.commit().await?;

        self.fetch_event(id)
            .await?
            .ok_or(StoreError::NotFound { entity: "Event", id })
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<()> {
        let deleted = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "Event", id });
        }
        Ok(())
    }

    async fn insert_rsvp(&self, new: NewRsvp) -> StoreResult<Rsvp> {
        let sql = format!(
            "INSERT INTO rsvps (id, event_id, user_id, status) VALUES ($1, $2, $3, $4) RETURNING {RSVP_COLUMNS}"
        );
        sqlx::query_as::<_, Rsvp>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.event_id)
            .bind(new.user_id)
            .bind(new.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique(e, DuplicateKind::Rsvp))
    }

    async fn find_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Rsvp>> {
        let sql = format!("SELECT {RSVP_COLUMNS} FROM rsvps WHERE event_id = $1 AND user_id = $2");
        let rsvp = sqlx::query_as::<_, Rsvp>(&sql)
            .bind(event_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rsvp)
    }

    async fn update_rsvp_status(&self, id: Uuid, status: RsvpStatus) -> StoreResult<Rsvp> {
        let sql = format!(
            "UPDATE rsvps SET status = $2, updated_at = now() WHERE id = $1 RETURNING {RSVP_COLUMNS}"
        );
        sqlx::query_as::<_, Rsvp>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { entity: "RSVP", id })
    }

    async fn insert_review(&self, new: NewReview) -> StoreResult<Review> {
        let sql = format!(
            "INSERT INTO reviews (id, event_id, user_id, rating, comment) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {REVIEW_COLUMNS}"
        );
        sqlx::query_as::<_, Review>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.event_id)
            .bind(new.user_id)
            .bind(new.rating)
            .bind(&new.comment)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique(e, DuplicateKind::Review))
    }

    async fn find_review(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE event_id = $1 AND user_id = $2");
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(event_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn update_review(&self, id: Uuid, changes: ReviewChanges) -> StoreResult<Review> {
        let sql = format!(
            "UPDATE reviews SET rating = $2, comment = $3 WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        );
        sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .bind(changes.rating)
            .bind(&changes.comment)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { entity: "Review", id })
    }

    async fn list_reviews(&self, event_id: Uuid, page: PageRequest) -> StoreResult<Page<Review>> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE event_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let reviews = sqlx::query_as::<_, Review>(&sql)
            .bind(event_id)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(reviews, count.max(0) as u64, page))
    }
}

#[async_trait]
impl IdentityProvider for PgStore {
    async fn resolve_token(&self, token: &str) -> StoreResult<Option<Uuid>> {
        let user_id = sqlx::query_scalar(
            "SELECT user_id FROM auth_tokens WHERE token = $1 AND (expires_at IS NULL OR expires_at > now())",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user_id)
    }
}
