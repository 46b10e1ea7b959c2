use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{Map, Value};
use spares_calc::Moment;
use spares_core::repository::{Collection, DocStream, DocumentStore, Filter, FilterOp};
use spares_core::{StoreError, StoreResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, QueryBuilder, Row};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// All collections share one JSONB table keyed by `(collection, id)`.
/// `seq` gives queries their insertion order.
#[derive(Clone)]
pub struct PgDocumentStore {
    pub pool: Pool<Postgres>,
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

impl PgDocumentStore {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Stored timestamp with an explicit zone (`Z` or `+05:30`).
const ZONED_TIMESTAMP: &str = r"'^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})$'";
/// Legacy stored timestamp without a zone; read as UTC.
const NAIVE_TIMESTAMP: &str = r"'^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?$'";

/// Appends one predicate on `body -> field`. Equality is JSON equality.
/// Lt/Gt against a timestamp compares instants: zoned values cast to
/// `timestamptz`, naive ones are taken as UTC, and anything else in the
/// field never matches.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    let field = filter.field.clone();
    match filter.op {
        FilterOp::IsNull => {
            qb.push(" AND ((body -> ")
                .push_bind(field)
                .push(") IS NULL OR jsonb_typeof(body -> ")
                .push_bind(filter.field.clone())
                .push(") = 'null')");
        }
        FilterOp::Eq | FilterOp::Ne => {
            let op = if filter.op == FilterOp::Eq { " = " } else { " <> " };
            qb.push(" AND body -> ")
                .push_bind(field)
                .push(op)
                .push_bind(filter.value.clone());
        }
        FilterOp::Lt | FilterOp::Gt => {
            let op = if filter.op == FilterOp::Lt { " < " } else { " > " };
            match &filter.value {
                Value::Number(n) => {
                    // CASE keeps the cast away from non-numeric values.
                    qb.push(" AND CASE WHEN jsonb_typeof(body -> ")
                        .push_bind(field.clone())
                        .push(") = 'number' THEN (body ->> ")
                        .push_bind(field)
                        .push(")::float8 END")
                        .push(op)
                        .push_bind(n.as_f64().unwrap_or_default());
                }
                Value::String(raw) => match Moment::parse(raw) {
                    Ok(at) => push_instant_filter(qb, field, op, at),
                    Err(_) => push_text_filter(qb, field, op, raw.clone()),
                },
                other => push_text_filter(qb, field, op, other.to_string()),
            }
        }
    }
}

fn push_text_filter(qb: &mut QueryBuilder<'_, Postgres>, field: String, op: &str, text: String) {
    qb.push(" AND body ->> ").push_bind(field).push(op).push_bind(text);
}

fn push_instant_filter(qb: &mut QueryBuilder<'_, Postgres>, field: String, op: &str, at: Moment) {
    qb.push(" AND CASE WHEN body ->> ")
        .push_bind(field.clone())
        .push(" ~ ")
        .push(ZONED_TIMESTAMP)
        .push(" THEN (body ->> ")
        .push_bind(field.clone())
        .push(")::timestamptz WHEN body ->> ")
        .push_bind(field.clone())
        .push(" ~ ")
        .push(NAIVE_TIMESTAMP)
        .push(" THEN (body ->> ")
        .push_bind(field)
        .push(")::timestamp AT TIME ZONE 'UTC' END")
        .push(op)
        .push_bind(at.to_utc());
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: Collection, record: Value) -> StoreResult<String> {
        let Value::Object(mut body) = record else {
            return Err(StoreError::InvalidDocument {
                collection: collection.name(),
                reason: "record is not a JSON object".to_string(),
            });
        };
        let id = Uuid::new_v4().simple().to_string();
        body.insert("id".to_string(), Value::String(id.clone()));

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection.name())
            .bind(&id)
            .bind(Value::Object(body))
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(id)
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Value>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(|r| r.try_get::<Value, _>("body").map_err(backend))
            .transpose()
    }

    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> StoreResult<DocStream<'static>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE collection = ");
        qb.push_bind(collection.name());
        for filter in filters {
            push_filter(&mut qb, filter);
        }
        qb.push(" ORDER BY seq");

        // Rows are fetched eagerly so the stream does not borrow the builder.
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        let docs = futures_util::stream::iter(rows)
            .map(|row| row.try_get::<Value, _>("body").map_err(backend));
        Ok(docs.boxed())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        mut fields: Map<String, Value>,
    ) -> StoreResult<()> {
        fields.remove("id");
        let result = sqlx::query(
            "UPDATE documents SET body = body || $3 WHERE collection = $1 AND id = $2",
        )
        .bind(collection.name())
        .bind(id)
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.name(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn where_clause(filter: Filter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("WHERE collection = ");
        qb.push_bind("orders");
        push_filter(&mut qb, &filter);
        qb.sql().trim_start_matches("WHERE collection = $1").to_string()
    }

    #[test]
    fn test_equality_filters() {
        assert_eq!(
            where_clause(Filter::eq("status", "Pending")),
            " AND body -> $2 = $3"
        );
        assert_eq!(
            where_clause(Filter::ne("status", "Delivered")),
            " AND body -> $2 <> $3"
        );
    }

    #[test]
    fn test_is_null_matches_absent_and_null() {
        assert_eq!(
            where_clause(Filter::is_null("consumption_date")),
            " AND ((body -> $2) IS NULL OR jsonb_typeof(body -> $3) = 'null')"
        );
    }

    #[test]
    fn test_numeric_ordering_guards_the_cast() {
        assert_eq!(
            where_clause(Filter::gt("quantity", 5)),
            " AND CASE WHEN jsonb_typeof(body -> $2) = 'number' THEN (body ->> $3)::float8 END > $4"
        );
    }

    #[test]
    fn test_timestamp_ordering_compares_instants() {
        let sql = where_clause(Filter::lt("expected_delivery_date", "2024-01-10T00:00:00.000000Z"));
        assert_eq!(
            sql,
            format!(
                " AND CASE WHEN body ->> $2 ~ {ZONED_TIMESTAMP} THEN (body ->> $3)::timestamptz \
                 WHEN body ->> $4 ~ {NAIVE_TIMESTAMP} THEN (body ->> $5)::timestamp AT TIME ZONE 'UTC' END < $6"
            )
        );
        let naive = where_clause(Filter::gt("arrival_date", "2024-01-10 08:00:00"));
        assert!(naive.ends_with("AT TIME ZONE 'UTC' END > $6"));
    }

    #[test]
    fn test_plain_text_ordering() {
        assert_eq!(
            where_clause(Filter::lt("batch_no", "B-100")),
            " AND body ->> $2 < $3"
        );
    }
}
