use async_trait::async_trait;
use chrono::SecondsFormat;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, DeriveIden, StatementBuilder,
    sea_query::{Alias, ColumnDef, Expr, Index, OnConflict, Query, Table},
};
use serde_json::json;

use crate::domain::{
    error::StorageError,
    models::user::{UserId, UserRecord, validate_user_record},
    repositories::user_store::UserStore,
};

#[derive(DeriveIden)]
enum UserColumn {
    Id,
    Email,
    Name,
    CreatedAt,
}

// message id to user id, one row per consumed registration event
#[derive(DeriveIden)]
enum DeliveryColumn {
    MessageId,
    UserId,
}

fn database_error(e: DbErr) -> StorageError {
    StorageError::Database(e.to_string())
}

/// User records in a SQL table whose name comes from configuration.
///
/// Id assignments live next to it in `<table>_deliveries`.
pub struct SeaOrmUserStore {
    db: DatabaseConnection,
    table: Option<String>,
}

impl SeaOrmUserStore {
    pub fn new(db: DatabaseConnection, table: Option<String>) -> Self {
        Self { db, table }
    }

    fn table_name(&self) -> Result<&str, StorageError> {
        self.table.as_deref().ok_or(StorageError::TableNotConfigured)
    }

    fn table(&self) -> Result<Alias, StorageError> {
        self.table_name().map(Alias::new)
    }

    fn deliveries_table(&self) -> Result<Alias, StorageError> {
        self.table_name()
            .map(|table| Alias::new(format!("{table}_deliveries")))
    }

    async fn execute<S: StatementBuilder + Sync>(&self, stmt: &S) -> Result<(), StorageError> {
        let backend = self.db.get_database_backend();
        self.db
            .execute(backend.build(stmt))
            .await
            .map_err(database_error)?;
        Ok(())
    }

    /// Create the users and deliveries tables if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        let table = self.table()?;
        let index_name = format!("idx_{}_email", self.table_name()?);

        let users = Table::create()
            .table(table)
            .if_not_exists()
            .col(
                ColumnDef::new(UserColumn::Id)
                    .string_len(64)
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new(UserColumn::Email).string_len(320).not_null())
            .col(ColumnDef::new(UserColumn::Name).string_len(128).not_null())
            .col(ColumnDef::new(UserColumn::CreatedAt).string_len(40).not_null())
            .index(Index::create().name(index_name).col(UserColumn::Email))
            .to_owned();
        self.execute(&users).await?;

        let deliveries = Table::create()
            .table(self.deliveries_table()?)
            .if_not_exists()
            .col(
                ColumnDef::new(DeliveryColumn::MessageId)
                    .string_len(64)
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new(DeliveryColumn::UserId).string_len(64).not_null())
            .to_owned();
        self.execute(&deliveries).await
    }
}

#[async_trait]
impl UserStore for SeaOrmUserStore {
    async fn assign_id(&self, message_id: &str, candidate: UserId) -> Result<UserId, StorageError> {
        let deliveries = self.deliveries_table()?;

        // a conflicting insert keeps the existing row
        let insert = Query::insert()
            .into_table(deliveries.clone())
            .columns([DeliveryColumn::MessageId, DeliveryColumn::UserId])
            .values([message_id.into(), candidate.as_str().into()])
            .map_err(|e| StorageError::Database(e.to_string()))?
            .on_conflict(
                OnConflict::column(DeliveryColumn::MessageId)
                    .update_column(DeliveryColumn::MessageId)
                    .to_owned(),
            )
            .to_owned();
        self.execute(&insert).await?;

        let select = Query::select()
            .column(DeliveryColumn::UserId)
            .from(deliveries)
            .and_where(Expr::col(DeliveryColumn::MessageId).eq(message_id))
            .to_owned();

        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(backend.build(&select))
            .await
            .map_err(database_error)?
            .ok_or_else(|| {
                StorageError::Database(format!("No id assigned to message {message_id}"))
            })?;
        let user_id: String = row.try_get("", "user_id").map_err(database_error)?;

        Ok(UserId::from_string(user_id))
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), StorageError> {
        let table = self.table()?;
        let created_at = user
            .created_at()
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let stmt = Query::insert()
            .into_table(table)
            .columns([
                UserColumn::Id,
                UserColumn::Email,
                UserColumn::Name,
                UserColumn::CreatedAt,
            ])
            .values([
                user.id().as_str().into(),
                user.email().into(),
                user.name().into(),
                created_at.into(),
            ])
            .map_err(|e| StorageError::Database(e.to_string()))?
            .on_conflict(
                OnConflict::column(UserColumn::Id)
                    .update_columns([UserColumn::Email, UserColumn::Name, UserColumn::CreatedAt])
                    .to_owned(),
            )
            .to_owned();

        self.execute(&stmt).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError> {
        let table = self.table()?;
        let stmt = Query::select()
            .columns([
                UserColumn::Id,
                UserColumn::Email,
                UserColumn::Name,
                UserColumn::CreatedAt,
            ])
            .from(table)
            .and_where(Expr::col(UserColumn::Id).eq(id.as_str()))
            .to_owned();

        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(backend.build(&stmt))
            .await
            .map_err(database_error)?;

        match row {
            Some(row) => {
                let id: String = row.try_get("", "id").map_err(database_error)?;
                let email: String = row.try_get("", "email").map_err(database_error)?;
                let name: String = row.try_get("", "name").map_err(database_error)?;
                let created_at: String = row.try_get("", "created_at").map_err(database_error)?;

                let record = validate_user_record(&json!({
                    "id": id,
                    "email": email,
                    "name": name,
                    "createdAt": created_at,
                }))
                .map_err(|e| StorageError::Database(format!("Corrupt user record: {e}")))?;

                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{DateTime, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    use super::*;

    const TABLE: &str = "users";

    fn record() -> UserRecord {
        let created_at = DateTime::parse_from_rfc3339("2025-06-01T12:30:00.123Z")
            .unwrap()
            .with_timezone(&Utc);
        UserRecord::reconstruct(
            UserId::from_string("user-1".to_string()),
            "test@example.com".to_string(),
            "Test User".to_string(),
            created_at,
        )
    }

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    #[tokio::test]
    async fn test_create_user_positive() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([exec_ok()])
            .into_connection();
        let store = SeaOrmUserStore::new(db, Some(TABLE.to_string()));

        assert!(store.create_user(&record()).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_user_propagates_database_error() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_errors([DbErr::Custom("throughput exceeded".to_string())])
            .into_connection();
        let store = SeaOrmUserStore::new(db, Some(TABLE.to_string()));

        let result = store.create_user(&record()).await;

        assert!(
            matches!(result, Err(StorageError::Database(message)) if message.contains("throughput exceeded"))
        );
    }

    #[tokio::test]
    async fn test_create_user_without_table_negative() {
        let db = MockDatabase::new(DatabaseBackend::MySql).into_connection();
        let store = SeaOrmUserStore::new(db, None);

        let result = store.create_user(&record()).await;

        assert!(matches!(result, Err(StorageError::TableNotConfigured)));
    }

    #[tokio::test]
    async fn test_ensure_schema_without_table_negative() {
        let db = MockDatabase::new(DatabaseBackend::MySql).into_connection();
        let store = SeaOrmUserStore::new(db, None);

        assert!(matches!(
            store.ensure_schema().await,
            Err(StorageError::TableNotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_ensure_schema_positive() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([exec_ok(), exec_ok()])
            .into_connection();
        let store = SeaOrmUserStore::new(db, Some(TABLE.to_string()));

        assert!(store.ensure_schema().await.is_ok());
    }

    #[tokio::test]
    async fn test_assign_id_returns_stored_assignment() {
        let row = BTreeMap::from([("user_id", Value::from("user-1"))]);
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([exec_ok()])
            .append_query_results([[row]])
            .into_connection();
        let store = SeaOrmUserStore::new(db, Some(TABLE.to_string()));

        let assigned = store
            .assign_id("m-1", UserId::from_string("user-2".to_string()))
            .await
            .unwrap();

        assert_eq!(assigned.as_str(), "user-1");
    }

    #[tokio::test]
    async fn test_assign_id_without_table_negative() {
        let db = MockDatabase::new(DatabaseBackend::MySql).into_connection();
        let store = SeaOrmUserStore::new(db, None);

        let result = store
            .assign_id("m-1", UserId::from_string("user-1".to_string()))
            .await;

        assert!(matches!(result, Err(StorageError::TableNotConfigured)));
    }

    #[tokio::test]
    async fn test_find_by_id_positive() {
        let row = BTreeMap::from([
            ("id", Value::from("user-1")),
            ("email", Value::from("test@example.com")),
            ("name", Value::from("Test User")),
            ("created_at", Value::from("2025-06-01T12:30:00.123Z")),
        ]);
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([[row]])
            .into_connection();
        let store = SeaOrmUserStore::new(db, Some(TABLE.to_string()));

        let found = store
            .find_by_id(&UserId::from_string("user-1".to_string()))
            .await
            .unwrap();

        assert_eq!(found, Some(record()));
    }

    #[tokio::test]
    async fn test_find_by_id_corrupt_row_negative() {
        let row = BTreeMap::from([
            ("id", Value::from("user-1")),
            ("email", Value::from("test@example.com")),
            ("name", Value::from("Test User")),
            ("created_at", Value::from("not a timestamp")),
        ]);
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([[row]])
            .into_connection();
        let store = SeaOrmUserStore::new(db, Some(TABLE.to_string()));

        let result = store
            .find_by_id(&UserId::from_string("user-1".to_string()))
            .await;

        assert!(matches!(result, Err(StorageError::Database(_))));
    }
}
