use async_trait::async_trait;

use super::SqliteRepository;
use super::mapping::map_account_row;
use super::user_repo::is_unique_violation;
use crate::repository::{AccountRepository, LocalAccount, StorageError};

#[async_trait]
impl AccountRepository for SqliteRepository {
    async fn get_account(&self, email: &str) -> Result<Option<LocalAccount>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, email, name, password_hash, provider, google_linked, created_at
            FROM identity_accounts
            WHERE email = ?1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.as_ref().map(map_account_row).transpose()
    }

    async fn insert_account(&self, account: &LocalAccount) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO identity_accounts
                (id, email, name, password_hash, provider, google_linked, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(account.id.to_string())
        .bind(&account.email)
        .bind(account.name.as_deref())
        .bind(account.password_hash.as_deref())
        .bind(account.provider.as_str())
        .bind(account.google_linked)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StorageError::Conflict
            } else {
                StorageError::Connection(err.to_string())
            }
        })?;

        Ok(())
    }

    async fn update_account(&self, account: &LocalAccount) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE identity_accounts
            SET name = ?2, password_hash = ?3, provider = ?4, google_linked = ?5
            WHERE email = ?1
            ",
        )
        .bind(&account.email)
        .bind(account.name.as_deref())
        .bind(account.password_hash.as_deref())
        .bind(account.provider.as_str())
        .bind(account.google_linked)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
