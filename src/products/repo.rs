use sqlx::PgPool;
use uuid::Uuid;

use crate::products::repo_types::Product;

impl Product {
    pub async fn list_active(db: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, category, stock_quantity,
                   is_active, created_at, updated_at
            FROM products
            WHERE is_active = TRUE
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await
    }

    pub async fn find_active_by_id(db: &PgPool, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, category, stock_quantity,
                   is_active, created_at, updated_at
            FROM products
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }
}
