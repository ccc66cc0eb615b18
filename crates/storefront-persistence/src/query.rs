//! Query helpers shared by the services

use sea_orm::sea_query::{Asterisk, Expr, Func, IntoColumnRef, SimpleExpr};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, QuerySelect, Select};

/// Case-insensitive substring match, `LOWER(col) LIKE '%needle%'`
pub fn ilike<C: IntoColumnRef>(column: C, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", needle.to_lowercase()))
}

/// Case-insensitive equality, `LOWER(col) = 'value'`
pub fn lower_eq<C: IntoColumnRef>(column: C, value: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).eq(value.to_lowercase())
}

/// `SELECT COUNT(*)` over the rows a select would return
pub async fn count<E: EntityTrait>(
    select: Select<E>,
    db: &impl ConnectionTrait,
) -> Result<u64, DbErr> {
    let count = select
        .select_only()
        .column_as(Expr::col(Asterisk).count(), "count")
        .into_tuple::<i64>()
        .one(db)
        .await?
        .unwrap_or_default();

    Ok(count as u64)
}
