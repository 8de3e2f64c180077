use sqlx::PgPool;

#[derive(Clone)]
pub struct SqlxFileRepo {
    pub pool: PgPool,
}

#[derive(Clone)]
pub struct SqlxProfileRepo {
    pub pool: PgPool,
}
