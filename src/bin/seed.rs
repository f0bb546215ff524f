use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_warung_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let pool = create_pool(&config.database_url).await?;

    let admin_id = ensure_admin(&pool, "admin@warung.example", "admin123").await?;
    seed_menu(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_admin(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO admin_users (id, email, name, password_hash)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind("Warung Admin")
    .bind(password_hash)
    .fetch_optional(pool)
    .await?;

    // If the admin already exists, fetch id
    let admin_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM admin_users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured admin {email}");
    Ok(admin_id)
}

async fn seed_menu(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = vec![
        ("Nasi Goreng Spesial", "Nasi goreng with chicken, egg and krupuk", 25000_i64),
        ("Ayam Bakar", "Grilled chicken with sambal and lalapan", 32000),
        ("Gado-Gado", "Vegetables and lontong in peanut sauce", 18000),
        ("Sate Ayam", "Ten skewers with peanut sauce", 28000),
        ("Es Teh Manis", "Sweet iced tea", 8000),
    ];

    for (name, desc, price) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, category)
            VALUES ($1, $2, $3, $4, 'food')
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .execute(pool)
        .await?;
    }

    println!("Seeded menu");
    Ok(())
}
