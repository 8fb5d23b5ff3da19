//! Seeds the development database with the standard fixture set: three
//! outlets, five users, three members, five pakets and three transactions
//! with one line each.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand_core::OsRng;
use sqlx::PgPool;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPool::connect(&database_url).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let outlet_ids = seed_outlets(&pool).await?;
    println!("Outlets seeded");

    let user_ids = seed_users(&pool, &outlet_ids).await?;
    println!("Users seeded");

    let member_ids = seed_members(&pool).await?;
    println!("Members seeded");

    let paket_ids = seed_pakets(&pool, &outlet_ids).await?;
    println!("Pakets seeded");

    let transaksi_ids = seed_transaksi(&pool, &outlet_ids, &member_ids, &user_ids).await?;
    println!("Transaksi seeded");

    seed_details(&pool, &transaksi_ids, &paket_ids).await?;
    println!("Detail Transaksi seeded");

    Ok(())
}

async fn seed_outlets(pool: &PgPool) -> Result<Vec<i32>> {
    let fixtures: &[(&str, &str, i64)] = &[
        ("Outlet 1", "Alamat 1", 1234567891),
        ("Outlet 2", "Alamat 2", 1234567892),
        ("Outlet 3", "Alamat 3", 1234567893),
    ];

    let mut ids = Vec::with_capacity(fixtures.len());
    for (nama, alamat, tlp) in fixtures {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO outlets (nama, alamat, tlp) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(nama)
        .bind(alamat)
        .bind(tlp)
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

async fn seed_users(pool: &PgPool, outlets: &[i32]) -> Result<Vec<i32>> {
    let fixtures: &[(&str, &str, &str, usize, &str)] = &[
        ("Admin", "admin", "admin123", 0, "admin"),
        ("Kasir 1", "kasir1", "kasir123", 1, "kasir"),
        ("Owner", "owner", "owner123", 2, "owner"),
        ("Kasir 2", "kasir2", "kasir123", 0, "kasir"),
        ("Kasir 3", "kasir3", "kasir123", 1, "kasir"),
    ];

    let mut ids = Vec::with_capacity(fixtures.len());
    for (nama, username, password, outlet_idx, role) in fixtures {
        let hash = hash_password(password)?;
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO users (nama, username, password, role, id_outlet)
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(nama)
        .bind(username)
        .bind(&hash)
        .bind(role)
        .bind(outlets[*outlet_idx])
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

async fn seed_members(pool: &PgPool) -> Result<Vec<i32>> {
    let fixtures: &[(&str, &str, &str, i64)] = &[
        ("Icy Man", "Jl. Raya 1", "laki_laki", 1234567890),
        ("Manzy", "Jl. Raya 2", "perempuan", 9876543210),
        ("King", "Jl. Raya 3", "perempuan", 1230984567),
    ];

    let mut ids = Vec::with_capacity(fixtures.len());
    for (nama, alamat, jenis_kelamin, tlp) in fixtures {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO members (nama, alamat, jenis_kelamin, tlp)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(nama)
        .bind(alamat)
        .bind(jenis_kelamin)
        .bind(tlp)
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

async fn seed_pakets(pool: &PgPool, outlets: &[i32]) -> Result<Vec<i32>> {
    let fixtures: &[(usize, &str, &str, i64)] = &[
        (0, "kiloan", "Cuci Kiloan", 7000),
        (0, "selimut", "Cuci Selimut", 15000),
        (1, "bed_cover", "Cuci Bed Cover", 25000),
        (1, "kaos", "Cuci Kaos", 5000),
        (2, "lain", "Lainnya", 10000),
    ];

    let mut ids = Vec::with_capacity(fixtures.len());
    for (outlet_idx, jenis, nama_paket, harga) in fixtures {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO pakets (id_outlet, jenis, nama_paket, harga)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(outlets[*outlet_idx])
        .bind(jenis)
        .bind(nama_paket)
        .bind(harga)
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

async fn seed_transaksi(
    pool: &PgPool,
    outlets: &[i32],
    members: &[i32],
    users: &[i32],
) -> Result<Vec<i32>> {
    let now = Utc::now();
    let due = now + Duration::days(3);

    let fixtures: &[(usize, &str, usize, f64, f64, f64, &str, &str, usize)] = &[
        (0, "INV001", 0, 5000.0, 10.0, 2000.0, "baru", "dibayar", 0),
        (1, "INV002", 1, 3000.0, 5.0, 1500.0, "proses", "belum_dibayar", 1),
        (2, "INV003", 2, 1000.0, 15.0, 1000.0, "selesai", "dibayar", 2),
    ];

    let mut ids = Vec::with_capacity(fixtures.len());
    for (outlet_idx, kode, member_idx, biaya, diskon, pajak, status, dibayar, user_idx) in fixtures
    {
        let tgl_bayar = if *dibayar == "dibayar" { Some(now) } else { None };
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO transaksi (id_outlet, kode_invoice, id_member, tgl, batas_waktu,
                                    tgl_bayar, biaya_tambahan, diskon, pajak, status, dibayar, id_user)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id",
        )
        .bind(outlets[*outlet_idx])
        .bind(kode)
        .bind(members[*member_idx])
        .bind(now)
        .bind(due)
        .bind(tgl_bayar)
        .bind(biaya)
        .bind(diskon)
        .bind(pajak)
        .bind(status)
        .bind(dibayar)
        .bind(users[*user_idx])
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

async fn seed_details(pool: &PgPool, transaksi: &[i32], pakets: &[i32]) -> Result<()> {
    let fixtures: &[(usize, usize, i32, &str)] = &[
        (0, 0, 2, "Cuci bersih dan setrika"),
        (1, 1, 1, "Hanya cuci"),
        (2, 2, 3, "Setrika dan lipat"),
    ];

    for (transaksi_idx, paket_idx, qty, keterangan) in fixtures {
        sqlx::query(
            "INSERT INTO detail_transaksi (id_transaksi, id_paket, qty, keterangan)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(transaksi[*transaksi_idx])
        .bind(pakets[*paket_idx])
        .bind(qty)
        .bind(keterangan)
        .execute(pool)
        .await?;
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow::anyhow!("Failed to hash password: {err}"))
}
