use axum::extract::State;
use axum::response::Response;
use chrono::{DateTime, Months, NaiveTime, TimeZone, Utc};
use common_auth::{ensure_role, AuthContext, ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER};
use common_http_errors::{ok, ApiError, ApiResult};
use serde::Serialize;
use sqlx::FromRow;

use crate::app::{db_internal, AppState};
use crate::member_handlers::Member;
use crate::paket_handlers::Paket;

pub const DASHBOARD_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER];

#[derive(Debug, Serialize)]
pub struct DashboardUser {
    pub nama: String,
    pub role: String,
}

/// Independent sums over paid transactions in the window; revenue is not
/// collapsed into a single total.
#[derive(Debug, Serialize, Default)]
pub struct RevenueSums {
    pub biaya_tambahan: f64,
    pub diskon: f64,
    pub pajak: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub transactions_today: i64,
    pub percent_transactions_today: f64,
    pub revenue_today: RevenueSums,
    pub percent_revenue_today: f64,
    pub total_members: i64,
    pub percent_members: f64,
    pub total_outlets: i64,
    pub percent_outlets: f64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notifications {
    pub pending_transactions: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub user: DashboardUser,
    pub statistics: Statistics,
    pub transaction_status: Vec<StatusCount>,
    pub most_popular_package: Option<Paket>,
    pub top_member: Option<Member>,
    pub notifications: Notifications,
}

/// `(current - baseline) / baseline * 100`, defined as 0 when the baseline is
/// 0. A policy choice, not a true rate.
pub fn percent_delta(current: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        0.0
    } else {
        (current - baseline) / baseline * 100.0
    }
}

/// Midnight at the start of `moment`'s day.
pub fn start_of_day(moment: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&moment.date_naive().and_time(NaiveTime::MIN))
}

/// The same instant one calendar month earlier, clamped when the previous
/// month is shorter (May 31 -> Apr 30).
pub fn one_month_before(moment: DateTime<Utc>) -> DateTime<Utc> {
    moment
        .checked_sub_months(Months::new(1))
        .unwrap_or(moment)
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Response> {
    ensure_role(&auth, DASHBOARD_ROLES).map_err(|_| ApiError::Forbidden)?;

    let start_of_today = start_of_day(Utc::now());
    let start_of_last_month_today = one_month_before(start_of_today);

    // 1. Transactions today vs the same day one month earlier.
    let transactions_today =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transaksi WHERE tgl >= $1")
            .bind(start_of_today)
            .fetch_one(&state.db)
            .await
            .map_err(db_internal)?;

    let transactions_last_month = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM transaksi WHERE tgl >= $1 AND tgl < $2",
    )
    .bind(start_of_last_month_today)
    .bind(start_of_today)
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)?;

    let percent_transactions_today =
        percent_delta(transactions_today as f64, transactions_last_month as f64);

    // 2. Revenue today over paid transactions, one sum per component.
    let revenue_today = revenue_sums(&state, start_of_today, None).await?;
    let revenue_last_month = revenue_sums(
        &state,
        start_of_last_month_today,
        Some(start_of_today),
    )
    .await?;

    let percent_revenue_today = percent_delta(
        revenue_today.biaya_tambahan,
        revenue_last_month.biaya_tambahan,
    );

    // 3. Members.
    let total_members = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members")
        .fetch_one(&state.db)
        .await
        .map_err(db_internal)?;
    let members_last_month =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members WHERE created_at < $1")
            .bind(start_of_last_month_today)
            .fetch_one(&state.db)
            .await
            .map_err(db_internal)?;
    let percent_members = percent_delta(total_members as f64, members_last_month as f64);

    // 4. Outlets.
    let total_outlets = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM outlets")
        .fetch_one(&state.db)
        .await
        .map_err(db_internal)?;
    let outlets_last_month =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM outlets WHERE created_at < $1")
            .bind(start_of_last_month_today)
            .fetch_one(&state.db)
            .await
            .map_err(db_internal)?;
    let percent_outlets = percent_delta(total_outlets as f64, outlets_last_month as f64);

    // 5. Status breakdown; statuses with no rows are omitted, not zero-filled.
    let transaction_status = sqlx::query_as::<_, StatusCount>(
        "SELECT status, COUNT(*) AS count FROM transaksi GROUP BY status",
    )
    .fetch_all(&state.db)
    .await
    .map_err(db_internal)?;

    // 6. Most ordered package by summed line quantity; ties break by lowest id.
    let popular = sqlx::query_as::<_, (i32, i64)>(
        "SELECT id_paket, SUM(qty) AS total_qty FROM detail_transaksi
         GROUP BY id_paket ORDER BY total_qty DESC, id_paket ASC LIMIT 1",
    )
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?;

    let most_popular_package = match popular {
        Some((id_paket, _)) => sqlx::query_as::<_, Paket>(
            "SELECT id, id_outlet, jenis, nama_paket, harga FROM pakets WHERE id = $1",
        )
        .bind(id_paket)
        .fetch_optional(&state.db)
        .await
        .map_err(db_internal)?,
        None => None,
    };

    // 7. Top member by transaction count; same tie-break.
    let top = sqlx::query_as::<_, (i32, i64)>(
        "SELECT id_member, COUNT(id) AS trx FROM transaksi
         GROUP BY id_member ORDER BY trx DESC, id_member ASC LIMIT 1",
    )
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?;

    let top_member = match top {
        Some((id_member, _)) => sqlx::query_as::<_, Member>(
            "SELECT id, nama, alamat, jenis_kelamin, tlp, created_at FROM members WHERE id = $1",
        )
        .bind(id_member)
        .fetch_optional(&state.db)
        .await
        .map_err(db_internal)?,
        None => None,
    };

    // 8. Unpaid transactions, all-time.
    let pending_transactions = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM transaksi WHERE dibayar = 'belum_dibayar'",
    )
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)?;

    let data = DashboardData {
        user: DashboardUser {
            nama: auth.claims.nama.clone(),
            role: auth.claims.role.clone(),
        },
        statistics: Statistics {
            transactions_today,
            percent_transactions_today,
            revenue_today,
            percent_revenue_today,
            total_members,
            percent_members,
            total_outlets,
            percent_outlets,
        },
        transaction_status,
        most_popular_package,
        top_member,
        notifications: Notifications {
            pending_transactions,
        },
    };

    Ok(ok("Dashboard data retrieved successfully", data))
}

async fn revenue_sums(
    state: &AppState,
    from: DateTime<Utc>,
    until: Option<DateTime<Utc>>,
) -> ApiResult<RevenueSums> {
    let row: (f64, f64, f64) = match until {
        Some(until) => sqlx::query_as(
            "SELECT COALESCE(SUM(biaya_tambahan), 0), COALESCE(SUM(diskon), 0), COALESCE(SUM(pajak), 0)
             FROM transaksi WHERE dibayar = 'dibayar' AND tgl_bayar >= $1 AND tgl_bayar < $2",
        )
        .bind(from)
        .bind(until)
        .fetch_one(&state.db)
        .await
        .map_err(db_internal)?,
        None => sqlx::query_as(
            "SELECT COALESCE(SUM(biaya_tambahan), 0), COALESCE(SUM(diskon), 0), COALESCE(SUM(pajak), 0)
             FROM transaksi WHERE dibayar = 'dibayar' AND tgl_bayar >= $1",
        )
        .bind(from)
        .fetch_one(&state.db)
        .await
        .map_err(db_internal)?,
    };

    Ok(RevenueSums {
        biaya_tambahan: row.0,
        diskon: row.1,
        pajak: row.2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn percent_delta_is_zero_on_zero_baseline() {
        assert_eq!(percent_delta(10.0, 0.0), 0.0);
        assert_eq!(percent_delta(-10.0, 0.0), 0.0);
        assert_eq!(percent_delta(0.0, 0.0), 0.0);
    }

    #[test]
    fn percent_delta_computes_relative_change() {
        assert_eq!(percent_delta(150.0, 100.0), 50.0);
        assert_eq!(percent_delta(50.0, 100.0), -50.0);
    }

    #[test]
    fn start_of_day_is_midnight() {
        let moment = Utc.with_ymd_and_hms(2024, 5, 17, 13, 45, 9).unwrap();
        let start = start_of_day(moment);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 17, 0, 0, 0).unwrap());
    }

    #[test]
    fn one_month_before_subtracts_a_calendar_month() {
        let moment = Utc.with_ymd_and_hms(2024, 5, 17, 0, 0, 0).unwrap();
        assert_eq!(
            one_month_before(moment),
            Utc.with_ymd_and_hms(2024, 4, 17, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn one_month_before_clamps_short_months() {
        // Mar 31 -> Feb 29 in a leap year, Feb 28 otherwise.
        let moment = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        assert_eq!(
            one_month_before(moment),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );

        let moment = Utc.with_ymd_and_hms(2023, 3, 31, 0, 0, 0).unwrap();
        assert_eq!(
            one_month_before(moment),
            Utc.with_ymd_and_hms(2023, 2, 28, 0, 0, 0).unwrap()
        );
    }
}
