use pulse_core::RateBudgetReading;
use rusqlite::params;

use crate::Db;
use crate::error::Result;
use crate::helpers::now_text;

impl Db {
    pub fn load_rate_budget(&self, provider: &str) -> Result<Option<RateBudgetReading>> {
        let mut stmt = self
            .conn
            .prepare("SELECT remaining, reset_at FROM rate_budget WHERE provider = ?1")?;
        let mut rows = stmt.query([provider])?;
        if let Some(row) = rows.next()? {
            Ok(Some(RateBudgetReading {
                remaining: row.get::<_, i64>(0)?.max(0) as u64,
                reset_at: row.get(1)?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Last writer wins; the provider's next response corrects any race.
    pub fn store_rate_budget(&self, provider: &str, reading: RateBudgetReading) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO rate_budget (provider, remaining, reset_at, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(provider) DO UPDATE SET
              remaining = excluded.remaining,
              reset_at = excluded.reset_at,
              updated_at = excluded.updated_at
            "#,
            params![provider, reading.remaining as i64, reading.reset_at, now_text()],
        )?;
        Ok(())
    }
}
