use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::models::{CalorieEntry, CalorieRecord, NewCalorieEntry, User};
use crate::role::Role;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    username TEXT PRIMARY KEY NOT NULL,
                    hashed_password TEXT NOT NULL,
                    role INTEGER NOT NULL,
                    expected_calories_per_day INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS calories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    text TEXT NOT NULL,
                    number_of_calories INTEGER NOT NULL DEFAULT 0,
                    username TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
                    date TEXT NOT NULL,
                    time TEXT NOT NULL,
                    below_expected INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_calories_date ON calories(date);
                CREATE INDEX IF NOT EXISTS idx_calories_username ON calories(username);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let role: i64 = row.get(2)?;
        let role = Role::try_from(role).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Integer, Box::new(e))
        })?;
        Ok(User {
            username: row.get(0)?,
            hashed_password: row.get(1)?,
            role,
            expected_calories_per_day: row.get(3)?,
        })
    }

    // Expects columns:
    // 0: id, 1: text, 2: number_of_calories, 3: username, 4: date, 5: time,
    // 6: below_expected
    fn calorie_from_row(row: &rusqlite::Row) -> rusqlite::Result<CalorieEntry> {
        Ok(CalorieEntry {
            id: row.get(0)?,
            text: row.get(1)?,
            number_of_calories: row.get(2)?,
            username: row.get(3)?,
            date: row.get(4)?,
            time: row.get(5)?,
            below_expected: row.get(6)?,
        })
    }

    fn record_from_row(row: &rusqlite::Row) -> rusqlite::Result<CalorieRecord> {
        Ok(CalorieRecord {
            id: row.get(0)?,
            text: row.get(1)?,
            number_of_calories: row.get(2)?,
            username: row.get(3)?,
            date: row.get(4)?,
            time: row.get(5)?,
        })
    }

    // --- Users ---

    /// Insert a new account, failing with `UserAlreadyExists` when the
    /// username is taken.
    pub fn insert_user(&self, user: &User) -> Result<()> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            params![user.username],
            |row| row.get(0),
        )?;
        if exists {
            return Err(Error::UserAlreadyExists);
        }
        tx.execute(
            "INSERT INTO users (username, hashed_password, role, expected_calories_per_day)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user.username,
                user.hashed_password,
                i64::from(user.role),
                user.expected_calories_per_day,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_user(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT username, hashed_password, role, expected_calories_per_day
                 FROM users WHERE username = ?1",
                params![username],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT username, hashed_password, role, expected_calories_per_day
             FROM users ORDER BY username",
        )?;
        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Delete an account and, through the foreign key, its entries.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM users WHERE username = ?1", params![username])?;
        Ok(rows > 0)
    }

    pub fn update_user_password(&self, username: &str, hashed_password: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE users SET hashed_password = ?1 WHERE username = ?2",
            params![hashed_password, username],
        )?;
        Ok(rows > 0)
    }

    pub fn update_user_role(&self, username: &str, role: Role) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE users SET role = ?1 WHERE username = ?2",
            params![i64::from(role), username],
        )?;
        Ok(rows > 0)
    }

    pub fn update_user_expected_calories(&self, username: &str, n: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE users SET expected_calories_per_day = ?1 WHERE username = ?2",
            params![n, username],
        )?;
        Ok(rows > 0)
    }

    // --- Calorie entries ---

    /// Sum of `number_of_calories` over every entry dated `date`, across all users.
    pub fn total_calories_for_date(&self, date: &str) -> Result<i64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(number_of_calories), 0) FROM calories WHERE date = ?1",
            params![date],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Insert an entry, computing `below_expected` against `expected_calories_per_day`.
    ///
    /// The day total is read and the row written inside one immediate
    /// transaction, so concurrent writers on the same file never both
    /// compare against the same pre-insert sum.
    pub fn insert_calorie_entry(
        &self,
        entry: &NewCalorieEntry,
        expected_calories_per_day: i64,
    ) -> Result<CalorieEntry> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let calories_today: i64 = tx.query_row(
            "SELECT COALESCE(SUM(number_of_calories), 0) FROM calories WHERE date = ?1",
            params![entry.date],
            |row| row.get(0),
        )?;
        let below_expected =
            calories_today.saturating_add(entry.number_of_calories) <= expected_calories_per_day;
        tx.execute(
            "INSERT INTO calories (text, number_of_calories, username, date, time, below_expected)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.text,
                entry.number_of_calories,
                entry.username,
                entry.date,
                entry.time,
                below_expected,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        self.get_calorie_entry(id)?.ok_or(Error::UnknownCalorie)
    }

    pub fn get_calorie_entry(&self, id: i64) -> Result<Option<CalorieEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT id, text, number_of_calories, username, date, time, below_expected
                 FROM calories WHERE id = ?1",
                params![id],
                Self::calorie_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// All entries, or only those owned by `username`, keyed by id.
    pub fn list_calorie_entries(
        &self,
        username: Option<&str>,
    ) -> Result<BTreeMap<i64, CalorieEntry>> {
        let entries = if let Some(username) = username {
            let mut stmt = self.conn.prepare(
                "SELECT id, text, number_of_calories, username, date, time, below_expected
                 FROM calories WHERE username = ?1 ORDER BY id",
            )?;
            stmt.query_map(params![username], Self::calorie_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = self.conn.prepare(
                "SELECT id, text, number_of_calories, username, date, time, below_expected
                 FROM calories ORDER BY id",
            )?;
            stmt.query_map([], Self::calorie_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(entries.into_iter().map(|e| (e.id, e)).collect())
    }

    /// Entries matching `filter`, keyed by id.
    pub fn find_calorie_records(&self, filter: &Filter) -> Result<BTreeMap<i64, CalorieRecord>> {
        let (where_clause, values) = filter.to_sql();
        let sql = format!(
            "SELECT id, text, number_of_calories, username, date, time
             FROM calories WHERE {where_clause} ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(rusqlite::params_from_iter(values), Self::record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records.into_iter().map(|r| (r.id, r)).collect())
    }

    pub fn delete_calorie_entry(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM calories WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
