use crate::db::Database;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::models::{CalorieEntry, CalorieQuery, CalorieRead, NewCalorieEntry, validate_number_of_calories};
use crate::session::Session;

/// Calorie entries, owned by the user who logged them. An admin may act on
/// any entry; everyone else only on their own.
pub struct CalorieLedger<'a> {
    db: &'a Database,
}

impl<'a> CalorieLedger<'a> {
    #[must_use]
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Log an entry for `entry.username`.
    ///
    /// `below_expected` compares the day's total (every entry sharing the
    /// date string, whoever owns it) plus this entry against the actor's
    /// daily target.
    pub fn create(&self, session: &Session, entry: &NewCalorieEntry) -> Result<CalorieEntry> {
        session.require_owner_or_admin(&entry.username)?;
        validate_number_of_calories(entry.number_of_calories)?;
        if self.db.get_user(&entry.username)?.is_none() {
            return Err(Error::UnknownUser);
        }
        let created = self
            .db
            .insert_calorie_entry(entry, session.expected_calories_per_day())?;
        tracing::info!(
            actor = session.username(),
            id = created.id,
            owner = %created.username,
            below_expected = created.below_expected,
            "calorie entry created"
        );
        Ok(created)
    }

    /// Resolve `query`. A blank filter string reads as no filter.
    pub fn read(&self, session: &Session, query: &CalorieQuery) -> Result<CalorieRead> {
        match query {
            CalorieQuery::ById(id) => self.read_one(session, *id).map(CalorieRead::Entry),
            CalorieQuery::ByUser { username, filter } => {
                session.require_owner_or_admin(username)?;
                match non_blank(filter.as_deref()) {
                    Some(expr) => {
                        let filter = Filter::parse(expr)?.scoped_to(username);
                        tracing::debug!(actor = session.username(), %filter, "filtering entries");
                        Ok(CalorieRead::Matches(self.db.find_calorie_records(&filter)?))
                    }
                    None => Ok(CalorieRead::Entries(
                        self.db.list_calorie_entries(Some(username.as_str()))?,
                    )),
                }
            }
            // Any established session may read system-wide.
            CalorieQuery::All { filter } => match non_blank(filter.as_deref()) {
                Some(expr) => {
                    let filter = Filter::parse(expr)?;
                    tracing::debug!(actor = session.username(), %filter, "filtering all entries");
                    Ok(CalorieRead::Matches(self.db.find_calorie_records(&filter)?))
                }
                None => Ok(CalorieRead::Entries(self.db.list_calorie_entries(None)?)),
            },
        }
    }

    pub fn read_one(&self, session: &Session, id: i64) -> Result<CalorieEntry> {
        let entry = self.db.get_calorie_entry(id)?.ok_or(Error::UnknownCalorie)?;
        session.require_owner_or_admin(&entry.username)?;
        Ok(entry)
    }

    pub fn remove(&self, session: &Session, id: i64) -> Result<()> {
        let entry = self.db.get_calorie_entry(id)?.ok_or(Error::UnknownCalorie)?;
        session.require_owner_or_admin(&entry.username)?;
        if !self.db.delete_calorie_entry(id)? {
            return Err(Error::UnknownCalorie);
        }
        tracing::info!(actor = session.username(), id, owner = %entry.username, "calorie entry removed");
        Ok(())
    }
}

fn non_blank(filter: Option<&str>) -> Option<&str> {
    filter.filter(|expr| !expr.trim().is_empty())
}
