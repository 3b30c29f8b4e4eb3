use anyhow::Result;

use kcal_core::models::{CalorieQuery, CalorieRead, NewCalorieEntry};
use kcal_core::{CalorieService, Session};

use super::helpers::{parse_date, parse_time, print_entry_table, print_record_table};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_calorie_add(
    svc: &CalorieService,
    session: &Session,
    text: &str,
    calories: Option<i64>,
    date: Option<String>,
    time: Option<String>,
    for_user: Option<&str>,
    json: bool,
) -> Result<()> {
    let entry = NewCalorieEntry {
        username: for_user.unwrap_or(session.username()).to_string(),
        date: parse_date(date)?,
        time: parse_time(time)?,
        text: text.to_string(),
        number_of_calories: calories.unwrap_or(0),
    };
    let created = svc.calories().create(session, &entry)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        print_entry_table(&[&created]);
        if !created.below_expected {
            eprintln!(
                "Over the daily target of {} kcal for {}",
                session.expected_calories_per_day(),
                created.date
            );
        }
    }
    Ok(())
}

pub(crate) fn cmd_calorie_show(
    svc: &CalorieService,
    session: &Session,
    id: i64,
    json: bool,
) -> Result<()> {
    let entry = svc.calories().read_one(session, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        print_entry_table(&[&entry]);
    }
    Ok(())
}

fn list_query(owner: Option<&str>, filter: Option<&str>) -> CalorieQuery {
    let filter = filter.map(str::to_string);
    match owner {
        Some(username) => CalorieQuery::ByUser {
            username: username.to_string(),
            filter,
        },
        None => CalorieQuery::All { filter },
    }
}

pub(crate) fn cmd_calorie_list(
    svc: &CalorieService,
    session: &Session,
    owner: Option<&str>,
    filter: Option<&str>,
    json: bool,
) -> Result<()> {
    let read = svc.calories().read(session, &list_query(owner, filter))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&read)?);
        return Ok(());
    }
    if read.is_empty() {
        eprintln!("No calorie entries found.");
        return Ok(());
    }
    match read {
        CalorieRead::Entry(entry) => print_entry_table(&[&entry]),
        CalorieRead::Entries(entries) => {
            let refs: Vec<_> = entries.values().collect();
            print_entry_table(&refs);
        }
        CalorieRead::Matches(matches) => {
            let records: Vec<_> = matches.into_values().collect();
            print_record_table(&records);
        }
    }
    Ok(())
}

pub(crate) fn cmd_calorie_delete(
    svc: &CalorieService,
    session: &Session,
    id: i64,
    json: bool,
) -> Result<()> {
    svc.calories().remove(session, id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted calorie entry {id}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query() {
        assert_eq!(list_query(None, None), CalorieQuery::All { filter: None });
        assert_eq!(
            list_query(Some("bob"), Some("number_of_calories lt 50")),
            CalorieQuery::ByUser {
                username: "bob".to_string(),
                filter: Some("number_of_calories lt 50".to_string()),
            }
        );
    }

    #[test]
    fn test_add_defaults_owner_to_actor() {
        let svc = CalorieService::new_in_memory().unwrap();
        svc.users().create("bob", "hash", 100).unwrap();
        let bob = svc.establish_session("bob").unwrap();

        cmd_calorie_add(
            &svc,
            &bob,
            "toast",
            Some(80),
            Some("2020-06-01".to_string()),
            Some("07:15".to_string()),
            None,
            true,
        )
        .unwrap();

        let read = svc
            .calories()
            .read(&bob, &list_query(Some("bob"), None))
            .unwrap();
        let CalorieRead::Entries(entries) = read else {
            panic!("expected unfiltered entries");
        };
        let entry = entries.values().next().unwrap();
        assert_eq!(entry.username, "bob");
        assert_eq!(entry.date, "2020-06-01");
        assert_eq!(entry.time, "07:15");
        assert!(entry.below_expected);
    }

    #[test]
    fn test_add_for_other_user_denied() {
        let svc = CalorieService::new_in_memory().unwrap();
        svc.users().create("bob", "hash", 2000).unwrap();
        svc.users().create("alice", "hash", 2000).unwrap();
        let bob = svc.establish_session("bob").unwrap();

        let err = cmd_calorie_add(
            &svc,
            &bob,
            "toast",
            Some(80),
            None,
            None,
            Some("alice"),
            true,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<kcal_core::Error>(),
            Some(kcal_core::Error::NotAllowed)
        ));
    }

    #[test]
    fn test_invalid_date_rejected_before_storage() {
        let svc = CalorieService::new_in_memory().unwrap();
        svc.users().create("bob", "hash", 2000).unwrap();
        let bob = svc.establish_session("bob").unwrap();

        let err = cmd_calorie_add(
            &svc,
            &bob,
            "toast",
            None,
            Some("01/06/2020".to_string()),
            None,
            None,
            true,
        )
        .unwrap_err();
        let Some(kcal_core::Error::InvalidRequest(detail)) = err.downcast_ref::<kcal_core::Error>()
        else {
            panic!("expected an invalid request, got {err:#}");
        };
        assert!(detail.contains("Invalid date"));
        assert!(svc.calories().read(&bob, &list_query(None, None)).unwrap().is_empty());
    }
}
