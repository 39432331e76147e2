//! Course role rosters and the role assignment event.

use anyhow::Result;
use serde_json::json;

use cms_engine::content::{ContentManager, ContentTypeManager};
use cms_engine::datasource::roles::{DUPLICATES_FIELD, ROLES_LIST_FIELD};
use cms_engine::datasource::userlist::{COLUMNS_FIELD, ROWS_FIELD};
use cms_engine::events::{RoleAssignmentEvent, RoleChange};
use cms_engine::models::{ContentType, UserListRow, UserListSchema};
use cms_engine::services::Services;
use cms_engine::store::Repository;

use crate::common::{
    create_item, create_type, name_rows, render, seed_mary_and_gary, services_with_roles, submission,
};

const ROSTER: &str = "T:{% for u in roles.teacher %}{{ u.firstname }} {% endfor %}\
|S:{% for u in roles.student %}{{ u.firstname }} {% endfor %}";

const NESTED: &str = "{% for u in roles.student %}{{ u.fullname }}={{ u.roles | join(sep=\",\") }};{% endfor %}";

fn roster_type(services: &Services, policy: &str, body: &str) -> Result<ContentType> {
    create_type(
        services,
        ContentType::new(format!("Roster {policy}")).with_body(body).with_datasources(["roles"]),
        &submission([
            (ROLES_LIST_FIELD, json!(["teacher", "student"])),
            (DUPLICATES_FIELD, json!(policy)),
        ]),
    )
}

fn render_roster(policy: &str, body: &str) -> Result<String> {
    let (services, roles) = services_with_roles();
    seed_mary_and_gary(&roles, 5)?;
    let content_type = roster_type(&services, policy, body)?;
    let item = create_item(&services, content_type.id, 5, &Default::default())?;
    render(&services, item.id)
}

#[test]
fn test_all_lists_every_holder() -> Result<()> {
    assert_eq!(render_roster("all", ROSTER)?, "T:Mary |S:Mary Gary ");
    Ok(())
}

#[test]
fn test_firstonly_places_user_under_first_role() -> Result<()> {
    assert_eq!(render_roster("firstonly", ROSTER)?, "T:Mary |S:Gary ");
    Ok(())
}

#[test]
fn test_nest_attaches_held_roles() -> Result<()> {
    assert_eq!(
        render_roster("nest", NESTED)?,
        "Mary Major=teacher,student;Gary Minor=student;"
    );
    Ok(())
}

#[test]
fn test_assignment_event_refreshes_cached_roster() -> Result<()> {
    let (services, roles) = services_with_roles();
    seed_mary_and_gary(&roles, 5)?;
    let content_type = roster_type(&services, "all", ROSTER)?;
    let item = create_item(&services, content_type.id, 5, &Default::default())?;
    assert_eq!(render(&services, item.id)?, "T:Mary |S:Mary Gary ");

    roles.assign(5, 2, "teacher")?;
    // The cached roster stands until the host reports the change.
    assert_eq!(render(&services, item.id)?, "T:Mary |S:Mary Gary ");

    let event = RoleAssignmentEvent {
        course_id: 5,
        user_id: 2,
        role: "teacher".to_string(),
        change: RoleChange::Assigned,
    };
    assert_eq!(event.dispatch(&services)?, 1);
    assert_eq!(render(&services, item.id)?, "T:Mary Gary |S:Mary Gary ");

    roles.unassign(5, 1, "student")?;
    RoleAssignmentEvent {
        change: RoleChange::Unassigned,
        user_id: 1,
        role: "student".to_string(),
        ..event
    }
    .dispatch(&services)?;
    assert_eq!(render(&services, item.id)?, "T:Mary Gary |S:Gary ");
    Ok(())
}

#[test]
fn test_event_ignores_types_without_roles() -> Result<()> {
    let (services, roles) = services_with_roles();
    seed_mary_and_gary(&roles, 5)?;
    let plain = create_type(&services, ContentType::new("Plain"), &Default::default())?;
    create_item(&services, plain.id, 5, &Default::default())?;

    let event = RoleAssignmentEvent {
        course_id: 5,
        user_id: 1,
        role: "student".to_string(),
        change: RoleChange::Unassigned,
    };
    assert_eq!(event.dispatch(&services)?, 0);
    Ok(())
}

#[test]
fn test_userlist_records_removed_with_items_and_type() -> Result<()> {
    let (services, _) = services_with_roles();
    let content_type = create_type(
        &services,
        ContentType::new("Reading list").with_datasources(["userlist"]),
        &submission([(COLUMNS_FIELD, json!([{"shortname": "name"}]))]),
    )?;
    let first = create_item(&services, content_type.id, 1, &submission([(ROWS_FIELD, name_rows(&["A", "B"]))]))?;
    let second = create_item(&services, content_type.id, 2, &submission([(ROWS_FIELD, name_rows(&["C"]))]))?;

    let rows = &services.store.userlist_rows;
    let schemas = &services.store.userlist_schemas;
    assert_eq!(rows.count(&|_: &UserListRow| true)?, 3);

    let contents = ContentManager::new(services.clone());
    contents.delete(first.id)?;
    assert_eq!(rows.count(&|_: &UserListRow| true)?, 1);
    contents.delete(second.id)?;
    assert_eq!(rows.count(&|_: &UserListRow| true)?, 0);

    assert_eq!(schemas.count(&|_: &UserListSchema| true)?, 1);
    ContentTypeManager::new(services.clone()).delete(content_type.id)?;
    assert_eq!(schemas.count(&|_: &UserListSchema| true)?, 0);
    Ok(())
}
