//! The `cms` binary over a snapshot store.

use anyhow::Result;
use predicates::prelude::*;

use crate::common::TestSite;

const NOTICE_YAML: &str = r#"
name: Notice
idnumber: notice
title_template: "Notice for {{ site.shortname }}"
body_template: "<h2>{{ site.fullname }}</h2>{% for row in userlist %}<p>{{ row.text }}</p>{% endfor %}"
datasources: [userlist]
config:
  userlist:
    columns:
      - shortname: text
"#;

const ROSTER_YAML: &str = r#"
name: Roster
idnumber: roster
body_template: "{% for u in roles.teacher %}{{ u.fullname }};{% endfor %}"
datasources: [roles]
config:
  roles:
    roles_list: [teacher]
    roles_duplicates: all
"#;

fn site_with_notice() -> Result<TestSite> {
    let site = TestSite::new()?;
    let file = site.write("notice.yaml", NOTICE_YAML)?;
    site.cms()
        .arg("import")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported content type 1 'Notice'"));
    site.cms()
        .args(["content", "create", "--type-id", "1", "--course", "4"])
        .args(["--data", r#"{"userlist_rows": [{"text": "Exams on Monday"}]}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created content item 1 'Notice for acme'"));
    Ok(site)
}

#[test]
fn test_import_create_render() -> Result<()> {
    let site = site_with_notice()?;
    site.cms()
        .args(["render", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<h2>Acme</h2><p>Exams on Monday</p>"));

    let store = site.store_json()?;
    assert_eq!(store["types"][0]["name"], "Notice");
    assert_eq!(store["userlist_rows"][0]["data"]["text"], "Exams on Monday");
    Ok(())
}

#[test]
fn test_types_and_content_listing() -> Result<()> {
    let site = site_with_notice()?;
    site.cms()
        .args(["types", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Notice").and(predicate::str::contains("1 item(s)")));
    site.cms()
        .args(["content", "list", "--course", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Notice for acme"));
    Ok(())
}

#[test]
fn test_empty_store_lists_nothing() -> Result<()> {
    let site = TestSite::new()?;
    site.cms()
        .args(["types", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No content types"));
    assert!(!site.store.exists());
    Ok(())
}

#[test]
fn test_render_data_and_variables() -> Result<()> {
    let site = site_with_notice()?;
    site.cms()
        .args(["render", "1", "--data"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""text": "Exams on Monday""#));
    site.cms()
        .args(["variables", "1", "--html"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<td>{{site.fullname}}</td><td>Acme</td>"));
    Ok(())
}

#[test]
fn test_export_to_file_reimports() -> Result<()> {
    let site = site_with_notice()?;
    let exported = site.path("exported.yaml");
    site.cms().args(["export", "1", "-o"]).arg(&exported).assert().success();
    let yaml = std::fs::read_to_string(&exported)?;
    assert!(yaml.contains("idnumber: notice"));

    let other = TestSite::new()?;
    other
        .cms()
        .arg("import")
        .arg(&exported)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported content type 1 'Notice'"));
    Ok(())
}

#[test]
fn test_backup_and_restore_into_another_course() -> Result<()> {
    let site = site_with_notice()?;
    let backup = site.path("backup.json");
    site.cms().args(["backup", "1", "-o"]).arg(&backup).assert().success();

    site.cms()
        .arg("restore")
        .arg(&backup)
        .args(["--course", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored content item 2").and(predicate::str::contains("existing type 1")));
    site.cms()
        .args(["render", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<p>Exams on Monday</p>"));
    Ok(())
}

#[test]
fn test_role_assignment_refreshes_roster() -> Result<()> {
    let site = TestSite::new()?;
    let file = site.write("roster.yaml", ROSTER_YAML)?;
    site.cms().arg("import").arg(&file).assert().success();
    site.cms().args(["content", "create", "--type-id", "1", "--course", "2"]).assert().success();
    site.cms()
        .args(["roles", "add-user", "--id", "7", "--firstname", "Ada", "--lastname", "King"])
        .assert()
        .success();

    site.cms().args(["render", "1"]).assert().success().stdout(predicate::str::contains("Ada").not());
    site.cms()
        .args(["roles", "assign", "--course", "2", "--user", "7", "--role", "teacher"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 roster(s) refreshed"));
    site.cms().args(["render", "1"]).assert().success().stdout(predicate::str::contains("Ada King;"));
    Ok(())
}

#[test]
fn test_invalid_import_fails() -> Result<()> {
    let site = TestSite::new()?;
    let file = site.write("bad.yaml", "name: Broken\ndatasources: [weather]\n")?;
    site.cms()
        .arg("import")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error").and(predicate::str::contains("weather")));
    Ok(())
}

#[test]
fn test_missing_content_fails() -> Result<()> {
    let site = TestSite::new()?;
    site.cms().args(["render", "42"]).assert().failure().stderr(predicate::str::contains("error"));
    Ok(())
}
