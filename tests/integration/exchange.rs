//! Export/import of content types between sites.

use anyhow::Result;
use serde_json::json;

use cms_engine::core::CmsError;
use cms_engine::datasource::roles::{DUPLICATES_FIELD, ROLES_LIST_FIELD};
use cms_engine::datasource::userlist::COLUMNS_FIELD;
use cms_engine::exchange::{TypeDocument, export_type, import_type};
use cms_engine::models::ContentType;
use cms_engine::test_utils::test_services;

use crate::common::{create_item, create_type, name_rows, render, submission};

const STAFF_YAML: &str = r#"
name: Staff directory
idnumber: staff
description: Everyone teaching this course
title_template: "{{ site.shortname }} staff"
body_template: "{% for row in userlist %}{{ row.name }}/{{ row.office }};{% endfor %}"
datasources:
  - userlist
  - roles
config:
  roles:
    roles_list: [editingteacher, teacher]
    roles_duplicates: firstonly
  userlist:
    columns:
      - shortname: name
        label: Name
      - shortname: office
        label: Office
"#;

#[test]
fn test_import_then_export_is_idempotent() -> Result<()> {
    let site = test_services();
    let imported = import_type(&site, STAFF_YAML)?;
    let first = export_type(&site, imported.id)?;

    let other_site = test_services();
    let reimported = import_type(&other_site, &first)?;
    let second = export_type(&other_site, reimported.id)?;
    assert_eq!(first, second);

    let document = TypeDocument::from_yaml(&second)?;
    assert_eq!(document.datasources, vec!["userlist", "roles"]);
    assert_eq!(document.description, "Everyone teaching this course");
    assert_eq!(document.config["roles"]["roles_list"], json!(["editingteacher", "teacher"]));
    Ok(())
}

#[test]
fn test_imported_type_renders_items() -> Result<()> {
    let services = test_services();
    let content_type = import_type(&services, STAFF_YAML)?;
    let rows = json!([{"name": "Mary", "office": "B12"}, {"name": "Gary"}]);
    let item = create_item(&services, content_type.id, 1, &submission([("userlist_rows", rows)]))?;

    assert_eq!(item.name, "acme staff");
    assert_eq!(render(&services, item.id)?, "Mary/B12;Gary/;");
    Ok(())
}

#[test]
fn test_exported_type_from_managers() -> Result<()> {
    let services = test_services();
    let content_type = create_type(
        &services,
        ContentType::new("Team").with_idnumber("team").with_datasources(["userlist", "roles"]),
        &submission([
            (COLUMNS_FIELD, json!([{"shortname": "name"}])),
            (ROLES_LIST_FIELD, json!(["student"])),
            (DUPLICATES_FIELD, json!("nest")),
        ]),
    )?;
    create_item(&services, content_type.id, 1, &submission([("userlist_rows", name_rows(&["Ann"]))]))?;

    let yaml = export_type(&services, content_type.id)?;
    // Item data never leaves with the type.
    assert!(!yaml.contains("Ann"));
    assert!(yaml.contains("roles_duplicates: nest"));
    Ok(())
}

#[test]
fn test_config_for_disabled_source_rejected() {
    let services = test_services();
    let yaml = "name: Odd\ndatasources: [userlist]\nconfig:\n  roles:\n    roles_list: [student]\n";
    let err = import_type(&services, yaml).unwrap_err();
    assert!(matches!(err.downcast_ref::<CmsError>(), Some(CmsError::InvalidImport { .. })));
}
