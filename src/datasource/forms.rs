//! Form collaborator contract.
//!
//! Data sources contribute fields to two forms: the type configuration form and
//! the item instance form. The engine never renders forms; it only collects
//! field definitions, default values and validation messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Widget kind of a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FormFieldKind {
    Header,
    Text,
    Textarea,
    Number,
    Checkbox,
    Date,
    Select { options: Vec<(String, String)> },
    Multiselect { options: Vec<(String, String)> },
    Filemanager { accepted: Vec<String> },
    /// Ordered list of records, each made of the named sub-fields.
    Repeat { columns: Vec<String> },
}

/// One field contributed to a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FormFieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl FormField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FormFieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            help: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Collects fields in the order they are added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormBuilder {
    fields: Vec<FormField>,
}

impl FormBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: FormField) -> &mut Self {
        self.fields.push(field);
        self
    }

    pub fn header(&mut self, name: impl Into<String>, label: impl Into<String>) -> &mut Self {
        self.add(FormField::new(name, label, FormFieldKind::Header))
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Submitted or default form values keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(BTreeMap<String, Value>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// A list value; a single string is read as a one-element list.
    pub fn get_strings(&self, name: &str) -> Option<Vec<String>> {
        match self.0.get(name)? {
            Value::Array(items) => {
                Some(items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            }
            Value::String(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A file uploaded through a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Files uploaded through a form, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFiles(BTreeMap<String, Vec<UploadedFile>>);

impl FormFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, file: UploadedFile) {
        self.0.entry(field.into()).or_default().push(file);
    }

    /// Files of a field; `None` when the field was not submitted at all.
    pub fn get(&self, field: &str) -> Option<&[UploadedFile]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

/// A complete form submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSubmission {
    pub data: FormData,
    pub files: FormFiles,
}

impl FormSubmission {
    pub fn new(data: FormData) -> Self {
        Self {
            data,
            files: FormFiles::new(),
        }
    }

    pub fn with_files(mut self, files: FormFiles) -> Self {
        self.files = files;
        self
    }
}

/// A field-level validation message. Collected, never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
