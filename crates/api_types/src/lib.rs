//! Wire types of the remote document store and auth service.
//!
//! Field names follow the remote JSON: system attributes are prefixed with
//! `$` and user attributes are camelCase.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Error body returned by the remote on any non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default)]
    pub code: u16,
    #[serde(default, rename = "type")]
    pub kind: String,
}

pub mod user {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct User {
        #[serde(rename = "$id")]
        pub id: String,
        #[serde(default)]
        pub name: String,
        pub email: String,
    }

    /// Request body for `POST /account`.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountNew {
        pub user_id: String,
        pub email: String,
        pub password: String,
        pub name: String,
    }

    /// Request body for `POST /account/sessions/email`.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EmailCredentials {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Session {
        #[serde(rename = "$id")]
        pub id: String,
        #[serde(rename = "userId")]
        pub user_id: String,
        /// Token sent back as `X-Appwrite-Session`. Empty when the remote
        /// only issued a cookie.
        #[serde(default)]
        pub secret: String,
        #[serde(default)]
        pub expire: Option<DateTime<Utc>>,
    }
}

pub mod permission {
    use std::{fmt, str::FromStr};

    /// Role a permission is granted to.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Role {
        Any,
        Users,
        User(String),
    }

    impl Role {
        pub fn user(id: impl Into<String>) -> Self {
            Self::User(id.into())
        }
    }

    impl fmt::Display for Role {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Any => write!(f, "any"),
                Self::Users => write!(f, "users"),
                Self::User(id) => write!(f, "user:{id}"),
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Action {
        Read,
        Update,
        Delete,
    }

    impl Action {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Read => "read",
                Self::Update => "update",
                Self::Delete => "delete",
            }
        }
    }

    /// Per-document permission, encoded on the wire as `read("user:<id>")`.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Permission {
        pub action: Action,
        pub role: Role,
    }

    impl Permission {
        pub fn read(role: Role) -> Self {
            Self {
                action: Action::Read,
                role,
            }
        }

        pub fn update(role: Role) -> Self {
            Self {
                action: Action::Update,
                role,
            }
        }

        pub fn delete(role: Role) -> Self {
            Self {
                action: Action::Delete,
                role,
            }
        }

        /// Read, update and delete granted to a single user.
        pub fn owner_only(user_id: &str) -> Vec<Self> {
            vec![
                Self::read(Role::user(user_id)),
                Self::update(Role::user(user_id)),
                Self::delete(Role::user(user_id)),
            ]
        }
    }

    impl fmt::Display for Permission {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}(\"{}\")", self.action.as_str(), self.role)
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct InvalidPermission(pub String);

    impl fmt::Display for InvalidPermission {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "invalid permission: {}", self.0)
        }
    }

    impl std::error::Error for InvalidPermission {}

    impl FromStr for Permission {
        type Err = InvalidPermission;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let invalid = || InvalidPermission(s.to_string());
            let (action, rest) = s.trim().split_once('(').ok_or_else(invalid)?;
            let action = match action {
                "read" => Action::Read,
                "update" => Action::Update,
                "delete" => Action::Delete,
                _ => return Err(invalid()),
            };
            let role = rest
                .strip_suffix(')')
                .and_then(|r| r.strip_prefix('"'))
                .and_then(|r| r.strip_suffix('"'))
                .ok_or_else(invalid)?;
            let role = match role {
                "any" => Role::Any,
                "users" => Role::Users,
                other => match other.strip_prefix("user:") {
                    Some(id) if !id.is_empty() => Role::User(id.to_string()),
                    _ => return Err(invalid()),
                },
            };
            Ok(Self { action, role })
        }
    }
}

pub mod query {
    use super::*;

    /// A list-documents filter, encoded as one JSON object per `queries[]`
    /// parameter.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "method", rename_all = "camelCase")]
    pub enum Query {
        Equal { attribute: String, values: Vec<Value> },
        OrderAsc { attribute: String },
        OrderDesc { attribute: String },
        Limit { values: Vec<u64> },
        Offset { values: Vec<u64> },
    }

    impl Query {
        pub fn equal(attribute: &str, value: impl Into<Value>) -> Self {
            Self::Equal {
                attribute: attribute.to_string(),
                values: vec![value.into()],
            }
        }

        pub fn order_asc(attribute: &str) -> Self {
            Self::OrderAsc {
                attribute: attribute.to_string(),
            }
        }

        pub fn order_desc(attribute: &str) -> Self {
            Self::OrderDesc {
                attribute: attribute.to_string(),
            }
        }

        pub fn limit(limit: u64) -> Self {
            Self::Limit {
                values: vec![limit],
            }
        }

        pub fn offset(offset: u64) -> Self {
            Self::Offset {
                values: vec![offset],
            }
        }

        /// Encodes the query the way the remote expects it in a query string.
        pub fn to_param(&self) -> String {
            // A tagged enum of strings, numbers and vectors always serializes.
            serde_json::to_string(self).unwrap_or_default()
        }
    }
}

pub mod document {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Document {
        #[serde(rename = "$id")]
        pub id: String,
        #[serde(rename = "$createdAt")]
        pub created_at: DateTime<Utc>,
        #[serde(rename = "$updatedAt")]
        pub updated_at: DateTime<Utc>,
        #[serde(rename = "$permissions", default)]
        pub permissions: Vec<String>,
        #[serde(flatten)]
        pub data: Map<String, Value>,
    }

    impl Document {
        /// Decodes the user attributes into a typed record.
        pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
            serde_json::from_value(Value::Object(self.data.clone()))
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DocumentList {
        pub total: u64,
        pub documents: Vec<Document>,
    }

    /// Request body for create-document.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DocumentNew {
        pub document_id: String,
        pub data: Value,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub permissions: Vec<String>,
    }

    /// Request body for update-document.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DocumentUpdate {
        pub data: Value,
    }
}

pub mod expense {
    use std::{fmt, str::FromStr};

    use super::*;

    /// Fixed set of expense categories.
    ///
    /// `transport` and `health` are accepted as aliases of `transportation`
    /// and `healthcare`.
    #[derive(
        Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    )]
    #[serde(rename_all = "snake_case")]
    pub enum Category {
        #[default]
        Food,
        Rent,
        #[serde(alias = "transport")]
        Transportation,
        Entertainment,
        Shopping,
        #[serde(alias = "health")]
        Healthcare,
        Utilities,
        Education,
        Other,
    }

    impl Category {
        pub const ALL: [Category; 9] = [
            Self::Food,
            Self::Rent,
            Self::Transportation,
            Self::Entertainment,
            Self::Shopping,
            Self::Healthcare,
            Self::Utilities,
            Self::Education,
            Self::Other,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                Self::Food => "food",
                Self::Rent => "rent",
                Self::Transportation => "transportation",
                Self::Entertainment => "entertainment",
                Self::Shopping => "shopping",
                Self::Healthcare => "healthcare",
                Self::Utilities => "utilities",
                Self::Education => "education",
                Self::Other => "other",
            }
        }

        pub fn label(self) -> &'static str {
            match self {
                Self::Food => "Food",
                Self::Rent => "Rent",
                Self::Transportation => "Transportation",
                Self::Entertainment => "Entertainment",
                Self::Shopping => "Shopping",
                Self::Healthcare => "Healthcare",
                Self::Utilities => "Utilities",
                Self::Education => "Education",
                Self::Other => "Other",
            }
        }

        fn position(self) -> usize {
            Self::ALL.iter().position(|c| *c == self).unwrap_or(0)
        }

        /// Next category in display order, wrapping around.
        pub fn next(self) -> Self {
            Self::ALL[(self.position() + 1) % Self::ALL.len()]
        }

        /// Previous category in display order, wrapping around.
        pub fn prev(self) -> Self {
            let len = Self::ALL.len();
            Self::ALL[(self.position() + len - 1) % len]
        }
    }

    impl fmt::Display for Category {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UnknownCategory(pub String);

    impl fmt::Display for UnknownCategory {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "unknown category: {}", self.0)
        }
    }

    impl std::error::Error for UnknownCategory {}

    impl FromStr for Category {
        type Err = UnknownCategory;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let norm = s.trim().to_ascii_lowercase();
            let category = match norm.as_str() {
                "food" => Self::Food,
                "rent" => Self::Rent,
                "transport" | "transportation" => Self::Transportation,
                "entertainment" => Self::Entertainment,
                "shopping" => Self::Shopping,
                "health" | "healthcare" => Self::Healthcare,
                "utilities" => Self::Utilities,
                "education" => Self::Education,
                "other" => Self::Other,
                _ => return Err(UnknownCategory(s.to_string())),
            };
            Ok(category)
        }
    }

    /// User attributes of an expense document.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExpenseFields {
        pub user_id: String,
        #[serde(deserialize_with = "deserialize_amount")]
        pub amount: f64,
        pub category: Category,
        #[serde(default)]
        pub description: String,
        #[serde(deserialize_with = "deserialize_date")]
        pub date: NaiveDate,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    /// Partial update: only `Some` fields are sent.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExpensePatchFields {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub amount: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category: Option<Category>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub date: Option<NaiveDate>,
        pub updated_at: DateTime<Utc>,
    }

    /// Older documents store the amount as text.
    fn deserialize_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(value),
            Raw::Text(text) => text
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .map_err(serde::de::Error::custom),
        }
    }

    /// Accepts `YYYY-MM-DD` or a full RFC3339 datetime attribute.
    fn deserialize_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            return Ok(date);
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.date_naive())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        document::Document,
        expense::{Category, ExpenseFields},
        permission::{Permission, Role},
        query::Query,
    };

    #[test]
    fn category_accepts_both_draft_names() {
        let c: Category = serde_json::from_str("\"transport\"").unwrap();
        assert_eq!(c, Category::Transportation);
        let c: Category = serde_json::from_str("\"health\"").unwrap();
        assert_eq!(c, Category::Healthcare);
        assert_eq!("Transportation".parse::<Category>().unwrap(), Category::Transportation);
        assert!("groceries".parse::<Category>().is_err());
        assert_eq!(serde_json::to_string(&Category::Transportation).unwrap(), "\"transportation\"");
    }

    #[test]
    fn category_cycles_through_all_values() {
        let mut c = Category::Food;
        for _ in 0..Category::ALL.len() {
            c = c.next();
        }
        assert_eq!(c, Category::Food);
        assert_eq!(Category::Food.prev(), Category::Other);
    }

    #[test]
    fn permission_wire_format() {
        let p = Permission::read(Role::user("abc"));
        assert_eq!(p.to_string(), "read(\"user:abc\")");
        assert_eq!("read(\"user:abc\")".parse::<Permission>().unwrap(), p);
        assert_eq!(
            "delete(\"users\")".parse::<Permission>().unwrap(),
            Permission::delete(Role::Users)
        );
        assert!("write(\"user:abc\")".parse::<Permission>().is_err());
        assert!("read(\"user:\")".parse::<Permission>().is_err());
    }

    #[test]
    fn query_param_matches_remote_format() {
        assert_eq!(
            Query::equal("userId", "u1").to_param(),
            r#"{"method":"equal","attribute":"userId","values":["u1"]}"#
        );
        assert_eq!(
            Query::order_desc("createdAt").to_param(),
            r#"{"method":"orderDesc","attribute":"createdAt"}"#
        );
        assert_eq!(
            Query::order_asc("date").to_param(),
            r#"{"method":"orderAsc","attribute":"date"}"#
        );
        assert_eq!(Query::limit(100).to_param(), r#"{"method":"limit","values":[100]}"#);
    }

    #[test]
    fn document_decodes_textual_amount_and_datetime_date() {
        let json = r#"{
            "$id": "d1",
            "$createdAt": "2026-01-02T10:00:00.000+00:00",
            "$updatedAt": "2026-01-02T10:00:00.000+00:00",
            "$permissions": ["read(\"user:u1\")"],
            "$collectionId": "expenses",
            "userId": "u1",
            "amount": "42.50",
            "category": "food",
            "description": "Lunch",
            "date": "2026-01-02T00:00:00.000+00:00",
            "createdAt": "2026-01-02T10:00:00Z",
            "updatedAt": "2026-01-02T10:00:00Z"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.id, "d1");
        assert_eq!(doc.permissions.len(), 1);

        let fields: ExpenseFields = doc.decode().unwrap();
        assert_eq!(fields.amount, 42.5);
        assert_eq!(fields.category, Category::Food);
        assert_eq!(fields.date.to_string(), "2026-01-02");
    }
}
