use crate::error::AliasError;
use crate::schema::SchemaModel;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_ALIAS_LEN: usize = 50;

/// Display names for sub-values (e.g. `CMJ` → `Salto contramovimiento`). Presentation only:
/// grouping, locking and file names always use the raw sub-value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the alias of a defined sub-value. A blank alias removes the entry.
    pub fn set(
        &mut self,
        schema: &SchemaModel,
        sub_value: &str,
        alias: &str,
    ) -> Result<(), AliasError> {
        if !is_defined(schema, sub_value) {
            return Err(AliasError::UnknownSubValue { value: sub_value.to_string() });
        }

        let alias = alias.trim();
        if alias.is_empty() {
            self.entries.remove(sub_value);
            return Ok(());
        }
        if alias.chars().count() > MAX_ALIAS_LEN {
            return Err(AliasError::AliasTooLong {
                value: sub_value.to_string(),
                max: MAX_ALIAS_LEN,
            });
        }

        self.entries.insert(sub_value.to_string(), alias.to_string());
        Ok(())
    }

    pub fn remove(&mut self, sub_value: &str) -> Option<String> {
        self.entries.remove(sub_value)
    }

    pub fn get(&self, sub_value: &str) -> Option<&str> {
        self.entries.get(sub_value).map(String::as_str)
    }

    /// Alias when one is set, the sub-value itself otherwise.
    pub fn display<'a>(&'a self, sub_value: &'a str) -> &'a str {
        self.get(sub_value).unwrap_or(sub_value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Drops aliases whose sub-value is no longer defined. Returns how many were dropped.
    pub fn retain_defined(&mut self, schema: &SchemaModel) -> usize {
        let before = self.entries.len();
        self.entries.retain(|sub_value, _| is_defined(schema, sub_value));
        before - self.entries.len()
    }
}

fn is_defined(schema: &SchemaModel, sub_value: &str) -> bool {
    schema.axes().iter().any(|axis| axis.contains(sub_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AxisDefinition;

    fn schema() -> SchemaModel {
        SchemaModel::create(vec![AxisDefinition::new("TipoSalto", ["CMJ", "SJ"])], 5, 5).unwrap()
    }

    #[test]
    fn test_set_and_display() {
        let mut aliases = AliasTable::new();
        aliases.set(&schema(), "CMJ", "  Contramovimiento ").unwrap();
        assert_eq!(aliases.display("CMJ"), "Contramovimiento");
        assert_eq!(aliases.display("SJ"), "SJ");
    }

    #[test]
    fn test_blank_alias_removes() {
        let mut aliases = AliasTable::new();
        aliases.set(&schema(), "CMJ", "Contramovimiento").unwrap();
        aliases.set(&schema(), "CMJ", "   ").unwrap();
        assert!(aliases.is_empty());
    }

    #[test]
    fn test_rejects_undefined_and_long() {
        let mut aliases = AliasTable::new();
        assert_eq!(
            aliases.set(&schema(), "DJ", "Drop"),
            Err(AliasError::UnknownSubValue { value: "DJ".into() })
        );
        let long = "x".repeat(MAX_ALIAS_LEN + 1);
        assert!(matches!(
            aliases.set(&schema(), "SJ", &long),
            Err(AliasError::AliasTooLong { .. })
        ));
        assert!(aliases.set(&schema(), "SJ", &"x".repeat(MAX_ALIAS_LEN)).is_ok());
    }

    #[test]
    fn test_retain_defined() {
        let mut aliases = AliasTable::new();
        aliases.set(&schema(), "CMJ", "Contramovimiento").unwrap();
        aliases.set(&schema(), "SJ", "Sentadilla").unwrap();

        let narrowed =
            SchemaModel::create(vec![AxisDefinition::new("TipoSalto", ["CMJ", "DJ"])], 5, 5)
                .unwrap();
        assert_eq!(aliases.retain_defined(&narrowed), 1);
        assert_eq!(aliases.iter().collect::<Vec<_>>(), vec![("CMJ", "Contramovimiento")]);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut aliases = AliasTable::new();
        aliases.set(&schema(), "CMJ", "Contramovimiento").unwrap();
        let json = serde_json::to_string(&aliases).unwrap();
        assert_eq!(json, r#"{"CMJ":"Contramovimiento"}"#);
    }
}
