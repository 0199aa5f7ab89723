//! Definition rules for independent variables and their sub-values.

use super::axis::{Axis, AxisDefinition, ABSENT_TOKEN};
use crate::error::SchemaError;
use std::collections::HashSet;

/// Characters a sub-value may never contain: `.` would be taken for an extension and
/// the path separators for directories when the name is re-parsed, `;` and `=` delimit
/// comparison group keys.
pub(crate) const RESERVED_SUB_VALUE_CHARS: [char; 5] = ['.', '/', '\\', ';', '='];

pub(crate) fn validate_axis_name(index: usize, raw: &str) -> Result<String, SchemaError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(SchemaError::EmptyAxisName { index });
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(SchemaError::InvalidAxisName { name: name.to_string() });
    }
    Ok(name.to_string())
}

fn validate_sub_values(
    axis: &str,
    raw: &[String],
    separator: char,
) -> Result<Vec<String>, SchemaError> {
    if raw.len() < 2 {
        return Err(SchemaError::TooFewSubValues { axis: axis.to_string(), found: raw.len() });
    }

    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(raw.len());
    for value in raw {
        let value = value.trim();
        if value.is_empty() {
            return Err(SchemaError::EmptySubValue { axis: axis.to_string() });
        }
        let reserved =
            |c: char| c.is_whitespace() || c == separator || RESERVED_SUB_VALUE_CHARS.contains(&c);
        if value.chars().any(reserved) {
            return Err(SchemaError::InvalidSubValue {
                axis: axis.to_string(),
                value: value.to_string(),
                separator,
            });
        }
        if value.to_lowercase() == ABSENT_TOKEN.to_lowercase() {
            return Err(SchemaError::ReservedSubValue {
                axis: axis.to_string(),
                value: value.to_string(),
            });
        }
        if !seen.insert(value.to_string()) {
            return Err(SchemaError::DuplicateSubValue {
                axis: axis.to_string(),
                value: value.to_string(),
            });
        }
        cleaned.push(value.to_string());
    }

    Ok(cleaned)
}

/// Validates an ordered list of definitions into axes. Names are trimmed; sub-value
/// order is preserved because it drives group ordering.
pub(crate) fn validate_axes(
    definitions: &[AxisDefinition],
    separator: char,
) -> Result<Vec<Axis>, SchemaError> {
    if definitions.is_empty() {
        return Err(SchemaError::NoAxes);
    }

    let mut names = HashSet::new();
    let mut axes = Vec::with_capacity(definitions.len());
    for (index, def) in definitions.iter().enumerate() {
        let name = validate_axis_name(index, &def.name)?;
        if !names.insert(name.clone()) {
            return Err(SchemaError::DuplicateAxisName { name });
        }

        let sub_values = validate_sub_values(&name, &def.sub_values, separator)?;

        axes.push(Axis {
            name,
            sub_values,
            allow_multiple: def.allow_multiple,
            // Only meaningful for multi-value variables
            mandatory_if_multiple: def.allow_multiple && def.mandatory_if_multiple,
        });
    }

    Ok(axes)
}

pub(crate) fn validate_limit(field: &'static str, value: u32) -> Result<u32, SchemaError> {
    if value == 0 {
        return Err(SchemaError::InvalidLimit { field });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_names_and_values() {
        let defs = vec![AxisDefinition::new(" TipoSalto ", [" CMJ", "SJ "])];
        let axes = validate_axes(&defs, '+').unwrap();
        assert_eq!(axes[0].name(), "TipoSalto");
        assert_eq!(axes[0].sub_values(), ["CMJ", "SJ"]);
    }

    #[test]
    fn test_rejects_reserved_token_any_case() {
        for reserved in ["Nulo", "nulo", "NULO"] {
            let defs = vec![AxisDefinition::new("Edad", ["Joven", reserved])];
            assert!(matches!(
                validate_axes(&defs, '+'),
                Err(SchemaError::ReservedSubValue { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_single_sub_value() {
        let defs = vec![AxisDefinition::new("Edad", ["Joven"])];
        assert_eq!(
            validate_axes(&defs, '+'),
            Err(SchemaError::TooFewSubValues { axis: "Edad".into(), found: 1 })
        );
    }

    #[test]
    fn test_rejects_separator_and_spaces_in_sub_values() {
        let defs = vec![AxisDefinition::new("Edad", ["Muy Joven", "Mayor"])];
        assert!(matches!(validate_axes(&defs, '+'), Err(SchemaError::InvalidSubValue { .. })));

        let defs = vec![AxisDefinition::new("Edad", ["A+B", "C"])];
        assert!(matches!(validate_axes(&defs, '+'), Err(SchemaError::InvalidSubValue { .. })));
    }

    #[test]
    fn test_rejects_extension_path_and_key_characters() {
        for value in ["0.5kg", "a/b", "a\\b", "a;b", "a=b"] {
            let defs = vec![AxisDefinition::new("Carga", [value, "Otra"])];
            assert!(
                matches!(validate_axes(&defs, '+'), Err(SchemaError::InvalidSubValue { .. })),
                "sub-value {value} should be rejected"
            );
        }

        let defs = vec![AxisDefinition::new("Carga", ["0,5kg", "1-0kg", "(alta)"])];
        assert!(validate_axes(&defs, '+').is_ok());
    }

    #[test]
    fn test_rejects_duplicates() {
        let defs = vec![AxisDefinition::new("Edad", ["A", "A"])];
        assert!(matches!(validate_axes(&defs, '+'), Err(SchemaError::DuplicateSubValue { .. })));

        let defs =
            vec![AxisDefinition::new("Edad", ["A", "B"]), AxisDefinition::new("Edad", ["C", "D"])];
        assert!(matches!(validate_axes(&defs, '+'), Err(SchemaError::DuplicateAxisName { .. })));
    }

    #[test]
    fn test_same_sub_value_allowed_across_axes() {
        let defs = vec![
            AxisDefinition::new("Ojo", ["Izq", "Der"]),
            AxisDefinition::new("Pie", ["Izq", "Der"]),
        ];
        assert!(validate_axes(&defs, '+').is_ok());
    }

    #[test]
    fn test_rejects_special_characters_in_axis_name() {
        let defs = vec![AxisDefinition::new("Tipo Salto", ["A", "B"])];
        assert!(matches!(validate_axes(&defs, '+'), Err(SchemaError::InvalidAxisName { .. })));

        let defs = vec![AxisDefinition::new("Tipo=Salto", ["A", "B"])];
        assert!(matches!(validate_axes(&defs, '+'), Err(SchemaError::InvalidAxisName { .. })));

        let defs = vec![AxisDefinition::new("Condición", ["A", "B"])];
        assert!(matches!(validate_axes(&defs, '+'), Err(SchemaError::InvalidAxisName { .. })));
    }

    #[test]
    fn test_mandatory_flag_dropped_without_multiple() {
        let mut def = AxisDefinition::new("Edad", ["A", "B"]);
        def.mandatory_if_multiple = true;
        let axes = validate_axes(&[def], '+').unwrap();
        assert!(!axes[0].mandatory_if_multiple);
    }
}
