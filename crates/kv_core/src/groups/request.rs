use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How accepted files are partitioned for comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GroupRequest {
    /// One group per sub-value of `axis`.
    OneAxis {
        axis: String,
        /// Subset of sub-values to turn into groups; every sub-value when `None`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        values: Option<Vec<String>>,
    },
    /// Like `OneAxis`, restricted to files whose `held_axis` selection includes
    /// `held_value`.
    TwoAxes {
        axis: String,
        held_axis: String,
        held_value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        values: Option<Vec<String>>,
    },
}

impl GroupRequest {
    pub fn one_axis(axis: impl Into<String>) -> Self {
        GroupRequest::OneAxis { axis: axis.into(), values: None }
    }

    pub fn two_axes(
        axis: impl Into<String>,
        held_axis: impl Into<String>,
        held_value: impl Into<String>,
    ) -> Self {
        GroupRequest::TwoAxes {
            axis: axis.into(),
            held_axis: held_axis.into(),
            held_value: held_value.into(),
            values: None,
        }
    }

    /// Restricts the groups to the given sub-values of the grouped axis.
    pub fn with_values<S: Into<String>>(mut self, selected: impl IntoIterator<Item = S>) -> Self {
        let selected = Some(selected.into_iter().map(Into::into).collect());
        match &mut self {
            GroupRequest::OneAxis { values, .. } | GroupRequest::TwoAxes { values, .. } => {
                *values = selected
            }
        }
        self
    }

    pub fn axis(&self) -> &str {
        match self {
            GroupRequest::OneAxis { axis, .. } | GroupRequest::TwoAxes { axis, .. } => {
                axis.as_str()
            }
        }
    }

    pub fn values(&self) -> Option<&[String]> {
        match self {
            GroupRequest::OneAxis { values, .. } | GroupRequest::TwoAxes { values, .. } => {
                values.as_deref()
            }
        }
    }

    /// `(held axis, held value)` in two-axes mode.
    pub fn held(&self) -> Option<(&str, &str)> {
        match self {
            GroupRequest::OneAxis { .. } => None,
            GroupRequest::TwoAxes { held_axis, held_value, .. } => {
                Some((held_axis.as_str(), held_value.as_str()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_json() {
        let request = GroupRequest::two_axes("Condicion", "TipoSalto", "CMJ");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "mode": "two_axes",
                "axis": "Condicion",
                "held_axis": "TipoSalto",
                "held_value": "CMJ"
            })
        );

        let parsed: GroupRequest =
            serde_json::from_str(r#"{"mode":"one_axis","axis":"Lado","values":["Der"]}"#).unwrap();
        assert_eq!(parsed, GroupRequest::one_axis("Lado").with_values(["Der"]));
    }

    #[test]
    fn test_accessors() {
        let request = GroupRequest::one_axis("Lado");
        assert_eq!(request.axis(), "Lado");
        assert_eq!(request.values(), None);
        assert_eq!(request.held(), None);
    }
}
