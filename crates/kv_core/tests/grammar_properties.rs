//! Property tests for the file-name grammar

use kv_core::{parse, to_file_name, AxisDefinition, AxisSelection, SchemaModel};
use proptest::prelude::*;

fn schema() -> SchemaModel {
    SchemaModel::create(
        vec![
            AxisDefinition::new("Lado", ["Izq", "Der"]).mandatory(),
            AxisDefinition::new("TipoSalto", ["CMJ", "SJ", "DJ"]),
            AxisDefinition::new("Calzado", ["Descalzo", "Zapatilla", "Bota"]).multiple(),
        ],
        1000,
        1000,
    )
    .unwrap()
}

/// A slot for a multi-value axis: a non-empty subset in arbitrary order, or `Nulo`.
fn multi_slot(
    values: &'static [&'static str],
    allow_absent: bool,
) -> impl Strategy<Value = String> {
    let subset = proptest::sample::subsequence(values.to_vec(), 1..=values.len())
        .prop_shuffle()
        .prop_map(|pieces| pieces.join("+"));
    if allow_absent {
        prop_oneof![4 => subset, 1 => Just("Nulo".to_string())].boxed()
    } else {
        subset.boxed()
    }
}

fn fixed_slot(values: &'static [&'static str]) -> impl Strategy<Value = String> {
    prop_oneof![
        4 => proptest::sample::select(values.to_vec()).prop_map(str::to_string),
        1 => Just("Nulo".to_string()),
    ]
}

fn file_name() -> impl Strategy<Value = String> {
    (
        "[A-Za-z]{1,6}[0-9]{1,3}",
        multi_slot(&["Izq", "Der"], false),
        fixed_slot(&["CMJ", "SJ", "DJ"]),
        multi_slot(&["Descalzo", "Zapatilla", "Bota"], true),
        1u32..=999,
        any::<bool>(),
        prop_oneof![Just(".txt"), Just(".csv"), Just("_Cinematica.txt"), Just("")],
    )
        .prop_map(|(participant, lado, salto, calzado, attempt, padded, tail)| {
            let attempt = if padded { format!("{:03}", attempt) } else { attempt.to_string() };
            format!("{} {} {} {} {}{}", participant, lado, salto, calzado, attempt, tail)
        })
}

fn load_schema() -> SchemaModel {
    SchemaModel::create(
        vec![
            AxisDefinition::new("Carga", ["0,5kg", "1-0kg", "(alta)"]),
            AxisDefinition::new("Marca", ["#1", "@2", "x_y", "50%"]).multiple(),
        ],
        1000,
        1000,
    )
    .unwrap()
}

fn punctuated_file_name() -> impl Strategy<Value = String> {
    (
        "[A-Za-z]{1,6}[0-9]{1,3}",
        fixed_slot(&["0,5kg", "1-0kg", "(alta)"]),
        multi_slot(&["#1", "@2", "x_y", "50%"], true),
        1u32..=999,
        prop_oneof![Just(".txt"), Just(".csv"), Just("_Cinetica.csv"), Just("")],
    )
        .prop_filter("at least one variable present", |(_, carga, marca, _, _)| {
            carga != "Nulo" || marca != "Nulo"
        })
        .prop_map(|(participant, carga, marca, attempt, tail)| {
            format!("{} {} {} {}{}", participant, carga, marca, attempt, tail)
        })
}

proptest! {
    #[test]
    fn parse_then_render_round_trips(name in file_name()) {
        let schema = schema();
        let identity = parse(&name, &schema).unwrap();
        let canonical = to_file_name(&identity, &schema);

        prop_assert_eq!(parse(&canonical, &schema).unwrap(), identity);
        // Rendering is a fixed point
        prop_assert_eq!(to_file_name(&parse(&canonical, &schema).unwrap(), &schema), canonical);
    }

    #[test]
    fn multi_value_selections_are_in_definition_order(name in file_name()) {
        let schema = schema();
        let identity = parse(&name, &schema).unwrap();
        for (axis, selection) in schema.axes().iter().zip(identity.selections()) {
            if let AxisSelection::Values(values) = selection {
                let positions: Vec<usize> =
                    values.iter().map(|v| axis.position_of(v).unwrap()).collect();
                prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn punctuated_sub_values_round_trip(name in punctuated_file_name()) {
        let schema = load_schema();
        let identity = parse(&name, &schema).unwrap();
        let canonical = to_file_name(&identity, &schema);

        prop_assert_eq!(parse(&canonical, &schema).unwrap(), identity);
    }

    #[test]
    fn wrong_token_count_is_always_structural(extra in 1usize..4) {
        let schema = schema();
        let mut name = String::from("P01 Izq CMJ Bota 01");
        for _ in 0..extra {
            name.push_str(" Bota");
        }
        let err = parse(&name, &schema).unwrap_err();
        prop_assert_eq!(err.category(), kv_core::ErrorCategory::Structural);
    }
}
