//! Integration test: schemas authored in YAML normalize the same way as
//! their JSON equivalents, `$defs` references included.

use std::io::Write;

use serde_json::json;
use valstate_schema::{JsonSchema, Schema, SchemaFields, SchemaKind, ValidateOptions};

const SHIPMENT_YAML: &str = r##"
$schema: https://json-schema.org/draft/2020-12/schema
type: object
required: [origin, parcels]
properties:
  origin:
    $ref: "#/$defs/port"
  destination:
    $ref: "#/$defs/port"
    default: XXX
  parcels:
    type: array
    items:
      type: object
      properties:
        weight: {type: number, exclusiveMinimum: 0}
        fragile: {type: boolean, default: false}
  window:
    type: array
    prefixItems:
      - {type: string}
      - {type: string}
$defs:
  port:
    type: string
    pattern: "^[A-Z]{3}$"
"##;

fn write_schema(suffix: &str, body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

#[test]
fn test_yaml_schema_builds_expected_tree() {
    let file = write_schema(".yaml", SHIPMENT_YAML);
    let schema = JsonSchema::from_file(file.path()).unwrap();
    assert_eq!(schema.kind(), SchemaKind::Object);

    let SchemaFields::Object(fields) = schema.fields() else {
        panic!("object schema without fields");
    };
    let kinds: Vec<(String, SchemaKind)> = fields
        .iter()
        .map(|(name, field)| (name.clone(), field.kind()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("origin".to_string(), SchemaKind::Primitive),
            ("destination".to_string(), SchemaKind::Primitive),
            ("parcels".to_string(), SchemaKind::Array),
            ("window".to_string(), SchemaKind::Tuple),
        ]
    );
    assert_eq!(fields[1].1.default_value(), Some(json!("XXX")));
}

#[test]
fn test_yaml_and_json_agree_on_validation() {
    let yaml = write_schema(".yml", SHIPMENT_YAML);
    let from_yaml = JsonSchema::from_file(yaml.path()).unwrap();

    let document: serde_yaml::Value = serde_yaml::from_str(SHIPMENT_YAML).unwrap();
    let as_json = serde_json::to_string(&document).unwrap();
    let json_file = write_schema(".json", &as_json);
    let from_json = JsonSchema::from_file(json_file.path()).unwrap();

    let opts = ValidateOptions::default();
    let bad = json!({"origin": "rotterdam", "parcels": [{"weight": 0}]});
    let good = json!({"origin": "RTM", "parcels": [{"weight": 2.5}]});
    for schema in [&from_yaml, &from_json] {
        assert!(schema.validate(&good, &opts).is_ok());
        let err = schema.validate(&bad, &opts).unwrap_err();
        assert!(err.is_validation_failure());
    }
}

#[test]
fn test_broken_yaml_names_the_file() {
    let file = write_schema(".yaml", "type: [unclosed");
    let err = JsonSchema::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("invalid YAML"), "{err}");
}
