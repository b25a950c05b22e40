use schemars::schema_for;
use synthdoc_core::MetadataDocument;

#[test]
fn metadata_schema_describes_fields_and_metatype() {
    let schema = schema_for!(MetadataDocument);
    let json = serde_json::to_value(&schema).expect("serialize generated schema");

    let definitions = json
        .get("definitions")
        .and_then(|value| value.as_object())
        .expect("definitions object");
    for name in ["TemplateEntry", "FieldSpec", "BBox", "ValueSource"] {
        assert!(definitions.contains_key(name), "missing definition {name}");
    }

    let field_props = definitions["FieldSpec"]
        .get("properties")
        .and_then(|value| value.as_object())
        .expect("FieldSpec properties");
    assert!(field_props.contains_key("bbox"));
    assert!(field_props.contains_key("metatype"));
}
