use sprig_core::{Spec, Version, VersionList};

#[test]
fn test_spec_serializes_canonically() {
    let spec = Spec::parse("mvapich ^stackwalker@8.1_1e ~qt_4 +debug").unwrap();
    let json = serde_json::to_string(&spec).unwrap();
    assert_eq!(json, r#""mvapich^stackwalker@8.1_1e+debug~qt_4""#);

    let back: Spec = serde_json::from_str(&json).unwrap();
    assert_eq!(back, spec);
}

#[test]
fn test_spec_deserialize_rejects_bad_text() {
    let result: Result<Spec, _> = serde_json::from_str(r#""x@@1.2""#);
    assert!(result.is_err());
}

#[test]
fn test_version_and_list_serialize_as_strings() {
    let version = Version::parse("1.4b7-rc3").unwrap();
    assert_eq!(serde_json::to_string(&version).unwrap(), r#""1.4b7-rc3""#);

    let list: VersionList = "1.6,1.2:1.4".parse().unwrap();
    assert_eq!(serde_json::to_string(&list).unwrap(), r#""1.2:1.4,1.6""#);
}

#[test]
fn test_nested_spec_survives_serde() {
    let mut b = Spec::new("b");
    b.add_dependency(Spec::parse("c@1.0").unwrap()).unwrap();
    let mut root = Spec::new("a");
    root.add_dependency(b).unwrap();

    let json = serde_json::to_string(&root).unwrap();
    assert_eq!(json, r#""a^b^c@1.0""#);
    let back: Spec = serde_json::from_str(&json).unwrap();
    assert_eq!(back, root);
}
